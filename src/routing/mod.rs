//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (host, path)
//!     → router.rs (ordered binding scan)
//!     → matcher.rs (host/path template match, variable capture)
//!     → Return: handler + captured variables, or NoMatch
//!
//! Route Registration (at startup):
//!     (host template, path template, handler, defaults)
//!     → Compile templates
//!     → Reject overlapping shapes
//!     → Freeze table, share via Arc
//! ```
//!
//! # Design Decisions
//! - Routes registered at startup, immutable at runtime
//! - No regex in hot path
//! - Deterministic: same input always matches same route
//! - First match wins (registration order)

pub mod matcher;
pub mod router;

pub use matcher::{Captures, Template, TemplateError};
pub use router::{RouteBinding, RouteError, RouteMatch, RouteTable};
