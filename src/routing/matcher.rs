//! Host and path template matching.
//!
//! # Responsibilities
//! - Compile templates such as `<api_id>.execute-api.<any:server>` or
//!   `/<stage>/<path:path>` into segments
//! - Match a concrete host or path and capture the named segments
//! - Expose a name-independent shape used to detect overlapping routes
//!
//! # Template Syntax
//! - `<name>`: one or more characters up to the next separator
//!   (`.` in host templates, `/` in path templates)
//! - `<path:name>`: non-empty greedy tail, must be the last segment
//! - `<any:name>`: greedy tail that may be empty, must be the last segment
//! - anything else is a literal
//!
//! # Design Decisions
//! - Host matching is case-insensitive
//! - Path matching is case-sensitive
//! - Path templates ending in `/` also match the same path without it
//! - No regex; backtracking is bounded by the separator positions

use std::collections::BTreeMap;
use std::fmt;

/// Variables captured while matching a template.
pub type Captures = BTreeMap<String, String>;

/// Error returned for malformed templates.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TemplateError {
    #[error("unclosed segment in template '{0}'")]
    Unclosed(String),
    #[error("empty segment name in template '{0}'")]
    EmptyName(String),
    #[error("unknown converter '{converter}' in template '{template}'")]
    UnknownConverter { template: String, converter: String },
    #[error("greedy segment must be last in template '{0}'")]
    TailNotLast(String),
    #[error("adjacent variable segments in template '{0}'")]
    AdjacentVariables(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateKind {
    Host,
    Path,
}

impl TemplateKind {
    fn separator(self) -> char {
        match self {
            TemplateKind::Host => '.',
            TemplateKind::Path => '/',
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Var(String),
    Tail { name: String, allow_empty: bool },
}

/// A compiled host or path template.
#[derive(Debug, Clone)]
pub struct Template {
    source: String,
    kind: TemplateKind,
    segments: Vec<Segment>,
}

impl Template {
    /// Compile a host template. Literals match case-insensitively.
    pub fn host(source: &str) -> Result<Self, TemplateError> {
        Self::compile(source, TemplateKind::Host)
    }

    /// Compile a path template.
    pub fn path(source: &str) -> Result<Self, TemplateError> {
        Self::compile(source, TemplateKind::Path)
    }

    fn compile(source: &str, kind: TemplateKind) -> Result<Self, TemplateError> {
        let mut segments: Vec<Segment> = Vec::new();
        let mut literal = String::new();
        let mut chars = source.chars();

        while let Some(c) = chars.next() {
            if c != '<' {
                literal.push(c);
                continue;
            }
            if !literal.is_empty() {
                segments.push(Segment::Literal(std::mem::take(&mut literal)));
            }

            let mut inner = String::new();
            let mut closed = false;
            for c in chars.by_ref() {
                if c == '>' {
                    closed = true;
                    break;
                }
                inner.push(c);
            }
            if !closed {
                return Err(TemplateError::Unclosed(source.to_string()));
            }

            let (converter, name) = match inner.split_once(':') {
                Some((converter, name)) => (Some(converter), name),
                None => (None, inner.as_str()),
            };
            if name.is_empty() {
                return Err(TemplateError::EmptyName(source.to_string()));
            }
            let segment = match converter {
                None => Segment::Var(name.to_string()),
                Some("path") => Segment::Tail { name: name.to_string(), allow_empty: false },
                Some("any") => Segment::Tail { name: name.to_string(), allow_empty: true },
                Some(other) => {
                    return Err(TemplateError::UnknownConverter {
                        template: source.to_string(),
                        converter: other.to_string(),
                    })
                }
            };
            if matches!(segments.last(), Some(Segment::Var(_) | Segment::Tail { .. })) {
                return Err(TemplateError::AdjacentVariables(source.to_string()));
            }
            segments.push(segment);
        }

        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        let tail_count = segments
            .iter()
            .filter(|s| matches!(s, Segment::Tail { .. }))
            .count();
        let tail_is_last = matches!(segments.last(), Some(Segment::Tail { .. }));
        if tail_count > 1 || (tail_count == 1 && !tail_is_last) {
            return Err(TemplateError::TailNotLast(source.to_string()));
        }

        Ok(Self {
            source: source.to_string(),
            kind,
            segments,
        })
    }

    /// The template as written.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Match `input` and return the captured variables.
    /// Captured values keep the case of `input`.
    pub fn captures(&self, input: &str) -> Option<Captures> {
        let mut captured = Vec::new();
        if self.match_from(0, input, &mut captured) {
            return Some(captured.into_iter().collect());
        }

        if self.kind == TemplateKind::Path && self.source.ends_with('/') && !input.ends_with('/') {
            let slashed = format!("{}/", input);
            captured.clear();
            if self.match_from(0, &slashed, &mut captured) {
                return Some(captured.into_iter().collect());
            }
        }
        None
    }

    fn match_from(&self, idx: usize, input: &str, captured: &mut Vec<(String, String)>) -> bool {
        let Some(segment) = self.segments.get(idx) else {
            return input.is_empty();
        };
        let separator = self.kind.separator();

        match segment {
            Segment::Literal(literal) => self
                .strip_literal(input, literal)
                .is_some_and(|rest| self.match_from(idx + 1, rest, captured)),
            Segment::Var(name) => {
                let limit = input.find(separator).unwrap_or(input.len());
                // Longest candidate first, shrinking on failure.
                for end in (1..=limit).rev() {
                    if !input.is_char_boundary(end) {
                        continue;
                    }
                    captured.push((name.clone(), input[..end].to_string()));
                    if self.match_from(idx + 1, &input[end..], captured) {
                        return true;
                    }
                    captured.pop();
                }
                false
            }
            Segment::Tail { name, allow_empty } => {
                if !allow_empty && (input.is_empty() || input.starts_with(separator)) {
                    return false;
                }
                captured.push((name.clone(), input.to_string()));
                true
            }
        }
    }

    fn strip_literal<'i>(&self, input: &'i str, literal: &str) -> Option<&'i str> {
        match self.kind {
            TemplateKind::Path => input.strip_prefix(literal),
            TemplateKind::Host => {
                let prefix = input.get(..literal.len())?;
                prefix
                    .eq_ignore_ascii_case(literal)
                    .then(|| &input[literal.len()..])
            }
        }
    }

    /// Template structure with variable names erased. Two templates with the
    /// same shape match exactly the same inputs.
    pub fn shape(&self) -> String {
        self.segments
            .iter()
            .map(|segment| match segment {
                Segment::Literal(literal) if self.kind == TemplateKind::Host => {
                    literal.to_ascii_lowercase()
                }
                Segment::Literal(literal) => literal.clone(),
                Segment::Var(_) => "<>".to_string(),
                Segment::Tail { allow_empty: false, .. } => "<path>".to_string(),
                Segment::Tail { allow_empty: true, .. } => "<any>".to_string(),
            })
            .collect()
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}
