use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, HOST};
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "gateway-cli")]
#[command(about = "Client for invoking REST APIs served by apigw-router", long_about = None)]
struct Cli {
    /// Gateway base URL.
    #[arg(short, long, default_value = "http://localhost:4566")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Invoke a deployed API
    Invoke {
        api_id: String,
        stage: String,
        /// Path below the stage, e.g. `/pets/1?limit=2`
        #[arg(default_value = "/")]
        path: String,
        #[arg(short = 'X', long, default_value = "GET")]
        method: String,
        #[arg(short, long)]
        data: Option<String>,
        /// Address the API through `<api_id>.execute-api.<host>` instead of
        /// the `_user_request_` path.
        #[arg(long)]
        host_based: bool,
    },
    /// Simulate a method invocation through the test-invoke endpoint
    TestInvoke {
        api_id: String,
        resource_id: String,
        http_method: String,
        #[arg(short, long)]
        path_with_query_string: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    match cli.command {
        Commands::Invoke {
            api_id,
            stage,
            path,
            method,
            data,
            host_based,
        } => {
            let path = path.trim_start_matches('/');
            let mut headers = HeaderMap::new();
            let url = if host_based {
                let parsed = reqwest::Url::parse(base)?;
                let host = parsed.host_str().unwrap_or("localhost");
                let port = parsed.port().map(|p| format!(":{}", p)).unwrap_or_default();
                headers.insert(
                    HOST,
                    HeaderValue::from_str(&format!("{}.execute-api.{}{}", api_id, host, port))?,
                );
                format!("{}/{}/{}", base, stage, path)
            } else if path.is_empty() {
                format!("{}/restapis/{}/{}/_user_request_", base, api_id, stage)
            } else {
                format!("{}/restapis/{}/{}/_user_request_/{}", base, api_id, stage, path)
            };

            let method = reqwest::Method::from_bytes(method.to_uppercase().as_bytes())?;
            let mut request = client.request(method, url).headers(headers);
            if let Some(data) = data {
                request = request.body(data);
            }
            let res = request.send().await?;
            let status = res.status();
            let text = res.text().await?;
            println!("{}", status);
            println!("{}", text);
        }
        Commands::TestInvoke {
            api_id,
            resource_id,
            http_method,
            path_with_query_string,
        } => {
            let mut body = json!({ "restApiId": api_id, "httpMethod": http_method });
            if let Some(path) = path_with_query_string {
                body["pathWithQueryString"] = Value::String(path);
            }
            let res = client
                .post(format!(
                    "{}/restapis/{}/resources/{}/methods/{}",
                    base, api_id, resource_id, http_method
                ))
                .json(&body)
                .send()
                .await?;
            print_response(res).await?;
        }
    }

    Ok(())
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: gateway returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
