use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "gateway-cli")]
#[command(about = "Inspect a running circuit-gateway through its admin API", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:3333")]
    url: String,

    #[arg(short, long)]
    key: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show gateway version and breaker settings
    Status,
    /// List every tracked endpoint and its circuit state
    Circuits {
        /// Only show endpoints that are not CLOSED
        #[arg(long)]
        tripped: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", cli.key))?,
    );

    match cli.command {
        Commands::Status => {
            let res = client
                .get(format!("{}/admin/status", cli.url))
                .headers(headers)
                .send()
                .await?;
            if let Some(json) = read_json(res).await? {
                println!("{}", serde_json::to_string_pretty(&json)?);
            }
        }
        Commands::Circuits { tripped } => {
            let res = client
                .get(format!("{}/admin/circuits", cli.url))
                .headers(headers)
                .send()
                .await?;
            if let Some(json) = read_json(res).await? {
                print_circuits(&json, tripped);
            }
        }
    }

    Ok(())
}

async fn read_json(res: reqwest::Response) -> Result<Option<Value>, Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: Admin API returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(None);
    }
    Ok(Some(res.json().await?))
}

fn print_circuits(json: &Value, tripped_only: bool) {
    let Some(endpoints) = json.as_array() else {
        println!("{}", json);
        return;
    };

    println!("{:<10} {:>6} {:>10}  ENDPOINT", "STATUS", "FAILS", "RETRY_MS");
    for endpoint in endpoints {
        let status = endpoint["status"].as_str().unwrap_or("?");
        if tripped_only && status == "CLOSED" {
            continue;
        }
        let retry = endpoint["retry_in_ms"]
            .as_u64()
            .map(|ms| ms.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<10} {:>6} {:>10}  {}",
            status,
            endpoint["fail_count"].as_u64().unwrap_or(0),
            retry,
            endpoint["endpoint"].as_str().unwrap_or("?")
        );
    }
}
