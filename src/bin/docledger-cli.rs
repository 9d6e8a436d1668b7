use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue};
use serde_json::Value;
use std::path::PathBuf;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "docledger-cli")]
#[command(about = "Command line client for the docledger service", long_about = None)]
struct Cli {
    #[arg(short, long, env = "DOCLEDGER_URL", default_value = "http://localhost:8080")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload a file and register it on the ledger
    Upload {
        path: PathBuf,
        /// Session to upload under (random if omitted)
        #[arg(short, long)]
        session: Option<String>,
        /// Name to register the file under (defaults to the file name)
        #[arg(short, long)]
        name: Option<String>,
    },
    /// Show a document record
    Get { id: u64 },
    /// Download a document's contents
    Download {
        id: u64,
        /// Where to write the file (defaults to the registered name)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Revoke a document and unpin its file
    Delete { id: u64 },
    /// Check service health
    Health,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    let mut headers = HeaderMap::new();
    headers.insert("x-request-id", HeaderValue::from_str(&Uuid::new_v4().to_string())?);

    match cli.command {
        Commands::Upload { path, session, name } => {
            let session = session.unwrap_or_else(|| Uuid::new_v4().to_string());
            let name = match name {
                Some(name) => name,
                None => path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .ok_or("path has no usable file name")?
                    .to_string(),
            };
            let bytes = tokio::fs::read(&path).await?;

            let res = client
                .post(format!("{}/sessions/{}/upload", base, session))
                .headers(headers.clone())
                .send()
                .await?;
            if !res.status().is_success() {
                return print_response(res).await;
            }

            let res = client
                .put(format!("{}/sessions/{}/files/{}", base, session, name))
                .headers(headers)
                .body(bytes)
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Get { id } => {
            let res = client
                .get(format!("{}/documents/{}", base, id))
                .headers(headers)
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Download { id, output } => {
            let output = match output {
                Some(output) => output,
                None => {
                    let res = client
                        .get(format!("{}/documents/{}", base, id))
                        .headers(headers.clone())
                        .send()
                        .await?;
                    if !res.status().is_success() {
                        return print_response(res).await;
                    }
                    let record: Value = res.json().await?;
                    let name = record["display_name"].as_str().unwrap_or("document");
                    // Keep only the final component of a registered name.
                    PathBuf::from(name)
                        .file_name()
                        .map(PathBuf::from)
                        .unwrap_or_else(|| PathBuf::from("document"))
                }
            };

            let res = client
                .get(format!("{}/documents/{}/content", base, id))
                .headers(headers)
                .send()
                .await?;
            if !res.status().is_success() {
                return print_response(res).await;
            }
            let bytes = res.bytes().await?;
            tokio::fs::write(&output, &bytes).await?;
            println!("Wrote {} bytes to {}", bytes.len(), output.display());
        }
        Commands::Delete { id } => {
            let res = client
                .delete(format!("{}/documents/{}", base, id))
                .headers(headers)
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Health => {
            let res = client
                .get(format!("{}/health", base))
                .headers(headers)
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
        eprintln!("Error: service returned status {}", status);
        if let Ok(text) = res.text().await {
            match serde_json::from_str::<Value>(&text) {
                Ok(json) => eprintln!("{}", serde_json::to_string_pretty(&json)?),
                Err(_) => eprintln!("Response: {}", text),
            }
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
