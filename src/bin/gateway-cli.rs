use clap::{Parser, Subcommand};
use serde_json::Value;

use app_proxy_gateway::routing::QueryParams;
use app_proxy_gateway::security::signature;

#[derive(Parser)]
#[command(name = "gateway-cli")]
#[command(about = "Developer CLI for the app proxy gateway", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign a query string the way the storefront platform does
    Sign {
        /// Query string, e.g. "shop=x.myshopify.com&timestamp=1700000000"
        query: String,
        #[arg(short, long, env = "GATEWAY_SHARED_SECRET")]
        secret: String,
    },
    /// Check the signature of a query string
    Verify {
        query: String,
        #[arg(short, long, env = "GATEWAY_SHARED_SECRET")]
        secret: String,
    },
    /// Query the health endpoint of a running gateway
    Health {
        #[arg(short, long, default_value = "http://localhost:3000")]
        url: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Sign { query, secret } => {
            let mut params = QueryParams::parse(Some(query.trim_start_matches('?')));
            params.remove("signature");
            let sig = signature::sign(&params, &secret);
            params.insert("signature", sig);
            println!("{}", params.to_query_string());
        }
        Commands::Verify { query, secret } => {
            let params = QueryParams::parse(Some(query.trim_start_matches('?')));
            if signature::verify(&params, Some(&secret)) {
                println!("valid");
            } else {
                println!("invalid (expected {})", signature::sign(&params, &secret));
                std::process::exit(1);
            }
        }
        Commands::Health { url } => {
            let res = reqwest::Client::new()
                .get(format!("{}/health", url.trim_end_matches('/')))
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
