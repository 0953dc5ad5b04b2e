//! `aisle`: serve the shop assistant over HTTP, or answer one query.
//!
//! Usage:
//!   aisle --config aisle.toml
//!   aisle --port 8080 --bind 0.0.0.0
//!   aisle --query "Do you sell cordless drills?"
//!
//! `SERPAPI_API_KEY`, `AI21_API_KEY` and `COHERE_API_KEY` must be set,
//! either in the environment or in a `.env` file.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use aisle_api::{serve, AppState};
use aisle_coordinator::{build_store, Assistant, AssistantConfig, Credentials};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "aisle", version, about = "Tool-dispatching shop assistant")]
struct Args {
    /// TOML configuration file; defaults apply when omitted
    #[arg(short, long, env = "AISLE_CONFIG")]
    config: Option<PathBuf>,

    #[arg(short, long, default_value_t = 8080, env = "AISLE_PORT")]
    port: u16,

    #[arg(short, long, default_value = "127.0.0.1", env = "AISLE_BIND_ADDR")]
    bind: String,

    /// Answer this query on stdout and exit instead of serving
    #[arg(short, long)]
    query: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,aisle_coordinator=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    let config = AssistantConfig::load(args.config.as_deref())?;
    let credentials = Credentials::from_env()?;

    let store = build_store(&config, &credentials)?;
    let assistant = Arc::new(Assistant::new(&config, &credentials, store)?);

    if let Some(query) = args.query {
        let answer = assistant.run(&query).await?;
        println!("{answer}");
        return Ok(());
    }

    if args.bind == "0.0.0.0" {
        tracing::warn!("Binding to 0.0.0.0 exposes the assistant on every interface");
    }

    let addr: SocketAddr = format!("{}:{}", args.bind, args.port).parse()?;
    serve(Arc::new(AppState::new(assistant)), addr).await
}
