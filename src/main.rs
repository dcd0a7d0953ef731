use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use maskfleet::cli::Cli;
use maskfleet::error::Result;

#[tokio::main]
async fn main() -> Result<()> {
    // MASKFLEET_LOG overrides the default filter. Tungstenite is kept at warn
    // because it logs a frame-level error for every browser-side disconnect.
    let filter = EnvFilter::try_from_env("MASKFLEET_LOG")
        .unwrap_or_else(|_| EnvFilter::new("info,tungstenite=warn,tokio_tungstenite=warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let cli = Cli::parse();
    cli.run().await
}
