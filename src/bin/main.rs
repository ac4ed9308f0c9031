//! predictd binary.
//!
//! Serves class predictions from pre-trained classifiers over a
//! line-oriented TCP protocol.

use clap::Parser;
use predictd_core::cli::{commands::ServerCommand, handle_server};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub server: ServerCommand,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    handle_server(cli.server).await
}
