use clap::Parser;
use manifest_sentry::cli::{self, Args};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    cli::run(Args::parse()).await
}
