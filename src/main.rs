use clap::Parser;
use obfuscator_api::cli::{self, Args};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    cli::run(args).await
}
