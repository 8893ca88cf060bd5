use anyhow::Result;
use clap::Parser;
use fintracker::cli::Cli;

#[actix_web::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();
    cli.init_tracing();
    cli.run().await
}
