use actix_web::{App, HttpServer, middleware, web};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use crate::application::{DEFAULT_MAX_CONNECTIONS, LedgerService, SeedOptions};
use crate::domain::{PageRequest, format_cents, parse_cents};
use crate::http;

/// Fintracker - personal finance backend
#[derive(Parser)]
#[command(name = "fintracker")]
#[command(about = "Users, wallets, cards and atomic wallet-to-wallet transfers over SQLite")]
#[command(version)]
pub struct Cli {
    /// SQLite database URL
    #[arg(
        long,
        global = true,
        env = "DATABASE_URL",
        default_value = "sqlite:fintracker.db"
    )]
    pub database_url: String,

    /// Maximum number of pooled database connections
    #[arg(long, global = true, env = "FINTRACKER_MAX_CONNECTIONS", default_value_t = DEFAULT_MAX_CONNECTIONS)]
    pub max_connections: u32,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new database
    Init,

    /// Serve the HTTP API
    Serve {
        /// Address to listen on
        #[arg(long, env = "FINTRACKER_BIND", default_value = "127.0.0.1:8000")]
        bind: String,
    },

    /// Move money between two wallets
    Transfer {
        /// Amount to transfer (e.g., "40.00" or "40")
        amount: String,

        /// Source wallet id
        #[arg(long)]
        from: Uuid,

        /// Destination wallet id
        #[arg(long)]
        to: Uuid,
    },

    /// Populate the database with generated demo data
    Seed {
        /// RNG seed; the same seed on an empty database gives the same data
        #[arg(long, default_value_t = 42)]
        seed: u64,

        #[arg(long, default_value_t = 5)]
        users: usize,

        /// Transfers attempted between wallets sharing a currency
        #[arg(long, default_value_t = 10)]
        transfers: usize,
    },

    /// List recorded transactions, newest first
    Transactions {
        /// Only transactions touching this wallet
        #[arg(long)]
        wallet: Option<Uuid>,

        #[arg(long, default_value_t = 1)]
        page: u32,

        #[arg(long, default_value_t = crate::domain::DEFAULT_PAGE_SIZE)]
        size: u32,
    },
}

impl Cli {
    /// Install the global tracing subscriber. `RUST_LOG` overrides the
    /// default `info` level.
    pub fn init_tracing(&self) {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        let builder = tracing_subscriber::fmt().with_env_filter(filter);
        if self.log_json {
            builder.json().init();
        } else {
            builder.init();
        }
    }

    pub async fn run(self) -> Result<()> {
        match self.command {
            Commands::Init => {
                LedgerService::init_with(&self.database_url, self.max_connections).await?;
                println!("Database initialized: {}", self.database_url);
            }

            Commands::Serve { bind } => {
                let service =
                    LedgerService::init_with(&self.database_url, self.max_connections).await?;
                serve(service, &bind).await?;
            }

            Commands::Transfer { amount, from, to } => {
                let service =
                    LedgerService::connect(&self.database_url, self.max_connections).await?;
                let amount_cents =
                    parse_cents(&amount).context("Invalid amount format. Use '40.00' or '40'")?;

                let transaction = service.transfer(from, to, amount_cents).await?;
                println!(
                    "Recorded transfer #{}: {} {} -> {} ({})",
                    transaction.sequence,
                    format_cents(transaction.amount),
                    transaction.source_wallet_id,
                    transaction.destination_wallet_id,
                    transaction.id
                );
            }

            Commands::Seed {
                seed,
                users,
                transfers,
            } => {
                let service =
                    LedgerService::init_with(&self.database_url, self.max_connections).await?;
                let options = SeedOptions {
                    seed,
                    users,
                    transfers,
                    ..SeedOptions::default()
                };
                let report = service.seed_demo_data(options).await?;

                println!(
                    "Seeded {} users, {} wallets, {} cards and {} transfers ({} skipped)",
                    report.users, report.wallets, report.cards, report.transfers, report.skipped
                );
                for (currency, total) in &report.opening_balances {
                    println!("  {currency}: {} opening balance", format_cents(*total));
                }
            }

            Commands::Transactions { wallet, page, size } => {
                let service =
                    LedgerService::connect(&self.database_url, self.max_connections).await?;
                run_transactions_command(&service, wallet, PageRequest::new(page, size)?).await?;
            }
        }

        Ok(())
    }
}

/// Run the HTTP API until the server is stopped.
async fn serve(service: LedgerService, bind: &str) -> Result<()> {
    let data = web::Data::new(service);
    info!(%bind, "starting HTTP server");

    HttpServer::new(move || {
        App::new()
            .app_data(data.clone())
            .wrap(middleware::Logger::default())
            .wrap(middleware::NormalizePath::trim())
            .configure(http::configure)
    })
    .bind(bind)
    .with_context(|| format!("Failed to bind {bind}"))?
    .run()
    .await
    .context("HTTP server failed")?;

    info!("HTTP server stopped");
    Ok(())
}

async fn run_transactions_command(
    service: &LedgerService,
    wallet: Option<Uuid>,
    page: PageRequest,
) -> Result<()> {
    let result = service.list_transactions(wallet, page).await?;

    if result.items.is_empty() {
        println!("No transactions found.");
        return Ok(());
    }

    println!(
        "{:>6} {:<17} {:>12} {:<36} {:<36}",
        "SEQ", "DATE", "AMOUNT", "FROM", "TO"
    );
    println!("{}", "-".repeat(111));
    for transaction in &result.items {
        println!(
            "{:>6} {:<17} {:>12} {:<36} {:<36}",
            transaction.sequence,
            transaction.created_at.format("%Y-%m-%d %H:%M"),
            format_cents(transaction.amount),
            transaction.source_wallet_id,
            transaction.destination_wallet_id
        );
    }
    println!();
    println!(
        "Page {} of {} ({} transactions)",
        result.page, result.pages, result.total
    );
    Ok(())
}
