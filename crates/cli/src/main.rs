//! Mocktail Bar CLI - menu, user and store maintenance tools.
//!
//! # Usage
//!
//! ```bash
//! # Print the menu, cheapest first
//! mocktail-cli catalog --category signature --sort price-low
//!
//! # List registered users and one user's orders
//! mocktail-cli users list
//! mocktail-cli orders list --email ada@example.com
//!
//! # Register users from a YAML fixture
//! mocktail-cli seed fixtures/users.yaml
//!
//! # Report (and optionally reset) malformed stored values
//! mocktail-cli store check --repair
//! ```
//!
//! Every command except `catalog` works on the durable store file named by
//! `--data` or `STOREFRONT_DATA_PATH` (default `data/store.json`). Run it
//! while the storefront is stopped; the server keeps its own copy in memory.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use mocktail_storefront::storage::FileStore;

mod commands;

#[derive(Parser)]
#[command(name = "mocktail-cli")]
#[command(author, version, about = "Mocktail Bar CLI tools")]
struct Cli {
    /// Durable store file
    #[arg(
        long,
        global = true,
        env = "STOREFRONT_DATA_PATH",
        default_value = "data/store.json"
    )]
    data: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the menu
    Catalog {
        /// Case-insensitive search over name, description and tags
        #[arg(short, long)]
        search: Option<String>,

        /// Category (`classic`, `signature`, `seasonal`, `premium` or `all`)
        #[arg(short, long)]
        category: Option<String>,

        /// Sort key (`name`, `price-low`, `price-high`, `calories`, `preparationTime`)
        #[arg(long, default_value = "name")]
        sort: String,
    },
    /// Inspect registered users
    Users {
        #[command(subcommand)]
        action: UsersAction,
    },
    /// Inspect orders
    Orders {
        #[command(subcommand)]
        action: OrdersAction,
    },
    /// Register users from a YAML fixture
    Seed {
        /// Path to the fixture file
        file: PathBuf,
    },
    /// Check the durable store
    Store {
        #[command(subcommand)]
        action: StoreAction,
    },
}

#[derive(Subcommand)]
enum UsersAction {
    /// List every registered user
    List,
}

#[derive(Subcommand)]
enum OrdersAction {
    /// List one user's orders
    List {
        /// The user's email address
        #[arg(short, long)]
        email: String,
    },
}

#[derive(Subcommand)]
enum StoreAction {
    /// Report keys whose value is malformed
    Check {
        /// Reset malformed values to empty collections
        #[arg(long)]
        repair: bool,
    },
}

fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info".into());

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env before parsing so STOREFRONT_DATA_PATH can come from it
    let _ = dotenvy::dotenv();
    init_tracing();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("Command failed: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    if let Commands::Catalog {
        search,
        category,
        sort,
    } = &cli.command
    {
        commands::catalog::list(search.as_deref(), category.as_deref(), sort)?;
        return Ok(());
    }

    let store = FileStore::open(&cli.data).await?;
    tracing::debug!(path = %store.path().display(), "Opened store");

    match cli.command {
        Commands::Catalog { .. } => {}
        Commands::Users {
            action: UsersAction::List,
        } => commands::users::list(&store).await?,
        Commands::Orders {
            action: OrdersAction::List { email },
        } => commands::orders::list(&store, &email).await?,
        Commands::Seed { file } => commands::seed::from_file(&store, &file).await?,
        Commands::Store {
            action: StoreAction::Check { repair },
        } => commands::store::check(&store, repair).await?,
    }
    Ok(())
}
