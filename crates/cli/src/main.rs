//! Go Marketplace CLI - inspect and edit a persisted cart.
//!
//! # Usage
//!
//! ```bash
//! # Show the cart with totals
//! gm-cart show
//!
//! # Add one unit of a product
//! gm-cart add --id 1 --title "Camiseta" --image-url https://img/1.png --price 19.90
//!
//! # Change quantities
//! gm-cart increment 1
//! gm-cart decrement 1
//! gm-cart set 1 4
//! gm-cart remove 1
//! gm-cart clear
//!
//! # Create the cart_kv table (postgres feature)
//! gm-cart migrate
//! ```
//!
//! Storage is configured through the `CART_*` environment variables; see
//! `go_marketplace_cart::config`. Logs go to stderr, as JSON lines when
//! `CART_LOG_FORMAT=json`.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use go_marketplace_core::ProductId;
use rust_decimal::Decimal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "gm-cart")]
#[command(author, version, about = "Go Marketplace cart tools")]
struct Cli {
    /// Data directory for the file backend (overrides `CART_DATA_DIR`)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the cart with totals
    Show,
    /// Add one unit of a product
    Add {
        /// Product ID
        #[arg(long)]
        id: ProductId,

        /// Display title
        #[arg(long)]
        title: String,

        /// Product image URL
        #[arg(long, default_value = "")]
        image_url: String,

        /// Unit price (e.g. 19.90)
        #[arg(long)]
        price: Decimal,
    },
    /// Add one unit to a line
    Increment {
        /// Product ID
        id: ProductId,
    },
    /// Take one unit off a line, removing it at zero
    Decrement {
        /// Product ID
        id: ProductId,
    },
    /// Set a line's quantity (0 removes it)
    Set {
        /// Product ID
        id: ProductId,

        /// New quantity
        quantity: u32,
    },
    /// Remove a line
    Remove {
        /// Product ID
        id: ProductId,
    },
    /// Empty the cart
    Clear,
    /// Create the `cart_kv` table
    #[cfg(feature = "postgres")]
    Migrate,
}

const DEFAULT_LOG_FILTER: &str = "gm_cart=info,go_marketplace_cart=info";

fn wants_json_logs(format: Option<&str>) -> bool {
    format.is_some_and(|f| f.eq_ignore_ascii_case("json"))
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // Defaults to info level for our crates if RUST_LOG is not set
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into());

    // JSON lines for log shipping, text otherwise
    let json = wants_json_logs(std::env::var("CART_LOG_FORMAT").ok().as_deref());
    let json_layer = json.then(|| {
        tracing_subscriber::fmt::layer()
            .json()
            .flatten_event(true)
            .with_writer(std::io::stderr)
    });
    let text_layer = (!json).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(text_layer)
        .init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = commands::cart::load_config(cli.data_dir)?;

    let edit = match cli.command {
        Commands::Show => commands::cart::Edit::None,
        Commands::Add {
            id,
            title,
            image_url,
            price,
        } => commands::cart::Edit::Add {
            id,
            title,
            image_url,
            price,
        },
        Commands::Increment { id } => commands::cart::Edit::Increment(id),
        Commands::Decrement { id } => commands::cart::Edit::Decrement(id),
        Commands::Set { id, quantity } => commands::cart::Edit::SetQuantity(id, quantity),
        Commands::Remove { id } => commands::cart::Edit::Remove(id),
        Commands::Clear => commands::cart::Edit::Clear,
        #[cfg(feature = "postgres")]
        Commands::Migrate => {
            commands::migrate::run(&config).await?;
            return Ok(());
        }
    };

    commands::cart::execute(&config, edit).await?;
    Ok(())
}
