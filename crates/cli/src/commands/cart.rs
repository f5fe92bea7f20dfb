//! Cart inspection and editing commands.
//!
//! Every command opens the store, applies at most one edit, waits for the
//! write to land and prints the resulting cart.

use std::fmt::Write as _;
use std::path::PathBuf;

use go_marketplace_cart::{CartConfig, CartStore, StorageBackend};
use go_marketplace_core::{CartSnapshot, CartSummary, NewLineItem, Price, PriceError, ProductId};
use rust_decimal::Decimal;
use thiserror::Error;

/// Errors that can occur while running a cart command.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("Configuration error: {0}")]
    Config(#[from] go_marketplace_cart::ConfigError),

    #[error("Invalid price: {0}")]
    Price(#[from] PriceError),

    #[error(transparent)]
    Cart(#[from] go_marketplace_cart::CartError),
}

/// A single change to apply to the cart.
#[derive(Debug)]
pub enum Edit {
    None,
    Add {
        id: ProductId,
        title: String,
        image_url: String,
        price: Decimal,
    },
    Increment(ProductId),
    Decrement(ProductId),
    SetQuantity(ProductId, u32),
    Remove(ProductId),
    Clear,
}

/// Load configuration, letting `--data-dir` override the file backend.
///
/// # Errors
///
/// Returns `CommandError::Config` if the environment is invalid.
pub fn load_config(data_dir: Option<PathBuf>) -> Result<CartConfig, CommandError> {
    let mut config = CartConfig::from_env()?;
    if let Some(dir) = data_dir {
        config.backend = StorageBackend::File { dir };
    }
    Ok(config)
}

/// Apply `edit` to the configured cart and print the result.
///
/// # Errors
///
/// Returns an error if the store cannot be opened, the edit is invalid, or
/// the result cannot be persisted.
pub async fn execute(config: &CartConfig, edit: Edit) -> Result<(), CommandError> {
    let store = CartStore::from_config(config).await?;
    apply(&store, edit)?;
    store.shutdown().await?;

    print_cart(&store.snapshot());
    Ok(())
}

fn apply(store: &CartStore, edit: Edit) -> Result<(), CommandError> {
    match edit {
        Edit::None => {}
        Edit::Add {
            id,
            title,
            image_url,
            price,
        } => {
            let price = Price::new(price)?;
            store.add_to_cart(NewLineItem::new(id, title, image_url, price));
        }
        Edit::Increment(id) => store.increment(&id),
        Edit::Decrement(id) => store.decrement(&id),
        Edit::SetQuantity(id, quantity) => store.set_quantity(&id, quantity),
        Edit::Remove(id) => store.remove(&id),
        Edit::Clear => store.clear(),
    }
    Ok(())
}

#[allow(clippy::print_stdout)]
fn print_cart(cart: &CartSnapshot) {
    print!("{}", render(cart));
}

/// Render the cart as a plain-text table with totals.
fn render(cart: &CartSnapshot) -> String {
    if cart.is_empty() {
        return "Cart is empty\n".to_string();
    }

    let mut out = String::new();
    for item in cart {
        let _ = writeln!(
            out,
            "{:<12} {:<30} {:>4} x {:>10} = {:>10}",
            item.id,
            item.title,
            item.quantity,
            item.price.display(),
            item.line_total().display()
        );
    }

    let summary = CartSummary::from(cart);
    let _ = writeln!(
        out,
        "{} item(s), subtotal {}",
        summary.item_count,
        summary.subtotal.display()
    );
    out
}
