//! storefront-cart - drive the persisted storefront cart from the command line

use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use storefront_cart::config::{GatewayConfig, StorageConfig};
use storefront_cart::pricing::format_price;
use storefront_cart::{CartController, CartOutcome, FileStore, HttpCartGateway, LocalCartStore, ProductCatalog, ProductId, StaticCatalog};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "storefront-cart", about = "Storefront cart", long_about = None)]
struct Cli {
    #[command(flatten)]
    gateway: GatewayConfig,

    #[command(flatten)]
    storage: StorageConfig,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the cart
    Show,
    /// Add a product
    Add {
        product_id: u32,
        #[arg(short, long, default_value_t = 1)]
        quantity: u32,
    },
    /// Set a line's quantity (0 removes it)
    Set { product_id: u32, quantity: u32 },
    /// Remove a line
    Remove { product_id: u32 },
    /// Empty the cart
    Clear,
    /// Apply a promo code
    Discount { code: String },
    /// Drop the promo code
    RemoveDiscount,
    /// Set the shipping amount
    Shipping { amount: Decimal },
    /// List shipping options
    ShippingOptions,
    /// Hand off to checkout
    Checkout,
    /// Store a session token
    Login { token: String },
    /// Forget the session token
    Logout,
    /// Reconcile with the remote cart
    Sync,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let store = Arc::new(FileStore::new(&cli.storage.data_dir));
    let session = LocalCartStore::new(store.clone());

    match &cli.command {
        Command::Login { token } => {
            session.set_auth_token(token)?;
            println!("Session enregistrée");
            if let Some(path) = session.redirect_url()? {
                println!("-> {path}");
            }
            return Ok(());
        }
        Command::Logout => {
            session.clear_auth_token()?;
            println!("Session supprimée");
            return Ok(());
        }
        _ => {}
    }

    let catalog: Arc<dyn ProductCatalog> = match &cli.storage.catalog {
        Some(path) => Arc::new(StaticCatalog::from_json_file(path)?),
        None => Arc::new(StaticCatalog::storefront()),
    };
    let gateway = Arc::new(HttpCartGateway::new(&cli.gateway)?);
    let mut controller = CartController::new(store, gateway, catalog);
    controller.mount().await;

    let outcome = match cli.command {
        Command::Show | Command::Sync => None,
        Command::Add { product_id, quantity } => Some(controller.add_to_cart(ProductId::new(product_id), quantity).await),
        Command::Set { product_id, quantity } => Some(controller.update_quantity(ProductId::new(product_id), quantity).await),
        Command::Remove { product_id } => Some(controller.remove_from_cart(ProductId::new(product_id)).await),
        Command::Clear => Some(controller.clear_cart().await),
        Command::Discount { code } => Some(controller.apply_discount(&code).await),
        Command::RemoveDiscount => Some(controller.remove_discount().await),
        Command::Shipping { amount } => Some(controller.update_shipping(amount).await),
        Command::ShippingOptions => {
            for option in controller.shipping_options().await {
                println!("{:>3}  {:<20} {:>14}  {} ({} j)", option.id, option.name, format_price(option.price), option.description, option.estimated_days);
            }
            return Ok(());
        }
        Command::Checkout => {
            match controller.proceed_to_checkout() {
                Ok(navigation) => println!("-> {}", navigation.path()),
                Err(e) => println!("{e}"),
            }
            return Ok(());
        }
        Command::Login { .. } | Command::Logout => None,
    };

    if let Some(outcome) = outcome {
        print_outcome(&outcome);
    } else if let Some(error) = controller.error() {
        println!("{error}");
    }
    print_cart(&controller);
    Ok(())
}

fn print_outcome(outcome: &CartOutcome) {
    match (&outcome.message, &outcome.error) {
        (_, Some(error)) => println!("Erreur : {error}"),
        (Some(message), None) => println!("{message}"),
        (None, None) => {}
    }
}

fn print_cart(controller: &CartController) {
    let cart = controller.cart();
    if cart.is_empty() {
        println!("Votre panier est vide");
        return;
    }
    for line in cart.items() {
        println!("{:>3}  {:<24} x{:<3} {:>14}", line.id.value(), line.name, line.quantity, format_price(line.line_total()));
    }
    let summary = controller.summary();
    println!("Articles      {} ({} produits)", summary.item_count, summary.unique_items);
    println!("Sous-total    {}", summary.formatted_subtotal);
    println!("Livraison     {}", format_price(cart.shipping()));
    if let Some(discount) = cart.discount() {
        let code = cart.discount_code().map(|c| c.to_string()).unwrap_or_default();
        println!("Remise {code:<6} -{}", format_price(discount));
    }
    println!("Total         {}", format_price(cart.total()));
}
