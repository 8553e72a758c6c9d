//! CLI demo of the storefront state layer.
//!
//! Runs against an in-memory order backend by default. Pass `--http` to use
//! the backend configured through `STOREFRONT_API_URL`.

use anyhow::Context;
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;
use storefront::client::describe_metrics;
use storefront::{
    CheckoutError, Config, InMemoryOrderApi, OrderStatus, Product, ProductId, Storefront,
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env().context("invalid configuration")?;

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_filter.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    describe_metrics();

    let storefront = if std::env::args().any(|arg| arg == "--http") {
        info!(url = %config.api.base_url, "Using HTTP order backend");
        Storefront::from_config(&config).context("failed to build HTTP client")?
    } else {
        info!("Using in-memory order backend");
        Storefront::with_api(Arc::new(
            InMemoryOrderApi::new().with_latency(Duration::from_millis(50)),
        ))
        .with_action_timeout(config.action_timeout)
    };

    println!("=== Storefront Demo ===\n");

    let mug = Product::new(1, "Enamel mug", Decimal::new(1000, 2));
    let socks = Product::new(2, "Wool socks", Decimal::new(500, 2));

    println!("Checking out while signed out...");
    storefront.add_item(mug.clone()).await?;
    match storefront.checkout().await {
        Err(CheckoutError::NotAuthenticated) => println!("  refused: sign in first"),
        other => println!("  unexpected: {other:?}"),
    }

    let user = storefront.sign_in("ada@example.com", "correct horse").await?;
    println!("\nSigned in as {}", user.email);

    storefront.add_item(mug).await?;
    storefront.add_item(socks).await?;
    storefront.increment_quantity(ProductId::from(2)).await?;
    storefront.decrement_quantity(ProductId::from(2)).await?;

    println!("\nCart:");
    for item in storefront.cart_items().await {
        println!("  {} × {} @ {}", item.quantity, item.title, item.price);
    }
    println!(
        "  {} items, total {}",
        storefront.cart_total_quantity().await,
        storefront.cart_total_price().await
    );

    println!("\nChecking out...");
    let order = storefront.checkout().await?;
    println!("  placed order {} for {}", order.id, order.total);
    println!("  cart now has {} items", storefront.cart_total_quantity().await);

    println!("\nPaying order {}...", order.id);
    let change = storefront.pay_order(order.id.clone()).await?;
    println!("  {change:?}");

    println!("Paying it again...");
    let change = storefront.pay_order(order.id.clone()).await?;
    println!("  {change:?}");

    println!("\nOrders by status:");
    for status in OrderStatus::ALL {
        let orders = storefront.orders_with_status(status).await;
        println!("  {status}: {}", orders.len());
    }
    println!("Unpaid orders: {}", storefront.new_orders_count().await);

    storefront
        .shutdown(Duration::from_secs(5))
        .await
        .context("shutdown timed out")?;

    println!("\n=== Demo Complete ===");
    Ok(())
}
