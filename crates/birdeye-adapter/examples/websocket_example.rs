/*
[INPUT]:  BIRDEYE_API_KEY environment variable
[OUTPUT]: Live price candles and large trades printed to stdout
[POS]:    Examples - WebSocket stream handling
[UPDATE]: When WebSocket API changes
*/

use birdeye_adapter::ws::subscription::{Currency, LargeTradeTxsFilter, PriceFilter};
use birdeye_adapter::*;
use tokio::time::{Duration, sleep};
use tracing_subscriber::EnvFilter;

const SOL: &str = "So11111111111111111111111111111111111111112";

/// Example: stream SOL one-minute candles and large trades on Solana
///
/// Run with `RUST_LOG=birdeye_adapter=debug` to see connection and
/// subscription logs.
#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    println!("=== Birdeye WebSocket Example ===\n");

    let api_key = api_key_from_env()?;
    let ws = BirdeyeWebSocket::new(Chain::Solana, api_key)?;

    // Register channels before connecting so no early event is missed
    let mut prices = ws.new_channel(Category::Price);
    let mut trades = ws.new_channel(Category::LargeTradeTxs);

    ws.connect().await?;
    println!("✓ Connected ({:?})", ws.state());

    ws.subscribe(SubscriptionFilter::Price(PriceFilter::new(
        SOL,
        ChartType::OneMinute,
        Currency::Usd,
    )))
    .await?;
    ws.subscribe(SubscriptionFilter::LargeTradeTxs(LargeTradeTxsFilter {
        min_volume: 10_000.0,
        max_volume: None,
    }))
    .await?;
    println!("✓ Subscribed to SOL candles and trades above $10k\n");

    let deadline = sleep(Duration::from_secs(60));
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            _ = &mut deadline => break,
            Some(event) = prices.recv() => {
                if let WsEvent::Price(price) = event {
                    println!(
                        "{} o={} h={} l={} c={} v={}",
                        price.symbol, price.o, price.h, price.l, price.c, price.v
                    );
                }
            }
            Some(event) = trades.recv() => {
                if let WsEvent::LargeTradeTxs(trade) = event {
                    println!("large trade {} ${:.0}", trade.tx_hash, trade.volume_usd);
                }
            }
        }
    }

    ws.close().await;
    println!("\n✓ WebSocket example complete");
    Ok(())
}
