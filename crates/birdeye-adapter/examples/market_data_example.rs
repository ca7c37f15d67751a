/*
[INPUT]:  BIRDEYE_API_KEY environment variable, token address
[OUTPUT]: Token price from the REST API
[POS]:    Examples - public market data queries
[UPDATE]: When adding new market data endpoints
*/

use std::sync::Arc;

use birdeye_adapter::*;

/// Example: query the current SOL price over REST
#[tokio::main]
async fn main() {
    println!("=== Birdeye Market Data Example ===\n");

    let api_key = match api_key_from_env() {
        Ok(key) => key,
        Err(e) => {
            eprintln!("{e}");
            return;
        }
    };

    let client = match BirdeyeClient::new(api_key, Arc::new(WindowLimiter::standard())) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to create client: {e}");
            return;
        }
    };
    println!("✓ HTTP client created\n");

    let address = "So11111111111111111111111111111111111111112";
    println!("Querying price for {address}...");
    match client
        .get::<serde_json::Value>("/defi/price", &[Chain::Solana], &[("address", address.to_string())])
        .await
    {
        Ok(price) => println!("✓ Price: {price}"),
        Err(e) if e.is_auth_error() => println!("✗ API key rejected: {e}"),
        Err(e) => println!("✗ Error: {e}"),
    }
}
