use anyhow::Result;
use solana_sdk::pubkey::Pubkey;
use std::str::FromStr;

use clmm_lp::domain::execution::WHIRLPOOL_PROGRAM_ID;
use clmm_lp::domain::pool::PoolSource;
use clmm_lp::infrastructure::blockchain::{parse_commitment, RpcPoolSource, SolanaRpcClient};

/// Dumps a whirlpool's decoded state and the initialized ticks around its price.
///
/// Usage: inspect_whirlpool [POOL] [RPC_URL]
#[tokio::main]
async fn main() -> Result<()> {
    let mut args = std::env::args().skip(1);
    // SOL/USDC 0.04% by default
    let pool = args
        .next()
        .unwrap_or_else(|| "Czfq3xZZDmsdGdUyrNLtRhGc47cXcZtLG4crryfu44zE".to_string());
    let rpc_url = args
        .next()
        .unwrap_or_else(|| "https://api.mainnet-beta.solana.com".to_string());

    let rpc = SolanaRpcClient::new(rpc_url, parse_commitment("confirmed"));
    let source = RpcPoolSource::new(rpc, WHIRLPOOL_PROGRAM_ID);

    println!("🔍 Inspecting whirlpool: {}", pool);
    let snapshot = source.pool_snapshot(&Pubkey::from_str(&pool)?).await?;

    println!("📊 Slot: {}", snapshot.slot);
    println!("📊 Token A: {} ({} decimals)", snapshot.token_a.mint, snapshot.token_a.decimals);
    println!("📊 Token B: {} ({} decimals)", snapshot.token_b.mint, snapshot.token_b.decimals);
    println!("📊 Tick spacing: {}", snapshot.tick_spacing);
    println!("📊 Fee: {:.2} bps", snapshot.fee_rate_bps());
    println!("📊 sqrt price (Q64.64): {}", snapshot.sqrt_price_x64);
    println!("📊 Current tick: {}", snapshot.tick_current_index);
    println!("📊 Price: {:.6}", snapshot.current_price());
    println!("📊 Active liquidity: {}", snapshot.liquidity);

    let samples = source.tick_samples(&snapshot, 1).await?;
    println!("\n🔍 {} initialized ticks in the surrounding arrays:", samples.len());
    for sample in samples {
        let marker = if sample.tick <= snapshot.tick_current_index { "" } else { "  ↑" };
        println!(
            "  {:>8} | {:>14.6} | {}{}",
            sample.tick, sample.ratio_price, sample.liquidity, marker
        );
    }

    Ok(())
}
