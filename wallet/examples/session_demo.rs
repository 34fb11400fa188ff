//! Example: create, lock, unlock and auto-lock a wallet session
//!
//! Run with `RUST_LOG=info` to see the session log.

use shade_crypto::truncate_address;
use shade_wallet::{
    AutoLockConfig, AutoLockManager, MemoryStore, SharedSession, WalletConfig, WalletSession,
};
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let mut config = WalletConfig::default();
    config.with_env_overrides()?;
    println!("=== Shade Wallet Session ({}) ===\n", config.network);

    let session: SharedSession<MemoryStore> =
        SharedSession::new(WalletSession::open(MemoryStore::new(), &config)?);

    println!("1. Creating a 12-word wallet...");
    let mnemonic = session.create_wallet("correcthorse123", 12).await?;
    println!("   Recovery phrase has {} words (write it down)", mnemonic.split(' ').count());
    drop(mnemonic);

    let snapshot = session.snapshot().await;
    for account in &snapshot.derived_wallets {
        println!(
            "   #{} {}  {}",
            account.index,
            truncate_address(&account.public_key, 4),
            account.path
        );
    }

    println!("\n2. Stealth address #0...");
    let stealth = session.get_stealth_address(0).await?;
    println!("   {}  {}", stealth.public_key, stealth.path);

    println!("\n3. Signing with account #1...");
    session.switch_wallet(1).await?;
    let signature = session.sign_transaction(b"demo transaction").await?;
    println!("   signature: {}...", hex::encode(&signature[..8]));

    println!("\n4. Auto-lock after 2 seconds of inactivity...");
    let manager = Arc::new(AutoLockManager::new(
        session.clone(),
        AutoLockConfig::with_timeout(Duration::from_secs(2)),
    ));
    manager
        .set_on_lock(|| println!("   wallet locked due to inactivity"))
        .await;
    let monitor = manager.clone().start_monitor_with_interval(Duration::from_millis(250));

    tokio::time::sleep(Duration::from_secs(3)).await;
    println!("   state: {:?}", session.state().await);

    println!("\n5. Unlocking again...");
    manager.unlock("correcthorse123").await?;
    println!(
        "   active account: #{}",
        session.snapshot().await.active_wallet_index
    );

    monitor.abort();
    Ok(())
}
