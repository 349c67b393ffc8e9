//! Example payment through a wallet endpoint.
//!
//! Connects to the wallet, checks the balance, submits a payment and waits for it to
//! confirm.
//!
//! Run with:
//! ```bash
//! cargo run --example pay
//! ```
//!
//! Environment variables (a `.env` file is read too):
//! - WALLET_RPC_URL: JSON-RPC endpoint that signs for its accounts (e.g. a dev node)
//! - PAY_CHAIN_ID: Target chain (default 80002, Polygon Amoy)
//! - PAY_CURRENCY: Currency symbol (default MATIC)
//! - PAY_AMOUNT: Decimal amount (default 0.01)
//! - PAY_RECIPIENT: Recipient address
//! - EVM_PAY_*: see `evm_pay::config`

use evm_pay::provider::WalletProvider;
use evm_pay::utils::short_address;
use evm_pay::{
    BalanceOracle, GasEstimator, HttpWalletProvider, NetworkRegistry, NetworkSwitcher,
    PaymentConfig, PaymentExecutor, PaymentRequest, TransactionTracker, TxState, WalletSession,
};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let config = PaymentConfig::from_env()?;
    let chain_id: u64 = env_or("PAY_CHAIN_ID", "80002").parse()?;
    let currency = env_or("PAY_CURRENCY", "MATIC");
    let amount = env_or("PAY_AMOUNT", "0.01");
    let recipient = env_or("PAY_RECIPIENT", "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed");

    let provider = HttpWalletProvider::from_env(&config)?
        .map(|p| Arc::new(p) as Arc<dyn WalletProvider>);
    let registry = Arc::new(NetworkRegistry::default());
    let session = Arc::new(WalletSession::new(provider, registry, config));

    let wallet = session.connect().await?;
    println!("Connected {} on chain {}", short_address(&format!("{:?}", wallet.address)), wallet.chain_id);

    if wallet.chain_id != chain_id {
        let switched = NetworkSwitcher::new(Arc::clone(&session)).switch_to(chain_id).await;
        if let Some(error) = switched.error {
            anyhow::bail!("could not switch to chain {}: {}", chain_id, error.message);
        }
    }

    let balance = BalanceOracle::new(Arc::clone(&session))
        .get_balance(chain_id, &currency, wallet.address)
        .await?;
    let fee = GasEstimator::new(Arc::clone(&session))
        .estimate(chain_id, &currency, &amount, &recipient, wallet.address)
        .await;
    println!("Balance: {} {}", balance, currency);
    println!("Estimated fee: {}", fee.gas_fee);

    let request = PaymentRequest::new(amount, currency, recipient).with_description("evm-pay demo");
    let executor = PaymentExecutor::new(Arc::clone(&session));
    let result = executor.process(&request, chain_id).await;

    let Some(tx_hash) = result.transaction_hash else {
        let error = result.error.map(|e| e.message).unwrap_or_default();
        anyhow::bail!("payment failed: {}", error);
    };
    println!("Submitted {:?}", tx_hash);
    if let Some(url) = session
        .registry()
        .describe_network(chain_id)
        .and_then(|n| n.explorer_tx_url(&format!("{:?}", tx_hash)))
    {
        println!("   {}", url);
    }

    let status = TransactionTracker::new(Arc::clone(&session)).wait(tx_hash).await?;
    match status.status {
        TxState::Confirmed => println!("Confirmed in block {:?}", status.block_number),
        _ => println!("Not confirmed: {:?}", status.reason),
    }

    let handoff = executor.handoff(&request, chain_id, tx_hash).await?;
    println!("{}", serde_json::to_string_pretty(&handoff)?);
    Ok(())
}

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}
