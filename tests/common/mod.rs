//! Scripted in-memory wallet shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use ethers::abi::AbiEncode;
use ethers::types::{Address, Transaction, TransactionReceipt, H256, U256, U64};
use evm_pay::provider::{ProviderEvent, RpcError, WalletProvider};
use evm_pay::{NetworkRegistry, PaymentConfig, WalletSession};
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet, VecDeque};
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::Instant;

/// Checksummed recipient used across tests.
pub const RECIPIENT: &str = "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed";

/// Account the mock wallet exposes.
pub fn payer() -> Address {
    Address::repeat_byte(0xa1)
}

/// Whole units to base units.
pub fn units(whole: u64, decimals: u32) -> U256 {
    U256::from(whole) * U256::exp10(decimals as usize)
}

/// Scripted transaction.
#[derive(Clone, Debug)]
pub struct MockTx {
    /// Virtual time after creation of the mock at which the receipt appears
    pub mined_after: Option<Duration>,
    /// Inclusion block
    pub block: u64,
    /// Receipt status
    pub success: bool,
}

/// Mutable state of the mock wallet.
#[derive(Debug)]
pub struct MockState {
    pub accounts: Vec<Address>,
    pub chain_id: u64,
    pub known_chains: HashSet<u64>,
    pub native_balance: U256,
    pub token_balances: HashMap<Address, U256>,
    pub token_decimals: HashMap<Address, u8>,
    pub gas: U256,
    pub gas_price: U256,
    pub head: u64,
    pub head_sequence: VecDeque<u64>,
    pub failures: HashMap<String, RpcError>,
    pub transactions: HashMap<H256, MockTx>,
    pub next_tx: Option<(H256, MockTx)>,
    pub sent: Vec<Value>,
    pub added_chains: Vec<Value>,
}

/// In-memory [`WalletProvider`] that records every request.
pub struct MockProvider {
    state: Mutex<MockState>,
    calls: Mutex<Vec<String>>,
    events: broadcast::Sender<ProviderEvent>,
    started: Instant,
}

impl MockProvider {
    /// A connected wallet on `chain_id` with one account and nothing else.
    pub fn new(chain_id: u64) -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            state: Mutex::new(MockState {
                accounts: vec![payer()],
                chain_id,
                known_chains: [chain_id].into_iter().collect(),
                native_balance: U256::zero(),
                token_balances: HashMap::new(),
                token_decimals: HashMap::new(),
                gas: U256::from(21_000u64),
                gas_price: U256::zero(),
                head: 100,
                head_sequence: VecDeque::new(),
                failures: HashMap::new(),
                transactions: HashMap::new(),
                next_tx: None,
                sent: Vec::new(),
                added_chains: Vec::new(),
            }),
            calls: Mutex::new(Vec::new()),
            events,
            started: Instant::now(),
        }
    }

    /// Mutates the scripted state.
    pub fn script(&self, f: impl FnOnce(&mut MockState)) {
        f(&mut self.state.lock().unwrap());
    }

    /// Makes `method` fail with `code`/`message`.
    pub fn fail(&self, method: &str, code: i64, message: &str) {
        self.script(|s| {
            s.failures
                .insert(method.to_string(), RpcError::new(code, message));
        });
    }

    /// Methods requested so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of requests of `method`.
    pub fn count(&self, method: &str) -> usize {
        self.calls().iter().filter(|m| m.as_str() == method).count()
    }

    /// Transactions submitted through `eth_sendTransaction`.
    pub fn sent(&self) -> Vec<Value> {
        self.state.lock().unwrap().sent.clone()
    }

    /// Chain parameters passed to `wallet_addEthereumChain`.
    pub fn added_chains(&self) -> Vec<Value> {
        self.state.lock().unwrap().added_chains.clone()
    }

    /// Pushes a wallet notification.
    pub fn emit(&self, event: ProviderEvent) {
        let _ = self.events.send(event);
    }

    fn respond(&self, method: &str, params: &Value) -> Result<Value, RpcError> {
        let mut s = self.state.lock().unwrap();
        if let Some(err) = s.failures.get(method) {
            return Err(err.clone());
        }

        match method {
            "eth_requestAccounts" | "eth_accounts" => Ok(json!(s.accounts)),
            "eth_chainId" => Ok(json!(format!("0x{:x}", s.chain_id))),
            "eth_getBalance" => Ok(json!(s.native_balance)),
            "eth_estimateGas" => Ok(json!(s.gas)),
            "eth_gasPrice" => Ok(json!(s.gas_price)),
            "eth_blockNumber" => {
                let head = s.head_sequence.pop_front().unwrap_or(s.head);
                Ok(json!(U64::from(head)))
            }
            "eth_call" => {
                let call = &params[0];
                let to = Address::from_str(call["to"].as_str().unwrap_or_default()).unwrap();
                let data = call["data"].as_str().or(call["input"].as_str()).unwrap_or_default();
                let word = match &data[..10] {
                    // balanceOf(address)
                    "0x70a08231" => s.token_balances.get(&to).copied().unwrap_or_default(),
                    // decimals()
                    "0x313ce567" => U256::from(s.token_decimals.get(&to).copied().unwrap_or(18)),
                    other => return Err(RpcError::new(-32000, format!("execution reverted: {}", other))),
                };
                Ok(json!(format!("0x{}", hex::encode(word.encode()))))
            }
            "eth_sendTransaction" => {
                s.sent.push(params[0].clone());
                let (hash, tx) = s.next_tx.take().unwrap_or_else(|| {
                    (
                        H256::from_low_u64_be(s.sent.len() as u64),
                        MockTx {
                            mined_after: None,
                            block: s.head,
                            success: true,
                        },
                    )
                });
                s.transactions.insert(hash, tx);
                Ok(json!(hash))
            }
            "eth_getTransactionByHash" => {
                let hash: H256 = serde_json::from_value(params[0].clone()).unwrap();
                match s.transactions.get(&hash) {
                    Some(_) => {
                        let tx = Transaction {
                            hash,
                            from: payer(),
                            ..Default::default()
                        };
                        Ok(serde_json::to_value(tx).unwrap())
                    }
                    None => Ok(Value::Null),
                }
            }
            "eth_getTransactionReceipt" => {
                let hash: H256 = serde_json::from_value(params[0].clone()).unwrap();
                let elapsed = self.started.elapsed();
                match s.transactions.get(&hash) {
                    Some(tx) if tx.mined_after.map(|at| elapsed >= at).unwrap_or(false) => {
                        let receipt = TransactionReceipt {
                            transaction_hash: hash,
                            block_hash: Some(H256::repeat_byte(0xbb)),
                            block_number: Some(U64::from(tx.block)),
                            from: payer(),
                            gas_used: Some(U256::from(21_000u64)),
                            effective_gas_price: Some(U256::from(30_000_000_000u64)),
                            status: Some(U64::from(u64::from(tx.success))),
                            ..Default::default()
                        };
                        Ok(serde_json::to_value(receipt).unwrap())
                    }
                    _ => Ok(Value::Null),
                }
            }
            "wallet_switchEthereumChain" => {
                let chain_id =
                    u64::from_str_radix(params[0]["chainId"].as_str().unwrap().trim_start_matches("0x"), 16).unwrap();
                if !s.known_chains.contains(&chain_id) {
                    return Err(RpcError::new(4902, format!("Unrecognized chain ID \"0x{:x}\"", chain_id)));
                }
                s.chain_id = chain_id;
                let _ = self.events.send(ProviderEvent::ChainChanged(chain_id));
                Ok(Value::Null)
            }
            "wallet_addEthereumChain" => {
                let parameter = params[0].clone();
                let chain_id =
                    u64::from_str_radix(parameter["chainId"].as_str().unwrap().trim_start_matches("0x"), 16).unwrap();
                s.known_chains.insert(chain_id);
                s.added_chains.push(parameter);
                Ok(Value::Null)
            }
            other => Err(RpcError::new(-32601, format!("method {} not supported", other))),
        }
    }
}

#[async_trait]
impl WalletProvider for MockProvider {
    async fn request(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        self.calls.lock().unwrap().push(method.to_string());
        self.respond(method, &params)
    }

    fn subscribe(&self) -> broadcast::Receiver<ProviderEvent> {
        self.events.subscribe()
    }
}

/// Session over `mock` with the default registry and a fast poll interval.
pub fn session_with(mock: &Arc<MockProvider>, config: PaymentConfig) -> Arc<WalletSession> {
    let provider: Arc<dyn WalletProvider> = mock.clone();
    Arc::new(WalletSession::new(
        Some(provider),
        Arc::new(NetworkRegistry::default()),
        config,
    ))
}

/// Connected session over a fresh mock on `chain_id`.
pub async fn connected(chain_id: u64) -> (Arc<MockProvider>, Arc<WalletSession>) {
    let mock = Arc::new(MockProvider::new(chain_id));
    let session = session_with(&mock, PaymentConfig::default());
    session.connect().await.unwrap();
    (mock, session)
}

/// Installs a test subscriber once; repeated calls are ignored.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}
