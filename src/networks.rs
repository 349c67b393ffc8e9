//! Supported networks and per-network asset tables.
//!
//! The registry is a static catalog built once at startup. Every chain owns its own
//! asset table: the same symbol (e.g. `USDT`) resolves to a different contract address
//! on each chain, and a symbol missing from a chain's table is unsupported there.

use ethers::types::Address;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Ethereum mainnet.
pub const CHAIN_ID_ETHEREUM: u64 = 1;
/// BNB Smart Chain mainnet.
pub const CHAIN_ID_BSC: u64 = 56;
/// Polygon PoS mainnet.
pub const CHAIN_ID_POLYGON: u64 = 137;
/// Polygon Amoy testnet.
pub const CHAIN_ID_POLYGON_AMOY: u64 = 80002;
/// Sepolia testnet.
pub const CHAIN_ID_SEPOLIA: u64 = 11155111;

/// Descriptor of a chain's native currency.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct NativeCurrency {
    /// Display name
    pub name: String,

    /// Ticker symbol
    pub symbol: String,

    /// Decimal precision (18 on every EVM chain in the catalog)
    pub decimals: u8,
}

/// Static description of one supported chain.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct NetworkConfig {
    /// Chain id
    #[serde(rename = "chainId")]
    pub chain_id: u64,

    /// Display name
    pub name: String,

    /// Native currency descriptor
    #[serde(rename = "nativeCurrency")]
    pub native_currency: NativeCurrency,

    /// JSON-RPC endpoints
    #[serde(rename = "rpcUrls")]
    pub rpc_urls: Vec<String>,

    /// Block explorer base URLs
    #[serde(rename = "blockExplorerUrls")]
    pub block_explorer_urls: Vec<String>,

    /// Whether this is a test network
    #[serde(rename = "isTestnet")]
    pub is_testnet: bool,
}

impl NetworkConfig {
    /// Returns the explorer link for a transaction hash, if the network has an explorer.
    pub fn explorer_tx_url(&self, tx_hash: &str) -> Option<String> {
        self.block_explorer_urls
            .first()
            .map(|base| format!("{}/tx/{}", base.trim_end_matches('/'), tx_hash))
    }
}

/// An asset accepted on a specific chain.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct AssetDescriptor {
    /// Ticker symbol
    pub symbol: String,

    /// Token contract; the zero address marks the native currency
    pub address: Address,

    /// Decimal precision
    pub decimals: u8,
}

impl AssetDescriptor {
    /// Describes the native currency of a chain.
    pub fn native(symbol: impl Into<String>, decimals: u8) -> Self {
        Self {
            symbol: symbol.into(),
            address: Address::zero(),
            decimals,
        }
    }

    /// Describes a token contract.
    pub fn token(symbol: impl Into<String>, address: Address, decimals: u8) -> Self {
        Self {
            symbol: symbol.into(),
            address,
            decimals,
        }
    }

    /// Whether this asset is the chain's native currency.
    pub fn is_native(&self) -> bool {
        self.address.is_zero()
    }
}

#[derive(Debug, Clone)]
struct NetworkEntry {
    config: NetworkConfig,
    assets: Vec<AssetDescriptor>,
}

/// Catalog of supported chains keyed by chain id.
#[derive(Debug, Clone)]
pub struct NetworkRegistry {
    networks: BTreeMap<u64, NetworkEntry>,
}

impl NetworkRegistry {
    /// Creates an empty registry.
    pub fn empty() -> Self {
        Self {
            networks: BTreeMap::new(),
        }
    }

    /// Adds (or replaces) a network together with its asset table.
    ///
    /// Intended for startup; the registry is not mutated once handed to the executor.
    pub fn with_network(mut self, config: NetworkConfig, assets: Vec<AssetDescriptor>) -> Self {
        self.networks
            .insert(config.chain_id, NetworkEntry { config, assets });
        self
    }

    /// Looks up a network.
    pub fn describe_network(&self, chain_id: u64) -> Option<&NetworkConfig> {
        self.networks.get(&chain_id).map(|entry| &entry.config)
    }

    /// Looks up an asset by symbol (case-insensitive) on a chain.
    pub fn describe_asset(&self, chain_id: u64, symbol: &str) -> Option<&AssetDescriptor> {
        self.networks
            .get(&chain_id)?
            .assets
            .iter()
            .find(|asset| asset.symbol.eq_ignore_ascii_case(symbol))
    }

    /// Symbols accepted on a chain, native currency first. Empty for unknown chains.
    pub fn list_supported_assets(&self, chain_id: u64) -> Vec<String> {
        self.networks
            .get(&chain_id)
            .map(|entry| entry.assets.iter().map(|a| a.symbol.clone()).collect())
            .unwrap_or_default()
    }

    /// Whether the chain is in the catalog.
    pub fn is_supported(&self, chain_id: u64) -> bool {
        self.networks.contains_key(&chain_id)
    }

    /// Whether the chain is a known test network.
    pub fn is_testnet(&self, chain_id: u64) -> bool {
        self.describe_network(chain_id)
            .map(|config| config.is_testnet)
            .unwrap_or(false)
    }

    /// Symbol of the chain's native currency.
    pub fn native_symbol(&self, chain_id: u64) -> Option<&str> {
        self.describe_network(chain_id)
            .map(|config| config.native_currency.symbol.as_str())
    }

    /// All mainnets in the catalog.
    pub fn mainnets(&self) -> Vec<&NetworkConfig> {
        self.networks
            .values()
            .map(|entry| &entry.config)
            .filter(|config| !config.is_testnet)
            .collect()
    }

    /// All test networks in the catalog.
    pub fn testnets(&self) -> Vec<&NetworkConfig> {
        self.networks
            .values()
            .map(|entry| &entry.config)
            .filter(|config| config.is_testnet)
            .collect()
    }
}

impl Default for NetworkRegistry {
    fn default() -> Self {
        Self::empty()
            .with_network(
                network(CHAIN_ID_ETHEREUM, "Ethereum Mainnet", "Ether", "ETH", false,
                    "https://ethereum-rpc.publicnode.com", "https://etherscan.io"),
                vec![
                    AssetDescriptor::native("ETH", 18),
                    AssetDescriptor::token("USDT", addr("0xdAC17F958D2ee523a2206206994597C13D831ec7"), 6),
                    AssetDescriptor::token("USDC", addr("0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48"), 6),
                    AssetDescriptor::token("DAI", addr("0x6B175474E89094C44Da98b954EedeAC495271d0F"), 18),
                ],
            )
            .with_network(
                network(CHAIN_ID_BSC, "BNB Smart Chain", "BNB", "BNB", false,
                    "https://bsc-dataseed.binance.org", "https://bscscan.com"),
                vec![
                    AssetDescriptor::native("BNB", 18),
                    AssetDescriptor::token("USDT", addr("0x55d398326f99059fF775485246999027B3197955"), 18),
                    AssetDescriptor::token("USDC", addr("0x8AC76a51cc950d9822D68b83fE1Ad97B32Cd580d"), 18),
                ],
            )
            .with_network(
                network(CHAIN_ID_POLYGON, "Polygon Mainnet", "MATIC", "MATIC", false,
                    "https://polygon-rpc.com", "https://polygonscan.com"),
                vec![
                    AssetDescriptor::native("MATIC", 18),
                    AssetDescriptor::token("USDT", addr("0xc2132D05D31c914a87C6611C10748AEb04B58e8F"), 6),
                    AssetDescriptor::token("USDC", addr("0x3c499c542cEF5E3811e1192ce70d8cC03d5c3359"), 6),
                    AssetDescriptor::token("DAI", addr("0x8f3Cf7ad23Cd3CaDbD9735AFf958023239c6A063"), 18),
                ],
            )
            .with_network(
                network(CHAIN_ID_SEPOLIA, "Sepolia Testnet", "Sepolia Ether", "ETH", true,
                    "https://ethereum-sepolia-rpc.publicnode.com", "https://sepolia.etherscan.io"),
                vec![
                    AssetDescriptor::native("ETH", 18),
                    AssetDescriptor::token("USDC", addr("0x1c7D4B196Cb0C7B01d743Fbc6116a902379C7238"), 6),
                ],
            )
            .with_network(
                network(CHAIN_ID_POLYGON_AMOY, "Polygon Amoy Testnet", "MATIC", "MATIC", true,
                    "https://rpc-amoy.polygon.technology", "https://amoy.polygonscan.com"),
                vec![
                    AssetDescriptor::native("MATIC", 18),
                    AssetDescriptor::token("USDC", addr("0x41E94Eb019C0762f9Bfcf9Fb1E58725BfB0e7582"), 6),
                ],
            )
    }
}

fn network(
    chain_id: u64,
    name: &str,
    currency_name: &str,
    symbol: &str,
    is_testnet: bool,
    rpc_url: &str,
    explorer_url: &str,
) -> NetworkConfig {
    NetworkConfig {
        chain_id,
        name: name.to_string(),
        native_currency: NativeCurrency {
            name: currency_name.to_string(),
            symbol: symbol.to_string(),
            decimals: 18,
        },
        rpc_urls: vec![rpc_url.to_string()],
        block_explorer_urls: vec![explorer_url.to_string()],
        is_testnet,
    }
}

fn addr(s: &str) -> Address {
    s.parse().expect("valid built-in token address")
}
