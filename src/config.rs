//! Runtime configuration for the payment subsystem.
//!
//! Everything has a sensible default; [`PaymentConfig::from_env`] overrides individual
//! values from `EVM_PAY_*` environment variables.

use crate::errors::{PaymentError, Result};
use std::str::FromStr;
use std::time::Duration;

/// Poll interval override, in milliseconds.
pub const POLL_INTERVAL_ENV: &str = "EVM_PAY_POLL_INTERVAL_MS";
/// Default required confirmations override.
pub const CONFIRMATIONS_ENV: &str = "EVM_PAY_CONFIRMATIONS";
/// Confirmation wait bound override, in milliseconds.
pub const CONFIRMATION_TIMEOUT_ENV: &str = "EVM_PAY_CONFIRMATION_TIMEOUT_MS";
/// Wallet request timeout override, in milliseconds.
pub const RPC_TIMEOUT_ENV: &str = "EVM_PAY_RPC_TIMEOUT_MS";
/// Chain to switch to right after connecting.
pub const PREFERRED_CHAIN_ENV: &str = "EVM_PAY_PREFERRED_CHAIN_ID";

/// Configuration shared by the session, executor and tracker.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PaymentConfig {
    /// How often the tracker polls for a receipt while waiting
    pub poll_interval: Duration,

    /// Confirmations required when the caller does not say
    pub required_confirmations: u64,

    /// Upper bound on a confirmation wait when the caller does not say
    pub confirmation_timeout: Duration,

    /// Timeout of a single wallet request (HTTP provider only)
    pub rpc_timeout: Duration,

    /// Chain the session switches to after connecting, if any
    pub preferred_chain_id: Option<u64>,
}

impl PaymentConfig {
    /// Creates a configuration with default values.
    ///
    /// # Examples
    ///
    /// ```
    /// use evm_pay::config::PaymentConfig;
    /// use std::time::Duration;
    ///
    /// let config = PaymentConfig::new()
    ///     .with_required_confirmations(3)
    ///     .with_preferred_chain(80002);
    /// assert_eq!(config.confirmation_timeout, Duration::from_secs(60));
    /// assert_eq!(config.preferred_chain_id, Some(80002));
    /// ```
    pub fn new() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            required_confirmations: 1,
            confirmation_timeout: Duration::from_millis(60_000),
            rpc_timeout: Duration::from_secs(30),
            preferred_chain_id: None,
        }
    }

    /// Sets the receipt poll interval.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Sets the default number of confirmations.
    pub fn with_required_confirmations(mut self, confirmations: u64) -> Self {
        self.required_confirmations = confirmations;
        self
    }

    /// Sets the default confirmation wait bound.
    pub fn with_confirmation_timeout(mut self, timeout: Duration) -> Self {
        self.confirmation_timeout = timeout;
        self
    }

    /// Sets the wallet request timeout.
    pub fn with_rpc_timeout(mut self, timeout: Duration) -> Self {
        self.rpc_timeout = timeout;
        self
    }

    /// Sets the chain to switch to after connecting.
    pub fn with_preferred_chain(mut self, chain_id: u64) -> Self {
        self.preferred_chain_id = Some(chain_id);
        self
    }

    /// Loads the configuration from `EVM_PAY_*` environment variables over the defaults.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::new();
        if let Some(ms) = env_value::<u64>(POLL_INTERVAL_ENV)? {
            config.poll_interval = Duration::from_millis(ms);
        }
        if let Some(n) = env_value::<u64>(CONFIRMATIONS_ENV)? {
            config.required_confirmations = n;
        }
        if let Some(ms) = env_value::<u64>(CONFIRMATION_TIMEOUT_ENV)? {
            config.confirmation_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = env_value::<u64>(RPC_TIMEOUT_ENV)? {
            config.rpc_timeout = Duration::from_millis(ms);
        }
        config.preferred_chain_id = env_value::<u64>(PREFERRED_CHAIN_ENV)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that the values are usable.
    pub fn validate(&self) -> Result<()> {
        if self.poll_interval.is_zero() {
            return Err(PaymentError::Config("poll interval must be non-zero".to_string()));
        }
        if self.required_confirmations == 0 {
            return Err(PaymentError::Config(
                "required confirmations must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self::new()
    }
}

fn env_value<T: FromStr>(name: &str) -> Result<Option<T>>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| PaymentError::Config(format!("{}={}: {}", name, raw, e))),
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PaymentConfig::default();
        assert_eq!(config.poll_interval, Duration::from_secs(1));
        assert_eq!(config.required_confirmations, 1);
        assert_eq!(config.confirmation_timeout, Duration::from_secs(60));
        assert!(config.preferred_chain_id.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builders() {
        let config = PaymentConfig::new()
            .with_poll_interval(Duration::from_millis(250))
            .with_confirmation_timeout(Duration::from_secs(5))
            .with_rpc_timeout(Duration::from_secs(10))
            .with_required_confirmations(12);

        assert_eq!(config.poll_interval, Duration::from_millis(250));
        assert_eq!(config.confirmation_timeout, Duration::from_secs(5));
        assert_eq!(config.rpc_timeout, Duration::from_secs(10));
        assert_eq!(config.required_confirmations, 12);
    }

    #[test]
    fn test_validate() {
        assert!(PaymentConfig::new()
            .with_required_confirmations(0)
            .validate()
            .is_err());
        assert!(PaymentConfig::new()
            .with_poll_interval(Duration::ZERO)
            .validate()
            .is_err());
    }

    #[test]
    fn test_env_value() {
        std::env::set_var("EVM_PAY_TEST_ONLY_VALUE", "42");
        assert_eq!(env_value::<u64>("EVM_PAY_TEST_ONLY_VALUE").unwrap(), Some(42));

        std::env::set_var("EVM_PAY_TEST_ONLY_VALUE", "forty-two");
        assert!(env_value::<u64>("EVM_PAY_TEST_ONLY_VALUE").is_err());

        std::env::remove_var("EVM_PAY_TEST_ONLY_VALUE");
        assert_eq!(env_value::<u64>("EVM_PAY_TEST_ONLY_VALUE").unwrap(), None);
    }
}
