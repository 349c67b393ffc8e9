//! ERC-20 calls used by the payment subsystem.
//!
//! Only the three functions the subsystem touches are declared. Calls are encoded into
//! plain [`TransactionRequest`]s so they can go through the wallet provider like any
//! other request.

use crate::errors::{PaymentError, Result};
use ethers::abi::{AbiDecode, AbiEncode};
use ethers::types::{Address, Bytes, TransactionRequest, U256};

pub use bindings::*;

#[allow(missing_docs)]
mod bindings {
    use ethers::contract::abigen;

    abigen!(
        Erc20Token,
        r#"[
            function balanceOf(address owner) external view returns (uint256)
            function transfer(address to, uint256 amount) external returns (bool)
            function decimals() external view returns (uint8)
        ]"#
    );
}

/// `balanceOf(owner)` call against `token`.
pub fn balance_of_request(token: Address, owner: Address) -> TransactionRequest {
    TransactionRequest::new()
        .to(token)
        .data(BalanceOfCall { owner }.encode())
}

/// `decimals()` call against `token`.
pub fn decimals_request(token: Address) -> TransactionRequest {
    TransactionRequest::new().to(token).data(DecimalsCall.encode())
}

/// `transfer(to, amount)` sent by `from` to `token`. Carries no native value.
pub fn transfer_request(from: Address, token: Address, to: Address, amount: U256) -> TransactionRequest {
    TransactionRequest::new()
        .from(from)
        .to(token)
        .data(TransferCall { to, amount }.encode())
}

/// Decodes the return data of `balanceOf`.
pub fn decode_balance(output: &Bytes) -> Result<U256> {
    BalanceOfReturn::decode(output.as_ref())
        .map(|ret| ret.0)
        .map_err(|e| PaymentError::ProviderError(format!("balanceOf returned malformed data: {}", e)))
}

/// Decodes the return data of `decimals`.
pub fn decode_decimals(output: &Bytes) -> Result<u8> {
    DecimalsReturn::decode(output.as_ref())
        .map(|ret| ret.0)
        .map_err(|e| PaymentError::ProviderError(format!("decimals returned malformed data: {}", e)))
}
