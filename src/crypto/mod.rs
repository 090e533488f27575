//! Key handling and address derivation.
//!
//! This module provides:
//! - Private key parsing and normalization
//! - Ethereum address derivation using Keccak-256
//! - Recoverable ECDSA signing for transactions

mod address;
mod keypair;

pub use address::{Address, AddressError};
pub use keypair::{keccak256, parse_accounts, Account, KeyError, PrivateKey, Signature};
