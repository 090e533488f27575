//! Private keys and the accounts derived from them.

use std::fmt;
use std::str::FromStr;

use secp256k1::{Message, PublicKey, Secp256k1, SecretKey, Signing};
use tiny_keccak::{Hasher, Keccak};

use super::Address;

/// Errors raised by key handling.
#[derive(Debug, thiserror::Error)]
pub enum KeyError {
    #[error("private key must be 64 hex digits with an optional 0x prefix")]
    Malformed,

    #[error("private key is not a valid secp256k1 scalar: {0}")]
    InvalidScalar(#[from] secp256k1::Error),
}

/// A 32-byte secp256k1 secret, normalized to `0x` + lowercase hex.
///
/// `Debug` is redacted so keys never end up in log output by accident.
#[derive(Clone, PartialEq, Eq)]
pub struct PrivateKey([u8; 32]);

impl PrivateKey {
    /// Parses one input line: surrounding whitespace is trimmed, then exactly 64 hex
    /// digits (with or without `0x`) are accepted. Anything else yields `None`.
    pub fn parse(line: &str) -> Option<Self> {
        let text = line.trim();
        let digits = text.strip_prefix("0x").unwrap_or(text);
        if digits.len() != 64 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }

        let mut bytes = [0u8; 32];
        hex::decode_to_slice(digits, &mut bytes).ok()?;
        Some(Self(bytes))
    }

    /// Creates a key from raw bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Returns the key bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Returns the normalized form: `0x` followed by 64 lowercase hex digits.
    pub fn to_hex_prefixed(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

impl FromStr for PrivateKey {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or(KeyError::Malformed)
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PrivateKey(<redacted>)")
    }
}

/// A recoverable ECDSA signature over a 32-byte digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Signature {
    pub r: [u8; 32],
    pub s: [u8; 32],
    /// Recovery id, 0 or 1.
    pub y_parity: u8,
}

/// An account: a private key together with its derived address.
#[derive(Debug, Clone)]
pub struct Account {
    key: PrivateKey,
    address: Address,
}

impl Account {
    /// Derives the account for an existing private key.
    ///
    /// Fails only when the 32 bytes are not a usable secp256k1 scalar (zero or above the
    /// curve order).
    pub fn from_private_key(key: PrivateKey) -> Result<Self, KeyError> {
        Self::from_private_key_with(&Secp256k1::signing_only(), key)
    }

    /// Same as [`Account::from_private_key`] but reuses a caller-owned context.
    #[inline]
    pub fn from_private_key_with<C: Signing>(
        secp: &Secp256k1<C>,
        key: PrivateKey,
    ) -> Result<Self, KeyError> {
        let secret_key = SecretKey::from_slice(key.as_bytes())?;
        let public_key = PublicKey::from_secret_key(secp, &secret_key);
        let address = Self::derive_address(&public_key);

        Ok(Self { key, address })
    }

    /// Generates a new random account from 32 uniformly random bytes.
    #[inline]
    pub fn generate_with<C: Signing>(secp: &Secp256k1<C>) -> Result<Self, KeyError> {
        let bytes: [u8; 32] = rand::random();
        Self::from_private_key_with(secp, PrivateKey::from_bytes(bytes))
    }

    /// Derives an Ethereum address from a secp256k1 public key.
    ///
    /// Process:
    /// 1. Serialize the public key in uncompressed form (65 bytes)
    /// 2. Remove the first byte (0x04 prefix)
    /// 3. Hash the remaining 64 bytes with Keccak-256
    /// 4. Take the last 20 bytes of the hash
    #[inline]
    fn derive_address(public_key: &PublicKey) -> Address {
        let public_key_bytes = public_key.serialize_uncompressed();

        let hash = keccak256(&public_key_bytes[1..]);

        let mut address_bytes = [0u8; 20];
        address_bytes.copy_from_slice(&hash[12..]);

        Address::from_bytes(address_bytes)
    }

    /// Signs a 32-byte digest with this account's key.
    pub fn sign_digest(&self, digest: [u8; 32]) -> Result<Signature, KeyError> {
        let secp = Secp256k1::signing_only();
        let secret_key = SecretKey::from_slice(self.key.as_bytes())?;
        let signature = secp.sign_ecdsa_recoverable(&Message::from_digest(digest), &secret_key);
        let (recovery_id, compact) = signature.serialize_compact();

        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&compact[..32]);
        s.copy_from_slice(&compact[32..]);

        Ok(Signature {
            r,
            s,
            y_parity: recovery_id.to_i32() as u8,
        })
    }

    /// Returns the private key.
    pub fn private_key(&self) -> &PrivateKey {
        &self.key
    }

    /// Returns a reference to the derived address.
    #[inline]
    pub fn address(&self) -> &Address {
        &self.address
    }
}

/// Parses a block of text, one private key per line, into accounts.
///
/// Order and duplicates are preserved. Lines that are not well-formed keys, or whose
/// bytes are not a valid secp256k1 scalar, are dropped; the second value counts them
/// (blank lines are not counted).
pub fn parse_accounts<'a, I>(lines: I) -> (Vec<Account>, usize)
where
    I: IntoIterator<Item = &'a str>,
{
    let secp = Secp256k1::signing_only();
    let mut accounts = Vec::new();
    let mut rejected = 0;

    for line in lines {
        if line.trim().is_empty() {
            continue;
        }
        match PrivateKey::parse(line).map(|key| Account::from_private_key_with(&secp, key)) {
            Some(Ok(account)) => accounts.push(account),
            _ => rejected += 1,
        }
    }

    (accounts, rejected)
}

/// Keccak-256 of `data`.
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak::v256();
    hasher.update(data);
    let mut hash = [0u8; 32];
    hasher.finalize(&mut hash);
    hash
}
