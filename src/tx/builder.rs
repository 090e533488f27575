//! Assembly of per-account transaction intents.

use crate::crypto::{Account, Address};

/// Wei per gwei.
pub const GWEI: u128 = 1_000_000_000;

/// Errors raised while validating builder inputs.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BuildError {
    #[error("payload is not valid hex: {0:?}")]
    InvalidHex(String),

    #[error("invalid gwei amount {0:?} (decimal with at most 9 fractional digits)")]
    InvalidAmount(String),
}

/// Where each account's transaction goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
    /// Every account sends to itself
    SelfTransfer,
    /// Every account sends to one shared address
    Fixed(Address),
}

/// Source of the calldata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// UTF-8 text, sent as its bytes
    Text(String),
    /// Literal hex, `0x` optional
    Hex(String),
}

impl Payload {
    /// Decodes the payload into calldata bytes. Empty input yields empty calldata.
    pub fn to_bytes(&self) -> Result<Vec<u8>, BuildError> {
        match self {
            Payload::Text(text) => Ok(text.as_bytes().to_vec()),
            Payload::Hex(text) => {
                let trimmed = text.trim();
                let digits = trimmed.strip_prefix("0x").unwrap_or(trimmed);
                hex::decode(digits).map_err(|_| BuildError::InvalidHex(text.clone()))
            }
        }
    }
}

/// Which fee field a user-supplied amount overrides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FeeKind {
    /// Total gas price
    Flat,
    /// Extra miner tip on top of the base fee
    #[default]
    Tip,
}

/// Fee override applied to every intent of a cycle. Amounts are in wei.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FeeMode {
    /// Let the node decide
    #[default]
    None,
    /// Legacy `gasPrice`
    FlatPrice(u128),
    /// EIP-1559 `maxPriorityFeePerGas`
    PriorityTip(u128),
}

impl FeeMode {
    /// Builds the fee mode from a gwei amount. Zero or negative amounts mean no override.
    pub fn from_gwei(kind: FeeKind, amount: &str) -> Result<Self, BuildError> {
        let wei = parse_gwei(amount)?;
        Ok(match (wei, kind) {
            (0, _) => FeeMode::None,
            (wei, FeeKind::Flat) => FeeMode::FlatPrice(wei),
            (wei, FeeKind::Tip) => FeeMode::PriorityTip(wei),
        })
    }

    pub fn gas_price(&self) -> Option<u128> {
        match self {
            FeeMode::FlatPrice(wei) => Some(*wei),
            _ => None,
        }
    }

    pub fn priority_fee(&self) -> Option<u128> {
        match self {
            FeeMode::PriorityTip(wei) => Some(*wei),
            _ => None,
        }
    }
}

/// Converts a decimal gwei amount to wei, exactly.
///
/// Empty input and well-formed negative amounts yield zero.
pub fn parse_gwei(amount: &str) -> Result<u128, BuildError> {
    let text = amount.trim();
    if text.is_empty() {
        return Ok(0);
    }

    let invalid = || BuildError::InvalidAmount(amount.to_string());
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };
    let (whole, frac) = digits.split_once('.').unwrap_or((digits, ""));
    if (whole.is_empty() && frac.is_empty())
        || !whole.chars().chain(frac.chars()).all(|c| c.is_ascii_digit())
    {
        return Err(invalid());
    }
    if negative {
        return Ok(0);
    }
    if frac.len() > 9 {
        return Err(invalid());
    }

    let whole: u128 = if whole.is_empty() {
        0
    } else {
        whole.parse().map_err(|_| invalid())?
    };
    let frac: u128 = if frac.is_empty() {
        0
    } else {
        format!("{:0<9}", frac).parse().map_err(|_| invalid())?
    };

    whole
        .checked_mul(GWEI)
        .and_then(|wei| wei.checked_add(frac))
        .ok_or_else(invalid)
}

/// One outbound transaction request, before node-sourced fields are filled in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionIntent {
    pub from: Address,
    pub to: Address,
    /// Always zero: the builder only carries calldata and fees.
    pub value: u128,
    pub data: Vec<u8>,
    pub fee: FeeMode,
}

/// Holds the batch-wide settings and stamps out one intent per account.
#[derive(Debug, Clone)]
pub struct TransactionBuilder {
    destination: Destination,
    data: Vec<u8>,
    fee: FeeMode,
}

impl TransactionBuilder {
    /// Validates and decodes the payload once for the whole batch.
    pub fn new(destination: Destination, payload: &Payload, fee: FeeMode) -> Result<Self, BuildError> {
        Ok(Self {
            destination,
            data: payload.to_bytes()?,
            fee,
        })
    }

    pub fn build(&self, account: &Account) -> TransactionIntent {
        let from = *account.address();
        let to = match self.destination {
            Destination::SelfTransfer => from,
            Destination::Fixed(target) => target,
        };

        TransactionIntent {
            from,
            to,
            value: 0,
            data: self.data.clone(),
            fee: self.fee,
        }
    }

    pub fn destination(&self) -> Destination {
        self.destination
    }

    pub fn fee(&self) -> FeeMode {
        self.fee
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }
}
