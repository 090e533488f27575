//! Transaction assembly.
//!
//! - `builder`: batch-wide settings turned into one intent per account
//! - `fill`: nonce, gas and fee values fetched from the node
//! - `envelope`: RLP encoding and signing

mod builder;
mod envelope;
mod fill;

pub use builder::{
    parse_gwei, BuildError, Destination, FeeKind, FeeMode, Payload, TransactionBuilder,
    TransactionIntent, GWEI,
};
pub use envelope::UnsignedTx;
pub use fill::{fill, FillError};
