//! tx_builder — assembly and signing of plaintext-amount ring transactions.
//!
//! Pieces:
//! - types: transaction prefix, tagged inputs/outputs, ring source outputs
//! - serial: canonical varint + binary transaction format, prefix/inputs hashes
//! - extra: TLV extra field (tx public key, payment-id nonce)
//! - builder: staged inputs/outputs, deterministic tx keys, ring signing
//!
//! The builder owns no I/O and no wallet state; callers feed it fully
//! resolved ring members and account keys.

pub mod builder;
pub mod extra;
pub mod serial;
pub mod types;

pub use builder::{BuildError, TransactionBuilder};
pub use extra::TransactionExtra;
pub use types::{
    AccountKeys, AccountPublicAddress, Amount, Height, KeyInput, OutputTarget, SourceOutput,
    Transaction, TransactionInput, TransactionOutput, TransactionPrefix, UnlockMoment,
};
