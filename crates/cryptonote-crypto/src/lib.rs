//! cryptonote-crypto — curve and hash primitives for CryptoNote-style wallets.
//!
//! Pieces:
//! - key newtypes (PublicKey, SecretKey, KeyImage, ...) with hex serde,
//!   matching the node JSON wire convention
//! - Keccak-based hashing: cn_fast_hash, hash_to_scalar, hash_to_point
//! - output key derivations: generate_key_derivation, derive_public_key,
//!   derive_secret_key
//! - key images and classic per-member (c, r) ring signatures
//!
//! Everything operates on canonical encodings; non-canonical scalars or
//! points surface as `CryptoError`, never as panics.

mod hash;
mod keys;
mod ring;
mod types;

pub use hash::{cn_fast_hash, hash_to_point, hash_to_scalar};
pub use keys::{
    derivation_to_scalar, derive_public_key, derive_secret_key, generate_deterministic_keys,
    generate_key_derivation, generate_key_image, generate_keys, random_scalar,
    secret_key_to_public_key,
};
pub use ring::{check_ring_signature, generate_ring_signature};
pub use types::{Hash, KeyDerivation, KeyImage, KeyPair, PublicKey, SecretKey, Signature};

#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    #[error("invalid public key")]
    InvalidPublicKey,
    #[error("invalid secret key")]
    InvalidSecretKey,
    #[error("ring must contain at least one member")]
    EmptyRing,
    #[error("real output index {index} out of range for ring of {ring_size}")]
    RealIndexOutOfRange { index: usize, ring_size: usize },
}
