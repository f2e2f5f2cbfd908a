use cryptonote_crypto::{cn_fast_hash, Hash, KeyImage, PublicKey, SecretKey, Signature};
use serde::{Deserialize, Serialize};

pub type Amount = u64;
pub type Height = u32;
pub type UnlockMoment = u64;

/// Ring spend of an output with a plaintext amount. `output_indexes` holds
/// the ring members' global indexes in relative (delta) form.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyInput {
    pub amount: Amount,
    pub output_indexes: Vec<u32>,
    pub key_image: KeyImage,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionInput {
    Coinbase { height: Height },
    Key(KeyInput),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputTarget {
    Key(PublicKey),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionOutput {
    pub amount: Amount,
    pub target: OutputTarget,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionPrefix {
    pub version: u64,
    pub unlock_time: UnlockMoment,
    pub inputs: Vec<TransactionInput>,
    pub outputs: Vec<TransactionOutput>,
    pub extra: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub prefix: TransactionPrefix,
    /// One signature row per input; row length equals the input's ring size.
    pub signatures: Vec<Vec<Signature>>,
}

impl Transaction {
    pub fn hash(&self) -> Hash {
        cn_fast_hash(&crate::serial::serialize_transaction(self))
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountPublicAddress {
    pub spend_public_key: PublicKey,
    pub view_public_key: PublicKey,
}

#[derive(Clone)]
pub struct AccountKeys {
    pub address: AccountPublicAddress,
    pub spend_secret_key: SecretKey,
    pub view_secret_key: SecretKey,
}

/// A chain output usable as a ring member. For decoys only `amount`,
/// `global_index` and `public_key` are meaningful; the remaining fields
/// describe the real spend.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceOutput {
    pub amount: Amount,
    pub global_index: u32,
    pub public_key: PublicKey,
    pub transaction_public_key: PublicKey,
    pub index_in_transaction: u32,
    pub key_image: KeyImage,
}
