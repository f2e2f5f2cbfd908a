use cryptonote_crypto::{KeyImage, PublicKey, SecretKey};
use serde::{Deserialize, Serialize};
use tx_builder::{Amount, Height, SourceOutput, UnlockMoment};

/// An output owned by the wallet, as produced by the chain scanner.
/// Immutable once observed; considered spent when its key image appears in
/// a confirmed block.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct UnspentOutput {
    pub amount: Amount,
    pub global_index: u32,
    pub height: Height,
    pub unlock_time: UnlockMoment,
    pub transaction_public_key: PublicKey,
    pub index_in_transaction: u32,
    pub public_key: PublicKey,
    pub key_image: KeyImage,
    /// Textual address the output was paid to; resolves to the wallet
    /// record holding the matching spend keys.
    pub address: String,
    /// Set by the scanner per currency policy; dust never enters the
    /// digit index and is only spent at anonymity zero.
    pub dust: bool,
}

impl UnspentOutput {
    pub fn source(&self) -> SourceOutput {
        SourceOutput {
            amount: self.amount,
            global_index: self.global_index,
            public_key: self.public_key,
            transaction_public_key: self.transaction_public_key,
            index_in_transaction: self.index_in_transaction,
            key_image: self.key_image,
        }
    }
}

/// Spend keypair tracked by the wallet, addressed by spend public key.
#[derive(Clone, Serialize, Deserialize)]
pub struct WalletRecord {
    pub spend_public_key: PublicKey,
    pub spend_secret_key: SecretKey,
}
