//! currency.rs — chain policy consumed by coin selection and building:
//! dust and denomination rules, time-lock interpretation, the transaction
//! size model, and the textual address codec.

use cryptonote_crypto::{cn_fast_hash, PublicKey};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tx_builder::serial::{read_varint, write_varint};
use tx_builder::{AccountPublicAddress, Amount, Height, UnlockMoment};

/// Unlock values below this are block heights; above, unix timestamps.
pub const MAX_BLOCK_NUMBER: u64 = 500_000_000;
/// Grace window (in blocks) when deciding whether a locked output is
/// spendable at the next height.
pub const LOCKED_TX_ALLOWED_DELTA_BLOCKS: u64 = 1;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CurrencyError {
    #[error("could not parse address {0}")]
    BadAddress(String),
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Currency {
    pub current_transaction_version: u64,
    pub minimum_fee: Amount,
    pub default_dust_threshold: Amount,
    /// Varint tag prepended to serialized addresses.
    pub address_prefix: u64,
    /// Seconds between blocks; scales the timestamp grace window.
    pub difficulty_target: u64,
}

impl Default for Currency {
    fn default() -> Self {
        Self {
            current_transaction_version: 1,
            minimum_fee: 1_000_000,
            default_dust_threshold: 1_000_000,
            address_prefix: 6,
            difficulty_target: 120,
        }
    }
}

/// True iff `amount` is `d·10^p` with `d` in 1..=9 — the denominations a
/// transaction output may carry without fragmenting into change dust.
pub fn is_pretty_amount(amount: Amount) -> bool {
    if amount == 0 {
        return false;
    }
    let mut am = amount;
    while am % 10 == 0 {
        am /= 10;
    }
    am <= 9
}

/// `(digit, leading)` where `amount` has `digit + 1` decimal digits and
/// `leading` is the most significant one.
pub fn digit_and_leading(amount: Amount) -> (u32, u64) {
    let mut am = amount;
    let mut digit = 0u32;
    while am > 9 {
        digit += 1;
        am /= 10;
    }
    (digit, am)
}

impl Currency {
    /// Dust cannot travel as a single denominated output: either the amount
    /// is not of the `d·10^p` form, or it sits below the dust threshold.
    pub fn is_dust(&self, amount: Amount) -> bool {
        !is_pretty_amount(amount) || amount < self.default_dust_threshold
    }

    pub fn is_transaction_spend_time_unlocked(
        &self,
        unlock_time: UnlockMoment,
        block_height: Height,
        block_time: u64,
    ) -> bool {
        if unlock_time < MAX_BLOCK_NUMBER {
            u64::from(block_height) + LOCKED_TX_ALLOWED_DELTA_BLOCKS >= unlock_time
        } else {
            block_time + self.difficulty_target * LOCKED_TX_ALLOWED_DELTA_BLOCKS >= unlock_time
        }
    }

    pub fn account_address_as_string(&self, address: &AccountPublicAddress) -> String {
        let mut data = Vec::with_capacity(10 + 64 + 4);
        write_varint(&mut data, self.address_prefix);
        data.extend_from_slice(&address.spend_public_key.0);
        data.extend_from_slice(&address.view_public_key.0);
        let checksum = cn_fast_hash(&data);
        data.extend_from_slice(&checksum.0[..4]);
        hex::encode(data)
    }

    pub fn parse_account_address_string(
        &self,
        text: &str,
    ) -> Result<AccountPublicAddress, CurrencyError> {
        let bad = || CurrencyError::BadAddress(text.to_string());
        let data = hex::decode(text).map_err(|_| bad())?;
        let mut reader = data.as_slice();
        let prefix = read_varint(&mut reader).map_err(|_| bad())?;
        if prefix != self.address_prefix || reader.len() != 64 + 4 {
            return Err(bad());
        }
        let body_len = data.len() - 4;
        let checksum = cn_fast_hash(&data[..body_len]);
        if checksum.0[..4] != data[body_len..] {
            return Err(bad());
        }
        let mut spend = [0u8; 32];
        spend.copy_from_slice(&reader[..32]);
        let mut view = [0u8; 32];
        view.copy_from_slice(&reader[32..64]);
        Ok(AccountPublicAddress {
            spend_public_key: PublicKey(spend),
            view_public_key: PublicKey(view),
        })
    }

    /// Upper bound on the serialized size of a transaction with the given
    /// shape. Varints are counted at their worst case, so the estimate is
    /// safe to compare against block size limits.
    pub fn get_maximum_tx_size(
        &self,
        inputs_count: usize,
        outputs_count: usize,
        anonymity: usize,
    ) -> usize {
        const KEY_IMAGE_SIZE: usize = 32;
        const OUTPUT_KEY_SIZE: usize = 32;
        const AMOUNT_SIZE: usize = 10;
        const IO_COUNT_SIZE: usize = 3;
        const GLOBAL_INDEX_SIZE: usize = 5;
        const SIGNATURE_SIZE: usize = 64;
        const EXTRA_TAG_SIZE: usize = 1;
        const INPUT_TAG_SIZE: usize = 1;
        const OUTPUT_TAG_SIZE: usize = 1;
        const PUBLIC_KEY_SIZE: usize = 32;
        const TRANSACTION_VERSION_SIZE: usize = 1;
        const TRANSACTION_UNLOCK_TIME_SIZE: usize = 10;

        let header_size = TRANSACTION_VERSION_SIZE
            + TRANSACTION_UNLOCK_TIME_SIZE
            + EXTRA_TAG_SIZE
            + PUBLIC_KEY_SIZE;
        let input_size = INPUT_TAG_SIZE
            + AMOUNT_SIZE
            + KEY_IMAGE_SIZE
            + SIGNATURE_SIZE
            + IO_COUNT_SIZE
            + GLOBAL_INDEX_SIZE
            + anonymity * (GLOBAL_INDEX_SIZE + SIGNATURE_SIZE);
        let output_size = AMOUNT_SIZE + OUTPUT_TAG_SIZE + OUTPUT_KEY_SIZE;
        header_size + outputs_count * output_size + inputs_count * input_size
    }
}

/// Split an amount into `d·10^p` denominations, returning the chunks
/// (ascending by digit position) and the sub-threshold remainder. Change
/// outputs are produced from the chunks; the remainder is donated to fee.
pub fn decompose_amount(amount: Amount, dust_threshold: Amount) -> (Vec<Amount>, Amount) {
    let mut chunks = Vec::new();
    let mut dust = 0u64;
    let mut rest = amount;
    let mut order: Amount = 1;
    while rest > 0 {
        let chunk = (rest % 10) * order;
        rest /= 10;
        if chunk > 0 {
            if chunk >= dust_threshold {
                chunks.push(chunk);
            } else {
                dust += chunk;
            }
        }
        order = order.saturating_mul(10);
    }
    (chunks, dust)
}
