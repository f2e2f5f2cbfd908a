//! cryptonote-wallet-core — coin selection and transaction construction for
//! a plaintext-amount ring-signature wallet.
//!
//! Pieces:
//! - Currency: dust/denomination rules, time locks, size model, address codec
//! - UnspentOutput / WalletRecord: the scanner-facing data model
//! - UnspentSelector: multi-objective coin selection with fee–size iteration
//! - MixinOracle: amount-matched decoy fetching (RPC-backed or inert)
//! - create_transaction: one-call select → mix → build → sign
//!
//! The crate holds no wallet storage and does no scanning; callers pass a
//! frozen snapshot of unspent outputs and receive a signed transaction
//! ready for relay.

pub mod currency;
pub mod mixins;
pub mod model;
pub mod selector;

pub use currency::{decompose_amount, is_pretty_amount, Currency, CurrencyError};
pub use mixins::{MixinOracle, NoopMixinOracle, RpcMixinOracle};
pub use model::{UnspentOutput, WalletRecord};
pub use selector::{
    MixinError, OptimizationLevel, SelectionError, UnspentSelector, OPTIMIZATIONS_PER_TX,
    OPTIMIZATIONS_PER_TX_AGGRESSIVE, OPTIMIZATIONS_PER_TX_MINIMAL,
};

use anyhow::Context;
use cryptonote_crypto::{Hash, PublicKey, SecretKey};
use std::collections::HashMap;
use tx_builder::{AccountPublicAddress, Amount, Height, Transaction, TransactionBuilder, UnlockMoment};

/// Chain context for one selection pass, typically lifted from the node's
/// status response.
#[derive(Clone, Copy, Debug)]
pub struct ChainTip {
    pub height: Height,
    pub timestamp: u64,
    pub confirmed_height: Height,
    pub effective_median_size: usize,
    pub fee_per_byte: Amount,
}

/// Caller-facing knobs of a transfer.
#[derive(Clone, Debug)]
pub struct TransferParams {
    pub anonymity: usize,
    pub unlock_time: UnlockMoment,
    pub payment_id: Option<Hash>,
    pub optimization_level: OptimizationLevel,
}

/// Select coins, fetch mixins, assemble and sign a transfer in one call.
/// Returns the signed transaction and the change amount paid back to
/// `change_address`.
#[allow(clippy::too_many_arguments)]
pub fn create_transaction(
    currency: &Currency,
    unspents: Vec<UnspentOutput>,
    view_secret_key: &SecretKey,
    wallet_records: &HashMap<PublicKey, WalletRecord>,
    recipients: &[(AccountPublicAddress, Amount)],
    change_address: &AccountPublicAddress,
    params: &TransferParams,
    tip: &ChainTip,
    oracle: &dyn MixinOracle,
    tx_derivation_seed: &Hash,
) -> anyhow::Result<(Transaction, Amount)> {
    let target: Amount = recipients
        .iter()
        .try_fold(0u64, |acc, (_, amount)| acc.checked_add(*amount))
        .context("recipient amounts overflow")?;

    let mut selector = UnspentSelector::new(currency.clone(), unspents);
    let change = selector.select_optimal_outputs(
        tip.height,
        tip.timestamp,
        tip.confirmed_height,
        tip.effective_median_size,
        params.anonymity,
        target,
        recipients.len(),
        tip.fee_per_byte,
        params.optimization_level,
    )?;

    let random_outputs = if params.anonymity == 0 {
        Default::default()
    } else {
        oracle.random_outputs(selector.ra_amounts(), params.anonymity)?
    };

    let mut builder =
        TransactionBuilder::new(currency.current_transaction_version, params.unlock_time);
    if let Some(payment_id) = &params.payment_id {
        builder.set_payment_id(payment_id)?;
    }
    selector.add_mixed_inputs(
        view_secret_key,
        wallet_records,
        &mut builder,
        params.anonymity,
        random_outputs,
    )?;
    for (address, amount) in recipients {
        builder.add_output(*amount, *address)?;
    }
    if change > 0 {
        // Change travels as denominations; a sub-threshold remainder of the
        // decomposition stays with the fee, like any non-round change.
        let (chunks, _dust) = decompose_amount(change, currency.default_dust_threshold);
        for chunk in chunks {
            builder.add_output(chunk, *change_address)?;
        }
    }
    let transaction = builder.sign(tx_derivation_seed)?;
    Ok((transaction, change))
}
