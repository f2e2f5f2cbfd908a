// SPDX-License-Identifier: Apache-2.0
//! selector.rs — coin selection with stack-shape optimization.
//!
//! Spendable coins are indexed two levels deep: by decimal digit count,
//! then by leading digit, so "which coin rounds my shortfall to a trailing
//! zero at this position" is answerable per digit without scanning the
//! whole set. Selection runs inside a fee–size fixed point: the fee starts
//! at the currency minimum and rises to cover the byte fee of the resulting
//! transaction, while the optimization budget shrinks whenever the
//! transaction would grow past its share of the block median.

use std::collections::{BTreeMap, HashMap};

use cryptonote_crypto::{PublicKey, SecretKey};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use tx_builder::{AccountKeys, Amount, BuildError, Height, SourceOutput, TransactionBuilder};

use crate::currency::{digit_and_leading, Currency, CurrencyError};
use crate::model::{UnspentOutput, WalletRecord};
use cryptonote_rpc::RandomOutput;

/// Per-transaction optimization budget by level. Minimal still allows dust
/// sweeping but never the ten-coin stack drain.
pub const OPTIMIZATIONS_PER_TX: usize = 50;
pub const OPTIMIZATIONS_PER_TX_AGGRESSIVE: usize = 200;
pub const OPTIMIZATIONS_PER_TX_MINIMAL: usize = 9;
const MEDIAN_PERCENT: usize = 5;
const MEDIAN_PERCENT_AGGRESSIVE: usize = 10;
/// If any coin stack is larger, ten coins can be drained from it without
/// emptying the leaf mid-drain.
const STACK_OPTIMIZATION_THRESHOLD: usize = 20;
/// Minimum population for either leaf of a two-coin digit completion.
const TWO_THRESHOLD: usize = 10;
/// Keeps the rounding arithmetic positive when used_total overshoots the
/// target; quotients stay congruent mod 10 for every digit position the
/// offset covers.
const POSITIVITY_OFFSET: Amount = 1_000_000_000_000_000_000;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptimizationLevel {
    Minimal,
    Normal,
    Aggressive,
}

/// Recoverable selection outcomes; callers may retry with other parameters.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SelectionError {
    #[error("not enough spendable funds")]
    NotEnoughFunds,
    #[error("transaction does not fit in block")]
    TransactionDoesNotFitInBlock,
}

/// Mixin attachment failures. These are fatal for the transaction at hand.
#[derive(Debug, Error)]
pub enum MixinError {
    #[error("not enough anonymity for amount {amount}")]
    NotEnoughAnonymity { amount: Amount },
    #[error("no keys in wallet for address {address}")]
    UnknownAddress { address: String },
    #[error(transparent)]
    Address(#[from] CurrencyError),
    #[error(transparent)]
    Build(#[from] BuildError),
}

type HaveCoins = BTreeMap<u32, BTreeMap<u64, Vec<UnspentOutput>>>;
type DustCoins = BTreeMap<Amount, Vec<UnspentOutput>>;

pub struct UnspentSelector {
    currency: Currency,
    unspents: Vec<UnspentOutput>,
    used_unspents: Vec<UnspentOutput>,
    optimization_unspents: Vec<UnspentOutput>,
    used_total: Amount,
    inputs_count: usize,
    ra_amounts: Vec<Amount>,
}

impl UnspentSelector {
    pub fn new(currency: Currency, unspents: Vec<UnspentOutput>) -> Self {
        Self {
            currency,
            unspents,
            used_unspents: Vec::new(),
            optimization_unspents: Vec::new(),
            used_total: 0,
            inputs_count: 0,
            ra_amounts: Vec::new(),
        }
    }

    pub fn reset(&mut self, unspents: Vec<UnspentOutput>) {
        self.unspents = unspents;
        self.used_unspents.clear();
        self.optimization_unspents.clear();
        self.used_total = 0;
        self.inputs_count = 0;
        self.ra_amounts.clear();
    }

    /// Coins committed by the last successful selection.
    pub fn used_unspents(&self) -> &[UnspentOutput] {
        &self.used_unspents
    }

    /// Amounts for which the caller must fetch random outputs before
    /// attaching mixins.
    pub fn ra_amounts(&self) -> &[Amount] {
        &self.ra_amounts
    }

    /// Select coins covering `total_amount` plus fee, optimizing stack
    /// shape within the budget of `optimization_level`. Returns the change
    /// amount; the chosen coins are available via [`used_unspents`].
    ///
    /// `total_outputs` is the recipient count; capacity for up to eight
    /// change denominations is reserved on top of it when sizing the
    /// transaction.
    #[allow(clippy::too_many_arguments)]
    pub fn select_optimal_outputs(
        &mut self,
        block_height: Height,
        block_time: u64,
        confirmed_height: Height,
        effective_median_size: usize,
        anonymity: usize,
        total_amount: Amount,
        total_outputs: usize,
        fee_per_byte: Amount,
        optimization_level: OptimizationLevel,
    ) -> Result<Amount, SelectionError> {
        let (mut have_coins, mut dust_coins, max_digit) =
            self.create_have_coins(block_height, block_time, confirmed_height);
        let mut fee = self.currency.minimum_fee;
        let mut optimizations = match optimization_level {
            OptimizationLevel::Aggressive => OPTIMIZATIONS_PER_TX_AGGRESSIVE,
            OptimizationLevel::Minimal => OPTIMIZATIONS_PER_TX_MINIMAL,
            OptimizationLevel::Normal => OPTIMIZATIONS_PER_TX,
        };
        let optimization_median_percent = match optimization_level {
            OptimizationLevel::Aggressive => MEDIAN_PERCENT_AGGRESSIVE,
            _ => MEDIAN_PERCENT,
        };
        let optimization_median = effective_median_size * optimization_median_percent / 100;
        loop {
            let total = total_amount
                .checked_add(fee)
                .ok_or(SelectionError::NotEnoughFunds)?;
            if !self.select_inner(
                &mut have_coins,
                &mut dust_coins,
                max_digit,
                total,
                anonymity,
                optimizations,
            ) {
                return Err(SelectionError::NotEnoughFunds);
            }
            let change_dust_fee =
                (self.used_total - total_amount - fee) % self.currency.default_dust_threshold;
            let tx_size =
                self.currency
                    .get_maximum_tx_size(self.inputs_count, total_outputs + 8, anonymity);
            if tx_size > optimization_median && optimizations > 0 {
                // Prefer a smaller transaction over a better stack shape.
                self.unoptimize_amounts(&mut have_coins, &mut dust_coins);
                optimizations /= 2;
                if optimizations < 10 {
                    optimizations = 0;
                }
                continue;
            }
            if tx_size > effective_median_size {
                return Err(SelectionError::TransactionDoesNotFitInBlock);
            }
            let size_fee = fee_per_byte * tx_size as Amount;
            if fee + change_dust_fee >= size_fee {
                let change = self.used_total - total_amount - fee - change_dust_fee;
                self.combine_optimized_unspents();
                debug!(
                    used_total = self.used_total,
                    total_amount, fee, change_dust_fee, change, "selected unspents"
                );
                return Ok(change);
            }
            fee = (size_fee - change_dust_fee).div_ceil(self.currency.default_dust_threshold)
                * self.currency.default_dust_threshold;
            self.unoptimize_amounts(&mut have_coins, &mut dust_coins);
        }
    }

    /// Partition the confirmed, unlocked snapshot into the digit index and
    /// the dust pool. The snapshot is walked in reverse so that takes (from
    /// the back of each leaf) consume the oldest coins first.
    fn create_have_coins(
        &self,
        block_height: Height,
        block_time: u64,
        confirmed_height: Height,
    ) -> (HaveCoins, DustCoins, u32) {
        let mut have_coins = HaveCoins::new();
        let mut dust_coins = DustCoins::new();
        let mut max_digit = 0u32;
        for un in self.unspents.iter().rev() {
            if un.height >= confirmed_height {
                continue; // unconfirmed
            }
            if !self.currency.is_transaction_spend_time_unlocked(
                un.unlock_time,
                block_height,
                block_time,
            ) {
                continue;
            }
            if !self.currency.is_dust(un.amount) {
                let (digit, leading) = digit_and_leading(un.amount);
                max_digit = max_digit.max(digit);
                have_coins
                    .entry(digit)
                    .or_default()
                    .entry(leading)
                    .or_default()
                    .push(un.clone());
            } else {
                dust_coins.entry(un.amount).or_default().push(un.clone());
            }
        }
        (have_coins, dust_coins, max_digit)
    }

    fn push_optimization(&mut self, un: UnspentOutput) {
        self.used_total += un.amount;
        self.inputs_count += 1;
        self.optimization_unspents.push(un);
    }

    fn take_have_coin(&mut self, have_coins: &mut HaveCoins, digit: u32, leading: u64) {
        let Some(leaves) = have_coins.get_mut(&digit) else {
            return;
        };
        let Some(stack) = leaves.get_mut(&leading) else {
            return;
        };
        let Some(un) = stack.pop() else {
            return;
        };
        if stack.is_empty() {
            leaves.remove(&leading);
        }
        if leaves.is_empty() {
            have_coins.remove(&digit);
        }
        self.push_optimization(un);
    }

    fn take_dust_coin(&mut self, dust_coins: &mut DustCoins, amount: Amount) {
        let Some(stack) = dust_coins.get_mut(&amount) else {
            return;
        };
        let Some(un) = stack.pop() else {
            return;
        };
        if stack.is_empty() {
            dust_coins.remove(&amount);
        }
        self.push_optimization(un);
    }

    /// Commit the optimization picks and record their amounts for the
    /// mixin fetch.
    fn combine_optimized_unspents(&mut self) {
        for un in &self.optimization_unspents {
            self.ra_amounts.push(un.amount);
        }
        self.used_unspents.append(&mut self.optimization_unspents);
    }

    /// Return every staged pick to its pool; used when the fee loop retries.
    fn unoptimize_amounts(&mut self, have_coins: &mut HaveCoins, dust_coins: &mut DustCoins) {
        let returned = std::mem::take(&mut self.optimization_unspents);
        for un in returned {
            self.used_total -= un.amount;
            self.inputs_count -= 1;
            if !un.dust {
                let (digit, leading) = digit_and_leading(un.amount);
                have_coins
                    .entry(digit)
                    .or_default()
                    .entry(leading)
                    .or_default()
                    .push(un);
            } else {
                dust_coins.entry(un.amount).or_default().push(un);
            }
        }
    }

    /// Round the selection per digit position: for each digit, find coins
    /// whose leading digits complete the current shortfall to a trailing
    /// zero. A pair drawn from tall stacks beats a single coin; an exact
    /// single completion always wins over a populated overshoot.
    fn optimize_amounts(&mut self, have_coins: &mut HaveCoins, max_digit: u32, total_amount: Amount) {
        debug!(
            total_amount,
            used_total = self.used_total,
            "optimizing digit roundness"
        );
        for digit in 0..=max_digit {
            let digit_amount = 10u64.saturating_pow(digit);
            if self.used_total >= total_amount && digit_amount > self.used_total {
                break; // no optimization far beyond the requested sum
            }
            let am = 10
                - (POSITIVITY_OFFSET
                    .wrapping_add(total_amount)
                    .wrapping_add(digit_amount - 1)
                    .wrapping_sub(self.used_total)
                    / digit_amount)
                    % 10;

            let pair = {
                let Some(leaves) = have_coins.get(&digit) else {
                    continue;
                };
                let mut best: Option<(u64, u64)> = None;
                let mut best_weight = 0usize;
                for (&a, stack_a) in leaves.iter() {
                    for (&b, stack_b) in leaves.iter() {
                        if (a + b + am) % 10 == 0
                            && (stack_a.len() >= TWO_THRESHOLD || stack_b.len() >= TWO_THRESHOLD)
                            && stack_a.len() + stack_b.len() > best_weight
                        {
                            best_weight = stack_a.len() + stack_b.len();
                            best = Some((a, b));
                        }
                    }
                }
                best.map(|(a, b)| (a, b, best_weight))
            };
            if let Some((a, b, weight)) = pair {
                debug!(digit, complement = 10 - am, a, b, weight, "found pair");
                self.take_have_coin(have_coins, digit, a);
                self.take_have_coin(have_coins, digit, b);
                continue;
            }
            if am == 10 {
                continue;
            }
            let single = {
                let Some(leaves) = have_coins.get(&digit) else {
                    continue;
                };
                let mut best: Option<u64> = None;
                let mut best_weight = 0usize;
                for (&leading, stack) in leaves.iter() {
                    if (leading + am) % 10 == 0 {
                        best = Some(leading);
                        break; // an exact completion always wins
                    } else if leading > 10 - am && stack.len() > best_weight {
                        best_weight = stack.len();
                        best = Some(leading);
                    }
                }
                best.map(|leading| (leading, best_weight))
            };
            if let Some((leading, weight)) = single {
                debug!(digit, complement = 10 - am, leading, weight, "found single");
                self.take_have_coin(have_coins, digit, leading);
            } else {
                debug!(digit, "no rounding coin");
            }
        }
        debug!(
            used_total = self.used_total,
            total_amount, "digit roundness optimized"
        );
    }

    /// One full selection pass at a fixed target. Phases: dust pre-fill
    /// (anonymity zero only), tall-stack draining, digit rounding, smallest
    /// covering coin, and finally a largest-first sweep that gives up the
    /// staged optimizations.
    fn select_inner(
        &mut self,
        have_coins: &mut HaveCoins,
        dust_coins: &mut DustCoins,
        max_digit: u32,
        total_amount: Amount,
        anonymity: usize,
        mut optimization_count: usize,
    ) -> bool {
        debug!(
            total_amount,
            used_total = self.used_total,
            optimization_count,
            "selecting unspents"
        );
        if anonymity == 0 {
            if self.used_total < total_amount {
                // Smallest dust coin covering the whole shortfall; it can be
                // arbitrarily large.
                let shortfall = total_amount - self.used_total;
                let covering = dust_coins.range(shortfall..).next().map(|(&amount, _)| amount);
                if let Some(amount) = covering {
                    debug!(amount, "found single large dust coin");
                    self.take_dust_coin(dust_coins, amount);
                }
            }
            while self.used_total < total_amount && optimization_count >= 1 {
                let Some((&amount, _)) = dust_coins.iter().next_back() else {
                    break;
                };
                debug!(amount, "found optimization dust coin");
                self.take_dust_coin(dust_coins, amount);
                optimization_count -= 1;
            }
        }
        // Spend down any stack taller than the threshold, ten coins a round.
        while optimization_count >= 10 {
            let mut best: Option<(u32, u64)> = None;
            let mut best_weight = STACK_OPTIMIZATION_THRESHOLD;
            for (&digit, leaves) in have_coins.iter() {
                for (&leading, stack) in leaves.iter() {
                    if stack.len() > best_weight {
                        best_weight = stack.len();
                        best = Some((digit, leading));
                    }
                }
            }
            let Some((digit, leading)) = best else {
                break;
            };
            debug!(digit, leading, weight = best_weight, "draining coin stack");
            for _ in 0..10 {
                // The threshold guarantees the leaf survives all ten takes.
                self.take_have_coin(have_coins, digit, leading);
                optimization_count -= 1;
            }
        }
        self.optimize_amounts(have_coins, max_digit, total_amount);
        if self.used_total >= total_amount {
            return true;
        }
        // Smallest coin covering the shortfall, scanning digits upward.
        'digits: for digit in 0..=max_digit {
            let digit_amount = 10u64.saturating_pow(digit);
            let Some(leaves) = have_coins.get(&digit) else {
                continue;
            };
            let mut found = None;
            for (&leading, _) in leaves.iter() {
                if leading.saturating_mul(digit_amount) >= total_amount - self.used_total {
                    found = Some(leading);
                    break;
                }
            }
            if let Some(leading) = found {
                debug!(digit, leading, "found single large coin");
                self.take_have_coin(have_coins, digit, leading);
                break 'digits;
            }
        }
        if self.used_total >= total_amount {
            return true;
        }
        // Give the optimizations back and sweep largest-first until the
        // target is met; dust participates only at anonymity zero.
        self.unoptimize_amounts(have_coins, dust_coins);
        while self.used_total < total_amount {
            if have_coins.is_empty() && (anonymity != 0 || dust_coins.is_empty()) {
                return false;
            }
            let ha_amount = have_coins
                .iter()
                .next_back()
                .and_then(|(_, leaves)| leaves.iter().next_back())
                .and_then(|(_, stack)| stack.last())
                .map_or(0, |un| un.amount);
            let du_amount = if anonymity == 0 {
                dust_coins
                    .iter()
                    .next_back()
                    .and_then(|(_, stack)| stack.last())
                    .map_or(0, |un| un.amount)
            } else {
                0
            };
            if ha_amount > du_amount {
                let position = have_coins.iter().next_back().and_then(|(&digit, leaves)| {
                    leaves.iter().next_back().map(|(&leading, _)| (digit, leading))
                });
                let Some((digit, leading)) = position else {
                    return false;
                };
                debug!(amount = ha_amount, "found filler coin");
                self.take_have_coin(have_coins, digit, leading);
            } else {
                let Some((&amount, _)) = dust_coins.iter().next_back() else {
                    return false;
                };
                debug!(amount = du_amount, "found filler dust coin");
                self.take_dust_coin(dust_coins, amount);
            }
        }
        self.optimize_amounts(have_coins, max_digit, total_amount);
        true
    }

    /// Attach every committed unspent to `builder` with `anonymity` decoys
    /// drawn from the per-amount oracle pools. Decoys sharing the real
    /// output's global index are discarded.
    pub fn add_mixed_inputs(
        &self,
        view_secret_key: &SecretKey,
        wallet_records: &HashMap<PublicKey, WalletRecord>,
        builder: &mut TransactionBuilder,
        anonymity: usize,
        mut random_outputs: BTreeMap<Amount, Vec<RandomOutput>>,
    ) -> Result<(), MixinError> {
        for uu in &self.used_unspents {
            let pool = random_outputs.entry(uu.amount).or_default();
            let mut mix_outputs: Vec<SourceOutput> = Vec::with_capacity(anonymity);
            while mix_outputs.len() < anonymity {
                let Some(out) = pool.pop() else {
                    return Err(MixinError::NotEnoughAnonymity { amount: uu.amount });
                };
                if out.global_index != uu.global_index {
                    mix_outputs.push(SourceOutput {
                        amount: uu.amount,
                        global_index: out.global_index,
                        public_key: out.public_key,
                        ..Default::default()
                    });
                }
            }
            let address = self.currency.parse_account_address_string(&uu.address)?;
            let record = wallet_records
                .get(&address.spend_public_key)
                .ok_or_else(|| MixinError::UnknownAddress {
                    address: uu.address.clone(),
                })?;
            let sender_keys = AccountKeys {
                address,
                spend_secret_key: record.spend_secret_key,
                view_secret_key: *view_secret_key,
            };
            builder.add_input(&sender_keys, uu.source(), mix_outputs)?;
        }
        Ok(())
    }
}
