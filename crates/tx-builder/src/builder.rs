//! builder.rs — staged construction and signing of a ring transaction.

use cryptonote_crypto::{
    derive_public_key, derive_secret_key, generate_deterministic_keys, generate_key_derivation,
    generate_key_image, generate_ring_signature, CryptoError, Hash, KeyImage, KeyPair, PublicKey,
};
use rand::{seq::SliceRandom, thread_rng};
use thiserror::Error;

use crate::extra::{payment_id_to_nonce, TransactionExtra, TX_EXTRA_NONCE_MAX_COUNT};
use crate::serial::{get_transaction_inputs_hash, get_transaction_prefix_hash};
use crate::types::{
    AccountKeys, AccountPublicAddress, Amount, KeyInput, OutputTarget, SourceOutput, Transaction,
    TransactionInput, TransactionOutput, TransactionPrefix, UnlockMoment,
};

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("generated key image does not match the spent output")]
    KeyImageMismatch,
    #[error("mixin outputs with different amounts are not allowed")]
    MixedAmounts,
    #[error("extra nonce exceeds {TX_EXTRA_NONCE_MAX_COUNT} bytes")]
    ExtraNonceTooLong,
    #[error("transaction amount overflows")]
    AmountOverflow,
    #[error("key corruption detected: {0}")]
    Crypto(#[from] CryptoError),
}

struct OutputDesc {
    amount: Amount,
    address: AccountPublicAddress,
}

struct InputDesc {
    /// Ring members sorted by global index, real output included.
    ring: Vec<SourceOutput>,
    real_output_index: usize,
    ephemeral: KeyPair,
    input: KeyInput,
}

pub struct TransactionBuilder {
    version: u64,
    unlock_time: UnlockMoment,
    extra: TransactionExtra,
    input_descs: Vec<InputDesc>,
    output_descs: Vec<OutputDesc>,
    inputs_amount: Amount,
    outputs_amount: Amount,
}

fn generate_key_image_helper(
    keys: &AccountKeys,
    tx_public_key: &PublicKey,
    output_index: u32,
) -> Result<(KeyPair, KeyImage), CryptoError> {
    let derivation = generate_key_derivation(tx_public_key, &keys.view_secret_key)?;
    let public_key = derive_public_key(
        &derivation,
        u64::from(output_index),
        &keys.address.spend_public_key,
    )?;
    let secret_key = derive_secret_key(
        &derivation,
        u64::from(output_index),
        &keys.spend_secret_key,
    )?;
    let key_image = generate_key_image(&public_key, &secret_key)?;
    Ok((
        KeyPair {
            public_key,
            secret_key,
        },
        key_image,
    ))
}

fn absolute_output_offsets_to_relative(offsets: &[u32]) -> Vec<u32> {
    let mut relative = offsets.to_vec();
    for i in (1..relative.len()).rev() {
        relative[i] = offsets[i] - offsets[i - 1];
    }
    relative
}

impl TransactionBuilder {
    pub fn new(version: u64, unlock_time: UnlockMoment) -> Self {
        Self {
            version,
            unlock_time,
            extra: TransactionExtra::default(),
            input_descs: Vec::new(),
            output_descs: Vec::new(),
            inputs_amount: 0,
            outputs_amount: 0,
        }
    }

    pub fn set_payment_id(&mut self, payment_id: &Hash) -> Result<(), BuildError> {
        self.set_extra_nonce(payment_id_to_nonce(payment_id))
    }

    pub fn set_extra_nonce(&mut self, nonce: Vec<u8>) -> Result<(), BuildError> {
        if !self.extra.set_nonce(nonce) {
            return Err(BuildError::ExtraNonceTooLong);
        }
        Ok(())
    }

    pub fn add_output(
        &mut self,
        amount: Amount,
        to: AccountPublicAddress,
    ) -> Result<usize, BuildError> {
        self.outputs_amount = self
            .outputs_amount
            .checked_add(amount)
            .ok_or(BuildError::AmountOverflow)?;
        self.output_descs.push(OutputDesc { amount, address: to });
        Ok(self.output_descs.len() - 1)
    }

    /// Stage a ring input. Mixins are sorted by global index and the real
    /// output is inserted at its sorted position, which becomes the secret
    /// index of the ring signature.
    pub fn add_input(
        &mut self,
        sender_keys: &AccountKeys,
        real_output: SourceOutput,
        mix_outputs: Vec<SourceOutput>,
    ) -> Result<usize, BuildError> {
        self.inputs_amount = self
            .inputs_amount
            .checked_add(real_output.amount)
            .ok_or(BuildError::AmountOverflow)?;

        let mut ring = mix_outputs;
        ring.sort_by_key(|out| out.global_index);
        let real_output_index =
            ring.partition_point(|out| out.global_index < real_output.global_index);
        ring.insert(real_output_index, real_output);
        let real = &ring[real_output_index];

        let (ephemeral, key_image) = generate_key_image_helper(
            sender_keys,
            &real.transaction_public_key,
            real.index_in_transaction,
        )?;
        if key_image != real.key_image {
            return Err(BuildError::KeyImageMismatch);
        }

        let mut absolute = Vec::with_capacity(ring.len());
        for out in &ring {
            if out.amount != real.amount {
                return Err(BuildError::MixedAmounts);
            }
            absolute.push(out.global_index);
        }
        let input = KeyInput {
            amount: real.amount,
            output_indexes: absolute_output_offsets_to_relative(&absolute),
            key_image,
        };
        self.input_descs.push(InputDesc {
            real_output_index,
            ephemeral,
            input,
            ring,
        });
        Ok(self.input_descs.len() - 1)
    }

    pub fn inputs_amount(&self) -> Amount {
        self.inputs_amount
    }

    pub fn outputs_amount(&self) -> Amount {
        self.outputs_amount
    }

    /// Finalize and sign.
    ///
    /// Inputs and outputs are independently shuffled so on-chain order
    /// carries no construction order. The per-transaction keypair is
    /// `H_s(inputs_hash ‖ seed)`, computed once the inputs are final and
    /// written into extra before output keys are derived (output keys
    /// depend on the transaction secret).
    pub fn sign(mut self, tx_derivation_seed: &Hash) -> Result<Transaction, BuildError> {
        let mut rng = thread_rng();
        self.output_descs.shuffle(&mut rng);
        self.input_descs.shuffle(&mut rng);

        let mut prefix = TransactionPrefix {
            version: self.version,
            unlock_time: self.unlock_time,
            inputs: self
                .input_descs
                .iter()
                .map(|desc| TransactionInput::Key(desc.input.clone()))
                .collect(),
            outputs: Vec::with_capacity(self.output_descs.len()),
            extra: Vec::new(),
        };

        let inputs_hash = get_transaction_inputs_hash(&prefix);
        let mut seed_data = Vec::with_capacity(64);
        seed_data.extend_from_slice(&inputs_hash.0);
        seed_data.extend_from_slice(&tx_derivation_seed.0);
        let tx_keys = generate_deterministic_keys(&seed_data);

        self.extra.set_public_key(tx_keys.public_key);
        prefix.extra = self.extra.serialize();

        for (index, desc) in self.output_descs.iter().enumerate() {
            let derivation =
                generate_key_derivation(&desc.address.view_public_key, &tx_keys.secret_key)?;
            let key = derive_public_key(&derivation, index as u64, &desc.address.spend_public_key)?;
            prefix.outputs.push(TransactionOutput {
                amount: desc.amount,
                target: OutputTarget::Key(key),
            });
        }

        let prefix_hash = get_transaction_prefix_hash(&prefix);
        let mut signatures = Vec::with_capacity(self.input_descs.len());
        for desc in &self.input_descs {
            let ring_keys: Vec<PublicKey> = desc.ring.iter().map(|out| out.public_key).collect();
            let row = generate_ring_signature(
                &prefix_hash,
                &desc.input.key_image,
                &ring_keys,
                &desc.ephemeral.secret_key,
                desc.real_output_index,
                &mut rng,
            )?;
            signatures.push(row);
        }
        Ok(Transaction { prefix, signatures })
    }
}
