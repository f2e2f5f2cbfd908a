use std::collections::{BTreeMap, HashMap};

use cryptonote_crypto::{
    check_ring_signature, derive_public_key, derive_secret_key, generate_key_derivation,
    generate_key_image, generate_keys, Hash, PublicKey,
};
use cryptonote_rpc::RandomOutput;
use cryptonote_wallet_core::{
    create_transaction, ChainTip, Currency, MixinError, MixinOracle, NoopMixinOracle,
    OptimizationLevel, TransferParams, UnspentOutput, WalletRecord,
};
use rand_chacha::{rand_core::SeedableRng, ChaCha20Rng};
use tx_builder::serial::{get_transaction_prefix_hash, serialize_transaction, transaction_from_bytes};
use tx_builder::{AccountKeys, AccountPublicAddress, Amount, TransactionInput};

struct FixedOracle(BTreeMap<Amount, Vec<RandomOutput>>);

impl MixinOracle for FixedOracle {
    fn random_outputs(
        &self,
        _amounts: &[Amount],
        _outs_count: usize,
    ) -> anyhow::Result<BTreeMap<Amount, Vec<RandomOutput>>> {
        Ok(self.0.clone())
    }
}

fn currency() -> Currency {
    Currency {
        current_transaction_version: 1,
        minimum_fee: 10,
        default_dust_threshold: 1,
        address_prefix: 6,
        difficulty_target: 120,
    }
}

fn make_account(rng: &mut ChaCha20Rng) -> AccountKeys {
    let spend = generate_keys(rng);
    let view = generate_keys(rng);
    AccountKeys {
        address: AccountPublicAddress {
            spend_public_key: spend.public_key,
            view_public_key: view.public_key,
        },
        spend_secret_key: spend.secret_key,
        view_secret_key: view.secret_key,
    }
}

fn owned_unspent(
    c: &Currency,
    keys: &AccountKeys,
    amount: Amount,
    global_index: u32,
    rng: &mut ChaCha20Rng,
) -> UnspentOutput {
    let tx_keys = generate_keys(rng);
    let derivation = generate_key_derivation(&tx_keys.public_key, &keys.view_secret_key).unwrap();
    let public_key = derive_public_key(&derivation, 0, &keys.address.spend_public_key).unwrap();
    let secret_key = derive_secret_key(&derivation, 0, &keys.spend_secret_key).unwrap();
    let key_image = generate_key_image(&public_key, &secret_key).unwrap();
    UnspentOutput {
        amount,
        global_index,
        height: 10,
        unlock_time: 0,
        transaction_public_key: tx_keys.public_key,
        index_in_transaction: 0,
        public_key,
        key_image,
        address: c.account_address_as_string(&keys.address),
        dust: c.is_dust(amount),
    }
}

fn records_for(keys: &AccountKeys) -> HashMap<PublicKey, WalletRecord> {
    let mut records = HashMap::new();
    records.insert(
        keys.address.spend_public_key,
        WalletRecord {
            spend_public_key: keys.address.spend_public_key,
            spend_secret_key: keys.spend_secret_key,
        },
    );
    records
}

fn tip() -> ChainTip {
    ChainTip {
        height: 100,
        timestamp: 1_000,
        confirmed_height: 50,
        effective_median_size: 2_000,
        fee_per_byte: 0,
    }
}

fn params(anonymity: usize) -> TransferParams {
    TransferParams {
        anonymity,
        unlock_time: 0,
        payment_id: None,
        optimization_level: OptimizationLevel::Normal,
    }
}

fn decoy(amount: Amount, global_index: u32, rng: &mut ChaCha20Rng) -> RandomOutput {
    RandomOutput {
        amount,
        global_index,
        public_key: generate_keys(rng).public_key,
    }
}

#[test]
fn full_spend_with_mixins_signs_and_verifies() {
    let mut rng = ChaCha20Rng::from_seed([31u8; 32]);
    let c = currency();
    let wallet = make_account(&mut rng);
    let recipient = make_account(&mut rng);

    let real = owned_unspent(&c, &wallet, 500, 42, &mut rng);
    let real_public = real.public_key;

    // The oracle pool contains the real output itself; attachment must
    // discard the collision and still fill the ring.
    let d43 = decoy(500, 43, &mut rng);
    let d44 = decoy(500, 44, &mut rng);
    let mut pool = BTreeMap::new();
    pool.insert(
        500u64,
        vec![
            d43.clone(),
            d44.clone(),
            RandomOutput {
                amount: 500,
                global_index: 42,
                public_key: generate_keys(&mut rng).public_key,
            },
        ],
    );
    let oracle = FixedOracle(pool);

    let (tx, change) = create_transaction(
        &c,
        vec![real],
        &wallet.view_secret_key,
        &records_for(&wallet),
        &[(recipient.address, 300)],
        &wallet.address,
        &params(2),
        &tip(),
        &oracle,
        &Hash([5u8; 32]),
    )
    .unwrap();

    assert_eq!(change, 190);
    // 300 to the recipient plus the change denominations 90 and 100.
    assert_eq!(tx.prefix.outputs.len(), 3);
    let outputs_total: Amount = tx.prefix.outputs.iter().map(|out| out.amount).sum();
    assert_eq!(outputs_total, 490); // fee 10 stays implicit

    let TransactionInput::Key(input) = &tx.prefix.inputs[0] else {
        panic!("expected key input");
    };
    assert_eq!(input.output_indexes, vec![42, 1, 1]);

    // Ring members sorted by global index: real at 42, decoys at 43 and 44.
    let ring = [real_public, d43.public_key, d44.public_key];
    let prefix_hash = get_transaction_prefix_hash(&tx.prefix);
    assert!(check_ring_signature(
        &prefix_hash,
        &input.key_image,
        &ring,
        &tx.signatures[0]
    ));

    // The recipient recovers exactly one output worth 300.
    let tx_public =
        tx_builder::extra::get_transaction_public_key(&tx.prefix.extra).expect("tx key");
    let derivation =
        generate_key_derivation(&tx_public, &recipient.view_secret_key).unwrap();
    let mut recovered = 0u64;
    for (index, output) in tx.prefix.outputs.iter().enumerate() {
        let expected =
            derive_public_key(&derivation, index as u64, &recipient.address.spend_public_key)
                .unwrap();
        let tx_builder::OutputTarget::Key(target) = output.target;
        if target == expected {
            recovered += output.amount;
        }
    }
    assert_eq!(recovered, 300);

    // The signed transaction survives the binary codec.
    let bytes = serialize_transaction(&tx);
    assert_eq!(transaction_from_bytes(&bytes).unwrap(), tx);
}

#[test]
fn spend_without_anonymity_uses_single_member_rings() {
    let mut rng = ChaCha20Rng::from_seed([32u8; 32]);
    let c = currency();
    let wallet = make_account(&mut rng);
    let recipient = make_account(&mut rng);
    let real = owned_unspent(&c, &wallet, 500, 7, &mut rng);
    let real_public = real.public_key;

    let (tx, change) = create_transaction(
        &c,
        vec![real],
        &wallet.view_secret_key,
        &records_for(&wallet),
        &[(recipient.address, 300)],
        &wallet.address,
        &params(0),
        &tip(),
        &NoopMixinOracle,
        &Hash([6u8; 32]),
    )
    .unwrap();

    assert_eq!(change, 190);
    let TransactionInput::Key(input) = &tx.prefix.inputs[0] else {
        panic!("expected key input");
    };
    assert_eq!(input.output_indexes, vec![7]);
    let prefix_hash = get_transaction_prefix_hash(&tx.prefix);
    assert!(check_ring_signature(
        &prefix_hash,
        &input.key_image,
        &[real_public],
        &tx.signatures[0]
    ));
}

#[test]
fn exhausted_oracle_pool_fails_with_amount() {
    let mut rng = ChaCha20Rng::from_seed([33u8; 32]);
    let c = currency();
    let wallet = make_account(&mut rng);
    let recipient = make_account(&mut rng);
    let real = owned_unspent(&c, &wallet, 500, 42, &mut rng);

    let mut pool = BTreeMap::new();
    pool.insert(500u64, vec![decoy(500, 43, &mut rng)]);
    let oracle = FixedOracle(pool);

    let err = create_transaction(
        &c,
        vec![real],
        &wallet.view_secret_key,
        &records_for(&wallet),
        &[(recipient.address, 300)],
        &wallet.address,
        &params(2),
        &tip(),
        &oracle,
        &Hash([7u8; 32]),
    )
    .unwrap_err();
    match err.downcast_ref::<MixinError>() {
        Some(MixinError::NotEnoughAnonymity { amount }) => assert_eq!(*amount, 500),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn missing_wallet_record_fails_attachment() {
    let mut rng = ChaCha20Rng::from_seed([34u8; 32]);
    let c = currency();
    let wallet = make_account(&mut rng);
    let recipient = make_account(&mut rng);
    let real = owned_unspent(&c, &wallet, 500, 42, &mut rng);

    let err = create_transaction(
        &c,
        vec![real],
        &wallet.view_secret_key,
        &HashMap::new(),
        &[(recipient.address, 300)],
        &wallet.address,
        &params(0),
        &tip(),
        &NoopMixinOracle,
        &Hash([8u8; 32]),
    )
    .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<MixinError>(),
        Some(MixinError::UnknownAddress { .. })
    ));
}
