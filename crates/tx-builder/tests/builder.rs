use cryptonote_crypto::{
    check_ring_signature, derive_public_key, derive_secret_key, generate_key_derivation,
    generate_key_image, generate_keys, Hash, PublicKey,
};
use rand_chacha::{rand_core::SeedableRng, ChaCha20Rng};
use tx_builder::extra::{get_payment_id, get_transaction_public_key};
use tx_builder::serial::get_transaction_prefix_hash;
use tx_builder::{
    AccountKeys, AccountPublicAddress, Amount, BuildError, SourceOutput, Transaction,
    TransactionBuilder, TransactionInput,
};

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

fn make_owned_output(
    keys: &AccountKeys,
    amount: Amount,
    global_index: u32,
    index_in_transaction: u32,
    rng: &mut ChaCha20Rng,
) -> SourceOutput {
    let tx_keys = generate_keys(rng);
    let derivation = generate_key_derivation(&tx_keys.public_key, &keys.view_secret_key).unwrap();
    let public_key = derive_public_key(
        &derivation,
        u64::from(index_in_transaction),
        &keys.address.spend_public_key,
    )
    .unwrap();
    let secret_key = derive_secret_key(
        &derivation,
        u64::from(index_in_transaction),
        &keys.spend_secret_key,
    )
    .unwrap();
    let key_image = generate_key_image(&public_key, &secret_key).unwrap();
    SourceOutput {
        amount,
        global_index,
        public_key,
        transaction_public_key: tx_keys.public_key,
        index_in_transaction,
        key_image,
    }
}

fn decoy(amount: Amount, global_index: u32, rng: &mut ChaCha20Rng) -> SourceOutput {
    SourceOutput {
        amount,
        global_index,
        public_key: generate_keys(rng).public_key,
        ..Default::default()
    }
}

#[test]
fn real_output_lands_at_sorted_position() {
    let mut rng = ChaCha20Rng::from_seed([21u8; 32]);
    let keys = make_account(&mut rng);
    let recipient = make_account(&mut rng);
    let real = make_owned_output(&keys, 500, 42, 0, &mut rng);
    let mixins = vec![decoy(500, 44, &mut rng), decoy(500, 43, &mut rng)];

    let mut builder = TransactionBuilder::new(1, 0);
    builder.add_input(&keys, real, mixins).unwrap();
    builder.add_output(490, recipient.address).unwrap();
    let tx = builder.sign(&Hash([1u8; 32])).unwrap();

    let TransactionInput::Key(input) = &tx.prefix.inputs[0] else {
        panic!("expected key input");
    };
    // Global indexes {42, 43, 44}: real at sorted position 0, relative form.
    assert_eq!(input.output_indexes, vec![42, 1, 1]);
    assert_eq!(tx.signatures[0].len(), 3);
}

#[test]
fn tampered_key_image_is_fatal() {
    let mut rng = ChaCha20Rng::from_seed([22u8; 32]);
    let keys = make_account(&mut rng);
    let mut real = make_owned_output(&keys, 700, 10, 1, &mut rng);
    real.key_image.0[0] ^= 1;

    let mut builder = TransactionBuilder::new(1, 0);
    let err = builder.add_input(&keys, real, vec![]).unwrap_err();
    assert!(matches!(err, BuildError::KeyImageMismatch));
}

#[test]
fn foreign_view_key_is_fatal() {
    let mut rng = ChaCha20Rng::from_seed([23u8; 32]);
    let keys = make_account(&mut rng);
    let other = make_account(&mut rng);
    let real = make_owned_output(&keys, 700, 10, 1, &mut rng);

    let mut builder = TransactionBuilder::new(1, 0);
    let err = builder.add_input(&other, real, vec![]).unwrap_err();
    assert!(matches!(err, BuildError::KeyImageMismatch));
}

#[test]
fn mixins_with_other_amounts_are_fatal() {
    let mut rng = ChaCha20Rng::from_seed([24u8; 32]);
    let keys = make_account(&mut rng);
    let real = make_owned_output(&keys, 500, 42, 0, &mut rng);
    let mixins = vec![decoy(500, 43, &mut rng), decoy(900, 44, &mut rng)];

    let mut builder = TransactionBuilder::new(1, 0);
    let err = builder.add_input(&keys, real, mixins).unwrap_err();
    assert!(matches!(err, BuildError::MixedAmounts));
}

#[test]
fn tx_key_is_deterministic_in_prefix_and_seed() {
    let mut rng = ChaCha20Rng::from_seed([25u8; 32]);
    let keys = make_account(&mut rng);
    let recipient = make_account(&mut rng);
    let real = make_owned_output(&keys, 500, 42, 0, &mut rng);

    let build = |seed: &Hash| -> Transaction {
        // Single input and output: the shuffle cannot reorder anything, so
        // the finalized prefix is identical across builds.
        let mut builder = TransactionBuilder::new(1, 0);
        builder.add_input(&keys, real.clone(), vec![]).unwrap();
        builder.add_output(490, recipient.address).unwrap();
        builder.sign(seed).unwrap()
    };

    let seed = Hash([7u8; 32]);
    let a = build(&seed);
    let b = build(&seed);
    assert_eq!(
        get_transaction_public_key(&a.prefix.extra),
        get_transaction_public_key(&b.prefix.extra)
    );

    let c = build(&Hash([8u8; 32]));
    assert_ne!(
        get_transaction_public_key(&a.prefix.extra),
        get_transaction_public_key(&c.prefix.extra)
    );
}

#[test]
fn signed_transaction_verifies_and_conserves_amounts() {
    let mut rng = ChaCha20Rng::from_seed([26u8; 32]);
    let keys = make_account(&mut rng);
    let recipient = make_account(&mut rng);

    let real_a = make_owned_output(&keys, 600, 17, 0, &mut rng);
    let real_b = make_owned_output(&keys, 400, 91, 2, &mut rng);
    let rings = [
        (
            real_a.key_image,
            vec![decoy(600, 3, &mut rng), decoy(600, 55, &mut rng)],
        ),
        (
            real_b.key_image,
            vec![decoy(400, 12, &mut rng), decoy(400, 130, &mut rng)],
        ),
    ];

    let mut builder = TransactionBuilder::new(1, 0);
    builder
        .add_input(&keys, real_a.clone(), rings[0].1.clone())
        .unwrap();
    builder
        .add_input(&keys, real_b.clone(), rings[1].1.clone())
        .unwrap();
    builder.add_output(700, recipient.address).unwrap();
    builder.add_output(250, keys.address).unwrap();
    assert_eq!(builder.inputs_amount(), 1000);
    assert_eq!(builder.outputs_amount(), 950);

    let tx = builder.sign(&Hash([9u8; 32])).unwrap();

    let inputs_total: Amount = tx
        .prefix
        .inputs
        .iter()
        .map(|input| match input {
            TransactionInput::Key(key_input) => key_input.amount,
            TransactionInput::Coinbase { .. } => 0,
        })
        .sum();
    let outputs_total: Amount = tx.prefix.outputs.iter().map(|out| out.amount).sum();
    assert_eq!(inputs_total, 1000);
    assert_eq!(outputs_total, 950);

    // Every ring signature verifies against the prefix hash, the input's
    // key image, and the ring member keys sorted by global index.
    let prefix_hash = get_transaction_prefix_hash(&tx.prefix);
    for (input, row) in tx.prefix.inputs.iter().zip(&tx.signatures) {
        let TransactionInput::Key(key_input) = input else {
            panic!("expected key input");
        };
        let (_, mixins) = rings
            .iter()
            .find(|(image, _)| *image == key_input.key_image)
            .expect("input matches a staged ring");
        let real = if key_input.key_image == real_a.key_image {
            &real_a
        } else {
            &real_b
        };
        let mut members: Vec<SourceOutput> = mixins.clone();
        members.push(real.clone());
        members.sort_by_key(|out| out.global_index);
        let ring_keys: Vec<PublicKey> = members.iter().map(|out| out.public_key).collect();
        assert_eq!(row.len(), ring_keys.len());
        assert!(check_ring_signature(
            &prefix_hash,
            &key_input.key_image,
            &ring_keys,
            row
        ));

        // The ring's absolute indexes are recoverable from the relative
        // form and non-decreasing.
        let mut absolute = key_input.output_indexes.clone();
        for i in 1..absolute.len() {
            absolute[i] += absolute[i - 1];
        }
        let expected: Vec<u32> = members.iter().map(|out| out.global_index).collect();
        assert_eq!(absolute, expected);
    }
}

#[test]
fn recipient_can_recover_output_keys() {
    let mut rng = ChaCha20Rng::from_seed([27u8; 32]);
    let keys = make_account(&mut rng);
    let recipient = make_account(&mut rng);
    let real = make_owned_output(&keys, 800, 5, 0, &mut rng);

    let mut builder = TransactionBuilder::new(1, 0);
    builder.add_input(&keys, real, vec![]).unwrap();
    builder.add_output(790, recipient.address).unwrap();
    let tx = builder.sign(&Hash([3u8; 32])).unwrap();

    let tx_public = get_transaction_public_key(&tx.prefix.extra).expect("tx key in extra");
    let derivation = generate_key_derivation(&tx_public, &recipient.view_secret_key).unwrap();
    let tx_builder::OutputTarget::Key(target) = tx.prefix.outputs[0].target;
    let expected = derive_public_key(&derivation, 0, &recipient.address.spend_public_key).unwrap();
    assert_eq!(target, expected);
}

#[test]
fn payment_id_survives_signing() {
    let mut rng = ChaCha20Rng::from_seed([28u8; 32]);
    let keys = make_account(&mut rng);
    let recipient = make_account(&mut rng);
    let real = make_owned_output(&keys, 800, 5, 0, &mut rng);
    let id = Hash([0x42; 32]);

    let mut builder = TransactionBuilder::new(1, 0);
    builder.set_payment_id(&id).unwrap();
    builder.add_input(&keys, real, vec![]).unwrap();
    builder.add_output(790, recipient.address).unwrap();
    let tx = builder.sign(&Hash([4u8; 32])).unwrap();

    assert_eq!(get_payment_id(&tx.prefix.extra), Some(id));
    assert!(get_transaction_public_key(&tx.prefix.extra).is_some());
}
