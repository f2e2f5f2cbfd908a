use curve25519_dalek::{
    constants::ED25519_BASEPOINT_TABLE,
    edwards::{CompressedEdwardsY, EdwardsPoint},
    scalar::Scalar,
};
use rand::{CryptoRng, RngCore};
use zeroize::Zeroizing;

use crate::{
    hash::{hash_to_point, hash_to_scalar, write_varint},
    CryptoError, KeyDerivation, KeyImage, KeyPair, PublicKey, SecretKey,
};

pub(crate) fn decode_point(bytes: &[u8; 32]) -> Result<EdwardsPoint, CryptoError> {
    CompressedEdwardsY(*bytes)
        .decompress()
        .ok_or(CryptoError::InvalidPublicKey)
}

pub(crate) fn decode_scalar(bytes: &[u8; 32]) -> Result<Scalar, CryptoError> {
    Option::<Scalar>::from(Scalar::from_canonical_bytes(*bytes))
        .ok_or(CryptoError::InvalidSecretKey)
}

pub fn random_scalar(rng: &mut (impl RngCore + CryptoRng)) -> Scalar {
    Scalar::random(rng)
}

pub fn generate_keys(rng: &mut (impl RngCore + CryptoRng)) -> KeyPair {
    let secret = Scalar::random(rng);
    let public = (&secret * ED25519_BASEPOINT_TABLE).compress().to_bytes();
    KeyPair {
        public_key: PublicKey(public),
        secret_key: SecretKey(secret.to_bytes()),
    }
}

/// Keypair whose secret is `hash_to_scalar(data)`. Used for per-transaction
/// keys derived from the finalized inputs and a wallet seed.
pub fn generate_deterministic_keys(data: &[u8]) -> KeyPair {
    let secret = hash_to_scalar(data);
    let public = (&secret * ED25519_BASEPOINT_TABLE).compress().to_bytes();
    KeyPair {
        public_key: PublicKey(public),
        secret_key: SecretKey(secret.to_bytes()),
    }
}

pub fn secret_key_to_public_key(secret: &SecretKey) -> Result<PublicKey, CryptoError> {
    let scalar = Zeroizing::new(decode_scalar(&secret.0)?);
    Ok(PublicKey(
        (&*scalar * ED25519_BASEPOINT_TABLE).compress().to_bytes(),
    ))
}

/// Shared-secret point `8·(s·P)`, the base of all per-output derivations.
pub fn generate_key_derivation(
    public: &PublicKey,
    secret: &SecretKey,
) -> Result<KeyDerivation, CryptoError> {
    let point = decode_point(&public.0)?;
    let scalar = Zeroizing::new(decode_scalar(&secret.0)?);
    let shared = (*scalar * point).mul_by_cofactor();
    Ok(KeyDerivation(shared.compress().to_bytes()))
}

/// `H_s(derivation ‖ varint(output_index))`.
pub fn derivation_to_scalar(derivation: &KeyDerivation, output_index: u64) -> Scalar {
    let mut data = Vec::with_capacity(32 + 10);
    data.extend_from_slice(&derivation.0);
    write_varint(&mut data, output_index);
    hash_to_scalar(&data)
}

/// One-time output key `H_s(D, i)·G + B` for the recipient's spend key `B`.
pub fn derive_public_key(
    derivation: &KeyDerivation,
    output_index: u64,
    base: &PublicKey,
) -> Result<PublicKey, CryptoError> {
    let base_point = decode_point(&base.0)?;
    let scalar = derivation_to_scalar(derivation, output_index);
    Ok(PublicKey(
        ((&scalar * ED25519_BASEPOINT_TABLE) + base_point)
            .compress()
            .to_bytes(),
    ))
}

/// Matching one-time secret `H_s(D, i) + b`.
pub fn derive_secret_key(
    derivation: &KeyDerivation,
    output_index: u64,
    base: &SecretKey,
) -> Result<SecretKey, CryptoError> {
    let base_scalar = Zeroizing::new(decode_scalar(&base.0)?);
    let scalar = derivation_to_scalar(derivation, output_index);
    Ok(SecretKey((*base_scalar + scalar).to_bytes()))
}

/// `s·hash_to_point(P)` for the output's ephemeral keypair `(P, s)`.
pub fn generate_key_image(public: &PublicKey, secret: &SecretKey) -> Result<KeyImage, CryptoError> {
    let scalar = Zeroizing::new(decode_scalar(&secret.0)?);
    let point = *scalar * hash_to_point(&public.0);
    Ok(KeyImage(point.compress().to_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand_chacha::{rand_core::SeedableRng, ChaCha20Rng};

    #[test]
    fn derived_public_matches_derived_secret() {
        let mut rng = ChaCha20Rng::from_seed([3u8; 32]);
        let wallet = generate_keys(&mut rng);
        let tx_keys = generate_keys(&mut rng);

        let derivation = generate_key_derivation(&tx_keys.public_key, &wallet.secret_key).unwrap();
        for index in [0u64, 1, 7] {
            let public = derive_public_key(&derivation, index, &wallet.public_key).unwrap();
            let secret = derive_secret_key(&derivation, index, &wallet.secret_key).unwrap();
            assert_eq!(public, secret_key_to_public_key(&secret).unwrap());
        }
    }

    #[test]
    fn derivation_is_symmetric() {
        let mut rng = ChaCha20Rng::from_seed([4u8; 32]);
        let a = generate_keys(&mut rng);
        let b = generate_keys(&mut rng);
        let ab = generate_key_derivation(&a.public_key, &b.secret_key).unwrap();
        let ba = generate_key_derivation(&b.public_key, &a.secret_key).unwrap();
        assert_eq!(ab, ba);
    }

    #[test]
    fn key_image_is_deterministic() {
        let mut rng = ChaCha20Rng::from_seed([5u8; 32]);
        let keys = generate_keys(&mut rng);
        let a = generate_key_image(&keys.public_key, &keys.secret_key).unwrap();
        let b = generate_key_image(&keys.public_key, &keys.secret_key).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn invalid_point_is_rejected() {
        let bad = PublicKey([0xFF; 32]);
        let mut rng = ChaCha20Rng::from_seed([6u8; 32]);
        let keys = generate_keys(&mut rng);
        assert!(generate_key_derivation(&bad, &keys.secret_key).is_err());
    }
}
