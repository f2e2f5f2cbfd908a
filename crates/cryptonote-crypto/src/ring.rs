// SPDX-License-Identifier: Apache-2.0
//! Classic CryptoNote ring signatures.
//!
//! One `(c, r)` pair per ring member; the challenge closes over
//! `prefix_hash ‖ L_0 ‖ R_0 ‖ … ‖ L_{n-1} ‖ R_{n-1}` where
//! `L_i = c_i·P_i + r_i·G` and `R_i = c_i·I + r_i·hash_to_point(P_i)`.
//! A verifier accepts when the challenge equals the sum of all `c_i`.

use curve25519_dalek::{
    constants::ED25519_BASEPOINT_TABLE,
    edwards::{CompressedEdwardsY, EdwardsPoint},
    scalar::Scalar,
};
use rand::{CryptoRng, RngCore};
use zeroize::Zeroizing;

use crate::{
    hash::{hash_to_point, hash_to_scalar},
    keys::{decode_point, decode_scalar},
    CryptoError, Hash, KeyImage, PublicKey, SecretKey, Signature,
};

pub fn generate_ring_signature(
    prefix_hash: &Hash,
    key_image: &KeyImage,
    ring: &[PublicKey],
    secret: &SecretKey,
    real_index: usize,
    rng: &mut (impl RngCore + CryptoRng),
) -> Result<Vec<Signature>, CryptoError> {
    if ring.is_empty() {
        return Err(CryptoError::EmptyRing);
    }
    if real_index >= ring.len() {
        return Err(CryptoError::RealIndexOutOfRange {
            index: real_index,
            ring_size: ring.len(),
        });
    }
    let image = decode_point(&key_image.0)?;
    let secret_scalar = Zeroizing::new(decode_scalar(&secret.0)?);

    let mut buf = Vec::with_capacity(32 + ring.len() * 64);
    buf.extend_from_slice(&prefix_hash.0);
    let mut signatures = vec![Signature::default(); ring.len()];
    let mut sum = Scalar::ZERO;
    let mut real_nonce = Zeroizing::new(Scalar::ZERO);
    for (i, member) in ring.iter().enumerate() {
        let member_point = decode_point(&member.0)?;
        let base_point = hash_to_point(&member.0);
        if i == real_index {
            *real_nonce = Scalar::random(rng);
            let l = &*real_nonce * ED25519_BASEPOINT_TABLE;
            let r = *real_nonce * base_point;
            buf.extend_from_slice(l.compress().as_bytes());
            buf.extend_from_slice(r.compress().as_bytes());
        } else {
            let c = Scalar::random(rng);
            let r = Scalar::random(rng);
            let l = EdwardsPoint::vartime_double_scalar_mul_basepoint(&c, &member_point, &r);
            let rp = r * base_point + c * image;
            buf.extend_from_slice(l.compress().as_bytes());
            buf.extend_from_slice(rp.compress().as_bytes());
            signatures[i] = Signature {
                c: c.to_bytes(),
                r: r.to_bytes(),
            };
            sum += c;
        }
    }
    let challenge = hash_to_scalar(&buf);
    let real_c = challenge - sum;
    let real_r = *real_nonce - real_c * *secret_scalar;
    signatures[real_index] = Signature {
        c: real_c.to_bytes(),
        r: real_r.to_bytes(),
    };
    Ok(signatures)
}

pub fn check_ring_signature(
    prefix_hash: &Hash,
    key_image: &KeyImage,
    ring: &[PublicKey],
    signatures: &[Signature],
) -> bool {
    if ring.is_empty() || signatures.len() != ring.len() {
        return false;
    }
    let Some(image) = CompressedEdwardsY(key_image.0).decompress() else {
        return false;
    };
    if !image.is_torsion_free() {
        return false;
    }

    let mut buf = Vec::with_capacity(32 + ring.len() * 64);
    buf.extend_from_slice(&prefix_hash.0);
    let mut sum = Scalar::ZERO;
    for (member, sig) in ring.iter().zip(signatures) {
        let Some(c) = Option::<Scalar>::from(Scalar::from_canonical_bytes(sig.c)) else {
            return false;
        };
        let Some(r) = Option::<Scalar>::from(Scalar::from_canonical_bytes(sig.r)) else {
            return false;
        };
        let Some(member_point) = CompressedEdwardsY(member.0).decompress() else {
            return false;
        };
        let l = EdwardsPoint::vartime_double_scalar_mul_basepoint(&c, &member_point, &r);
        let rp = r * hash_to_point(&member.0) + c * image;
        buf.extend_from_slice(l.compress().as_bytes());
        buf.extend_from_slice(rp.compress().as_bytes());
        sum += c;
    }
    hash_to_scalar(&buf) == sum
}
