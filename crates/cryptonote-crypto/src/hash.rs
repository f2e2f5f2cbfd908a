use curve25519_dalek::{
    edwards::{CompressedEdwardsY, EdwardsPoint},
    scalar::Scalar,
    traits::Identity,
};
use sha3::{Digest, Keccak256};

use crate::Hash;

/// Keccak-256 (the original Keccak, not SHA-3 padding).
pub fn cn_fast_hash(data: &[u8]) -> Hash {
    let mut out = [0u8; 32];
    out.copy_from_slice(&Keccak256::digest(data));
    Hash(out)
}

/// Keccak-256 reduced into the Ed25519 scalar field.
pub fn hash_to_scalar(data: &[u8]) -> Scalar {
    Scalar::from_bytes_mod_order(cn_fast_hash(data).0)
}

/// Map arbitrary bytes onto a point in the prime-order subgroup.
///
/// Re-hashes until the digest decompresses to a valid point, then clears the
/// cofactor. Identity results are rejected so key images are always
/// non-trivial.
pub fn hash_to_point(data: &[u8]) -> EdwardsPoint {
    let mut candidate = cn_fast_hash(data).0;
    loop {
        if let Some(point) = CompressedEdwardsY(candidate).decompress() {
            let point = point.mul_by_cofactor();
            if point != EdwardsPoint::identity() {
                return point;
            }
        }
        candidate = cn_fast_hash(&candidate).0;
    }
}

pub(crate) fn write_varint(out: &mut Vec<u8>, mut value: u64) {
    while value >= 0x80 {
        out.push((value as u8 & 0x7f) | 0x80);
        value >>= 7;
    }
    out.push(value as u8);
}
