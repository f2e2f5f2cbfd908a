//! extra.rs — TLV "extra" field of the transaction prefix.
//!
//! Known tags: `0x00` padding, `0x01` transaction public key, `0x02` nonce
//! (varint length + bytes). A payment id is a nonce whose first byte is
//! `0x00` followed by 32 bytes. Parsers stop at the first unknown tag, so
//! forward-compatible data after the known region is ignored rather than
//! rejected.

use cryptonote_crypto::{Hash, PublicKey};

use crate::serial::{read_varint, write_varint};

pub const TX_EXTRA_TAG_PADDING: u8 = 0x00;
pub const TX_EXTRA_TAG_PUBKEY: u8 = 0x01;
pub const TX_EXTRA_TAG_NONCE: u8 = 0x02;
pub const TX_EXTRA_NONCE_PAYMENT_ID: u8 = 0x00;
pub const TX_EXTRA_NONCE_MAX_COUNT: usize = 255;
const TX_EXTRA_PADDING_MAX_COUNT: usize = 255;

/// Staged extra content. At most one public key and one nonce; setting
/// either again replaces the previous value.
#[derive(Clone, Debug, Default)]
pub struct TransactionExtra {
    public_key: Option<PublicKey>,
    nonce: Option<Vec<u8>>,
}

impl TransactionExtra {
    pub fn set_public_key(&mut self, key: PublicKey) {
        self.public_key = Some(key);
    }

    /// Nonce bytes are length-limited by the wire format's single-byte
    /// convention; longer nonces are refused rather than truncated.
    pub fn set_nonce(&mut self, nonce: Vec<u8>) -> bool {
        if nonce.len() > TX_EXTRA_NONCE_MAX_COUNT {
            return false;
        }
        self.nonce = Some(nonce);
        true
    }

    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::new();
        if let Some(key) = &self.public_key {
            out.push(TX_EXTRA_TAG_PUBKEY);
            out.extend_from_slice(&key.0);
        }
        if let Some(nonce) = &self.nonce {
            out.push(TX_EXTRA_TAG_NONCE);
            write_varint(&mut out, nonce.len() as u64);
            out.extend_from_slice(nonce);
        }
        out
    }
}

pub fn payment_id_to_nonce(payment_id: &Hash) -> Vec<u8> {
    let mut nonce = Vec::with_capacity(33);
    nonce.push(TX_EXTRA_NONCE_PAYMENT_ID);
    nonce.extend_from_slice(&payment_id.0);
    nonce
}

fn visit_extra(extra: &[u8], mut on_pubkey: impl FnMut([u8; 32]), mut on_nonce: impl FnMut(&[u8])) {
    let mut reader = extra;
    while let Some((&tag, rest)) = reader.split_first() {
        reader = rest;
        match tag {
            TX_EXTRA_TAG_PADDING => {
                let mut count = 1usize;
                while let Some((&next, rest)) = reader.split_first() {
                    if next != 0 || count >= TX_EXTRA_PADDING_MAX_COUNT {
                        break;
                    }
                    reader = rest;
                    count += 1;
                }
            }
            TX_EXTRA_TAG_PUBKEY => {
                if reader.len() < 32 {
                    return;
                }
                let mut key = [0u8; 32];
                key.copy_from_slice(&reader[..32]);
                reader = &reader[32..];
                on_pubkey(key);
            }
            TX_EXTRA_TAG_NONCE => {
                let Ok(len) = read_varint(&mut reader) else {
                    return;
                };
                let len = len as usize;
                if reader.len() < len {
                    return;
                }
                on_nonce(&reader[..len]);
                reader = &reader[len..];
            }
            _ => return,
        }
    }
}

/// First transaction public key present in the extra field, if any.
pub fn get_transaction_public_key(extra: &[u8]) -> Option<PublicKey> {
    let mut found = None;
    visit_extra(
        extra,
        |key| {
            if found.is_none() {
                found = Some(PublicKey(key));
            }
        },
        |_| {},
    );
    found
}

/// Payment id wrapped in the extra nonce, if any.
pub fn get_payment_id(extra: &[u8]) -> Option<Hash> {
    let mut found = None;
    visit_extra(extra, |_| {}, |nonce| {
        if found.is_none() && nonce.len() == 33 && nonce[0] == TX_EXTRA_NONCE_PAYMENT_ID {
            let mut id = [0u8; 32];
            id.copy_from_slice(&nonce[1..]);
            found = Some(Hash(id));
        }
    });
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_key_and_payment_id_round_trip() {
        let mut extra = TransactionExtra::default();
        let key = PublicKey([0xAB; 32]);
        let id = Hash([0x17; 32]);
        extra.set_public_key(key);
        assert!(extra.set_nonce(payment_id_to_nonce(&id)));
        let bytes = extra.serialize();
        assert_eq!(get_transaction_public_key(&bytes), Some(key));
        assert_eq!(get_payment_id(&bytes), Some(id));
    }

    #[test]
    fn setting_twice_keeps_one_value() {
        let mut extra = TransactionExtra::default();
        extra.set_public_key(PublicKey([1; 32]));
        extra.set_public_key(PublicKey([2; 32]));
        let bytes = extra.serialize();
        assert_eq!(bytes.len(), 33);
        assert_eq!(get_transaction_public_key(&bytes), Some(PublicKey([2; 32])));
    }

    #[test]
    fn oversized_nonce_is_refused() {
        let mut extra = TransactionExtra::default();
        assert!(!extra.set_nonce(vec![0u8; 256]));
        assert!(extra.serialize().is_empty());
    }

    #[test]
    fn parser_skips_padding_and_stops_at_unknown_tags() {
        let mut bytes = vec![0u8; 4]; // padding
        bytes.push(TX_EXTRA_TAG_PUBKEY);
        bytes.extend_from_slice(&[0x33; 32]);
        bytes.push(0x7E); // unknown tag: parsing stops here
        bytes.push(TX_EXTRA_TAG_NONCE);
        assert_eq!(
            get_transaction_public_key(&bytes),
            Some(PublicKey([0x33; 32]))
        );
        assert_eq!(get_payment_id(&bytes), None);
    }
}
