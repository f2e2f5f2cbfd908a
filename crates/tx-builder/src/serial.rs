//! serial.rs — canonical binary encoding of transactions.
//!
//! Layout: `varint(version) ‖ varint(unlock_time) ‖ inputs ‖ outputs ‖
//! varint(extra.len) ‖ extra ‖ signatures`. Inputs and outputs are tagged
//! unions; signature rows are implied by the inputs (one row per key input,
//! row length = ring size), so they carry no counts of their own.
//!
//! Readers re-derive every length from the stream and reject trailing
//! bytes, so `serialize(read(bytes)) == bytes` holds for every accepted
//! input.

use cryptonote_crypto::{cn_fast_hash, Hash, KeyImage, PublicKey, Signature};
use thiserror::Error;

use crate::types::{
    KeyInput, OutputTarget, Transaction, TransactionInput, TransactionOutput, TransactionPrefix,
};

const INPUT_TAG_COINBASE: u8 = 0xFF;
const INPUT_TAG_KEY: u8 = 0x02;
const OUTPUT_TAG_KEY: u8 = 0x02;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SerializeError {
    #[error("unexpected end of input")]
    UnexpectedEnd,
    #[error("varint does not fit in 64 bits")]
    VarintOverflow,
    #[error("varint encoding is not canonical")]
    NonCanonicalVarint,
    #[error("unknown tag {0:#04x}")]
    UnknownTag(u8),
    #[error("trailing bytes after transaction")]
    TrailingBytes,
}

pub fn write_varint(out: &mut Vec<u8>, mut value: u64) {
    while value >= 0x80 {
        out.push((value as u8 & 0x7f) | 0x80);
        value >>= 7;
    }
    out.push(value as u8);
}

pub fn read_varint(reader: &mut &[u8]) -> Result<u64, SerializeError> {
    let mut value = 0u64;
    let mut shift = 0u32;
    loop {
        let (&byte, rest) = reader.split_first().ok_or(SerializeError::UnexpectedEnd)?;
        *reader = rest;
        let part = u64::from(byte & 0x7f);
        if shift == 63 && part > 1 {
            return Err(SerializeError::VarintOverflow);
        }
        value |= part << shift;
        if byte & 0x80 == 0 {
            if byte == 0 && shift != 0 {
                return Err(SerializeError::NonCanonicalVarint);
            }
            return Ok(value);
        }
        shift += 7;
        if shift > 63 {
            return Err(SerializeError::VarintOverflow);
        }
    }
}

fn read_u8(reader: &mut &[u8]) -> Result<u8, SerializeError> {
    let (&byte, rest) = reader.split_first().ok_or(SerializeError::UnexpectedEnd)?;
    *reader = rest;
    Ok(byte)
}

fn read_bytes32(reader: &mut &[u8]) -> Result<[u8; 32], SerializeError> {
    if reader.len() < 32 {
        return Err(SerializeError::UnexpectedEnd);
    }
    let mut out = [0u8; 32];
    out.copy_from_slice(&reader[..32]);
    *reader = &reader[32..];
    Ok(out)
}

fn write_input(out: &mut Vec<u8>, input: &TransactionInput) {
    match input {
        TransactionInput::Coinbase { height } => {
            out.push(INPUT_TAG_COINBASE);
            write_varint(out, u64::from(*height));
        }
        TransactionInput::Key(key_input) => {
            out.push(INPUT_TAG_KEY);
            write_varint(out, key_input.amount);
            write_varint(out, key_input.output_indexes.len() as u64);
            for offset in &key_input.output_indexes {
                write_varint(out, u64::from(*offset));
            }
            out.extend_from_slice(&key_input.key_image.0);
        }
    }
}

fn read_input(reader: &mut &[u8]) -> Result<TransactionInput, SerializeError> {
    match read_u8(reader)? {
        INPUT_TAG_COINBASE => {
            let height = read_varint(reader)?;
            Ok(TransactionInput::Coinbase {
                height: height.try_into().map_err(|_| SerializeError::VarintOverflow)?,
            })
        }
        INPUT_TAG_KEY => {
            let amount = read_varint(reader)?;
            let count = read_varint(reader)?;
            let mut output_indexes = Vec::new();
            for _ in 0..count {
                let offset = read_varint(reader)?;
                output_indexes
                    .push(offset.try_into().map_err(|_| SerializeError::VarintOverflow)?);
            }
            let key_image = KeyImage(read_bytes32(reader)?);
            Ok(TransactionInput::Key(KeyInput {
                amount,
                output_indexes,
                key_image,
            }))
        }
        tag => Err(SerializeError::UnknownTag(tag)),
    }
}

fn write_output(out: &mut Vec<u8>, output: &TransactionOutput) {
    write_varint(out, output.amount);
    match &output.target {
        OutputTarget::Key(key) => {
            out.push(OUTPUT_TAG_KEY);
            out.extend_from_slice(&key.0);
        }
    }
}

fn read_output(reader: &mut &[u8]) -> Result<TransactionOutput, SerializeError> {
    let amount = read_varint(reader)?;
    match read_u8(reader)? {
        OUTPUT_TAG_KEY => Ok(TransactionOutput {
            amount,
            target: OutputTarget::Key(PublicKey(read_bytes32(reader)?)),
        }),
        tag => Err(SerializeError::UnknownTag(tag)),
    }
}

pub fn serialize_prefix(prefix: &TransactionPrefix) -> Vec<u8> {
    let mut out = Vec::new();
    write_varint(&mut out, prefix.version);
    write_varint(&mut out, prefix.unlock_time);
    write_varint(&mut out, prefix.inputs.len() as u64);
    for input in &prefix.inputs {
        write_input(&mut out, input);
    }
    write_varint(&mut out, prefix.outputs.len() as u64);
    for output in &prefix.outputs {
        write_output(&mut out, output);
    }
    write_varint(&mut out, prefix.extra.len() as u64);
    out.extend_from_slice(&prefix.extra);
    out
}

pub fn read_prefix(reader: &mut &[u8]) -> Result<TransactionPrefix, SerializeError> {
    let version = read_varint(reader)?;
    let unlock_time = read_varint(reader)?;
    let input_count = read_varint(reader)?;
    let mut inputs = Vec::new();
    for _ in 0..input_count {
        inputs.push(read_input(reader)?);
    }
    let output_count = read_varint(reader)?;
    let mut outputs = Vec::new();
    for _ in 0..output_count {
        outputs.push(read_output(reader)?);
    }
    let extra_len = read_varint(reader)? as usize;
    if reader.len() < extra_len {
        return Err(SerializeError::UnexpectedEnd);
    }
    let extra = reader[..extra_len].to_vec();
    *reader = &reader[extra_len..];
    Ok(TransactionPrefix {
        version,
        unlock_time,
        inputs,
        outputs,
        extra,
    })
}

pub fn serialize_transaction(transaction: &Transaction) -> Vec<u8> {
    let mut out = serialize_prefix(&transaction.prefix);
    for row in &transaction.signatures {
        for signature in row {
            out.extend_from_slice(&signature.c);
            out.extend_from_slice(&signature.r);
        }
    }
    out
}

/// Parse a full transaction, rejecting trailing bytes.
pub fn transaction_from_bytes(bytes: &[u8]) -> Result<Transaction, SerializeError> {
    let mut reader = bytes;
    let prefix = read_prefix(&mut reader)?;
    let mut signatures = Vec::with_capacity(prefix.inputs.len());
    for input in &prefix.inputs {
        let ring_size = match input {
            TransactionInput::Coinbase { .. } => 0,
            TransactionInput::Key(key_input) => key_input.output_indexes.len(),
        };
        let mut row = Vec::with_capacity(ring_size);
        for _ in 0..ring_size {
            let c = read_bytes32(&mut reader)?;
            let r = read_bytes32(&mut reader)?;
            row.push(Signature { c, r });
        }
        signatures.push(row);
    }
    if !reader.is_empty() {
        return Err(SerializeError::TrailingBytes);
    }
    Ok(Transaction { prefix, signatures })
}

pub fn get_transaction_prefix_hash(prefix: &TransactionPrefix) -> Hash {
    cn_fast_hash(&serialize_prefix(prefix))
}

/// Hash of the serialized inputs section followed by version and unlock
/// time. Feeds the deterministic per-transaction key derivation, so it must
/// be computed only after the inputs are finalized.
pub fn get_transaction_inputs_hash(prefix: &TransactionPrefix) -> Hash {
    let mut data = Vec::new();
    write_varint(&mut data, prefix.inputs.len() as u64);
    for input in &prefix.inputs {
        write_input(&mut data, input);
    }
    write_varint(&mut data, prefix.version);
    write_varint(&mut data, prefix.unlock_time);
    cn_fast_hash(&data)
}
