//! Transaction wire format
//!
//! | Field        | Encoding                                   |
//! |--------------|--------------------------------------------|
//! | version      | u32 LE                                     |
//! | input count  | CompactSize                                |
//! | input        | hash(32) ‖ index u32 LE ‖ script ‖ u32 LE  |
//! | output count | CompactSize                                |
//! | output       | value i64 LE ‖ script                      |
//! | lock_time    | u32 LE                                     |
//!
//! Scripts are prefixed with their CompactSize length. The signature hash is
//! computed over this exact layout, so field order is fixed.

use bitcoin_hashes::{sha256d, Hash as BitcoinHash, HashEngine};

use crate::error::{Result, VaultError};
use crate::types::*;

/// SHA256(SHA256(x))
pub fn double_sha256(data: &[u8]) -> Hash {
    let mut engine = sha256d::Hash::engine();
    engine.input(data);
    sha256d::Hash::from_engine(engine).into_inner()
}

/// Append a CompactSize integer.
pub fn write_varint(out: &mut ByteString, n: u64) {
    if n < 0xfd {
        out.push(n as u8);
    } else if n <= 0xffff {
        out.push(0xfd);
        out.extend_from_slice(&(n as u16).to_le_bytes());
    } else if n <= 0xffff_ffff {
        out.push(0xfe);
        out.extend_from_slice(&(n as u32).to_le_bytes());
    } else {
        out.push(0xff);
        out.extend_from_slice(&n.to_le_bytes());
    }
}

/// Append a length-prefixed byte string.
pub fn write_bytes(out: &mut ByteString, data: &[u8]) {
    write_varint(out, data.len() as u64);
    out.extend_from_slice(data);
}

pub fn write_input(out: &mut ByteString, input: &TransactionInput) {
    out.extend_from_slice(&input.prevout.hash);
    out.extend_from_slice(&input.prevout.index.to_le_bytes());
    write_bytes(out, &input.script_sig);
    out.extend_from_slice(&input.sequence.to_le_bytes());
}

pub fn write_output(out: &mut ByteString, output: &TransactionOutput) {
    out.extend_from_slice(&output.value.to_le_bytes());
    write_bytes(out, &output.script_pubkey);
}

/// SerializeTransaction: 𝒯𝒳 → 𝕊
pub fn serialize_transaction(tx: &Transaction) -> ByteString {
    let mut out = Vec::with_capacity(
        10 + tx.inputs.iter().map(|i| 41 + i.script_sig.len()).sum::<usize>()
            + tx.outputs.iter().map(|o| 9 + o.script_pubkey.len()).sum::<usize>(),
    );
    out.extend_from_slice(&tx.version.to_le_bytes());

    write_varint(&mut out, tx.inputs.len() as u64);
    for input in &tx.inputs {
        write_input(&mut out, input);
    }

    write_varint(&mut out, tx.outputs.len() as u64);
    for output in &tx.outputs {
        write_output(&mut out, output);
    }

    out.extend_from_slice(&tx.lock_time.to_le_bytes());
    out
}

/// Transaction id in internal byte order
pub fn calculate_txid(tx: &Transaction) -> Hash {
    double_sha256(&serialize_transaction(tx))
}

/// Transaction id in display (reversed) hex
pub fn txid_hex(tx: &Transaction) -> String {
    let mut txid = calculate_txid(tx);
    txid.reverse();
    hex::encode(txid)
}

/// Byte cursor over a serialized transaction
struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn take(&mut self, n: usize, what: &str) -> Result<&'a [u8]> {
        let end = self.pos.checked_add(n).filter(|&end| end <= self.data.len()).ok_or_else(|| {
            VaultError::Serialization(format!("unexpected end of data reading {}", what))
        })?;
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn read_u32(&mut self, what: &str) -> Result<u32> {
        let mut buf = [0u8; 4];
        buf.copy_from_slice(self.take(4, what)?);
        Ok(u32::from_le_bytes(buf))
    }

    fn read_i64(&mut self, what: &str) -> Result<i64> {
        let mut buf = [0u8; 8];
        buf.copy_from_slice(self.take(8, what)?);
        Ok(i64::from_le_bytes(buf))
    }

    fn read_varint(&mut self, what: &str) -> Result<u64> {
        let first = self.take(1, what)?[0];
        let (value, min) = match first {
            0xfd => {
                let mut buf = [0u8; 2];
                buf.copy_from_slice(self.take(2, what)?);
                (u16::from_le_bytes(buf) as u64, 0xfd)
            }
            0xfe => (self.read_u32(what)? as u64, 0x1_0000),
            0xff => {
                let mut buf = [0u8; 8];
                buf.copy_from_slice(self.take(8, what)?);
                (u64::from_le_bytes(buf), 0x1_0000_0000)
            }
            n => return Ok(n as u64),
        };
        if value < min {
            return Err(VaultError::Serialization(format!(
                "non-canonical CompactSize for {}",
                what
            )));
        }
        Ok(value)
    }

    fn read_bytes(&mut self, what: &str) -> Result<ByteString> {
        let len = self.read_varint(what)?;
        let len = usize::try_from(len)
            .map_err(|_| VaultError::Serialization(format!("{} length overflow", what)))?;
        Ok(self.take(len, what)?.to_vec())
    }

    fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }
}

/// Decode a CompactSize from the front of `data`, returning value and width.
pub fn read_varint(data: &[u8]) -> Result<(u64, usize)> {
    let mut reader = Reader::new(data);
    let value = reader.read_varint("varint")?;
    Ok((value, reader.pos))
}

/// DeserializeTransaction: 𝕊 → 𝒯𝒳
///
/// Requires exactly one transaction with no trailing bytes.
pub fn deserialize_transaction(data: &[u8]) -> Result<Transaction> {
    let mut reader = Reader::new(data);
    let version = reader.read_u32("version")?;

    let input_count = reader.read_varint("input count")?;
    // Each input is at least 41 bytes; bound the allocation by what is left.
    let mut inputs = Vec::with_capacity((input_count as usize).min(reader.remaining() / 41));
    for _ in 0..input_count {
        let mut hash = [0u8; 32];
        hash.copy_from_slice(reader.take(32, "prevout hash")?);
        let index = reader.read_u32("prevout index")?;
        let script_sig = reader.read_bytes("script_sig")?;
        let sequence = reader.read_u32("sequence")?;
        inputs.push(TransactionInput {
            prevout: OutPoint { hash, index },
            script_sig,
            sequence,
        });
    }

    let output_count = reader.read_varint("output count")?;
    let mut outputs = Vec::with_capacity((output_count as usize).min(reader.remaining() / 9));
    for _ in 0..output_count {
        let value = reader.read_i64("output value")?;
        let script_pubkey = reader.read_bytes("script_pubkey")?;
        outputs.push(TransactionOutput { value, script_pubkey });
    }

    let lock_time = reader.read_u32("lock_time")?;

    if reader.remaining() != 0 {
        return Err(VaultError::Serialization(format!(
            "{} trailing bytes after transaction",
            reader.remaining()
        )));
    }

    Ok(Transaction {
        version,
        inputs,
        outputs,
        lock_time,
    })
}

/// Parse a transaction from hex.
pub fn transaction_from_hex(hex_str: &str) -> Result<Transaction> {
    let bytes = hex::decode(hex_str)
        .map_err(|e| VaultError::Serialization(format!("invalid hex: {}", e)))?;
    deserialize_transaction(&bytes)
}

/// Serialize a transaction to lowercase hex.
pub fn transaction_to_hex(tx: &Transaction) -> String {
    hex::encode(serialize_transaction(tx))
}
