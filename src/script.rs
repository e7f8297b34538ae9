//! Lock, funding and unlocking script construction
//!
//! Layouts produced here:
//! - locking:   `<height> OP_CHECKLOCKTIMEVERIFY OP_DROP <pubkey> OP_CHECKSIG`
//! - funding:   `OP_HASH160 <HASH160(locking)> OP_EQUAL`
//! - unlocking: `<signature> <locking>`
//!
//! Every builder is a pure function of its input, so the funder and the
//! spender derive the same bytes independently.

use ripemd::Ripemd160;
use sha2::{Digest, Sha256};
use tracing::trace;

use crate::constants::*;
use crate::error::{Result, VaultError};
use crate::script_num;
use crate::types::*;

/// A single parsed script element
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    /// Data push, with the opcode that introduced it (OP_0 included)
    Push { opcode: u8, data: ByteString },
    /// Any other opcode
    Op(u8),
}

/// HASH160: RIPEMD160(SHA256(x))
pub fn hash160(data: &[u8]) -> Hash160 {
    let sha256_hash = Sha256::digest(data);
    let ripemd160_hash = Ripemd160::digest(sha256_hash);
    let mut out = [0u8; HASH160_LEN];
    out.copy_from_slice(&ripemd160_hash);
    out
}

/// Read the instruction starting at `pos`; returns it with the next position.
pub fn read_instruction(script: &[u8], pos: usize) -> Result<(Instruction, usize)> {
    let opcode = *script.get(pos).ok_or_else(|| {
        VaultError::ScriptExecution(format!("read past end of script at {}", pos))
    })?;
    let mut cursor = pos + 1;

    let len = match opcode {
        0x00..=0x4b => opcode as usize,
        OP_PUSHDATA1 => {
            let n = read_le(script, cursor, 1)?;
            cursor += 1;
            n
        }
        OP_PUSHDATA2 => {
            let n = read_le(script, cursor, 2)?;
            cursor += 2;
            n
        }
        OP_PUSHDATA4 => {
            let n = read_le(script, cursor, 4)?;
            cursor += 4;
            n
        }
        _ => return Ok((Instruction::Op(opcode), cursor)),
    };

    let end = cursor.checked_add(len).filter(|&end| end <= script.len()).ok_or_else(|| {
        VaultError::ScriptExecution(format!(
            "push of {} bytes at {} runs past end of script",
            len, pos
        ))
    })?;

    Ok((
        Instruction::Push {
            opcode,
            data: script[cursor..end].to_vec(),
        },
        end,
    ))
}

fn read_le(script: &[u8], pos: usize, width: usize) -> Result<usize> {
    let bytes = script.get(pos..pos + width).ok_or_else(|| {
        VaultError::ScriptExecution("truncated push length".to_string())
    })?;
    Ok(bytes
        .iter()
        .rev()
        .fold(0usize, |acc, &b| (acc << 8) | b as usize))
}

/// Split a script into instructions, failing on truncated pushes.
pub fn parse_script(script: &[u8]) -> Result<Vec<Instruction>> {
    let mut instructions = Vec::new();
    let mut pos = 0;
    while pos < script.len() {
        let (instruction, next) = read_instruction(script, pos)?;
        instructions.push(instruction);
        pos = next;
    }
    Ok(instructions)
}

/// Append a raw data push using the shortest push opcode for its length.
pub fn push_data(script: &mut ByteString, data: &[u8]) {
    let len = data.len();
    if len < OP_PUSHDATA1 as usize {
        script.push(len as u8);
    } else if len <= 0xff {
        script.push(OP_PUSHDATA1);
        script.push(len as u8);
    } else if len <= 0xffff {
        script.push(OP_PUSHDATA2);
        script.extend_from_slice(&(len as u16).to_le_bytes());
    } else {
        script.push(OP_PUSHDATA4);
        script.extend_from_slice(&(len as u32).to_le_bytes());
    }
    script.extend_from_slice(data);
}

/// True when `data` was pushed with the only encoding standardness accepts.
pub fn is_minimal_push(opcode: u8, data: &[u8]) -> bool {
    match data.len() {
        0 => opcode == OP_0,
        1 if (1..=16).contains(&data[0]) => opcode == OP_1 + data[0] - 1,
        1 if data[0] == 0x81 => opcode == OP_1NEGATE,
        len if len < OP_PUSHDATA1 as usize => opcode as usize == len,
        len if len <= 0xff => opcode == OP_PUSHDATA1,
        len if len <= 0xffff => opcode == OP_PUSHDATA2,
        _ => true,
    }
}

/// BuildLockingScript: 𝒫 → 𝕊
///
/// `<height> OP_CHECKLOCKTIMEVERIFY OP_DROP <pubkey> OP_CHECKSIG`, where the
/// height uses `OP_1`..`OP_16` when it fits and a minimal number push otherwise.
pub fn build_locking_script(params: &LockParameters) -> Result<ByteString> {
    params.validate()?;

    let height = params.lock_height() as i64;
    let mut script = Vec::with_capacity(8 + COMPRESSED_PUBKEY_LEN);
    if (1..=16).contains(&height) {
        script.push(OP_1 + (height - 1) as u8);
    } else {
        push_data(&mut script, &script_num::encode(height)?);
    }
    script.push(OP_CHECKLOCKTIMEVERIFY);
    script.push(OP_DROP);
    push_data(&mut script, params.owner_public_key());
    script.push(OP_CHECKSIG);

    trace!(lock_height = height, len = script.len(), "built locking script");
    Ok(script)
}

/// Recover the lock parameters from a locking script.
///
/// Only the exact layout produced by [`build_locking_script`] is accepted.
pub fn parse_locking_script(script: &[u8]) -> Result<LockParameters> {
    let instructions = parse_script(script)?;
    let not_a_lock = || VaultError::InvalidParameter("not an absolute-timelock script".to_string());

    let [height_op, Instruction::Op(OP_CHECKLOCKTIMEVERIFY), Instruction::Op(OP_DROP), Instruction::Push { opcode, data: pubkey }, Instruction::Op(OP_CHECKSIG)] =
        instructions.as_slice()
    else {
        return Err(not_a_lock());
    };

    let height = match height_op {
        Instruction::Op(op) if (OP_1..=OP_16).contains(op) => (op - OP_1 + 1) as i64,
        Instruction::Push { opcode, data } if is_minimal_push(*opcode, data) => {
            script_num::decode(data, MAX_LOCKTIME_NUM_LEN)?
        }
        _ => return Err(not_a_lock()),
    };

    if !is_minimal_push(*opcode, pubkey) {
        return Err(not_a_lock());
    }
    if height <= 0 {
        return Err(VaultError::InvalidParameter(format!(
            "lock height {} is not positive",
            height
        )));
    }

    LockParameters::new(height as Natural, pubkey)
}

/// BuildFundingScript: 𝕊 → 𝕊
///
/// `OP_HASH160 <HASH160(locking_script)> OP_EQUAL`
pub fn build_funding_script(locking_script: &[u8]) -> ByteString {
    script_hash_script(&hash160(locking_script))
}

/// Funding script for an already computed script hash.
pub fn script_hash_script(script_hash: &Hash160) -> ByteString {
    let mut script = Vec::with_capacity(HASH160_LEN + 3);
    script.push(OP_HASH160);
    push_data(&mut script, script_hash);
    script.push(OP_EQUAL);
    script
}

/// Script hash committed to by a funding script, if `script` is one.
pub fn extract_script_hash(script: &[u8]) -> Option<Hash160> {
    if script.len() != HASH160_LEN + 3
        || script[0] != OP_HASH160
        || script[1] != HASH160_LEN as u8
        || script[HASH160_LEN + 2] != OP_EQUAL
    {
        return None;
    }
    let mut hash = [0u8; HASH160_LEN];
    hash.copy_from_slice(&script[2..HASH160_LEN + 2]);
    Some(hash)
}

/// `OP_DUP OP_HASH160 <hash> OP_EQUALVERIFY OP_CHECKSIG`, for paying an
/// ordinary key-hash address.
pub fn pubkey_hash_script(pubkey_hash: &Hash160) -> ByteString {
    let mut script = Vec::with_capacity(HASH160_LEN + 5);
    script.push(OP_DUP);
    script.push(OP_HASH160);
    push_data(&mut script, pubkey_hash);
    script.push(OP_EQUALVERIFY);
    script.push(OP_CHECKSIG);
    script
}

/// `<signature> <locking_script>`
pub fn build_unlocking_script(signature: &[u8], locking_script: &[u8]) -> ByteString {
    let mut script = Vec::with_capacity(signature.len() + locking_script.len() + 4);
    push_data(&mut script, signature);
    push_data(&mut script, locking_script);
    script
}

/// Data pushed by a push-only script; any other opcode is an error.
pub fn parse_unlocking_script(script_sig: &[u8]) -> Result<Vec<ByteString>> {
    parse_script(script_sig)?
        .into_iter()
        .map(|instruction| match instruction {
            Instruction::Push { data, .. } => Ok(data),
            Instruction::Op(op @ OP_1NEGATE) | Instruction::Op(op @ OP_1..=OP_16) => {
                Ok(script_num::serialize_script_num(small_int_value(op)))
            }
            Instruction::Op(op) => Err(VaultError::ScriptExecution(format!(
                "unlocking script is not push-only (opcode {:#04x})",
                op
            ))),
        })
        .collect()
}

/// Value pushed by `OP_1NEGATE` and `OP_1`..`OP_16`.
pub fn small_int_value(opcode: u8) -> i64 {
    if opcode == OP_1NEGATE {
        -1
    } else {
        (opcode - OP_1 + 1) as i64
    }
}

/// Copy of `script` with every `OP_CODESEPARATOR` removed.
///
/// Bytes after a malformed push are copied verbatim, matching how the
/// signature hash serializes a script code it cannot fully parse.
pub fn remove_codeseparators(script: &[u8]) -> ByteString {
    let mut out = Vec::with_capacity(script.len());
    let mut pos = 0;
    while pos < script.len() {
        match read_instruction(script, pos) {
            Ok((Instruction::Op(OP_CODESEPARATOR), next)) => pos = next,
            Ok((_, next)) => {
                out.extend_from_slice(&script[pos..next]);
                pos = next;
            }
            Err(_) => {
                out.extend_from_slice(&script[pos..]);
                break;
            }
        }
    }
    out
}
