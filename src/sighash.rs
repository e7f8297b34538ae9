//! Legacy signature hash, signing and verification
//!
//! The digest is the double SHA-256 of a modified copy of the spending
//! transaction: the signed input carries the script code, every other input
//! carries an empty script, and the flag byte decides which other inputs and
//! outputs are committed to. The 4-byte flag is appended before hashing.

use secp256k1::{ecdsa::Signature, Message, PublicKey, Secp256k1, SecretKey};
use serde::{Deserialize, Serialize};
use tracing::{trace, warn};

use crate::error::{Result, VaultError};
use crate::script::remove_codeseparators;
use crate::serialization::{double_sha256, write_bytes, write_varint};
use crate::types::*;

/// Sign all inputs and all outputs.
pub const SIGHASH_ALL: u32 = 0x01;

/// Sign all inputs and no outputs.
pub const SIGHASH_NONE: u32 = 0x02;

/// Sign all inputs and the output with the same index as the signed input.
pub const SIGHASH_SINGLE: u32 = 0x03;

/// Sign only the current input.
pub const SIGHASH_ANYONECANPAY: u32 = 0x80;

/// Mask selecting the base type (ALL, NONE, SINGLE).
pub const SIGHASH_MASK: u32 = 0x1f;

/// Digest returned when SIGHASH_SINGLE has no output at the input's index.
///
/// The ledger signs the number one rather than failing; kept for consensus
/// compatibility.
pub const SIGHASH_SINGLE_BUG_DIGEST: Hash = {
    let mut one = [0u8; 32];
    one[0] = 1;
    one
};

/// A signature hash together with the flag it was computed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SighashDigest {
    pub hash: Hash,
    pub sighash_type: u32,
}

/// ComputeSighash: 𝒯𝒳 × ℕ × 𝕊 × ℕ → ℍ
///
/// 1. Remove OP_CODESEPARATOR from the script code
/// 2. Inputs: only the signed one under ANYONECANPAY, otherwise all, with
///    empty scripts except the signed input; NONE and SINGLE zero the other
///    inputs' sequence numbers
/// 3. Outputs: none for NONE, outputs `0..=input_index` for SINGLE with the
///    earlier ones nulled (value −1, empty script), otherwise all
/// 4. Append the flag as u32 LE and double SHA-256
pub fn compute_sighash(
    tx: &Transaction,
    input_index: usize,
    script_code: &[u8],
    sighash_type: u32,
) -> Result<SighashDigest> {
    if input_index >= tx.inputs.len() {
        return Err(VaultError::InvalidParameter(format!(
            "input index {} out of range (tx has {} inputs)",
            input_index,
            tx.inputs.len()
        )));
    }

    let base_type = sighash_type & SIGHASH_MASK;
    let anyone_can_pay = sighash_type & SIGHASH_ANYONECANPAY != 0;

    if base_type == SIGHASH_SINGLE && input_index >= tx.outputs.len() {
        warn!(
            input_index,
            outputs = tx.outputs.len(),
            "SIGHASH_SINGLE without matching output, signing the constant one digest"
        );
        return Ok(SighashDigest {
            hash: SIGHASH_SINGLE_BUG_DIGEST,
            sighash_type,
        });
    }

    let script_code = remove_codeseparators(script_code);
    let mut preimage = Vec::with_capacity(128 + script_code.len());
    preimage.extend_from_slice(&tx.version.to_le_bytes());

    // Inputs
    let signed_inputs: Vec<usize> = if anyone_can_pay {
        vec![input_index]
    } else {
        (0..tx.inputs.len()).collect()
    };
    write_varint(&mut preimage, signed_inputs.len() as u64);
    for i in signed_inputs {
        let input = &tx.inputs[i];
        preimage.extend_from_slice(&input.prevout.hash);
        preimage.extend_from_slice(&input.prevout.index.to_le_bytes());
        if i == input_index {
            write_bytes(&mut preimage, &script_code);
        } else {
            write_bytes(&mut preimage, &[]);
        }
        let sequence = if i != input_index && (base_type == SIGHASH_NONE || base_type == SIGHASH_SINGLE) {
            0
        } else {
            input.sequence
        };
        preimage.extend_from_slice(&sequence.to_le_bytes());
    }

    // Outputs
    match base_type {
        SIGHASH_NONE => write_varint(&mut preimage, 0),
        SIGHASH_SINGLE => {
            write_varint(&mut preimage, (input_index + 1) as u64);
            for _ in 0..input_index {
                preimage.extend_from_slice(&(-1i64).to_le_bytes());
                write_bytes(&mut preimage, &[]);
            }
            let output = &tx.outputs[input_index];
            preimage.extend_from_slice(&output.value.to_le_bytes());
            write_bytes(&mut preimage, &output.script_pubkey);
        }
        _ => {
            write_varint(&mut preimage, tx.outputs.len() as u64);
            for output in &tx.outputs {
                preimage.extend_from_slice(&output.value.to_le_bytes());
                write_bytes(&mut preimage, &output.script_pubkey);
            }
        }
    }

    preimage.extend_from_slice(&tx.lock_time.to_le_bytes());
    preimage.extend_from_slice(&sighash_type.to_le_bytes());

    let hash = double_sha256(&preimage);
    trace!(input_index, sighash_type, preimage_len = preimage.len(), "computed sighash");
    Ok(SighashDigest { hash, sighash_type })
}

/// Sign a digest: DER with low S, followed by the flag byte.
pub fn sign(digest: &SighashDigest, secret_key: &SecretKey) -> Result<ByteString> {
    if digest.sighash_type > 0xff {
        return Err(VaultError::Signing(format!(
            "sighash type {:#x} does not fit the signature's flag byte",
            digest.sighash_type
        )));
    }
    let secp = Secp256k1::signing_only();
    let message = Message::from_digest_slice(&digest.hash)
        .map_err(|e| VaultError::Signing(e.to_string()))?;
    let mut signature = secp.sign_ecdsa(&message, secret_key);
    signature.normalize_s();

    let mut out = signature.serialize_der().to_vec();
    out.push(digest.sighash_type as u8);
    Ok(out)
}

/// Verify `signature` (DER plus flag byte) over `digest` with `public_key`.
///
/// False for an unparsable key or signature, a flag byte other than the one
/// the digest was computed with, a high-S signature, or an ECDSA failure.
pub fn verify(digest: &SighashDigest, signature: &[u8], public_key: &[u8]) -> bool {
    let Some((&flag, der)) = signature.split_last() else {
        return false;
    };
    if flag as u32 != digest.sighash_type {
        return false;
    }

    let pubkey = match PublicKey::from_slice(public_key) {
        Ok(pk) => pk,
        Err(_) => return false,
    };
    let signature = match Signature::from_der(der) {
        Ok(sig) => sig,
        Err(_) => return false,
    };
    let message = match Message::from_digest_slice(&digest.hash) {
        Ok(msg) => msg,
        Err(_) => return false,
    };

    Secp256k1::verification_only()
        .verify_ecdsa(&message, &signature, &pubkey)
        .is_ok()
}

/// Compressed public key for a secret key
pub fn public_key_bytes(secret_key: &SecretKey) -> ByteString {
    let secp = Secp256k1::signing_only();
    PublicKey::from_secret_key(&secp, secret_key).serialize().to_vec()
}

/// Key-custody collaborator: holds the private key, hands out signatures.
///
/// Implementations may block (hardware, remote signer); callers own retry.
pub trait KeyCustody {
    /// Compressed public key of the held key
    fn public_key(&self) -> Result<ByteString>;

    /// DER signature plus flag byte over `digest`
    fn sign(&self, digest: &SighashDigest) -> Result<ByteString>;
}

impl KeyCustody for SecretKey {
    fn public_key(&self) -> Result<ByteString> {
        Ok(public_key_bytes(self))
    }

    fn sign(&self, digest: &SighashDigest) -> Result<ByteString> {
        sign(digest, self)
    }
}
