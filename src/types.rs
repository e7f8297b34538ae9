//! Core types for timelocked outputs and the transactions that spend them

use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::error::{Result, VaultError};

/// Hash type: 256-bit hash
pub type Hash = [u8; 32];

/// HASH160 digest: RIPEMD160(SHA256(x))
pub type Hash160 = [u8; 20];

/// Byte string type
pub type ByteString = Vec<u8>;

/// Natural number type
pub type Natural = u64;

/// Integer type
pub type Integer = i64;

/// OutPoint: 𝒪 = ℍ × ℕ
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OutPoint {
    pub hash: Hash,
    pub index: u32,
}

/// Transaction Input: ℐ = 𝒪 × 𝕊 × ℕ
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionInput {
    pub prevout: OutPoint,
    pub script_sig: ByteString,
    pub sequence: u32,
}

/// Transaction Output: 𝒯 = ℤ × 𝕊
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionOutput {
    pub value: Integer,
    pub script_pubkey: ByteString,
}

/// Transaction: 𝒯𝒳 = ℕ × ℐ* × 𝒯* × ℕ
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub version: u32,
    pub inputs: Vec<TransactionInput>,
    pub outputs: Vec<TransactionOutput>,
    pub lock_time: u32,
}

impl Transaction {
    /// True when every input carries the final sequence number, in which case
    /// the ledger ignores the lock time entirely.
    pub fn all_inputs_final(&self) -> bool {
        self.inputs.iter().all(|input| input.sequence == SEQUENCE_FINAL)
    }
}

/// Parameters of one absolute-timelock lock.
///
/// Fields are private so a value built through [`LockParameters::new`] always
/// satisfies `1 ≤ lock_height < LOCKTIME_THRESHOLD` and carries a compressed
/// public key. Deserialized values are re-checked by the script builder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockParameters {
    lock_height: Natural,
    owner_public_key: ByteString,
}

impl LockParameters {
    pub fn new(lock_height: Natural, owner_public_key: &[u8]) -> Result<Self> {
        let params = Self {
            lock_height,
            owner_public_key: owner_public_key.to_vec(),
        };
        params.validate()?;
        Ok(params)
    }

    pub fn lock_height(&self) -> Natural {
        self.lock_height
    }

    pub fn owner_public_key(&self) -> &[u8] {
        &self.owner_public_key
    }

    /// Check the invariants again; used after deserialization.
    pub fn validate(&self) -> Result<()> {
        validate_lock_height(self.lock_height)?;
        validate_compressed_pubkey(&self.owner_public_key)
    }
}

/// Lock heights live in `[1, LOCKTIME_THRESHOLD)`; higher values are calendar
/// time and are refused by this primitive.
pub fn validate_lock_height(lock_height: Natural) -> Result<()> {
    if lock_height == 0 {
        return Err(VaultError::InvalidParameter(
            "lock height must be positive".to_string(),
        ));
    }
    if lock_height >= LOCKTIME_THRESHOLD as Natural {
        return Err(VaultError::InvalidParameter(format!(
            "lock height {} is at or above the timestamp threshold {}",
            lock_height, LOCKTIME_THRESHOLD
        )));
    }
    Ok(())
}

/// A compressed public key is 33 bytes with an 0x02 or 0x03 prefix.
pub fn validate_compressed_pubkey(pubkey: &[u8]) -> Result<()> {
    if pubkey.len() != COMPRESSED_PUBKEY_LEN {
        return Err(VaultError::InvalidParameter(format!(
            "public key must be {} bytes, got {}",
            COMPRESSED_PUBKEY_LEN,
            pubkey.len()
        )));
    }
    if pubkey[0] != 0x02 && pubkey[0] != 0x03 {
        return Err(VaultError::InvalidParameter(format!(
            "public key prefix {:#04x} is not a compressed point",
            pubkey[0]
        )));
    }
    Ok(())
}

/// Commitment a funder pays to: the script hash and its address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundingCommitment {
    pub script_hash: Hash160,
    pub address: String,
}

/// Output being spent, as reported by the UTXO-discovery collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnspentReference {
    pub txid: Hash,
    pub output_index: u32,
    pub value: Integer,
    pub script_pubkey: ByteString,
}

impl UnspentReference {
    pub fn outpoint(&self) -> OutPoint {
        OutPoint {
            hash: self.txid,
            index: self.output_index,
        }
    }
}

/// Validation result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationResult {
    Valid,
    Invalid(crate::error::InvalidReason),
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationResult::Valid)
    }
}

/// Maturity of a lock relative to the chain tip
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LockState {
    /// Chain height is below the lock height
    Immature,
    /// Chain height has reached the lock height
    Mature,
}
