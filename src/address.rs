//! Base58Check addresses for script-hash and key-hash outputs
//!
//! An address is `base58(version || hash160 || checksum)` where the checksum
//! is the first four bytes of the double SHA-256 of `version || hash160`.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::constants::HASH160_LEN;
use crate::error::{Result, VaultError};
use crate::network::Network;
use crate::script::{build_funding_script, hash160, pubkey_hash_script, script_hash_script};
use crate::serialization::double_sha256;
use crate::types::*;

const CHECKSUM_LEN: usize = 4;

/// Decoded payment destination
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Address {
    /// Pay to a script hash; spent by revealing the script
    ScriptHash(Hash160),
    /// Pay to a public key hash
    PubkeyHash(Hash160),
}

impl Address {
    /// Output script paying to this address
    pub fn script_pubkey(&self) -> ByteString {
        match self {
            Address::ScriptHash(hash) => script_hash_script(hash),
            Address::PubkeyHash(hash) => pubkey_hash_script(hash),
        }
    }

    /// Encode for `network`
    pub fn to_string_for(&self, network: Network) -> String {
        match self {
            Address::ScriptHash(hash) => derive_address(hash, network.script_hash_version()),
            Address::PubkeyHash(hash) => derive_address(hash, network.pubkey_hash_version()),
        }
    }
}

/// DeriveAddress: ℍ₁₆₀ × 𝔹 → String
pub fn derive_address(script_hash: &Hash160, version: u8) -> String {
    let mut payload = Vec::with_capacity(1 + HASH160_LEN + CHECKSUM_LEN);
    payload.push(version);
    payload.extend_from_slice(script_hash);
    let checksum = double_sha256(&payload);
    payload.extend_from_slice(&checksum[..CHECKSUM_LEN]);
    bs58::encode(payload).into_string()
}

/// ParseAddress: String × 𝔹 → ℍ₁₆₀
///
/// Inverse of [`derive_address`]. The checksum is verified before the
/// length and version so that any corruption of a well-formed address
/// reports as a checksum failure.
pub fn parse_address(address: &str, expected_version: u8) -> Result<Hash160> {
    let (version, hash) = decode_check(address)?;
    if version != expected_version {
        return Err(VaultError::AddressVersionMismatch {
            expected: expected_version,
            found: version,
        });
    }
    Ok(hash)
}

/// Decode an address of either kind for `network`.
pub fn decode_address(address: &str, network: Network) -> Result<Address> {
    let (version, hash) = decode_check(address)?;
    if version == network.script_hash_version() {
        Ok(Address::ScriptHash(hash))
    } else if version == network.pubkey_hash_version() {
        Ok(Address::PubkeyHash(hash))
    } else {
        Err(VaultError::AddressVersionMismatch {
            expected: network.script_hash_version(),
            found: version,
        })
    }
}

fn decode_check(address: &str) -> Result<(u8, Hash160)> {
    let decoded = bs58::decode(address)
        .into_vec()
        .map_err(|e| VaultError::InvalidAddress(e.to_string()))?;

    if decoded.len() < CHECKSUM_LEN {
        return Err(VaultError::InvalidAddress(format!(
            "decoded address is only {} bytes",
            decoded.len()
        )));
    }

    let (payload, checksum) = decoded.split_at(decoded.len() - CHECKSUM_LEN);
    if checksum != &double_sha256(payload)[..CHECKSUM_LEN] {
        return Err(VaultError::AddressChecksumMismatch);
    }

    if payload.len() != 1 + HASH160_LEN {
        return Err(VaultError::InvalidAddress(format!(
            "address payload is {} bytes, expected {}",
            payload.len(),
            1 + HASH160_LEN
        )));
    }

    let mut hash = [0u8; HASH160_LEN];
    hash.copy_from_slice(&payload[1..]);
    Ok((payload[0], hash))
}

/// Commitment for funding the lock on `network`.
pub fn funding_commitment(locking_script: &[u8], network: Network) -> FundingCommitment {
    let script_hash = hash160(locking_script);
    let address = derive_address(&script_hash, network.script_hash_version());
    debug!(%address, %network, "derived funding commitment");
    FundingCommitment {
        script_hash,
        address,
    }
}

/// Check that a revealed locking script is the one `address` commits to.
pub fn verify_commitment(address: &str, locking_script: &[u8], network: Network) -> Result<bool> {
    let committed = parse_address(address, network.script_hash_version())?;
    Ok(committed == hash160(locking_script))
}

/// Output script for funding: same bytes as the script-hash address decodes to.
pub fn funding_script_for(commitment: &FundingCommitment) -> ByteString {
    script_hash_script(&commitment.script_hash)
}

/// True if `script_pubkey` is the funding script for `locking_script`.
pub fn commits_to(script_pubkey: &[u8], locking_script: &[u8]) -> bool {
    script_pubkey == build_funding_script(locking_script).as_slice()
}
