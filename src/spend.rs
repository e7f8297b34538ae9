//! Spend assembly and signing
//!
//! A [`CandidateSpend`] is built up mutably, then signed into an immutable
//! [`SignedTransaction`]. Signing refuses candidates the ledger would reject
//! for the lock: a lock time below the lock height, a final timelocked input,
//! or an output that does not commit to the locking script. It also refuses
//! SIGHASH_SINGLE signatures that would commit to no output.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::address::{commits_to, decode_address};
use crate::constants::*;
use crate::error::{Result, VaultError};
use crate::network::Network;
use crate::script::{build_unlocking_script, parse_locking_script};
use crate::serialization::{calculate_txid, serialize_transaction, transaction_to_hex, txid_hex};
use crate::sighash::{compute_sighash, verify, KeyCustody, SIGHASH_MASK, SIGHASH_SINGLE};
use crate::transaction::check_transaction;
use crate::types::*;

/// An output being spent and the sequence number its input will carry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpendInput {
    pub utxo: UnspentReference,
    pub sequence: u32,
}

/// Payment to an address
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpendOutput {
    pub address: String,
    pub value: Integer,
}

/// Spending transaction under assembly
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateSpend {
    pub version: u32,
    pub inputs: Vec<SpendInput>,
    pub outputs: Vec<SpendOutput>,
    pub lock_time: u32,
}

impl CandidateSpend {
    pub fn new(version: u32, lock_time: u32) -> Self {
        Self {
            version,
            inputs: Vec::new(),
            outputs: Vec::new(),
            lock_time,
        }
    }

    pub fn add_input(&mut self, utxo: UnspentReference, sequence: u32) -> &mut Self {
        self.inputs.push(SpendInput { utxo, sequence });
        self
    }

    pub fn add_output(&mut self, address: impl Into<String>, value: Integer) -> &mut Self {
        self.outputs.push(SpendOutput {
            address: address.into(),
            value,
        });
        self
    }

    pub fn total_input_value(&self) -> Result<Integer> {
        sum_values(self.inputs.iter().map(|input| input.utxo.value), "input")
    }

    pub fn total_output_value(&self) -> Result<Integer> {
        sum_values(self.outputs.iter().map(|output| output.value), "output")
    }

    /// Inputs minus outputs; spending more than is available is an error.
    pub fn fee(&self) -> Result<Integer> {
        let fee = self.total_input_value()? - self.total_output_value()?;
        if fee < 0 {
            return Err(VaultError::InvalidParameter(format!(
                "outputs exceed inputs by {}",
                -fee
            )));
        }
        Ok(fee)
    }

    /// Transaction with empty unlocking scripts, outputs resolved for `network`.
    ///
    /// Every output must reach `dust_threshold`; the threshold itself is
    /// policy supplied by the caller.
    pub fn to_unsigned_transaction(&self, network: Network, dust_threshold: Integer) -> Result<Transaction> {
        if self.inputs.is_empty() {
            return Err(VaultError::InvalidParameter("spend has no inputs".to_string()));
        }
        if self.outputs.is_empty() {
            return Err(VaultError::InvalidParameter("spend has no outputs".to_string()));
        }

        let mut outputs = Vec::with_capacity(self.outputs.len());
        for output in &self.outputs {
            if output.value < dust_threshold {
                return Err(VaultError::InvalidParameter(format!(
                    "output of {} to {} is below the dust threshold {}",
                    output.value, output.address, dust_threshold
                )));
            }
            outputs.push(TransactionOutput {
                value: output.value,
                script_pubkey: decode_address(&output.address, network)?.script_pubkey(),
            });
        }
        self.fee()?;

        Ok(Transaction {
            version: self.version,
            inputs: self
                .inputs
                .iter()
                .map(|input| TransactionInput {
                    prevout: input.utxo.outpoint(),
                    script_sig: Vec::new(),
                    sequence: input.sequence,
                })
                .collect(),
            outputs,
            lock_time: self.lock_time,
        })
    }
}

fn sum_values(values: impl Iterator<Item = Integer>, what: &str) -> Result<Integer> {
    let mut total: Integer = 0;
    for value in values {
        if !(0..=MAX_MONEY).contains(&value) {
            return Err(VaultError::InvalidParameter(format!(
                "{} value {} outside [0, {}]",
                what, value, MAX_MONEY
            )));
        }
        total = total
            .checked_add(value)
            .filter(|t| *t <= MAX_MONEY)
            .ok_or_else(|| VaultError::InvalidParameter(format!("total {} value exceeds MAX_MONEY", what)))?;
    }
    Ok(total)
}

/// A transaction whose timelocked inputs carry their unlocking scripts;
/// read-only once produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignedTransaction {
    tx: Transaction,
}

impl SignedTransaction {
    pub fn transaction(&self) -> &Transaction {
        &self.tx
    }

    pub fn into_transaction(self) -> Transaction {
        self.tx
    }

    pub fn to_bytes(&self) -> ByteString {
        serialize_transaction(&self.tx)
    }

    pub fn to_hex(&self) -> String {
        transaction_to_hex(&self.tx)
    }

    pub fn txid(&self) -> Hash {
        calculate_txid(&self.tx)
    }

    pub fn txid_hex(&self) -> String {
        txid_hex(&self.tx)
    }
}

/// SignTimelockedSpend: 𝒞𝒮 × ℕ* × 𝕊 × 𝒦 → 𝒯𝒳
///
/// For every index in `input_indices`:
/// 1. The input must spend the funding script of `locking_script`
/// 2. lock_height ≤ lock_time < LOCKTIME_THRESHOLD
/// 3. The input's sequence must be non-final
/// 4. The custody key must be the lock's owner key
/// 5. SIGHASH_SINGLE needs an output at the input's index
/// 6. Sign the input's sighash over `locking_script` and install
///    ⟨sig, locking_script⟩
///
/// Inputs not listed keep an empty unlocking script.
pub fn sign_timelocked_spend(
    candidate: &CandidateSpend,
    input_indices: &[usize],
    locking_script: &[u8],
    custody: &dyn KeyCustody,
    sighash_type: u32,
    network: Network,
    dust_threshold: Integer,
) -> Result<SignedTransaction> {
    let params = parse_locking_script(locking_script)?;
    if input_indices.is_empty() {
        return Err(VaultError::InvalidParameter("no inputs to sign".to_string()));
    }

    if (candidate.lock_time as Natural) < params.lock_height() {
        return Err(VaultError::InvalidParameter(format!(
            "lock time {} is below lock height {}",
            candidate.lock_time,
            params.lock_height()
        )));
    }
    if candidate.lock_time >= LOCKTIME_THRESHOLD {
        return Err(VaultError::InvalidParameter(format!(
            "lock time {} is a timestamp, lock is on height",
            candidate.lock_time
        )));
    }
    if custody.public_key()? != params.owner_public_key() {
        return Err(VaultError::Signing(
            "custody key is not the lock's owner key".to_string(),
        ));
    }

    for (n, &input_index) in input_indices.iter().enumerate() {
        if input_indices[..n].contains(&input_index) {
            return Err(VaultError::InvalidParameter(format!(
                "input {} listed twice",
                input_index
            )));
        }
        let input = candidate.inputs.get(input_index).ok_or_else(|| {
            VaultError::InvalidParameter(format!(
                "input index {} out of range (spend has {} inputs)",
                input_index,
                candidate.inputs.len()
            ))
        })?;
        if !commits_to(&input.utxo.script_pubkey, locking_script) {
            return Err(VaultError::InvalidParameter(format!(
                "output spent by input {} does not commit to the locking script",
                input_index
            )));
        }
        if input.sequence == SEQUENCE_FINAL {
            return Err(VaultError::InvalidParameter(format!(
                "timelocked input {} must not carry the final sequence number",
                input_index
            )));
        }
        // The legacy digest for an unmatched SINGLE input commits to nothing
        if sighash_type & SIGHASH_MASK == SIGHASH_SINGLE && input_index >= candidate.outputs.len() {
            return Err(VaultError::InvalidParameter(format!(
                "SIGHASH_SINGLE input {} has no output at its index ({} outputs)",
                input_index,
                candidate.outputs.len()
            )));
        }
    }

    let mut tx = candidate.to_unsigned_transaction(network, dust_threshold)?;
    let mut unlocking = Vec::with_capacity(input_indices.len());
    for &input_index in input_indices {
        let digest = compute_sighash(&tx, input_index, locking_script, sighash_type)?;
        let signature = custody.sign(&digest)?;
        if !verify(&digest, &signature, params.owner_public_key()) {
            return Err(VaultError::SignatureVerificationFailed(
                "custody returned a signature that does not verify".to_string(),
            ));
        }
        unlocking.push((input_index, build_unlocking_script(&signature, locking_script)));
    }
    for (input_index, script_sig) in unlocking {
        tx.inputs[input_index].script_sig = script_sig;
    }

    check_transaction(&tx)?;
    let signed = SignedTransaction { tx };
    debug!(
        txid = %signed.txid_hex(),
        inputs = input_indices.len(),
        lock_height = params.lock_height(),
        lock_time = candidate.lock_time,
        "signed timelocked spend"
    );
    Ok(signed)
}
