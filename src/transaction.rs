//! Context-free transaction checks

use std::collections::HashSet;

use crate::constants::*;
use crate::error::{Result, VaultError};
use crate::serialization::serialize_transaction;
use crate::types::*;

/// CheckTransaction: 𝒯𝒳 → {valid, invalid}
///
/// A transaction tx = (v, ins, outs, lt) is well formed if and only if:
/// 1. |ins| > 0 ∧ |outs| > 0
/// 2. ∀o ∈ outs: 0 ≤ o.value ≤ M_max, and Σ o.value ≤ M_max
/// 3. |serialize(tx)| ≤ MAX_TX_SIZE
/// 4. no outpoint is spent twice
/// 5. coinbase: 2 ≤ |scriptSig| ≤ 100; otherwise no null prevout
pub fn check_transaction(tx: &Transaction) -> Result<()> {
    // 1. Check inputs and outputs are not empty
    if tx.inputs.is_empty() || tx.outputs.is_empty() {
        return Err(invalid("Empty inputs or outputs".to_string()));
    }

    // 2. Check output values are valid
    let mut total: Integer = 0;
    for (i, output) in tx.outputs.iter().enumerate() {
        if output.value < 0 || output.value > MAX_MONEY {
            return Err(invalid(format!(
                "Invalid output value {} at index {}",
                output.value, i
            )));
        }
        total += output.value;
        if total > MAX_MONEY {
            return Err(invalid(format!("Total output value {} exceeds MAX_MONEY", total)));
        }
    }

    // 3. Check transaction size limit
    let tx_size = serialize_transaction(tx).len();
    if tx_size > MAX_TX_SIZE {
        return Err(invalid(format!("Transaction too large: {} bytes", tx_size)));
    }

    // 4. Check for duplicate inputs
    let mut seen = HashSet::with_capacity(tx.inputs.len());
    for input in &tx.inputs {
        if !seen.insert(&input.prevout) {
            return Err(invalid(format!(
                "Duplicate input {}:{}",
                hex::encode(input.prevout.hash),
                input.prevout.index
            )));
        }
    }

    // 5. Coinbase shape
    if is_coinbase(tx) {
        let len = tx.inputs[0].script_sig.len();
        if !(2..=100).contains(&len) {
            return Err(invalid(format!("Coinbase scriptSig length {} out of range", len)));
        }
    } else if tx.inputs.iter().any(|input| is_null_prevout(&input.prevout)) {
        return Err(invalid("Null prevout in non-coinbase transaction".to_string()));
    }

    Ok(())
}

fn invalid(message: String) -> VaultError {
    VaultError::InvalidParameter(message)
}

/// Check if transaction is coinbase
pub fn is_coinbase(tx: &Transaction) -> bool {
    tx.inputs.len() == 1 && is_null_prevout(&tx.inputs[0].prevout)
}

fn is_null_prevout(prevout: &OutPoint) -> bool {
    prevout.hash == [0u8; 32] && prevout.index == 0xffffffff
}
