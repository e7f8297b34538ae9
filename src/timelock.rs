//! Timelock spend validation
//!
//! Decides whether a candidate transaction legally spends an absolute
//! timelock: lock time against the lock height, input finality, the shape of
//! the unlocking data, the owner's signature, and optionally the chain height
//! reported by an injected oracle.

use tracing::{debug, trace};

use crate::constants::*;
use crate::error::{InvalidReason, Result, VaultError};
use crate::script::{parse_locking_script, parse_unlocking_script};
use crate::sighash::{compute_sighash, verify};
use crate::types::*;

/// Source of the current chain height.
///
/// Calls may block (remote node); the validator never retries.
pub trait ChainHeightOracle {
    fn current_height(&self) -> Result<Natural>;
}

/// Oracle reporting a fixed height.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedHeight(pub Natural);

impl ChainHeightOracle for FixedHeight {
    fn current_height(&self) -> Result<Natural> {
        Ok(self.0)
    }
}

/// LockState: ℕ × 𝒪𝓇 → {Immature, Mature}
pub fn lock_state(lock_height: Natural, oracle: &dyn ChainHeightOracle) -> Result<LockState> {
    let height = oracle.current_height()?;
    Ok(if height >= lock_height {
        LockState::Mature
    } else {
        LockState::Immature
    })
}

/// Inputs whose unlocking data reveals `locking_script`, with their pushes.
fn timelocked_inputs<'a>(
    tx: &'a Transaction,
    locking_script: &'a [u8],
) -> impl Iterator<Item = (usize, Vec<ByteString>)> + 'a {
    tx.inputs.iter().enumerate().filter_map(move |(index, input)| {
        let pushes = parse_unlocking_script(&input.script_sig).ok()?;
        if pushes.last()?.as_slice() == locking_script {
            Some((index, pushes))
        } else {
            None
        }
    })
}

/// First reason the timelocked input at `input_index` fails, if any.
fn check_timelocked_input(
    tx: &Transaction,
    input_index: usize,
    pushes: &[ByteString],
    locking_script: &[u8],
    owner_public_key: &[u8],
) -> Result<Option<InvalidReason>> {
    let [signature, _] = pushes else {
        return Ok(Some(InvalidReason::UnlockingDataMismatch));
    };
    if tx.inputs[input_index].sequence == SEQUENCE_FINAL {
        return Ok(Some(InvalidReason::TimelockedInputFinal));
    }
    let Some(&flag) = signature.last() else {
        return Ok(Some(InvalidReason::SignatureVerificationFailed));
    };
    let digest = compute_sighash(tx, input_index, locking_script, flag as u32)?;
    if !verify(&digest, signature, owner_public_key) {
        return Ok(Some(InvalidReason::SignatureVerificationFailed));
    }
    Ok(None)
}

/// ValidateTimelockSpend: 𝒯𝒳 × 𝒪𝓇? × 𝕊 → {valid, invalid}
///
/// Checks, first failure wins:
/// 1. tx.lock_time ≥ lock_height, and tx.lock_time is a height
/// 2. ∃ i ∈ tx.inputs: i.sequence < 0xffffffff
/// 3. at least one input reveals locking_script; every such input carries
///    exactly ⟨signature, locking_script⟩ and is itself non-final
/// 4. each of those signatures verifies under the script's embedded key,
///    over the sighash of its own input
/// 5. with an oracle: current_height ≥ lock_height
///
/// A locking script of any other layout, or a failing oracle, is an error.
pub fn validate(
    tx: &Transaction,
    oracle: Option<&dyn ChainHeightOracle>,
    locking_script: &[u8],
) -> Result<ValidationResult> {
    let params = parse_locking_script(locking_script)?;
    let lock_height = params.lock_height();

    let invalid = |reason: InvalidReason| {
        debug!(%reason, lock_height, lock_time = tx.lock_time, "timelock spend rejected");
        Ok(ValidationResult::Invalid(reason))
    };

    // 1. Lock time
    if (tx.lock_time as Natural) < lock_height {
        return invalid(InvalidReason::LockTimeTooLow);
    }
    if tx.lock_time >= LOCKTIME_THRESHOLD {
        return invalid(InvalidReason::LockTimeTypeMismatch);
    }

    // 2. Finality
    if tx.all_inputs_final() {
        return invalid(InvalidReason::AllInputsFinal);
    }

    // 3, 4. Unlocking data and signature of every timelocked input
    let mut checked = 0usize;
    for (input_index, pushes) in timelocked_inputs(tx, locking_script) {
        if let Some(reason) =
            check_timelocked_input(tx, input_index, &pushes, locking_script, params.owner_public_key())?
        {
            trace!(input_index, "timelocked input failed");
            return invalid(reason);
        }
        checked += 1;
    }
    if checked == 0 {
        return invalid(InvalidReason::UnlockingDataMismatch);
    }

    // 5. Chain height
    if let Some(oracle) = oracle {
        let height = oracle
            .current_height()
            .map_err(|e| VaultError::Oracle(e.to_string()))?;
        trace!(height, lock_height, "chain height from oracle");
        if height < lock_height {
            return invalid(InvalidReason::NotYetMature);
        }
    }

    debug!(inputs = checked, lock_height, "timelock spend valid");
    Ok(ValidationResult::Valid)
}
