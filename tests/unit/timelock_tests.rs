//! Unit tests for timelock spend validation

use cltv_vault::*;
use cltv_vault::address::Address;
use cltv_vault::interpreter::verify_spend;
use cltv_vault::script::*;
use cltv_vault::sighash::{public_key_bytes, SIGHASH_ALL};
use cltv_vault::spend::sign_timelocked_spend;
use cltv_vault::timelock::*;
use secp256k1::SecretKey;

fn owner() -> SecretKey {
    SecretKey::from_slice(&[0x21; 32]).unwrap()
}

fn locking_script(height: Natural) -> ByteString {
    let params = LockParameters::new(height, &public_key_bytes(&owner())).unwrap();
    build_locking_script(&params).unwrap()
}

/// Two inputs: an ordinary final input first, the timelocked one second.
fn two_input_candidate(lock_time: u32, locking: &[u8]) -> CandidateSpend {
    let mut candidate = CandidateSpend::new(2, lock_time);
    candidate
        .add_input(
            UnspentReference {
                txid: [0x10; 32],
                output_index: 0,
                value: 5000,
                script_pubkey: vec![OP_1],
            },
            SEQUENCE_FINAL,
        )
        .add_input(
            UnspentReference {
                txid: [0x20; 32],
                output_index: 3,
                value: 50_000,
                script_pubkey: build_funding_script(locking),
            },
            SEQUENCE_LOCKTIME_ENABLED,
        )
        .add_output(Address::PubkeyHash([0x07; 20]).to_string_for(Network::Testnet), 54_000);
    candidate
}

fn sign(candidate: &CandidateSpend, locking: &[u8]) -> SignedTransaction {
    sign_timelocked_spend(
        candidate,
        &[1],
        locking,
        &owner(),
        SIGHASH_ALL,
        Network::Testnet,
        DEFAULT_DUST_THRESHOLD,
    )
    .unwrap()
}

#[test]
fn test_timelocked_input_found_at_any_index() {
    let locking = locking_script(2000);
    let signed = sign(&two_input_candidate(2000, &locking), &locking);
    assert_eq!(
        validate(signed.transaction(), None, &locking).unwrap(),
        ValidationResult::Valid
    );
    assert!(verify_spend(signed.transaction(), 1, &build_funding_script(&locking)).unwrap());
}

#[test]
fn test_lock_time_above_lock_height_is_accepted() {
    let locking = locking_script(2000);
    let signed = sign(&two_input_candidate(250_000, &locking), &locking);
    assert_eq!(
        validate(signed.transaction(), Some(&FixedHeight(250_000)), &locking).unwrap(),
        ValidationResult::Valid
    );
}

#[test]
fn test_oracle_boundary() {
    let locking = locking_script(2000);
    let signed = sign(&two_input_candidate(2000, &locking), &locking);
    let tx = signed.transaction();
    assert_eq!(
        validate(tx, Some(&FixedHeight(1999)), &locking).unwrap(),
        ValidationResult::Invalid(InvalidReason::NotYetMature)
    );
    assert_eq!(validate(tx, Some(&FixedHeight(2000)), &locking).unwrap(), ValidationResult::Valid);
    assert_eq!(validate(tx, Some(&FixedHeight(2001)), &locking).unwrap(), ValidationResult::Valid);
}

#[test]
fn test_check_order_lock_time_before_finality() {
    let locking = locking_script(2000);
    let mut tx = sign(&two_input_candidate(2000, &locking), &locking).into_transaction();
    tx.lock_time = 1999;
    for input in &mut tx.inputs {
        input.sequence = SEQUENCE_FINAL;
    }
    assert_eq!(
        validate(&tx, None, &locking).unwrap(),
        ValidationResult::Invalid(InvalidReason::LockTimeTooLow)
    );
}

#[test]
fn test_check_order_finality_before_signature() {
    let locking = locking_script(2000);
    let mut tx = sign(&two_input_candidate(2000, &locking), &locking).into_transaction();
    tx.inputs[1].sequence = SEQUENCE_FINAL;
    assert_eq!(
        validate(&tx, None, &locking).unwrap(),
        ValidationResult::Invalid(InvalidReason::AllInputsFinal)
    );
}

#[test]
fn test_other_locking_script_is_not_matched() {
    let locking = locking_script(2000);
    let signed = sign(&two_input_candidate(2000, &locking), &locking);
    assert_eq!(
        validate(signed.transaction(), None, &locking_script(1500)).unwrap(),
        ValidationResult::Invalid(InvalidReason::UnlockingDataMismatch)
    );
}

#[test]
fn test_lock_state_transitions() {
    assert_eq!(lock_state(2000, &FixedHeight(0)).unwrap(), LockState::Immature);
    assert_eq!(lock_state(2000, &FixedHeight(1999)).unwrap(), LockState::Immature);
    assert_eq!(lock_state(2000, &FixedHeight(2000)).unwrap(), LockState::Mature);
}
