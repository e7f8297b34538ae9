//! Fund-then-spend lifecycle through the public API

use cltv_vault::*;
use cltv_vault::address::{decode_address, Address};
use cltv_vault::duration::{DurationPreset, LockTarget};
use cltv_vault::serialization::{deserialize_transaction, transaction_from_hex};
use cltv_vault::sighash::{SIGHASH_ALL, SIGHASH_ANYONECANPAY, SIGHASH_SINGLE};
use secp256k1::SecretKey;

struct Scenario {
    vault: TimelockVault,
    owner: SecretKey,
    params: LockParameters,
    locking_script: ByteString,
    commitment: FundingCommitment,
}

fn scenario(config: VaultConfig, current_height: Natural, target: LockTarget) -> Scenario {
    let vault = TimelockVault::with_config(config);
    let owner = SecretKey::from_slice(&[0x33; 32]).unwrap();
    let pubkey = vault.public_key(&owner).unwrap();
    let params = vault.lock_parameters(target, current_height, &pubkey).unwrap();
    let locking_script = vault.locking_script(&params).unwrap();
    let commitment = vault.funding_commitment(&locking_script);
    Scenario {
        vault,
        owner,
        params,
        locking_script,
        commitment,
    }
}

/// The funding output as an indexer would report it, derived from the address.
fn funded_utxo(s: &Scenario) -> UnspentReference {
    let network = s.vault.config().network;
    UnspentReference {
        txid: [0xa5; 32],
        output_index: 2,
        value: 1_000_000,
        script_pubkey: decode_address(&s.commitment.address, network).unwrap().script_pubkey(),
    }
}

fn payout(network: Network) -> String {
    Address::PubkeyHash([0x44; 20]).to_string_for(network)
}

#[test]
fn test_fund_and_spend_after_one_week() {
    let config = VaultConfig {
        network: Network::Testnet,
        ..VaultConfig::default()
    };
    let s = scenario(config, 840_000, LockTarget::After(DurationPreset::OneWeek));
    assert_eq!(s.params.lock_height(), 841_008);
    assert!(s.commitment.address.starts_with('2'));

    let lock_height = s.params.lock_height() as u32;
    let mut candidate = s.vault.candidate_spend(funded_utxo(&s), lock_height);
    candidate.add_output(payout(Network::Testnet), 990_000);
    assert_eq!(candidate.fee().unwrap(), 10_000);

    let signed = s.vault.sign_spend(&candidate, &[0], &s.locking_script, &s.owner).unwrap();
    let tx = signed.transaction();

    assert_eq!(
        s.vault.validate_spend(tx, Some(&FixedHeight(841_007)), &s.locking_script).unwrap(),
        ValidationResult::Invalid(InvalidReason::NotYetMature)
    );
    assert_eq!(
        s.vault.validate_spend(tx, Some(&FixedHeight(841_008)), &s.locking_script).unwrap(),
        ValidationResult::Valid
    );
    assert!(s.vault.verify_script(tx, 0, &funded_utxo(&s).script_pubkey).unwrap());
}

#[test]
fn test_signed_transaction_survives_wire_roundtrip() {
    let s = scenario(VaultConfig::default(), 0, LockTarget::Height(700_000));
    let mut candidate = s.vault.candidate_spend(funded_utxo(&s), 700_000);
    candidate.add_output(payout(Network::Mainnet), 999_000);
    let signed = s.vault.sign_spend(&candidate, &[0], &s.locking_script, &s.owner).unwrap();

    let parsed = transaction_from_hex(&signed.to_hex()).unwrap();
    assert_eq!(&parsed, signed.transaction());
    assert_eq!(deserialize_transaction(&signed.to_bytes()).unwrap(), parsed);
    assert_eq!(
        s.vault.validate_spend(&parsed, None, &s.locking_script).unwrap(),
        ValidationResult::Valid
    );
    assert_eq!(signed.txid_hex().len(), 64);
}

#[test]
fn test_spend_signed_with_single_anyonecanpay() {
    let config = VaultConfig {
        network: Network::Regtest,
        sighash_type: SIGHASH_SINGLE | SIGHASH_ANYONECANPAY,
        ..VaultConfig::default()
    };
    let s = scenario(config, 100, LockTarget::Height(150));
    let mut candidate = s.vault.candidate_spend(funded_utxo(&s), 150);
    candidate.add_output(payout(Network::Regtest), 500_000);
    let signed = s.vault.sign_spend(&candidate, &[0], &s.locking_script, &s.owner).unwrap();

    // Outputs past the signed one may be appended afterwards
    let mut extended = signed.into_transaction();
    extended.outputs.push(TransactionOutput {
        value: 400_000,
        script_pubkey: Address::PubkeyHash([0x55; 20]).script_pubkey(),
    });
    assert_eq!(
        s.vault.validate_spend(&extended, None, &s.locking_script).unwrap(),
        ValidationResult::Valid
    );

    // The signed output may not be changed
    extended.outputs[0].value -= 1;
    assert_eq!(
        s.vault.validate_spend(&extended, None, &s.locking_script).unwrap(),
        ValidationResult::Invalid(InvalidReason::SignatureVerificationFailed)
    );
}

#[test]
fn test_small_lock_height_uses_small_integer_opcode() {
    let config = VaultConfig {
        network: Network::Regtest,
        ..VaultConfig::default()
    };
    let s = scenario(config, 0, LockTarget::Height(12));
    assert_eq!(s.locking_script[0], OP_1 + 11);

    let mut candidate = s.vault.candidate_spend(funded_utxo(&s), 12);
    candidate.add_output(payout(Network::Regtest), 900_000);
    let signed = s.vault.sign_spend(&candidate, &[0], &s.locking_script, &s.owner).unwrap();
    assert!(s
        .vault
        .verify_script(signed.transaction(), 0, &funded_utxo(&s).script_pubkey)
        .unwrap());
}

#[test]
fn test_premature_signing_is_refused() {
    let s = scenario(VaultConfig::default(), 0, LockTarget::Height(1000));
    let mut candidate = s.vault.candidate_spend(funded_utxo(&s), 999);
    candidate.add_output(payout(Network::Mainnet), 900_000);
    assert!(matches!(
        s.vault.sign_spend(&candidate, &[0], &s.locking_script, &s.owner),
        Err(VaultError::InvalidParameter(_))
    ));
}

#[test]
fn test_default_sighash_is_all() {
    assert_eq!(VaultConfig::default().sighash_type, SIGHASH_ALL);
}

#[test]
fn test_address_funded_twice_is_swept_in_one_spend() {
    let s = scenario(VaultConfig::default(), 0, LockTarget::Height(5000));
    let second = UnspentReference {
        txid: [0xb6; 32],
        output_index: 0,
        ..funded_utxo(&s)
    };
    let mut candidate = s.vault.candidate_spend(funded_utxo(&s), 5000);
    candidate
        .add_input(second, SEQUENCE_LOCKTIME_ENABLED)
        .add_output(payout(Network::Mainnet), 1_990_000);
    let signed = s.vault.sign_spend(&candidate, &[0, 1], &s.locking_script, &s.owner).unwrap();
    let script_pubkey = funded_utxo(&s).script_pubkey;
    for i in 0..2 {
        assert!(s.vault.verify_script(signed.transaction(), i, &script_pubkey).unwrap());
    }

    // Copying the first input's unlocking data onto the second breaks it
    let mut tx = signed.into_transaction();
    tx.inputs[1].script_sig = tx.inputs[0].script_sig.clone();
    assert!(!s.vault.verify_script(&tx, 1, &script_pubkey).unwrap());
    assert_eq!(
        s.vault.validate_spend(&tx, None, &s.locking_script).unwrap(),
        ValidationResult::Invalid(InvalidReason::SignatureVerificationFailed)
    );
}

#[test]
fn test_single_signature_never_commits_to_nothing() {
    let config = VaultConfig {
        sighash_type: SIGHASH_SINGLE,
        ..VaultConfig::default()
    };
    let s = scenario(config, 0, LockTarget::Height(5000));
    let mut candidate = s.vault.candidate_spend(
        UnspentReference {
            txid: [0xc7; 32],
            output_index: 0,
            value: 10_000,
            script_pubkey: vec![OP_1],
        },
        5000,
    );
    candidate
        .add_input(funded_utxo(&s), SEQUENCE_LOCKTIME_ENABLED)
        .add_output(payout(Network::Mainnet), 1_000_000);
    assert!(matches!(
        s.vault.sign_spend(&candidate, &[1], &s.locking_script, &s.owner),
        Err(VaultError::InvalidParameter(_))
    ));
}
