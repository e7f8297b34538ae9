//! Unit tests for signature hashing and ECDSA signatures

use cltv_vault::*;
use cltv_vault::sighash::*;
use secp256k1::SecretKey;

fn key(byte: u8) -> SecretKey {
    SecretKey::from_slice(&[byte; 32]).unwrap()
}

fn tx() -> Transaction {
    Transaction {
        version: 2,
        inputs: (1..=3)
            .map(|n| TransactionInput {
                prevout: OutPoint { hash: [n; 32], index: n as u32 },
                script_sig: vec![],
                sequence: SEQUENCE_LOCKTIME_ENABLED,
            })
            .collect(),
        outputs: (1..=3)
            .map(|n| TransactionOutput {
                value: n as i64 * 1000,
                script_pubkey: vec![0x51],
            })
            .collect(),
        lock_time: 5000,
    }
}

#[test]
fn test_single_anyonecanpay_commits_to_own_input_and_output() {
    let flag = SIGHASH_SINGLE | SIGHASH_ANYONECANPAY;
    let base = compute_sighash(&tx(), 1, &[0x51], flag).unwrap();

    let mut changed = tx();
    changed.inputs[0].sequence = 0;
    changed.inputs[2].prevout.index = 99;
    changed.outputs[0].value = 1;
    changed.outputs[2].value = 1;
    assert_eq!(base, compute_sighash(&changed, 1, &[0x51], flag).unwrap());

    let mut changed = tx();
    changed.outputs[1].value = 1;
    assert_ne!(base, compute_sighash(&changed, 1, &[0x51], flag).unwrap());

    let mut changed = tx();
    changed.inputs[1].sequence = 0;
    assert_ne!(base, compute_sighash(&changed, 1, &[0x51], flag).unwrap());
}

#[test]
fn test_flags_give_distinct_digests() {
    let tx = tx();
    let flags = [
        SIGHASH_ALL,
        SIGHASH_NONE,
        SIGHASH_SINGLE,
        SIGHASH_ALL | SIGHASH_ANYONECANPAY,
        SIGHASH_NONE | SIGHASH_ANYONECANPAY,
        SIGHASH_SINGLE | SIGHASH_ANYONECANPAY,
    ];
    let digests: Vec<Hash> = flags
        .iter()
        .map(|&flag| compute_sighash(&tx, 0, &[0x51], flag).unwrap().hash)
        .collect();
    for i in 0..digests.len() {
        for j in i + 1..digests.len() {
            assert_ne!(digests[i], digests[j], "flags {:#x} and {:#x}", flags[i], flags[j]);
        }
    }
}

#[test]
fn test_sign_verify_under_every_flag() {
    let tx = tx();
    let pubkey = public_key_bytes(&key(7));
    for flag in [SIGHASH_ALL, SIGHASH_NONE, SIGHASH_SINGLE | SIGHASH_ANYONECANPAY] {
        let digest = compute_sighash(&tx, 2, &[0x51], flag).unwrap();
        let signature = sign(&digest, &key(7)).unwrap();
        assert_eq!(*signature.last().unwrap() as u32, flag);
        assert!(verify(&digest, &signature, &pubkey));
    }
}

#[test]
fn test_verify_rejects_flag_byte_mismatch() {
    let digest = compute_sighash(&tx(), 0, &[0x51], SIGHASH_ALL).unwrap();
    let signature = sign(&digest, &key(7)).unwrap();
    let relabelled = SighashDigest { hash: digest.hash, sighash_type: SIGHASH_NONE };
    assert!(!verify(&relabelled, &signature, &public_key_bytes(&key(7))));
}

#[test]
fn test_verify_rejects_garbage() {
    let digest = compute_sighash(&tx(), 0, &[0x51], SIGHASH_ALL).unwrap();
    let pubkey = public_key_bytes(&key(7));
    assert!(!verify(&digest, &[0x01], &pubkey));
    assert!(!verify(&digest, &[0x30, 0x00, 0x01], &pubkey));
    let signature = sign(&digest, &key(7)).unwrap();
    assert!(!verify(&digest, &signature, &[]));
    assert!(!verify(&digest, &signature, &[0x02; 33]));
}

#[test]
fn test_signing_is_deterministic() {
    let digest = compute_sighash(&tx(), 0, &[0x51], SIGHASH_ALL).unwrap();
    assert_eq!(sign(&digest, &key(9)).unwrap(), sign(&digest, &key(9)).unwrap());
}

#[test]
fn test_public_key_is_compressed() {
    let pubkey = public_key_bytes(&key(1));
    assert_eq!(pubkey.len(), 33);
    assert!(pubkey[0] == 0x02 || pubkey[0] == 0x03);
}
