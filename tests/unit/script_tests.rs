//! Unit tests for lock, funding and unlocking scripts

use cltv_vault::*;
use cltv_vault::script::*;

fn pubkey(prefix: u8) -> Vec<u8> {
    let mut pk = vec![prefix];
    pk.extend_from_slice(&[0x5a; 32]);
    pk
}

#[test]
fn test_lock_parameters_validation() {
    assert!(LockParameters::new(1, &pubkey(0x02)).is_ok());
    assert!(LockParameters::new(499_999_999, &pubkey(0x03)).is_ok());
    assert!(matches!(LockParameters::new(0, &pubkey(0x02)), Err(VaultError::InvalidParameter(_))));
    assert!(matches!(
        LockParameters::new(500_000_000, &pubkey(0x02)),
        Err(VaultError::InvalidParameter(_))
    ));
    assert!(matches!(LockParameters::new(1000, &pubkey(0x04)), Err(VaultError::InvalidParameter(_))));
    assert!(matches!(LockParameters::new(1000, &[0x02; 32]), Err(VaultError::InvalidParameter(_))));
    assert!(matches!(LockParameters::new(1000, &[0x02; 65]), Err(VaultError::InvalidParameter(_))));
}

#[test]
fn test_locking_script_exact_bytes() {
    let params = LockParameters::new(850_000, &pubkey(0x03)).unwrap();
    let script = build_locking_script(&params).unwrap();
    // 850000 = 0x0cf850
    let mut expected = hex::decode("0350f80cb17521").unwrap();
    expected.extend_from_slice(&pubkey(0x03));
    expected.push(0xac);
    assert_eq!(script, expected);
}

#[test]
fn test_locking_script_height_boundaries() {
    let one = build_locking_script(&LockParameters::new(1, &pubkey(0x02)).unwrap()).unwrap();
    assert_eq!(one[0], OP_1);
    let max = build_locking_script(&LockParameters::new(499_999_999, &pubkey(0x02)).unwrap()).unwrap();
    assert_eq!(&max[..5], &[0x04, 0xff, 0x64, 0xcd, 0x1d]);
}

#[test]
fn test_deserialized_parameters_are_revalidated() {
    let params = LockParameters::new(1000, &pubkey(0x02)).unwrap();
    let json = serde_json::to_string(&params).unwrap();
    let tampered = json.replace("\"lock_height\":1000", "\"lock_height\":0");
    let bad: LockParameters = serde_json::from_str(&tampered).unwrap();
    assert!(build_locking_script(&bad).is_err());
}

#[test]
fn test_funding_script_commits_to_locking_script() {
    let params = LockParameters::new(1000, &pubkey(0x02)).unwrap();
    let locking = build_locking_script(&params).unwrap();
    let funding = build_funding_script(&locking);
    assert_eq!(funding, build_funding_script(&locking));
    assert_eq!(extract_script_hash(&funding), Some(hash160(&locking)));

    let other = build_locking_script(&LockParameters::new(1001, &pubkey(0x02)).unwrap()).unwrap();
    assert_ne!(funding, build_funding_script(&other));
}

#[test]
fn test_unlocking_script_layout() {
    let signature = vec![0x30; 72];
    let locking = build_locking_script(&LockParameters::new(1000, &pubkey(0x02)).unwrap()).unwrap();
    let script_sig = build_unlocking_script(&signature, &locking);
    assert_eq!(script_sig[0], 72);
    assert_eq!(&script_sig[1..73], &signature[..]);
    assert_eq!(script_sig[73] as usize, locking.len());
    assert_eq!(&script_sig[74..], &locking[..]);
}

#[test]
fn test_pubkey_hash_script_layout() {
    let script = pubkey_hash_script(&[0x07; 20]);
    assert_eq!(script.len(), 25);
    assert_eq!(&script[..3], &[OP_DUP, OP_HASH160, 0x14]);
    assert_eq!(&script[23..], &[OP_EQUALVERIFY, OP_CHECKSIG]);
}
