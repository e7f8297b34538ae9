//! Unit tests for duration presets

use cltv_vault::duration::*;

#[test]
fn test_presets_resolve_from_strings() {
    let cases = [
        ("1d", 100_144),
        ("1w", 101_008),
        ("1m", 104_320),
        ("3m", 112_960),
        ("6m", 126_280),
        ("1y", 152_560),
    ];
    for (label, expected) in cases {
        let target: LockTarget = label.parse().unwrap();
        assert_eq!(resolve_lock_height(target, 100_000).unwrap(), expected, "{}", label);
    }
}

#[test]
fn test_explicit_height_ignores_current_height() {
    let target: LockTarget = "123456".parse().unwrap();
    assert_eq!(resolve_lock_height(target, 0).unwrap(), 123_456);
    assert_eq!(resolve_lock_height(target, 999_999).unwrap(), 123_456);
}

#[test]
fn test_unknown_preset() {
    assert!("fortnight".parse::<LockTarget>().is_err());
    assert!("1.5".parse::<LockTarget>().is_err());
}
