//! Error types for lock construction, spending and validation

use thiserror::Error;

/// Hard failures: malformed input that must never become a script, address
/// or signed transaction.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VaultError {
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Script number encoding error: {0}")]
    Encoding(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Address checksum mismatch")]
    AddressChecksumMismatch,

    #[error("Address version mismatch: expected {expected:#04x}, found {found:#04x}")]
    AddressVersionMismatch { expected: u8, found: u8 },

    #[error("Signature verification failed: {0}")]
    SignatureVerificationFailed(String),

    #[error("Signing failed: {0}")]
    Signing(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Script execution failed: {0}")]
    ScriptExecution(String),

    #[error("Chain height oracle failed: {0}")]
    Oracle(String),
}

/// Expected negative outcomes of spend validation.
///
/// These are values, not errors: an immature lock or a bad signature is a
/// routine answer from the validator.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidReason {
    #[error("transaction lock time is below the script's lock height")]
    LockTimeTooLow,

    #[error("transaction lock time is a timestamp, the script locks on height")]
    LockTimeTypeMismatch,

    #[error("every input is final, lock time is not enforced")]
    AllInputsFinal,

    #[error("unlocking data is not exactly <signature> <locking script>")]
    UnlockingDataMismatch,

    #[error("the timelocked input has a final sequence number")]
    TimelockedInputFinal,

    #[error("signature does not verify against the script's public key")]
    SignatureVerificationFailed,

    #[error("chain height has not reached the lock height")]
    NotYetMature,
}

pub type Result<T> = std::result::Result<T, VaultError>;
