//! # CLTV Vault
//!
//! Absolute-timelock spending condition for Bitcoin-family script ledgers.
//!
//! An output is frozen until a target block height, after which only the
//! holder of one designated key may move it. The crate covers the whole
//! primitive as pure functions:
//!
//! - minimal script-number encoding of the lock height
//! - byte-exact locking, funding and unlocking scripts
//! - Base58Check script-hash addresses
//! - legacy signature hashing, signing and verification
//! - validation of candidate spends against the lock, with chain height
//!   supplied by an injected oracle
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: every builder and check is deterministic
//! 2. **Values, not exceptions**: an immature lock or a bad signature is a
//!    [`ValidationResult::Invalid`], malformed input is an [`VaultError`]
//! 3. **Exact Version Pinning**: consensus-critical dependencies are pinned
//!
//! ## Usage
//!
//! ```rust
//! use cltv_vault::TimelockVault;
//! use cltv_vault::duration::LockTarget;
//! use secp256k1::SecretKey;
//!
//! let vault = TimelockVault::new();
//! let owner = SecretKey::from_slice(&[0x01; 32]).unwrap();
//! let owner_pubkey = vault.public_key(&owner).unwrap();
//!
//! let params = vault
//!     .lock_parameters(LockTarget::Height(850_000), 840_000, &owner_pubkey)
//!     .unwrap();
//! let locking_script = vault.locking_script(&params).unwrap();
//! let commitment = vault.funding_commitment(&locking_script);
//! assert!(commitment.address.starts_with('3'));
//! ```

pub mod types;
pub mod constants;
pub mod error;
pub mod script_num;
pub mod script;
pub mod network;
pub mod address;
pub mod serialization;
pub mod transaction;
pub mod sighash;
pub mod interpreter;
pub mod timelock;
pub mod duration;
pub mod spend;
pub mod config;

// Re-export commonly used types
pub use types::*;
pub use constants::*;
pub use error::{InvalidReason, Result, VaultError};
pub use config::VaultConfig;
pub use network::Network;
pub use sighash::{KeyCustody, SighashDigest};
pub use spend::{CandidateSpend, SignedTransaction};
pub use timelock::{ChainHeightOracle, FixedHeight};

use duration::LockTarget;

/// Timelock vault operations under one configuration
///
/// # Examples
///
/// ```
/// use cltv_vault::{TimelockVault, VaultConfig, Network, ValidationResult, FixedHeight};
/// use cltv_vault::duration::LockTarget;
/// use cltv_vault::address::Address;
/// use cltv_vault::types::UnspentReference;
/// use secp256k1::SecretKey;
///
/// let vault = TimelockVault::with_config(VaultConfig {
///     network: Network::Regtest,
///     ..VaultConfig::default()
/// });
/// let owner = SecretKey::from_slice(&[0x01; 32]).unwrap();
/// let pubkey = vault.public_key(&owner).unwrap();
///
/// // Fund: lock until height 1000
/// let params = vault.lock_parameters(LockTarget::Height(1000), 900, &pubkey).unwrap();
/// let locking_script = vault.locking_script(&params).unwrap();
/// let commitment = vault.funding_commitment(&locking_script);
///
/// // Spend: the funded output as reported by an indexer
/// let utxo = UnspentReference {
///     txid: [0x42; 32],
///     output_index: 0,
///     value: 100_000,
///     script_pubkey: vault.funding_script(&locking_script),
/// };
/// let mut candidate = vault.candidate_spend(utxo, 1000);
/// candidate.add_output(Address::PubkeyHash([0x07; 20]).to_string_for(Network::Regtest), 99_000);
/// let signed = vault.sign_spend(&candidate, &[0], &locking_script, &owner).unwrap();
///
/// assert!(vault.verify_commitment(&commitment.address, &locking_script).unwrap());
/// assert_eq!(
///     vault.validate_spend(signed.transaction(), Some(&FixedHeight(1000)), &locking_script).unwrap(),
///     ValidationResult::Valid
/// );
/// ```
#[derive(Debug, Clone, Default)]
pub struct TimelockVault {
    config: VaultConfig,
}

impl TimelockVault {
    /// Create a vault with the default configuration (mainnet, SIGHASH_ALL)
    ///
    /// # Examples
    ///
    /// ```
    /// use cltv_vault::TimelockVault;
    ///
    /// let vault = TimelockVault::new();
    /// assert_eq!(vault.config().tx_version, 2);
    /// ```
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: VaultConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &VaultConfig {
        &self.config
    }

    /// Compressed public key held by a custody implementation
    pub fn public_key(&self, custody: &dyn KeyCustody) -> Result<ByteString> {
        custody.public_key()
    }

    /// Resolve a lock target against the current height and bind it to the
    /// owner's key
    ///
    /// # Examples
    ///
    /// ```
    /// use cltv_vault::TimelockVault;
    /// use cltv_vault::duration::{DurationPreset, LockTarget};
    ///
    /// let vault = TimelockVault::new();
    /// let mut pubkey = vec![0x02];
    /// pubkey.extend_from_slice(&[0x11; 32]);
    ///
    /// let params = vault
    ///     .lock_parameters(LockTarget::After(DurationPreset::OneWeek), 840_000, &pubkey)
    ///     .unwrap();
    /// assert_eq!(params.lock_height(), 841_008);
    /// ```
    pub fn lock_parameters(
        &self,
        target: LockTarget,
        current_height: Natural,
        owner_public_key: &[u8],
    ) -> Result<LockParameters> {
        let lock_height = duration::resolve_lock_height(target, current_height)?;
        LockParameters::new(lock_height, owner_public_key)
    }

    pub fn locking_script(&self, params: &LockParameters) -> Result<ByteString> {
        script::build_locking_script(params)
    }

    pub fn funding_script(&self, locking_script: &[u8]) -> ByteString {
        script::build_funding_script(locking_script)
    }

    /// Script hash and address to fund, on the configured network
    pub fn funding_commitment(&self, locking_script: &[u8]) -> FundingCommitment {
        address::funding_commitment(locking_script, self.config.network)
    }

    pub fn verify_commitment(&self, address: &str, locking_script: &[u8]) -> Result<bool> {
        address::verify_commitment(address, locking_script, self.config.network)
    }

    /// Candidate spending `utxo` as its first input, with the configured
    /// version and sequence number
    pub fn candidate_spend(&self, utxo: UnspentReference, lock_time: u32) -> CandidateSpend {
        let mut candidate = CandidateSpend::new(self.config.tx_version, lock_time);
        candidate.add_input(utxo, self.config.sequence);
        candidate
    }

    /// Sign the listed inputs, each spending the lock's funding output
    pub fn sign_spend(
        &self,
        candidate: &CandidateSpend,
        input_indices: &[usize],
        locking_script: &[u8],
        custody: &dyn KeyCustody,
    ) -> Result<SignedTransaction> {
        spend::sign_timelocked_spend(
            candidate,
            input_indices,
            locking_script,
            custody,
            self.config.sighash_type,
            self.config.network,
            self.config.dust_threshold,
        )
    }

    /// Validate a candidate spend against the lock
    ///
    /// Without an oracle only the transaction itself is checked; with one,
    /// the chain must also have reached the lock height.
    pub fn validate_spend(
        &self,
        tx: &Transaction,
        oracle: Option<&dyn ChainHeightOracle>,
        locking_script: &[u8],
    ) -> Result<ValidationResult> {
        timelock::validate(tx, oracle, locking_script)
    }

    /// Run the input's scripts through the interpreter
    pub fn verify_script(&self, tx: &Transaction, input_index: usize, script_pubkey: &[u8]) -> Result<bool> {
        interpreter::verify_spend(tx, input_index, script_pubkey)
    }

    /// Context-free structure checks
    ///
    /// # Examples
    ///
    /// ```
    /// use cltv_vault::TimelockVault;
    /// use cltv_vault::types::*;
    ///
    /// let vault = TimelockVault::new();
    /// let tx = Transaction {
    ///     version: 2,
    ///     inputs: vec![],
    ///     outputs: vec![],
    ///     lock_time: 0,
    /// };
    /// assert!(vault.validate_transaction(&tx).is_err());
    /// ```
    pub fn validate_transaction(&self, tx: &Transaction) -> Result<()> {
        transaction::check_transaction(tx)
    }

    pub fn lock_state(&self, lock_height: Natural, oracle: &dyn ChainHeightOracle) -> Result<LockState> {
        timelock::lock_state(lock_height, oracle)
    }
}
