//! Vault configuration
//!
//! Loaded from JSON; every field is optional and falls back to the default.
//!
//! ```json
//! { "network": "testnet", "dust_threshold": 1000 }
//! ```

use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::constants::*;
use crate::network::Network;
use crate::sighash::{SIGHASH_ALL, SIGHASH_ANYONECANPAY, SIGHASH_MASK, SIGHASH_NONE, SIGHASH_SINGLE};
use crate::types::Integer;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VaultConfig {
    /// Chain whose address version bytes are used
    pub network: Network,
    /// Flag the timelocked input is signed under
    pub sighash_type: u32,
    /// Version of spending transactions
    pub tx_version: u32,
    /// Sequence number of the timelocked input; must be non-final
    pub sequence: u32,
    /// Smallest output value accepted when assembling a spend
    pub dust_threshold: Integer,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            network: Network::Mainnet,
            sighash_type: SIGHASH_ALL,
            tx_version: 2,
            sequence: SEQUENCE_LOCKTIME_ENABLED,
            dust_threshold: DEFAULT_DUST_THRESHOLD,
        }
    }
}

impl VaultConfig {
    pub fn from_json_str(json: &str) -> anyhow::Result<Self> {
        let config: Self = serde_json::from_str(json).context("failed to parse vault config")?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read vault config {}", path.display()))?;
        Self::from_json_str(&json).with_context(|| format!("invalid vault config {}", path.display()))
    }

    /// Reject settings that could only produce unspendable or unsigned locks.
    pub fn validate(&self) -> anyhow::Result<()> {
        let base = self.sighash_type & SIGHASH_MASK;
        if self.sighash_type & !(SIGHASH_MASK | SIGHASH_ANYONECANPAY) != 0
            || !matches!(base, SIGHASH_ALL | SIGHASH_NONE | SIGHASH_SINGLE)
        {
            bail!("unsupported sighash type {:#x}", self.sighash_type);
        }
        if self.sequence == SEQUENCE_FINAL {
            bail!("sequence {:#x} is final and disables the lock time", self.sequence);
        }
        if !(0..=MAX_MONEY).contains(&self.dust_threshold) {
            bail!("dust threshold {} out of range", self.dust_threshold);
        }
        Ok(())
    }
}
