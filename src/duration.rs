//! Duration to lock height conversion
//!
//! Presets count blocks at the target spacing of 144 blocks per day.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::constants::BLOCKS_PER_DAY;
use crate::error::{Result, VaultError};
use crate::types::*;

/// Named lock duration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DurationPreset {
    #[serde(rename = "1d")]
    OneDay,
    #[serde(rename = "1w")]
    OneWeek,
    #[serde(rename = "1m")]
    OneMonth,
    #[serde(rename = "3m")]
    ThreeMonths,
    #[serde(rename = "6m")]
    SixMonths,
    #[serde(rename = "1y")]
    OneYear,
}

impl DurationPreset {
    pub const ALL: [DurationPreset; 6] = [
        DurationPreset::OneDay,
        DurationPreset::OneWeek,
        DurationPreset::OneMonth,
        DurationPreset::ThreeMonths,
        DurationPreset::SixMonths,
        DurationPreset::OneYear,
    ];

    /// Block offset added to the current height.
    ///
    /// A month is 30 days, half a year 182.5 and a year 365.
    pub fn blocks(&self) -> Natural {
        match self {
            DurationPreset::OneDay => BLOCKS_PER_DAY,
            DurationPreset::OneWeek => 7 * BLOCKS_PER_DAY,
            DurationPreset::OneMonth => 30 * BLOCKS_PER_DAY,
            DurationPreset::ThreeMonths => 90 * BLOCKS_PER_DAY,
            DurationPreset::SixMonths => 365 * BLOCKS_PER_DAY / 2,
            DurationPreset::OneYear => 365 * BLOCKS_PER_DAY,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DurationPreset::OneDay => "1d",
            DurationPreset::OneWeek => "1w",
            DurationPreset::OneMonth => "1m",
            DurationPreset::ThreeMonths => "3m",
            DurationPreset::SixMonths => "6m",
            DurationPreset::OneYear => "1y",
        }
    }
}

impl fmt::Display for DurationPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for DurationPreset {
    type Err = VaultError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "1d" | "day" | "1day" => Ok(DurationPreset::OneDay),
            "1w" | "week" | "1week" => Ok(DurationPreset::OneWeek),
            "1m" | "month" | "1month" => Ok(DurationPreset::OneMonth),
            "3m" | "quarter" | "3months" => Ok(DurationPreset::ThreeMonths),
            "6m" | "halfyear" | "6months" => Ok(DurationPreset::SixMonths),
            "1y" | "year" | "1year" => Ok(DurationPreset::OneYear),
            other => Err(VaultError::InvalidParameter(format!(
                "unknown duration preset '{}'",
                other
            ))),
        }
    }
}

/// What the lock should wait for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockTarget {
    /// Absolute block height
    Height(Natural),
    /// Preset offset from the current height
    After(DurationPreset),
}

impl FromStr for LockTarget {
    type Err = VaultError;

    /// Decimal digits are an explicit height; anything else names a preset.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();
        if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) {
            let height = s.parse::<Natural>().map_err(|e| {
                VaultError::InvalidParameter(format!("invalid lock height '{}': {}", s, e))
            })?;
            return Ok(LockTarget::Height(height));
        }
        s.parse().map(LockTarget::After)
    }
}

/// ResolveLockHeight: 𝒟 × ℕ → ℕ
///
/// Explicit heights pass through unchanged; presets add their block offset
/// to `current_height`. The result must be a valid lock height.
pub fn resolve_lock_height(target: LockTarget, current_height: Natural) -> Result<Natural> {
    let height = match target {
        LockTarget::Height(height) => height,
        LockTarget::After(preset) => current_height.checked_add(preset.blocks()).ok_or_else(|| {
            VaultError::InvalidParameter(format!(
                "current height {} plus {} overflows",
                current_height, preset
            ))
        })?,
    };
    validate_lock_height(height)?;
    Ok(height)
}
