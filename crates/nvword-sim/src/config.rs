//! Simulator configuration file parsing
//!
//! Describes a simulated device in TOML:
//!
//! ```toml
//! # Word left in flash by the previous boot (absent: erased)
//! stored = "0x00003039"
//! # Value the firmware wants persisted
//! desired = 12345
//!
//! [timing]
//! program_us = 16
//! erase_us = 1100000
//!
//! [faults]
//! erase_incomplete = true
//! ```

use std::fs;
use std::path::Path;

use nvword_core::layout::Location;
use serde::Deserialize;

use crate::error::{Result, SimError};
use crate::flash::{SimFaults, SimFlash, SimTiming};

/// Simulated device description
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimConfig {
    /// Word already stored at the variable address
    #[serde(deserialize_with = "deserialize_opt_hex_u32")]
    pub stored: Option<u32>,
    /// Value to persist
    #[serde(deserialize_with = "deserialize_opt_hex_u32")]
    pub desired: Option<u32>,
    /// Operation timing
    pub timing: SimTiming,
    /// Injected faults
    pub faults: SimFaults,
}

impl SimConfig {
    /// Parse a config from a TOML string
    pub fn from_toml_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }

    /// Load a config from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|source| SimError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Build the simulated flash, with `stored` preloaded at `location`
    pub fn build(&self, location: &Location) -> Result<SimFlash> {
        let mut sim = SimFlash::stm32f4()
            .with_timing(self.timing)
            .with_faults(self.faults);
        if let Some(word) = self.stored {
            sim.set_word(location.address, word)?;
        }
        Ok(sim)
    }
}

/// Deserialize an optional u32 that can be an integer or a "0x..." string
fn deserialize_opt_hex_u32<'de, D>(deserializer: D) -> std::result::Result<Option<u32>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum HexOrInt {
        Int(u32),
        Str(String),
    }

    match HexOrInt::deserialize(deserializer)? {
        HexOrInt::Int(n) => Ok(Some(n)),
        HexOrInt::Str(s) => parse_number(&s).map(Some).map_err(serde::de::Error::custom),
    }
}

/// Parse a number that can be hex (0x...) or decimal
pub fn parse_number(s: &str) -> std::result::Result<u32, String> {
    let s = s.trim();
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u32::from_str_radix(&hex.replace('_', ""), 16).map_err(|e| format!("invalid hex: {}", e))
    } else {
        s.parse().map_err(|e| format!("invalid number: {}", e))
    }
}
