use serde::Deserialize;
use std::{fs, path::Path};
use anyhow::{Context, Result};

use crate::chain::{Chain, Network};
use crate::crypto::KdfParams;
use crate::utxo::FeePolicy;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub network: Network,
    #[serde(default)]
    pub fees: Fees,
    #[serde(default)]
    pub vault: KdfParams,
}

/// Relay floor and dust threshold per UTXO chain.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Fees {
    #[serde(default)]
    pub bitcoin: FeePolicy,
    #[serde(default)]
    pub litecoin: FeePolicy,
}

impl Config {
    pub fn fee_policy(&self, chain: Chain) -> crate::error::Result<FeePolicy> {
        match chain {
            Chain::Bitcoin => Ok(self.fees.bitcoin),
            Chain::Litecoin => Ok(self.fees.litecoin),
            other => Err(other.unsupported("UTXO fee policy")),
        }
    }
}

/// Read the TOML file at `p` and deserialize into `Config`.
/// *Adds context* so user errors print a friendlier message.
///
/// # Errors
/// * Returns an anyhow::Error if the file cannot be read or parsed.
pub fn load<P: AsRef<Path>>(p: P) -> Result<Config> {
    let text = fs::read_to_string(&p)
        .with_context(|| format!("🗂️  couldn’t read config file {}", p.as_ref().display()))?;
    load_from_str(&text)
}

pub fn load_from_str(text: &str) -> Result<Config> {
    toml::from_str(text)
        .with_context(|| "📝  invalid TOML in config file".to_string())
}
