use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;

use crate::chain::Chain;
use crate::error::{Result, WalletError};

/// Fixed part of a segwit transaction (version, marker, counts, locktime).
pub const TX_OVERHEAD_VBYTES: u64 = 10;
/// Outpoint, empty scriptSig, sequence and the discounted witness.
pub const P2WPKH_INPUT_VBYTES: u64 = 68;
pub const P2WPKH_OUTPUT_VBYTES: u64 = 31;

/// An unspent output paying the wallet's single address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Utxo {
    /// Hex txid in the usual display (byte-reversed) order.
    pub txid: String,
    pub vout: u32,
    /// Atomic units.
    pub value: u64,
    /// Confirmation height; 0 while unconfirmed.
    #[serde(default)]
    pub height: u32,
}

/// Satoshis per 1000 virtual bytes. Keeping the rate in thousandths keeps
/// fee arithmetic in integers with an exact ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FeeRate(u64);

impl FeeRate {
    pub const fn from_sat_per_kvb(rate: u64) -> Self {
        FeeRate(rate)
    }

    pub const fn from_sat_per_vb(rate: u64) -> Self {
        FeeRate(rate.saturating_mul(1000))
    }

    pub fn sat_per_kvb(self) -> u64 {
        self.0
    }

    /// `ceil(vsize * rate) + 1`. The extra satoshi keeps the fee strictly
    /// above the relay minimum.
    pub fn fee_for_vsize(self, vsize: u64) -> Option<u64> {
        vsize.checked_mul(self.0)?.div_ceil(1000).checked_add(1)
    }
}

/// Per-chain relay floor and dust threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeePolicy {
    #[serde(default = "default_min_rate")]
    pub min_fee_rate_sat_per_kvb: u64,
    #[serde(default = "default_dust")]
    pub dust_threshold: u64,
}

fn default_min_rate() -> u64 { 1_000 }   // 1 sat/vB
fn default_dust() -> u64     { 546 }

impl Default for FeePolicy {
    fn default() -> Self {
        Self { min_fee_rate_sat_per_kvb: default_min_rate(), dust_threshold: default_dust() }
    }
}

impl FeePolicy {
    /// Built-in policy for a UTXO chain.
    pub fn for_chain(chain: Chain) -> Result<Self> {
        match chain {
            Chain::Bitcoin | Chain::Litecoin => Ok(Self::default()),
            _ => Err(chain.unsupported("UTXO fee policy")),
        }
    }

    pub fn min_fee_rate(&self) -> FeeRate {
        FeeRate::from_sat_per_kvb(self.min_fee_rate_sat_per_kvb)
    }

    /// The requested rate, floored at the relay minimum.
    pub fn effective_rate(&self, requested: FeeRate) -> FeeRate {
        requested.max(self.min_fee_rate())
    }
}

pub fn estimate_vsize(inputs: usize, outputs: usize) -> u64 {
    TX_OVERHEAD_VBYTES + P2WPKH_OUTPUT_VBYTES * outputs as u64 + P2WPKH_INPUT_VBYTES * inputs as u64
}

pub fn estimate_fee(inputs: usize, outputs: usize, rate: FeeRate, policy: &FeePolicy) -> Result<u64> {
    policy
        .effective_rate(rate)
        .fee_for_vsize(estimate_vsize(inputs, outputs))
        .ok_or_else(|| WalletError::InvalidAmount("fee overflows u64".into()))
}

/// Selected inputs with the fee and change they imply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionPlan {
    pub selected: Vec<Utxo>,
    /// Value delivered to the recipient.
    pub amount: u64,
    /// Fee actually paid, including any sub-dust leftover.
    pub fee: u64,
    pub change: Option<u64>,
}

impl TransactionPlan {
    pub fn total_in(&self) -> u64 {
        self.selected.iter().map(|u| u.value).sum()
    }
}

fn reject_duplicates(utxos: &[Utxo]) -> Result<()> {
    let mut seen = HashSet::with_capacity(utxos.len());
    for u in utxos {
        if !seen.insert((u.txid.to_ascii_lowercase(), u.vout)) {
            return Err(WalletError::tx(format!("outpoint {}:{} listed twice", u.txid, u.vout)));
        }
    }
    Ok(())
}

fn checked_total(utxos: &[Utxo]) -> Result<u64> {
    utxos.iter().try_fold(0u64, |acc, u| {
        acc.checked_add(u.value)
            .ok_or_else(|| WalletError::InvalidAmount("input values overflow u64".into()))
    })
}

/// Largest-first selection. Stops at the first prefix covering
/// `target + fee`, with the fee priced for two outputs. Equal values go
/// oldest confirmation first, unconfirmed last.
pub fn select_utxos(utxos: &[Utxo], target: u64, rate: FeeRate, policy: &FeePolicy) -> Result<TransactionPlan> {
    if target == 0 {
        return Err(WalletError::InvalidAmount("amount must be greater than zero".into()));
    }
    if target < policy.dust_threshold {
        return Err(WalletError::DustOutput { amount: target, threshold: policy.dust_threshold });
    }
    reject_duplicates(utxos)?;

    let mut candidates = utxos.to_vec();
    candidates.sort_by(|a, b| {
        b.value
            .cmp(&a.value)
            .then_with(|| (a.height == 0, a.height).cmp(&(b.height == 0, b.height)))
            .then_with(|| a.txid.cmp(&b.txid))
            .then_with(|| a.vout.cmp(&b.vout))
    });

    let mut selected = Vec::new();
    let mut total = 0u64;
    let mut needed = target.saturating_add(estimate_fee(1, 2, rate, policy)?);
    for utxo in candidates {
        total = total
            .checked_add(utxo.value)
            .ok_or_else(|| WalletError::InvalidAmount("input values overflow u64".into()))?;
        selected.push(utxo);

        let fee = estimate_fee(selected.len(), 2, rate, policy)?;
        needed = target.saturating_add(fee);
        if total < needed {
            continue;
        }

        let leftover = total - needed;
        let (fee, change) = if leftover > policy.dust_threshold {
            (fee, Some(leftover))
        } else {
            debug!(leftover, "leftover below dust, absorbed into fee");
            (fee + leftover, None)
        };
        debug!(inputs = selected.len(), total, fee, ?change, "selected inputs");
        return Ok(TransactionPlan { selected, amount: target, fee, change });
    }

    Err(WalletError::InsufficientFunds { needed, available: total })
}

/// Spends every input to a single output, no change.
pub fn plan_sweep(utxos: &[Utxo], rate: FeeRate, policy: &FeePolicy) -> Result<TransactionPlan> {
    reject_duplicates(utxos)?;
    let inputs = utxos.len().max(1);
    let fee = estimate_fee(inputs, 1, rate, policy)?;
    let total = checked_total(utxos)?;
    if utxos.is_empty() || total <= fee {
        return Err(WalletError::InsufficientFunds { needed: fee.saturating_add(1), available: total });
    }
    let amount = total - fee;
    if amount < policy.dust_threshold {
        return Err(WalletError::DustOutput { amount, threshold: policy.dust_threshold });
    }
    debug!(inputs = utxos.len(), total, fee, amount, "planned sweep");
    Ok(TransactionPlan { selected: utxos.to_vec(), amount, fee, change: None })
}
