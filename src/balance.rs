//! Client-side check of a light-wallet server's spent-output list.
//!
//! A server that can see the view key reports every output it *thinks* may
//! have been spent, along with the key image it observed on chain. Only the
//! spend key can produce the real key image, so each claim is recomputed
//! here:
//!
//! ```text
//! D  = 8·a·R
//! h  = Hs(D || varint(out_index))
//! P  = h·G + B          (one-time public key)
//! x  = h + b            (one-time secret key)
//! KI = x·Hp(P)
//! ```
//!
//! `Hp` is Monero's `hash_to_ec` (Keccak, `ge_fromfe_frombytes_vartime`,
//! cofactor clearing), taken from `monero-generators` so it matches the
//! chain bit-for-bit.

use curve25519_dalek::edwards::EdwardsPoint;
use curve25519_dalek::scalar::Scalar;
use monero_generators::hash_to_point;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashSet;
use tracing::{debug, warn};
use zeroize::Zeroize;

use crate::address::write_varint;
use crate::error::{Result, WalletError};
use crate::keys::CryptonoteKeys;
use crate::scalar;

/// One entry of a server's `spent_outputs` list. Fields stay as reported
/// (hex strings) so a malformed entry is reported rather than rejecting the
/// whole list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpentOutputClaim {
    #[serde(deserialize_with = "amount_from_str_or_int")]
    pub amount: u64,
    pub key_image: String,
    pub tx_pub_key: String,
    pub out_index: u64,
}

// Light-wallet APIs send amounts as decimal strings.
fn amount_from_str_or_int<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<u64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Amount {
        Int(u64),
        Str(String),
    }
    match Amount::deserialize(d)? {
        Amount::Int(v) => Ok(v),
        Amount::Str(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum ClaimOutcome {
    /// Recomputed key image matches; the amount counts as spent.
    Verified,
    /// Well-formed claim whose key image is not ours.
    Unmatched,
    /// Same key image as an earlier verified claim; not counted again.
    Duplicate,
    /// The claim could not be evaluated at all.
    Malformed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BalanceReport {
    pub total_received: u64,
    pub verified_spent: u64,
    pub balance: u64,
    pub verified_count: usize,
    /// One entry per claim, in input order.
    pub outcomes: Vec<ClaimOutcome>,
}

fn parse_hex32(field: &str, value: &str) -> std::result::Result<[u8; 32], String> {
    let raw = hex::decode(value.trim()).map_err(|e| format!("{} is not hex: {}", field, e))?;
    raw.as_slice()
        .try_into()
        .map_err(|_| format!("{} must be 32 bytes, got {}", field, raw.len()))
}

/// Returns `(x, P)` for output `out_index` of the transaction with public
/// key `tx_public`.
pub fn derive_output_keys(
    view_secret: &Scalar,
    spend_secret: &Scalar,
    spend_public: &EdwardsPoint,
    tx_public: &EdwardsPoint,
    out_index: u64,
) -> (Scalar, EdwardsPoint) {
    let derivation = (tx_public * view_secret).mul_by_cofactor().compress().to_bytes();
    let mut index = Vec::with_capacity(10);
    write_varint(out_index, &mut index);
    let h = scalar::hash_to_scalar(&[derivation.as_slice(), index.as_slice()]);
    let one_time_public = EdwardsPoint::mul_base(&h) + spend_public;
    (h + spend_secret, one_time_public)
}

/// `x·Hp(P)`, compressed.
pub fn key_image(one_time_secret: &Scalar, one_time_public: &EdwardsPoint) -> [u8; 32] {
    let hp = hash_to_point(one_time_public.compress().to_bytes());
    (one_time_secret * hp).compress().to_bytes()
}

struct Verifier {
    view: Scalar,
    spend: Scalar,
    spend_public: EdwardsPoint,
}

impl Verifier {
    fn check(&self, claim: &SpentOutputClaim) -> std::result::Result<Option<[u8; 32]>, String> {
        let claimed = parse_hex32("key_image", &claim.key_image)?;
        let tx_pub_bytes = parse_hex32("tx_pub_key", &claim.tx_pub_key)?;
        let tx_public = scalar::decompress_point(&tx_pub_bytes)
            .map_err(|_| "tx_pub_key is not a valid ed25519 point".to_string())?;

        let (mut x, one_time_public) =
            derive_output_keys(&self.view, &self.spend, &self.spend_public, &tx_public, claim.out_index);
        let expected = key_image(&x, &one_time_public);
        x.zeroize();
        Ok((expected == claimed).then_some(expected))
    }
}

impl Drop for Verifier {
    fn drop(&mut self) {
        self.view.zeroize();
        self.spend.zeroize();
    }
}

/// Reconciles `claims` against locally recomputed key images.
///
/// Private keys must be canonical scalars and the spend key must match
/// `spend_public`. Unverifiable claims are excluded from the spent sum, never
/// trusted.
pub fn verified_balance(
    total_received: u64,
    claims: &[SpentOutputClaim],
    view_secret: &[u8],
    spend_secret: &[u8],
    spend_public: &[u8],
) -> Result<BalanceReport> {
    let spend_public_bytes: [u8; 32] = spend_public
        .try_into()
        .map_err(|_| WalletError::encoding(format!("spend public key must be 32 bytes, got {}", spend_public.len())))?;
    let verifier = Verifier {
        view: scalar::canonical_scalar(view_secret)?,
        spend: scalar::canonical_scalar(spend_secret)?,
        spend_public: scalar::decompress_point(&spend_public_bytes)?,
    };
    if EdwardsPoint::mul_base(&verifier.spend) != verifier.spend_public {
        return Err(WalletError::InvalidScalar("spend key does not match spend public key".into()));
    }

    let mut seen = HashSet::new();
    let mut verified_spent = 0u64;
    let mut outcomes = Vec::with_capacity(claims.len());
    for claim in claims {
        let outcome = match verifier.check(claim) {
            Ok(Some(ki)) if !seen.insert(ki) => ClaimOutcome::Duplicate,
            Ok(Some(_)) => {
                verified_spent = verified_spent
                    .checked_add(claim.amount)
                    .ok_or_else(|| WalletError::InvalidAmount("verified spends overflow u64".into()))?;
                ClaimOutcome::Verified
            }
            Ok(None) => {
                warn!(key_image = %claim.key_image, amount = claim.amount, "spent-output claim does not match wallet keys");
                ClaimOutcome::Unmatched
            }
            Err(reason) => {
                warn!(%reason, "malformed spent-output claim");
                ClaimOutcome::Malformed(reason)
            }
        };
        outcomes.push(outcome);
    }

    let balance = total_received
        .checked_sub(verified_spent)
        .ok_or(WalletError::InconsistentBalance { received: total_received, spent: verified_spent })?;
    let verified_count = outcomes.iter().filter(|o| **o == ClaimOutcome::Verified).count();
    debug!(claims = claims.len(), verified_count, balance, "verified balance");

    Ok(BalanceReport { total_received, verified_spent, balance, verified_count, outcomes })
}

/// [`verified_balance`] with keys taken from a derived keyset.
pub fn verified_balance_with_keys(total_received: u64, claims: &[SpentOutputClaim], keys: &CryptonoteKeys) -> Result<BalanceReport> {
    verified_balance(
        total_received,
        claims,
        keys.view.secret_bytes().as_slice(),
        keys.spend.secret_bytes().as_slice(),
        &keys.spend.public_bytes(),
    )
}
