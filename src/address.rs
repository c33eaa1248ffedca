//! Address codecs, one per key family.
//!
//! * secp256k1: witness v0 P2WPKH, bech32.
//! * Cryptonote: `varint(tag) || spend || view || keccak[..4]`, block base58.
//! * slate: BLAKE3 digest of the public key, bech32m.
//!
//! Decoders reject anything the matching encoder could not have produced.

use bech32::primitives::decode::CheckedHrpstring;
use bech32::{segwit, Bech32m, Hrp};

use crate::base58;
use crate::chain::{Chain, Network};
use crate::crypto;
use crate::error::{Result, WalletError};
use crate::keys::{ChainKeys, Keyset};
use crate::scalar;

const CRYPTONOTE_CHECKSUM_LEN: usize = 4;
const SLATE_KEY_CONTEXT: &str = "tipvault 2024-05 slatepack address key";

/// Renders the single address of `chain` for this keyset.
pub fn address(chain: Chain, keyset: &Keyset) -> Result<String> {
    address_for_keys(chain, keyset.network(), keyset.keys(chain))
}

pub fn address_for_keys(chain: Chain, network: Network, keys: ChainKeys<'_>) -> Result<String> {
    match keys {
        ChainKeys::Secp256k1(k) => encode_p2wpkh(chain, network, &k.public_bytes()),
        ChainKeys::Cryptonote(k) => {
            let tag = chain
                .cryptonote_tag(network)
                .ok_or_else(|| chain.unsupported("Cryptonote addresses"))?;
            Ok(encode_cryptonote(tag, &k.spend.public_bytes(), &k.view.public_bytes()))
        }
        ChainKeys::Slate(k) => encode_slatepack(chain, network, &k.public_bytes()),
    }
}

fn parse_hrp(hrp: &str) -> Result<Hrp> {
    Hrp::parse(hrp).map_err(|e| WalletError::encoding(format!("invalid human-readable part: {}", e)))
}

// -----------------------------------------------------------------------------
// SegWit
// -----------------------------------------------------------------------------

/// Decoded segwit destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WitnessProgram {
    pub version: u8,
    pub program: Vec<u8>,
}

impl WitnessProgram {
    /// `OP_n <push program>`.
    pub fn script_pubkey(&self) -> Vec<u8> {
        let op = if self.version == 0 { 0x00 } else { 0x50 + self.version };
        let mut script = Vec::with_capacity(2 + self.program.len());
        script.push(op);
        script.push(self.program.len() as u8);
        script.extend_from_slice(&self.program);
        script
    }
}

pub fn encode_p2wpkh(chain: Chain, network: Network, pubkey: &[u8; 33]) -> Result<String> {
    encode_p2wpkh_hash(chain, network, &crypto::hash160(pubkey))
}

pub fn encode_p2wpkh_hash(chain: Chain, network: Network, pubkey_hash: &[u8; 20]) -> Result<String> {
    let hrp = chain
        .segwit_hrp(network)
        .ok_or_else(|| chain.unsupported("segwit addresses"))?;
    segwit::encode_v0(parse_hrp(hrp)?, pubkey_hash)
        .map_err(|e| WalletError::encoding(format!("segwit encoding failed: {}", e)))
}

/// Any valid segwit address for `chain` on `network`.
pub fn decode_segwit(chain: Chain, network: Network, addr: &str) -> Result<WitnessProgram> {
    let expected = chain
        .segwit_hrp(network)
        .ok_or_else(|| chain.unsupported("segwit addresses"))?;
    let (hrp, version, program) = segwit::decode(addr)
        .map_err(|e| WalletError::encoding(format!("invalid segwit address: {}", e)))?;
    if !hrp.as_str().eq_ignore_ascii_case(expected) {
        return Err(WalletError::encoding(format!(
            "address prefix '{}' does not match {} ({})",
            hrp, chain, expected
        )));
    }
    Ok(WitnessProgram { version: version.to_u8(), program })
}

/// Witness v0 with a 20-byte program only.
pub fn decode_p2wpkh(chain: Chain, network: Network, addr: &str) -> Result<[u8; 20]> {
    let wp = decode_segwit(chain, network, addr)?;
    if wp.version != 0 {
        return Err(WalletError::encoding(format!("expected witness v0, got v{}", wp.version)));
    }
    wp.program
        .as_slice()
        .try_into()
        .map_err(|_| WalletError::encoding(format!("expected 20-byte program, got {}", wp.program.len())))
}

/// Output script for a payment to `addr`.
pub fn script_pubkey_for(chain: Chain, network: Network, addr: &str) -> Result<Vec<u8>> {
    Ok(decode_segwit(chain, network, addr)?.script_pubkey())
}

// -----------------------------------------------------------------------------
// Cryptonote
// -----------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CryptonoteAddress {
    pub tag: u64,
    pub spend_public: [u8; 32],
    pub view_public: [u8; 32],
}

pub(crate) fn write_varint(mut value: u64, out: &mut Vec<u8>) {
    while value >= 0x80 {
        out.push((value as u8 & 0x7f) | 0x80);
        value >>= 7;
    }
    out.push(value as u8);
}

/// Reads a canonical LEB128 varint, returning the value and bytes consumed.
pub(crate) fn read_varint(data: &[u8]) -> Result<(u64, usize)> {
    let mut value: u64 = 0;
    for (i, &byte) in data.iter().enumerate().take(10) {
        let bits = (byte & 0x7f) as u64;
        let shift = 7 * i as u32;
        if shift == 63 && bits > 1 {
            return Err(WalletError::encoding("varint overflow"));
        }
        value |= bits << shift;
        if byte & 0x80 == 0 {
            if byte == 0 && i > 0 {
                return Err(WalletError::encoding("non-canonical varint"));
            }
            return Ok((value, i + 1));
        }
    }
    Err(WalletError::encoding("truncated varint"))
}

pub fn encode_cryptonote(tag: u64, spend_public: &[u8; 32], view_public: &[u8; 32]) -> String {
    let mut payload = Vec::with_capacity(10 + 64 + CRYPTONOTE_CHECKSUM_LEN);
    write_varint(tag, &mut payload);
    payload.extend_from_slice(spend_public);
    payload.extend_from_slice(view_public);
    let checksum = crypto::keccak256(&payload);
    payload.extend_from_slice(&checksum[..CRYPTONOTE_CHECKSUM_LEN]);
    base58::encode(&payload)
}

/// Decodes without checking the tag against a chain.
pub fn decode_cryptonote_any(addr: &str) -> Result<CryptonoteAddress> {
    let raw = base58::decode(addr)?;
    let (tag, consumed) = read_varint(&raw)?;
    if raw.len() != consumed + 64 + CRYPTONOTE_CHECKSUM_LEN {
        return Err(WalletError::encoding(format!(
            "Cryptonote address decodes to {} bytes, expected {}",
            raw.len(),
            consumed + 64 + CRYPTONOTE_CHECKSUM_LEN
        )));
    }
    let (payload, checksum) = raw.split_at(raw.len() - CRYPTONOTE_CHECKSUM_LEN);
    if crypto::keccak256(payload)[..CRYPTONOTE_CHECKSUM_LEN] != *checksum {
        return Err(WalletError::encoding("Cryptonote address checksum mismatch"));
    }

    let mut spend_public = [0u8; 32];
    let mut view_public = [0u8; 32];
    spend_public.copy_from_slice(&payload[consumed..consumed + 32]);
    view_public.copy_from_slice(&payload[consumed + 32..]);
    scalar::decompress_point(&spend_public)?;
    scalar::decompress_point(&view_public)?;
    Ok(CryptonoteAddress { tag, spend_public, view_public })
}

pub fn decode_cryptonote(chain: Chain, network: Network, addr: &str) -> Result<CryptonoteAddress> {
    let expected = chain
        .cryptonote_tag(network)
        .ok_or_else(|| chain.unsupported("Cryptonote addresses"))?;
    let decoded = decode_cryptonote_any(addr)?;
    if decoded.tag != expected {
        return Err(WalletError::encoding(format!(
            "address tag {} does not match {} ({})",
            decoded.tag, chain, expected
        )));
    }
    Ok(decoded)
}

// -----------------------------------------------------------------------------
// Slatepack
// -----------------------------------------------------------------------------

/// Fixed 32-byte digest carried by a slatepack address.
pub fn slate_key_digest(pubkey: &[u8; 32]) -> [u8; 32] {
    crypto::blake3_derive(SLATE_KEY_CONTEXT, pubkey)
}

pub fn encode_slatepack(chain: Chain, network: Network, pubkey: &[u8; 32]) -> Result<String> {
    encode_slatepack_digest(chain, network, &slate_key_digest(pubkey))
}

pub fn encode_slatepack_digest(chain: Chain, network: Network, digest: &[u8; 32]) -> Result<String> {
    let hrp = chain
        .slate_hrp(network)
        .ok_or_else(|| chain.unsupported("slatepack addresses"))?;
    bech32::encode::<Bech32m>(parse_hrp(hrp)?, digest)
        .map_err(|e| WalletError::encoding(format!("bech32m encoding failed: {}", e)))
}

/// Returns the 32-byte key digest. Only bech32m with the chain's prefix is
/// accepted.
pub fn decode_slatepack(chain: Chain, network: Network, addr: &str) -> Result<[u8; 32]> {
    let expected = chain
        .slate_hrp(network)
        .ok_or_else(|| chain.unsupported("slatepack addresses"))?;
    let checked = CheckedHrpstring::new::<Bech32m>(addr)
        .map_err(|e| WalletError::encoding(format!("invalid slatepack address: {}", e)))?;
    if !checked.hrp().as_str().eq_ignore_ascii_case(expected) {
        return Err(WalletError::encoding(format!(
            "address prefix '{}' does not match {} ({})",
            checked.hrp(),
            chain,
            expected
        )));
    }
    let bytes: Vec<u8> = checked.byte_iter().collect();
    let digest: [u8; 32] = bytes
        .as_slice()
        .try_into()
        .map_err(|_| WalletError::encoding(format!("expected 32-byte payload, got {}", bytes.len())))?;

    // Reject strings whose padding bits differ from the canonical encoding.
    if encode_slatepack_digest(chain, network, &digest)? != addr.to_ascii_lowercase() {
        return Err(WalletError::encoding("non-canonical slatepack address"));
    }
    Ok(digest)
}
