use base64::{engine::general_purpose::STANDARD, Engine as _};
use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};
use k256::elliptic_curve::sec1::ToEncodedPoint;

use crate::address;
use crate::chain::{Chain, Network};
use crate::crypto;
use crate::error::{Result, WalletError};
use crate::keys::Secp256k1KeyPair;
use crate::tx::write_compact_size;

/// BIP-137 header base for native segwit (P2WPKH) signers.
const HEADER_P2WPKH: u8 = 39;
/// Header base for compressed P2PKH signers; accepted on verify.
const HEADER_P2PKH_COMPRESSED: u8 = 31;

/// `SHA256d(varstr(magic) || varstr(message))`.
pub fn message_digest(chain: Chain, message: &[u8]) -> Result<[u8; 32]> {
    let magic = chain
        .message_magic()
        .ok_or_else(|| chain.unsupported("message signing"))?;
    let mut data = Vec::with_capacity(magic.len() + message.len() + 10);
    write_compact_size(magic.len() as u64, &mut data);
    data.extend_from_slice(magic.as_bytes());
    write_compact_size(message.len() as u64, &mut data);
    data.extend_from_slice(message);
    Ok(crypto::sha256d(&data))
}

/// Deterministic (RFC 6979), low-S. Returns the 65-byte BIP-137 form,
/// base64 encoded.
pub fn sign_message(chain: Chain, keys: &Secp256k1KeyPair, message: &[u8]) -> Result<String> {
    let digest = message_digest(chain, message)?;
    let (signature, recovery_id) = keys
        .signing_key()
        .sign_prehash_recoverable(&digest)
        .map_err(|e| WalletError::tx(format!("message signing failed: {}", e)))?;

    let mut out = [0u8; 65];
    out[0] = HEADER_P2WPKH + recovery_id.to_byte();
    out[1..].copy_from_slice(&signature.to_bytes());
    Ok(STANDARD.encode(out))
}

/// True when `signature` recovers to the key behind `addr`. Malformed
/// signatures and addresses are errors, not `false`.
pub fn verify_message(chain: Chain, network: Network, addr: &str, message: &[u8], signature: &str) -> Result<bool> {
    let expected = address::decode_p2wpkh(chain, network, addr)?;
    let raw = STANDARD
        .decode(signature.trim())
        .map_err(|e| WalletError::encoding(format!("signature is not base64: {}", e)))?;
    if raw.len() != 65 {
        return Err(WalletError::encoding(format!("signature must be 65 bytes, got {}", raw.len())));
    }

    let recid = match raw[0] {
        h @ 31..=34 => h - HEADER_P2PKH_COMPRESSED,
        h @ 39..=42 => h - HEADER_P2WPKH,
        h => return Err(WalletError::encoding(format!("unsupported signature header {}", h))),
    };
    let recovery_id = RecoveryId::from_byte(recid)
        .ok_or_else(|| WalletError::encoding("invalid recovery id"))?;
    let sig = Signature::from_slice(&raw[1..])
        .map_err(|_| WalletError::encoding("invalid signature scalars"))?;

    let digest = message_digest(chain, message)?;
    let recovered = match VerifyingKey::recover_from_prehash(&digest, &sig, recovery_id) {
        Ok(key) => key,
        Err(_) => return Ok(false),
    };
    let pubkey = recovered.to_encoded_point(true);
    Ok(crypto::hash160(pubkey.as_bytes()) == expected)
}
