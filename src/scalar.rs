use curve25519_dalek::edwards::{CompressedEdwardsY, EdwardsPoint};
use curve25519_dalek::scalar::Scalar;
use sha3::{Digest, Keccak256};

use crate::error::{Result, WalletError};

/// ℓ = 2^252 + 27742317777372353535851937790883648493, little-endian.
pub const CURVE_ORDER: [u8; 32] = [
    0xed, 0xd3, 0xf5, 0x5c, 0x1a, 0x63, 0x12, 0x58, 0xd6, 0x9c, 0xf7, 0xa2, 0xde, 0xf9, 0xde, 0x14,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x10,
];

/// True when the little-endian integer in `bytes` is strictly below ℓ.
pub fn is_canonical(bytes: &[u8; 32]) -> bool {
    for i in (0..32).rev() {
        if bytes[i] != CURVE_ORDER[i] {
            return bytes[i] < CURVE_ORDER[i];
        }
    }
    false
}

/// Reduces 32 or 64 little-endian bytes mod ℓ (`sc_reduce32` / `sc_reduce`).
pub fn bytes_to_scalar(bytes: &[u8]) -> Result<Scalar> {
    match bytes.len() {
        32 => {
            let mut buf = [0u8; 32];
            buf.copy_from_slice(bytes);
            Ok(Scalar::from_bytes_mod_order(buf))
        }
        64 => {
            let mut buf = [0u8; 64];
            buf.copy_from_slice(bytes);
            Ok(Scalar::from_bytes_mod_order_wide(&buf))
        }
        n => Err(WalletError::InvalidScalar(format!("expected 32 or 64 bytes, got {}", n))),
    }
}

pub fn scalar_to_bytes(s: &Scalar) -> [u8; 32] {
    s.to_bytes()
}

/// Parses caller-supplied private key bytes, refusing anything not already
/// reduced.
pub fn canonical_scalar(bytes: &[u8]) -> Result<Scalar> {
    let arr: [u8; 32] = bytes
        .try_into()
        .map_err(|_| WalletError::InvalidScalar(format!("expected 32 bytes, got {}", bytes.len())))?;
    if !is_canonical(&arr) {
        return Err(WalletError::InvalidScalar("value is not reduced mod the group order".into()));
    }
    Option::<Scalar>::from(Scalar::from_canonical_bytes(arr))
        .ok_or_else(|| WalletError::InvalidScalar("value is not reduced mod the group order".into()))
}

/// Cryptonote `Hs`: Keccak-256 over the concatenated parts, reduced.
pub fn hash_to_scalar(parts: &[&[u8]]) -> Scalar {
    let mut hasher = Keccak256::new();
    for part in parts {
        hasher.update(part);
    }
    Scalar::from_bytes_mod_order(hasher.finalize().into())
}

/// Decompresses a 32-byte ed25519 point, rejecting off-curve encodings.
pub fn decompress_point(bytes: &[u8; 32]) -> Result<EdwardsPoint> {
    CompressedEdwardsY(*bytes)
        .decompress()
        .ok_or_else(|| WalletError::encoding("bytes are not a valid ed25519 point"))
}
