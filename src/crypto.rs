use argon2::{Algorithm, Argon2, Params, Version};
use blake3::Hasher;
use chacha20poly1305::{
    aead::{Aead, KeyInit},
    Key, XChaCha20Poly1305, XNonce,
};
use rand::rngs::OsRng;
use rand::RngCore;
use ripemd::Ripemd160;
use sha2::{Digest, Sha256};
use sha3::Keccak256;
use zeroize::Zeroizing;

use crate::error::{Result, WalletError};

/// XChaCha20-Poly1305 nonce length; prefixed to every envelope.
pub const NONCE_LEN: usize = 24;
/// Poly1305 tag length; suffixed by the AEAD.
pub const TAG_LEN: usize = 16;
pub const KEY_LEN: usize = 32;

pub fn sha256(data: &[u8]) -> [u8; 32] {
    Sha256::digest(data).into()
}

/// Double SHA-256, used for txids, sighashes and the seed fingerprint.
pub fn sha256d(data: &[u8]) -> [u8; 32] {
    sha256(&sha256(data))
}

/// RIPEMD160(SHA256(data)): the P2WPKH witness program.
pub fn hash160(data: &[u8]) -> [u8; 20] {
    Ripemd160::digest(Sha256::digest(data)).into()
}

pub fn keccak256(data: &[u8]) -> [u8; 32] {
    Keccak256::digest(data).into()
}

/// Hashes arbitrary data under a BLAKE3 derive-key context.
pub fn blake3_derive(context: &str, data: &[u8]) -> [u8; 32] {
    *Hasher::new_derive_key(context).update(data).finalize().as_bytes()
}

/// Argon2id parameters for password-derived keys. Lanes are fixed to 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct KdfParams {
    #[serde(default = "default_kdf_mem")]
    pub mem_kib: u32,
    #[serde(default = "default_kdf_time")]
    pub time_cost: u32,
}

fn default_kdf_mem() -> u32  { 256 * 1024 }   // 256 MiB
fn default_kdf_time() -> u32 { 3 }

impl Default for KdfParams {
    fn default() -> Self {
        Self { mem_kib: default_kdf_mem(), time_cost: default_kdf_time() }
    }
}

/// Stretches a password into a 32-byte symmetric key with Argon2id.
pub fn argon2id_key(password: &[u8], salt: &[u8], params: KdfParams) -> Result<Zeroizing<[u8; KEY_LEN]>> {
    let p = Params::new(params.mem_kib, params.time_cost, 1, Some(KEY_LEN))
        .map_err(|e| WalletError::encoding(format!("invalid Argon2id parameters: {}", e)))?;
    let a2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, p);
    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    a2.hash_password_into(password, salt, &mut *key)
        .map_err(|e| WalletError::encoding(format!("Argon2id key derivation failed: {}", e)))?;
    Ok(key)
}

/// Encrypts `plaintext` into `nonce || ciphertext || tag` under a fresh
/// random nonce.
pub fn aead_seal(key: &[u8; KEY_LEN], plaintext: &[u8]) -> Result<Vec<u8>> {
    let cipher = XChaCha20Poly1305::new(Key::from_slice(key));
    let mut nonce = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce);
    let ciphertext = cipher
        .encrypt(XNonce::from_slice(&nonce), plaintext)
        .map_err(|e| WalletError::encoding(format!("encryption failed: {}", e)))?;

    let mut envelope = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    envelope.extend_from_slice(&nonce);
    envelope.extend_from_slice(&ciphertext);
    Ok(envelope)
}

/// Opens an envelope produced by [`aead_seal`]. Any length or tag problem is
/// `DecryptionFailed`.
pub fn aead_open(key: &[u8; KEY_LEN], envelope: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
    if envelope.len() < NONCE_LEN + TAG_LEN {
        return Err(WalletError::DecryptionFailed);
    }
    let (nonce, ciphertext) = envelope.split_at(NONCE_LEN);
    let cipher = XChaCha20Poly1305::new(Key::from_slice(key));
    cipher
        .decrypt(XNonce::from_slice(nonce), ciphertext)
        .map(Zeroizing::new)
        .map_err(|_| WalletError::DecryptionFailed)
}
