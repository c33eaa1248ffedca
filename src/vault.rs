use rand::rngs::OsRng;
use rand::RngCore;
use tracing::debug;
use zeroize::Zeroizing;

use crate::crypto::{self, KdfParams, NONCE_LEN, TAG_LEN};
use crate::error::{Result, WalletError};

pub const VAULT_VERSION: u8 = 1;
pub const SALT_LEN: usize = 16;
const HEADER_LEN: usize = 1 + 4 + 4 + SALT_LEN;
/// 4 GiB. Anything larger in a blob is treated as corruption.
const MAX_MEM_KIB: u32 = 4 * 1024 * 1024;

/// `version(1) || mem_kib(4, LE) || time_cost(4, LE) || salt(16) || nonce(24)
/// || ciphertext || tag(16)`. The KDF cost is stored so old blobs still open
/// after the defaults change.
pub fn seal(secret: &[u8], password: &[u8], params: KdfParams) -> Result<Vec<u8>> {
    let mut salt = [0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);
    let key = crypto::argon2id_key(password, &salt, params)?;
    let envelope = crypto::aead_seal(&key, secret)?;

    let mut blob = Vec::with_capacity(HEADER_LEN + envelope.len());
    blob.push(VAULT_VERSION);
    blob.extend_from_slice(&params.mem_kib.to_le_bytes());
    blob.extend_from_slice(&params.time_cost.to_le_bytes());
    blob.extend_from_slice(&salt);
    blob.extend_from_slice(&envelope);
    debug!(mem_kib = params.mem_kib, time_cost = params.time_cost, "sealed vault");
    Ok(blob)
}

fn read_u32(bytes: &[u8]) -> u32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(&bytes[..4]);
    u32::from_le_bytes(buf)
}

/// KDF parameters recorded in a sealed blob.
pub fn params_of(blob: &[u8]) -> Result<KdfParams> {
    if blob.len() < HEADER_LEN + NONCE_LEN + TAG_LEN {
        return Err(WalletError::encoding(format!("vault blob too short: {} bytes", blob.len())));
    }
    if blob[0] != VAULT_VERSION {
        return Err(WalletError::encoding(format!("unsupported vault version: {}", blob[0])));
    }
    let params = KdfParams { mem_kib: read_u32(&blob[1..5]), time_cost: read_u32(&blob[5..9]) };
    if params.mem_kib == 0 || params.mem_kib > MAX_MEM_KIB || params.time_cost == 0 {
        return Err(WalletError::encoding(format!(
            "vault KDF parameters out of range: mem_kib={} time_cost={}",
            params.mem_kib, params.time_cost
        )));
    }
    Ok(params)
}

/// A wrong password and a tampered blob are indistinguishable:
/// both are `DecryptionFailed`.
pub fn open(blob: &[u8], password: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
    let params = params_of(blob)?;
    let salt = &blob[9..HEADER_LEN];
    let key = crypto::argon2id_key(password, salt, params)?;
    crypto::aead_open(&key, &blob[HEADER_LEN..])
}
