use base64::{engine::general_purpose::URL_SAFE_NO_PAD as B64, Engine as _};
use k256::ecdh::{diffie_hellman, EphemeralSecret};
use k256::elliptic_curve::sec1::ToEncodedPoint;
use k256::{PublicKey, SecretKey};
use rand::rngs::OsRng;
use rand::RngCore;
use zeroize::Zeroizing;

use crate::address;
use crate::chain::{Chain, Network};
use crate::crypto::{self, KEY_LEN};
use crate::error::{Result, WalletError};
use crate::keys::Secp256k1KeyPair;

const TIP_ECDH_CONTEXT: &str = "tipvault 2024-05 tip ecdh key";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetedTip {
    pub ciphertext: Vec<u8>,
    /// SEC1 compressed ephemeral key the recipient needs to recompute the
    /// shared secret.
    pub ephemeral_public: [u8; 33],
}

fn ecdh_key(shared_x: &[u8]) -> Zeroizing<[u8; KEY_LEN]> {
    Zeroizing::new(crypto::blake3_derive(TIP_ECDH_CONTEXT, shared_x))
}

/// ECDH between a fresh ephemeral key and `recipient`; the shared
/// x-coordinate keys the envelope.
pub fn encrypt_for_recipient(payload: &[u8], recipient: &PublicKey) -> Result<TargetedTip> {
    let ephemeral = EphemeralSecret::random(&mut OsRng);
    let mut ephemeral_public = [0u8; 33];
    ephemeral_public.copy_from_slice(ephemeral.public_key().to_encoded_point(true).as_bytes());

    let shared = ephemeral.diffie_hellman(recipient);
    let key = ecdh_key(shared.raw_secret_bytes().as_slice());
    let ciphertext = crypto::aead_seal(&key, payload)?;
    Ok(TargetedTip { ciphertext, ephemeral_public })
}

/// Convenience for callers holding the recipient key as SEC1 bytes.
pub fn encrypt_for_recipient_bytes(payload: &[u8], recipient: &[u8]) -> Result<TargetedTip> {
    let recipient = PublicKey::from_sec1_bytes(recipient)
        .map_err(|_| WalletError::encoding("recipient key is not a valid secp256k1 point"))?;
    encrypt_for_recipient(payload, &recipient)
}

pub fn decrypt_as_recipient(ciphertext: &[u8], ephemeral_public: &[u8], secret: &SecretKey) -> Result<Zeroizing<Vec<u8>>> {
    let ephemeral = PublicKey::from_sec1_bytes(ephemeral_public)
        .map_err(|_| WalletError::encoding("ephemeral key is not a valid secp256k1 point"))?;
    let shared = diffie_hellman(secret.to_nonzero_scalar(), ephemeral.as_affine());
    let key = ecdh_key(shared.raw_secret_bytes().as_slice());
    crypto::aead_open(&key, ciphertext)
}

/// Symmetric key for an untargeted tip. Rendered as unpadded base64url so it
/// can sit after `#` in a link, which browsers never send to a server.
pub struct FragmentKey(Zeroizing<[u8; KEY_LEN]>);

impl FragmentKey {
    pub fn generate() -> Self {
        let mut key = Zeroizing::new([0u8; KEY_LEN]);
        OsRng.fill_bytes(&mut *key);
        FragmentKey(key)
    }

    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        FragmentKey(Zeroizing::new(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }

    pub fn to_fragment(&self) -> String {
        B64.encode(self.as_bytes())
    }

    pub fn from_fragment(fragment: &str) -> Result<Self> {
        let raw = Zeroizing::new(
            B64.decode(fragment.trim_start_matches('#'))
                .map_err(|e| WalletError::encoding(format!("fragment is not base64url: {}", e)))?,
        );
        let bytes: [u8; KEY_LEN] = raw
            .as_slice()
            .try_into()
            .map_err(|_| WalletError::encoding(format!("fragment key must be {} bytes", KEY_LEN)))?;
        Ok(FragmentKey::from_bytes(bytes))
    }
}

impl std::fmt::Debug for FragmentKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("FragmentKey(..)")
    }
}

pub fn encrypt_public(payload: &[u8], key: &FragmentKey) -> Result<Vec<u8>> {
    crypto::aead_seal(key.as_bytes(), payload)
}

pub fn decrypt_public(ciphertext: &[u8], key: &FragmentKey) -> Result<Zeroizing<Vec<u8>>> {
    crypto::aead_open(key.as_bytes(), ciphertext)
}

/// `base#fragment`, replacing any fragment `base` already had.
pub fn tip_url(base: &str, key: &FragmentKey) -> String {
    let base = base.split('#').next().unwrap_or(base);
    format!("{}#{}", base, key.to_fragment())
}

pub fn fragment_key_from_url(url: &str) -> Result<FragmentKey> {
    let (_, fragment) = url
        .split_once('#')
        .ok_or_else(|| WalletError::encoding("tip link has no fragment"))?;
    FragmentKey::from_fragment(fragment)
}

/// Fresh one-time key material for a tip wallet.
pub fn generate_tip_secret() -> Zeroizing<[u8; 32]> {
    let mut secret = Zeroizing::new([0u8; 32]);
    OsRng.fill_bytes(&mut *secret);
    secret
}

/// Address the sender funds for a tip secret: the P2WPKH address of the
/// secret used as a secp256k1 key.
pub fn tip_wallet_address(secret: &[u8], chain: Chain, network: Network) -> Result<String> {
    let keys = Secp256k1KeyPair::from_secret_bytes(secret)?;
    address::encode_p2wpkh(chain, network, &keys.public_bytes())
}
