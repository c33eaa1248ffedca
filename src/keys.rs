//! Seed handling and per-chain key derivation.
//!
//! Two strategies share one seed:
//! * secp256k1 chains use BIP-32 at `84'/coin'/0'/0/0`, a single leaf.
//! * ed25519 chains use `reduce(Keccak256(seed || tag || chain || ":v1"))`,
//!   with the Cryptonote view key derived from the spend key.

use bip32::{DerivationPath, XPrv};
use bip39::{Language, Mnemonic};
use curve25519_dalek::edwards::EdwardsPoint;
use curve25519_dalek::scalar::Scalar;
use k256::ecdsa::SigningKey;
use k256::elliptic_curve::sec1::ToEncodedPoint;
use k256::{PublicKey, SecretKey};
use sha3::{Digest, Keccak256};
use std::fmt;
use tracing::debug;
use zeroize::{Zeroize, Zeroizing};

use crate::chain::{Chain, Network};
use crate::crypto;
use crate::error::{Result, WalletError};
use crate::scalar;

pub const SEED_LEN: usize = 64;
const ED25519_DOMAIN_TAG: &[u8] = b"tipvault-ed25519:";
const ED25519_DOMAIN_VERSION: &[u8] = b":v1";

/// 64-byte BIP-39 seed, scrubbed on drop.
pub struct Seed(Zeroizing<[u8; SEED_LEN]>);

impl Seed {
    /// Validates the phrase against the English wordlist and its checksum,
    /// then stretches it with the optional passphrase.
    pub fn from_mnemonic(phrase: &str, passphrase: Option<&str>) -> Result<Self> {
        let normalized = Zeroizing::new(phrase.trim().to_lowercase());
        let mnemonic = Zeroizing::new(
            Mnemonic::parse_in_normalized(Language::English, &normalized)
                .map_err(|e| WalletError::InvalidMnemonic(e.to_string()))?,
        );
        Ok(Seed(Zeroizing::new(mnemonic.to_seed(passphrase.unwrap_or("")))))
    }

    pub fn from_bytes(bytes: [u8; SEED_LEN]) -> Self {
        Seed(Zeroizing::new(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; SEED_LEN] {
        &self.0
    }

    /// SHA-256d of the raw seed. Identifies a phrase without revealing it.
    pub fn fingerprint(&self) -> [u8; 32] {
        crypto::sha256d(self.as_bytes())
    }
}

impl fmt::Debug for Seed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Seed(..)")
    }
}

/// Fresh 24-word English phrase from OS randomness.
pub fn generate_mnemonic() -> Result<Zeroizing<String>> {
    let mnemonic = Zeroizing::new(
        Mnemonic::generate_in(Language::English, 24).map_err(|e| WalletError::InvalidMnemonic(e.to_string()))?,
    );
    Ok(Zeroizing::new(mnemonic.to_string()))
}

/// Checks a phrase without deriving anything.
pub fn validate_mnemonic(phrase: &str) -> bool {
    let normalized = Zeroizing::new(phrase.trim().to_lowercase());
    Mnemonic::parse_in_normalized(Language::English, &normalized)
        .map(Zeroizing::new)
        .is_ok()
}

// -----------------------------------------------------------------------------
// secp256k1 (curve A)
// -----------------------------------------------------------------------------

pub struct Secp256k1KeyPair {
    secret: SecretKey,
    public: PublicKey,
}

impl Secp256k1KeyPair {
    fn derive(seed: &Seed, chain: Chain, network: Network) -> Result<Self> {
        let coin = chain
            .coin_type(network)
            .ok_or_else(|| chain.unsupported("BIP-32 derivation"))?;
        let path: DerivationPath = format!("m/84'/{}'/0'/0/0", coin)
            .parse()
            .map_err(|e: bip32::Error| WalletError::InvalidScalar(format!("derivation path: {}", e)))?;
        let xprv = XPrv::derive_from_path(seed.as_bytes(), &path)
            .map_err(|e| WalletError::InvalidScalar(format!("BIP-32 derivation failed: {}", e)))?;
        let secret = SecretKey::from_bytes(&xprv.private_key().to_bytes())
            .map_err(|_| WalletError::InvalidScalar("derived secp256k1 key out of range".into()))?;
        Ok(Self::from_secret(secret))
    }

    pub fn from_secret(secret: SecretKey) -> Self {
        let public = secret.public_key();
        Self { secret, public }
    }

    pub fn from_secret_bytes(bytes: &[u8]) -> Result<Self> {
        let secret = SecretKey::from_slice(bytes)
            .map_err(|_| WalletError::InvalidScalar("not a valid secp256k1 secret key".into()))?;
        Ok(Self::from_secret(secret))
    }

    pub fn secret_key(&self) -> &SecretKey {
        &self.secret
    }

    pub fn signing_key(&self) -> SigningKey {
        SigningKey::from(&self.secret)
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public
    }

    /// SEC1 compressed encoding.
    pub fn public_bytes(&self) -> [u8; 33] {
        let mut out = [0u8; 33];
        out.copy_from_slice(self.public.to_encoded_point(true).as_bytes());
        out
    }

    pub fn pubkey_hash(&self) -> [u8; 20] {
        crypto::hash160(&self.public_bytes())
    }
}

impl fmt::Debug for Secp256k1KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Secp256k1KeyPair {{ public: {} }}", hex::encode(self.public_bytes()))
    }
}

// -----------------------------------------------------------------------------
// ed25519 (curve B)
// -----------------------------------------------------------------------------

/// A reduced scalar and its public point. The scalar is wiped on drop.
pub struct Ed25519KeyPair {
    secret: Scalar,
    public: EdwardsPoint,
}

impl Ed25519KeyPair {
    pub fn from_scalar(secret: Scalar) -> Self {
        let public = EdwardsPoint::mul_base(&secret);
        Self { secret, public }
    }

    /// Rejects unreduced input rather than silently reducing it.
    pub fn from_secret_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(Self::from_scalar(scalar::canonical_scalar(bytes)?))
    }

    pub fn secret(&self) -> &Scalar {
        &self.secret
    }

    pub fn secret_bytes(&self) -> Zeroizing<[u8; 32]> {
        Zeroizing::new(self.secret.to_bytes())
    }

    pub fn public_point(&self) -> &EdwardsPoint {
        &self.public
    }

    pub fn public_bytes(&self) -> [u8; 32] {
        self.public.compress().to_bytes()
    }
}

impl Drop for Ed25519KeyPair {
    fn drop(&mut self) {
        self.secret.zeroize();
    }
}

impl fmt::Debug for Ed25519KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ed25519KeyPair {{ public: {} }}", hex::encode(self.public_bytes()))
    }
}

/// Cryptonote spend/view pair.
#[derive(Debug)]
pub struct CryptonoteKeys {
    pub spend: Ed25519KeyPair,
    pub view: Ed25519KeyPair,
}

impl CryptonoteKeys {
    /// Rebuilds the pair from a spend key; the view key is `Hs(spend)`.
    pub fn from_spend(spend: Scalar) -> Self {
        let view = scalar::hash_to_scalar(&[spend.as_bytes().as_slice()]);
        Self {
            spend: Ed25519KeyPair::from_scalar(spend),
            view: Ed25519KeyPair::from_scalar(view),
        }
    }
}

/// `reduce(Keccak256(seed || tag || chain_id || ":v1"))`.
fn derive_ed25519_scalar(seed: &Seed, chain: Chain) -> Scalar {
    let mut hasher = Keccak256::new();
    hasher.update(seed.as_bytes());
    hasher.update(ED25519_DOMAIN_TAG);
    hasher.update(chain.derivation_id().as_bytes());
    hasher.update(ED25519_DOMAIN_VERSION);
    let digest: Zeroizing<[u8; 32]> = Zeroizing::new(hasher.finalize().into());
    Scalar::from_bytes_mod_order(*digest)
}

// -----------------------------------------------------------------------------
// Keyset
// -----------------------------------------------------------------------------

/// Borrowed view of one chain's key material.
#[derive(Debug, Clone, Copy)]
pub enum ChainKeys<'a> {
    Secp256k1(&'a Secp256k1KeyPair),
    Cryptonote(&'a CryptonoteKeys),
    Slate(&'a Ed25519KeyPair),
}

/// All keys for one unlocked wallet.
///
/// Every chain has exactly one key (and therefore one address). There is no
/// account or index rotation; adding paths would change the addresses
/// existing wallets already use.
#[derive(Debug)]
pub struct Keyset {
    network: Network,
    fingerprint: [u8; 32],
    bitcoin: Secp256k1KeyPair,
    litecoin: Secp256k1KeyPair,
    monero: CryptonoteKeys,
    wownero: CryptonoteKeys,
    grin: Ed25519KeyPair,
}

impl Keyset {
    /// Derives every chain's keys from `seed`. Either all succeed or none
    /// are returned.
    pub fn from_seed(seed: &Seed, network: Network) -> Result<Self> {
        let bitcoin = Secp256k1KeyPair::derive(seed, Chain::Bitcoin, network)?;
        let litecoin = Secp256k1KeyPair::derive(seed, Chain::Litecoin, network)?;
        let monero = CryptonoteKeys::from_spend(derive_ed25519_scalar(seed, Chain::Monero));
        let wownero = CryptonoteKeys::from_spend(derive_ed25519_scalar(seed, Chain::Wownero));
        let grin = Ed25519KeyPair::from_scalar(derive_ed25519_scalar(seed, Chain::Grin));
        debug!(?network, chains = Chain::ALL.len(), "derived keyset");
        Ok(Self {
            network,
            fingerprint: seed.fingerprint(),
            bitcoin,
            litecoin,
            monero,
            wownero,
            grin,
        })
    }

    pub fn network(&self) -> Network {
        self.network
    }

    pub fn fingerprint(&self) -> [u8; 32] {
        self.fingerprint
    }

    pub fn keys(&self, chain: Chain) -> ChainKeys<'_> {
        match chain {
            Chain::Bitcoin => ChainKeys::Secp256k1(&self.bitcoin),
            Chain::Litecoin => ChainKeys::Secp256k1(&self.litecoin),
            Chain::Monero => ChainKeys::Cryptonote(&self.monero),
            Chain::Wownero => ChainKeys::Cryptonote(&self.wownero),
            Chain::Grin => ChainKeys::Slate(&self.grin),
        }
    }

    pub fn secp256k1(&self, chain: Chain) -> Result<&Secp256k1KeyPair> {
        match self.keys(chain) {
            ChainKeys::Secp256k1(k) => Ok(k),
            _ => Err(chain.unsupported("secp256k1 keys")),
        }
    }

    pub fn cryptonote(&self, chain: Chain) -> Result<&CryptonoteKeys> {
        match self.keys(chain) {
            ChainKeys::Cryptonote(k) => Ok(k),
            _ => Err(chain.unsupported("Cryptonote keys")),
        }
    }

    pub fn slate(&self, chain: Chain) -> Result<&Ed25519KeyPair> {
        match self.keys(chain) {
            ChainKeys::Slate(k) => Ok(k),
            _ => Err(chain.unsupported("slate keys")),
        }
    }
}

/// Validates `phrase` and derives the mainnet keyset.
pub fn derive_keyset(phrase: &str, passphrase: Option<&str>) -> Result<Keyset> {
    derive_keyset_for(Network::Mainnet, phrase, passphrase)
}

pub fn derive_keyset_for(network: Network, phrase: &str, passphrase: Option<&str>) -> Result<Keyset> {
    let seed = Seed::from_mnemonic(phrase, passphrase)?;
    Keyset::from_seed(&seed, network)
}
