use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Result, WalletError};

/// Network selector. Only changes address tags and the BIP-44 coin type of
/// the secp256k1 chains; ed25519 derivation is network independent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    #[default]
    Mainnet,
    Testnet,
}

/// Key families the wallet derives. Each chain belongs to exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyFamily {
    /// secp256k1 BIP-32 leaf, P2WPKH address, UTXO spending.
    Secp256k1,
    /// ed25519 spend/view pair, Cryptonote address.
    Cryptonote,
    /// single ed25519 key, slatepack address.
    Slate,
}

/// The closed set of supported chains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Chain {
    Bitcoin,
    Litecoin,
    Monero,
    Wownero,
    Grin,
}

impl Chain {
    pub const ALL: [Chain; 5] = [
        Chain::Bitcoin,
        Chain::Litecoin,
        Chain::Monero,
        Chain::Wownero,
        Chain::Grin,
    ];

    pub fn family(self) -> KeyFamily {
        match self {
            Chain::Bitcoin | Chain::Litecoin => KeyFamily::Secp256k1,
            Chain::Monero | Chain::Wownero => KeyFamily::Cryptonote,
            Chain::Grin => KeyFamily::Slate,
        }
    }

    pub fn ticker(self) -> &'static str {
        match self {
            Chain::Bitcoin => "btc",
            Chain::Litecoin => "ltc",
            Chain::Monero => "xmr",
            Chain::Wownero => "wow",
            Chain::Grin => "grin",
        }
    }

    /// BIP-44 coin type used in `84'/coin'/0'/0/0`.
    pub fn coin_type(self, network: Network) -> Option<u32> {
        match (self, network) {
            (Chain::Bitcoin | Chain::Litecoin, Network::Testnet) => Some(1),
            (Chain::Bitcoin, Network::Mainnet) => Some(0),
            (Chain::Litecoin, Network::Mainnet) => Some(2),
            _ => None,
        }
    }

    /// Bech32 human-readable part for segwit addresses.
    pub fn segwit_hrp(self, network: Network) -> Option<&'static str> {
        match (self, network) {
            (Chain::Bitcoin, Network::Mainnet) => Some("bc"),
            (Chain::Bitcoin, Network::Testnet) => Some("tb"),
            (Chain::Litecoin, Network::Mainnet) => Some("ltc"),
            (Chain::Litecoin, Network::Testnet) => Some("tltc"),
            _ => None,
        }
    }

    /// Varint public-address tag prefixed to Cryptonote addresses.
    pub fn cryptonote_tag(self, network: Network) -> Option<u64> {
        match (self, network) {
            (Chain::Monero, Network::Mainnet) => Some(18),
            (Chain::Wownero, Network::Mainnet) => Some(4146),
            (Chain::Monero | Chain::Wownero, Network::Testnet) => Some(53),
            _ => None,
        }
    }

    pub fn slate_hrp(self, network: Network) -> Option<&'static str> {
        match (self, network) {
            (Chain::Grin, Network::Mainnet) => Some("grin"),
            (Chain::Grin, Network::Testnet) => Some("tgrin"),
            _ => None,
        }
    }

    /// Domain-separation label for the hash-then-reduce ed25519 derivation.
    pub fn derivation_id(self) -> &'static str {
        match self {
            Chain::Bitcoin => "bitcoin",
            Chain::Litecoin => "litecoin",
            Chain::Monero => "monero",
            Chain::Wownero => "wownero",
            Chain::Grin => "grin",
        }
    }

    /// Prefix of the chain's `signmessage` convention.
    pub fn message_magic(self) -> Option<&'static str> {
        match self {
            Chain::Bitcoin => Some("Bitcoin Signed Message:\n"),
            Chain::Litecoin => Some("Litecoin Signed Message:\n"),
            _ => None,
        }
    }

    pub(crate) fn unsupported(self, operation: &'static str) -> WalletError {
        WalletError::UnsupportedChain { chain: self, operation }
    }
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.ticker())
    }
}

impl FromStr for Chain {
    type Err = WalletError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "btc" | "bitcoin" => Ok(Chain::Bitcoin),
            "ltc" | "litecoin" => Ok(Chain::Litecoin),
            "xmr" | "monero" => Ok(Chain::Monero),
            "wow" | "wownero" => Ok(Chain::Wownero),
            "grin" => Ok(Chain::Grin),
            other => Err(WalletError::encoding(format!("unknown chain '{}'", other))),
        }
    }
}
