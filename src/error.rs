use crate::chain::Chain;

/// Every failure the key core can report. Callers decide on retries; nothing
/// here is retried internally.
#[derive(Debug, thiserror::Error)]
pub enum WalletError {
    #[error("invalid mnemonic: {0}")]
    InvalidMnemonic(String),

    #[error("encoding error: {0}")]
    Encoding(String),

    #[error("insufficient funds: need {needed}, have {available}")]
    InsufficientFunds { needed: u64, available: u64 },

    #[error("output of {amount} is below the dust threshold of {threshold}")]
    DustOutput { amount: u64, threshold: u64 },

    #[error("transaction build failed: {0}")]
    TxBuild(String),

    /// Authentication tag mismatch. No plaintext is ever returned alongside it.
    #[error("decryption failed")]
    DecryptionFailed,

    #[error("invalid scalar: {0}")]
    InvalidScalar(String),

    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("{chain} does not support {operation}")]
    UnsupportedChain { chain: Chain, operation: &'static str },

    #[error("verified spends ({spent}) exceed reported total received ({received})")]
    InconsistentBalance { received: u64, spent: u64 },
}

pub type Result<T> = std::result::Result<T, WalletError>;

impl WalletError {
    pub(crate) fn encoding(msg: impl Into<String>) -> Self {
        WalletError::Encoding(msg.into())
    }

    pub(crate) fn tx(msg: impl Into<String>) -> Self {
        WalletError::TxBuild(msg.into())
    }
}
