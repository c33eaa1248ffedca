// Library interface for the tipvault key core
// This allows tests and the CLI to derive keys, encode addresses and sign

pub mod chain;
pub mod error;
pub mod crypto;
pub mod scalar;
pub mod keys;
pub mod base58;
pub mod address;
pub mod utxo;
pub mod tx;
pub mod tip;
pub mod message;
pub mod balance;
pub mod vault;
pub mod config;
pub mod wallet;

pub use chain::{Chain, KeyFamily, Network};
pub use error::{Result, WalletError};
pub use keys::{derive_keyset, derive_keyset_for, generate_mnemonic, validate_mnemonic, Keyset, Seed};
pub use address::address;
pub use utxo::{FeePolicy, FeeRate, TransactionPlan, Utxo};
pub use tx::{build_signed_transaction, SignedTransaction, TxRequest};
pub use balance::{verified_balance, BalanceReport, ClaimOutcome, SpentOutputClaim};
pub use wallet::Wallet;
