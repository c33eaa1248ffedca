use tracing::info;
use zeroize::Zeroizing;

use crate::{
    address,
    balance::{self, BalanceReport, SpentOutputClaim},
    chain::{Chain, Network},
    config::Config,
    crypto::KdfParams,
    error::{Result, WalletError},
    keys::{self, Keyset},
    message,
    tip,
    tx::{self, SignedTransaction, TxRequest},
    utxo::{self, FeeRate, TransactionPlan, Utxo},
    vault,
};

/// An unlocked wallet: one keyset plus the policy it spends under.
///
/// Keys live only as long as this value. [`Wallet::lock`] (or dropping it)
/// scrubs them.
#[derive(Debug)]
pub struct Wallet {
    keyset: Keyset,
    config: Config,
}

impl Wallet {
    /// Derives every chain's keys from a recovery phrase on the configured
    /// network.
    pub fn unlock(phrase: &str, passphrase: Option<&str>, config: Config) -> Result<Self> {
        let keyset = keys::derive_keyset_for(config.network, phrase, passphrase)?;
        info!("🔓 Wallet unlocked ({} chains, network {:?})", Chain::ALL.len(), config.network);
        Ok(Wallet { keyset, config })
    }

    /// Opens a vault blob from [`Wallet::seal_phrase`] and unlocks it.
    pub fn unlock_sealed(blob: &[u8], password: &[u8], passphrase: Option<&str>, config: Config) -> Result<Self> {
        let plain = vault::open(blob, password)?;
        let phrase = Zeroizing::new(
            std::str::from_utf8(&plain)
                .map_err(|_| WalletError::encoding("sealed phrase is not UTF-8"))?
                .to_owned(),
        );
        Self::unlock(&phrase, passphrase, config)
    }

    /// Validates `phrase` before sealing it, so a typo is caught now rather
    /// than at the next unlock.
    pub fn seal_phrase(phrase: &str, password: &[u8], params: KdfParams) -> Result<Vec<u8>> {
        keys::Seed::from_mnemonic(phrase, None)?;
        let normalized = Zeroizing::new(phrase.trim().to_lowercase());
        vault::seal(normalized.as_bytes(), password, params)
    }

    pub fn network(&self) -> Network {
        self.keyset.network()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn keyset(&self) -> &Keyset {
        &self.keyset
    }

    /// Hex SHA-256d of the seed.
    pub fn fingerprint(&self) -> String {
        hex::encode(self.keyset.fingerprint())
    }

    pub fn address(&self, chain: Chain) -> Result<String> {
        address::address(chain, &self.keyset)
    }

    pub fn addresses(&self) -> Result<Vec<(Chain, String)>> {
        Chain::ALL
            .iter()
            .map(|&chain| Ok((chain, self.address(chain)?)))
            .collect()
    }

    pub fn plan_send(&self, chain: Chain, utxos: &[Utxo], amount: u64, rate: FeeRate) -> Result<TransactionPlan> {
        let policy = self.config.fee_policy(chain)?;
        utxo::select_utxos(utxos, amount, rate, &policy)
    }

    /// Pays `amount` to `recipient`; change returns to this wallet's own
    /// address.
    pub fn send(&self, chain: Chain, utxos: &[Utxo], recipient: &str, amount: u64, rate: FeeRate) -> Result<SignedTransaction> {
        self.build(chain, utxos, recipient, amount, rate, false)
    }

    /// Spends every UTXO to `recipient` with no change output.
    pub fn sweep(&self, chain: Chain, utxos: &[Utxo], recipient: &str, rate: FeeRate) -> Result<SignedTransaction> {
        self.build(chain, utxos, recipient, 0, rate, true)
    }

    fn build(&self, chain: Chain, utxos: &[Utxo], recipient: &str, amount: u64, rate: FeeRate, sweep: bool) -> Result<SignedTransaction> {
        let keys = self.keyset.secp256k1(chain)?;
        let policy = self.config.fee_policy(chain)?;
        let change_address = self.address(chain)?;
        let req = TxRequest {
            chain,
            network: self.network(),
            utxos,
            recipient,
            amount,
            change_address: &change_address,
            fee_rate: rate,
            sweep,
        };
        let signed = tx::build_signed_transaction(&req, keys, &policy)?;
        info!("✍️  Signed {} transaction {} (fee {})", chain, signed.txid, signed.fee);
        Ok(signed)
    }

    pub fn sign_message(&self, chain: Chain, msg: &[u8]) -> Result<String> {
        message::sign_message(chain, self.keyset.secp256k1(chain)?, msg)
    }

    /// SEC1 compressed key senders use for targeted tips.
    pub fn tip_public_key(&self) -> Result<[u8; 33]> {
        Ok(self.keyset.secp256k1(Chain::Bitcoin)?.public_bytes())
    }

    pub fn open_tip(&self, ciphertext: &[u8], ephemeral_public: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
        let keys = self.keyset.secp256k1(Chain::Bitcoin)?;
        tip::decrypt_as_recipient(ciphertext, ephemeral_public, keys.secret_key())
    }

    /// Balance on a Cryptonote chain from a server-reported total, counting
    /// only spends whose key images this wallet can reproduce.
    pub fn verified_balance(&self, chain: Chain, total_received: u64, claims: &[SpentOutputClaim]) -> Result<BalanceReport> {
        balance::verified_balance_with_keys(total_received, claims, self.keyset.cryptonote(chain)?)
    }

    pub fn lock(self) {
        info!("🔒 Wallet locked");
    }
}
