use clap::{Parser, Subcommand};
use anyhow::{anyhow, bail, Context};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use zeroize::Zeroizing;

use tipvault::{
    config, keys, message, tip,
    balance::SpentOutputClaim,
    chain::Chain,
    utxo::{FeeRate, Utxo},
    wallet::Wallet,
};

#[derive(Parser)]
#[command(author, version, about = "tipvault key core: addresses, signing and tips for BTC/LTC/XMR/WOW/GRIN")]
struct Cli {
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Unlock from a sealed vault file instead of asking for the phrase
    #[arg(long)]
    vault: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Generate a fresh 24-word recovery phrase
    NewPhrase,
    /// Print the receiving address of every chain
    Addresses,
    /// Print the seed fingerprint
    Fingerprint,
    /// Sign a message with a chain's address key
    SignMessage {
        #[arg(long)]
        chain: Chain,
        message: String,
    },
    /// Check a signed message against an address
    VerifyMessage {
        #[arg(long)]
        chain: Chain,
        #[arg(long)]
        address: String,
        #[arg(long)]
        signature: String,
        message: String,
    },
    /// Build and sign a P2WPKH payment from a JSON list of UTXOs
    BuildTx {
        #[arg(long)]
        chain: Chain,
        /// JSON file: [{"txid": "...", "vout": 0, "value": 100000}]
        #[arg(long)]
        utxos: PathBuf,
        #[arg(long)]
        to: String,
        /// Atomic units; omit with --sweep
        #[arg(long, required_unless_present = "sweep")]
        amount: Option<u64>,
        /// sat/vB
        #[arg(long, default_value_t = 1)]
        fee_rate: u64,
        #[arg(long, default_value_t = false)]
        sweep: bool,
    },
    /// Reconcile a light-wallet server's spent outputs against local key images
    VerifyBalance {
        #[arg(long)]
        chain: Chain,
        /// Total received as reported by the server
        #[arg(long)]
        total_received: u64,
        /// JSON file with the server's spent_outputs array
        #[arg(long)]
        claims: PathBuf,
    },
    /// Seal the recovery phrase under a password
    Seal {
        #[arg(long)]
        out: PathBuf,
    },
    /// Create a tip secret, sealed for a recipient key or behind a link fragment
    NewTip {
        /// Chain whose address the tip secret controls
        #[arg(long, default_value = "btc")]
        chain: Chain,
        /// Hex SEC1 public key of the recipient; omit for a public link
        #[arg(long)]
        recipient: Option<String>,
        #[arg(long, default_value = "https://tipvault.invalid/claim")]
        base_url: String,
    },
    /// Open a tip: targeted (needs the wallet) or from a public link
    OpenTip {
        /// Hex envelope (nonce || ciphertext || tag)
        #[arg(long)]
        ciphertext: String,
        /// Hex SEC1 ephemeral public key of a targeted tip
        #[arg(long, required_unless_present = "link", conflicts_with = "link")]
        ephemeral: Option<String>,
        /// Tip link carrying the key in its fragment
        #[arg(long)]
        link: Option<String>,
    },
}

/// Env var first, then an interactive prompt; non-interactive runs without the
/// variable fail fast.
fn obtain_secret(var: &str, prompt: &str) -> anyhow::Result<Zeroizing<String>> {
    if let Ok(v) = std::env::var(var) {
        return Ok(Zeroizing::new(v));
    }
    if atty::is(atty::Stream::Stdin) {
        let v = rpassword::prompt_password(prompt).context("Failed to read from terminal")?;
        Ok(Zeroizing::new(v))
    } else {
        Err(anyhow!("{} is required in non-interactive mode", var))
    }
}

fn load_config(path: &str) -> anyhow::Result<config::Config> {
    match config::load(path) {
        Ok(c) => Ok(c),
        Err(e1) => {
            let exe_dir = std::env::current_exe()
                .ok()
                .and_then(|p| p.parent().map(|p| p.to_path_buf()));
            if let Some(c) = exe_dir.and_then(|dir| config::load(dir.join("config.toml")).ok()) {
                return Ok(c);
            }
            eprintln!("⚠️  Could not read config from '{}' or exe dir: {}; using built-in defaults", path, e1);
            const EMBEDDED_CONFIG: &str = include_str!("../config.toml");
            config::load_from_str(EMBEDDED_CONFIG)
                .map_err(|e2| anyhow!("failed to load configuration: {} / {}", e1, e2))
        }
    }
}

fn unlock(cli: &Cli, cfg: config::Config) -> anyhow::Result<Wallet> {
    let passphrase = std::env::var("TIPVAULT_PASSPHRASE").ok().map(Zeroizing::new);
    let passphrase = passphrase.as_deref().map(|s| s.as_str());
    let wallet = match &cli.vault {
        Some(path) => {
            let blob = std::fs::read(path)
                .with_context(|| format!("🗂️  couldn’t read vault {}", path.display()))?;
            let password = obtain_secret("TIPVAULT_PASSWORD", "Enter vault password: ")?;
            Wallet::unlock_sealed(&blob, password.as_bytes(), passphrase, cfg)?
        }
        None => {
            let phrase = obtain_secret("TIPVAULT_MNEMONIC", "Enter recovery phrase: ")?;
            Wallet::unlock(&phrase, passphrase, cfg)?
        }
    };
    Ok(wallet)
}

fn read_json<T: serde::de::DeserializeOwned>(path: &PathBuf) -> anyhow::Result<T> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("🗂️  couldn’t read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("📝  invalid JSON in {}", path.display()))
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = load_config(&cli.config)?;

    match &cli.cmd {
        Cmd::NewPhrase => {
            let phrase = keys::generate_mnemonic()?;
            println!("{}", phrase.as_str());
        }
        Cmd::Addresses => {
            let wallet = unlock(&cli, cfg)?;
            for (chain, addr) in wallet.addresses()? {
                println!("{:<5} {}", chain, addr);
            }
        }
        Cmd::Fingerprint => {
            let wallet = unlock(&cli, cfg)?;
            println!("🆔 {}", wallet.fingerprint());
        }
        Cmd::SignMessage { chain, message } => {
            let wallet = unlock(&cli, cfg)?;
            println!("{}", wallet.sign_message(*chain, message.as_bytes())?);
        }
        Cmd::VerifyMessage { chain, address, signature, message } => {
            let ok = message::verify_message(*chain, cfg.network, address, message.as_bytes(), signature)?;
            println!("🔎 Signature: {}", if ok { "OK" } else { "FAIL" });
            if !ok {
                bail!("signature does not match {}", address);
            }
        }
        Cmd::BuildTx { chain, utxos, to, amount, fee_rate, sweep } => {
            let utxos: Vec<Utxo> = read_json(utxos)?;
            let wallet = unlock(&cli, cfg)?;
            let rate = FeeRate::from_sat_per_vb(*fee_rate);
            let signed = if *sweep {
                wallet.sweep(*chain, &utxos, to, rate)?
            } else {
                let amount = amount.ok_or_else(|| anyhow!("--amount is required unless --sweep is set"))?;
                wallet.send(*chain, &utxos, to, amount, rate)?
            };
            eprintln!("✅ txid {} | amount {} | fee {} | change {:?}", signed.txid, signed.actual_amount, signed.fee, signed.change);
            println!("{}", signed.hex());
        }
        Cmd::VerifyBalance { chain, total_received, claims } => {
            let claims: Vec<SpentOutputClaim> = read_json(claims)?;
            let wallet = unlock(&cli, cfg)?;
            let report = wallet.verified_balance(*chain, *total_received, &claims)?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Cmd::Seal { out } => {
            let phrase = obtain_secret("TIPVAULT_MNEMONIC", "Enter recovery phrase: ")?;
            let password = obtain_secret("TIPVAULT_PASSWORD", "Set a vault password: ")?;
            if password.is_empty() {
                bail!("vault password must not be empty");
            }
            let blob = Wallet::seal_phrase(&phrase, password.as_bytes(), cfg.vault)?;
            std::fs::write(out, &blob)
                .with_context(|| format!("🗂️  couldn’t write vault {}", out.display()))?;
            println!("🔐 Sealed recovery phrase to {}", out.display());
        }
        Cmd::NewTip { chain, recipient, base_url } => {
            let secret = tip::generate_tip_secret();
            let fund = tip::tip_wallet_address(secret.as_slice(), *chain, cfg.network)?;
            println!("💸 Fund {} to load the tip", fund);
            println!("secret     {}", hex::encode(secret.as_slice()));
            match recipient {
                Some(recipient) => {
                    let key = hex::decode(recipient).map_err(|e| anyhow!("Invalid recipient key hex: {}", e))?;
                    let sealed = tip::encrypt_for_recipient_bytes(secret.as_slice(), &key)?;
                    println!("ciphertext {}", hex::encode(&sealed.ciphertext));
                    println!("ephemeral  {}", hex::encode(sealed.ephemeral_public));
                }
                None => {
                    let key = tip::FragmentKey::generate();
                    let ciphertext = tip::encrypt_public(secret.as_slice(), &key)?;
                    println!("ciphertext {}", hex::encode(&ciphertext));
                    println!("link       {}", tip::tip_url(base_url, &key));
                }
            }
        }
        Cmd::OpenTip { ciphertext, ephemeral, link } => {
            let ct = hex::decode(ciphertext).map_err(|e| anyhow!("Invalid ciphertext hex: {}", e))?;
            let payload = match (ephemeral, link) {
                (Some(ephemeral), _) => {
                    let eph = hex::decode(ephemeral).map_err(|e| anyhow!("Invalid ephemeral key hex: {}", e))?;
                    let wallet = unlock(&cli, cfg)?;
                    wallet.open_tip(&ct, &eph)?
                }
                (None, Some(link)) => tip::decrypt_public(&ct, &tip::fragment_key_from_url(link)?)?,
                (None, None) => bail!("either --ephemeral or --link is required"),
            };
            println!("{}", hex::encode(payload.as_slice()));
        }
    }
    Ok(())
}
