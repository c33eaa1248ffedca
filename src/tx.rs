//! P2WPKH transaction assembly and BIP-143 signing.

use k256::ecdsa::signature::hazmat::{PrehashSigner, PrehashVerifier};
use k256::ecdsa::{Signature, SigningKey, VerifyingKey};
use tracing::debug;

use crate::address;
use crate::chain::{Chain, KeyFamily, Network};
use crate::crypto;
use crate::error::{Result, WalletError};
use crate::keys::Secp256k1KeyPair;
use crate::utxo::{self, FeePolicy, FeeRate, TransactionPlan, Utxo};

const TX_VERSION: u32 = 2;
/// Opts into replace-by-fee.
const SEQUENCE: u32 = 0xffff_fffd;
const LOCKTIME: u32 = 0;
const SIGHASH_ALL: u32 = 0x01;

/// Everything needed to build one signed payment.
#[derive(Debug, Clone)]
pub struct TxRequest<'a> {
    pub chain: Chain,
    pub network: Network,
    pub utxos: &'a [Utxo],
    pub recipient: &'a str,
    /// Ignored when `sweep` is set.
    pub amount: u64,
    pub change_address: &'a str,
    pub fee_rate: FeeRate,
    pub sweep: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction {
    /// Witness serialization, ready to broadcast.
    pub tx_bytes: Vec<u8>,
    /// Display-order hex txid.
    pub txid: String,
    pub fee: u64,
    pub actual_amount: u64,
    pub change: Option<u64>,
}

impl SignedTransaction {
    pub fn hex(&self) -> String {
        hex::encode(&self.tx_bytes)
    }
}

struct TxIn {
    txid: [u8; 32],
    vout: u32,
    value: u64,
}

struct TxOut {
    value: u64,
    script_pubkey: Vec<u8>,
}

/// Bitcoin CompactSize.
pub(crate) fn write_compact_size(n: u64, out: &mut Vec<u8>) {
    match n {
        0..=0xfc => out.push(n as u8),
        0xfd..=0xffff => {
            out.push(0xfd);
            out.extend_from_slice(&(n as u16).to_le_bytes());
        }
        0x1_0000..=0xffff_ffff => {
            out.push(0xfe);
            out.extend_from_slice(&(n as u32).to_le_bytes());
        }
        _ => {
            out.push(0xff);
            out.extend_from_slice(&n.to_le_bytes());
        }
    }
}

fn write_var_bytes(bytes: &[u8], out: &mut Vec<u8>) {
    write_compact_size(bytes.len() as u64, out);
    out.extend_from_slice(bytes);
}

/// Display-order hex to internal byte order.
fn parse_txid(txid: &str) -> Result<[u8; 32]> {
    let mut bytes: [u8; 32] = hex::decode(txid)
        .map_err(|e| WalletError::encoding(format!("txid '{}' is not hex: {}", txid, e)))?
        .try_into()
        .map_err(|_| WalletError::encoding(format!("txid '{}' is not 32 bytes", txid)))?;
    bytes.reverse();
    Ok(bytes)
}

fn write_outpoint(input: &TxIn, out: &mut Vec<u8>) {
    out.extend_from_slice(&input.txid);
    out.extend_from_slice(&input.vout.to_le_bytes());
}

fn write_output(output: &TxOut, out: &mut Vec<u8>) {
    out.extend_from_slice(&output.value.to_le_bytes());
    write_var_bytes(&output.script_pubkey, out);
}

/// `OP_DUP OP_HASH160 <pkh> OP_EQUALVERIFY OP_CHECKSIG`, the BIP-143 script
/// code for a P2WPKH input.
fn p2wpkh_script_code(pubkey_hash: &[u8; 20]) -> Vec<u8> {
    let mut code = Vec::with_capacity(25);
    code.extend_from_slice(&[0x76, 0xa9, 0x14]);
    code.extend_from_slice(pubkey_hash);
    code.extend_from_slice(&[0x88, 0xac]);
    code
}

struct SighashCache {
    hash_prevouts: [u8; 32],
    hash_sequence: [u8; 32],
    hash_outputs: [u8; 32],
}

impl SighashCache {
    fn new(inputs: &[TxIn], outputs: &[TxOut]) -> Self {
        let mut prevouts = Vec::with_capacity(inputs.len() * 36);
        let mut sequences = Vec::with_capacity(inputs.len() * 4);
        for input in inputs {
            write_outpoint(input, &mut prevouts);
            sequences.extend_from_slice(&SEQUENCE.to_le_bytes());
        }
        let mut outs = Vec::new();
        for output in outputs {
            write_output(output, &mut outs);
        }
        Self {
            hash_prevouts: crypto::sha256d(&prevouts),
            hash_sequence: crypto::sha256d(&sequences),
            hash_outputs: crypto::sha256d(&outs),
        }
    }

    /// BIP-143 digest for one input, SIGHASH_ALL.
    fn segwit_v0(&self, input: &TxIn, script_code: &[u8]) -> [u8; 32] {
        let mut preimage = Vec::with_capacity(4 + 32 + 32 + 36 + 26 + 8 + 4 + 32 + 4 + 4);
        preimage.extend_from_slice(&TX_VERSION.to_le_bytes());
        preimage.extend_from_slice(&self.hash_prevouts);
        preimage.extend_from_slice(&self.hash_sequence);
        write_outpoint(input, &mut preimage);
        write_var_bytes(script_code, &mut preimage);
        preimage.extend_from_slice(&input.value.to_le_bytes());
        preimage.extend_from_slice(&SEQUENCE.to_le_bytes());
        preimage.extend_from_slice(&self.hash_outputs);
        preimage.extend_from_slice(&LOCKTIME.to_le_bytes());
        preimage.extend_from_slice(&SIGHASH_ALL.to_le_bytes());
        crypto::sha256d(&preimage)
    }
}

fn serialize(inputs: &[TxIn], outputs: &[TxOut], witnesses: Option<&[Vec<Vec<u8>>]>) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&TX_VERSION.to_le_bytes());
    if witnesses.is_some() {
        out.extend_from_slice(&[0x00, 0x01]);
    }
    write_compact_size(inputs.len() as u64, &mut out);
    for input in inputs {
        write_outpoint(input, &mut out);
        write_compact_size(0, &mut out);
        out.extend_from_slice(&SEQUENCE.to_le_bytes());
    }
    write_compact_size(outputs.len() as u64, &mut out);
    for output in outputs {
        write_output(output, &mut out);
    }
    if let Some(witnesses) = witnesses {
        for stack in witnesses {
            write_compact_size(stack.len() as u64, &mut out);
            for item in stack {
                write_var_bytes(item, &mut out);
            }
        }
    }
    out.extend_from_slice(&LOCKTIME.to_le_bytes());
    out
}

/// DER signature plus sighash byte, checked against the key before use.
fn sign_input(signing_key: &SigningKey, verifying_key: &VerifyingKey, sighash: &[u8; 32]) -> Result<Vec<u8>> {
    let signature: Signature = signing_key
        .sign_prehash(sighash)
        .map_err(|e| WalletError::tx(format!("signing failed: {}", e)))?;
    verifying_key
        .verify_prehash(sighash, &signature)
        .map_err(|_| WalletError::tx("produced signature does not verify"))?;
    let mut sig = signature.to_der().as_bytes().to_vec();
    sig.push(SIGHASH_ALL as u8);
    Ok(sig)
}

/// Select inputs (or sweep), construct outputs, sign every input and
/// serialize. Nothing is returned unless every input carries a verified
/// signature.
pub fn build_signed_transaction(req: &TxRequest<'_>, keys: &Secp256k1KeyPair, policy: &FeePolicy) -> Result<SignedTransaction> {
    if req.chain.family() != KeyFamily::Secp256k1 {
        return Err(req.chain.unsupported("UTXO transactions"));
    }
    let recipient_script = address::script_pubkey_for(req.chain, req.network, req.recipient)?;
    let change_script = if req.sweep {
        None
    } else {
        Some(address::script_pubkey_for(req.chain, req.network, req.change_address)?)
    };

    let plan: TransactionPlan = if req.sweep {
        utxo::plan_sweep(req.utxos, req.fee_rate, policy)?
    } else {
        utxo::select_utxos(req.utxos, req.amount, req.fee_rate, policy)?
    };

    let inputs = plan
        .selected
        .iter()
        .map(|u| Ok(TxIn { txid: parse_txid(&u.txid)?, vout: u.vout, value: u.value }))
        .collect::<Result<Vec<_>>>()?;

    let mut outputs = vec![TxOut { value: plan.amount, script_pubkey: recipient_script }];
    if let (Some(change), Some(script_pubkey)) = (plan.change, change_script) {
        outputs.push(TxOut { value: change, script_pubkey });
    }

    let total_out = outputs
        .iter()
        .try_fold(0u64, |acc, o| acc.checked_add(o.value))
        .and_then(|v| v.checked_add(plan.fee))
        .ok_or_else(|| WalletError::tx("output values overflow u64"))?;
    if total_out != plan.total_in() {
        return Err(WalletError::tx("inputs and outputs do not balance"));
    }

    let signing_key = keys.signing_key();
    let verifying_key = signing_key.verifying_key();
    let pubkey = keys.public_bytes();
    let script_code = p2wpkh_script_code(&keys.pubkey_hash());
    let cache = SighashCache::new(&inputs, &outputs);

    let witnesses = inputs
        .iter()
        .map(|input| {
            let sighash = cache.segwit_v0(input, &script_code);
            let sig = sign_input(&signing_key, verifying_key, &sighash)?;
            Ok(vec![sig, pubkey.to_vec()])
        })
        .collect::<Result<Vec<_>>>()?;

    let tx_bytes = serialize(&inputs, &outputs, Some(&witnesses));
    let mut txid = crypto::sha256d(&serialize(&inputs, &outputs, None));
    txid.reverse();
    let txid = hex::encode(txid);

    debug!(chain = %req.chain, %txid, inputs = inputs.len(), outputs = outputs.len(), fee = plan.fee, "signed transaction");
    Ok(SignedTransaction {
        tx_bytes,
        txid,
        fee: plan.fee,
        actual_amount: plan.amount,
        change: plan.change,
    })
}
