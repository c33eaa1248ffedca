//! Cryptonote block base58.
//!
//! Input is split into 8-byte blocks, each read as a big-endian integer and
//! written as exactly 11 alphabet characters. A trailing partial block of
//! 1..=7 bytes is written with the fixed widths in [`ENCODED_BLOCK_SIZES`].
//! Unlike Bitcoin base58 there is no leading-zero compression, so the
//! encoded length depends only on the input length.

use crate::error::{Result, WalletError};

const ALPHABET: &[u8; 58] = b"123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";
pub const FULL_BLOCK_SIZE: usize = 8;
pub const FULL_ENCODED_BLOCK_SIZE: usize = 11;
/// Encoded width indexed by raw block length 0..=8.
pub const ENCODED_BLOCK_SIZES: [usize; 9] = [0, 2, 3, 5, 6, 7, 9, 10, 11];

fn alphabet_index(c: u8) -> Option<u64> {
    ALPHABET.iter().position(|&a| a == c).map(|i| i as u64)
}

fn raw_size_for_encoded(width: usize) -> Option<usize> {
    ENCODED_BLOCK_SIZES.iter().position(|&w| w == width)
}

fn encode_block(block: &[u8], out: &mut String) {
    let mut num = block.iter().fold(0u64, |acc, &b| (acc << 8) | b as u64);
    let width = ENCODED_BLOCK_SIZES[block.len()];
    let mut buf = [ALPHABET[0]; FULL_ENCODED_BLOCK_SIZE];
    for slot in buf[..width].iter_mut().rev() {
        *slot = ALPHABET[(num % 58) as usize];
        num /= 58;
    }
    out.extend(buf[..width].iter().map(|&c| c as char));
}

fn decode_block(block: &[u8], out: &mut Vec<u8>) -> Result<()> {
    let raw_len = raw_size_for_encoded(block.len())
        .filter(|&n| n > 0)
        .ok_or_else(|| WalletError::encoding(format!("invalid base58 block width {}", block.len())))?;

    let mut num: u64 = 0;
    for &c in block {
        let digit = alphabet_index(c)
            .ok_or_else(|| WalletError::encoding(format!("invalid base58 character '{}'", c as char)))?;
        num = num
            .checked_mul(58)
            .and_then(|n| n.checked_add(digit))
            .ok_or_else(|| WalletError::encoding("base58 block overflow"))?;
    }
    if raw_len < FULL_BLOCK_SIZE && num >> (8 * raw_len) != 0 {
        return Err(WalletError::encoding("base58 block overflow"));
    }
    out.extend_from_slice(&num.to_be_bytes()[FULL_BLOCK_SIZE - raw_len..]);
    Ok(())
}

pub fn encode(data: &[u8]) -> String {
    let full = data.len() / FULL_BLOCK_SIZE;
    let mut out = String::with_capacity(full * FULL_ENCODED_BLOCK_SIZE + FULL_ENCODED_BLOCK_SIZE);
    for block in data.chunks(FULL_BLOCK_SIZE) {
        encode_block(block, &mut out);
    }
    out
}

pub fn decode(s: &str) -> Result<Vec<u8>> {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len() * FULL_BLOCK_SIZE / FULL_ENCODED_BLOCK_SIZE + FULL_BLOCK_SIZE);
    for block in bytes.chunks(FULL_ENCODED_BLOCK_SIZE) {
        decode_block(block, &mut out)?;
    }
    Ok(out)
}
