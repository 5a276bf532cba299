// Luna Miner - Free and Open Source Software Statement
//
// This project, luna-miner, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/core/hashing.rs
// Version: 2.0.0
// Developer: OIEIEIO <oieieio@protonmail.com>
//
// This file implements the block hashing used by Luna nodes, located in the
// core subdirectory. The node hashes the string
// "{index}{previous_hash}{timestamp}{transactions}{nonce}" with SHA-256, so the
// miner absorbs the constant prefix once and only feeds the nonce per attempt.
//
// Tree Location:
// - src/core/hashing.rs (block preimage + SHA-256 search primitives)
// - Depends on: sha2, serde_json

use serde::Serialize;
use serde_json::Value;
use serde_json::ser::Formatter;
use sha2::{Digest, Sha256};
use std::io;

/// Serialize transactions the way the node does: sorted keys, `", "` and `": "` separators.
///
/// serde_json maps keep keys sorted, so only the separators need adjusting.
pub fn canonical_transactions_json(transactions: &[Value]) -> String {
    let mut out = Vec::with_capacity(transactions.len() * 128);
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, SpacedFormatter);
    // Writing into a Vec<u8> cannot fail for serde_json::Value
    if transactions.serialize(&mut serializer).is_err() {
        return "[]".to_string();
    }
    String::from_utf8(out).unwrap_or_else(|_| "[]".to_string())
}

/// Compact formatter with spaced separators
struct SpacedFormatter;

impl Formatter for SpacedFormatter {
    fn begin_array_value<W: ?Sized + io::Write>(&mut self, writer: &mut W, first: bool) -> io::Result<()> {
        if first { Ok(()) } else { writer.write_all(b", ") }
    }

    fn begin_object_key<W: ?Sized + io::Write>(&mut self, writer: &mut W, first: bool) -> io::Result<()> {
        if first { Ok(()) } else { writer.write_all(b", ") }
    }

    fn begin_object_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        writer.write_all(b": ")
    }
}

/// Build the constant part of the block preimage (everything but the nonce)
pub fn block_preimage_prefix(index: u64, previous_hash: &str, timestamp: f64, transactions: &[Value]) -> Vec<u8> {
    let timestamp = format_timestamp(timestamp);
    format!("{}{}{}{}", index, previous_hash, timestamp, canonical_transactions_json(transactions)).into_bytes()
}

/// Float timestamps always carry a fractional part on the node side (`1700000000.0`)
fn format_timestamp(timestamp: f64) -> String {
    if timestamp.fract() == 0.0 && timestamp.is_finite() {
        format!("{:.1}", timestamp)
    } else {
        format!("{}", timestamp)
    }
}

/// Hasher with the preimage prefix already absorbed
#[derive(Clone)]
pub struct PrefixHasher {
    state: Sha256,
}

impl PrefixHasher {
    pub fn new(prefix: &[u8]) -> Self {
        let mut state = Sha256::new();
        state.update(prefix);
        Self { state }
    }

    /// Digest for a single nonce
    pub fn hash_nonce(&self, nonce: u64) -> [u8; 32] {
        let mut digits = [0u8; 20];
        let text = write_decimal(nonce, &mut digits);
        let mut state = self.state.clone();
        state.update(text);
        state.finalize().into()
    }

    /// Digest 4 consecutive nonces, reusing the absorbed prefix
    pub fn hash_nonce_batch(&self, nonce: u64) -> [([u8; 32], u64); 4] {
        std::array::from_fn(|i| {
            let n = nonce.wrapping_add(i as u64);
            (self.hash_nonce(n), n)
        })
    }
}

/// Full block hash as lowercase hex, matching the node's `hexdigest()`
pub fn block_hash_hex(prefix: &[u8], nonce: u64) -> String {
    hex::encode(PrefixHasher::new(prefix).hash_nonce(nonce))
}

fn write_decimal(mut value: u64, buf: &mut [u8; 20]) -> &[u8] {
    let mut pos = buf.len();
    loop {
        pos -= 1;
        buf[pos] = b'0' + (value % 10) as u8;
        value /= 10;
        if value == 0 {
            break;
        }
    }
    &buf[pos..]
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_transactions_use_spaced_separators() {
        let txs = vec![json!({"to": "LUN_a", "amount": 1.5, "type": "reward"})];
        assert_eq!(
            canonical_transactions_json(&txs),
            r#"[{"amount": 1.5, "to": "LUN_a", "type": "reward"}]"#
        );
        assert_eq!(canonical_transactions_json(&[]), "[]");
    }

    #[test]
    fn test_prefix_hasher_matches_one_shot_sha256() {
        let prefix = block_preimage_prefix(7, "00ab", 1700000000.5, &[]);
        let expected: [u8; 32] = Sha256::digest(b"700ab1700000000.5[]42").into();
        assert_eq!(PrefixHasher::new(&prefix).hash_nonce(42), expected);
    }

    #[test]
    fn test_whole_timestamps_keep_fraction() {
        let prefix = block_preimage_prefix(1, "h", 1700000000.0, &[]);
        assert_eq!(prefix, b"1h1700000000.0[]".to_vec());
    }

    #[test]
    fn test_batch_hashes_consecutive_nonces() {
        let hasher = PrefixHasher::new(b"abc");
        let batch = hasher.hash_nonce_batch(u64::MAX - 1);
        assert_eq!(batch[0].1, u64::MAX - 1);
        assert_eq!(batch[1].1, u64::MAX);
        assert_eq!(batch[2].1, 0);
        assert_eq!(batch[1].0, hasher.hash_nonce(u64::MAX));
    }

    #[test]
    fn test_write_decimal() {
        let mut buf = [0u8; 20];
        assert_eq!(write_decimal(0, &mut buf), b"0");
        assert_eq!(write_decimal(1234567890, &mut buf), b"1234567890");
        assert_eq!(write_decimal(u64::MAX, &mut buf), b"18446744073709551615");
    }
}

// Changelog:
// - v2.0.0 (2025-07-02): Replaced sha3x.rs/sha256.rs with node-compatible block hashing.
//   - PrefixHasher absorbs the constant preimage once; nonce digits are fed per attempt.
//   - hash_nonce_batch keeps the 4-wide batching shape of the previous SHA3x path.
//   - canonical_transactions_json reproduces the node's sorted, spaced JSON.
