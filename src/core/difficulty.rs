// Luna Miner - Free and Open Source Software Statement
//
// This project, luna-miner, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/core/difficulty.rs
// Version: 2.0.0
// Developer: OIEIEIO <oieieio@protonmail.com>
//
// This file contains the difficulty/target arithmetic for the Luna miner,
// located in the core subdirectory. Difficulty counts leading zero hex nibbles
// of the SHA-256 digest; targets are 256-bit big-endian thresholds.

use log::{debug, warn};
use uint::construct_uint;

const LOG_TARGET: &str = "luna::miner::difficulty";

construct_uint! {
    pub struct U256(4);
}

/// Highest difficulty a 256-bit digest can express (64 hex nibbles)
pub const MAX_DIFFICULTY: u32 = 64;

/// Target for a difficulty: the digest must be `<=` this value.
///
/// `U256::MAX >> (4 * difficulty)` accepts exactly the digests whose hex form
/// starts with `difficulty` zeros.
pub fn difficulty_to_target(difficulty: u32) -> U256 {
    if difficulty >= MAX_DIFFICULTY {
        if difficulty > MAX_DIFFICULTY {
            warn!(target: LOG_TARGET, "Difficulty {} exceeds {}, clamping", difficulty, MAX_DIFFICULTY);
        }
        return U256::zero();
    }
    let target = U256::MAX >> (4 * difficulty as usize);
    debug!(target: LOG_TARGET, "Difficulty {} -> target: {:064x}", difficulty, target);
    target
}

/// Deterministic threshold check: digest as big-endian unsigned integer `<=` target
pub fn hash_meets_target(hash: &[u8; 32], target: &U256) -> bool {
    U256::from_big_endian(hash) <= *target
}

/// Number of leading zero nibbles in a digest (its "achieved" difficulty)
pub fn leading_zero_nibbles(hash: &[u8]) -> u32 {
    let mut count = 0;
    for byte in hash {
        if *byte == 0 {
            count += 2;
            continue;
        }
        if byte >> 4 == 0 {
            count += 1;
        }
        break;
    }
    count
}

/// Target rendered as a 64-character hex string for logs and wire documents
pub fn target_to_hex(target: &U256) -> String {
    format!("{:064x}", target)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_for_zero_difficulty_accepts_everything() {
        let target = difficulty_to_target(0);
        assert_eq!(target, U256::MAX);
        assert!(hash_meets_target(&[0xff; 32], &target));
    }

    #[test]
    fn test_target_boundary_matches_nibble_count() {
        let target = difficulty_to_target(4);
        let mut hash = [0xffu8; 32];
        hash[0] = 0x00;
        hash[1] = 0x00;
        assert!(hash_meets_target(&hash, &target));
        assert_eq!(leading_zero_nibbles(&hash), 4);

        hash[1] = 0x01;
        assert!(!hash_meets_target(&hash, &target));
        assert_eq!(leading_zero_nibbles(&hash), 3);
    }

    #[test]
    fn test_max_difficulty_target_is_zero() {
        assert!(difficulty_to_target(64).is_zero());
        assert!(difficulty_to_target(90).is_zero());
        assert!(hash_meets_target(&[0u8; 32], &difficulty_to_target(64)));
    }

    #[test]
    fn test_target_hex_width() {
        let hex = target_to_hex(&difficulty_to_target(2));
        assert_eq!(hex.len(), 64);
        assert!(hex.starts_with("00ff"));
    }
}

// Changelog:
// - v2.0.0 (2025-07-02): Replaced SHA3x/SHA-256 pool difficulty with nibble targets.
//   - difficulty_to_target now shifts U256::MAX by four bits per difficulty step.
//   - hash_meets_target compares the digest as a big-endian U256.
//   - Added leading_zero_nibbles for reporting achieved difficulty.
// - v1.2.10 (2025-06-19): Fixed SHA-256 target calculation for share validation.
