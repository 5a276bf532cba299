// Luna Miner - Free and Open Source Software Statement
//
// This project, luna-miner, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/utils/format.rs
// Version: 2.0.0
// Developer: OIEIEIO <oieieio@protonmail.com>
//
// This file provides formatting helpers for the Luna miner's status output,
// located in the utils subdirectory.
//
// Tree Location:
// - src/utils/format.rs (formatting utilities)
// - Depends on: std

use std::time::Duration;

pub struct FormatUtils;

impl FormatUtils {
    /// Format hashrate in appropriate units (H/s, KH/s, MH/s, GH/s)
    pub fn format_hashrate(hashrate: f64) -> String {
        if hashrate >= 1_000_000_000.0 {
            format!("{:.2} GH/s", hashrate / 1_000_000_000.0)
        } else if hashrate >= 1_000_000.0 {
            format!("{:.2} MH/s", hashrate / 1_000_000.0)
        } else if hashrate >= 1_000.0 {
            format!("{:.2} KH/s", hashrate / 1_000.0)
        } else {
            format!("{:.2} H/s", hashrate)
        }
    }

    /// Uptime style: "45s", "12m 05s", "3h 02m"
    pub fn format_uptime(duration: Duration) -> String {
        let secs = duration.as_secs();
        if secs < 60 {
            format!("{}s", secs)
        } else if secs < 3600 {
            format!("{}m {:02}s", secs / 60, secs % 60)
        } else {
            format!("{}h {:02}m", secs / 3600, (secs % 3600) / 60)
        }
    }

    pub fn format_percent(ratio: f64) -> String {
        format!("{:.1}%", ratio * 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_hashrate_units() {
        assert_eq!(FormatUtils::format_hashrate(950.0), "950.00 H/s");
        assert_eq!(FormatUtils::format_hashrate(1_500_000.0), "1.50 MH/s");
    }

    #[test]
    fn test_format_uptime() {
        assert_eq!(FormatUtils::format_uptime(Duration::from_secs(42)), "42s");
        assert_eq!(FormatUtils::format_uptime(Duration::from_secs(725)), "12m 05s");
        assert_eq!(FormatUtils::format_uptime(Duration::from_secs(3 * 3600 + 120)), "3h 02m");
    }
}

// Changelog:
// - v2.0.0 (2025-07-02): Dropped share-count formatting; added uptime and percent helpers.
// - v1.0.0 (2025-06-14): Extracted from monolithic main.rs.
