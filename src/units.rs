// Copyright (c) 2026 MCU-Debug Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Number grammars shared by the linker script parser, the defsym scanner and
//! the size tool report parser.

use anyhow::{anyhow, bail, Result};

/// Parse a size as written in a linker script or a `--defsym` value.
///
/// Accepted forms: `0x`-prefixed hex (never scaled), or a decimal digit run
/// with an optional case-insensitive `K` (x1024) or `M` (x1024*1024) suffix.
///
/// ```
/// use mcu_link_helper::units::parse_size;
/// assert_eq!(parse_size("520K").unwrap(), 532480);
/// assert_eq!(parse_size("0x400000").unwrap(), 4 * 1024 * 1024);
/// ```
pub fn parse_size(text: &str) -> Result<u64> {
    let text = text.trim();
    if let Some(hex) = strip_hex_prefix(text) {
        return u64::from_str_radix(hex, 16).map_err(|e| anyhow!("invalid hex size '{}': {}", text, e));
    }

    let digits_end = text
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(text.len());
    if digits_end == 0 {
        bail!("invalid size format: '{}'", text);
    }
    let value: u64 = text[..digits_end]
        .parse()
        .map_err(|e| anyhow!("invalid size '{}': {}", text, e))?;

    let scale = match &text[digits_end..] {
        "" => 1,
        "k" | "K" => 1024,
        "m" | "M" => 1024 * 1024,
        other => bail!("unknown size suffix '{}' in '{}'", other, text),
    };
    value
        .checked_mul(scale)
        .ok_or_else(|| anyhow!("size '{}' overflows 64 bits", text))
}

/// Parse an integer with base auto-detection: hex when `0x`-prefixed,
/// decimal otherwise. Used for origins and size tool columns.
pub fn parse_int_auto(text: &str) -> Result<u64> {
    let text = text.trim();
    let parsed = match strip_hex_prefix(text) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => text.parse::<u64>(),
    };
    parsed.map_err(|e| anyhow!("invalid integer '{}': {}", text, e))
}

fn strip_hex_prefix(text: &str) -> Option<&str> {
    text.strip_prefix("0x").or_else(|| text.strip_prefix("0X"))
}

/// Humanised byte count for the usage report.
pub fn human_bytes(bytes: u64) -> String {
    let b = bytes as f64;
    let kb = 1024.0;
    let mb = 1024.0 * 1024.0;

    if b >= mb {
        format!("{:.2} MB", b / mb)
    } else if b < kb * 64.0 {
        format!("{:.0}  B", b)
    } else {
        format!("{:.2} KB", b / kb)
    }
}
