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

//! Extracts the `MEMORY { ... }` regions from a GNU ld linker script.
//!
//! Only the first `MEMORY` block is looked at. Declarations have the shape
//!
//! ```text
//! flash (rx) : ORIGIN = 0x10000000, LENGTH = 4M
//! ```
//!
//! Anything the parser does not understand is dropped rather than reported as
//! an error: callers treat "no regions" as a normal outcome and pick their own
//! fallback.

use std::ops::Range;
use std::path::Path;
use std::sync::OnceLock;

use anyhow::{Context, Result};
use log::{debug, warn};
use regex::Regex;

use crate::memory::{region_by_name, MemoryRegion};
use crate::units::{parse_int_auto, parse_size};

fn comment_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)/\*.*?\*/|//[^\n]*").unwrap())
}

fn memory_block_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\bMEMORY\s*\{([^}]*)\}").unwrap())
}

fn region_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(concat!(
            r"(?i)([A-Za-z_][A-Za-z0-9_.]*)\s*(?:\([^)]*\))?\s*:\s*",
            r"(?:ORIGIN|ORG|O)\s*=\s*([0-9A-Za-z]+)\s*,\s*",
            r"(?:LENGTH|LEN|L)\s*=\s*([0-9A-Za-z]+(?:\s*[-+]\s*[0-9A-Za-z]+)*)",
        ))
        .unwrap()
    })
}

/// Remove `/* ... */` and `// ...` comments. Block comments are replaced by a
/// single space so that tokens on either side stay apart. Both kinds are
/// matched in one left-to-right scan, so a `/*` inside a line comment is
/// just comment text.
pub fn strip_comments(text: &str) -> String {
    comment_re()
        .replace_all(text, |caps: &regex::Captures| {
            if caps[0].starts_with("/*") {
                " "
            } else {
                ""
            }
        })
        .into_owned()
}

/// Parse all regions of the first `MEMORY` block, in file order.
pub fn parse_memory_regions(text: &str) -> Vec<MemoryRegion> {
    let text = strip_comments(text);
    let Some(block) = memory_block_re().captures(&text) else {
        return Vec::new();
    };
    let body = block.get(1).map_or("", |m| m.as_str());

    let mut regions = Vec::new();
    for caps in region_re().captures_iter(body) {
        let name = &caps[1];
        let origin = match parse_int_auto(&caps[2]) {
            Ok(v) => v,
            Err(e) => {
                warn!("ignoring memory region '{}': bad ORIGIN: {}", name, e);
                continue;
            }
        };
        let length = match parse_length_expr(&caps[3]) {
            Ok(v) => v,
            Err(e) => {
                warn!("ignoring memory region '{}': bad LENGTH: {}", name, e);
                continue;
            }
        };
        let region = MemoryRegion::new(name, origin, length);
        debug!(
            "region {}: 0x{:08x}..0x{:08x} ({} bytes)",
            region.name,
            region.origin,
            region.end(),
            region.length
        );
        regions.push(region);
    }
    regions
}

/// `LENGTH` value with optional `+ size` / `- size` terms, left to right.
fn parse_length_expr(expr: &str) -> Result<u64> {
    let mut rest = expr.trim();
    let mut total: u64 = 0;
    let mut subtract = false;
    loop {
        let end = rest.find(['+', '-']).unwrap_or(rest.len());
        let term = parse_size(&rest[..end])?;
        total = if subtract {
            total.saturating_sub(term)
        } else {
            total.saturating_add(term)
        };
        if end == rest.len() {
            return Ok(total);
        }
        subtract = rest[end..].starts_with('-');
        rest = rest[end + 1..].trim_start();
    }
}

/// Address span of the region named `flash`, if the script declares one.
/// A zero-length flash region yields an empty range, not `None`.
pub fn flash_address_range(text: &str) -> Option<Range<u64>> {
    let regions = parse_memory_regions(text);
    region_by_name(&regions, "flash").map(|r| r.origin..r.end())
}

/// Read and parse a linker script from disk. Only I/O failures are errors;
/// a script without a `MEMORY` block gives an empty list.
pub fn load_memory_regions(path: &Path) -> Result<Vec<MemoryRegion>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("can't read linker script {}", path.display()))?;
    Ok(parse_memory_regions(&text))
}
