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

use anyhow::{bail, Result};
use log::warn;

use crate::units::parse_int_auto;

/// One output section of a linked image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub name: String,
    pub size: u64,
    pub address: Option<u64>,
}

impl Section {
    pub fn new(name: &str, size: u64, address: Option<u64>) -> Self {
        Self {
            name: name.to_string(),
            size,
            address,
        }
    }

    /// `.stack` and `.heap` describe reserved space, not consumed space.
    pub fn is_reserved(&self) -> bool {
        self.name == ".stack" || self.name == ".heap"
    }

    /// Sections that are never loaded to the target. The size tool reports
    /// them at address 0, which would land in any region starting at 0.
    pub fn is_metadata(&self) -> bool {
        let n = self.name.as_str();
        n == ".comment"
            || n == ".ARM.attributes"
            || n == ".symtab"
            || n == ".strtab"
            || n == ".shstrtab"
            || n.starts_with(".debug")
            || n.starts_with(".stab")
    }
}

/// Parser for `size --format=sysv` output, as printed by GNU binutils:
///
/// ```text
/// firmware.elf  :
/// section            size         addr
/// .text             12345    268435456
/// .data               128    536870912
/// Total             12473
///
///
/// ```
///
/// The two header lines and the `Total` footer are checked rather than
/// dropped blindly, so a changed tool output shows up as a parse error.
pub struct SysvReport;

impl SysvReport {
    pub const FORMAT: &'static str = "sysv v1";

    pub fn parse(text: &str) -> Result<Vec<Section>> {
        let mut lines: Vec<&str> = text.lines().map(str::trim_end).collect();
        while lines.last().is_some_and(|l| l.trim().is_empty()) {
            lines.pop();
        }
        // Some tools print a blank line before the file header
        let first = lines.iter().position(|l| !l.trim().is_empty()).unwrap_or(lines.len());
        let lines = &lines[first..];

        if lines.len() < 3 {
            bail!(
                "size report ({}) too short: expected header, column line and Total, got {} lines",
                Self::FORMAT,
                lines.len()
            );
        }
        let file_line = lines[0].trim();
        if !file_line.ends_with(':') {
            bail!("size report ({}): unexpected first line '{}'", Self::FORMAT, file_line);
        }
        let columns = lines[1].trim();
        if !columns.starts_with("section") || !columns.contains("size") {
            bail!("size report ({}): unexpected column header '{}'", Self::FORMAT, columns);
        }
        let footer = lines[lines.len() - 1].trim();
        if !footer.starts_with("Total") {
            bail!("size report ({}): missing Total line, found '{}'", Self::FORMAT, footer);
        }

        let mut sections = Vec::new();
        for row in &lines[2..lines.len() - 1] {
            let mut words = row.split_whitespace();
            let Some(name) = words.next() else {
                continue;
            };
            let Some(size_text) = words.next() else {
                warn!("size report: section '{}' has no size column, skipped", name);
                continue;
            };
            let size = match parse_int_auto(size_text) {
                Ok(s) => s,
                Err(e) => {
                    warn!("size report: section '{}' skipped: {}", name, e);
                    continue;
                }
            };
            let address = match words.next().map(parse_int_auto) {
                Some(Ok(a)) => Some(a),
                Some(Err(e)) => {
                    warn!("size report: section '{}' has a bad address, kept without one: {}", name, e);
                    None
                }
                None => None,
            };
            sections.push(Section::new(name, size, address));
        }
        Ok(sections)
    }
}
