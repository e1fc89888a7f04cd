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

//! Assigns sections to memory regions and totals what each region uses.

use log::debug;
use serde::Serialize;

use crate::memory::{find_region, region_by_name, MemoryRegion};
use crate::sections::Section;

/// Used bytes per region, in the same order as the region list it was built
/// from.
#[derive(Debug, Clone, Serialize)]
pub struct RegionUsage {
    pub name: String,
    #[serde(serialize_with = "hex")]
    pub origin: u64,
    #[serde(serialize_with = "hex")]
    pub length: u64,
    pub used: u64,
}

fn hex<S: serde::Serializer>(v: &u64, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&format!("0x{:x}", v))
}

impl RegionUsage {
    fn empty(region: &MemoryRegion) -> Self {
        Self {
            name: region.name.clone(),
            origin: region.origin,
            length: region.length,
            used: 0,
        }
    }
}

/// Bulk accounting by address. Reserved (`.stack`, `.heap`) and metadata
/// sections never count; sections without an address or outside every region
/// are skipped.
pub fn account_by_address(regions: &[MemoryRegion], sections: &[Section]) -> Vec<RegionUsage> {
    let mut usage: Vec<RegionUsage> = regions.iter().map(RegionUsage::empty).collect();
    for section in sections {
        if section.is_reserved() || section.is_metadata() {
            continue;
        }
        let Some(addr) = section.address else {
            debug!("{}: no address, not classified", section.name);
            continue;
        };
        match regions.iter().position(|r| r.contains(addr)) {
            Some(idx) => {
                debug!("{} ({} bytes @ 0x{:x}) -> {}", section.name, section.size, addr, regions[idx].name);
                usage[idx].used = usage[idx].used.saturating_add(section.size);
            }
            None => debug!("{} @ 0x{:x}: outside all regions", section.name, addr),
        }
    }
    usage
}

/// Name-based accounting, for when no layout is available: each region lists
/// the section names it holds. A section may count towards several regions
/// (`.data` lives in both flash and RAM).
pub fn account_by_name(regions: &[(MemoryRegion, &[&str])], sections: &[Section]) -> Vec<RegionUsage> {
    regions
        .iter()
        .map(|(region, names)| {
            let mut u = RegionUsage::empty(region);
            u.used = sections
                .iter()
                .filter(|s| !s.is_reserved() && names.contains(&s.name.as_str()))
                .fold(0u64, |acc, s| acc.saturating_add(s.size));
            u
        })
        .collect()
}

pub fn used_in(usage: &[RegionUsage], name: &str) -> Option<u64> {
    usage.iter().find(|u| u.name == name).map(|u| u.used)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ImageKind {
    /// Code executes from flash.
    Flash,
    /// Code is loaded straight into RAM.
    RamOnly,
}

/// Decide where the image executes from, using the `.text` address.
pub fn image_kind(regions: &[MemoryRegion], sections: &[Section]) -> ImageKind {
    let Some(flash) = region_by_name(regions, "flash") else {
        return ImageKind::RamOnly;
    };
    let text_addr = sections
        .iter()
        .find(|s| s.name == ".text")
        .and_then(|s| s.address);
    match text_addr {
        Some(addr) if flash.contains(addr) => ImageKind::Flash,
        Some(addr) => {
            debug!(
                ".text at 0x{:x} is outside flash; region {}",
                addr,
                find_region(regions, addr).map_or("<none>", |r| r.name.as_str())
            );
            ImageKind::RamOnly
        }
        None => ImageKind::Flash,
    }
}
