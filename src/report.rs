//! Memory usage table, as printed at the end of a firmware build.

use log::warn;
use serde_json::{json, Value};

use crate::memory::MemoryRegion;
use crate::sections::Section;
use crate::units::human_bytes;
use crate::usage::{account_by_address, account_by_name, image_kind, ImageKind, RegionUsage};

/// Sections counted per region when the linker script gives no layout.
pub const FLASH_SECTIONS: &[&str] = &[".text", ".data"];
pub const RAM_SECTIONS: &[&str] = &[".data", ".bss", ".noInit", ".noInitLowRam"];
pub const EEPROM_SECTIONS: &[&str] = &[".eeprom"];

/// Region sizes from the build system, used only without a layout.
#[derive(Debug, Clone, Copy, Default)]
pub struct FallbackSizes {
    pub flash: u64,
    pub ram: u64,
    pub eeprom: u64,
}

/// Usage per region. With a layout, sections are placed by address and the
/// image kind is known; without one, the fixed flash/ram/eeprom trio is
/// filled by section name.
pub fn region_usage(
    regions: &[MemoryRegion],
    sections: &[Section],
    fallback: &FallbackSizes,
) -> (Vec<RegionUsage>, Option<ImageKind>) {
    if !regions.is_empty() {
        return (
            account_by_address(regions, sections),
            Some(image_kind(regions, sections)),
        );
    }
    warn!("no memory layout; attributing sections by name");
    let named = [
        (MemoryRegion::new("flash", 0, fallback.flash), FLASH_SECTIONS),
        (MemoryRegion::new("ram", 0, fallback.ram), RAM_SECTIONS),
        (MemoryRegion::new("eeprom", 0, fallback.eeprom), EEPROM_SECTIONS),
    ];
    (account_by_name(&named, sections), None)
}

const MIN_COLUMN_WIDTH: usize = 14;

fn percent(used: u64, size: u64) -> String {
    if size == 0 {
        return "0.00%".to_string();
    }
    format!("{:.2}%", used as f64 / size as f64 * 100.0)
}

/// Right-aligned four column table, one row per region.
pub fn format_usage_table(usage: &[RegionUsage]) -> String {
    let header = ["Memory region", "Used Size", "Region Size", "%age Used"];
    let rows: Vec<[String; 4]> = usage
        .iter()
        .map(|u| {
            [
                u.name.clone(),
                human_bytes(u.used),
                human_bytes(u.length),
                percent(u.used, u.length),
            ]
        })
        .collect();

    let mut widths = [MIN_COLUMN_WIDTH; 4];
    for row in &rows {
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(cell.len());
        }
    }

    let mut out = String::new();
    let mut push_row = |cells: [&str; 4]| {
        let line = format!(
            "{:>w0$} {:>w1$} {:>w2$} {:>w3$}",
            cells[0],
            cells[1],
            cells[2],
            cells[3],
            w0 = widths[0],
            w1 = widths[1],
            w2 = widths[2],
            w3 = widths[3],
        );
        out.push_str(&line);
        out.push('\n');
    };
    push_row(header);
    for row in &rows {
        push_row([row[0].as_str(), row[1].as_str(), row[2].as_str(), row[3].as_str()]);
    }
    out
}

pub fn usage_json(usage: &[RegionUsage], image: Option<ImageKind>) -> Value {
    json!({
        "image": image,
        "regions": usage,
    })
}
