use serde_json::{json, Value};

/// One named memory bank from a linker script `MEMORY` block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryRegion {
    pub name: String, // always lowercase
    pub origin: u64,
    pub length: u64,
}

impl MemoryRegion {
    pub fn new(name: &str, origin: u64, length: u64) -> Self {
        Self {
            name: name.to_ascii_lowercase(),
            origin,
            length,
        }
    }

    /// Half-open containment: `[origin, end)`.
    pub fn contains(&self, addr: u64) -> bool {
        addr >= self.origin && addr < self.end()
    }

    pub fn end(&self) -> u64 {
        self.origin.saturating_add(self.length)
    }

    pub fn to_json(&self) -> Value {
        json!({
            "name": self.name,
            "origin": format!("0x{:x}", self.origin),
            "length": format!("0x{:x}", self.length),
        })
    }
}

/// Find the region containing `addr`. Regions are scanned in order and the
/// first hit wins; overlapping layouts are not validated.
pub fn find_region(regions: &[MemoryRegion], addr: u64) -> Option<&MemoryRegion> {
    regions.iter().find(|r| r.contains(addr))
}

pub fn region_by_name<'a>(regions: &'a [MemoryRegion], name: &str) -> Option<&'a MemoryRegion> {
    regions.iter().find(|r| r.name.eq_ignore_ascii_case(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn containment_is_half_open() {
        let ram = MemoryRegion::new("ram", 0x2000_0000, 0x1000);
        assert!(ram.contains(0x2000_0000));
        assert!(ram.contains(0x2000_0FFF));
        assert!(!ram.contains(0x2000_1000));
        assert!(!ram.contains(0x1FFF_FFFF));
    }

    #[test]
    fn zero_length_contains_nothing() {
        let empty = MemoryRegion::new("eeprom", 0x100, 0);
        assert!(!empty.contains(0x100));
        assert_eq!(empty.end(), 0x100);
    }

    #[test]
    fn first_containing_region_wins() {
        let regions = vec![
            MemoryRegion::new("FLASH", 0x0800_0000, 0x1_0000),
            MemoryRegion::new("ram", 0x2000_0000, 0x8000),
            MemoryRegion::new("ram_alias", 0x2000_0000, 0x100),
        ];
        assert_eq!(regions[0].name, "flash");
        assert_eq!(find_region(&regions, 0x2000_0010).unwrap().name, "ram");
        assert_eq!(find_region(&regions, 0x0800_FFFF).unwrap().name, "flash");
        assert!(find_region(&regions, 0x3000_0000).is_none());
        assert_eq!(region_by_name(&regions, "RAM").unwrap().origin, 0x2000_0000);
    }

    #[test]
    fn json_uses_hex_strings() {
        let v = MemoryRegion::new("ram", 0x2000_0000, 520 * 1024).to_json();
        assert_eq!(v["name"], "ram");
        assert_eq!(v["origin"], "0x20000000");
        assert_eq!(v["length"], "0x82000");
    }
}
