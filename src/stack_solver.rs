use serde::Serialize;

/// Inputs to the stack budget, all in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StackBudget {
    pub ram_size: u64,
    pub used_ram: u64,
    pub min_stack_size: u64,
    pub heap_size: u64,
}

impl StackBudget {
    /// Guard band kept free: 1/256th of the declared RAM, rounded down.
    pub fn reserve(&self) -> u64 {
        self.ram_size / 256
    }

    /// RAM left over for the stack after everything else, on top of the
    /// minimum stack. Negative when RAM is overcommitted; the final link is
    /// where that gets reported.
    pub fn extra_stack(&self) -> i64 {
        let committed = self.used_ram as i128
            + self.min_stack_size as i128
            + self.heap_size as i128
            + self.reserve() as i128;
        (self.ram_size as i128 - committed).clamp(i64::MIN as i128, i64::MAX as i128) as i64
    }
}
