// Crate root: declare modules and control visibility
pub mod commands;
pub mod debug;
pub mod elf_sections;
pub mod link_args;
pub mod linker_script;
pub mod memory;
pub mod report;
pub mod sections;
pub mod size_tool;
pub mod stack_solver;
pub mod two_stage;
pub mod units;
pub mod usage;

// Re-export commonly used API from the library for binaries/tests
pub use linker_script::{flash_address_range, parse_memory_regions};
pub use memory::{find_region, MemoryRegion};
pub use sections::{Section, SysvReport};
pub use stack_solver::StackBudget;
pub use two_stage::{two_stage_link, LinkFailed, LinkOptions, LinkStatus, Toolchain};
pub use units::parse_size;
