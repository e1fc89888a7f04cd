//! Entry point for the size-report subcommand: prints how much of each
//! memory region a linked image uses.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use log::{info, warn};

use crate::elf_sections::sections_from_elf;
use crate::linker_script::load_memory_regions;
use crate::report::{format_usage_table, region_usage, usage_json, FallbackSizes};
use crate::size_tool::sections_from_size_tool;
use crate::units::parse_size;
use crate::usage::ImageKind;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Args, Debug)]
pub struct SizeReportArgs {
    /// Size tool, run as `<SIZE_TOOL> --format=sysv <BINARY>`
    pub size_tool: PathBuf,

    /// Linked image to report on
    pub binary: PathBuf,

    /// Flash size used when the linker script has no MEMORY block (e.g. 512K)
    pub flash_size: String,

    /// RAM size used when the linker script has no MEMORY block
    pub ram_size: String,

    /// EEPROM size used when the linker script has no MEMORY block
    pub eeprom_size: String,

    /// Linker script the image was linked with
    pub linker_script: PathBuf,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Read section headers from the ELF image instead of running the size tool
    #[arg(long = "from-elf", default_value_t = false)]
    pub from_elf: bool,
}

pub fn run(args: SizeReportArgs) -> Result<()> {
    let sections = if args.from_elf {
        sections_from_elf(&args.binary)?
    } else {
        sections_from_size_tool(&args.size_tool, &args.binary)?
    };

    let regions = match load_memory_regions(&args.linker_script) {
        Ok(regions) => regions,
        Err(e) => {
            warn!("{:#}", e);
            Vec::new()
        }
    };
    let fallback = FallbackSizes {
        flash: parse_size(&args.flash_size).context("bad flash size")?,
        ram: parse_size(&args.ram_size).context("bad RAM size")?,
        eeprom: parse_size(&args.eeprom_size).context("bad EEPROM size")?,
    };

    let (usage, image) = region_usage(&regions, &sections, &fallback);
    if image == Some(ImageKind::RamOnly) {
        info!("{}: RAM-only image", args.binary.display());
    }

    match args.format {
        OutputFormat::Text => print!("{}", format_usage_table(&usage)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&usage_json(&usage, image))?),
    }
    Ok(())
}
