use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use serde_json::{json, Value};

use crate::linker_script::{flash_address_range, load_memory_regions};

#[derive(Args, Debug)]
pub struct RegionsArgs {
    /// Linker script to read the MEMORY block from
    pub linker_script: PathBuf,

    /// Only print the flash region's address span
    #[arg(long, default_value_t = false)]
    pub flash: bool,
}

pub fn run(args: RegionsArgs) -> Result<()> {
    let out = if args.flash {
        let text = std::fs::read_to_string(&args.linker_script)
            .with_context(|| format!("can't read linker script {}", args.linker_script.display()))?;
        match flash_address_range(&text) {
            Some(range) => json!({
                "start": format!("0x{:x}", range.start),
                "end": format!("0x{:x}", range.end),
            }),
            None => Value::Null,
        }
    } else {
        let regions = load_memory_regions(&args.linker_script)?;
        Value::Array(regions.iter().map(|r| r.to_json()).collect())
    };
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}
