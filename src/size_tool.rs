use anyhow::{bail, Context, Result};
use log::debug;
use std::path::Path;
use std::process::Command;

use crate::sections::{Section, SysvReport};

/// Run `<tool> --format=sysv <binary>` and return its stdout.
///
/// A tool that cannot be started or exits non-zero is an error; its stderr is
/// carried in the message since the tool's own diagnostics are the useful part.
pub fn run_sysv_report(tool: &Path, binary: &Path) -> Result<String> {
    let mut cmd = Command::new(tool);
    cmd.arg("--format=sysv").arg(binary);
    debug!("running {:?}", cmd);

    let output = cmd
        .output()
        .with_context(|| format!("failed to run size tool '{}'", tool.display()))?;
    if !output.status.success() {
        bail!(
            "size tool '{}' failed ({}): {}",
            tool.display(),
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Section table of `binary` as reported by the size tool.
pub fn sections_from_size_tool(tool: &Path, binary: &Path) -> Result<Vec<Section>> {
    let report = run_sysv_report(tool, binary)?;
    SysvReport::parse(&report).with_context(|| format!("while reading sections of {}", binary.display()))
}
