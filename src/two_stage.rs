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

//! Two-pass link that sizes the stack to whatever RAM is left over.
//!
//! Pass 1 links to `<output>.step1` with the stack extra symbol as given. The
//! size tool then reports the provisional image's sections, RAM use is totalled
//! by address against the script's `MEMORY` regions, and pass 2 links again to
//! the real output with `cmake_stack_size_extra` set to the remaining budget.
//! The provisional image is removed on every exit path.

use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};

use anyhow::{bail, Context, Result};
use log::{debug, info, warn};
use tempfile::TempPath;

use crate::link_args::{Defsym, LinkInvocation};
use crate::linker_script::load_memory_regions;
use crate::memory::{region_by_name, MemoryRegion};
use crate::sections::SysvReport;
use crate::size_tool::run_sysv_report;
use crate::stack_solver::StackBudget;
use crate::usage::{account_by_address, image_kind, used_in, ImageKind, RegionUsage};

/// Exit status of a linker run. `code` is `None` when the process was killed
/// by a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkStatus {
    pub code: Option<i32>,
}

impl LinkStatus {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

impl From<ExitStatus> for LinkStatus {
    fn from(status: ExitStatus) -> Self {
        Self { code: status.code() }
    }
}

/// The external tools the driver needs.
pub trait Toolchain {
    /// Run the linker with `args`, waiting for it to exit.
    fn link(&self, args: &[String]) -> Result<LinkStatus>;
    /// Raw `--format=sysv` report for `binary`.
    fn section_report(&self, binary: &Path) -> Result<String>;
}

/// Real linker and size tool, run as child processes.
pub struct ProcessToolchain {
    pub linker: PathBuf,
    pub size_tool: PathBuf,
}

impl Toolchain for ProcessToolchain {
    fn link(&self, args: &[String]) -> Result<LinkStatus> {
        let mut cmd = Command::new(&self.linker);
        cmd.args(args);
        debug!("running {:?}", cmd);
        let status = cmd
            .status()
            .with_context(|| format!("failed to run linker '{}'", self.linker.display()))?;
        Ok(status.into())
    }

    fn section_report(&self, binary: &Path) -> Result<String> {
        run_sysv_report(&self.size_tool, binary)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkPass {
    Provisional,
    Final,
}

/// A linker run exited unsuccessfully. Carries the child's exit code so the
/// driver can exit with it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkFailed {
    pub pass: LinkPass,
    pub code: Option<i32>,
}

impl LinkFailed {
    pub fn exit_code(&self) -> u8 {
        match self.code {
            Some(c) if (1..=255).contains(&c) => c as u8,
            _ => 1,
        }
    }
}

impl fmt::Display for LinkFailed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pass = match self.pass {
            LinkPass::Provisional => "provisional link (pass 1)",
            LinkPass::Final => "final link (pass 2)",
        };
        match self.code {
            Some(code) => write!(f, "{} failed with exit code {}", pass, code),
            None => write!(f, "{} was terminated by a signal", pass),
        }
    }
}

impl std::error::Error for LinkFailed {}

#[derive(Debug, Clone, Default)]
pub struct LinkOptions {
    /// Fail instead of assuming zero RAM use when the layout is unknown.
    pub strict_layout: bool,
}

#[derive(Debug, Clone)]
pub struct LinkSummary {
    pub output: PathBuf,
    pub budget: StackBudget,
    pub extra_stack: i64,
    /// `None` when no layout was available to decide.
    pub image: Option<ImageKind>,
    pub usage: Vec<RegionUsage>,
}

pub fn two_stage_link<T: Toolchain + ?Sized>(
    toolchain: &T,
    args: Vec<String>,
    options: &LinkOptions,
) -> Result<LinkSummary> {
    let inv = LinkInvocation::scan(args)?;
    let regions = resolve_layout(&inv, options)?;

    let ram_size = match inv.defsym_size(Defsym::RamSize)? {
        Some(size) => size,
        None => match region_by_name(&regions, "ram") {
            Some(ram) => {
                info!("no {} given, using the 'ram' region length {}", Defsym::RamSize.symbol(), ram.length);
                ram.length
            }
            None => bail!(
                "RAM size unknown: pass --defsym={}=<size> or declare a 'ram' region in the linker script",
                Defsym::RamSize.symbol()
            ),
        },
    };
    let min_stack_size = defsym_or_zero(&inv, Defsym::MinStackSize)?;
    let heap_size = defsym_or_zero(&inv, Defsym::HeapSize)?;

    let provisional = TempPath::from_path(inv.provisional_output());
    info!("pass 1: linking {}", provisional.display());
    let status = toolchain.link(&inv.provisional_args())?;
    if !status.success() {
        return Err(LinkFailed {
            pass: LinkPass::Provisional,
            code: status.code,
        }
        .into());
    }

    let report = toolchain.section_report(&provisional)?;
    let sections = SysvReport::parse(&report)
        .with_context(|| format!("while measuring {}", provisional.display()))?;
    let usage = account_by_address(&regions, &sections);
    let used_ram = used_in(&usage, "ram").unwrap_or_else(|| {
        warn!("no 'ram' region known; counting RAM usage as 0");
        0
    });
    let image = (!regions.is_empty()).then(|| image_kind(&regions, &sections));
    if image == Some(ImageKind::RamOnly) {
        info!("image executes from RAM");
    }

    let budget = StackBudget {
        ram_size,
        used_ram,
        min_stack_size,
        heap_size,
    };
    let extra_stack = budget.extra_stack();
    info!(
        "ram {} = used {} + min stack {} + heap {} + reserve {} + extra stack {}",
        budget.ram_size,
        budget.used_ram,
        budget.min_stack_size,
        budget.heap_size,
        budget.reserve(),
        extra_stack
    );
    if extra_stack < 0 {
        warn!("RAM overcommitted by {} bytes; the final link will not fit", -extra_stack);
    }

    info!("pass 2: linking {}", inv.output_path());
    let status = toolchain.link(&inv.final_args(extra_stack))?;
    remove_provisional(provisional);
    if !status.success() {
        return Err(LinkFailed {
            pass: LinkPass::Final,
            code: status.code,
        }
        .into());
    }

    Ok(LinkSummary {
        output: PathBuf::from(inv.output_path()),
        budget,
        extra_stack,
        image,
        usage,
    })
}

fn resolve_layout(inv: &LinkInvocation, options: &LinkOptions) -> Result<Vec<MemoryRegion>> {
    let regions = match inv.script_path() {
        Some(path) => match load_memory_regions(path) {
            Ok(regions) => {
                if regions.is_empty() {
                    warn!("{}: no MEMORY regions found", path.display());
                }
                regions
            }
            Err(e) => {
                warn!("{:#}", e);
                Vec::new()
            }
        },
        None => {
            warn!(
                "no linker script among the linker arguments (expected -T <p>, -T<p>, --script[=]<p> \
                 or -Wl,--script=<p> / -Wl,-T,<p>); memory layout unknown"
            );
            Vec::new()
        }
    };
    if regions.is_empty() && options.strict_layout {
        bail!("memory layout could not be determined and --strict-layout is set");
    }
    Ok(regions)
}

fn defsym_or_zero(inv: &LinkInvocation, which: Defsym) -> Result<u64> {
    Ok(inv.defsym_size(which)?.unwrap_or_else(|| {
        warn!("no --defsym={}=<size> given, assuming 0", which.symbol());
        0
    }))
}

fn remove_provisional(path: TempPath) {
    let display = path.display().to_string();
    if let Err(e) = path.close() {
        if e.kind() != ErrorKind::NotFound {
            warn!("could not remove {}: {}", display, e);
        }
    }
}
