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

//! Typed view of a linker command line: where the output goes, which script
//! describes memory, and where the stack-size symbols are defined.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use crate::units::parse_size;

/// Suffix appended to the output path for the first link pass.
pub const PROVISIONAL_SUFFIX: &str = ".step1";

/// The `--defsym` symbols the build system passes for stack sizing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Defsym {
    RamSize,
    MinStackSize,
    StackSizeExtra,
    HeapSize,
}

impl Defsym {
    pub fn symbol(self) -> &'static str {
        match self {
            Defsym::RamSize => "cmake_ram_size",
            Defsym::MinStackSize => "cmake_min_stack_size",
            Defsym::StackSizeExtra => "cmake_stack_size_extra",
            Defsym::HeapSize => "cmake_heap_size",
        }
    }

    fn marker(self) -> String {
        format!("--defsym={}=", self.symbol())
    }
}

/// Where the output path lives in the argument vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputSlot {
    /// `-o <path>` / `--output <path>`: the path is the whole argument.
    Separate(usize),
    /// `-o<path>` / `--output=<path>`: the path follows a fixed prefix.
    Joined { index: usize, prefix: &'static str },
}

#[derive(Debug, Clone)]
pub struct LinkInvocation {
    args: Vec<String>,
    output: OutputSlot,
    script: Option<PathBuf>,
    ram_size: Option<usize>,
    min_stack_size: Option<usize>,
    stack_size_extra: usize,
    heap_size: Option<usize>,
}

impl LinkInvocation {
    /// Scan linker arguments once, front to back. When a flag repeats, the
    /// last occurrence wins, as it does for the linker itself.
    pub fn scan(args: Vec<String>) -> Result<Self> {
        let mut output = None;
        let mut script = None;
        let mut ram_size = None;
        let mut min_stack_size = None;
        let mut stack_size_extra = None;
        let mut heap_size = None;

        let markers = [
            Defsym::RamSize.marker(),
            Defsym::MinStackSize.marker(),
            Defsym::StackSizeExtra.marker(),
            Defsym::HeapSize.marker(),
        ];

        let mut i = 0;
        while i < args.len() {
            let arg = args[i].as_str();
            let has_next = i + 1 < args.len();

            if (arg == "-o" || arg == "--output") && has_next {
                output = Some(OutputSlot::Separate(i + 1));
                i += 2;
                continue;
            }
            if (arg == "-T" || arg == "--script") && has_next {
                script = Some(PathBuf::from(&args[i + 1]));
                i += 2;
                continue;
            }

            if let Some(path) = driver_script(arg) {
                script = Some(PathBuf::from(path));
            }

            if arg.starts_with("--output=") {
                output = Some(OutputSlot::Joined { index: i, prefix: "--output=" });
            } else if arg.starts_with("-o") && arg.len() > 2 {
                output = Some(OutputSlot::Joined { index: i, prefix: "-o" });
            } else if let Some(path) = arg.strip_prefix("--script=") {
                script = Some(PathBuf::from(path));
            } else if let Some(path) = arg.strip_prefix("-T") {
                if !path.is_empty() && !is_segment_address_flag(path) {
                    script = Some(PathBuf::from(path));
                }
            } else if arg.contains(&markers[0]) {
                ram_size = Some(i);
            } else if arg.contains(&markers[1]) {
                min_stack_size = Some(i);
            } else if arg.contains(&markers[2]) {
                stack_size_extra = Some(i);
            } else if arg.contains(&markers[3]) {
                heap_size = Some(i);
            }
            i += 1;
        }

        let Some(output) = output else {
            bail!("no output file (-o <path>) among the linker arguments");
        };
        let Some(stack_size_extra) = stack_size_extra else {
            bail!(
                "no {} argument among the linker arguments; nothing to patch",
                Defsym::StackSizeExtra.marker()
            );
        };

        Ok(Self {
            args,
            output,
            script,
            ram_size,
            min_stack_size,
            stack_size_extra,
            heap_size,
        })
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn output_path(&self) -> &str {
        match self.output {
            OutputSlot::Separate(idx) => &self.args[idx],
            OutputSlot::Joined { index, prefix } => &self.args[index][prefix.len()..],
        }
    }

    pub fn provisional_output(&self) -> PathBuf {
        PathBuf::from(format!("{}{}", self.output_path(), PROVISIONAL_SUFFIX))
    }

    pub fn script_path(&self) -> Option<&Path> {
        self.script.as_deref()
    }

    fn slot(&self, which: Defsym) -> Option<usize> {
        match which {
            Defsym::RamSize => self.ram_size,
            Defsym::MinStackSize => self.min_stack_size,
            Defsym::StackSizeExtra => Some(self.stack_size_extra),
            Defsym::HeapSize => self.heap_size,
        }
    }

    /// Raw value text of a defsym (after the last `=`), if it was passed.
    pub fn defsym_value(&self, which: Defsym) -> Option<&str> {
        let arg = &self.args[self.slot(which)?];
        arg.rsplit_once('=').map(|(_, v)| v)
    }

    /// Defsym value through the size grammar (`128k`, `0x2000`, `4096`).
    pub fn defsym_size(&self, which: Defsym) -> Result<Option<u64>> {
        self.defsym_value(which)
            .map(|v| parse_size(v).with_context(|| format!("bad value for {}", which.symbol())))
            .transpose()
    }

    /// Arguments for the first pass: identical, except the output goes to
    /// the provisional path.
    pub fn provisional_args(&self) -> Vec<String> {
        let mut args = self.args.clone();
        let provisional = self.provisional_output();
        let provisional = provisional.to_string_lossy();
        match self.output {
            OutputSlot::Separate(idx) => args[idx] = provisional.into_owned(),
            OutputSlot::Joined { index, prefix } => args[index] = format!("{}{}", prefix, provisional),
        }
        args
    }

    /// Arguments for the final pass: the original output path, with the
    /// stack extra symbol set to `extra`.
    pub fn final_args(&self, extra: i64) -> Vec<String> {
        let mut args = self.args.clone();
        let patched = args[self.stack_size_extra]
            .rsplit_once('=')
            .map(|(head, _)| format!("{}={}", head, extra));
        if let Some(patched) = patched {
            args[self.stack_size_extra] = patched;
        }
        args
    }
}

/// Script named inside a compiler-driver pass-through, `-Wl,--script=x.ld`,
/// `-Wl,-T,x.ld` or `-Wl,-Tx.ld`. Last one in the list wins.
fn driver_script(arg: &str) -> Option<&str> {
    let list = arg.strip_prefix("-Wl,")?;
    let mut found = None;
    let mut parts = list.split(',');
    while let Some(part) = parts.next() {
        if part == "-T" || part == "--script" {
            found = parts.next().or(found);
        } else if let Some(path) = part.strip_prefix("--script=") {
            found = Some(path);
        } else if let Some(path) = part.strip_prefix("-T") {
            if !is_segment_address_flag(path) {
                found = Some(path);
            }
        }
    }
    found.filter(|p| !p.is_empty())
}

/// `-Ttext=...`, `-Tbss ...` and friends set section addresses; they are not
/// script paths.
fn is_segment_address_flag(rest: &str) -> bool {
    ["text", "data", "bss", "ldata", "rodata-segment", "text-segment"]
        .iter()
        .any(|s| rest == *s || rest.strip_prefix(s).is_some_and(|r| r.starts_with('=')))
}
