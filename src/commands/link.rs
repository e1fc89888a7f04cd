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

//! Entry point for the two-stage-link subcommand. Invoked by the build system
//! in place of the linker:
//!
//! ```text
//! mcu-link-helper two-stage-link arm-none-eabi-size arm-none-eabi-g++ <linker args...>
//! ```

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use log::info;

use crate::two_stage::{two_stage_link, LinkOptions, ProcessToolchain};

#[derive(Args, Debug)]
pub struct LinkArgs {
    /// Treat a missing or unreadable MEMORY layout as an error
    #[arg(long = "strict-layout", default_value_t = false)]
    pub strict_layout: bool,

    /// Size tool, run as `<SIZE_TOOL> --format=sysv <image>`
    pub size_tool: PathBuf,

    /// Linker (or compiler driver) run for both passes
    pub linker: PathBuf,

    /// Arguments passed to the linker unchanged, apart from the output path
    /// and the stack extra symbol
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub linker_args: Vec<String>,
}

pub fn run(args: LinkArgs) -> Result<()> {
    let toolchain = ProcessToolchain {
        linker: args.linker,
        size_tool: args.size_tool,
    };
    let options = LinkOptions {
        strict_layout: args.strict_layout,
    };

    let summary = two_stage_link(&toolchain, args.linker_args, &options)?;
    info!(
        "linked {} with {} bytes of extra stack",
        summary.output.display(),
        summary.extra_stack
    );
    Ok(())
}
