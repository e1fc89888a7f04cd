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

/// Logger setup. Diagnostics go to stderr; stdout is reserved for reports.
use flexi_logger::{FlexiLoggerError, Logger, LoggerHandle};

/// Start the global logger. Must be called once at startup, and the handle
/// kept alive until exit. `RUST_LOG` overrides the level chosen here.
pub fn init_logging(debug: bool) -> Result<LoggerHandle, FlexiLoggerError> {
    let level = if debug { "debug" } else { "info" };
    Logger::try_with_env_or_str(level)?
        .log_to_stderr()
        .format(flexi_logger::default_format)
        .start()
}
