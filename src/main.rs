use std::process::ExitCode;

use clap::{Parser, Subcommand};
use log::error;

use mcu_link_helper::commands::{
    link::{self, LinkArgs},
    regions::{self, RegionsArgs},
    size_report::{self, SizeReportArgs},
};
use mcu_link_helper::debug::init_logging;
use mcu_link_helper::LinkFailed;

#[derive(Parser, Debug)]
#[command(name = "mcu-link-helper", version, about = "Link-time helpers for MCU firmware builds")]
struct Cli {
    /// Enable debug output
    #[arg(short = 'd', long = "debug", global = true, default_value_t = false)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Link twice, giving the stack all RAM the first link left unused
    TwoStageLink(LinkArgs),
    /// Print memory usage per region for a linked image
    SizeReport(SizeReportArgs),
    /// Print the MEMORY regions of a linker script as JSON
    Regions(RegionsArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Keep the handle alive for the whole run
    let _logger = match init_logging(cli.debug) {
        Ok(handle) => Some(handle),
        Err(e) => {
            eprintln!("Failed to start logger: {}", e);
            None
        }
    };

    let result = match cli.command {
        Command::TwoStageLink(args) => link::run(args),
        Command::SizeReport(args) => size_report::run(args),
        Command::Regions(args) => regions::run(args),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if let Some(failed) = e.downcast_ref::<LinkFailed>() {
                error!("{}", failed);
                return ExitCode::from(failed.exit_code());
            }
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}
