//! nvword - Persist a single word in STM32F4 internal flash
//!
//! Host front-end for the `nvword` crates. The firmware-side flow
//! (compare, erase the containing sector, program, verify) runs unchanged
//! against a register-level simulation of the STM32F4 flash interface, so
//! the protocol and its fault paths can be exercised without hardware.
//!
//! # Fault handling
//!
//! Faults are routed to a fault sink that never returns: the fault is logged
//! and the process exits with the fault's numeric code, the same way the
//! firmware halts.

mod commands;

use clap::Parser;
use nvword::cli::{Cli, Commands};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    // Set log level based on verbosity
    match cli.verbose {
        0 => {} // default (info)
        1 => log::set_max_level(log::LevelFilter::Debug),
        _ => log::set_max_level(log::LevelFilter::Trace),
    }

    match cli.command {
        Commands::Persist(args) => commands::persist::run(&args),
        Commands::Layout => {
            commands::layout::print_layout();
            Ok(())
        }
    }
}
