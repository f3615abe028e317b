//! CLI argument parsing

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Parse a string as a hex or decimal u32
fn parse_hex_u32(s: &str) -> Result<u32, String> {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16).map_err(|e| format!("Invalid hex value: {}", e))
    } else {
        s.parse::<u32>().map_err(|e| format!("Invalid number: {}", e))
    }
}

#[derive(Parser)]
#[command(name = "nvword")]
#[command(
    author,
    version,
    about = "Persist a word in STM32F4 internal flash (simulated)",
    long_about = None
)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

/// Fault to inject into the simulated flash interface
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FaultKind {
    /// Ignore the unlock key sequence
    RefuseUnlock,
    /// Ignore attempts to set the lock bit
    LockStuck,
    /// Never clear the busy flag
    BusyStuck,
    /// Never finish a started program or erase
    OperationStuck,
    /// Raise a programming error on every command
    ProgrammingError,
    /// Treat every sector as write protected
    WriteProtected,
    /// Raise an operation error on every command
    OperationError,
    /// End erases without erasing or raising end-of-operation
    EraseIncomplete,
    /// End programs without writing or raising end-of-operation
    ProgramIncomplete,
    /// Flip bit 0 of every programmed word
    CorruptProgram,
}

/// Options for the persist command
#[derive(clap::Args, Debug, Clone)]
pub struct PersistArgs {
    /// Value to persist (decimal or 0x-prefixed hex; defaults to 12345)
    #[arg(value_parser = parse_hex_u32)]
    pub value: Option<u32>,

    /// Simulator config file (TOML format)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Word already in flash before the first boot (default: erased)
    #[arg(long, value_parser = parse_hex_u32)]
    pub stored: Option<u32>,

    /// Inject a fault (repeatable or comma-separated)
    #[arg(long, value_enum, value_delimiter = ',')]
    pub fault: Vec<FaultKind>,

    /// Skip reading the word back after programming
    #[arg(long)]
    pub no_verify: bool,

    /// Number of boots to simulate on the same flash
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    pub boots: u32,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the boot-time persistence flow against a simulated STM32F4
    Persist(PersistArgs),

    /// Show the flash sector table and the persisted variable location
    Layout,
}
