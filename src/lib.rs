//! nvword command line definitions
//!
//! Shared by the `nvword` binary and the man page generator.

pub mod cli;
