//! nvword-sim - Simulated STM32F4 flash interface
//!
//! This crate emulates the STM32F4 flash interface registers and the flash
//! array in memory. It implements [`Registers`](nvword_stm32::Registers),
//! so the real [`Stm32Flash`](nvword_stm32::Stm32Flash) driver runs against
//! it unchanged. Faults can be injected and every protocol step is recorded
//! in a journal for ordering checks.

pub mod config;
pub mod error;
mod flash;

pub use config::SimConfig;
pub use error::{Result, SimError};
pub use flash::{SimEvent, SimFaults, SimFlash, SimTiming};

