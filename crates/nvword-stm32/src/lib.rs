//! nvword-stm32 - STM32F4 flash interface driver
//!
//! Implements [`FlashController`](nvword_core::controller::FlashController)
//! on the STM32F4 embedded flash interface registers.
//!
//! # Register access
//!
//! All register and flash-array access goes through the [`Registers`]
//! trait:
//!
//! - [`Mmio`] performs volatile accesses on the real peripheral and is
//!   what firmware uses
//! - the `nvword-sim` crate provides a simulated register file so the
//!   same driver runs in host tests

#![cfg_attr(not(feature = "std"), no_std)]

pub mod controller;
pub mod mmio;
pub mod regs;

pub use controller::Stm32Flash;
pub use mmio::{Mmio, Registers};
