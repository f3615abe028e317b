//! nvword-core - Single-word persistence in internal program flash
//!
//! This crate keeps one 32-bit value alive across power loss by storing it
//! in a dedicated sector of a microcontroller's internal flash. It is
//! `no_std` and performs no allocation.
//!
//! The crate is split into the same layers the hardware forces on us:
//!
//! - [`controller`] - the capability a flash interface must provide
//!   (status flags, key register, lock bit, program/erase commands)
//! - [`flash`] - the protocol driver (unlock, bounded busy-wait, error
//!   classification, lock), the sector erase operation and the
//!   persistence policy built on top of them
//! - [`fault`] - terminal fault sinks that never return
//! - [`layout`] - build-time sector tables and the resolved variable location
//!
//! # Example
//!
//! ```ignore
//! use nvword_core::fault::{self, Halt};
//! use nvword_core::flash::{FlashDriver, Persister};
//! use nvword_core::layout::stm32f4;
//!
//! fn bring_up<C: nvword_core::controller::FlashController>(controller: C) {
//!     let mut persister = Persister::new(FlashDriver::new(controller), stm32f4::VARIABLE);
//!     fault::unwrap_or_report(persister.ensure_persisted(12345), &mut Halt);
//! }
//! ```

#![no_std]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

#[cfg(feature = "std")]
extern crate std;

pub mod controller;
pub mod error;
pub mod fault;
pub mod flash;
pub mod layout;

pub use error::{FaultCode, Result};
