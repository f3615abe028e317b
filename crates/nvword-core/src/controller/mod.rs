//! Flash controller abstraction
//!
//! This module defines the capability the protocol driver needs from a
//! flash interface. Chip support crates implement it on real registers;
//! the simulator implements it for host tests.

mod traits;

pub use traits::*;
