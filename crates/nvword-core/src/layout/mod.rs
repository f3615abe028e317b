//! Flash layout: sector tables and the persisted word's location
//!
//! Sector selection is by index into a fixed table, never by address
//! arithmetic at runtime. The variable's address is resolved to its sector
//! once, in a `const`, so a bad address fails the build.

mod types;
pub mod stm32f4;

pub use types::*;

/// Value a word reads as after erase
pub const ERASED_WORD: u32 = 0xFFFF_FFFF;

/// Size of the persisted word in bytes
pub const WORD_SIZE: u32 = 4;
