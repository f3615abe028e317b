//! STM32F4 flash interface register definitions
//!
//! Offsets and bit definitions from RM0090 section 3.9 (STM32F405/415,
//! STM32F407/417).

/// Flash interface register block base address
pub const FLASH_R_BASE: usize = 0x4002_3C00;

// ============================================================================
// Register offsets
// ============================================================================

/// Key register
pub const REG_KEYR: usize = 0x04;
/// Status register
pub const REG_SR: usize = 0x0C;
/// Control register
pub const REG_CR: usize = 0x10;

// ============================================================================
// SR bits
// ============================================================================

/// End of operation
pub const SR_EOP: u32 = 1 << 0;
/// Operation error
pub const SR_OPERR: u32 = 1 << 1;
/// Write protection error
pub const SR_WRPERR: u32 = 1 << 4;
/// Programming alignment error
pub const SR_PGAERR: u32 = 1 << 5;
/// Programming parallelism error
pub const SR_PGPERR: u32 = 1 << 6;
/// Programming sequence error
pub const SR_PGSERR: u32 = 1 << 7;
/// Busy
pub const SR_BSY: u32 = 1 << 16;

/// Programming error bits (alignment, parallelism, sequence)
pub const SR_PROG_ERRORS: u32 = SR_PGAERR | SR_PGPERR | SR_PGSERR;
/// All write-1-to-clear bits
pub const SR_CLEARABLE: u32 = SR_EOP | SR_OPERR | SR_WRPERR | SR_PROG_ERRORS;

// ============================================================================
// CR bits
// ============================================================================

/// Programming
pub const CR_PG: u32 = 1 << 0;
/// Sector erase
pub const CR_SER: u32 = 1 << 1;
/// Mass erase
pub const CR_MER: u32 = 1 << 2;
/// Sector number offset
pub const CR_SNB_OFF: u32 = 3;
/// Sector number field
pub const CR_SNB: u32 = 0xF << CR_SNB_OFF;
/// Program size offset
pub const CR_PSIZE_OFF: u32 = 8;
/// Program size field
pub const CR_PSIZE: u32 = 0x3 << CR_PSIZE_OFF;
/// Program size x32, valid for 2.7-3.6V supply (voltage range 3)
pub const CR_PSIZE_X32: u32 = 0x2 << CR_PSIZE_OFF;
/// Start erase
pub const CR_STRT: u32 = 1 << 16;
/// End of operation interrupt enable (also gates SR.EOP)
pub const CR_EOPIE: u32 = 1 << 24;
/// Lock
pub const CR_LOCK: u32 = 1 << 31;

/// Operation selection bits cleared after each command
pub const CR_OPERATION: u32 = CR_PG | CR_SER | CR_MER | CR_SNB | CR_EOPIE;

/// Encode a sector number into the CR.SNB field
pub const fn cr_snb(index: u8) -> u32 {
    ((index as u32) << CR_SNB_OFF) & CR_SNB
}
