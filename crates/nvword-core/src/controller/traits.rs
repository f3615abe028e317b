//! Flash controller trait definitions

use bitflags::bitflags;

/// First key of the unlock sequence
pub const KEY1: u32 = 0x4567_0123;
/// Second key of the unlock sequence
pub const KEY2: u32 = 0xCDEF_89AB;

bitflags! {
    /// Flash controller status flags
    ///
    /// A chip-independent view of the status register. Implementations map
    /// their own bits onto these; several hardware bits may fold into one
    /// flag (e.g. alignment, parallelism and sequence errors all report as
    /// `PROGRAMMING_ERROR`).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct FlashStatus: u32 {
        /// A flash operation is in progress
        const BUSY                   = 1 << 0;
        /// The last operation completed
        const END_OF_OPERATION       = 1 << 1;
        /// Programming error (alignment, parallelism, sequence)
        const PROGRAMMING_ERROR      = 1 << 2;
        /// Target address is write protected
        const WRITE_PROTECTION_ERROR = 1 << 3;
        /// Any other operation error reported by the controller
        const OPERATION_ERROR        = 1 << 4;

        /// Every error flag
        const ERRORS = Self::PROGRAMMING_ERROR.bits()
            | Self::WRITE_PROTECTION_ERROR.bits()
            | Self::OPERATION_ERROR.bits();
    }
}

impl Default for FlashStatus {
    fn default() -> Self {
        FlashStatus::empty()
    }
}

/// Flash controller trait
///
/// The primitive register-level operations of an embedded flash interface.
/// None of these methods wait or check for errors; sequencing, polling and
/// fault classification live in [`FlashDriver`](crate::flash::FlashDriver).
pub trait FlashController {
    /// Keys written to the key register, in order, to unlock the controller
    const UNLOCK_KEYS: [u32; 2] = [KEY1, KEY2];

    /// Read the current status flags
    fn status(&mut self) -> FlashStatus;

    /// Clear the given status flags (write-1-to-clear on most parts)
    fn clear_status(&mut self, flags: FlashStatus);

    /// Whether the control register is locked
    fn is_locked(&mut self) -> bool;

    /// Write one key to the unlock key register
    fn write_key(&mut self, key: u32);

    /// Set the lock bit
    fn set_lock(&mut self);

    /// Select word programming and write `value` to `address`
    ///
    /// Returns as soon as the write has been issued; the controller reports
    /// busy until it completes.
    fn start_program(&mut self, address: u32, value: u32);

    /// Select sector `index` for erase and start the erase
    fn start_sector_erase(&mut self, index: u8);

    /// Clear the operation selection (program/erase mode, sector number)
    fn finish_operation(&mut self);

    /// Read a word directly from memory-mapped flash
    fn read_word(&mut self, address: u32) -> u32;

    /// Delay for the specified number of microseconds
    fn delay_us(&mut self, us: u32);
}

impl<T: FlashController + ?Sized> FlashController for &mut T {
    const UNLOCK_KEYS: [u32; 2] = T::UNLOCK_KEYS;

    fn status(&mut self) -> FlashStatus {
        (**self).status()
    }

    fn clear_status(&mut self, flags: FlashStatus) {
        (**self).clear_status(flags)
    }

    fn is_locked(&mut self) -> bool {
        (**self).is_locked()
    }

    fn write_key(&mut self, key: u32) {
        (**self).write_key(key)
    }

    fn set_lock(&mut self) {
        (**self).set_lock()
    }

    fn start_program(&mut self, address: u32, value: u32) {
        (**self).start_program(address, value)
    }

    fn start_sector_erase(&mut self, index: u8) {
        (**self).start_sector_erase(index)
    }

    fn finish_operation(&mut self) {
        (**self).finish_operation()
    }

    fn read_word(&mut self, address: u32) -> u32 {
        (**self).read_word(address)
    }

    fn delay_us(&mut self, us: u32) {
        (**self).delay_us(us)
    }
}
