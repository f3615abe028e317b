//! Register access for the flash interface
//!
//! The flash interface is driven through two kinds of access: 32-bit
//! register reads/writes relative to the register block, and word
//! reads/writes on the memory-mapped flash array itself (a program
//! operation is a plain store while CR.PG is set).

use core::ptr;

/// Access to the flash interface registers and the flash array
pub trait Registers {
    /// Read a 32-bit register at `offset` from the register block
    fn read32(&self, offset: usize) -> u32;

    /// Write a 32-bit register at `offset` from the register block
    fn write32(&mut self, offset: usize, value: u32);

    /// Read a word from the flash array
    fn read_flash(&self, address: u32) -> u32;

    /// Store a word to the flash array
    fn write_flash(&mut self, address: u32, value: u32);

    /// Delay for the specified number of microseconds
    fn delay_us(&mut self, us: u32);

    /// Read-modify-write a register
    fn modify32(&mut self, offset: usize, f: impl FnOnce(u32) -> u32) {
        let value = self.read32(offset);
        self.write32(offset, f(value));
    }
}

impl<R: Registers + ?Sized> Registers for &mut R {
    fn read32(&self, offset: usize) -> u32 {
        (**self).read32(offset)
    }

    fn write32(&mut self, offset: usize, value: u32) {
        (**self).write32(offset, value)
    }

    fn read_flash(&self, address: u32) -> u32 {
        (**self).read_flash(address)
    }

    fn write_flash(&mut self, address: u32, value: u32) {
        (**self).write_flash(address, value)
    }

    fn delay_us(&mut self, us: u32) {
        (**self).delay_us(us)
    }
}

/// Volatile access to the real peripheral
pub struct Mmio {
    /// Register block base address
    base: usize,
    /// Spin iterations per microsecond for [`Registers::delay_us`]
    spins_per_us: u32,
}

impl Mmio {
    /// Access the flash interface at `base`
    ///
    /// `spins_per_us` calibrates the busy delay; roughly the core clock in
    /// MHz divided by the cycles one spin iteration takes.
    ///
    /// # Safety
    ///
    /// The caller must ensure that:
    /// - `base` is the flash interface register block of the running part
    /// - no other code drives the flash interface while this value exists
    pub const unsafe fn new(base: usize, spins_per_us: u32) -> Self {
        Self { base, spins_per_us }
    }
}

impl Registers for Mmio {
    #[inline]
    fn read32(&self, offset: usize) -> u32 {
        debug_assert!(offset & 3 == 0, "unaligned register read");
        // SAFETY: `base` is the register block (see `Mmio::new`)
        unsafe { ptr::read_volatile((self.base + offset) as *const u32) }
    }

    #[inline]
    fn write32(&mut self, offset: usize, value: u32) {
        debug_assert!(offset & 3 == 0, "unaligned register write");
        // SAFETY: `base` is the register block (see `Mmio::new`)
        unsafe { ptr::write_volatile((self.base + offset) as *mut u32, value) }
    }

    #[inline]
    fn read_flash(&self, address: u32) -> u32 {
        // SAFETY: flash is always mapped and readable
        unsafe { ptr::read_volatile(address as usize as *const u32) }
    }

    #[inline]
    fn write_flash(&mut self, address: u32, value: u32) {
        // SAFETY: stores to flash are only accepted by the interface while
        // CR.PG is set; otherwise they raise PGSERR
        unsafe { ptr::write_volatile(address as usize as *mut u32, value) }
    }

    fn delay_us(&mut self, us: u32) {
        for _ in 0..us.saturating_mul(self.spins_per_us) {
            core::hint::spin_loop();
        }
    }
}
