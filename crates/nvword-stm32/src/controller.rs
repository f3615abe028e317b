//! STM32F4 flash controller
//!
//! Maps the chip-independent [`FlashController`] operations onto the
//! KEYR/SR/CR registers. Programming uses x32 parallelism, which requires
//! a 2.7-3.6V supply (voltage range 3).

use core::sync::atomic::{fence, Ordering};

use nvword_core::controller::{FlashController, FlashStatus};

use crate::mmio::{Mmio, Registers};
use crate::regs::*;

/// STM32F4 flash controller
pub struct Stm32Flash<R> {
    regs: R,
}

impl<R: Registers> Stm32Flash<R> {
    /// Create a controller over a register accessor
    pub fn new(regs: R) -> Self {
        Self { regs }
    }

    /// Get a reference to the register accessor
    pub fn registers(&self) -> &R {
        &self.regs
    }

    /// Get a mutable reference to the register accessor
    pub fn registers_mut(&mut self) -> &mut R {
        &mut self.regs
    }

    /// Release the register accessor
    pub fn release(self) -> R {
        self.regs
    }

    fn select_operation(&mut self, bits: u32) {
        self.regs.modify32(REG_CR, |cr| {
            (cr & !(CR_OPERATION | CR_PSIZE)) | CR_PSIZE_X32 | CR_EOPIE | bits
        });
        fence(Ordering::SeqCst);
        log::trace!("FLASH_CR = 0x{:08X}", self.regs.read32(REG_CR));
    }
}

impl Stm32Flash<Mmio> {
    /// Take the on-chip flash interface
    ///
    /// # Safety
    ///
    /// See [`Mmio::new`]: only one owner of the flash interface may exist.
    pub unsafe fn take(spins_per_us: u32) -> Self {
        Self::new(Mmio::new(FLASH_R_BASE, spins_per_us))
    }
}

impl<R: Registers> FlashController for Stm32Flash<R> {
    fn status(&mut self) -> FlashStatus {
        let sr = self.regs.read32(REG_SR);
        let mut status = FlashStatus::empty();

        if sr & SR_BSY != 0 {
            status |= FlashStatus::BUSY;
        }
        if sr & SR_EOP != 0 {
            status |= FlashStatus::END_OF_OPERATION;
        }
        if sr & SR_PROG_ERRORS != 0 {
            status |= FlashStatus::PROGRAMMING_ERROR;
        }
        if sr & SR_WRPERR != 0 {
            status |= FlashStatus::WRITE_PROTECTION_ERROR;
        }
        if sr & SR_OPERR != 0 {
            status |= FlashStatus::OPERATION_ERROR;
        }
        status
    }

    fn clear_status(&mut self, flags: FlashStatus) {
        let mut sr = 0;

        if flags.contains(FlashStatus::END_OF_OPERATION) {
            sr |= SR_EOP;
        }
        if flags.contains(FlashStatus::PROGRAMMING_ERROR) {
            sr |= SR_PROG_ERRORS;
        }
        if flags.contains(FlashStatus::WRITE_PROTECTION_ERROR) {
            sr |= SR_WRPERR;
        }
        if flags.contains(FlashStatus::OPERATION_ERROR) {
            sr |= SR_OPERR;
        }

        if sr != 0 {
            // Write-1-to-clear; zero bits are left alone
            self.regs.write32(REG_SR, sr);
        }
    }

    fn is_locked(&mut self) -> bool {
        self.regs.read32(REG_CR) & CR_LOCK != 0
    }

    fn write_key(&mut self, key: u32) {
        self.regs.write32(REG_KEYR, key);
        fence(Ordering::SeqCst);
    }

    fn set_lock(&mut self) {
        self.regs.modify32(REG_CR, |cr| cr | CR_LOCK);
        fence(Ordering::SeqCst);
    }

    fn start_program(&mut self, address: u32, value: u32) {
        self.select_operation(CR_PG);
        self.regs.write_flash(address, value);
        fence(Ordering::SeqCst);
    }

    fn start_sector_erase(&mut self, index: u8) {
        self.select_operation(CR_SER | cr_snb(index));
        self.regs.modify32(REG_CR, |cr| cr | CR_STRT);
        fence(Ordering::SeqCst);
    }

    fn finish_operation(&mut self) {
        self.regs.modify32(REG_CR, |cr| cr & !CR_OPERATION);
    }

    fn read_word(&mut self, address: u32) -> u32 {
        self.regs.read_flash(address)
    }

    fn delay_us(&mut self, us: u32) {
        self.regs.delay_us(us);
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use std::vec::Vec;

    /// Plain register file that records every register write
    #[derive(Default)]
    struct RegisterFile {
        regs: [u32; 6],
        writes: Vec<(usize, u32)>,
        flash_writes: Vec<(u32, u32)>,
        delayed: u32,
    }

    impl Registers for RegisterFile {
        fn read32(&self, offset: usize) -> u32 {
            self.regs[offset / 4]
        }

        fn write32(&mut self, offset: usize, value: u32) {
            self.writes.push((offset, value));
            self.regs[offset / 4] = value;
        }

        fn read_flash(&self, address: u32) -> u32 {
            address ^ 0xA5A5_A5A5
        }

        fn write_flash(&mut self, address: u32, value: u32) {
            self.flash_writes.push((address, value));
        }

        fn delay_us(&mut self, us: u32) {
            self.delayed += us;
        }
    }

    #[test]
    fn test_status_mapping() {
        let mut file = RegisterFile::default();
        file.regs[REG_SR / 4] = SR_BSY | SR_PGPERR | SR_WRPERR;
        let mut flash = Stm32Flash::new(&mut file);
        assert_eq!(
            flash.status(),
            FlashStatus::BUSY
                | FlashStatus::PROGRAMMING_ERROR
                | FlashStatus::WRITE_PROTECTION_ERROR
        );

        flash.registers_mut().regs[REG_SR / 4] = SR_EOP | SR_OPERR;
        assert_eq!(
            flash.status(),
            FlashStatus::END_OF_OPERATION | FlashStatus::OPERATION_ERROR
        );
    }

    #[test]
    fn test_clear_status_writes_one_to_clear() {
        let mut file = RegisterFile::default();
        let mut flash = Stm32Flash::new(&mut file);
        flash.clear_status(FlashStatus::PROGRAMMING_ERROR | FlashStatus::END_OF_OPERATION);
        flash.clear_status(FlashStatus::BUSY);
        assert_eq!(file.writes, [(REG_SR, SR_PROG_ERRORS | SR_EOP)]);
    }

    #[test]
    fn test_key_and_lock() {
        let mut file = RegisterFile::default();
        file.regs[REG_CR / 4] = CR_LOCK;
        let mut flash = Stm32Flash::new(&mut file);
        assert!(flash.is_locked());
        flash.write_key(0x4567_0123);
        flash.registers_mut().regs[REG_CR / 4] = 0;
        assert!(!flash.is_locked());
        flash.set_lock();
        assert!(flash.is_locked());
        assert_eq!(
            file.writes,
            [(REG_KEYR, 0x4567_0123), (REG_CR, CR_LOCK)]
        );
    }

    #[test]
    fn test_program_sequence() {
        let mut file = RegisterFile::default();
        let mut flash = Stm32Flash::new(&mut file);
        flash.start_program(0x080F_8000, 12345);
        assert_eq!(
            flash.registers().read32(REG_CR),
            CR_PG | CR_PSIZE_X32 | CR_EOPIE
        );
        flash.finish_operation();
        assert_eq!(flash.registers().read32(REG_CR), CR_PSIZE_X32);
        assert_eq!(file.flash_writes, [(0x080F_8000, 12345)]);
    }

    #[test]
    fn test_sector_erase_sequence() {
        let mut file = RegisterFile::default();
        let mut flash = Stm32Flash::new(&mut file);
        flash.start_sector_erase(11);
        flash.finish_operation();

        let select = CR_SER | cr_snb(11) | CR_PSIZE_X32 | CR_EOPIE;
        assert_eq!(
            file.writes,
            [
                (REG_CR, select),
                (REG_CR, select | CR_STRT),
                (REG_CR, CR_PSIZE_X32 | CR_STRT),
            ]
        );
    }

    #[test]
    fn test_read_and_delay_pass_through() {
        let mut file = RegisterFile::default();
        let mut flash = Stm32Flash::new(&mut file);
        assert_eq!(flash.read_word(0x0800_0000), 0x0800_0000 ^ 0xA5A5_A5A5);
        flash.delay_us(25);
        assert_eq!(file.delayed, 25);
    }
}
