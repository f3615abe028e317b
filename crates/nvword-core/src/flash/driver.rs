//! Flash protocol driver
//!
//! Owns the unlock -> operate -> lock bracket around every mutating
//! command. Every public mutating operation leaves the controller locked
//! when it returns, whatever the outcome.

use crate::controller::{FlashController, FlashStatus};
use crate::error::{FaultCode, Result};

/// Busy-wait budgets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeoutConfig {
    /// Budget for one word program, in microseconds
    pub program_us: u32,
    /// Budget for one sector erase, in microseconds
    pub erase_us: u32,
    /// Interval between two busy-flag polls, in microseconds
    pub poll_interval_us: u32,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            // Word program is ~16us typical, 100us max on STM32F4
            program_us: 10_000,
            // 128 KiB sector erase is 1-2s typical at x32 parallelism
            erase_us: 4_000_000,
            poll_interval_us: 10,
        }
    }
}

/// Fault-checked flash protocol driver
pub struct FlashDriver<C> {
    pub(super) controller: C,
    pub(super) timeouts: TimeoutConfig,
}

impl<C: FlashController> FlashDriver<C> {
    /// Create a driver with the default timeouts
    pub fn new(controller: C) -> Self {
        Self::with_timeouts(controller, TimeoutConfig::default())
    }

    /// Create a driver with custom timeouts
    pub fn with_timeouts(controller: C, timeouts: TimeoutConfig) -> Self {
        Self {
            controller,
            timeouts,
        }
    }

    /// Get the timeouts in use
    pub fn timeouts(&self) -> &TimeoutConfig {
        &self.timeouts
    }

    /// Get a reference to the controller
    pub fn controller(&self) -> &C {
        &self.controller
    }

    /// Get a mutable reference to the controller
    pub fn controller_mut(&mut self) -> &mut C {
        &mut self.controller
    }

    /// Release the controller
    pub fn release(self) -> C {
        self.controller
    }

    /// Read a word from memory-mapped flash
    ///
    /// Always succeeds; reads need no unlock.
    pub fn read_word(&mut self, address: u32) -> u32 {
        self.controller.read_word(address)
    }

    /// Unlock the controller with the key sequence
    ///
    /// Keys are only written while the controller reports locked: a key
    /// written to an unlocked controller is a sequence error that locks it
    /// until the next reset.
    pub fn unlock(&mut self) -> Result<()> {
        if self.controller.is_locked() {
            for key in C::UNLOCK_KEYS {
                self.controller.write_key(key);
            }
        }

        if self.controller.is_locked() {
            log::debug!("Controller still locked after key sequence");
            return Err(FaultCode::UnlockFailed);
        }

        log::trace!("Flash unlocked");
        Ok(())
    }

    /// Set the lock bit and check that the controller reports locked
    pub fn lock(&mut self) -> Result<()> {
        self.controller.set_lock();

        if !self.controller.is_locked() {
            log::debug!("Controller not locked after setting lock bit");
            return Err(FaultCode::LockFailed);
        }

        log::trace!("Flash locked");
        Ok(())
    }

    /// Poll the busy flag until it clears or `timeout_us` elapses
    pub fn wait_idle(&mut self, timeout_us: u32) -> Result<()> {
        let interval = self.timeouts.poll_interval_us.max(1);
        let mut remaining = timeout_us;

        loop {
            if !self.controller.status().contains(FlashStatus::BUSY) {
                return Ok(());
            }

            if remaining == 0 {
                log::debug!("Busy flag still set after {}us", timeout_us);
                return Err(FaultCode::Timeout);
            }

            self.controller.delay_us(interval);
            remaining = remaining.saturating_sub(interval);
        }
    }

    /// Program one word
    ///
    /// The target word must read as erased. Runs the full
    /// unlock -> wait -> program -> wait -> check -> lock sequence. If the
    /// program step faults the controller is still locked before the fault
    /// is returned; a lock failure after a successful program is reported
    /// as [`FaultCode::LockFailed`]. A program that ends with neither an
    /// error flag nor the end-of-operation flag is reported as
    /// [`FaultCode::UnknownProgrammingFault`].
    pub fn program_word(&mut self, address: u32, value: u32) -> Result<()> {
        self.unlock()?;
        let programmed = self.program_unlocked(address, value);
        let locked = self.lock();
        programmed.and(locked)
    }

    fn program_unlocked(&mut self, address: u32, value: u32) -> Result<()> {
        self.wait_idle(self.timeouts.program_us)?;
        self.clear_stale_flags();

        log::debug!("Programming 0x{:08X} at 0x{:08X}", value, address);
        self.controller.start_program(address, value);
        let waited = self.wait_idle(self.timeouts.program_us);
        self.controller.finish_operation();
        waited?;

        self.check_errors()?;

        // A clean program always raises EOP
        if !self
            .controller
            .status()
            .contains(FlashStatus::END_OF_OPERATION)
        {
            log::debug!("Program at 0x{:08X} ended without EOP", address);
            return Err(FaultCode::UnknownProgrammingFault);
        }

        self.controller.clear_status(FlashStatus::END_OF_OPERATION);
        Ok(())
    }

    /// Clear flags left behind by an earlier operation
    pub(super) fn clear_stale_flags(&mut self) {
        let stale =
            self.controller.status() & (FlashStatus::ERRORS | FlashStatus::END_OF_OPERATION);
        if !stale.is_empty() {
            log::trace!("Clearing stale status flags {:?}", stale);
            self.controller.clear_status(stale);
        }
    }

    /// Inspect error flags after a command and classify the first one found
    ///
    /// The offending flag is cleared before the fault is returned.
    pub(super) fn check_errors(&mut self) -> Result<()> {
        let status = self.controller.status();

        let (flag, fault) = if status.contains(FlashStatus::PROGRAMMING_ERROR) {
            (FlashStatus::PROGRAMMING_ERROR, FaultCode::ProgramError)
        } else if status.contains(FlashStatus::WRITE_PROTECTION_ERROR) {
            (
                FlashStatus::WRITE_PROTECTION_ERROR,
                FaultCode::WriteProtectionError,
            )
        } else if status.intersects(FlashStatus::ERRORS) {
            (
                status & FlashStatus::ERRORS,
                FaultCode::UnknownProgrammingFault,
            )
        } else {
            return Ok(());
        };

        log::debug!("Status {:?} after flash command", status);
        self.controller.clear_status(flag);
        Err(fault)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::{KEY1, KEY2};
    use crate::flash::fake::{Fake, Op, ADDR};
    use crate::layout::ERASED_WORD;

    #[test]
    fn test_unlock_writes_keys_in_order() {
        let mut fake = Fake::new(ERASED_WORD);
        FlashDriver::new(&mut fake).unlock().unwrap();
        assert_eq!(fake.ops, [Op::Key(KEY1), Op::Key(KEY2)]);
        assert!(!fake.locked);
    }

    #[test]
    fn test_unlock_skips_keys_when_already_unlocked() {
        let mut fake = Fake::new(ERASED_WORD);
        fake.locked = false;
        FlashDriver::new(&mut fake).unlock().unwrap();
        assert!(fake.ops.is_empty());
    }

    #[test]
    fn test_unlock_refused() {
        let mut fake = Fake::new(ERASED_WORD);
        fake.refuse_unlock = true;
        assert_eq!(
            FlashDriver::new(&mut fake).unlock(),
            Err(FaultCode::UnlockFailed)
        );
    }

    #[test]
    fn test_lock_stuck() {
        let mut fake = Fake::new(ERASED_WORD);
        fake.lock_stuck = true;
        let mut driver = FlashDriver::new(&mut fake);
        driver.unlock().unwrap();
        assert_eq!(driver.lock(), Err(FaultCode::LockFailed));
    }

    #[test]
    fn test_wait_idle_is_bounded() {
        let mut fake = Fake::new(ERASED_WORD);
        fake.busy_stuck = true;
        let timeouts = TimeoutConfig {
            program_us: 100,
            erase_us: 1000,
            poll_interval_us: 10,
        };
        let mut driver = FlashDriver::with_timeouts(&mut fake, timeouts);
        assert_eq!(driver.wait_idle(100), Err(FaultCode::Timeout));
        assert_eq!(fake.delays, 10);
    }

    #[test]
    fn test_program_word_success() {
        let mut fake = Fake::new(ERASED_WORD);
        FlashDriver::new(&mut fake).program_word(ADDR, 12345).unwrap();
        assert_eq!(fake.word, 12345);
        assert!(fake.locked);
        assert!(fake.status.is_empty());
        assert_eq!(
            fake.ops,
            [
                Op::Key(KEY1),
                Op::Key(KEY2),
                Op::Program(ADDR, 12345),
                Op::Finish,
                Op::Lock
            ]
        );
    }

    #[test]
    fn test_program_word_classifies_errors() {
        let cases = [
            (FlashStatus::PROGRAMMING_ERROR, FaultCode::ProgramError),
            (
                FlashStatus::WRITE_PROTECTION_ERROR,
                FaultCode::WriteProtectionError,
            ),
            (
                FlashStatus::OPERATION_ERROR,
                FaultCode::UnknownProgrammingFault,
            ),
            (
                FlashStatus::PROGRAMMING_ERROR | FlashStatus::WRITE_PROTECTION_ERROR,
                FaultCode::ProgramError,
            ),
        ];

        for (raised, expected) in cases {
            let mut fake = Fake::new(ERASED_WORD);
            fake.raise = raised;
            let result = FlashDriver::new(&mut fake).program_word(ADDR, 12345);
            assert_eq!(result, Err(expected), "raised {:?}", raised);
            assert!(fake.locked, "left unlocked after {:?}", expected);
            assert_eq!(fake.word, ERASED_WORD);
        }
    }

    #[test]
    fn test_program_without_eop_is_unknown_fault() {
        let mut fake = Fake::new(ERASED_WORD);
        fake.drop_program = true;
        let result = FlashDriver::new(&mut fake).program_word(ADDR, 12345);
        assert_eq!(result, Err(FaultCode::UnknownProgrammingFault));
        assert_eq!(fake.word, ERASED_WORD);
        assert!(fake.status.is_empty());
        assert!(fake.locked);
        assert_eq!(fake.ops.last(), Some(&Op::Lock));
    }

    #[test]
    fn test_program_timeout_still_locks() {
        let mut fake = Fake::new(ERASED_WORD);
        fake.stall = true;
        let result = FlashDriver::new(&mut fake).program_word(ADDR, 12345);
        assert_eq!(result, Err(FaultCode::Timeout));
        assert!(fake.locked);
        assert_eq!(
            fake.ops,
            [
                Op::Key(KEY1),
                Op::Key(KEY2),
                Op::Program(ADDR, 12345),
                Op::Finish,
                Op::Lock
            ]
        );
    }

    #[test]
    fn test_program_clears_reported_flag() {
        let mut fake = Fake::new(ERASED_WORD);
        fake.raise = FlashStatus::WRITE_PROTECTION_ERROR;
        let _ = FlashDriver::new(&mut fake).program_word(ADDR, 1);
        assert!(!fake.status.contains(FlashStatus::WRITE_PROTECTION_ERROR));
    }

    #[test]
    fn test_program_clears_stale_flags_first() {
        let mut fake = Fake::new(ERASED_WORD);
        fake.status = FlashStatus::PROGRAMMING_ERROR;
        FlashDriver::new(&mut fake).program_word(ADDR, 42).unwrap();
        assert_eq!(fake.word, 42);
    }

    #[test]
    fn test_lock_failure_after_program_is_reported() {
        let mut fake = Fake::new(ERASED_WORD);
        fake.lock_stuck = true;
        let result = FlashDriver::new(&mut fake).program_word(ADDR, 42);
        assert_eq!(result, Err(FaultCode::LockFailed));
        assert_eq!(fake.word, 42);
    }

    #[test]
    fn test_program_fault_wins_over_lock_fault() {
        let mut fake = Fake::new(ERASED_WORD);
        fake.lock_stuck = true;
        fake.raise = FlashStatus::PROGRAMMING_ERROR;
        let result = FlashDriver::new(&mut fake).program_word(ADDR, 42);
        assert_eq!(result, Err(FaultCode::ProgramError));
    }
}
