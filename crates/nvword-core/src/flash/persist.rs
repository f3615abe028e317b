//! Persistence policy
//!
//! The single decision point: leave flash alone when it already holds the
//! desired value, otherwise erase the sector and program the word. Flash
//! sectors survive a limited number of erase cycles, so an unchanged value
//! must never cost one.

use crate::controller::FlashController;
use crate::error::{FaultCode, Result};
use crate::layout::Location;

use super::FlashDriver;

/// Keeps one word persisted at a fixed location
pub struct Persister<C> {
    driver: FlashDriver<C>,
    location: Location,
    verify: bool,
}

impl<C: FlashController> Persister<C> {
    /// Create a persister for `location`, with read-back verification
    pub fn new(driver: FlashDriver<C>, location: Location) -> Self {
        Self {
            driver,
            location,
            verify: true,
        }
    }

    /// Skip the read-back after programming
    pub fn without_verify(mut self) -> Self {
        self.verify = false;
        self
    }

    /// Where the word lives
    pub fn location(&self) -> &Location {
        &self.location
    }

    /// Get a reference to the driver
    pub fn driver(&self) -> &FlashDriver<C> {
        &self.driver
    }

    /// Get a mutable reference to the driver
    pub fn driver_mut(&mut self) -> &mut FlashDriver<C> {
        &mut self.driver
    }

    /// Release the driver
    pub fn release(self) -> FlashDriver<C> {
        self.driver
    }

    /// Read the currently stored word
    pub fn stored(&mut self) -> u32 {
        self.driver.read_word(self.location.address)
    }

    /// Make sure flash holds `desired`
    ///
    /// Does nothing when the stored word already equals `desired`. Otherwise
    /// erases the containing sector and programs the word, in that order.
    /// There is no rollback: if the erase succeeds and the program faults,
    /// the sector is left erased.
    pub fn ensure_persisted(&mut self, desired: u32) -> Result<()> {
        let stored = self.stored();
        if stored == desired {
            log::info!(
                "Flash already holds 0x{:08X} at 0x{:08X}",
                desired,
                self.location.address
            );
            return Ok(());
        }

        log::info!(
            "Flash holds 0x{:08X} at 0x{:08X}, rewriting with 0x{:08X}",
            stored,
            self.location.address,
            desired
        );

        self.driver.erase_sector(&self.location.sector)?;
        self.driver.program_word(self.location.address, desired)?;

        if self.verify {
            let readback = self.stored();
            if readback != desired {
                log::debug!(
                    "Read back 0x{:08X} after programming 0x{:08X}",
                    readback,
                    desired
                );
                return Err(FaultCode::VerifyFailed);
            }
        }

        Ok(())
    }
}
