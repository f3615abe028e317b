//! Sector erase
//!
//! Erasing is destructive at sector granularity: every word in the
//! sector returns to the erased value, not only the persisted one.

use crate::controller::{FlashController, FlashStatus};
use crate::error::{FaultCode, Result};
use crate::layout::Sector;

use super::FlashDriver;

impl<C: FlashController> FlashDriver<C> {
    /// Erase a whole sector
    ///
    /// Waits for the controller to be idle, unlocks, selects the sector by
    /// index, starts the erase and waits for it. The end-of-operation flag
    /// must be raised afterwards, otherwise the erase is reported as
    /// [`FaultCode::EraseIncomplete`]. Faults from unlock and lock
    /// propagate unchanged, and the controller is locked again on every
    /// path past a successful unlock.
    pub fn erase_sector(&mut self, sector: &Sector) -> Result<()> {
        self.wait_idle(self.timeouts.erase_us)?;
        self.unlock()?;
        let erased = self.erase_unlocked(sector);
        let locked = self.lock();
        erased.and(locked)
    }

    fn erase_unlocked(&mut self, sector: &Sector) -> Result<()> {
        self.clear_stale_flags();

        log::debug!(
            "Erasing sector {} (0x{:08X}..=0x{:08X})",
            sector.index,
            sector.start,
            sector.end()
        );
        self.controller.start_sector_erase(sector.index);
        let waited = self.wait_idle(self.timeouts.erase_us);
        self.controller.finish_operation();
        waited?;

        self.check_errors()?;

        if !self
            .controller
            .status()
            .contains(FlashStatus::END_OF_OPERATION)
        {
            log::debug!("Sector {} erase ended without EOP", sector.index);
            return Err(FaultCode::EraseIncomplete);
        }

        self.controller.clear_status(FlashStatus::END_OF_OPERATION);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flash::fake::{Fake, Op, SECTORS};
    use crate::layout::ERASED_WORD;

    #[test]
    fn test_erase_without_eop_is_incomplete() {
        let mut fake = Fake::new(7);
        fake.skip_eop = true;
        let result = FlashDriver::new(&mut fake).erase_sector(&SECTORS[1]);
        assert_eq!(result, Err(FaultCode::EraseIncomplete));
        assert_eq!(fake.word, 7);
        assert!(fake.locked);
    }

    #[test]
    fn test_erase_selects_sector_by_index() {
        let mut fake = Fake::new(7);
        FlashDriver::new(&mut fake).erase_sector(&SECTORS[1]).unwrap();
        assert!(fake.ops.contains(&Op::Erase(1)));
        assert_eq!(fake.word, ERASED_WORD);
        assert!(fake.status.is_empty());
        assert!(fake.locked);
    }

    #[test]
    fn test_erase_waits_for_idle_before_unlock() {
        let mut fake = Fake::new(7);
        fake.busy_stuck = true;
        let result = FlashDriver::new(&mut fake).erase_sector(&SECTORS[1]);
        assert_eq!(result, Err(FaultCode::Timeout));
        assert!(fake.ops.is_empty());
    }

    #[test]
    fn test_erase_timeout_still_locks() {
        let mut fake = Fake::new(7);
        fake.stall = true;
        let result = FlashDriver::new(&mut fake).erase_sector(&SECTORS[1]);
        assert_eq!(result, Err(FaultCode::Timeout));
        assert!(fake.locked);
        assert_eq!(fake.ops[2..], [Op::Erase(1), Op::Finish, Op::Lock]);
    }
}
