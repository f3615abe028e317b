//! Flash operations
//!
//! This module provides the fault-checked protocol driver, the sector erase
//! operation built on it, and the persistence policy that decides whether
//! any flash mutation is needed at all.

mod driver;
mod erase;
mod persist;

pub use driver::{FlashDriver, TimeoutConfig};
pub use persist::Persister;

/// Word-level controller model shared by the flash tests
#[cfg(test)]
mod fake {
    extern crate std;

    use std::vec::Vec;

    use crate::controller::{FlashController, FlashStatus, KEY2};
    use crate::layout::{FlashGeometry, Location, Sector, ERASED_WORD};

    pub const SECTORS: [Sector; 2] = [
        Sector {
            index: 0,
            start: 0x0800_0000,
            size: 0x4000,
        },
        Sector {
            index: 1,
            start: 0x0800_4000,
            size: 0x4000,
        },
    ];
    pub const GEOMETRY: FlashGeometry = FlashGeometry { sectors: &SECTORS };
    pub const ADDR: u32 = 0x0800_4000;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum Op {
        Key(u32),
        Lock,
        Program(u32, u32),
        Erase(u8),
        Finish,
    }

    /// One stored word, scripted faults
    pub struct Fake {
        pub locked: bool,
        pub refuse_unlock: bool,
        pub lock_stuck: bool,
        pub busy_polls: u32,
        pub busy_stuck: bool,
        /// A started operation never finishes
        pub stall: bool,
        pub status: FlashStatus,
        pub raise: FlashStatus,
        /// Erase ends without erasing or raising EOP
        pub skip_eop: bool,
        /// Program ends without writing or raising EOP
        pub drop_program: bool,
        pub flip_bit: bool,
        pub word: u32,
        pub ops: Vec<Op>,
        pub delays: u32,
    }

    impl Fake {
        pub fn new(word: u32) -> Self {
            Self {
                locked: true,
                refuse_unlock: false,
                lock_stuck: false,
                busy_polls: 0,
                busy_stuck: false,
                stall: false,
                status: FlashStatus::empty(),
                raise: FlashStatus::empty(),
                skip_eop: false,
                drop_program: false,
                flip_bit: false,
                word,
                ops: Vec::new(),
                delays: 0,
            }
        }

        pub fn erases(&self) -> usize {
            self.ops.iter().filter(|op| matches!(op, Op::Erase(_))).count()
        }

        pub fn programs(&self) -> usize {
            self.ops
                .iter()
                .filter(|op| matches!(op, Op::Program(..)))
                .count()
        }

        fn complete(&mut self) -> bool {
            if self.stall {
                self.busy_stuck = true;
                return false;
            }
            self.busy_polls = 3;
            if self.raise.is_empty() {
                true
            } else {
                self.status |= self.raise;
                false
            }
        }
    }

    impl FlashController for Fake {
        fn status(&mut self) -> FlashStatus {
            let mut status = self.status;
            if self.busy_stuck || self.busy_polls > 0 {
                status |= FlashStatus::BUSY;
            }
            status
        }

        fn clear_status(&mut self, flags: FlashStatus) {
            self.status.remove(flags);
        }

        fn is_locked(&mut self) -> bool {
            self.locked
        }

        fn write_key(&mut self, key: u32) {
            self.ops.push(Op::Key(key));
            if key == KEY2 && !self.refuse_unlock {
                self.locked = false;
            }
        }

        fn set_lock(&mut self) {
            self.ops.push(Op::Lock);
            if !self.lock_stuck {
                self.locked = true;
            }
        }

        fn start_program(&mut self, address: u32, value: u32) {
            self.ops.push(Op::Program(address, value));
            if self.complete() && !self.drop_program {
                let value = if self.flip_bit { value ^ 1 } else { value };
                self.word &= value;
                self.status |= FlashStatus::END_OF_OPERATION;
            }
        }

        fn start_sector_erase(&mut self, index: u8) {
            self.ops.push(Op::Erase(index));
            if self.complete() && !self.skip_eop {
                self.word = ERASED_WORD;
                self.status |= FlashStatus::END_OF_OPERATION;
            }
        }

        fn finish_operation(&mut self) {
            self.ops.push(Op::Finish);
        }

        fn read_word(&mut self, address: u32) -> u32 {
            assert_eq!(address, ADDR);
            self.word
        }

        fn delay_us(&mut self, _us: u32) {
            self.delays += 1;
            self.busy_polls = self.busy_polls.saturating_sub(1);
        }
    }

    pub fn location() -> Location {
        Location::word(&GEOMETRY, ADDR).unwrap()
    }
}
