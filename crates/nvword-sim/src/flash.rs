//! Register-level flash interface model

use nvword_core::controller::{KEY1, KEY2};
use nvword_core::layout::{stm32f4, FlashGeometry, Location, LocationError, Sector};
use nvword_stm32::regs::*;
use nvword_stm32::Registers;
use serde::Deserialize;

/// Time the simulated hardware needs per operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimTiming {
    /// Word program duration in microseconds
    pub program_us: u32,
    /// Sector erase duration in microseconds
    pub erase_us: u32,
}

impl Default for SimTiming {
    fn default() -> Self {
        // RM0090 typical figures at x32 parallelism
        Self {
            program_us: 16,
            erase_us: 1_100_000,
        }
    }
}

/// Faults the simulated controller can be told to produce
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimFaults {
    /// Key sequence is ignored; the controller stays locked
    pub refuse_unlock: bool,
    /// Setting CR.LOCK has no effect
    pub lock_stuck: bool,
    /// SR.BSY never clears
    pub busy_stuck: bool,
    /// A started program or erase never finishes; SR.BSY stays set
    pub operation_stuck: bool,
    /// Program and erase commands raise PGPERR
    pub programming_error: bool,
    /// Every sector is write protected (WRPERR)
    pub write_protected: bool,
    /// Program and erase commands raise OPERR
    pub operation_error: bool,
    /// Erase ends without erasing and without raising EOP
    pub erase_incomplete: bool,
    /// Program ends without writing and without raising EOP
    pub program_incomplete: bool,
    /// Programming flips bit 0 of the stored word
    pub corrupt_program: bool,
}

/// Protocol step recorded by the simulator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimEvent {
    /// Key sequence accepted
    Unlocked,
    /// CR.LOCK set on an unlocked controller
    Locked,
    /// Wrong key, or key written while unlocked; locked until reset
    KeyError,
    /// Sector erase started
    EraseStarted {
        /// Sector number
        sector: u8,
    },
    /// Sector erase finished
    EraseCompleted {
        /// Sector number
        sector: u8,
    },
    /// Word program accepted
    Programmed {
        /// Target address
        address: u32,
        /// Value written
        value: u32,
    },
}

#[derive(Debug, Clone, Copy)]
enum Pending {
    Program { address: u32, value: u32 },
    Erase { sector: Sector },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeyStage {
    Idle,
    FirstKey,
    Error,
}

/// Simulated flash interface and flash array
pub struct SimFlash {
    geometry: FlashGeometry,
    memory: Vec<u8>,
    sr: u32,
    cr: u32,
    keys: KeyStage,
    pending: Option<(Pending, u64)>,
    now_us: u64,
    timing: SimTiming,
    faults: SimFaults,
    journal: Vec<SimEvent>,
}

impl SimFlash {
    /// Create an erased, locked flash with the given sector table
    pub fn new(geometry: FlashGeometry) -> Self {
        Self {
            geometry,
            memory: vec![0xFF; geometry.size() as usize],
            sr: 0,
            cr: CR_LOCK,
            keys: KeyStage::Idle,
            pending: None,
            now_us: 0,
            timing: SimTiming::default(),
            faults: SimFaults::default(),
            journal: Vec::new(),
        }
    }

    /// Create an erased STM32F40x 1 MiB flash
    pub fn stm32f4() -> Self {
        Self::new(stm32f4::GEOMETRY)
    }

    /// Set operation timing
    pub fn with_timing(mut self, timing: SimTiming) -> Self {
        self.timing = timing;
        self
    }

    /// Set injected faults
    pub fn with_faults(mut self, faults: SimFaults) -> Self {
        self.faults = faults;
        self
    }

    /// Get the sector table
    pub fn geometry(&self) -> &FlashGeometry {
        &self.geometry
    }

    /// Get the injected faults
    pub fn faults(&self) -> &SimFaults {
        &self.faults
    }

    /// Get a mutable reference to the injected faults
    pub fn faults_mut(&mut self) -> &mut SimFaults {
        &mut self.faults
    }

    /// Simulated time in microseconds
    pub fn now_us(&self) -> u64 {
        self.now_us
    }

    /// Every protocol step so far, in order
    pub fn journal(&self) -> &[SimEvent] {
        &self.journal
    }

    /// Forget recorded protocol steps
    pub fn clear_journal(&mut self) {
        self.journal.clear();
    }

    /// Number of completed sector erases
    pub fn erase_count(&self) -> usize {
        self.count(|event| matches!(event, SimEvent::EraseCompleted { .. }))
    }

    /// Number of accepted word programs
    pub fn program_count(&self) -> usize {
        self.count(|event| matches!(event, SimEvent::Programmed { .. }))
    }

    fn count(&self, f: impl Fn(&SimEvent) -> bool) -> usize {
        self.journal.iter().filter(|event| f(*event)).count()
    }

    /// Whether CR.LOCK is set
    pub fn is_locked(&self) -> bool {
        self.cr & CR_LOCK != 0
    }

    /// Raw status register
    pub fn status_register(&self) -> u32 {
        self.read32(REG_SR)
    }

    /// Raw control register
    pub fn control_register(&self) -> u32 {
        self.cr
    }

    /// Read a word without going through the interface
    pub fn word(&self, address: u32) -> u32 {
        self.read_flash(address)
    }

    /// Store a word without going through the interface
    ///
    /// Used to preload flash contents, as if programmed by an earlier boot.
    pub fn set_word(&mut self, address: u32, value: u32) -> Result<(), LocationError> {
        Location::word(&self.geometry, address)?;
        let offset = self.offset(address);
        self.memory[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
        Ok(())
    }

    /// Contents of a sector, if it exists
    pub fn sector_data(&self, index: u8) -> Option<&[u8]> {
        let sector = self.sector(index)?;
        let start = self.offset(sector.start);
        Some(&self.memory[start..start + sector.size as usize])
    }

    fn sector(&self, index: u8) -> Option<Sector> {
        self.geometry
            .sectors
            .iter()
            .copied()
            .find(|sector| sector.index == index)
    }

    fn offset(&self, address: u32) -> usize {
        (address - self.geometry.base()) as usize
    }

    fn busy(&self) -> bool {
        self.faults.busy_stuck || self.pending.is_some()
    }

    fn write_key(&mut self, key: u32) {
        if self.keys == KeyStage::Error || self.faults.refuse_unlock {
            return;
        }

        if !self.is_locked() {
            self.key_error();
            return;
        }

        self.keys = match (self.keys, key) {
            (KeyStage::Idle, KEY1) => KeyStage::FirstKey,
            (KeyStage::FirstKey, KEY2) => {
                self.cr &= !CR_LOCK;
                self.journal.push(SimEvent::Unlocked);
                KeyStage::Idle
            }
            _ => {
                self.key_error();
                return;
            }
        };
    }

    fn key_error(&mut self) {
        log::debug!("Simulated flash: key sequence error, locked until reset");
        self.keys = KeyStage::Error;
        self.cr |= CR_LOCK;
        self.journal.push(SimEvent::KeyError);
    }

    fn write_cr(&mut self, value: u32) {
        if self.is_locked() {
            return;
        }

        let mut cr = value & !CR_STRT;
        if self.faults.lock_stuck {
            cr &= !CR_LOCK;
        }
        if cr & CR_LOCK != 0 {
            self.journal.push(SimEvent::Locked);
        }
        self.cr = cr;

        if value & CR_STRT != 0 && cr & CR_SER != 0 {
            self.start_erase();
        }
    }

    /// Error bits a command raises before it starts, if any
    fn command_error(&self) -> u32 {
        if self.busy() {
            SR_PGSERR
        } else if self.cr & CR_PSIZE != CR_PSIZE_X32 {
            SR_PGPERR
        } else if self.faults.write_protected {
            SR_WRPERR
        } else if self.faults.programming_error {
            SR_PGPERR
        } else if self.faults.operation_error {
            SR_OPERR
        } else {
            0
        }
    }

    fn start_erase(&mut self) {
        let index = ((self.cr & CR_SNB) >> CR_SNB_OFF) as u8;
        let Some(sector) = self.sector(index) else {
            self.sr |= SR_PGSERR;
            return;
        };

        let error = self.command_error();
        if error != 0 {
            self.sr |= error;
            return;
        }

        self.journal.push(SimEvent::EraseStarted { sector: index });
        self.pending = Some((
            Pending::Erase { sector },
            self.now_us + u64::from(self.timing.erase_us),
        ));
    }

    fn start_program(&mut self, address: u32, value: u32) {
        let error = if self.is_locked() || self.cr & CR_PG == 0 {
            SR_PGSERR
        } else if address % 4 != 0 || !self.geometry.contains(address) {
            SR_PGAERR
        } else {
            self.command_error()
        };
        if error != 0 {
            self.sr |= error;
            return;
        }

        self.journal.push(SimEvent::Programmed { address, value });
        self.pending = Some((
            Pending::Program { address, value },
            self.now_us + u64::from(self.timing.program_us),
        ));
    }

    fn complete(&mut self, op: Pending) {
        match op {
            Pending::Program { address, value } => {
                if self.faults.program_incomplete {
                    log::debug!("Simulated flash: program at 0x{:08X} aborted", address);
                    return;
                }
                let value = if self.faults.corrupt_program {
                    value ^ 1
                } else {
                    value
                };
                // Programming can only clear bits
                let stored = self.read_flash(address) & value;
                let offset = self.offset(address);
                self.memory[offset..offset + 4].copy_from_slice(&stored.to_le_bytes());
            }
            Pending::Erase { sector } => {
                if self.faults.erase_incomplete {
                    log::debug!("Simulated flash: sector {} erase aborted", sector.index);
                    return;
                }
                let start = self.offset(sector.start);
                self.memory[start..start + sector.size as usize].fill(0xFF);
                self.journal.push(SimEvent::EraseCompleted {
                    sector: sector.index,
                });
            }
        }

        if self.cr & CR_EOPIE != 0 {
            self.sr |= SR_EOP;
        }
    }
}

impl Registers for SimFlash {
    fn read32(&self, offset: usize) -> u32 {
        match offset {
            REG_SR if self.busy() => self.sr | SR_BSY,
            REG_SR => self.sr,
            REG_CR => self.cr,
            _ => 0,
        }
    }

    fn write32(&mut self, offset: usize, value: u32) {
        match offset {
            REG_KEYR => self.write_key(value),
            REG_SR => self.sr &= !(value & SR_CLEARABLE),
            REG_CR => self.write_cr(value),
            _ => {}
        }
    }

    fn read_flash(&self, address: u32) -> u32 {
        if address % 4 != 0 || !self.geometry.contains(address) {
            return 0;
        }
        let offset = self.offset(address);
        let mut bytes = [0u8; 4];
        bytes.copy_from_slice(&self.memory[offset..offset + 4]);
        u32::from_le_bytes(bytes)
    }

    fn write_flash(&mut self, address: u32, value: u32) {
        self.start_program(address, value);
    }

    fn delay_us(&mut self, us: u32) {
        self.now_us += u64::from(us);

        if self.faults.busy_stuck || self.faults.operation_stuck {
            return;
        }
        if let Some((op, done_at)) = self.pending {
            if self.now_us >= done_at {
                self.pending = None;
                self.complete(op);
            }
        }
    }
}

impl Default for SimFlash {
    fn default() -> Self {
        Self::stm32f4()
    }
}
