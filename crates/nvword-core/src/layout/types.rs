//! Layout types

use core::fmt;

use super::WORD_SIZE;

/// One erase-granularity region of flash
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Sector {
    /// Sector number as written to the controller's sector-number field
    pub index: u8,
    /// Absolute start address
    pub start: u32,
    /// Size in bytes
    pub size: u32,
}

impl Sector {
    /// Last address inside the sector (inclusive)
    pub const fn end(&self) -> u32 {
        self.start + (self.size - 1)
    }

    /// Whether `address` lies inside the sector
    pub const fn contains(&self, address: u32) -> bool {
        address >= self.start && address <= self.end()
    }
}

/// A flash bank described as an ordered table of sectors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlashGeometry {
    /// Sectors, in ascending address order
    pub sectors: &'static [Sector],
}

impl FlashGeometry {
    /// First address of the bank
    pub const fn base(&self) -> u32 {
        self.sectors[0].start
    }

    /// Total size of the bank in bytes
    pub const fn size(&self) -> u32 {
        let mut total = 0;
        let mut i = 0;
        while i < self.sectors.len() {
            total += self.sectors[i].size;
            i += 1;
        }
        total
    }

    /// Find the sector containing `address`
    pub const fn sector_of(&self, address: u32) -> Option<Sector> {
        let mut i = 0;
        while i < self.sectors.len() {
            let sector = self.sectors[i];
            if sector.contains(address) {
                return Some(sector);
            }
            i += 1;
        }
        None
    }

    /// Whether `address` lies inside the bank
    pub const fn contains(&self, address: u32) -> bool {
        self.sector_of(address).is_some()
    }
}

/// Why an address cannot hold the persisted word
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocationError {
    /// Address is outside every sector of the bank
    OutOfBounds {
        /// The rejected address
        address: u32,
    },
    /// Address is not word aligned
    Unaligned {
        /// The rejected address
        address: u32,
    },
    /// The reserved region does not fit inside one sector
    StraddlesSectors {
        /// First address of the reserved region
        start: u32,
        /// Last address of the reserved region (inclusive)
        end: u32,
    },
}

impl fmt::Display for LocationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfBounds { address } => {
                write!(f, "address 0x{:08X} is outside the flash bank", address)
            }
            Self::Unaligned { address } => {
                write!(f, "address 0x{:08X} is not word aligned", address)
            }
            Self::StraddlesSectors { start, end } => write!(
                f,
                "region 0x{:08X}..=0x{:08X} does not fit in one sector",
                start, end
            ),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for LocationError {}

/// Where the persisted word lives
///
/// `address` holds the word; `region_end` closes the reserved region that
/// starts at `address`. The whole region must sit inside `sector`, because
/// erasing the sector destroys every word in it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Location {
    /// Address of the persisted word
    pub address: u32,
    /// Last address of the reserved region (inclusive)
    pub region_end: u32,
    /// Sector containing the region
    pub sector: Sector,
}

impl Location {
    /// Resolve an address and its reserved region against a sector table
    pub const fn resolve(
        geometry: &FlashGeometry,
        address: u32,
        region_end: u32,
    ) -> Result<Self, LocationError> {
        if address % WORD_SIZE != 0 {
            return Err(LocationError::Unaligned { address });
        }
        let sector = match geometry.sector_of(address) {
            Some(sector) => sector,
            None => return Err(LocationError::OutOfBounds { address }),
        };
        if region_end < address + (WORD_SIZE - 1) || !sector.contains(region_end) {
            return Err(LocationError::StraddlesSectors {
                start: address,
                end: region_end,
            });
        }
        Ok(Self {
            address,
            region_end,
            sector,
        })
    }

    /// Bytes of the sector outside the reserved region
    ///
    /// An erase destroys these along with the region. Zero when the region
    /// covers the whole sector.
    pub const fn collateral_bytes(&self) -> u32 {
        self.sector.size - (self.region_end - self.address + 1)
    }

    /// Resolve a location that reserves only the word itself
    pub const fn word(geometry: &FlashGeometry, address: u32) -> Result<Self, LocationError> {
        Self::resolve(geometry, address, address + (WORD_SIZE - 1))
    }
}
