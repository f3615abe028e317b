//! STM32F40x/41x 1 MiB flash bank
//!
//! Four 16 KiB sectors, one 64 KiB sector and seven 128 KiB sectors starting
//! at `0x0800_0000`. The persisted word sits in the last 32 KiB of sector 11.

use super::{FlashGeometry, Location, Sector};

const KIB: u32 = 1024;

/// Main memory sectors
pub const SECTORS: [Sector; 12] = [
    Sector { index: 0, start: 0x0800_0000, size: 16 * KIB },
    Sector { index: 1, start: 0x0800_4000, size: 16 * KIB },
    Sector { index: 2, start: 0x0800_8000, size: 16 * KIB },
    Sector { index: 3, start: 0x0800_C000, size: 16 * KIB },
    Sector { index: 4, start: 0x0801_0000, size: 64 * KIB },
    Sector { index: 5, start: 0x0802_0000, size: 128 * KIB },
    Sector { index: 6, start: 0x0804_0000, size: 128 * KIB },
    Sector { index: 7, start: 0x0806_0000, size: 128 * KIB },
    Sector { index: 8, start: 0x0808_0000, size: 128 * KIB },
    Sector { index: 9, start: 0x080A_0000, size: 128 * KIB },
    Sector { index: 10, start: 0x080C_0000, size: 128 * KIB },
    Sector { index: 11, start: 0x080E_0000, size: 128 * KIB },
];

/// The main flash bank
pub const GEOMETRY: FlashGeometry = FlashGeometry { sectors: &SECTORS };

/// Start of the region reserved for the persisted word
pub const FLASH_PAGE_START: u32 = 0x080F_8000;
/// End of the reserved region (inclusive)
pub const FLASH_PAGE_END: u32 = 0x080F_FFFF;
/// Address of the persisted word
pub const VARIABLE_ADDRESS: u32 = FLASH_PAGE_START;

/// Resolved location of the persisted word
///
/// The reserved region is the top 32 KiB of sector 11. Rewriting the word
/// erases the whole sector, so the 96 KiB below the region
/// (`0x080E_0000..=0x080F_7FFF`) must not hold anything that has to
/// survive.
pub const VARIABLE: Location =
    match Location::resolve(&GEOMETRY, VARIABLE_ADDRESS, FLASH_PAGE_END) {
        Ok(location) => location,
        Err(_) => panic!("persisted word does not fit in one sector"),
    };

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variable_is_in_last_sector() {
        assert_eq!(VARIABLE.sector.index, 11);
        assert_eq!(VARIABLE.sector.start, 0x080E_0000);
        assert_eq!(VARIABLE.sector.end(), FLASH_PAGE_END);
        assert_eq!(VARIABLE.address, 0x080F_8000);
    }

    #[test]
    fn test_variable_shares_its_sector() {
        assert_eq!(VARIABLE.collateral_bytes(), 96 * KIB);
        assert_eq!(VARIABLE.sector.start + VARIABLE.collateral_bytes(), FLASH_PAGE_START);
    }

    #[test]
    fn test_table_is_contiguous() {
        for pair in SECTORS.windows(2) {
            assert_eq!(pair[0].end() + 1, pair[1].start);
            assert_eq!(pair[0].index + 1, pair[1].index);
        }
        assert_eq!(GEOMETRY.size(), 1024 * KIB);
    }
}
