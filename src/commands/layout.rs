//! Layout command implementation

use nvword_core::layout::{stm32f4, Location, Sector};

/// Print the sector table and the resolved variable location
pub fn print_layout() {
    print_sectors(&stm32f4::SECTORS, &stm32f4::VARIABLE);
    println!();
    print_location(&stm32f4::VARIABLE);
}

fn print_sectors(sectors: &[Sector], location: &Location) {
    let total: u32 = sectors.iter().map(|sector| sector.size).sum();

    println!("STM32F40x flash sectors ({}):", super::format_size(total));
    println!(
        "{:<8} {:>10} {:>10} {:>10} {:>10}",
        "Sector", "Start", "End", "Size", "Variable"
    );
    println!("{:-<52}", "");

    for sector in sectors {
        println!(
            "{:<8} {:#010X} {:#010X} {:>10} {:>10}",
            sector.index,
            sector.start,
            sector.end(),
            super::format_size(sector.size),
            if sector.index == location.sector.index {
                "yes"
            } else {
                "-"
            }
        );
    }
}

fn print_location(location: &Location) {
    println!("Variable");
    println!("========");
    println!("Address: {:#010X}", location.address);
    println!(
        "Region:  {:#010X}..={:#010X}",
        location.address, location.region_end
    );
    println!(
        "Sector:  {} ({:#010X}..={:#010X})",
        location.sector.index,
        location.sector.start,
        location.sector.end()
    );
    println!(
        "\nRewriting the variable erases all {} of sector {}.",
        super::format_size(location.sector.size),
        location.sector.index
    );
    if location.collateral_bytes() > 0 {
        println!(
            "{} of it lies outside the reserved region.",
            super::format_size(location.collateral_bytes())
        );
    }
}
