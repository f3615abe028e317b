//! Persist command implementation

use nvword_core::fault::{self, FaultSink};
use nvword_core::flash::{FlashDriver, Persister};
use nvword_core::layout::stm32f4;
use nvword_core::FaultCode;
use nvword_sim::{SimConfig, SimFaults, SimFlash};
use nvword_stm32::Stm32Flash;

use nvword::cli::{FaultKind, PersistArgs};

/// Value persisted when neither the command line nor the config names one
pub const DEFAULT_VALUE: u32 = 12345;

/// Fault sink that terminates the process with the fault code
pub struct ExitSink;

impl FaultSink for ExitSink {
    fn report(&mut self, code: FaultCode) -> ! {
        log::error!("Flash fault {} ({})", code.code(), code);
        eprintln!("Fault: {} (code {})", code, code.code());
        std::process::exit(i32::from(code.code()))
    }
}

/// Run the boot-time persistence flow on a simulated device
pub fn run(args: &PersistArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(args)?;
    let desired = args.value.or(config.desired).unwrap_or(DEFAULT_VALUE);
    let location = stm32f4::VARIABLE;

    let mut sim = config.build(&location)?;
    log::info!(
        "Simulated STM32F4: 0x{:08X} stored at 0x{:08X} (sector {})",
        sim.word(location.address),
        location.address,
        location.sector.index
    );

    let mut sink = ExitSink;
    for boot in 1..=args.boots {
        log::info!("Boot {}: persisting 0x{:08X}", boot, desired);

        let driver = FlashDriver::new(Stm32Flash::new(&mut sim));
        let mut persister = Persister::new(driver, location);
        if args.no_verify {
            persister = persister.without_verify();
        }
        fault::unwrap_or_report(persister.ensure_persisted(desired), &mut sink);
    }

    print_summary(&sim, location.address);
    Ok(())
}

/// Load the config file if given, then apply command line overrides
fn load_config(args: &PersistArgs) -> Result<SimConfig, Box<dyn std::error::Error>> {
    let mut config = match &args.config {
        Some(path) => {
            log::debug!("Loading simulator config from {}", path.display());
            SimConfig::load(path)?
        }
        None => SimConfig::default(),
    };

    if let Some(stored) = args.stored {
        config.stored = Some(stored);
    }
    for kind in &args.fault {
        inject(&mut config.faults, *kind);
    }

    Ok(config)
}

fn inject(faults: &mut SimFaults, kind: FaultKind) {
    let flag = match kind {
        FaultKind::RefuseUnlock => &mut faults.refuse_unlock,
        FaultKind::LockStuck => &mut faults.lock_stuck,
        FaultKind::BusyStuck => &mut faults.busy_stuck,
        FaultKind::OperationStuck => &mut faults.operation_stuck,
        FaultKind::ProgrammingError => &mut faults.programming_error,
        FaultKind::WriteProtected => &mut faults.write_protected,
        FaultKind::OperationError => &mut faults.operation_error,
        FaultKind::EraseIncomplete => &mut faults.erase_incomplete,
        FaultKind::ProgramIncomplete => &mut faults.program_incomplete,
        FaultKind::CorruptProgram => &mut faults.corrupt_program,
    };
    *flag = true;
}

fn print_summary(sim: &SimFlash, address: u32) {
    println!("Stored:   0x{:08X} at 0x{:08X}", sim.word(address), address);
    println!("Erases:   {}", sim.erase_count());
    println!("Programs: {}", sim.program_count());
    println!("Elapsed:  {} us", sim.now_us());

    if log::log_enabled!(log::Level::Debug) {
        for event in sim.journal() {
            log::debug!("{:?}", event);
        }
    }
}
