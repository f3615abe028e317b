//! Fault reporting
//!
//! A [`FaultSink`] is where a [`FaultCode`] ends up. Reporting never
//! returns, so no flash operation can run after a fault.

use crate::error::{FaultCode, Result};

/// Terminal destination for faults
pub trait FaultSink {
    /// Report `code` and stop forward progress
    fn report(&mut self, code: FaultCode) -> !;
}

impl<T: FaultSink + ?Sized> FaultSink for &mut T {
    fn report(&mut self, code: FaultCode) -> ! {
        (**self).report(code)
    }
}

/// Safe halt: log the fault and idle forever
///
/// This does not unwind or reset. The core stays parked so a debugger or
/// an external watchdog can observe it.
#[derive(Debug, Default, Clone, Copy)]
pub struct Halt;

impl FaultSink for Halt {
    fn report(&mut self, code: FaultCode) -> ! {
        log::error!("Flash fault {} ({}), halting", code.code(), code);
        loop {
            core::hint::spin_loop();
        }
    }
}

/// Unwrap `result`, or hand its fault to `sink`
pub fn unwrap_or_report<T, S: FaultSink>(result: Result<T>, sink: &mut S) -> T {
    match result {
        Ok(value) => value,
        Err(code) => sink.report(code),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Unreachable;

    impl FaultSink for Unreachable {
        fn report(&mut self, code: FaultCode) -> ! {
            panic!("unexpected fault {:?}", code);
        }
    }

    struct Panicking;

    impl FaultSink for Panicking {
        fn report(&mut self, code: FaultCode) -> ! {
            panic!("fault {}", code.code());
        }
    }

    #[test]
    fn test_ok_passes_through() {
        assert_eq!(unwrap_or_report(Ok(7u32), &mut Unreachable), 7);
    }

    #[test]
    #[should_panic(expected = "fault 6")]
    fn test_fault_reaches_sink() {
        let result: Result<()> = Err(FaultCode::EraseIncomplete);
        unwrap_or_report(result, &mut Panicking);
    }
}
