//! Fault codes for flash persistence
//!
//! Every protocol step that can fail maps to exactly one [`FaultCode`].
//! Codes are created where the failure is detected and handed straight to
//! a [`FaultSink`](crate::fault::FaultSink); nothing retries them.

use core::fmt;

/// Classified flash protocol fault - no_std compatible, Copy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaultCode {
    /// Controller still reports locked after the key sequence
    UnlockFailed,
    /// Programming error flag raised by a program or erase command
    ProgramError,
    /// Target lies in a write-protected sector
    WriteProtectionError,
    /// Controller does not report locked after setting the lock bit
    LockFailed,
    /// Erase finished without raising end-of-operation
    EraseIncomplete,
    /// Command failed with an error flag outside the known classes
    UnknownProgrammingFault,
    /// Busy flag did not clear within the timeout budget
    Timeout,
    /// Word read back after programming differs from the value written
    VerifyFailed,
}

impl FaultCode {
    /// All fault codes, in diagnostic code order
    pub const ALL: [FaultCode; 8] = [
        FaultCode::UnlockFailed,
        FaultCode::ProgramError,
        FaultCode::WriteProtectionError,
        FaultCode::UnknownProgrammingFault,
        FaultCode::LockFailed,
        FaultCode::EraseIncomplete,
        FaultCode::Timeout,
        FaultCode::VerifyFailed,
    ];

    /// Stable numeric diagnostic code (LED blink count, exit status, ...)
    pub const fn code(self) -> u8 {
        match self {
            Self::UnlockFailed => 1,
            Self::ProgramError => 2,
            Self::WriteProtectionError => 3,
            Self::UnknownProgrammingFault => 4,
            Self::LockFailed => 5,
            Self::EraseIncomplete => 6,
            Self::Timeout => 7,
            Self::VerifyFailed => 8,
        }
    }

    /// Look a fault up by its diagnostic code
    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.iter().copied().find(|fault| fault.code() == code)
    }
}

impl fmt::Display for FaultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnlockFailed => write!(f, "flash unlock failed"),
            Self::ProgramError => write!(f, "flash programming error"),
            Self::WriteProtectionError => write!(f, "flash sector is write protected"),
            Self::LockFailed => write!(f, "flash lock failed"),
            Self::EraseIncomplete => write!(f, "sector erase did not complete"),
            Self::UnknownProgrammingFault => write!(f, "unknown flash programming fault"),
            Self::Timeout => write!(f, "flash controller busy timeout"),
            Self::VerifyFailed => write!(f, "read-back verification failed"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for FaultCode {}

/// Result type alias using [`FaultCode`]
pub type Result<T> = core::result::Result<T, FaultCode>;
