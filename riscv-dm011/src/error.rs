//! Driver-level error taxonomy.

use crate::probe::DebugProbeError;

/// The overarching error type for everything that can go wrong while
/// driving a hart through the debug module.
#[derive(thiserror::Error, Debug)]
pub enum RiscvError {
    /// An error in the scan layer occurred.
    #[error("An error with the usage of the probe occurred")]
    Probe(#[from] DebugProbeError),
    /// A debug bus access returned the FAILED status.
    #[error("Debug bus access to {address:#x} returned the FAILED status")]
    DbusFailed {
        /// The dbus address of the failing access.
        address: u16,
    },
    /// A debug bus read never echoed the requested address back.
    #[error("Debug bus read of {address:#x} kept returning stale data")]
    DbusStaleRead {
        /// The dbus address of the failing read.
        address: u16,
    },
    /// TDO appears to be stuck high; the scan chain is returning all ones.
    #[error("TDO seems to be stuck high; check the scan chain wiring")]
    TdoStuckHigh,
    /// This debug transport module (DTM) version is not supported.
    #[error("The version '{0}' of the debug transport module (DTM) is not supported")]
    UnsupportedDtmVersion(u8),
    /// This debug module version is not supported.
    #[error("The version '{0}' of the debug module (DM) is not supported")]
    UnsupportedDmVersion(u8),
    /// The debug module requires authentication before it can be used.
    #[error("Debug module requires authentication, which is not supported")]
    AuthenticationRequired,
    /// The register width probe returned a pattern matching no known xlen.
    #[error("XLEN detection failed; debug RAM returned {word0:#010x}/{word1:#010x}")]
    XlenDetection {
        /// First probe result word.
        word0: u32,
        /// Second probe result word.
        word1: u32,
    },
    /// The session's register width does not support the requested operation.
    #[error("Operation is not supported on an XLEN={0} hart")]
    UnsupportedXlen(u32),
    /// A debug RAM word did not read back the value that was written.
    #[error("Debug RAM check failed at word {index}: wrote {wrote:#010x}, read {read:#010x}")]
    DebugRamCheckFailed {
        /// Index of the mismatching RAM word.
        index: usize,
        /// The value the cache held.
        wrote: u32,
        /// The value the hardware returned.
        read: u32,
    },
    /// The hart took an exception while executing an injected program.
    #[error("Hart raised exception {code:#x} while executing a debug RAM program")]
    Exception {
        /// Exception code reported in the last debug RAM word.
        code: u32,
    },
    /// No hardware trigger is available for the requested breakpoint or
    /// watchpoint. The caller may fall back to software breakpoints.
    #[error("No free hardware trigger supports the requested access mix")]
    NoTriggerAvailable,
    /// A resume or step was requested in a mode this driver does not implement.
    #[error("Unsupported resume mode: {0}")]
    UnsupportedResumeMode(&'static str),
    /// The register index does not name an architectural register.
    #[error("Register index {0} is unknown")]
    UnknownRegister(u32),
    /// Memory accesses are limited to 1, 2 and 4 byte elements.
    #[error("Unsupported memory access size: {0} bytes")]
    UnsupportedAccessSize(u32),
    /// A breakpoint of this length cannot be planted.
    #[error("Unsupported breakpoint length: {0} bytes")]
    UnsupportedBreakpointLength(u32),
    /// No breakpoint or watchpoint with the given identity is installed.
    #[error("No breakpoint or watchpoint with unique id {0} is installed")]
    UnknownUniqueId(u32),
    /// The halt-time register drain harvested the wrong number of values.
    #[error("Register drain harvested {got} of 33 expected values")]
    HaltDrainMismatch {
        /// Number of values that actually arrived.
        got: usize,
    },
    /// A wait loop exceeded the command timeout.
    #[error("Timeout while waiting for the target")]
    Timeout,
    /// The operation requires a halted hart.
    #[error("The hart is not halted")]
    NotHalted,
}
