//! The seam to the low-level scan layer.
//!
//! The driver never talks to a cable directly. It queues IR/DR scans
//! through this trait and harvests captured bits positionally, which keeps
//! the protocol engine testable against a scripted probe.

use bitvec::prelude::*;

/// JTAG instruction register value selecting the `dtminfo` register.
pub const IR_DTMINFO: u32 = 0x10;
/// JTAG instruction register value selecting the `dbus` register.
pub const IR_DBUS: u32 = 0x11;
/// JTAG instruction register value selecting the debug serial interface.
pub const IR_DEBUG: u32 = 0x05;

/// Errors reported by the scan layer.
#[derive(thiserror::Error, Debug)]
pub enum DebugProbeError {
    /// The probe rejected or failed a queued scan.
    #[error("Scan could not be queued: {0}")]
    Scan(String),
    /// Draining the scan queue failed; queued results are lost.
    #[error("Scan queue drain failed: {0}")]
    Drain(String),
    /// The probe disappeared or the wire is unusable.
    #[error("Probe is unusable: {0}")]
    Unusable(String),
}

/// Access to a JTAG TAP, as provided by the host framework's scan layer.
///
/// Scans execute strictly in queue order; `drain` returns one captured
/// bit vector per queued scan, in the same order. `idle_cycles` is the
/// number of run-test/idle clocks to append after the scan, which is how
/// the transport paces a slow debug module.
pub trait JtagAccess {
    /// Reset the TAP state machine.
    fn tap_reset(&mut self) -> Result<(), DebugProbeError>;

    /// Select `ir`, shift `out` through the data register and return the
    /// captured bits immediately.
    fn scan_dr(
        &mut self,
        ir: u32,
        out: &BitSlice<u8, Lsb0>,
        idle_cycles: u32,
    ) -> Result<BitVec<u8, Lsb0>, DebugProbeError>;

    /// Queue a DR scan for batched execution.
    fn queue_dr_scan(
        &mut self,
        ir: u32,
        out: &BitSlice<u8, Lsb0>,
        idle_cycles: u32,
    ) -> Result<(), DebugProbeError>;

    /// Execute all queued scans and return the captured bits per scan.
    fn drain(&mut self) -> Result<Vec<BitVec<u8, Lsb0>>, DebugProbeError>;
}
