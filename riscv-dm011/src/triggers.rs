//! Hardware trigger allocation.
//!
//! Triggers are a bounded pool of address-match units behind the
//! `tselect`/`tdata1`/`tdata2` CSR window. The manager hands them out
//! first-fit, leaves units claimed by user code alone, and remembers
//! which breakpoint or watchpoint owns each physical slot.

use crate::communication_interface::{csr, DebugModuleInterface};
use crate::error::RiscvError;
use crate::probe::JtagAccess;

/// Upper bound on physical trigger slots probed.
pub const MAX_HWBPS: usize = 16;

const MCONTROL_ACTION_MASK: u64 = 0x3f << 12;
const MCONTROL_ACTION_DEBUG_MODE: u64 = 1 << 12;
const MCONTROL_MATCH_MASK: u64 = 0xf << 7;
const MCONTROL_M: u64 = 1 << 6;
const MCONTROL_H: u64 = 1 << 5;
const MCONTROL_S: u64 = 1 << 4;
const MCONTROL_U: u64 = 1 << 3;
const MCONTROL_EXECUTE: u64 = 1 << 2;
const MCONTROL_STORE: u64 = 1 << 1;
const MCONTROL_LOAD: u64 = 1 << 0;

/// Address/data match triggers report type 2 in the top `tdata1` nibble.
fn mcontrol_type(tdata1: u64, xlen: u32) -> u64 {
    (tdata1 >> (xlen - 4)) & 0xf
}

/// The dmode bit sits just below the type field.
fn mcontrol_dmode(xlen: u32) -> u64 {
    1 << (xlen - 5)
}

const MISA_H: u32 = 1 << 7;
const MISA_S: u32 = 1 << 18;
const MISA_U: u32 = 1 << 20;

/// What a breakpoint or watchpoint wants out of a trigger unit.
#[derive(Clone, Debug)]
pub struct Trigger {
    /// Address to match.
    pub address: u64,
    /// Length of the matched region in bytes.
    pub length: u32,
    /// Fire on a load from the address.
    pub read: bool,
    /// Fire on a store to the address.
    pub write: bool,
    /// Fire on execution of the address.
    pub execute: bool,
    /// Identity of the owning breakpoint or watchpoint.
    pub unique_id: u32,
}

/// Ownership bookkeeping for the physical trigger slots.
///
/// A slot is in use iff it records an owner. Ownership survives halts and
/// resumes; only an explicit remove clears it.
#[derive(Debug)]
pub struct TriggerManager {
    owner: [Option<u32>; MAX_HWBPS],
}

impl TriggerManager {
    /// All slots start free.
    pub fn new() -> Self {
        TriggerManager {
            owner: [None; MAX_HWBPS],
        }
    }

    /// Identity owning physical slot `index`, if any.
    pub fn slot_owner(&self, index: usize) -> Option<u32> {
        self.owner.get(index).copied().flatten()
    }

    /// Identities of all installed triggers, in slot order.
    pub fn installed(&self) -> impl Iterator<Item = u32> + '_ {
        self.owner.iter().filter_map(|owner| *owner)
    }

    /// Claim and configure a free trigger slot for `trigger`.
    ///
    /// Walks the slots first-fit. A slot whose `tselect` does not read
    /// back marks the end of the pool; a slot that is not an address
    /// match unit, or that user code already programmed, is skipped. A
    /// slot that drops bits of the requested configuration on readback
    /// does not support the access mix and is cleared and skipped.
    pub fn add_trigger<P: JtagAccess>(
        &mut self,
        dm: &mut DebugModuleInterface<P>,
        trigger: &Trigger,
    ) -> Result<usize, RiscvError> {
        let xlen = dm.xlen();

        for i in 0..MAX_HWBPS {
            if self.owner[i].is_some() {
                continue;
            }

            dm.write_csr(csr::TSELECT, i as u64)?;
            if dm.read_csr(csr::TSELECT)? != i as u64 {
                break;
            }

            let tdata1 = dm.read_csr(csr::TDATA1)?;
            if mcontrol_type(tdata1, xlen) != 2 {
                continue;
            }
            if tdata1 & (MCONTROL_EXECUTE | MCONTROL_STORE | MCONTROL_LOAD) != 0 {
                // Presumably in use by user code.
                continue;
            }

            let mut tdata1 = tdata1;
            tdata1 |= mcontrol_dmode(xlen);
            tdata1 = (tdata1 & !MCONTROL_ACTION_MASK) | MCONTROL_ACTION_DEBUG_MODE;
            // Match the address in tdata2 exactly.
            tdata1 &= !MCONTROL_MATCH_MASK;
            tdata1 |= MCONTROL_M;
            if dm.misa() & MISA_H != 0 {
                tdata1 |= MCONTROL_H;
            }
            if dm.misa() & MISA_S != 0 {
                tdata1 |= MCONTROL_S;
            }
            if dm.misa() & MISA_U != 0 {
                tdata1 |= MCONTROL_U;
            }
            if trigger.execute {
                tdata1 |= MCONTROL_EXECUTE;
            }
            if trigger.read {
                tdata1 |= MCONTROL_LOAD;
            }
            if trigger.write {
                tdata1 |= MCONTROL_STORE;
            }

            dm.write_csr(csr::TDATA1, tdata1)?;
            let readback = dm.read_csr(csr::TDATA1)?;
            if readback != tdata1 {
                tracing::debug!(
                    "trigger {} doesn't support this mix; wrote {:#x} to tdata1, read {:#x}",
                    i,
                    tdata1,
                    readback
                );
                dm.write_csr(csr::TDATA1, 0)?;
                continue;
            }

            dm.write_csr(csr::TDATA2, trigger.address)?;

            tracing::debug!("using trigger {} for unique id {}", i, trigger.unique_id);
            self.owner[i] = Some(trigger.unique_id);
            return Ok(i);
        }

        tracing::warn!("couldn't find an available hardware trigger");
        Err(RiscvError::NoTriggerAvailable)
    }

    /// Release the trigger owned by `unique_id`.
    pub fn remove_trigger<P: JtagAccess>(
        &mut self,
        dm: &mut DebugModuleInterface<P>,
        unique_id: u32,
    ) -> Result<(), RiscvError> {
        let slot = self
            .owner
            .iter()
            .position(|owner| *owner == Some(unique_id))
            .ok_or(RiscvError::UnknownUniqueId(unique_id))?;

        dm.write_csr(csr::TSELECT, slot as u64)?;
        dm.write_csr(csr::TDATA1, 0)?;
        self.owner[slot] = None;

        tracing::debug!("released trigger {} from unique id {}", slot, unique_id);
        Ok(())
    }
}

impl Default for TriggerManager {
    fn default() -> Self {
        Self::new()
    }
}
