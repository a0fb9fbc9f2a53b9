//! Debug module communication.
//!
//! This module implements the program-injection engine for a v0.11 RISC-V
//! debug module: a write-back shadow of Debug RAM, the "stage a snippet,
//! kick the hart, harvest the result slot" primitive, and the CSR/GPR
//! access paths built on top of it.

use bitfield::bitfield;
use std::time::Instant;

use crate::assembly::{self, S0, S1};
use crate::batch::ScanBatch;
use crate::dbus::{
    self, DMCONTROL, DMCONTROL_HALTNOT, DMCONTROL_INTERRUPT, DMINFO,
};
use crate::dram::{CacheLine, Slot, DRAM_CACHE_SIZE};
use crate::dtm::{Dtm, COMMAND_TIMEOUT};
use crate::error::RiscvError;
use crate::probe::JtagAccess;

/// CSR addresses the driver touches.
pub mod csr {
    /// Machine status register.
    pub const MSTATUS: u16 = 0x300;
    /// Machine ISA register.
    pub const MISA: u16 = 0x301;
    /// Pre-ratification address of `misa`, used by older cores.
    pub const LEGACY_MISA: u16 = 0xf10;
    /// Trigger select register.
    pub const TSELECT: u16 = 0x7a0;
    /// Trigger configuration register.
    pub const TDATA1: u16 = 0x7a1;
    /// Trigger match value register.
    pub const TDATA2: u16 = 0x7a2;
    /// Debug control and status register.
    pub const DCSR: u16 = 0x7b0;
    /// Debug program counter.
    pub const DPC: u16 = 0x7b1;
    /// Debug scratch register; holds the hart's live `s0` in debug mode.
    pub const DSCRATCH: u16 = 0x7b2;
    /// Hart id register.
    pub const MHARTID: u16 = 0xf14;
}

bitfield! {
    /// The `dminfo` debug bus register.
    pub struct Dminfo(u32);
    impl Debug;

    /// Width of the system address bus.
    pub abussize, _: 31, 25;
    /// Number of words in the serial interface buffers.
    pub serialcount, _: 24, 21;
    /// 128-bit memory access support.
    pub access128, _: 20;
    /// 64-bit memory access support.
    pub access64, _: 19;
    /// 32-bit memory access support.
    pub access32, _: 18;
    /// 16-bit memory access support.
    pub access16, _: 17;
    /// 8-bit memory access support.
    pub access8, _: 16;
    /// Number of Debug RAM words, minus one.
    pub dramsize, _: 15, 10;
    /// The debug module is usable without authentication.
    pub authenticated, _: 5;
    /// Authentication state machine is busy.
    pub authbusy, _: 4;
    /// Authentication type. Only 0 (none) is supported.
    pub authtype, _: 3, 2;
    /// Debug module version. This driver speaks version 1 (spec 0.11).
    pub version, _: 1, 0;
}

/// Value the GPR shadow is poisoned with while the hart runs.
pub const GPR_POISON: u64 = 0xBADBAD;

/// Outcome of one attempt at the halt-time register drain.
enum DrainOutcome {
    Drained,
    RetryBusy,
    RetryInterrupt,
}

/// The driver's connection to one hart's debug module.
///
/// Owns the transport plus every piece of state the injection engine
/// shadows: Debug RAM, the debug CSRs and the GPR file.
pub struct DebugModuleInterface<P> {
    pub(crate) dtm: Dtm<P>,
    xlen: u32,
    dramsize: usize,
    dram_cache: [CacheLine; DRAM_CACHE_SIZE],

    /// Shadow of `dcsr`. The HALT bit mirrors intended policy, not live
    /// hardware: it is re-asserted on reset and cleared on resume.
    pub(crate) dcsr: u32,
    /// Shadow of `dpc`, refreshed by the halt drain.
    pub(crate) dpc: u64,
    /// Shadow of `misa`, read once at examine time.
    pub(crate) misa: u32,

    tselect: u64,
    tselect_dirty: bool,

    /// Shadow of the GPR file. Meaningful only while the hart is halted
    /// and the halt drain has run; poisoned on resume.
    pub(crate) gpr_cache: [u64; 32],
}

impl<P: JtagAccess> DebugModuleInterface<P> {
    /// Wrap a scan layer. Nothing touches the wire until the examine
    /// sequence runs.
    pub fn new(probe: P) -> Self {
        DebugModuleInterface {
            dtm: Dtm::new(probe),
            // Pretend this is a 32-bit hart until probed otherwise.
            xlen: 32,
            dramsize: DRAM_CACHE_SIZE,
            dram_cache: [CacheLine::default(); DRAM_CACHE_SIZE],
            dcsr: 0,
            dpc: 0,
            misa: 0,
            tselect: 0,
            tselect_dirty: false,
            gpr_cache: [GPR_POISON; 32],
        }
    }

    /// Register width of the hart, valid after [`Self::probe_xlen`].
    pub fn xlen(&self) -> u32 {
        self.xlen
    }

    /// Number of managed Debug RAM words.
    pub fn dramsize(&self) -> usize {
        self.dramsize
    }

    /// `misa` shadow.
    pub fn misa(&self) -> u32 {
        self.misa
    }

    /// Current BUSY pacing counter.
    pub fn dbus_busy_delay(&self) -> u32 {
        self.dtm.dbus_busy_delay()
    }

    /// Current interrupt-high pacing counter.
    pub fn interrupt_high_delay(&self) -> u32 {
        self.dtm.interrupt_high_delay()
    }

    pub(crate) fn ensure_slotted_xlen(&self) -> Result<(), RiscvError> {
        match self.xlen {
            32 | 64 => Ok(()),
            other => Err(RiscvError::UnsupportedXlen(other)),
        }
    }

    pub(crate) fn batch(&self, capacity: usize) -> ScanBatch {
        ScanBatch::new(self.dtm.batch_params(self.xlen, self.dramsize), capacity)
    }

    pub(crate) fn slot_offset(&self, slot: Slot) -> usize {
        slot.offset(self.xlen, self.dramsize)
    }

    // ------------------------------------------------------------------
    // Debug RAM shadow

    /// Read one Debug RAM word directly.
    fn dram_read32(&mut self, index: usize) -> Result<u32, RiscvError> {
        let value = self.dtm.dbus_read(dbus::dram_address(index))?;
        Ok(value as u32)
    }

    /// Write one Debug RAM word directly, optionally kicking the hart.
    pub(crate) fn dram_write32(
        &mut self,
        index: usize,
        value: u32,
        set_interrupt: bool,
    ) -> Result<(), RiscvError> {
        let mut data = DMCONTROL_HALTNOT | value as u64;
        if set_interrupt {
            data |= DMCONTROL_INTERRUPT;
        }
        self.dtm.dbus_write(dbus::dram_address(index), data)
    }

    /// Write the jump back into the debug ROM at `index`, directly.
    pub(crate) fn dram_write_jump(
        &mut self,
        index: usize,
        set_interrupt: bool,
    ) -> Result<(), RiscvError> {
        let offset =
            dbus::DEBUG_ROM_RESUME as i32 - (dbus::DEBUG_RAM_START as i32 + 4 * index as i32);
        self.dram_write32(index, assembly::jal(assembly::ZERO, offset), set_interrupt)
    }

    /// Fetch a Debug RAM word through the shadow.
    pub(crate) fn cache_get32(&mut self, index: usize) -> Result<u32, RiscvError> {
        if !self.dram_cache[index].valid {
            let data = self.dram_read32(index)?;
            self.dram_cache[index].data = data;
            self.dram_cache[index].valid = true;
        }
        Ok(self.dram_cache[index].data)
    }

    /// Fetch a data slot through the shadow, one or two words wide.
    pub(crate) fn cache_get(&mut self, slot: Slot) -> Result<u64, RiscvError> {
        let offset = self.slot_offset(slot);
        let mut value = self.cache_get32(offset)? as u64;
        if self.xlen > 32 {
            value |= (self.cache_get32(offset + 1)? as u64) << 32;
        }
        Ok(value)
    }

    /// Stage a word in the shadow.
    pub(crate) fn cache_set32(&mut self, index: usize, data: u32) {
        self.dram_cache[index] = CacheLine {
            data,
            valid: true,
            dirty: true,
        };
    }

    /// Stage a data slot in the shadow, one or two words wide.
    pub(crate) fn cache_set(&mut self, slot: Slot, value: u64) {
        let offset = self.slot_offset(slot);
        self.cache_set32(offset, value as u32);
        if self.xlen > 32 {
            self.cache_set32(offset + 1, (value >> 32) as u32);
        }
    }

    /// Stage the jump back into the debug ROM at `index`.
    pub(crate) fn cache_set_jump(&mut self, index: usize) {
        let offset =
            dbus::DEBUG_ROM_RESUME as i32 - (dbus::DEBUG_RAM_START as i32 + 4 * index as i32);
        self.cache_set32(index, assembly::jal(assembly::ZERO, offset));
    }

    /// Stage a load of `slot` into `gpr` at `index`, sized to xlen.
    pub(crate) fn cache_set_load(&mut self, index: usize, gpr: u8, slot: Slot) {
        let address = slot.address(self.xlen, self.dramsize) as u16;
        let insn = if self.xlen == 32 {
            assembly::lw(gpr, assembly::ZERO, address)
        } else {
            assembly::ld(gpr, assembly::ZERO, address)
        };
        self.cache_set32(index, insn);
    }

    /// Stage a store of `gpr` into `slot` at `index`, sized to xlen.
    pub(crate) fn cache_set_store(&mut self, index: usize, gpr: u8, slot: Slot) {
        let address = slot.address(self.xlen, self.dramsize) as u16;
        let insn = if self.xlen == 32 {
            assembly::sw(gpr, assembly::ZERO, address)
        } else {
            assembly::sd(gpr, assembly::ZERO, address)
        };
        self.cache_set32(index, insn);
    }

    /// Drop the whole shadow.
    pub(crate) fn cache_invalidate(&mut self) {
        for line in self.dram_cache.iter_mut() {
            line.valid = false;
            line.dirty = false;
        }
    }

    /// Mark everything flushed; words past the program area may have been
    /// mutated by the injected program, so drop them too.
    fn cache_clean(&mut self) {
        for (i, line) in self.dram_cache.iter_mut().enumerate() {
            if i >= 4 {
                line.valid = false;
            }
            line.dirty = false;
        }
    }

    fn dump_debug_ram(&mut self) {
        for i in 0..self.dramsize {
            match self.dram_read32(i) {
                Ok(value) => tracing::debug!("Debug RAM {:#x}: {:#010x}", i, value),
                Err(e) => tracing::debug!("Debug RAM {:#x}: unreadable ({e})", i),
            }
        }
    }

    /// Flush dirty shadow lines to the debug module.
    ///
    /// The fast path writes every dirty word in one batch, raising the
    /// debug interrupt on the last write when `run` is set, then reads
    /// `read_addr` twice (the first read only pushes pipeline residue
    /// out). Any BUSY drops to the slow path: per-word writes and a wait
    /// for the interrupt to clear.
    pub(crate) fn cache_write(
        &mut self,
        read_addr: Option<usize>,
        run: bool,
    ) -> Result<(), RiscvError> {
        let last = self
            .dram_cache
            .iter()
            .enumerate()
            .take(self.dramsize)
            .filter(|(_, line)| line.dirty)
            .map(|(i, _)| i)
            .last();

        let mut batch = self.batch(self.dramsize + 2);

        match last {
            None => {
                // Nothing to flush; raise the interrupt on its own.
                self.dtm.dbus_write(
                    DMCONTROL,
                    DMCONTROL_HALTNOT | if run { DMCONTROL_INTERRUPT } else { 0 },
                )?;
            }
            Some(last) => {
                for i in 0..self.dramsize {
                    if self.dram_cache[i].dirty {
                        batch.add_write32(i, self.dram_cache[i].data, run && i == last);
                    }
                }
            }
        }

        if let Some(addr) = read_addr {
            batch.add_read32(addr, false);
            batch.add_read32(addr, false);
        }

        self.dtm.run_batch(&mut batch)?;

        let mut busy = false;
        for i in 0..batch.len() {
            match batch.status(i) {
                dbus::DbusStatus::Success => {}
                dbus::DbusStatus::Failed => {
                    tracing::error!("Debug RAM write failed. Hardware error?");
                    return Err(RiscvError::DbusFailed {
                        address: batch.address(i),
                    });
                }
                dbus::DbusStatus::Busy => busy = true,
            }
        }

        if busy {
            self.dtm.increase_dbus_busy_delay();

            // Careful path: flush the same dirty lines word by word.
            // Touching anything else would clobber the slot where the
            // debug ROM parks the hart's live s1.
            for i in 0..self.dramsize {
                if !self.dram_cache[i].dirty {
                    continue;
                }
                let kick = run && Some(i) == last;
                let data = self.dram_cache[i].data;
                self.dram_write32(i, data, kick)?;
                self.dram_cache[i].dirty = false;
            }
            if run {
                self.cache_clean();
            }
            self.dtm.wait_for_debugint_clear(true)?;
        } else if run {
            self.cache_clean();

            if let Some(addr) = read_addr {
                let end = batch.len() - 1;
                let interrupt = batch.get_u64(end, dbus::DBUS_DATA_START + 33, 1);
                if interrupt != 0 {
                    // The program was still running when we harvested.
                    self.dtm.increase_interrupt_high_delay();
                    self.dtm.wait_for_debugint_clear(false)?;
                } else {
                    let read_addr_in = batch.address(end);
                    if read_addr_in != dbus::dram_address(addr) {
                        tracing::info!(
                            "got data from {:#x} but expected it from {:#x}",
                            read_addr_in,
                            addr
                        );
                    }
                    if let Some(index) = dbus::dram_index(read_addr_in) {
                        self.dram_cache[index].data =
                            batch.get_u32(end, dbus::DBUS_DATA_START, 32);
                        self.dram_cache[index].valid = true;
                    }
                }
            }
        } else {
            for line in self.dram_cache.iter_mut() {
                line.dirty = false;
            }
        }

        Ok(())
    }

    /// Read back every clean valid line and compare it to the shadow.
    pub(crate) fn cache_check(&mut self) -> Result<(), RiscvError> {
        let mut mismatch = None;
        for i in 0..self.dramsize {
            let line = self.dram_cache[i];
            if !line.valid || line.dirty {
                continue;
            }
            let read = self.dram_read32(i)?;
            if read != line.data {
                tracing::error!(
                    "Debug RAM {:#x} contains {:#010x} instead of {:#010x}",
                    i,
                    read,
                    line.data
                );
                mismatch.get_or_insert((i, line.data, read));
            }
        }

        if let Some((index, wrote, read)) = mismatch {
            self.dump_debug_ram();
            return Err(RiscvError::DebugRamCheckFailed { index, wrote, read });
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Program injection

    /// Exception code the debug ROM left in the last Debug RAM word after
    /// the most recent injected program; zero means a clean run.
    pub(crate) fn program_exception(&mut self) -> Result<u32, RiscvError> {
        self.cache_get32(self.dramsize - 1)
    }

    // ------------------------------------------------------------------
    // CSR and GPR access

    /// Read a CSR by injecting `csrr s0, csr; store s0 -> slot0`.
    pub fn read_csr(&mut self, address: u16) -> Result<u64, RiscvError> {
        self.ensure_slotted_xlen()?;

        self.cache_set32(0, assembly::csrr(S0, address));
        self.cache_set_store(1, S0, Slot::Zero);
        self.cache_set_jump(2);

        let slot0 = self.slot_offset(Slot::Zero);
        self.cache_write(Some(slot0), true)?;

        let value = self.cache_get(Slot::Zero)?;
        tracing::debug!("csr {:#x} = {:#x}", address, value);

        let exception = self.program_exception()?;
        if exception != 0 {
            tracing::warn!(
                "got exception {:#x} when reading csr {:#x}",
                exception,
                address
            );
            return Err(RiscvError::Exception { code: exception });
        }

        if address == csr::TSELECT {
            // The shadow now reflects hardware; hardware may drift from it
            // again before the next explicit write.
            self.tselect = value;
            self.tselect_dirty = true;
        }

        Ok(value)
    }

    /// Write a CSR by injecting `load s0 <- slot0; csrw csr, s0`.
    pub fn write_csr(&mut self, address: u16, value: u64) -> Result<(), RiscvError> {
        self.ensure_slotted_xlen()?;
        tracing::debug!("csr {:#x} <- {:#x}", address, value);

        self.cache_set_load(0, S0, Slot::Zero);
        self.cache_set32(1, assembly::csrw(address, S0));
        self.cache_set_jump(2);
        self.cache_set(Slot::Zero, value);

        let slot0 = self.slot_offset(Slot::Zero);
        self.cache_write(Some(slot0), true)?;

        if address == csr::TSELECT {
            self.tselect = value;
            self.tselect_dirty = false;
        }

        Ok(())
    }

    /// Write a GPR by injecting `load gpr <- slot0`.
    pub fn write_gpr(&mut self, gpr: u8, value: u64) -> Result<(), RiscvError> {
        self.ensure_slotted_xlen()?;

        self.cache_set_load(0, gpr, Slot::Zero);
        self.cache_set_jump(1);
        self.cache_set(Slot::Zero, value);

        self.cache_write(Some(self.dramsize - 1), true)?;
        Ok(())
    }

    /// Make any stale GPR shadow reads stand out while the hart runs.
    pub(crate) fn poison_gpr_cache(&mut self) {
        self.gpr_cache = [GPR_POISON; 32];
    }

    /// Restore the hart's `tselect` if trigger bookkeeping may have left
    /// hardware out of sync with the shadow.
    pub fn maybe_write_tselect(&mut self) -> Result<(), RiscvError> {
        if self.tselect_dirty {
            let tselect = self.tselect;
            self.write_csr(csr::TSELECT, tselect)?;
        }
        Ok(())
    }

    /// `tselect` shadow, for bookkeeping and tests.
    pub fn tselect(&self) -> u64 {
        self.tselect
    }

    // ------------------------------------------------------------------
    // Examine-time probing

    /// Read `dminfo`, verify the module is usable and learn the Debug RAM
    /// size.
    pub(crate) fn probe_dminfo(&mut self) -> Result<(), RiscvError> {
        let dminfo = Dminfo(self.dtm.dbus_read(DMINFO)? as u32);
        tracing::debug!("dminfo: {:?}", dminfo);

        if dminfo.version() != 1 {
            return Err(RiscvError::UnsupportedDmVersion(dminfo.version() as u8));
        }
        if dminfo.authtype() != 0 {
            return Err(RiscvError::AuthenticationRequired);
        }

        let dramsize = dminfo.dramsize() as usize + 1;
        if dramsize > DRAM_CACHE_SIZE {
            tracing::warn!(
                "debug module advertises {} RAM words; managing only {}",
                dramsize,
                DRAM_CACHE_SIZE
            );
        }
        self.dramsize = dramsize.min(DRAM_CACHE_SIZE);
        tracing::debug!("Debug RAM size: {} words", self.dramsize);

        Ok(())
    }

    /// Discover the hart's register width and prove Debug RAM round-trips
    /// along the way.
    ///
    /// The probe program shifts an all-ones pattern right by 31 twice,
    /// storing the intermediate values; the pair of results is unique per
    /// width.
    pub(crate) fn probe_xlen(&mut self) -> Result<(), RiscvError> {
        self.cache_set32(0, assembly::xori(S1, assembly::ZERO, -1));
        self.cache_set32(1, assembly::srli(S1, S1, 31));
        self.cache_set32(2, assembly::sw(S1, assembly::ZERO, dbus::DEBUG_RAM_START as u16));
        self.cache_set32(3, assembly::srli(S1, S1, 31));
        self.cache_set32(
            4,
            assembly::sw(S1, assembly::ZERO, dbus::DEBUG_RAM_START as u16 + 4),
        );
        self.cache_set_jump(5);
        for i in 6..self.dramsize {
            self.cache_set32(i, i as u32 * 0x01020304);
        }

        self.cache_write(Some(0), false)?;

        // Prove that Debug RAM actually reads back before trusting any
        // program results.
        self.cache_check()?;

        self.cache_write(Some(0), true)?;
        self.cache_invalidate();

        let word0 = self.cache_get32(0)?;
        let word1 = self.cache_get32(1)?;

        self.xlen = match (word0, word1) {
            (1, 0) => 32,
            (0xffff_ffff, 3) => 64,
            (0xffff_ffff, 0xffff_ffff) => 128,
            _ => {
                let exception = self.program_exception()?;
                tracing::error!(
                    "failed to discover xlen; word0={:#010x} word1={:#010x} exception={:#x}",
                    word0,
                    word1,
                    exception
                );
                return Err(RiscvError::XlenDetection { word0, word1 });
            }
        };
        tracing::debug!("XLEN: {}", self.xlen);

        Ok(())
    }

    /// Read `misa`, falling back to its pre-ratification address.
    pub(crate) fn read_misa(&mut self) -> Result<(), RiscvError> {
        if self.xlen == 128 {
            // 128-bit harts are only detected; the slot layout stops at 64.
            tracing::warn!("not reading misa on an XLEN=128 hart");
            return Ok(());
        }
        self.misa = match self.read_csr(csr::MISA) {
            Ok(value) => value as u32,
            Err(RiscvError::Exception { .. }) => {
                tracing::warn!(
                    "failed to read misa at {:#x}; trying legacy address {:#x}",
                    csr::MISA,
                    csr::LEGACY_MISA
                );
                self.read_csr(csr::LEGACY_MISA)? as u32
            }
            Err(e) => return Err(e),
        };
        tracing::debug!("misa: {:#010x}", self.misa);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Halt-time bulk drain

    /// Refill the GPR shadow plus `dpc` and `dcsr` in as few round trips
    /// as possible. Retries whole batches with bumped delays until the
    /// pipelined path holds up.
    pub(crate) fn halt_drain(&mut self) -> Result<(), RiscvError> {
        self.ensure_slotted_xlen()?;

        let start = Instant::now();
        loop {
            match self.try_halt_drain()? {
                DrainOutcome::Drained => return Ok(()),
                DrainOutcome::RetryBusy => self.dtm.increase_dbus_busy_delay(),
                DrainOutcome::RetryInterrupt => self.dtm.increase_interrupt_high_delay(),
            }
            if start.elapsed() > COMMAND_TIMEOUT {
                return Err(RiscvError::Timeout);
            }
        }
    }

    fn try_halt_drain(&mut self) -> Result<DrainOutcome, RiscvError> {
        let mut batch = self.batch(256);

        // Read every GPR in one go; the remote debugger is going to ask
        // for all of them anyway and one at a time is much slower.
        batch.add_write_jump(1, false);
        for reg in 1..32u8 {
            if reg == S0 || reg == S1 {
                continue;
            }
            batch.add_write_store(0, reg, Slot::Zero, true);
            batch.add_read(Slot::Zero, false);
        }

        // Switch to a two-instruction program: word 1 stores s0, word 2
        // jumps back.
        batch.add_write_store(1, S0, Slot::Zero, false);
        batch.add_write_jump(2, false);

        // The debug ROM parked the hart's s1 in the last slot.
        batch.add_write_load(0, S0, Slot::Last, true);
        batch.add_read(Slot::Zero, false);

        // s0 lives in dscratch; dpc and dcsr ride the same program.
        for address in [csr::DSCRATCH, csr::DPC, csr::DCSR] {
            batch.add_write32(0, assembly::csrr(S0, address), true);
            batch.add_read(Slot::Zero, false);
        }

        // Push the last result out of the pipeline.
        batch.add_read32(4, false);

        self.dtm.run_batch(&mut batch)?;

        let slot0 = self.slot_offset(Slot::Zero) as u16;
        let mut values: Vec<u64> = Vec::with_capacity(33);
        let mut low: Option<u32> = None;

        // The first scan result belongs to whatever came before this
        // batch.
        for i in 1..batch.len() {
            match batch.status(i) {
                dbus::DbusStatus::Success => {}
                dbus::DbusStatus::Failed => {
                    tracing::error!("register drain failed on scan {}", i);
                    return Err(RiscvError::DbusFailed {
                        address: batch.address(i),
                    });
                }
                dbus::DbusStatus::Busy => return Ok(DrainOutcome::RetryBusy),
            }

            let data = batch.data(i);
            if data & DMCONTROL_INTERRUPT != 0 {
                return Ok(DrainOutcome::RetryInterrupt);
            }

            let address = batch.address(i);
            if address == slot0 {
                if self.xlen == 32 {
                    values.push(data as u32 as u64);
                } else {
                    low = Some(data as u32);
                }
            } else if self.xlen > 32 && address == slot0 + 1 {
                let lo = low.take().unwrap_or(0);
                values.push(((data as u32 as u64) << 32) | lo as u64);
            }
        }

        if values.len() != 33 {
            tracing::error!("register drain harvested {} of 33 values", values.len());
            return Err(RiscvError::HaltDrainMismatch { got: values.len() });
        }

        self.gpr_cache[0] = 0;
        let mut next = values.into_iter();
        for reg in 1..32usize {
            if reg == S0 as usize || reg == S1 as usize {
                continue;
            }
            self.gpr_cache[reg] = next.next().unwrap_or(0);
        }
        self.gpr_cache[S1 as usize] = next.next().unwrap_or(0);
        self.gpr_cache[S0 as usize] = next.next().unwrap_or(0);
        self.dpc = next.next().unwrap_or(0);
        self.dcsr = next.next().unwrap_or(0) as u32;

        Ok(DrainOutcome::Drained)
    }
}
