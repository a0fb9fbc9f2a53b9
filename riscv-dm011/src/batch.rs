//! Batches of dbus scans, queued to the probe and harvested as a unit.
//!
//! Bulk operations (register drain, memory I/O, cache flushes) assemble a
//! batch of pre-packed scan words, hand it to the transport in one go and
//! then pick the results apart positionally. Because the debug module
//! pipelines by one transaction, result `i` describes what scan `i - 1`
//! asked for; interpreting that shift is the caller's job.

use bitvec::prelude::*;

use crate::assembly;
use crate::dbus::{
    self, pack_scan, scan_bits, DbusOp, DbusStatus, DMCONTROL_HALTNOT, DMCONTROL_INTERRUPT,
    DEBUG_RAM_START, DEBUG_ROM_RESUME,
};
use crate::dram::Slot;

/// Everything a batch needs to know about the session to pack scans.
#[derive(Copy, Clone, Debug)]
pub(crate) struct BatchParams {
    /// Width of the dbus address field.
    pub addrbits: u32,
    /// Register width of the hart.
    pub xlen: u32,
    /// Number of managed Debug RAM words.
    pub dramsize: usize,
    /// Idle cycles after every scan: `1 + dbus_busy_delay`.
    pub idle: u32,
    /// Extra idle cycles after a scan that sets the interrupt flag.
    pub interrupt_idle: u32,
}

/// A pre-allocated run of dbus scans.
pub(crate) struct ScanBatch {
    params: BatchParams,
    scan_bytes: usize,
    out: Vec<BitVec<u8, Lsb0>>,
    captured: Vec<BitVec<u8, Lsb0>>,
    idles: Vec<u32>,
}

impl ScanBatch {
    pub fn new(params: BatchParams, capacity: usize) -> Self {
        // The historical sizing of one scan buffer is 2 + xlen/8 bytes;
        // wide address fields can need more.
        let scan_bytes = (2 + params.xlen as usize / 8).max(scan_bits(params.addrbits).div_ceil(8));

        ScanBatch {
            params,
            scan_bytes,
            out: Vec::with_capacity(capacity),
            captured: Vec::new(),
            idles: Vec::with_capacity(capacity),
        }
    }

    /// Drop all queued scans and harvested results.
    pub fn reset(&mut self) {
        self.out.clear();
        self.captured.clear();
        self.idles.clear();
    }

    /// Number of queued scans.
    pub fn len(&self) -> usize {
        self.out.len()
    }

    fn add_scan(&mut self, op: DbusOp, address: u16, data: u64) {
        let mut bits = bitvec![u8, Lsb0; 0; self.scan_bytes * 8];
        pack_scan(&mut bits, op, data, address, self.params.addrbits);

        let mut idle = self.params.idle;
        if data & DMCONTROL_INTERRUPT != 0 {
            idle += self.params.interrupt_idle;
        }

        self.out.push(bits);
        self.idles.push(idle);
    }

    /// Queue a write of `data` to Debug RAM word `index`.
    pub fn add_write32(&mut self, index: usize, data: u32, set_interrupt: bool) {
        let interrupt = if set_interrupt { DMCONTROL_INTERRUPT } else { 0 };
        self.add_scan(
            DbusOp::Write,
            dbus::dram_address(index),
            interrupt | DMCONTROL_HALTNOT | data as u64,
        );
    }

    /// Queue a write of the jump back into the debug ROM at word `index`.
    pub fn add_write_jump(&mut self, index: usize, set_interrupt: bool) {
        let offset = DEBUG_ROM_RESUME as i32 - (DEBUG_RAM_START as i32 + 4 * index as i32);
        self.add_write32(index, assembly::jal(assembly::ZERO, offset), set_interrupt);
    }

    /// Queue a write of a load from `slot` into `gpr` at word `index`.
    pub fn add_write_load(&mut self, index: usize, gpr: u8, slot: Slot, set_interrupt: bool) {
        let offset = slot.address(self.params.xlen, self.params.dramsize) as u16;
        let insn = if self.params.xlen == 32 {
            assembly::lw(gpr, assembly::ZERO, offset)
        } else {
            assembly::ld(gpr, assembly::ZERO, offset)
        };
        self.add_write32(index, insn, set_interrupt);
    }

    /// Queue a write of a store of `gpr` into `slot` at word `index`.
    pub fn add_write_store(&mut self, index: usize, gpr: u8, slot: Slot, set_interrupt: bool) {
        let offset = slot.address(self.params.xlen, self.params.dramsize) as u16;
        let insn = if self.params.xlen == 32 {
            assembly::sw(gpr, assembly::ZERO, offset)
        } else {
            assembly::sd(gpr, assembly::ZERO, offset)
        };
        self.add_write32(index, insn, set_interrupt);
    }

    /// Queue a read of Debug RAM word `index`.
    pub fn add_read32(&mut self, index: usize, set_interrupt: bool) {
        let interrupt = if set_interrupt { DMCONTROL_INTERRUPT } else { 0 };
        self.add_scan(
            DbusOp::Read,
            dbus::dram_address(index),
            interrupt | DMCONTROL_HALTNOT,
        );
    }

    /// Queue reads covering `slot`: one word on a 32-bit hart, two
    /// consecutive words on a 64-bit one.
    pub fn add_read(&mut self, slot: Slot, set_interrupt: bool) {
        let index = slot.offset(self.params.xlen, self.params.dramsize);
        self.add_read32(index, set_interrupt);
        if self.params.xlen > 32 {
            self.add_read32(index + 1, set_interrupt);
        }
    }

    /// Completion status carried by harvested scan `i`.
    pub fn status(&self, i: usize) -> DbusStatus {
        dbus::unpack_status(&self.captured[i])
    }

    /// Data field carried by harvested scan `i`, flags included.
    pub fn data(&self, i: usize) -> u64 {
        dbus::unpack_data(&self.captured[i])
    }

    /// Address field echoed by harvested scan `i`.
    pub fn address(&self, i: usize) -> u16 {
        dbus::unpack_address(&self.captured[i], self.params.addrbits)
    }

    /// Arbitrary field of harvested scan `i` as a 64-bit value.
    pub fn get_u64(&self, i: usize, start: usize, bits: usize) -> u64 {
        self.captured[i][start..start + bits].load_le::<u64>()
    }

    /// Arbitrary field of harvested scan `i` as a 32-bit value.
    pub fn get_u32(&self, i: usize, start: usize, bits: usize) -> u32 {
        self.captured[i][start..start + bits].load_le::<u32>()
    }

    /// Outgoing scans in queue order, paired with their idle padding.
    pub fn scans(&self) -> impl Iterator<Item = (&BitSlice<u8, Lsb0>, u32)> {
        self.out
            .iter()
            .zip(self.idles.iter())
            .map(|(bits, idle)| (bits.as_bitslice(), *idle))
    }

    /// Install the captured bits harvested for this batch.
    pub fn set_captured(&mut self, captured: Vec<BitVec<u8, Lsb0>>) {
        self.captured = captured;
    }
}
