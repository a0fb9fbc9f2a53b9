//! Debug bus transport.
//!
//! Every dbus access can come back BUSY, and the debug module answers a
//! read one scan late, so this layer owns the retry loops and the two
//! self-tuning delay counters that pace the wire. The counters only ever
//! grow; once they reach the worst case for a given board the fast
//! pipelined paths stop seeing BUSY at all.

use bitfield::bitfield;
use bitvec::prelude::*;
use std::time::{Duration, Instant};

use crate::batch::{BatchParams, ScanBatch};
use crate::dbus::{
    pack_scan, scan_bits, DbusOp, DbusStatus, DMCONTROL, DMCONTROL_HALTNOT, DMCONTROL_INTERRUPT,
};
use crate::error::RiscvError;
use crate::probe::{JtagAccess, IR_DBUS, IR_DTMINFO};

/// Wall-clock bound for every wait loop in the driver.
pub(crate) const COMMAND_TIMEOUT: Duration = Duration::from_secs(2);

/// Retry bound for a single dbus access.
const DBUS_MAX_RETRIES: usize = 256;

bitfield! {
    /// The `dtminfo` register, reachable at JTAG IR 0x10.
    pub struct Dtminfo(u32);
    impl Debug;

    /// Width of the dbus address field.
    pub addrbits, _: 7, 4;
    /// Debug transport module version. This driver speaks version 0.
    pub version, _: 3, 0;
}

/// The haltnot/interrupt flag pair returned by a dbus status read.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct DebugBits {
    /// The hart has notified the debug module that it halted.
    pub haltnot: bool,
    /// A debug interrupt is pending; the hart has not yet picked up the
    /// injected program.
    pub interrupt: bool,
}

/// Transport to the debug module: single-scan reads and writes with BUSY
/// retry, plus batch execution for the bulk paths.
pub struct Dtm<P> {
    probe: P,
    addrbits: u32,
    dbus_busy_delay: u32,
    interrupt_high_delay: u32,
}

impl<P: JtagAccess> Dtm<P> {
    /// Wrap a scan layer. The address width is unknown until
    /// [`Self::init`] runs.
    pub fn new(probe: P) -> Self {
        Dtm {
            probe,
            addrbits: 0,
            dbus_busy_delay: 0,
            interrupt_high_delay: 0,
        }
    }

    /// Reset the TAP and learn the dbus address width from `dtminfo`.
    pub fn init(&mut self) -> Result<(), RiscvError> {
        self.probe.tap_reset()?;

        let out = bitvec![u8, Lsb0; 0; 32];
        let captured = self.probe.scan_dr(IR_DTMINFO, &out, 0)?;
        let dtminfo = Dtminfo(captured[..32].load_le::<u32>());

        tracing::debug!("dtminfo: {:?}", dtminfo);

        if dtminfo.version() != 0 {
            return Err(RiscvError::UnsupportedDtmVersion(dtminfo.version() as u8));
        }

        self.addrbits = dtminfo.addrbits();
        if self.addrbits == 0 {
            return Err(RiscvError::Probe(crate::probe::DebugProbeError::Unusable(
                "dtminfo reports a zero-width dbus address field".into(),
            )));
        }

        Ok(())
    }

    /// Width of the dbus address field, valid after [`Self::init`].
    pub fn addrbits(&self) -> u32 {
        self.addrbits
    }

    /// Current BUSY pacing counter.
    pub fn dbus_busy_delay(&self) -> u32 {
        self.dbus_busy_delay
    }

    /// Current interrupt-high pacing counter.
    pub fn interrupt_high_delay(&self) -> u32 {
        self.interrupt_high_delay
    }

    /// Grow the BUSY pacing counter. Never shrinks.
    pub fn increase_dbus_busy_delay(&mut self) {
        self.dbus_busy_delay += self.dbus_busy_delay / 10 + 1;
        tracing::debug!(
            "dbus_busy_delay -> {}, interrupt_high_delay {}",
            self.dbus_busy_delay,
            self.interrupt_high_delay
        );
    }

    /// Grow the interrupt-high pacing counter. Never shrinks.
    pub fn increase_interrupt_high_delay(&mut self) {
        self.interrupt_high_delay += self.interrupt_high_delay / 10 + 1;
        tracing::debug!(
            "dbus_busy_delay {}, interrupt_high_delay -> {}",
            self.dbus_busy_delay,
            self.interrupt_high_delay
        );
    }

    /// One raw dbus scan. Returns the status, echoed address and data of
    /// the *previous* transaction; the debug module pipelines by one.
    fn dbus_scan(
        &mut self,
        op: DbusOp,
        address: u16,
        data: u64,
    ) -> Result<(DbusStatus, u16, u64), RiscvError> {
        let mut out = bitvec![u8, Lsb0; 0; scan_bits(self.addrbits)];
        pack_scan(&mut out, op, data, address, self.addrbits);

        let mut idle = self.dbus_busy_delay;
        if data & DMCONTROL_INTERRUPT != 0 {
            idle += self.interrupt_high_delay;
        }

        let captured = self.probe.scan_dr(IR_DBUS, &out, idle)?;

        let status = crate::dbus::unpack_status(&captured);
        let addr_in = crate::dbus::unpack_address(&captured, self.addrbits);
        let data_in = crate::dbus::unpack_data(&captured);
        Ok((status, addr_in, data_in))
    }

    /// Read a dbus word. Scans until the answer is not BUSY *and* the
    /// echoed address matches the request; the valid data always arrives
    /// on the scan after the one that asked for it.
    pub fn dbus_read(&mut self, address: u16) -> Result<u64, RiscvError> {
        for _ in 0..DBUS_MAX_RETRIES {
            let (status, addr_in, data) = self.dbus_scan(DbusOp::Read, address, 0)?;
            match status {
                DbusStatus::Busy => self.increase_dbus_busy_delay(),
                DbusStatus::Failed => {
                    tracing::error!("failed read from {:#x}", address);
                    return Err(RiscvError::DbusFailed { address });
                }
                DbusStatus::Success => {
                    if addr_in == address {
                        return Ok(data);
                    }
                }
            }
        }

        tracing::error!("read from {:#x} never came back", address);
        Err(RiscvError::DbusStaleRead { address })
    }

    /// Write a dbus word, retrying while the module reports BUSY. FAILED
    /// is not retried.
    pub fn dbus_write(&mut self, address: u16, value: u64) -> Result<(), RiscvError> {
        for _ in 0..DBUS_MAX_RETRIES {
            let (status, _, _) = self.dbus_scan(DbusOp::Write, address, value)?;
            match status {
                DbusStatus::Busy => self.increase_dbus_busy_delay(),
                DbusStatus::Failed => {
                    tracing::error!("failed to write {:#x} to {:#x}", value, address);
                    return Err(RiscvError::DbusFailed { address });
                }
                DbusStatus::Success => return Ok(()),
            }
        }

        tracing::error!("write to {:#x} stayed busy", address);
        Err(RiscvError::DbusFailed { address })
    }

    /// Sample the haltnot/interrupt pair with a read at address 0,
    /// skipping over BUSY responses and stale pipeline echoes.
    pub fn read_bits(&mut self) -> Result<DebugBits, RiscvError> {
        loop {
            let mut addr_in;
            let mut data;
            let mut retries = 0;
            loop {
                let (status, a, d) = self.dbus_scan(DbusOp::Read, 0, 0)?;
                addr_in = a;
                data = d;
                match status {
                    DbusStatus::Busy => {
                        if addr_in == (1 << self.addrbits) - 1
                            && data == (1 << crate::dbus::DBUS_DATA_SIZE as u64) - 1
                        {
                            return Err(RiscvError::TdoStuckHigh);
                        }
                        self.increase_dbus_busy_delay();
                    }
                    DbusStatus::Failed => {
                        tracing::error!("dbus status read failed");
                        return Err(RiscvError::DbusFailed { address: 0 });
                    }
                    DbusStatus::Success => break,
                }
                retries += 1;
                if retries >= DBUS_MAX_RETRIES {
                    return Err(RiscvError::DbusStaleRead { address: 0 });
                }
            }

            // Echoes of old Debug RAM reads drain out of the pipeline
            // before the status sample is believable.
            if addr_in <= 0x10 || addr_in == DMCONTROL {
                return Ok(DebugBits {
                    haltnot: data & DMCONTROL_HALTNOT != 0,
                    interrupt: data & DMCONTROL_INTERRUPT != 0,
                });
            }
        }
    }

    /// Poll until the debug interrupt drops, bounded by the command
    /// timeout. With `ignore_first` one sample is thrown away; it carries
    /// the state from just before the interrupt was raised.
    pub fn wait_for_debugint_clear(&mut self, ignore_first: bool) -> Result<(), RiscvError> {
        let start = Instant::now();
        if ignore_first {
            self.read_bits()?;
        }
        loop {
            let bits = self.read_bits()?;
            if !bits.interrupt {
                return Ok(());
            }
            if start.elapsed() > COMMAND_TIMEOUT {
                tracing::error!("debug interrupt did not clear");
                return Err(RiscvError::Timeout);
            }
        }
    }

    /// Parameters for a new scan batch at the current pacing.
    pub(crate) fn batch_params(&self, xlen: u32, dramsize: usize) -> BatchParams {
        BatchParams {
            addrbits: self.addrbits,
            xlen,
            dramsize,
            idle: 1 + self.dbus_busy_delay,
            interrupt_idle: self.interrupt_high_delay,
        }
    }

    /// Queue every scan of `batch` and harvest the captured bits.
    pub(crate) fn run_batch(&mut self, batch: &mut ScanBatch) -> Result<(), RiscvError> {
        for (bits, idle) in batch.scans() {
            self.probe.queue_dr_scan(IR_DBUS, bits, idle)?;
        }
        let captured = self.probe.drain()?;
        batch.set_captured(captured);
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::probe::DebugProbeError;

    /// A scripted dbus endpoint: every DR scan pops one canned response.
    struct ScriptedProbe {
        responses: Vec<(DbusStatus, u16, u64)>,
        next: usize,
        addrbits: u32,
    }

    impl ScriptedProbe {
        fn new(addrbits: u32, responses: Vec<(DbusStatus, u16, u64)>) -> Self {
            ScriptedProbe {
                responses,
                next: 0,
                addrbits,
            }
        }

        fn respond(&mut self) -> BitVec<u8, Lsb0> {
            let (status, addr, data) = self.responses[self.next.min(self.responses.len() - 1)];
            self.next += 1;

            let mut bits = bitvec![u8, Lsb0; 0; scan_bits(self.addrbits)];
            bits[0..2].store_le(status as u8);
            bits[2..36].store_le(data);
            bits[36..36 + self.addrbits as usize].store_le(addr);
            bits
        }
    }

    impl JtagAccess for ScriptedProbe {
        fn tap_reset(&mut self) -> Result<(), DebugProbeError> {
            Ok(())
        }

        fn scan_dr(
            &mut self,
            _ir: u32,
            _out: &BitSlice<u8, Lsb0>,
            _idle: u32,
        ) -> Result<BitVec<u8, Lsb0>, DebugProbeError> {
            Ok(self.respond())
        }

        fn queue_dr_scan(
            &mut self,
            _ir: u32,
            _out: &BitSlice<u8, Lsb0>,
            _idle: u32,
        ) -> Result<(), DebugProbeError> {
            Ok(())
        }

        fn drain(&mut self) -> Result<Vec<BitVec<u8, Lsb0>>, DebugProbeError> {
            Ok(vec![])
        }
    }

    fn dtm_with(responses: Vec<(DbusStatus, u16, u64)>) -> Dtm<ScriptedProbe> {
        let mut dtm = Dtm::new(ScriptedProbe::new(5, responses));
        dtm.addrbits = 5;
        dtm
    }

    #[test]
    fn read_waits_for_the_echoed_address() {
        // First scan echoes stale data from some earlier transaction, the
        // second carries the real answer.
        let mut dtm = dtm_with(vec![
            (DbusStatus::Success, 0x03, 0x1111),
            (DbusStatus::Success, 0x07, 0xabcd),
        ]);

        assert_eq!(dtm.dbus_read(0x07).unwrap(), 0xabcd);
    }

    #[test]
    fn busy_reads_grow_the_delay_monotonically() {
        let mut dtm = dtm_with(vec![
            (DbusStatus::Busy, 0x00, 0),
            (DbusStatus::Busy, 0x00, 0),
            (DbusStatus::Busy, 0x00, 0),
            (DbusStatus::Success, 0x04, 42),
        ]);

        let mut last = dtm.dbus_busy_delay();
        for _ in 0..3 {
            // Drive one scan at a time through the write path so each BUSY
            // is observable.
            let _ = dtm.dbus_scan(DbusOp::Read, 4, 0).unwrap();
            dtm.increase_dbus_busy_delay();
            assert!(dtm.dbus_busy_delay() > last);
            last = dtm.dbus_busy_delay();
        }
    }

    #[test]
    fn busy_write_bumps_delay_once_per_retry() {
        let mut dtm = dtm_with(vec![
            (DbusStatus::Busy, 0x00, 0),
            (DbusStatus::Busy, 0x00, 0),
            (DbusStatus::Success, 0x04, 0),
        ]);

        dtm.dbus_write(0x04, 0x55).unwrap();
        // Two BUSYs: 0 -> 1 -> 2.
        assert_eq!(dtm.dbus_busy_delay(), 2);
    }

    #[test]
    fn failed_write_is_not_retried() {
        let mut dtm = dtm_with(vec![(DbusStatus::Failed, 0x00, 0)]);

        assert!(matches!(
            dtm.dbus_write(0x04, 0),
            Err(RiscvError::DbusFailed { address: 0x04 })
        ));
    }

    #[test]
    fn read_bits_skips_stale_dram_echoes() {
        // A leftover echo of dram word 0x44 must not be mistaken for a
        // status sample.
        let mut dtm = dtm_with(vec![
            (DbusStatus::Success, 0x1f, 0x1234),
            (DbusStatus::Success, 0x00, DMCONTROL_HALTNOT),
        ]);

        let bits = dtm.read_bits().unwrap();
        assert!(bits.haltnot);
        assert!(!bits.interrupt);
    }

    #[test]
    fn stuck_high_wire_is_detected() {
        let all_ones_data = (1u64 << 34) - 1;
        let mut dtm = dtm_with(vec![(DbusStatus::Busy, 0x1f, all_ones_data)]);

        assert!(matches!(dtm.read_bits(), Err(RiscvError::TdoStuckHigh)));
    }
}
