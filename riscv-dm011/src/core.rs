//! Hart lifecycle and the framework-facing target surface.
//!
//! One [`Riscv011Core`] is the session for one hart: it owns the debug
//! module interface, the framework's view of target state, and the
//! breakpoint/watchpoint bookkeeping.

use bitfield::bitfield;
use std::time::Instant;

use crate::assembly::{self, S0};
use crate::communication_interface::{csr, DebugModuleInterface};
use crate::dbus::{self, DMCONTROL_INTERRUPT};
use crate::dram::Slot;
use crate::dtm::COMMAND_TIMEOUT;
use crate::error::RiscvError;
use crate::probe::JtagAccess;
use crate::registers::{self, RegisterFile};
use crate::triggers::{Trigger, TriggerManager};

bitfield! {
    /// The `dcsr` debug CSR, as laid out by debug spec 0.11.
    #[derive(Copy, Clone)]
    pub struct Dcsr(u32);
    impl Debug;

    /// Debug support version implemented by the hart.
    pub xdebugver, _: 31, 30;
    /// Reset everything except the debug logic.
    pub ndreset, set_ndreset: 29;
    /// Reset the whole platform, debug logic included.
    pub fullreset, set_fullreset: 28;
    /// `ebreak` in M-mode enters debug mode.
    pub ebreakm, set_ebreakm: 15;
    /// `ebreak` in H-mode enters debug mode.
    pub ebreakh, set_ebreakh: 14;
    /// `ebreak` in S-mode enters debug mode.
    pub ebreaks, set_ebreaks: 13;
    /// `ebreak` in U-mode enters debug mode.
    pub ebreaku, set_ebreaku: 12;
    /// Stop counters while in debug mode.
    pub stopcycle, set_stopcycle: 10;
    /// Stop timers while in debug mode.
    pub stoptime, set_stoptime: 9;
    /// Why the hart entered debug mode.
    pub cause, set_cause: 8, 6;
    /// A debug interrupt is pending.
    pub debugint, _: 5;
    /// Stay halted in debug mode.
    pub halt, set_halt: 3;
    /// Execute a single instruction on resume, then re-enter debug mode.
    pub step, set_step: 2;
    /// Privilege level the hart was running at.
    pub prv, set_prv: 1, 0;
}

const DCSR_HALT_BIT: u8 = 1 << 3;

const DCSR_CAUSE_SWBP: u32 = 1;
const DCSR_CAUSE_HWBP: u32 = 2;
const DCSR_CAUSE_DEBUGINT: u32 = 3;
const DCSR_CAUSE_STEP: u32 = 4;

/// Framework-visible execution state of the hart.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CoreState {
    /// Not examined yet, or state lost.
    Unknown,
    /// Executing the target program.
    Running,
    /// Parked in debug mode.
    Halted,
    /// Halted, but currently executing an injected program.
    DebugRunning,
    /// Reset asserted.
    Reset,
}

/// Why the hart last halted.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DebugReason {
    /// A software breakpoint (`ebreak`) was hit.
    Breakpoint,
    /// A hardware trigger fired; the framework treats this as both a
    /// watchpoint and a breakpoint.
    WatchAndBreak,
    /// The debugger asked for the halt.
    DebugRequest,
    /// A single step completed.
    SingleStep,
    /// The hart is not halted.
    NotHalted,
    /// The halt cause was missing or invalid.
    Undefined,
}

/// Events reported to the framework.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TargetEvent {
    /// The hart transitioned to halted.
    Halted,
}

/// Whether a breakpoint is planted in memory or in a trigger unit.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BreakpointKind {
    /// `ebreak` written over the original instruction.
    Soft,
    /// Hardware trigger with the execute bit.
    Hard,
}

/// A breakpoint request from the framework.
#[derive(Clone, Debug)]
pub struct Breakpoint {
    /// Address of the breakpoint.
    pub address: u64,
    /// Instruction length in bytes: 2 (compressed) or 4.
    pub length: u32,
    /// Soft or hard.
    pub kind: BreakpointKind,
    /// Identity assigned by the framework.
    pub unique_id: u32,
}

/// Access kinds a watchpoint can match.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum WatchpointKind {
    /// Loads only.
    Read,
    /// Stores only.
    Write,
    /// Loads and stores.
    Access,
}

/// A watchpoint request from the framework.
#[derive(Clone, Debug)]
pub struct Watchpoint {
    /// Address to watch.
    pub address: u64,
    /// Length of the watched region in bytes.
    pub length: u32,
    /// Data mask; all-ones means "any value".
    pub mask: u64,
    /// Data value to match when `mask` is narrower than all-ones.
    pub value: u64,
    /// Access kind to match.
    pub kind: WatchpointKind,
    /// Identity assigned by the framework.
    pub unique_id: u32,
}

struct InstalledBreakpoint {
    bp: Breakpoint,
    /// Original instruction bytes, for soft breakpoints.
    orig_instr: Vec<u8>,
}

/// Snapshot of the hart for the framework's status line.
#[derive(Copy, Clone, Debug)]
pub struct RiscvArchState {
    /// Register width.
    pub xlen: u32,
    /// Program counter shadow.
    pub pc: u64,
    /// Privilege level shadow.
    pub priv_level: u8,
}

/// A debug session controlling one RISC-V hart through a v0.11 debug
/// module.
pub struct Riscv011Core<P: JtagAccess> {
    pub(crate) dm: DebugModuleInterface<P>,
    state: CoreState,
    debug_reason: DebugReason,
    reg_file: RegisterFile,
    triggers: TriggerManager,
    breakpoints: Vec<InstalledBreakpoint>,
    watchpoints: Vec<Watchpoint>,
    pub(crate) need_strict_step: bool,
    never_halted: bool,
    reset_halt: bool,
    event_sink: Option<Box<dyn FnMut(TargetEvent) + Send>>,
}

impl<P: JtagAccess> Riscv011Core<P> {
    /// Create the session. Nothing touches the wire until
    /// [`Self::examine`] runs.
    pub fn new(probe: P) -> Self {
        Riscv011Core {
            dm: DebugModuleInterface::new(probe),
            state: CoreState::Unknown,
            debug_reason: DebugReason::NotHalted,
            reg_file: RegisterFile::default(),
            triggers: TriggerManager::new(),
            breakpoints: Vec::new(),
            watchpoints: Vec::new(),
            need_strict_step: false,
            never_halted: true,
            reset_halt: false,
            event_sink: None,
        }
    }

    /// Register a callback for target events.
    pub fn set_event_callback(&mut self, sink: Box<dyn FnMut(TargetEvent) + Send>) {
        self.event_sink = Some(sink);
    }

    fn fire_event(&mut self, event: TargetEvent) {
        if let Some(sink) = self.event_sink.as_mut() {
            sink(event);
        }
    }

    /// Current framework-visible state.
    pub fn state(&self) -> CoreState {
        self.state
    }

    /// Why the hart last halted.
    pub fn debug_reason(&self) -> DebugReason {
        self.debug_reason
    }

    /// Register width of the hart.
    pub fn xlen(&self) -> u32 {
        self.dm.xlen()
    }

    /// Trigger bookkeeping, exposed for inspection.
    pub fn triggers(&self) -> &TriggerManager {
        &self.triggers
    }

    /// The underlying debug module interface, exposed for inspection.
    pub fn interface(&self) -> &DebugModuleInterface<P> {
        &self.dm
    }

    /// True when the next step must lift all triggers first.
    pub fn need_strict_step(&self) -> bool {
        self.need_strict_step
    }

    /// The register list served to the remote debugger.
    pub fn gdb_reg_list(&self) -> &RegisterFile {
        &self.reg_file
    }

    /// Snapshot for the framework's status output.
    pub fn arch_state(&self) -> RiscvArchState {
        RiscvArchState {
            xlen: self.dm.xlen(),
            pc: self.dm.dpc,
            priv_level: Dcsr(self.dm.dcsr).prv() as u8,
        }
    }

    // ------------------------------------------------------------------
    // Examine

    /// Establish the session: check the DTM and DM versions, size Debug
    /// RAM, discover xlen and read `misa`.
    pub fn examine(&mut self) -> Result<(), RiscvError> {
        self.dm.dtm.init()?;
        self.dm.probe_dminfo()?;
        self.dm.probe_xlen()?;
        self.dm.read_misa()?;

        self.reg_file = RegisterFile::new(self.dm.xlen());

        self.poll_internal(false)?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Poll and halt handling

    /// Sample the hart and update the framework-visible state.
    pub fn poll(&mut self) -> Result<CoreState, RiscvError> {
        self.poll_internal(true)
    }

    fn poll_internal(&mut self, announce: bool) -> Result<CoreState, RiscvError> {
        let bits = self.dm.dtm.read_bits()?;

        if bits.haltnot && bits.interrupt {
            self.state = CoreState::DebugRunning;
        } else if bits.haltnot {
            if self.state != CoreState::Halted {
                self.handle_halt(announce)?;
            }
        } else if bits.interrupt {
            // The hart is on its way into debug mode; catch it on the
            // next poll.
        } else {
            self.state = CoreState::Running;
        }

        Ok(self.state)
    }

    fn handle_halt(&mut self, announce: bool) -> Result<(), RiscvError> {
        self.state = CoreState::Halted;
        self.dm.halt_drain()?;

        let dcsr = Dcsr(self.dm.dcsr);
        self.debug_reason = match dcsr.cause() {
            DCSR_CAUSE_SWBP => DebugReason::Breakpoint,
            DCSR_CAUSE_HWBP => {
                // A data trigger halt; the remote debugger won't know to
                // lift triggers before stepping past it.
                self.need_strict_step = true;
                DebugReason::WatchAndBreak
            }
            DCSR_CAUSE_DEBUGINT => DebugReason::DebugRequest,
            DCSR_CAUSE_STEP => DebugReason::SingleStep,
            other => {
                tracing::error!(
                    "invalid halt cause {} in dcsr ({:#010x})",
                    other,
                    self.dm.dcsr
                );
                DebugReason::Undefined
            }
        };

        if self.never_halted {
            self.never_halted = false;
            // Snapshot tselect so trigger bookkeeping starts from known
            // hardware state.
            self.dm.read_csr(csr::TSELECT)?;
        }

        tracing::debug!("halted, reason {:?}", self.debug_reason);
        if announce {
            self.fire_event(TargetEvent::Halted);
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Halt / resume / step

    /// Ask the hart to halt at its next instruction.
    pub fn halt(&mut self) -> Result<(), RiscvError> {
        self.dm.cache_set32(0, assembly::csrsi(csr::DCSR, DCSR_HALT_BIT));
        self.dm.cache_set32(1, assembly::csrr(S0, csr::MHARTID));
        self.dm
            .cache_set32(2, assembly::sw(S0, assembly::ZERO, dbus::SETHALTNOT));
        self.dm.cache_set_jump(3);

        self.dm
            .cache_write(Some(Slot::Zero.offset(self.dm.xlen(), self.dm.dramsize())), true)?;
        Ok(())
    }

    fn execute_resume(&mut self, step: bool) -> Result<(), RiscvError> {
        tracing::debug!("resume, step={}", step);

        self.dm.maybe_write_tselect()?;

        let dpc = self.dm.dpc;
        self.dm.write_csr(csr::DPC, dpc)?;

        let mut dcsr = Dcsr(self.dm.dcsr);
        dcsr.set_ebreakm(true);
        dcsr.set_ebreakh(true);
        dcsr.set_ebreaks(true);
        dcsr.set_ebreaku(true);
        dcsr.set_halt(false);
        dcsr.set_step(step);
        self.dm.dcsr = dcsr.0;

        // Stage the dcsr-writing program directly; the kick below puts
        // the dcsr value in the slot the program loads from.
        self.dm.dram_write32(
            0,
            assembly::lw(S0, assembly::ZERO, dbus::DEBUG_RAM_START as u16 + 16),
            false,
        )?;
        self.dm
            .dram_write32(1, assembly::csrw(csr::DCSR, S0), false)?;
        self.dm.dram_write32(2, assembly::FENCE_I, false)?;
        self.dm.dram_write_jump(3, false)?;

        // Kick with interrupt set and haltnot cleared.
        self.dm.dtm.dbus_write(
            dbus::dram_address(4),
            DMCONTROL_INTERRUPT | self.dm.dcsr as u64,
        )?;
        self.dm.cache_invalidate();

        self.dm.dtm.wait_for_debugint_clear(true)?;

        self.state = CoreState::Running;
        self.debug_reason = DebugReason::NotHalted;
        self.dm.poison_gpr_cache();
        Ok(())
    }

    /// Resume execution. Only `current=true`, `handle_breakpoints=false`,
    /// `debug_execution=false` is implemented; anything else is refused.
    pub fn resume(
        &mut self,
        current: bool,
        handle_breakpoints: bool,
        debug_execution: bool,
    ) -> Result<(), RiscvError> {
        if !current {
            tracing::error!("resume at a different address is not supported");
            return Err(RiscvError::UnsupportedResumeMode("current=false"));
        }
        if handle_breakpoints {
            tracing::error!("resume with handle_breakpoints is not supported");
            return Err(RiscvError::UnsupportedResumeMode("handle_breakpoints=true"));
        }
        if debug_execution {
            tracing::error!("resume with debug_execution is not supported");
            return Err(RiscvError::UnsupportedResumeMode("debug_execution=true"));
        }

        self.execute_resume(false)
    }

    fn full_step(&mut self, announce: bool) -> Result<(), RiscvError> {
        self.execute_resume(true)?;

        let start = Instant::now();
        loop {
            self.poll_internal(announce)?;
            if !matches!(self.state, CoreState::DebugRunning | CoreState::Running) {
                return Ok(());
            }
            if start.elapsed() > COMMAND_TIMEOUT {
                tracing::error!("timed out waiting for step to complete");
                return Err(RiscvError::Timeout);
            }
        }
    }

    fn strict_step(&mut self, announce: bool) -> Result<(), RiscvError> {
        tracing::debug!("strict step");

        // Lift every breakpoint and watchpoint, step, and put them all
        // back. Needed to make progress past a data trigger hit.
        let breakpoints = std::mem::take(&mut self.breakpoints);
        let watchpoints = std::mem::take(&mut self.watchpoints);

        for entry in &breakpoints {
            self.uninstall_breakpoint(entry)?;
        }
        for wp in &watchpoints {
            self.triggers.remove_trigger(&mut self.dm, wp.unique_id)?;
        }

        let step_result = self.full_step(announce);

        let mut reinstalled = Vec::with_capacity(breakpoints.len());
        for entry in breakpoints {
            let installed = self.install_breakpoint(entry.bp)?;
            reinstalled.push(installed);
        }
        self.breakpoints = reinstalled;
        for wp in &watchpoints {
            self.triggers
                .add_trigger(&mut self.dm, &trigger_from_watchpoint(wp))?;
        }
        self.watchpoints = watchpoints;

        step_result?;
        self.need_strict_step = false;
        Ok(())
    }

    /// Execute one instruction. Stepping somewhere other than the current
    /// pc is refused.
    pub fn step(&mut self, current: bool) -> Result<(), RiscvError> {
        if !current {
            tracing::error!("step at a different address is not supported");
            return Err(RiscvError::UnsupportedResumeMode("current=false"));
        }

        if self.need_strict_step {
            self.strict_step(true)
        } else {
            self.full_step(false)
        }
    }

    // ------------------------------------------------------------------
    // Reset

    /// Put the hart into reset. With `halt_on_reset` the hart comes back
    /// halted, otherwise it runs from the reset vector.
    pub fn assert_reset(&mut self, halt_on_reset: bool) -> Result<(), RiscvError> {
        self.reset_halt = halt_on_reset;

        self.dm.dtm.wait_for_debugint_clear(true)?;

        let mut dcsr = Dcsr(self.dm.dcsr);
        dcsr.set_ebreakm(true);
        dcsr.set_ebreakh(true);
        dcsr.set_ebreaks(true);
        dcsr.set_ebreaku(true);
        dcsr.set_halt(true);
        if halt_on_reset {
            dcsr.set_ndreset(true);
        } else {
            dcsr.set_fullreset(true);
        }
        self.dm.dcsr = dcsr.0;

        self.dm.dram_write32(
            0,
            assembly::lw(S0, assembly::ZERO, dbus::DEBUG_RAM_START as u16 + 16),
            false,
        )?;
        self.dm
            .dram_write32(1, assembly::csrw(csr::DCSR, S0), false)?;
        // The jump should never run; the reset takes over.
        self.dm.dram_write_jump(2, false)?;
        self.dm.dram_write32(4, self.dm.dcsr, true)?;
        self.dm.cache_invalidate();

        self.state = CoreState::Reset;
        Ok(())
    }

    /// Release reset and wait for the state requested at assert time.
    pub fn deassert_reset(&mut self) -> Result<(), RiscvError> {
        let wanted = if self.reset_halt {
            CoreState::Halted
        } else {
            CoreState::Running
        };
        self.wait_for_state(wanted)
    }

    fn wait_for_state(&mut self, wanted: CoreState) -> Result<(), RiscvError> {
        let start = Instant::now();
        loop {
            self.poll_internal(false)?;
            if self.state == wanted {
                return Ok(());
            }
            if start.elapsed() > COMMAND_TIMEOUT {
                tracing::error!("timed out waiting for state {:?}", wanted);
                return Err(RiscvError::Timeout);
            }
        }
    }

    // ------------------------------------------------------------------
    // Registers

    fn read_fpr(&mut self, number: u8) -> Result<u64, RiscvError> {
        if self.dm.xlen() == 32 {
            self.dm.cache_set32(
                0,
                assembly::fsw(number, assembly::ZERO, dbus::DEBUG_RAM_START as u16 + 16),
            );
        } else {
            self.dm.cache_set32(
                0,
                assembly::fsd(number, assembly::ZERO, dbus::DEBUG_RAM_START as u16 + 16),
            );
        }
        self.dm.cache_set_jump(1);

        let slot0 = Slot::Zero.offset(self.dm.xlen(), self.dm.dramsize());
        self.dm.cache_write(Some(slot0), true)?;
        let value = self.dm.cache_get(Slot::Zero)?;

        self.check_register_exception(registers::REG_FPR0 + number as u32)?;
        Ok(value)
    }

    fn check_register_exception(&mut self, index: u32) -> Result<(), RiscvError> {
        let exception = self.dm.program_exception()?;
        if exception != 0 {
            tracing::warn!(
                "got exception {:#x} accessing register {}",
                exception,
                index
            );
            return Err(RiscvError::Exception { code: exception });
        }
        Ok(())
    }

    /// Read an architectural register by its protocol index.
    pub fn register_get(&mut self, index: u32) -> Result<u64, RiscvError> {
        self.dm.maybe_write_tselect()?;

        match index {
            registers::REG_XPR0..=registers::REG_XPR31 => Ok(self.dm.gpr_cache[index as usize]),
            registers::REG_PC => Ok(self.dm.dpc),
            registers::REG_FPR0..=registers::REG_FPR31 => {
                self.read_fpr((index - registers::REG_FPR0) as u8)
            }
            registers::REG_CSR0..=registers::REG_CSR4095 => {
                self.dm.read_csr((index - registers::REG_CSR0) as u16)
            }
            registers::REG_PRIV => Ok(Dcsr(self.dm.dcsr).prv() as u64),
            other => Err(RiscvError::UnknownRegister(other)),
        }
    }

    /// Write an architectural register by its protocol index.
    pub fn register_set(&mut self, index: u32, value: u64) -> Result<(), RiscvError> {
        self.dm.maybe_write_tselect()?;

        match index {
            // s0 and s1 are scratch for every injected program; their
            // live values are parked in dscratch and the last slot.
            x if x == assembly::S0 as u32 => {
                self.dm.cache_set_load(0, S0, Slot::Zero);
                self.dm.cache_set32(1, assembly::csrw(csr::DSCRATCH, S0));
                self.dm.cache_set_jump(2);
            }
            x if x == assembly::S1 as u32 => {
                self.dm.cache_set_load(0, S0, Slot::Zero);
                self.dm.cache_set_store(1, S0, Slot::Last);
                self.dm.cache_set_jump(2);
            }
            registers::REG_XPR0..=registers::REG_XPR31 => {
                self.dm.cache_set_load(0, index as u8, Slot::Zero);
                self.dm.cache_set_jump(1);
            }
            registers::REG_PC => {
                self.dm.dpc = value;
                return Ok(());
            }
            registers::REG_FPR0..=registers::REG_FPR31 => {
                let number = (index - registers::REG_FPR0) as u8;
                if self.dm.xlen() == 32 {
                    self.dm.cache_set32(
                        0,
                        assembly::flw(number, assembly::ZERO, dbus::DEBUG_RAM_START as u16 + 16),
                    );
                } else {
                    self.dm.cache_set32(
                        0,
                        assembly::fld(number, assembly::ZERO, dbus::DEBUG_RAM_START as u16 + 16),
                    );
                }
                self.dm.cache_set_jump(1);
            }
            registers::REG_CSR0..=registers::REG_CSR4095 => {
                let address = (index - registers::REG_CSR0) as u16;
                self.dm.cache_set_load(0, S0, Slot::Zero);
                self.dm.cache_set32(1, assembly::csrw(address, S0));
                self.dm.cache_set_jump(2);
            }
            registers::REG_PRIV => {
                let mut dcsr = Dcsr(self.dm.dcsr);
                dcsr.set_prv(value as u32);
                self.dm.dcsr = dcsr.0;
                return Ok(());
            }
            other => return Err(RiscvError::UnknownRegister(other)),
        }

        self.dm.cache_set(Slot::Zero, value);
        let exception_word = self.dm.dramsize() - 1;
        self.dm.cache_write(Some(exception_word), true)?;
        self.check_register_exception(index)?;

        if index <= registers::REG_XPR31 && self.state == CoreState::Halted {
            self.dm.gpr_cache[index as usize] = value;
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Breakpoints and watchpoints

    fn install_breakpoint(&mut self, bp: Breakpoint) -> Result<InstalledBreakpoint, RiscvError> {
        let mut orig_instr = Vec::new();
        match bp.kind {
            BreakpointKind::Soft => {
                orig_instr = vec![0; bp.length as usize];
                self.read_memory(bp.address, bp.length, 1, &mut orig_instr)?;
                match bp.length {
                    2 => self.write_memory(bp.address, 2, 1, &assembly::C_EBREAK.to_le_bytes())?,
                    4 => self.write_memory(bp.address, 4, 1, &assembly::EBREAK.to_le_bytes())?,
                    other => return Err(RiscvError::UnsupportedBreakpointLength(other)),
                }
            }
            BreakpointKind::Hard => {
                let trigger = Trigger {
                    address: bp.address,
                    length: bp.length,
                    read: false,
                    write: false,
                    execute: true,
                    unique_id: bp.unique_id,
                };
                self.triggers.add_trigger(&mut self.dm, &trigger)?;
            }
        }
        Ok(InstalledBreakpoint { bp, orig_instr })
    }

    fn uninstall_breakpoint(&mut self, entry: &InstalledBreakpoint) -> Result<(), RiscvError> {
        match entry.bp.kind {
            BreakpointKind::Soft => {
                let orig = entry.orig_instr.clone();
                self.write_memory(entry.bp.address, entry.bp.length, 1, &orig)
            }
            BreakpointKind::Hard => self
                .triggers
                .remove_trigger(&mut self.dm, entry.bp.unique_id),
        }
    }

    /// Plant a breakpoint.
    pub fn add_breakpoint(&mut self, bp: Breakpoint) -> Result<(), RiscvError> {
        if bp.kind == BreakpointKind::Soft && bp.length != 2 && bp.length != 4 {
            return Err(RiscvError::UnsupportedBreakpointLength(bp.length));
        }
        let installed = self.install_breakpoint(bp)?;
        self.breakpoints.push(installed);
        Ok(())
    }

    /// Remove the breakpoint with the given identity.
    pub fn remove_breakpoint(&mut self, unique_id: u32) -> Result<(), RiscvError> {
        let position = self
            .breakpoints
            .iter()
            .position(|entry| entry.bp.unique_id == unique_id)
            .ok_or(RiscvError::UnknownUniqueId(unique_id))?;

        let entry = self.breakpoints.remove(position);
        self.uninstall_breakpoint(&entry)
    }

    /// Arm a watchpoint.
    pub fn add_watchpoint(&mut self, wp: Watchpoint) -> Result<(), RiscvError> {
        if wp.mask != u64::MAX {
            tracing::warn!("data value matching is not supported; ignoring mask/value");
        }

        self.triggers
            .add_trigger(&mut self.dm, &trigger_from_watchpoint(&wp))?;
        self.watchpoints.push(wp);
        Ok(())
    }

    /// Remove the watchpoint with the given identity.
    pub fn remove_watchpoint(&mut self, unique_id: u32) -> Result<(), RiscvError> {
        let position = self
            .watchpoints
            .iter()
            .position(|wp| wp.unique_id == unique_id)
            .ok_or(RiscvError::UnknownUniqueId(unique_id))?;

        self.watchpoints.remove(position);
        self.triggers.remove_trigger(&mut self.dm, unique_id)
    }
}

fn trigger_from_watchpoint(wp: &Watchpoint) -> Trigger {
    Trigger {
        address: wp.address,
        length: wp.length,
        read: matches!(wp.kind, WatchpointKind::Read | WatchpointKind::Access),
        write: matches!(wp.kind, WatchpointKind::Write | WatchpointKind::Access),
        execute: false,
        unique_id: wp.unique_id,
    }
}
