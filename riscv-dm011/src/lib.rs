//! Debug-target driver for RISC-V harts behind a v0.11 debug module.
//!
//! The heart of the crate is a program-injection engine: short native
//! instruction sequences are staged in the debug module's tiny Debug RAM,
//! the halted hart is kicked to execute them, and results come back
//! through data slots in the same RAM. Everything else (register and CSR
//! access, hardware triggers, bulk memory I/O, halt/resume/step) is
//! built on that primitive.
//!
//! The driver talks to the outside world through two seams:
//!
//! * [`probe::JtagAccess`]: the host framework's scan layer, which
//!   queues IR/DR scans and drains them in order.
//! * [`core::Riscv011Core`]: the framework-facing target: examine,
//!   poll, halt, resume, step, reset, memory and register access,
//!   breakpoints and watchpoints.
//!
//! Every dbus transaction can come back BUSY and every read is answered
//! one scan late; the transport layer hides both behind retry loops and a
//! pair of delay counters that only ever grow.

#![warn(missing_docs)]

pub mod assembly;
pub(crate) mod batch;
pub mod communication_interface;
pub mod core;
pub mod dbus;
pub mod dram;
pub mod dtm;
pub mod error;
pub mod memory;
pub mod probe;
pub mod registers;
pub mod triggers;

pub use crate::core::{
    Breakpoint, BreakpointKind, CoreState, DebugReason, Riscv011Core, RiscvArchState, TargetEvent,
    Watchpoint, WatchpointKind,
};
pub use crate::error::RiscvError;
pub use crate::probe::{DebugProbeError, JtagAccess};
pub use crate::registers::{RegisterDescription, RegisterFile};
pub use crate::triggers::{Trigger, TriggerManager};
