//! Bulk target memory access.
//!
//! Both directions run the same pattern: stage a tiny per-element program
//! once, then stream one kicked dbus write per element and let the
//! pipeline overlap hart execution with the next scan. A batch that sees
//! BUSY or a still-pending interrupt is retried wholesale after bumping
//! the matching delay, so the counters converge on a cadence the board
//! can sustain.

use crate::assembly::{self, S0, S1, T0, ZERO};
use crate::core::Riscv011Core;
use crate::dbus::{self, DMCONTROL_INTERRUPT};
use crate::dram::Slot;
use crate::error::RiscvError;
use crate::probe::JtagAccess;

/// Upper bound on scans per batch.
const MAX_BATCH_SCANS: usize = 256;

/// Debug RAM offset the per-element programs exchange data through
/// (word 4, the first data slot).
const DATA_OFFSET: u16 = dbus::DEBUG_RAM_START as u16 + 16;

impl<P: JtagAccess> Riscv011Core<P> {
    /// Read `count` elements of `size` bytes starting at `address`.
    pub fn read_memory(
        &mut self,
        address: u64,
        size: u32,
        count: u32,
        buffer: &mut [u8],
    ) -> Result<(), RiscvError> {
        if !matches!(size, 1 | 2 | 4) {
            return Err(RiscvError::UnsupportedAccessSize(size));
        }
        self.dm.ensure_slotted_xlen()?;

        let size = size as usize;
        let count = count as usize;
        assert!(buffer.len() >= size * count);

        tracing::debug!("read {} x {} bytes from {:#x}", count, size, address);

        // Per-element program: pick the address up from the data word,
        // load through it, store the value back into the data word.
        self.dm.cache_set32(0, assembly::lw(S0, ZERO, DATA_OFFSET));
        let load = match size {
            1 => assembly::lb(S1, S0, 0),
            2 => assembly::lh(S1, S0, 0),
            _ => assembly::lw(S1, S0, 0),
        };
        self.dm.cache_set32(1, load);
        self.dm.cache_set32(2, assembly::sw(S1, ZERO, DATA_OFFSET));
        self.dm.cache_set_jump(3);
        self.dm.cache_write(None, false)?;

        let exception_word = self.dm.dramsize() - 1;
        let mut result_value: u64 = 0x777;

        let mut batch = self.dm.batch(MAX_BATCH_SCANS);
        let mut i = 0usize;
        while i < count + 3 {
            let batch_size = (count + 3 - i).min(MAX_BATCH_SCANS);
            batch.reset();

            for j in 0..batch_size {
                let k = i + j;
                if k == count {
                    // Scan out the last data value.
                    batch.add_read32(4, false);
                } else if k > count {
                    // And check for an exception.
                    batch.add_read32(exception_word, false);
                } else {
                    // Write the next address and kick the hart.
                    let element = address + (size * k) as u64;
                    batch.add_write32(4, element as u32, true);
                }
            }

            self.dm.dtm.run_batch(&mut batch)?;

            let mut dbus_busy = false;
            let mut execute_busy = false;
            for j in 0..batch_size {
                match batch.status(j) {
                    dbus::DbusStatus::Success => {}
                    dbus::DbusStatus::Failed => {
                        tracing::error!("memory read scan failed");
                        return Err(RiscvError::DbusFailed {
                            address: batch.address(j),
                        });
                    }
                    dbus::DbusStatus::Busy => dbus_busy = true,
                }

                let data = batch.data(j);
                if data & DMCONTROL_INTERRUPT != 0 {
                    execute_busy = true;
                }

                let k = i + j;
                if k == count + 2 {
                    result_value = data & 0xffff_ffff;
                } else if (2..count + 2).contains(&k) && batch.address(j) == 4 {
                    // Element k - 2; its value surfaces two scans after
                    // the kick that fetched it.
                    let offset = size * (k - 2);
                    let bytes = (data as u32).to_le_bytes();
                    buffer[offset..offset + size].copy_from_slice(&bytes[..size]);
                }
            }

            if dbus_busy {
                self.dm.dtm.increase_dbus_busy_delay();
            }
            if execute_busy {
                self.dm.dtm.increase_interrupt_high_delay();
            }
            if dbus_busy || execute_busy {
                self.dm.dtm.wait_for_debugint_clear(false)?;
                tracing::info!(
                    "retrying memory read starting from {:#x} with more delays",
                    address + (size * i) as u64
                );
                // Rebuild the batch so it picks the new pacing up.
                batch = self.dm.batch(MAX_BATCH_SCANS);
            } else {
                i += batch_size;
            }
        }

        if result_value != 0 {
            let last = address + (size * (count - 1)) as u64;
            tracing::warn!(
                "core got exception {:#x} while reading from {:#x}",
                result_value,
                last
            );
            if count > 1 {
                tracing::warn!(
                    "it may have failed anywhere between {:#x} and {:#x}",
                    address,
                    last
                );
            }
            return Err(RiscvError::Exception {
                code: result_value as u32,
            });
        }

        Ok(())
    }

    fn stage_write_program(&mut self, size: usize) -> Result<(), RiscvError> {
        // Per-element program: pick the value up from the data word,
        // store it through t0, advance t0.
        self.dm.cache_set32(0, assembly::lw(S0, ZERO, DATA_OFFSET));
        let store = match size {
            1 => assembly::sb(S0, T0, 0),
            2 => assembly::sh(S0, T0, 0),
            _ => assembly::sw(S0, T0, 0),
        };
        self.dm.cache_set32(1, store);
        self.dm.cache_set32(2, assembly::addi(T0, T0, size as i16));
        self.dm.cache_set_jump(3);
        self.dm.cache_write(None, false)
    }

    /// Write `count` elements of `size` bytes starting at `address`.
    pub fn write_memory(
        &mut self,
        address: u64,
        size: u32,
        count: u32,
        buffer: &[u8],
    ) -> Result<(), RiscvError> {
        if !matches!(size, 1 | 2 | 4) {
            return Err(RiscvError::UnsupportedAccessSize(size));
        }
        self.dm.ensure_slotted_xlen()?;

        let size = size as usize;
        let count = count as usize;
        assert!(buffer.len() >= size * count);

        tracing::debug!("write {} x {} bytes to {:#x}", count, size, address);

        // T0 walks the target addresses; park the caller's value first.
        self.dm.cache_set_store(0, T0, Slot::One);
        self.dm.cache_set_load(1, T0, Slot::Zero);
        self.dm.cache_set_jump(2);
        self.dm.cache_set(Slot::Zero, address);
        let slot1 = self.dm.slot_offset(Slot::One);
        self.dm.cache_write(Some(slot1), true)?;

        let saved_t0 = self.dm.cache_get(Slot::One)?;

        self.stage_write_program(size)?;

        let exception_word = self.dm.dramsize() - 1;
        let mut result_value: u64 = 0x777;

        let mut batch = self.dm.batch(MAX_BATCH_SCANS);
        let mut i = 0usize;
        while i < count + 2 {
            let batch_size = (count + 2 - i).min(MAX_BATCH_SCANS);
            batch.reset();

            for j in 0..batch_size {
                let k = i + j;
                if k >= count {
                    // Check for an exception; read twice so the second
                    // scan pushes the first one's answer out.
                    batch.add_read32(exception_word, false);
                } else {
                    let offset = size * k;
                    let mut bytes = [0u8; 4];
                    bytes[..size].copy_from_slice(&buffer[offset..offset + size]);
                    batch.add_write32(4, u32::from_le_bytes(bytes), true);
                }
            }

            self.dm.dtm.run_batch(&mut batch)?;

            let mut dbus_busy = false;
            let mut execute_busy = false;
            for j in 0..batch_size {
                match batch.status(j) {
                    dbus::DbusStatus::Success => {}
                    dbus::DbusStatus::Failed => {
                        tracing::error!("memory write scan failed");
                        return Err(RiscvError::DbusFailed {
                            address: batch.address(j),
                        });
                    }
                    dbus::DbusStatus::Busy => dbus_busy = true,
                }

                let data = batch.data(j);
                if data & DMCONTROL_INTERRUPT != 0 {
                    execute_busy = true;
                }

                if i + j == count + 1 {
                    result_value = data & 0xffff_ffff;
                }
            }

            if dbus_busy {
                self.dm.dtm.increase_dbus_busy_delay();
            }
            if execute_busy {
                self.dm.dtm.increase_interrupt_high_delay();
            }
            if dbus_busy || execute_busy {
                self.dm.dtm.wait_for_debugint_clear(false)?;
                tracing::info!(
                    "retrying memory write starting from {:#x} with more delays",
                    address + (size * i) as u64
                );

                // Put t0 back where this batch expects it, then restage
                // the program the reload clobbered.
                self.dm.write_gpr(T0, address + (size * i) as u64)?;
                self.stage_write_program(size)?;
                // Rebuild the batch so it picks the new pacing up.
                batch = self.dm.batch(MAX_BATCH_SCANS);
            } else {
                i += batch_size;
            }
        }

        if result_value != 0 {
            let last = address + (size * (count - 1)) as u64;
            tracing::warn!(
                "core got exception {:#x} while writing to {:#x}",
                result_value,
                last
            );
            if count > 1 {
                tracing::warn!(
                    "it may have failed anywhere between {:#x} and {:#x}",
                    address,
                    last
                );
            }
            return Err(RiscvError::Exception {
                code: result_value as u32,
            });
        }

        // Restore the caller's t0.
        self.dm.write_gpr(T0, saved_t0)?;

        Ok(())
    }
}
