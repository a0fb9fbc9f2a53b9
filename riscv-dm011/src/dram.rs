//! Shadow model of the debug module's instruction RAM.
//!
//! Debug RAM is a handful of 32-bit words the debugger fills with short
//! programs and data. The driver keeps a write-back shadow of it so that
//! repeated injections only scan out the words that actually changed.

use crate::dbus::DEBUG_RAM_START;

/// Number of cache lines the shadow manages. Debug modules may advertise
/// more RAM, but everything past this is left unmanaged.
pub const DRAM_CACHE_SIZE: usize = 16;

/// One shadowed Debug RAM word.
///
/// A line may only be dirty while it is valid.
#[derive(Copy, Clone, Debug, Default)]
pub struct CacheLine {
    /// Shadow of the word's content.
    pub data: u32,
    /// The shadow matches what the driver believes the hardware holds.
    pub valid: bool,
    /// The shadow has been modified and not yet flushed.
    pub dirty: bool,
}

/// An xlen-agnostic name for a Debug RAM data word.
///
/// Words 0..=3 hold the injected program, so data slots start at word 4.
/// On a 64-bit hart a slot covers two consecutive words.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Slot {
    /// First data slot, used to pass a value in or out of a program.
    Zero,
    /// Second data slot.
    One,
    /// The slot overlapping the end of Debug RAM. The debug ROM keeps the
    /// hart's live `s1` there, and the very last word doubles as the
    /// exception report.
    Last,
}

impl Slot {
    /// Word index of this slot for the given register width.
    pub fn offset(self, xlen: u32, dramsize: usize) -> usize {
        match (self, xlen) {
            (Slot::Zero, _) => 4,
            (Slot::One, 32) => 5,
            (Slot::One, _) => 6,
            (Slot::Last, 32) => dramsize - 1,
            (Slot::Last, _) => dramsize - 2,
        }
    }

    /// Address of this slot in the hart's address space.
    pub fn address(self, xlen: u32, dramsize: usize) -> u32 {
        dram_word_address(self.offset(xlen, dramsize))
    }
}

/// Address of a Debug RAM word in the hart's address space.
pub fn dram_word_address(index: usize) -> u32 {
    DEBUG_RAM_START + 4 * index as u32
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn slot_offsets_follow_xlen() {
        assert_eq!(Slot::Zero.offset(32, 16), 4);
        assert_eq!(Slot::Zero.offset(64, 16), 4);
        assert_eq!(Slot::One.offset(32, 16), 5);
        assert_eq!(Slot::One.offset(64, 16), 6);
        assert_eq!(Slot::Last.offset(32, 16), 15);
        assert_eq!(Slot::Last.offset(64, 16), 14);
    }

    #[test]
    fn slot_addresses_are_word_scaled() {
        assert_eq!(Slot::Zero.address(32, 16), DEBUG_RAM_START + 16);
        assert_eq!(Slot::Last.address(32, 16), DEBUG_RAM_START + 60);
    }
}
