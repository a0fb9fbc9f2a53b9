//! Bit-level layout of a debug bus scan word.
//!
//! A dbus scan shifts `addrbits + 2 + 34` bits through the TAP, LSB first:
//!
//! ```text
//! [0 .. 1]        op       2 bits
//! [2 .. 35]       data     34 bits
//! [36 .. 36+a-1]  address  a = addrbits
//! ```
//!
//! The top two data bits are the debug module's `haltnot` and `interrupt`
//! flags, which piggyback on every transaction. All packing operates on
//! bit offsets into little-endian bitstreams, never on native integers,
//! so the layout is independent of host endianness.

use bitvec::prelude::*;

/// Offset of the op field in a dbus scan word.
pub const DBUS_OP_START: usize = 0;
/// Width of the op field.
pub const DBUS_OP_SIZE: usize = 2;
/// Offset of the data field.
pub const DBUS_DATA_START: usize = 2;
/// Width of the data field, including the haltnot and interrupt bits.
pub const DBUS_DATA_SIZE: usize = 34;
/// Offset of the address field. Its width is the session's `addrbits`.
pub const DBUS_ADDRESS_START: usize = 36;

/// `haltnot` flag, bit 32 of the 34-bit data field.
pub const DMCONTROL_HALTNOT: u64 = 1 << 32;
/// `interrupt` flag, bit 33 of the 34-bit data field.
pub const DMCONTROL_INTERRUPT: u64 = 1 << 33;

/// Dbus address of the `dmcontrol` register.
pub const DMCONTROL: u16 = 0x10;
/// Dbus address of the `dminfo` register.
pub const DMINFO: u16 = 0x11;

/// Memory address a halting hart stores its id to, telling the debug
/// module to raise `haltnot`.
pub const SETHALTNOT: u16 = 0x10c;

/// Base address the debug ROM occupies in the hart's address space.
pub const DEBUG_ROM_START: u32 = 0x800;
/// Debug ROM entry an injected program jumps to when it is done.
pub const DEBUG_ROM_RESUME: u32 = 0x804;
/// Debug ROM entry the hart traps to on an exception in Debug RAM.
pub const DEBUG_ROM_EXCEPTION: u32 = 0x808;
/// Base address Debug RAM occupies in the hart's address space.
pub const DEBUG_RAM_START: u32 = 0x400;

/// Total number of bits in a dbus scan word for a given address width.
pub fn scan_bits(addrbits: u32) -> usize {
    DBUS_OP_SIZE + DBUS_DATA_SIZE + addrbits as usize
}

/// Maps a Debug RAM word index to its dbus address. The first sixteen
/// words sit at 0x00..0x0f, the rest start over at 0x40.
pub fn dram_address(index: usize) -> u16 {
    if index < 0x10 {
        index as u16
    } else {
        (0x40 + index - 0x10) as u16
    }
}

/// Maps a dbus address back to the Debug RAM word it belongs to, if any.
pub fn dram_index(address: u16) -> Option<usize> {
    match address {
        0x00..=0x0f => Some(address as usize),
        0x40..=0x6f => Some(0x10 + address as usize - 0x40),
        _ => None,
    }
}

/// Operations encodable in the op field of an outgoing scan.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DbusOp {
    /// Do nothing; used to push out the previous transaction's result.
    Nop = 0,
    /// Read the addressed word.
    Read = 1,
    /// Write the data field to the addressed word.
    Write = 2,
}

/// Completion status returned in the op field of an incoming scan.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DbusStatus {
    /// The previous transaction completed.
    Success = 0,
    /// The previous transaction failed; retrying will not help.
    Failed = 2,
    /// The previous transaction is still in progress and the new one was
    /// dropped.
    Busy = 3,
}

impl DbusStatus {
    /// Decode the two status bits. The value 1 is reserved; treat it as a
    /// hard failure.
    pub fn parse(raw: u8) -> Self {
        match raw & 0x3 {
            0 => DbusStatus::Success,
            3 => DbusStatus::Busy,
            _ => DbusStatus::Failed,
        }
    }
}

/// Pack one outgoing scan word into `out`, which must hold at least
/// [`scan_bits`] bits.
pub fn pack_scan(out: &mut BitSlice<u8, Lsb0>, op: DbusOp, data: u64, address: u16, addrbits: u32) {
    out[DBUS_OP_START..DBUS_OP_START + DBUS_OP_SIZE].store_le(op as u8);
    out[DBUS_DATA_START..DBUS_DATA_START + DBUS_DATA_SIZE].store_le(data);
    out[DBUS_ADDRESS_START..DBUS_ADDRESS_START + addrbits as usize].store_le(address);
}

/// Status bits of an incoming scan word.
pub fn unpack_status(bits: &BitSlice<u8, Lsb0>) -> DbusStatus {
    DbusStatus::parse(bits[DBUS_OP_START..DBUS_OP_START + DBUS_OP_SIZE].load_le::<u8>())
}

/// Full 34-bit data field of an incoming scan word, flags included.
pub fn unpack_data(bits: &BitSlice<u8, Lsb0>) -> u64 {
    bits[DBUS_DATA_START..DBUS_DATA_START + DBUS_DATA_SIZE].load_le::<u64>()
}

/// Echoed address field of an incoming scan word.
pub fn unpack_address(bits: &BitSlice<u8, Lsb0>, addrbits: u32) -> u16 {
    bits[DBUS_ADDRESS_START..DBUS_ADDRESS_START + addrbits as usize].load_le::<u16>()
}

#[cfg(test)]
mod test {
    use super::*;

    fn roundtrip(op: DbusOp, data: u64, address: u16, addrbits: u32) {
        let mut buf = bitvec![u8, Lsb0; 0; scan_bits(addrbits)];
        pack_scan(&mut buf, op, data, address, addrbits);

        let raw_op = buf[DBUS_OP_START..DBUS_OP_START + DBUS_OP_SIZE].load_le::<u8>();
        assert_eq!(raw_op, op as u8);
        assert_eq!(unpack_data(&buf), data);
        assert_eq!(unpack_address(&buf, addrbits), address);
    }

    #[test]
    fn pack_unpack_roundtrip() {
        for &addrbits in &[1u32, 5, 8, 15] {
            let addr_max = (1u32 << addrbits) - 1;
            for &op in &[DbusOp::Nop, DbusOp::Read, DbusOp::Write] {
                for &data in &[0u64, 1, 0xdead_beef, (1 << 34) - 1] {
                    for &address in &[0u16, 1, addr_max as u16 / 2, addr_max as u16] {
                        roundtrip(op, data, address, addrbits);
                    }
                }
            }
        }
    }

    #[test]
    fn flags_land_in_the_top_data_bits() {
        let mut buf = bitvec![u8, Lsb0; 0; scan_bits(5)];
        pack_scan(
            &mut buf,
            DbusOp::Write,
            DMCONTROL_INTERRUPT | DMCONTROL_HALTNOT | 0x1234,
            0x4,
            5,
        );

        // haltnot is word bit 34, interrupt is word bit 35
        assert!(buf[34]);
        assert!(buf[35]);
        assert_eq!(unpack_data(&buf) & 0xffff_ffff, 0x1234);
    }

    #[test]
    fn dram_addresses_wrap_at_sixteen() {
        assert_eq!(dram_address(0), 0x00);
        assert_eq!(dram_address(15), 0x0f);
        assert_eq!(dram_address(16), 0x40);
        assert_eq!(dram_address(20), 0x44);
    }
}
