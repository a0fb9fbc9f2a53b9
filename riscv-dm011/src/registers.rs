//! The register file exposed to the remote debugger.
//!
//! Index order matches the remote protocol exactly: 32 GPRs, the program
//! counter, 32 FPRs, 4096 CSRs and the privilege pseudo register.

/// Index of `x0`.
pub const REG_XPR0: u32 = 0;
/// Index of `x31`.
pub const REG_XPR31: u32 = 31;
/// Index of the program counter.
pub const REG_PC: u32 = 32;
/// Index of `f0`.
pub const REG_FPR0: u32 = 33;
/// Index of `f31`.
pub const REG_FPR31: u32 = 64;
/// Index of `csr0`.
pub const REG_CSR0: u32 = 65;
/// Index of `csr4095`.
pub const REG_CSR4095: u32 = 4160;
/// Index of the privilege pseudo register.
pub const REG_PRIV: u32 = 4161;
/// Total number of registers the remote debugger sees.
pub const REG_COUNT: usize = 4162;

/// One architectural register as presented to the remote debugger.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegisterDescription {
    /// Protocol name (`x5`, `pc`, `csr772`, ...).
    pub name: String,
    /// Width in bits.
    pub bits: u32,
    /// Protocol index.
    pub index: u32,
}

/// The complete register list for one hart, built once xlen is known.
#[derive(Debug, Default)]
pub struct RegisterFile {
    regs: Vec<RegisterDescription>,
}

impl RegisterFile {
    /// Build the list for a hart of the given register width.
    pub fn new(xlen: u32) -> Self {
        let mut regs = Vec::with_capacity(REG_COUNT);

        for i in 0..32 {
            regs.push(RegisterDescription {
                name: format!("x{i}"),
                bits: xlen,
                index: i,
            });
        }
        regs.push(RegisterDescription {
            name: "pc".into(),
            bits: xlen,
            index: REG_PC,
        });
        for i in 0..32 {
            regs.push(RegisterDescription {
                name: format!("f{i}"),
                bits: xlen,
                index: REG_FPR0 + i,
            });
        }
        for i in 0..4096 {
            regs.push(RegisterDescription {
                name: format!("csr{i}"),
                bits: xlen,
                index: REG_CSR0 + i,
            });
        }
        regs.push(RegisterDescription {
            name: "priv".into(),
            bits: 8,
            index: REG_PRIV,
        });

        RegisterFile { regs }
    }

    /// Look up a register by protocol index.
    pub fn get(&self, index: u32) -> Option<&RegisterDescription> {
        self.regs.get(index as usize)
    }

    /// All registers in protocol order.
    pub fn iter(&self) -> impl Iterator<Item = &RegisterDescription> {
        self.regs.iter()
    }

    /// Number of registers.
    pub fn len(&self) -> usize {
        self.regs.len()
    }

    /// True before `new` has run, when no registers are known yet.
    pub fn is_empty(&self) -> bool {
        self.regs.is_empty()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn list_matches_the_remote_protocol_order() {
        let file = RegisterFile::new(64);

        assert_eq!(file.len(), REG_COUNT);
        assert_eq!(file.get(0).unwrap().name, "x0");
        assert_eq!(file.get(31).unwrap().name, "x31");
        assert_eq!(file.get(REG_PC).unwrap().name, "pc");
        assert_eq!(file.get(REG_FPR0).unwrap().name, "f0");
        assert_eq!(file.get(REG_FPR31).unwrap().name, "f31");
        assert_eq!(file.get(REG_CSR0).unwrap().name, "csr0");
        assert_eq!(file.get(REG_CSR4095).unwrap().name, "csr4095");
        assert_eq!(file.get(REG_PRIV).unwrap().name, "priv");
        assert!(file.get(REG_PRIV + 1).is_none());
    }

    #[test]
    fn widths_track_xlen_except_priv() {
        let file = RegisterFile::new(32);

        assert!(file.iter().take(REG_PRIV as usize).all(|r| r.bits == 32));
        assert_eq!(file.get(REG_PRIV).unwrap().bits, 8);
    }
}
