use core::ops::{Index, IndexMut};

/// General-purpose registers in hardware encoding order.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
#[repr(u8)]
pub enum Gpr {
    Rax = 0,
    Rcx = 1,
    Rdx = 2,
    Rbx = 3,
    Rsp = 4,
    Rbp = 5,
    Rsi = 6,
    Rdi = 7,
    R8 = 8,
    R9 = 9,
    R10 = 10,
    R11 = 11,
    R12 = 12,
    R13 = 13,
    R14 = 14,
    R15 = 15,
}

impl Gpr {
    pub const COUNT: usize = 16;

    pub const ALL: [Self; Self::COUNT] = [
        Self::Rax,
        Self::Rcx,
        Self::Rdx,
        Self::Rbx,
        Self::Rsp,
        Self::Rbp,
        Self::Rsi,
        Self::Rdi,
        Self::R8,
        Self::R9,
        Self::R10,
        Self::R11,
        Self::R12,
        Self::R13,
        Self::R14,
        Self::R15,
    ];
}

/// A full GPR file, zeroed on construction.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Default)]
pub struct GeneralPurposeRegisters([u64; Gpr::COUNT]);

impl GeneralPurposeRegisters {
    #[must_use]
    pub const fn zeroed() -> Self {
        Self([0; Gpr::COUNT])
    }

    #[must_use]
    pub const fn get(&self, reg: Gpr) -> u64 {
        self.0[reg as usize]
    }

    pub const fn set(&mut self, reg: Gpr, value: u64) {
        self.0[reg as usize] = value;
    }

    /// Registers holding a non-zero value.
    pub fn non_zero(&self) -> impl Iterator<Item = (Gpr, u64)> + '_ {
        Gpr::ALL
            .into_iter()
            .map(|r| (r, self.get(r)))
            .filter(|&(_, v)| v != 0)
    }

    #[must_use]
    pub const fn as_array(&self) -> &[u64; Gpr::COUNT] {
        &self.0
    }
}

impl Index<Gpr> for GeneralPurposeRegisters {
    type Output = u64;

    fn index(&self, reg: Gpr) -> &u64 {
        &self.0[reg as usize]
    }
}

impl IndexMut<Gpr> for GeneralPurposeRegisters {
    fn index_mut(&mut self, reg: Gpr) -> &mut u64 {
        &mut self.0[reg as usize]
    }
}
