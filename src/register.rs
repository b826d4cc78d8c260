//! The four registers of the ReTI machine, together with the 2-bit codes by which
//! instructions refer to them.

use std::ops::{Index, IndexMut};

use num_enum::IntoPrimitive;
use strum_macros::{Display as StrumDisplay, EnumIter, EnumString};

use crate::bytecode::Word;

/**
  A register as named by an instruction. The discriminant is the 2-bit register code used in
  both the source and the destination field of an instruction word. The order is fixed by
  the instruction format, so do not reorder the variants.
*/
#[derive(
  StrumDisplay, EnumString, EnumIter, IntoPrimitive,
  Clone,        Copy,       Eq,       PartialEq,     Debug, Hash
)]
#[strum(serialize_all = "UPPERCASE")]
#[repr(u8)]
pub enum Register {
  Pc,
  In1,
  In2,
  Acc,
}

impl Register {
  /// The 2-bit code of the register.
  pub fn code(&self) -> Word {
    Into::<u8>::into(*self) as Word
  }

  /// Only the two lowest bits of `bits` are looked at, so every value names a register.
  pub fn from_code(bits: Word) -> Register {
    match bits & 3 {
      0 => Register::Pc,
      1 => Register::In1,
      2 => Register::In2,
      _ => Register::Acc
    }
  }
}

/// The register file. Every register is a 32 bit word and starts out as zero.
#[derive(Copy, Clone, Default, Eq, PartialEq, Debug)]
pub struct Registers([Word; 4]);

impl Registers {
  pub fn new() -> Registers {
    Registers::default()
  }
}

impl Index<Register> for Registers {
  type Output = Word;

  fn index(&self, register: Register) -> &Word {
    &self.0[register.code() as usize]
  }
}

impl IndexMut<Register> for Registers {
  fn index_mut(&mut self, register: Register) -> &mut Word {
    &mut self.0[register.code() as usize]
  }
}
