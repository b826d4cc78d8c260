/*!

  ReTI uses a 32 bit word for everything: registers, data cells and instructions. Every
  instruction is exactly one word. Words are stored little-endian in every binary artifact
  (assembled code, data files, data dumps).

  The layout of an instruction word is

    [Family:2][Mode:2..4][Source:2][Destination:2][Immediate:24]
     31    30  29                   27   26        25   24      23          0

  where the two most significant bits select the opcode family (Compute `00`, Load `01`,
  Store `10`, Jump `11`). The family determines how many of the following bits belong
  to the opcode:

    Load, Store:  4 bits (family + 2 mode bits), bits 27..26 are the source register
    Compute:      6 bits (family + 4 mode bits)
    Jump:         5 bits (family + 3 condition bits), bits 26..24 are unused

  Only `MOVE` uses the source field. Fields an opcode does not use are written as zero and
  ignored when decoding.

  Unlike the bytecode of a stack machine, the operands an instruction carries depend on
  its opcode, so `Instruction` has one variant per opcode carrying exactly the fields that
  opcode uses. `Opcode` is the payload-free counterpart used by the assembler's mnemonic
  lookup and by the encoder's field layout.

*/

mod binary;
mod instruction;
mod assembly;
mod disassembly;

pub use binary::{
  encode_instruction, try_decode_instruction, normalize_word, read_words, words_from_bytes,
  write_words, write_sparse_words, words_to_bytes, opcode_of,
  IMMEDIATE_MASK, SIGN_BIT, OPCODE_SHIFT, SOURCE_SHIFT, DESTINATION_SHIFT
};
pub use instruction::Instruction;
pub use assembly::{assemble, parse_assembly};
pub use disassembly::{
  disassemble, listing_line, render_disassembly, DISASSEMBLY_WIDTH, LISTING_COLUMN
};

use strum_macros::{Display as StrumDisplay, EnumIter, EnumString, IntoStaticStr};
use num_enum::{TryFromPrimitive, IntoPrimitive};

// If you change this you must also change `encode_instruction` and `try_decode_instruction`.
pub type Word = u32;

/**
  Opcodes of the machine.

  The discriminant of each opcode is its 6 bit prefix, that is, bits 31..26 of the instruction
  word with the register bits that may share those positions set to zero. Decoding masks the
  top six bits of a word according to the family and converts the result with `try_from`;
  the six unassigned compute patterns therefore fail to convert and decode as illegal.
  Consequently, the values below are significant.
*/
#[derive(
  StrumDisplay, IntoStaticStr, EnumString, EnumIter, TryFromPrimitive, IntoPrimitive,
  Clone,        Copy,          Eq,         PartialEq, Debug,           Hash
)]
#[strum(serialize_all = "UPPERCASE")]
#[repr(u8)]
pub enum Opcode {
  // Compute family `00` //
  SubI    = 0b00_0010, // SUBI D i
  AddI    = 0b00_0011, // ADDI D i
  OplusI  = 0b00_0100, // OPLUSI D i
  OrI     = 0b00_0101, // ORI D i
  AndI    = 0b00_0110, // ANDI D i
  Sub     = 0b00_1010, // SUB D i
  Add     = 0b00_1011, // ADD D i
  Oplus   = 0b00_1100, // OPLUS D i
  Or      = 0b00_1101, // OR D i
  And     = 0b00_1110, // AND D i

  // Load family `01` //
  Load    = 0b01_0000, // LOAD D i
  LoadIn1 = 0b01_0100, // LOADIN1 D i
  LoadIn2 = 0b01_1000, // LOADIN2 D i
  LoadI   = 0b01_1100, // LOADI D i

  // Store family `10` //
  Store    = 0b10_0000, // STORE i
  StoreIn1 = 0b10_0100, // STOREIN1 i
  StoreIn2 = 0b10_1000, // STOREIN2 i
  Move     = 0b10_1100, // MOVE S D

  // Jump family `11` //
  Nop     = 0b11_0000, // NOP
  #[strum(to_string = "JUMPGT", serialize = "JUMP>")]
  JumpGt  = 0b11_0010, // JUMPGT i
  #[strum(to_string = "JUMPEQ", serialize = "JUMP=")]
  JumpEq  = 0b11_0100, // JUMPEQ i
  #[strum(to_string = "JUMPGE", serialize = "JUMP>=")]
  JumpGe  = 0b11_0110, // JUMPGE i
  #[strum(to_string = "JUMPLT", serialize = "JUMP<")]
  JumpLt  = 0b11_1000, // JUMPLT i
  #[strum(to_string = "JUMPNE", serialize = "JUMP!=")]
  JumpNe  = 0b11_1010, // JUMPNE i
  #[strum(to_string = "JUMPLE", serialize = "JUMP<=")]
  JumpLe  = 0b11_1100, // JUMPLE i
  Jump    = 0b11_1110, // JUMP i
}

/// The top-level instruction category selected by the two most significant bits.
#[derive(Clone, Copy, Eq, PartialEq, Debug, Hash)]
pub enum Family {
  Compute,
  Load,
  Store,
  Jump
}

/// How the 24 bit immediate of an instruction is read and written as a numeral.
#[derive(Clone, Copy, Eq, PartialEq, Debug, Hash)]
pub enum Numeral {
  /// Two's complement, rendered in signed decimal.
  Signed,
  /// An address or literal, rendered in unsigned decimal.
  Unsigned,
  /// A bit pattern, rendered in `0x` hexadecimal.
  Hexadecimal
}

impl Family {
  /// The family of an instruction word.
  pub fn of(word: Word) -> Family {
    match word >> 30 {
      0b00 => Family::Compute,
      0b01 => Family::Load,
      0b10 => Family::Store,
      _    => Family::Jump
    }
  }

  /// The bits of the 6 bit prefix that belong to the opcode in this family.
  pub fn prefix_mask(&self) -> u8 {
    match self {
      Family::Compute             => 0b11_1111,
      Family::Load | Family::Store => 0b11_1100,
      Family::Jump                => 0b11_1110
    }
  }
}

impl Opcode {
  pub fn code(&self) -> u8 {
    Into::<u8>::into(*self)
  }

  pub fn mnemonic(&self) -> &'static str {
    (*self).into()
  }

  pub fn family(&self) -> Family {
    Family::of((self.code() as Word) << OPCODE_SHIFT)
  }

  /// Only `MOVE` reads a source register.
  pub fn has_source(&self) -> bool {
    *self == Opcode::Move
  }

  pub fn has_destination(&self) -> bool {
    match self.family() {
      Family::Compute | Family::Load => true,
      Family::Store                  => self.has_source(),
      Family::Jump                   => false
    }
  }

  pub fn has_immediate(&self) -> bool {
    !matches!(self, Opcode::Move | Opcode::Nop)
  }

  /// The numeral convention of the immediate, or `None` if the opcode has no immediate.
  pub fn numeral(&self) -> Option<Numeral> {
    if !self.has_immediate() {
      return None;
    }
    let numeral =
      match self {
        | Opcode::OplusI | Opcode::OrI | Opcode::AndI
        | Opcode::Oplus  | Opcode::Or  | Opcode::And  => Numeral::Hexadecimal,

        | Opcode::SubI | Opcode::AddI
        | Opcode::Sub  | Opcode::Add  => Numeral::Signed,

        _ if self.family() == Family::Jump => Numeral::Signed,

        _ => Numeral::Unsigned
      };
    Some(numeral)
  }
}


#[cfg(test)]
mod tests {
  use super::*;
  use std::convert::TryFrom;
  use std::str::FromStr;
  use strum::IntoEnumIterator;

  #[test]
  fn twenty_six_opcodes(){
    assert_eq!(Opcode::iter().count(), 26);
  }

  #[test]
  fn six_reserved_compute_patterns(){
    let reserved: Vec<u8> =
      (0u8..16).filter(|mode| Opcode::try_from(*mode).is_err()).collect();
    assert_eq!(reserved, vec![0b0000, 0b0001, 0b0111, 0b1000, 0b1001, 0b1111]);
  }

  #[test]
  fn prefixes_are_canonical(){
    for opcode in Opcode::iter() {
      let mask = opcode.family().prefix_mask();
      assert_eq!(opcode.code() & mask, opcode.code(), "{}", opcode);
    }
  }

  #[test]
  fn families(){
    assert_eq!(Opcode::AddI.family(), Family::Compute);
    assert_eq!(Opcode::LoadIn2.family(), Family::Load);
    assert_eq!(Opcode::Move.family(), Family::Store);
    assert_eq!(Opcode::Nop.family(), Family::Jump);
  }

  #[test]
  fn mnemonics(){
    assert_eq!(Opcode::LoadIn1.mnemonic(), "LOADIN1");
    assert_eq!(Opcode::OplusI.mnemonic(), "OPLUSI");
    assert_eq!(Opcode::JumpLt.mnemonic(), "JUMPLT");
    assert_eq!(Opcode::JumpLt.to_string(), "JUMPLT");
    assert_eq!(Opcode::from_str("JUMPLT"), Ok(Opcode::JumpLt));
    assert_eq!(Opcode::from_str("JUMP<"), Ok(Opcode::JumpLt));
    assert_eq!(Opcode::from_str("JUMP<="), Ok(Opcode::JumpLe));
    assert_eq!(Opcode::from_str("JUMP!="), Ok(Opcode::JumpNe));
    assert_eq!(Opcode::from_str("STOREIN2"), Ok(Opcode::StoreIn2));
    assert!(Opcode::from_str("Load").is_err());
    assert!(Opcode::from_str("HALT").is_err());
  }

  #[test]
  fn operand_shapes(){
    assert!(Opcode::Move.has_source() && Opcode::Move.has_destination());
    assert!(!Opcode::Move.has_immediate());
    assert!(!Opcode::Store.has_destination() && Opcode::Store.has_immediate());
    assert!(!Opcode::Nop.has_destination() && !Opcode::Nop.has_immediate());
    assert!(!Opcode::Jump.has_destination() && Opcode::Jump.has_immediate());
    assert!(Opcode::LoadI.has_destination() && !Opcode::LoadI.has_source());
  }

  #[test]
  fn numerals(){
    assert_eq!(Opcode::SubI.numeral(), Some(Numeral::Signed));
    assert_eq!(Opcode::Add.numeral(), Some(Numeral::Signed));
    assert_eq!(Opcode::JumpNe.numeral(), Some(Numeral::Signed));
    assert_eq!(Opcode::Or.numeral(), Some(Numeral::Hexadecimal));
    assert_eq!(Opcode::AndI.numeral(), Some(Numeral::Hexadecimal));
    assert_eq!(Opcode::LoadIn1.numeral(), Some(Numeral::Unsigned));
    assert_eq!(Opcode::StoreIn2.numeral(), Some(Numeral::Unsigned));
    assert_eq!(Opcode::Move.numeral(), None);
    assert_eq!(Opcode::Nop.numeral(), None);
  }
}
