use std::fmt::{Display, Formatter};

use super::{Numeral, Opcode, Word, IMMEDIATE_MASK, SIGN_BIT};
use crate::register::Register;

/**
  A decoded instruction. Each variant carries exactly the operands its opcode uses.

  Immediates are stored in the convention of their opcode: signed immediates as `i32` in
  `-0x800000..=0x7fffff`, unsigned and hexadecimal immediates as `Word` in `0..=0xffffff`.
  An instruction holding a value outside of that range is not legal and is truncated to
  24 bits by `encode_instruction`.
*/
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Instruction {
  // Load //
  /// `D = M(i)`
  Load     { destination: Register, immediate: Word },
  /// `D = M(IN1 + i)`
  LoadIn1  { destination: Register, immediate: Word },
  /// `D = M(IN2 + i)`
  LoadIn2  { destination: Register, immediate: Word },
  /// `D = i`
  LoadI    { destination: Register, immediate: Word },

  // Store //
  /// `M(i) = ACC`
  Store    { immediate: Word },
  /// `M(IN1 + i) = ACC`
  StoreIn1 { immediate: Word },
  /// `M(IN2 + i) = ACC`
  StoreIn2 { immediate: Word },
  /// `D = S`
  Move     { source: Register, destination: Register },

  // Compute with immediate //
  SubI     { destination: Register, immediate: i32 },
  AddI     { destination: Register, immediate: i32 },
  OplusI   { destination: Register, immediate: Word },
  OrI      { destination: Register, immediate: Word },
  AndI     { destination: Register, immediate: Word },

  // Compute with memory //
  Sub      { destination: Register, immediate: i32 },
  Add      { destination: Register, immediate: i32 },
  Oplus    { destination: Register, immediate: Word },
  Or       { destination: Register, immediate: Word },
  And      { destination: Register, immediate: Word },

  // Jump //
  Nop,
  JumpGt   { immediate: i32 },
  JumpEq   { immediate: i32 },
  JumpGe   { immediate: i32 },
  JumpLt   { immediate: i32 },
  JumpNe   { immediate: i32 },
  JumpLe   { immediate: i32 },
  Jump     { immediate: i32 },
}

/// Sign extends a 24 bit immediate.
pub(crate) fn sign_extend(bits: Word) -> i32 {
  let bits = bits & IMMEDIATE_MASK;
  match bits & SIGN_BIT {
    0 => bits as i32,
    _ => (bits | !IMMEDIATE_MASK) as i32
  }
}

impl Instruction {

  /**
    Assembles an instruction from its opcode and raw fields. Fields the opcode does not use
    are ignored, and `immediate` is truncated to 24 bits and sign extended if the opcode's
    immediate is signed. This is the single place where the operands of each opcode are
    named, shared by the decoder and the assembler.
  */
  pub fn from_parts(opcode: Opcode, source: Register, destination: Register, immediate: Word)
    -> Instruction
  {
    let unsigned = immediate & IMMEDIATE_MASK;
    let signed   = sign_extend(immediate);

    match opcode {
      Opcode::Load     => Instruction::Load    { destination, immediate: unsigned },
      Opcode::LoadIn1  => Instruction::LoadIn1 { destination, immediate: unsigned },
      Opcode::LoadIn2  => Instruction::LoadIn2 { destination, immediate: unsigned },
      Opcode::LoadI    => Instruction::LoadI   { destination, immediate: unsigned },

      Opcode::Store    => Instruction::Store    { immediate: unsigned },
      Opcode::StoreIn1 => Instruction::StoreIn1 { immediate: unsigned },
      Opcode::StoreIn2 => Instruction::StoreIn2 { immediate: unsigned },
      Opcode::Move     => Instruction::Move     { source, destination },

      Opcode::SubI     => Instruction::SubI   { destination, immediate: signed },
      Opcode::AddI     => Instruction::AddI   { destination, immediate: signed },
      Opcode::OplusI   => Instruction::OplusI { destination, immediate: unsigned },
      Opcode::OrI      => Instruction::OrI    { destination, immediate: unsigned },
      Opcode::AndI     => Instruction::AndI   { destination, immediate: unsigned },

      Opcode::Sub      => Instruction::Sub   { destination, immediate: signed },
      Opcode::Add      => Instruction::Add   { destination, immediate: signed },
      Opcode::Oplus    => Instruction::Oplus { destination, immediate: unsigned },
      Opcode::Or       => Instruction::Or    { destination, immediate: unsigned },
      Opcode::And      => Instruction::And   { destination, immediate: unsigned },

      Opcode::Nop      => Instruction::Nop,
      Opcode::JumpGt   => Instruction::JumpGt { immediate: signed },
      Opcode::JumpEq   => Instruction::JumpEq { immediate: signed },
      Opcode::JumpGe   => Instruction::JumpGe { immediate: signed },
      Opcode::JumpLt   => Instruction::JumpLt { immediate: signed },
      Opcode::JumpNe   => Instruction::JumpNe { immediate: signed },
      Opcode::JumpLe   => Instruction::JumpLe { immediate: signed },
      Opcode::Jump     => Instruction::Jump   { immediate: signed },
    }
  }

  pub fn opcode(&self) -> Opcode {
    match self {
      Instruction::Load     { .. } => Opcode::Load,
      Instruction::LoadIn1  { .. } => Opcode::LoadIn1,
      Instruction::LoadIn2  { .. } => Opcode::LoadIn2,
      Instruction::LoadI    { .. } => Opcode::LoadI,
      Instruction::Store    { .. } => Opcode::Store,
      Instruction::StoreIn1 { .. } => Opcode::StoreIn1,
      Instruction::StoreIn2 { .. } => Opcode::StoreIn2,
      Instruction::Move     { .. } => Opcode::Move,
      Instruction::SubI     { .. } => Opcode::SubI,
      Instruction::AddI     { .. } => Opcode::AddI,
      Instruction::OplusI   { .. } => Opcode::OplusI,
      Instruction::OrI      { .. } => Opcode::OrI,
      Instruction::AndI     { .. } => Opcode::AndI,
      Instruction::Sub      { .. } => Opcode::Sub,
      Instruction::Add      { .. } => Opcode::Add,
      Instruction::Oplus    { .. } => Opcode::Oplus,
      Instruction::Or       { .. } => Opcode::Or,
      Instruction::And      { .. } => Opcode::And,
      Instruction::Nop             => Opcode::Nop,
      Instruction::JumpGt   { .. } => Opcode::JumpGt,
      Instruction::JumpEq   { .. } => Opcode::JumpEq,
      Instruction::JumpGe   { .. } => Opcode::JumpGe,
      Instruction::JumpLt   { .. } => Opcode::JumpLt,
      Instruction::JumpNe   { .. } => Opcode::JumpNe,
      Instruction::JumpLe   { .. } => Opcode::JumpLe,
      Instruction::Jump     { .. } => Opcode::Jump,
    }
  }

  pub fn source(&self) -> Option<Register> {
    match self {
      Instruction::Move { source, .. } => Some(*source),
      _ => None
    }
  }

  pub fn destination(&self) -> Option<Register> {
    match self {
      | Instruction::Load    { destination, .. }
      | Instruction::LoadIn1 { destination, .. }
      | Instruction::LoadIn2 { destination, .. }
      | Instruction::LoadI   { destination, .. }
      | Instruction::Move    { destination, .. }
      | Instruction::SubI    { destination, .. }
      | Instruction::AddI    { destination, .. }
      | Instruction::OplusI  { destination, .. }
      | Instruction::OrI     { destination, .. }
      | Instruction::AndI    { destination, .. }
      | Instruction::Sub     { destination, .. }
      | Instruction::Add     { destination, .. }
      | Instruction::Oplus   { destination, .. }
      | Instruction::Or      { destination, .. }
      | Instruction::And     { destination, .. } => Some(*destination),
      _ => None
    }
  }

  /// The immediate as its 24 bit field value, or `None` if the opcode has no immediate.
  pub fn immediate_bits(&self) -> Option<Word> {
    match self {
      | Instruction::Load     { immediate, .. }
      | Instruction::LoadIn1  { immediate, .. }
      | Instruction::LoadIn2  { immediate, .. }
      | Instruction::LoadI    { immediate, .. }
      | Instruction::Store    { immediate }
      | Instruction::StoreIn1 { immediate }
      | Instruction::StoreIn2 { immediate }
      | Instruction::OplusI   { immediate, .. }
      | Instruction::OrI      { immediate, .. }
      | Instruction::AndI     { immediate, .. }
      | Instruction::Oplus    { immediate, .. }
      | Instruction::Or       { immediate, .. }
      | Instruction::And      { immediate, .. } => Some(*immediate & IMMEDIATE_MASK),

      | Instruction::SubI   { immediate, .. }
      | Instruction::AddI   { immediate, .. }
      | Instruction::Sub    { immediate, .. }
      | Instruction::Add    { immediate, .. }
      | Instruction::JumpGt { immediate }
      | Instruction::JumpEq { immediate }
      | Instruction::JumpGe { immediate }
      | Instruction::JumpLt { immediate }
      | Instruction::JumpNe { immediate }
      | Instruction::JumpLe { immediate }
      | Instruction::Jump   { immediate } => Some((*immediate as Word) & IMMEDIATE_MASK),

      Instruction::Move { .. } | Instruction::Nop => None
    }
  }

  /// Whether every immediate lies in the range of its convention.
  pub fn is_legal(&self) -> bool {
    match (self.opcode().numeral(), self.immediate_bits()) {
      (Some(Numeral::Signed), Some(bits)) => Some(sign_extend(bits)) == self.signed_immediate(),
      (Some(_), Some(bits))               => Some(bits) == self.unsigned_immediate(),
      _                                    => true
    }
  }

  fn signed_immediate(&self) -> Option<i32> {
    match self {
      | Instruction::SubI   { immediate, .. }
      | Instruction::AddI   { immediate, .. }
      | Instruction::Sub    { immediate, .. }
      | Instruction::Add    { immediate, .. }
      | Instruction::JumpGt { immediate }
      | Instruction::JumpEq { immediate }
      | Instruction::JumpGe { immediate }
      | Instruction::JumpLt { immediate }
      | Instruction::JumpNe { immediate }
      | Instruction::JumpLe { immediate }
      | Instruction::Jump   { immediate } => Some(*immediate),
      _ => None
    }
  }

  fn unsigned_immediate(&self) -> Option<Word> {
    match self.signed_immediate() {
      Some(_) => None,
      None    => match self {
        | Instruction::Load     { immediate, .. }
        | Instruction::LoadIn1  { immediate, .. }
        | Instruction::LoadIn2  { immediate, .. }
        | Instruction::LoadI    { immediate, .. }
        | Instruction::Store    { immediate }
        | Instruction::StoreIn1 { immediate }
        | Instruction::StoreIn2 { immediate }
        | Instruction::OplusI   { immediate, .. }
        | Instruction::OrI      { immediate, .. }
        | Instruction::AndI     { immediate, .. }
        | Instruction::Oplus    { immediate, .. }
        | Instruction::Or       { immediate, .. }
        | Instruction::And      { immediate, .. } => Some(*immediate),
        _ => None
      }
    }
  }
}

/// The canonical assembly text of the instruction, which is also the disassembler's output.
impl Display for Instruction {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    let opcode = self.opcode();
    write!(f, "{}", opcode)?;

    if let Some(source) = self.source() {
      write!(f, " {}", source)?;
    }
    if let Some(destination) = self.destination() {
      write!(f, " {}", destination)?;
    }
    if let (Some(numeral), Some(bits)) = (opcode.numeral(), self.immediate_bits()) {
      match numeral {
        Numeral::Signed      => write!(f, " {}", sign_extend(bits))?,
        Numeral::Unsigned    => write!(f, " {}", bits)?,
        Numeral::Hexadecimal => write!(f, " 0x{:x}", bits)?,
      }
    }
    Ok(())
  }
}
