//! Error types. The codec itself is total and never fails; everything that reads external
//! input or runs a program reports failure through one of these.

use std::io;

use thiserror::Error;

use crate::bytecode::Word;

/// Why a line of assembly was rejected.
#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum AssemblyErrorKind {
  #[error("invalid instruction '{0}'")]
  UnknownMnemonic(String),
  #[error("invalid source register '{0}'")]
  InvalidSource(String),
  #[error("invalid destination register '{0}'")]
  InvalidDestination(String),
  #[error("invalid immediate '{0}'")]
  InvalidImmediate(String),
  #[error("immediate '{token}' out of range for {mnemonic}")]
  ImmediateOutOfRange { mnemonic: &'static str, token: String },
  #[error("{mnemonic} does not take a negative immediate '{token}'")]
  NegativeImmediate { mnemonic: &'static str, token: String },
  #[error("{mnemonic} expects a {operand}")]
  MissingOperand { mnemonic: &'static str, operand: &'static str },
  #[error("unexpected '{0}' after instruction")]
  UnexpectedToken(String),
  #[error("unexpected empty line")]
  EmptyLine,
  #[error("missing new-line after carriage-return")]
  MissingLineFeed,
}

/// A positioned assembly error. Lines count from 1.
#[derive(Debug, Clone, Eq, PartialEq, Error)]
#[error("parse error: at line {line}: {kind}")]
pub struct AssemblyError {
  pub line : usize,
  pub kind : AssemblyErrorKind,
}

/// Errors reading binary word files.
#[derive(Debug, Error)]
pub enum FormatError {
  /// The stream ended 1 to 3 bytes into word number `word` (counting from 0).
  #[error("incomplete word {word}: only {bytes} of 4 bytes present")]
  TruncatedWord { word: usize, bytes: usize },
  #[error(transparent)]
  Io(#[from] io::Error),
}

/// Why a line of a hexadecimal word listing was rejected.
#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum HexErrorKind {
  #[error("invalid empty line")]
  EmptyLine,
  #[error("invalid address")]
  InvalidAddress,
  #[error("expected space after address")]
  MissingSeparator,
  #[error("invalid data")]
  InvalidData,
  #[error("expected new-line after data")]
  TrailingGarbage,
  #[error("address 0x{address:08x} below parsed words 0x{parsed:08x}")]
  AddressBelowParsed { address: Word, parsed: u64 },
  #[error("missing new-line after carriage-return")]
  MissingLineFeed,
}

#[derive(Debug, Clone, Eq, PartialEq, Error)]
#[error("parse error: at line {line}: {kind}")]
pub struct HexError {
  pub line : usize,
  pub kind : HexErrorKind,
}

/// Conditions that abort an emulation run.
#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum EmulationError {
  #[error("illegal instruction 0x{word:08x} at code[0x{index:08x}]")]
  IllegalInstruction { index: Word, word: Word },
  #[error("read uninitialized 'data[0x{address:x}]' at code[0x{pc:08x}]")]
  UninitializedRead { pc: Word, address: Word },
  #[error("can not write 'data[0x{address:x}]' above capacity of {capacity} words")]
  DataCapacity { address: Word, capacity: u64 },
  #[error("{words} data words exceed capacity of {capacity} words")]
  DataTooLarge { words: usize, capacity: u64 },
  #[error("{words} code words exceed capacity of {capacity} words")]
  CodeTooLarge { words: usize, capacity: u64 },
}

/// A malformed instruction count for the random program generator.
#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum CountError {
  #[error("invalid empty instructions")]
  Empty,
  #[error("invalid instructions '{0}'")]
  Invalid(String),
  #[error("instructions '{0}' exceed maximum")]
  TooLarge(String),
}
