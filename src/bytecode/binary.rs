/*!
  This module is responsible for the encoding and decoding of binary instructions, and for
  reading and writing streams of little-endian words.

*/
use std::convert::TryFrom;
use std::io::{Read, Write};

use super::{Family, Instruction, Opcode, Word};
use crate::error::FormatError;
use crate::register::Register;

// If you change these you must also change the module documentation in `bytecode`.
pub const OPCODE_SHIFT      : u32  = 26;
pub const SOURCE_SHIFT      : u32  = 26;
pub const DESTINATION_SHIFT : u32  = 24;
pub const IMMEDIATE_MASK    : Word = 0x00FF_FFFF;
pub const SIGN_BIT          : Word = 0x0080_0000;

const WORD_BYTES: usize = 4;
/// Zero words written at once when filling a gap.
const GAP_CHUNK: usize = 4096;

/// The opcode of a word, or `None` if the word is one of the reserved compute patterns.
pub fn opcode_of(word: Word) -> Option<Opcode> {
  let prefix = (word >> OPCODE_SHIFT) as u8;
  let mask   = Family::of(word).prefix_mask();
  Opcode::try_from(prefix & mask).ok()
}

/**
  Decodes a word. Total over all 32 bit inputs: a word is either a legal instruction or
  `None` for an illegal one. Fields the opcode does not use are ignored.
*/
pub fn try_decode_instruction(word: Word) -> Option<Instruction> {
  let opcode      = opcode_of(word)?;
  let source      = Register::from_code(word >> SOURCE_SHIFT);
  let destination = Register::from_code(word >> DESTINATION_SHIFT);

  Some(Instruction::from_parts(opcode, source, destination, word))
}

/**
  Encodes the instruction into its word. Fields the opcode does not use are zero. Immediates
  outside of the opcode's range are truncated to 24 bits.
*/
pub fn encode_instruction(instruction: Instruction) -> Word {
  // [Prefix:6][Reserved:26]
  let mut word = (instruction.opcode().code() as Word) << OPCODE_SHIFT;

  if let Some(source) = instruction.source() {
    // [Prefix:4][Source:2][Reserved:26]
    word |= source.code() << SOURCE_SHIFT;
  }
  if let Some(destination) = instruction.destination() {
    // [Prefix:6][Destination:2][Reserved:24]
    word |= destination.code() << DESTINATION_SHIFT;
  }
  if let Some(immediate) = instruction.immediate_bits() {
    // [Prefix:6][..:2][Immediate:24]
    word |= immediate;
  }
  word
}

/// Clears the fields of a word that its opcode ignores. Illegal words are returned unchanged.
pub fn normalize_word(word: Word) -> Word {
  match try_decode_instruction(word) {
    Some(instruction) => encode_instruction(instruction),
    None              => word
  }
}

// region Word streams

pub fn words_to_bytes(words: &[Word]) -> Vec<u8> {
  words.iter().flat_map(|word| word.to_le_bytes().to_vec()).collect()
}

/// Splits a byte buffer into little-endian words. A trailing partial word is an error.
pub fn words_from_bytes(bytes: &[u8]) -> Result<Vec<Word>, FormatError> {
  let chunks = bytes.chunks_exact(WORD_BYTES);
  let rest   = chunks.remainder();

  if !rest.is_empty() {
    return Err(FormatError::TruncatedWord {
      word  : bytes.len() / WORD_BYTES,
      bytes : rest.len()
    });
  }

  Ok(
    chunks
      .map(|chunk| Word::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
      .collect()
  )
}

pub fn read_words<R: Read>(mut reader: R) -> Result<Vec<Word>, FormatError> {
  let mut bytes = Vec::new();
  reader.read_to_end(&mut bytes)?;
  words_from_bytes(&bytes)
}

pub fn write_words<W: Write>(mut writer: W, words: &[Word]) -> std::io::Result<()> {
  writer.write_all(&words_to_bytes(words))?;
  writer.flush()
}

/**
  Writes `(address, word)` cells, given in ascending address order, as the word stream
  starting at address 0. Addresses skipped between cells are written as zero words, a chunk
  at a time, so a high address does not need an image of the whole range in memory.
*/
pub fn write_sparse_words<W, I>(mut writer: W, cells: I) -> std::io::Result<()>
  where W: Write,
        I: IntoIterator<Item = (Word, Word)>
{
  let zeros = [0u8; GAP_CHUNK * WORD_BYTES];
  let mut next : u64 = 0;

  for (address, word) in cells {
    let mut gap = (address as u64).saturating_sub(next);
    while gap > 0 {
      let chunk = gap.min(GAP_CHUNK as u64) as usize;
      writer.write_all(&zeros[..chunk * WORD_BYTES])?;
      gap -= chunk as u64;
    }
    writer.write_all(&word.to_le_bytes())?;
    next = address as u64 + 1;
  }
  writer.flush()
}

// endregion
