//! Rendering words as assembly text.

use super::{try_decode_instruction, Word};

/// Upper bound on the length of a disassembled instruction. The longest text any opcode
/// produces today is 20 characters (`LOADIN1 ACC 16777215`).
pub const DISASSEMBLY_WIDTH: usize = 32;

/// Width the instruction text is padded to in a listing line.
pub const LISTING_COLUMN: usize = 21;

/// Text used in listings for words that do not decode.
const ILLEGAL: &str = "ILLEGAL";

/// The canonical assembly text of a word, or `None` if the word is illegal.
pub fn disassemble(word: Word) -> Option<String> {
  try_decode_instruction(word).map(|instruction| instruction.to_string())
}

/// A disassembly report line: `<instruction> ; <index> <word>`, hexadecimal numbers padded
/// to eight digits. Reassembling the line yields the word (with unused fields cleared).
pub fn listing_line(index: Word, word: Word) -> String {
  let text = disassemble(word).unwrap_or_else(|| ILLEGAL.to_string());
  format!("{:<width$} ; {:08x} {:08x}", text, index, word, width = LISTING_COLUMN)
}

/// Disassembles a whole code segment, one listing line per word.
pub fn render_disassembly(words: &[Word]) -> String {
  words
    .iter()
    .enumerate()
    .map(|(index, word)| listing_line(index as Word, *word) + "\n")
    .collect()
}


#[cfg(test)]
mod tests {
  use super::*;
  use crate::bytecode::{encode_instruction, Instruction, Opcode, IMMEDIATE_MASK, SIGN_BIT};
  use crate::register::Register;
  use proptest::prelude::*;
  use strum::IntoEnumIterator;

  #[test]
  fn width_bound_holds_for_every_opcode(){
    let longest =
      Opcode::iter()
        .flat_map(|opcode| {
          vec![0, SIGN_BIT, IMMEDIATE_MASK, SIGN_BIT - 1].into_iter().map(move |immediate| {
            Instruction::from_parts(opcode, Register::Acc, Register::Acc, immediate)
          })
        })
        .map(|instruction| instruction.to_string().len())
        .max()
        .unwrap();
    assert!(longest <= DISASSEMBLY_WIDTH);
    assert_eq!(longest, 20);
  }

  #[test]
  fn illegal_words(){
    assert_eq!(disassemble(0x0000_0000), None);
    assert_eq!(disassemble(0x3c00_0000), None);
    assert_eq!(
      listing_line(3, 0x0000_0000),
      "ILLEGAL               ; 00000003 00000000"
    );
  }

  #[test]
  fn listing(){
    let words = vec![
      encode_instruction(Instruction::LoadI { destination: Register::Acc, immediate: 42 }),
      encode_instruction(Instruction::Store { immediate: 0 }),
    ];
    assert_eq!(
      render_disassembly(&words),
      "LOADI ACC 42          ; 00000000 7300002a\n\
       STORE 0               ; 00000001 80000000\n"
    );
  }

  proptest! {
    #[test]
    fn disassembles_exactly_the_legal_words(word in any::<u32>()) {
      prop_assert_eq!(disassemble(word).is_some(), try_decode_instruction(word).is_some());
      if let Some(text) = disassemble(word) {
        prop_assert!(text.len() <= DISASSEMBLY_WIDTH);
      }
    }
  }
}
