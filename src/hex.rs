/*!
  Hexadecimal word listings, a text form of binary word files that is easy to write by hand
  and to diff. Every line holds one word as

    AAAAAAAA DDDDDDDD [; comment]

  with exactly eight hexadecimal digits for the word address and the data word. Addresses must
  increase; words skipped between two lines are zero. Lines starting with `;` are comments.
*/

use std::io::{self, Write};

use nom::{
  bytes::complete::take_while_m_n,
  character::complete::{char as one_char, space0},
  combinator::{map_res, opt, rest},
  sequence::{pair, preceded},
  IResult
};

use crate::bytecode::{write_sparse_words, Word};
use crate::error::{HexError, HexErrorKind};
use crate::lines::{BareCarriageReturn, SourceLines};

// Abbreviated name internally
use HexErrorKind as Kind;

fn hex_word(input: &str) -> IResult<&str, Word> {
  map_res(
    take_while_m_n(8, 8, |c: char| c.is_ascii_hexdigit()),
    |digits| Word::from_str_radix(digits, 16)
  )(input)
}

fn comment(input: &str) -> IResult<&str, &str> {
  preceded(one_char(';'), rest)(input)
}

/// Parses a line holding a word. Fails with the first field that is malformed.
fn listing_line(line: &str) -> Result<(Word, Word), HexErrorKind> {
  if line.is_empty() {
    return Err(Kind::EmptyLine);
  }
  let (input, address) = hex_word(line).map_err(|_| Kind::InvalidAddress)?;
  let (input, _)       = one_char::<_, nom::error::Error<&str>>(' ')(input)
                           .map_err(|_| Kind::MissingSeparator)?;
  let (input, data)    = hex_word(input).map_err(|_| Kind::InvalidData)?;
  let (input, _)       = pair(space0, opt(comment))(input).map_err(|_| Kind::TrailingGarbage)?;

  match input.is_empty() {
    true  => Ok((address, data)),
    false => Err(Kind::TrailingGarbage)
  }
}

/**
  Parses a listing into its `(address, word)` entries in ascending address order. The
  addresses not listed below the highest one are implicitly zero; see `write_listing_words`.
*/
pub fn parse_listing(text: &str) -> Result<Vec<(Word, Word)>, HexError> {
  let mut entries      = vec![];
  // Number of words covered so far, including gaps.
  let mut parsed : u64 = 0;

  for line in SourceLines::new(text) {
    let (lineno, line) =
      line.map_err(|BareCarriageReturn(line)| HexError { line, kind: Kind::MissingLineFeed })?;

    if line.starts_with(';') {
      continue;
    }

    let (address, data) = listing_line(line).map_err(|kind| HexError { line: lineno, kind })?;
    if parsed > address as u64 {
      return Err(HexError {
        line : lineno,
        kind : Kind::AddressBelowParsed { address, parsed: parsed - 1 }
      });
    }
    entries.push((address, data));
    parsed = address as u64 + 1;
  }
  Ok(entries)
}

/// Writes parsed listing entries as a binary word file, filling gaps with zero words.
pub fn write_listing_words<W: Write>(writer: W, entries: &[(Word, Word)]) -> io::Result<()> {
  write_sparse_words(writer, entries.iter().copied())
}

/// One `AAAAAAAA DDDDDDDD` line per word.
pub fn render_listing(words: &[Word]) -> String {
  words
    .iter()
    .enumerate()
    .map(|(index, word)| format!("{:08x} {:08x}\n", index, word))
    .collect()
}


#[cfg(test)]
mod tests {
  use super::*;
  use crate::bytecode::words_from_bytes;

  fn error(text: &str) -> HexError {
    parse_listing(text).unwrap_err()
  }

  #[test]
  fn render(){
    assert_eq!(render_listing(&[0x7300_002a, 0x8000_0000]), "00000000 7300002a\n00000001 80000000\n");
    assert_eq!(render_listing(&[]), "");
  }

  #[test]
  fn parse_with_comments_and_gaps(){
    let text = "\
      ; initial data\n\
      00000000 7300002A\n\
      00000003 deadbeef ; after a gap\n\
      00000004 00000001;\n";
    assert_eq!(
      parse_listing(text).unwrap(),
      vec![(0, 0x7300_002a), (3, 0xdead_beef), (4, 1)]
    );
  }

  #[test]
  fn rendered_listing_parses_back(){
    let words = vec![1, 0xffff_ffff, 0, 42];
    let mut bytes = vec![];
    write_listing_words(&mut bytes, &parse_listing(&render_listing(&words)).unwrap()).unwrap();
    assert_eq!(words_from_bytes(&bytes).unwrap(), words);
  }

  #[test]
  fn binary_output_fills_gaps(){
    let entries = parse_listing("00000001 00000005\r\n00001002 00000006\r\n").unwrap();
    let mut bytes = vec![];
    write_listing_words(&mut bytes, &entries).unwrap();

    let words = words_from_bytes(&bytes).unwrap();
    assert_eq!(words.len(), 0x1003);
    assert_eq!(words[0], 0);
    assert_eq!(words[1], 5);
    assert!(words[2..0x1002].iter().all(|word| *word == 0));
    assert_eq!(words[0x1002], 6);
  }

  #[test]
  fn malformed_lines(){
    assert_eq!(error("00000000 00000001\n\n").kind, Kind::EmptyLine);
    assert_eq!(error("00000000 00000001\n\n").line, 2);
    assert_eq!(error(" 0000000 00000001\n").kind, Kind::InvalidAddress);
    assert_eq!(error("0000000g 00000001\n").kind, Kind::InvalidAddress);
    assert_eq!(error("000000000 0000001\n").kind, Kind::MissingSeparator);
    assert_eq!(error("00000000\t00000001\n").kind, Kind::MissingSeparator);
    assert_eq!(error("00000000 0000001\n").kind, Kind::InvalidData);
    assert_eq!(error("00000000 000000010\n").kind, Kind::TrailingGarbage);
    assert_eq!(error("00000000 00000001 2\n").kind, Kind::TrailingGarbage);
    assert_eq!(error("00000000 00000001\rx\n").kind, Kind::MissingLineFeed);
  }

  #[test]
  fn addresses_must_increase(){
    let error = error("00000002 00000001\n00000002 00000001\n");
    assert_eq!(error.line, 2);
    assert_eq!(error.kind, Kind::AddressBelowParsed { address: 2, parsed: 2 });
    assert_eq!(
      error.to_string(),
      "parse error: at line 2: address 0x00000002 below parsed words 0x00000002"
    );
  }
}
