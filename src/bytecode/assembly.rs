/*!
  The human readable textual form of ReTI code is called assembly. Each line holds at most
  one instruction:

    MNEMONIC [SOURCE] [DESTINATION] [IMMEDIATE] [; comment]

  A line is first split into tokens by a small `nom` grammar, then dispatched once on the
  opcode named by the mnemonic. The opcode decides which operands are read, so the grammar
  itself knows nothing about individual instructions. Mnemonic lookup leverages the `strum`
  derives of `Opcode` and `Register`.

  Lines consisting only of a comment are skipped. Empty lines, including lines of nothing
  but white space, are an error, as they are usually a sign of a stray new-line.
*/

use std::slice::Iter;
use std::str::FromStr;

use nom::{
  branch::alt,
  bytes::complete::{is_not, tag},
  character::complete::{char as one_char, digit1, hex_digit1, space0, space1},
  combinator::{all_consuming, map, opt, rest},
  multi::many0,
  sequence::{pair, preceded, terminated, tuple},
  IResult
};

use super::{encode_instruction, Instruction, Numeral, Opcode, Word, IMMEDIATE_MASK, SIGN_BIT};
use crate::error::{AssemblyError, AssemblyErrorKind};
use crate::lines::{BareCarriageReturn, SourceLines};
use crate::register::Register;

// Abbreviated name internally
use AssemblyErrorKind as Kind;

/// The tokens of a line holding an instruction.
#[derive(Clone, Debug, Eq, PartialEq)]
struct SourceLine<'a> {
  mnemonic : &'a str,
  operands : Vec<&'a str>
}

// region Tokenizer

fn token(input: &str) -> IResult<&str, &str> {
  is_not(" \t;")(input)
}

fn comment(input: &str) -> IResult<&str, &str> {
  preceded(one_char(';'), rest)(input)
}

/// Splits a line into tokens. Yields `None` for a line holding only a comment.
fn source_line(input: &str) -> IResult<&str, Option<SourceLine>> {
  preceded(
    space0,
    alt((
      map(comment, |_| None),
      map(
        terminated(
          pair(token, many0(preceded(space1, token))),
          pair(space0, opt(comment))
        ),
        |(mnemonic, operands)| Some(SourceLine { mnemonic, operands })
      )
    ))
  )(input)
}

/// `[-](0x<hex digits>|<decimal digits>)`, yielding the sign, the radix and the digits.
fn numeral(input: &str) -> IResult<&str, (bool, (u32, &str))> {
  tuple((
    map(opt(one_char('-')), |sign| sign.is_some()),
    alt((
      map(preceded(tag("0x"), hex_digit1), |digits| (16, digits)),
      map(digit1, |digits| (10, digits))
    ))
  ))(input)
}

// endregion

// region Operands

fn next_operand<'a>(operands: &mut Iter<'_, &'a str>, opcode: Opcode, operand: &'static str)
  -> Result<&'a str, AssemblyErrorKind>
{
  operands.next().copied().ok_or(Kind::MissingOperand {
    mnemonic: opcode.mnemonic(),
    operand
  })
}

/**
  Parses an immediate and returns its 24 bit field value. Every opcode accepts values up to
  `0xffffff`; only opcodes with a signed immediate accept a leading `-`, down to `-0x800000`.
*/
fn parse_immediate(opcode: Opcode, convention: Numeral, token: &str) -> Result<Word, AssemblyErrorKind> {
  let (negative, (radix, digits)) =
    match all_consuming(numeral)(token) {
      Ok((_, parsed)) => parsed,
      Err(_)          => return Err(Kind::InvalidImmediate(token.to_string()))
    };

  let out_of_range = || Kind::ImmediateOutOfRange {
    mnemonic : opcode.mnemonic(),
    token    : token.to_string()
  };
  // Only overflow can make this fail, as the digits are already checked.
  let magnitude = u64::from_str_radix(digits, radix).map_err(|_| out_of_range())?;

  match negative {
    false if magnitude <= IMMEDIATE_MASK as u64 => Ok(magnitude as Word),
    false => Err(out_of_range()),

    true if convention != Numeral::Signed => Err(Kind::NegativeImmediate {
      mnemonic : opcode.mnemonic(),
      token    : token.to_string()
    }),
    true if magnitude <= SIGN_BIT as u64 => Ok((magnitude as Word).wrapping_neg() & IMMEDIATE_MASK),
    true => Err(out_of_range())
  }
}

// endregion

/// Assembles the tokens of one line.
fn assemble_tokens(line: &SourceLine) -> Result<Instruction, AssemblyErrorKind> {
  let opcode = Opcode::from_str(line.mnemonic)
    .map_err(|_| Kind::UnknownMnemonic(line.mnemonic.to_string()))?;
  let mut operands = line.operands.iter();

  let mut source = Register::Pc;
  if opcode.has_source() {
    let token = next_operand(&mut operands, opcode, "source register")?;
    source = Register::from_str(token).map_err(|_| Kind::InvalidSource(token.to_string()))?;
  }

  let mut destination = Register::Pc;
  if opcode.has_destination() {
    let token = next_operand(&mut operands, opcode, "destination register")?;
    destination =
      Register::from_str(token).map_err(|_| Kind::InvalidDestination(token.to_string()))?;
  }

  let mut immediate = 0;
  if let Some(convention) = opcode.numeral() {
    let token = next_operand(&mut operands, opcode, "immediate")?;
    immediate = parse_immediate(opcode, convention, token)?;
  }

  if let Some(extra) = operands.next() {
    return Err(Kind::UnexpectedToken(extra.to_string()));
  }

  Ok(Instruction::from_parts(opcode, source, destination, immediate))
}

/// Assembles one line, yielding `None` for a comment line.
fn assemble_line(line: &str) -> Result<Option<Instruction>, AssemblyErrorKind> {
  if line.chars().all(|c| c == ' ' || c == '\t') {
    return Err(Kind::EmptyLine);
  }

  match source_line(line) {
    Ok(("", Some(tokens))) => assemble_tokens(&tokens).map(Some),
    Ok(("", None))         => Ok(None),
    Ok((rest, _))          => Err(Kind::UnexpectedToken(rest.to_string())),
    Err(_)                 => Err(Kind::UnexpectedToken(line.trim().to_string()))
  }
}

/// Parses assembly text into instructions, stopping at the first malformed line.
pub fn parse_assembly(text: &str) -> Result<Vec<Instruction>, AssemblyError> {
  let mut instructions = Vec::new();

  for numbered_line in SourceLines::new(text) {
    let (lineno, line) =
      numbered_line.map_err(|BareCarriageReturn(line)| AssemblyError {
        line,
        kind: Kind::MissingLineFeed
      })?;

    let assembled = assemble_line(line).map_err(|kind| AssemblyError { line: lineno, kind })?;
    if let Some(instruction) = assembled {
      instructions.push(instruction);
    }
  }

  Ok(instructions)
}

/// Assembles text into code words.
pub fn assemble(text: &str) -> Result<Vec<Word>, AssemblyError> {
  Ok(parse_assembly(text)?.into_iter().map(encode_instruction).collect())
}


#[cfg(test)]
mod tests {
  use super::*;
  use crate::bytecode::{disassemble, try_decode_instruction};

  fn error_of(text: &str) -> AssemblyError {
    match assemble(text) {
      Err(error) => error,
      Ok(words)  => panic!("expected an error, assembled {:x?}", words),
    }
  }

  #[test]
  fn tokenize(){
    assert_eq!(
      source_line("  ADDI  ACC\t5 ; add five"),
      Ok(("", Some(SourceLine { mnemonic: "ADDI", operands: vec!["ACC", "5"] })))
    );
    assert_eq!(source_line("; just a comment"), Ok(("", None)));
    assert_eq!(source_line("\t;"), Ok(("", None)));
    assert_eq!(
      source_line("NOP;tight"),
      Ok(("", Some(SourceLine { mnemonic: "NOP", operands: vec![] })))
    );
  }

  #[test]
  fn single_instructions(){
    assert_eq!(assemble("ADDI ACC 5\n").unwrap(), vec![0x0f00_0005]);
    assert_eq!(assemble("LOADI ACC 0x2A\n").unwrap(), vec![0x7300_002a]);
    assert_eq!(assemble("STORE 0\n").unwrap(), vec![0x8000_0000]);
    assert_eq!(assemble("MOVE ACC IN1\n").unwrap(), vec![0xbd00_0000]);
    assert_eq!(assemble("NOP\n").unwrap(), vec![0xc000_0000]);
    assert_eq!(assemble("JUMP 0\n").unwrap(), vec![0xf800_0000]);
    assert_eq!(assemble("SUBI ACC -1\n").unwrap(), vec![0x0bff_ffff]);
    assert_eq!(assemble("JUMPLT -2\n").unwrap(), vec![0xe0ff_fffe]);
  }

  #[test]
  fn comparator_aliases(){
    let canonical = assemble("JUMPGT 1\nJUMPEQ 1\nJUMPGE 1\nJUMPLT 1\nJUMPNE 1\nJUMPLE 1\n").unwrap();
    let aliased   = assemble("JUMP> 1\nJUMP= 1\nJUMP>= 1\nJUMP< 1\nJUMP!= 1\nJUMP<= 1\n").unwrap();
    assert_eq!(canonical, aliased);
    assert_eq!(
      try_decode_instruction(aliased[3]),
      Some(Instruction::JumpLt { immediate: 1 })
    );
  }

  #[test]
  fn program_with_comments(){
    let text = "; compute 42\n\
                LOADI ACC 0x2A   ; load\n\
                \tSTORE 0;store\n\
                ; done\n\
                JUMP 0\n";
    assert_eq!(assemble(text).unwrap(), vec![0x7300_002a, 0x8000_0000, 0xf800_0000]);
  }

  #[test]
  fn crlf_and_missing_final_newline(){
    assert_eq!(assemble("NOP\r\nJUMP 0\r\n").unwrap(), vec![0xc000_0000, 0xf800_0000]);
    assert_eq!(assemble("NOP\nJUMP 0").unwrap(), vec![0xc000_0000, 0xf800_0000]);
    assert_eq!(assemble("").unwrap(), Vec::<Word>::new());
  }

  #[test]
  fn bare_carriage_return(){
    assert_eq!(error_of("NOP\nNOP\rNOP\n"), AssemblyError { line: 2, kind: Kind::MissingLineFeed });
  }

  #[test]
  fn empty_lines(){
    assert_eq!(error_of("NOP\n\nNOP\n"), AssemblyError { line: 2, kind: Kind::EmptyLine });
    assert_eq!(error_of("NOP\n  \t\nNOP\n"), AssemblyError { line: 2, kind: Kind::EmptyLine });
  }

  #[test]
  fn immediate_ranges(){
    assert_eq!(assemble("ADDI ACC 0xffffff\n").unwrap(), vec![0x0fff_ffff]);
    assert_eq!(assemble("ADDI ACC -8388608\n").unwrap(), vec![0x0f80_0000]);
    assert_eq!(assemble("ADDI ACC -0x800000\n").unwrap(), vec![0x0f80_0000]);
    assert_eq!(assemble("LOAD IN1 16777215\n").unwrap(), vec![0x41ff_ffff]);

    assert_eq!(
      error_of("NOP\nADDI ACC 99999999\n"),
      AssemblyError {
        line: 2,
        kind: Kind::ImmediateOutOfRange { mnemonic: "ADDI", token: "99999999".to_string() }
      }
    );
    assert_eq!(
      error_of("ADDI ACC -8388609\n").kind,
      Kind::ImmediateOutOfRange { mnemonic: "ADDI", token: "-8388609".to_string() }
    );
    assert_eq!(
      error_of("ORI ACC 0x1000000\n").kind,
      Kind::ImmediateOutOfRange { mnemonic: "ORI", token: "0x1000000".to_string() }
    );
    assert_eq!(
      error_of("LOADI ACC 123456789012345678901234567890\n").kind,
      Kind::ImmediateOutOfRange {
        mnemonic: "LOADI",
        token: "123456789012345678901234567890".to_string()
      }
    );
    assert_eq!(
      error_of("LOAD ACC -1\n").kind,
      Kind::NegativeImmediate { mnemonic: "LOAD", token: "-1".to_string() }
    );
    assert_eq!(
      error_of("ANDI ACC -0x1\n").kind,
      Kind::NegativeImmediate { mnemonic: "ANDI", token: "-0x1".to_string() }
    );
  }

  #[test]
  fn malformed_immediates(){
    for token in &["5x", "0x", "x5", "--1", "0xfg", "-", "+1"] {
      let text = format!("ADDI ACC {}\n", token);
      assert_eq!(error_of(&text).kind, Kind::InvalidImmediate(token.to_string()));
    }
  }

  #[test]
  fn malformed_lines(){
    assert_eq!(error_of("HALT\n").kind, Kind::UnknownMnemonic("HALT".to_string()));
    assert_eq!(error_of("addi ACC 1\n").kind, Kind::UnknownMnemonic("addi".to_string()));
    assert_eq!(error_of("ADDI AC 1\n").kind, Kind::InvalidDestination("AC".to_string()));
    assert_eq!(error_of("MOVE IN3 ACC\n").kind, Kind::InvalidSource("IN3".to_string()));
    assert_eq!(error_of("MOVE ACC acc\n").kind, Kind::InvalidDestination("acc".to_string()));
    assert_eq!(
      error_of("ADDI ACC\n").kind,
      Kind::MissingOperand { mnemonic: "ADDI", operand: "immediate" }
    );
    assert_eq!(
      error_of("STORE\n").kind,
      Kind::MissingOperand { mnemonic: "STORE", operand: "immediate" }
    );
    assert_eq!(
      error_of("MOVE ACC\n").kind,
      Kind::MissingOperand { mnemonic: "MOVE", operand: "destination register" }
    );
    assert_eq!(error_of("NOP 0\n").kind, Kind::UnexpectedToken("0".to_string()));
    assert_eq!(error_of("STORE ACC 0\n").kind, Kind::InvalidImmediate("ACC".to_string()));
    assert_eq!(error_of("ADDI ACC 1 2\n").kind, Kind::UnexpectedToken("2".to_string()));
  }

  #[test]
  fn error_messages(){
    let error = error_of("NOP\nNOP\nADDI ACC 99999999\n");
    assert_eq!(
      error.to_string(),
      "parse error: at line 3: immediate '99999999' out of range for ADDI"
    );
  }

  #[test]
  fn assemble_then_disassemble(){
    let words = assemble("ADDI ACC 5\n").unwrap();
    assert_eq!(
      try_decode_instruction(words[0]),
      Some(Instruction::AddI { destination: Register::Acc, immediate: 5 })
    );
    let text = disassemble(words[0]).unwrap();
    assert_eq!(text, "ADDI ACC 5");
    assert_eq!(assemble(&text).unwrap(), words);
  }

  #[test]
  fn disassembly_reassembles_to_the_same_word(){
    // One word per opcode with a busy immediate.
    let words: Vec<Word> =
      (0u32..64)
        .map(|prefix| (prefix << 26) | 0x03a5_5a5a)
        .filter_map(try_decode_instruction)
        .map(encode_instruction)
        .collect();
    // 10 compute prefixes are assigned, every load, store and jump prefix is.
    assert_eq!(words.len(), 10 + 16 + 16 + 16);

    for word in words {
      let text = disassemble(word).unwrap();
      assert_eq!(assemble(&text).unwrap(), vec![word], "{}", text);
    }
  }
}
