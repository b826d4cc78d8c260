/*!
  Generates random ReTI programs, mostly for testing the assembler and disassembler against
  each other. The output is assembly text in the listing format of the disassembler:

    ; reti random <seed> <instructions>
    LOADI ACC 42          ; 00000000 7300002a
    ...

  Random words that do not decode are left out but still take up their code address, so the
  listed indices have holes. Listed words have their unused fields cleared, so assembling the
  output yields exactly the listed words.

  Random numbers come from Knuth's 64 bit linear congruential generator, which makes the
  output a function of the seed alone.
*/

use std::io::{self, Write};
use std::str::FromStr;

use crate::bytecode::{listing_line, normalize_word, try_decode_instruction, Word};
use crate::error::CountError;

const MULTIPLIER : u64 = 6364136223846793005;
const INCREMENT  : u64 = 1442695040888963407;

/// Largest number of instructions a program can have.
pub const MAX_INSTRUCTIONS: u64 = 1 << 32;

/// Knuth's MMIX linear congruential generator.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Lcg {
  state: u64
}

impl Lcg {
  pub fn new(seed: u64) -> Lcg {
    Lcg { state: seed }
  }

  pub fn next_u64(&mut self) -> u64 {
    self.state = self.state.wrapping_mul(MULTIPLIER).wrapping_add(INCREMENT);
    self.state
  }

  /// The upper half of the next state. The low bits of an LCG have short periods.
  pub fn random32(&mut self) -> u32 {
    (self.next_u64() >> 32) as u32
  }

  /// A number in `low..high`, or `low` if the range is empty.
  pub fn pick(&mut self, low: u64, high: u64) -> u64 {
    if high <= low {
      return low;
    }
    let delta  = (high - low) as u128;
    let scaled = (delta * self.random32() as u128) >> 32;
    low + scaled as u64
  }
}

/// How many instructions to generate.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum InstructionCount {
  Exactly(u64),
  /// Uniformly picked below the bound.
  Below(u64),
  /// Picked with a logarithmic bias in `1..=1024`.
  Random,
}

impl FromStr for InstructionCount {
  type Err = CountError;

  /// `N` is exactly `N` instructions, `-N` picks a number below `N`.
  fn from_str(text: &str) -> Result<Self, Self::Err> {
    if text.is_empty() {
      return Err(CountError::Empty);
    }
    let (below, digits) = match text.strip_prefix('-') {
      Some(digits) => (true, digits),
      None         => (false, text)
    };
    if digits.is_empty() || !digits.bytes().all(|byte| byte.is_ascii_digit()) {
      return Err(CountError::Invalid(text.to_string()));
    }
    let count = match u64::from_str(digits) {
      Ok(count) if count <= MAX_INSTRUCTIONS => count,
      _ => return Err(CountError::TooLarge(text.to_string()))
    };
    match below {
      true  => Ok(InstructionCount::Below(count)),
      false => Ok(InstructionCount::Exactly(count))
    }
  }
}

impl InstructionCount {
  fn resolve(&self, rng: &mut Lcg) -> u64 {
    match *self {
      InstructionCount::Exactly(count) => count,
      InstructionCount::Below(bound)   => rng.pick(0, bound),
      InstructionCount::Random         => {
        let log = rng.pick(0, 11);
        rng.pick(1, (1 << log) + 1)
      }
    }
  }
}

/// The number of instructions spanned, and the lines of the program without line ends.
fn program_lines(seed: u64, count: InstructionCount) -> (u64, impl Iterator<Item = String>) {
  let mut rng      = Lcg::new(seed);
  let instructions = count.resolve(&mut rng);
  let header       = format!("; reti random {} {}", seed, instructions);

  let listing =
    (0..instructions).filter_map(move |index| {
      let word = rng.random32();
      try_decode_instruction(word).map(|_| listing_line(index as Word, normalize_word(word)))
    });
  (instructions, std::iter::once(header).chain(listing))
}

/// Writes a random program and returns the number of instructions it spans.
pub fn write_random_program<W: Write>(mut writer: W, seed: u64, count: InstructionCount)
  -> io::Result<u64>
{
  let (instructions, lines) = program_lines(seed, count);
  for line in lines {
    writeln!(writer, "{}", line)?;
  }
  Ok(instructions)
}

/// The random program for `seed` as text.
pub fn random_program(seed: u64, count: InstructionCount) -> String {
  let (_, lines) = program_lines(seed, count);
  lines.map(|line| line + "\n").collect()
}


#[cfg(test)]
mod tests {
  use super::*;
  use crate::bytecode::assemble;

  #[test]
  fn knuth_lcg(){
    let mut rng = Lcg::new(0);
    assert_eq!(rng.next_u64(), INCREMENT);
    assert_eq!(rng.next_u64(), INCREMENT.wrapping_mul(MULTIPLIER).wrapping_add(INCREMENT));

    let mut rng = Lcg::new(0);
    assert_eq!(rng.random32(), (INCREMENT >> 32) as u32);
  }

  #[test]
  fn picks_stay_in_range(){
    let mut rng = Lcg::new(7);
    for _ in 0..1000 {
      let picked = rng.pick(3, 10);
      assert!((3..10).contains(&picked));
    }
    assert_eq!(rng.pick(5, 5), 5);
    assert!(rng.pick(0, MAX_INSTRUCTIONS) < MAX_INSTRUCTIONS);
  }

  #[test]
  fn counts(){
    assert_eq!(InstructionCount::from_str("12"), Ok(InstructionCount::Exactly(12)));
    assert_eq!(InstructionCount::from_str("-12"), Ok(InstructionCount::Below(12)));
    assert_eq!(InstructionCount::from_str("4294967296"), Ok(InstructionCount::Exactly(1 << 32)));
    assert_eq!(InstructionCount::from_str(""), Err(CountError::Empty));
    assert_eq!(InstructionCount::from_str("-"), Err(CountError::Invalid("-".to_string())));
    assert_eq!(InstructionCount::from_str("1x"), Err(CountError::Invalid("1x".to_string())));
    assert_eq!(
      InstructionCount::from_str("4294967297"),
      Err(CountError::TooLarge("4294967297".to_string()))
    );

    let mut rng = Lcg::new(1);
    for _ in 0..100 {
      let count = InstructionCount::Random.resolve(&mut rng);
      assert!((1..=1024).contains(&count));
      assert!(InstructionCount::Below(9).resolve(&mut rng) < 9);
    }
  }

  #[test]
  fn deterministic(){
    assert_eq!(
      random_program(42, InstructionCount::Random),
      random_program(42, InstructionCount::Random)
    );
    assert_ne!(
      random_program(1, InstructionCount::Exactly(64)),
      random_program(2, InstructionCount::Exactly(64))
    );
  }

  #[test]
  fn written_program_matches_text(){
    let mut buffer = vec![];
    let instructions = write_random_program(&mut buffer, 5, InstructionCount::Below(300)).unwrap();
    let text = random_program(5, InstructionCount::Below(300));
    assert_eq!(String::from_utf8(buffer).unwrap(), text);
    assert_eq!(text.lines().next(), Some(format!("; reti random 5 {}", instructions).as_str()));
  }

  #[test]
  fn output_reassembles_to_the_listed_words(){
    let program = random_program(3, InstructionCount::Exactly(500));
    let mut lines = program.lines();
    assert_eq!(lines.next(), Some("; reti random 3 500"));

    let listed: Vec<(Word, Word)> =
      lines
        .map(|line| {
          let mut fields = line.rsplit(' ');
          let word  = Word::from_str_radix(fields.next().unwrap(), 16).unwrap();
          let index = Word::from_str_radix(fields.next().unwrap(), 16).unwrap();
          (index, word)
        })
        .collect();

    // Most random words are legal.
    assert!(listed.len() > 400 && listed.len() <= 500);
    assert!(listed.windows(2).all(|pair| pair[0].0 < pair[1].0));
    assert!(listed.iter().all(|(index, _)| *index < 500));

    let words = assemble(&program).unwrap();
    let expected: Vec<Word> = listed.iter().map(|(_, word)| *word).collect();
    assert_eq!(words, expected);
  }
}
