//! An iterator over the lines of a text, counting line numbers and accepting DOS/Windows
//! line endings. A carriage return is only accepted directly before a line feed.

use std::str::Split;

/// A line and its 1-based line number.
pub type NumberedLine<'d> = (usize, &'d str);

/// A bare carriage return was found on the given line.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct BareCarriageReturn(pub usize);

#[derive(Debug)]
pub struct SourceLines<'d> {
  lines  : Split<'d, char>,
  lineno : usize
}

impl<'d> SourceLines<'d> {
  pub fn new(text: &'d str) -> Self {
    SourceLines {
      lines  : text.split('\n'),
      lineno : 0
    }
  }
}

impl<'d> Iterator for SourceLines<'d> {
  type Item = Result<NumberedLine<'d>, BareCarriageReturn>;

  fn next(&mut self) -> Option<Self::Item> {
    let line = self.lines.next()?;
    self.lineno += 1;

    // The text after the last line feed is not a line if it is empty.
    let terminated = self.lines.clone().next().is_some();
    if line.is_empty() && !terminated {
      return None;
    }

    let line = match terminated {
      true  => line.strip_suffix('\r').unwrap_or(line),
      false => line
    };
    match line.contains('\r') {
      true  => Some(Err(BareCarriageReturn(self.lineno))),
      false => Some(Ok((self.lineno, line)))
    }
  }
}
