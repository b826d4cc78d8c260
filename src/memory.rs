/*!
  The data memory of the machine. Addresses are word addresses covering the full 32 bit range,
  but only cells that have been written are stored.

  A cell is *valid* once it has been written, either by loading a data file or by a store, and
  it stays valid for the rest of the run. The set of keys of `cells` is the shadow validity map.
  Reading an invalid cell yields zero.
*/

use std::collections::BTreeMap;
use std::io::{self, Write};

use crate::bytecode::{write_sparse_words, Word};
use crate::error::EmulationError;

/// One more than the highest word address.
pub const ADDRESS_SPACE: u64 = 1 << 32;

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DataMemory {
  cells    : BTreeMap<Word, Word>,
  /// Addresses at or above `capacity` can not be written.
  capacity : u64
}

impl Default for DataMemory {
  fn default() -> Self {
    DataMemory::with_capacity(ADDRESS_SPACE)
  }
}

impl DataMemory {

  pub fn with_capacity(capacity: u64) -> DataMemory {
    DataMemory {
      cells    : BTreeMap::new(),
      capacity : capacity.min(ADDRESS_SPACE)
    }
  }

  /// Loads `words` at addresses `0..words.len()`, marking them valid.
  pub fn from_words(words: &[Word], capacity: u64) -> Result<DataMemory, EmulationError> {
    let mut memory = DataMemory::with_capacity(capacity);
    if words.len() as u64 > memory.capacity {
      return Err(EmulationError::DataTooLarge { words: words.len(), capacity: memory.capacity });
    }
    memory.cells = words.iter().enumerate().map(|(i, word)| (i as Word, *word)).collect();
    Ok(memory)
  }

  pub fn capacity(&self) -> u64 {
    self.capacity
  }

  pub fn is_valid(&self, address: Word) -> bool {
    self.cells.contains_key(&address)
  }

  /// The word at `address`, or `None` if the cell was never written.
  pub fn get(&self, address: Word) -> Option<Word> {
    self.cells.get(&address).copied()
  }

  /// Writes the cell, which becomes valid.
  pub fn write(&mut self, address: Word, value: Word) -> Result<(), EmulationError> {
    if address as u64 >= self.capacity {
      return Err(EmulationError::DataCapacity { address, capacity: self.capacity });
    }
    self.cells.insert(address, value);
    Ok(())
  }

  /// The number of valid cells.
  pub fn len(&self) -> usize {
    self.cells.len()
  }

  pub fn is_empty(&self) -> bool {
    self.cells.is_empty()
  }

  /// Valid cells in ascending address order.
  pub fn iter(&self) -> impl Iterator<Item = (Word, Word)> + '_ {
    self.cells.iter().map(|(address, value)| (*address, *value))
  }

  /// Writes the memory as a binary word file from address 0 up to the highest valid address.
  /// Invalid cells in between are written as zero.
  pub fn write_words<W: Write>(&self, writer: W) -> io::Result<()> {
    write_sparse_words(writer, self.iter())
  }

  /**
    A human readable dump of the valid cells, one line per cell:
    ```text
    00000000  2a 00 00 00  *...          42           42
    ```
    the address, the bytes of the word in memory order, the bytes as characters with
    non-printable characters shown as `.`, and the word as unsigned and as signed number.
  */
  pub fn dump(&self) -> String {
    self
      .iter()
      .map(|(address, value)| {
        let bytes = value.to_le_bytes();
        let printable: String =
          bytes
            .iter()
            .map(|byte| match byte.is_ascii_graphic() || *byte == b' ' {
              true  => *byte as char,
              false => '.'
            })
            .collect();

        format!(
          "{:08x}  {:02x} {:02x} {:02x} {:02x}  {}  {:10}  {:11}\n",
          address, bytes[0], bytes[1], bytes[2], bytes[3], printable, value, value as i32
        )
      })
      .collect()
  }
}
