/*!
  The architectural state of a ReTI machine: the register file, the code segment and the data
  segment. The code segment is fixed once the machine is built. Registers and data are only
  changed by the emulator.
*/

use std::fmt::{Display, Formatter};

use prettytable::{format as TableFormat, Table};
use strum::IntoEnumIterator;

#[cfg(feature = "trace_computation")]
use crate::bytecode::disassemble;
use crate::bytecode::Word;
use crate::config::EmulatorConfig;
use crate::error::EmulationError;
use crate::memory::DataMemory;
use crate::register::{Register, Registers};

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Machine {
  pub(crate) registers : Registers,
  code                 : Vec<Word>,
  pub(crate) data      : DataMemory,
}

impl Machine {

  pub fn new(code: Vec<Word>, data: DataMemory) -> Machine {
    Machine {
      registers: Registers::new(),
      code,
      data
    }
  }

  /// Loads code and initial data words, both starting at address 0, within the capacities of
  /// `config`. Every loaded data word is valid.
  pub fn load(code: Vec<Word>, data: &[Word], config: &EmulatorConfig)
    -> Result<Machine, EmulationError>
  {
    if code.len() as u64 > config.code_capacity {
      return Err(EmulationError::CodeTooLarge { words: code.len(), capacity: config.code_capacity });
    }
    let data = DataMemory::from_words(data, config.data_capacity)?;
    Ok(Machine::new(code, data))
  }

  pub fn registers(&self) -> &Registers {
    &self.registers
  }

  pub fn register(&self, register: Register) -> Word {
    self.registers[register]
  }

  pub fn code(&self) -> &[Word] {
    &self.code
  }

  /// The instruction word at code address `pc`, if there is one.
  pub fn fetch(&self, pc: Word) -> Option<Word> {
    self.code.get(pc as usize).copied()
  }

  pub fn data(&self) -> &DataMemory {
    &self.data
  }

  pub fn into_data(self) -> DataMemory {
    self.data
  }

  // region Display methods

  fn make_register_table(&self) -> Table {
    let mut table = Table::new();

    table.set_format(*TABLE_DISPLAY_FORMAT);
    table.set_titles(row![ubr->"Register", ubl->"Contents"]);

    for register in Register::iter() {
      table.add_row(
        row![r->format!("{} =", register), format!("0x{:08x}", self.registers[register])]
      );
    }
    table
  }

  fn make_data_table(&self) -> Table {
    let mut table = Table::new();

    table.set_format(*TABLE_DISPLAY_FORMAT);
    table.set_titles(row![ubr->"Address", ubl->"Contents"]);

    for (address, value) in self.data.iter() {
      table.add_row(row![r->format!("M[0x{:x}] =", address), format!("0x{:08x}", value)]);
    }
    table
  }

  /// The code segment with the instruction at PC marked.
  #[cfg(feature = "trace_computation")]
  fn make_code_table(&self) -> Table {
    let mut table = Table::new();
    let pc = self.registers[Register::Pc] as usize;

    table.set_format(*TABLE_DISPLAY_FORMAT);
    table.set_titles(row![ubr->"Address", ubl->"Instruction"]);

    for (i, word) in self.code.iter().enumerate() {
      let text = disassemble(*word).unwrap_or_else(|| format!("0x{:08x}", word));
      match i == pc {

        true  => {
          table.add_row(row![r->format!("* --> code[{}] =", i), text]);
        }

        false => {
          table.add_row(row![r->format!("code[{}] =", i), text]);
        }

      } // end match on highlight
    } // end for
    table
  }

  // endregion
}

lazy_static! {
  static ref TABLE_DISPLAY_FORMAT: TableFormat::TableFormat =
    TableFormat::FormatBuilder::new()
      .column_separator('│')
      .borders(' ')
      .separator(
        TableFormat::LinePosition::Title,
        TableFormat::LineSeparator::new('─', '┼', ' ', ' ')
      )
      .separator(
        TableFormat::LinePosition::Bottom,
        TableFormat::LineSeparator::new('─', '┴', ' ', ' ')
      )
      .padding(1, 1)
      .build();
}

impl Display for Machine {

  // The code segment is only shown when tracing.
  #[cfg(feature = "trace_computation")]
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    let register_table = self.make_register_table();
    let data_table     = self.make_data_table();
    let code_table     = self.make_code_table();

    let mut combined_table = table!([register_table, data_table, code_table]);

    combined_table.set_titles(row![ub->"Registers", ub->"Data", ub->"Code"]);
    combined_table.set_format(*TABLE_DISPLAY_FORMAT);

    write!(f, "{}", combined_table)
  }

  #[cfg(not(feature = "trace_computation"))]
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    let register_table = self.make_register_table();
    let data_table     = self.make_data_table();

    let mut combined_table = table!([register_table, data_table]);

    combined_table.set_titles(row![ub->"Registers", ub->"Data"]);
    combined_table.set_format(*TABLE_DISPLAY_FORMAT);

    write!(f, "{}", combined_table)
  }
}
