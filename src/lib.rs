/*!
  An assembler, disassembler and emulator for ReTI, a 32 bit teaching architecture with four
  registers. All three share one instruction codec in `bytecode`, so they agree on every bit.

  ```
  use reti::{bytecode::assemble, emulator::Emulator, config::EmulatorConfig};

  let code = assemble("LOADI ACC 0x2A\nSTORE 0\n").unwrap();
  let mut emulator = Emulator::load(EmulatorConfig::default(), code, &[]).unwrap();
  emulator.run().unwrap();
  assert_eq!(emulator.machine().data().get(0), Some(0x2a));
  ```
*/

#[macro_use] extern crate prettytable;
#[macro_use] extern crate lazy_static;

pub mod bytecode;
pub mod config;
pub mod emulator;
pub mod error;
pub mod generator;
pub mod hex;
pub mod lines;
pub mod machine;
pub mod memory;
pub mod register;
