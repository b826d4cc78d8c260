/*!
  Runs ReTI code. Each step fetches the word at PC, decodes it with the same codec the
  assembler and disassembler use, executes it and commits its single write.

  A step writes at most one of a register or a data cell. A write to PC replaces the address
  of the next instruction. The machine halts when

    * an instruction would continue at its own address (a self-loop like `JUMP 0`),
    * PC runs off the end of the code, or
    * the configured step limit is reached.

  Illegal instruction words and writes above the data capacity abort the run with an
  `EmulationError`. Reading a data cell that was never written is an anomaly handled according
  to `EmulatorConfig::uninitialized_reads`.
*/

use std::collections::HashSet;
use std::fmt::{Display, Formatter};

use log::warn;
#[cfg(feature = "trace_computation")]
use log::trace;

use crate::bytecode::{try_decode_instruction, Instruction, Word, IMMEDIATE_MASK};
use crate::config::{EmulatorConfig, UninitializedReadPolicy};
use crate::error::EmulationError;
use crate::machine::Machine;
use crate::register::{Register, Registers};

/// Distinct anomalies kept by an emulator. Later ones are only counted.
pub const ANOMALY_RECORD_LIMIT: usize = 1024;

/// Why a run ended.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum HaltReason {
  /// The instruction at `pc` continued at `pc`.
  SelfLoop { pc: Word },
  /// PC reached the end of the code.
  EndOfCode { pc: Word },
  /// PC was set beyond the end of the code.
  UndefinedCode { pc: Word },
  /// The configured number of steps was executed.
  StepLimit { steps: u64 },
}

impl Display for HaltReason {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self {
      HaltReason::SelfLoop { pc }      => write!(f, "halted at self-loop in code[0x{:08x}]", pc),
      HaltReason::EndOfCode { pc }     => write!(f, "halted at end of code 0x{:08x}", pc),
      HaltReason::UndefinedCode { pc } => write!(f, "stopped at undefined code[0x{:08x}]", pc),
      HaltReason::StepLimit { steps }  => write!(f, "steps limit {} reached", steps),
    }
  }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Status {
  Running,
  Halted(HaltReason),
}

/// Advisory conditions observed during a run.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Anomaly {
  /// The instruction at `pc` read `data[address]` before anything was written there.
  UninitializedRead { pc: Word, address: Word },
  /// PC was set to `pc`, beyond the last code address.
  UndefinedCode { pc: Word, code_len: usize },
}

impl Display for Anomaly {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self {
      Anomaly::UninitializedRead { pc, address } => {
        write!(f, "read uninitialized 'data[0x{:x}]' at code[0x{:08x}]", address, pc)
      }
      Anomaly::UndefinedCode { pc, code_len } => {
        write!(f, "stopping at undefined 'code[0x{:08x}]' beyond {} code words", pc, code_len)
      }
    }
  }
}

/// One executed instruction, as shown when stepping through a program.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct StepRecord {
  /// Registers before the instruction was executed.
  pub registers   : Registers,
  /// Code address of the instruction.
  pub index       : Word,
  pub instruction : String,
  /// What the instruction did, e.g. `ACC = ACC - 1 = 0xffffffff`.
  pub action      : String,
}

impl Display for StepRecord {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    write!(
      f,
      "PC=0x{:08x} IN1=0x{:08x} IN2=0x{:08x} ACC=0x{:08x}  {:<18} : {}",
      self.registers[Register::Pc],
      self.registers[Register::In1],
      self.registers[Register::In2],
      self.registers[Register::Acc],
      self.instruction,
      self.action
    )
  }
}

/// The single write an instruction commits.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Write {
  Register(Register, Word),
  Memory(Word, Word),
}

/// The outcome of executing one instruction, before it is committed.
struct Effect {
  next_pc : Word,
  write   : Option<Write>,
  action  : String,
}

impl Effect {
  fn new(pc: Word, write: Option<Write>, action: String) -> Effect {
    Effect { next_pc: pc.wrapping_add(1), write, action }
  }
}

pub struct Emulator {
  config    : EmulatorConfig,
  machine   : Machine,
  status    : Status,
  steps     : u64,
  /// Distinct anomalies in the order they first occurred, at most `ANOMALY_RECORD_LIMIT`.
  anomalies     : Vec<Anomaly>,
  recorded      : HashSet<Anomaly>,
  anomaly_count : u64,
  last_step     : Option<StepRecord>,
}

impl Emulator {

  pub fn new(config: EmulatorConfig, machine: Machine) -> Emulator {
    Emulator {
      config,
      machine,
      status        : Status::Running,
      steps         : 0,
      anomalies     : vec![],
      recorded      : HashSet::new(),
      anomaly_count : 0,
      last_step     : None,
    }
  }

  /// Builds the machine from code and initial data words. See `Machine::load`.
  pub fn load(config: EmulatorConfig, code: Vec<Word>, data: &[Word])
    -> Result<Emulator, EmulationError>
  {
    let machine = Machine::load(code, data, &config)?;
    Ok(Emulator::new(config, machine))
  }

  // region Accessors

  pub fn config(&self) -> &EmulatorConfig {
    &self.config
  }

  pub fn machine(&self) -> &Machine {
    &self.machine
  }

  pub fn into_machine(self) -> Machine {
    self.machine
  }

  pub fn status(&self) -> Status {
    self.status
  }

  /// Number of executed instructions.
  pub fn steps(&self) -> u64 {
    self.steps
  }

  /// Each distinct anomaly once, up to `ANOMALY_RECORD_LIMIT` of them.
  pub fn anomalies(&self) -> &[Anomaly] {
    &self.anomalies
  }

  /// Number of anomalies that occurred, repeats included.
  pub fn anomaly_count(&self) -> u64 {
    self.anomaly_count
  }

  /// The most recently executed instruction, if tracing is enabled.
  pub fn last_step(&self) -> Option<&StepRecord> {
    self.last_step.as_ref()
  }

  // endregion

  /// Runs until the machine halts.
  pub fn run(&mut self) -> Result<HaltReason, EmulationError> {
    let trace = self.config.trace;
    self.run_with(trace, |_| {})
  }

  /// Runs until the machine halts, passing every executed instruction to `observer`.
  pub fn run_traced<F>(&mut self, observer: F) -> Result<HaltReason, EmulationError>
    where F: FnMut(&StepRecord)
  {
    self.run_with(true, observer)
  }

  fn run_with<F>(&mut self, trace: bool, mut observer: F) -> Result<HaltReason, EmulationError>
    where F: FnMut(&StepRecord)
  {
    loop {
      let status = self.advance(trace)?;
      if let Some(record) = &self.last_step {
        observer(record);
      }
      if let Status::Halted(reason) = status {
        return Ok(reason);
      }
    }
  }

  /// Executes one instruction, or determines that the machine halts. Stepping a halted
  /// machine does nothing.
  pub fn step(&mut self) -> Result<Status, EmulationError> {
    let trace = self.config.trace;
    self.advance(trace)
  }

  fn advance(&mut self, trace: bool) -> Result<Status, EmulationError> {
    self.last_step = None;
    if let Status::Halted(_) = self.status {
      return Ok(self.status);
    }

    // Fetch
    let pc = self.machine.registers[Register::Pc];
    let word =
      match self.machine.fetch(pc) {
        Some(word) => word,
        None => {
          let code_len = self.machine.code().len();
          if pc as usize > code_len {
            self.report(Anomaly::UndefinedCode { pc, code_len });
            return Ok(self.halt(HaltReason::UndefinedCode { pc }));
          }
          return Ok(self.halt(HaltReason::EndOfCode { pc }));
        }
      };

    if let Some(limit) = self.config.step_limit {
      if self.steps >= limit {
        return Ok(self.halt(HaltReason::StepLimit { steps: self.steps }));
      }
    }

    // Decode
    let instruction =
      try_decode_instruction(word).ok_or(EmulationError::IllegalInstruction { index: pc, word })?;

    // Execute
    let before = self.machine.registers;
    let Effect { mut next_pc, write, action } = self.execute(pc, instruction)?;

    // Commit
    match write {
      Some(Write::Register(register, value)) => {
        self.machine.registers[register] = value;
        if register == Register::Pc {
          next_pc = value;
        }
      }
      Some(Write::Memory(address, value)) => {
        self.machine.data.write(address, value)?;
      }
      None => {}
    }
    self.steps += 1;

    if trace {
      self.last_step = Some(StepRecord {
        registers   : before,
        index       : pc,
        instruction : instruction.to_string(),
        action
      });
    }

    if next_pc == pc {
      self.machine.registers[Register::Pc] = pc;
      self.status = Status::Halted(HaltReason::SelfLoop { pc });
    } else {
      self.machine.registers[Register::Pc] = next_pc;
    }

    #[cfg(feature = "trace_computation")]
    trace!("\n{}", self.machine);

    Ok(self.status)
  }

  fn halt(&mut self, reason: HaltReason) -> Status {
    self.status = Status::Halted(reason);
    self.status
  }

  fn report(&mut self, anomaly: Anomaly) {
    warn!("{}", anomaly);
    self.anomaly_count += 1;
    if self.anomalies.len() < ANOMALY_RECORD_LIMIT && self.recorded.insert(anomaly) {
      self.anomalies.push(anomaly);
    }
  }

  /// Reads a data cell for the instruction at `pc`, applying the uninitialized read policy.
  fn read(&mut self, pc: Word, address: Word) -> Result<Word, EmulationError> {
    if let Some(value) = self.machine.data.get(address) {
      return Ok(value);
    }
    match self.config.uninitialized_reads {
      UninitializedReadPolicy::Warn => {
        self.report(Anomaly::UninitializedRead { pc, address });
        Ok(0)
      }
      UninitializedReadPolicy::Stop   => Err(EmulationError::UninitializedRead { pc, address }),
      UninitializedReadPolicy::Ignore => Ok(0),
    }
  }

  /// Computes what `instruction` at `pc` does without changing registers or data.
  fn execute(&mut self, pc: Word, instruction: Instruction) -> Result<Effect, EmulationError> {
    let registers = self.machine.registers;
    let acc       = registers[Register::Acc];

    let effect =
      match instruction {

        // region Load instructions

        Instruction::Load { destination, immediate } => {
          let value = self.read(pc, immediate)?;
          Effect::new(
            pc,
            Some(Write::Register(destination, value)),
            format!("{} = M(0x{:x}) = 0x{:x}", destination, immediate, value)
          )
        }

        | Instruction::LoadIn1 { destination, immediate }
        | Instruction::LoadIn2 { destination, immediate } => {
          let base = match instruction {
            Instruction::LoadIn1 { .. } => Register::In1,
            _                           => Register::In2
          };
          let address = registers[base].wrapping_add(immediate);
          let value   = self.read(pc, address)?;
          Effect::new(
            pc,
            Some(Write::Register(destination, value)),
            format!("{} = M({} + 0x{:x}) = M(0x{:x}) = 0x{:x}", destination, base, immediate, address, value)
          )
        }

        Instruction::LoadI { destination, immediate } => {
          Effect::new(
            pc,
            Some(Write::Register(destination, immediate)),
            format!("{} = 0x{:x}", destination, immediate)
          )
        }

        // endregion

        // region Store instructions

        Instruction::Store { immediate } => {
          Effect::new(
            pc,
            Some(Write::Memory(immediate, acc)),
            format!("M(0x{:x}) = ACC = 0x{:x}", immediate, acc)
          )
        }

        | Instruction::StoreIn1 { immediate }
        | Instruction::StoreIn2 { immediate } => {
          let base = match instruction {
            Instruction::StoreIn1 { .. } => Register::In1,
            _                            => Register::In2
          };
          let address = registers[base].wrapping_add(immediate);
          Effect::new(
            pc,
            Some(Write::Memory(address, acc)),
            format!("M({} + 0x{:x}) = M(0x{:x}) = ACC = 0x{:x}", base, immediate, address, acc)
          )
        }

        Instruction::Move { source, destination } => {
          let value = registers[source];
          Effect::new(
            pc,
            Some(Write::Register(destination, value)),
            format!("{} = {} = 0x{:x}", destination, source, value)
          )
        }

        // endregion

        // region Compute instructions

        Instruction::SubI { destination, immediate } => {
          let value = registers[destination].wrapping_sub(immediate as Word);
          Effect::new(
            pc,
            Some(Write::Register(destination, value)),
            format!("{0} = {0} - {1} = 0x{2:x}", destination, immediate, value)
          )
        }

        Instruction::AddI { destination, immediate } => {
          let value = registers[destination].wrapping_add(immediate as Word);
          Effect::new(
            pc,
            Some(Write::Register(destination, value)),
            format!("{0} = {0} + {1} = 0x{2:x}", destination, immediate, value)
          )
        }

        | Instruction::OplusI { destination, immediate }
        | Instruction::OrI { destination, immediate }
        | Instruction::AndI { destination, immediate } => {
          let current = registers[destination];
          let (value, operator) =
            match instruction {
              Instruction::OplusI { .. } => (current ^ immediate, '^'),
              Instruction::OrI { .. }    => (current | immediate, '|'),
              _                          => (current & immediate, '&'),
            };
          Effect::new(
            pc,
            Some(Write::Register(destination, value)),
            format!("{0} = {0} {1} 0x{2:x} = 0x{3:x}", destination, operator, immediate, value)
          )
        }

        | Instruction::Sub { destination, immediate }
        | Instruction::Add { destination, immediate } => {
          // The immediate is an address here, even though it is written as a signed number.
          let address = immediate as Word & IMMEDIATE_MASK;
          let operand = self.read(pc, address)?;
          let current = registers[destination];
          let (value, operator) =
            match instruction {
              Instruction::Sub { .. } => (current.wrapping_sub(operand), '-'),
              _                       => (current.wrapping_add(operand), '+'),
            };
          Effect::new(
            pc,
            Some(Write::Register(destination, value)),
            format!("{0} = {0} {1} M(0x{2:x}) = 0x{3:x}", destination, operator, address, value)
          )
        }

        | Instruction::Oplus { destination, immediate }
        | Instruction::Or { destination, immediate }
        | Instruction::And { destination, immediate } => {
          let operand = self.read(pc, immediate)?;
          let current = registers[destination];
          let (value, operator) =
            match instruction {
              Instruction::Oplus { .. } => (current ^ operand, '^'),
              Instruction::Or { .. }    => (current | operand, '|'),
              _                         => (current & operand, '&'),
            };
          Effect::new(
            pc,
            Some(Write::Register(destination, value)),
            format!("{0} = {0} {1} M(0x{2:x}) = 0x{3:x}", destination, operator, immediate, value)
          )
        }

        // endregion

        // region Jump instructions

        Instruction::Nop => Effect::new(pc, None, String::new()),

        | Instruction::JumpGt { immediate }
        | Instruction::JumpEq { immediate }
        | Instruction::JumpGe { immediate }
        | Instruction::JumpLt { immediate }
        | Instruction::JumpNe { immediate }
        | Instruction::JumpLe { immediate }
        | Instruction::Jump { immediate } => {
          let value = acc as i32;
          let (taken, condition) =
            match instruction {
              Instruction::JumpGt { .. } => (value > 0,  "ACC > 0"),
              Instruction::JumpEq { .. } => (value == 0, "ACC = 0"),
              Instruction::JumpGe { .. } => (value >= 0, "ACC >= 0"),
              Instruction::JumpLt { .. } => (value < 0,  "ACC < 0"),
              Instruction::JumpNe { .. } => (value != 0, "ACC != 0"),
              Instruction::JumpLe { .. } => (value <= 0, "ACC <= 0"),
              _                          => (true,       ""),
            };
          let mut effect = Effect::new(pc, None, String::new());
          if taken {
            effect.next_pc = pc.wrapping_add(immediate as Word);
            effect.action  = format!("PC = PC + {} = 0x{:x}", immediate, effect.next_pc);
          } else {
            effect.action  = format!("{} fails", condition);
          }
          effect
        }

        // endregion

      };
    Ok(effect)
  }
}
