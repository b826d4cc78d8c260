use std::fs::{self, File};
use std::io::{self, IsTerminal, Read, Write};
use std::path::{Path, PathBuf};

use clap::{ArgAction, Parser, Subcommand};
use color_eyre::eyre::{bail, Result, WrapErr};
use log::{info, LevelFilter};
use simple_logger::SimpleLogger;

use reti::bytecode::{assemble, render_disassembly, words_from_bytes, write_words, Word};
use reti::config::{EmulatorConfig, UninitializedReadPolicy};
use reti::emulator::Emulator;
use reti::generator::{write_random_program, InstructionCount};
use reti::hex::{parse_listing, render_listing, write_listing_words};
use reti::memory::ADDRESS_SPACE;

#[derive(Parser)]
#[command(name = "reti", author, version, about, long_about = None)]
struct Args {
  /// More output on the error stream, repeat for more detail.
  #[arg(short, long, action = ArgAction::Count, global = true)]
  verbose: u8,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Assembles a text program into a binary code file.
  Asm {
    /// Assembly text, `-` for standard input.
    input: Option<PathBuf>,
    /// Binary code file, `-` for standard output.
    output: Option<PathBuf>,
  },

  /// Disassembles a binary code file into a listing.
  Dis {
    input: Option<PathBuf>,
    output: Option<PathBuf>,
  },

  /// Runs a binary code file and dumps the valid data words.
  Emu {
    code: PathBuf,
    /// Initial data words, loaded from address 0.
    data: Option<PathBuf>,

    /// Stop after this many instructions.
    #[arg(short = 'n', long)]
    steps: Option<u64>,

    /// What to do on reading a data word that was never written: warn, stop or ignore.
    #[arg(short, long, default_value = "warn")]
    uninitialized: UninitializedReadPolicy,

    /// Number of addressable data words.
    #[arg(long, default_value_t = ADDRESS_SPACE)]
    capacity: u64,

    /// Print every executed instruction on the error stream.
    #[arg(short, long)]
    step: bool,

    /// Also write the final data segment as a binary data file.
    #[arg(short, long)]
    output: Option<PathBuf>,
  },

  /// Encodes a hexadecimal word listing as a binary word file.
  Enchex {
    input: Option<PathBuf>,
    output: Option<PathBuf>,
  },

  /// Decodes a binary word file into a hexadecimal word listing.
  Decbin {
    input: Option<PathBuf>,
    output: Option<PathBuf>,
  },

  /// Prints a random program.
  Random {
    /// Seed of the random number generator.
    #[arg(default_value_t = 0)]
    seed: u64,
    /// Number of instructions. `-N` picks a number below `N`. Picked randomly if omitted.
    #[arg(allow_hyphen_values = true)]
    instructions: Option<InstructionCount>,
  },
}

/// The named file, or `None` for the standard streams (no path or `-`).
fn file_path(path: &Option<PathBuf>) -> Option<&Path> {
  path.as_deref().filter(|path| path.as_os_str() != "-")
}

fn display_path(path: &Option<PathBuf>) -> String {
  match file_path(path) {
    Some(path) => path.display().to_string(),
    None       => "<stdin>".to_string()
  }
}

fn read_input(path: &Option<PathBuf>) -> Result<Vec<u8>> {
  match file_path(path) {
    Some(path) => {
      fs::read(path).wrap_err_with(|| format!("could not read input file '{}'", path.display()))
    }
    None => {
      let mut bytes = vec![];
      io::stdin().read_to_end(&mut bytes).wrap_err("could not read '<stdin>'")?;
      Ok(bytes)
    }
  }
}

fn read_text(path: &Option<PathBuf>) -> Result<String> {
  let bytes = read_input(path)?;
  String::from_utf8(bytes).wrap_err_with(|| format!("'{}' is not a text file", display_path(path)))
}

fn read_word_file(path: &Path) -> Result<Vec<Word>> {
  let bytes = fs::read(path).wrap_err_with(|| format!("could not read '{}'", path.display()))?;
  words_from_bytes(&bytes).wrap_err_with(|| format!("in '{}'", path.display()))
}

/// A binary word file from a path or standard input.
fn read_input_words(path: &Option<PathBuf>) -> Result<Vec<Word>> {
  let bytes = read_input(path)?;
  words_from_bytes(&bytes).wrap_err_with(|| format!("in '{}'", display_path(path)))
}

fn open_output(path: &Option<PathBuf>, binary: bool) -> Result<Box<dyn Write>> {
  match file_path(path) {
    Some(path) => {
      let file = File::create(path)
        .wrap_err_with(|| format!("could not write output file '{}'", path.display()))?;
      Ok(Box::new(io::BufWriter::new(file)))
    }
    None if binary && io::stdout().is_terminal() => bail!("will not write binary data to terminal"),
    None => Ok(Box::new(io::stdout()))
  }
}

fn emulate(
  code_path : &Path,
  data_path : &Option<PathBuf>,
  config    : EmulatorConfig,
  output    : &Option<PathBuf>
) -> Result<()>
{
  let code = read_word_file(code_path)?;
  let data = match data_path {
    Some(path) => read_word_file(path)?,
    None       => vec![]
  };

  let mut emulator = Emulator::load(config, code, &data)?;
  let reason =
    match emulator.config().trace {
      true  => emulator.run_traced(|record| eprintln!("{}", record)),
      false => emulator.run()
    }
    .wrap_err_with(|| format!("while running '{}'", code_path.display()))?;

  info!("{} after {} steps", reason, emulator.steps());
  if emulator.anomaly_count() > 0 {
    info!("{} anomalies", emulator.anomaly_count());
  }

  let data = emulator.into_machine().into_data();
  print!("{}", data.dump());

  if output.is_some() {
    let mut writer = open_output(output, true)?;
    data.write_words(&mut writer)?;
    writer.flush()?;
  }
  Ok(())
}

fn main() -> Result<()> {
  color_eyre::install()?;
  let args = Args::parse();

  let level = match args.verbose {
    0 => LevelFilter::Warn,
    1 => LevelFilter::Info,
    2 => LevelFilter::Debug,
    _ => LevelFilter::Trace
  };
  SimpleLogger::new().with_level(level).init()?;

  match args.command {

    Command::Asm { input, output } => {
      let text  = read_text(&input)?;
      let words = assemble(&text)
        .wrap_err_with(|| format!("in '{}'", display_path(&input)))?;
      let mut writer = open_output(&output, true)?;
      write_words(&mut writer, &words)?;
      writer.flush()?;
    }

    Command::Dis { input, output } => {
      let words = read_input_words(&input)?;
      let mut writer = open_output(&output, false)?;
      write!(writer, "{}", render_disassembly(&words))?;
      writer.flush()?;
    }

    Command::Emu { code, data, steps, uninitialized, capacity, step, output } => {
      let config = EmulatorConfig {
        step_limit          : steps,
        uninitialized_reads : uninitialized,
        data_capacity       : capacity,
        trace               : step,
        ..EmulatorConfig::default()
      };
      emulate(&code, &data, config, &output)?;
    }

    Command::Enchex { input, output } => {
      let text    = read_text(&input)?;
      let entries = parse_listing(&text)
        .wrap_err_with(|| format!("in '{}'", display_path(&input)))?;
      let mut writer = open_output(&output, true)?;
      write_listing_words(&mut writer, &entries)?;
      writer.flush()?;
    }

    Command::Decbin { input, output } => {
      let words = read_input_words(&input)?;
      let mut writer = open_output(&output, false)?;
      write!(writer, "{}", render_listing(&words))?;
      writer.flush()?;
    }

    Command::Random { seed, instructions } => {
      let count  = instructions.unwrap_or(InstructionCount::Random);
      let stdout = io::stdout();
      let mut writer = io::BufWriter::new(stdout.lock());
      write_random_program(&mut writer, seed, count)?;
      writer.flush()?;
    }

  }
  Ok(())
}
