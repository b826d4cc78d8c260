//! Knobs of an emulation run.

use strum_macros::{Display as StrumDisplay, EnumString, IntoStaticStr};

use crate::memory::ADDRESS_SPACE;

/// What happens when a program reads a data cell that was never written.
#[derive(StrumDisplay, IntoStaticStr, EnumString, Clone, Copy, Eq, PartialEq, Debug, Hash)]
#[strum(serialize_all = "lowercase")]
pub enum UninitializedReadPolicy {
  /// Log a warning, record the anomaly and continue with the value 0.
  Warn,
  /// Abort the run with `EmulationError::UninitializedRead`.
  Stop,
  /// Continue with the value 0 without reporting.
  Ignore,
}

impl Default for UninitializedReadPolicy {
  fn default() -> Self {
    UninitializedReadPolicy::Warn
  }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct EmulatorConfig {
  /// Stop after this many executed instructions. `None` runs until the program halts.
  pub step_limit          : Option<u64>,
  pub uninitialized_reads : UninitializedReadPolicy,
  /// Number of addressable data words.
  pub data_capacity       : u64,
  /// Maximum number of code words.
  pub code_capacity       : u64,
  /// Record a `StepRecord` for every executed instruction.
  pub trace               : bool,
}

impl Default for EmulatorConfig {
  fn default() -> Self {
    EmulatorConfig {
      step_limit          : None,
      uninitialized_reads : UninitializedReadPolicy::default(),
      data_capacity       : ADDRESS_SPACE,
      code_capacity       : ADDRESS_SPACE,
      trace               : false,
    }
  }
}


#[cfg(test)]
mod tests {
  use super::*;
  use std::str::FromStr;

  #[test]
  fn policy_names(){
    assert_eq!(UninitializedReadPolicy::from_str("stop"), Ok(UninitializedReadPolicy::Stop));
    assert_eq!(UninitializedReadPolicy::from_str("ignore"), Ok(UninitializedReadPolicy::Ignore));
    assert!(UninitializedReadPolicy::from_str("panic").is_err());
    assert_eq!(UninitializedReadPolicy::Warn.to_string(), "warn");
  }

  #[test]
  fn defaults(){
    let config = EmulatorConfig::default();
    assert_eq!(config.step_limit, None);
    assert_eq!(config.uninitialized_reads, UninitializedReadPolicy::Warn);
    assert_eq!(config.data_capacity, 1 << 32);
    assert!(!config.trace);
  }
}
