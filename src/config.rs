// Ambient configuration surface (§6): the options a CLI or embedding
// application sets before running extraction or matching.

use crate::error::{Error, Result};
use crate::matching::MatchingThresholds;

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum DetectMode {
  Off,
  Full,
  Fast,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
  Binary,
  Xml,
}

#[derive(Clone, Debug)]
pub struct SignatureConfig {
  pub detect_mode: DetectMode,
  pub output_format: OutputFormat,
  pub output_template: String,
  pub num_inputs: usize,
  pub thresholds: MatchingThresholds,
}

impl Default for SignatureConfig {
  fn default() -> Self {
    Self {
      detect_mode: DetectMode::Full,
      output_format: OutputFormat::Binary,
      output_template: "signature%d.bin".to_string(),
      num_inputs: 1,
      thresholds: MatchingThresholds::default(),
    }
  }
}

impl SignatureConfig {
  // Mirrors the upstream filter's requirement that a multi-input run's
  // output template contain a numeric substitution so each stream gets
  // a distinct file.
  pub fn validate(&self) -> Result<()> {
    if self.num_inputs > 1 && !self.output_template.contains("%d") {
      return Err(Error::InvalidConfig(
        "output filename template must contain %d when more than one input is given".into(),
      ));
    }
    Ok(())
  }

  pub fn output_path(&self, stream_index: usize) -> String {
    if self.output_template.contains("%d") {
      self.output_template.replacen("%d", &stream_index.to_string(), 1)
    } else {
      self.output_template.clone()
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn single_input_does_not_require_a_template() {
    let config = SignatureConfig { num_inputs: 1, output_template: "out.bin".into(), ..Default::default() };
    assert!(config.validate().is_ok());
  }

  #[test]
  fn multi_input_without_template_is_rejected() {
    let config = SignatureConfig { num_inputs: 2, output_template: "out.bin".into(), ..Default::default() };
    assert!(config.validate().is_err());
  }

  #[test]
  fn output_path_substitutes_stream_index() {
    let config = SignatureConfig { output_template: "sig%d.bin".into(), ..Default::default() };
    assert_eq!(config.output_path(3), "sig3.bin");
  }
}
