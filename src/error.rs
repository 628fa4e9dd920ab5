//! Error types for golden vector generation

use thiserror::Error;

/// Result type alias for golden-gemm operations
pub type Result<T> = std::result::Result<T, GoldenError>;

/// Errors raised while building or serializing golden vectors.
///
/// Every variant except `Io` is fatal for a generation run: nothing is
/// persisted once one of them has been returned.
#[derive(Debug, Error)]
pub enum GoldenError {
  /// Logical dimension does not tile onto the hardware shape
  #[error("Dimension error: {reason}")]
  Dimension { reason: String },

  /// Value does not fit its declared two's-complement width
  #[error("Value {value} does not fit in {width} bits")]
  Range { value: i128, width: u32 },

  /// Codec width is not a multiple of 4 in 4..=128
  #[error("Unsupported word width: {width} bits")]
  InvalidWidth { width: u32 },

  /// Gearbox byte stream cannot be re-chunked evenly
  #[error("Alignment error: {bytes} bytes cannot be split into {source_bytes}-byte and {target_bytes}-byte words")]
  Alignment {
    bytes: usize,
    source_bytes: usize,
    target_bytes: usize,
  },

  /// Intermediate arithmetic left the width reserved for it
  #[error("Overflow in {stage}: {detail}")]
  Overflow { stage: &'static str, detail: String },

  /// Accumulator write-back arrived out of k order
  #[error("Schedule error: {reason}")]
  Schedule { reason: String },

  /// Hex word with the wrong length or non-hex digits
  #[error("Malformed word '{word}': {reason}")]
  MalformedWord { word: String, reason: String },

  /// Invalid configuration
  #[error("Config error: {reason}")]
  Config { reason: String },

  /// I/O error
  #[error("I/O error: {source}")]
  Io {
    #[from]
    source: std::io::Error,
  },

  /// Manifest serialization failed
  #[error("JSON error: {source}")]
  Json {
    #[from]
    source: serde_json::Error,
  },
}

impl GoldenError {
  pub fn dimension(reason: impl Into<String>) -> Self {
    Self::Dimension { reason: reason.into() }
  }

  pub fn overflow(stage: &'static str, detail: impl Into<String>) -> Self {
    Self::Overflow {
      stage,
      detail: detail.into(),
    }
  }

  pub fn schedule(reason: impl Into<String>) -> Self {
    Self::Schedule { reason: reason.into() }
  }

  pub fn malformed(word: impl Into<String>, reason: impl Into<String>) -> Self {
    Self::MalformedWord {
      word: word.into(),
      reason: reason.into(),
    }
  }

  pub fn config(reason: impl Into<String>) -> Self {
    Self::Config { reason: reason.into() }
  }
}

impl From<config::ConfigError> for GoldenError {
  fn from(e: config::ConfigError) -> Self {
    Self::config(e.to_string())
  }
}

impl From<toml::ser::Error> for GoldenError {
  fn from(e: toml::ser::Error) -> Self {
    Self::config(format!("failed to serialize configuration: {}", e))
  }
}
