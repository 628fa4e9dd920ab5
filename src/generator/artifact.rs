use super::config::{AppConfig, ConfigLayout};
use crate::arch::{Element, Matrix, PipelineConfig};
use crate::codec::{encode, pack_lanes, Gearbox};
use crate::error::Result;
use serde::Serialize;

/// One `$readmemh` file: lowercase hex words, one per line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Artifact {
  pub name: String,
  pub word_bits: u32,
  #[serde(skip)]
  pub lines: Vec<String>,
}

impl Artifact {
  pub fn new(name: impl Into<String>, word_bits: u32, lines: Vec<String>) -> Self {
    Self {
      name: name.into(),
      word_bits,
      lines,
    }
  }

  /// One line per matrix row, column 0 in the lowest lane.
  pub fn rows<T: Element>(name: impl Into<String>, matrix: &Matrix<T>) -> Result<Self> {
    let lines = matrix
      .iter_rows()
      .map(|row| pack_lanes(row, T::BITS))
      .collect::<Result<Vec<_>>>()?;
    Ok(Self::new(name, matrix.cols() as u32 * T::BITS, lines))
  }

  /// One element per line, row-major.
  pub fn flat<T: Element>(name: impl Into<String>, matrix: &Matrix<T>) -> Result<Self> {
    let lines = matrix
      .as_slice()
      .iter()
      .map(|&v| encode(v.into(), T::BITS))
      .collect::<Result<Vec<_>>>()?;
    Ok(Self::new(name, T::BITS, lines))
  }

  /// `source` pushed through a bus-width gearbox.
  pub fn stream(name: impl Into<String>, source: &Artifact, target_bits: u32) -> Result<Self> {
    let gearbox = Gearbox::new(source.word_bits, target_bits)?;
    Ok(Self::new(name, target_bits, gearbox.encode(&source.lines)?))
  }

  /// PPU register file: multiplier, shift, zero point, bias.
  pub fn pipeline_config(name: impl Into<String>, config: &PipelineConfig, layout: ConfigLayout) -> Result<Self> {
    let lines = vec![
      encode(config.multiplier.into(), layout.multiplier_bits)?,
      encode(config.shift.into(), layout.shift_bits)?,
      encode(config.zero_point.into(), layout.zero_point_bits)?,
      encode(config.bias.into(), layout.bias_bits)?,
    ];
    let widest = [
      layout.multiplier_bits,
      layout.shift_bits,
      layout.zero_point_bits,
      layout.bias_bits,
    ]
    .into_iter()
    .max()
    .unwrap_or(0);
    Ok(Self::new(name, widest, lines))
  }

  pub fn contents(&self) -> String {
    let mut out = String::with_capacity(self.lines.iter().map(|l| l.len() + 1).sum());
    for line in &self.lines {
      out.push_str(line);
      out.push('\n');
    }
    out
  }
}

/// Written next to the artifacts as `manifest.json`.
#[derive(Debug, Clone, Serialize)]
pub struct Manifest<'a> {
  pub profile: &'static str,
  pub seed: u64,
  pub gemm: [usize; 3],
  pub array: [usize; 2],
  pub row_block: Option<usize>,
  pub pipeline: PipelineConfig,
  pub files: &'a [Artifact],
}

impl<'a> Manifest<'a> {
  pub fn new(config: &AppConfig, files: &'a [Artifact]) -> Self {
    Self {
      profile: config.profile.name(),
      seed: config.data.seed,
      gemm: [config.gemm.m, config.gemm.k, config.gemm.n],
      array: [config.array.rows, config.array.cols],
      row_block: config.row_block(),
      pipeline: config.pipeline(),
      files,
    }
  }

  pub fn to_json(&self) -> Result<String> {
    Ok(serde_json::to_string_pretty(self)?)
  }
}
