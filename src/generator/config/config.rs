use crate::arch::{BiasStage, GemmDims, PipelineConfig, Requantizer, TileScheduler, TileShape};
use crate::codec::word::MAX_WORD_BITS;
use crate::codec::Gearbox;
use crate::error::{GoldenError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const DEFAULT_CONFIG: &str = include_str!("default.toml");

/// Environment prefix, e.g. `GOLDEN_GEMM_DATA__SEED=7`
pub const ENV_PREFIX: &str = "GOLDEN_GEMM";

/// Which family of golden files to produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Profile {
  /// full system: tile streams, partials, RAM snapshots, bus streams, PPU output
  #[default]
  Top,
  /// per-k inputs, per-(k,n) weights, per-n accumulator golden
  Core,
  /// one array-sized tile
  Systolic,
  /// row-blocked inputs with a flat golden
  Blocked,
  /// requantizer unit vectors
  Ppu,
}

impl Profile {
  pub fn parse(s: &str) -> Result<Self> {
    match s.to_lowercase().as_str() {
      "top" => Ok(Self::Top),
      "core" => Ok(Self::Core),
      "systolic" => Ok(Self::Systolic),
      "blocked" => Ok(Self::Blocked),
      "ppu" => Ok(Self::Ppu),
      other => Err(GoldenError::config(format!("unknown profile: {}", other))),
    }
  }

  pub fn name(&self) -> &'static str {
    match self {
      Self::Top => "top",
      Self::Core => "core",
      Self::Systolic => "systolic",
      Self::Blocked => "blocked",
      Self::Ppu => "ppu",
    }
  }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GemmSection {
  pub m: usize,
  pub k: usize,
  pub n: usize,
}

impl Default for GemmSection {
  fn default() -> Self {
    Self { m: 32, k: 24, n: 32 }
  }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ArraySection {
  pub rows: usize,
  pub cols: usize,
  /// Rows of A per pass; whole M when unset
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub row_block: Option<usize>,
}

impl Default for ArraySection {
  fn default() -> Self {
    Self {
      rows: 12,
      cols: 16,
      row_block: None,
    }
  }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DataSection {
  pub seed: u64,
  pub operand_min: i8,
  pub operand_max: i8,
  pub ppu_samples: usize,
  pub ppu_min: i32,
  pub ppu_max: i32,
}

impl Default for DataSection {
  fn default() -> Self {
    Self {
      seed: 42,
      operand_min: -10,
      operand_max: 9,
      ppu_samples: 100,
      ppu_min: -200,
      ppu_max: 199,
    }
  }
}

/// Bit width of each line of the pipeline configuration file.
///
/// Line order is fixed: multiplier, shift, zero point, bias.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct ConfigLayout {
  pub multiplier_bits: u32,
  pub shift_bits: u32,
  pub zero_point_bits: u32,
  pub bias_bits: u32,
}

impl ConfigLayout {
  /// `config.mem` of the system testbench
  pub const SYSTEM: Self = Self {
    multiplier_bits: 32,
    shift_bits: 32,
    zero_point_bits: 32,
    bias_bits: 32,
  };

  /// `ppu_config.mem` of the PPU unit testbench
  pub const PPU_UNIT: Self = Self {
    multiplier_bits: 16,
    shift_bits: 8,
    zero_point_bits: 8,
    bias_bits: 32,
  };
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PpuSection {
  pub bias: i32,
  pub multiplier: i32,
  pub shift: u32,
  pub zero_point: i32,
  #[serde(default)]
  pub bias_stage: BiasStage,
  /// Overrides the profile's configuration file layout
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub layout: Option<ConfigLayout>,
}

impl Default for PpuSection {
  fn default() -> Self {
    Self {
      bias: 100,
      multiplier: 180,
      shift: 8,
      zero_point: 10,
      bias_stage: BiasStage::PreScale,
      layout: None,
    }
  }
}

/// AXI stream widths the gearboxes convert to
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BusSection {
  pub input_bits: u32,
  pub weight_bits: u32,
  pub output_bits: u32,
}

impl Default for BusSection {
  fn default() -> Self {
    Self {
      input_bits: 64,
      weight_bits: 64,
      output_bits: 64,
    }
  }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OutputSection {
  pub dir: String,
}

impl Default for OutputSection {
  fn default() -> Self {
    Self {
      dir: "test_data".to_string(),
    }
  }
}

/// Complete generator configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
  #[serde(default)]
  pub profile: Profile,
  #[serde(default)]
  pub gemm: GemmSection,
  #[serde(default)]
  pub array: ArraySection,
  #[serde(default)]
  pub data: DataSection,
  #[serde(default)]
  pub ppu: PpuSection,
  #[serde(default)]
  pub bus: BusSection,
  #[serde(default)]
  pub output: OutputSection,
}

impl AppConfig {
  pub fn dims(&self) -> GemmDims {
    GemmDims {
      m: self.gemm.m,
      k: self.gemm.k,
      n: self.gemm.n,
    }
  }

  pub fn shape(&self) -> TileShape {
    TileShape {
      rows: self.array.rows,
      cols: self.array.cols,
    }
  }

  /// Row-block height; the blocked profile splits M in two unless told otherwise.
  pub fn row_block(&self) -> Option<usize> {
    match (self.profile, self.array.row_block) {
      (_, Some(rb)) => Some(rb),
      (Profile::Blocked, None) if self.gemm.m % 2 == 0 => Some(self.gemm.m / 2),
      _ => None,
    }
  }

  pub fn scheduler(&self) -> Result<TileScheduler> {
    TileScheduler::new(self.dims(), self.shape(), self.row_block())
  }

  pub fn pipeline(&self) -> PipelineConfig {
    PipelineConfig {
      bias: self.ppu.bias,
      multiplier: self.ppu.multiplier,
      shift: self.ppu.shift,
      zero_point: self.ppu.zero_point,
    }
  }

  pub fn requantizer(&self) -> Result<Requantizer> {
    Requantizer::new(self.pipeline(), self.ppu.bias_stage)
  }

  pub fn layout(&self) -> ConfigLayout {
    self.ppu.layout.unwrap_or(match self.profile {
      Profile::Ppu => ConfigLayout::PPU_UNIT,
      _ => ConfigLayout::SYSTEM,
    })
  }

  pub fn output_dir(&self) -> PathBuf {
    PathBuf::from(&self.output.dir)
  }

  pub fn to_toml(&self) -> Result<String> {
    Ok(toml::to_string(self)?)
  }
}

/// Load the built-in defaults
pub fn load_default_config() -> Result<AppConfig> {
  toml::from_str::<AppConfig>(DEFAULT_CONFIG)
    .map_err(|e| GoldenError::config(format!("failed to parse default configuration: {}", e)))
}

/// Layer defaults, an optional user file and `GOLDEN_GEMM_*` environment variables.
pub fn load_layered_config(custom_config_path: Option<&Path>) -> Result<AppConfig> {
  let mut builder =
    config::Config::builder().add_source(config::File::from_str(DEFAULT_CONFIG, config::FileFormat::Toml));

  if let Some(path) = custom_config_path {
    if !path.exists() {
      return Err(GoldenError::config(format!("config file {:?} does not exist", path)));
    }
    builder = builder.add_source(config::File::from(path).format(config::FileFormat::Toml));
  }

  builder = builder.add_source(
    config::Environment::with_prefix(ENV_PREFIX)
      .prefix_separator("_")
      .separator("__")
      .try_parsing(true),
  );

  Ok(builder.build()?.try_deserialize::<AppConfig>()?)
}

/// Values given on the command line, applied last
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
  pub profile: Option<String>,
  pub out_dir: Option<String>,
  pub seed: Option<u64>,
  pub row_block: Option<usize>,
}

pub fn apply_cli_overrides(config: &mut AppConfig, overrides: &CliOverrides) -> Result<()> {
  if let Some(profile) = overrides.profile.as_deref() {
    config.profile = Profile::parse(profile)?;
  }
  if let Some(dir) = overrides.out_dir.as_deref() {
    config.output.dir = dir.to_string();
  }
  if let Some(seed) = overrides.seed {
    config.data.seed = seed;
  }
  if let Some(row_block) = overrides.row_block {
    config.array.row_block = Some(row_block);
  }
  Ok(())
}

/// Check every precondition that can be known before data is generated
pub fn validate_config(config: &AppConfig) -> Result<()> {
  config.scheduler()?;
  config.requantizer()?;

  if config.profile == Profile::Systolic && (config.gemm.k != config.array.rows || config.gemm.n != config.array.cols) {
    return Err(GoldenError::dimension(format!(
      "systolic profile needs K == rows and N == cols, got K={} N={} on a {}x{} array",
      config.gemm.k, config.gemm.n, config.array.rows, config.array.cols
    )));
  }

  if config.data.operand_min > config.data.operand_max {
    return Err(GoldenError::config(format!(
      "operand range [{}, {}] is empty",
      config.data.operand_min, config.data.operand_max
    )));
  }
  if config.data.ppu_min > config.data.ppu_max {
    return Err(GoldenError::config(format!(
      "ppu input range [{}, {}] is empty",
      config.data.ppu_min, config.data.ppu_max
    )));
  }
  if config.profile == Profile::Ppu && config.data.ppu_samples == 0 {
    return Err(GoldenError::config("ppu_samples must be greater than 0"));
  }

  for bits in [config.bus.input_bits, config.bus.weight_bits, config.bus.output_bits] {
    Gearbox::new(bits, bits)?;
    if bits > MAX_WORD_BITS {
      return Err(GoldenError::InvalidWidth { width: bits });
    }
  }

  if config.output.dir.trim().is_empty() {
    return Err(GoldenError::config("output dir cannot be empty"));
  }

  Ok(())
}

/// Load and merge configurations
///
/// 1. built-in defaults
/// 2. custom config file, if given
/// 3. `GOLDEN_GEMM_*` environment variables
/// 4. CLI overrides
/// 5. validation
pub fn load_and_merge_configs(custom_config_path: Option<&Path>, overrides: &CliOverrides) -> Result<AppConfig> {
  let mut config = load_layered_config(custom_config_path)?;
  apply_cli_overrides(&mut config, overrides)?;
  validate_config(&config)?;
  Ok(config)
}
