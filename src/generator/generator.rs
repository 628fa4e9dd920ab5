use super::artifact::{Artifact, Manifest};
use super::config::{validate_config, AppConfig, Profile};
use super::replay::{replay, ReplayReport};
use super::{profile, writer};
use crate::error::{GoldenError, Result};
use std::path::{Path, PathBuf};

/// What a run left on disk.
#[derive(Debug, Clone)]
pub struct RunSummary {
  pub profile: &'static str,
  pub seed: u64,
  pub dir: PathBuf,
  pub written: Vec<PathBuf>,
}

pub struct Generator {
  config: AppConfig,
}

impl Generator {
  pub fn new(config: AppConfig) -> Result<Self> {
    validate_config(&config)?;
    Ok(Self { config })
  }

  pub fn config(&self) -> &AppConfig {
    &self.config
  }

  /// Every file of the run, in memory. Pure: same config, same bytes.
  pub fn build(&self) -> Result<Vec<Artifact>> {
    let mut files = profile::build(&self.config)?;
    let manifest = Manifest::new(&self.config, &files).to_json()?;
    let run_config = self.config.to_toml()?;
    files.push(Artifact::new("manifest.json", 0, vec![manifest]));
    files.push(Artifact::new("run_config.toml", 0, vec![run_config]));
    Ok(files)
  }

  /// Build and write into the configured output directory.
  pub fn run(&self) -> Result<RunSummary> {
    self.run_into(&self.config.output_dir())
  }

  /// Build and write into `dir`; nothing is written if building fails.
  pub fn run_into(&self, dir: &Path) -> Result<RunSummary> {
    log::info!(
      "generating '{}' golden vectors (seed {}) into {}",
      self.config.profile.name(),
      self.config.data.seed,
      dir.display()
    );
    let files = self.build()?;
    let written = writer::commit(dir, &files)?;
    log::info!("wrote {} files", written.len());
    Ok(RunSummary {
      profile: self.config.profile.name(),
      seed: self.config.data.seed,
      dir: dir.to_path_buf(),
      written,
    })
  }

  /// Check a previously written top-profile directory.
  pub fn replay(&self, dir: &Path) -> Result<ReplayReport> {
    if self.config.profile != Profile::Top {
      return Err(GoldenError::config(format!(
        "replay needs the top profile, got '{}'",
        self.config.profile.name()
      )));
    }
    replay(&self.config, dir)
  }
}
