pub mod artifact;
pub mod config;
pub mod data;
#[allow(clippy::module_inception)]
pub mod generator;
pub mod profile;
pub mod replay;
pub mod utils;
pub mod writer;

pub use artifact::{Artifact, Manifest};
pub use self::config::{load_and_merge_configs, AppConfig, CliOverrides, Profile};
pub use generator::{Generator, RunSummary};
pub use replay::{ReplayReport, ReplayStep};
pub use self::utils::log;
