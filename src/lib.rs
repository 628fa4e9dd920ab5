//! Golden test-vector generator for a tiled int8 GEMM accelerator with an
//! int32 accumulator memory and an int8 requantizing post-processor.

pub mod arch;
pub mod codec;
pub mod error;
pub mod generator;

pub use error::{GoldenError, Result};
pub use generator::{AppConfig, Generator, Profile};
