// Post-processing unit: integer requantization of accumulator values.
//
//   out = clamp(((acc + bias) * multiplier >> shift) + zero_point, -128, 127)
//
// Stage order is fixed. Stages 1-4 run in i64.

use super::matrix::{AccMatrix, ElemMatrix};
use crate::error::{GoldenError, Result};
use serde::{Deserialize, Serialize};

pub type AccT = i32;
pub type OutT = i8;
/// Intermediate width, twice the accumulator
pub type WideT = i64;

const OUT_MIN: WideT = OutT::MIN as WideT;
const OUT_MAX: WideT = OutT::MAX as WideT;

/// Requantization parameters as loaded into the PPU registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
  pub bias: i32,
  pub multiplier: i32,
  pub shift: u32,
  pub zero_point: i32,
}

/// Whether the bias add (stage 1) is part of the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BiasStage {
  /// bias is added before the multiply
  #[default]
  PreScale,
  /// no bias stage; `bias` is ignored
  Disabled,
}

/// Every stage of one requantized value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequantTrace {
  pub input: AccT,
  pub biased: WideT,
  pub scaled: WideT,
  pub shifted: WideT,
  pub offset: WideT,
  pub output: OutT,
}

#[derive(Debug, Clone, Copy)]
pub struct Requantizer {
  config: PipelineConfig,
  bias_stage: BiasStage,
}

impl Requantizer {
  pub fn new(config: PipelineConfig, bias_stage: BiasStage) -> Result<Self> {
    if config.shift >= WideT::BITS {
      return Err(GoldenError::config(format!(
        "shift {} must be below the {}-bit intermediate width",
        config.shift,
        WideT::BITS
      )));
    }
    Ok(Self { config, bias_stage })
  }

  pub fn config(&self) -> &PipelineConfig {
    &self.config
  }

  pub fn bias_stage(&self) -> BiasStage {
    self.bias_stage
  }

  pub fn trace(&self, value: AccT) -> Result<RequantTrace> {
    let cfg = &self.config;

    // 1. bias
    let biased = match self.bias_stage {
      BiasStage::PreScale => value as WideT + cfg.bias as WideT,
      BiasStage::Disabled => value as WideT,
    };

    // 2. multiply
    let scaled = biased.checked_mul(cfg.multiplier as WideT).ok_or_else(|| {
      GoldenError::overflow(
        "requantize multiply",
        format!("{} * {} exceeds {} bits", biased, cfg.multiplier, WideT::BITS),
      )
    })?;

    // 3. arithmetic shift, floors negative values
    let shifted = scaled >> cfg.shift;

    // 4. zero point; |scaled| <= 2^63 - 2^32 once the multiply succeeds,
    // so adding an i32 cannot leave i64
    let offset = shifted + cfg.zero_point as WideT;

    // 5. clamp
    let output = offset.clamp(OUT_MIN, OUT_MAX) as OutT;

    Ok(RequantTrace {
      input: value,
      biased,
      scaled,
      shifted,
      offset,
      output,
    })
  }

  pub fn apply(&self, value: AccT) -> Result<OutT> {
    Ok(self.trace(value)?.output)
  }

  pub fn apply_matrix(&self, acc: &AccMatrix) -> Result<ElemMatrix> {
    acc.try_map(|v| self.apply(v))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn identity() -> Requantizer {
    Requantizer::new(
      PipelineConfig {
        bias: 0,
        multiplier: 1,
        shift: 0,
        zero_point: 0,
      },
      BiasStage::PreScale,
    )
    .unwrap()
  }

  #[test]
  fn test_clamp_boundaries() {
    let ppu = identity();
    assert_eq!(ppu.apply(127).unwrap(), 127);
    assert_eq!(ppu.apply(128).unwrap(), 127);
    assert_eq!(ppu.apply(-128).unwrap(), -128);
    assert_eq!(ppu.apply(-129).unwrap(), -128);
  }

  #[test]
  fn test_reference_config() {
    // bias 100, mult 180, shift 8, zp 10
    let ppu = Requantizer::new(
      PipelineConfig {
        bias: 100,
        multiplier: 180,
        shift: 8,
        zero_point: 10,
      },
      BiasStage::PreScale,
    )
    .unwrap();
    let t = ppu.trace(-57).unwrap();
    assert_eq!(t.biased, 43);
    assert_eq!(t.scaled, 7740);
    assert_eq!(t.shifted, 30);
    assert_eq!(t.output, 40);
    // (-300 + 100) * 180 = -36000, >> 8 floors to -141, + 10 = -131
    assert_eq!(ppu.trace(-300).unwrap().shifted, -141);
    assert_eq!(ppu.apply(-300).unwrap(), -128);
  }

  #[test]
  fn test_shift_floors_negative() {
    let ppu = Requantizer::new(
      PipelineConfig {
        bias: 0,
        multiplier: 1,
        shift: 1,
        zero_point: 0,
      },
      BiasStage::PreScale,
    )
    .unwrap();
    assert_eq!(ppu.apply(-1).unwrap(), -1);
    assert_eq!(ppu.apply(-3).unwrap(), -2);
    assert_eq!(ppu.apply(3).unwrap(), 1);
  }

  #[test]
  fn test_bias_disabled() {
    let cfg = PipelineConfig {
      bias: 50,
      multiplier: 256,
      shift: 8,
      zero_point: 10,
    };
    let with_bias = Requantizer::new(cfg, BiasStage::PreScale).unwrap();
    let without = Requantizer::new(cfg, BiasStage::Disabled).unwrap();
    assert_eq!(with_bias.apply(20).unwrap(), 80);
    assert_eq!(without.apply(20).unwrap(), 30);
  }

  #[test]
  fn test_multiply_overflow() {
    let ppu = Requantizer::new(
      PipelineConfig {
        bias: i32::MIN,
        multiplier: i32::MIN,
        shift: 0,
        zero_point: 0,
      },
      BiasStage::PreScale,
    )
    .unwrap();
    // -2^32 * -2^31 = 2^63
    assert!(matches!(ppu.apply(i32::MIN), Err(GoldenError::Overflow { .. })));
    // -2^31 * -2^31 = 2^62 still fits, then clamps
    assert_eq!(ppu.apply(0).unwrap(), 127);
  }

  #[test]
  fn test_extreme_zero_point() {
    // largest products that survive the multiply, then the widest zero point
    let top = Requantizer::new(
      PipelineConfig {
        bias: i32::MIN,
        multiplier: -i32::MAX,
        shift: 0,
        zero_point: i32::MAX,
      },
      BiasStage::PreScale,
    )
    .unwrap();
    let t = top.trace(i32::MIN).unwrap();
    assert_eq!(t.scaled, i64::MAX - (1i64 << 32) + 1);
    assert_eq!(t.offset, t.scaled + i32::MAX as i64);
    assert_eq!(t.output, 127);

    let bottom = Requantizer::new(
      PipelineConfig {
        bias: i32::MAX,
        multiplier: i32::MIN,
        shift: 0,
        zero_point: i32::MIN,
      },
      BiasStage::PreScale,
    )
    .unwrap();
    let t = bottom.trace(i32::MAX).unwrap();
    assert_eq!(t.scaled, i64::MIN + (1i64 << 32));
    assert_eq!(t.offset, t.scaled + i32::MIN as i64);
    assert_eq!(t.output, -128);
  }

  #[test]
  fn test_rejects_wide_shift() {
    let cfg = PipelineConfig {
      bias: 0,
      multiplier: 1,
      shift: 64,
      zero_point: 0,
    };
    assert!(matches!(Requantizer::new(cfg, BiasStage::PreScale), Err(GoldenError::Config { .. })));
  }
}
