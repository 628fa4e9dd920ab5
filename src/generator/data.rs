use crate::arch::{AccMatrix, ElemMatrix, GemmDims};
use crate::error::Result;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64;

/// Seeded source of operand and PPU test data.
///
/// Draw order is part of the output contract: A first, then B.
pub struct DataSource {
  rng: Pcg64,
}

impl DataSource {
  pub fn new(seed: u64) -> Self {
    Self {
      rng: Pcg64::seed_from_u64(seed),
    }
  }

  /// Uniform `rows×cols` operand matrix in `[min, max]`.
  pub fn operands(&mut self, rows: usize, cols: usize, min: i8, max: i8) -> Result<ElemMatrix> {
    let data = (0..rows * cols).map(|_| self.rng.gen_range(min..=max)).collect();
    ElemMatrix::from_vec(rows, cols, data)
  }

  /// A (m×k) and B (k×n).
  pub fn gemm_operands(&mut self, dims: GemmDims, min: i8, max: i8) -> Result<(ElemMatrix, ElemMatrix)> {
    let a = self.operands(dims.m, dims.k, min, max)?;
    let b = self.operands(dims.k, dims.n, min, max)?;
    Ok((a, b))
  }

  /// Accumulator-width samples for PPU unit vectors.
  pub fn accumulators(&mut self, rows: usize, cols: usize, min: i32, max: i32) -> Result<AccMatrix> {
    let data = (0..rows * cols).map(|_| self.rng.gen_range(min..=max)).collect();
    AccMatrix::from_vec(rows, cols, data)
  }
}
