// Tiled GEMM with an explicit accumulator memory.
//
// Write-back follows the accelerator: the first k-tile of a (row-block,
// n-tile) overwrites the accumulator rows, later k-tiles read, add and store.

use super::matrix::{AccMatrix, ElemMatrix};
use super::tile::{Tile, TileOrder, TileScheduler};
use crate::error::{GoldenError, Result};
use rayon::prelude::*;
use std::collections::HashMap;

/// Exact integer product of one A tile and one B tile.
///
/// Sums run in `i64`; a result outside `i32` is an error rather than a wrap.
pub fn partial(a: &ElemMatrix, b: &ElemMatrix) -> Result<AccMatrix> {
  if a.cols() != b.rows() {
    return Err(GoldenError::dimension(format!(
      "cannot multiply {}x{} by {}x{}",
      a.rows(),
      a.cols(),
      b.rows(),
      b.cols()
    )));
  }

  let mut out = AccMatrix::zeros(a.rows(), b.cols());
  for i in 0..a.rows() {
    let a_row = a.row(i);
    for j in 0..b.cols() {
      let sum: i64 = a_row
        .iter()
        .enumerate()
        .map(|(k, &av)| av as i64 * b.get(k, j) as i64)
        .sum();
      let value = i32::try_from(sum)
        .map_err(|_| GoldenError::overflow("tile product", format!("C[{}][{}] = {} exceeds i32", i, j, sum)))?;
      out.set(i, j, value);
    }
  }
  Ok(out)
}

/// Untiled reference product.
pub fn matmul(a: &ElemMatrix, b: &ElemMatrix) -> Result<AccMatrix> {
  partial(a, b)
}

/// Accumulator memory for one tiled multiply.
#[derive(Debug, Clone)]
pub struct AccumulatorState {
  acc: AccMatrix,
  // next expected k-tile per (row-block, n-tile)
  next_k: HashMap<(usize, usize), usize>,
}

impl AccumulatorState {
  pub fn new(rows: usize, cols: usize) -> Self {
    Self {
      acc: AccMatrix::zeros(rows, cols),
      next_k: HashMap::new(),
    }
  }

  /// Write one tile partial back and return the updated block.
  pub fn accumulate(&mut self, tile: &Tile, partial: &AccMatrix) -> Result<AccMatrix> {
    if partial.rows() != tile.rows.len()
      || partial.cols() != tile.b_cols.len()
      || tile.rows.end > self.acc.rows()
      || tile.b_cols.end > self.acc.cols()
    {
      return Err(GoldenError::dimension(format!(
        "{}x{} partial does not fit rows {:?} cols {:?} of a {}x{} accumulator",
        partial.rows(),
        partial.cols(),
        tile.rows,
        tile.b_cols,
        self.acc.rows(),
        self.acc.cols()
      )));
    }

    let key = (tile.m_index, tile.n_index);
    let expected = self.next_k.get(&key).copied().unwrap_or(0);
    if tile.k_index != expected {
      return Err(GoldenError::schedule(format!(
        "row-block {} n-tile {} expects k-tile {}, got {}",
        tile.m_index, tile.n_index, expected, tile.k_index
      )));
    }

    for (pi, r) in tile.rows.clone().enumerate() {
      for (pj, c) in tile.b_cols.clone().enumerate() {
        let incoming = partial.get(pi, pj);
        let value = if expected == 0 {
          incoming
        } else {
          let stored = self.acc.get(r, c);
          stored.checked_add(incoming).ok_or_else(|| {
            GoldenError::overflow(
              "accumulate",
              format!("acc[{}][{}] = {} + {} exceeds i32", r, c, stored, incoming),
            )
          })?
        };
        self.acc.set(r, c, value);
      }
    }
    self.next_k.insert(key, expected + 1);

    Ok(self.acc.view(tile.rows.clone(), tile.b_cols.clone()))
  }

  pub fn current(&self) -> &AccMatrix {
    &self.acc
  }

  pub fn finalize(self) -> AccMatrix {
    self.acc
  }
}

/// One write-back step of a tiled run.
#[derive(Debug, Clone)]
pub struct TileStep {
  pub tile: Tile,
  /// Tile product before accumulation
  pub partial: AccMatrix,
  /// Accumulator block after write-back
  pub snapshot: AccMatrix,
}

#[derive(Debug, Clone)]
pub struct TiledGemm {
  pub steps: Vec<TileStep>,
  pub result: AccMatrix,
}

impl TiledGemm {
  pub fn step(&self, m_index: usize, k_index: usize, n_index: usize) -> Option<&TileStep> {
    self
      .steps
      .iter()
      .find(|s| s.tile.m_index == m_index && s.tile.k_index == k_index && s.tile.n_index == n_index)
  }
}

pub struct GemmAccumulator {
  scheduler: TileScheduler,
}

impl GemmAccumulator {
  pub fn new(scheduler: TileScheduler) -> Self {
    Self { scheduler }
  }

  pub fn scheduler(&self) -> &TileScheduler {
    &self.scheduler
  }

  /// Run the full tiled multiply, keeping every intermediate step.
  pub fn run(&self, a: &ElemMatrix, b: &ElemMatrix, order: TileOrder) -> Result<TiledGemm> {
    let dims = self.scheduler.dims();
    if a.rows() != dims.m || a.cols() != dims.k || b.rows() != dims.k || b.cols() != dims.n {
      return Err(GoldenError::dimension(format!(
        "operands {}x{} and {}x{} do not match GEMM {}x{}x{}",
        a.rows(),
        a.cols(),
        b.rows(),
        b.cols(),
        dims.m,
        dims.k,
        dims.n
      )));
    }

    let tiles = self.scheduler.tiles(order);

    // Tile products are independent; only the write-back is ordered.
    let partials = tiles
      .par_iter()
      .map(|t| {
        partial(
          &a.view(t.rows.clone(), t.a_cols.clone()),
          &b.view(t.b_rows.clone(), t.b_cols.clone()),
        )
      })
      .collect::<Result<Vec<_>>>()?;

    let mut state = AccumulatorState::new(dims.m, dims.n);
    let mut steps = Vec::with_capacity(tiles.len());
    for (tile, partial) in tiles.into_iter().zip(partials) {
      let snapshot = state.accumulate(&tile, &partial)?;
      log::debug!(
        "write-back m{} k{} n{}: {}",
        tile.m_index,
        tile.k_index,
        tile.n_index,
        if tile.k_index == 0 { "store" } else { "accumulate" }
      );
      steps.push(TileStep {
        tile,
        partial,
        snapshot,
      });
    }

    Ok(TiledGemm {
      steps,
      result: state.finalize(),
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::arch::tile::{GemmDims, TileShape};

  fn scheduler(m: usize, k: usize, n: usize, r: usize, c: usize) -> TileScheduler {
    TileScheduler::new(GemmDims { m, k, n }, TileShape { rows: r, cols: c }, None).unwrap()
  }

  #[test]
  fn test_partial_2x2() {
    let a = ElemMatrix::from_rows(vec![vec![1, 2], vec![3, 4]]).unwrap();
    let b = ElemMatrix::from_rows(vec![vec![5, 6], vec![7, -8]]).unwrap();
    let c = partial(&a, &b).unwrap();
    assert_eq!(c.as_slice(), &[19, -10, 43, -14]);
  }

  #[test]
  fn test_partial_shape_mismatch() {
    let a = ElemMatrix::zeros(2, 3);
    let b = ElemMatrix::zeros(2, 2);
    assert!(matches!(partial(&a, &b), Err(GoldenError::Dimension { .. })));
  }

  #[test]
  fn test_store_then_accumulate() {
    let s = scheduler(1, 2, 1, 1, 1);
    let mut state = AccumulatorState::new(1, 1);
    let p0 = AccMatrix::from_vec(1, 1, vec![5]).unwrap();
    let p1 = AccMatrix::from_vec(1, 1, vec![-2]).unwrap();
    assert_eq!(state.accumulate(&s.tile(0, 0, 0), &p0).unwrap().get(0, 0), 5);
    assert_eq!(state.accumulate(&s.tile(0, 1, 0), &p1).unwrap().get(0, 0), 3);
  }

  #[test]
  fn test_first_write_is_store() {
    // Stale content must not leak into the k=0 write
    let s = scheduler(1, 1, 1, 1, 1);
    let mut state = AccumulatorState::new(1, 1);
    state.acc.set(0, 0, 99);
    let p = AccMatrix::from_vec(1, 1, vec![7]).unwrap();
    assert_eq!(state.accumulate(&s.tile(0, 0, 0), &p).unwrap().get(0, 0), 7);
  }

  #[test]
  fn test_out_of_order_write_back() {
    let s = scheduler(1, 2, 1, 1, 1);
    let mut state = AccumulatorState::new(1, 1);
    let p = AccMatrix::zeros(1, 1);
    assert!(matches!(state.accumulate(&s.tile(0, 1, 0), &p), Err(GoldenError::Schedule { .. })));
  }

  #[test]
  fn test_partial_overflow() {
    // 131073 * 16384 = 2^31 + 16384 does not fit i32
    let n = 131073;
    let a = ElemMatrix::from_vec(1, n, vec![-128; n]).unwrap();
    let b = ElemMatrix::from_vec(n, 1, vec![-128; n]).unwrap();
    assert!(matches!(
      partial(&a, &b),
      Err(GoldenError::Overflow { stage: "tile product", .. })
    ));
    // two fewer is 2^31 - 16384, which fits
    let a = a.view(0..1, 0..n - 2);
    let b = b.view(0..n - 2, 0..1);
    assert_eq!(partial(&a, &b).unwrap().get(0, 0), 131071 * 16384);
  }

  #[test]
  fn test_accumulate_overflow() {
    let s = scheduler(1, 2, 1, 1, 1);
    let mut state = AccumulatorState::new(1, 1);
    let p = AccMatrix::from_vec(1, 1, vec![i32::MAX]).unwrap();
    state.accumulate(&s.tile(0, 0, 0), &p).unwrap();
    assert!(matches!(state.accumulate(&s.tile(0, 1, 0), &p), Err(GoldenError::Overflow { .. })));
  }

  #[test]
  fn test_run_matches_matmul() {
    let a = ElemMatrix::from_vec(4, 4, (0..16).map(|v| (v as i8) - 8).collect()).unwrap();
    let b = ElemMatrix::from_vec(4, 2, (0..8).map(|v| 3 - v as i8).collect()).unwrap();
    let gemm = GemmAccumulator::new(scheduler(4, 4, 2, 2, 1));
    let tiled = gemm.run(&a, &b, TileOrder::NOuter).unwrap();
    assert_eq!(tiled.steps.len(), 4);
    assert_eq!(tiled.result, matmul(&a, &b).unwrap());
    // last k step of each n-tile holds the finished column
    let last = tiled.step(0, 1, 1).unwrap();
    assert_eq!(last.snapshot, tiled.result.view(0..4, 1..2));
  }
}
