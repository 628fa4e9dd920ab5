// Tile scheduler: maps a logical M×K by K×N GEMM onto an R×C array.
//
// The array holds an R×C weight block; the activation stream for one k-tile
// is the M×R column slice of A. Row-blocks split M into independent passes.

use crate::error::{GoldenError, Result};
use std::ops::Range;

/// Logical GEMM dimensions: A is m×k, B is k×n.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GemmDims {
  pub m: usize,
  pub k: usize,
  pub n: usize,
}

/// Physical compute array shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileShape {
  /// Array rows, consumed along K
  pub rows: usize,
  /// Array columns, produced along N
  pub cols: usize,
}

/// One hardware tile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tile {
  pub m_index: usize,
  pub k_index: usize,
  pub n_index: usize,
  /// Rows of A and of the accumulator
  pub rows: Range<usize>,
  /// Columns of A
  pub a_cols: Range<usize>,
  /// Rows of B
  pub b_rows: Range<usize>,
  /// Columns of B and of the accumulator
  pub b_cols: Range<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileOrder {
  /// n, row-block, k: hardware write-back order
  NOuter,
  /// k, n, row-block: per-k dump order
  KOuter,
}

#[derive(Debug, Clone, Copy)]
pub struct TileScheduler {
  dims: GemmDims,
  shape: TileShape,
  row_block: usize,
}

impl TileScheduler {
  /// Build a scheduler; `row_block` defaults to the whole of M.
  pub fn new(dims: GemmDims, shape: TileShape, row_block: Option<usize>) -> Result<Self> {
    let row_block = row_block.unwrap_or(dims.m);
    let checks = [
      ("M", dims.m, "row block", row_block),
      ("K", dims.k, "array rows", shape.rows),
      ("N", dims.n, "array cols", shape.cols),
    ];
    for (dim, value, tile, size) in checks {
      if value == 0 || size == 0 {
        return Err(GoldenError::dimension(format!("{}={} / {}={} must be non-zero", dim, value, tile, size)));
      }
      if value % size != 0 {
        return Err(GoldenError::dimension(format!(
          "{}={} is not a multiple of {}={}",
          dim, value, tile, size
        )));
      }
    }
    Ok(Self { dims, shape, row_block })
  }

  pub fn dims(&self) -> GemmDims {
    self.dims
  }

  pub fn shape(&self) -> TileShape {
    self.shape
  }

  pub fn row_block(&self) -> usize {
    self.row_block
  }

  pub fn m_blocks(&self) -> usize {
    self.dims.m / self.row_block
  }

  pub fn k_tiles(&self) -> usize {
    self.dims.k / self.shape.rows
  }

  pub fn n_tiles(&self) -> usize {
    self.dims.n / self.shape.cols
  }

  pub fn tile(&self, m_index: usize, k_index: usize, n_index: usize) -> Tile {
    let (r, c, mb) = (self.shape.rows, self.shape.cols, self.row_block);
    Tile {
      m_index,
      k_index,
      n_index,
      rows: m_index * mb..(m_index + 1) * mb,
      a_cols: k_index * r..(k_index + 1) * r,
      b_rows: k_index * r..(k_index + 1) * r,
      b_cols: n_index * c..(n_index + 1) * c,
    }
  }

  pub fn tiles(&self, order: TileOrder) -> Vec<Tile> {
    let mut tiles = Vec::with_capacity(self.m_blocks() * self.k_tiles() * self.n_tiles());
    match order {
      TileOrder::NOuter => {
        for n in 0..self.n_tiles() {
          for m in 0..self.m_blocks() {
            for k in 0..self.k_tiles() {
              tiles.push(self.tile(m, k, n));
            }
          }
        }
      },
      TileOrder::KOuter => {
        for k in 0..self.k_tiles() {
          for n in 0..self.n_tiles() {
            for m in 0..self.m_blocks() {
              tiles.push(self.tile(m, k, n));
            }
          }
        }
      },
    }
    tiles
  }
}

/// Tiles of an `m×k` by `k×n` GEMM on an `r×c` array, hardware write-back order.
pub fn tiles(m: usize, k: usize, n: usize, r: usize, c: usize) -> Result<Vec<Tile>> {
  let scheduler = TileScheduler::new(GemmDims { m, k, n }, TileShape { rows: r, cols: c }, None)?;
  Ok(scheduler.tiles(TileOrder::NOuter))
}
