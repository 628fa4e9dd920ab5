use crate::error::{GoldenError, Result};
use std::ops::Range;

/// Integer element with a fixed two's-complement width.
pub trait Element: Copy + Default + PartialEq + std::fmt::Debug + Into<i128> + Send + Sync {
  const BITS: u32;
}

impl Element for i8 {
  const BITS: u32 = 8;
}

impl Element for i32 {
  const BITS: u32 = 32;
}

/// Row-major integer matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix<T> {
  rows: usize,
  cols: usize,
  data: Vec<T>,
}

/// Operand matrices (activations, weights) and requantized outputs
pub type ElemMatrix = Matrix<i8>;
/// Accumulator-width matrices
pub type AccMatrix = Matrix<i32>;

impl<T: Element> Matrix<T> {
  pub fn zeros(rows: usize, cols: usize) -> Self {
    Self {
      rows,
      cols,
      data: vec![T::default(); rows * cols],
    }
  }

  pub fn from_vec(rows: usize, cols: usize, data: Vec<T>) -> Result<Self> {
    if data.len() != rows * cols {
      return Err(GoldenError::dimension(format!(
        "{} elements cannot form a {}x{} matrix",
        data.len(),
        rows,
        cols
      )));
    }
    Ok(Self { rows, cols, data })
  }

  pub fn from_rows(rows: Vec<Vec<T>>) -> Result<Self> {
    let cols = rows.first().map_or(0, |r| r.len());
    let n = rows.len();
    if rows.iter().any(|r| r.len() != cols) {
      return Err(GoldenError::dimension("ragged rows"));
    }
    Self::from_vec(n, cols, rows.into_iter().flatten().collect())
  }

  pub fn rows(&self) -> usize {
    self.rows
  }

  pub fn cols(&self) -> usize {
    self.cols
  }

  pub fn bits(&self) -> u32 {
    T::BITS
  }

  pub fn get(&self, row: usize, col: usize) -> T {
    self.data[row * self.cols + col]
  }

  pub fn set(&mut self, row: usize, col: usize, value: T) {
    self.data[row * self.cols + col] = value;
  }

  pub fn row(&self, row: usize) -> &[T] {
    &self.data[row * self.cols..(row + 1) * self.cols]
  }

  pub fn iter_rows(&self) -> impl Iterator<Item = &[T]> {
    // chunks(0) panics; with zero columns `data` is empty anyway
    self.data.chunks(self.cols.max(1))
  }

  pub fn as_slice(&self) -> &[T] {
    &self.data
  }

  /// Copy out the sub-matrix `rows × cols`.
  pub fn view(&self, rows: Range<usize>, cols: Range<usize>) -> Self {
    let mut data = Vec::with_capacity(rows.len() * cols.len());
    for r in rows.clone() {
      data.extend_from_slice(&self.row(r)[cols.clone()]);
    }
    Self {
      rows: rows.len(),
      cols: cols.len(),
      data,
    }
  }

  /// Elementwise conversion into another element type.
  pub fn map<U: Element>(&self, f: impl Fn(T) -> U) -> Matrix<U> {
    Matrix {
      rows: self.rows,
      cols: self.cols,
      data: self.data.iter().map(|&v| f(v)).collect(),
    }
  }

  pub fn try_map<U: Element>(&self, f: impl Fn(T) -> Result<U>) -> Result<Matrix<U>> {
    Ok(Matrix {
      rows: self.rows,
      cols: self.cols,
      data: self.data.iter().map(|&v| f(v)).collect::<Result<Vec<U>>>()?,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_view() {
    let m = Matrix::<i8>::from_rows(vec![vec![1, 2, 3], vec![4, 5, 6], vec![7, 8, 9]]).unwrap();
    let v = m.view(1..3, 0..2);
    assert_eq!(v.rows(), 2);
    assert_eq!(v.cols(), 2);
    assert_eq!(v.as_slice(), &[4, 5, 7, 8]);
  }

  #[test]
  fn test_from_vec_size_check() {
    assert!(matches!(
      Matrix::<i32>::from_vec(2, 2, vec![1, 2, 3]),
      Err(GoldenError::Dimension { .. })
    ));
  }

  #[test]
  fn test_iter_rows() {
    let m = Matrix::<i32>::from_vec(2, 3, vec![1, 2, 3, 4, 5, 6]).unwrap();
    let rows: Vec<&[i32]> = m.iter_rows().collect();
    assert_eq!(rows, vec![&[1, 2, 3][..], &[4, 5, 6][..]]);
    assert_eq!(Matrix::<i8>::zeros(0, 4).iter_rows().count(), 0);
  }
}
