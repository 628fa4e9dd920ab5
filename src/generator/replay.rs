// Replay a top-profile directory through the accumulator model.
//
// Operands are recovered from the bus streams, so a broken gearbox or a
// stale RAM golden both show up as mismatches here.

use super::config::AppConfig;
use crate::arch::{partial, AccMatrix, AccumulatorState, ElemMatrix, Element, Matrix, Tile};
use crate::codec::{unpack, Gearbox};
use crate::error::{GoldenError, Result};
use std::fmt::Display;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

/// Outcome of one (m, k, n) write-back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayStep {
  pub m_index: usize,
  pub k_index: usize,
  pub n_index: usize,
  /// Differing accumulator entries; `None` when the RAM golden was missing
  pub mismatches: Option<usize>,
}

#[derive(Debug, Clone, Default)]
pub struct ReplayReport {
  pub steps: Vec<ReplayStep>,
  /// Files replaced by zeros or skipped
  pub missing: Vec<String>,
}

impl ReplayReport {
  pub fn total_mismatches(&self) -> usize {
    self.steps.iter().filter_map(|s| s.mismatches).sum()
  }

  pub fn is_clean(&self) -> bool {
    self.missing.is_empty() && self.total_mismatches() == 0
  }
}

/// Non-comment lines of a `.mem` file, or `None` when it does not exist.
pub fn read_mem(path: &Path) -> Result<Option<Vec<String>>> {
  let text = match fs::read_to_string(path) {
    Ok(text) => text,
    Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
    Err(e) => return Err(e.into()),
  };
  let lines = text
    .lines()
    .map(str::trim)
    .filter(|l| !l.is_empty() && !l.starts_with("//"))
    .map(str::to_string)
    .collect();
  Ok(Some(lines))
}

/// Rebuild a lane matrix from row words of `cols × lane_bits`.
fn rows_to_matrix<T: Element>(
  words: &[String],
  rows: usize,
  cols: usize,
  narrow: impl Fn(i128) -> T,
) -> Result<Matrix<T>> {
  if words.len() != rows {
    return Err(GoldenError::dimension(format!("expected {} rows, found {}", rows, words.len())));
  }
  let mut data = Vec::with_capacity(rows * cols);
  for word in words {
    data.extend(unpack(word, T::BITS, cols)?.into_iter().map(&narrow));
  }
  Matrix::from_vec(rows, cols, data)
}

/// Decode a gearboxed stream back into a `rows × cols` int8 matrix.
fn load_stream(dir: &Path, name: &str, rows: usize, cols: usize, bus_bits: u32, missing: &mut Vec<String>) -> Result<ElemMatrix> {
  match read_mem(&dir.join(name))? {
    Some(words) => {
      let gearbox = Gearbox::new(cols as u32 * 8, bus_bits)?;
      // 8-bit lanes always decode into i8 range
      rows_to_matrix(&gearbox.decode(&words)?, rows, cols, |v| v as i8)
    }
    None => {
      // input streams are shared by every n-tile, report them once
      if !missing.iter().any(|m| m == name) {
        log::warn!("{} not found, using a zero tile", name);
        missing.push(name.to_string());
      }
      Ok(ElemMatrix::zeros(rows, cols))
    }
  }
}

fn debug_dump(tile: &Tile, a: &ElemMatrix, b: &ElemMatrix, part: &AccMatrix, snapshot: &AccMatrix) -> String {
  fn section<T: Element + Display>(out: &mut String, title: &str, m: &Matrix<T>) {
    out.push_str(&format!("// {} ({}x{})\n", title, m.rows(), m.cols()));
    for row in m.iter_rows() {
      let line: Vec<String> = row.iter().map(|v| v.to_string()).collect();
      out.push_str(&line.join(" "));
      out.push('\n');
    }
  }

  let mut out = format!(
    "// m{} k{} n{}: {}\n",
    tile.m_index,
    tile.k_index,
    tile.n_index,
    if tile.k_index == 0 { "store" } else { "accumulate" }
  );
  section(&mut out, "input", a);
  section(&mut out, "weight", b);
  section(&mut out, "partial", part);
  section(&mut out, "accumulator", snapshot);
  out
}

/// Recompute every write-back of a top-profile run found in `dir`.
///
/// Writes `debug_k{k}_n{n}.txt` next to the inputs.
pub fn replay(config: &AppConfig, dir: &Path) -> Result<ReplayReport> {
  let scheduler = config.scheduler()?;
  let dims = scheduler.dims();
  let shape = scheduler.shape();
  let m_blocks = scheduler.m_blocks();

  let mut report = ReplayReport::default();
  let mut state = AccumulatorState::new(dims.m, dims.n);

  for n in 0..scheduler.n_tiles() {
    for k in 0..scheduler.k_tiles() {
      let a_full = load_stream(
        dir,
        &format!("axis_input_k{}.mem", k),
        dims.m,
        shape.rows,
        config.bus.input_bits,
        &mut report.missing,
      )?;
      let b = load_stream(
        dir,
        &format!("axis_weight_k{}_n{}.mem", k, n),
        shape.rows,
        shape.cols,
        config.bus.weight_bits,
        &mut report.missing,
      )?;

      let mut dump = String::new();
      for m in 0..m_blocks {
        let tile = scheduler.tile(m, k, n);
        let a = a_full.view(tile.rows.clone(), 0..shape.rows);
        let part = partial(&a, &b)?;
        let snapshot = state.accumulate(&tile, &part)?;

        let suffix = if m_blocks > 1 {
          format!("m{}_k{}_n{}", m, k, n)
        } else {
          format!("k{}_n{}", k, n)
        };
        let golden_name = format!("ram_golden_{}.mem", suffix);
        let mismatches = match read_mem(&dir.join(&golden_name))? {
          Some(words) => {
            let golden: AccMatrix = rows_to_matrix(&words, tile.rows.len(), shape.cols, |v| v as i32)?;
            let count = golden
              .as_slice()
              .iter()
              .zip(snapshot.as_slice())
              .filter(|(g, s)| g != s)
              .count();
            if count > 0 {
              log::warn!("{}: {} mismatching entries", golden_name, count);
            }
            Some(count)
          }
          None => {
            log::warn!("{} not found, skipping comparison", golden_name);
            report.missing.push(golden_name);
            None
          }
        };

        dump.push_str(&debug_dump(&tile, &a, &b, &part, &snapshot));
        report.steps.push(ReplayStep {
          m_index: m,
          k_index: k,
          n_index: n,
          mismatches,
        });
      }
      fs::write(dir.join(format!("debug_k{}_n{}.txt", k, n)), dump)?;
    }
  }

  log::info!(
    "replayed {} write-backs, {} mismatches, {} missing files",
    report.steps.len(),
    report.total_mismatches(),
    report.missing.len()
  );
  Ok(report)
}
