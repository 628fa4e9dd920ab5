// Artifact sets for each testbench.
//
// Everything is computed in memory; nothing here touches the filesystem.

use super::artifact::Artifact;
use super::config::{AppConfig, Profile};
use super::data::DataSource;
use crate::arch::{ElemMatrix, GemmAccumulator, Tile, TileOrder, TiledGemm};
use crate::error::Result;

/// Build every artifact of the configured profile.
pub fn build(config: &AppConfig) -> Result<Vec<Artifact>> {
  let mut source = DataSource::new(config.data.seed);
  match config.profile {
    Profile::Top => top(config, &mut source),
    Profile::Core => core(config, &mut source),
    Profile::Systolic => systolic(config, &mut source),
    Profile::Blocked => blocked(config, &mut source),
    Profile::Ppu => ppu(config, &mut source),
  }
}

struct GemmRun {
  a: ElemMatrix,
  b: ElemMatrix,
  tiled: TiledGemm,
  m_blocks: usize,
  k_tiles: usize,
  n_tiles: usize,
}

fn run_gemm(config: &AppConfig, source: &mut DataSource, order: TileOrder) -> Result<GemmRun> {
  let scheduler = config.scheduler()?;
  let (a, b) = source.gemm_operands(config.dims(), config.data.operand_min, config.data.operand_max)?;
  let gemm = GemmAccumulator::new(scheduler);
  let tiled = gemm.run(&a, &b, order)?;
  log::info!(
    "GEMM {}x{}x{} on {}x{} array: {} tile steps",
    config.gemm.m,
    config.gemm.k,
    config.gemm.n,
    config.array.rows,
    config.array.cols,
    tiled.steps.len()
  );
  Ok(GemmRun {
    a,
    b,
    tiled,
    m_blocks: scheduler.m_blocks(),
    k_tiles: scheduler.k_tiles(),
    n_tiles: scheduler.n_tiles(),
  })
}

fn a_tile(run: &GemmRun, tile: &Tile) -> ElemMatrix {
  run.a.view(tile.rows.clone(), tile.a_cols.clone())
}

fn b_tile(run: &GemmRun, tile: &Tile) -> ElemMatrix {
  run.b.view(tile.b_rows.clone(), tile.b_cols.clone())
}

fn tile_suffix(tile: &Tile, m_blocks: usize) -> String {
  if m_blocks > 1 {
    format!("m{}_k{}_n{}", tile.m_index, tile.k_index, tile.n_index)
  } else {
    format!("k{}_n{}", tile.k_index, tile.n_index)
  }
}

/// System-level testbench: per-tile streams and accumulator RAM contents,
/// AXI-stream views of inputs, weights and requantized output, PPU config.
fn top(config: &AppConfig, source: &mut DataSource) -> Result<Vec<Artifact>> {
  let run = run_gemm(config, source, TileOrder::KOuter)?;
  let ppu = config.requantizer()?;
  let output = ppu.apply_matrix(&run.tiled.result)?;
  let (m, r, c) = (config.gemm.m, config.array.rows, config.array.cols);

  let mut files = Vec::new();

  for step in &run.tiled.steps {
    let t = &step.tile;
    let sfx = tile_suffix(t, run.m_blocks);
    files.push(Artifact::rows(format!("input_{}.mem", sfx), &a_tile(&run, t))?);
    files.push(Artifact::rows(format!("weight_{}.mem", sfx), &b_tile(&run, t))?);
    // tile product as it leaves the array
    files.push(Artifact::rows(format!("acc_golden_{}.mem", sfx), &step.partial)?);
    // accumulator RAM after write-back
    files.push(Artifact::rows(format!("ram_golden_{}.mem", sfx), &step.snapshot)?);
  }

  for k in 0..run.k_tiles {
    let rows = Artifact::rows("", &run.a.view(0..m, k * r..(k + 1) * r))?;
    files.push(Artifact::stream(format!("axis_input_k{}.mem", k), &rows, config.bus.input_bits)?);
  }

  for n in 0..run.n_tiles {
    for k in 0..run.k_tiles {
      let rows = Artifact::rows("", &run.b.view(k * r..(k + 1) * r, n * c..(n + 1) * c))?;
      files.push(Artifact::stream(
        format!("axis_weight_k{}_n{}.mem", k, n),
        &rows,
        config.bus.weight_bits,
      )?);
    }
  }

  for n in 0..run.n_tiles {
    let rows = Artifact::rows("", &output.view(0..m, n * c..(n + 1) * c))?;
    files.push(Artifact::stream(format!("axis_golden_n{}.mem", n), &rows, config.bus.output_bits)?);
  }

  files.push(Artifact::pipeline_config("config.mem", &config.pipeline(), config.layout())?);
  Ok(files)
}

/// Core testbench: K-sliced inputs, per-tile weights, per-n accumulator golden.
fn core(config: &AppConfig, source: &mut DataSource) -> Result<Vec<Artifact>> {
  let run = run_gemm(config, source, TileOrder::NOuter)?;
  let (m, r, c) = (config.gemm.m, config.array.rows, config.array.cols);

  let mut files = Vec::new();
  for k in 0..run.k_tiles {
    files.push(Artifact::rows(format!("input_k{}.mem", k), &run.a.view(0..m, k * r..(k + 1) * r))?);
  }
  for n in 0..run.n_tiles {
    for k in 0..run.k_tiles {
      files.push(Artifact::rows(
        format!("weight_k{}_n{}.mem", k, n),
        &run.b.view(k * r..(k + 1) * r, n * c..(n + 1) * c),
      )?);
    }
  }
  for n in 0..run.n_tiles {
    files.push(Artifact::rows(
      format!("golden_n{}.mem", n),
      &run.tiled.result.view(0..m, n * c..(n + 1) * c),
    )?);
  }
  Ok(files)
}

/// Bare array testbench, exactly one tile.
fn systolic(config: &AppConfig, source: &mut DataSource) -> Result<Vec<Artifact>> {
  let run = run_gemm(config, source, TileOrder::NOuter)?;
  Ok(vec![
    Artifact::rows("sa_weights.mem", &run.b)?,
    Artifact::rows("sa_inputs.mem", &run.a)?,
    Artifact::rows("sa_golden.mem", &run.tiled.result)?,
  ])
}

/// Row-blocked testbench with one flat 32-bit golden file.
fn blocked(config: &AppConfig, source: &mut DataSource) -> Result<Vec<Artifact>> {
  let run = run_gemm(config, source, TileOrder::NOuter)?;
  let (r, c) = (config.array.rows, config.array.cols);
  let block = config.row_block().unwrap_or(config.gemm.m);

  let mut files = Vec::new();
  for n in 0..run.n_tiles {
    for k in 0..run.k_tiles {
      files.push(Artifact::rows(
        format!("w_k{}_n{}.mem", k, n),
        &run.b.view(k * r..(k + 1) * r, n * c..(n + 1) * c),
      )?);
    }
  }
  for mb in 0..run.m_blocks {
    for k in 0..run.k_tiles {
      files.push(Artifact::rows(
        format!("a_m{}_k{}.mem", mb, k),
        &run.a.view(mb * block..(mb + 1) * block, k * r..(k + 1) * r),
      )?);
    }
  }
  files.push(Artifact::flat("golden.mem", &run.tiled.result)?);
  Ok(files)
}

/// Requantizer unit vectors.
fn ppu(config: &AppConfig, source: &mut DataSource) -> Result<Vec<Artifact>> {
  let ppu = config.requantizer()?;
  let inputs = source.accumulators(
    config.data.ppu_samples,
    config.array.cols,
    config.data.ppu_min,
    config.data.ppu_max,
  )?;
  let golden = ppu.apply_matrix(&inputs)?;
  log::info!(
    "PPU: {} samples x {} lanes, mult={} shift={} zp={} bias={} ({:?})",
    inputs.rows(),
    inputs.cols(),
    config.ppu.multiplier,
    config.ppu.shift,
    config.ppu.zero_point,
    config.ppu.bias,
    ppu.bias_stage()
  );
  Ok(vec![
    Artifact::rows("ppu_inputs.mem", &inputs)?,
    Artifact::rows("ppu_golden.mem", &golden)?,
    Artifact::pipeline_config("ppu_config.mem", &config.pipeline(), config.layout())?,
  ])
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::generator::config::load_default_config;

  fn names(files: &[Artifact]) -> Vec<&str> {
    files.iter().map(|f| f.name.as_str()).collect()
  }

  #[test]
  fn test_top_file_set() {
    let cfg = load_default_config().unwrap();
    let files = build(&cfg).unwrap();
    let names = names(&files);
    // 4 tiles x 4 files, 2 axis inputs, 4 axis weights, 2 axis golden, config
    assert_eq!(files.len(), 16 + 2 + 4 + 2 + 1);
    assert_eq!(&names[..4], &["input_k0_n0.mem", "weight_k0_n0.mem", "acc_golden_k0_n0.mem", "ram_golden_k0_n0.mem"]);
    assert_eq!(names[4], "input_k0_n1.mem");
    assert!(names.contains(&"axis_weight_k1_n0.mem"));
    assert_eq!(*names.last().unwrap(), "config.mem");
  }

  #[test]
  fn test_top_line_shapes() {
    let cfg = load_default_config().unwrap();
    let files = build(&cfg).unwrap();
    let get = |n: &str| files.iter().find(|f| f.name == n).unwrap();
    let input = get("input_k0_n0.mem");
    assert_eq!(input.lines.len(), 32);
    assert_eq!(input.lines[0].len(), 24);
    assert_eq!(get("weight_k0_n0.mem").lines.len(), 12);
    assert_eq!(get("ram_golden_k1_n1.mem").lines[0].len(), 128);
    // 32 rows x 12 bytes = 48 64-bit words
    assert_eq!(get("axis_input_k0.mem").lines.len(), 48);
    assert_eq!(get("axis_weight_k0_n0.mem").lines.len(), 24);
    assert_eq!(get("axis_golden_n0.mem").lines.len(), 64);
    assert_eq!(get("config.mem").lines, vec!["000000b4", "00000008", "0000000a", "00000064"]);
  }

  #[test]
  fn test_core_and_blocked() {
    let mut cfg = load_default_config().unwrap();
    cfg.profile = Profile::Core;
    let core_names: Vec<String> = build(&cfg).unwrap().into_iter().map(|f| f.name).collect();
    assert_eq!(
      core_names,
      vec![
        "input_k0.mem",
        "input_k1.mem",
        "weight_k0_n0.mem",
        "weight_k1_n0.mem",
        "weight_k0_n1.mem",
        "weight_k1_n1.mem",
        "golden_n0.mem",
        "golden_n1.mem"
      ]
    );

    cfg.profile = Profile::Blocked;
    let files = build(&cfg).unwrap();
    let golden = files.iter().find(|f| f.name == "golden.mem").unwrap();
    assert_eq!(golden.lines.len(), 32 * 32);
    assert!(files.iter().any(|f| f.name == "a_m1_k1.mem"));
  }

  #[test]
  fn test_ppu_profile() {
    let mut cfg = load_default_config().unwrap();
    cfg.profile = Profile::Ppu;
    let files = build(&cfg).unwrap();
    assert_eq!(names(&files), vec!["ppu_inputs.mem", "ppu_golden.mem", "ppu_config.mem"]);
    assert_eq!(files[0].lines.len(), 100);
    assert_eq!(files[0].lines[0].len(), 16 * 8);
    assert_eq!(files[1].lines[0].len(), 16 * 2);
    assert_eq!(files[2].lines, vec!["00b4", "08", "0a", "00000064"]);
  }
}
