use clap::Parser;
use golden_gemm::generator::config::{load_and_merge_configs, CliOverrides};
use golden_gemm::generator::utils::log::init_log;
use golden_gemm::generator::utils::report::{print_replay_report, print_run_summary};
use golden_gemm::Generator;
use std::path::PathBuf;
use std::process::ExitCode;

/// golden-gemm - golden vectors for the tiled GEMM accelerator testbenches
#[derive(Parser, Debug)]
#[command(name = "golden-gemm")]
#[command(version = "0.1.0")]
#[command(about = "Generate $readmemh golden vectors for the GEMM accelerator", long_about = None)]
struct Args {
  /// Configuration file layered over the built-in defaults
  #[arg(short, long, value_name = "FILE")]
  config: Option<PathBuf>,

  /// Profile: top, core, systolic, blocked or ppu
  #[arg(short, long, value_name = "PROFILE")]
  profile: Option<String>,

  /// Output directory
  #[arg(short, long, value_name = "DIR")]
  out_dir: Option<String>,

  /// PRNG seed
  #[arg(short, long)]
  seed: Option<u64>,

  /// Rows of A per accumulator pass
  #[arg(long, value_name = "ROWS")]
  row_block: Option<usize>,

  /// Quiet mode (warnings only, no report)
  #[arg(short, long)]
  quiet: bool,

  /// Check an existing top-profile output directory instead of generating
  #[arg(long)]
  replay: bool,
}

fn run(args: Args) -> golden_gemm::Result<bool> {
  let overrides = CliOverrides {
    profile: args.profile,
    out_dir: args.out_dir,
    seed: args.seed,
    row_block: args.row_block,
  };
  let config = load_and_merge_configs(args.config.as_deref(), &overrides)?;
  let generator = Generator::new(config)?;

  if args.replay {
    let report = generator.replay(&generator.config().output_dir())?;
    print_replay_report(&report);
    Ok(report.is_clean())
  } else {
    let summary = generator.run()?;
    print_run_summary(&summary);
    Ok(true)
  }
}

fn main() -> ExitCode {
  let args = Args::parse();
  init_log(args.quiet);

  match run(args) {
    Ok(true) => ExitCode::SUCCESS,
    Ok(false) => ExitCode::FAILURE,
    Err(e) => {
      log::error!("{}", e);
      ExitCode::FAILURE
    }
  }
}
