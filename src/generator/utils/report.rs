use super::log::is_report_enabled;
use crate::generator::generator::RunSummary;
use crate::generator::replay::ReplayReport;

pub fn print_run_summary(summary: &RunSummary) {
  if !is_report_enabled() {
    return;
  }
  println!("\n--- Golden Vectors ({}) ---", summary.profile);
  println!("  seed {}  ->  {}", summary.seed, summary.dir.display());
  for path in &summary.written {
    if let Some(name) = path.file_name() {
      println!("  {}", name.to_string_lossy());
    }
  }
  println!("--- {} files ---\n", summary.written.len());
}

pub fn print_replay_report(report: &ReplayReport) {
  if !is_report_enabled() {
    return;
  }
  println!("\n--- Replay ---");
  for step in &report.steps {
    match step.mismatches {
      Some(0) => println!("  m{} k{} n{}: ok", step.m_index, step.k_index, step.n_index),
      Some(count) => println!(
        "  m{} k{} n{}: {} mismatches",
        step.m_index, step.k_index, step.n_index, count
      ),
      None => println!("  m{} k{} n{}: no golden", step.m_index, step.k_index, step.n_index),
    }
  }
  for name in &report.missing {
    println!("  missing {}", name);
  }
  println!(
    "--- {} ---\n",
    if report.is_clean() { "PASS" } else { "FAIL" }
  );
}
