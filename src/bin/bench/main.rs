// Diffusion Benchmark Runner v0.1.0
// Monte Carlo (N=30), seedable PRNG, synthetic responders, per-round JSONL audit trail
//
// Usage:
//   cargo run --release --bin bench                          # Run all scenarios (30 runs each)
//   cargo run --release --bin bench -- --runs 5              # Quick mode (5 runs each)
//   cargo run --release --bin bench -- ADOPTION              # Filter by name, label or category
//   cargo run --release --bin bench -- --time-series         # Enable JSONL output
//   cargo run --release --bin bench -- --seed 42             # Custom base seed
//   cargo run --release --bin bench -- --config run.toml     # Run a parameter file instead

mod monte_carlo;
mod report;
mod responders;
mod scenarios;
mod time_series;

use anyhow::Context;
use clap::Parser;
use diffusion_engine::SimulationParams;
use report::*;
use scenarios::*;
use std::path::PathBuf;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

/// Share of seeds that must pass for a scenario to count as passed.
const PASS_THRESHOLD: f64 = 0.9;

// ─── CLI Parsing ────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "bench")]
#[command(about = "Monte Carlo runner for belief diffusion scenarios")]
struct Cli {
    /// Runs per scenario
    #[arg(long, default_value = "30")]
    runs: usize,

    /// Base seed; run i uses seed + i
    #[arg(long, default_value = "0")]
    seed: u64,

    /// Write per-round JSONL under benchmark-results/time-series/
    #[arg(long)]
    time_series: bool,

    /// Run a TOML or JSON parameter file instead of the built-in scenarios
    #[arg(long)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Only run scenarios whose name, label or category contains this
    filter: Option<String>,
}

// ─── Main ───────────────────────────────────────────────────────────────────

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .init();

    let all_scenarios = match &cli.config {
        Some(path) => {
            let params = SimulationParams::from_path(path)
                .with_context(|| format!("loading {}", path.display()))?;
            vec![Scenario::from_params(params)]
        }
        None => scenarios(),
    };

    let to_run: Vec<&Scenario> = match &cli.filter {
        Some(f) => {
            let f_lower = f.to_lowercase();
            all_scenarios.iter()
                .filter(|s| s.name.to_lowercase().contains(&f_lower)
                          || s.label.to_lowercase().contains(&f_lower)
                          || s.category.contains(&f_lower))
                .collect()
        }
        None => all_scenarios.iter().collect(),
    };

    if to_run.is_empty() {
        anyhow::bail!("no scenarios match filter: {:?}", cli.filter);
    }

    let ts_dir = cli.time_series.then(|| PathBuf::from("benchmark-results/time-series"));

    println!("\n  Diffusion Benchmark Runner v0.1.0");
    println!("  PRNG: ChaCha8Rng | Runs/scenario: {} | Base seed: {}", cli.runs, cli.seed);
    println!("  Running {} scenario(s)...\n", to_run.len());
    println!("  {:<40} {:>5} {:>11} {:>8} {:>7} {:>7} {:>6} {:>7}",
        "Scenario", "Pass%", "Correct%", "Consens", "R_time", "Viral", "Depth", "Time");
    println!("  {}", "-".repeat(100));

    let suite_start = Instant::now();
    let mut mc_reports = Vec::new();

    for scenario in &to_run {
        let report = monte_carlo::run_monte_carlo(scenario, cli.runs, cli.seed, ts_dir.as_deref())?;

        let pass_pct = report.pass_rate * 100.0;
        let correct = &report.final_correct_proportion;
        let consensus = if report.final_consensus_score.n > 0 {
            format!("{:>8.2}", report.final_consensus_score.mean)
        } else {
            format!("{:>8}", "-")
        };
        let status = if report.pass_rate >= PASS_THRESHOLD { "PASS" } else { "FAIL" };

        println!("  {:<40} {:>4}% {:>6.1}±{:<4.1} {} {:>7.2} {:>7.2} {:>6.1} {:>5.0}ms  {}",
            report.label,
            pass_pct as u32,
            correct.mean * 100.0, correct.half_width() * 100.0,
            consensus,
            report.time_based_resilience.mean,
            report.final_structural_virality.mean,
            report.final_cascade_depth.mean,
            report.elapsed_ms.mean,
            status,
        );

        mc_reports.push(report);
    }

    let suite_elapsed = suite_start.elapsed();

    // ─── Summary ────────────────────────────────────────────────────────

    let total = mc_reports.len();
    let passed = mc_reports.iter().filter(|r| r.pass_rate >= PASS_THRESHOLD).count();
    let failed = total - passed;

    println!("  {}", "-".repeat(100));
    println!("  Total: {}  Passed: {}  Failed: {}  Suite time: {:.1}s\n",
        total, passed, failed, suite_elapsed.as_secs_f64());

    // ─── Write JSON Report ──────────────────────────────────────────────

    let ts = SystemTime::now().duration_since(UNIX_EPOCH)?.as_millis();
    let timestamp = format!("{}", ts);

    let report = BenchReport {
        timestamp: timestamp.clone(),
        version: "0.1.0",
        prng: "ChaCha8Rng",
        n_runs_per_scenario: cli.runs,
        base_seed: cli.seed,
        summary: Summary {
            total,
            passed,
            failed,
            pass_rate: passed as f64 / total as f64,
        },
        scenarios: mc_reports,
    };

    let dir = std::path::Path::new("benchmark-results");
    std::fs::create_dir_all(dir).context("failed to create benchmark-results/")?;
    let path = dir.join(format!("bench-{}.json", timestamp));
    let json = serde_json::to_string_pretty(&report)?;
    std::fs::write(&path, &json).with_context(|| format!("failed to write {}", path.display()))?;
    println!("  Results saved to: {}\n", path.display());

    if failed > 0 {
        std::process::exit(1);
    }
    Ok(())
}
