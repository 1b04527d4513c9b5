// Benchmark Report Types
// Structured output for independent analysis of diffusion runs

use serde::Serialize;

// ─── Statistics (per-metric Monte Carlo aggregation) ────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct Stats {
    pub mean: f64,
    pub std_dev: f64,
    pub ci_lower: f64,
    pub ci_upper: f64,
    pub min: f64,
    pub max: f64,
    pub n: usize,
}

impl Stats {
    pub fn from_samples(samples: &[f64]) -> Self {
        let n = samples.len();
        if n == 0 {
            return Self { mean: 0.0, std_dev: 0.0, ci_lower: 0.0, ci_upper: 0.0, min: 0.0, max: 0.0, n: 0 };
        }
        let mean = samples.iter().sum::<f64>() / n as f64;
        let variance = if n > 1 {
            samples.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1) as f64
        } else {
            0.0
        };
        let std_dev = variance.sqrt();
        let stderr = std_dev / (n as f64).sqrt();
        let z = 1.96; // 95% CI
        Self {
            mean,
            std_dev,
            ci_lower: mean - z * stderr,
            ci_upper: mean + z * stderr,
            min: samples.iter().cloned().fold(f64::INFINITY, f64::min),
            max: samples.iter().cloned().fold(f64::NEG_INFINITY, f64::max),
            n,
        }
    }

    /// Aggregate an optional per-run value, skipping runs where it was undefined.
    pub fn from_optional<I: IntoIterator<Item = Option<f64>>>(samples: I) -> Self {
        let defined: Vec<f64> = samples.into_iter().flatten().collect();
        Self::from_samples(&defined)
    }

    pub fn half_width(&self) -> f64 {
        (self.ci_upper - self.ci_lower) / 2.0
    }
}

// ─── Single-Run Result ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct BenchResult {
    pub scenario: String,
    pub name: String,
    pub category: String,
    pub run_id: String,
    pub seed: u64,
    pub pass: bool,
    pub failures: Vec<String>,
    pub rounds: u32,
    pub node_count: usize,
    pub edge_count: usize,
    pub source_agent_id: Option<u32>,
    pub final_correct_proportion: f64,
    pub final_consensus_score: Option<f64>,
    pub mean_switch_rate: Option<f64>,
    pub time_based_resilience: f64,
    pub final_cascade_depth: usize,
    pub final_cascade_breadth: f64,
    pub final_structural_virality: f64,
    pub final_topological_resilience: f64,
    pub final_recovery_rate: f64,
    // undefined on disconnected graphs
    pub avg_path_length: Option<f64>,
    pub diameter: Option<usize>,
    pub clustering_coefficient: f64,
    pub average_degree: f64,
    pub total_utility: Option<u32>,
    pub malformed_messages: u32,
    pub elapsed_ms: u128,
}

// ─── Monte Carlo Report (per-scenario aggregation) ──────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct MonteCarloReport {
    pub scenario_name: String,
    pub label: String,
    pub category: String,
    pub n_runs: usize,
    pub pass_rate: f64,
    pub final_correct_proportion: Stats,
    pub final_consensus_score: Stats,
    pub mean_switch_rate: Stats,
    pub time_based_resilience: Stats,
    pub final_cascade_depth: Stats,
    pub final_structural_virality: Stats,
    pub final_topological_resilience: Stats,
    pub avg_path_length: Stats,
    pub clustering_coefficient: Stats,
    pub total_utility: Stats,
    pub malformed_messages: Stats,
    pub elapsed_ms: Stats,
    pub individual_runs: Vec<BenchResult>,
}

// ─── Top-Level Report ───────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct BenchReport {
    pub timestamp: String,
    pub version: &'static str,
    pub prng: &'static str,
    pub n_runs_per_scenario: usize,
    pub base_seed: u64,
    pub summary: Summary,
    pub scenarios: Vec<MonteCarloReport>,
}

#[derive(Debug, Serialize)]
pub struct Summary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub pass_rate: f64,
}
