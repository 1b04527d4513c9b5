// Monte Carlo Infrastructure: N runs per scenario with statistical aggregation
// Each scenario runs N times with seeds base..base+N, computing mean ± 95% CI

use anyhow::Context;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use diffusion_engine::metrics::{self, AdvancedMetrics, RESILIENCE_THRESHOLD};
use diffusion_engine::*;

use crate::report::*;
use crate::responders::{CorrectionShock, MajorityResponder, PersuasionExchange};
use crate::scenarios::Scenario;
use crate::time_series::TimeSeriesRecorder;

use std::time::Instant;

/// Offsets keeping the synthetic collaborators off the engine's own stream.
const BELIEF_STREAM: u64 = 0x5EED_0001;
const RESPONDER_STREAM: u64 = 0x5EED_0002;

const INITIAL_ESTIMATE: &str = "This is my own rough estimate.";
const INITIAL_DECISION: &str = "Technology A is the option everyone knows.";

/// Run a single scenario iteration with a specific seed.
pub fn run_single(
    scenario: &Scenario,
    seed: u64,
    time_series_dir: Option<&std::path::Path>,
) -> anyhow::Result<BenchResult> {
    let start = Instant::now();
    let mut params = scenario.params.clone();
    params.seed = seed;
    params.run_id = Some(format!("{}-seed{}", scenario.name.to_lowercase(), seed));
    let run_id = params.run_id();

    let node_count = TopologySpec::resolve(&params.topology, None, seed)
        .with_context(|| format!("scenario {}", scenario.name))?
        .node_count();
    let agents = Agent::roster(node_count as u32);
    let responder_rng = ChaCha8Rng::seed_from_u64(seed.wrapping_add(RESPONDER_STREAM));

    let (output, malformed_messages) = match &params.model {
        ModelParams::Debate(debate) => {
            let mut belief_rng = ChaCha8Rng::seed_from_u64(seed.wrapping_add(BELIEF_STREAM));
            let beliefs = agents
                .iter()
                .map(|_| BeliefState::new(debate.correct_value + belief_rng.gen_range(1..=50), INITIAL_ESTIMATE))
                .collect();
            let exchange = PersuasionExchange::new(responder_rng, scenario.persuasion, scenario.malformed_rate);
            let mut sim = Simulation::new(agents, beliefs, &params, PairwiseDebate::new(debate, exchange))?;
            if let Some(stride) = scenario.shock_stride {
                sim = sim.with_shock(CorrectionShock { correct_value: debate.correct_value, stride });
            }
            sim.run_to_end()?;
            let malformed = sim.policy().exchange().malformed_count;
            (sim.into_output(), malformed)
        }
        ModelParams::Adoption(adoption) => {
            let beliefs = agents.iter().map(|_| BeliefState::new(0, INITIAL_DECISION)).collect();
            let responder = MajorityResponder::new(responder_rng, scenario.exploration, scenario.malformed_rate);
            let policy = NetworkAdoption::new(adoption, responder)?;
            let mut sim = Simulation::new(agents, beliefs, &params, policy)?;
            sim.run_to_end()?;
            let malformed = sim.policy().responder().malformed_count;
            (sim.into_output(), malformed)
        }
    };

    // ─── Metrics ────────────────────────────────────────────────────────

    let basic = match metrics::basic_metrics(&run_id, &output.graph) {
        Ok(b) => Some(b),
        Err(e) => {
            tracing::debug!(run_id = %run_id, error = %e, "structural metrics undefined");
            None
        }
    };
    let advanced = metrics::time_series_metrics(&run_id, &output.graph, &output.model_records);
    let last_metrics = advanced.last().cloned().unwrap_or_else(|| empty_metrics(&run_id));

    let proportions: Vec<f64> = output.model_records.iter().map(|r| r.correct_proportion).collect();
    let time_based_resilience = if proportions.is_empty() {
        0.0
    } else {
        metrics::time_based_resilience(&proportions, RESILIENCE_THRESHOLD)
    };
    let last_record = output.model_records.last();
    let final_correct_proportion = last_record.map_or(0.0, |r| r.correct_proportion);
    let switch_rates: Vec<f64> = output.model_records.iter().filter_map(|r| r.switch_rate).collect();
    let mean_switch_rate = if switch_rates.is_empty() {
        None
    } else {
        Some(switch_rates.iter().sum::<f64>() / switch_rates.len() as f64)
    };
    let total_utility = last_record.and_then(|last| {
        output
            .agent_records
            .iter()
            .filter(|a| a.round == last.round)
            .map(|a| a.ledger.as_ref().map(|l| l.utility))
            .sum::<Option<u32>>()
    });

    // ─── Pass / Fail ────────────────────────────────────────────────────

    let mut failures = Vec::new();
    if let Some(min) = scenario.criteria.min_final_correct {
        if final_correct_proportion < min {
            failures.push(format!("final correct {:.2} < {:.2}", final_correct_proportion, min));
        }
    }
    if scenario.criteria.require_connected && basic.is_none() {
        failures.push("graph is disconnected".to_string());
    }
    if scenario.criteria.require_source_retained {
        let first = output.model_records.iter().find(|r| r.round == 1);
        if let (Some(source), Some(first)) = (output.source_agent_id, first) {
            if first.correct_count == 0 {
                failures.push(format!("reference value from source {} lost in round 1", source));
            }
        }
    }

    if let Some(dir) = time_series_dir {
        let mut recorder = TimeSeriesRecorder::new();
        recorder.extend(metrics::join_rounds(std::slice::from_ref(&output), &advanced));
        let path = dir.join(format!("seed-{}.jsonl", seed));
        if let Err(e) = recorder.write_jsonl(&path) {
            tracing::warn!(path = %path.display(), error = %e, "failed to write time series");
        } else {
            tracing::debug!(path = %path.display(), rows = recorder.len(), "time series written");
        }
    }

    Ok(BenchResult {
        scenario: scenario.label.clone(),
        name: scenario.name.clone(),
        category: scenario.category.to_string(),
        run_id,
        seed,
        pass: failures.is_empty(),
        failures,
        rounds: params.num_rounds,
        node_count: output.graph.node_count(),
        edge_count: output.graph.edge_count(),
        source_agent_id: output.source_agent_id,
        final_correct_proportion,
        final_consensus_score: last_record.and_then(|r| r.consensus_score),
        mean_switch_rate,
        time_based_resilience,
        final_cascade_depth: last_metrics.cascade_depth,
        final_cascade_breadth: last_metrics.cascade_breadth,
        final_structural_virality: last_metrics.structural_virality,
        final_topological_resilience: last_metrics.topological_resilience,
        final_recovery_rate: last_metrics.recovery_rate,
        avg_path_length: basic.as_ref().map(|b| b.avg_path_length),
        diameter: basic.as_ref().map(|b| b.diameter),
        clustering_coefficient: metrics::average_clustering(&output.graph),
        average_degree: metrics::average_degree(&output.graph),
        total_utility,
        malformed_messages,
        elapsed_ms: start.elapsed().as_millis(),
    })
}

fn empty_metrics(run_id: &str) -> AdvancedMetrics {
    AdvancedMetrics {
        simulation_run_id: run_id.to_string(),
        round: 0,
        cascade_depth: 0,
        cascade_breadth: 0.0,
        structural_virality: 0.0,
        fractional_resilience: 0.0,
        topological_resilience: 0.0,
        recovery_rate: 0.0,
    }
}

/// Run Monte Carlo: N runs of a scenario, aggregate stats.
pub fn run_monte_carlo(
    scenario: &Scenario,
    n_runs: usize,
    base_seed: u64,
    time_series_base: Option<&std::path::Path>,
) -> anyhow::Result<MonteCarloReport> {
    let ts_dir = time_series_base.map(|base| base.join(scenario.name.to_lowercase()));

    let mut results = Vec::with_capacity(n_runs);
    for i in 0..n_runs {
        let seed = base_seed + i as u64;
        let result = run_single(scenario, seed, ts_dir.as_deref())
            .with_context(|| format!("{} failed at seed {}", scenario.name, seed))?;
        results.push(result);
    }

    Ok(aggregate(scenario, results))
}

/// Aggregate individual runs into a MonteCarloReport.
fn aggregate(scenario: &Scenario, results: Vec<BenchResult>) -> MonteCarloReport {
    let n = results.len();
    let passed = results.iter().filter(|r| r.pass).count();
    let pass_rate = if n == 0 { 0.0 } else { passed as f64 / n as f64 };

    let stats = |f: fn(&BenchResult) -> f64| Stats::from_samples(&results.iter().map(f).collect::<Vec<_>>());
    let optional = |f: fn(&BenchResult) -> Option<f64>| Stats::from_optional(results.iter().map(f));

    MonteCarloReport {
        scenario_name: scenario.name.clone(),
        label: scenario.label.clone(),
        category: scenario.category.to_string(),
        n_runs: n,
        pass_rate,
        final_correct_proportion: stats(|r| r.final_correct_proportion),
        final_consensus_score: optional(|r| r.final_consensus_score),
        mean_switch_rate: optional(|r| r.mean_switch_rate),
        time_based_resilience: stats(|r| r.time_based_resilience),
        final_cascade_depth: stats(|r| r.final_cascade_depth as f64),
        final_structural_virality: stats(|r| r.final_structural_virality),
        final_topological_resilience: stats(|r| r.final_topological_resilience),
        avg_path_length: optional(|r| r.avg_path_length),
        clustering_coefficient: stats(|r| r.clustering_coefficient),
        total_utility: optional(|r| r.total_utility.map(f64::from)),
        malformed_messages: stats(|r| r.malformed_messages as f64),
        elapsed_ms: stats(|r| r.elapsed_ms as f64),
        individual_runs: results,
    }
}
