// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Belief Diffusion Simulation Suite - Metrics Engine
//
// Pure functions over a finished graph and its round records. Structural
// metrics are computed once per run; cascade and resilience metrics once per
// (run, round). Functions below take node ids; the table builders convert
// agent ids (1-based) to node ids (0-based) before touching the graph.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::error::{Result, SimError};
use crate::graph::Graph;
use crate::model::SimulationOutput;
use crate::types::{node_of, AgentId, ModelRoundRecord, NodeId};

/// Default proportion threshold for [`time_based_resilience`].
pub const RESILIENCE_THRESHOLD: f64 = 0.5;

// ─── Structural ──────────────────────────────────────────────────────────────

pub fn average_degree(graph: &Graph) -> f64 {
    if graph.is_empty() {
        return 0.0;
    }
    let total: usize = graph.nodes().map(|u| graph.degree(u)).sum();
    total as f64 / graph.node_count() as f64
}

/// Mean hop distance over all ordered pairs of distinct nodes.
pub fn average_shortest_path_length(graph: &Graph) -> Result<f64> {
    require_connected(graph, "average_shortest_path_length")?;
    let n = graph.node_count();
    if n == 1 {
        return Ok(0.0);
    }
    let total: usize = graph.nodes().map(|u| graph.bfs_distances(u).values().sum::<usize>()).sum();
    Ok(total as f64 / (n * (n - 1)) as f64)
}

/// Mean local clustering; nodes of degree < 2 contribute 0. Empty graph is 0.
pub fn average_clustering(graph: &Graph) -> f64 {
    if graph.is_empty() {
        return 0.0;
    }
    let total: f64 = graph.nodes().map(|u| local_clustering(graph, u)).sum();
    total / graph.node_count() as f64
}

fn local_clustering(graph: &Graph, u: NodeId) -> f64 {
    let neighbors: Vec<NodeId> = graph.neighbors(u).collect();
    let d = neighbors.len();
    if d < 2 {
        return 0.0;
    }
    let mut links = 0usize;
    for (i, &a) in neighbors.iter().enumerate() {
        links += neighbors[i + 1..].iter().filter(|&&b| graph.has_edge(a, b)).count();
    }
    2.0 * links as f64 / (d * (d - 1)) as f64
}

/// Node degrees in node order. Read it as a multiset.
pub fn degree_distribution(graph: &Graph) -> Vec<usize> {
    graph.nodes().map(|u| graph.degree(u)).collect()
}

pub fn connected_component_count(graph: &Graph) -> usize {
    graph.component_count()
}

/// Largest eccentricity.
pub fn diameter(graph: &Graph) -> Result<usize> {
    require_connected(graph, "diameter")?;
    Ok(graph
        .nodes()
        .filter_map(|u| graph.bfs_distances(u).into_values().max())
        .max()
        .unwrap_or(0))
}

fn require_connected(graph: &Graph, metric: &'static str) -> Result<()> {
    if graph.is_empty() {
        return Err(SimError::GraphMetricUndefined { metric, reason: "graph has no nodes".into() });
    }
    if !graph.is_connected() {
        return Err(SimError::GraphMetricUndefined {
            metric,
            reason: format!("graph has {} connected components", connected_component_count(graph)),
        });
    }
    Ok(())
}

// ─── Cascade ─────────────────────────────────────────────────────────────────

/// Farthest adopter from `source` inside the adopter subgraph.
/// 0 when the source is not an adopter.
pub fn cascade_depth(adopters: &Graph, source: NodeId) -> usize {
    adopters.bfs_distances(source).into_values().max().unwrap_or(0)
}

pub fn cascade_breadth(graph: &Graph, adopters: &Graph) -> f64 {
    if graph.is_empty() {
        return 0.0;
    }
    adopters.node_count() as f64 / graph.node_count() as f64
}

/// Mean pairwise distance inside the adopter subgraph. Unreachable pairs count as 0.
pub fn structural_virality(adopters: &Graph) -> f64 {
    let n = adopters.node_count();
    if n < 2 {
        return 0.0;
    }
    let total: usize = adopters.nodes().map(|u| adopters.bfs_distances(u).values().sum::<usize>()).sum();
    total as f64 / (n * (n - 1)) as f64
}

// ─── Resilience ──────────────────────────────────────────────────────────────

/// Share of the graph holding the correct value.
///
/// # Panics
/// If more correct nodes are given than the graph has.
pub fn fractional_resilience(graph: &Graph, correct: &[NodeId]) -> f64 {
    if graph.is_empty() {
        return 0.0;
    }
    assert!(
        correct.len() <= graph.node_count(),
        "{} correct nodes in a graph of {}",
        correct.len(),
        graph.node_count()
    );
    correct.len() as f64 / graph.node_count() as f64
}

/// `1 - largest misinformed component / largest component`.
pub fn topological_resilience(graph: &Graph, misinformed: &[NodeId]) -> f64 {
    if graph.is_empty() {
        return 0.0;
    }
    let sub = graph.induced_subgraph(misinformed.iter().copied());
    if sub.is_empty() {
        return 1.0;
    }
    1.0 - sub.largest_component_size() as f64 / graph.largest_component_size() as f64
}

/// Length of the leading run of rounds above `threshold`, over the series length.
///
/// # Panics
/// On an empty series.
pub fn time_based_resilience(correct_proportions: &[f64], threshold: f64) -> f64 {
    assert!(!correct_proportions.is_empty(), "time-based resilience needs at least one round");
    let leading = correct_proportions.iter().take_while(|&&p| p > threshold).count();
    leading as f64 / correct_proportions.len() as f64
}

pub fn recovery_rate(correct: usize, misinformed: usize, time_step: u32) -> f64 {
    if time_step == 0 {
        return 0.0;
    }
    if misinformed == 0 {
        return 1.0;
    }
    correct as f64 / misinformed as f64 / time_step as f64
}

// ─── Tables ──────────────────────────────────────────────────────────────────

/// Whole-graph metrics, one row per run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BasicMetrics {
    pub simulation_run_id: String,
    pub avg_path_length: f64,
    pub clustering_coefficient: f64,
    pub num_connected_components: usize,
    pub diameter: usize,
    pub average_degree: f64,
}

/// Cascade and resilience metrics, one row per (run, round).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdvancedMetrics {
    pub simulation_run_id: String,
    pub round: u32,
    pub cascade_depth: usize,
    pub cascade_breadth: f64,
    pub structural_virality: f64,
    pub fractional_resilience: f64,
    pub topological_resilience: f64,
    pub recovery_rate: f64,
}

/// Fails if the graph is empty or disconnected.
pub fn basic_metrics(run_id: &str, graph: &Graph) -> Result<BasicMetrics> {
    Ok(BasicMetrics {
        simulation_run_id: run_id.to_string(),
        avg_path_length: average_shortest_path_length(graph)?,
        clustering_coefficient: average_clustering(graph),
        num_connected_components: connected_component_count(graph),
        diameter: diameter(graph)?,
        average_degree: average_degree(graph),
    })
}

/// Per-round metrics for one set of correct / misinformed agents.
pub fn advanced_metrics(
    run_id: &str,
    round: u32,
    graph: &Graph,
    correct: &[AgentId],
    misinformed: &[AgentId],
    source: Option<AgentId>,
) -> AdvancedMetrics {
    if correct.iter().chain(misinformed).chain(&source).any(|&a| node_of(a).is_none()) {
        tracing::warn!(run_id, round, "agent id 0 in round record; ignoring it");
    }
    let correct_nodes: Vec<NodeId> = correct.iter().filter_map(|&a| node_of(a)).collect();
    let misinformed_nodes: Vec<NodeId> = misinformed.iter().filter_map(|&a| node_of(a)).collect();
    let adopters = graph.induced_subgraph(correct_nodes.iter().copied());

    AdvancedMetrics {
        simulation_run_id: run_id.to_string(),
        round,
        cascade_depth: source.and_then(node_of).map_or(0, |s| cascade_depth(&adopters, s)),
        cascade_breadth: cascade_breadth(graph, &adopters),
        structural_virality: structural_virality(&adopters),
        fractional_resilience: fractional_resilience(graph, &correct_nodes),
        topological_resilience: topological_resilience(graph, &misinformed_nodes),
        recovery_rate: recovery_rate(correct.len(), misinformed.len(), round),
    }
}

pub fn time_series_metrics(run_id: &str, graph: &Graph, records: &[ModelRoundRecord]) -> Vec<AdvancedMetrics> {
    records
        .iter()
        .map(|r| {
            advanced_metrics(
                run_id,
                r.round,
                graph,
                &r.correct_agent_ids,
                &r.misinformed_agent_ids,
                r.source_agent_id,
            )
        })
        .collect()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphMetricTables {
    pub basic: Vec<BasicMetrics>,
    pub advanced: Vec<AdvancedMetrics>,
}

/// Basic and advanced tables for a batch of finished runs.
pub fn compute_all_graph_metrics(runs: &[SimulationOutput]) -> Result<GraphMetricTables> {
    let mut tables = GraphMetricTables::default();
    for run in runs {
        tables.basic.push(basic_metrics(&run.run_id, &run.graph)?);
        tables.advanced.extend(time_series_metrics(&run.run_id, &run.graph, &run.model_records));
    }
    Ok(tables)
}

/// A model record with its run id and, when computed, its advanced metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundRow {
    pub simulation_run_id: String,
    pub record: ModelRoundRecord,
    pub metrics: Option<AdvancedMetrics>,
}

/// Left join of model records onto advanced metrics by `(simulation_run_id, round)`.
pub fn join_rounds(runs: &[SimulationOutput], advanced: &[AdvancedMetrics]) -> Vec<RoundRow> {
    let index: BTreeMap<(&str, u32), &AdvancedMetrics> =
        advanced.iter().map(|m| ((m.simulation_run_id.as_str(), m.round), m)).collect();
    let mut rows = Vec::new();
    for run in runs {
        for record in &run.model_records {
            rows.push(RoundRow {
                simulation_run_id: run.run_id.clone(),
                record: record.clone(),
                metrics: index.get(&(run.run_id.as_str(), record.round)).map(|m| (*m).clone()),
            });
        }
    }
    rows
}

/// Distinct run ids, in first-seen order.
pub fn run_ids(rows: &[RoundRow]) -> Vec<String> {
    let mut seen = BTreeSet::new();
    rows.iter()
        .filter(|r| seen.insert(r.simulation_run_id.clone()))
        .map(|r| r.simulation_run_id.clone())
        .collect()
}
