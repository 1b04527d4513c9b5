// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Belief Diffusion Simulation Suite - Parameter Bundles

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Result, SimError};

pub const DEFAULT_INITIAL_JUSTIFICATION: &str =
    "I have direct information that this is the correct answer.";

// ─── Topology ────────────────────────────────────────────────────────────────

/// How a random generator restores connectivity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectivityPolicy {
    /// Regenerate with `seed + attempt` until connected. Unbounded.
    Resample,
    /// Bridge consecutive components with one edge each.
    Augment,
}

/// Declarative, string-keyed topology bundle as it arrives from a config file.
/// Resolved once into [`crate::topology::Topology`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TopologyParams {
    pub kind: String,
    #[serde(default)]
    pub node_count: Option<usize>,
    #[serde(default)]
    pub k: Option<usize>,
    #[serde(default)]
    pub beta: Option<f64>,
    /// Kept untyped so non-integer sizes can be reported instead of failing to parse.
    #[serde(default)]
    pub block_sizes: Option<Vec<serde_json::Value>>,
    #[serde(default)]
    pub p: Option<f64>,
    #[serde(default)]
    pub q: Option<f64>,
    #[serde(default)]
    pub edge_prob: Option<f64>,
    #[serde(default)]
    pub core_size: Option<usize>,
    #[serde(default)]
    pub local_neighbor_count: Option<usize>,
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub ensure_connected: Option<ConnectivityPolicy>,
}

impl TopologyParams {
    pub fn small_world(node_count: usize, k: usize, beta: f64) -> Self {
        Self {
            kind: "small_world".into(),
            node_count: Some(node_count),
            k: Some(k),
            beta: Some(beta),
            ..Self::default()
        }
    }

    pub fn stochastic_block(node_count: usize, block_sizes: &[i64], p: f64, q: f64) -> Self {
        Self {
            kind: "stochastic_block".into(),
            node_count: Some(node_count),
            block_sizes: Some(block_sizes.iter().map(|&s| serde_json::Value::from(s)).collect()),
            p: Some(p),
            q: Some(q),
            ..Self::default()
        }
    }

    pub fn random(node_count: usize, edge_prob: f64) -> Self {
        Self {
            kind: "random".into(),
            node_count: Some(node_count),
            edge_prob: Some(edge_prob),
            ..Self::default()
        }
    }

    pub fn royal_family(node_count: usize, core_size: usize, local_neighbor_count: usize) -> Self {
        Self {
            kind: "royal_family".into(),
            node_count: Some(node_count),
            core_size: Some(core_size),
            local_neighbor_count: Some(local_neighbor_count),
            ..Self::default()
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_connectivity(mut self, policy: ConnectivityPolicy) -> Self {
        self.ensure_connected = Some(policy);
        self
    }
}

// ─── Model Variants ──────────────────────────────────────────────────────────

/// Which side of a debate pairing receives the exchange message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExchangeDirection {
    /// The chosen neighbour messages the acting agent; only the actor may update.
    #[default]
    PeerToSelf,
    /// Both sides message each other; each may update once.
    Mutual,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebateParams {
    pub correct_value: i64,
    #[serde(default)]
    pub direction: ExchangeDirection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdoptionParams {
    /// Success chance of technology B when it is high quality.
    #[serde(default = "default_hq_chance")]
    pub hq_chance: f64,
    /// 1 when B is actually high quality.
    #[serde(default)]
    pub true_quality: u8,
    #[serde(default)]
    pub compute_utilities_at_end: bool,
}

fn default_hq_chance() -> f64 { 1.0 }

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "variant", rename_all = "snake_case")]
pub enum ModelParams {
    Debate(DebateParams),
    Adoption(AdoptionParams),
}

// ─── Run Parameters ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationParams {
    #[serde(default)]
    pub run_id: Option<String>,
    #[serde(default)]
    pub seed: u64,
    pub num_rounds: u32,
    pub topology: TopologyParams,
    pub model: ModelParams,
    #[serde(default = "default_initial_justification")]
    pub initial_justification: String,
    /// Seed one random agent with the reference value before round 1.
    #[serde(default = "default_true")]
    pub seed_source_agent: bool,
    /// Round after which the shock function runs, if one is attached.
    #[serde(default)]
    pub shock_round: Option<u32>,
    /// Also record the committed state before round 1 as round 0.
    #[serde(default)]
    pub record_round_zero: bool,
}

fn default_initial_justification() -> String { DEFAULT_INITIAL_JUSTIFICATION.to_string() }
fn default_true() -> bool { true }

impl SimulationParams {
    pub fn new(num_rounds: u32, topology: TopologyParams, model: ModelParams) -> Self {
        Self {
            run_id: None,
            seed: 0,
            num_rounds,
            topology,
            model,
            initial_justification: default_initial_justification(),
            seed_source_agent: true,
            shock_round: None,
            record_round_zero: false,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Run id used to join metrics back to round records.
    pub fn run_id(&self) -> String {
        self.run_id.clone().unwrap_or_else(|| format!("{}-seed{}", self.topology.kind, self.seed))
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| SimError::Parse(e.to_string()))
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| SimError::Parse(e.to_string()))
    }

    /// Load by extension: `.json` as JSON, anything else as TOML.
    pub fn from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| SimError::Parse(format!("{}: {}", path.display(), e)))?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_str(&text),
            _ => Self::from_toml_str(&text),
        }
    }
}
