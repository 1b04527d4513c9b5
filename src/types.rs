// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Belief Diffusion Simulation Suite - Type Definitions

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::belief::UtilityLedger;

/// 1-based agent identifier, stable for the whole run.
pub type AgentId = u32;

/// 0-based graph node identifier. Agent `i` lives on node `i - 1`.
pub type NodeId = usize;

/// `None` for id 0, which no agent carries.
pub fn node_of(agent: AgentId) -> Option<NodeId> {
    (agent as usize).checked_sub(1)
}

// ─── Belief Value ────────────────────────────────────────────────────────────

/// Primary belief payload: a number or a categorical code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BeliefValue {
    Integer(i64),
    Number(f64),
    Text(String),
}

impl BeliefValue {
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(v) => Some(*v),
            _ => None,
        }
    }
}

impl From<i64> for BeliefValue {
    fn from(v: i64) -> Self { BeliefValue::Integer(v) }
}

impl From<&str> for BeliefValue {
    fn from(v: &str) -> Self { BeliefValue::Text(v.to_string()) }
}

impl fmt::Display for BeliefValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(v) => write!(f, "{}", v),
            Self::Number(v) => write!(f, "{}", v),
            Self::Text(v) => write!(f, "{}", v),
        }
    }
}

// ─── Agent ───────────────────────────────────────────────────────────────────

/// Immutable identity handle. Belief state is owned by the simulation, not the agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Agent {
    pub id: AgentId,
    pub name: String,
}

impl Agent {
    pub fn new(id: AgentId) -> Self {
        Self { id, name: id.to_string() }
    }

    /// Agents `1..=count`, the roster shape the simulation expects.
    pub fn roster(count: u32) -> Vec<Agent> {
        (1..=count).map(Agent::new).collect()
    }
}

// ─── Round Records ───────────────────────────────────────────────────────────

/// One row per (round, agent). Written once, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentRoundRecord {
    pub round: u32,
    pub agent_id: AgentId,
    pub value: BeliefValue,
    pub justification: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ledger: Option<UtilityLedger>,
}

/// One row per round summarising correctness across the population.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelRoundRecord {
    pub round: u32,
    pub source_agent_id: Option<AgentId>,
    pub correct_count: usize,
    pub correct_agent_ids: Vec<AgentId>,
    pub misinformed_agent_ids: Vec<AgentId>,
    pub correct_proportion: f64,
    // Networked adoption variant only
    #[serde(default)]
    pub consensus_score: Option<f64>,
    #[serde(default)]
    pub switch_rate: Option<f64>,
}
