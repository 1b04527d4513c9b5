// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Belief Diffusion Simulation Suite - Error Types

use thiserror::Error;

/// Errors surfaced by topology construction, simulation setup and graph metrics.
///
/// Malformed agent payloads are not represented here: they are dropped by the
/// extractor and the affected agent keeps its previous belief.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SimError {
    /// A parameter is missing, out of range or inconsistent. Fatal before round 1.
    #[error("invalid configuration for `{parameter}`: {reason}")]
    Configuration { parameter: String, reason: String },

    /// A metric that has no value on this graph (e.g. diameter of a disconnected graph).
    #[error("{metric} is undefined: {reason}")]
    GraphMetricUndefined { metric: &'static str, reason: String },

    /// The run already reached its terminal state.
    #[error("simulation already completed all rounds")]
    RunComplete,

    /// Configuration text could not be deserialized.
    #[error("failed to parse configuration: {0}")]
    Parse(String),
}

impl SimError {
    pub fn config(parameter: impl Into<String>, reason: impl Into<String>) -> Self {
        SimError::Configuration { parameter: parameter.into(), reason: reason.into() }
    }

    pub fn missing(parameter: impl Into<String>) -> Self {
        Self::config(parameter, "required parameter is missing")
    }
}

pub type Result<T> = std::result::Result<T, SimError>;
