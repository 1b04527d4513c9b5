// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Belief Diffusion Simulation Suite

pub mod types;
pub mod error;
pub mod config;
pub mod graph;
pub mod topology;
pub mod belief;
pub mod extract;
pub mod model;
pub mod metrics;

pub use types::*;
pub use error::{Result, SimError};
pub use config::{
    AdoptionParams, ConnectivityPolicy, DebateParams, ExchangeDirection, ModelParams, SimulationParams,
    TopologyParams,
};
pub use graph::Graph;
pub use topology::{Topology, TopologyKind, TopologySpec};
pub use belief::{BeliefSchema, BeliefState, FieldType, Schema, UtilityLedger};
pub use extract::{check_payload, extract_payloads, ExtractionMismatch};
pub use model::{
    AgentSnapshot, Adjudicator, BeliefExchange, DecisionResponder, InteractionPolicy, NetworkAdoption,
    NeighborObservation, NeighborhoodContext, PairwiseDebate, Phase, RoundContext, Shock, Simulation,
    SimulationOutput, World,
};
