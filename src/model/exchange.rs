// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Belief Diffusion Simulation Suite - Collaborator Seams
//
// The engine never produces agent text itself. Callers plug in whatever
// answers for the agents (a language model, a scripted responder, a test
// closure) through these traits.

use serde::{Deserialize, Serialize};

use crate::belief::{BeliefState, UtilityLedger};
use crate::types::{Agent, AgentId};

/// Read-only copy of an agent and its committed belief, handed to collaborators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentSnapshot {
    pub id: AgentId,
    pub name: String,
    pub belief: BeliefState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundContext {
    pub tick: u32,
    pub num_rounds: u32,
}

/// Produces the message `sender` sends to `receiver`. The message may embed
/// any number of JSON payloads; only schema-conforming ones are applied.
pub trait BeliefExchange {
    fn exchange(&mut self, sender: &AgentSnapshot, receiver: &AgentSnapshot, ctx: &RoundContext) -> String;
}

impl<F> BeliefExchange for F
where
    F: FnMut(&AgentSnapshot, &AgentSnapshot, &RoundContext) -> String,
{
    fn exchange(&mut self, sender: &AgentSnapshot, receiver: &AgentSnapshot, ctx: &RoundContext) -> String {
        self(sender, receiver, ctx)
    }
}

/// Non-participant role that prompts agents in the adoption game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Adjudicator {
    pub name: String,
}

impl Default for Adjudicator {
    fn default() -> Self {
        Self { name: "adjudicator".into() }
    }
}

/// A neighbour's committed decision and last utility draw from the previous round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NeighborObservation {
    pub agent_id: AgentId,
    pub decision: Option<i64>,
    pub utility_gained: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NeighborhoodContext {
    pub round: RoundContext,
    pub ledger: UtilityLedger,
    pub neighbors: Vec<NeighborObservation>,
}

/// Answers the adjudicator's prompt on behalf of `agent`.
pub trait DecisionResponder {
    fn respond(&mut self, adjudicator: &Adjudicator, agent: &AgentSnapshot, ctx: &NeighborhoodContext) -> String;
}

impl<F> DecisionResponder for F
where
    F: FnMut(&Adjudicator, &AgentSnapshot, &NeighborhoodContext) -> String,
{
    fn respond(&mut self, adjudicator: &Adjudicator, agent: &AgentSnapshot, ctx: &NeighborhoodContext) -> String {
        self(adjudicator, agent, ctx)
    }
}

/// One-off perturbation of every agent's belief at a configured round.
pub trait Shock {
    fn apply(&mut self, agents: &[Agent], beliefs: &mut [BeliefState], ctx: &RoundContext);
}

impl<F> Shock for F
where
    F: FnMut(&[Agent], &mut [BeliefState], &RoundContext),
{
    fn apply(&mut self, agents: &[Agent], beliefs: &mut [BeliefState], ctx: &RoundContext) {
        self(agents, beliefs, ctx)
    }
}
