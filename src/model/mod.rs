// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Belief Diffusion Simulation Suite - Round State Machine
//
// Round(0) after construction, Round(1..=N) as rounds commit, then Terminal.
// Within a round every agent acts once in a fresh random order; records are
// appended only after all agents (and the shock, if due) are done.

pub mod adoption;
pub mod debate;
pub mod exchange;

use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;

use crate::belief::{BeliefState, UtilityLedger};
use crate::config::SimulationParams;
use crate::error::{Result, SimError};
use crate::graph::Graph;
use crate::topology::TopologySpec;
use crate::types::{Agent, AgentId, AgentRoundRecord, BeliefValue, ModelRoundRecord};

pub use adoption::NetworkAdoption;
pub use debate::PairwiseDebate;
pub use exchange::{
    AgentSnapshot, Adjudicator, BeliefExchange, DecisionResponder, NeighborObservation,
    NeighborhoodContext, RoundContext, Shock,
};

// ─── World ───────────────────────────────────────────────────────────────────

/// Agents, their committed beliefs and the immutable graph. Index `i` is
/// agent `i + 1` on node `i`.
#[derive(Debug, Clone)]
pub struct World {
    pub agents: Vec<Agent>,
    pub beliefs: Vec<BeliefState>,
    pub graph: Graph,
}

impl World {
    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    pub fn neighbors_of(&self, idx: usize) -> Vec<usize> {
        self.graph.neighbors(idx).collect()
    }

    pub fn snapshot(&self, idx: usize) -> AgentSnapshot {
        let agent = &self.agents[idx];
        AgentSnapshot { id: agent.id, name: agent.name.clone(), belief: self.beliefs[idx].clone() }
    }
}

// ─── Policy seam ─────────────────────────────────────────────────────────────

/// What one agent does on its turn. Both game variants share the round
/// skeleton in [`Simulation`] and differ only here.
pub trait InteractionPolicy {
    fn variant(&self) -> &'static str;

    /// The canonical correct value for this run.
    fn reference_value(&self) -> BeliefValue;

    /// Called once after seeding, before any round.
    fn on_start(&mut self, _world: &World) {}

    /// Called at the top of each round, before any agent acts.
    fn begin_round(&mut self, _world: &World) {}

    fn step(&mut self, idx: usize, world: &mut World, ctx: &RoundContext, rng: &mut ChaCha8Rng);

    /// Called right after a shock rewrote `world.beliefs`, so any state the
    /// policy mirrors from beliefs can follow.
    fn after_shock(&mut self, _world: &World) {}

    /// Called once, inside the final round, before its records are written.
    fn finish(&mut self, _world: &World, _rng: &mut ChaCha8Rng) {}

    fn ledger(&self, _idx: usize) -> Option<&UtilityLedger> {
        None
    }

    /// Whether model records carry consensus score and switch rate.
    fn tracks_consensus(&self) -> bool {
        false
    }
}

// ─── Simulation ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Phase {
    Round(u32),
    Terminal,
}

/// Everything downstream analysis needs from a finished run.
#[derive(Debug, Clone, Serialize)]
pub struct SimulationOutput {
    pub run_id: String,
    pub graph: Graph,
    pub source_agent_id: Option<AgentId>,
    pub agent_records: Vec<AgentRoundRecord>,
    pub model_records: Vec<ModelRoundRecord>,
}

pub struct Simulation<P: InteractionPolicy> {
    run_id: String,
    world: World,
    policy: P,
    rng: ChaCha8Rng,
    phase: Phase,
    tick: u32,
    num_rounds: u32,
    reference: BeliefValue,
    source_agent_id: Option<AgentId>,
    initial_correct: usize,
    previous_values: Vec<BeliefValue>,
    shock_round: Option<u32>,
    shock: Option<Box<dyn Shock>>,
    agent_log: Vec<AgentRoundRecord>,
    model_log: Vec<ModelRoundRecord>,
}

impl<P: InteractionPolicy> Simulation<P> {
    /// Build the topology, seed the source agent and enter Round(0).
    ///
    /// `agents` must be exactly `1..=n` in order, one initial belief each.
    pub fn new(
        agents: Vec<Agent>,
        initial_beliefs: Vec<BeliefState>,
        params: &SimulationParams,
        mut policy: P,
    ) -> Result<Self> {
        if agents.is_empty() {
            return Err(SimError::config("agents", "at least one agent is required"));
        }
        if let Some((pos, agent)) = agents.iter().enumerate().find(|(i, a)| a.id as usize != i + 1) {
            return Err(SimError::config(
                "agents",
                format!("agent at position {} has id {}, expected {}", pos, agent.id, pos + 1),
            ));
        }
        if initial_beliefs.len() != agents.len() {
            return Err(SimError::config(
                "initial_beliefs",
                format!("{} beliefs for {} agents", initial_beliefs.len(), agents.len()),
            ));
        }

        let spec = TopologySpec::resolve(&params.topology, Some(agents.len()), params.seed)?;
        let graph = spec.generate();
        let mut rng = ChaCha8Rng::seed_from_u64(params.seed);
        let reference = policy.reference_value();
        let mut world = World { agents, beliefs: initial_beliefs, graph };

        let source_agent_id = if params.seed_source_agent {
            let idx = rng.gen_range(0..world.len());
            world.beliefs[idx] = BeliefState {
                value: reference.clone(),
                justification: params.initial_justification.clone(),
            };
            Some(world.agents[idx].id)
        } else {
            None
        };

        policy.on_start(&world);
        let initial_correct = world.beliefs.iter().filter(|b| b.value == reference).count();
        let previous_values = world.beliefs.iter().map(|b| b.value.clone()).collect();
        if policy.tracks_consensus() {
            if let Some(reason) = degenerate_baseline(initial_correct, world.len()) {
                tracing::warn!(run_id = %params.run_id(), "{}; consensus score reports the correct share", reason);
            }
        }

        tracing::info!(
            run_id = %params.run_id(),
            variant = policy.variant(),
            topology = ?spec.kind(),
            nodes = world.graph.node_count(),
            edges = world.graph.edge_count(),
            source = ?source_agent_id,
            "simulation initialised"
        );

        let mut sim = Self {
            run_id: params.run_id(),
            world,
            policy,
            rng,
            phase: Phase::Round(0),
            tick: 0,
            num_rounds: params.num_rounds,
            reference,
            source_agent_id,
            initial_correct,
            previous_values,
            shock_round: params.shock_round,
            shock: None,
            agent_log: Vec::new(),
            model_log: Vec::new(),
        };
        if params.record_round_zero {
            sim.collect_stats();
        }
        Ok(sim)
    }

    /// Attach the perturbation run after round `shock_round` (at most once).
    pub fn with_shock(mut self, shock: impl Shock + 'static) -> Self {
        if self.shock_round.is_none() {
            tracing::warn!("shock attached but no shock_round configured; it will never fire");
        }
        self.shock = Some(Box::new(shock));
        self
    }

    /// Advance one round and return its model record.
    pub fn step_round(&mut self) -> Result<&ModelRoundRecord> {
        if self.phase == Phase::Terminal || self.tick >= self.num_rounds {
            return Err(SimError::RunComplete);
        }
        self.tick += 1;
        self.phase = Phase::Round(self.tick);
        let ctx = RoundContext { tick: self.tick, num_rounds: self.num_rounds };

        let mut order: Vec<usize> = (0..self.world.len()).collect();
        order.shuffle(&mut self.rng);

        self.policy.begin_round(&self.world);
        for idx in order {
            self.policy.step(idx, &mut self.world, &ctx, &mut self.rng);
        }

        if self.shock_round == Some(self.tick) {
            if let Some(mut shock) = self.shock.take() {
                tracing::info!(round = self.tick, "applying shock");
                shock.apply(&self.world.agents, &mut self.world.beliefs, &ctx);
                self.policy.after_shock(&self.world);
            }
        }

        let last = self.tick == self.num_rounds;
        if last {
            self.policy.finish(&self.world, &mut self.rng);
        }
        self.collect_stats();
        if last {
            self.phase = Phase::Terminal;
        }
        Ok(&self.model_log[self.model_log.len() - 1])
    }

    /// Advance until Terminal. A zero-round run goes straight to Terminal.
    pub fn run_to_end(&mut self) -> Result<()> {
        if self.num_rounds == 0 && self.phase != Phase::Terminal {
            self.policy.finish(&self.world, &mut self.rng);
            self.phase = Phase::Terminal;
        }
        while self.phase != Phase::Terminal {
            self.step_round()?;
        }
        Ok(())
    }

    /// Run every remaining round and hand back the logs.
    pub fn run(mut self) -> Result<SimulationOutput> {
        self.run_to_end()?;
        Ok(self.into_output())
    }

    /// Append agent-level and model-level records for the current tick.
    pub fn collect_stats(&mut self) {
        let n = self.world.len();
        for idx in 0..n {
            let belief = &self.world.beliefs[idx];
            self.agent_log.push(AgentRoundRecord {
                round: self.tick,
                agent_id: self.world.agents[idx].id,
                value: belief.value.clone(),
                justification: belief.justification.clone(),
                ledger: self.policy.ledger(idx).cloned(),
            });
        }

        let (correct, misinformed): (Vec<usize>, Vec<usize>) =
            (0..n).partition(|&idx| self.world.beliefs[idx].value == self.reference);
        let correct_count = correct.len();

        let (consensus_score, switch_rate) = if self.policy.tracks_consensus() {
            let switch_rate = if self.tick == 0 {
                None
            } else {
                let switches = self
                    .world
                    .beliefs
                    .iter()
                    .zip(&self.previous_values)
                    .filter(|(b, prev)| &b.value != *prev)
                    .count();
                Some(switches as f64 / n as f64)
            };
            (Some(consensus_score(self.initial_correct, n, correct_count)), switch_rate)
        } else {
            (None, None)
        };
        self.previous_values = self.world.beliefs.iter().map(|b| b.value.clone()).collect();

        self.model_log.push(ModelRoundRecord {
            round: self.tick,
            source_agent_id: self.source_agent_id,
            correct_count,
            correct_agent_ids: correct.iter().map(|&i| self.world.agents[i].id).collect(),
            misinformed_agent_ids: misinformed.iter().map(|&i| self.world.agents[i].id).collect(),
            correct_proportion: correct_count as f64 / n as f64,
            consensus_score,
            switch_rate,
        });
        tracing::info!(round = self.tick, correct = correct_count, total = n, "round committed");
    }

    pub fn into_output(self) -> SimulationOutput {
        SimulationOutput {
            run_id: self.run_id,
            graph: self.world.graph,
            source_agent_id: self.source_agent_id,
            agent_records: self.agent_log,
            model_records: self.model_log,
        }
    }

    pub fn run_id(&self) -> &str { &self.run_id }
    pub fn phase(&self) -> Phase { self.phase }
    pub fn tick(&self) -> u32 { self.tick }
    pub fn graph(&self) -> &Graph { &self.world.graph }
    pub fn world(&self) -> &World { &self.world }
    pub fn policy(&self) -> &P { &self.policy }
    pub fn beliefs(&self) -> &[BeliefState] { &self.world.beliefs }
    pub fn source_agent_id(&self) -> Option<AgentId> { self.source_agent_id }
    pub fn reference_value(&self) -> &BeliefValue { &self.reference }
    pub fn initial_correct(&self) -> usize { self.initial_correct }
    pub fn agent_records(&self) -> &[AgentRoundRecord] { &self.agent_log }
    pub fn model_records(&self) -> &[ModelRoundRecord] { &self.model_log }
}

/// Why the consensus baseline degenerates to the plain correct share, if it does.
pub fn degenerate_baseline(n0: usize, n: usize) -> Option<&'static str> {
    if n0 == n {
        Some("all agents started with the correct decision")
    } else if n0 == 0 {
        Some("no agent started with the correct decision")
    } else {
        None
    }
}

/// Signed progress toward unanimous correctness relative to the starting
/// share `n0` of `n` agents, given `nt` correct now.
pub fn consensus_score(n0: usize, n: usize, nt: usize) -> f64 {
    assert!(n > 0, "consensus score needs a non-empty population");
    let (n0, n, nt) = (n0 as f64, n as f64, nt as f64);
    if n == n0 || n0 == 0.0 {
        nt / n
    } else if nt >= n0 {
        (nt - n0) / (n - n0)
    } else {
        (nt - n0) / n0
    }
}
