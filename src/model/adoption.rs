// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Belief Diffusion Simulation Suite - Networked Adoption Game
//
// Agents choose between technology A (0, known 50% payoff) and B (1, quality
// unknown). Each turn the adjudicator shows an agent what its neighbours
// chose and earned last round; the agent answers with a decision payload and
// then draws a utility for whatever it now holds.

use rand::Rng;
use rand_chacha::ChaCha8Rng;

use super::exchange::{Adjudicator, DecisionResponder, NeighborObservation, NeighborhoodContext, RoundContext};
use super::{InteractionPolicy, World};
use crate::belief::{BeliefSchema, UtilityLedger};
use crate::config::AdoptionParams;
use crate::error::{Result, SimError};
use crate::extract::extract_payloads;
use crate::types::BeliefValue;

/// Decision code for technology B.
pub const TECHNOLOGY_B: i64 = 1;

/// Draw one utility (0 or 1) for `decision`.
///
/// B pays off with `hq_chance` when it is high quality and `1 - hq_chance`
/// otherwise. Anything else is A, a fair coin.
pub fn utility_draw(decision: Option<i64>, hq_chance: f64, true_quality: u8, rng: &mut ChaCha8Rng) -> u32 {
    let chance = match decision {
        Some(TECHNOLOGY_B) if true_quality == 1 => hq_chance,
        Some(TECHNOLOGY_B) => 1.0 - hq_chance,
        _ => 0.5,
    };
    u32::from(rng.gen_bool(chance))
}

pub struct NetworkAdoption<R: DecisionResponder> {
    hq_chance: f64,
    true_quality: u8,
    deferred: bool,
    schema: BeliefSchema,
    adjudicator: Adjudicator,
    responder: R,
    ledgers: Vec<UtilityLedger>,
    /// Neighbour-visible state, frozen at the top of each round.
    round_start: Vec<(Option<i64>, u32)>,
}

impl<R: DecisionResponder> NetworkAdoption<R> {
    pub fn new(params: &AdoptionParams, responder: R) -> Result<Self> {
        if !(0.0..=1.0).contains(&params.hq_chance) {
            return Err(SimError::config("hq_chance", format!("{} is not a probability", params.hq_chance)));
        }
        if params.true_quality > 1 {
            return Err(SimError::config("true_quality", "must be 0 or 1"));
        }
        Ok(Self {
            hq_chance: params.hq_chance,
            true_quality: params.true_quality,
            deferred: params.compute_utilities_at_end,
            schema: BeliefSchema::decision(),
            adjudicator: Adjudicator::default(),
            responder,
            ledgers: Vec::new(),
            round_start: Vec::new(),
        })
    }

    pub fn with_adjudicator(mut self, adjudicator: Adjudicator) -> Self {
        self.adjudicator = adjudicator;
        self
    }

    pub fn ledgers(&self) -> &[UtilityLedger] {
        &self.ledgers
    }

    pub fn responder(&self) -> &R {
        &self.responder
    }

    fn draw(&mut self, idx: usize, rng: &mut ChaCha8Rng) {
        let gained = utility_draw(self.ledgers[idx].decision, self.hq_chance, self.true_quality, rng);
        self.ledgers[idx].record_draw(gained);
    }
}

impl<R: DecisionResponder> InteractionPolicy for NetworkAdoption<R> {
    fn variant(&self) -> &'static str {
        "adoption"
    }

    fn reference_value(&self) -> BeliefValue {
        BeliefValue::Integer(if self.hq_chance > 0.5 { TECHNOLOGY_B } else { 0 })
    }

    fn on_start(&mut self, world: &World) {
        self.ledgers = world
            .beliefs
            .iter()
            .map(|b| UtilityLedger::starting_with(b.value.as_integer()))
            .collect();
    }

    fn begin_round(&mut self, _world: &World) {
        self.round_start = self.ledgers.iter().map(|l| (l.decision, l.utility_gained)).collect();
    }

    fn step(&mut self, idx: usize, world: &mut World, ctx: &RoundContext, rng: &mut ChaCha8Rng) {
        let neighbors = world
            .neighbors_of(idx)
            .into_iter()
            .map(|n| NeighborObservation {
                agent_id: world.agents[n].id,
                decision: self.round_start[n].0,
                utility_gained: self.round_start[n].1,
            })
            .collect();
        let context = NeighborhoodContext { round: *ctx, ledger: self.ledgers[idx].clone(), neighbors };
        let agent = world.snapshot(idx);
        let message = self.responder.respond(&self.adjudicator, &agent, &context);

        let update = extract_payloads(&message, &self.schema.fields())
            .first()
            .and_then(|payload| self.schema.parse(payload));
        match update {
            Some(belief) => world.beliefs[idx] = belief,
            None => tracing::debug!(round = ctx.tick, agent = agent.id, "no valid decision payload; decision unchanged"),
        }

        self.ledgers[idx].commit_decision(world.beliefs[idx].value.as_integer());
        if !self.deferred {
            self.draw(idx, rng);
        }
    }

    fn after_shock(&mut self, world: &World) {
        for (ledger, belief) in self.ledgers.iter_mut().zip(&world.beliefs) {
            ledger.decision = belief.value.as_integer();
        }
    }

    fn finish(&mut self, _world: &World, rng: &mut ChaCha8Rng) {
        if self.deferred {
            for idx in 0..self.ledgers.len() {
                self.draw(idx, rng);
            }
        }
    }

    fn ledger(&self, idx: usize) -> Option<&UtilityLedger> {
        self.ledgers.get(idx)
    }

    fn tracks_consensus(&self) -> bool {
        true
    }
}
