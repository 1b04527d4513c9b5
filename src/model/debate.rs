// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Belief Diffusion Simulation Suite - Pairwise Debate
//
// On its turn an agent pairs with one uniformly chosen neighbour and is sent
// that neighbour's argument. Updates land immediately, so later agents in the
// same round see them.

use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;

use super::exchange::{BeliefExchange, RoundContext};
use super::{InteractionPolicy, World};
use crate::belief::BeliefSchema;
use crate::config::{DebateParams, ExchangeDirection};
use crate::extract::extract_payloads;
use crate::types::BeliefValue;

pub struct PairwiseDebate<E: BeliefExchange> {
    correct_value: i64,
    direction: ExchangeDirection,
    schema: BeliefSchema,
    exchange: E,
}

impl<E: BeliefExchange> PairwiseDebate<E> {
    pub fn new(params: &DebateParams, exchange: E) -> Self {
        Self {
            correct_value: params.correct_value,
            direction: params.direction,
            schema: BeliefSchema::guess(),
            exchange,
        }
    }

    pub fn with_schema(mut self, schema: BeliefSchema) -> Self {
        self.schema = schema;
        self
    }

    pub fn schema(&self) -> &BeliefSchema {
        &self.schema
    }

    pub fn exchange(&self) -> &E {
        &self.exchange
    }

    /// Send `sender`'s message to `receiver` and apply the first valid payload.
    fn deliver(&mut self, sender: usize, receiver: usize, world: &mut World, ctx: &RoundContext) {
        let from = world.snapshot(sender);
        let to = world.snapshot(receiver);
        let message = self.exchange.exchange(&from, &to, ctx);

        let update = extract_payloads(&message, &self.schema.fields())
            .first()
            .and_then(|payload| self.schema.parse(payload));
        match update {
            Some(belief) => world.beliefs[receiver] = belief,
            None => tracing::debug!(
                round = ctx.tick,
                sender = from.id,
                receiver = to.id,
                "no valid payload in message; belief unchanged"
            ),
        }
    }
}

impl<E: BeliefExchange> InteractionPolicy for PairwiseDebate<E> {
    fn variant(&self) -> &'static str {
        "debate"
    }

    fn reference_value(&self) -> BeliefValue {
        BeliefValue::Integer(self.correct_value)
    }

    fn step(&mut self, idx: usize, world: &mut World, ctx: &RoundContext, rng: &mut ChaCha8Rng) {
        let neighbors = world.neighbors_of(idx);
        let Some(&peer) = neighbors.choose(rng) else {
            tracing::warn!(round = ctx.tick, agent = world.agents[idx].id, "agent has no neighbours; skipping");
            return;
        };

        self.deliver(peer, idx, world, ctx);
        if self.direction == ExchangeDirection::Mutual {
            self.deliver(idx, peer, world, ctx);
        }
    }
}
