// Synthetic Responders: seedable stand-ins for the agents' language model
// Emit free text with embedded JSON payloads, occasionally malformed, so the
// extractor path is exercised on every run

use diffusion_engine::{
    Adjudicator, Agent, AgentSnapshot, BeliefExchange, BeliefSchema, BeliefState, DecisionResponder,
    NeighborhoodContext, RoundContext, Shock,
};
use rand::Rng;
use rand_chacha::ChaCha8Rng;

/// Shapes of broken payloads a real model tends to produce.
const MALFORMED: [&str; 4] = [
    r#"My answer is {"guess": "about forty", "reasoning": "rough estimate"}"#,
    r#"{"guess": 12, "reasoning": "sure", "confidence": 0.9}"#,
    r#"I will keep my view {"reasoning": "nothing new here"}"#,
    r#"{"guess": 7, "reasoning": "cut off mid-sentence"#,
];

fn is_informed(agent: &AgentSnapshot) -> bool {
    agent.belief.justification.contains("direct information")
}

// ─── Debate ─────────────────────────────────────────────────────────────────

/// The sender argues for its own belief. Arguments traced back to direct
/// information persuade more often and are never overturned by hearsay; an
/// unpersuaded receiver restates what it already holds.
pub struct PersuasionExchange {
    rng: ChaCha8Rng,
    schema: BeliefSchema,
    persuasion: f64,
    malformed_rate: f64,
    pub malformed_count: u32,
}

impl PersuasionExchange {
    pub fn new(rng: ChaCha8Rng, persuasion: f64, malformed_rate: f64) -> Self {
        Self { rng, schema: BeliefSchema::guess(), persuasion, malformed_rate, malformed_count: 0 }
    }

    fn persuades(&mut self, sender: &AgentSnapshot, receiver: &AgentSnapshot) -> bool {
        let (informed, firm) = (is_informed(sender), is_informed(receiver));
        if firm && !informed {
            return false;
        }
        let boost = if informed { 0.25 } else { 0.0 };
        self.rng.gen_bool((self.persuasion + boost).min(1.0))
    }
}

impl BeliefExchange for PersuasionExchange {
    fn exchange(&mut self, sender: &AgentSnapshot, receiver: &AgentSnapshot, ctx: &RoundContext) -> String {
        if self.rng.gen_bool(self.malformed_rate) {
            self.malformed_count += 1;
            return MALFORMED[self.rng.gen_range(0..MALFORMED.len())].to_string();
        }
        if self.persuades(sender, receiver) {
            let argued = BeliefState {
                value: sender.belief.value.clone(),
                justification: format!("Agent {} convinced me in round {}: {}", sender.name, ctx.tick, sender.belief.justification),
            };
            format!("After talking with {}, I updated my view. {}", sender.name, self.schema.render(&argued))
        } else {
            format!("{} did not change my mind. {}", sender.name, self.schema.render(&receiver.belief))
        }
    }
}

// ─── Adoption ───────────────────────────────────────────────────────────────

/// Chooses whichever technology earned the most utility in its neighbourhood
/// last round, with a little exploration.
pub struct MajorityResponder {
    rng: ChaCha8Rng,
    schema: BeliefSchema,
    exploration: f64,
    malformed_rate: f64,
    pub malformed_count: u32,
}

impl MajorityResponder {
    pub fn new(rng: ChaCha8Rng, exploration: f64, malformed_rate: f64) -> Self {
        Self { rng, schema: BeliefSchema::decision(), exploration, malformed_rate, malformed_count: 0 }
    }

    fn choose(&mut self, ctx: &NeighborhoodContext) -> (i64, String) {
        let current = ctx.ledger.decision.unwrap_or(0);
        if self.rng.gen_bool(self.exploration) {
            return (1 - current, "Trying the other technology to learn more.".to_string());
        }
        let mut earned = [0u32; 2];
        let mut users = [0u32; 2];
        for n in &ctx.neighbors {
            if let Some(d @ 0..=1) = n.decision {
                earned[d as usize] += n.utility_gained;
                users[d as usize] += 1;
            }
        }
        if let Some(d @ 0..=1) = ctx.ledger.decision {
            earned[d as usize] += ctx.ledger.utility_gained;
            users[d as usize] += 1;
        }
        let rate = |d: usize| if users[d] == 0 { 0.0 } else { earned[d] as f64 / users[d] as f64 };
        let (a, b) = (rate(0), rate(1));
        if b > a {
            (1, format!("B paid off for {} of {} users around me.", earned[1], users[1]))
        } else if a > b {
            (0, format!("A paid off for {} of {} users around me.", earned[0], users[0]))
        } else {
            (current, "No clear evidence either way, so I am staying put.".to_string())
        }
    }
}

impl DecisionResponder for MajorityResponder {
    fn respond(&mut self, adjudicator: &Adjudicator, agent: &AgentSnapshot, ctx: &NeighborhoodContext) -> String {
        if self.rng.gen_bool(self.malformed_rate) {
            self.malformed_count += 1;
            return format!("{}, I would rather not say. {{\"decision\": \"B\"}}", adjudicator.name);
        }
        let (decision, reasoning) = self.choose(ctx);
        let payload = self.schema.render(&BeliefState::new(decision, reasoning));
        format!("Agent {} responds to {}: {}", agent.name, adjudicator.name, payload)
    }
}

// ─── Shocks ─────────────────────────────────────────────────────────────────

/// Broadcast correction: every `stride`-th agent is told the correct value.
pub struct CorrectionShock {
    pub correct_value: i64,
    pub stride: usize,
}

impl Shock for CorrectionShock {
    fn apply(&mut self, agents: &[Agent], beliefs: &mut [BeliefState], ctx: &RoundContext) {
        for (agent, belief) in agents.iter().zip(beliefs.iter_mut()).step_by(self.stride.max(1)) {
            *belief = BeliefState::new(
                self.correct_value,
                format!("Agent {} received direct information from an official correction in round {}.", agent.name, ctx.tick),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use diffusion_engine::{extract_payloads, BeliefValue, NeighborObservation, UtilityLedger};
    use rand::SeedableRng;

    fn snapshot(id: u32, value: i64, justification: &str) -> AgentSnapshot {
        AgentSnapshot { id, name: id.to_string(), belief: BeliefState::new(value, justification) }
    }

    #[test]
    fn test_malformed_rate() {
        let mut ex = PersuasionExchange::new(ChaCha8Rng::seed_from_u64(42), 0.5, 0.2);
        let ctx = RoundContext { tick: 1, num_rounds: 1 };
        let (a, b) = (snapshot(1, 42, "x"), snapshot(2, 7, "y"));
        let n = 5000;
        for _ in 0..n {
            ex.exchange(&a, &b, &ctx);
        }
        let rate = ex.malformed_count as f64 / n as f64;
        assert!((rate - 0.2).abs() < 0.03, "malformed rate {:.3} expected ~0.2", rate);
    }

    #[test]
    fn test_malformed_samples_never_extract() {
        let schema = BeliefSchema::guess().fields();
        for sample in MALFORMED {
            assert!(extract_payloads(sample, &schema).is_empty(), "{}", sample);
        }
    }

    #[test]
    fn test_persuaded_message_carries_sender_value() {
        let mut ex = PersuasionExchange::new(ChaCha8Rng::seed_from_u64(1), 1.0, 0.0);
        let ctx = RoundContext { tick: 2, num_rounds: 4 };
        let msg = ex.exchange(&snapshot(1, 42, "direct information"), &snapshot(2, 7, "guess"), &ctx);
        let payloads = extract_payloads(&msg, &BeliefSchema::guess().fields());
        assert_eq!(payloads.len(), 1);
        assert_eq!(payloads[0]["guess"], 42);
    }

    #[test]
    fn test_majority_follows_paying_technology() {
        let mut responder = MajorityResponder::new(ChaCha8Rng::seed_from_u64(3), 0.0, 0.0);
        let ctx = NeighborhoodContext {
            round: RoundContext { tick: 2, num_rounds: 4 },
            ledger: UtilityLedger::starting_with(Some(0)),
            neighbors: vec![
                NeighborObservation { agent_id: 2, decision: Some(1), utility_gained: 1 },
                NeighborObservation { agent_id: 3, decision: Some(0), utility_gained: 0 },
            ],
        };
        let msg = responder.respond(&Adjudicator::default(), &snapshot(1, 0, "start"), &ctx);
        let payloads = extract_payloads(&msg, &BeliefSchema::decision().fields());
        let state = BeliefSchema::decision().parse(&payloads[0]).unwrap();
        assert_eq!(state.value, BeliefValue::Integer(1));
    }

    #[test]
    fn test_correction_shock_stride() {
        let agents = Agent::roster(5);
        let mut beliefs = vec![BeliefState::new(0, "wrong"); 5];
        let mut shock = CorrectionShock { correct_value: 42, stride: 2 };
        shock.apply(&agents, &mut beliefs, &RoundContext { tick: 3, num_rounds: 6 });
        let values: Vec<_> = beliefs.iter().map(|b| b.value.as_integer().unwrap()).collect();
        assert_eq!(values, vec![42, 0, 42, 0, 42]);
    }
}
