#[cfg(test)]
mod tests {
    use diffusion_engine::metrics;
    use diffusion_engine::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    const ANSWER: i64 = 42;

    fn ring_params(rounds: u32) -> SimulationParams {
        let model = ModelParams::Debate(DebateParams { correct_value: ANSWER, direction: ExchangeDirection::PeerToSelf });
        SimulationParams::new(rounds, TopologyParams::small_world(4, 2, 0.0), model).with_seed(7)
    }

    fn wrong_beliefs(n: usize) -> Vec<BeliefState> {
        (0..n).map(|i| BeliefState::new(i as i64, "just a guess")).collect()
    }

    /// Informed senders pass their payload on; everyone else sends prose only.
    fn spread_correct(from: &AgentSnapshot, _to: &AgentSnapshot, _ctx: &RoundContext) -> String {
        if from.belief.value == BeliefValue::Integer(ANSWER) {
            format!("You should hear this. {}", BeliefSchema::guess().render(&from.belief))
        } else {
            "Honestly I am not sure about anything.".to_string()
        }
    }

    fn adoption_params(rounds: u32, n: usize, deferred: bool) -> SimulationParams {
        let model = ModelParams::Adoption(AdoptionParams {
            hq_chance: 0.8,
            true_quality: 1,
            compute_utilities_at_end: deferred,
        });
        SimulationParams::new(rounds, TopologyParams::small_world(n, 2, 0.0), model).with_seed(11)
    }

    fn always_b(_: &Adjudicator, _: &AgentSnapshot, _: &NeighborhoodContext) -> String {
        r#"Going with B. {"decision": 1, "reasoning": "my neighbours are happy with B"}"#.to_string()
    }

    fn a_beliefs(n: usize) -> Vec<BeliefState> {
        (0..n).map(|_| BeliefState::new(0, "A is familiar")).collect()
    }

    // ========== Pairwise Debate ==========

    #[test]
    fn test_four_agent_ring_walkthrough() {
        let params = ring_params(4);
        let policy = PairwiseDebate::new(&DebateParams { correct_value: ANSWER, direction: ExchangeDirection::PeerToSelf }, spread_correct);
        let mut sim = Simulation::new(Agent::roster(4), wrong_beliefs(4), &params, policy).unwrap();

        assert_eq!(sim.phase(), Phase::Round(0));
        assert!(sim.model_records().is_empty());
        let source = sim.source_agent_id().unwrap();
        assert_eq!(sim.initial_correct(), 1);

        let first = sim.step_round().unwrap().clone();
        assert_eq!(first.round, 1);
        assert!(first.correct_count >= 1);
        assert!(first.correct_agent_ids.contains(&source));
        assert_eq!(first.correct_agent_ids.len() + first.misinformed_agent_ids.len(), 4);
        assert!(first.consensus_score.is_none());

        let output = sim.run().unwrap();
        assert_eq!(output.agent_records.len(), 16);
        assert_eq!(output.model_records.len(), 4);
        assert_eq!(output.graph.node_count(), 4);
        assert_eq!(output.graph.edge_count(), 4);
        let counts: Vec<usize> = output.model_records.iter().map(|r| r.correct_count).collect();
        assert!(counts.windows(2).all(|w| w[0] <= w[1]), "correct counts fell: {:?}", counts);
    }

    #[test]
    fn test_malformed_updates_keep_beliefs() {
        let params = ring_params(3);
        let garbage = |_: &AgentSnapshot, _: &AgentSnapshot, _: &RoundContext| {
            r#"{"guess": "42", "reasoning": "typed wrong"} {"guess": 42}"#.to_string()
        };
        let policy = PairwiseDebate::new(&DebateParams { correct_value: ANSWER, direction: ExchangeDirection::Mutual }, garbage);
        let sim = Simulation::new(Agent::roster(4), wrong_beliefs(4), &params, policy).unwrap();
        let before = sim.beliefs().to_vec();

        let output = sim.run().unwrap();
        assert!(output.model_records.iter().all(|r| r.correct_count == 1));
        let last_round: Vec<&AgentRoundRecord> = output.agent_records.iter().filter(|r| r.round == 3).collect();
        for (record, belief) in last_round.iter().zip(&before) {
            assert_eq!(record.value, belief.value);
        }
    }

    #[test]
    fn test_same_seed_reproduces_pairings() {
        let pairings = |seed: u64| {
            let log = Rc::new(RefCell::new(Vec::new()));
            let sink = Rc::clone(&log);
            let exchange = move |from: &AgentSnapshot, to: &AgentSnapshot, ctx: &RoundContext| {
                sink.borrow_mut().push((ctx.tick, from.id, to.id));
                String::new()
            };
            let params = SimulationParams::new(
                5,
                TopologyParams::random(12, 0.3),
                ModelParams::Debate(DebateParams { correct_value: ANSWER, direction: ExchangeDirection::PeerToSelf }),
            )
            .with_seed(seed);
            let policy = PairwiseDebate::new(&DebateParams { correct_value: ANSWER, direction: ExchangeDirection::PeerToSelf }, exchange);
            let output = Simulation::new(Agent::roster(12), wrong_beliefs(12), &params, policy).unwrap().run().unwrap();
            let log = log.borrow().clone();
            (output.source_agent_id, output.graph, log)
        };

        assert_eq!(pairings(99), pairings(99));
    }

    #[test]
    fn test_isolated_agents_never_exchange() {
        let calls = Rc::new(RefCell::new(0));
        let counter = Rc::clone(&calls);
        let exchange = move |_: &AgentSnapshot, _: &AgentSnapshot, _: &RoundContext| {
            *counter.borrow_mut() += 1;
            String::new()
        };
        let params = SimulationParams::new(
            3,
            TopologyParams::random(5, 0.0),
            ModelParams::Debate(DebateParams { correct_value: ANSWER, direction: ExchangeDirection::PeerToSelf }),
        );
        let policy = PairwiseDebate::new(&DebateParams { correct_value: ANSWER, direction: ExchangeDirection::PeerToSelf }, exchange);
        let output = Simulation::new(Agent::roster(5), wrong_beliefs(5), &params, policy).unwrap().run().unwrap();

        assert_eq!(*calls.borrow(), 0);
        assert_eq!(output.model_records.len(), 3);
    }

    #[test]
    fn test_step_after_terminal_is_rejected() {
        let policy = PairwiseDebate::new(&DebateParams { correct_value: ANSWER, direction: ExchangeDirection::PeerToSelf }, spread_correct);
        let mut sim = Simulation::new(Agent::roster(4), wrong_beliefs(4), &ring_params(2), policy).unwrap();
        sim.step_round().unwrap();
        sim.step_round().unwrap();
        assert_eq!(sim.phase(), Phase::Terminal);
        assert_eq!(sim.step_round().unwrap_err(), SimError::RunComplete);
        assert_eq!(sim.model_records().len(), 2);
    }

    #[test]
    fn test_zero_rounds_terminates_without_records() {
        let policy = PairwiseDebate::new(&DebateParams { correct_value: ANSWER, direction: ExchangeDirection::PeerToSelf }, spread_correct);
        let output = Simulation::new(Agent::roster(4), wrong_beliefs(4), &ring_params(0), policy).unwrap().run().unwrap();
        assert!(output.agent_records.is_empty());
        assert!(output.model_records.is_empty());
    }

    // ========== Shock ==========

    #[test]
    fn test_shock_fires_once_after_configured_round() {
        let mut params = ring_params(4);
        params.shock_round = Some(2);
        let fired = Rc::new(RefCell::new(Vec::new()));
        let log = Rc::clone(&fired);
        let shock = move |_: &[Agent], beliefs: &mut [BeliefState], ctx: &RoundContext| {
            log.borrow_mut().push(ctx.tick);
            for b in beliefs.iter_mut() {
                *b = BeliefState::new(ANSWER, "official correction");
            }
        };
        let silent = |_: &AgentSnapshot, _: &AgentSnapshot, _: &RoundContext| String::new();
        let policy = PairwiseDebate::new(&DebateParams { correct_value: ANSWER, direction: ExchangeDirection::PeerToSelf }, silent);
        let output = Simulation::new(Agent::roster(4), wrong_beliefs(4), &params, policy)
            .unwrap()
            .with_shock(shock)
            .run()
            .unwrap();

        assert_eq!(*fired.borrow(), vec![2]);
        let counts: Vec<usize> = output.model_records.iter().map(|r| r.correct_count).collect();
        assert_eq!(counts, vec![1, 4, 4, 4]);
    }

    #[test]
    fn test_shock_on_adoption_updates_ledgers() {
        let mut params = adoption_params(2, 4, false);
        params.shock_round = Some(1);
        let shock = |_: &[Agent], beliefs: &mut [BeliefState], _: &RoundContext| {
            for b in beliefs.iter_mut() {
                *b = BeliefState::new(1, "everyone was told B is better");
            }
        };
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let silent = move |judge: &Adjudicator, _: &AgentSnapshot, ctx: &NeighborhoodContext| {
            sink.borrow_mut().push((judge.name.clone(), ctx.round.tick, ctx.neighbors.clone()));
            "I would rather not say.".to_string()
        };
        let policy = NetworkAdoption::new(params_adoption(&params), silent)
            .unwrap()
            .with_adjudicator(Adjudicator { name: "moderator".into() });
        let output = Simulation::new(Agent::roster(4), a_beliefs(4), &params, policy)
            .unwrap()
            .with_shock(shock)
            .run()
            .unwrap();

        for record in output.agent_records.iter().filter(|r| r.round == 1) {
            assert_eq!(record.value, BeliefValue::Integer(1));
            assert_eq!(record.ledger.as_ref().unwrap().decision, Some(1));
        }
        assert_eq!(output.model_records[0].correct_count, 4);

        let seen = seen.borrow();
        assert!(seen.iter().all(|(name, _, _)| name == "moderator"));
        let round_two: Vec<_> = seen.iter().filter(|(_, tick, _)| *tick == 2).collect();
        assert_eq!(round_two.len(), 4);
        assert!(round_two.iter().flat_map(|(_, _, n)| n).all(|n| n.decision == Some(1)));
    }

    // ========== Networked Adoption ==========

    #[test]
    fn test_adoption_consensus_and_switch_rate() {
        let mut params = adoption_params(2, 4, false);
        params.record_round_zero = true;
        let policy = NetworkAdoption::new(params_adoption(&params), always_b).unwrap();
        let output = Simulation::new(Agent::roster(4), a_beliefs(4), &params, policy).unwrap().run().unwrap();

        let rounds: Vec<u32> = output.model_records.iter().map(|r| r.round).collect();
        assert_eq!(rounds, vec![0, 1, 2]);
        let zero = &output.model_records[0];
        assert_eq!(zero.correct_count, 1);
        assert_eq!(zero.switch_rate, None);
        assert_eq!(zero.consensus_score, Some(0.0));

        let one = &output.model_records[1];
        assert_eq!(one.correct_count, 4);
        assert_eq!(one.switch_rate, Some(0.75));
        assert_eq!(one.consensus_score, Some(1.0));
        assert_eq!(output.model_records[2].switch_rate, Some(0.0));
        assert_eq!(output.agent_records.len(), 12);
    }

    fn params_adoption(params: &SimulationParams) -> &AdoptionParams {
        match &params.model {
            ModelParams::Adoption(a) => a,
            ModelParams::Debate(_) => unreachable!(),
        }
    }

    #[test]
    fn test_adoption_utility_rate_converges() {
        let (n, rounds) = (20usize, 50u32);
        let params = adoption_params(rounds, n, false);
        let policy = NetworkAdoption::new(params_adoption(&params), always_b).unwrap();
        let output = Simulation::new(Agent::roster(n as u32), a_beliefs(n), &params, policy).unwrap().run().unwrap();

        let total: u32 = output
            .agent_records
            .iter()
            .filter(|r| r.round == rounds)
            .map(|r| r.ledger.as_ref().unwrap().utility)
            .sum();
        let rate = total as f64 / (n as f64 * rounds as f64);
        assert!((rate - 0.8).abs() < 0.05, "empirical success rate {:.3}", rate);
    }

    #[test]
    fn test_deferred_utilities_only_in_final_round() {
        let params = adoption_params(3, 6, true);
        let policy = NetworkAdoption::new(params_adoption(&params), always_b).unwrap();
        let output = Simulation::new(Agent::roster(6), a_beliefs(6), &params, policy).unwrap().run().unwrap();

        for record in &output.agent_records {
            let ledger = record.ledger.as_ref().unwrap();
            if record.round < 3 {
                assert_eq!(ledger.utility, 0);
            } else {
                assert!(ledger.utility <= 1);
                assert_eq!(ledger.utility, ledger.utility_gained);
            }
        }
    }

    #[test]
    fn test_neighbours_reported_from_previous_round() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let responder = move |_: &Adjudicator, agent: &AgentSnapshot, ctx: &NeighborhoodContext| {
            sink.borrow_mut().push((ctx.round.tick, agent.id, ctx.neighbors.len()));
            always_b(&Adjudicator::default(), agent, ctx)
        };
        let params = adoption_params(2, 5, false);
        let policy = NetworkAdoption::new(params_adoption(&params), responder).unwrap();
        Simulation::new(Agent::roster(5), a_beliefs(5), &params, policy).unwrap().run().unwrap();

        let seen = seen.borrow();
        assert_eq!(seen.len(), 10);
        // ring of 5 with k=2: everyone has exactly two neighbours
        assert!(seen.iter().all(|&(_, _, neighbours)| neighbours == 2));
    }

    // ========== Configuration ==========

    #[test]
    fn test_unknown_topology_is_configuration_error() {
        let mut params = ring_params(1);
        params.topology.kind = "scale_free".into();
        let policy = PairwiseDebate::new(&DebateParams { correct_value: ANSWER, direction: ExchangeDirection::PeerToSelf }, spread_correct);
        let err = Simulation::new(Agent::roster(4), wrong_beliefs(4), &params, policy).err().unwrap();
        assert!(matches!(err, SimError::Configuration { ref parameter, .. } if parameter == "kind"));
    }

    #[test]
    fn test_roster_must_match_topology() {
        let policy = PairwiseDebate::new(&DebateParams { correct_value: ANSWER, direction: ExchangeDirection::PeerToSelf }, spread_correct);
        let err = Simulation::new(Agent::roster(5), wrong_beliefs(5), &ring_params(1), policy).err().unwrap();
        assert!(matches!(err, SimError::Configuration { ref parameter, .. } if parameter == "node_count"));

        let policy = PairwiseDebate::new(&DebateParams { correct_value: ANSWER, direction: ExchangeDirection::PeerToSelf }, spread_correct);
        let shuffled = vec![Agent::new(2), Agent::new(1), Agent::new(3), Agent::new(4)];
        let err = Simulation::new(shuffled, wrong_beliefs(4), &ring_params(1), policy).err().unwrap();
        assert!(matches!(err, SimError::Configuration { ref parameter, .. } if parameter == "agents"));
    }

    #[test]
    fn test_toml_parameters_drive_a_run() {
        let text = r#"
            seed = 3
            num_rounds = 3
            record_round_zero = true

            [topology]
            kind = "stochastic_block_model"
            block_sizes = [3, 3]
            p = 0.9
            q = 0.1
            ensure_connected = "augment"

            [model]
            variant = "adoption"
            hq_chance = 0.8
            true_quality = 1
        "#;
        let params = SimulationParams::from_toml_str(text).unwrap();
        let policy = NetworkAdoption::new(params_adoption(&params), always_b).unwrap();
        let output = Simulation::new(Agent::roster(6), a_beliefs(6), &params, policy).unwrap().run().unwrap();

        assert_eq!(output.model_records.len(), 4);
        assert!(output.graph.is_connected());
        assert_eq!(output.run_id, "stochastic_block_model-seed3");
    }

    // ========== Metrics Pipeline ==========

    #[test]
    fn test_metrics_join_back_to_rounds() {
        let policy = PairwiseDebate::new(&DebateParams { correct_value: ANSWER, direction: ExchangeDirection::PeerToSelf }, spread_correct);
        let output = Simulation::new(Agent::roster(4), wrong_beliefs(4), &ring_params(4), policy).unwrap().run().unwrap();
        let runs = vec![output];

        let tables = metrics::compute_all_graph_metrics(&runs).unwrap();
        assert_eq!(tables.basic.len(), 1);
        assert_eq!(tables.basic[0].avg_path_length, 16.0 / 12.0);
        assert_eq!(tables.basic[0].diameter, 2);
        assert_eq!(tables.advanced.len(), 4);

        let rows = metrics::join_rounds(&runs, &tables.advanced);
        assert_eq!(rows.len(), 4);
        for row in &rows {
            let m = row.metrics.as_ref().unwrap();
            assert_eq!(m.round, row.record.round);
            assert_eq!(m.cascade_breadth, row.record.correct_proportion);
            assert_eq!(m.fractional_resilience, row.record.correct_proportion);
        }
    }
}
