// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Belief Diffusion Simulation Suite - Topology Generator
//
// Builds the interaction graph once, before round 0. Every random family
// draws from its own ChaCha8 stream seeded from the topology seed, so a graph
// is reproducible from its parameters alone.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::str::FromStr;

use crate::config::{ConnectivityPolicy, TopologyParams};
use crate::error::{Result, SimError};
use crate::graph::Graph;

const DEFAULT_CORE_SIZE: usize = 3;
const DEFAULT_LOCAL_NEIGHBORS: usize = 2;

// ─── Kind dispatch ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopologyKind {
    SmallWorld,
    StochasticBlock,
    Random,
    RoyalFamily,
}

impl FromStr for TopologyKind {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "small_world" | "watts_strogatz_graph" => Ok(Self::SmallWorld),
            "stochastic_block" | "stochastic_block_model" => Ok(Self::StochasticBlock),
            "random" | "erdos_renyi_graph" => Ok(Self::Random),
            "royal_family" | "royal_family_graph" => Ok(Self::RoyalFamily),
            other => Err(SimError::config("kind", format!("unknown topology kind `{}`", other))),
        }
    }
}

/// Resolved, validated topology family.
#[derive(Debug, Clone, PartialEq)]
pub enum Topology {
    SmallWorld { node_count: usize, k: usize, beta: f64 },
    StochasticBlock { block_sizes: Vec<usize>, p: f64, q: f64 },
    Random { node_count: usize, edge_prob: f64 },
    RoyalFamily { node_count: usize, core_size: usize, local_neighbor_count: usize },
}

/// A topology plus everything needed to build it deterministically.
#[derive(Debug, Clone, PartialEq)]
pub struct TopologySpec {
    pub topology: Topology,
    pub seed: u64,
    pub connectivity: Option<ConnectivityPolicy>,
}

impl TopologySpec {
    /// Validate a declarative bundle. `roster_size` fills in a missing
    /// `node_count` and must agree with it when both are present.
    pub fn resolve(
        params: &TopologyParams,
        roster_size: Option<usize>,
        fallback_seed: u64,
    ) -> Result<Self> {
        let kind: TopologyKind = params.kind.parse()?;
        let node_count = match (params.node_count, roster_size) {
            (Some(n), Some(r)) if n != r => {
                return Err(SimError::config(
                    "node_count",
                    format!("topology declares {} nodes but there are {} agents", n, r),
                ))
            }
            (Some(n), _) | (None, Some(n)) => n,
            (None, None) => return Err(SimError::missing("node_count")),
        };

        let topology = match kind {
            TopologyKind::SmallWorld => {
                let k = params.k.ok_or_else(|| SimError::missing("k"))?;
                if k > node_count {
                    return Err(SimError::config(
                        "k",
                        format!("k={} exceeds node_count={}", k, node_count),
                    ));
                }
                let beta = probability("beta", params.beta)?;
                Topology::SmallWorld { node_count, k, beta }
            }
            TopologyKind::StochasticBlock => {
                let raw = params.block_sizes.as_ref().ok_or_else(|| SimError::missing("block_sizes"))?;
                let block_sizes = block_sizes(raw, node_count)?;
                let p = probability("p", params.p)?;
                let q = probability("q", params.q)?;
                Topology::StochasticBlock { block_sizes, p, q }
            }
            TopologyKind::Random => {
                let edge_prob = probability("edge_prob", params.edge_prob)?;
                Topology::Random { node_count, edge_prob }
            }
            TopologyKind::RoyalFamily => {
                let core_size = params.core_size.unwrap_or(DEFAULT_CORE_SIZE);
                if core_size == 0 || core_size >= node_count {
                    return Err(SimError::config(
                        "core_size",
                        format!("core_size={} must be in 1..{}", core_size, node_count),
                    ));
                }
                let local_neighbor_count =
                    params.local_neighbor_count.unwrap_or(DEFAULT_LOCAL_NEIGHBORS);
                Topology::RoyalFamily { node_count, core_size, local_neighbor_count }
            }
        };

        Ok(Self {
            topology,
            seed: params.seed.unwrap_or(fallback_seed),
            connectivity: params.ensure_connected,
        })
    }

    pub fn kind(&self) -> TopologyKind {
        match self.topology {
            Topology::SmallWorld { .. } => TopologyKind::SmallWorld,
            Topology::StochasticBlock { .. } => TopologyKind::StochasticBlock,
            Topology::Random { .. } => TopologyKind::Random,
            Topology::RoyalFamily { .. } => TopologyKind::RoyalFamily,
        }
    }

    pub fn node_count(&self) -> usize {
        match &self.topology {
            Topology::SmallWorld { node_count, .. }
            | Topology::Random { node_count, .. }
            | Topology::RoyalFamily { node_count, .. } => *node_count,
            Topology::StochasticBlock { block_sizes, .. } => block_sizes.iter().sum(),
        }
    }

    /// Build the graph and apply the connectivity policy, if any.
    pub fn generate(&self) -> Graph {
        let mut graph = self.topology.build(self.seed);
        match self.connectivity {
            None => {}
            Some(ConnectivityPolicy::Resample) => {
                // Unbounded: parameters that never yield a connected graph spin here.
                let mut attempt: u64 = 1;
                while !graph.is_connected() {
                    graph = self.topology.build(self.seed.wrapping_add(attempt));
                    attempt += 1;
                }
                if attempt > 1 {
                    tracing::debug!(attempts = attempt, "resampled topology until connected");
                }
            }
            Some(ConnectivityPolicy::Augment) => {
                let added = augment(&mut graph);
                if added > 0 {
                    tracing::debug!(bridges = added, "augmented topology to a single component");
                }
            }
        }
        graph
    }
}

impl Topology {
    fn build(&self, seed: u64) -> Graph {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        match self {
            Self::SmallWorld { node_count, k, beta } => {
                watts_strogatz(*node_count, *k, *beta, &mut rng)
            }
            Self::StochasticBlock { block_sizes, p, q } => {
                stochastic_block_model(block_sizes, *p, *q, &mut rng)
            }
            Self::Random { node_count, edge_prob } => erdos_renyi(*node_count, *edge_prob, &mut rng),
            Self::RoyalFamily { node_count, core_size, local_neighbor_count } => {
                royal_family(*node_count, *core_size, *local_neighbor_count)
            }
        }
    }
}

fn probability(name: &str, value: Option<f64>) -> Result<f64> {
    let p = value.ok_or_else(|| SimError::missing(name))?;
    if !(0.0..=1.0).contains(&p) {
        return Err(SimError::config(name, format!("{} is not a probability", p)));
    }
    Ok(p)
}

/// Positive integer sizes; a shortfall against `node_count` becomes one extra block.
fn block_sizes(raw: &[serde_json::Value], node_count: usize) -> Result<Vec<usize>> {
    let mut sizes = Vec::with_capacity(raw.len() + 1);
    for value in raw {
        let size = value.as_i64().ok_or_else(|| {
            SimError::config("block_sizes", format!("{} is not an integer", value))
        })?;
        if size <= 0 {
            return Err(SimError::config("block_sizes", format!("{} is not positive", size)));
        }
        sizes.push(size as usize);
    }
    let total: usize = sizes.iter().sum();
    if total > node_count {
        return Err(SimError::config(
            "block_sizes",
            format!("sizes sum to {} which exceeds node_count={}", total, node_count),
        ));
    }
    if total < node_count {
        sizes.push(node_count - total);
    }
    Ok(sizes)
}

// ─── Generators ──────────────────────────────────────────────────────────────

/// Ring lattice with `k / 2` neighbours per side, each lattice edge rewired
/// with probability `beta`.
pub fn watts_strogatz(n: usize, k: usize, beta: f64, rng: &mut ChaCha8Rng) -> Graph {
    let mut g = Graph::with_nodes(n);
    if k == n {
        for u in 0..n {
            for v in (u + 1)..n {
                g.add_edge(u, v);
            }
        }
        return g;
    }
    let half = k / 2;
    for j in 1..=half {
        for u in 0..n {
            g.add_edge(u, (u + j) % n);
        }
    }
    for j in 1..=half {
        for u in 0..n {
            if rng.gen::<f64>() >= beta {
                continue;
            }
            let v = (u + j) % n;
            let mut w = rng.gen_range(0..n);
            let mut saturated = false;
            while w == u || g.has_edge(u, w) {
                w = rng.gen_range(0..n);
                if g.degree(u) >= n - 1 {
                    saturated = true;
                    break;
                }
            }
            if !saturated {
                g.remove_edge(u, v);
                g.add_edge(u, w);
            }
        }
    }
    g
}

/// Blocks laid out contiguously over `0..n`; within-block edges with `p`,
/// between-block edges with `q`. Each node carries its block label.
pub fn stochastic_block_model(sizes: &[usize], p: f64, q: f64, rng: &mut ChaCha8Rng) -> Graph {
    let n: usize = sizes.iter().sum();
    let mut g = Graph::with_nodes(n);
    let mut ranges = Vec::with_capacity(sizes.len());
    let mut start = 0;
    for (block, &size) in sizes.iter().enumerate() {
        for u in start..start + size {
            g.set_block(u, block);
        }
        ranges.push(start..start + size);
        start += size;
    }
    for (bi, ri) in ranges.iter().enumerate() {
        for rj in &ranges[bi..] {
            let within = ri == rj;
            let prob = if within { p } else { q };
            for u in ri.clone() {
                let first = if within { u + 1 } else { rj.start };
                for v in first..rj.end {
                    if rng.gen::<f64>() < prob {
                        g.add_edge(u, v);
                    }
                }
            }
        }
    }
    g
}

pub fn erdos_renyi(n: usize, edge_prob: f64, rng: &mut ChaCha8Rng) -> Graph {
    let mut g = Graph::with_nodes(n);
    for u in 0..n {
        for v in (u + 1)..n {
            if rng.gen::<f64>() < edge_prob {
                g.add_edge(u, v);
            }
        }
    }
    g
}

/// Fully connected core `0..core_size`; every other node links to the whole
/// core and to `local_neighbor_count / 2` ring neighbours on each side.
pub fn royal_family(n: usize, core_size: usize, local_neighbor_count: usize) -> Graph {
    let mut g = Graph::with_nodes(n);
    for i in 0..core_size {
        for j in (i + 1)..core_size {
            g.add_edge(i, j);
        }
    }
    let ring = n - core_size;
    for i in core_size..n {
        for c in 0..core_size {
            g.add_edge(i, c);
        }
        let pos = i - core_size;
        for j in 1..=(local_neighbor_count / 2) {
            let step = j % ring;
            let ahead = (pos + step) % ring + core_size;
            let behind = (pos + ring - step) % ring + core_size;
            // add_edge drops the self-loops a short ring produces
            g.add_edge(i, ahead);
            g.add_edge(i, behind);
        }
    }
    g
}

/// Bridge each pair of consecutive components through their smallest members.
fn augment(graph: &mut Graph) -> usize {
    let components = graph.connected_components();
    let mut added = 0;
    for pair in components.windows(2) {
        if let (Some(&u), Some(&v)) = (pair[0].first(), pair[1].first()) {
            graph.add_edge(u, v);
            added += 1;
        }
    }
    added
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolve(params: TopologyParams) -> Result<TopologySpec> {
        TopologySpec::resolve(&params, None, 11)
    }

    #[test]
    fn test_unknown_kind_is_configuration_error() {
        let params = TopologyParams { kind: "hypercube".into(), node_count: Some(4), ..Default::default() };
        let err = resolve(params).unwrap_err();
        assert!(matches!(err, SimError::Configuration { ref parameter, .. } if parameter == "kind"));
    }

    #[test]
    fn test_missing_parameter_is_named() {
        let mut params = TopologyParams::small_world(10, 4, 0.1);
        params.beta = None;
        let err = resolve(params).unwrap_err();
        assert_eq!(err, SimError::missing("beta"));
    }

    #[test]
    fn test_roster_size_must_match_node_count() {
        let params = TopologyParams::random(10, 0.2);
        assert!(TopologySpec::resolve(&params, Some(9), 0).is_err());
        let mut params = TopologyParams::random(10, 0.2);
        params.node_count = None;
        let spec = TopologySpec::resolve(&params, Some(9), 0).unwrap();
        assert_eq!(spec.node_count(), 9);
    }

    #[test]
    fn test_block_sizes_validation() {
        let over = TopologyParams::stochastic_block(10, &[6, 6], 0.5, 0.1);
        assert!(resolve(over).is_err());

        let negative = TopologyParams::stochastic_block(10, &[6, -1], 0.5, 0.1);
        assert!(resolve(negative).is_err());

        let mut fractional = TopologyParams::stochastic_block(10, &[5], 0.5, 0.1);
        fractional.block_sizes = Some(vec![serde_json::json!(2.5), serde_json::json!(5)]);
        let err = resolve(fractional).unwrap_err();
        assert!(err.to_string().contains("not an integer"));
    }

    #[test]
    fn test_block_deficit_becomes_extra_block() {
        let spec = resolve(TopologyParams::stochastic_block(10, &[3, 3], 1.0, 0.0)).unwrap();
        match &spec.topology {
            Topology::StochasticBlock { block_sizes, .. } => assert_eq!(block_sizes, &vec![3, 3, 4]),
            other => panic!("unexpected topology {:?}", other),
        }
        let g = spec.generate();
        assert_eq!(g.node_count(), 10);
        assert_eq!(g.block(9), Some(2));
        // p = 1, q = 0: three cliques
        assert_eq!(g.connected_components().len(), 3);
        assert_eq!(g.edge_count(), 3 + 3 + 6);
    }

    #[test]
    fn test_small_world_without_rewiring_is_ring_lattice() {
        let g = resolve(TopologyParams::small_world(8, 4, 0.0)).unwrap().generate();
        assert_eq!(g.edge_count(), 16);
        assert!(g.nodes().all(|u| g.degree(u) == 4));
        assert!(g.has_edge(0, 7) && g.has_edge(0, 6));
    }

    #[test]
    fn test_small_world_edge_count_survives_rewiring() {
        let g = resolve(TopologyParams::small_world(30, 4, 0.5)).unwrap().generate();
        assert_eq!(g.node_count(), 30);
        assert_eq!(g.edge_count(), 60);
    }

    #[test]
    fn test_small_world_bounds() {
        assert!(resolve(TopologyParams::small_world(4, 5, 0.1)).is_err());
        let g = resolve(TopologyParams::small_world(4, 4, 0.3)).unwrap().generate();
        assert_eq!(g.edge_count(), 6);
        assert!(resolve(TopologyParams::small_world(4, 2, 1.5)).is_err());
    }

    #[test]
    fn test_random_graph_extremes() {
        let empty = resolve(TopologyParams::random(6, 0.0)).unwrap().generate();
        assert_eq!(empty.edge_count(), 0);
        let full = resolve(TopologyParams::random(6, 1.0)).unwrap().generate();
        assert_eq!(full.edge_count(), 15);
    }

    #[test]
    fn test_same_seed_same_graph() {
        let params = TopologyParams::random(25, 0.2).with_seed(99);
        let a = resolve(params.clone()).unwrap().generate();
        let b = resolve(params).unwrap().generate();
        assert_eq!(a, b);
    }

    #[test]
    fn test_resample_yields_connected_graph() {
        let params = TopologyParams::random(12, 0.25)
            .with_seed(3)
            .with_connectivity(ConnectivityPolicy::Resample);
        let g = resolve(params).unwrap().generate();
        assert!(g.is_connected());
        assert_eq!(g.node_count(), 12);
    }

    #[test]
    fn test_augment_bridges_components() {
        let params = TopologyParams::stochastic_block(9, &[3, 3, 3], 1.0, 0.0)
            .with_connectivity(ConnectivityPolicy::Augment);
        let g = resolve(params).unwrap().generate();
        assert!(g.is_connected());
        assert!(g.has_edge(0, 3) && g.has_edge(3, 6));
        assert_eq!(g.edge_count(), 9 + 2);
    }

    #[test]
    fn test_royal_family_structure() {
        let g = resolve(TopologyParams::royal_family(8, 3, 2)).unwrap().generate();
        for i in 0..3 {
            for j in 0..8 {
                if i != j {
                    assert!(g.has_edge(i, j), "core {} should reach {}", i, j);
                }
            }
        }
        // ring over 3..8
        assert!(g.has_edge(3, 4) && g.has_edge(3, 7));
        assert!(!g.has_edge(3, 5));
    }

    #[test]
    fn test_royal_family_short_ring_has_no_self_loops() {
        let g = royal_family(4, 3, 4);
        assert_eq!(g.edge_count(), 6);
        assert!(!g.has_edge(3, 3));
    }

    #[test]
    fn test_royal_family_core_size_bounds() {
        for core in [0, 5, 6] {
            match resolve(TopologyParams::royal_family(5, core, 0)) {
                Err(SimError::Configuration { parameter, .. }) => assert_eq!(parameter, "core_size"),
                other => panic!("core_size={} accepted: {:?}", core, other.map(|s| s.node_count())),
            }
        }
    }

    #[test]
    fn test_royal_family_resample_terminates_without_ring() {
        let params = TopologyParams::royal_family(6, 1, 0).with_connectivity(ConnectivityPolicy::Resample);
        let g = resolve(params).unwrap().generate();
        assert!(g.is_connected());
        assert_eq!(g.edge_count(), 5);
    }

    #[test]
    fn test_royal_family_defaults() {
        let params = TopologyParams {
            kind: "royal_family_graph".into(),
            node_count: Some(10),
            ..Default::default()
        };
        match resolve(params).unwrap().topology {
            Topology::RoyalFamily { core_size, local_neighbor_count, .. } => {
                assert_eq!((core_size, local_neighbor_count), (3, 2));
            }
            other => panic!("unexpected topology {:?}", other),
        }
    }
}
