// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Belief Diffusion Simulation Suite - Interaction Graph

use petgraph::algo;
use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::unionfind::UnionFind;
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::types::NodeId;

/// Undirected simple graph over caller-chosen node ids.
///
/// Storage is a petgraph `UnGraph` whose node weights are the ids; `index`
/// maps ids back to petgraph indices. Every accessor that yields ids does so
/// in ascending order so seeded runs stay reproducible regardless of
/// petgraph's internal edge order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "GraphRecord", into = "GraphRecord")]
pub struct Graph {
    inner: UnGraph<NodeId, ()>,
    index: BTreeMap<NodeId, NodeIndex>,
    blocks: BTreeMap<NodeId, usize>,
}

/// Flat wire form: node ids, `(low, high)` edges and SBM block labels.
#[derive(Serialize, Deserialize)]
struct GraphRecord {
    nodes: Vec<NodeId>,
    edges: Vec<(NodeId, NodeId)>,
    #[serde(default)]
    blocks: BTreeMap<NodeId, usize>,
}

impl From<Graph> for GraphRecord {
    fn from(g: Graph) -> Self {
        GraphRecord { nodes: g.nodes().collect(), edges: g.edges().collect(), blocks: g.blocks }
    }
}

impl From<GraphRecord> for Graph {
    fn from(record: GraphRecord) -> Self {
        let mut g = Graph::new();
        for u in record.nodes {
            g.add_node(u);
        }
        for (u, v) in record.edges {
            g.add_edge(u, v);
        }
        g.blocks = record.blocks;
        g
    }
}

impl PartialEq for Graph {
    fn eq(&self, other: &Self) -> bool {
        self.index.keys().eq(other.index.keys())
            && self.edges().eq(other.edges())
            && self.blocks == other.blocks
    }
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Graph over `0..n` with no edges.
    pub fn with_nodes(n: usize) -> Self {
        let mut g = Self::new();
        for u in 0..n {
            g.add_node(u);
        }
        g
    }

    pub fn add_node(&mut self, u: NodeId) {
        self.ensure_node(u);
    }

    fn ensure_node(&mut self, u: NodeId) -> NodeIndex {
        if let Some(&idx) = self.index.get(&u) {
            return idx;
        }
        let idx = self.inner.add_node(u);
        self.index.insert(u, idx);
        idx
    }

    /// Adds `u -- v`. Self-loops are rejected; returns whether a new edge was created.
    pub fn add_edge(&mut self, u: NodeId, v: NodeId) -> bool {
        if u == v {
            return false;
        }
        let (a, b) = (self.ensure_node(u), self.ensure_node(v));
        if self.inner.contains_edge(a, b) {
            return false;
        }
        self.inner.add_edge(a, b, ());
        true
    }

    pub fn remove_edge(&mut self, u: NodeId, v: NodeId) -> bool {
        match self.find_edge(u, v) {
            Some(e) => self.inner.remove_edge(e).is_some(),
            None => false,
        }
    }

    fn find_edge(&self, u: NodeId, v: NodeId) -> Option<petgraph::graph::EdgeIndex> {
        let (a, b) = (self.index.get(&u)?, self.index.get(&v)?);
        self.inner.find_edge(*a, *b)
    }

    pub fn has_edge(&self, u: NodeId, v: NodeId) -> bool {
        self.find_edge(u, v).is_some()
    }

    pub fn contains(&self, u: NodeId) -> bool {
        self.index.contains_key(&u)
    }

    pub fn node_count(&self) -> usize {
        self.inner.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.node_count() == 0
    }

    pub fn edge_count(&self) -> usize {
        self.inner.edge_count()
    }

    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.index.keys().copied()
    }

    /// Each edge once, as `(low, high)`, in ascending order.
    pub fn edges(&self) -> impl Iterator<Item = (NodeId, NodeId)> {
        let mut edges: Vec<(NodeId, NodeId)> = self
            .inner
            .edge_references()
            .map(|e| {
                let (u, v) = (self.inner[e.source()], self.inner[e.target()]);
                (u.min(v), u.max(v))
            })
            .collect();
        edges.sort_unstable();
        edges.into_iter()
    }

    pub fn neighbors(&self, u: NodeId) -> impl Iterator<Item = NodeId> {
        let mut out: Vec<NodeId> = match self.index.get(&u) {
            Some(&idx) => self.inner.neighbors(idx).map(|n| self.inner[n]).collect(),
            None => Vec::new(),
        };
        out.sort_unstable();
        out.into_iter()
    }

    pub fn degree(&self, u: NodeId) -> usize {
        self.index.get(&u).map_or(0, |&idx| self.inner.neighbors(idx).count())
    }

    // ─── Block labels (SBM passthrough) ──────────────────────────────────────

    pub fn set_block(&mut self, u: NodeId, block: usize) {
        self.blocks.insert(u, block);
    }

    pub fn block(&self, u: NodeId) -> Option<usize> {
        self.blocks.get(&u).copied()
    }

    // ─── Traversal ───────────────────────────────────────────────────────────

    /// Subgraph induced by `nodes`; ids absent from this graph are ignored.
    pub fn induced_subgraph<I>(&self, nodes: I) -> Graph
    where
        I: IntoIterator<Item = NodeId>,
    {
        let keep: BTreeSet<NodeId> = nodes.into_iter().filter(|u| self.contains(*u)).collect();
        let inner = self.inner.filter_map(|_, &u| keep.contains(&u).then_some(u), |_, _| Some(()));
        let index = inner.node_indices().map(|idx| (inner[idx], idx)).collect();
        let blocks = self.blocks.iter().filter(|(u, _)| keep.contains(u)).map(|(&u, &b)| (u, b)).collect();
        Graph { inner, index, blocks }
    }

    /// Hop distances from `source` to every node reachable from it.
    pub fn bfs_distances(&self, source: NodeId) -> BTreeMap<NodeId, usize> {
        match self.index.get(&source) {
            Some(&start) => algo::dijkstra(&self.inner, start, None, |_| 1usize)
                .into_iter()
                .map(|(idx, d)| (self.inner[idx], d))
                .collect(),
            None => BTreeMap::new(),
        }
    }

    pub fn component_count(&self) -> usize {
        algo::connected_components(&self.inner)
    }

    /// Components ordered by their smallest member.
    pub fn connected_components(&self) -> Vec<BTreeSet<NodeId>> {
        let mut uf = UnionFind::<usize>::new(self.inner.node_count());
        for e in self.inner.edge_references() {
            uf.union(e.source().index(), e.target().index());
        }
        let mut by_root: BTreeMap<usize, BTreeSet<NodeId>> = BTreeMap::new();
        for (i, root) in uf.into_labeling().into_iter().enumerate() {
            by_root.entry(root).or_default().insert(self.inner[NodeIndex::new(i)]);
        }
        let mut components: Vec<BTreeSet<NodeId>> = by_root.into_values().collect();
        components.sort_by_key(|c| c.iter().next().copied());
        components
    }

    /// True when there is at most one component (the empty graph counts as connected).
    pub fn is_connected(&self) -> bool {
        self.component_count() <= 1
    }

    pub fn largest_component_size(&self) -> usize {
        self.connected_components().iter().map(BTreeSet::len).max().unwrap_or(0)
    }
}
