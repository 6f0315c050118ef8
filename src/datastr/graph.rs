//! Graph types and the read-only facade traits consumed by the searches.

use std::ops::Range;

pub mod first_out_graph;
pub mod multi_level;

pub use self::first_out_graph::SearchGraph;
pub use self::multi_level::{Cell, CellId, CellStorage, LevelId, MultiLevelFacade, MultiLevelGraph, MultiLevelPartition};

/// Node ids are 32bit unsigned ints
pub type NodeId = u32;
/// Edge ids are 32bit unsigned ints
pub type EdgeId = u32;
/// Weights are 32bit *signed* ints.
/// Phantom offsets are injected negated on the source side, so tentative
/// weights (and sums with bucket entries) can legitimately drop below zero.
pub type Weight = i32;
/// Durations share the weight representation.
pub type Duration = i32;

/// Marks absent shortcuts and unreachable table cells. Treated as +inf.
pub const INVALID_WEIGHT: Weight = i32::MAX;
/// Duration counterpart of `INVALID_WEIGHT`.
pub const MAX_DURATION: Duration = i32::MAX;

/// Payload of one directed adjacency entry.
///
/// Each road edge appears in the adjacency of both endpoints; the direction
/// flags say in which travel directions this entry may be used. Shortcut
/// edges look no different from ordinary ones here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeData {
    pub weight: Weight,
    pub duration: Duration,
    pub forward: bool,
    pub backward: bool,
}

impl EdgeData {
    pub fn bidirectional(weight: Weight, duration: Duration) -> EdgeData {
        EdgeData {
            weight,
            duration,
            forward: true,
            backward: true,
        }
    }
}

/// Base trait for graphs.
pub trait Graph {
    fn num_nodes(&self) -> usize;
    fn num_arcs(&self) -> usize;
}

/// Random access to the adjacency array of a prepared search graph.
pub trait EdgeListFacade: Graph {
    /// The ids of the adjacency entries of `node`.
    fn adjacent_edge_range(&self, node: NodeId) -> Range<EdgeId>;
    /// Payload of the given adjacency entry.
    fn edge_data(&self, edge: EdgeId) -> EdgeData;
    /// Head node of the given adjacency entry.
    fn target(&self, edge: EdgeId) -> NodeId;
}

/// Facade over a contracted (CH) search graph.
///
/// Contraction can leave self-loops whose weight is missing from shortcuts
/// passing through the looped node. The loop lookups recover that weight,
/// scanning the forward self-loops of a node.
pub trait ContractedFacade: EdgeListFacade {
    /// Minimum weight over forward self-loops at `node`, `INVALID_WEIGHT` if there are none.
    fn loop_weight(&self, node: NodeId) -> Weight {
        let mut loop_weight = INVALID_WEIGHT;
        for edge in self.adjacent_edge_range(node) {
            let data = self.edge_data(edge);
            if data.forward && self.target(edge) == node {
                loop_weight = std::cmp::min(loop_weight, data.weight);
            }
        }
        loop_weight
    }

    /// Minimum duration over forward self-loops at `node`, `MAX_DURATION` if there are none.
    fn loop_duration(&self, node: NodeId) -> Duration {
        let mut loop_duration = MAX_DURATION;
        for edge in self.adjacent_edge_range(node) {
            let data = self.edge_data(edge);
            if data.forward && self.target(edge) == node {
                loop_duration = std::cmp::min(loop_duration, data.duration);
            }
        }
        loop_duration
    }
}
