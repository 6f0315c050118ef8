//! Adjacency-array backed search graph.

use super::*;

/// A prepared search graph in adjacency array representation.
///
/// `first_out` has one entry per node plus a sentinel, delimiting each node's
/// slice of `head`/`edge_data`. This is the layout preprocessing hands over;
/// the searches only ever read it.
#[derive(Debug, Clone)]
pub struct SearchGraph {
    first_out: Vec<EdgeId>,
    head: Vec<NodeId>,
    edge_data: Vec<EdgeData>,
}

impl SearchGraph {
    pub fn new(first_out: Vec<EdgeId>, head: Vec<NodeId>, edge_data: Vec<EdgeData>) -> SearchGraph {
        assert!(!first_out.is_empty());
        assert_eq!(*first_out.first().unwrap(), 0);
        assert_eq!(*first_out.last().unwrap() as usize, head.len());
        assert_eq!(head.len(), edge_data.len());
        assert!(edge_data.iter().all(|data| data.weight > 0), "edge_weight invalid");
        SearchGraph { first_out, head, edge_data }
    }

    /// Build from per-node adjacency lists of `(head, edge_data)` pairs.
    pub fn from_adjacency_lists(adjancecy_lists: Vec<Vec<(NodeId, EdgeData)>>) -> SearchGraph {
        // create the first_out array by doing a prefix sum over the adjancecy list sizes
        let first_out = {
            let degrees = adjancecy_lists.iter().map(|neighbors| neighbors.len() as EdgeId);
            std::iter::once(0)
                .chain(degrees.scan(0, |state, degree| {
                    *state += degree;
                    Some(*state)
                }))
                .collect()
        };

        let (head, edge_data) = adjancecy_lists.into_iter().flat_map(|neighbors| neighbors.into_iter()).unzip();

        SearchGraph::new(first_out, head, edge_data)
    }
}

impl Graph for SearchGraph {
    fn num_nodes(&self) -> usize {
        self.first_out.len() - 1
    }

    fn num_arcs(&self) -> usize {
        self.head.len()
    }
}

impl EdgeListFacade for SearchGraph {
    fn adjacent_edge_range(&self, node: NodeId) -> std::ops::Range<EdgeId> {
        self.first_out[node as usize]..self.first_out[node as usize + 1]
    }

    fn edge_data(&self, edge: EdgeId) -> EdgeData {
        self.edge_data[edge as usize]
    }

    fn target(&self, edge: EdgeId) -> NodeId {
        self.head[edge as usize]
    }
}

impl ContractedFacade for SearchGraph {}
