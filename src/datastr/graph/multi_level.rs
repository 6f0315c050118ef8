//! Nested partition and per-cell clique arcs for Multi-Level Dijkstra.

use super::*;
use std::collections::HashMap;

/// Partition levels are 8bit unsigned ints. Level 0 is the implicit
/// "every node its own cell" level, stored levels start at 1.
pub type LevelId = u8;
/// Cell ids are 32bit unsigned ints
pub type CellId = u32;

/// Read-only view of a nested multi-level partition.
///
/// `cells[l - 1][node]` is the cell of `node` at stored level `l`. Nesting
/// invariant: nodes sharing a cell at some level share cells at all higher
/// levels.
#[derive(Debug, Clone)]
pub struct MultiLevelPartition {
    cells: Vec<Vec<CellId>>,
}

impl MultiLevelPartition {
    pub fn new(cells: Vec<Vec<CellId>>) -> MultiLevelPartition {
        let mut levels = cells.iter();
        if let Some(first) = levels.next() {
            assert!(levels.all(|level| level.len() == first.len()));
        }
        MultiLevelPartition { cells }
    }

    pub fn num_levels(&self) -> LevelId {
        self.cells.len() as LevelId
    }

    /// Cell of `node` at `level`.
    ///
    /// Level 0 is the node itself. Levels above the stored hierarchy are the
    /// implicit root cell containing the whole graph, so a parent cell there
    /// restricts nothing.
    pub fn cell(&self, level: LevelId, node: NodeId) -> CellId {
        if level == 0 {
            node
        } else if level > self.num_levels() {
            0
        } else {
            self.cells[level as usize - 1][node as usize]
        }
    }

    /// The highest level at which `a` and `b` lie in different cells, 0 if
    /// they share their cell on every stored level.
    pub fn highest_different_level(&self, a: NodeId, b: NodeId) -> LevelId {
        for level in (1..=self.num_levels()).rev() {
            if self.cell(level, a) != self.cell(level, b) {
                return level;
            }
        }
        0
    }
}

/// Precomputed boundary-to-boundary shortcuts of one cell.
///
/// `out_weights`/`out_durations` are row-major `|sources| x |destinations|`,
/// one row per source boundary node. `INVALID_WEIGHT` marks a missing arc.
#[derive(Debug, Clone)]
pub struct Cell {
    source_nodes: Vec<NodeId>,
    destination_nodes: Vec<NodeId>,
    out_weights: Vec<Weight>,
    out_durations: Vec<Duration>,
}

impl Cell {
    pub fn new(source_nodes: Vec<NodeId>, destination_nodes: Vec<NodeId>, out_weights: Vec<Weight>, out_durations: Vec<Duration>) -> Cell {
        assert_eq!(out_weights.len(), source_nodes.len() * destination_nodes.len());
        assert_eq!(out_weights.len(), out_durations.len());
        Cell {
            source_nodes,
            destination_nodes,
            out_weights,
            out_durations,
        }
    }

    pub fn source_nodes(&self) -> &[NodeId] {
        &self.source_nodes
    }

    pub fn destination_nodes(&self) -> &[NodeId] {
        &self.destination_nodes
    }

    fn source_index(&self, node: NodeId) -> Option<usize> {
        self.source_nodes.iter().position(|&source| source == node)
    }

    fn destination_index(&self, node: NodeId) -> Option<usize> {
        self.destination_nodes.iter().position(|&destination| destination == node)
    }

    /// Outgoing arc weights of a source boundary node, one per destination.
    /// Empty when `node` is not a source of this cell.
    pub fn out_weights(&self, node: NodeId) -> &[Weight] {
        match self.source_index(node) {
            Some(row) => &self.out_weights[row * self.destination_nodes.len()..(row + 1) * self.destination_nodes.len()],
            None => &[],
        }
    }

    /// Outgoing arc durations of a source boundary node, parallel to `out_weights`.
    pub fn out_durations(&self, node: NodeId) -> &[Duration] {
        match self.source_index(node) {
            Some(row) => &self.out_durations[row * self.destination_nodes.len()..(row + 1) * self.destination_nodes.len()],
            None => &[],
        }
    }

    /// Incoming arc weights of a destination boundary node, one per source.
    pub fn in_weights(&self, node: NodeId) -> impl Iterator<Item = Weight> + '_ {
        let stride = self.destination_nodes.len().max(1);
        let column = self.destination_index(node);
        column
            .into_iter()
            .flat_map(move |column| self.out_weights[column..].iter().step_by(stride).copied())
    }

    /// Incoming arc durations of a destination boundary node, parallel to `in_weights`.
    pub fn in_durations(&self, node: NodeId) -> impl Iterator<Item = Duration> + '_ {
        let stride = self.destination_nodes.len().max(1);
        let column = self.destination_index(node);
        column
            .into_iter()
            .flat_map(move |column| self.out_durations[column..].iter().step_by(stride).copied())
    }
}

/// Clique arcs for all cells of all stored levels.
#[derive(Debug, Clone, Default)]
pub struct CellStorage {
    cells: HashMap<(LevelId, CellId), Cell>,
}

impl CellStorage {
    pub fn new() -> CellStorage {
        Default::default()
    }

    pub fn insert_cell(&mut self, level: LevelId, cell_id: CellId, cell: Cell) {
        let prev = self.cells.insert((level, cell_id), cell);
        assert!(prev.is_none());
    }

    /// `None` when no clique data exists for the cell, which reads as a cell
    /// without any boundary-to-boundary arcs.
    pub fn cell(&self, level: LevelId, cell_id: CellId) -> Option<&Cell> {
        self.cells.get(&(level, cell_id))
    }
}

/// Facade over a partitioned search graph with customized clique arcs.
pub trait MultiLevelFacade: EdgeListFacade {
    fn partition(&self) -> &MultiLevelPartition;
    fn cells(&self) -> &CellStorage;

    /// Adjacency entries of `node` that leave its cell at `level`.
    /// At level 0 every adjacent edge qualifies.
    fn border_edge_range(&self, level: LevelId, node: NodeId) -> impl Iterator<Item = EdgeId> + '_ {
        self.adjacent_edge_range(node)
            .filter(move |&edge| self.partition().highest_different_level(node, self.target(edge)) >= level)
    }
}

/// A search graph bundled with its partition and cell storage.
#[derive(Debug, Clone)]
pub struct MultiLevelGraph {
    graph: SearchGraph,
    partition: MultiLevelPartition,
    cells: CellStorage,
}

impl MultiLevelGraph {
    pub fn new(graph: SearchGraph, partition: MultiLevelPartition, cells: CellStorage) -> MultiLevelGraph {
        MultiLevelGraph { graph, partition, cells }
    }
}

impl Graph for MultiLevelGraph {
    fn num_nodes(&self) -> usize {
        self.graph.num_nodes()
    }

    fn num_arcs(&self) -> usize {
        self.graph.num_arcs()
    }
}

impl EdgeListFacade for MultiLevelGraph {
    fn adjacent_edge_range(&self, node: NodeId) -> std::ops::Range<EdgeId> {
        self.graph.adjacent_edge_range(node)
    }

    fn edge_data(&self, edge: EdgeId) -> EdgeData {
        self.graph.edge_data(edge)
    }

    fn target(&self, edge: EdgeId) -> NodeId {
        self.graph.target(edge)
    }
}

impl MultiLevelFacade for MultiLevelGraph {
    fn partition(&self) -> &MultiLevelPartition {
        &self.partition
    }

    fn cells(&self) -> &CellStorage {
        &self.cells
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // two level-1 cells {0, 1} and {2, 3}, one level-2 cell
    fn partition() -> MultiLevelPartition {
        MultiLevelPartition::new(vec![vec![0, 0, 1, 1], vec![0, 0, 0, 0]])
    }

    #[test]
    fn highest_different_level_respects_nesting() {
        let partition = partition();
        assert_eq!(partition.highest_different_level(0, 1), 0);
        assert_eq!(partition.highest_different_level(0, 2), 1);
        assert_eq!(partition.highest_different_level(2, 3), 0);
        assert_eq!(partition.highest_different_level(3, 3), 0);
    }

    #[test]
    fn levels_above_the_hierarchy_are_one_root_cell() {
        let partition = partition();
        assert_eq!(partition.cell(3, 1), 0);
        assert_eq!(partition.cell(3, 2), 0);
        assert_eq!(partition.cell(0, 2), 2);
    }

    #[test]
    fn cell_rows_and_columns() {
        let cell = Cell::new(vec![4, 5], vec![6, 7], vec![10, 20, 30, INVALID_WEIGHT], vec![1, 2, 3, MAX_DURATION]);

        assert_eq!(cell.out_weights(4), &[10, 20]);
        assert_eq!(cell.out_weights(5), &[30, INVALID_WEIGHT]);
        assert_eq!(cell.out_weights(6), &[] as &[Weight]);
        assert_eq!(cell.in_weights(7).collect::<Vec<_>>(), vec![20, INVALID_WEIGHT]);
        assert_eq!(cell.in_durations(6).collect::<Vec<_>>(), vec![1, 3]);
    }

    #[test]
    fn border_edges_filter_by_level() {
        //      0 -- 1 | 2 -- 3       (| marks the level 1 cell boundary)
        let graph = SearchGraph::from_adjacency_lists(vec![
            vec![(1, EdgeData::bidirectional(1, 1))],
            vec![(0, EdgeData::bidirectional(1, 1)), (2, EdgeData::bidirectional(1, 1))],
            vec![(1, EdgeData::bidirectional(1, 1)), (3, EdgeData::bidirectional(1, 1))],
            vec![(2, EdgeData::bidirectional(1, 1))],
        ]);
        let graph = MultiLevelGraph::new(graph, partition(), CellStorage::new());

        assert_eq!(graph.border_edge_range(0, 1).count(), 2);
        let level_1_border: Vec<_> = graph.border_edge_range(1, 1).collect();
        assert_eq!(level_1_border.len(), 1);
        assert_eq!(graph.target(level_1_border[0]), 2);
        assert_eq!(graph.border_edge_range(2, 1).count(), 0);
    }
}
