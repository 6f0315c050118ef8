//! Table search core for Multi-Level Dijkstra.
//!
//! Exploration is restricted to the parent cell, the smallest partition cell
//! containing the current phantom and every phantom of the opposite side.
//! Once a search crosses a cell boundary its level rises, interior edges of
//! the entered cell are replaced by that cell's precomputed clique arcs, and
//! only border edges at the current level are relaxed. No stalling; the
//! level gating already keeps the search spaces small.

use super::*;
use crate::algo::SegmentId;

/// Heap payload of MLD searches.
///
/// `level` tracks the highest partition level at which the node was reached
/// and never decreases along a search path. `from_clique_arc` blocks
/// chaining two clique arcs back to back, which would re-derive arcs the
/// customization already folded.
#[derive(Debug, Clone, Copy, Default)]
pub struct MldEntry {
    pub parent: NodeId,
    pub from_clique_arc: bool,
    pub level: LevelId,
    pub duration: Duration,
}

impl QueryData for MldEntry {
    fn origin(node: NodeId, duration: Duration) -> Self {
        MldEntry {
            parent: node,
            from_clique_arc: false,
            level: 0,
            duration,
        }
    }
}

/// The smallest level/cell enclosing one phantom and all opposite phantoms.
#[derive(Debug, Clone, Copy)]
pub struct ParentCell {
    pub level: LevelId,
    pub cell: CellId,
}

fn parent_cell(partition: &MultiLevelPartition, phantom: &PhantomNode, phantoms: &[PhantomNode], opposite_indices: &[usize]) -> ParentCell {
    let level = |source: SegmentId, target: SegmentId| -> LevelId {
        if source.enabled && target.enabled {
            partition.highest_different_level(source.id, target.id)
        } else {
            0
        }
    };

    let highest_level = |other: &PhantomNode| -> LevelId {
        level(phantom.forward_segment, other.forward_segment)
            .max(level(phantom.forward_segment, other.reverse_segment))
            .max(level(phantom.reverse_segment, other.forward_segment))
            .max(level(phantom.reverse_segment, other.reverse_segment))
    };

    let mut highest_different_level: LevelId = 0;
    if opposite_indices.is_empty() {
        for other in phantoms {
            highest_different_level = highest_different_level.max(highest_level(other));
        }
    } else {
        for &index in opposite_indices {
            highest_different_level = highest_different_level.max(highest_level(&phantoms[index]));
        }
    }

    // all endpoints of the table share the cell one level up
    ParentCell {
        level: highest_different_level + 1,
        cell: partition.cell(highest_different_level + 1, phantom.forward_segment.id),
    }
}

/// The MLD many-to-many search core over a partitioned facade.
pub struct MldTable<'a, F: MultiLevelFacade> {
    facade: &'a F,
}

impl<'a, F: MultiLevelFacade> MldTable<'a, F> {
    pub fn new(facade: &'a F) -> Self {
        MldTable { facade }
    }
}

fn relax_clique_arcs(
    node: NodeId,
    weight: Weight,
    duration: Duration,
    level: LevelId,
    heap: &mut QueryHeap<MldEntry>,
    to_nodes: &[NodeId],
    arc_weights: impl Iterator<Item = Weight>,
    arc_durations: impl Iterator<Item = Duration>,
) {
    for ((&to, shortcut_weight), shortcut_duration) in to_nodes.iter().zip(arc_weights).zip(arc_durations) {
        if shortcut_weight != INVALID_WEIGHT && to != node {
            let to_weight = weight + shortcut_weight;
            let to_duration = duration + shortcut_duration;
            let entry = MldEntry {
                parent: node,
                from_clique_arc: true,
                level,
                duration: to_duration,
            };

            if !heap.was_inserted(to) {
                heap.insert(to, to_weight, entry);
            } else if to_weight < heap.key(to) {
                *heap.data_mut(to) = entry;
                heap.decrease_key(to, to_weight);
            }
        }
    }
}

fn relax_outgoing_edges<const DIRECTION: bool, F: MultiLevelFacade>(
    facade: &F,
    node: NodeId,
    weight: Weight,
    duration: Duration,
    heap: &mut QueryHeap<MldEntry>,
    parent_cell: &ParentCell,
) {
    let partition = facade.partition();

    let node_data = *heap.data(node);
    let level = node_data.level.max(partition.highest_different_level(node_data.parent, node));

    // inside an entered cell, clique arcs stand in for interior edges
    if level >= 1 && !node_data.from_clique_arc {
        if let Some(cell) = facade.cells().cell(level, partition.cell(level, node)) {
            if DIRECTION == FORWARD {
                relax_clique_arcs(
                    node,
                    weight,
                    duration,
                    level,
                    heap,
                    cell.destination_nodes(),
                    cell.out_weights(node).iter().copied(),
                    cell.out_durations(node).iter().copied(),
                );
            } else {
                relax_clique_arcs(node, weight, duration, level, heap, cell.source_nodes(), cell.in_weights(node), cell.in_durations(node));
            }
        }
    }

    for edge in facade.border_edge_range(level, node) {
        let data = facade.edge_data(edge);
        let usable = if DIRECTION == FORWARD { data.forward } else { data.backward };
        if usable {
            let to = facade.target(edge);

            if partition.cell(parent_cell.level, to) != parent_cell.cell {
                continue;
            }

            debug_assert!(data.weight > 0, "edge_weight invalid");
            let to_weight = weight + data.weight;
            let to_duration = duration + data.duration;
            let entry = MldEntry {
                parent: node,
                from_clique_arc: false,
                level,
                duration: to_duration,
            };

            if !heap.was_inserted(to) {
                heap.insert(to, to_weight, entry);
            } else if to_weight < heap.key(to) {
                *heap.data_mut(to) = entry;
                heap.decrease_key(to, to_weight);
            }
        }
    }
}

impl<F: MultiLevelFacade> ManyToManyCore for MldTable<'_, F> {
    type Entry = MldEntry;
    type Restriction = ParentCell;

    fn num_nodes(&self) -> usize {
        self.facade.num_nodes()
    }

    fn restriction(&self, phantom: &PhantomNode, phantoms: &[PhantomNode], opposite_indices: &[usize]) -> ParentCell {
        parent_cell(self.facade.partition(), phantom, phantoms, opposite_indices)
    }

    fn backward_step(&self, restriction: &ParentCell, column: u32, heap: &mut QueryHeap<MldEntry>, buckets: &mut BucketIndex) {
        let Some(node) = heap.pop() else { return };
        let target_weight = heap.key(node);
        let target_duration = heap.data(node).duration;

        buckets.entry(node).or_default().push(NodeBucket {
            column,
            weight: target_weight,
            duration: target_duration,
        });

        relax_outgoing_edges::<REVERSE, _>(self.facade, node, target_weight, target_duration, heap, restriction);
    }

    fn forward_step(
        &self,
        restriction: &ParentCell,
        row: u32,
        num_targets: usize,
        heap: &mut QueryHeap<MldEntry>,
        buckets: &BucketIndex,
        weights_table: &mut [Weight],
        durations_table: &mut [Duration],
    ) {
        let Some(node) = heap.pop() else { return };
        let source_weight = heap.key(node);
        let source_duration = heap.data(node).duration;

        if let Some(bucket_list) = buckets.get(&node) {
            for bucket in bucket_list {
                let entry = row as usize * num_targets + bucket.column as usize;

                // negative sums come from phantoms sharing a segment; without
                // loop bookkeeping there is nothing to repair, drop them
                let new_weight = source_weight + bucket.weight;
                if new_weight >= 0 {
                    update_table_entry(
                        &mut weights_table[entry],
                        &mut durations_table[entry],
                        new_weight,
                        source_duration + bucket.duration,
                    );
                }
            }
        }

        relax_outgoing_edges::<FORWARD, _>(self.facade, node, source_weight, source_duration, heap, restriction);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algo::PhantomNode;

    #[test]
    fn parent_cell_covers_all_opposite_phantoms() {
        // levels: 1 -> {0 1} {2 3} {4 5}, 2 -> {0 1 2 3} {4 5}
        let partition = MultiLevelPartition::new(vec![vec![0, 0, 1, 1, 2, 2], vec![0, 0, 0, 0, 1, 1]]);
        let phantoms = [PhantomNode::at_node(0), PhantomNode::at_node(3), PhantomNode::at_node(5)];

        let same_cell = parent_cell(&partition, &phantoms[0], &phantoms, &[0]);
        assert_eq!(same_cell.level, 1);
        assert_eq!(same_cell.cell, 0);

        let one_up = parent_cell(&partition, &phantoms[0], &phantoms, &[1]);
        assert_eq!(one_up.level, 2);
        assert_eq!(one_up.cell, 0);

        // differs at the top stored level, so the implicit root cell is used
        let root = parent_cell(&partition, &phantoms[0], &phantoms, &[]);
        assert_eq!(root.level, 3);
        assert_eq!(root.cell, 0);
    }

    #[test]
    fn disabled_segments_do_not_contribute_to_the_parent_cell() {
        let partition = MultiLevelPartition::new(vec![vec![0, 1]]);
        let mut one_way = PhantomNode::at_node(1);
        one_way.forward_segment.enabled = false;
        one_way.reverse_segment = SegmentId { id: 1, enabled: false };

        let cell = parent_cell(&partition, &PhantomNode::at_node(0), &[one_way], &[]);
        assert_eq!(cell.level, 1);
        assert_eq!(cell.cell, 0);
    }
}
