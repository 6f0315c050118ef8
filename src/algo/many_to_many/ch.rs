//! Table search core for Contraction Hierarchies.
//!
//! Both search directions climb the hierarchy only, so forward and backward
//! search spaces are small and meet at high-ranked nodes. Stall-on-demand
//! prunes nodes that a downward edge proves dominated. Contraction can fold
//! a node's self-loop out of the shortcuts passing through it; when the
//! bucket combination of such a pair goes negative, the missing loop weight
//! is added back before the table is updated.

use super::*;

/// Heap payload of CH searches.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChEntry {
    pub parent: NodeId,
    pub duration: Duration,
}

impl QueryData for ChEntry {
    fn origin(node: NodeId, duration: Duration) -> Self {
        ChEntry { parent: node, duration }
    }
}

/// The CH many-to-many search core over a contracted facade.
pub struct ChTable<'a, F: ContractedFacade> {
    facade: &'a F,
}

impl<'a, F: ContractedFacade> ChTable<'a, F> {
    pub fn new(facade: &'a F) -> Self {
        ChTable { facade }
    }
}

fn relax_outgoing_edges<const DIRECTION: bool, F: ContractedFacade>(
    facade: &F,
    node: NodeId,
    weight: Weight,
    duration: Duration,
    heap: &mut QueryHeap<ChEntry>,
) {
    for edge in facade.adjacent_edge_range(node) {
        let data = facade.edge_data(edge);
        let usable = if DIRECTION == FORWARD { data.forward } else { data.backward };
        if usable {
            let to = facade.target(edge);
            debug_assert!(data.weight > 0, "edge_weight invalid");
            let to_weight = weight + data.weight;
            let to_duration = duration + data.duration;

            if !heap.was_inserted(to) {
                heap.insert(to, to_weight, ChEntry { parent: node, duration: to_duration });
            } else if to_weight < heap.key(to) {
                *heap.data_mut(to) = ChEntry { parent: node, duration: to_duration };
                heap.decrease_key(to, to_weight);
            }
        }
    }
}

/// Stall-on-demand: if an edge oriented against the search direction offers
/// a strictly cheaper way to reach `node`, the settled key is not a shortest
/// distance in the hierarchy and the node need not be relaxed. Pure pruning,
/// never changes results.
fn stall_at_node<const DIRECTION: bool, F: ContractedFacade>(facade: &F, node: NodeId, weight: Weight, heap: &QueryHeap<ChEntry>) -> bool {
    for edge in facade.adjacent_edge_range(node) {
        let data = facade.edge_data(edge);
        let against_direction = if DIRECTION == FORWARD { data.backward } else { data.forward };
        if against_direction {
            let to = facade.target(edge);
            if heap.was_inserted(to) && heap.key(to) + data.weight < weight {
                return true;
            }
        }
    }
    false
}

impl<F: ContractedFacade> ManyToManyCore for ChTable<'_, F> {
    type Entry = ChEntry;
    type Restriction = ();

    fn num_nodes(&self) -> usize {
        self.facade.num_nodes()
    }

    fn restriction(&self, _phantom: &PhantomNode, _phantoms: &[PhantomNode], _opposite_indices: &[usize]) -> Self::Restriction {}

    fn backward_step(&self, _restriction: &(), column: u32, heap: &mut QueryHeap<ChEntry>, buckets: &mut BucketIndex) {
        let Some(node) = heap.pop() else { return };
        let target_weight = heap.key(node);
        let target_duration = heap.data(node).duration;

        buckets.entry(node).or_default().push(NodeBucket {
            column,
            weight: target_weight,
            duration: target_duration,
        });

        if stall_at_node::<REVERSE, _>(self.facade, node, target_weight, heap) {
            return;
        }

        relax_outgoing_edges::<REVERSE, _>(self.facade, node, target_weight, target_duration, heap);
    }

    fn forward_step(
        &self,
        _restriction: &(),
        row: u32,
        num_targets: usize,
        heap: &mut QueryHeap<ChEntry>,
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
                let current_weight = &mut weights_table[entry];
                let current_duration = &mut durations_table[entry];

                let new_weight = source_weight + bucket.weight;
                if new_weight < 0 {
                    // The path enters and leaves the node on the same side of
                    // its contraction, so the stored weights miss the node's
                    // self-loop. Add it back, or drop the candidate if there
                    // is no loop or it still does not close the gap.
                    let loop_weight = self.facade.loop_weight(node);
                    if loop_weight != INVALID_WEIGHT {
                        let new_weight_with_loop = new_weight + loop_weight;
                        if new_weight_with_loop >= 0 {
                            let new_duration = source_duration + bucket.duration + self.facade.loop_duration(node);
                            update_table_entry(current_weight, current_duration, new_weight_with_loop, new_duration);
                        }
                    }
                } else {
                    update_table_entry(current_weight, current_duration, new_weight, source_duration + bucket.duration);
                }
            }
        }

        if stall_at_node::<FORWARD, _>(self.facade, node, source_weight, heap) {
            return;
        }

        relax_outgoing_edges::<FORWARD, _>(self.facade, node, source_weight, source_duration, heap);
    }
}
