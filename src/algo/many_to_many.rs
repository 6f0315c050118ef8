//! Many-to-many table search.
//!
//! One backward search per target feeds the bucket index: every node it
//! settles remembers the target column and the weight/duration to reach the
//! target from there. One forward search per source then scans the buckets
//! of each settled node and keeps the per-cell minima. The search cores
//! plugged into [`ManyToManyCore`] decide how settling and relaxation work;
//! the loop shape here is the same for both.

use crate::datastr::graph::*;
use crate::datastr::query_heap::QueryHeap;
use crate::report::*;
use std::collections::HashMap;

use super::PhantomNode;

pub mod ch;
pub mod mld;

pub const FORWARD: bool = true;
pub const REVERSE: bool = false;

/// One contribution of a completed backward search: settling the owning node
/// at `weight`/`duration` reaches the target of column `column`.
#[derive(Debug, Clone, Copy)]
pub struct NodeBucket {
    pub column: u32,
    pub weight: Weight,
    pub duration: Duration,
}

/// Settled node to bucket entries, in target processing order.
/// Append-only while the backward searches run, read-only afterwards.
pub type BucketIndex = HashMap<NodeId, Vec<NodeBucket>>;

/// Heap payload of a table search.
pub trait QueryData: Clone + Default {
    /// Payload of a search origin injected from a phantom.
    fn origin(node: NodeId, duration: Duration) -> Self;
}

/// A search core pluggable into the orchestrator loop: how to settle one
/// node in backward/forward direction, and which per-search restriction to
/// precompute from the opposite side's phantoms.
pub trait ManyToManyCore {
    type Entry: QueryData;
    /// Precomputed per-search state. The parent cell for MLD, nothing for CH.
    type Restriction;

    fn num_nodes(&self) -> usize;

    fn restriction(&self, phantom: &PhantomNode, phantoms: &[PhantomNode], opposite_indices: &[usize]) -> Self::Restriction;

    /// Pop one node, append its bucket entry for `column`, relax backward.
    fn backward_step(&self, restriction: &Self::Restriction, column: u32, heap: &mut QueryHeap<Self::Entry>, buckets: &mut BucketIndex);

    /// Pop one node, combine its buckets into row `row` of the tables, relax forward.
    fn forward_step(
        &self,
        restriction: &Self::Restriction,
        row: u32,
        num_targets: usize,
        heap: &mut QueryHeap<Self::Entry>,
        buckets: &BucketIndex,
        weights_table: &mut [Weight],
        durations_table: &mut [Duration],
    );
}

/// Scratch state of table queries, owned per thread and recycled between
/// calls to avoid reallocating heaps sized to the graph.
pub struct ManyToManyData<E: QueryData> {
    heap: Option<QueryHeap<E>>,
}

impl<E: QueryData> ManyToManyData<E> {
    pub fn new() -> ManyToManyData<E> {
        ManyToManyData { heap: None }
    }

    fn initialize_or_clear(&mut self, num_nodes: usize) -> &mut QueryHeap<E> {
        match &mut self.heap {
            Some(heap) if heap.num_ids() == num_nodes => heap.clear(),
            heap => *heap = Some(QueryHeap::new(num_nodes)),
        }
        self.heap.as_mut().unwrap()
    }
}

impl<E: QueryData> Default for ManyToManyData<E> {
    fn default() -> Self {
        Self::new()
    }
}

/// Both result matrices of a table query, row-major with one row per source.
pub struct TableResult {
    pub weights: Vec<Weight>,
    pub durations: Vec<Duration>,
}

impl TableResult {
    pub fn weight(&self, row: usize, num_targets: usize, column: usize) -> Weight {
        self.weights[row * num_targets + column]
    }

    pub fn duration(&self, row: usize, num_targets: usize, column: usize) -> Duration {
        self.durations[row * num_targets + column]
    }
}

/// Seed a backward search with the target phantom's offsets.
fn insert_target_in_heap<E: QueryData>(heap: &mut QueryHeap<E>, phantom: &PhantomNode) {
    if phantom.is_valid_forward() {
        heap.insert(
            phantom.forward_segment.id,
            phantom.forward_weight,
            E::origin(phantom.forward_segment.id, phantom.forward_duration),
        );
    }
    if phantom.is_valid_reverse() {
        heap.insert(
            phantom.reverse_segment.id,
            phantom.reverse_weight,
            E::origin(phantom.reverse_segment.id, phantom.reverse_duration),
        );
    }
}

/// Seed a forward search with the source phantom's offsets, negated.
/// The negative start weights cancel against the segment weights baked into
/// the target side, and can surface as negative sums in the bucket
/// combination when both phantoms share a segment.
fn insert_source_in_heap<E: QueryData>(heap: &mut QueryHeap<E>, phantom: &PhantomNode) {
    if phantom.is_valid_forward() {
        heap.insert(
            phantom.forward_segment.id,
            -phantom.forward_weight,
            E::origin(phantom.forward_segment.id, -phantom.forward_duration),
        );
    }
    if phantom.is_valid_reverse() {
        heap.insert(
            phantom.reverse_segment.id,
            -phantom.reverse_weight,
            E::origin(phantom.reverse_segment.id, -phantom.reverse_duration),
        );
    }
}

/// Fold a candidate into a table cell.
/// Strictly better weights replace weight and duration; on equal weight the
/// smaller duration is kept, so co-optimal paths resolve deterministically.
fn update_table_entry(current_weight: &mut Weight, current_duration: &mut Duration, new_weight: Weight, new_duration: Duration) {
    if new_weight < *current_weight {
        *current_weight = new_weight;
        *current_duration = new_duration;
    } else if new_weight == *current_weight && new_duration < *current_duration {
        *current_duration = new_duration;
    }
}

/// Run a full table query and return both matrices.
///
/// Empty index slices select all phantoms, in order. Index slices may repeat
/// phantoms, which duplicates the matrix row/column. Unreachable pairs stay
/// at the `INVALID_WEIGHT`/`MAX_DURATION` sentinels.
pub fn many_to_many_tables<C: ManyToManyCore>(
    core: &C,
    data: &mut ManyToManyData<C::Entry>,
    phantoms: &[PhantomNode],
    source_indices: &[usize],
    target_indices: &[usize],
) -> TableResult {
    let sources: Vec<&PhantomNode> = if source_indices.is_empty() {
        phantoms.iter().collect()
    } else {
        source_indices.iter().map(|&index| &phantoms[index]).collect()
    };
    let targets: Vec<&PhantomNode> = if target_indices.is_empty() {
        phantoms.iter().collect()
    } else {
        target_indices.iter().map(|&index| &phantoms[index]).collect()
    };

    let number_of_entries = sources.len() * targets.len();
    let mut weights_table = vec![INVALID_WEIGHT; number_of_entries];
    let mut durations_table = vec![MAX_DURATION; number_of_entries];

    report_silent!("num_sources", sources.len());
    report_silent!("num_targets", targets.len());

    let heap = data.initialize_or_clear(core.num_nodes());
    let mut buckets = BucketIndex::new();

    for (column_idx, phantom) in targets.iter().enumerate() {
        let restriction = core.restriction(phantom, phantoms, source_indices);
        heap.clear();
        insert_target_in_heap(heap, phantom);

        while !heap.is_empty() {
            core.backward_step(&restriction, column_idx as u32, heap, &mut buckets);
        }
    }

    report_silent!("num_bucket_entries", buckets.values().map(Vec::len).sum::<usize>());

    for (row_idx, phantom) in sources.iter().enumerate() {
        let restriction = core.restriction(phantom, phantoms, target_indices);
        heap.clear();
        insert_source_in_heap(heap, phantom);

        while !heap.is_empty() {
            core.forward_step(
                &restriction,
                row_idx as u32,
                targets.len(),
                heap,
                &buckets,
                &mut weights_table,
                &mut durations_table,
            );
        }
    }

    TableResult {
        weights: weights_table,
        durations: durations_table,
    }
}

/// Run a table query and return the duration matrix, row-major with one row
/// per source. `MAX_DURATION` cells mark unreachable pairs.
pub fn many_to_many_search<C: ManyToManyCore>(
    core: &C,
    data: &mut ManyToManyData<C::Entry>,
    phantoms: &[PhantomNode],
    source_indices: &[usize],
    target_indices: &[usize],
) -> Vec<Duration> {
    many_to_many_tables(core, data, phantoms, source_indices, target_indices).durations
}
