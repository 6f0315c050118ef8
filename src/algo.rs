//! Table search algorithms and their query types.

use crate::datastr::graph::*;

pub mod many_to_many;

/// A directed road segment handle as delivered by snapping.
/// Disabled segments exist so a phantom can be one-way.
#[derive(Debug, Clone, Copy)]
pub struct SegmentId {
    pub id: NodeId,
    pub enabled: bool,
}

impl SegmentId {
    pub const INVALID: SegmentId = SegmentId {
        id: NodeId::MAX,
        enabled: false,
    };
}

/// A coordinate snapped onto a road segment.
///
/// Carries the two directed segments covering the snap location and the
/// weight/duration offsets from the snap point to the segment ends. Searches
/// start by injecting the enabled segment nodes with these offsets; source
/// searches negate them, which is what makes the arithmetic in the bucket
/// combination work out.
#[derive(Debug, Clone, Copy)]
pub struct PhantomNode {
    pub forward_segment: SegmentId,
    pub reverse_segment: SegmentId,
    pub forward_weight: Weight,
    pub forward_duration: Duration,
    pub reverse_weight: Weight,
    pub reverse_duration: Duration,
}

impl PhantomNode {
    /// A phantom sitting exactly on a graph node, reachable in forward
    /// direction with zero offsets. Handy for tests and synthetic queries.
    pub fn at_node(node: NodeId) -> PhantomNode {
        PhantomNode {
            forward_segment: SegmentId { id: node, enabled: true },
            reverse_segment: SegmentId::INVALID,
            forward_weight: 0,
            forward_duration: 0,
            reverse_weight: 0,
            reverse_duration: 0,
        }
    }

    pub fn is_valid_forward(&self) -> bool {
        self.forward_segment.enabled
    }

    pub fn is_valid_reverse(&self) -> bool {
        self.reverse_segment.enabled
    }
}
