//! Many-to-many shortest path tables for speed-up-indexed road graphs.
//!
//! Given a set of phantom endpoints snapped onto road segments, computes for
//! every (source, target) pair the minimum travel weight and the duration of
//! the weight-optimal path. Backward searches from all targets populate a
//! bucket index over their settled nodes, forward searches from all sources
//! then compose table entries from bucket hits. Two search cores are
//! available: one for Contraction Hierarchies and one for Multi-Level
//! Dijkstra over a nested partition.
//!
//! Graph preprocessing (contraction, partitioning, customization) and
//! phantom snapping happen elsewhere. This crate consumes read-only facades.

#[macro_use]
pub mod report;

pub mod algo;
pub mod datastr;
