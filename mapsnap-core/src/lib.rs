//! Core domain types for the mapsnap acquisition pipeline.
//!
//! Responsibilities:
//! - Model map geometry (points with an unset sentinel, growable boxes).
//! - Own nodes and ways in an identity-mapped arena keyed by external ID.
//! - Derive rendering classes (highway or polygon) and label anchors.
//!
//! Invariants:
//! - An external ID maps to exactly one entity per [`EntityStore`].
//! - Handles are stable; the store never removes entities.
//! - No global mutable state.

mod entity;
mod geometry;
mod result;
mod store;

pub use entity::{InvalidVisibility, Node, NodeId, Tags, Visibility, Way, WayId, WayKind};
pub use geometry::{MapBoundingBox, MapPoint};
pub use result::QueryResult;
pub use store::{ENDPOINT_EPSILON, EntityStore};
