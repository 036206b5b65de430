//! Node and way entities held by an [`EntityStore`](crate::EntityStore).

use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;

use crate::{MapBoundingBox, MapPoint};

/// OpenStreetMap-style key/value tags. Keys are unique; later writes win.
pub type Tags = BTreeMap<String, String>;

/// Stable handle to a [`Node`] inside one store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

/// Stable handle to a [`Way`] inside one store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WayId(pub(crate) usize);

impl NodeId {
    /// Position of the node in its store's arena.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl WayId {
    /// Position of the way in its store's arena.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

/// A single geographic point entity.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    id: String,
    /// Tags attached to the node.
    pub tags: Tags,
    /// Position, nowhere until a response supplies it.
    pub location: MapPoint,
    /// Way this node was most recently appended to.
    ///
    /// Not ownership: many ways may list the node. Only the latest is kept,
    /// and it decides which way's bounds grow when the node is located.
    pub way: Option<WayId>,
}

impl Node {
    pub(crate) fn new(id: String) -> Self {
        Self {
            id,
            tags: Tags::new(),
            location: MapPoint::NOWHERE,
            way: None,
        }
    }

    /// External identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }
}

/// Per-way display mode chosen by the user.
///
/// The discriminants are the wire codes used by save files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum Visibility {
    /// Drawn with its label.
    #[default]
    Show = 0,
    /// Drawn without a label.
    NoLabel = 1,
    /// Not drawn.
    Hide = 2,
}

impl Visibility {
    /// Numeric code written to save files.
    #[must_use]
    pub const fn code(self) -> u8 {
        self as u8
    }
}

/// Returned when a visibility code is outside `0..=2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("visibility code {0} is not one of 0, 1 or 2")]
pub struct InvalidVisibility(pub u8);

impl TryFrom<u8> for Visibility {
    type Error = InvalidVisibility;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Show),
            1 => Ok(Self::NoLabel),
            2 => Ok(Self::Hide),
            other => Err(InvalidVisibility(other)),
        }
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Show => "show",
            Self::NoLabel => "no-label",
            Self::Hide => "hide",
        };
        f.write_str(label)
    }
}

/// An ordered polyline or polygon of node references.
#[derive(Debug, Clone, PartialEq)]
pub struct Way {
    id: String,
    /// Display mode.
    pub visibility: Visibility,
    /// Tags attached to the way.
    pub tags: Tags,
    /// Member nodes in the order they were received.
    pub nodes: Vec<NodeId>,
    /// Bounds of the located member nodes.
    pub bbox: MapBoundingBox,
}

impl Way {
    pub(crate) fn new(id: String) -> Self {
        Self {
            id,
            visibility: Visibility::Show,
            tags: Tags::new(),
            nodes: Vec::new(),
            bbox: MapBoundingBox::EMPTY,
        }
    }

    /// External identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns true when the way carries a `highway` tag.
    #[must_use]
    pub fn has_highway_tag(&self) -> bool {
        self.tags.contains_key("highway")
    }
}

/// Rendering class derived from a way's tags and shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum WayKind {
    /// Open path, or anything tagged `highway`.
    Highway,
    /// Closed ring.
    Polygon,
}
