use serde::{Deserialize, Serialize};

pub type StationId = uuid::Uuid;

/// The closed set of station kinds. A new kind means a new variant plus a
/// `DropStrategy` row, not a new subclass hierarchy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StationKind {
    /// Free-form split area: edge drops create splits, center drops on an
    /// occupied leaf combine into a tabbed group.
    Split,
    /// Tabbed stack: every drop joins the pile.
    Stack,
    /// Floating-window area.
    Screen,
    /// Auto-hide flap: an ordered list of items, no splitting.
    Flap,
}

/// How a station kind reacts to drops.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DropStrategy {
    /// CENTER on an occupied leaf merges the dragged item into a group
    /// handle.
    pub center_combines: bool,
    /// Edge sides create `Split` nodes. When false the resolver collapses
    /// every in-leaf position to CENTER.
    pub edge_splits: bool,
}

impl StationKind {
    pub fn strategy(self) -> DropStrategy {
        match self {
            StationKind::Split => DropStrategy {
                center_combines: true,
                edge_splits: true,
            },
            StationKind::Stack => DropStrategy {
                center_combines: true,
                edge_splits: false,
            },
            StationKind::Screen => DropStrategy {
                center_combines: true,
                edge_splits: true,
            },
            StationKind::Flap => DropStrategy {
                center_combines: true,
                edge_splits: false,
            },
        }
    }
}
