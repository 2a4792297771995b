use ratatui::layout::{Position, Rect};

use crate::config::ReferencePoint;
use crate::item::{ItemId, ItemRef};
use crate::node::NodePath;
use crate::tree::{LayoutTree, INSERT_RATIO_MAX, INSERT_RATIO_MIN};

// ---------------------------------------------------------------------------
// DropTarget — where a dragged item would land
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DropSide {
    Top,
    Bottom,
    Left,
    Right,
    Center,
}

/// Which node a target references: the root slot of the station, or a
/// node addressed by its path.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TargetNode {
    Root,
    Node(NodePath),
}

/// Ephemeral resolver output, created and discarded once per drag frame.
/// Validated against the live tree when applied; `expected_item` catches
/// the tree mutating between `resolve` and `insert`.
#[derive(Clone, Debug, PartialEq)]
pub struct DropTarget {
    pub node: TargetNode,
    pub side: DropSide,
    /// Fraction of the target the dragged element would occupy if the
    /// drop splits, already clamped to the insert range.
    pub proposed_ratio: f64,
    /// First occupant under the target at resolve time, if any.
    pub expected_item: Option<ItemId>,
}

// ---------------------------------------------------------------------------
// resolve — pure hit-testing over the current tree geometry
// ---------------------------------------------------------------------------

/// Find the drop target for the dragged preview `pointer`. Pure function
/// of the tree's geometry and policy state: never mutates, and equal
/// inputs give equal targets. O(depth) beyond the initial containment
/// walk, cheap enough per pointer-move event.
///
/// The deepest leaf containing the reference point wins; if a policy (or
/// self-targeting) rejects it, enclosing ancestors are tried on the way
/// up. `None` means the station refuses the drop outright.
pub fn resolve(tree: &LayoutTree, pointer: Rect, dragged: &ItemRef) -> Option<DropTarget> {
    let p = reference_point(pointer, tree.config().reference_point);
    if !tree.bounds().contains(p) {
        return None;
    }

    let Some(root) = tree.root() else {
        // Empty station: the whole area is one CENTER zone.
        return root_target(tree, dragged);
    };

    let strategy = tree.kind().strategy();
    let Some(mut path) = root.leaf_at(p) else {
        // Divider band or rounding slack: the station itself accepts.
        return root_target(tree, dragged);
    };

    loop {
        let node = root.node_at(&path)?;
        let is_self = node.item().is_some_and(|i| i.id == dragged.id);
        if !is_self && tree.accepts(&path, dragged) {
            let rect = node.rect();
            let side = if !strategy.edge_splits {
                DropSide::Center
            } else if node.is_leaf() {
                zone_side(rect, p, tree.config().center_fraction)
            } else {
                // Ancestors picked up by policy fallback never combine;
                // only the edge bands apply.
                zone_side(rect, p, 0.0)
            };
            return Some(DropTarget {
                expected_item: Some(node.first_item()),
                node: TargetNode::Node(path),
                side,
                proposed_ratio: proposed_ratio(rect, pointer, side),
            });
        }
        if path.is_root() {
            return None;
        }
        path.pop();
    }
}

fn root_target(tree: &LayoutTree, dragged: &ItemRef) -> Option<DropTarget> {
    if !tree.accepts(&NodePath::root(), dragged) {
        return None;
    }
    Some(DropTarget {
        node: TargetNode::Root,
        side: DropSide::Center,
        proposed_ratio: 0.5,
        expected_item: None,
    })
}

fn reference_point(pointer: Rect, mode: ReferencePoint) -> Position {
    match mode {
        ReferencePoint::Center => Position::new(
            pointer.x + pointer.width / 2,
            pointer.y + pointer.height / 2,
        ),
        ReferencePoint::TopLeft => Position::new(pointer.x, pointer.y),
    }
}

/// Partition `rect` into a center zone and four edge bands and classify
/// `p`. `center_fraction` is the middle share per axis; the corner cells
/// go to the axis whose edge is proportionally nearer, exact ties to the
/// horizontal side.
fn zone_side(rect: Rect, p: Position, center_fraction: f64) -> DropSide {
    let fx = (p.x.saturating_sub(rect.x)) as f64 / rect.width.max(1) as f64;
    let fy = (p.y.saturating_sub(rect.y)) as f64 / rect.height.max(1) as f64;
    let band = (1.0 - center_fraction) / 2.0;
    let in_x = fx >= band && fx < 1.0 - band;
    let in_y = fy >= band && fy < 1.0 - band;

    if in_x && in_y {
        return DropSide::Center;
    }
    if in_y {
        return if fx < band { DropSide::Left } else { DropSide::Right };
    }
    if in_x {
        return if fy < band { DropSide::Top } else { DropSide::Bottom };
    }
    // Corner cell: nearer edge wins.
    let dx = fx.min(1.0 - fx);
    let dy = fy.min(1.0 - fy);
    if dx <= dy {
        if fx < band {
            DropSide::Left
        } else {
            DropSide::Right
        }
    } else if fy < band {
        DropSide::Top
    } else {
        DropSide::Bottom
    }
}

fn proposed_ratio(rect: Rect, pointer: Rect, side: DropSide) -> f64 {
    let raw = match side {
        DropSide::Left | DropSide::Right => pointer.width as f64 / rect.width.max(1) as f64,
        DropSide::Top | DropSide::Bottom => pointer.height as f64 / rect.height.max(1) as f64,
        DropSide::Center => 0.5,
    };
    raw.clamp(INSERT_RATIO_MIN, INSERT_RATIO_MAX)
}
