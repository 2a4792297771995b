use ratatui::layout::{Position, Rect};
use serde::{Deserialize, Serialize};

use crate::item::{ItemId, ItemRef};
use crate::placeholder::Placeholder;

// ---------------------------------------------------------------------------
// Orientation & Side
// ---------------------------------------------------------------------------

/// Axis of a split. `Vertical` puts the children side by side (the divider
/// runs vertically), `Horizontal` stacks them (the divider runs
/// horizontally). LEFT/RIGHT drops produce `Vertical`, TOP/BOTTOM produce
/// `Horizontal`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    Horizontal,
    Vertical,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    First,
    Second,
}

impl Side {
    pub fn other(self) -> Side {
        match self {
            Side::First => Side::Second,
            Side::Second => Side::First,
        }
    }
}

// ---------------------------------------------------------------------------
// NodePath — address of a node inside a tree
// ---------------------------------------------------------------------------

/// Path from the root child down to a node: which child to take at each
/// split. The empty path is the root child itself.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodePath(Vec<Side>);

impl NodePath {
    pub fn root() -> Self {
        Self(Vec::new())
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn child_first(&self) -> Self {
        let mut p = self.clone();
        p.0.push(Side::First);
        p
    }

    pub fn child_second(&self) -> Self {
        let mut p = self.clone();
        p.0.push(Side::Second);
        p
    }

    pub fn child(&self, side: Side) -> Self {
        match side {
            Side::First => self.child_first(),
            Side::Second => self.child_second(),
        }
    }

    /// Parent path and which child this path is, or `None` at the root.
    pub fn parent(&self) -> Option<(NodePath, Side)> {
        let mut p = self.clone();
        let side = p.0.pop()?;
        Some((p, side))
    }

    pub fn starts_with(&self, prefix: &NodePath) -> bool {
        self.0.len() >= prefix.0.len() && self.0[..prefix.0.len()] == prefix.0[..]
    }

    pub fn iter(&self) -> impl Iterator<Item = Side> + '_ {
        self.0.iter().copied()
    }

    pub(crate) fn push(&mut self, side: Side) {
        self.0.push(side);
    }

    pub(crate) fn pop(&mut self) -> Option<Side> {
        self.0.pop()
    }

    /// Rewrite this path after the split at `collapsed` was replaced by
    /// its `surviving` child. Paths through the survivor lose one step;
    /// paths through the removed child have no equivalent.
    pub(crate) fn remap_after_collapse(
        &self,
        collapsed: &NodePath,
        surviving: Side,
    ) -> Option<NodePath> {
        if !self.starts_with(collapsed) {
            return Some(self.clone());
        }
        let rest = &self.0[collapsed.0.len()..];
        match rest.first() {
            // The collapsed split itself maps to the survivor's new spot.
            None => Some(collapsed.clone()),
            Some(side) if *side == surviving => {
                let mut out = collapsed.0.clone();
                out.extend_from_slice(&rest[1..]);
                Some(NodePath(out))
            }
            Some(_) => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Split geometry
// ---------------------------------------------------------------------------

/// Partition `area` at `ratio` along `orientation`, reserving a fixed
/// divider band between the children. Exact pixel accounting: the two
/// child extents plus the divider always sum to the parent extent.
pub fn split_rects(orientation: Orientation, ratio: f64, area: Rect, divider: u16) -> (Rect, Rect) {
    match orientation {
        Orientation::Vertical => {
            let divider = divider.min(area.width);
            let usable = area.width - divider;
            let first_w = ((ratio * usable as f64).round() as u16).min(usable);
            let second_w = usable - first_w;
            (
                Rect::new(area.x, area.y, first_w, area.height),
                Rect::new(area.x + first_w + divider, area.y, second_w, area.height),
            )
        }
        Orientation::Horizontal => {
            let divider = divider.min(area.height);
            let usable = area.height - divider;
            let first_h = ((ratio * usable as f64).round() as u16).min(usable);
            let second_h = usable - first_h;
            (
                Rect::new(area.x, area.y, area.width, first_h),
                Rect::new(area.x, area.y + first_h + divider, area.width, second_h),
            )
        }
    }
}

// ---------------------------------------------------------------------------
// RegionNode
// ---------------------------------------------------------------------------

/// A node of the docking region tree. Rectangles are screen-space bounds,
/// assigned by a single top-down `recompute` pass after every mutation —
/// never propagated incrementally.
#[derive(Clone, Debug, PartialEq)]
pub enum RegionNode {
    Leaf {
        item: ItemRef,
        placeholders: Vec<Placeholder>,
        rect: Rect,
    },
    Split {
        orientation: Orientation,
        ratio: f64,
        first: Box<RegionNode>,
        second: Box<RegionNode>,
        rect: Rect,
    },
}

/// Result of a divider hit-test: enough for a host to start a ratio drag.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DividerHit {
    pub path: NodePath,
    pub orientation: Orientation,
    /// Coordinate where the divider band starts (x for vertical splits,
    /// y for horizontal ones).
    pub position: u16,
    /// Total extent of the split along its axis, for pixel-to-ratio
    /// conversion.
    pub span: u16,
}

enum NeighborResult {
    Found(ItemId),
    NeedFromParent,
}

impl RegionNode {
    pub fn leaf(item: ItemRef) -> Self {
        RegionNode::Leaf {
            item,
            placeholders: Vec::new(),
            rect: Rect::default(),
        }
    }

    pub fn split(orientation: Orientation, ratio: f64, first: RegionNode, second: RegionNode) -> Self {
        RegionNode::Split {
            orientation,
            ratio,
            first: Box::new(first),
            second: Box::new(second),
            rect: Rect::default(),
        }
    }

    pub fn rect(&self) -> Rect {
        match self {
            RegionNode::Leaf { rect, .. } | RegionNode::Split { rect, .. } => *rect,
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, RegionNode::Leaf { .. })
    }

    /// The occupant, when this node is a leaf.
    pub fn item(&self) -> Option<&ItemRef> {
        match self {
            RegionNode::Leaf { item, .. } => Some(item),
            RegionNode::Split { .. } => None,
        }
    }

    /// Assign `bounds` to this subtree, partitioning splits at their
    /// ratio with `divider` pixels reserved between children. This is the
    /// only way rectangles ever change.
    pub fn recompute(&mut self, bounds: Rect, divider: u16) {
        match self {
            RegionNode::Leaf { rect, .. } => *rect = bounds,
            RegionNode::Split {
                orientation,
                ratio,
                first,
                second,
                rect,
            } => {
                *rect = bounds;
                let (a, b) = split_rects(*orientation, *ratio, bounds, divider);
                first.recompute(a, divider);
                second.recompute(b, divider);
            }
        }
    }

    pub fn node_at(&self, path: &NodePath) -> Option<&RegionNode> {
        let mut cur = self;
        for side in path.iter() {
            match cur {
                RegionNode::Split { first, second, .. } => {
                    cur = match side {
                        Side::First => first,
                        Side::Second => second,
                    };
                }
                RegionNode::Leaf { .. } => return None,
            }
        }
        Some(cur)
    }

    pub fn node_at_mut(&mut self, path: &NodePath) -> Option<&mut RegionNode> {
        let mut cur = self;
        for side in path.iter() {
            match cur {
                RegionNode::Split { first, second, .. } => {
                    cur = match side {
                        Side::First => first,
                        Side::Second => second,
                    };
                }
                RegionNode::Leaf { .. } => return None,
            }
        }
        Some(cur)
    }

    /// Path of the leaf holding `item`, if present.
    pub fn find_item(&self, item: ItemId) -> Option<NodePath> {
        let mut path = NodePath::root();
        if self.find_item_inner(item, &mut path) {
            Some(path)
        } else {
            None
        }
    }

    fn find_item_inner(&self, item: ItemId, path: &mut NodePath) -> bool {
        match self {
            RegionNode::Leaf { item: it, .. } => it.id == item,
            RegionNode::Split { first, second, .. } => {
                path.push(Side::First);
                if first.find_item_inner(item, path) {
                    return true;
                }
                path.pop();
                path.push(Side::Second);
                if second.find_item_inner(item, path) {
                    return true;
                }
                path.pop();
                false
            }
        }
    }

    pub fn contains(&self, item: ItemId) -> bool {
        match self {
            RegionNode::Leaf { item: it, .. } => it.id == item,
            RegionNode::Split { first, second, .. } => {
                first.contains(item) || second.contains(item)
            }
        }
    }

    /// Deepest leaf whose rectangle contains `p`. Boundary ties go to the
    /// first child visited in left-to-right order; half-open rectangles
    /// make the walk deterministic.
    pub fn leaf_at(&self, p: Position) -> Option<NodePath> {
        let mut path = NodePath::root();
        if self.leaf_at_inner(p, &mut path) {
            Some(path)
        } else {
            None
        }
    }

    fn leaf_at_inner(&self, p: Position, path: &mut NodePath) -> bool {
        if !self.rect().contains(p) {
            return false;
        }
        match self {
            RegionNode::Leaf { .. } => true,
            RegionNode::Split { first, second, .. } => {
                path.push(Side::First);
                if first.leaf_at_inner(p, path) {
                    return true;
                }
                path.pop();
                path.push(Side::Second);
                if second.leaf_at_inner(p, path) {
                    return true;
                }
                path.pop();
                // Point sits in the divider band.
                false
            }
        }
    }

    /// All item ids in left-to-right, top-to-bottom order.
    pub fn items(&self) -> Vec<ItemId> {
        let mut ids = Vec::new();
        self.collect_items(&mut ids);
        ids
    }

    fn collect_items(&self, ids: &mut Vec<ItemId>) {
        match self {
            RegionNode::Leaf { item, .. } => ids.push(item.id),
            RegionNode::Split { first, second, .. } => {
                first.collect_items(ids);
                second.collect_items(ids);
            }
        }
    }

    /// Leaf occupants with their current rectangles, in traversal order.
    pub fn leaves(&self) -> Vec<(&ItemRef, Rect)> {
        let mut out = Vec::new();
        self.collect_leaves(&mut out);
        out
    }

    fn collect_leaves<'a>(&'a self, out: &mut Vec<(&'a ItemRef, Rect)>) {
        match self {
            RegionNode::Leaf { item, rect, .. } => out.push((item, *rect)),
            RegionNode::Split { first, second, .. } => {
                first.collect_leaves(out);
                second.collect_leaves(out);
            }
        }
    }

    /// Occupant of the first leaf in traversal order.
    pub fn first_item(&self) -> ItemId {
        match self {
            RegionNode::Leaf { item, .. } => item.id,
            RegionNode::Split { first, .. } => first.first_item(),
        }
    }

    /// Occupant of the leaf at the given edge of this subtree.
    fn edge_item(&self, side: Side) -> ItemId {
        match self {
            RegionNode::Leaf { item, .. } => item.id,
            RegionNode::Split { first, second, .. } => match side {
                Side::First => first.edge_item(Side::First),
                Side::Second => second.edge_item(Side::Second),
            },
        }
    }

    /// First leaf in traversal order, mutable. Used to attach placeholders
    /// to a surviving subtree after a collapse.
    pub(crate) fn first_leaf_mut(&mut self) -> &mut RegionNode {
        // Can't recurse on `self` twice under the borrow checker without
        // a match on the variant first.
        if self.is_leaf() {
            return self;
        }
        match self {
            RegionNode::Split { first, .. } => first.first_leaf_mut(),
            RegionNode::Leaf { .. } => unreachable!(),
        }
    }

    /// Set every split ratio in the subtree to 0.5.
    pub fn equalize(&mut self) {
        if let RegionNode::Split {
            ratio,
            first,
            second,
            ..
        } = self
        {
            *ratio = 0.5;
            first.equalize();
            second.equalize();
        }
    }

    /// Find the adjacent item in the given direction, for keyboard focus
    /// traversal. `Orientation::Vertical` with `Side::Second` means "the
    /// item to the right".
    pub fn find_neighbor(
        &self,
        target: ItemId,
        orientation: Orientation,
        side: Side,
    ) -> Option<ItemId> {
        match self.find_neighbor_inner(target, orientation, side)? {
            NeighborResult::Found(id) => Some(id),
            NeighborResult::NeedFromParent => None,
        }
    }

    fn find_neighbor_inner(
        &self,
        target: ItemId,
        orientation: Orientation,
        side: Side,
    ) -> Option<NeighborResult> {
        match self {
            RegionNode::Leaf { item, .. } => {
                if item.id == target {
                    Some(NeighborResult::NeedFromParent)
                } else {
                    None
                }
            }
            RegionNode::Split {
                orientation: split_orient,
                first,
                second,
                ..
            } => {
                if let Some(result) = first.find_neighbor_inner(target, orientation, side) {
                    match result {
                        NeighborResult::Found(id) => return Some(NeighborResult::Found(id)),
                        NeighborResult::NeedFromParent => {
                            if *split_orient == orientation && side == Side::Second {
                                return Some(NeighborResult::Found(
                                    second.edge_item(Side::First),
                                ));
                            }
                            return Some(NeighborResult::NeedFromParent);
                        }
                    }
                }
                if let Some(result) = second.find_neighbor_inner(target, orientation, side) {
                    match result {
                        NeighborResult::Found(id) => return Some(NeighborResult::Found(id)),
                        NeighborResult::NeedFromParent => {
                            if *split_orient == orientation && side == Side::First {
                                return Some(NeighborResult::Found(
                                    first.edge_item(Side::Second),
                                ));
                            }
                            return Some(NeighborResult::NeedFromParent);
                        }
                    }
                }
                None
            }
        }
    }

    /// Hit-test `p` against divider bands, deepest split first. Returns
    /// what a host needs to drive `resize` from a divider drag.
    pub fn find_divider(&self, p: Position) -> Option<DividerHit> {
        let mut path = NodePath::root();
        self.find_divider_inner(p, &mut path)
    }

    fn find_divider_inner(&self, p: Position, path: &mut NodePath) -> Option<DividerHit> {
        let RegionNode::Split {
            orientation,
            first,
            second,
            rect,
            ..
        } = self
        else {
            return None;
        };
        if !rect.contains(p) {
            return None;
        }

        // Children first so nested dividers win over enclosing ones.
        path.push(Side::First);
        if let Some(hit) = first.find_divider_inner(p, path) {
            return Some(hit);
        }
        path.pop();
        path.push(Side::Second);
        if let Some(hit) = second.find_divider_inner(p, path) {
            return Some(hit);
        }
        path.pop();

        let (fr, sr) = (first.rect(), second.rect());
        let hit = match orientation {
            Orientation::Vertical => p.x >= fr.right() && p.x < sr.x,
            Orientation::Horizontal => p.y >= fr.bottom() && p.y < sr.y,
        };
        if hit {
            let (position, span) = match orientation {
                Orientation::Vertical => (fr.right(), rect.width),
                Orientation::Horizontal => (fr.bottom(), rect.height),
            };
            Some(DividerHit {
                path: path.clone(),
                orientation: *orientation,
                position,
                span,
            })
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(item: &ItemRef) -> RegionNode {
        RegionNode::leaf(item.clone())
    }

    /// root split(V, 0.3) → [a, split(H, 0.5) → [b, split(V, 0.5) → [c, d]]]
    fn build_nested() -> (RegionNode, ItemRef, ItemRef, ItemRef, ItemRef) {
        let a = ItemRef::fresh();
        let b = ItemRef::fresh();
        let c = ItemRef::fresh();
        let d = ItemRef::fresh();
        let node = RegionNode::split(
            Orientation::Vertical,
            0.3,
            leaf(&a),
            RegionNode::split(
                Orientation::Horizontal,
                0.5,
                leaf(&b),
                RegionNode::split(Orientation::Vertical, 0.5, leaf(&c), leaf(&d)),
            ),
        );
        (node, a, b, c, d)
    }

    #[test]
    fn test_split_rects_exact_tiling() {
        let area = Rect::new(0, 0, 401, 300);
        let (a, b) = split_rects(Orientation::Vertical, 0.37, area, 3);
        assert_eq!(a.width + 3 + b.width, 401);
        assert_eq!(a.height, 300);
        assert_eq!(b.height, 300);
        assert_eq!(b.x, a.width + 3);
    }

    #[test]
    fn test_split_rects_zero_divider() {
        let area = Rect::new(10, 20, 400, 300);
        let (a, b) = split_rects(Orientation::Horizontal, 0.5, area, 0);
        assert_eq!(a, Rect::new(10, 20, 400, 150));
        assert_eq!(b, Rect::new(10, 170, 400, 150));
    }

    #[test]
    fn test_recompute_nested_tiles_parent() {
        let (mut node, ..) = build_nested();
        let area = Rect::new(0, 0, 400, 300);
        node.recompute(area, 0);
        let leaves = node.leaves();
        assert_eq!(leaves.len(), 4);
        let total: u32 = leaves.iter().map(|(_, r)| r.area()).sum();
        assert_eq!(total, area.area());
    }

    #[test]
    fn test_leaf_at_finds_deepest() {
        let (mut node, a, _b, c, _d) = build_nested();
        node.recompute(Rect::new(0, 0, 400, 300), 0);
        // Left 30% belongs to `a`.
        let p = Position::new(10, 10);
        let path = node.leaf_at(p).unwrap();
        assert_eq!(node.node_at(&path).unwrap().item().unwrap().id, a.id);
        // Bottom-left of the right side belongs to `c`.
        let p = Position::new(150, 290);
        let path = node.leaf_at(p).unwrap();
        assert_eq!(node.node_at(&path).unwrap().item().unwrap().id, c.id);
    }

    #[test]
    fn test_leaf_at_outside_returns_none() {
        let (mut node, ..) = build_nested();
        node.recompute(Rect::new(0, 0, 400, 300), 0);
        assert!(node.leaf_at(Position::new(400, 150)).is_none());
    }

    #[test]
    fn test_leaf_at_divider_band_returns_none() {
        let a = ItemRef::fresh();
        let b = ItemRef::fresh();
        let mut node = RegionNode::split(Orientation::Vertical, 0.5, leaf(&a), leaf(&b));
        node.recompute(Rect::new(0, 0, 100, 50), 4);
        // usable = 96, first 48 wide, divider at x = 48..52
        assert!(node.leaf_at(Position::new(49, 10)).is_none());
        assert!(node.leaf_at(Position::new(47, 10)).is_some());
        assert!(node.leaf_at(Position::new(52, 10)).is_some());
    }

    #[test]
    fn test_items_ordering() {
        let (node, a, b, c, d) = build_nested();
        assert_eq!(node.items(), vec![a.id, b.id, c.id, d.id]);
    }

    #[test]
    fn test_find_item_and_node_at_agree() {
        let (node, _a, _b, c, _d) = build_nested();
        let path = node.find_item(c.id).unwrap();
        assert_eq!(node.node_at(&path).unwrap().item().unwrap().id, c.id);
    }

    #[test]
    fn test_find_item_absent() {
        let (node, ..) = build_nested();
        assert!(node.find_item(ItemId::new_v4()).is_none());
    }

    #[test]
    fn test_find_neighbor_nested() {
        let (node, a, b, c, d) = build_nested();
        assert_eq!(
            node.find_neighbor(a.id, Orientation::Vertical, Side::Second),
            Some(b.id)
        );
        assert_eq!(
            node.find_neighbor(c.id, Orientation::Vertical, Side::Second),
            Some(d.id)
        );
        assert_eq!(
            node.find_neighbor(d.id, Orientation::Vertical, Side::First),
            Some(c.id)
        );
        assert_eq!(
            node.find_neighbor(b.id, Orientation::Horizontal, Side::Second),
            Some(c.id)
        );
        // Leftmost item has no left neighbor.
        assert_eq!(
            node.find_neighbor(a.id, Orientation::Vertical, Side::First),
            None
        );
    }

    #[test]
    fn test_find_divider() {
        let a = ItemRef::fresh();
        let b = ItemRef::fresh();
        let mut node = RegionNode::split(Orientation::Vertical, 0.5, leaf(&a), leaf(&b));
        node.recompute(Rect::new(0, 0, 100, 50), 4);
        let hit = node.find_divider(Position::new(50, 10)).unwrap();
        assert_eq!(hit.orientation, Orientation::Vertical);
        assert_eq!(hit.position, 48);
        assert_eq!(hit.span, 100);
        assert!(hit.path.is_root());
        assert!(node.find_divider(Position::new(10, 10)).is_none());
    }

    #[test]
    fn test_equalize() {
        let (mut node, ..) = build_nested();
        node.equalize();
        fn check(node: &RegionNode) {
            if let RegionNode::Split {
                ratio,
                first,
                second,
                ..
            } = node
            {
                assert!((ratio - 0.5).abs() < f64::EPSILON);
                check(first);
                check(second);
            }
        }
        check(&node);
    }

    #[test]
    fn test_remap_after_collapse() {
        // Split at [First] collapses, Second survives.
        let collapsed = NodePath::root().child_first();
        let surviving = Side::Second;

        // Path through the survivor loses one step.
        let p = collapsed.child_second().child_first();
        assert_eq!(
            p.remap_after_collapse(&collapsed, surviving),
            Some(collapsed.child_first())
        );
        // The collapsed split maps to itself (now the survivor).
        assert_eq!(
            collapsed.remap_after_collapse(&collapsed, surviving),
            Some(collapsed.clone())
        );
        // Path through the removed child is gone.
        assert_eq!(
            collapsed
                .child_first()
                .remap_after_collapse(&collapsed, surviving),
            None
        );
        // Unrelated paths are untouched.
        let other = NodePath::root().child_second();
        assert_eq!(
            other.remap_after_collapse(&collapsed, surviving),
            Some(other.clone())
        );
    }
}
