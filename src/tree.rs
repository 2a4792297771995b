use ratatui::layout::{Position, Rect};

use crate::codec::{self, LayoutDocument};
use crate::config::StationConfig;
use crate::error::LayoutError;
use crate::event::{ChangeKind, ChangeObserver, StructuralChange};
use crate::item::{ItemId, ItemRef};
use crate::node::{DividerHit, NodePath, Orientation, RegionNode, Side};
use crate::placeholder::{self, Placeholder, PlaceholderRegistry};
use crate::policy::{Acceptance, DefaultAcceptance, MultiAcceptance, ParentContext};
use crate::resolver::{DropSide, DropTarget, TargetNode};
use crate::station::{StationId, StationKind};

/// Ratio clamp for newly created splits: both children keep usable area.
pub const INSERT_RATIO_MIN: f64 = 0.1;
pub const INSERT_RATIO_MAX: f64 = 0.9;
/// Ratio clamp for interactive resizing.
pub const RESIZE_RATIO_MIN: f64 = 0.05;
pub const RESIZE_RATIO_MAX: f64 = 0.95;

/// What `remove` left behind for the registry to index.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RemovedPlaceholderInfo {
    pub placeholder: Option<Placeholder>,
    /// Leaf now carrying the placeholder (the survivor's nearest leaf), or
    /// the root slot when the station emptied.
    pub attached_to: Option<NodePath>,
}

/// Where a validated insert will land. Computed up front so mutations are
/// all-or-nothing.
enum PlannedInsert {
    /// Empty station: the item becomes the root child.
    NewRoot,
    /// CENTER on an occupied leaf: merge into a group handle.
    Combine(NodePath),
    /// Replace the node at `path` with a split of it and the new item.
    Wrap {
        path: NodePath,
        orientation: Orientation,
        new_first: bool,
        ratio: f64,
    },
}

/// The layout tree of one station. Owns its nodes exclusively; item
/// handles are weak references to content the host manages. Expected to be
/// driven from a single UI thread — no locking inside.
pub struct LayoutTree {
    station: StationId,
    kind: StationKind,
    config: StationConfig,
    bounds: Rect,
    root: Option<RegionNode>,
    registry: PlaceholderRegistry,
    /// Placeholders for the vacated root position of an emptied station.
    root_placeholders: Vec<Placeholder>,
    policies: MultiAcceptance,
    observer: Option<ChangeObserver>,
}

impl std::fmt::Debug for LayoutTree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LayoutTree")
            .field("station", &self.station)
            .field("kind", &self.kind)
            .field("config", &self.config)
            .field("bounds", &self.bounds)
            .field("root", &self.root)
            .field("registry", &self.registry)
            .field("root_placeholders", &self.root_placeholders)
            .finish_non_exhaustive()
    }
}

impl LayoutTree {
    pub fn new(station: StationId, kind: StationKind, bounds: Rect) -> Self {
        Self::with_config(station, kind, bounds, StationConfig::default())
    }

    pub fn with_config(
        station: StationId,
        kind: StationKind,
        bounds: Rect,
        config: StationConfig,
    ) -> Self {
        Self {
            station,
            kind,
            config,
            bounds,
            root: None,
            registry: PlaceholderRegistry::new(),
            root_placeholders: Vec::new(),
            policies: MultiAcceptance::new(),
            observer: None,
        }
    }

    /// Rebuild a tree from restored parts (layout codec).
    pub(crate) fn from_parts(
        station: StationId,
        kind: StationKind,
        config: StationConfig,
        bounds: Rect,
        root: Option<RegionNode>,
    ) -> Self {
        let mut tree = Self::with_config(station, kind, bounds, config);
        tree.root = root;
        tree.finish();
        tree
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn station(&self) -> StationId {
        self.station
    }

    pub fn kind(&self) -> StationKind {
        self.kind
    }

    pub fn config(&self) -> &StationConfig {
        &self.config
    }

    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    pub fn root(&self) -> Option<&RegionNode> {
        self.root.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    pub fn contains(&self, item: ItemId) -> bool {
        self.root.as_ref().is_some_and(|r| r.contains(item))
    }

    /// Item ids in left-to-right, top-to-bottom order.
    pub fn items(&self) -> Vec<ItemId> {
        self.root.as_ref().map(|r| r.items()).unwrap_or_default()
    }

    /// Leaf occupants with their current rectangles.
    pub fn leaves(&self) -> Vec<(&ItemRef, Rect)> {
        self.root.as_ref().map(|r| r.leaves()).unwrap_or_default()
    }

    pub fn placeholders(&self) -> &PlaceholderRegistry {
        &self.registry
    }

    /// Structured snapshot of the current shape.
    pub fn snapshot(&self) -> LayoutDocument {
        codec::serialize(self, &codec::id_resolver)
    }

    // -----------------------------------------------------------------------
    // Policies & observer
    // -----------------------------------------------------------------------

    pub fn add_policy(&mut self, policy: Box<dyn Acceptance>) {
        self.policies.push(policy);
    }

    /// Would a drop of `child` under the node at `path` be accepted?
    /// Always includes `DefaultAcceptance` before any host policies.
    pub(crate) fn accepts(&self, path: &NodePath, child: &ItemRef) -> bool {
        let ctx = ParentContext {
            station: self.station,
            kind: self.kind,
            working_area: self.config.working_area.as_deref(),
            path: path.clone(),
        };
        DefaultAcceptance.accept(&ctx, child) && self.policies.accept(&ctx, child)
    }

    /// Register the single structural-change observer. Notifications are
    /// delivered synchronously, before the mutating call returns.
    pub fn set_observer(&mut self, observer: ChangeObserver) {
        self.observer = Some(observer);
    }

    pub fn clear_observer(&mut self) {
        self.observer = None;
    }

    fn emit(&mut self, kind: ChangeKind, before: LayoutDocument, items: Vec<ItemId>) {
        if let Some(mut observer) = self.observer.take() {
            let change = StructuralChange {
                kind,
                before,
                after: self.snapshot(),
                items,
            };
            observer(&change);
            self.observer = Some(observer);
        }
    }

    // -----------------------------------------------------------------------
    // Structural mutation
    // -----------------------------------------------------------------------

    /// Insert `item` at a resolved drop target. Returns the path of the
    /// leaf now holding it. The tree is untouched on any error.
    pub fn insert(&mut self, target: &DropTarget, item: ItemRef) -> Result<NodePath, LayoutError> {
        let plan = self.validate_insert(target, &item)?;
        let before = self.snapshot();
        let item_id = item.id;
        let path = self.apply_insert(&plan, item);
        self.consume_placeholder(&Placeholder::for_item(item_id));
        self.finish();
        self.emit(ChangeKind::Inserted, before, vec![item_id]);
        tracing::debug!(item = %item_id, "inserted");
        Ok(path)
    }

    /// Remove `item`, collapsing its parent split onto the sibling. Leaves
    /// a placeholder behind when retention is configured.
    pub fn remove(&mut self, item: ItemId) -> Result<RemovedPlaceholderInfo, LayoutError> {
        let path = self
            .root
            .as_ref()
            .and_then(|r| r.find_item(item))
            .ok_or_else(|| {
                tracing::warn!(%item, "remove: item not present, tree unchanged");
                LayoutError::ItemNotFound(item)
            })?;
        let before = self.snapshot();
        let info = self.apply_remove(&path, item);
        self.finish();
        self.emit(ChangeKind::Removed, before, vec![item]);
        tracing::debug!(%item, "removed");
        Ok(info)
    }

    /// Atomic remove-then-insert. The target is resolved against the tree
    /// as it was before removal and remapped across the collapse, so a
    /// move next to a sibling of the moved item works in one step.
    pub fn move_item(&mut self, item: ItemId, target: &DropTarget) -> Result<NodePath, LayoutError> {
        let root = self.root.as_ref().ok_or(LayoutError::ItemNotFound(item))?;
        let item_path = root.find_item(item).ok_or_else(|| {
            tracing::warn!(%item, "move: item not present, tree unchanged");
            LayoutError::ItemNotFound(item)
        })?;
        let item_ref = root
            .node_at(&item_path)
            .and_then(|n| n.item())
            .cloned()
            .ok_or(LayoutError::ItemNotFound(item))?;

        let plan = self.validate_move_target(target, &item_ref)?;

        // Remap the planned position across the collapse the removal will
        // cause. A position that only existed because of the moved item
        // has no equivalent afterwards.
        let remap = |path: &NodePath| -> Result<NodePath, LayoutError> {
            match item_path.parent() {
                None => Err(LayoutError::SelfTarget),
                Some((parent, removed_side)) => path
                    .remap_after_collapse(&parent, removed_side.other())
                    .ok_or(LayoutError::SelfTarget),
            }
        };
        let plan = match plan {
            PlannedInsert::NewRoot => PlannedInsert::NewRoot,
            PlannedInsert::Combine(path) => PlannedInsert::Combine(remap(&path)?),
            PlannedInsert::Wrap {
                path,
                orientation,
                new_first,
                ratio,
            } => PlannedInsert::Wrap {
                path: remap(&path)?,
                orientation,
                new_first,
                ratio,
            },
        };

        let before = self.snapshot();
        self.apply_remove(&item_path, item);
        let new_path = self.apply_insert(&plan, item_ref);
        // The removal just parked a placeholder; re-docking consumes it.
        self.consume_placeholder(&Placeholder::for_item(item));
        self.finish();
        self.emit(ChangeKind::Moved, before, vec![item]);
        tracing::debug!(%item, "moved");
        Ok(new_path)
    }

    /// Change the ratio of the split at `path`. Purely geometric — the
    /// only mutation that never changes topology.
    pub fn resize(&mut self, path: &NodePath, new_ratio: f64) -> Result<(), LayoutError> {
        let root = self
            .root
            .as_ref()
            .ok_or_else(|| LayoutError::InvalidTarget("tree is empty".into()))?;
        let node = root
            .node_at(path)
            .ok_or_else(|| LayoutError::InvalidTarget("no node at path".into()))?;
        if node.is_leaf() {
            return Err(LayoutError::InvalidTarget("resize target is not a split".into()));
        }
        let items = node.items();
        let before = self.snapshot();

        let root = self.root.as_mut().expect("checked above");
        if let Some(RegionNode::Split { ratio, .. }) = root.node_at_mut(path) {
            *ratio = new_ratio.clamp(RESIZE_RATIO_MIN, RESIZE_RATIO_MAX);
        }
        self.recompute_all();
        self.emit(ChangeKind::Resized, before, items);
        Ok(())
    }

    /// Host feeds new station bounds (window resized); full top-down
    /// recompute, no event.
    pub fn set_bounds(&mut self, bounds: Rect) {
        self.bounds = bounds;
        self.recompute_all();
    }

    /// Set every split ratio to 0.5.
    pub fn equalize(&mut self) {
        if self.root.is_none() {
            return;
        }
        let before = self.snapshot();
        let items = self.items();
        if let Some(root) = &mut self.root {
            root.equalize();
        }
        self.recompute_all();
        self.emit(ChangeKind::Resized, before, items);
    }

    /// Drop a placeholder everywhere (registry and leaf lists).
    pub fn invalidate_placeholder(&mut self, placeholder: &Placeholder) -> bool {
        let existed = self.registry.contains(placeholder);
        self.consume_placeholder(placeholder);
        self.rebuild_registry();
        existed
    }

    // -----------------------------------------------------------------------
    // Queries delegated to the node tree
    // -----------------------------------------------------------------------

    /// Adjacent item in a direction, for keyboard focus traversal.
    pub fn find_neighbor(
        &self,
        item: ItemId,
        orientation: Orientation,
        side: Side,
    ) -> Option<ItemId> {
        self.root
            .as_ref()
            .and_then(|r| r.find_neighbor(item, orientation, side))
    }

    /// Divider band under `p`, for driving `resize` from a drag.
    pub fn find_divider(&self, p: Position) -> Option<DividerHit> {
        self.root.as_ref().and_then(|r| r.find_divider(p))
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn validate_insert(
        &self,
        target: &DropTarget,
        item: &ItemRef,
    ) -> Result<PlannedInsert, LayoutError> {
        if self.contains(item.id) {
            return Err(LayoutError::InvalidTarget(
                "item already present in tree; remove it first".into(),
            ));
        }
        if item.embeds.contains(&self.station) {
            return Err(LayoutError::Cycle(self.station));
        }
        self.plan_insert(target, item)
    }

    /// Like `validate_insert` but for a move: the item is, by definition,
    /// already in the tree.
    fn validate_move_target(
        &self,
        target: &DropTarget,
        item: &ItemRef,
    ) -> Result<PlannedInsert, LayoutError> {
        self.plan_insert(target, item)
    }

    fn plan_insert(&self, target: &DropTarget, item: &ItemRef) -> Result<PlannedInsert, LayoutError> {
        let strategy = self.kind.strategy();
        let clamped = target
            .proposed_ratio
            .clamp(INSERT_RATIO_MIN, INSERT_RATIO_MAX);

        match (&target.node, &self.root) {
            (TargetNode::Root, None) => {
                if !self.accepts(&NodePath::root(), item) {
                    return Err(LayoutError::InvalidTarget("rejected by policy".into()));
                }
                Ok(PlannedInsert::NewRoot)
            }
            (TargetNode::Root, Some(root)) => {
                if !self.accepts(&NodePath::root(), item) {
                    return Err(LayoutError::InvalidTarget("rejected by policy".into()));
                }
                if strategy.edge_splits {
                    // Drop on the station background: append at the
                    // trailing edge.
                    Ok(PlannedInsert::Wrap {
                        path: NodePath::root(),
                        orientation: Orientation::Vertical,
                        new_first: false,
                        ratio: clamped,
                    })
                } else {
                    Ok(PlannedInsert::Combine(first_leaf_path(
                        root,
                        NodePath::root(),
                    )))
                }
            }
            (TargetNode::Node(_), None) => {
                Err(LayoutError::InvalidTarget("no node at target path".into()))
            }
            (TargetNode::Node(path), Some(root)) => {
                let node = root
                    .node_at(path)
                    .ok_or_else(|| LayoutError::InvalidTarget("no node at target path".into()))?;
                if let Some(expected) = target.expected_item {
                    if node.first_item() != expected {
                        return Err(LayoutError::InvalidTarget(
                            "tree changed since the target was resolved".into(),
                        ));
                    }
                }
                if !self.accepts(path, item) {
                    return Err(LayoutError::InvalidTarget("rejected by policy".into()));
                }
                match target.side {
                    DropSide::Center => {
                        if !strategy.center_combines {
                            return Err(LayoutError::InvalidTarget(
                                "station kind cannot combine".into(),
                            ));
                        }
                        if node.is_leaf() {
                            Ok(PlannedInsert::Combine(path.clone()))
                        } else if !strategy.edge_splits {
                            Ok(PlannedInsert::Combine(first_leaf_path(node, path.clone())))
                        } else {
                            Err(LayoutError::InvalidTarget(
                                "cannot combine with a split region".into(),
                            ))
                        }
                    }
                    side => {
                        if !strategy.edge_splits {
                            return Err(LayoutError::InvalidTarget(
                                "station kind does not split".into(),
                            ));
                        }
                        let orientation = match side {
                            DropSide::Left | DropSide::Right => Orientation::Vertical,
                            _ => Orientation::Horizontal,
                        };
                        let new_first = matches!(side, DropSide::Left | DropSide::Top);
                        Ok(PlannedInsert::Wrap {
                            path: path.clone(),
                            orientation,
                            new_first,
                            ratio: clamped,
                        })
                    }
                }
            }
        }
    }

    /// Mutation only; inputs validated. Returns the path of the leaf now
    /// holding the item.
    fn apply_insert(&mut self, plan: &PlannedInsert, item: ItemRef) -> NodePath {
        match plan {
            PlannedInsert::NewRoot => {
                self.root = Some(RegionNode::leaf(item));
                NodePath::root()
            }
            PlannedInsert::Combine(path) => {
                let root = self.root.as_mut().expect("validated: tree not empty");
                if let Some(RegionNode::Leaf { item: existing, .. }) = root.node_at_mut(path) {
                    *existing = ItemRef::combine(existing, &item);
                }
                path.clone()
            }
            PlannedInsert::Wrap {
                path,
                orientation,
                new_first,
                ratio,
            } => {
                let root = self.root.as_mut().expect("validated: tree not empty");
                let node = root.node_at_mut(path).expect("validated: node exists");
                let old = node.clone();
                let new_leaf = RegionNode::leaf(item);
                // `ratio` is the fraction the new item occupies; the stored
                // ratio is always child A's share.
                let (first, second, stored) = if *new_first {
                    (new_leaf, old, *ratio)
                } else {
                    (old, new_leaf, 1.0 - *ratio)
                };
                *node = RegionNode::split(*orientation, stored, first, second);
                path.child(if *new_first { Side::First } else { Side::Second })
            }
        }
    }

    fn apply_remove(&mut self, path: &NodePath, item: ItemId) -> RemovedPlaceholderInfo {
        let retained = self
            .config
            .retain_placeholders
            .then(|| Placeholder::for_item(item));

        match path.parent() {
            None => {
                // Removing the root child empties the station; the vacated
                // position is the root slot itself.
                self.root = None;
                if let Some(ph) = &retained {
                    self.root_placeholders.push(ph.clone());
                }
                let attached_to = retained.as_ref().map(|_| NodePath::root());
                RemovedPlaceholderInfo {
                    placeholder: retained,
                    attached_to,
                }
            }
            Some((parent_path, removed_side)) => {
                let root = self.root.as_mut().expect("found the item above");
                let parent = root
                    .node_at_mut(&parent_path)
                    .expect("parent of a found leaf exists");
                let (sibling, orphaned) = match parent {
                    RegionNode::Split { first, second, .. } => {
                        let (removed, kept) = match removed_side {
                            Side::First => (&**first, &**second),
                            Side::Second => (&**second, &**first),
                        };
                        let orphaned = match removed {
                            RegionNode::Leaf { placeholders, .. } => placeholders.clone(),
                            RegionNode::Split { .. } => Vec::new(),
                        };
                        (kept.clone(), orphaned)
                    }
                    RegionNode::Leaf { .. } => unreachable!("parent of a leaf is a split"),
                };
                // The split collapses: the sibling takes the parent's spot.
                *parent = sibling;

                // Vacated position's tokens live on at the survivor's
                // nearest leaf.
                let mut incoming = orphaned;
                if let Some(ph) = &retained {
                    incoming.push(ph.clone());
                }
                if let RegionNode::Leaf { placeholders, .. } = parent.first_leaf_mut() {
                    *placeholders = placeholder::merge(placeholders, &incoming);
                }
                let attached_to = retained
                    .as_ref()
                    .map(|_| first_leaf_path(parent, parent_path.clone()));
                RemovedPlaceholderInfo {
                    placeholder: retained,
                    attached_to,
                }
            }
        }
    }

    /// Strip a placeholder from every leaf list and the root slot.
    fn consume_placeholder(&mut self, placeholder: &Placeholder) {
        fn strip(node: &mut RegionNode, placeholder: &Placeholder) {
            match node {
                RegionNode::Leaf { placeholders, .. } => {
                    placeholders.retain(|p| p != placeholder);
                }
                RegionNode::Split { first, second, .. } => {
                    strip(first, placeholder);
                    strip(second, placeholder);
                }
            }
        }
        if let Some(root) = &mut self.root {
            strip(root, placeholder);
        }
        self.root_placeholders.retain(|p| p != placeholder);
    }

    fn recompute_all(&mut self) {
        if let Some(root) = &mut self.root {
            root.recompute(self.bounds, self.config.divider_width);
        }
    }

    fn rebuild_registry(&mut self) {
        self.registry.rebuild(self.root.as_ref());
        for ph in &self.root_placeholders {
            self.registry.register(ph.clone(), NodePath::root());
        }
    }

    fn finish(&mut self) {
        self.recompute_all();
        self.rebuild_registry();
    }
}

/// Path of the first leaf under `node`, extending `base`.
fn first_leaf_path(node: &RegionNode, mut base: NodePath) -> NodePath {
    let mut cur = node;
    while let RegionNode::Split { first, .. } = cur {
        base.push(Side::First);
        cur = first;
    }
    base
}
