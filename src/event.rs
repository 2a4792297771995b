use crate::codec::LayoutDocument;
use crate::item::ItemId;

/// What a mutation did to the tree.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChangeKind {
    Inserted,
    Removed,
    Moved,
    Resized,
}

/// The one structural-change notification. Hosts subscribe once and
/// re-layout their widgets from the before/after snapshots; there are no
/// narrower listener interfaces.
#[derive(Clone, Debug)]
pub struct StructuralChange {
    pub kind: ChangeKind,
    /// Tree shape before the mutation.
    pub before: LayoutDocument,
    /// Tree shape after the mutation.
    pub after: LayoutDocument,
    /// Items the mutation touched.
    pub items: Vec<ItemId>,
}

/// Delivered synchronously, before the mutating call returns.
pub type ChangeObserver = Box<dyn FnMut(&StructuralChange)>;
