use serde::{Deserialize, Serialize};

use crate::item::ItemId;
use crate::node::{NodePath, RegionNode};

// ---------------------------------------------------------------------------
// Placeholder — a token marking a vacated tree position
// ---------------------------------------------------------------------------

/// Opaque path-like token identifying "where an item used to be". Created
/// when a leaf is removed with placeholder retention on, consumed when the
/// item docks again.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Placeholder(String);

impl Placeholder {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The canonical placeholder an item leaves behind.
    pub fn for_item(id: ItemId) -> Self {
        Self(id.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Union two placeholder lists, `a`'s entries first, dropping duplicates
/// (first occurrence wins). Insertion order is kept so persistence stays
/// deterministic.
pub fn merge(a: &[Placeholder], b: &[Placeholder]) -> Vec<Placeholder> {
    let mut out: Vec<Placeholder> = Vec::with_capacity(a.len() + b.len());
    for p in a.iter().chain(b.iter()) {
        if !out.contains(p) {
            out.push(p.clone());
        }
    }
    out
}

// ---------------------------------------------------------------------------
// PlaceholderRegistry — an index from token to current tree position
// ---------------------------------------------------------------------------

/// Index only: the registry never owns nodes. It is rebuilt from a full
/// tree walk after every structural mutation, since paths shift when
/// splits collapse.
#[derive(Clone, Debug, Default)]
pub struct PlaceholderRegistry {
    entries: Vec<(Placeholder, NodePath)>,
}

impl PlaceholderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or re-point a placeholder. Order of first registration is
    /// preserved.
    pub fn register(&mut self, placeholder: Placeholder, path: NodePath) {
        if let Some(entry) = self.entries.iter_mut().find(|(p, _)| *p == placeholder) {
            entry.1 = path;
        } else {
            self.entries.push((placeholder, path));
        }
    }

    pub fn resolve(&self, placeholder: &Placeholder) -> Option<&NodePath> {
        self.entries
            .iter()
            .find(|(p, _)| p == placeholder)
            .map(|(_, path)| path)
    }

    pub fn contains(&self, placeholder: &Placeholder) -> bool {
        self.resolve(placeholder).is_some()
    }

    /// Drop a placeholder, returning whether it existed.
    pub fn invalidate(&mut self, placeholder: &Placeholder) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(p, _)| p != placeholder);
        before != self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Placeholder, &NodePath)> {
        self.entries.iter().map(|(p, n)| (p, n))
    }

    /// Re-index from a full tree walk.
    pub fn rebuild(&mut self, root: Option<&RegionNode>) {
        self.entries.clear();
        if let Some(root) = root {
            Self::walk(root, NodePath::root(), &mut self.entries);
        }
    }

    fn walk(node: &RegionNode, path: NodePath, entries: &mut Vec<(Placeholder, NodePath)>) {
        match node {
            RegionNode::Leaf { placeholders, .. } => {
                for p in placeholders {
                    entries.push((p.clone(), path.clone()));
                }
            }
            RegionNode::Split { first, second, .. } => {
                Self::walk(first, path.child_first(), entries);
                Self::walk(second, path.child_second(), entries);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_resolve_invalidate() {
        let mut reg = PlaceholderRegistry::new();
        let p = Placeholder::new("a");
        reg.register(p.clone(), NodePath::root());
        assert_eq!(reg.resolve(&p), Some(&NodePath::root()));
        assert!(reg.invalidate(&p));
        assert!(!reg.invalidate(&p));
        assert!(reg.resolve(&p).is_none());
    }

    #[test]
    fn test_register_repoints_existing() {
        let mut reg = PlaceholderRegistry::new();
        let p = Placeholder::new("a");
        reg.register(p.clone(), NodePath::root());
        reg.register(p.clone(), NodePath::root().child_second());
        assert_eq!(reg.len(), 1);
        assert_eq!(reg.resolve(&p), Some(&NodePath::root().child_second()));
    }

    #[test]
    fn test_merge_keeps_a_before_b() {
        let a = vec![Placeholder::new("x"), Placeholder::new("y")];
        let b = vec![Placeholder::new("y"), Placeholder::new("z")];
        let merged = merge(&a, &b);
        assert_eq!(
            merged,
            vec![
                Placeholder::new("x"),
                Placeholder::new("y"),
                Placeholder::new("z")
            ]
        );
    }
}
