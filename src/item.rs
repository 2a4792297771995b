use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::station::StationId;

pub type ItemId = uuid::Uuid;

/// Opaque handle to a dockable's content. The tree records which item
/// occupies which leaf; it never owns or touches the content itself.
///
/// Equality and hashing go by `id` only — `embeds` and `working_area` are
/// advisory payload supplied by the host.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ItemRef {
    pub id: ItemId,
    /// Stations nested (transitively) inside this dockable, as reported by
    /// the host. Used for cycle detection when stations are themselves
    /// dockable.
    pub embeds: Vec<StationId>,
    /// Working-area tag restricting where this item may dock, if any.
    pub working_area: Option<String>,
    /// True when this handle stands for a tabbed group rather than a
    /// single dockable (the result of a CENTER combine).
    pub group: bool,
}

impl ItemRef {
    pub fn new(id: ItemId) -> Self {
        Self {
            id,
            embeds: Vec::new(),
            working_area: None,
            group: false,
        }
    }

    /// Fresh handle with a random id.
    pub fn fresh() -> Self {
        Self::new(ItemId::new_v4())
    }

    pub fn with_embedded_station(mut self, station: StationId) -> Self {
        self.embeds.push(station);
        self
    }

    pub fn with_working_area(mut self, area: impl Into<String>) -> Self {
        self.working_area = Some(area.into());
        self
    }

    /// Merge two handles into a group handle (CENTER drop on an occupied
    /// leaf). The group gets a fresh id; embedded stations are unioned so
    /// cycle detection keeps working, and the working area of `a` carries
    /// over.
    pub fn combine(a: &ItemRef, b: &ItemRef) -> ItemRef {
        let mut embeds = a.embeds.clone();
        for s in &b.embeds {
            if !embeds.contains(s) {
                embeds.push(*s);
            }
        }
        ItemRef {
            id: ItemId::new_v4(),
            embeds,
            working_area: a.working_area.clone(),
            group: true,
        }
    }
}

impl PartialEq for ItemRef {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ItemRef {}

impl Hash for ItemRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equality_ignores_payload() {
        let id = ItemId::new_v4();
        let a = ItemRef::new(id).with_working_area("editor");
        let b = ItemRef::new(id);
        assert_eq!(a, b);
    }

    #[test]
    fn test_combine_unions_embeds() {
        let s1 = StationId::new_v4();
        let s2 = StationId::new_v4();
        let a = ItemRef::fresh().with_embedded_station(s1);
        let b = ItemRef::fresh()
            .with_embedded_station(s1)
            .with_embedded_station(s2);
        let g = ItemRef::combine(&a, &b);
        assert!(g.group);
        assert_eq!(g.embeds, vec![s1, s2]);
        assert_ne!(g.id, a.id);
        assert_ne!(g.id, b.id);
    }
}
