//! Persistence envelope for a whole workbench of stations.

pub mod store;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::codec::{self, LayoutDocument};
use crate::item::ItemRef;
use crate::station::{StationId, StationKind};
use crate::tree::LayoutTree;

pub const SAVED_LAYOUT_VERSION: u32 = 1;

/// Versioned, timestamped snapshot of every station's layout document.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SavedLayout {
    pub version: u32,
    pub updated_at: DateTime<Utc>,
    pub stations: Vec<StationEntry>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StationEntry {
    pub station: StationId,
    pub kind: StationKind,
    pub document: LayoutDocument,
}

impl SavedLayout {
    pub fn capture<'a>(
        trees: impl IntoIterator<Item = &'a LayoutTree>,
        resolver: &dyn Fn(&ItemRef) -> String,
    ) -> Self {
        Self {
            version: SAVED_LAYOUT_VERSION,
            updated_at: Utc::now(),
            stations: trees
                .into_iter()
                .map(|tree| StationEntry {
                    station: tree.station(),
                    kind: tree.kind(),
                    document: codec::serialize(tree, resolver),
                })
                .collect(),
        }
    }
}
