use thiserror::Error;

use crate::item::ItemId;
use crate::station::StationId;

/// Everything the layout core can refuse to do. None of these are fatal:
/// a failed operation leaves the tree untouched and the caller decides
/// whether to log, retry, or re-resolve.
#[derive(Debug, Error)]
pub enum LayoutError {
    /// The `DropTarget` no longer matches the tree (mutated between
    /// `resolve` and use), or the insert is otherwise not applicable.
    /// Recovered by re-resolving.
    #[error("stale or invalid drop target: {0}")]
    InvalidTarget(String),

    /// `remove`/`move` named an item the tree does not hold. Indicates
    /// the host lost sync with the tree state.
    #[error("item {0} is not present in the tree")]
    ItemNotFound(ItemId),

    /// A move targeted a position that only existed because of the moved
    /// item itself.
    #[error("move target only existed because of the moved item")]
    SelfTarget,

    /// The insert would make the station a descendant of itself.
    #[error("insert would nest station {0} inside itself")]
    Cycle(StationId),

    /// Corrupt or truncated persisted layout data.
    #[error("layout data invalid at byte {offset}: {message}")]
    Codec { offset: usize, message: String },
}

impl LayoutError {
    pub(crate) fn codec(offset: usize, message: impl Into<String>) -> Self {
        LayoutError::Codec {
            offset,
            message: message.into(),
        }
    }
}
