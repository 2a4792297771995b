//! Docking layout core: a binary split tree per station, pointer-driven
//! drop-target resolution, acceptance policies, placeholder tracking for
//! vacated regions, and a persisted layout document.
//!
//! The crate owns structure and geometry only. Rendering, drag visuals,
//! and window chrome belong to the host; it feeds pointer rectangles in
//! and gets placement decisions and structural change events out.

pub mod codec;
pub mod config;
pub mod error;
pub mod event;
pub mod item;
pub mod node;
pub mod persist;
pub mod placeholder;
pub mod policy;
pub mod resolver;
pub mod station;
pub mod tree;

pub use codec::{LayoutDocument, RestoreReport};
pub use config::{ReferencePoint, StationConfig};
pub use error::LayoutError;
pub use event::{ChangeKind, ChangeObserver, StructuralChange};
pub use item::{ItemId, ItemRef};
pub use node::{DividerHit, NodePath, Orientation, RegionNode, Side};
pub use placeholder::{Placeholder, PlaceholderRegistry};
pub use policy::{Acceptance, DefaultAcceptance, MultiAcceptance, ParentContext, WorkingAreaAcceptance};
pub use resolver::{resolve, DropSide, DropTarget, TargetNode};
pub use station::{DropStrategy, StationId, StationKind};
pub use tree::LayoutTree;
