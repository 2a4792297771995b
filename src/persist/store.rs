use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};

use super::{SavedLayout, SAVED_LAYOUT_VERSION};

fn state_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("dockline")
}

pub fn layout_file_path() -> PathBuf {
    state_dir().join("layout.json")
}

pub fn save(layout: &SavedLayout) -> Result<()> {
    save_to(layout, &layout_file_path())
}

pub fn load() -> Option<SavedLayout> {
    load_from(&layout_file_path())
}

// Path-parameterized variants for testability

pub fn save_to(layout: &SavedLayout, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        let _ = fs::create_dir_all(parent);
    }
    let json = serde_json::to_string_pretty(layout)?;
    fs::write(path, json)?;
    Ok(())
}

pub fn load_from(path: &Path) -> Option<SavedLayout> {
    let json = fs::read_to_string(path).ok()?;
    let mut layout: SavedLayout = serde_json::from_str(&json).ok()?;
    migrate(&mut layout);
    Some(layout)
}

/// Migrate a saved layout to the latest envelope version (currently v1).
fn migrate(layout: &mut SavedLayout) {
    if layout.version < SAVED_LAYOUT_VERSION {
        tracing::debug!(from = layout.version, to = SAVED_LAYOUT_VERSION, "migrating saved layout");
        layout.version = SAVED_LAYOUT_VERSION;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::LayoutDocument;
    use crate::persist::StationEntry;
    use crate::station::{StationId, StationKind};
    use chrono::Utc;

    fn make_test_layout() -> SavedLayout {
        SavedLayout {
            version: SAVED_LAYOUT_VERSION,
            updated_at: Utc::now(),
            stations: vec![StationEntry {
                station: StationId::new_v4(),
                kind: StationKind::Split,
                document: LayoutDocument::Root {
                    child: Some(Box::new(LayoutDocument::Leaf {
                        item_id: StationId::new_v4().to_string(),
                        placeholders: vec!["vacated".to_string()],
                    })),
                },
            }],
        }
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("layout.json");
        let layout = make_test_layout();

        save_to(&layout, &path).unwrap();
        let loaded = load_from(&path).unwrap();

        assert_eq!(loaded.stations.len(), 1);
        assert_eq!(loaded.stations[0].station, layout.stations[0].station);
        assert_eq!(loaded.stations[0].document, layout.stations[0].document);
    }

    #[test]
    fn test_load_nonexistent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nonexistent.json");
        assert!(load_from(&path).is_none());
    }

    #[test]
    fn test_save_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("layout.json");

        let mut layout = make_test_layout();
        save_to(&layout, &path).unwrap();

        layout.stations[0].kind = StationKind::Stack;
        save_to(&layout, &path).unwrap();

        let loaded = load_from(&path).unwrap();
        assert_eq!(loaded.stations[0].kind, StationKind::Stack);
    }

    #[test]
    fn test_load_invalid_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("layout.json");
        std::fs::write(&path, "{ invalid }").unwrap();
        assert!(load_from(&path).is_none());
    }

    #[test]
    fn test_old_version_is_migrated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("layout.json");
        let mut layout = make_test_layout();
        layout.version = 0;
        save_to(&layout, &path).unwrap();

        let loaded = load_from(&path).unwrap();
        assert_eq!(loaded.version, SAVED_LAYOUT_VERSION);
    }
}
