use ratatui::layout::Rect;
use serde::{Deserialize, Serialize};

use crate::config::StationConfig;
use crate::error::LayoutError;
use crate::item::ItemRef;
use crate::node::{Orientation, RegionNode};
use crate::placeholder::{self, Placeholder};
use crate::station::{StationId, StationKind};
use crate::tree::LayoutTree;

// ---------------------------------------------------------------------------
// LayoutDocument — the persisted shape of a tree
// ---------------------------------------------------------------------------

/// Structural record of a layout tree. Identical logical content whether
/// carried as JSON (via serde) or as bytes (via `encode`/`decode`);
/// rectangles are never persisted, they are recomputed from the station
/// bounds on restore.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum LayoutDocument {
    Root {
        child: Option<Box<LayoutDocument>>,
    },
    #[serde(rename_all = "camelCase")]
    Split {
        orientation: Orientation,
        ratio: f64,
        child_a: Box<LayoutDocument>,
        child_b: Box<LayoutDocument>,
    },
    #[serde(rename_all = "camelCase")]
    Leaf {
        item_id: String,
        placeholders: Vec<String>,
    },
}

/// Default identity resolver: the item's uuid in string form.
pub fn id_resolver(item: &ItemRef) -> String {
    item.id.to_string()
}

/// Leaves dropped during a restore because the item factory could not
/// produce their content.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RestoreReport {
    pub dropped: Vec<String>,
}

// ---------------------------------------------------------------------------
// Tree <-> document
// ---------------------------------------------------------------------------

/// Walk the tree into a document. The resolver supplies the host's opaque
/// identifier for each occupant.
pub fn serialize(tree: &LayoutTree, resolver: &dyn Fn(&ItemRef) -> String) -> LayoutDocument {
    LayoutDocument::Root {
        child: tree.root().map(|n| Box::new(node_to_doc(n, resolver))),
    }
}

fn node_to_doc(node: &RegionNode, resolver: &dyn Fn(&ItemRef) -> String) -> LayoutDocument {
    match node {
        RegionNode::Leaf {
            item, placeholders, ..
        } => LayoutDocument::Leaf {
            item_id: resolver(item),
            placeholders: placeholders.iter().map(|p| p.as_str().to_string()).collect(),
        },
        RegionNode::Split {
            orientation,
            ratio,
            first,
            second,
            ..
        } => LayoutDocument::Split {
            orientation: *orientation,
            ratio: *ratio,
            child_a: Box::new(node_to_doc(first, resolver)),
            child_b: Box::new(node_to_doc(second, resolver)),
        },
    }
}

/// Rebuild a tree from a document. The factory re-creates content from
/// persisted identifiers; when it fails for a leaf, that leaf is dropped
/// and its parent split collapses, exactly like a `remove` — a partially
/// lost layout restores rather than aborting. Ratios and orientations
/// come back verbatim; rectangles are recomputed once at the end.
pub fn deserialize(
    doc: &LayoutDocument,
    factory: &mut dyn FnMut(&str) -> anyhow::Result<ItemRef>,
    station: StationId,
    kind: StationKind,
    bounds: Rect,
    config: StationConfig,
) -> Result<(LayoutTree, RestoreReport), LayoutError> {
    let LayoutDocument::Root { child } = doc else {
        return Err(LayoutError::codec(0, "expected a root record at top level"));
    };

    let mut report = RestoreReport::default();
    let root = match child {
        None => None,
        Some(child) => {
            let (node, orphans) =
                build_node(child, factory, config.retain_placeholders, &mut report)?;
            if node.is_none() && !orphans.is_empty() {
                tracing::warn!(
                    count = orphans.len(),
                    "restore produced an empty tree; dropping orphaned placeholders"
                );
            }
            node
        }
    };

    let tree = LayoutTree::from_parts(station, kind, config, bounds, root);
    Ok((tree, report))
}

/// Returns the rebuilt subtree plus any placeholders orphaned by dropped
/// leaves that still need a home further up. A `Some` subtree has already
/// absorbed the orphans of its own children.
fn build_node(
    doc: &LayoutDocument,
    factory: &mut dyn FnMut(&str) -> anyhow::Result<ItemRef>,
    retain: bool,
    report: &mut RestoreReport,
) -> Result<(Option<RegionNode>, Vec<Placeholder>), LayoutError> {
    match doc {
        LayoutDocument::Root { .. } => {
            Err(LayoutError::codec(0, "root record nested inside the tree"))
        }
        LayoutDocument::Leaf {
            item_id,
            placeholders,
        } => match factory(item_id) {
            Ok(item) => Ok((
                Some(RegionNode::Leaf {
                    item,
                    placeholders: placeholders.iter().map(Placeholder::new).collect(),
                    rect: Rect::default(),
                }),
                Vec::new(),
            )),
            Err(e) => {
                tracing::warn!(item = %item_id, error = %e, "item factory failed; dropping leaf");
                report.dropped.push(item_id.clone());
                let mut orphans: Vec<Placeholder> =
                    placeholders.iter().map(Placeholder::new).collect();
                if retain {
                    orphans.push(Placeholder::new(item_id.clone()));
                }
                Ok((None, orphans))
            }
        },
        LayoutDocument::Split {
            orientation,
            ratio,
            child_a,
            child_b,
        } => {
            let (a, orphans_a) = build_node(child_a, factory, retain, report)?;
            let (b, orphans_b) = build_node(child_b, factory, retain, report)?;
            match (a, b) {
                (Some(a), Some(b)) => {
                    let ratio = if ratio.is_finite() && *ratio > 0.0 && *ratio < 1.0 {
                        *ratio
                    } else {
                        tracing::warn!(%ratio, "restored split ratio out of range; using 0.5");
                        0.5
                    };
                    Ok((
                        Some(RegionNode::split(*orientation, ratio, a, b)),
                        Vec::new(),
                    ))
                }
                (Some(survivor), None) | (None, Some(survivor)) => {
                    let mut survivor = survivor;
                    let orphans = placeholder::merge(&orphans_a, &orphans_b);
                    if let RegionNode::Leaf { placeholders, .. } = survivor.first_leaf_mut() {
                        *placeholders = placeholder::merge(placeholders, &orphans);
                    }
                    Ok((Some(survivor), Vec::new()))
                }
                (None, None) => Ok((None, placeholder::merge(&orphans_a, &orphans_b))),
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Binary form — length-prefixed, depth-first, big-endian
// ---------------------------------------------------------------------------

const MAGIC: [u8; 4] = *b"DLYT";
const FORMAT_VERSION: u8 = 1;

const TAG_ROOT: u8 = 0;
const TAG_SPLIT: u8 = 1;
const TAG_LEAF: u8 = 2;

const ORIENT_HORIZONTAL: u8 = 0;
const ORIENT_VERTICAL: u8 = 1;

/// Maximum length of an encoded string: 1 MiB. Guards decoding against
/// bad length prefixes in corrupt data.
const MAX_STRING_LEN: u32 = 1024 * 1024;

pub fn encode(doc: &LayoutDocument) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&MAGIC);
    out.push(FORMAT_VERSION);
    encode_node(doc, &mut out);
    out
}

fn encode_node(doc: &LayoutDocument, out: &mut Vec<u8>) {
    match doc {
        LayoutDocument::Root { child } => {
            out.push(TAG_ROOT);
            match child {
                None => out.push(0),
                Some(child) => {
                    out.push(1);
                    encode_node(child, out);
                }
            }
        }
        LayoutDocument::Split {
            orientation,
            ratio,
            child_a,
            child_b,
        } => {
            out.push(TAG_SPLIT);
            out.push(match orientation {
                Orientation::Horizontal => ORIENT_HORIZONTAL,
                Orientation::Vertical => ORIENT_VERTICAL,
            });
            out.extend_from_slice(&ratio.to_be_bytes());
            encode_node(child_a, out);
            encode_node(child_b, out);
        }
        LayoutDocument::Leaf {
            item_id,
            placeholders,
        } => {
            out.push(TAG_LEAF);
            write_str(item_id, out);
            out.extend_from_slice(&(placeholders.len() as u32).to_be_bytes());
            for p in placeholders {
                write_str(p, out);
            }
        }
    }
}

fn write_str(s: &str, out: &mut Vec<u8>) {
    out.extend_from_slice(&(s.len() as u32).to_be_bytes());
    out.extend_from_slice(s.as_bytes());
}

pub fn decode(bytes: &[u8]) -> Result<LayoutDocument, LayoutError> {
    let mut r = Reader { buf: bytes, pos: 0 };
    let magic = r.take(4)?;
    if magic != MAGIC {
        return Err(LayoutError::codec(0, "bad magic, not a layout document"));
    }
    let version = r.u8()?;
    if version != FORMAT_VERSION {
        return Err(LayoutError::codec(4, format!("unsupported version {version}")));
    }
    let doc = decode_node(&mut r)?;
    if !matches!(doc, LayoutDocument::Root { .. }) {
        return Err(LayoutError::codec(5, "expected a root record at top level"));
    }
    if r.pos != r.buf.len() {
        return Err(LayoutError::codec(r.pos, "trailing bytes after document"));
    }
    Ok(doc)
}

fn decode_node(r: &mut Reader<'_>) -> Result<LayoutDocument, LayoutError> {
    let at = r.pos;
    match r.u8()? {
        TAG_ROOT => {
            let child = match r.u8()? {
                0 => None,
                1 => Some(Box::new(decode_node(r)?)),
                b => return Err(LayoutError::codec(at + 1, format!("bad presence byte {b}"))),
            };
            Ok(LayoutDocument::Root { child })
        }
        TAG_SPLIT => {
            let orientation = match r.u8()? {
                ORIENT_HORIZONTAL => Orientation::Horizontal,
                ORIENT_VERTICAL => Orientation::Vertical,
                b => return Err(LayoutError::codec(at + 1, format!("bad orientation byte {b}"))),
            };
            let ratio = r.f64()?;
            let child_a = Box::new(decode_node(r)?);
            let child_b = Box::new(decode_node(r)?);
            Ok(LayoutDocument::Split {
                orientation,
                ratio,
                child_a,
                child_b,
            })
        }
        TAG_LEAF => {
            let item_id = r.string()?;
            let count = r.u32()?;
            if count > MAX_STRING_LEN {
                return Err(LayoutError::codec(at, format!("absurd placeholder count {count}")));
            }
            let mut placeholders = Vec::with_capacity(count as usize);
            for _ in 0..count {
                placeholders.push(r.string()?);
            }
            Ok(LayoutDocument::Leaf {
                item_id,
                placeholders,
            })
        }
        tag => Err(LayoutError::codec(at, format!("unknown node tag {tag}"))),
    }
}

struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8], LayoutError> {
        if self.pos + n > self.buf.len() {
            return Err(LayoutError::codec(self.pos, "unexpected end of data"));
        }
        let out = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    fn u8(&mut self) -> Result<u8, LayoutError> {
        Ok(self.take(1)?[0])
    }

    fn u32(&mut self) -> Result<u32, LayoutError> {
        let b = self.take(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn f64(&mut self) -> Result<f64, LayoutError> {
        let b = self.take(8)?;
        let mut arr = [0u8; 8];
        arr.copy_from_slice(b);
        Ok(f64::from_be_bytes(arr))
    }

    fn string(&mut self) -> Result<String, LayoutError> {
        let at = self.pos;
        let len = self.u32()?;
        if len > MAX_STRING_LEN {
            return Err(LayoutError::codec(at, format!("string too long: {len} bytes")));
        }
        let bytes = self.take(len as usize)?;
        String::from_utf8(bytes.to_vec())
            .map_err(|_| LayoutError::codec(at, "string is not valid UTF-8"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NodePath;
    use crate::resolver::{DropSide, DropTarget, TargetNode};

    fn test_config() -> StationConfig {
        StationConfig {
            divider_width: 0,
            ..StationConfig::default()
        }
    }

    fn echo_factory(id: &str) -> anyhow::Result<ItemRef> {
        Ok(ItemRef::new(id.parse()?))
    }

    fn sample_tree() -> LayoutTree {
        let mut tree = LayoutTree::with_config(
            StationId::new_v4(),
            StationKind::Split,
            Rect::new(0, 0, 400, 300),
            test_config(),
        );
        let a = ItemRef::fresh();
        let b = ItemRef::fresh();
        let c = ItemRef::fresh();
        tree.insert(
            &DropTarget {
                node: TargetNode::Root,
                side: DropSide::Center,
                proposed_ratio: 0.5,
                expected_item: None,
            },
            a,
        )
        .unwrap();
        tree.insert(
            &DropTarget {
                node: TargetNode::Node(NodePath::root()),
                side: DropSide::Right,
                proposed_ratio: 0.3,
                expected_item: None,
            },
            b,
        )
        .unwrap();
        tree.insert(
            &DropTarget {
                node: TargetNode::Node(NodePath::root().child_first()),
                side: DropSide::Bottom,
                proposed_ratio: 0.4,
                expected_item: None,
            },
            c,
        )
        .unwrap();
        tree
    }

    #[test]
    fn test_document_json_shape() {
        let doc = LayoutDocument::Root {
            child: Some(Box::new(LayoutDocument::Split {
                orientation: Orientation::Vertical,
                ratio: 0.5,
                child_a: Box::new(LayoutDocument::Leaf {
                    item_id: "a".into(),
                    placeholders: vec!["old-b".into()],
                }),
                child_b: Box::new(LayoutDocument::Leaf {
                    item_id: "b".into(),
                    placeholders: vec![],
                }),
            })),
        };
        let value = serde_json::to_value(&doc).unwrap();
        assert_eq!(value["kind"], "root");
        assert_eq!(value["child"]["kind"], "split");
        assert_eq!(value["child"]["orientation"], "vertical");
        assert_eq!(value["child"]["ratio"], 0.5);
        assert_eq!(value["child"]["childA"]["kind"], "leaf");
        assert_eq!(value["child"]["childA"]["itemId"], "a");
        assert_eq!(value["child"]["childA"]["placeholders"][0], "old-b");

        let back: LayoutDocument = serde_json::from_value(value).unwrap();
        assert_eq!(back, doc);
    }

    #[test]
    fn test_tree_round_trip_is_isomorphic() {
        let tree = sample_tree();
        let doc = serialize(&tree, &id_resolver);
        let (restored, report) = deserialize(
            &doc,
            &mut echo_factory,
            tree.station(),
            tree.kind(),
            tree.bounds(),
            test_config(),
        )
        .unwrap();

        assert!(report.dropped.is_empty());
        assert_eq!(serialize(&restored, &id_resolver), doc);
        assert_eq!(restored.items(), tree.items());
        // Rectangles come back from a fresh recompute.
        assert_eq!(
            restored.leaves().iter().map(|(_, r)| *r).collect::<Vec<_>>(),
            tree.leaves().iter().map(|(_, r)| *r).collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_binary_round_trip() {
        let tree = sample_tree();
        let doc = serialize(&tree, &id_resolver);
        let bytes = encode(&doc);
        assert_eq!(decode(&bytes).unwrap(), doc);
    }

    #[test]
    fn test_binary_round_trip_empty_root() {
        let doc = LayoutDocument::Root { child: None };
        assert_eq!(decode(&encode(&doc)).unwrap(), doc);
    }

    #[test]
    fn test_decode_bad_magic() {
        let err = decode(b"NOPE\x01\x00\x00").unwrap_err();
        assert!(matches!(err, LayoutError::Codec { offset: 0, .. }));
    }

    #[test]
    fn test_decode_truncated() {
        let tree = sample_tree();
        let bytes = encode(&serialize(&tree, &id_resolver));
        let err = decode(&bytes[..bytes.len() - 3]).unwrap_err();
        assert!(matches!(err, LayoutError::Codec { .. }));
    }

    #[test]
    fn test_decode_trailing_bytes() {
        let mut bytes = encode(&LayoutDocument::Root { child: None });
        bytes.push(0xff);
        let err = decode(&bytes).unwrap_err();
        assert!(matches!(err, LayoutError::Codec { .. }));
    }

    #[test]
    fn test_factory_failure_drops_leaf_and_collapses() {
        let keep = ItemRef::fresh();
        let lost = uuid::Uuid::new_v4().to_string();
        let doc = LayoutDocument::Root {
            child: Some(Box::new(LayoutDocument::Split {
                orientation: Orientation::Vertical,
                ratio: 0.5,
                child_a: Box::new(LayoutDocument::Leaf {
                    item_id: lost.clone(),
                    placeholders: vec!["earlier".into()],
                }),
                child_b: Box::new(LayoutDocument::Leaf {
                    item_id: keep.id.to_string(),
                    placeholders: vec![],
                }),
            })),
        };

        let mut factory = |id: &str| -> anyhow::Result<ItemRef> {
            if id == lost {
                anyhow::bail!("content for {id} no longer exists");
            }
            echo_factory(id)
        };
        let (tree, report) = deserialize(
            &doc,
            &mut factory,
            StationId::new_v4(),
            StationKind::Split,
            Rect::new(0, 0, 400, 300),
            test_config(),
        )
        .unwrap();

        assert_eq!(report.dropped, vec![lost.clone()]);
        let leaves = tree.leaves();
        assert_eq!(leaves.len(), 1);
        assert_eq!(leaves[0].0.id, keep.id);
        assert_eq!(leaves[0].1, Rect::new(0, 0, 400, 300));
        // The dropped leaf's tokens and its own vacancy live on.
        assert!(tree.placeholders().contains(&Placeholder::new("earlier")));
        assert!(tree.placeholders().contains(&Placeholder::new(lost)));
    }

    #[test]
    fn test_all_leaves_lost_restores_empty_tree() {
        let doc = LayoutDocument::Root {
            child: Some(Box::new(LayoutDocument::Leaf {
                item_id: "gone".into(),
                placeholders: vec![],
            })),
        };
        let mut factory =
            |_: &str| -> anyhow::Result<ItemRef> { anyhow::bail!("nothing survives") };
        let (tree, report) = deserialize(
            &doc,
            &mut factory,
            StationId::new_v4(),
            StationKind::Split,
            Rect::new(0, 0, 400, 300),
            test_config(),
        )
        .unwrap();
        assert!(tree.is_empty());
        assert_eq!(report.dropped, vec!["gone".to_string()]);
    }

    #[test]
    fn test_restored_out_of_range_ratio_is_sanitized() {
        let doc = LayoutDocument::Root {
            child: Some(Box::new(LayoutDocument::Split {
                orientation: Orientation::Horizontal,
                ratio: f64::NAN,
                child_a: Box::new(LayoutDocument::Leaf {
                    item_id: uuid::Uuid::new_v4().to_string(),
                    placeholders: vec![],
                }),
                child_b: Box::new(LayoutDocument::Leaf {
                    item_id: uuid::Uuid::new_v4().to_string(),
                    placeholders: vec![],
                }),
            })),
        };
        let (tree, _) = deserialize(
            &doc,
            &mut echo_factory,
            StationId::new_v4(),
            StationKind::Split,
            Rect::new(0, 0, 400, 300),
            test_config(),
        )
        .unwrap();
        let Some(RegionNode::Split { ratio, .. }) = tree.root() else {
            panic!("expected split");
        };
        assert!((ratio - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_nested_root_record_rejected() {
        let doc = LayoutDocument::Root {
            child: Some(Box::new(LayoutDocument::Root { child: None })),
        };
        let err = deserialize(
            &doc,
            &mut echo_factory,
            StationId::new_v4(),
            StationKind::Split,
            Rect::new(0, 0, 400, 300),
            test_config(),
        )
        .unwrap_err();
        assert!(matches!(err, LayoutError::Codec { .. }));
    }
}
