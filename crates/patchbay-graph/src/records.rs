use serde::{Deserialize, Serialize};

use patchbay_catalog::DescriptorRecord;

use crate::windows::WindowKind;

pub const FILE_VERSION: u32 = 1;
pub const GRAPH_FILE_EXTENSION: &str = "filtergraph";

/// On-disk form of a whole patch document.
///
/// Everything except node and plugin identity is defaulted on decode so
/// partial or hand-edited files still open.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphRecord {
    #[serde(default)]
    pub version: u32,
    #[serde(default)]
    pub nodes: Vec<NodeRecord>,
    #[serde(default)]
    pub connections: Vec<ConnectionRecord>,
}

/// One node: identity, canvas position, plugin record, opaque state, and
/// the window kinds open at save time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub uid: u32,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    pub plugin: DescriptorRecord,
    /// Hex-encoded instance state blob.
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub open_windows: Vec<WindowKind>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionRecord {
    pub source_node: u32,
    #[serde(default)]
    pub source_channel: u32,
    pub dest_node: u32,
    #[serde(default)]
    pub dest_channel: u32,
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn sparse_node_records_decode_with_defaults() {
        let record: NodeRecord = serde_json::from_str(
            r#"{"uid": 3, "plugin": {"tag": "PLUGIN", "name": "Gain"}}"#,
        )
        .unwrap();
        assert_eq!(record.uid, 3);
        assert_eq!((record.x, record.y), (0.0, 0.0));
        assert_eq!(record.state, "");
        assert!(record.open_windows.is_empty());
    }

    #[test]
    fn versionless_files_read_as_version_zero() {
        let record: GraphRecord = serde_json::from_str(r#"{"nodes": []}"#).unwrap();
        assert_eq!(record.version, 0);
        assert!(record.connections.is_empty());
    }
}
