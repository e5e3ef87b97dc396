//! `.filtergraph` reading and writing.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::Path;

use thiserror::Error;
use tracing::warn;

use patchbay_catalog::DescriptorRecord;

use crate::document::{Connection, NodeId, NodeUiState, PatchGraph, PatchNode, Pin};
use crate::geom::Point;
use crate::records::{ConnectionRecord, GraphRecord, NodeRecord, FILE_VERSION};
use crate::windows::WindowKind;

#[derive(Debug, Error)]
pub enum SaveError {
    #[error("io error while saving patch: {0}")]
    Io(#[from] io::Error),
    #[error("failed to encode patch: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("io error while loading patch: {0}")]
    Io(#[from] io::Error),
    #[error("failed to parse patch file: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("unsupported patch file version {0}")]
    UnsupportedVersion(u32),
}

/// What a tolerant reload kept and what it had to leave behind.
#[derive(Debug, Default)]
pub struct LoadReport {
    /// Display names of nodes whose plugin could not be instantiated.
    pub skipped_plugins: Vec<String>,
    /// Windows open at save time, for the shell to reopen.
    pub reopen_windows: Vec<(NodeId, WindowKind)>,
}

impl PatchGraph {
    pub fn to_records(&self) -> GraphRecord {
        GraphRecord {
            version: FILE_VERSION,
            nodes: self
                .nodes
                .iter()
                .map(|node| self.node_record(node))
                .collect(),
            connections: self.connections.iter().map(connection_record).collect(),
        }
    }

    fn node_record(&self, node: &PatchNode) -> NodeRecord {
        NodeRecord {
            uid: node.id.0,
            x: node.position.x,
            y: node.position.y,
            plugin: DescriptorRecord::from_descriptor(&node.descriptor),
            state: hex::encode(node.instance.save_state()),
            open_windows: self
                .windows
                .iter()
                .filter(|window| window.node == node.id)
                .map(|window| window.kind)
                .collect(),
        }
    }

    /// Replaces the whole document with the recorded patch.
    ///
    /// Nodes whose plugin record is malformed or whose plugin can no longer
    /// be instantiated are skipped into the report rather than failing the
    /// load, and only connections with both endpoints alive are rebuilt.
    /// The id counter seeds past the largest restored uid so later adds
    /// never collide.
    pub fn restore_from_records(&mut self, record: GraphRecord) -> Result<LoadReport, LoadError> {
        if record.version > FILE_VERSION {
            return Err(LoadError::UnsupportedVersion(record.version));
        }

        self.clear();
        let mut report = LoadReport::default();

        for node_record in record.nodes {
            let display_name = node_record.plugin.name.clone();
            let descriptor = match node_record.plugin.into_descriptor() {
                Ok(descriptor) => descriptor,
                Err(err) => {
                    warn!(%err, uid = node_record.uid, "skipping node with malformed plugin record");
                    report.skipped_plugins.push(display_name);
                    continue;
                }
            };

            let mut instance = match self.formats.create_instance_sync(&descriptor) {
                Ok(instance) => instance,
                Err(err) => {
                    warn!(%err, uid = node_record.uid, "skipping node whose plugin is unavailable");
                    report.skipped_plugins.push(display_name);
                    continue;
                }
            };

            if !node_record.state.is_empty() {
                match hex::decode(&node_record.state) {
                    Ok(blob) => {
                        instance.restore_state(&blob);
                    }
                    Err(_) => warn!(uid = node_record.uid, "discarding malformed state blob"),
                }
            }

            let id = NodeId(node_record.uid);
            if self.node(id).is_some() {
                warn!(uid = node_record.uid, "duplicate node uid in file, skipping");
                report.skipped_plugins.push(display_name);
                continue;
            }
            self.next_node_id = self.next_node_id.max(node_record.uid);
            self.nodes.push(PatchNode {
                id,
                descriptor,
                position: Point::new(node_record.x, node_record.y),
                ui_state: NodeUiState::default(),
                instance,
            });
            for kind in node_record.open_windows {
                report.reopen_windows.push((id, kind));
            }
        }

        for connection in record.connections {
            let from = Pin::new(NodeId(connection.source_node), connection.source_channel);
            let to = Pin::new(NodeId(connection.dest_node), connection.dest_channel);
            if let Err(err) = self.connect(from, to) {
                warn!(%err, "dropping connection from the file");
            }
        }

        self.log_message(&format!(
            "Restored {} nodes ({} skipped)",
            self.nodes.len(),
            report.skipped_plugins.len()
        ));
        self.changed = false;
        Ok(report)
    }

    /// Writes the document as pretty JSON through a temp file and rename,
    /// then clears the dirty flag and adopts `path` as the document file.
    pub fn save_to(&mut self, path: &Path) -> Result<(), SaveError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let json = serde_json::to_vec_pretty(&self.to_records())?;
        let tmp_path = path.with_extension("tmp");
        let mut file = File::create(&tmp_path)?;
        file.write_all(&json)?;
        file.flush()?;
        drop(file);
        fs::rename(&tmp_path, path)?;

        self.file_path = Some(path.to_path_buf());
        self.changed = false;
        self.log_message(&format!("Saved patch to {}", path.display()));
        Ok(())
    }

    pub fn load_from(&mut self, path: &Path) -> Result<LoadReport, LoadError> {
        let raw = fs::read_to_string(path)?;
        let record: GraphRecord = serde_json::from_str(&raw)?;
        let report = self.restore_from_records(record)?;
        self.file_path = Some(path.to_path_buf());
        self.log_message(&format!("Loaded patch from {}", path.display()));
        Ok(report)
    }
}

fn connection_record(connection: &Connection) -> ConnectionRecord {
    ConnectionRecord {
        source_node: connection.from.node.0,
        source_channel: connection.from.channel,
        dest_node: connection.to.node.0,
        dest_channel: connection.to.channel,
    }
}
