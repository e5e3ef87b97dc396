//! Patch document model: plugin nodes and their connections, the editor
//! windows open on them, `.filtergraph` persistence, and the session log.

pub mod document;
pub mod geom;
pub mod persist;
pub mod records;
pub mod session_log;
pub mod settings;
pub mod windows;

pub use document::{Connection, GraphError, NodeId, PatchGraph, PatchNode, Pin, MIDI_CHANNEL};
pub use geom::{Point, Rect, RelativeRect};
pub use persist::{LoadError, LoadReport, SaveError};
pub use records::{ConnectionRecord, GraphRecord, NodeRecord, FILE_VERSION, GRAPH_FILE_EXTENSION};
pub use session_log::{LogError, SessionLog, LOG_RETENTION};
pub use settings::GridSettings;
pub use windows::{fit_window_on_screen, EditorWindow, WindowId, WindowKind};
