//! The patch document: nodes, connections, and the windows open on them.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use patchbay_catalog::PluginDescriptor;
use patchbay_host::{FormatManager, PluginInstance, RequestId};

use crate::geom::{Point, Rect};
use crate::session_log::{SessionLog, SESSION_LOG_PREFIX};
use crate::settings::GridSettings;
use crate::windows::{
    fit_window_on_screen, EditorWindow, WindowId, WindowKind, DEFAULT_WINDOW_HEIGHT,
    DEFAULT_WINDOW_WIDTH,
};

/// Channel index marking a MIDI pin. MIDI pins only connect to each other.
pub const MIDI_CHANNEL: u32 = 0x1000;

/// Unique identifier for nodes stored inside the document. Ids increase
/// monotonically and are never reused within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId(pub u32);

/// One end of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Pin {
    pub node: NodeId,
    pub channel: u32,
}

impl Pin {
    pub fn new(node: NodeId, channel: u32) -> Self {
        Self { node, channel }
    }

    pub fn midi(node: NodeId) -> Self {
        Self {
            node,
            channel: MIDI_CHANNEL,
        }
    }

    pub fn is_midi(&self) -> bool {
        self.channel == MIDI_CHANNEL
    }
}

/// Directed edge between two pins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Connection {
    pub from: Pin,
    pub to: Pin,
}

/// Error produced by graph manipulation operations.
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("node {0:?} does not exist")]
    MissingNode(NodeId),
    #[error("node {0:?} cannot be connected to itself")]
    SelfConnection(NodeId),
    #[error("channel {channel} is out of range for node {node:?}")]
    ChannelOutOfRange { node: NodeId, channel: u32 },
    #[error("midi pins can only connect to midi pins")]
    MixedPinKinds,
    #[error("these pins are already connected")]
    DuplicateConnection,
    #[error("connection not found")]
    MissingConnection,
}

/// Per-node UI state kept for the session, never persisted.
#[derive(Debug, Clone, Default)]
pub struct NodeUiState {
    /// Bounds a window of each kind last had, so reopening lands it where
    /// the user left it.
    pub window_bounds: HashMap<WindowKind, Rect>,
}

/// One plugin in the patch.
#[derive(Debug)]
pub struct PatchNode {
    pub id: NodeId,
    pub descriptor: PluginDescriptor,
    pub(crate) position: Point,
    pub(crate) ui_state: NodeUiState,
    pub(crate) instance: Box<dyn PluginInstance>,
}

impl PatchNode {
    /// Canvas position, fractional coordinates.
    pub fn position(&self) -> Point {
        self.position
    }

    pub fn instance(&self) -> &dyn PluginInstance {
        self.instance.as_ref()
    }

    pub fn instance_mut(&mut self) -> &mut dyn PluginInstance {
        self.instance.as_mut()
    }
}

/// The document: a patch of plugin nodes, their connections, and the editor
/// windows currently open on them.
///
/// All mutation happens on the thread that owns the document. Plugin
/// instantiation is queued through the format manager and folded in by
/// [`pump_instantiations`]; a request the document no longer remembers (the
/// graph was cleared meanwhile) completes into the void and the instance is
/// dropped.
///
/// [`pump_instantiations`]: PatchGraph::pump_instantiations
#[derive(Debug)]
pub struct PatchGraph {
    pub(crate) formats: FormatManager,
    pub(crate) nodes: Vec<PatchNode>,
    pub(crate) connections: Vec<Connection>,
    pub(crate) windows: Vec<EditorWindow>,
    pub(crate) next_node_id: u32,
    next_window_id: u64,
    pending: HashMap<RequestId, Point>,
    pub grid: GridSettings,
    pub(crate) session_log: Option<SessionLog>,
    pub(crate) file_path: Option<PathBuf>,
    pub(crate) changed: bool,
}

impl PatchGraph {
    pub fn new(formats: FormatManager) -> Self {
        Self {
            formats,
            nodes: Vec::new(),
            connections: Vec::new(),
            windows: Vec::new(),
            next_node_id: 0,
            next_window_id: 0,
            pending: HashMap::new(),
            grid: GridSettings::default(),
            session_log: None,
            file_path: None,
            changed: false,
        }
    }

    pub fn formats(&self) -> &FormatManager {
        &self.formats
    }

    pub fn nodes(&self) -> &[PatchNode] {
        &self.nodes
    }

    pub fn node(&self, id: NodeId) -> Option<&PatchNode> {
        self.nodes.iter().find(|node| node.id == id)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut PatchNode> {
        self.nodes.iter_mut().find(|node| node.id == id)
    }

    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    pub fn windows(&self) -> &[EditorWindow] {
        &self.windows
    }

    pub fn window(&self, id: WindowId) -> Option<&EditorWindow> {
        self.windows.iter().find(|window| window.id == id)
    }

    /// Queues creation of a plugin node at the given canvas position. The
    /// node appears once the completion is pumped; on failure nothing is
    /// added and the message is reported by [`pump_instantiations`].
    ///
    /// [`pump_instantiations`]: PatchGraph::pump_instantiations
    pub fn add_plugin(&mut self, descriptor: &PluginDescriptor, position: Point) -> RequestId {
        let request = self.formats.begin_instantiate(descriptor);
        self.pending.insert(request, position);
        request
    }

    /// Folds completed instantiations into the graph. Returns the failure
    /// messages collected this pump for the shell to surface.
    pub fn pump_instantiations(&mut self) -> Vec<String> {
        let mut failures = Vec::new();
        while let Some(event) = self.formats.try_next_event() {
            let Some(position) = self.pending.remove(&event.request) else {
                // completion for a request the document forgot: drop it
                continue;
            };
            match event.outcome {
                Ok(instance) => {
                    self.next_node_id += 1;
                    let id = NodeId(self.next_node_id);
                    let descriptor = instance.descriptor().clone();
                    self.log_message(&format!("Created node {}: {}", id.0, descriptor.name));
                    self.nodes.push(PatchNode {
                        id,
                        descriptor,
                        position,
                        ui_state: NodeUiState::default(),
                        instance,
                    });
                    self.changed = true;
                }
                Err(message) => {
                    warn!(%message, "plugin instantiation failed");
                    self.log_message(&format!("Failed to create plugin: {message}"));
                    failures.push(message);
                }
            }
        }
        failures
    }

    /// Removes a node, its windows, and every connection touching it.
    /// Unknown ids are a no-op.
    pub fn remove_node(&mut self, id: NodeId) {
        let Some(name) = self.node(id).map(|node| node.descriptor.name.clone()) else {
            return;
        };
        self.close_windows_for(id);
        self.nodes.retain(|node| node.id != id);
        self.connections
            .retain(|connection| connection.from.node != id && connection.to.node != id);
        self.changed = true;
        self.log_message(&format!("Removed node {}: {name}", id.0));
    }

    /// Canvas position of a node, `Point::ZERO` when the id is unknown.
    pub fn node_position(&self, id: NodeId) -> Point {
        self.node(id).map(|node| node.position).unwrap_or(Point::ZERO)
    }

    /// Moves a node on the canvas. Unknown ids are a no-op.
    pub fn set_node_position(&mut self, id: NodeId, position: Point) {
        if let Some(node) = self.node_mut(id) {
            node.position = position;
            self.changed = true;
        }
    }

    pub fn connect(&mut self, from: Pin, to: Pin) -> Result<(), GraphError> {
        if from.node == to.node {
            return Err(GraphError::SelfConnection(from.node));
        }
        let source = self
            .node(from.node)
            .ok_or(GraphError::MissingNode(from.node))?;
        let dest = self.node(to.node).ok_or(GraphError::MissingNode(to.node))?;
        if from.is_midi() != to.is_midi() {
            return Err(GraphError::MixedPinKinds);
        }
        if !from.is_midi() {
            if from.channel >= source.descriptor.num_output_channels {
                return Err(GraphError::ChannelOutOfRange {
                    node: from.node,
                    channel: from.channel,
                });
            }
            if to.channel >= dest.descriptor.num_input_channels {
                return Err(GraphError::ChannelOutOfRange {
                    node: to.node,
                    channel: to.channel,
                });
            }
        }
        let connection = Connection { from, to };
        if self.connections.contains(&connection) {
            return Err(GraphError::DuplicateConnection);
        }
        self.connections.push(connection);
        self.changed = true;
        Ok(())
    }

    pub fn disconnect(&mut self, from: Pin, to: Pin) -> Result<(), GraphError> {
        let target = Connection { from, to };
        let before = self.connections.len();
        self.connections.retain(|connection| *connection != target);
        if self.connections.len() == before {
            return Err(GraphError::MissingConnection);
        }
        self.changed = true;
        Ok(())
    }

    /// Returns the window already open for `(node, kind)` or opens a new
    /// one, placed from the node's canvas position plus a cascade offset and
    /// clamped onto a display. `None` for unknown nodes.
    pub fn get_or_create_window(
        &mut self,
        node: NodeId,
        kind: WindowKind,
        displays: &[Rect],
    ) -> Option<WindowId> {
        let patch_node = self.node(node)?;
        let position = patch_node.position;
        let saved = patch_node.ui_state.window_bounds.get(&kind).copied();

        if let Some(existing) = self
            .windows
            .iter()
            .find(|window| window.node == node && window.kind == kind)
        {
            return Some(existing.id);
        }

        let bounds = saved.unwrap_or_else(|| {
            let primary = displays
                .first()
                .copied()
                .unwrap_or(Rect::new(0.0, 0.0, 1280.0, 800.0));
            let cascade = 24.0 * self.windows.len() as f32;
            Rect::new(
                primary.x
                    + (position.x as f32) * (primary.w - DEFAULT_WINDOW_WIDTH).max(0.0)
                    + cascade,
                primary.y
                    + (position.y as f32) * (primary.h - DEFAULT_WINDOW_HEIGHT).max(0.0)
                    + cascade,
                DEFAULT_WINDOW_WIDTH,
                DEFAULT_WINDOW_HEIGHT,
            )
        });
        let bounds = fit_window_on_screen(bounds, displays);

        self.next_window_id += 1;
        let id = WindowId(self.next_window_id);
        self.windows.push(EditorWindow {
            id,
            node,
            kind,
            bounds,
        });
        Some(id)
    }

    /// Records where a live window sits so the place survives close/reopen.
    pub fn set_window_bounds(&mut self, id: WindowId, bounds: Rect) {
        let Some(window) = self.windows.iter_mut().find(|window| window.id == id) else {
            return;
        };
        window.bounds = bounds;
        let (node, kind) = (window.node, window.kind);
        if let Some(patch_node) = self.nodes.iter_mut().find(|n| n.id == node) {
            patch_node.ui_state.window_bounds.insert(kind, bounds);
        }
    }

    pub fn close_window(&mut self, id: WindowId) -> bool {
        self.remove_windows_where(|window| window.id == id) > 0
    }

    /// Closes every window kind open for a node, returning how many closed.
    pub fn close_windows_for(&mut self, node: NodeId) -> usize {
        self.remove_windows_where(|window| window.node == node)
    }

    /// Closes everything; true if at least one window was open beforehand.
    pub fn close_all_windows(&mut self) -> bool {
        self.remove_windows_where(|_| true) > 0
    }

    fn remove_windows_where(&mut self, mut predicate: impl FnMut(&EditorWindow) -> bool) -> usize {
        let mut removed = 0;
        let mut index = 0;
        while index < self.windows.len() {
            if predicate(&self.windows[index]) {
                let window = self.windows.remove(index);
                if let Some(node) = self.nodes.iter_mut().find(|n| n.id == window.node) {
                    node.ui_state.window_bounds.insert(window.kind, window.bounds);
                }
                removed += 1;
            } else {
                index += 1;
            }
        }
        removed
    }

    /// Empties the document: windows closed, nodes, connections, and any
    /// not-yet-pumped instantiation requests dropped. The id counter and the
    /// session log carry on.
    pub fn clear(&mut self) {
        self.close_all_windows();
        self.nodes.clear();
        self.connections.clear();
        self.pending.clear();
        self.changed = true;
    }

    /// Starts a fresh, untitled patch: the graph emptied and the file
    /// association dropped. The session log stays attached.
    pub fn new_document(&mut self) {
        self.clear();
        self.file_path = None;
        self.changed = false;
        self.log_message("Started a new patch");
    }

    pub fn has_changed(&self) -> bool {
        self.changed
    }

    pub fn mark_changed(&mut self) {
        self.changed = true;
    }

    /// Clears the dirty flag, e.g. after the shell seeds a starter patch
    /// that should not count as unsaved work.
    pub fn mark_unchanged(&mut self) {
        self.changed = false;
    }

    pub fn file_path(&self) -> Option<&Path> {
        self.file_path.as_deref()
    }

    /// Document title: the file stem, or `"Unnamed"` before the first save.
    pub fn title(&self) -> String {
        self.file_path
            .as_deref()
            .and_then(Path::file_stem)
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "Unnamed".to_string())
    }

    /// Opens the session log if none is live yet. Failure to create one is
    /// logged and the document continues without.
    pub fn ensure_session_log(&mut self) {
        if self.session_log.is_some() {
            return;
        }
        match SessionLog::create(SESSION_LOG_PREFIX) {
            Ok(log) => self.session_log = Some(log),
            Err(err) => warn!(%err, "continuing without a session log"),
        }
    }

    pub fn attach_session_log(&mut self, log: SessionLog) {
        self.session_log = Some(log);
    }

    /// Closes the session log, pruning the log folder to its retention cap.
    pub fn close_session_log(&mut self) {
        if let Some(log) = self.session_log.take() {
            log.close();
        }
    }

    pub fn session_log(&self) -> Option<&SessionLog> {
        self.session_log.as_ref()
    }

    pub fn log_message(&mut self, message: &str) {
        if let Some(log) = self.session_log.as_mut() {
            log.log(message);
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use patchbay_host::builtin;

    use super::*;

    fn graph() -> PatchGraph {
        PatchGraph::new(FormatManager::with_default_formats())
    }

    fn add(graph: &mut PatchGraph, descriptor: &PluginDescriptor, x: f64, y: f64) -> NodeId {
        graph.add_plugin(descriptor, Point::new(x, y));
        let failures = graph.pump_instantiations();
        assert_eq!(failures, Vec::<String>::new());
        graph.nodes().last().unwrap().id
    }

    #[test]
    fn added_node_keeps_the_requested_position() {
        let mut graph = graph();
        let id = add(&mut graph, &builtin::gain_descriptor(), 0.25, 0.75);
        assert_eq!(graph.node_position(id), Point::new(0.25, 0.75));
    }

    #[test]
    fn node_ids_increase_and_are_never_recycled() {
        let mut graph = graph();
        let a = add(&mut graph, &builtin::gain_descriptor(), 0.1, 0.1);
        let b = add(&mut graph, &builtin::gain_descriptor(), 0.2, 0.2);
        graph.remove_node(a);
        let c = add(&mut graph, &builtin::gain_descriptor(), 0.3, 0.3);
        assert_eq!((a, b, c), (NodeId(1), NodeId(2), NodeId(3)));
    }

    #[test]
    fn unknown_node_position_is_zero_and_moves_are_ignored() {
        let mut graph = graph();
        graph.set_node_position(NodeId(99), Point::new(0.5, 0.5));
        assert_eq!(graph.node_position(NodeId(99)), Point::ZERO);
        assert!(!graph.has_changed());
    }

    #[test]
    fn clearing_discards_pending_instantiations() {
        let mut graph = graph();
        graph.add_plugin(&builtin::gain_descriptor(), Point::new(0.5, 0.5));
        graph.clear();
        let failures = graph.pump_instantiations();
        assert_eq!(failures, Vec::<String>::new());
        assert!(graph.nodes().is_empty());
    }

    #[test]
    fn failed_instantiation_reports_a_message_and_adds_nothing() {
        let mut graph = graph();
        let alien = PluginDescriptor::new("Alien", "VST", "/plugins/alien.so", 9);
        graph.add_plugin(&alien, Point::new(0.5, 0.5));
        let failures = graph.pump_instantiations();
        assert_eq!(failures.len(), 1);
        assert!(graph.nodes().is_empty());
    }

    #[test]
    fn connect_validates_both_endpoints() {
        let mut graph = graph();
        let tone = add(&mut graph, &builtin::tone_generator_descriptor(), 0.2, 0.2);
        let gain = add(&mut graph, &builtin::gain_descriptor(), 0.6, 0.2);

        assert!(matches!(
            graph.connect(Pin::new(tone, 0), Pin::new(tone, 0)),
            Err(GraphError::SelfConnection(_))
        ));
        assert!(matches!(
            graph.connect(Pin::new(NodeId(99), 0), Pin::new(gain, 0)),
            Err(GraphError::MissingNode(NodeId(99)))
        ));
        assert!(matches!(
            graph.connect(Pin::new(tone, 2), Pin::new(gain, 0)),
            Err(GraphError::ChannelOutOfRange { .. })
        ));
        assert!(matches!(
            graph.connect(Pin::midi(tone), Pin::new(gain, 0)),
            Err(GraphError::MixedPinKinds)
        ));

        graph.connect(Pin::new(tone, 0), Pin::new(gain, 0)).unwrap();
        assert!(matches!(
            graph.connect(Pin::new(tone, 0), Pin::new(gain, 0)),
            Err(GraphError::DuplicateConnection)
        ));
        assert_eq!(graph.connections().len(), 1);
    }

    #[test]
    fn midi_pins_connect_to_each_other() {
        let mut graph = graph();
        let midi_in = add(&mut graph, &builtin::midi_input_descriptor(), 0.1, 0.1);
        let midi_out = add(&mut graph, &builtin::midi_output_descriptor(), 0.9, 0.1);
        graph.connect(Pin::midi(midi_in), Pin::midi(midi_out)).unwrap();
        assert_eq!(graph.connections().len(), 1);
    }

    #[test]
    fn disconnect_removes_or_reports_missing() {
        let mut graph = graph();
        let tone = add(&mut graph, &builtin::tone_generator_descriptor(), 0.2, 0.2);
        let gain = add(&mut graph, &builtin::gain_descriptor(), 0.6, 0.2);
        graph.connect(Pin::new(tone, 0), Pin::new(gain, 0)).unwrap();

        graph.disconnect(Pin::new(tone, 0), Pin::new(gain, 0)).unwrap();
        assert!(graph.connections().is_empty());
        assert!(matches!(
            graph.disconnect(Pin::new(tone, 0), Pin::new(gain, 0)),
            Err(GraphError::MissingConnection)
        ));
    }

    #[test]
    fn removing_a_node_drops_its_connections_and_windows() {
        let mut graph = graph();
        let tone = add(&mut graph, &builtin::tone_generator_descriptor(), 0.2, 0.2);
        let gain = add(&mut graph, &builtin::gain_descriptor(), 0.6, 0.2);
        graph.connect(Pin::new(tone, 0), Pin::new(gain, 0)).unwrap();
        graph.get_or_create_window(tone, WindowKind::GenericParams, &[]);

        graph.remove_node(tone);
        assert!(graph.node(tone).is_none());
        assert!(graph.connections().is_empty());
        assert!(graph.windows().is_empty());

        // unknown node again: no-op
        graph.remove_node(tone);
        assert_eq!(graph.nodes().len(), 1);
    }

    #[test]
    fn at_most_one_window_per_node_and_kind() {
        let mut graph = graph();
        let gain = add(&mut graph, &builtin::gain_descriptor(), 0.5, 0.5);
        let first = graph.get_or_create_window(gain, WindowKind::GenericParams, &[]);
        let again = graph.get_or_create_window(gain, WindowKind::GenericParams, &[]);
        let programs = graph.get_or_create_window(gain, WindowKind::Programs, &[]);

        assert_eq!(first, again);
        assert_ne!(first, programs);
        assert_eq!(graph.windows().len(), 2);
        assert_eq!(
            graph.get_or_create_window(NodeId(99), WindowKind::Editor, &[]),
            None
        );
    }

    #[test]
    fn close_all_windows_reports_whether_any_were_open() {
        let mut graph = graph();
        let gain = add(&mut graph, &builtin::gain_descriptor(), 0.5, 0.5);
        assert!(!graph.close_all_windows());

        graph.get_or_create_window(gain, WindowKind::GenericParams, &[]);
        graph.get_or_create_window(gain, WindowKind::Debug, &[]);
        assert!(graph.close_all_windows());
        assert!(graph.windows().is_empty());
        assert!(!graph.close_all_windows());
    }

    #[test]
    fn window_bounds_survive_close_and_reopen() {
        let displays = [Rect::new(0.0, 0.0, 1920.0, 1080.0)];
        let mut graph = graph();
        let gain = add(&mut graph, &builtin::gain_descriptor(), 0.5, 0.5);

        let id = graph
            .get_or_create_window(gain, WindowKind::GenericParams, &displays)
            .unwrap();
        let moved = Rect::new(640.0, 320.0, 500.0, 400.0);
        graph.set_window_bounds(id, moved);
        graph.close_window(id);

        let reopened = graph
            .get_or_create_window(gain, WindowKind::GenericParams, &displays)
            .unwrap();
        assert_eq!(graph.window(reopened).unwrap().bounds, moved);
    }

    #[test]
    fn new_windows_land_on_a_display() {
        let displays = [Rect::new(0.0, 0.0, 1920.0, 1080.0)];
        let mut graph = graph();
        let gain = add(&mut graph, &builtin::gain_descriptor(), 0.9, 0.9);
        let id = graph
            .get_or_create_window(gain, WindowKind::GenericParams, &displays)
            .unwrap();
        assert!(graph.window(id).unwrap().bounds.intersects(&displays[0]));
    }

    #[test]
    fn mutations_set_the_dirty_flag() {
        let mut graph = graph();
        assert!(!graph.has_changed());
        add(&mut graph, &builtin::gain_descriptor(), 0.5, 0.5);
        assert!(graph.has_changed());
    }

    #[test]
    fn title_is_unnamed_before_the_first_save() {
        assert_eq!(graph().title(), "Unnamed");
    }

    #[test]
    fn a_new_document_is_untitled_and_clean() {
        let mut graph = graph();
        add(&mut graph, &builtin::gain_descriptor(), 0.5, 0.5);
        graph.file_path = Some(PathBuf::from("/patches/old.filtergraph"));

        graph.new_document();
        assert!(graph.nodes().is_empty());
        assert!(!graph.has_changed());
        assert_eq!(graph.title(), "Unnamed");
    }
}
