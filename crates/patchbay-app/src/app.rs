use std::path::{Path, PathBuf};
use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, Sender};
use eframe::egui::{self, RichText};
use tracing::{debug, warn};

use patchbay_catalog::{CatalogStore, KnownPlugins};
use patchbay_graph::{
    NodeId, PatchGraph, Pin, Point, Rect as ModelRect, WindowKind, GRAPH_FILE_EXTENSION,
};
use patchbay_host::{builtin, builtin_descriptors, FormatManager};
use patchbay_ui::{BubbleMessage, SnapGrid};

use crate::canvas::{canvas_ui, CanvasState};
use crate::commands::Command;
use crate::config::AppConfig;
use crate::plugin_windows;

/// Fresh document backed by the builtin plugin format.
pub(crate) fn blank_document(with_session_log: bool) -> PatchGraph {
    let mut document = PatchGraph::new(FormatManager::with_default_formats());
    if with_session_log {
        document.ensure_session_log();
    }
    document
}

/// Starter layout every new patch opens with: I/O endpoints parked at the
/// edges, ready for wiring.
pub(crate) fn seed_default_patch(document: &mut PatchGraph) {
    for (descriptor, x, y) in [
        (builtin::audio_input_descriptor(), 0.25, 0.1),
        (builtin::midi_input_descriptor(), 0.75, 0.1),
        (builtin::audio_output_descriptor(), 0.5, 0.9),
    ] {
        document.add_plugin(&descriptor, Point::new(x, y));
    }
    for message in document.pump_instantiations() {
        warn!(%message, "builtin endpoint failed to instantiate");
    }
    document.mark_unchanged();
}

/// Cascade for menu-added plugins so they do not stack on one spot.
fn drop_position(added_so_far: usize) -> Point {
    let step = (added_so_far % 8) as f64;
    Point::new(0.3 + step * 0.05, 0.3 + step * 0.05)
}

/// One rect per display. egui only reports the monitor hosting the window,
/// so this is at most one entry.
fn displays_from(ctx: &egui::Context) -> Vec<ModelRect> {
    ctx.input(|i| i.viewport().monitor_size)
        .map(|size| vec![ModelRect::new(0.0, 0.0, size.x, size.y)])
        .unwrap_or_default()
}

/// Opens the on-disk plugin catalog and merges in the builtin descriptors so
/// they are always available. A missing config dir degrades to a
/// session-only catalog.
fn load_catalog() -> KnownPlugins {
    let store = match CatalogStore::default_path().and_then(CatalogStore::open) {
        Ok(store) => Some(store),
        Err(err) => {
            warn!(%err, "plugin catalog unavailable, using a session-only list");
            None
        }
    };

    let mut catalog = store.as_ref().map(CatalogStore::load).unwrap_or_default();
    let mut changed = false;
    for descriptor in builtin_descriptors() {
        changed |= catalog.add(descriptor);
    }

    if changed {
        if let Some(store) = &store {
            if let Err(err) = store.save(&catalog) {
                warn!(%err, "could not save the plugin catalog");
            }
        }
    }
    catalog
}

/// Action put on hold while the unsaved-changes prompt is up.
#[derive(Debug, Clone)]
enum PendingAction {
    NewPatch,
    OpenPatch,
    OpenPatchFile(PathBuf),
    Quit,
}

#[derive(Debug, Clone, Copy)]
enum PromptChoice {
    Save,
    Discard,
    Cancel,
}

pub struct PatchbayApp {
    document: PatchGraph,
    catalog: KnownPlugins,
    config: AppConfig,
    grid: SnapGrid,
    canvas: CanvasState,
    command_tx: Sender<Command>,
    command_rx: Receiver<Command>,
    bubble: Option<BubbleMessage>,
    pending: Option<PendingAction>,
    reopen_queue: Vec<(NodeId, WindowKind)>,
    window_title: String,
    added_plugins: usize,
    quitting: bool,
}

impl PatchbayApp {
    pub fn new(
        _cc: &eframe::CreationContext<'_>,
        startup_document: Option<PathBuf>,
        with_session_log: bool,
    ) -> Self {
        let (command_tx, command_rx) = unbounded();
        let catalog = load_catalog();
        let config = AppConfig::load();

        let mut document = blank_document(with_session_log);
        let mut reopen_queue = Vec::new();
        match startup_document.or_else(|| config.last_document.clone()) {
            Some(path) => match document.load_from(&path) {
                Ok(report) => {
                    for name in &report.skipped_plugins {
                        warn!(plugin = %name, "plugin unavailable, node skipped");
                    }
                    reopen_queue = report.reopen_windows;
                }
                Err(err) => {
                    warn!(%err, path = %path.display(), "could not open patch, starting fresh");
                    seed_default_patch(&mut document);
                }
            },
            None => seed_default_patch(&mut document),
        }

        Self {
            document,
            catalog,
            config,
            grid: SnapGrid::new(),
            canvas: CanvasState::default(),
            command_tx,
            command_rx,
            bubble: None,
            pending: None,
            reopen_queue,
            window_title: String::new(),
            added_plugins: 0,
            quitting: false,
        }
    }

    fn process_commands(&mut self, ctx: &egui::Context) {
        while let Ok(command) = self.command_rx.try_recv() {
            self.handle_command(command, ctx);
        }
    }

    fn handle_command(&mut self, command: Command, ctx: &egui::Context) {
        debug!(%command, "handling command");
        match command {
            Command::NewPatch => {
                if self.document.has_changed() {
                    self.pending = Some(PendingAction::NewPatch);
                } else {
                    self.new_patch();
                }
            }
            Command::OpenPatch => {
                if self.document.has_changed() {
                    self.pending = Some(PendingAction::OpenPatch);
                } else {
                    self.open_dialog(ctx);
                }
            }
            Command::OpenPatchFile(path) => {
                if self.document.has_changed() {
                    self.pending = Some(PendingAction::OpenPatchFile(path));
                } else {
                    self.open_file(&path, ctx);
                }
            }
            Command::SavePatch => {
                self.save(ctx);
            }
            Command::SavePatchAs => {
                self.save_as(ctx);
            }
            Command::Quit => {
                if self.document.has_changed() {
                    self.pending = Some(PendingAction::Quit);
                } else {
                    self.quit(ctx);
                }
            }
            Command::AddPlugin(descriptor) => {
                let position = self.next_drop_position();
                self.document.add_plugin(&descriptor, position);
            }
            Command::RemoveNode(id) => self.document.remove_node(id),
            Command::ConnectStereo { from, to } => self.connect_stereo(from, to, ctx),
            Command::ConnectMidi { from, to } => {
                if let Err(err) = self.document.connect(Pin::midi(from), Pin::midi(to)) {
                    self.show_bubble(ctx, format!("Cannot connect: {err}"));
                }
            }
            Command::DisconnectNode(id) => self.disconnect_node(id),
            Command::OpenWindow(node, kind) => {
                let displays = displays_from(ctx);
                self.document.get_or_create_window(node, kind, &displays);
            }
        }
    }

    fn new_patch(&mut self) {
        self.document.new_document();
        seed_default_patch(&mut self.document);
    }

    fn open_dialog(&mut self, ctx: &egui::Context) {
        let mut dialog =
            rfd::FileDialog::new().add_filter("Patchbay patch", &[GRAPH_FILE_EXTENSION]);
        if let Some(dir) = self.config.last_document.as_deref().and_then(Path::parent) {
            dialog = dialog.set_directory(dir);
        }
        if let Some(path) = dialog.pick_file() {
            self.open_file(&path, ctx);
        }
    }

    fn open_file(&mut self, path: &Path, ctx: &egui::Context) {
        match self.document.load_from(path) {
            Ok(report) => {
                if !report.skipped_plugins.is_empty() {
                    for name in &report.skipped_plugins {
                        warn!(plugin = %name, "plugin unavailable, node skipped");
                    }
                    self.show_bubble(
                        ctx,
                        format!(
                            "Skipped {} unavailable plugin(s)",
                            report.skipped_plugins.len()
                        ),
                    );
                }
                self.reopen_queue = report.reopen_windows;
                self.remember_document(path);
            }
            Err(err) => {
                warn!(%err, path = %path.display(), "could not open patch");
                self.show_bubble(ctx, format!("Could not open patch: {err}"));
            }
        }
    }

    /// Returns whether the document actually hit disk.
    fn save(&mut self, ctx: &egui::Context) -> bool {
        match self.document.file_path().map(Path::to_path_buf) {
            Some(path) => self.save_to_path(&path, ctx),
            None => self.save_as(ctx),
        }
    }

    fn save_as(&mut self, ctx: &egui::Context) -> bool {
        let mut dialog = rfd::FileDialog::new()
            .add_filter("Patchbay patch", &[GRAPH_FILE_EXTENSION])
            .set_file_name(format!("{}.{}", self.document.title(), GRAPH_FILE_EXTENSION));
        if let Some(dir) = self.config.last_document.as_deref().and_then(Path::parent) {
            dialog = dialog.set_directory(dir);
        }
        match dialog.save_file() {
            Some(path) => self.save_to_path(&path, ctx),
            None => false,
        }
    }

    fn save_to_path(&mut self, path: &Path, ctx: &egui::Context) -> bool {
        match self.document.save_to(path) {
            Ok(()) => {
                self.remember_document(path);
                self.show_bubble(ctx, format!("Saved {}", self.document.title()));
                true
            }
            Err(err) => {
                warn!(%err, path = %path.display(), "save failed");
                self.show_bubble(ctx, format!("Save failed: {err}"));
                false
            }
        }
    }

    fn remember_document(&mut self, path: &Path) {
        self.config.remember_document(path);
        if let Err(err) = self.config.save() {
            warn!(%err, "could not save app config");
        }
    }

    fn quit(&mut self, ctx: &egui::Context) {
        self.quitting = true;
        ctx.send_viewport_cmd(egui::ViewportCommand::Close);
    }

    /// Wires channels 0 and 1 between two nodes, tolerating mono endpoints.
    fn connect_stereo(&mut self, from: NodeId, to: NodeId, ctx: &egui::Context) {
        let mut connected = 0;
        let mut last_error = None;
        for channel in 0..2 {
            match self
                .document
                .connect(Pin::new(from, channel), Pin::new(to, channel))
            {
                Ok(()) => connected += 1,
                Err(err) => last_error = Some(err),
            }
        }
        if connected == 0 {
            if let Some(err) = last_error {
                self.show_bubble(ctx, format!("Cannot connect: {err}"));
            }
        }
    }

    fn disconnect_node(&mut self, id: NodeId) {
        let touching: Vec<_> = self
            .document
            .connections()
            .iter()
            .copied()
            .filter(|connection| connection.from.node == id || connection.to.node == id)
            .collect();
        for connection in touching {
            let _ = self.document.disconnect(connection.from, connection.to);
        }
    }

    fn next_drop_position(&mut self) -> Point {
        let position = drop_position(self.added_plugins);
        self.added_plugins += 1;
        position
    }

    fn show_bubble(&mut self, ctx: &egui::Context, text: String) {
        let screen = ctx.screen_rect();
        let target = egui::Rect::from_center_size(
            egui::pos2(screen.center().x, screen.top() + 40.0),
            egui::vec2(1.0, 1.0),
        );
        self.bubble = Some(BubbleMessage::new(text, target).for_duration(Duration::from_secs(3)));
    }

    /// Reopens the windows a loaded patch had at save time.
    fn reopen_queued_windows(&mut self, ctx: &egui::Context) {
        if self.reopen_queue.is_empty() {
            return;
        }
        let displays = displays_from(ctx);
        for (node, kind) in std::mem::take(&mut self.reopen_queue) {
            self.document.get_or_create_window(node, kind, &displays);
        }
    }

    fn refresh_window_title(&mut self, ctx: &egui::Context) {
        let marker = if self.document.has_changed() { "*" } else { "" };
        let title = format!("{}{marker} - Patchbay", self.document.title());
        if self.window_title != title {
            ctx.send_viewport_cmd(egui::ViewportCommand::Title(title.clone()));
            self.window_title = title;
        }
    }

    /// Intercepts the window close button while unsaved changes exist.
    fn handle_close_request(&mut self, ctx: &egui::Context) {
        if !ctx.input(|i| i.viewport().close_requested()) {
            return;
        }
        if !self.quitting && self.document.has_changed() {
            ctx.send_viewport_cmd(egui::ViewportCommand::CancelClose);
            self.pending = Some(PendingAction::Quit);
        }
    }

    fn keyboard_shortcuts(&mut self, ctx: &egui::Context) {
        use egui::{Key, KeyboardShortcut, Modifiers};
        const NEW: KeyboardShortcut = KeyboardShortcut::new(Modifiers::COMMAND, Key::N);
        const OPEN: KeyboardShortcut = KeyboardShortcut::new(Modifiers::COMMAND, Key::O);
        const SAVE: KeyboardShortcut = KeyboardShortcut::new(Modifiers::COMMAND, Key::S);
        const SAVE_AS: KeyboardShortcut =
            KeyboardShortcut::new(Modifiers::COMMAND.plus(Modifiers::SHIFT), Key::S);

        let send = |command: Command| {
            let _ = self.command_tx.send(command);
        };
        if ctx.input_mut(|i| i.consume_shortcut(&SAVE_AS)) {
            send(Command::SavePatchAs);
        }
        if ctx.input_mut(|i| i.consume_shortcut(&SAVE)) {
            send(Command::SavePatch);
        }
        if ctx.input_mut(|i| i.consume_shortcut(&OPEN)) {
            send(Command::OpenPatch);
        }
        if ctx.input_mut(|i| i.consume_shortcut(&NEW)) {
            send(Command::NewPatch);
        }
    }

    fn menu_bar(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("menu_bar").show(ctx, |ui| {
            egui::menu::bar(ui, |ui| {
                ui.add_space(6.0);
                ui.label(RichText::new("Patchbay").strong().size(16.0));
                ui.add_space(18.0);
                self.file_menu(ui);
                self.view_menu(ui);
                self.plugins_menu(ui);
            });
        });
    }

    fn file_menu(&mut self, ui: &mut egui::Ui) {
        ui.menu_button("File", |ui| {
            if ui.button("New").clicked() {
                let _ = self.command_tx.send(Command::NewPatch);
                ui.close_menu();
            }
            if ui.button("Open…").clicked() {
                let _ = self.command_tx.send(Command::OpenPatch);
                ui.close_menu();
            }
            ui.menu_button("Open Recent", |ui| {
                if self.config.recent.is_empty() {
                    ui.label(RichText::new("No recent patches").italics());
                } else {
                    for path in &self.config.recent {
                        let label = path
                            .file_name()
                            .and_then(|name| name.to_str().map(|name| name.to_owned()))
                            .unwrap_or_else(|| path.to_string_lossy().into_owned());
                        if ui.button(label).clicked() {
                            let _ = self.command_tx.send(Command::OpenPatchFile(path.clone()));
                            ui.close_menu();
                        }
                    }
                }
            });
            ui.separator();
            if ui.button("Save").clicked() {
                let _ = self.command_tx.send(Command::SavePatch);
                ui.close_menu();
            }
            if ui.button("Save As…").clicked() {
                let _ = self.command_tx.send(Command::SavePatchAs);
                ui.close_menu();
            }
            ui.separator();
            if ui.button("Quit").clicked() {
                let _ = self.command_tx.send(Command::Quit);
                ui.close_menu();
            }
        });
    }

    fn view_menu(&mut self, ui: &mut egui::Ui) {
        ui.menu_button("View", |ui| {
            ui.checkbox(&mut self.document.grid.shown, "Show grid");
            ui.checkbox(&mut self.document.grid.active, "Snap to grid");
            ui.add(egui::Slider::new(&mut self.document.grid.size, 2..=64).text("Grid size"));
        });
    }

    fn plugins_menu(&mut self, ui: &mut egui::Ui) {
        ui.menu_button("Plugins", |ui| {
            for descriptor in self.catalog.sorted_by_name() {
                if ui.button(&descriptor.name).clicked() {
                    let _ = self.command_tx.send(Command::AddPlugin(descriptor));
                    ui.close_menu();
                }
            }
        });
    }

    fn canvas_panel(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default().show(ctx, |ui| {
            canvas_ui(
                ui,
                &mut self.document,
                &mut self.grid,
                &mut self.canvas,
                &self.command_tx,
            );
        });
    }

    fn pump_document(&mut self, ctx: &egui::Context) {
        for message in self.document.pump_instantiations() {
            self.show_bubble(ctx, format!("Could not create plugin: {message}"));
        }
    }

    fn unsaved_changes_prompt(&mut self, ctx: &egui::Context) {
        let Some(action) = self.pending.clone() else {
            return;
        };

        let mut choice = None;
        egui::Window::new("Unsaved changes")
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, egui::Vec2::ZERO)
            .show(ctx, |ui| {
                ui.label(format!(
                    "Save changes to \"{}\" before continuing?",
                    self.document.title()
                ));
                ui.add_space(8.0);
                ui.horizontal(|ui| {
                    if ui.button("Save").clicked() {
                        choice = Some(PromptChoice::Save);
                    }
                    if ui.button("Discard").clicked() {
                        choice = Some(PromptChoice::Discard);
                    }
                    if ui.button("Cancel").clicked() {
                        choice = Some(PromptChoice::Cancel);
                    }
                });
            });

        match choice {
            Some(PromptChoice::Save) => {
                // a cancelled or failed save keeps the prompt up
                if self.save(ctx) {
                    self.pending = None;
                    self.run_pending(action, ctx);
                }
            }
            Some(PromptChoice::Discard) => {
                self.pending = None;
                self.run_pending(action, ctx);
            }
            Some(PromptChoice::Cancel) => self.pending = None,
            None => {}
        }
    }

    fn run_pending(&mut self, action: PendingAction, ctx: &egui::Context) {
        match action {
            PendingAction::NewPatch => self.new_patch(),
            PendingAction::OpenPatch => self.open_dialog(ctx),
            PendingAction::OpenPatchFile(path) => self.open_file(&path, ctx),
            PendingAction::Quit => self.quit(ctx),
        }
    }
}

impl eframe::App for PatchbayApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.reopen_queued_windows(ctx);
        self.pump_document(ctx);
        self.keyboard_shortcuts(ctx);
        self.process_commands(ctx);
        self.handle_close_request(ctx);
        self.refresh_window_title(ctx);

        self.menu_bar(ctx);
        self.canvas_panel(ctx);
        plugin_windows::show(ctx, &mut self.document);
        self.unsaved_changes_prompt(ctx);

        if let Some(bubble) = &mut self.bubble {
            bubble.show(ctx);
            if bubble.finished() {
                self.bubble = None;
            }
        }
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        self.document.close_session_log();
        if let Err(err) = self.config.save() {
            warn!(%err, "could not save app config");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starter_patch_has_io_endpoints_and_is_clean() {
        let mut document = blank_document(false);
        seed_default_patch(&mut document);
        assert_eq!(document.nodes().len(), 3);
        assert!(!document.has_changed());
    }

    #[test]
    fn starter_patch_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("starter.filtergraph");

        let mut document = blank_document(false);
        seed_default_patch(&mut document);
        document.save_to(&path).unwrap();

        let mut reloaded = blank_document(false);
        let report = reloaded.load_from(&path).unwrap();
        assert!(report.skipped_plugins.is_empty());
        assert_eq!(reloaded.nodes().len(), document.nodes().len());
    }

    #[test]
    fn menu_added_plugins_cascade_then_wrap() {
        assert_eq!(drop_position(0), Point::new(0.3, 0.3));
        assert!(drop_position(1).x > drop_position(0).x);
        assert_eq!(drop_position(8), drop_position(0));
    }
}
