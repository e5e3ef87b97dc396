use std::collections::HashMap;

use crossbeam_channel::Sender;
use eframe::egui::{self, Align2, Color32, FontId, Pos2, Rect, Sense, Stroke, Vec2};

use patchbay_graph::{NodeId, PatchGraph, Pin, Point, RelativeRect, WindowKind};
use patchbay_host::PluginInstance;
use patchbay_ui::{HandleAnchor, PointHandle, SnapGrid};

use crate::commands::Command;

const NODE_WIDTH: f32 = 140.0;
const NODE_HEIGHT: f32 = 56.0;
const PIN_RADIUS: f32 = 4.0;
const AUDIO_PIN_COLOR: Color32 = Color32::from_rgb(96, 176, 88);
const MIDI_PIN_COLOR: Color32 = Color32::from_rgb(200, 88, 88);

/// Per-session canvas state: the node being dragged and the precision
/// handles riding each node.
#[derive(Debug, Default)]
pub struct CanvasState {
    drag: Option<DragState>,
    handles: HashMap<NodeId, PointHandle>,
}

#[derive(Debug)]
struct DragState {
    node: NodeId,
    grab_offset: Vec2,
}

/// The patch canvas: grid, connections, and one box per node.
pub fn canvas_ui(
    ui: &mut egui::Ui,
    document: &mut PatchGraph,
    grid: &mut SnapGrid,
    state: &mut CanvasState,
    commands: &Sender<Command>,
) {
    let (area, _response) = ui.allocate_exact_size(ui.available_size(), Sense::click());
    let painter = ui.painter_at(area);
    let background = ui.visuals().extreme_bg_color;
    painter.rect_filled(area, 0.0, background);

    grid.update_from(&document.grid);
    grid.paint(&painter, area, Some(background));

    draw_connections(&painter, document, area);

    state.handles.retain(|id, _| document.node(*id).is_some());
    let ids: Vec<NodeId> = document.nodes().iter().map(|node| node.id).collect();
    for id in ids {
        node_ui(ui, document, state, commands, area, id);
    }
}

fn node_ui(
    ui: &mut egui::Ui,
    document: &mut PatchGraph,
    state: &mut CanvasState,
    commands: &Sender<Command>,
    area: Rect,
    id: NodeId,
) {
    let rect = node_rect(document.node_position(id), area);
    let response = ui.interact(rect, ui.id().with(("node", id.0)), Sense::click_and_drag());

    if response.drag_started() {
        if let Some(pointer) = ui.input(|i| i.pointer.interact_pos()) {
            state.drag = Some(DragState {
                node: id,
                grab_offset: pointer - rect.center(),
            });
        }
    }
    if response.dragged() {
        let pointer = ui.input(|i| i.pointer.interact_pos());
        if let (Some(drag), Some(pointer)) = (state.drag.as_ref(), pointer) {
            if drag.node == id {
                let target = pointer - drag.grab_offset;
                let snapped = Pos2::new(
                    document.grid.snap_position(f64::from(target.x - area.left())) as f32
                        + area.left(),
                    document.grid.snap_position(f64::from(target.y - area.top())) as f32
                        + area.top(),
                );
                move_node_to(document, id, snapped, area);
            }
        }
    }
    if response.drag_stopped() {
        state.drag = None;
    }

    if response.double_clicked() {
        let _ = commands.send(Command::OpenWindow(id, preferred_window_kind(document, id)));
    }

    draw_node(ui, document, rect, id, response.hovered());

    let grid_settings = document.grid;
    let handle = state.handles.entry(id).or_default();
    let mut anchor = NodeAnchor {
        document: &mut *document,
        node: id,
    };
    handle.ui(ui, &mut anchor, area, &grid_settings);

    response.context_menu(|ui| node_context_menu(ui, document, commands, id));
}

/// Bridges a node's fractional canvas position into the handle widget.
struct NodeAnchor<'a> {
    document: &'a mut PatchGraph,
    node: NodeId,
}

impl HandleAnchor for NodeAnchor<'_> {
    fn position(&self) -> RelativeRect {
        let position = self.document.node_position(self.node);
        RelativeRect::new(position.x, position.y, 0.0, 0.0)
    }

    fn set_position(&mut self, position: RelativeRect) {
        self.document
            .set_node_position(self.node, Point::new(position.x, position.y));
    }
}

fn move_node_to(document: &mut PatchGraph, id: NodeId, centre: Pos2, area: Rect) {
    if area.width() <= 0.0 || area.height() <= 0.0 {
        return;
    }
    let fraction = Point::new(
        f64::from(centre.x - area.left()) / f64::from(area.width()),
        f64::from(centre.y - area.top()) / f64::from(area.height()),
    );
    if fraction != document.node_position(id) {
        document.set_node_position(id, fraction);
    }
}

fn preferred_window_kind(document: &PatchGraph, id: NodeId) -> WindowKind {
    let has_editor = document
        .node(id)
        .map(|node| node.instance().has_editor())
        .unwrap_or(false);
    if has_editor {
        WindowKind::Editor
    } else {
        WindowKind::GenericParams
    }
}

fn node_context_menu(
    ui: &mut egui::Ui,
    document: &PatchGraph,
    commands: &Sender<Command>,
    id: NodeId,
) {
    if ui.button("Open editor").clicked() {
        let _ = commands.send(Command::OpenWindow(id, preferred_window_kind(document, id)));
        ui.close_menu();
    }
    if ui.button("Show parameters").clicked() {
        let _ = commands.send(Command::OpenWindow(id, WindowKind::GenericParams));
        ui.close_menu();
    }
    if ui.button("Show programs").clicked() {
        let _ = commands.send(Command::OpenWindow(id, WindowKind::Programs));
        ui.close_menu();
    }
    if ui.button("Show debug info").clicked() {
        let _ = commands.send(Command::OpenWindow(id, WindowKind::Debug));
        ui.close_menu();
    }
    ui.separator();
    ui.menu_button("Connect to", |ui| {
        let others: Vec<(NodeId, String)> = document
            .nodes()
            .iter()
            .filter(|node| node.id != id)
            .map(|node| (node.id, node.descriptor.name.clone()))
            .collect();
        if others.is_empty() {
            ui.label("No other nodes");
        }
        for (other, name) in others {
            ui.menu_button(name, |ui| {
                if ui.button("Audio (stereo)").clicked() {
                    let _ = commands.send(Command::ConnectStereo {
                        from: id,
                        to: other,
                    });
                    ui.close_menu();
                }
                if ui.button("MIDI").clicked() {
                    let _ = commands.send(Command::ConnectMidi {
                        from: id,
                        to: other,
                    });
                    ui.close_menu();
                }
            });
        }
    });
    if ui.button("Disconnect all").clicked() {
        let _ = commands.send(Command::DisconnectNode(id));
        ui.close_menu();
    }
    ui.separator();
    if ui.button("Remove").clicked() {
        let _ = commands.send(Command::RemoveNode(id));
        ui.close_menu();
    }
}

fn draw_node(ui: &egui::Ui, document: &PatchGraph, rect: Rect, id: NodeId, hovered: bool) {
    let Some(node) = document.node(id) else {
        return;
    };
    let painter = ui.painter();
    let visuals = ui.visuals();
    let fill = if hovered {
        visuals.widgets.hovered.bg_fill
    } else {
        visuals.widgets.inactive.bg_fill
    };
    painter.rect(rect, 6.0, fill, visuals.widgets.active.bg_stroke);
    painter.text(
        rect.center(),
        Align2::CENTER_CENTER,
        &node.descriptor.name,
        FontId::proportional(13.0),
        visuals.text_color(),
    );

    for position in audio_pin_positions(node.descriptor.num_input_channels, rect, true) {
        painter.circle_filled(position, PIN_RADIUS, AUDIO_PIN_COLOR);
    }
    for position in audio_pin_positions(node.descriptor.num_output_channels, rect, false) {
        painter.circle_filled(position, PIN_RADIUS, AUDIO_PIN_COLOR);
    }
    painter.circle_filled(midi_pin_position(rect, true), PIN_RADIUS, MIDI_PIN_COLOR);
    painter.circle_filled(midi_pin_position(rect, false), PIN_RADIUS, MIDI_PIN_COLOR);
}

fn draw_connections(painter: &egui::Painter, document: &PatchGraph, area: Rect) {
    for connection in document.connections() {
        let Some(from) = pin_screen_position(document, area, connection.from, false) else {
            continue;
        };
        let Some(to) = pin_screen_position(document, area, connection.to, true) else {
            continue;
        };
        let color = if connection.from.is_midi() {
            MIDI_PIN_COLOR
        } else {
            AUDIO_PIN_COLOR
        };
        painter.line_segment([from, to], Stroke::new(2.0, color));
    }
}

fn pin_screen_position(document: &PatchGraph, area: Rect, pin: Pin, input: bool) -> Option<Pos2> {
    let node = document.node(pin.node)?;
    let rect = node_rect(node.position(), area);
    if pin.is_midi() {
        return Some(midi_pin_position(rect, input));
    }
    let count = if input {
        node.descriptor.num_input_channels
    } else {
        node.descriptor.num_output_channels
    };
    Some(
        audio_pin_positions(count, rect, input)
            .get(pin.channel as usize)
            .copied()
            .unwrap_or(if input {
                rect.center_top()
            } else {
                rect.center_bottom()
            }),
    )
}

fn node_rect(position: Point, area: Rect) -> Rect {
    let centre = Pos2::new(
        area.left() + position.x as f32 * area.width(),
        area.top() + position.y as f32 * area.height(),
    );
    Rect::from_center_size(centre, egui::vec2(NODE_WIDTH, NODE_HEIGHT))
}

/// Audio pins spread across the left portion of an edge; the right corner
/// is reserved for the MIDI pin.
fn audio_pin_positions(count: u32, rect: Rect, input: bool) -> Vec<Pos2> {
    let y = if input { rect.top() } else { rect.bottom() };
    (0..count)
        .map(|index| {
            let t = (index as f32 + 1.0) / (count as f32 + 1.0);
            Pos2::new(rect.left() + t * rect.width() * 0.8, y)
        })
        .collect()
}

fn midi_pin_position(rect: Rect, input: bool) -> Pos2 {
    let y = if input { rect.top() } else { rect.bottom() };
    Pos2::new(rect.right() - rect.width() * 0.08, y)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_rect_centres_on_the_fractional_position() {
        let area = Rect::from_min_size(Pos2::new(100.0, 50.0), egui::vec2(800.0, 600.0));
        let rect = node_rect(Point::new(0.5, 0.5), area);
        assert_eq!(rect.center(), Pos2::new(500.0, 350.0));
        assert_eq!(rect.width(), NODE_WIDTH);
    }

    #[test]
    fn audio_pins_spread_left_of_the_midi_pin() {
        let rect = Rect::from_min_size(Pos2::ZERO, egui::vec2(100.0, 50.0));
        let pins = audio_pin_positions(2, rect, true);
        assert_eq!(pins.len(), 2);
        assert!(pins[0].x < pins[1].x);
        assert!(pins[1].x < midi_pin_position(rect, true).x);
        assert_eq!(pins[0].y, rect.top());
    }

    #[test]
    fn output_pins_sit_on_the_bottom_edge() {
        let rect = Rect::from_min_size(Pos2::ZERO, egui::vec2(100.0, 50.0));
        assert_eq!(audio_pin_positions(1, rect, false)[0].y, rect.bottom());
        assert_eq!(midi_pin_position(rect, false).y, rect.bottom());
    }
}
