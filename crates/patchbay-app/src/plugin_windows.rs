use eframe::egui::{self, ViewportId};

use patchbay_graph::{NodeId, PatchGraph, PatchNode, Rect as ModelRect, WindowId, WindowKind};
use patchbay_host::PluginInstance;
use patchbay_ui::{GroupFrame, LabelJustify};

/// Shows every window the document holds open as an immediate viewport,
/// folding live bounds back into the document and dropping windows whose
/// viewport was dismissed.
pub fn show(ctx: &egui::Context, document: &mut PatchGraph) {
    let windows: Vec<(WindowId, NodeId, WindowKind, ModelRect)> = document
        .windows()
        .iter()
        .map(|window| (window.id, window.node, window.kind, window.bounds))
        .collect();

    let mut closed = Vec::new();
    for (id, node, kind, bounds) in windows {
        let Some(name) = document.node(node).map(|n| n.descriptor.name.clone()) else {
            closed.push(id);
            continue;
        };
        let viewport = ViewportId::from_hash_of(("patchbay-window", node.0, kind));
        let builder = egui::ViewportBuilder::default()
            .with_title(window_title(&name, kind))
            .with_position([bounds.x, bounds.y])
            .with_inner_size([bounds.w, bounds.h]);

        ctx.show_viewport_immediate(viewport, builder, |ctx, _class| {
            egui::CentralPanel::default().show(ctx, |ui| {
                window_contents(ui, document, node, kind);
            });

            let info = ctx.input(|i| (i.viewport().outer_rect, i.viewport().inner_rect));
            if let (Some(outer), Some(inner)) = info {
                let live = ModelRect::new(outer.left(), outer.top(), inner.width(), inner.height());
                if live != bounds {
                    document.set_window_bounds(id, live);
                }
            }
            if ctx.input(|i| i.viewport().close_requested()) {
                closed.push(id);
            }
        });
    }

    for id in closed {
        document.close_window(id);
    }
}

fn window_title(name: &str, kind: WindowKind) -> String {
    match kind {
        WindowKind::Editor => name.to_string(),
        WindowKind::GenericParams => format!("{name} - Parameters"),
        WindowKind::Programs => format!("{name} - Programs"),
        WindowKind::Debug => format!("{name} - Debug"),
    }
}

fn window_contents(ui: &mut egui::Ui, document: &mut PatchGraph, node: NodeId, kind: WindowKind) {
    let Some(patch_node) = document.node_mut(node) else {
        ui.label("This node is no longer part of the patch.");
        return;
    };
    let changed = match kind {
        WindowKind::Editor => editor_panel(ui, patch_node),
        WindowKind::GenericParams => params_panel(ui, patch_node),
        WindowKind::Programs => programs_panel(ui, patch_node),
        WindowKind::Debug => {
            debug_panel(ui, patch_node);
            false
        }
    };
    if changed {
        document.mark_changed();
    }
}

/// Stand-in editor surface for plugins that claim one: the generic
/// parameter panel wrapped in a titled frame.
fn editor_panel(ui: &mut egui::Ui, node: &mut PatchNode) -> bool {
    let name = node.descriptor.name.clone();
    GroupFrame::new(&name)
        .justify(LabelJustify::Centre)
        .show(ui, |ui| params_panel(ui, node))
        .inner
}

fn params_panel(ui: &mut egui::Ui, node: &mut PatchNode) -> bool {
    let mut changed = false;

    if node.instance().parameters().is_empty() {
        ui.label("This plugin has no parameters.");
    }

    let mut edits = Vec::new();
    for (index, param) in node.instance().parameters().iter().enumerate() {
        let mut value = param.value;
        let response =
            ui.add(egui::Slider::new(&mut value, param.min..=param.max).text(&param.name));
        if response.changed() {
            edits.push((index, value));
        }
    }
    for (index, value) in edits {
        node.instance_mut().set_parameter(index, value);
        changed = true;
    }

    let programs = node.instance().programs().to_vec();
    if !programs.is_empty() {
        let before = node.instance().current_program();
        let mut current = before;
        egui::ComboBox::from_label("Program")
            .selected_text(programs.get(current).cloned().unwrap_or_default())
            .show_ui(ui, |ui| {
                for (index, name) in programs.iter().enumerate() {
                    ui.selectable_value(&mut current, index, name);
                }
            });
        if current != before {
            node.instance_mut().set_current_program(current);
            changed = true;
        }
    }

    changed
}

fn programs_panel(ui: &mut egui::Ui, node: &mut PatchNode) -> bool {
    let programs = node.instance().programs().to_vec();
    if programs.is_empty() {
        ui.label("This plugin has no programs.");
        return false;
    }

    let before = node.instance().current_program();
    let mut selected = before;
    for (index, name) in programs.iter().enumerate() {
        if ui.selectable_label(index == selected, name).clicked() {
            selected = index;
        }
    }
    if selected != before {
        node.instance_mut().set_current_program(selected);
        return true;
    }
    false
}

fn debug_panel(ui: &mut egui::Ui, node: &PatchNode) {
    ui.monospace(node.descriptor.identifier_string());
    ui.monospace(format!("uid: {:08x}", node.descriptor.uid));
    ui.monospace(format!(
        "channels: {} in / {} out",
        node.descriptor.num_input_channels, node.descriptor.num_output_channels
    ));
    ui.separator();
    for param in node.instance().parameters() {
        ui.monospace(format!("{} = {:.3}", param.name, param.value));
    }
    let state = node.instance().save_state();
    ui.separator();
    ui.monospace(format!(
        "state ({} bytes): {}",
        state.len(),
        hex_preview(&state)
    ));
}

fn hex_preview(state: &[u8]) -> String {
    const MAX_BYTES: usize = 48;
    if state.len() > MAX_BYTES {
        format!("{}…", hex::encode(&state[..MAX_BYTES]))
    } else {
        hex::encode(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn titles_name_the_window_kind() {
        assert_eq!(window_title("Gain", WindowKind::Editor), "Gain");
        assert_eq!(
            window_title("Gain", WindowKind::GenericParams),
            "Gain - Parameters"
        );
        assert_eq!(window_title("Gain", WindowKind::Debug), "Gain - Debug");
    }

    #[test]
    fn long_state_blobs_are_truncated_in_the_dump() {
        let blob = vec![0xAB; 100];
        let preview = hex_preview(&blob);
        assert!(preview.starts_with("abab"));
        assert!(preview.len() < 2 * blob.len());
        assert_eq!(hex_preview(&[0x01, 0x02]), "0102");
    }
}
