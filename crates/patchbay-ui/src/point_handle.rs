use egui::{Color32, Painter, Pos2, Rect, Response, Sense, Stroke, Ui, Vec2};

use patchbay_graph::{GridSettings, Rect as ModelRect, RelativeRect};

pub const HANDLE_SIZE: f32 = 11.0;

/// What the handle needs from the thing it edits: an abstract position it
/// can read back and replace.
pub trait HandleAnchor {
    fn position(&self) -> RelativeRect;
    fn set_position(&mut self, position: RelativeRect);
}

/// A small draggable marker centered on an anchor point.
///
/// The anchor's fractional position is resolved against the editor area
/// every frame, and the press position is recorded relative to the area
/// origin, so scrolling or resizing the surface mid-drag cannot make the
/// handle jump.
#[derive(Debug, Default)]
pub struct PointHandle {
    press_anchor: Option<Vec2>,
}

impl PointHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ui(
        &mut self,
        ui: &mut Ui,
        anchor: &mut dyn HandleAnchor,
        area: Rect,
        grid: &GridSettings,
    ) -> Response {
        let centre = anchor_point(anchor.position(), area);
        let rect = Rect::from_center_size(centre, Vec2::splat(HANDLE_SIZE));
        let response = ui.allocate_rect(rect, Sense::drag());

        if response.drag_started() {
            self.press_anchor = Some(centre - area.min);
        }

        if response.dragged() {
            let pointer = ui.input(|i| (i.pointer.press_origin(), i.pointer.interact_pos()));
            if let (Some(press), (Some(origin), Some(pos))) = (self.press_anchor, pointer) {
                let dragged = press + (pos - origin);
                let target = egui::vec2(
                    grid.snap_position(f64::from(dragged.x)) as f32,
                    grid.snap_position(f64::from(dragged.y)) as f32,
                );
                let original = anchor.position();
                let updated = dragged_position(original, target, area.size());
                if updated != original {
                    anchor.set_position(updated);
                }
            }
        }

        if response.drag_stopped() {
            self.press_anchor = None;
        }

        paint_handle(ui.painter(), rect);
        response
    }
}

/// Applies a drag to an abstract position: the position is resolved against
/// a zero-origin rect of the surface's size, its origin replaced by the
/// already-snapped target point, and the fractions re-derived. Callers
/// commit the result only when it differs from the original.
pub fn dragged_position(original: RelativeRect, target: Vec2, area_size: Vec2) -> RelativeRect {
    let zero_area = ModelRect::new(0.0, 0.0, area_size.x, area_size.y);
    let mut resolved = original.resolve(zero_area);
    resolved.x = target.x;
    resolved.y = target.y;
    let mut updated = original;
    updated.update_from(resolved, zero_area);
    updated
}

fn anchor_point(position: RelativeRect, area: Rect) -> Pos2 {
    let resolved = position.resolve(model_rect(area));
    egui::pos2(resolved.x, resolved.y)
}

fn model_rect(rect: Rect) -> ModelRect {
    ModelRect::new(rect.left(), rect.top(), rect.width(), rect.height())
}

fn paint_handle(painter: &Painter, rect: Rect) {
    let radius = rect.width() * 0.5;
    painter.circle_stroke(rect.center(), radius - 2.0, Stroke::new(2.0, Color32::WHITE));
    painter.circle_stroke(rect.center(), radius - 1.0, Stroke::new(2.0, Color32::BLACK));
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn drag_moves_the_anchor_fractions() {
        let original = RelativeRect::new(0.25, 0.5, 0.0, 0.0);
        let updated = dragged_position(original, egui::vec2(60.0, 50.0), egui::vec2(200.0, 100.0));
        assert_eq!(updated, RelativeRect::new(0.3, 0.5, 0.0, 0.0));
    }

    #[test]
    fn unmoved_drags_change_nothing() {
        let original = RelativeRect::new(0.25, 0.5, 0.1, 0.2);
        let updated = dragged_position(original, egui::vec2(50.0, 50.0), egui::vec2(200.0, 100.0));
        assert_eq!(updated, original);
    }

    #[test]
    fn snapping_applies_to_the_dragged_point() {
        let grid = GridSettings {
            size: 10,
            shown: true,
            active: true,
        };
        let press = egui::vec2(50.0, 50.0);
        let dragged = press + egui::vec2(13.0, 2.0);
        let target = egui::vec2(
            grid.snap_position(f64::from(dragged.x)) as f32,
            grid.snap_position(f64::from(dragged.y)) as f32,
        );
        assert_eq!(target, egui::vec2(60.0, 50.0));
        assert_eq!(
            dragged_position(RelativeRect::new(0.25, 0.5, 0.0, 0.0), target, egui::vec2(200.0, 100.0)),
            RelativeRect::new(0.3, 0.5, 0.0, 0.0)
        );
    }

    #[test]
    fn degenerate_areas_leave_the_position_alone() {
        let original = RelativeRect::new(0.25, 0.5, 0.0, 0.0);
        let updated = dragged_position(original, egui::vec2(60.0, 50.0), Vec2::ZERO);
        assert_eq!(updated, original);
    }

    #[test]
    fn anchor_resolves_against_the_live_area() {
        let position = RelativeRect::new(0.5, 0.5, 0.0, 0.0);
        let centre = anchor_point(position, Rect::from_min_size(egui::pos2(100.0, 40.0), egui::vec2(200.0, 100.0)));
        assert_eq!(centre, egui::pos2(200.0, 90.0));
    }
}
