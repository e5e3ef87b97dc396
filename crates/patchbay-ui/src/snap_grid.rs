use egui::{Color32, Painter, Rect};

use patchbay_graph::GridSettings;

/// Paints the snapping grid behind an editor canvas.
///
/// Caches size and visibility so the owner repaints only when
/// [`update_from`](SnapGrid::update_from) reports a change.
#[derive(Debug)]
pub struct SnapGrid {
    size: i32,
    shown: bool,
}

impl SnapGrid {
    pub fn new() -> Self {
        Self {
            size: -1,
            shown: false,
        }
    }

    /// Picks up the document's grid settings. Returns true when the cached
    /// state changed and the canvas needs a repaint.
    pub fn update_from(&mut self, settings: &GridSettings) -> bool {
        let shown = settings.shown && settings.active;
        if self.size != settings.size || self.shown != shown {
            self.size = settings.size;
            self.shown = shown;
            return true;
        }
        false
    }

    pub fn is_shown(&self) -> bool {
        self.shown && self.size > 2
    }

    /// Draws the grid over `clip`. Lines take the contrasting color of
    /// `background` (black when none is given) at 10% opacity. Grids of
    /// size 2 or smaller would dissolve into noise and are not drawn.
    pub fn paint(&self, painter: &Painter, clip: Rect, background: Option<Color32>) {
        if !self.is_shown() {
            return;
        }

        let color = contrasting(background).gamma_multiply(0.1);
        let (xs, ys) = grid_line_coords(self.size, clip);
        for x in xs {
            let line = Rect::from_min_size(egui::pos2(x, clip.top()), egui::vec2(1.0, clip.height()));
            painter.rect_filled(line, 0.0, color);
        }
        for y in ys {
            let line = Rect::from_min_size(egui::pos2(clip.left(), y), egui::vec2(clip.width(), 1.0));
            painter.rect_filled(line, 0.0, color);
        }
    }
}

impl Default for SnapGrid {
    fn default() -> Self {
        Self::new()
    }
}

/// Grid line positions covering `clip`: the first line sits on the last grid
/// multiple at or before the clip edge, then every `size` pixels until the
/// far edge. Empty for `size <= 2`.
pub fn grid_line_coords(size: i32, clip: Rect) -> (Vec<f32>, Vec<f32>) {
    if size <= 2 {
        return (Vec::new(), Vec::new());
    }
    let step = size as f32;

    let mut xs = Vec::new();
    let mut x = (clip.left() / step).floor() * step;
    while x < clip.right() {
        xs.push(x);
        x += step;
    }

    let mut ys = Vec::new();
    let mut y = (clip.top() / step).floor() * step;
    while y < clip.bottom() {
        ys.push(y);
        y += step;
    }

    (xs, ys)
}

fn contrasting(background: Option<Color32>) -> Color32 {
    let Some(color) = background else {
        return Color32::BLACK;
    };
    let luminance =
        0.299 * f32::from(color.r()) + 0.587 * f32::from(color.g()) + 0.114 * f32::from(color.b());
    if luminance < 128.0 {
        Color32::WHITE
    } else {
        Color32::BLACK
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn lines_cover_the_clip_at_grid_multiples() {
        let clip = Rect::from_min_size(egui::pos2(0.0, 0.0), egui::vec2(100.0, 50.0));
        let (xs, ys) = grid_line_coords(10, clip);
        assert_eq!(xs, (0..10).map(|i| i as f32 * 10.0).collect::<Vec<_>>());
        assert_eq!(ys, (0..5).map(|i| i as f32 * 10.0).collect::<Vec<_>>());
    }

    #[test]
    fn negative_origins_start_at_the_previous_grid_line() {
        let clip = Rect::from_min_size(egui::pos2(-15.0, -5.0), egui::vec2(30.0, 10.0));
        let (xs, ys) = grid_line_coords(10, clip);
        assert_eq!(xs, vec![-20.0, -10.0, 0.0, 10.0]);
        assert_eq!(ys, vec![-10.0, 0.0]);
    }

    #[test]
    fn tiny_grids_produce_no_lines() {
        let clip = Rect::from_min_size(egui::pos2(0.0, 0.0), egui::vec2(100.0, 100.0));
        let (xs, ys) = grid_line_coords(2, clip);
        assert!(xs.is_empty());
        assert!(ys.is_empty());
    }

    #[test]
    fn update_reports_each_change_once() {
        let mut grid = SnapGrid::new();
        let settings = GridSettings::default();
        assert!(grid.update_from(&settings));
        assert!(!grid.update_from(&settings));

        let hidden = GridSettings {
            shown: false,
            ..settings
        };
        assert!(grid.update_from(&hidden));
        assert!(!grid.update_from(&hidden));
    }

    #[test]
    fn inactive_grids_count_as_hidden() {
        let mut grid = SnapGrid::new();
        grid.update_from(&GridSettings::default());
        assert!(grid.is_shown());

        let inactive = GridSettings {
            active: false,
            ..GridSettings::default()
        };
        assert!(grid.update_from(&inactive));
        assert!(!grid.is_shown());
    }

    #[test]
    fn grid_contrasts_with_the_background() {
        assert_eq!(contrasting(Some(Color32::WHITE)), Color32::BLACK);
        assert_eq!(contrasting(Some(Color32::from_rgb(20, 20, 30))), Color32::WHITE);
        assert_eq!(contrasting(None), Color32::BLACK);
    }
}
