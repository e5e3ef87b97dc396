use serde::{Deserialize, Serialize};

/// Snap-grid configuration for a document canvas.
///
/// `shown` and `active` are independent: the grid can be drawn without
/// snapping and snap without being drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridSettings {
    /// Grid pitch in pixels.
    pub size: i32,
    pub shown: bool,
    pub active: bool,
}

impl Default for GridSettings {
    fn default() -> Self {
        Self {
            size: 8,
            shown: true,
            active: true,
        }
    }
}

impl GridSettings {
    /// Snaps one coordinate to the nearest grid line, ties rounding up.
    /// Identity when snapping is inactive or the pitch is not positive.
    pub fn snap_position(&self, coord: f64) -> f64 {
        if self.active && self.size > 0 {
            let size = f64::from(self.size);
            ((coord / size) + 0.5).floor() * size
        } else {
            coord
        }
    }
}
