use serde::{Deserialize, Serialize};

use crate::document::NodeId;
use crate::geom::Rect;

pub const DEFAULT_WINDOW_WIDTH: f32 = 500.0;
pub const DEFAULT_WINDOW_HEIGHT: f32 = 400.0;

/// The kinds of per-node windows a document can hold, at most one of each
/// kind per node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WindowKind {
    /// The plugin's own editor surface.
    Editor,
    /// Generic parameter panel for plugins without an editor.
    GenericParams,
    /// Program list.
    Programs,
    /// State and channel dump for troubleshooting.
    Debug,
}

/// Identity of one open window, unique within a document for its lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WindowId(pub u64);

/// A window the document currently holds open for one of its nodes.
#[derive(Debug, Clone, PartialEq)]
pub struct EditorWindow {
    pub id: WindowId,
    pub node: NodeId,
    pub kind: WindowKind,
    pub bounds: Rect,
}

/// Clamps `bounds` into the nearest display when it intersects none of them,
/// shrinking it if it cannot fit. Bounds already on a display, and empty
/// display lists, pass through unchanged.
pub fn fit_window_on_screen(bounds: Rect, displays: &[Rect]) -> Rect {
    if displays.is_empty() || displays.iter().any(|display| display.intersects(&bounds)) {
        return bounds;
    }

    let center = bounds.center();
    let Some(nearest) = displays.iter().min_by(|a, b| {
        distance_squared(a.center(), center).total_cmp(&distance_squared(b.center(), center))
    }) else {
        return bounds;
    };

    let w = bounds.w.min(nearest.w);
    let h = bounds.h.min(nearest.h);
    Rect::new(
        bounds.x.clamp(nearest.x, nearest.right() - w),
        bounds.y.clamp(nearest.y, nearest.bottom() - h),
        w,
        h,
    )
}

fn distance_squared(a: (f32, f32), b: (f32, f32)) -> f32 {
    let dx = a.0 - b.0;
    let dy = a.1 - b.1;
    dx * dx + dy * dy
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    const MAIN: Rect = Rect {
        x: 0.0,
        y: 0.0,
        w: 1920.0,
        h: 1080.0,
    };
    const SIDE: Rect = Rect {
        x: 1920.0,
        y: 0.0,
        w: 1280.0,
        h: 1024.0,
    };

    #[test]
    fn on_screen_bounds_pass_through() {
        let bounds = Rect::new(100.0, 100.0, 500.0, 400.0);
        assert_eq!(fit_window_on_screen(bounds, &[MAIN, SIDE]), bounds);
    }

    #[test]
    fn off_screen_bounds_clamp_into_the_nearest_display() {
        let bounds = Rect::new(4000.0, 200.0, 500.0, 400.0);
        let fitted = fit_window_on_screen(bounds, &[MAIN, SIDE]);
        assert_eq!(fitted, Rect::new(SIDE.right() - 500.0, 200.0, 500.0, 400.0));
    }

    #[test]
    fn oversized_windows_shrink_to_the_display() {
        let bounds = Rect::new(-5000.0, -5000.0, 3000.0, 2000.0);
        let fitted = fit_window_on_screen(bounds, &[MAIN]);
        assert_eq!(fitted, Rect::new(0.0, 0.0, 1920.0, 1080.0));
    }

    #[test]
    fn no_displays_means_no_adjustment() {
        let bounds = Rect::new(4000.0, 4000.0, 500.0, 400.0);
        assert_eq!(fit_window_on_screen(bounds, &[]), bounds);
    }
}
