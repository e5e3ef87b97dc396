pub mod bubble;
pub mod group_frame;
pub mod point_handle;
pub mod snap_grid;

pub use bubble::BubbleMessage;
pub use group_frame::{GroupFrame, LabelJustify};
pub use point_handle::{HandleAnchor, PointHandle};
pub use snap_grid::{grid_line_coords, SnapGrid};
