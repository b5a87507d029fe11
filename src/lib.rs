pub mod overlay;
pub mod painter;
pub mod style;
pub mod surface;

pub use overlay::{Canvas, FrameData, HostViewport, Overlay, ViewportEvent, sync_matrix};
pub use painter::{
    FocusProfilePainter, FootprintPainter, GridPainter, Painter, SelectionOverlay,
    SelectionPainter,
};
pub use surface::{Recorder, Surface, Transform, TransformGuard, with_transform};
