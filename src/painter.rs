pub mod focus;
pub mod footprint;
pub mod grid;
pub mod selection;

pub use focus::FocusProfilePainter;
pub use footprint::FootprintPainter;
pub use grid::GridPainter;
pub use selection::{SelectionOverlay, SelectionPainter};

use crate::surface::Surface;
use data::TransformationMatrix;

/// One overlay layer. Painters hold no mapping state: the matrix is handed in
/// by value on every call and the data is only borrowed for that call.
pub trait Painter {
    type Data: ?Sized;

    fn paint<S: Surface + ?Sized>(
        &self,
        surface: &mut S,
        matrix: TransformationMatrix,
        data: &Self::Data,
    );
}
