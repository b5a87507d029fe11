use super::Painter;
use crate::style;
use crate::surface::Surface;

use data::{FootprintBin, TransformationMatrix, ZoneProfile};

use iced::{Point, Size};

/// Length in pixels of the longest profile bar.
const PROFILE_MAX_LENGTH: f32 = 150.0;
const PROFILE_RIGHT_MARGIN: f32 = 5.0;

/// A vertical drag across the surface selecting a price band, and the volume
/// profile computed for the last finished selection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectionOverlay {
    /// `(y_start, y_current)` in logical pixels while dragging.
    pub band: Option<(f32, f32)>,
    pub profile: Option<ZoneProfile>,
}

impl SelectionOverlay {
    pub fn begin(&mut self, y: f32) {
        self.band = Some((y, y));
    }

    pub fn drag_to(&mut self, y: f32) {
        if let Some((_, current)) = self.band.as_mut() {
            *current = y;
        }
    }

    /// Ends the drag and computes the profile of every bin inside the selected
    /// price band. Returns the band as `(low, high)` prices.
    pub fn finish(
        &mut self,
        matrix: &TransformationMatrix,
        bins: &[FootprintBin],
    ) -> Option<(f64, f64)> {
        let (start, current) = self.band.take()?;

        let a = matrix.y_to_price(f64::from(start));
        let b = matrix.y_to_price(f64::from(current));
        if !(a.is_finite() && b.is_finite()) {
            return None;
        }
        let (low, high) = (a.min(b), a.max(b));

        let profile = ZoneProfile::from_bins(bins, low, high);
        log::debug!(
            "selection {low:.2}..{high:.2}: {} profile levels",
            profile.levels.len()
        );
        self.profile = (!profile.is_empty()).then_some(profile);

        Some((low, high))
    }

    pub fn clear(&mut self) {
        self.band = None;
        self.profile = None;
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SelectionPainter;

impl SelectionPainter {
    fn draw_profile<S: Surface + ?Sized>(
        surface: &mut S,
        matrix: &TransformationMatrix,
        profile: &ZoneProfile,
        width: f32,
    ) {
        if profile.max_total <= 0.0 {
            return;
        }
        let row_height = matrix.row_height() as f32;

        for (price, volume) in &profile.levels {
            let y = matrix.price_to_y(*price as f64);
            if !y.is_finite() {
                continue;
            }
            let top = y.round() as f32 - row_height / 2.0;
            let length = volume.total() / profile.max_total * PROFILE_MAX_LENGTH;

            surface.fill_rect(
                Point::new(width - length - PROFILE_RIGHT_MARGIN, top),
                Size::new(length, row_height),
                style::SELECTION_PROFILE,
            );
        }
    }
}

impl Painter for SelectionPainter {
    type Data = SelectionOverlay;

    fn paint<S: Surface + ?Sized>(
        &self,
        surface: &mut S,
        matrix: TransformationMatrix,
        selection: &SelectionOverlay,
    ) {
        let width = surface.size().width;

        if let Some(profile) = &selection.profile {
            Self::draw_profile(surface, &matrix, profile, width);
        }

        if let Some((start, current)) = selection.band {
            let top = start.min(current);
            let size = Size::new(width, (start - current).abs());

            surface.fill_rect(Point::new(0.0, top), size, style::SELECTION_FILL);
            surface.stroke_rect(Point::new(0.0, top), size, style::SELECTION_BORDER, 1.0);
        }
    }
}
