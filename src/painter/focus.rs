use super::Painter;
use crate::style;
use crate::surface::{Surface, Transform, with_transform};

use data::zone::Side;
use data::{FocusZone, TransformationMatrix};

use iced::{Color, Point, Size};

/// Share of the zone width the longest profile bar may take.
const PROFILE_WIDTH_SHARE: f64 = 0.4;
/// Profile bar thickness, in price units.
const PROFILE_BAR_HEIGHT: f64 = 0.1;

fn wall_clock() -> f64 {
    chrono::Utc::now().timestamp_millis() as f64 / 1000.0
}

/// Highlights focus zones and their embedded volume profile.
///
/// Shapes are drawn in domain units under the world transform; coordinates are
/// taken relative to the matrix anchor before narrowing to `f32`.
#[derive(Debug, Clone, Copy)]
pub struct FocusProfilePainter {
    clock: fn() -> f64,
}

impl Default for FocusProfilePainter {
    fn default() -> Self {
        Self { clock: wall_clock }
    }
}

impl FocusProfilePainter {
    /// `clock` returns the current time in unix seconds, used to close open zones.
    pub fn with_clock(clock: fn() -> f64) -> Self {
        Self { clock }
    }

    fn draw_zone<S: Surface + ?Sized>(
        surface: &mut S,
        matrix: &TransformationMatrix,
        zone: &FocusZone,
        now: f64,
    ) {
        let end = zone.end_or(now);
        let width = end - zone.start_time;
        let height = zone.high_price - zone.low_price;

        if !(width.is_finite() && height.is_finite()) {
            return;
        }

        let origin = Point::new(
            (zone.start_time - matrix.ref_time) as f32,
            (zone.low_price - matrix.ref_price) as f32,
        );
        let size = Size::new(width as f32, height as f32);

        let (fill, border) = match zone.color {
            Some(rgba) => {
                let color = style::from_rgba(rgba);
                (
                    color,
                    Color {
                        a: style::ZONE_BORDER_ALPHA,
                        ..color
                    },
                )
            }
            None => (
                style::ZONE_FILL,
                Color {
                    a: style::ZONE_BORDER_ALPHA,
                    ..style::ZONE_FILL
                },
            ),
        };

        surface.fill_rect(origin, size, fill);
        surface.stroke_rect(origin, size, border, 1.0);

        let Some(max_volume) = zone.max_profile_volume() else {
            return;
        };

        for level in &zone.profile {
            if !(level.volume.is_finite() && level.price.is_finite()) || level.volume <= 0.0 {
                continue;
            }
            let bar = (level.volume / max_volume) * width * PROFILE_WIDTH_SHARE;

            let color = match level.side {
                Side::Buy => style::PROFILE_BUY,
                Side::Sell => style::PROFILE_SELL,
            };

            surface.fill_rect(
                Point::new(origin.x, (level.price - matrix.ref_price) as f32),
                Size::new(bar as f32, PROFILE_BAR_HEIGHT as f32),
                color,
            );
        }
    }
}

impl Painter for FocusProfilePainter {
    type Data = [FocusZone];

    fn paint<S: Surface + ?Sized>(
        &self,
        surface: &mut S,
        matrix: TransformationMatrix,
        zones: &[FocusZone],
    ) {
        if zones.is_empty() {
            return;
        }

        let now = (self.clock)();

        with_transform(surface, Transform::world(&matrix), |surface| {
            for zone in zones {
                Self::draw_zone(surface, &matrix, zone, now);
            }
        });
    }
}
