use super::Painter;
use crate::style;
use crate::surface::{Label, Surface};

use chrono::{DateTime, Timelike};
use data::TransformationMatrix;
use data::config::GridConfig;

use iced::{Point, Size};

const DOT_RADIUS: f32 = 1.0;
const HOUR_LABEL_SIZE: f32 = 12.0;
const SECONDS_PER_HOUR: i64 = 3600;

/// Dot grid at every time step and price level of the visible area, with an
/// hour marker on one row near the top edge.
#[derive(Debug, Clone, Copy, Default)]
pub struct GridPainter {
    config: GridConfig,
}

impl GridPainter {
    pub fn new(config: GridConfig) -> Self {
        Self { config }
    }
}

impl Painter for GridPainter {
    type Data = ();

    fn paint<S: Surface + ?Sized>(&self, surface: &mut S, matrix: TransformationMatrix, _: &()) {
        if !matrix.is_valid() {
            return;
        }

        let Size { width, height } = surface.size();
        let time_step = self.config.time_step.max(1) as i64;
        let price_step = self.config.price_step.max(1);

        let (t0, t1) = {
            let a = matrix.x_to_time(0.0);
            let b = matrix.x_to_time(f64::from(width));
            (a.min(b), a.max(b))
        };
        let (p_low, p_high) = {
            let a = matrix.y_to_price(0.0);
            let b = matrix.y_to_price(f64::from(height));
            (a.min(b), a.max(b))
        };

        let first_time = ((t0 / time_step as f64).floor() as i64 * time_step).max(0);
        let last_time = t1.floor() as i64;
        let top_level = (p_high / price_step as f64).floor() as i64 * price_step;
        let bottom_level = p_low.ceil() as i64;

        if last_time < first_time || top_level < bottom_level {
            return;
        }

        let columns = (last_time - first_time) / time_step + 1;
        let rows = (top_level - bottom_level) / price_step + 1;
        let points = columns.saturating_mul(rows);

        if points > self.config.max_points as i64 {
            log::debug!(
                "grid skipped: {points} points exceed {}",
                self.config.max_points
            );
            return;
        }

        let label_level = top_level - self.config.label_row_offset * price_step;

        let mut t = first_time;
        while t <= last_time {
            let x = matrix.time_to_x(t as f64).round() as f32;
            let full_hour = t % SECONDS_PER_HOUR == 0;

            let mut price = top_level;
            while price >= bottom_level {
                let y = matrix.price_to_y(price as f64).round() as f32;

                if (0.0..=width).contains(&x) && (0.0..=height).contains(&y) {
                    surface.fill_circle(Point::new(x, y), DOT_RADIUS, style::GRID_DOT);

                    if full_hour
                        && price == label_level
                        && let Some(hour) = DateTime::from_timestamp(t, 0).map(|dt| dt.hour())
                    {
                        surface.fill_text(Label::new(
                            format!("{hour}h"),
                            Point::new(x + 4.0, y - 4.0),
                            HOUR_LABEL_SIZE,
                            style::HOUR_LABEL,
                        ));
                        surface.line(
                            Point::new(x, 0.0),
                            Point::new(x, height),
                            style::HOUR_LINE,
                            1.0,
                        );
                    }
                }

                price -= price_step;
            }

            t += time_step;
        }
    }
}
