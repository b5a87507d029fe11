use serde::{Deserialize, Serialize};

use crate::config::ZoneConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct ProfileLevel {
    pub price: f64,
    pub volume: f64,
    pub side: Side,
}

/// Rectangular region of interest in time/price space. Created and cleared
/// by the caller; painters only read it.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct FocusZone {
    pub id: String,
    pub start_time: f64,
    /// `None` extends the zone up to the current time.
    #[serde(default)]
    pub end_time: Option<f64>,
    pub high_price: f64,
    pub low_price: f64,
    #[serde(default)]
    pub color: Option<Rgba>,
    #[serde(default)]
    pub profile: Vec<ProfileLevel>,
}

impl FocusZone {
    pub fn end_or(&self, now: f64) -> f64 {
        self.end_time.unwrap_or(now)
    }

    pub fn rect(&self, now: f64) -> ZoneRect {
        ZoneRect {
            id: self.id.clone(),
            top_price: self.high_price,
            bottom_price: self.low_price,
            start_time: self.start_time,
            end_time: self.end_or(now),
        }
    }

    /// Largest profile volume in this zone, if any level has a positive one.
    pub fn max_profile_volume(&self) -> Option<f64> {
        self.profile
            .iter()
            .map(|level| level.volume)
            .filter(|v| v.is_finite())
            .fold(None, |max: Option<f64>, v| Some(max.map_or(v, |m| m.max(v))))
            .filter(|max| *max > 0.0)
    }
}

/// Closed zone corners in domain units.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ZoneRect {
    pub id: String,
    pub top_price: f64,
    pub bottom_price: f64,
    pub start_time: f64,
    pub end_time: f64,
}

/// Pixel placement of a zone for one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderPosition {
    pub id: String,
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
    pub visible: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoneCoordinator {
    price_grid: f64,
    time_grid: u64,
}

impl Default for ZoneCoordinator {
    fn default() -> Self {
        Self::new(&ZoneConfig::default())
    }
}

impl ZoneCoordinator {
    pub fn new(config: &ZoneConfig) -> Self {
        Self {
            price_grid: config.price_grid,
            time_grid: config.time_grid.max(1),
        }
    }

    /// Price to the nearest grid step, time down to the start of its grid slot.
    pub fn snap(&self, price: f64, time: f64) -> (f64, f64) {
        let price = if self.price_grid > 0.0 {
            // divide by the inverse so results like 51 * 0.2 land on 10.2 exactly
            let per_unit = 1.0 / self.price_grid;
            (price * per_unit).round() / per_unit
        } else {
            price
        };

        let step = self.time_grid as f64;
        let time = (time / step).floor() * step;

        (price, time)
    }

    /// Projects every zone's corners. Zones with any unprojectable corner are
    /// returned with `visible: false`.
    pub fn project(
        &self,
        zones: &[ZoneRect],
        time_to_pixel: impl Fn(f64) -> Option<f64>,
        price_to_pixel: impl Fn(f64) -> Option<f64>,
    ) -> Vec<RenderPosition> {
        zones
            .iter()
            .map(|zone| {
                let y_top = price_to_pixel(zone.top_price);
                let y_bottom = price_to_pixel(zone.bottom_price);
                let x_start = time_to_pixel(zone.start_time);
                let x_end = time_to_pixel(zone.end_time);

                match (x_start, x_end, y_top, y_bottom) {
                    (Some(x_start), Some(x_end), Some(y_top), Some(y_bottom)) => RenderPosition {
                        id: zone.id.clone(),
                        x: x_start.min(x_end),
                        y: y_top.min(y_bottom),
                        w: (x_end - x_start).abs(),
                        h: (y_bottom - y_top).abs(),
                        visible: true,
                    },
                    _ => RenderPosition {
                        id: zone.id.clone(),
                        x: 0.0,
                        y: 0.0,
                        w: 0.0,
                        h: 0.0,
                        visible: false,
                    },
                }
            })
            .collect()
    }
}

/// A zone being drawn by the user, from the press point to the current point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Draft {
    pub anchor: (f64, f64),
    pub current: (f64, f64),
}

impl Draft {
    /// Both points are `(price, time)`.
    pub fn new(anchor: (f64, f64)) -> Self {
        Self {
            anchor,
            current: anchor,
        }
    }

    pub fn drag_to(&mut self, point: (f64, f64)) {
        self.current = point;
    }

    pub fn finish(&self, id: impl Into<String>, coordinator: &ZoneCoordinator) -> FocusZone {
        let (p0, t0) = coordinator.snap(self.anchor.0, self.anchor.1);
        let (p1, t1) = coordinator.snap(self.current.0, self.current.1);

        FocusZone {
            id: id.into(),
            start_time: t0.min(t1),
            end_time: Some(t0.max(t1)),
            high_price: p0.max(p1),
            low_price: p0.min(p1),
            color: None,
            profile: Vec::new(),
        }
    }
}
