//! Affine mapping from the host chart's (time, price) domain into surface pixels.

use serde::{Deserialize, Serialize};

/// Horizontal probe offsets, largest first. At deep zoom a large offset can fall
/// off the host's renderable range, so smaller ones are tried next.
const TIME_PROBES: [f64; 3] = [3600.0, 60.0, 1.0];
/// Vertical probe offsets in price units.
const PRICE_PROBES: [f64; 2] = [1.0, -1.0];

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformError {
    #[error("anchor point is not projectable")]
    AnchorUnavailable,
    #[error("no time probe produced a distinct horizontal sample")]
    NoHorizontalSample,
    #[error("no price probe produced a distinct vertical sample")]
    NoVerticalSample,
}

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq)]
#[error("degenerate matrix rejected (a: {a}, d: {d})")]
pub struct MatrixError {
    pub a: f64,
    pub d: f64,
}

/// `x = e + (t - ref_time) * a`, `y = f + (price - ref_price) * d`.
///
/// `e` and `f` keep sub-pixel precision; rounding happens per primitive at
/// draw time so a continuous pan never snaps the whole layer at once.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct TransformationMatrix {
    /// pixels per time unit
    pub a: f64,
    /// pixels per price unit, negative when price grows upward
    pub d: f64,
    pub e: f64,
    pub f: f64,
    pub ref_time: f64,
    pub ref_price: f64,
}

impl TransformationMatrix {
    pub fn new(a: f64, d: f64, e: f64, f: f64, ref_time: f64, ref_price: f64) -> Self {
        Self {
            a,
            d,
            e,
            f,
            ref_time,
            ref_price,
        }
    }

    /// Both scales non-zero and every field finite.
    pub fn is_valid(&self) -> bool {
        self.a != 0.0
            && self.d != 0.0
            && self.a.is_finite()
            && self.d.is_finite()
            && self.e.is_finite()
            && self.f.is_finite()
            && self.ref_time.is_finite()
            && self.ref_price.is_finite()
    }

    pub fn validate(self) -> Result<Self, MatrixError> {
        if self.is_valid() {
            Ok(self)
        } else {
            Err(MatrixError {
                a: self.a,
                d: self.d,
            })
        }
    }

    /// Compares only the fields that affect projection.
    pub fn same_mapping(&self, other: &Self) -> bool {
        self.a == other.a
            && self.d == other.d
            && self.e == other.e
            && self.f == other.f
            && self.ref_time == other.ref_time
            && self.ref_price == other.ref_price
    }

    #[inline]
    pub fn time_to_x(&self, t: f64) -> f64 {
        self.e + (t - self.ref_time) * self.a
    }

    #[inline]
    pub fn price_to_y(&self, price: f64) -> f64 {
        self.f + (price - self.ref_price) * self.d
    }

    pub fn project(&self, t: f64, price: f64) -> (f64, f64) {
        (self.time_to_x(t), self.price_to_y(price))
    }

    pub fn x_to_time(&self, x: f64) -> f64 {
        self.ref_time + (x - self.e) / self.a
    }

    pub fn y_to_price(&self, y: f64) -> f64 {
        self.ref_price + (y - self.f) / self.d
    }

    /// Height in pixels of one price unit.
    pub fn row_height(&self) -> f64 {
        self.d.abs()
    }
}

/// Derives a matrix from the host's two projection functions around the anchor
/// `(ref_time, ref_price)`.
///
/// Any failure leaves publishing to the caller, which keeps its previous matrix.
pub fn build(
    time_to_pixel: impl Fn(f64) -> Option<f64>,
    price_to_pixel: impl Fn(f64) -> Option<f64>,
    ref_time: f64,
    ref_price: f64,
) -> Result<TransformationMatrix, TransformError> {
    let finite = |v: Option<f64>| v.filter(|v| v.is_finite());

    let (Some(x0), Some(y0)) = (
        finite(time_to_pixel(ref_time)),
        finite(price_to_pixel(ref_price)),
    ) else {
        return Err(TransformError::AnchorUnavailable);
    };

    let a = TIME_PROBES
        .iter()
        .find_map(|&offset| {
            finite(time_to_pixel(ref_time + offset))
                .filter(|&x1| x1 != x0)
                .map(|x1| (x1 - x0) / offset)
        })
        .ok_or(TransformError::NoHorizontalSample)?;

    let d = PRICE_PROBES
        .iter()
        .find_map(|&offset| {
            finite(price_to_pixel(ref_price + offset)).map(|y1| (y1 - y0) / offset)
        })
        .filter(|&d| d != 0.0)
        .ok_or(TransformError::NoVerticalSample)?;

    Ok(TransformationMatrix {
        a,
        d,
        e: x0,
        f: y0,
        ref_time,
        ref_price,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn linear(scale: f64, offset: f64, origin: f64) -> impl Fn(f64) -> Option<f64> {
        move |v| Some(offset + (v - origin) * scale)
    }

    #[test]
    fn projects_scenario_point() {
        let m = TransformationMatrix::new(10.0, -5.0, 100.0, 200.0, 1000.0, 50.0);
        assert_eq!(m.project(1001.0, 51.0), (110.0, 195.0));
    }

    #[test]
    fn anchor_reproduces_offset_exactly() {
        let m = build(
            linear(0.25, 13.37, 1_700_000_000.0),
            linear(-4.0, 201.6, 2300.0),
            1_700_000_120.0,
            2310.5,
        )
        .unwrap();

        assert!(m.is_valid());
        assert_eq!(m.time_to_x(m.ref_time), m.e);
        assert_eq!(m.price_to_y(m.ref_price), m.f);
        assert!((m.a - 0.25).abs() < 1e-12);
        assert!((m.d + 4.0).abs() < 1e-12);
        // sub-pixel offsets survive
        assert!(m.e.fract() != 0.0);
    }

    #[test]
    fn falls_back_to_smaller_time_probe() {
        let ref_time = 5000.0;
        let time = move |t: f64| {
            if t - ref_time > 100.0 {
                None
            } else {
                Some((t - ref_time) * 2.0)
            }
        };
        let m = build(time, linear(-1.0, 0.0, 0.0), ref_time, 10.0).unwrap();
        assert_eq!(m.a, 2.0);
    }

    #[test]
    fn falls_back_to_one_unit_probe() {
        let time = |t: f64| if t > 1.0 { None } else { Some(t * 30.0) };
        let m = build(time, linear(-1.0, 0.0, 0.0), 0.0, 10.0).unwrap();
        assert_eq!(m.a, 30.0);
    }

    #[test]
    fn fails_without_anchor() {
        let err = build(|_| None, linear(1.0, 0.0, 0.0), 0.0, 0.0).unwrap_err();
        assert_eq!(err, TransformError::AnchorUnavailable);

        let err = build(linear(1.0, 0.0, 0.0), |_| None, 0.0, 0.0).unwrap_err();
        assert_eq!(err, TransformError::AnchorUnavailable);
    }

    #[test]
    fn fails_when_time_probe_never_moves() {
        let time = |_: f64| Some(42.0);
        let err = build(time, linear(-1.0, 0.0, 0.0), 0.0, 0.0).unwrap_err();
        assert_eq!(err, TransformError::NoHorizontalSample);
    }

    #[test]
    fn uses_downward_price_probe() {
        let price = |p: f64| if p > 100.0 { None } else { Some((100.0 - p) * 3.0) };
        let m = build(linear(1.0, 0.0, 0.0), price, 0.0, 100.0).unwrap();
        assert_eq!(m.d, -3.0);
        assert_eq!(m.f, 0.0);
    }

    #[test]
    fn fails_without_vertical_sample() {
        let price = |p: f64| if p == 7.0 { Some(12.0) } else { None };
        let err = build(linear(1.0, 0.0, 0.0), price, 0.0, 7.0).unwrap_err();
        assert_eq!(err, TransformError::NoVerticalSample);
    }

    #[test]
    fn rejects_degenerate() {
        let m = TransformationMatrix::new(0.0, -1.0, 0.0, 0.0, 0.0, 0.0);
        assert!(m.validate().is_err());
        let m = TransformationMatrix::new(1.0, f64::NAN, 0.0, 0.0, 0.0, 0.0);
        assert!(m.validate().is_err());
    }

    #[test]
    fn inverse_round_trips_anchor() {
        let m = TransformationMatrix::new(10.0, -5.0, 100.0, 200.0, 1000.0, 50.0);
        assert_eq!(m.x_to_time(110.0), 1001.0);
        assert_eq!(m.y_to_price(195.0), 51.0);
    }
}
