//! Raster surface the painters draw on.
//!
//! [`Surface`] is implemented for iced's canvas [`Frame`] and for
//! [`Recorder`], a headless surface that keeps device-space draw commands.

use data::TransformationMatrix;

use iced::widget::canvas::{self, Frame, Path, Stroke};
use iced::{Alignment, Color, Font, Point, Rectangle, Size, Vector, font};

use std::ops::{Deref, DerefMut};

/// `p → translation + scale * p`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub translation: Vector,
    pub scale: Vector,
}

impl Transform {
    pub const IDENTITY: Transform = Transform {
        translation: Vector::new(0.0, 0.0),
        scale: Vector::new(1.0, 1.0),
    };

    pub fn scale(factor: f32) -> Self {
        Self {
            translation: Vector::new(0.0, 0.0),
            scale: Vector::new(factor, factor),
        }
    }

    /// World space relative to the matrix anchor: a point drawn at
    /// `(t - ref_time, price - ref_price)` lands on its pixel position.
    ///
    /// Offsetting by the anchor keeps coordinates small enough for `f32`.
    pub fn world(matrix: &TransformationMatrix) -> Self {
        Self {
            translation: Vector::new(matrix.e as f32, matrix.f as f32),
            scale: Vector::new(matrix.a as f32, matrix.d as f32),
        }
    }

    /// `self` applied after `inner`.
    pub fn then(self, inner: Transform) -> Transform {
        Transform {
            translation: Vector::new(
                self.translation.x + self.scale.x * inner.translation.x,
                self.translation.y + self.scale.y * inner.translation.y,
            ),
            scale: Vector::new(self.scale.x * inner.scale.x, self.scale.y * inner.scale.y),
        }
    }

    pub fn apply(&self, point: Point) -> Point {
        Point::new(
            self.translation.x + self.scale.x * point.x,
            self.translation.y + self.scale.y * point.y,
        )
    }

    /// Maps a rectangle, normalizing flipped axes so width and height stay positive.
    pub fn apply_rect(&self, top_left: Point, size: Size) -> Rectangle {
        let a = self.apply(top_left);
        let b = self.apply(Point::new(top_left.x + size.width, top_left.y + size.height));

        Rectangle {
            x: a.x.min(b.x),
            y: a.y.min(b.y),
            width: (b.x - a.x).abs(),
            height: (b.y - a.y).abs(),
        }
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Label {
    pub content: String,
    pub position: Point,
    pub size: f32,
    pub color: Color,
    pub align_x: Alignment,
    pub align_y: Alignment,
    pub bold: bool,
}

impl Label {
    pub fn new(content: impl Into<String>, position: Point, size: f32, color: Color) -> Self {
        Self {
            content: content.into(),
            position,
            size,
            color,
            align_x: Alignment::Start,
            align_y: Alignment::Center,
            bold: false,
        }
    }

    pub fn align_x(mut self, align: Alignment) -> Self {
        self.align_x = align;
        self
    }

    pub fn bold(mut self) -> Self {
        self.bold = true;
        self
    }
}

pub trait Surface {
    /// Logical size, before any device pixel ratio scaling.
    fn size(&self) -> Size;

    /// Resizes the backing buffer to `physical` pixels.
    fn resize(&mut self, _physical: Size) {}

    fn clear(&mut self);

    fn fill_rect(&mut self, top_left: Point, size: Size, color: Color);

    fn stroke_rect(&mut self, top_left: Point, size: Size, color: Color, width: f32);

    fn fill_circle(&mut self, center: Point, radius: f32, color: Color);

    fn line(&mut self, from: Point, to: Point, color: Color, width: f32);

    fn fill_text(&mut self, label: Label);

    fn push_transform(&mut self, transform: Transform);

    fn pop_transform(&mut self);
}

/// Keeps a transform pushed for as long as it lives; popping happens on drop,
/// so early returns and unwinding restore the surface too.
pub struct TransformGuard<'a, S: Surface + ?Sized> {
    surface: &'a mut S,
}

impl<'a, S: Surface + ?Sized> TransformGuard<'a, S> {
    pub fn new(surface: &'a mut S, transform: Transform) -> Self {
        surface.push_transform(transform);
        Self { surface }
    }
}

impl<S: Surface + ?Sized> Deref for TransformGuard<'_, S> {
    type Target = S;

    fn deref(&self) -> &S {
        self.surface
    }
}

impl<S: Surface + ?Sized> DerefMut for TransformGuard<'_, S> {
    fn deref_mut(&mut self) -> &mut S {
        self.surface
    }
}

impl<S: Surface + ?Sized> Drop for TransformGuard<'_, S> {
    fn drop(&mut self) {
        self.surface.pop_transform();
    }
}

pub fn with_transform<S: Surface + ?Sized, R>(
    surface: &mut S,
    transform: Transform,
    draw: impl FnOnce(&mut S) -> R,
) -> R {
    let mut guard = TransformGuard::new(surface, transform);
    draw(&mut *guard)
}

impl Surface for Frame {
    fn size(&self) -> Size {
        Frame::size(self)
    }

    fn clear(&mut self) {
        // cached frames start out empty
    }

    fn fill_rect(&mut self, top_left: Point, size: Size, color: Color) {
        self.fill_rectangle(top_left, size, color);
    }

    fn stroke_rect(&mut self, top_left: Point, size: Size, color: Color, width: f32) {
        self.stroke(
            &Path::rectangle(top_left, size),
            Stroke::with_color(
                Stroke {
                    width,
                    ..Default::default()
                },
                color,
            ),
        );
    }

    fn fill_circle(&mut self, center: Point, radius: f32, color: Color) {
        self.fill(&Path::circle(center, radius), color);
    }

    fn line(&mut self, from: Point, to: Point, color: Color, width: f32) {
        self.stroke(
            &Path::line(from, to),
            Stroke::with_color(
                Stroke {
                    width,
                    ..Default::default()
                },
                color,
            ),
        );
    }

    fn fill_text(&mut self, label: Label) {
        let font = if label.bold {
            Font {
                weight: font::Weight::Bold,
                ..Font::DEFAULT
            }
        } else {
            Font::DEFAULT
        };

        Frame::fill_text(
            self,
            canvas::Text {
                content: label.content,
                position: label.position,
                size: iced::Pixels(label.size),
                color: label.color,
                align_x: label.align_x.into(),
                align_y: label.align_y.into(),
                font,
                ..canvas::Text::default()
            },
        );
    }

    fn push_transform(&mut self, transform: Transform) {
        Frame::push_transform(self);
        self.translate(transform.translation);
        self.scale_nonuniform(transform.scale);
    }

    fn pop_transform(&mut self) {
        Frame::pop_transform(self);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Clear,
    Resize(Size),
    FillRect { rect: Rectangle, color: Color },
    StrokeRect { rect: Rectangle, color: Color, width: f32 },
    Circle { center: Point, radius: f32, color: Color },
    Line { from: Point, to: Point, color: Color },
    Text(Label),
}

/// Headless surface recording every primitive in device space.
#[derive(Debug, Clone)]
pub struct Recorder {
    size: Size,
    physical: Size,
    current: Transform,
    stack: Vec<Transform>,
    pub commands: Vec<Command>,
}

impl Recorder {
    pub fn new(size: Size) -> Self {
        Self {
            size,
            physical: size,
            current: Transform::IDENTITY,
            stack: Vec::new(),
            commands: Vec::new(),
        }
    }

    pub fn physical_size(&self) -> Size {
        self.physical
    }

    /// Number of transforms currently pushed.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub fn fill_rects(&self) -> impl Iterator<Item = (&Rectangle, &Color)> {
        self.commands.iter().filter_map(|command| match command {
            Command::FillRect { rect, color } => Some((rect, color)),
            _ => None,
        })
    }

    pub fn texts(&self) -> impl Iterator<Item = &Label> {
        self.commands.iter().filter_map(|command| match command {
            Command::Text(label) => Some(label),
            _ => None,
        })
    }

    pub fn circles(&self) -> usize {
        self.commands
            .iter()
            .filter(|command| matches!(command, Command::Circle { .. }))
            .count()
    }
}

impl Surface for Recorder {
    fn size(&self) -> Size {
        self.size
    }

    fn resize(&mut self, physical: Size) {
        self.physical = physical;
        self.commands.push(Command::Resize(physical));
    }

    fn clear(&mut self) {
        self.commands.push(Command::Clear);
    }

    fn fill_rect(&mut self, top_left: Point, size: Size, color: Color) {
        let rect = self.current.apply_rect(top_left, size);
        self.commands.push(Command::FillRect { rect, color });
    }

    fn stroke_rect(&mut self, top_left: Point, size: Size, color: Color, width: f32) {
        let rect = self.current.apply_rect(top_left, size);
        self.commands.push(Command::StrokeRect { rect, color, width });
    }

    fn fill_circle(&mut self, center: Point, radius: f32, color: Color) {
        let center = self.current.apply(center);
        self.commands.push(Command::Circle {
            center,
            radius,
            color,
        });
    }

    fn line(&mut self, from: Point, to: Point, color: Color, _width: f32) {
        let from = self.current.apply(from);
        let to = self.current.apply(to);
        self.commands.push(Command::Line { from, to, color });
    }

    fn fill_text(&mut self, mut label: Label) {
        label.position = self.current.apply(label.position);
        self.commands.push(Command::Text(label));
    }

    fn push_transform(&mut self, transform: Transform) {
        self.stack.push(self.current);
        self.current = self.current.then(transform);
    }

    fn pop_transform(&mut self) {
        self.current = self.stack.pop().unwrap_or(Transform::IDENTITY);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_transforms_compose() {
        let mut recorder = Recorder::new(Size::new(100.0, 100.0));

        with_transform(&mut recorder, Transform::scale(2.0), |surface| {
            let world = Transform {
                translation: Vector::new(10.0, 20.0),
                scale: Vector::new(3.0, -1.0),
            };
            with_transform(surface, world, |surface| {
                surface.fill_rect(Point::new(1.0, 1.0), Size::new(1.0, 2.0), Color::BLACK);
            });
            assert_eq!(surface.depth(), 1);
        });

        assert_eq!(recorder.depth(), 0);
        let (rect, _) = recorder.fill_rects().next().unwrap();
        // (1,1)→(13,19)→(26,38); (2,3)→(16,17)→(32,34)
        assert_eq!(
            *rect,
            Rectangle::new(Point::new(26.0, 34.0), Size::new(6.0, 4.0))
        );
    }

    #[test]
    fn guard_restores_on_panic() {
        let mut recorder = Recorder::new(Size::new(10.0, 10.0));

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            with_transform(&mut recorder, Transform::scale(4.0), |_| {
                panic!("draw failed");
            });
        }));

        assert!(result.is_err());
        assert_eq!(recorder.depth(), 0);

        recorder.fill_rect(Point::ORIGIN, Size::new(1.0, 1.0), Color::BLACK);
        let (rect, _) = recorder.fill_rects().next().unwrap();
        assert_eq!(rect.width, 1.0);
    }

    #[test]
    fn world_transform_matches_matrix() {
        let matrix = TransformationMatrix::new(10.0, -5.0, 100.0, 200.0, 1000.0, 50.0);
        let world = Transform::world(&matrix);

        let p = world.apply(Point::new(1.0, 1.0));
        assert_eq!(p, Point::new(110.0, 195.0));
    }
}
