//! Glue between a host chart, the world-space coordinator and the painters.
//!
//! The host reports viewport changes, the coordinator publishes the derived
//! matrix on the next refresh tick, and [`Overlay::tick`] paints at most once
//! per tick in the fixed layer order grid, zones, footprint, selection.

use crate::painter::{
    FocusProfilePainter, FootprintPainter, GridPainter, Painter, SelectionOverlay,
    SelectionPainter,
};
use crate::surface::{Surface, Transform, with_transform};

use data::matrix::{self, TransformError};
use data::{
    Config, FocusZone, FootprintBin, ListenerId, RenderPosition, TransformationMatrix, WorldSpace,
    ZoneCoordinator,
};

use iced::widget::canvas;
use iced::{Rectangle, Renderer, Size, Theme, mouse};

use std::cell::Cell;
use std::rc::Rc;

/// Projection functions of the host chart. Any of them may be unable to map a
/// value, e.g. while the host has no data loaded.
pub trait HostViewport {
    fn time_to_pixel(&self, t: f64) -> Option<f64>;

    fn price_to_pixel(&self, price: f64) -> Option<f64>;

    fn coordinate_to_price(&self, y: f64) -> Option<f64>;

    /// `(from, to)` unix seconds of the visible time span.
    fn visible_time_range(&self) -> Option<(f64, f64)>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewportEvent {
    /// coarse, e.g. a drag across bars
    TimeRange,
    /// fine, e.g. a zoom step
    LogicalRange,
}

/// Derives the current matrix from the host, anchored at the left edge of the
/// visible time range and the price at the top edge of the surface.
pub fn sync_matrix(host: &impl HostViewport) -> Result<TransformationMatrix, TransformError> {
    let ref_time = host
        .visible_time_range()
        .map(|(from, _)| from)
        .filter(|t| t.is_finite())
        .ok_or(TransformError::AnchorUnavailable)?;
    let ref_price = host
        .coordinate_to_price(0.0)
        .filter(|p| p.is_finite())
        .ok_or(TransformError::AnchorUnavailable)?;

    matrix::build(
        |t| host.time_to_pixel(t),
        |p| host.price_to_pixel(p),
        ref_time,
        ref_price,
    )
}

/// Everything a frame is painted from, borrowed for that frame only.
#[derive(Debug, Clone, Copy)]
pub struct FrameData<'a> {
    pub bins: &'a [FootprintBin],
    pub zones: &'a [FocusZone],
    pub selection: &'a SelectionOverlay,
}

pub struct Overlay {
    world: WorldSpace,
    listener: Option<ListenerId>,
    redraw: Rc<Cell<bool>>,
    alive: Rc<Cell<bool>>,
    size: Size,
    dpr: f32,
    physical: Option<Size>,
    /// last matrix delivered by a refresh tick
    painted: Option<TransformationMatrix>,
    grid: GridPainter,
    focus: FocusProfilePainter,
    footprint: FootprintPainter,
    selection: SelectionPainter,
    zones: ZoneCoordinator,
}

impl Overlay {
    pub fn new(config: &Config) -> Self {
        let redraw = Rc::new(Cell::new(false));
        let alive = Rc::new(Cell::new(true));

        let mut world = WorldSpace::new();
        let listener = world.subscribe({
            let redraw = Rc::clone(&redraw);
            let alive = Rc::clone(&alive);
            move |matrix: TransformationMatrix| {
                if alive.get() {
                    log::trace!("mapping changed: {matrix:?}");
                    redraw.set(true);
                }
            }
        });

        Self {
            world,
            listener: Some(listener),
            redraw,
            alive,
            size: Size::ZERO,
            dpr: 1.0,
            physical: None,
            painted: None,
            grid: GridPainter::new(config.grid),
            focus: FocusProfilePainter::default(),
            footprint: FootprintPainter::new(config.footprint),
            selection: SelectionPainter,
            zones: ZoneCoordinator::new(&config.zone),
        }
    }

    pub fn with_focus_painter(mut self, painter: FocusProfilePainter) -> Self {
        self.focus = painter;
        self
    }

    pub fn is_alive(&self) -> bool {
        self.alive.get()
    }

    pub fn matrix(&self) -> Option<TransformationMatrix> {
        self.world.matrix()
    }

    pub fn world(&self) -> &WorldSpace {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut WorldSpace {
        &mut self.world
    }

    pub fn zone_coordinator(&self) -> &ZoneCoordinator {
        &self.zones
    }

    /// Re-derives the matrix after a host viewport change. Returns whether a
    /// new mapping was scheduled for publishing.
    pub fn on_viewport_event(&mut self, host: &impl HostViewport, event: ViewportEvent) -> bool {
        if !self.alive.get() {
            return false;
        }

        let candidate = match sync_matrix(host) {
            Ok(matrix) => matrix,
            Err(e) => {
                log::debug!("{event:?}: keeping previous matrix, {e}");
                return false;
            }
        };

        match self.world.update(candidate) {
            Ok(changed) => changed,
            Err(e) => {
                log::debug!("{event:?}: {e}");
                false
            }
        }
    }

    /// Bins or zones changed; repaint on the next tick.
    pub fn on_data_changed(&self) {
        if self.alive.get() {
            self.redraw.set(true);
        }
    }

    /// Logical size and device pixel ratio of the surface.
    pub fn resize(&mut self, width: f32, height: f32, dpr: f32) {
        let dpr = if dpr.is_finite() && dpr > 0.0 { dpr } else { 1.0 };

        self.size = Size::new(width.max(0.0), height.max(0.0));
        self.dpr = dpr;
        self.on_data_changed();
    }

    pub fn size(&self) -> Size {
        self.size
    }

    pub fn dpr(&self) -> f32 {
        self.dpr
    }

    /// Delivers pending notifications and returns the matrix to paint with
    /// when a repaint was requested since the last poll.
    pub fn poll(&mut self) -> Option<TransformationMatrix> {
        self.world.flush();

        if !self.alive.get() {
            log::debug!("frame skipped: overlay torn down");
            return None;
        }

        let matrix = self.world.matrix()?;
        if !self.redraw.replace(false) {
            return None;
        }

        self.painted = Some(matrix);
        Some(matrix)
    }

    /// Matrix the current frame is painted with. Only changes on a refresh
    /// tick, never directly on a viewport event.
    pub fn painted(&self) -> Option<TransformationMatrix> {
        self.painted
    }

    /// Refresh tick for the iced path: clears `cache` when a repaint is due so
    /// the next [`Canvas`] draw picks up the delivered matrix.
    pub fn invalidate(&mut self, cache: &canvas::Cache) -> bool {
        if self.poll().is_some() {
            cache.clear();
            true
        } else {
            false
        }
    }

    /// Display refresh. Paints at most once; returns whether it did.
    pub fn tick<S: Surface + ?Sized>(&mut self, surface: &mut S, frame: FrameData<'_>) -> bool {
        match self.poll() {
            Some(matrix) => {
                self.paint_frame(surface, matrix, frame);
                true
            }
            None => false,
        }
    }

    /// Sizes the backing surface for the device pixel ratio, clears it and
    /// paints every layer.
    pub fn paint_frame<S: Surface + ?Sized>(
        &mut self,
        surface: &mut S,
        matrix: TransformationMatrix,
        frame: FrameData<'_>,
    ) {
        let physical = Size::new(self.size.width * self.dpr, self.size.height * self.dpr);
        if self.physical != Some(physical) {
            surface.resize(physical);
            self.physical = Some(physical);
        }

        with_transform(surface, Transform::scale(self.dpr), |surface| {
            surface.clear();
            self.paint_layers(surface, matrix, frame);
        });
    }

    pub fn paint_layers<S: Surface + ?Sized>(
        &self,
        surface: &mut S,
        matrix: TransformationMatrix,
        frame: FrameData<'_>,
    ) {
        self.grid.paint(surface, matrix, &());
        self.focus.paint(surface, matrix, frame.zones);
        self.footprint.paint(surface, matrix, frame.bins);
        self.selection.paint(surface, matrix, frame.selection);
    }

    /// Pixel placement of each zone through the host's own projection.
    pub fn zone_positions(
        &self,
        host: &impl HostViewport,
        zones: &[FocusZone],
        now: f64,
    ) -> Vec<RenderPosition> {
        let rects: Vec<_> = zones.iter().map(|zone| zone.rect(now)).collect();

        self.zones.project(
            &rects,
            |t| host.time_to_pixel(t),
            |p| host.price_to_pixel(p),
        )
    }

    /// Stops all further painting. Deferred work still queued finds the
    /// overlay dead and does nothing.
    pub fn teardown(&mut self) {
        self.alive.set(false);
        self.redraw.set(false);
        self.painted = None;

        if let Some(id) = self.listener.take() {
            self.world.unsubscribe(id);
        }
        log::debug!("overlay torn down");
    }
}

impl Drop for Overlay {
    fn drop(&mut self) {
        if self.alive.get() {
            self.teardown();
        }
    }
}

/// Paints the overlay into an iced canvas cache, for stacking above a chart.
///
/// The cache is cleared by [`Overlay::invalidate`] on each refresh tick; drawing
/// uses the matrix that tick delivered. iced scales frames by the window's
/// scale factor itself, so no extra device pixel ratio transform is applied.
pub struct Canvas<'a> {
    pub overlay: &'a Overlay,
    pub cache: &'a canvas::Cache,
    pub frame: FrameData<'a>,
}

impl<Message> canvas::Program<Message> for Canvas<'_> {
    type State = ();

    fn draw(
        &self,
        _state: &Self::State,
        renderer: &Renderer,
        _theme: &Theme,
        bounds: Rectangle,
        _cursor: mouse::Cursor,
    ) -> Vec<canvas::Geometry<Renderer>> {
        if !self.overlay.is_alive() {
            return vec![];
        }
        let Some(matrix) = self.overlay.painted() else {
            return vec![];
        };

        let layers = self.cache.draw(renderer, bounds.size(), |frame| {
            self.overlay.paint_layers(frame, matrix, self.frame);
        });

        vec![layers]
    }
}
