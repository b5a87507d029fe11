use super::Painter;
use crate::style;
use crate::surface::{Label, Surface};

use data::config::FootprintConfig;
use data::util::{group_thousands, signed_rounded};
use data::{Column, Columns, FootprintBin, TransformationMatrix};

use iced::{Alignment, Point, Size};

const IMBALANCE_MARKER: char = '◆';
const TEXT_PADDING: f32 = 4.0;

/// Per-bucket columns of buy/sell volume with a heatmap background,
/// diagonal imbalance markers and a delta/volume summary below each column.
#[derive(Debug, Clone, Copy, Default)]
pub struct FootprintPainter {
    config: FootprintConfig,
}

impl FootprintPainter {
    pub fn new(config: FootprintConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FootprintConfig {
        &self.config
    }

    fn draw_column<S: Surface + ?Sized>(
        &self,
        surface: &mut S,
        matrix: &TransformationMatrix,
        columns: &Columns<'_>,
        column: &Column<'_>,
        x: f32,
    ) {
        let width = self.config.column_width;
        let row_height = matrix.row_height() as f32;

        let mut lowest: Option<f32> = None;

        for bin in &column.bins {
            let y = matrix.price_to_y(bin.price as f64);
            if !y.is_finite() {
                continue;
            }
            let center_y = y.round() as f32;
            let top = center_y - row_height / 2.0;

            lowest = Some(lowest.map_or(top + row_height, |l| l.max(top + row_height)));

            let ratio = column.volume_ratio(bin);
            let heat = (ratio * 0.4).max(0.05);

            surface.fill_rect(
                Point::new(x - width / 2.0, top),
                Size::new(width / 2.0, row_height),
                style::BUY.scale_alpha(heat),
            );
            surface.fill_rect(
                Point::new(x, top),
                Size::new(width / 2.0, row_height),
                style::SELL.scale_alpha(heat),
            );
            surface.stroke_rect(
                Point::new(x - width / 2.0, top),
                Size::new(width, row_height),
                style::CELL_OUTLINE,
                1.0,
            );

            self.draw_volumes(surface, columns, bin, ratio, x, center_y);
        }

        if let Some(lowest) = lowest {
            self.draw_summary(surface, column, x, lowest);
        }
    }

    fn draw_volumes<S: Surface + ?Sized>(
        &self,
        surface: &mut S,
        columns: &Columns<'_>,
        bin: &FootprintBin,
        ratio: f32,
        x: f32,
        center_y: f32,
    ) {
        let imbalance = columns.imbalance(bin, self.config.imbalance_ratio);

        let alpha = if imbalance.any() || bin.total() > self.config.hot_volume {
            1.0
        } else {
            ratio.max(0.3)
        };
        let color = style::text(alpha);

        let buy = bin.buy_volume.round() as i64;
        let sell = bin.sell_volume.round() as i64;

        let buy_text = if imbalance.buy_winner {
            format!("{buy}{IMBALANCE_MARKER}")
        } else {
            buy.to_string()
        };
        let sell_text = if imbalance.sell_winner {
            format!("{IMBALANCE_MARKER}{sell}")
        } else {
            sell.to_string()
        };

        surface.fill_text(
            Label::new(
                buy_text,
                Point::new(x - TEXT_PADDING, center_y),
                self.config.text_size,
                color,
            )
            .align_x(Alignment::End)
            .bold(),
        );
        surface.fill_text(
            Label::new(
                sell_text,
                Point::new(x + TEXT_PADDING, center_y),
                self.config.text_size,
                color,
            )
            .align_x(Alignment::Start)
            .bold(),
        );
    }

    fn draw_summary<S: Surface + ?Sized>(
        &self,
        surface: &mut S,
        column: &Column<'_>,
        x: f32,
        lowest: f32,
    ) {
        let width = self.config.column_width;
        let height = self.config.summary_height;
        let top = lowest + self.config.summary_gap;

        surface.fill_rect(
            Point::new(x - width / 2.0, top),
            Size::new(width, height),
            style::SUMMARY_BACKGROUND,
        );

        let delta = column.delta();
        let delta_color = if delta >= 0.0 { style::BUY } else { style::SELL };
        let text_size = self.config.text_size + 1.0;

        surface.fill_text(
            Label::new(
                format!("D: {}", signed_rounded(delta)),
                Point::new(x, top + height * 0.25),
                text_size,
                delta_color,
            )
            .align_x(Alignment::Center)
            .bold(),
        );
        surface.fill_text(
            Label::new(
                format!("V: {}", group_thousands(column.total)),
                Point::new(x, top + height * 0.75),
                text_size,
                style::MUTED_TEXT,
            )
            .align_x(Alignment::Center)
            .bold(),
        );
    }
}

impl Painter for FootprintPainter {
    type Data = [FootprintBin];

    fn paint<S: Surface + ?Sized>(
        &self,
        surface: &mut S,
        matrix: TransformationMatrix,
        bins: &[FootprintBin],
    ) {
        if bins.is_empty() || matrix.a == 0.0 {
            return;
        }

        let surface_width = surface.size().width;
        let margin = self.config.column_width;

        let columns = Columns::group(bins);

        for (t, column) in &columns.columns {
            let x = matrix.time_to_x(*t as f64);
            if !x.is_finite() {
                continue;
            }
            let x = x.round() as f32;

            if x < -margin || x > surface_width + margin {
                continue;
            }

            self.draw_column(surface, &matrix, &columns, column, x);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::{Command, Recorder};

    use iced::Rectangle;

    fn matrix(e: f64) -> TransformationMatrix {
        TransformationMatrix::new(1.0, -20.0, e, 300.0, 0.0, 100.0)
    }

    fn bins() -> Vec<FootprintBin> {
        vec![
            FootprintBin::new(0, 100, 5.0, 2.0),
            FootprintBin::new(0, 101, 1.0, 10.0),
        ]
    }

    #[test]
    fn empty_input_draws_nothing() {
        let mut recorder = Recorder::new(Size::new(800.0, 600.0));
        FootprintPainter::default().paint(&mut recorder, matrix(400.0), &[]);
        assert!(recorder.commands.is_empty());
    }

    #[test]
    fn offscreen_column_is_culled() {
        let mut recorder = Recorder::new(Size::new(800.0, 600.0));
        FootprintPainter::default().paint(&mut recorder, matrix(-1000.0), &bins());
        assert!(recorder.commands.is_empty());
    }

    #[test]
    fn cells_center_on_rounded_rows() {
        let mut recorder = Recorder::new(Size::new(800.0, 600.0));
        FootprintPainter::default().paint(&mut recorder, matrix(400.3), &bins());

        let (buy_half, color) = recorder.fill_rects().next().unwrap();
        assert_eq!(
            *buy_half,
            Rectangle::new(Point::new(375.0, 290.0), Size::new(25.0, 20.0))
        );
        assert!((color.a - (7.0 / 11.0 * 0.4)).abs() < 1e-6);

        assert!(recorder.commands.iter().any(|c| matches!(
            c,
            Command::StrokeRect { rect, .. }
                if *rect == Rectangle::new(Point::new(375.0, 290.0), Size::new(50.0, 20.0))
        )));
    }

    #[test]
    fn winner_gets_marker_and_full_opacity() {
        let mut recorder = Recorder::new(Size::new(800.0, 600.0));
        FootprintPainter::default().paint(&mut recorder, matrix(400.0), &bins());

        let texts: Vec<_> = recorder.texts().collect();

        let winner = texts.iter().find(|l| l.content == "◆10").unwrap();
        assert_eq!(winner.color.a, 1.0);
        assert_eq!(winner.position, Point::new(404.0, 280.0));

        let plain = texts.iter().find(|l| l.content == "5").unwrap();
        assert!((plain.color.a - 7.0 / 11.0).abs() < 1e-6);
        assert_eq!(plain.align_x, Alignment::End);
    }

    #[test]
    fn stricter_ratio_removes_marker() {
        let painter = FootprintPainter::new(FootprintConfig {
            imbalance_ratio: 3.0,
            ..FootprintConfig::default()
        });
        let mut recorder = Recorder::new(Size::new(800.0, 600.0));
        painter.paint(&mut recorder, matrix(400.0), &bins());

        assert!(recorder.texts().all(|l| !l.content.contains(IMBALANCE_MARKER)));
    }

    #[test]
    fn summary_sits_below_lowest_row() {
        let mut recorder = Recorder::new(Size::new(800.0, 600.0));
        FootprintPainter::default().paint(&mut recorder, matrix(400.0), &bins());

        let (summary, _) = recorder.fill_rects().last().unwrap();
        assert_eq!(
            *summary,
            Rectangle::new(Point::new(375.0, 312.0), Size::new(50.0, 24.0))
        );

        let delta = recorder.texts().find(|l| l.content.starts_with("D:")).unwrap();
        assert_eq!(delta.content, "D: -6");
        assert_eq!(delta.color, style::SELL);
        assert!(recorder.texts().any(|l| l.content == "V: 18"));
    }

    #[test]
    fn hot_bins_are_fully_opaque() {
        let bins = [
            FootprintBin::new(0, 100, 300.0, 300.0),
            FootprintBin::new(0, 105, 2000.0, 2000.0),
        ];
        let mut recorder = Recorder::new(Size::new(800.0, 600.0));
        FootprintPainter::default().paint(&mut recorder, matrix(400.0), &bins);

        let hot = recorder.texts().find(|l| l.content == "300").unwrap();
        assert_eq!(hot.color.a, 1.0);
    }
}
