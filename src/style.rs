use iced::Color;

pub const BUY: Color = Color::from_rgb8(16, 185, 129);
pub const SELL: Color = Color::from_rgb8(244, 63, 94);
pub const MUTED_TEXT: Color = Color::from_rgb8(148, 163, 184);

pub const CELL_OUTLINE: Color = Color::from_rgba8(255, 255, 255, 0.08);
pub const SUMMARY_BACKGROUND: Color = Color::from_rgba8(2, 6, 23, 0.8);

pub const ZONE_FILL: Color = Color::from_rgba8(147, 51, 234, 0.15);
pub const ZONE_BORDER_ALPHA: f32 = 0.4;
pub const PROFILE_BUY: Color = Color::from_rgba8(16, 185, 129, 0.2);
pub const PROFILE_SELL: Color = Color::from_rgba8(239, 68, 68, 0.2);

pub const GRID_DOT: Color = Color::from_rgba8(251, 191, 36, 0.6);
pub const HOUR_LABEL: Color = Color::from_rgb8(251, 191, 36);
pub const HOUR_LINE: Color = Color::from_rgba8(251, 191, 36, 0.2);

pub const SELECTION_FILL: Color = Color::from_rgba8(56, 189, 248, 0.2);
pub const SELECTION_BORDER: Color = Color::from_rgb8(56, 189, 248);
pub const SELECTION_PROFILE: Color = Color::from_rgba8(251, 191, 36, 0.35);

pub fn text(alpha: f32) -> Color {
    Color::WHITE.scale_alpha(alpha)
}

pub fn from_rgba(rgba: data::zone::Rgba) -> Color {
    Color::from_rgba8(rgba.r, rgba.g, rgba.b, rgba.a)
}
