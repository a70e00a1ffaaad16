use ratatui::style::Color;
use term_color_support::ColorSupport;

use crate::rws_board::VisualKind;

/// Color depth the terminal can show
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Depth {
    TrueColor,
    Indexed,
    Basic,
}

impl Depth {
    pub fn detect() -> Depth {
        let support = ColorSupport::stdout();
        if support.has_16m {
            Depth::TrueColor
        } else if support.has_256 {
            Depth::Indexed
        } else {
            Depth::Basic
        }
    }

    // (rgb, 256-color index, ANSI fallback)
    fn pick(self, rgb: (u8, u8, u8), index: u8, basic: Color) -> Color {
        match self {
            Depth::TrueColor => Color::Rgb(rgb.0, rgb.1, rgb.2),
            Depth::Indexed => Color::Indexed(index),
            Depth::Basic => basic,
        }
    }
}

/// Glyphs and colors for every tile kind
#[derive(Debug, Clone)]
pub struct Palette {
    pub board_bg: Color,
    pub tile: (&'static str, Color),
    pub flag: (&'static str, Color),
    pub mine: (&'static str, Color),
    pub numbers: [Color; 9],
    pub lost: Color,
    pub won: Color,
}

impl Palette {
    pub fn new(depth: Depth, ascii: bool) -> Palette {
        Palette {
            board_bg: depth.pick((118, 118, 118), 243, Color::DarkGray),
            tile: (
                if ascii { "#" } else { "■" },
                depth.pick((204, 204, 204), 250, Color::Gray),
            ),
            flag: (
                if ascii { "F" } else { "⚑" },
                depth.pick((197, 15, 31), 160, Color::Red),
            ),
            mine: (
                if ascii { "*" } else { "☼" },
                depth.pick((12, 12, 12), 232, Color::Black),
            ),
            numbers: [
                depth.pick((118, 118, 118), 243, Color::DarkGray),
                depth.pick((0, 55, 218), 20, Color::Blue),
                depth.pick((19, 161, 14), 28, Color::Green),
                depth.pick((197, 15, 31), 160, Color::Red),
                depth.pick((136, 23, 152), 90, Color::Magenta),
                depth.pick((193, 156, 0), 178, Color::Yellow),
                depth.pick((58, 150, 221), 38, Color::Cyan),
                depth.pick((12, 12, 12), 232, Color::Black),
                depth.pick((242, 242, 242), 255, Color::White),
            ],
            lost: depth.pick((231, 72, 86), 203, Color::LightRed),
            won: depth.pick((97, 214, 214), 116, Color::LightCyan),
        }
    }

    /// Text and foreground for one tile
    pub fn glyph(&self, kind: VisualKind) -> (String, Color) {
        match kind {
            VisualKind::Tile => (self.tile.0.to_string(), self.tile.1),
            VisualKind::Flag => (self.flag.0.to_string(), self.flag.1),
            VisualKind::Mine => (self.mine.0.to_string(), self.mine.1),
            VisualKind::Number(0) => (" ".to_string(), self.numbers[0]),
            VisualKind::Number(n) => (n.to_string(), self.numbers[(n as usize).min(8)]),
        }
    }
}
