use crossterm::style::Color;
use loopgrid_core::{GroupId, VariantId};

/// Glyphs for token faces, indexed by variant
const GLYPHS: [char; 8] = ['●', '■', '▲', '◆', '★', '♥', '♣', '♠'];

/// Color theme for the TUI
#[derive(Debug, Clone)]
pub struct Theme {
    /// Background color
    pub bg: Color,
    /// Default text color
    pub fg: Color,
    /// Board frame color
    pub border: Color,
    /// Cell under the keyboard cursor
    pub cursor_bg: Color,
    /// Cells on the current path
    pub path_bg: Color,
    /// Path cells once the loop is closed
    pub loop_bg: Color,
    /// Negative step scores
    pub penalty: Color,
    /// Positive step scores
    pub gain: Color,
    /// Info text color
    pub info: Color,
    /// Key binding text color
    pub key: Color,
    /// One color per group
    pub groups: [Color; 8],
}

impl Default for Theme {
    fn default() -> Self {
        Self::dark()
    }
}

impl Theme {
    pub fn dark() -> Self {
        Self {
            bg: Color::Rgb { r: 20, g: 22, b: 30 },
            fg: Color::Rgb { r: 230, g: 230, b: 240 },
            border: Color::Rgb { r: 70, g: 75, b: 90 },
            cursor_bg: Color::Rgb { r: 70, g: 90, b: 140 },
            path_bg: Color::Rgb { r: 45, g: 50, b: 70 },
            loop_bg: Color::Rgb { r: 40, g: 80, b: 60 },
            penalty: Color::Rgb { r: 255, g: 90, b: 90 },
            gain: Color::Rgb { r: 90, g: 255, b: 130 },
            info: Color::Rgb { r: 160, g: 165, b: 185 },
            key: Color::Rgb { r: 255, g: 210, b: 100 },
            groups: [
                Color::Rgb { r: 150, g: 150, b: 160 },
                Color::Rgb { r: 90, g: 210, b: 110 },
                Color::Rgb { r: 235, g: 80, b: 80 },
                Color::Rgb { r: 240, g: 240, b: 245 },
                Color::Rgb { r: 250, g: 210, b: 70 },
                Color::Rgb { r: 90, g: 160, b: 255 },
                Color::Rgb { r: 200, g: 110, b: 230 },
                Color::Rgb { r: 250, g: 150, b: 60 },
            ],
        }
    }

    pub fn group_color(&self, group: GroupId) -> Color {
        self.groups[group as usize % self.groups.len()]
    }
}

/// Face of a token
pub fn glyph(variant: VariantId) -> char {
    GLYPHS[variant as usize % GLYPHS.len()]
}

/// Face drawn while a token shrinks away
pub fn shrinking_glyph(variant: VariantId, scale: f32) -> char {
    if scale > 0.6 {
        glyph(variant)
    } else if scale > 0.25 {
        '·'
    } else {
        ' '
    }
}
