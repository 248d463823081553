//! Hex color parsing shared by the raster surface and element styling.

#[cfg(test)]
#[path = "color_test.rs"]
mod color_test;

/// An opaque RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb { r: 0, g: 0, b: 0 };

    #[must_use]
    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// Parse `#rgb` or `#rrggbb` into channels. Returns `None` for anything else.
#[must_use]
pub fn parse_hex(raw: &str) -> Option<Rgb> {
    let hex = raw.trim().strip_prefix('#')?;
    // Byte offsets below are only char boundaries for ASCII input.
    if !hex.is_ascii() {
        return None;
    }
    match hex.len() {
        3 => {
            let channel = |i: usize| {
                u8::from_str_radix(&hex[i..=i], 16)
                    .ok()
                    .map(|v| v << 4 | v)
            };
            Some(Rgb { r: channel(0)?, g: channel(1)?, b: channel(2)? })
        }
        6 => {
            let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
            Some(Rgb { r: channel(0)?, g: channel(2)?, b: channel(4)? })
        }
        _ => None,
    }
}

/// Canonical lowercase `#rrggbb` form of a color.
#[must_use]
pub fn to_hex(color: Rgb) -> String {
    format!("#{:02x}{:02x}{:02x}", color.r, color.g, color.b)
}
