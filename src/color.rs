//! Colour parsing and the fixed background palette

use crate::error::{CompositeError, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// An opaque 8-bit RGB colour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const WHITE: Rgb = Rgb::new(255, 255, 255);
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);

    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse a hex triplet
    ///
    /// Accepts `#RRGGBB`, `RRGGBB`, `#RGB` and `RGB`, case-insensitive.
    ///
    /// ```rust
    /// use bgswap::color::Rgb;
    ///
    /// assert_eq!(Rgb::parse_hex("#ff0080").unwrap(), Rgb::new(255, 0, 128));
    /// assert_eq!(Rgb::parse_hex("f00").unwrap(), Rgb::new(255, 0, 0));
    /// assert!(Rgb::parse_hex("#12345").is_err());
    /// ```
    pub fn parse_hex(hex: &str) -> Result<Self> {
        let digits = hex.trim();
        let digits = digits.strip_prefix('#').unwrap_or(digits);
        if !digits.is_ascii() {
            return Err(CompositeError::invalid_config(format!(
                "Invalid hex colour {:?}",
                hex
            )));
        }

        let component = |s: &str| {
            u8::from_str_radix(s, 16).map_err(|_| {
                CompositeError::invalid_config(format!("Invalid hex colour {:?}", hex))
            })
        };

        match digits.len() {
            6 => Ok(Self::new(
                component(&digits[0..2])?,
                component(&digits[2..4])?,
                component(&digits[4..6])?,
            )),
            // #RGB expands each digit: f -> ff
            3 => Ok(Self::new(
                component(&digits[0..1])? * 17,
                component(&digits[1..2])? * 17,
                component(&digits[2..3])? * 17,
            )),
            _ => Err(CompositeError::invalid_config(format!(
                "Colour {:?} must be in #RRGGBB or #RGB format",
                hex
            ))),
        }
    }

    /// Channel values as an opaque RGBA pixel
    #[must_use]
    pub fn to_rgba(self) -> [u8; 4] {
        [self.r, self.g, self.b, u8::MAX]
    }
}

impl FromStr for Rgb {
    type Err = CompositeError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse_hex(s)
    }
}

impl std::fmt::Display for Rgb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// Fixed set of background colours offered to users
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaletteColor {
    White,
    Black,
    Gray,
    Red,
    Green,
    Blue,
    Yellow,
}

impl PaletteColor {
    pub const ALL: [PaletteColor; 7] = [
        Self::White,
        Self::Black,
        Self::Gray,
        Self::Red,
        Self::Green,
        Self::Blue,
        Self::Yellow,
    ];

    #[must_use]
    pub fn rgb(self) -> Rgb {
        match self {
            Self::White => Rgb::WHITE,
            Self::Black => Rgb::BLACK,
            Self::Gray => Rgb::new(0x80, 0x80, 0x80),
            Self::Red => Rgb::new(0xff, 0x00, 0x00),
            Self::Green => Rgb::new(0x00, 0x80, 0x00),
            Self::Blue => Rgb::new(0x00, 0x00, 0xff),
            Self::Yellow => Rgb::new(0xff, 0xff, 0x00),
        }
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::White => "white",
            Self::Black => "black",
            Self::Gray => "gray",
            Self::Red => "red",
            Self::Green => "green",
            Self::Blue => "blue",
            Self::Yellow => "yellow",
        }
    }
}

impl FromStr for PaletteColor {
    type Err = CompositeError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_ascii_lowercase();
        let wanted = if wanted == "grey" { "gray".to_string() } else { wanted };
        Self::ALL
            .into_iter()
            .find(|c| c.name() == wanted)
            .ok_or_else(|| {
                let names: Vec<&str> = Self::ALL.iter().map(|c| c.name()).collect();
                CompositeError::invalid_config(format!(
                    "Unknown palette colour {:?} (expected one of: {})",
                    s,
                    names.join(", ")
                ))
            })
    }
}

impl std::fmt::Display for PaletteColor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_long_and_short_hex() {
        assert_eq!(Rgb::parse_hex("#FFFFFF").unwrap(), Rgb::WHITE);
        assert_eq!(Rgb::parse_hex("000000").unwrap(), Rgb::BLACK);
        assert_eq!(Rgb::parse_hex("#0f8").unwrap(), Rgb::new(0x00, 0xff, 0x88));
        assert_eq!("#102030".parse::<Rgb>().unwrap(), Rgb::new(0x10, 0x20, 0x30));
    }

    #[test]
    fn test_parse_hex_rejects_garbage() {
        for bad in ["", "#", "#12", "#12345", "#1234567", "#gg0000", "#ééé"] {
            assert!(Rgb::parse_hex(bad).is_err(), "{bad:?} should not parse");
        }
    }

    #[test]
    fn test_display_round_trips() {
        let color = Rgb::new(1, 171, 255);
        assert_eq!(color.to_string(), "#01abff");
        assert_eq!(color.to_string().parse::<Rgb>().unwrap(), color);
    }

    #[test]
    fn test_palette_lookup() {
        assert_eq!("White".parse::<PaletteColor>().unwrap(), PaletteColor::White);
        assert_eq!("grey".parse::<PaletteColor>().unwrap(), PaletteColor::Gray);
        assert_eq!(PaletteColor::White.rgb(), Rgb::WHITE);

        let err = "magenta".parse::<PaletteColor>().unwrap_err();
        assert!(err.to_string().contains("white"));
    }

    #[test]
    fn test_palette_names_unique() {
        for (i, a) in PaletteColor::ALL.iter().enumerate() {
            for b in PaletteColor::ALL.iter().skip(i + 1) {
                assert_ne!(a.name(), b.name());
            }
        }
    }
}
