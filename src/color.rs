// Color module
// RGB values, hex parsing for the command line and the picker swatches

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// An opaque 8-bit RGB color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    #[cfg(test)]
    pub const BLACK: Rgb = Rgb(0, 0, 0);
    pub const WHITE: Rgb = Rgb(255, 255, 255);
    pub const BLUE: Rgb = Rgb(0, 0, 255);
    pub const RED: Rgb = Rgb(255, 0, 0);
    pub const YELLOW: Rgb = Rgb(255, 255, 0);

    pub fn r(self) -> u8 {
        self.0
    }

    pub fn g(self) -> u8 {
        self.1
    }

    pub fn b(self) -> u8 {
        self.2
    }

    /// Linear blend towards `other` by `t` (0.0 keeps self, 1.0 gives other)
    pub fn mix(self, other: Rgb, t: f32) -> Rgb {
        let t = t.clamp(0.0, 1.0);
        let lerp = |a: u8, b: u8| (a as f32 + (b as f32 - a as f32) * t).round() as u8;
        Rgb(lerp(self.0, other.0), lerp(self.1, other.1), lerp(self.2, other.2))
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.0, self.1, self.2)
    }
}

/// Errors produced while parsing a hex color string
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseColorError {
    #[error("color is empty")]
    Empty,
    #[error("expected 3 or 6 hex digits, got {0}")]
    BadLength(usize),
    #[error("invalid hex digit in {0:?}")]
    BadDigit(String),
}

impl FromStr for Rgb {
    type Err = ParseColorError;

    /// Accepts `#RRGGBB`, `RRGGBB`, `#RGB` and `RGB`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s.trim();
        let hex = hex.strip_prefix('#').unwrap_or(hex);
        if hex.is_empty() {
            return Err(ParseColorError::Empty);
        }
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ParseColorError::BadDigit(s.to_string()));
        }

        let channel = |digits: &str| {
            u8::from_str_radix(digits, 16).map_err(|_| ParseColorError::BadDigit(s.to_string()))
        };

        match hex.len() {
            6 => Ok(Rgb(channel(&hex[0..2])?, channel(&hex[2..4])?, channel(&hex[4..6])?)),
            3 => {
                // #abc is shorthand for #aabbcc
                let short = |i: usize| channel(&hex[i..i + 1]).map(|v| v * 17);
                Ok(Rgb(short(0)?, short(1)?, short(2)?))
            }
            n => Err(ParseColorError::BadLength(n)),
        }
    }
}

/// Swatches offered by the color picker, row-major in a 4x4 grid
pub const SWATCHES: [Rgb; 16] = [
    Rgb(0, 0, 0),
    Rgb(128, 128, 128),
    Rgb(192, 192, 192),
    Rgb(255, 255, 255),
    Rgb(255, 0, 0),
    Rgb(255, 128, 0),
    Rgb(255, 255, 0),
    Rgb(128, 64, 0),
    Rgb(0, 128, 0),
    Rgb(0, 255, 0),
    Rgb(0, 255, 255),
    Rgb(0, 128, 128),
    Rgb(0, 0, 255),
    Rgb(0, 0, 128),
    Rgb(128, 0, 128),
    Rgb(255, 0, 255),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_long_hex_with_and_without_hash() {
        assert_eq!("#1a2b3c".parse::<Rgb>(), Ok(Rgb(0x1a, 0x2b, 0x3c)));
        assert_eq!("FF8000".parse::<Rgb>(), Ok(Rgb(255, 128, 0)));
    }

    #[test]
    fn parses_short_hex() {
        assert_eq!("#f0a".parse::<Rgb>(), Ok(Rgb(255, 0, 170)));
    }

    #[test]
    fn rejects_malformed_hex() {
        assert_eq!("".parse::<Rgb>(), Err(ParseColorError::Empty));
        assert_eq!("#".parse::<Rgb>(), Err(ParseColorError::Empty));
        assert_eq!("#12345".parse::<Rgb>(), Err(ParseColorError::BadLength(5)));
        assert!(matches!("#12345g".parse::<Rgb>(), Err(ParseColorError::BadDigit(_))));
        assert!(matches!("#ééé".parse::<Rgb>(), Err(ParseColorError::BadDigit(_))));
    }

    #[test]
    fn display_round_trips_through_parse() {
        let color = Rgb(3, 200, 17);
        assert_eq!(color.to_string(), "#03c811");
        assert_eq!(color.to_string().parse::<Rgb>(), Ok(color));
    }

    #[test]
    fn mix_hits_endpoints() {
        assert_eq!(Rgb::BLACK.mix(Rgb::WHITE, 0.0), Rgb::BLACK);
        assert_eq!(Rgb::BLACK.mix(Rgb::WHITE, 1.0), Rgb::WHITE);
        assert_eq!(Rgb::BLACK.mix(Rgb::WHITE, 0.5), Rgb(128, 128, 128));
    }
}
