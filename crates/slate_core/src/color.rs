//! Background colors: hex strings on the way in, channel triples everywhere else.

use serde::Deserialize;

/// An 8-bit-per-channel RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ColorParseError {
    #[error("color '{0}' must have exactly 6 hex digits (RRGGBB)")]
    BadLength(String),

    #[error("color '{0}' contains non-hex characters")]
    NotHex(String),
}

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);
    pub const WHITE: Rgb = Rgb::new(255, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse `RRGGBB`, with or without a leading `#`.
    pub fn from_hex(hex: &str) -> Result<Self, ColorParseError> {
        let digits = hex.trim().trim_start_matches('#');
        if digits.len() != 6 {
            return Err(ColorParseError::BadLength(hex.to_string()));
        }
        if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ColorParseError::NotHex(hex.to_string()));
        }
        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&digits[range], 16)
                .map_err(|_| ColorParseError::NotHex(hex.to_string()))
        };
        Ok(Self {
            r: channel(0..2)?,
            g: channel(2..4)?,
            b: channel(4..6)?,
        })
    }

    /// Uppercase `RRGGBB` without the `#`.
    pub fn to_hex(self) -> String {
        format!("{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }

    /// Channels in `[0, 1]`, the form GPU clear colors want.
    pub fn to_normalized(self) -> [f32; 3] {
        [
            self.r as f32 / 255.0,
            self.g as f32 / 255.0,
            self.b as f32 / 255.0,
        ]
    }

    pub fn from_normalized(channels: [f32; 3]) -> Self {
        let to_u8 = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
        Self {
            r: to_u8(channels[0]),
            g: to_u8(channels[1]),
            b: to_u8(channels[2]),
        }
    }

    pub fn to_rgba8(self) -> [u8; 4] {
        [self.r, self.g, self.b, 255]
    }
}

impl std::fmt::Display for Rgb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.to_hex())
    }
}

/// Config-file form of a color: either `"#RRGGBB"` or `[r, g, b]`.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ColorSpec {
    Hex(String),
    Triple([u8; 3]),
}

impl TryFrom<ColorSpec> for Rgb {
    type Error = ColorParseError;

    fn try_from(spec: ColorSpec) -> Result<Self, Self::Error> {
        match spec {
            ColorSpec::Hex(hex) => Rgb::from_hex(&hex),
            ColorSpec::Triple([r, g, b]) => Ok(Rgb::new(r, g, b)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_hex_accepts_optional_hash() {
        assert_eq!(Rgb::from_hex("#FF8000"), Ok(Rgb::new(255, 128, 0)));
        assert_eq!(Rgb::from_hex("ff8000"), Ok(Rgb::new(255, 128, 0)));
    }

    #[test]
    fn from_hex_rejects_wrong_length() {
        assert!(matches!(
            Rgb::from_hex("#FFF"),
            Err(ColorParseError::BadLength(_))
        ));
        assert!(matches!(
            Rgb::from_hex("1234567"),
            Err(ColorParseError::BadLength(_))
        ));
    }

    #[test]
    fn from_hex_rejects_non_hex_digits() {
        assert!(matches!(
            Rgb::from_hex("#GG0000"),
            Err(ColorParseError::NotHex(_))
        ));
        // Sign characters would slip through from_str_radix on their own.
        assert!(matches!(
            Rgb::from_hex("+10000"),
            Err(ColorParseError::NotHex(_))
        ));
    }

    #[test]
    fn to_hex_is_uppercase_without_hash() {
        assert_eq!(Rgb::new(10, 171, 255).to_hex(), "0AABFF");
        assert_eq!(Rgb::new(10, 171, 255).to_string(), "#0AABFF");
    }

    #[test]
    fn normalized_conversion_is_reversible() {
        let color = Rgb::new(12, 200, 255);
        assert_eq!(Rgb::from_normalized(color.to_normalized()), color);
        assert_eq!(Rgb::WHITE.to_normalized(), [1.0, 1.0, 1.0]);
    }

    #[test]
    fn from_normalized_clamps_out_of_range() {
        assert_eq!(Rgb::from_normalized([-1.0, 2.0, 0.5]), Rgb::new(0, 255, 128));
    }

    #[test]
    fn color_spec_deserializes_both_forms() {
        let hex: ColorSpec = serde_json::from_str(r##""#102030""##).expect("hex spec");
        let triple: ColorSpec = serde_json::from_str("[16, 32, 48]").expect("triple spec");
        assert_eq!(Rgb::try_from(hex), Ok(Rgb::new(16, 32, 48)));
        assert_eq!(Rgb::try_from(triple), Ok(Rgb::new(16, 32, 48)));
    }
}
