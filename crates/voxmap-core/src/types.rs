use crate::error::CoreError;

/// An RGBA color with 8 bits per channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Same color with a different alpha.
    pub const fn with_alpha(self, a: u8) -> Self {
        Self { a, ..self }
    }

    /// Parse a `#RRGGBB` color as given on the command line. Alpha is always 255.
    pub fn parse_hex(text: &str) -> Result<Self, CoreError> {
        if text.len() != 7 {
            return Err(CoreError::InvalidColorSpec(
                text.to_string(),
                "color needs to be 7 characters long",
            ));
        }
        let Some(hex) = text.strip_prefix('#') else {
            return Err(CoreError::InvalidColorSpec(
                text.to_string(),
                "color needs to begin with #",
            ));
        };
        // from_str_radix alone would also take a leading sign.
        if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(CoreError::InvalidColorSpec(
                text.to_string(),
                "not a hexadecimal color",
            ));
        }
        let value = u32::from_str_radix(hex, 16).map_err(|_| {
            CoreError::InvalidColorSpec(text.to_string(), "not a hexadecimal color")
        })?;
        Ok(Self::rgb(
            (value >> 16) as u8,
            (value >> 8) as u8,
            value as u8,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_color() {
        assert_eq!(Color::parse_hex("#ff8000"), Ok(Color::rgb(255, 128, 0)));
        assert_eq!(Color::parse_hex("#000000"), Ok(Color::rgb(0, 0, 0)));
    }

    #[test]
    fn test_parse_hex_color_rejects_malformed() {
        assert!(Color::parse_hex("ff8000").is_err());
        assert!(Color::parse_hex("#ff800").is_err());
        assert!(Color::parse_hex("xff8000").is_err());
        assert!(Color::parse_hex("#gg8000").is_err());
    }

    #[test]
    fn test_parse_hex_color_rejects_signs() {
        assert!(Color::parse_hex("#+12345").is_err());
        assert!(Color::parse_hex("#-12345").is_err());
        assert!(Color::parse_hex("# 12345").is_err());
    }
}
