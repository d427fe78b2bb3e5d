//! Color strings: parsing, normalization, and the fallback swatch.
//!
//! Nodes keep their color as the user-facing string (`#ff3b30`), but every
//! string that enters the store goes through [`Color::parse`] so material
//! aggregation can bucket `#FFF`, `#ffffff` and `rgb(255,255,255)` together.

use serde::{Deserialize, Serialize};
use winnow::ascii::multispace0;
use winnow::combinator::{alt, delimited, separated};
use winnow::error::{ContextError, ErrMode};
use winnow::prelude::*;
use winnow::token::take_while;

/// Swatch used when a color is missing or unparseable.
pub const FALLBACK_SWATCH: &str = "#ff3b30";

/// RGBA color with 8-bit channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Parse `#rgb`, `#rgba`, `#rrggbb`, `#rrggbbaa`, `rgb(r, g, b)` or
    /// `rgba(r, g, b, a)` (alpha in `[0, 1]`). Surrounding whitespace is
    /// ignored; anything else fails.
    pub fn parse(input: &str) -> Option<Self> {
        let mut rest = input.trim();
        let color = alt((parse_hex_color, parse_functional_color))
            .parse_next(&mut rest)
            .ok()?;
        rest.trim().is_empty().then_some(color)
    }

    /// Lowercase hex; alpha is only emitted when not fully opaque.
    pub fn to_hex(&self) -> String {
        if self.a == 255 {
            format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            format!("#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
        }
    }
}

/// Canonical lowercase hex for any accepted color string.
pub fn normalize(input: &str) -> Option<String> {
    Color::parse(input).map(|c| c.to_hex())
}

/// Normalize, or fall back to [`FALLBACK_SWATCH`].
pub fn normalize_or_fallback(input: &str) -> String {
    normalize(input).unwrap_or_else(|| FALLBACK_SWATCH.to_string())
}

fn hex_val(c: u8) -> u8 {
    match c {
        b'0'..=b'9' => c - b'0',
        b'a'..=b'f' => c - b'a' + 10,
        _ => c - b'A' + 10,
    }
}

fn parse_hex_color(input: &mut &str) -> ModalResult<Color> {
    let _ = '#'.parse_next(input)?;
    let digits: &str = take_while(3..=8, |c: char| c.is_ascii_hexdigit()).parse_next(input)?;
    let b = digits.as_bytes();
    let short = |i: usize| hex_val(b[i]) * 17;
    let long = |i: usize| (hex_val(b[i]) << 4) | hex_val(b[i + 1]);
    match b.len() {
        3 => Ok(Color::rgba(short(0), short(1), short(2), 255)),
        4 => Ok(Color::rgba(short(0), short(1), short(2), short(3))),
        6 => Ok(Color::rgba(long(0), long(2), long(4), 255)),
        8 => Ok(Color::rgba(long(0), long(2), long(4), long(6))),
        _ => Err(ErrMode::Backtrack(ContextError::new())),
    }
}

fn parse_number(input: &mut &str) -> ModalResult<f32> {
    let raw: &str = delimited(
        multispace0,
        take_while(1.., |c: char| c.is_ascii_digit() || c == '.'),
        multispace0,
    )
    .parse_next(input)?;
    raw.parse::<f32>()
        .map_err(|_| ErrMode::Backtrack(ContextError::new()))
}

fn parse_functional_color(input: &mut &str) -> ModalResult<Color> {
    let _ = alt(("rgba", "rgb")).parse_next(input)?;
    let _ = (multispace0, '(').parse_next(input)?;
    let parts: Vec<f32> = separated(3..=4, parse_number, ',').parse_next(input)?;
    let _ = ')'.parse_next(input)?;

    let channel = |v: f32| v.clamp(0.0, 255.0).round() as u8;
    let alpha = parts
        .get(3)
        .map_or(255, |a| (a.clamp(0.0, 1.0) * 255.0).round() as u8);
    Ok(Color::rgba(
        channel(parts[0]),
        channel(parts[1]),
        channel(parts[2]),
        alpha,
    ))
}
