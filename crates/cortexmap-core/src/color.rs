use serde::{Deserialize, Serialize};

use crate::error::{check_len, Error, Result};

/// RGBA color with channels in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rgba {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Default for Rgba {
    fn default() -> Self {
        Self::WHITE
    }
}

impl Rgba {
    pub const WHITE: Rgba = Rgba::new(1.0, 1.0, 1.0, 1.0);
    pub const BLACK: Rgba = Rgba::new(0.0, 0.0, 0.0, 1.0);
    pub const TRANSPARENT: Rgba = Rgba::new(0.0, 0.0, 0.0, 0.0);

    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub const fn gray(level: f32) -> Self {
        Self::new(level, level, level, 1.0)
    }

    pub fn from_u8(r: u8, g: u8, b: u8) -> Self {
        Self::new(r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0, 1.0)
    }

    pub fn with_alpha(mut self, alpha: f32) -> Self {
        self.a = alpha;
        self
    }

    pub fn to_array(&self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }

    pub fn from_slice(row: &[f32]) -> Option<Self> {
        match *row {
            [r, g, b] => Some(Self::new(r, g, b, 1.0)),
            [r, g, b, a] => Some(Self::new(r, g, b, a)),
            _ => None,
        }
    }

    /// Channel-wise `self * (1 - t) + other * t`, alpha included.
    ///
    /// `t == 0` returns `self` and `t == 1` returns `other` exactly.
    pub fn mix(&self, other: &Rgba, t: f32) -> Rgba {
        let s = 1.0 - t;
        Rgba::new(
            self.r * s + other.r * t,
            self.g * s + other.g * t,
            self.b * s + other.b * t,
            self.a * s + other.a * t,
        )
    }

    /// Parse a hex string (`#rgb`, `#rrggbb`, `#rrggbbaa`) or a named color.
    pub fn parse(name: &str) -> Result<Self> {
        let name = name.trim();
        if let Some(hex) = name.strip_prefix('#') {
            return parse_hex(hex).ok_or_else(|| Error::UnknownColor(name.to_string()));
        }
        let lower = name.to_ascii_lowercase();
        NAMED_COLORS
            .iter()
            .find(|(n, _)| *n == lower)
            .map(|(_, rgb)| Rgba::from_u8(rgb[0], rgb[1], rgb[2]))
            .ok_or_else(|| Error::UnknownColor(name.to_string()))
    }
}

fn parse_hex(hex: &str) -> Option<Rgba> {
    if !hex.is_ascii() {
        return None;
    }
    let byte = |s: &str| u8::from_str_radix(s, 16).ok();
    match hex.len() {
        3 => {
            let mut c = [0u8; 3];
            for (i, ch) in hex.chars().enumerate() {
                let v = ch.to_digit(16)? as u8;
                c[i] = v * 17;
            }
            Some(Rgba::from_u8(c[0], c[1], c[2]))
        }
        6 => Some(Rgba::from_u8(
            byte(&hex[0..2])?,
            byte(&hex[2..4])?,
            byte(&hex[4..6])?,
        )),
        8 => Some(
            Rgba::from_u8(byte(&hex[0..2])?, byte(&hex[2..4])?, byte(&hex[4..6])?)
                .with_alpha(byte(&hex[6..8])? as f32 / 255.0),
        ),
        _ => None,
    }
}

const NAMED_COLORS: &[(&str, [u8; 3])] = &[
    ("white", [255, 255, 255]),
    ("black", [0, 0, 0]),
    ("gray", [128, 128, 128]),
    ("grey", [128, 128, 128]),
    ("lightgray", [211, 211, 211]),
    ("darkgray", [169, 169, 169]),
    ("red", [255, 0, 0]),
    ("green", [0, 128, 0]),
    ("blue", [0, 0, 255]),
    ("yellow", [255, 255, 0]),
    ("orange", [255, 165, 0]),
    ("purple", [128, 0, 128]),
    ("cyan", [0, 255, 255]),
    ("magenta", [255, 0, 255]),
    ("slateblue", [106, 90, 205]),
    ("crimson", [220, 20, 60]),
    ("teal", [0, 128, 128]),
];

/// Color specification for a set of N points.
///
/// Resolved once into one RGBA per point by [`ColorInput::resolve`]. Rows
/// are never transposed: a list or array must have exactly N entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ColorInput {
    /// One color shared by every point.
    Named(String),
    /// One named or hex color per point.
    List(Vec<String>),
    /// One RGB or RGBA row per point.
    Array(Vec<Vec<f32>>),
}

impl ColorInput {
    pub fn named(name: &str) -> Self {
        ColorInput::Named(name.to_string())
    }

    /// Resolve into `n` colors. `opacity` replaces the alpha of named and
    /// listed colors; array rows keep their own alpha when they carry one.
    pub fn resolve(&self, n: usize, opacity: f32) -> Result<Vec<Rgba>> {
        match self {
            ColorInput::Named(name) => {
                let color = Rgba::parse(name)?.with_alpha(opacity);
                Ok(vec![color; n])
            }
            ColorInput::List(names) => {
                check_len("color list", n, names.len())?;
                names
                    .iter()
                    .map(|name| Ok(Rgba::parse(name)?.with_alpha(opacity)))
                    .collect()
            }
            ColorInput::Array(rows) => {
                check_len("color array", n, rows.len())?;
                rows.iter()
                    .enumerate()
                    .map(|(row, values)| {
                        let color = Rgba::from_slice(values).ok_or(Error::ColorShape {
                            row,
                            width: values.len(),
                        })?;
                        Ok(if values.len() == 3 {
                            color.with_alpha(opacity)
                        } else {
                            color
                        })
                    })
                    .collect()
            }
        }
    }
}

impl Default for ColorInput {
    fn default() -> Self {
        ColorInput::named("#ab4652")
    }
}
