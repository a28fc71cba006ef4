//! Category to stroke color lookup

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{OverlayError, Result};

/// An 8-bit color stored in B, G, R channel order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "[u8; 3]", into = "[u8; 3]")]
pub struct Color {
    pub b: u8,
    pub g: u8,
    pub r: u8,
}

impl Color {
    pub const fn bgr(b: u8, g: u8, r: u8) -> Self {
        Self { b, g, r }
    }

    pub const fn to_bgr(self) -> [u8; 3] {
        [self.b, self.g, self.r]
    }

    pub const fn to_rgb(self) -> [u8; 3] {
        [self.r, self.g, self.b]
    }
}

impl From<[u8; 3]> for Color {
    fn from([b, g, r]: [u8; 3]) -> Self {
        Self { b, g, r }
    }
}

impl From<Color> for [u8; 3] {
    fn from(c: Color) -> Self {
        c.to_bgr()
    }
}

/// The stock BDD100K MOT palette, B,G,R
pub const DEFAULT_PALETTE: &[(&str, Color)] = &[
    ("car", Color::bgr(0, 0, 255)),
    ("truck", Color::bgr(0, 0, 100)),
    ("pedestrian", Color::bgr(255, 0, 0)),
    ("other vehicle", Color::bgr(0, 0, 150)),
    ("rider", Color::bgr(200, 0, 0)),
    ("bicycle", Color::bgr(0, 255, 0)),
    ("other person", Color::bgr(200, 0, 0)),
    ("trailer", Color::bgr(0, 150, 150)),
    ("motorcycle", Color::bgr(0, 150, 0)),
    ("bus", Color::bgr(0, 0, 100)),
];

pub fn default_palette() -> HashMap<String, Color> {
    DEFAULT_PALETTE
        .iter()
        .map(|(name, color)| (name.to_string(), *color))
        .collect()
}

/// Immutable category table, fixed at construction
#[derive(Debug, Clone, PartialEq)]
pub struct ColorResolver {
    table: HashMap<String, Color>,
}

impl ColorResolver {
    pub fn new(table: HashMap<String, Color>) -> Self {
        Self { table }
    }

    pub fn resolve(&self, category: &str) -> Result<Color> {
        self.table
            .get(category)
            .copied()
            .ok_or_else(|| OverlayError::UnknownCategory(category.to_string()))
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

impl Default for ColorResolver {
    fn default() -> Self {
        Self::new(default_palette())
    }
}
