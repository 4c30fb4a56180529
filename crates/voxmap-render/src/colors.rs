//! Node color table.
//!
//! One entry per line: `name r g b [a] [t]`. Alpha defaults to 255 and
//! thickness to 0. Text after `#` is a comment. Lines with fewer than four
//! fields are skipped with a warning and later entries override earlier ones.

use std::collections::HashMap;
use std::path::Path;

use voxmap_core::Color;

use crate::error::RenderError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorEntry {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
    /// How much the node thins out colors seen through it.
    pub t: u8,
}

impl ColorEntry {
    pub fn color(&self) -> Color {
        Color::rgba(self.r, self.g, self.b, self.a)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ColorMap {
    entries: HashMap<String, ColorEntry>,
}

impl ColorMap {
    pub fn parse(text: &str) -> Self {
        let mut entries = HashMap::new();
        for raw in text.lines() {
            let line = raw.split('#').next().unwrap_or_default();
            if line.trim().is_empty() {
                continue;
            }
            match parse_entry(line) {
                Some((name, entry)) => {
                    entries.insert(name.to_string(), entry);
                }
                None => log::warn!("Failed to parse color entry '{}'", line.trim()),
            }
        }
        Self { entries }
    }

    pub fn load(path: &Path) -> Result<Self, RenderError> {
        let text = std::fs::read(path).map_err(|source| RenderError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::parse(&String::from_utf8_lossy(&text)))
    }

    pub fn get(&self, name: &str) -> Option<&ColorEntry> {
        self.entries.get(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Numbers are read up to the first field that is not an unsigned integer;
/// anything after it is ignored, so a malformed alpha also drops the
/// thickness. Values above 255 are clamped with a warning.
fn parse_entry(line: &str) -> Option<(&str, ColorEntry)> {
    let mut fields = line.split_whitespace();
    let name = fields.next()?;
    let mut numbers = fields
        .map_while(|f| f.parse::<u32>().ok())
        .map(move |v| clamp_channel(name, v));
    let r = numbers.next()?;
    let g = numbers.next()?;
    let b = numbers.next()?;
    let a = numbers.next().unwrap_or(255);
    let t = numbers.next().unwrap_or(0);
    Some((name, ColorEntry { r, g, b, a, t }))
}

fn clamp_channel(name: &str, value: u32) -> u8 {
    u8::try_from(value).unwrap_or_else(|_| {
        log::warn!("Color value {value} for '{name}' is out of range, clamping to 255");
        u8::MAX
    })
}
