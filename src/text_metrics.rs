use fontdb::{Database, Family, Query, Stretch, Style, Weight};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::sync::Mutex;
use ttf_parser::Face;

/// Advance used for glyphs the font cannot map, as a fraction of the font size.
const FALLBACK_ADVANCE: f32 = 0.56;

static FONTS: Lazy<Mutex<FontCache>> = Lazy::new(|| Mutex::new(FontCache::new()));

/// Width of `text` in pixels, or `None` when no usable font is installed.
pub fn measure_text_width(text: &str, font_size: f32, font_family: &str) -> Option<f32> {
    if text.is_empty() || font_size <= 0.0 {
        return Some(0.0);
    }
    let mut guard = FONTS.lock().ok()?;
    let font = guard.font(font_family)?;
    Some(font.width(text, font_size))
}

/// Cheap estimate used when fonts are unavailable or fast metrics are requested.
pub fn estimate_text_width(text: &str, font_size: f32) -> f32 {
    let mut width = 0.0;
    for ch in text.chars() {
        width += if ch.is_ascii() {
            font_size * FALLBACK_ADVANCE
        } else {
            // Symbols and CJK glyphs are usually full-width.
            font_size
        };
    }
    width
}

struct FontCache {
    db: Database,
    system_loaded: bool,
    faces: HashMap<String, Option<LoadedFont>>,
}

impl FontCache {
    fn new() -> Self {
        Self {
            db: Database::new(),
            system_loaded: false,
            faces: HashMap::new(),
        }
    }

    fn font(&mut self, font_family: &str) -> Option<&LoadedFont> {
        let key = font_family.trim().to_string();
        if !self.faces.contains_key(&key) {
            let loaded = self.load(font_family);
            if loaded.is_none() {
                tracing::debug!(family = %font_family, "no font face found, using estimates");
            }
            self.faces.insert(key.clone(), loaded);
        }
        self.faces.get(&key).and_then(|font| font.as_ref())
    }

    fn load(&mut self, font_family: &str) -> Option<LoadedFont> {
        if !self.system_loaded {
            self.db.load_system_fonts();
            self.system_loaded = true;
        }

        let names: Vec<String> = font_family
            .split(',')
            .map(|part| part.trim().trim_matches('"').trim_matches('\'').to_string())
            .filter(|part| !part.is_empty())
            .collect();
        let mut families: Vec<Family<'_>> = names
            .iter()
            .map(|name| match name.to_ascii_lowercase().as_str() {
                "serif" => Family::Serif,
                "monospace" | "ui-monospace" => Family::Monospace,
                "sans-serif" | "system-ui" | "-apple-system" | "ui-sans-serif" => {
                    Family::SansSerif
                }
                _ => Family::Name(name.as_str()),
            })
            .collect();
        if families.is_empty() {
            families.push(Family::SansSerif);
        }

        let query = Query {
            families: &families,
            weight: Weight::NORMAL,
            stretch: Stretch::Normal,
            style: Style::Normal,
        };
        let id = self.db.query(&query)?;
        self.db
            .with_face_data(id, |data, index| LoadedFont::parse(data.to_vec(), index))
            .flatten()
    }
}

struct LoadedFont {
    data: Vec<u8>,
    index: u32,
    units_per_em: f32,
    ascii_advances: [u16; 128],
}

impl LoadedFont {
    fn parse(data: Vec<u8>, index: u32) -> Option<Self> {
        let face = Face::parse(&data, index).ok()?;
        let mut ascii_advances = [0u16; 128];
        for byte in 0u8..=127 {
            if let Some(glyph) = face.glyph_index(byte as char) {
                ascii_advances[byte as usize] = face.glyph_hor_advance(glyph).unwrap_or(0);
            }
        }
        let units_per_em = face.units_per_em().max(1) as f32;
        Some(Self {
            data,
            index,
            units_per_em,
            ascii_advances,
        })
    }

    fn width(&self, text: &str, font_size: f32) -> f32 {
        let scale = font_size / self.units_per_em;
        let fallback = font_size * FALLBACK_ADVANCE;
        let mut face = None;
        let mut width = 0.0f32;
        for ch in text.chars() {
            if ch == '\n' {
                continue;
            }
            let advance = if ch.is_ascii() {
                self.ascii_advances[ch as usize]
            } else {
                if face.is_none() {
                    face = Face::parse(&self.data, self.index).ok();
                }
                face.as_ref()
                    .and_then(|f| f.glyph_index(ch).and_then(|g| f.glyph_hor_advance(g)))
                    .unwrap_or(0)
            };
            width += if advance == 0 {
                fallback
            } else {
                advance as f32 * scale
            };
        }
        width.max(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_text_is_zero_wide() {
        assert_eq!(measure_text_width("", 16.0, "sans-serif"), Some(0.0));
        assert_eq!(estimate_text_width("", 16.0), 0.0);
    }

    #[test]
    fn estimate_grows_with_length() {
        let short = estimate_text_width("ab", 16.0);
        let long = estimate_text_width("abcd", 16.0);
        assert!(long > short);
        assert!((short - 2.0 * 16.0 * FALLBACK_ADVANCE).abs() < 1e-4);
    }
}
