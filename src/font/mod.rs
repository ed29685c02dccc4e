//! # Font Management
//!
//! The width-measurement primitive the layout engine is built on.
//!
//! Helvetica and Courier are built in as standard PDF fonts (no embedding).
//! Custom TrueType families are registered from raw font bytes and measured
//! with real glyph advances via ttf-parser. Every family used for layout must
//! have all four variants (regular, bold, italic, bold-italic) registered
//! before the first measurement; `FontContext::require_family` is the
//! startup check for that.

pub mod metrics;

pub use metrics::StandardFontMetrics;

use std::collections::HashMap;
use std::path::Path;

use crate::error::PressError;

/// Weight used for regular text.
pub const REGULAR: u32 = 400;
/// Weight used for bold text.
pub const BOLD: u32 = 700;

/// A font registry that maps font family + weight + style to font data.
pub struct FontRegistry {
    fonts: HashMap<FontKey, FontData>,
}

#[derive(Debug, Clone, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct FontKey {
    pub family: String,
    pub weight: u32,
    pub italic: bool,
}

impl FontKey {
    pub fn new(family: &str, bold: bool, italic: bool) -> Self {
        Self {
            family: family.to_string(),
            weight: if bold { BOLD } else { REGULAR },
            italic,
        }
    }

    pub fn is_bold(&self) -> bool {
        self.weight >= 600
    }
}

#[derive(Debug, Clone)]
pub enum FontData {
    /// One of the standard PDF fonts. No embedding needed.
    Standard(StandardFont),
    /// A TrueType/OpenType font that gets embedded in the output.
    Custom {
        data: Vec<u8>,
        metrics: CustomFontMetrics,
    },
}

/// Parsed metrics from a TrueType/OpenType font via ttf-parser.
#[derive(Debug, Clone)]
pub struct CustomFontMetrics {
    pub units_per_em: u16,
    pub advance_widths: HashMap<char, u16>,
    pub default_advance: u16,
    pub ascender: i16,
    pub descender: i16,
    /// Maps characters to their glyph IDs in the font.
    pub glyph_ids: HashMap<char, u16>,
}

impl CustomFontMetrics {
    /// Get the advance width of a character in points.
    pub fn char_width(&self, ch: char, font_size: f64) -> f64 {
        let w = self
            .advance_widths
            .get(&ch)
            .copied()
            .unwrap_or(self.default_advance);
        (w as f64 / self.units_per_em as f64) * font_size
    }

    /// Parse metrics from font data using ttf-parser.
    pub fn from_font_data(data: &[u8]) -> Result<Self, ttf_parser::FaceParsingError> {
        let face = ttf_parser::Face::parse(data, 0)?;
        let units_per_em = face.units_per_em();

        let mut advance_widths = HashMap::new();
        let mut glyph_ids = HashMap::new();
        let mut default_advance = 0u16;

        // Latin, Latin-1 and General Punctuation cover measure content.
        let ranges = [0x20u32..=0x24F, 0x2000..=0x206F, 0x2100..=0x22FF];
        for code in ranges.into_iter().flatten() {
            let Some(ch) = char::from_u32(code) else {
                continue;
            };
            if let Some(glyph_id) = face.glyph_index(ch) {
                let advance = face.glyph_hor_advance(glyph_id).unwrap_or(0);
                advance_widths.insert(ch, advance);
                glyph_ids.insert(ch, glyph_id.0);
                if ch == ' ' {
                    default_advance = advance;
                }
            }
        }

        if default_advance == 0 {
            default_advance = units_per_em / 2;
        }

        Ok(CustomFontMetrics {
            units_per_em,
            advance_widths,
            default_advance,
            ascender: face.ascender(),
            descender: face.descender(),
            glyph_ids,
        })
    }
}

/// The standard PDF fonts the engine knows metrics for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StandardFont {
    Helvetica,
    HelveticaBold,
    HelveticaOblique,
    HelveticaBoldOblique,
    Courier,
    CourierBold,
    CourierOblique,
    CourierBoldOblique,
}

impl StandardFont {
    /// The PDF name for this font.
    pub fn pdf_name(&self) -> &'static str {
        match self {
            Self::Helvetica => "Helvetica",
            Self::HelveticaBold => "Helvetica-Bold",
            Self::HelveticaOblique => "Helvetica-Oblique",
            Self::HelveticaBoldOblique => "Helvetica-BoldOblique",
            Self::Courier => "Courier",
            Self::CourierBold => "Courier-Bold",
            Self::CourierOblique => "Courier-Oblique",
            Self::CourierBoldOblique => "Courier-BoldOblique",
        }
    }

    pub fn metrics(&self) -> StandardFontMetrics {
        match self {
            Self::Helvetica | Self::HelveticaOblique => StandardFontMetrics::HELVETICA,
            Self::HelveticaBold | Self::HelveticaBoldOblique => StandardFontMetrics::HELVETICA_BOLD,
            Self::Courier | Self::CourierBold | Self::CourierOblique | Self::CourierBoldOblique => {
                StandardFontMetrics::COURIER
            }
        }
    }
}

impl Default for FontRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl FontRegistry {
    pub fn new() -> Self {
        let mut fonts = HashMap::new();

        let standard_mappings = [
            (("Helvetica", REGULAR, false), StandardFont::Helvetica),
            (("Helvetica", BOLD, false), StandardFont::HelveticaBold),
            (("Helvetica", REGULAR, true), StandardFont::HelveticaOblique),
            (("Helvetica", BOLD, true), StandardFont::HelveticaBoldOblique),
            (("Courier", REGULAR, false), StandardFont::Courier),
            (("Courier", BOLD, false), StandardFont::CourierBold),
            (("Courier", REGULAR, true), StandardFont::CourierOblique),
            (("Courier", BOLD, true), StandardFont::CourierBoldOblique),
        ];

        for ((family, weight, italic), font) in standard_mappings {
            fonts.insert(
                FontKey {
                    family: family.to_string(),
                    weight,
                    italic,
                },
                FontData::Standard(font),
            );
        }

        Self { fonts }
    }

    /// Look up a registered font. Weights snap to regular or bold; there is
    /// no fallback to another family.
    pub fn resolve(&self, family: &str, weight: u32, italic: bool) -> Result<&FontData, PressError> {
        let snapped = if weight >= 600 { BOLD } else { REGULAR };
        let key = FontKey {
            family: family.to_string(),
            weight: snapped,
            italic,
        };
        self.fonts.get(&key).ok_or_else(|| {
            PressError::Measurement(format!(
                "font '{}' (weight {}, italic {}) is not registered",
                family, snapped, italic
            ))
        })
    }

    /// Register a custom TrueType font variant.
    pub fn register(
        &mut self,
        family: &str,
        weight: u32,
        italic: bool,
        data: Vec<u8>,
    ) -> Result<(), PressError> {
        let metrics = CustomFontMetrics::from_font_data(&data).map_err(|e| {
            PressError::Font(format!("failed to parse font data for '{}': {}", family, e))
        })?;
        log::debug!(
            "registered font '{}' weight {} italic {} ({} glyphs mapped)",
            family,
            weight,
            italic,
            metrics.glyph_ids.len()
        );
        self.fonts.insert(
            FontKey {
                family: family.to_string(),
                weight,
                italic,
            },
            FontData::Custom { data, metrics },
        );
        Ok(())
    }

    /// Register a custom font variant from a file on disk.
    pub fn register_file(
        &mut self,
        family: &str,
        weight: u32,
        italic: bool,
        path: &Path,
    ) -> Result<(), PressError> {
        let data = std::fs::read(path).map_err(|e| {
            PressError::Font(format!("cannot read font file {}: {}", path.display(), e))
        })?;
        self.register(family, weight, italic, data)
    }

    pub fn contains(&self, key: &FontKey) -> bool {
        self.fonts.contains_key(key)
    }
}

/// Shared font context used by layout and PDF serialization.
pub struct FontContext {
    registry: FontRegistry,
}

impl Default for FontContext {
    fn default() -> Self {
        Self::new()
    }
}

impl FontContext {
    pub fn new() -> Self {
        Self {
            registry: FontRegistry::new(),
        }
    }

    /// Check that all four variants of `family` are registered.
    pub fn require_family(&self, family: &str) -> Result<(), PressError> {
        let missing: Vec<String> = [(false, false), (true, false), (false, true), (true, true)]
            .into_iter()
            .map(|(bold, italic)| FontKey::new(family, bold, italic))
            .filter(|key| !self.registry.contains(key))
            .map(|key| variant_name(&key).to_string())
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(PressError::Font(format!(
                "font family '{}' is missing variants: {}",
                family,
                missing.join(", ")
            )))
        }
    }

    /// Get the advance width of a single character in points.
    pub fn char_width(
        &self,
        ch: char,
        family: &str,
        weight: u32,
        italic: bool,
        font_size: f64,
    ) -> Result<f64, PressError> {
        Ok(match self.registry.resolve(family, weight, italic)? {
            FontData::Standard(std_font) => std_font.metrics().char_width(ch, font_size),
            FontData::Custom { metrics, .. } => metrics.char_width(ch, font_size),
        })
    }

    /// Measure the width of a string in points.
    pub fn measure_string(
        &self,
        text: &str,
        family: &str,
        weight: u32,
        italic: bool,
        font_size: f64,
    ) -> Result<f64, PressError> {
        Ok(match self.registry.resolve(family, weight, italic)? {
            FontData::Standard(std_font) => std_font.metrics().measure_string(text, font_size, 0.0),
            FontData::Custom { metrics, .. } => {
                text.chars().map(|ch| metrics.char_width(ch, font_size)).sum()
            }
        })
    }

    /// Resolve a font key to its font data.
    pub fn resolve(&self, family: &str, weight: u32, italic: bool) -> Result<&FontData, PressError> {
        self.registry.resolve(family, weight, italic)
    }

    /// Access the underlying font registry.
    pub fn registry(&self) -> &FontRegistry {
        &self.registry
    }

    /// Access the underlying font registry mutably.
    pub fn registry_mut(&mut self) -> &mut FontRegistry {
        &mut self.registry
    }
}

fn variant_name(key: &FontKey) -> &'static str {
    match (key.is_bold(), key.italic) {
        (false, false) => "regular",
        (true, false) => "bold",
        (false, true) => "italic",
        (true, true) => "bold-italic",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_font_context_helvetica() {
        let ctx = FontContext::new();
        let w = ctx.char_width(' ', "Helvetica", REGULAR, false, 12.0).unwrap();
        assert!((w - 3.336).abs() < 0.001);
    }

    #[test]
    fn test_font_context_bold_wider() {
        let ctx = FontContext::new();
        let regular = ctx.measure_string("energy", "Helvetica", REGULAR, false, 12.0).unwrap();
        let bold = ctx.measure_string("energy", "Helvetica", BOLD, false, 12.0).unwrap();
        assert!(bold > regular, "bold text should be wider");
    }

    #[test]
    fn test_unknown_family_is_measurement_error() {
        let ctx = FontContext::new();
        let err = ctx
            .measure_string("A", "UnknownFont", REGULAR, false, 12.0)
            .unwrap_err();
        assert!(matches!(err, PressError::Measurement(_)));
    }

    #[test]
    fn test_weight_snaps_to_bold() {
        let ctx = FontContext::new();
        let w700 = ctx.char_width('A', "Helvetica", 700, false, 12.0).unwrap();
        let w800 = ctx.char_width('A', "Helvetica", 800, false, 12.0).unwrap();
        assert!((w700 - w800).abs() < 0.001);
    }

    #[test]
    fn test_require_family() {
        let ctx = FontContext::new();
        assert!(ctx.require_family("Helvetica").is_ok());
        assert!(ctx.require_family("Courier").is_ok());
        let err = ctx.require_family("Inter").unwrap_err();
        assert!(matches!(err, PressError::Font(_)));
        assert!(err.to_string().contains("bold-italic"));
    }

    #[test]
    fn test_register_rejects_garbage() {
        let mut ctx = FontContext::new();
        let err = ctx
            .registry_mut()
            .register("Broken", REGULAR, false, vec![0, 1, 2, 3])
            .unwrap_err();
        assert!(matches!(err, PressError::Font(_)));
    }
}
