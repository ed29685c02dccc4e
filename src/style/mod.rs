//! # Style Sheet
//!
//! Named paragraph and table style records. The catalog is built once, before
//! any parsing or layout, and is read-only afterwards: builders borrow it by
//! shared reference and never mutate it.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::PressError;
use crate::model::Edges;

/// An RGBA color.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f64, // 0.0 - 1.0
    pub g: f64,
    pub b: f64,
    pub a: f64,
}

impl Color {
    pub const BLACK: Color = Color {
        r: 0.0,
        g: 0.0,
        b: 0.0,
        a: 1.0,
    };
    pub const WHITE: Color = Color {
        r: 1.0,
        g: 1.0,
        b: 1.0,
        a: 1.0,
    };

    pub fn rgb(r: f64, g: f64, b: f64) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    pub fn hex(hex: &str) -> Self {
        let hex = hex.trim_start_matches('#');
        let (r, g, b) = match hex.len() {
            3 => {
                let r = u8::from_str_radix(&hex[0..1].repeat(2), 16).unwrap_or(0);
                let g = u8::from_str_radix(&hex[1..2].repeat(2), 16).unwrap_or(0);
                let b = u8::from_str_radix(&hex[2..3].repeat(2), 16).unwrap_or(0);
                (r, g, b)
            }
            6 => {
                let r = u8::from_str_radix(&hex[0..2], 16).unwrap_or(0);
                let g = u8::from_str_radix(&hex[2..4], 16).unwrap_or(0);
                let b = u8::from_str_radix(&hex[4..6], 16).unwrap_or(0);
                (r, g, b)
            }
            _ => (0, 0, 0),
        };
        Self {
            r: r as f64 / 255.0,
            g: g as f64 / 255.0,
            b: b as f64 / 255.0,
            a: 1.0,
        }
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::BLACK
    }
}

/// A paragraph style record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParagraphStyle {
    pub name: String,
    pub font_family: String,
    pub font_size: f64,
    /// Distance between consecutive baselines, in points.
    pub leading: f64,
    /// Render every run of this paragraph in the bold variant.
    #[serde(default)]
    pub bold: bool,
    #[serde(default)]
    pub color: Color,
    #[serde(default)]
    pub space_before: f64,
    #[serde(default)]
    pub space_after: f64,
    #[serde(default)]
    pub left_indent: f64,
}

impl ParagraphStyle {
    fn new(name: &str, font_family: &str, font_size: f64, leading: f64) -> Self {
        Self {
            name: name.to_string(),
            font_family: font_family.to_string(),
            font_size,
            leading,
            bold: false,
            color: Color::BLACK,
            space_before: 0.0,
            space_after: 0.0,
            left_indent: 0.0,
        }
    }

    /// A copy of this style with the bold flag forced on.
    pub fn emboldened(&self) -> Self {
        Self {
            bold: true,
            ..self.clone()
        }
    }
}

/// A table style record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableStyle {
    pub name: String,
    /// Paragraph style for body cells.
    pub cell_style: String,
    /// Paragraph style for header cells.
    pub header_style: String,
    pub padding: Edges,
    pub grid_width: f64,
    pub grid_color: Color,
    pub header_background: Option<Color>,
    pub light_shade: Color,
    pub dark_shade: Color,
    /// Column range `[start, end)` whose body cells use the bold variant.
    #[serde(default)]
    pub bold_columns: Option<(usize, usize)>,
    #[serde(default)]
    pub space_after: f64,
}

/// How reference badges are painted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BadgeStyle {
    pub background: Color,
    pub text_color: Color,
    /// Horizontal padding added on each side of the label.
    pub padding: f64,
}

impl Default for BadgeStyle {
    fn default() -> Self {
        Self {
            background: Color::hex("#2f6f9f"),
            text_color: Color::WHITE,
            padding: 2.0,
        }
    }
}

/// The style catalog.
#[derive(Debug, Clone)]
pub struct StyleSheet {
    font_family: String,
    paragraphs: HashMap<String, ParagraphStyle>,
    tables: HashMap<String, TableStyle>,
    badge: BadgeStyle,
}

/// Names of the paragraph styles in the standard catalog.
pub mod names {
    pub const NORMAL: &str = "Normal";
    pub const TITLE: &str = "Title";
    pub const HEADING: &str = "Heading";
    pub const SUBHEADING: &str = "Subheading";
    pub const LIST_ITEM: &str = "ListItem";
    pub const TABLE_CELL: &str = "TableCell";
    pub const TABLE_HEADER: &str = "TableHeader";
    pub const LINK: &str = "Link";

    pub const DETAILS_TABLE: &str = "DetailsTable";
    pub const PARAMETERS_TABLE: &str = "ParametersTable";
    pub const SECTIONS_TABLE: &str = "SectionsTable";
    pub const MARKUP_TABLE: &str = "MarkupTable";
    pub const VALUE_TABLE: &str = "ValueTable";
}

impl StyleSheet {
    /// Build the standard catalog for a font family.
    pub fn standard(font_family: &str) -> Self {
        let f = font_family;
        let mut paragraphs = HashMap::new();

        let mut normal = ParagraphStyle::new(names::NORMAL, f, 10.0, 13.0);
        normal.space_after = 6.0;

        let mut title = ParagraphStyle::new(names::TITLE, f, 18.0, 22.0);
        title.bold = true;
        title.space_after = 10.0;

        let mut heading = ParagraphStyle::new(names::HEADING, f, 13.0, 16.0);
        heading.bold = true;
        heading.space_before = 4.0;
        heading.space_after = 6.0;
        heading.color = Color::hex("#1f3f5f");

        let mut subheading = ParagraphStyle::new(names::SUBHEADING, f, 11.0, 14.0);
        subheading.bold = true;
        subheading.space_after = 4.0;

        let mut list_item = ParagraphStyle::new(names::LIST_ITEM, f, 10.0, 13.0);
        list_item.left_indent = 12.0;
        list_item.space_after = 2.0;

        let cell = ParagraphStyle::new(names::TABLE_CELL, f, 9.0, 11.0);

        let mut header = ParagraphStyle::new(names::TABLE_HEADER, f, 9.0, 11.0);
        header.bold = true;
        header.color = Color::WHITE;

        let mut link = ParagraphStyle::new(names::LINK, f, 9.0, 11.0);
        link.color = Color::hex("#1a5fb4");

        for style in [normal, title, heading, subheading, list_item, cell, header, link] {
            paragraphs.insert(style.name.clone(), style);
        }

        let base = TableStyle {
            name: String::new(),
            cell_style: names::TABLE_CELL.to_string(),
            header_style: names::TABLE_HEADER.to_string(),
            padding: Edges {
                top: 3.0,
                right: 4.0,
                bottom: 3.0,
                left: 4.0,
            },
            grid_width: 0.5,
            grid_color: Color::hex("#9a9a9a"),
            header_background: Some(Color::hex("#1f3f5f")),
            light_shade: Color::hex("#ffffff"),
            dark_shade: Color::hex("#e8eef4"),
            bold_columns: None,
            space_after: 0.0,
        };

        let mut tables = HashMap::new();
        let table_styles = [
            TableStyle {
                name: names::DETAILS_TABLE.to_string(),
                bold_columns: Some((0, 1)),
                ..base.clone()
            },
            TableStyle {
                name: names::PARAMETERS_TABLE.to_string(),
                ..base.clone()
            },
            TableStyle {
                name: names::SECTIONS_TABLE.to_string(),
                ..base.clone()
            },
            TableStyle {
                name: names::MARKUP_TABLE.to_string(),
                space_after: 6.0,
                ..base.clone()
            },
            TableStyle {
                name: names::VALUE_TABLE.to_string(),
                space_after: 6.0,
                ..base
            },
        ];
        for style in table_styles {
            tables.insert(style.name.clone(), style);
        }

        Self {
            font_family: font_family.to_string(),
            paragraphs,
            tables,
            badge: BadgeStyle::default(),
        }
    }

    pub fn font_family(&self) -> &str {
        &self.font_family
    }

    /// Look up a paragraph style by name.
    pub fn paragraph(&self, name: &str) -> Result<&ParagraphStyle, PressError> {
        self.paragraphs
            .get(name)
            .ok_or_else(|| PressError::NotFound(format!("paragraph style '{}'", name)))
    }

    /// Whether a paragraph style with this name exists.
    pub fn has_paragraph(&self, name: &str) -> bool {
        self.paragraphs.contains_key(name)
    }

    /// Look up a table style by name.
    pub fn table(&self, name: &str) -> Result<&TableStyle, PressError> {
        self.tables
            .get(name)
            .ok_or_else(|| PressError::NotFound(format!("table style '{}'", name)))
    }

    pub fn badge(&self) -> &BadgeStyle {
        &self.badge
    }

    /// Replace the badge style while the catalog is still being assembled.
    pub fn with_badge(mut self, badge: BadgeStyle) -> Self {
        self.badge = badge;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_catalog_lookups() {
        let sheet = StyleSheet::standard("Helvetica");
        assert_eq!(sheet.paragraph(names::NORMAL).unwrap().font_size, 10.0);
        assert!(sheet.paragraph(names::TABLE_HEADER).unwrap().bold);
        assert_eq!(
            sheet.table(names::DETAILS_TABLE).unwrap().bold_columns,
            Some((0, 1))
        );
        assert!(sheet.paragraph("Nope").is_err());
        assert!(sheet.table("Nope").is_err());
    }

    #[test]
    fn test_color_hex() {
        let c = Color::hex("#ff0000");
        assert_eq!((c.r, c.g, c.b), (1.0, 0.0, 0.0));
        let short = Color::hex("#fff");
        assert_eq!(short, Color::WHITE);
    }

    #[test]
    fn test_emboldened_keeps_metrics() {
        let sheet = StyleSheet::standard("Helvetica");
        let normal = sheet.paragraph(names::NORMAL).unwrap();
        let bold = normal.emboldened();
        assert!(bold.bold);
        assert_eq!(bold.leading, normal.leading);
    }
}
