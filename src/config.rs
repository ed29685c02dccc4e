//! Render configuration, read from camelCase JSON. Every field has a default,
//! so `{}` is a valid configuration.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::PressError;
use crate::font::{FontContext, BOLD, REGULAR};
use crate::model::{Metadata, PageConfig};

/// Characterization section rendered as the technology summary when the
/// configuration names none.
pub const DEFAULT_SUMMARY_SECTION: &str = "technology_summary";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RenderConfig {
    pub page: PageConfig,
    /// Font family for every paragraph and table style.
    pub font_family: String,
    /// TrueType families to register before layout.
    pub fonts: Vec<FontFamilyFiles>,
    pub metadata: Metadata,
    /// Characterization rendered under "Technology Summary".
    pub summary_section: String,
    /// Further characterizations rendered after the summary, in this order.
    pub sections: Vec<SectionConfig>,
    /// Column subsets for embedded value tables, keyed by table name or api
    /// name. Markup `data-columns` wins over this.
    pub value_table_columns: HashMap<String, Vec<String>>,
    /// Stamp "Page N of M" in the bottom margin.
    pub page_numbers: bool,
    /// Replace an existing output file.
    pub overwrite: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            page: PageConfig::default(),
            font_family: "Helvetica".to_string(),
            fonts: Vec::new(),
            metadata: Metadata::default(),
            summary_section: DEFAULT_SUMMARY_SECTION.to_string(),
            sections: Vec::new(),
            value_table_columns: HashMap::new(),
            page_numbers: true,
            overwrite: false,
        }
    }
}

/// The four files of a custom TrueType family.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FontFamilyFiles {
    pub family: String,
    pub regular: PathBuf,
    pub bold: PathBuf,
    pub italic: PathBuf,
    pub bold_italic: PathBuf,
}

/// An extra characterization section and its heading.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionConfig {
    pub api_name: String,
    pub title: String,
}

impl RenderConfig {
    pub fn from_json(json: &str) -> Result<Self, PressError> {
        serde_json::from_str(json).map_err(|e| PressError::config("render configuration", e))
    }

    /// Read a configuration file. Relative font paths resolve against the
    /// file's directory.
    pub fn from_path(path: &Path) -> Result<Self, PressError> {
        let json = std::fs::read_to_string(path)?;
        let mut config = Self::from_json(&json)?;
        if let Some(base) = path.parent() {
            for family in &mut config.fonts {
                for file in [
                    &mut family.regular,
                    &mut family.bold,
                    &mut family.italic,
                    &mut family.bold_italic,
                ] {
                    if file.is_relative() {
                        *file = base.join(&*file);
                    }
                }
            }
        }
        Ok(config)
    }

    /// Register the configured fonts and check that the body family has all
    /// four variants.
    pub fn font_context(&self) -> Result<FontContext, PressError> {
        let mut fonts = FontContext::new();
        for family in &self.fonts {
            let registry = fonts.registry_mut();
            registry.register_file(&family.family, REGULAR, false, &family.regular)?;
            registry.register_file(&family.family, BOLD, false, &family.bold)?;
            registry.register_file(&family.family, REGULAR, true, &family.italic)?;
            registry.register_file(&family.family, BOLD, true, &family.bold_italic)?;
            debug!("registered font family '{}'", family.family);
        }
        fonts.require_family(&self.font_family)?;
        Ok(fonts)
    }

    /// Heading for a characterization section.
    pub fn section_title(&self, api_name: &str) -> String {
        if api_name == self.summary_section {
            return "Technology Summary".to_string();
        }
        match self.sections.iter().find(|s| s.api_name == api_name) {
            Some(section) => section.title.clone(),
            None => humanize(api_name),
        }
    }

    /// Column subset configured for a value table, by name or api name.
    pub fn columns_for(&self, name: &str, api_name: &str) -> Option<&[String]> {
        self.value_table_columns
            .get(api_name)
            .or_else(|| self.value_table_columns.get(name))
            .map(Vec::as_slice)
    }
}

/// "demand_effects" -> "Demand Effects".
fn humanize(api_name: &str) -> String {
    api_name
        .split(['_', '-'])
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::model::PageSize;

    #[test]
    fn test_empty_object_is_default() {
        let config = RenderConfig::from_json("{}").unwrap();
        assert_eq!(config.font_family, "Helvetica");
        assert_eq!(config.summary_section, DEFAULT_SUMMARY_SECTION);
        assert!(config.page_numbers);
        assert!(!config.overwrite);
        assert!(matches!(config.page.size, PageSize::Letter));
    }

    #[test]
    fn test_camel_case_fields() {
        let config = RenderConfig::from_json(
            r#"{
                "fontFamily": "Courier",
                "summarySection": "overview",
                "sections": [{ "apiName": "base_case", "title": "Base Case" }],
                "valueTableColumns": { "UEC": ["fuel", "unitKwh"] },
                "pageNumbers": false,
                "metadata": { "title": "Report" }
            }"#,
        )
        .unwrap();
        assert_eq!(config.font_family, "Courier");
        assert_eq!(config.section_title("overview"), "Technology Summary");
        assert_eq!(config.section_title("base_case"), "Base Case");
        assert_eq!(config.columns_for("UEC", "uec").unwrap().len(), 2);
        assert!(!config.page_numbers);
        assert_eq!(config.metadata.title.as_deref(), Some("Report"));
    }

    #[test]
    fn test_section_title_fallback() {
        let config = RenderConfig::default();
        assert_eq!(config.section_title("measure_case_description"), "Measure Case Description");
    }

    #[test]
    fn test_invalid_json_is_config_error() {
        let err = RenderConfig::from_json(r#"{ "pageNumbers": "yes" }"#).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
    }

    #[test]
    fn test_unknown_family_fails_at_startup() {
        let config = RenderConfig {
            font_family: "Garamond".to_string(),
            ..RenderConfig::default()
        };
        let err = config.font_context().err().unwrap();
        assert_eq!(err.kind(), ErrorKind::Font);
        assert!(err.to_string().contains("Garamond"));
    }

    #[test]
    fn test_missing_font_file_is_font_error() {
        let config = RenderConfig::from_json(
            r#"{
                "fontFamily": "Inter",
                "fonts": [{
                    "family": "Inter",
                    "regular": "/nonexistent/Inter-Regular.ttf",
                    "bold": "/nonexistent/Inter-Bold.ttf",
                    "italic": "/nonexistent/Inter-Italic.ttf",
                    "boldItalic": "/nonexistent/Inter-BoldItalic.ttf"
                }]
            }"#,
        )
        .unwrap();
        assert_eq!(config.font_context().err().unwrap().kind(), ErrorKind::Font);
    }
}
