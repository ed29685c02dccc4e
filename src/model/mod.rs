//! # Input Model
//!
//! The read-only inputs of a document build: measures (as delivered by the
//! measure service, deserialized from JSON) and the page geometry.
//!
//! The engine never mutates a [`Measure`]; everything downstream borrows it.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// One energy-efficiency measure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Measure {
    /// Statewide measure identifier, e.g. "SWHC049".
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub created: Option<String>,
    #[serde(default)]
    pub last_modified: Option<String>,
    #[serde(default)]
    pub effective_start: Option<String>,
    #[serde(default)]
    pub effective_end: Option<String>,
    /// Characterization markup keyed by section api name, in delivery order.
    #[serde(default)]
    pub characterizations: IndexMap<String, String>,
    #[serde(default)]
    pub value_tables: Vec<ValueTable>,
    #[serde(default)]
    pub shared_parameters: Vec<SharedParameter>,
}

impl Measure {
    /// Look up a value table by display name or api name.
    pub fn value_table(&self, name: &str) -> Option<&ValueTable> {
        self.value_tables
            .iter()
            .find(|t| t.api_name == name || t.name == name)
    }

    pub fn characterization(&self, section: &str) -> Option<&str> {
        self.characterizations.get(section).map(String::as_str)
    }
}

/// A named value table attached to a measure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValueTable {
    pub name: String,
    #[serde(default)]
    pub api_name: String,
    pub columns: Vec<ValueColumn>,
    /// Rows of cell values, one per column in `columns` order.
    #[serde(default)]
    pub rows: Vec<Vec<String>>,
}

impl ValueTable {
    pub fn column_index(&self, api_name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.api_name == api_name || c.name == api_name)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValueColumn {
    pub name: String,
    pub api_name: String,
    #[serde(default)]
    pub unit: Option<String>,
}

/// A shared parameter the measure uses, with the labels it is restricted to.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharedParameter {
    pub name: String,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub labels: Vec<String>,
}

/// Document metadata embedded in the PDF.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Metadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
}

/// Configuration for a page: size and margins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageConfig {
    /// Page size. Defaults to Letter.
    #[serde(default)]
    pub size: PageSize,

    /// Page margins in points (1/72 inch).
    #[serde(default = "default_margin")]
    pub margin: Edges,
}

impl Default for PageConfig {
    fn default() -> Self {
        Self {
            size: PageSize::Letter,
            margin: default_margin(),
        }
    }
}

fn default_margin() -> Edges {
    Edges::uniform(54.0) // 0.75 inch
}

impl PageConfig {
    /// Width of the area between the left and right margins.
    pub fn content_width(&self) -> f64 {
        self.size.dimensions().0 - self.margin.horizontal()
    }

    /// Height of the printable area between the top and bottom margins.
    pub fn printable_height(&self) -> f64 {
        self.size.dimensions().1 - self.margin.vertical()
    }
}

/// Standard page sizes in points.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub enum PageSize {
    A4,
    #[default]
    Letter,
    Legal,
    Custom {
        width: f64,
        height: f64,
    },
}

impl PageSize {
    /// Returns (width, height) in points.
    pub fn dimensions(&self) -> (f64, f64) {
        match self {
            PageSize::A4 => (595.28, 841.89),
            PageSize::Letter => (612.0, 792.0),
            PageSize::Legal => (612.0, 1008.0),
            PageSize::Custom { width, height } => (*width, *height),
        }
    }
}

/// Edge values (top, right, bottom, left) used for margin and padding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Edges {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

impl Edges {
    pub fn uniform(v: f64) -> Self {
        Self {
            top: v,
            right: v,
            bottom: v,
            left: v,
        }
    }

    pub fn horizontal(&self) -> f64 {
        self.left + self.right
    }

    pub fn vertical(&self) -> f64 {
        self.top + self.bottom
    }
}
