//! # measure-press
//!
//! Renders energy-efficiency measures into paginated, styled PDF.
//!
//! Measure content arrives as small markup fragments: paragraphs with inline
//! emphasis, superscripts, reference badges, tables and lists. The engine
//! parses them into typed runs, breaks lines against real font metrics, sizes
//! tables from their content, and paginates so that headings never end up on
//! a different page from what they introduce.
//!
//! ## Architecture
//!
//! ```text
//! Measures (JSON)
//!       ↓
//!   [markup]   - markup fragment -> typed runs, tables, lists
//!       ↓
//!   [text]     - run merging, width-aware line breaking
//!       ↓
//!   [layout]   - paragraphs, tables, story, page placement
//!       ↓
//!   [pdf]      - serialize to PDF bytes
//! ```
//!
//! [`document`] drives the pipeline for whole measures.

pub mod config;
pub mod document;
pub mod error;
pub mod font;
pub mod layout;
pub mod markup;
pub mod model;
pub mod pdf;
pub mod style;
pub mod text;

use std::path::{Path, PathBuf};

pub use config::RenderConfig;
pub use document::{render_measures, DocumentBuilder};
pub use error::{ErrorKind, PressError};
pub use model::Measure;

/// Parse measure JSON: either an array of measures or a single measure.
pub fn parse_measures(json: &str) -> Result<Vec<Measure>, PressError> {
    if json.trim_start().starts_with('[') {
        serde_json::from_str(json).map_err(|e| PressError::config("measures", e))
    } else {
        serde_json::from_str::<Measure>(json)
            .map(|m| vec![m])
            .map_err(|e| PressError::config("measure", e))
    }
}

/// Render measures to PDF bytes.
pub fn render(measures: &[Measure], config: &RenderConfig) -> Result<Vec<u8>, PressError> {
    document::render_to_bytes(measures, config)
}

/// Render measure JSON to PDF bytes.
pub fn render_json(json: &str, config: &RenderConfig) -> Result<Vec<u8>, PressError> {
    let measures = parse_measures(json)?;
    render(&measures, config)
}

/// Render measure JSON into `{dir}/{file_name}.pdf`.
pub fn write_pdf(
    json: &str,
    config: &RenderConfig,
    dir: &Path,
    file_name: &str,
) -> Result<PathBuf, PressError> {
    let measures = parse_measures(json)?;
    render_measures(&measures, config, dir, file_name)
}
