//! # Document Builder
//!
//! Turns measures into a story and the story into PDF bytes. Each measure
//! contributes, in order:
//!
//! 1. a title,
//! 2. the details table,
//! 3. the technology summary and any configured extra sections,
//! 4. the shared parameters table, kept on one page with its heading,
//! 5. the sections index, one linked row per section above,
//! 6. a page break.
//!
//! The index rows are the same for every measure. Each row links to the
//! heading it names; a row whose section was skipped stays unlinked.
//!
//! A build is all-or-nothing. Any error discards the story and leaves the
//! builder refusing further work, and [`DocumentBuilder::write_to`] touches
//! the file system only after the whole document has been serialized.

use std::io;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};

use crate::config::RenderConfig;
use crate::error::PressError;
use crate::font::FontContext;
use crate::layout::{Flowable, LayoutEngine, LayoutPage, ParagraphFlowable, Story, TableLayout, TableSource};
use crate::layout::table::{Cell, Shading};
use crate::markup::{Block, EmbeddedTable, MarkupParser};
use crate::model::Measure;
use crate::pdf::PdfWriter;
use crate::style::{names, StyleSheet};
use crate::text::{merge_runs, LineBreaker, ParagraphElement};

const SECTION_GAP: f64 = 12.0;

const DETAILS_TITLE: &str = "Measure Details";
const DETAILS_ANCHOR: &str = "details";
const PARAMETERS_TITLE: &str = "Shared Parameters";
const PARAMETERS_ANCHOR: &str = "shared_parameters";

/// Flowables produced by one markup block.
enum Piece {
    Single(Flowable),
    /// A caption that must stay on the page of the table below it.
    Captioned(Flowable, Flowable),
}

impl Piece {
    fn into_flowable(self) -> Flowable {
        match self {
            Piece::Single(f) => f,
            Piece::Captioned(caption, table) => Flowable::Group(vec![caption, table]),
        }
    }
}

pub struct DocumentBuilder<'a> {
    sheet: &'a StyleSheet,
    fonts: &'a FontContext,
    config: &'a RenderConfig,
    breaker: LineBreaker<'a>,
    parser: MarkupParser<'a>,
    story: Story,
    titles: Vec<String>,
    /// Set once `add_measure` has failed.
    failed: Option<String>,
}

impl<'a> DocumentBuilder<'a> {
    /// Fails with a font error when the style sheet's family is not fully
    /// registered.
    pub fn new(
        sheet: &'a StyleSheet,
        fonts: &'a FontContext,
        config: &'a RenderConfig,
    ) -> Result<Self, PressError> {
        fonts.require_family(sheet.font_family())?;
        Ok(Self {
            sheet,
            fonts,
            config,
            breaker: LineBreaker::new(fonts, sheet),
            parser: MarkupParser::new(sheet),
            story: Story::new(&config.page),
            titles: Vec::new(),
            failed: None,
        })
    }

    pub fn story(&self) -> &Story {
        &self.story
    }

    /// Append one measure's section to the story.
    ///
    /// On error everything added so far is dropped, and every later call to
    /// `add_measure`, [`build`](Self::build) or [`write_to`](Self::write_to)
    /// fails with [`PressError::Aborted`].
    pub fn add_measure(&mut self, measure: &Measure) -> Result<(), PressError> {
        self.ensure_usable()?;
        debug!("adding measure {} ({})", measure.id, measure.name);
        match self.measure_section(measure) {
            Ok(()) => {
                self.titles.push(display_title(measure));
                Ok(())
            }
            Err(e) => {
                self.story.reset();
                self.titles.clear();
                self.failed = Some(format!("measure {}: {}", measure.id, e));
                Err(e)
            }
        }
    }

    fn ensure_usable(&self) -> Result<(), PressError> {
        match &self.failed {
            Some(reason) => Err(PressError::Aborted(reason.clone())),
            None => Ok(()),
        }
    }

    fn measure_section(&mut self, measure: &Measure) -> Result<(), PressError> {
        let title = self.anchored(
            names::TITLE,
            display_title(measure),
            anchor(measure, DETAILS_ANCHOR),
        )?;
        self.story.add(title, &self.breaker)?;

        let details = self.details_table(measure)?;
        self.story.add(details, &self.breaker)?;
        self.story.add(Flowable::Spacer(SECTION_GAP), &self.breaker)?;

        let mut sections = vec![self.config.summary_section.clone()];
        sections.extend(self.config.sections.iter().map(|s| s.api_name.clone()));
        for api_name in &sections {
            self.characterization(measure, api_name)?;
        }
        self.story.add(Flowable::Spacer(SECTION_GAP), &self.breaker)?;

        let heading = self.anchored(
            names::HEADING,
            PARAMETERS_TITLE.to_string(),
            anchor(measure, PARAMETERS_ANCHOR),
        )?;
        let parameters = self.parameters_table(measure)?;
        self.story.add_group(heading, parameters, &self.breaker)?;
        self.story.add(Flowable::Spacer(SECTION_GAP), &self.breaker)?;

        let index = self.sections_table(measure)?;
        self.story.add(index, &self.breaker)?;
        self.story.add(Flowable::PageBreak, &self.breaker)?;
        Ok(())
    }

    /// Heading plus parsed body. The heading is kept with the first block.
    fn characterization(&mut self, measure: &Measure, api_name: &str) -> Result<(), PressError> {
        let markup = match measure.characterization(api_name) {
            Some(markup) if !markup.trim().is_empty() => markup,
            Some(_) => {
                warn!("measure {}: characterization '{}' is empty", measure.id, api_name);
                return Ok(());
            }
            None => {
                warn!("measure {}: no characterization '{}'", measure.id, api_name);
                return Ok(());
            }
        };

        let blocks = self.parser.parse_blocks_str(markup)?;
        debug!("section '{}': {} block(s)", api_name, blocks.len());

        let mut pieces = Vec::with_capacity(blocks.len());
        for block in blocks {
            pieces.push(self.block(measure, block)?);
        }

        let heading = self.anchored(
            names::HEADING,
            self.config.section_title(api_name),
            anchor(measure, api_name),
        )?;
        let mut pieces = pieces.into_iter();
        match pieces.next() {
            Some(first) => self.story.add_group(heading, first.into_flowable(), &self.breaker)?,
            None => self.story.add(heading, &self.breaker)?,
        }
        for piece in pieces {
            match piece {
                Piece::Single(f) => self.story.add(f, &self.breaker)?,
                Piece::Captioned(caption, table) => {
                    self.story.add_group(caption, table, &self.breaker)?
                }
            }
        }
        Ok(())
    }

    fn block(&self, measure: &Measure, block: Block) -> Result<Piece, PressError> {
        match block {
            Block::Paragraph { style, runs } => {
                let style = style.as_deref().unwrap_or(names::NORMAL);
                Ok(Piece::Single(self.paragraph(style, runs)?))
            }
            Block::ListItem(item) => {
                let style = self.sheet.paragraph(names::LIST_ITEM)?.clone();
                let runs = merge_runs(item.runs()?);
                Ok(Piece::Single(Flowable::Paragraph(ParagraphFlowable::list_item(
                    runs,
                    style,
                    &item.marker.label(),
                ))))
            }
            Block::Table(source) => Ok(Piece::Single(self.table(&source, names::MARKUP_TABLE)?)),
            Block::ValueTable(embedded) => self.value_table(measure, &embedded),
        }
    }

    fn value_table(&self, measure: &Measure, embedded: &EmbeddedTable) -> Result<Piece, PressError> {
        let table = measure.value_table(&embedded.name).ok_or_else(|| {
            PressError::NotFound(format!(
                "value table '{}' in measure {}",
                embedded.name, measure.id
            ))
        })?;
        let columns = embedded
            .columns
            .as_deref()
            .or_else(|| self.config.columns_for(&table.name, &table.api_name));
        let source = TableSource::from_value_table(table, columns)?;
        let caption = self.paragraph(names::SUBHEADING, vec![ParagraphElement::text(table.name.clone())])?;
        Ok(Piece::Captioned(caption, self.table(&source, names::VALUE_TABLE)?))
    }

    fn details_table(&self, measure: &Measure) -> Result<Flowable, PressError> {
        let fields: [(&str, Option<&str>); 9] = [
            ("Measure ID", Some(measure.id.as_str())),
            ("Name", Some(measure.name.as_str())),
            ("Version", measure.version.as_deref()),
            ("Owner", measure.owner.as_deref()),
            ("Created", measure.created.as_deref()),
            ("Last Modified", measure.last_modified.as_deref()),
            ("Effective Start", measure.effective_start.as_deref()),
            ("Effective End", measure.effective_end.as_deref()),
            ("Description", measure.description.as_deref()),
        ];
        let rows: Vec<Vec<Cell>> = fields
            .iter()
            .filter_map(|(label, value)| value.filter(|v| !v.is_empty()).map(|v| (label, v)))
            .map(|(label, value)| vec![text_cell(label), text_cell(value)])
            .collect();
        let source = TableSource::headerless(rows, Shading::Static)?;
        self.table(&source, names::DETAILS_TABLE)
    }

    fn parameters_table(&self, measure: &Measure) -> Result<Flowable, PressError> {
        let mut rows: Vec<Vec<String>> = measure
            .shared_parameters
            .iter()
            .map(|p| {
                vec![
                    p.name.clone(),
                    p.version.clone().unwrap_or_default(),
                    p.labels.join(", "),
                ]
            })
            .collect();
        if rows.is_empty() {
            rows.push(vec!["(none)".to_string(), String::new(), String::new()]);
        }
        let source = TableSource::from_text(&["Parameter", "Version", "Labels"], rows)?;
        self.table(&source, names::PARAMETERS_TABLE)
    }

    /// Titles and anchor keys of the rows in every sections index.
    fn index_entries(&self) -> Vec<(String, String)> {
        let mut entries = vec![(DETAILS_TITLE.to_string(), DETAILS_ANCHOR.to_string())];
        let summary = &self.config.summary_section;
        entries.push((self.config.section_title(summary), summary.clone()));
        for section in &self.config.sections {
            entries.push((self.config.section_title(&section.api_name), section.api_name.clone()));
        }
        entries.push((PARAMETERS_TITLE.to_string(), PARAMETERS_ANCHOR.to_string()));
        entries
    }

    fn sections_table(&self, measure: &Measure) -> Result<Flowable, PressError> {
        let header = vec![text_cell("Sections")];
        let body = self
            .index_entries()
            .into_iter()
            .map(|(title, key)| {
                vec![vec![ParagraphElement::text(title)
                    .with_style(names::LINK)
                    .with_link(anchor(measure, &key))]]
            })
            .collect();
        let source = TableSource::new(header, body, Shading::Static)?;
        self.table(&source, names::SECTIONS_TABLE)
    }

    /// A one-run paragraph whose top is the destination `name`.
    fn anchored(&self, style: &str, text: String, name: String) -> Result<Flowable, PressError> {
        let style = self.sheet.paragraph(style)?.clone();
        Ok(Flowable::Paragraph(
            ParagraphFlowable::new(vec![ParagraphElement::text(text)], style).with_anchor(name),
        ))
    }

    fn paragraph(&self, style: &str, runs: Vec<ParagraphElement>) -> Result<Flowable, PressError> {
        let style = self.sheet.paragraph(style)?.clone();
        Ok(Flowable::Paragraph(ParagraphFlowable::new(runs, style)))
    }

    fn table(&self, source: &TableSource, style: &str) -> Result<Flowable, PressError> {
        let style = self.sheet.table(style)?;
        let grid = TableLayout::new(self.breaker).build(source, style, self.story.content_width())?;
        Ok(Flowable::Table(grid))
    }

    /// Lay out and serialize everything added so far.
    pub fn build(self) -> Result<Vec<u8>, PressError> {
        self.ensure_usable()?;
        let mut metadata = self.config.metadata.clone();
        if metadata.title.is_none() {
            if let [only] = self.titles.as_slice() {
                metadata.title = Some(only.clone());
            }
        }

        let engine =
            LayoutEngine::new(self.breaker, &self.config.page).with_page_numbers(self.config.page_numbers);
        let mut pages = engine.layout(self.story)?;
        if pages.is_empty() {
            let (width, height) = self.config.page.size.dimensions();
            pages.push(LayoutPage {
                width,
                height,
                commands: Vec::new(),
            });
        }

        let bytes = PdfWriter::new().write(&pages, &metadata, self.fonts)?;
        info!(
            "rendered {} measure(s) into {} page(s), {} bytes",
            self.titles.len(),
            pages.len(),
            bytes.len()
        );
        Ok(bytes)
    }

    /// Build and write `{dir}/{file_name}.pdf`. Nothing is written unless the
    /// whole document rendered.
    pub fn write_to(self, dir: &Path, file_name: &str) -> Result<PathBuf, PressError> {
        self.ensure_usable()?;
        let path = output_path(dir, file_name, self.config.overwrite)?;
        let bytes = self.build()?;
        std::fs::write(&path, bytes)?;
        info!("wrote {}", path.display());
        Ok(path)
    }
}

/// Render `measures` in order into `{dir}/{file_name}.pdf`.
pub fn render_measures(
    measures: &[Measure],
    config: &RenderConfig,
    dir: &Path,
    file_name: &str,
) -> Result<PathBuf, PressError> {
    // Fail on an existing file before any rendering work.
    output_path(dir, file_name, config.overwrite)?;
    let fonts = config.font_context()?;
    let sheet = StyleSheet::standard(&config.font_family);
    let mut builder = DocumentBuilder::new(&sheet, &fonts, config)?;
    for measure in measures {
        builder.add_measure(measure)?;
    }
    builder.write_to(dir, file_name)
}

/// Render `measures` in order to PDF bytes.
pub fn render_to_bytes(measures: &[Measure], config: &RenderConfig) -> Result<Vec<u8>, PressError> {
    let fonts = config.font_context()?;
    let sheet = StyleSheet::standard(&config.font_family);
    let mut builder = DocumentBuilder::new(&sheet, &fonts, config)?;
    for measure in measures {
        builder.add_measure(measure)?;
    }
    builder.build()
}

fn output_path(dir: &Path, file_name: &str, overwrite: bool) -> Result<PathBuf, PressError> {
    let path = dir.join(format!("{}.pdf", file_name));
    if !overwrite && path.exists() {
        return Err(PressError::Io(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("{} already exists", path.display()),
        )));
    }
    Ok(path)
}

fn display_title(measure: &Measure) -> String {
    if measure.name.is_empty() {
        measure.id.clone()
    } else {
        format!("{} {}", measure.id, measure.name).trim().to_string()
    }
}

/// Destination name for one of a measure's sections. Measure ids keep the
/// names unique across a multi-measure document.
fn anchor(measure: &Measure, key: &str) -> String {
    format!("{}/{}", measure.id, key)
}

fn text_cell(text: &str) -> Cell {
    vec![ParagraphElement::text(text)]
}
