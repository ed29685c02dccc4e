//! # Tables
//!
//! Content-driven table layout. Every cell is a paragraph; column widths and
//! row heights come from a full scan of cell content plus padding:
//!
//! 1. Measure every cell unwrapped: a column's natural width is the widest
//!    cell plus left/right padding.
//! 2. If the natural widths exceed the available width, shrink columns
//!    proportionally toward their widest unbreakable word.
//! 3. Re-wrap every cell at its column width: a row's height is its tallest
//!    cell plus top/bottom padding.
//!
//! When a table splits across pages the header row is repeated on the
//! continuation, and body rows keep the shade they had in the full table.

use log::{debug, warn};

use super::page_break::{decide_break, BreakDecision, KeepRules};
use super::paragraph::ParagraphFlowable;
use super::{DrawCommand, Stroke};
use crate::error::PressError;
use crate::model::ValueTable;
use crate::style::TableStyle;
use crate::text::{merge_runs, LineBreaker, ParagraphElement};

/// The runs of one cell.
pub type Cell = Vec<ParagraphElement>;

/// Row shading scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shading {
    /// Markup and built-in tables: first body row light.
    Static,
    /// Embedded value tables: first body row dark.
    Embedded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shade {
    Light,
    Dark,
}

impl Shading {
    /// Shade of body row `k` (0-based among body rows).
    pub fn shade(self, k: usize) -> Shade {
        match (self, k % 2 == 0) {
            (Shading::Static, true) | (Shading::Embedded, false) => Shade::Light,
            (Shading::Static, false) | (Shading::Embedded, true) => Shade::Dark,
        }
    }
}

/// A table row as read from markup, before header resolution.
#[derive(Debug, Clone)]
pub struct MarkupRow {
    pub cells: Vec<Cell>,
    /// The row sat inside `thead`.
    pub in_head: bool,
    /// Every cell of the row was a `th`.
    pub header_cells: bool,
}

/// Unmeasured table content.
#[derive(Debug, Clone)]
pub struct TableSource {
    pub header: Option<Vec<Cell>>,
    pub body: Vec<Vec<Cell>>,
    pub shading: Shading,
}

impl TableSource {
    /// A table with a header row. Body rows must match the header width.
    pub fn new(header: Vec<Cell>, body: Vec<Vec<Cell>>, shading: Shading) -> Result<Self, PressError> {
        if header.is_empty() {
            return Err(PressError::Structure("table header row has no cells".to_string()));
        }
        let source = Self {
            header: Some(header),
            body,
            shading,
        };
        source.validate()?;
        Ok(source)
    }

    /// A table without a header row, such as a label/value details table.
    pub fn headerless(body: Vec<Vec<Cell>>, shading: Shading) -> Result<Self, PressError> {
        let source = Self {
            header: None,
            body,
            shading,
        };
        source.validate()?;
        Ok(source)
    }

    /// Convenience for tables of plain strings.
    pub fn from_text(header: &[&str], rows: Vec<Vec<String>>) -> Result<Self, PressError> {
        let header = header.iter().map(|h| vec![ParagraphElement::text(*h)]).collect();
        let body = rows
            .into_iter()
            .map(|row| row.into_iter().map(|v| vec![ParagraphElement::text(v)]).collect())
            .collect();
        Self::new(header, body, Shading::Static)
    }

    /// Resolve header and body from markup rows.
    ///
    /// The header is the first `thead` row, else the first row when it is made
    /// of `th` cells. Every other row is body, in document order.
    pub fn from_markup(rows: Vec<MarkupRow>) -> Result<Self, PressError> {
        let header_index = rows
            .iter()
            .position(|r| r.in_head)
            .or_else(|| rows.first().filter(|r| r.header_cells).map(|_| 0))
            .ok_or_else(|| PressError::Structure("table has no header row".to_string()))?;

        let mut header = None;
        let mut body = Vec::with_capacity(rows.len().saturating_sub(1));
        for (i, row) in rows.into_iter().enumerate() {
            if i == header_index {
                header = Some(row.cells);
            } else {
                body.push(row.cells);
            }
        }
        let header =
            header.ok_or_else(|| PressError::Structure("table has no header row".to_string()))?;
        Self::new(header, body, Shading::Static)
    }

    /// Embed a measure value table, keeping `columns` (api or display names)
    /// in the table's own column order. `None` keeps every column.
    pub fn from_value_table(
        table: &ValueTable,
        columns: Option<&[String]>,
    ) -> Result<Self, PressError> {
        let mut indices: Vec<usize> = match columns {
            Some(wanted) if !wanted.is_empty() => wanted
                .iter()
                .map(|name| {
                    table.column_index(name).ok_or_else(|| {
                        PressError::NotFound(format!(
                            "column '{}' in value table '{}'",
                            name, table.name
                        ))
                    })
                })
                .collect::<Result<_, _>>()?,
            _ => (0..table.columns.len()).collect(),
        };
        indices.sort_unstable();
        indices.dedup();

        let header = indices
            .iter()
            .map(|&i| {
                let column = &table.columns[i];
                let label = match &column.unit {
                    Some(unit) if !unit.is_empty() => format!("{} ({})", column.name, unit),
                    _ => column.name.clone(),
                };
                vec![ParagraphElement::text(label)]
            })
            .collect();

        let body = table
            .rows
            .iter()
            .map(|row| {
                if row.len() != table.columns.len() {
                    warn!(
                        "value table '{}' row has {} cells for {} columns",
                        table.name,
                        row.len(),
                        table.columns.len()
                    );
                }
                indices
                    .iter()
                    .map(|&i| vec![ParagraphElement::text(row.get(i).cloned().unwrap_or_default())])
                    .collect()
            })
            .collect();

        Self::new(header, body, Shading::Embedded).map_err(|e| match e {
            PressError::Structure(msg) => {
                PressError::Structure(format!("value table '{}': {}", table.name, msg))
            }
            other => other,
        })
    }

    pub fn column_count(&self) -> usize {
        match &self.header {
            Some(header) => header.len(),
            None => self.body.first().map_or(0, Vec::len),
        }
    }

    fn validate(&self) -> Result<(), PressError> {
        if self.body.is_empty() {
            return Err(PressError::Structure("table has no body rows".to_string()));
        }
        let columns = self.column_count();
        if columns == 0 {
            return Err(PressError::Structure("table has no columns".to_string()));
        }
        for (i, row) in self.body.iter().enumerate() {
            if row.len() != columns {
                return Err(PressError::Structure(format!(
                    "body row {} has {} cells, expected {}",
                    i + 1,
                    row.len(),
                    columns
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
struct GridRow {
    cells: Vec<ParagraphFlowable>,
    height: f64,
    shade: Shade,
}

/// A measured table ready to draw.
#[derive(Debug, Clone)]
pub struct TableGrid {
    style: TableStyle,
    header: Option<Vec<ParagraphFlowable>>,
    header_height: f64,
    rows: Vec<GridRow>,
    col_widths: Vec<f64>,
    trailing_space: f64,
}

impl TableGrid {
    pub fn col_widths(&self) -> &[f64] {
        &self.col_widths
    }

    /// Row heights, header first when present.
    pub fn row_heights(&self) -> Vec<f64> {
        self.header
            .as_ref()
            .map(|_| self.header_height)
            .into_iter()
            .chain(self.rows.iter().map(|r| r.height))
            .collect()
    }

    pub fn header_height(&self) -> f64 {
        self.header_height
    }

    pub fn body_shades(&self) -> Vec<Shade> {
        self.rows.iter().map(|r| r.shade).collect()
    }

    pub fn body_len(&self) -> usize {
        self.rows.len()
    }

    pub fn width(&self) -> f64 {
        self.col_widths.iter().sum()
    }

    pub fn height(&self) -> f64 {
        self.header_height + self.rows.iter().map(|r| r.height).sum::<f64>() + self.trailing_space
    }

    /// Header plus the first body row, the least a split leaves on a page.
    pub fn lead_height(&self) -> f64 {
        match self.rows.first() {
            Some(first) if self.rows.len() > 1 => self.header_height + first.height,
            _ => self.height(),
        }
    }

    pub fn draw(&self, x: f64, y: f64) -> Vec<DrawCommand> {
        let style = &self.style;
        let width = self.width();
        let mut commands = Vec::new();

        let mut boundaries = vec![y];
        let mut top = y;
        if self.header.is_some() {
            if let Some(background) = style.header_background {
                commands.push(DrawCommand::Rect {
                    x,
                    y: top,
                    width,
                    height: self.header_height,
                    fill: Some(background),
                    stroke: None,
                });
            }
            top += self.header_height;
            boundaries.push(top);
        }
        for row in &self.rows {
            let fill = match row.shade {
                Shade::Light => style.light_shade,
                Shade::Dark => style.dark_shade,
            };
            commands.push(DrawCommand::Rect {
                x,
                y: top,
                width,
                height: row.height,
                fill: Some(fill),
                stroke: None,
            });
            top += row.height;
            boundaries.push(top);
        }

        if style.grid_width > 0.0 {
            let bottom = top;
            for &by in &boundaries {
                commands.push(DrawCommand::Line {
                    x1: x,
                    y1: by,
                    x2: x + width,
                    y2: by,
                    width: style.grid_width,
                    color: style.grid_color,
                });
            }
            let mut bx = x;
            for edge in std::iter::once(0.0).chain(self.col_widths.iter().copied()) {
                bx += edge;
                commands.push(DrawCommand::Line {
                    x1: bx,
                    y1: y,
                    x2: bx,
                    y2: bottom,
                    width: style.grid_width,
                    color: style.grid_color,
                });
            }
        }

        let mut top = y;
        if let Some(cells) = &self.header {
            self.draw_cells(&mut commands, cells, x, top);
            top += self.header_height;
        }
        for row in &self.rows {
            self.draw_cells(&mut commands, &row.cells, x, top);
            top += row.height;
        }
        commands
    }

    fn draw_cells(&self, commands: &mut Vec<DrawCommand>, cells: &[ParagraphFlowable], x: f64, y: f64) {
        let padding = self.style.padding;
        let mut cell_x = x;
        for (cell, width) in cells.iter().zip(&self.col_widths) {
            commands.extend(cell.draw(cell_x + padding.left, y + padding.top));
            cell_x += width;
        }
    }

    /// Divide by whole body rows; the continuation repeats the header.
    pub fn split(&self, available_height: f64) -> Option<(TableGrid, TableGrid)> {
        let room = available_height - self.header_height;
        if room <= 0.0 {
            return None;
        }
        let heights: Vec<f64> = self.rows.iter().map(|r| r.height).collect();
        match decide_break(room, &heights, KeepRules::ROWS) {
            BreakDecision::Split { at } => {
                let head = TableGrid {
                    rows: self.rows[..at].to_vec(),
                    trailing_space: 0.0,
                    ..self.clone()
                };
                let tail = TableGrid {
                    rows: self.rows[at..].to_vec(),
                    ..self.clone()
                };
                debug!(
                    "split table after {} of {} body rows",
                    at,
                    self.rows.len()
                );
                Some((head, tail))
            }
            BreakDecision::Place | BreakDecision::MoveToNextPage => None,
        }
    }
}

/// Builds [`TableGrid`]s from [`TableSource`]s.
pub struct TableLayout<'a> {
    breaker: LineBreaker<'a>,
}

impl<'a> TableLayout<'a> {
    pub fn new(breaker: LineBreaker<'a>) -> Self {
        Self { breaker }
    }

    /// Measure all cells, size columns and rows, and return the grid.
    pub fn build(
        &self,
        source: &TableSource,
        style: &TableStyle,
        available_width: f64,
    ) -> Result<TableGrid, PressError> {
        let sheet = self.breaker.sheet();
        let header_style = sheet.paragraph(&style.header_style)?;
        let cell_style = sheet.paragraph(&style.cell_style)?;
        let bold_style = cell_style.emboldened();
        let padding = style.padding;
        let columns = source.column_count();

        let mut header: Option<Vec<ParagraphFlowable>> = source.header.as_ref().map(|cells| {
            cells
                .iter()
                .map(|c| ParagraphFlowable::new(merge_runs(c.clone()), header_style.clone()))
                .collect()
        });
        let mut body: Vec<Vec<ParagraphFlowable>> = source
            .body
            .iter()
            .map(|row| {
                row.iter()
                    .enumerate()
                    .map(|(i, c)| {
                        let bold = matches!(style.bold_columns, Some((start, end)) if start <= i && i < end);
                        let s = if bold { &bold_style } else { cell_style };
                        ParagraphFlowable::new(merge_runs(c.clone()), s.clone())
                    })
                    .collect()
            })
            .collect();

        let mut natural = vec![0.0f64; columns];
        let mut minimum = vec![0.0f64; columns];
        for row in header.iter_mut().chain(body.iter_mut()) {
            for (i, cell) in row.iter_mut().enumerate() {
                let (width, _) = cell.measure(&self.breaker, f64::INFINITY, f64::INFINITY)?;
                let widest = self.breaker.widest_word(cell.runs(), cell.style())?;
                natural[i] = natural[i].max(width + padding.horizontal());
                minimum[i] = minimum[i].max(widest + padding.horizontal());
            }
        }
        let col_widths = fit_columns(&natural, &minimum, available_width);

        let header_height = match header.as_mut() {
            Some(cells) => self.measure_row(cells, &col_widths, style)?,
            None => 0.0,
        };
        let mut rows = Vec::with_capacity(body.len());
        for (k, mut cells) in body.into_iter().enumerate() {
            let height = self.measure_row(&mut cells, &col_widths, style)?;
            rows.push(GridRow {
                cells,
                height,
                shade: source.shading.shade(k),
            });
        }

        debug!(
            "built {} table: {} column(s), {} body row(s), width {:.1}",
            style.name,
            columns,
            rows.len(),
            col_widths.iter().sum::<f64>()
        );
        Ok(TableGrid {
            style: style.clone(),
            header,
            header_height,
            rows,
            col_widths,
            trailing_space: style.space_after,
        })
    }

    fn measure_row(
        &self,
        cells: &mut [ParagraphFlowable],
        col_widths: &[f64],
        style: &TableStyle,
    ) -> Result<f64, PressError> {
        let padding = style.padding;
        let mut height = 0.0f64;
        for (cell, width) in cells.iter_mut().zip(col_widths) {
            let (_, h) = cell.measure(&self.breaker, width - padding.horizontal(), f64::INFINITY)?;
            let h = h.max(cell.style().leading);
            height = height.max(h + padding.vertical());
        }
        Ok(height)
    }
}

/// Natural widths when they fit; otherwise shrink each column toward its
/// minimum in proportion to its slack.
fn fit_columns(natural: &[f64], minimum: &[f64], available: f64) -> Vec<f64> {
    let total: f64 = natural.iter().sum();
    if total <= available {
        return natural.to_vec();
    }
    let floor: f64 = minimum.iter().sum();
    if floor >= available {
        debug!(
            "table needs {:.1}pt for unbreakable words, {:.1}pt available",
            floor, available
        );
        return minimum.to_vec();
    }
    let scale = (available - floor) / (total - floor);
    natural
        .iter()
        .zip(minimum)
        .map(|(n, m)| m + (n - m) * scale)
        .collect()
}
