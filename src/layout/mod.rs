//! # Page Layout
//!
//! Flowables are measured against the content width when they are added to a
//! [`Story`]. Placement then walks the story with a page cursor:
//!
//! 1. Open a page with known dimensions and remaining space.
//! 2. Before placing a flowable, ask whether it fits.
//! 3. If it fits, draw it at the cursor and reduce the remaining space.
//! 4. If it does not, split it (paragraphs by whole lines, tables by whole
//!    rows with the header repeated) or move it to a fresh page.
//! 5. Keep-together groups move whole when they would straddle a boundary.
//!
//! Drawing is pure: every flowable turns into a list of [`DrawCommand`]s in
//! page coordinates (origin top-left, y growing downward). The PDF writer is
//! the only place that flips into PDF's bottom-left space.

pub mod page_break;
pub mod paragraph;
pub mod story;
pub mod table;

pub use paragraph::ParagraphFlowable;
pub use story::Story;
pub use table::{Shade, Shading, TableGrid, TableLayout, TableSource};

use log::{debug, warn};

use crate::error::PressError;
use crate::font::{FontKey, REGULAR};
use crate::model::PageConfig;
use crate::style::Color;
use crate::text::LineBreaker;

const EPSILON: f64 = 1e-6;
const FOOTER_FONT_SIZE: f64 = 8.0;

/// A stroke for rectangle outlines.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stroke {
    pub width: f64,
    pub color: Color,
}

/// One drawing primitive in page coordinates.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    /// A run of text. `y` is the baseline.
    Text {
        x: f64,
        y: f64,
        text: String,
        font: FontKey,
        size: f64,
        color: Color,
    },
    /// A rectangle; `y` is its top edge.
    Rect {
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        fill: Option<Color>,
        stroke: Option<Stroke>,
    },
    /// A named destination at `y`. Draws nothing.
    Anchor { name: String, y: f64 },
    /// A clickable area that jumps to the anchor named `target`.
    Link {
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        target: String,
    },
    Line {
        x1: f64,
        y1: f64,
        x2: f64,
        y2: f64,
        width: f64,
        color: Color,
    },
}

/// A finished page.
#[derive(Debug, Clone)]
pub struct LayoutPage {
    pub width: f64,
    pub height: f64,
    pub commands: Vec<DrawCommand>,
}

impl LayoutPage {
    /// All text drawn on the page, in drawing order.
    pub fn text_runs(&self) -> impl Iterator<Item = &str> {
        self.commands.iter().filter_map(|c| match c {
            DrawCommand::Text { text, .. } => Some(text.as_str()),
            _ => None,
        })
    }
}

/// A unit of vertical content.
#[derive(Debug, Clone)]
pub enum Flowable {
    Paragraph(ParagraphFlowable),
    Table(TableGrid),
    Spacer(f64),
    PageBreak,
    /// Flowables kept on one page when they fit on one.
    Group(Vec<Flowable>),
}

impl Flowable {
    /// Measure against the available area and return the height.
    pub fn measure(
        &mut self,
        breaker: &LineBreaker,
        available_width: f64,
        available_height: f64,
    ) -> Result<f64, PressError> {
        match self {
            Flowable::Paragraph(p) => Ok(p.measure(breaker, available_width, available_height)?.1),
            Flowable::Group(items) => {
                let mut total = 0.0;
                for item in items.iter_mut() {
                    total += item.measure(breaker, available_width, available_height)?;
                }
                Ok(total)
            }
            Flowable::Table(_) | Flowable::Spacer(_) | Flowable::PageBreak => Ok(self.height()),
        }
    }

    /// Height from the last measurement.
    pub fn height(&self) -> f64 {
        match self {
            Flowable::Paragraph(p) => p.height(),
            Flowable::Table(t) => t.height(),
            Flowable::Spacer(h) => *h,
            Flowable::PageBreak => 0.0,
            Flowable::Group(items) => items.iter().map(Flowable::height).sum(),
        }
    }

    /// Height that must fit before any of this flowable can start on a page.
    pub fn lead_height(&self) -> f64 {
        match self {
            Flowable::Paragraph(p) => p.lead_height(),
            Flowable::Table(t) => t.lead_height(),
            Flowable::Group(items) => group_lead_height(items),
            Flowable::Spacer(_) | Flowable::PageBreak => self.height(),
        }
    }

    pub fn draw(&self, x: f64, y: f64) -> Vec<DrawCommand> {
        match self {
            Flowable::Paragraph(p) => p.draw(x, y),
            Flowable::Table(t) => t.draw(x, y),
            Flowable::Spacer(_) | Flowable::PageBreak => Vec::new(),
            Flowable::Group(items) => {
                let mut commands = Vec::new();
                let mut top = y;
                for item in items {
                    commands.extend(item.draw(x, top));
                    top += item.height();
                }
                commands
            }
        }
    }

    /// Split so the first part fits in `available_height`. `None` when the
    /// flowable cannot be divided there.
    pub fn split(&self, available_height: f64) -> Option<(Flowable, Flowable)> {
        match self {
            Flowable::Paragraph(p) => p
                .split(available_height)
                .map(|(a, b)| (Flowable::Paragraph(a), Flowable::Paragraph(b))),
            Flowable::Table(t) => t
                .split(available_height)
                .map(|(a, b)| (Flowable::Table(a), Flowable::Table(b))),
            _ => None,
        }
    }
}

/// Every leading item in full plus the lead of the last one.
fn group_lead_height(items: &[Flowable]) -> f64 {
    match items.split_last() {
        Some((last, leading)) => leading.iter().map(Flowable::height).sum::<f64>() + last.lead_height(),
        None => 0.0,
    }
}

/// Space a keep-together group needs on the current page: all of it when it
/// fits on one page, otherwise enough for the header and the start of the body.
pub(crate) fn group_keep_height(items: &[Flowable], page_height: f64) -> f64 {
    let total: f64 = items.iter().map(Flowable::height).sum();
    if total <= page_height + EPSILON {
        total
    } else {
        group_lead_height(items)
    }
}

struct PageCursor {
    width: f64,
    height: f64,
    content_x: f64,
    content_y: f64,
    content_height: f64,
    y: f64,
    commands: Vec<DrawCommand>,
}

impl PageCursor {
    fn new(config: &PageConfig) -> Self {
        let (width, height) = config.size.dimensions();
        Self {
            width,
            height,
            content_x: config.margin.left,
            content_y: config.margin.top,
            content_height: config.printable_height(),
            y: 0.0,
            commands: Vec::new(),
        }
    }

    fn remaining_height(&self) -> f64 {
        (self.content_height - self.y).max(0.0)
    }

    fn is_blank(&self) -> bool {
        self.commands.is_empty() && self.y <= EPSILON
    }

    fn emit(&mut self, flowable: &Flowable) {
        let commands = flowable.draw(self.content_x, self.content_y + self.y);
        self.commands.extend(commands);
        self.y += flowable.height();
    }

    /// Close this page and open the next one.
    fn turn(&mut self, pages: &mut Vec<LayoutPage>) {
        pages.push(LayoutPage {
            width: self.width,
            height: self.height,
            commands: std::mem::take(&mut self.commands),
        });
        self.y = 0.0;
    }
}

/// Places a [`Story`] onto pages.
pub struct LayoutEngine<'a> {
    breaker: LineBreaker<'a>,
    page: PageConfig,
    page_numbers: bool,
}

impl<'a> LayoutEngine<'a> {
    pub fn new(breaker: LineBreaker<'a>, page: &PageConfig) -> Self {
        Self {
            breaker,
            page: page.clone(),
            page_numbers: false,
        }
    }

    /// Stamp "Page N of M" centered in the bottom margin of every page.
    pub fn with_page_numbers(mut self, enabled: bool) -> Self {
        self.page_numbers = enabled;
        self
    }

    /// Consume the story and produce finished pages.
    pub fn layout(&self, story: Story) -> Result<Vec<LayoutPage>, PressError> {
        let mut pages = Vec::new();
        let mut cursor = PageCursor::new(&self.page);

        for flowable in story.into_items() {
            self.place(flowable, &mut cursor, &mut pages);
        }
        if !cursor.is_blank() {
            cursor.turn(&mut pages);
        }

        if self.page_numbers {
            self.stamp_page_numbers(&mut pages)?;
        }
        debug!("laid out {} page(s)", pages.len());
        Ok(pages)
    }

    fn place(&self, flowable: Flowable, cursor: &mut PageCursor, pages: &mut Vec<LayoutPage>) {
        match flowable {
            Flowable::PageBreak => {
                if !cursor.is_blank() {
                    cursor.turn(pages);
                }
            }
            Flowable::Spacer(h) => {
                if cursor.is_blank() {
                    return;
                }
                if h > cursor.remaining_height() + EPSILON {
                    cursor.turn(pages);
                } else {
                    cursor.y += h;
                }
            }
            Flowable::Group(items) => {
                let needed = group_keep_height(&items, cursor.content_height);
                if needed > cursor.remaining_height() + EPSILON && !cursor.is_blank() {
                    debug!("moving keep-together group to a new page ({:.1}pt needed)", needed);
                    cursor.turn(pages);
                }
                for item in items {
                    self.place(item, cursor, pages);
                }
            }
            splittable => self.place_splittable(splittable, cursor, pages),
        }
    }

    fn place_splittable(
        &self,
        mut flowable: Flowable,
        cursor: &mut PageCursor,
        pages: &mut Vec<LayoutPage>,
    ) {
        loop {
            let height = flowable.height();
            if height <= cursor.remaining_height() + EPSILON {
                cursor.emit(&flowable);
                return;
            }
            if let Some((head, tail)) = flowable.split(cursor.remaining_height()) {
                cursor.emit(&head);
                cursor.turn(pages);
                flowable = tail;
                continue;
            }
            if !cursor.is_blank() {
                cursor.turn(pages);
                continue;
            }
            warn!(
                "{:.1}pt flowable does not fit on an empty page; placing it anyway",
                height
            );
            cursor.emit(&flowable);
            return;
        }
    }

    fn stamp_page_numbers(&self, pages: &mut [LayoutPage]) -> Result<(), PressError> {
        let family = self.breaker.sheet().font_family();
        let total = pages.len();
        for (i, page) in pages.iter_mut().enumerate() {
            let text = format!("Page {} of {}", i + 1, total);
            let width = self.breaker.fonts().measure_string(
                &text,
                family,
                REGULAR,
                false,
                FOOTER_FONT_SIZE,
            )?;
            page.commands.push(DrawCommand::Text {
                x: (page.width - width) / 2.0,
                y: page.height - self.page.margin.bottom / 2.0,
                text,
                font: FontKey::new(family, false, false),
                size: FOOTER_FONT_SIZE,
                color: Color::BLACK,
            });
        }
        Ok(())
    }
}
