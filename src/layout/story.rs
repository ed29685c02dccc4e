//! # Story
//!
//! The ordered list of flowables for one document plus a running pagination
//! tracker. Every flowable is measured at the content width as it is added.
//!
//! The tracker never splits anything. It only estimates how much of the
//! current page is used so that atomic groups (a header that must share a page
//! with its body) can be pushed to the next page before they would straddle a
//! boundary. Actual splitting happens during placement in [`LayoutEngine`].
//!
//! [`LayoutEngine`]: super::LayoutEngine

use log::debug;

use super::{group_keep_height, Flowable};
use crate::error::PressError;
use crate::model::PageConfig;
use crate::text::LineBreaker;

#[derive(Debug, Clone)]
pub struct Story {
    items: Vec<Flowable>,
    total_height: f64,
    page_height: f64,
    printable_height: f64,
    content_width: f64,
}

impl Story {
    pub fn new(page: &PageConfig) -> Self {
        Self {
            items: Vec::new(),
            total_height: 0.0,
            page_height: 0.0,
            printable_height: page.printable_height(),
            content_width: page.content_width(),
        }
    }

    /// Measure and append a flowable.
    pub fn add(&mut self, mut flowable: Flowable, breaker: &LineBreaker) -> Result<(), PressError> {
        if let Flowable::PageBreak = flowable {
            self.page_height = 0.0;
            self.items.push(flowable);
            return Ok(());
        }
        let height = flowable.measure(breaker, self.content_width, self.page_height_remaining())?;
        self.total_height += height;
        self.consume(height);
        self.items.push(flowable);
        Ok(())
    }

    /// Append `header` and `body` as one keep-together group.
    ///
    /// When the pair does not fit in the space left on the current page but
    /// would fit on an empty one, a page break goes in first. A pair taller
    /// than a page breaks early when the header and the first piece of the
    /// body would not fit together.
    pub fn add_group(
        &mut self,
        mut header: Flowable,
        mut body: Flowable,
        breaker: &LineBreaker,
    ) -> Result<(), PressError> {
        let remaining = self.page_height_remaining();
        let h1 = header.measure(breaker, self.content_width, remaining)?;
        let h2 = body.measure(breaker, self.content_width, remaining)?;
        let combined = h1 + h2;
        let items = vec![header, body];
        let needed = group_keep_height(&items, self.printable_height);

        if needed > remaining && self.page_height > 0.0 {
            debug!(
                "group needs {:.1}pt but {:.1}pt remain; starting a new page",
                needed, remaining
            );
            self.items.push(Flowable::PageBreak);
            self.page_height = 0.0;
        }

        self.total_height += combined;
        self.consume(combined);
        self.items.push(Flowable::Group(items));
        Ok(())
    }

    pub fn page_height_remaining(&self) -> f64 {
        self.printable_height - self.page_height
    }

    /// Drop every flowable and zero the tracker.
    pub fn reset(&mut self) {
        self.items.clear();
        self.total_height = 0.0;
        self.page_height = 0.0;
    }

    pub fn total_height(&self) -> f64 {
        self.total_height
    }

    /// Height used on the current page.
    pub fn page_height(&self) -> f64 {
        self.page_height
    }

    pub fn printable_height(&self) -> f64 {
        self.printable_height
    }

    pub fn content_width(&self) -> f64 {
        self.content_width
    }

    pub fn items(&self) -> &[Flowable] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub(crate) fn into_items(self) -> Vec<Flowable> {
        self.items
    }

    fn consume(&mut self, height: f64) {
        let used = self.page_height + height;
        if used > self.printable_height {
            let mut overflow = used - self.printable_height;
            if overflow > self.printable_height {
                overflow %= self.printable_height;
            }
            self.page_height = overflow;
        } else {
            self.page_height = used;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::font::FontContext;
    use crate::layout::ParagraphFlowable;
    use crate::style::{names, StyleSheet};
    use crate::text::ParagraphElement;

    fn setup() -> (FontContext, StyleSheet, PageConfig) {
        (
            FontContext::new(),
            StyleSheet::standard("Helvetica"),
            PageConfig::default(),
        )
    }

    #[test]
    fn test_heights_accumulate() {
        let (fonts, sheet, page) = setup();
        let breaker = LineBreaker::new(&fonts, &sheet);
        let mut story = Story::new(&page);
        story.add(Flowable::Spacer(100.0), &breaker).unwrap();
        story.add(Flowable::Spacer(50.0), &breaker).unwrap();
        assert_eq!(story.total_height(), 150.0);
        assert_eq!(story.page_height(), 150.0);
        assert_eq!(story.page_height_remaining(), 684.0 - 150.0);
    }

    #[test]
    fn test_overflow_carries_to_next_page() {
        let (fonts, sheet, page) = setup();
        let breaker = LineBreaker::new(&fonts, &sheet);
        let mut story = Story::new(&page);
        story.add(Flowable::Spacer(600.0), &breaker).unwrap();
        story.add(Flowable::Spacer(100.0), &breaker).unwrap();
        assert_eq!(story.page_height(), 600.0 + 100.0 - 684.0);

        story.add(Flowable::Spacer(684.0 * 2.0 + 10.0), &breaker).unwrap();
        assert!(story.page_height() < 684.0);
    }

    #[test]
    fn test_page_break_resets_page_height() {
        let (fonts, sheet, page) = setup();
        let breaker = LineBreaker::new(&fonts, &sheet);
        let mut story = Story::new(&page);
        story.add(Flowable::Spacer(300.0), &breaker).unwrap();
        story.add(Flowable::PageBreak, &breaker).unwrap();
        assert_eq!(story.page_height(), 0.0);
        assert_eq!(story.total_height(), 300.0);
    }

    #[test]
    fn test_group_inserts_page_break_when_it_would_straddle() {
        let (fonts, sheet, page) = setup();
        let breaker = LineBreaker::new(&fonts, &sheet);
        let mut story = Story::new(&page);
        story.add(Flowable::Spacer(600.0), &breaker).unwrap();
        story
            .add_group(Flowable::Spacer(40.0), Flowable::Spacer(60.0), &breaker)
            .unwrap();
        assert!(matches!(story.items()[1], Flowable::PageBreak));
        assert!(matches!(story.items()[2], Flowable::Group(_)));
        assert_eq!(story.page_height(), 100.0);
    }

    #[test]
    fn test_oversized_group_breaks_when_header_and_lead_would_straddle() {
        let (fonts, sheet, page) = setup();
        let breaker = LineBreaker::new(&fonts, &sheet);
        let normal = sheet.paragraph(names::NORMAL).unwrap().clone();
        let body = Flowable::Paragraph(ParagraphFlowable::new(
            vec![ParagraphElement::text("measure text ".repeat(1000))],
            normal,
        ));
        let mut story = Story::new(&page);
        story.add(Flowable::Spacer(page.printable_height() - 20.0), &breaker).unwrap();
        story
            .add_group(Flowable::Spacer(15.0), body, &breaker)
            .unwrap();
        assert!(matches!(story.items()[1], Flowable::PageBreak));
    }

    #[test]
    fn test_group_that_fits_stays() {
        let (fonts, sheet, page) = setup();
        let breaker = LineBreaker::new(&fonts, &sheet);
        let mut story = Story::new(&page);
        story.add(Flowable::Spacer(100.0), &breaker).unwrap();
        story
            .add_group(Flowable::Spacer(40.0), Flowable::Spacer(60.0), &breaker)
            .unwrap();
        assert_eq!(story.len(), 2);
    }

    #[test]
    fn test_reset() {
        let (fonts, sheet, page) = setup();
        let breaker = LineBreaker::new(&fonts, &sheet);
        let mut story = Story::new(&page);
        story.add(Flowable::Spacer(100.0), &breaker).unwrap();
        story.reset();
        assert!(story.is_empty());
        assert_eq!(story.total_height(), 0.0);
        assert_eq!(story.page_height(), 0.0);
    }
}
