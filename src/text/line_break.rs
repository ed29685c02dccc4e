//! Greedy, word-level line breaking over styled runs.
//!
//! Runs are measured with the font their styles select, so a single line can
//! mix regular, bold, italic and script metrics. Words never split at the
//! character level: a word wider than the line sits alone on its own line.
//! Reference badges are indivisible.

use log::trace;

use super::{ElementKind, ParagraphElement, RunFont};
use crate::error::PressError;
use crate::font::FontContext;
use crate::style::{Color, ParagraphStyle, StyleSheet};

const EPSILON: f64 = 1e-6;

/// A slice of one run placed on a line.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSlice {
    /// A copy of the source element carrying only the text on this line.
    pub element: ParagraphElement,
    pub font: RunFont,
    pub color: Color,
    /// Painted width of the slice.
    pub width: f64,
    /// Distance the cursor moves past this slice. Wider than `width` for
    /// badges, which are followed by one space.
    pub advance: f64,
}

/// One broken line.
#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    pub slices: Vec<RunSlice>,
    /// Visible width (trailing badge gap excluded).
    pub width: f64,
}

impl Line {
    pub fn text(&self) -> String {
        self.slices.iter().map(|s| s.element.text.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.slices.is_empty()
    }
}

/// Accumulates slices into lines.
#[derive(Default)]
struct LineBuilder {
    lines: Vec<Line>,
    current: Vec<RunSlice>,
    width: f64,
}

impl LineBuilder {
    fn is_empty(&self) -> bool {
        self.current.is_empty()
    }

    fn push(&mut self, slice: RunSlice) {
        self.width += slice.advance;
        self.current.push(slice);
    }

    fn finish_line(&mut self) {
        let slices = std::mem::take(&mut self.current);
        let trailing_gap = slices.last().map_or(0.0, |s| s.advance - s.width);
        let width = slices.iter().map(|s| s.advance).sum::<f64>() - trailing_gap;
        self.lines.push(Line { slices, width });
        self.width = 0.0;
    }

    fn finish(mut self) -> Vec<Line> {
        if !self.current.is_empty() {
            self.finish_line();
        }
        self.lines
    }
}

/// Breaks styled runs into lines using the width primitive.
#[derive(Clone, Copy)]
pub struct LineBreaker<'a> {
    fonts: &'a FontContext,
    sheet: &'a StyleSheet,
}

impl<'a> LineBreaker<'a> {
    pub fn new(fonts: &'a FontContext, sheet: &'a StyleSheet) -> Self {
        Self { fonts, sheet }
    }

    pub fn fonts(&self) -> &'a FontContext {
        self.fonts
    }

    pub fn sheet(&self) -> &'a StyleSheet {
        self.sheet
    }

    /// Break `runs` into lines no wider than `available_width`.
    ///
    /// The only line that may exceed the width is one holding a single word
    /// or badge that is wider on its own.
    pub fn break_lines(
        &self,
        runs: &[ParagraphElement],
        style: &ParagraphStyle,
        available_width: f64,
    ) -> Result<Vec<Line>, PressError> {
        let mut builder = LineBuilder::default();

        for run in runs {
            let owner = self.owning_style(run, style)?;
            let font = run.font(owner);
            match run.kind {
                ElementKind::Break => builder.finish_line(),
                ElementKind::Space => {
                    if builder.is_empty() {
                        continue;
                    }
                    let width = self.measure(&run.text, &font)?;
                    if builder.width + width > available_width + EPSILON {
                        builder.finish_line();
                    } else {
                        builder.push(RunSlice {
                            element: run.clone(),
                            font,
                            color: owner.color,
                            width,
                            advance: width,
                        });
                    }
                }
                ElementKind::Reference => {
                    self.place_badge(&mut builder, run, font, owner, available_width)?
                }
                ElementKind::Text => {
                    self.place_text(&mut builder, run, font, owner.color, available_width)?
                }
            }
        }

        let lines = builder.finish();
        trace!(
            "broke {} run(s) into {} line(s) at width {:.1}",
            runs.len(),
            lines.len(),
            available_width
        );
        Ok(lines)
    }

    /// Width of the widest unbreakable piece (word or badge) in `runs`.
    pub fn widest_word(
        &self,
        runs: &[ParagraphElement],
        style: &ParagraphStyle,
    ) -> Result<f64, PressError> {
        let mut widest = 0.0f64;
        for run in runs {
            let owner = self.owning_style(run, style)?;
            let font = run.font(owner);
            match run.kind {
                ElementKind::Reference => {
                    widest = widest.max(self.badge_width(run.text.trim_start(), &font)?)
                }
                ElementKind::Text => {
                    for word in run.text.split(' ').filter(|w| !w.is_empty()) {
                        widest = widest.max(self.measure(word, &font)?);
                    }
                }
                ElementKind::Space | ElementKind::Break => {}
            }
        }
        Ok(widest)
    }

    /// Measure `text` in the given run font.
    pub fn measure(&self, text: &str, font: &RunFont) -> Result<f64, PressError> {
        self.fonts.measure_string(
            text,
            &font.key.family,
            font.key.weight,
            font.key.italic,
            font.size,
        )
    }

    /// Painted width of a badge: label in the badge font plus padding.
    pub fn badge_width(&self, label: &str, font: &RunFont) -> Result<f64, PressError> {
        Ok(self.measure(label, font)? + 2.0 * self.sheet.badge().padding)
    }

    fn owning_style<'s>(
        &self,
        run: &ParagraphElement,
        style: &'s ParagraphStyle,
    ) -> Result<&'s ParagraphStyle, PressError>
    where
        'a: 's,
    {
        match &run.style {
            Some(name) if *name != style.name => self.sheet.paragraph(name),
            _ => Ok(style),
        }
    }

    fn place_badge(
        &self,
        builder: &mut LineBuilder,
        run: &ParagraphElement,
        font: RunFont,
        owner: &ParagraphStyle,
        available_width: f64,
    ) -> Result<(), PressError> {
        let mut label = if builder.is_empty() {
            run.text.trim_start()
        } else {
            run.text.as_str()
        };
        let mut width = self.badge_width(label, &font)?;
        if !builder.is_empty() && builder.width + width > available_width + EPSILON {
            builder.finish_line();
            label = label.trim_start();
            width = self.badge_width(label, &font)?;
        }
        let space = self.fonts.measure_string(
            " ",
            &owner.font_family,
            font.key.weight,
            font.key.italic,
            owner.font_size,
        )?;
        builder.push(RunSlice {
            element: run.slice(label),
            font,
            color: self.sheet.badge().text_color,
            width,
            advance: width + space,
        });
        Ok(())
    }

    fn place_text(
        &self,
        builder: &mut LineBuilder,
        run: &ParagraphElement,
        font: RunFont,
        color: Color,
        available_width: f64,
    ) -> Result<(), PressError> {
        let mut rest: &str = &run.text;
        while !rest.is_empty() {
            if builder.is_empty() {
                rest = rest.trim_start_matches(' ');
                if rest.is_empty() {
                    break;
                }
            }

            let room = available_width - builder.width;
            let ends = word_ends(rest);
            let mut fitted: Option<(usize, f64)> = None;
            let mut width = 0.0;
            let mut start = 0;
            for &end in &ends {
                width += self.measure(&rest[start..end], &font)?;
                start = end;
                if width <= room + EPSILON {
                    fitted = Some((end, width));
                } else {
                    break;
                }
            }

            let (end, width) = match fitted {
                Some(fit) => fit,
                None if !builder.is_empty() => {
                    builder.finish_line();
                    continue;
                }
                None => {
                    let end = ends.first().copied().unwrap_or(rest.len());
                    let width = self.measure(&rest[..end], &font)?;
                    trace!(
                        "word {:?} ({:.1}pt) wider than line ({:.1}pt)",
                        &rest[..end],
                        width,
                        available_width
                    );
                    (end, width)
                }
            };

            builder.push(RunSlice {
                element: run.slice(&rest[..end]),
                font: font.clone(),
                color,
                width,
                advance: width,
            });
            rest = &rest[end..];
            if !rest.is_empty() {
                builder.finish_line();
            }
        }
        Ok(())
    }
}

/// Byte offsets where a word ends: each space that follows a non-space
/// character, plus the end of the text.
fn word_ends(text: &str) -> Vec<usize> {
    let mut ends = Vec::new();
    let mut prev: Option<char> = None;
    for (i, ch) in text.char_indices() {
        if ch == ' ' && prev.is_some_and(|p| p != ' ') {
            ends.push(i);
        }
        prev = Some(ch);
    }
    if ends.last() != Some(&text.len()) {
        ends.push(text.len());
    }
    ends
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::names;
    use crate::text::Styles;

    fn setup() -> (FontContext, StyleSheet) {
        (FontContext::new(), StyleSheet::standard("Helvetica"))
    }

    fn four_runs() -> Vec<ParagraphElement> {
        vec![
            ParagraphElement::text("Saves "),
            ParagraphElement::text("20%").styled(Styles::STRONG),
            ParagraphElement::text(" energy"),
            ParagraphElement::reference("[1]"),
        ]
    }

    #[test]
    fn test_word_ends() {
        assert_eq!(word_ends("Saves "), vec![5, 6]);
        assert_eq!(word_ends(" energy saver"), vec![7, 13]);
        assert_eq!(word_ends("one"), vec![3]);
        assert_eq!(word_ends("   "), vec![3]);
    }

    #[test]
    fn test_four_runs_fit_one_line() {
        let (fonts, sheet) = setup();
        let breaker = LineBreaker::new(&fonts, &sheet);
        let style = sheet.paragraph(names::NORMAL).unwrap();
        let lines = breaker.break_lines(&four_runs(), style, 500.0).unwrap();
        assert_eq!(lines.len(), 1);
        let texts: Vec<&str> = lines[0]
            .slices
            .iter()
            .map(|s| s.element.text.as_str())
            .collect();
        assert_eq!(texts, ["Saves ", "20%", " energy", "[1]"]);
        assert_eq!(lines[0].slices[3].element.kind, ElementKind::Reference);
        assert!(lines[0].slices[1].element.styles.contains(Styles::STRONG));
    }

    #[test]
    fn test_breaks_at_word_boundaries() {
        let (fonts, sheet) = setup();
        let breaker = LineBreaker::new(&fonts, &sheet);
        let style = sheet.paragraph(names::NORMAL).unwrap();
        let runs = vec![ParagraphElement::text(
            "The quick brown fox jumps over the lazy dog again and again",
        )];
        let lines = breaker.break_lines(&runs, style, 80.0).unwrap();
        assert!(lines.len() > 1);
        for line in &lines {
            assert!(line.width <= 80.0 + EPSILON, "line too wide: {:?}", line.text());
            assert!(!line.text().starts_with(' '));
        }
        let rejoined: Vec<String> = lines.iter().map(|l| l.text().trim().to_string()).collect();
        assert_eq!(
            rejoined.join(" "),
            "The quick brown fox jumps over the lazy dog again and again"
        );
    }

    #[test]
    fn test_over_wide_word_sits_alone() {
        let (fonts, sheet) = setup();
        let breaker = LineBreaker::new(&fonts, &sheet);
        let style = sheet.paragraph(names::NORMAL).unwrap();
        let runs = vec![ParagraphElement::text("a Supercalifragilistic b")];
        let lines = breaker.break_lines(&runs, style, 40.0).unwrap();
        let texts: Vec<String> = lines.iter().map(|l| l.text().trim().to_string()).collect();
        assert_eq!(texts, ["a", "Supercalifragilistic", "b"]);
        assert!(lines[1].width > 40.0);
    }

    #[test]
    fn test_badge_never_split() {
        let (fonts, sheet) = setup();
        let breaker = LineBreaker::new(&fonts, &sheet);
        let style = sheet.paragraph(names::NORMAL).unwrap();
        let runs = vec![
            ParagraphElement::text("Efficiency values come from"),
            ParagraphElement::reference(" DEER 2020 Table 4"),
            ParagraphElement::text(" and more"),
        ];
        for width in [40.0, 90.0, 140.0, 200.0, 400.0] {
            let lines = breaker.break_lines(&runs, style, width).unwrap();
            let badges: Vec<&RunSlice> = lines
                .iter()
                .flat_map(|l| l.slices.iter())
                .filter(|s| s.element.kind == ElementKind::Reference)
                .collect();
            assert_eq!(badges.len(), 1, "badge split at width {}", width);
            assert!(badges[0].element.text.ends_with("DEER 2020 Table 4"));
        }
    }

    #[test]
    fn test_badge_at_line_start_loses_leading_space() {
        let (fonts, sheet) = setup();
        let breaker = LineBreaker::new(&fonts, &sheet);
        let style = sheet.paragraph(names::NORMAL).unwrap();
        let runs = vec![
            ParagraphElement::text("Wide enough text"),
            ParagraphElement::reference(" [12]"),
        ];
        let first = breaker.measure("Wide enough text", &runs[0].font(style)).unwrap();
        let lines = breaker.break_lines(&runs, style, first + 5.0).unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1].slices[0].element.text, "[12]");
    }

    #[test]
    fn test_forced_break() {
        let (fonts, sheet) = setup();
        let breaker = LineBreaker::new(&fonts, &sheet);
        let style = sheet.paragraph(names::NORMAL).unwrap();
        let runs = vec![
            ParagraphElement::text("one"),
            ParagraphElement::line_break(),
            ParagraphElement::text("two"),
        ];
        let lines = breaker.break_lines(&runs, style, 500.0).unwrap();
        let texts: Vec<String> = lines.iter().map(Line::text).collect();
        assert_eq!(texts, ["one", "two"]);
    }

    #[test]
    fn test_breaking_is_idempotent() {
        let (fonts, sheet) = setup();
        let breaker = LineBreaker::new(&fonts, &sheet);
        let style = sheet.paragraph(names::NORMAL).unwrap();
        let runs = four_runs();
        let a = breaker.break_lines(&runs, style, 60.0).unwrap();
        let b = breaker.break_lines(&runs, style, 60.0).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_script_runs_are_narrower() {
        let (fonts, sheet) = setup();
        let breaker = LineBreaker::new(&fonts, &sheet);
        let style = sheet.paragraph(names::NORMAL).unwrap();
        let plain = ParagraphElement::text("123");
        let sup = ParagraphElement::text("123").styled(Styles::SUPERSCRIPT);
        let w_plain = breaker.measure(&plain.text, &plain.font(style)).unwrap();
        let w_sup = breaker.measure(&sup.text, &sup.font(style)).unwrap();
        assert!(w_sup < w_plain);
    }

    #[test]
    fn test_unregistered_family_is_measurement_error() {
        let fonts = FontContext::new();
        let sheet = StyleSheet::standard("Garamond");
        let breaker = LineBreaker::new(&fonts, &sheet);
        let style = sheet.paragraph(names::NORMAL).unwrap();
        let err = breaker
            .break_lines(&[ParagraphElement::text("x")], style, 100.0)
            .unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Measurement);
    }

    #[test]
    fn test_widest_word() {
        let (fonts, sheet) = setup();
        let breaker = LineBreaker::new(&fonts, &sheet);
        let style = sheet.paragraph(names::NORMAL).unwrap();
        let runs = vec![ParagraphElement::text("a bbbbbb c")];
        let widest = breaker.widest_word(&runs, style).unwrap();
        let expected = breaker.measure("bbbbbb", &runs[0].font(style)).unwrap();
        assert!((widest - expected).abs() < EPSILON);
    }
}
