//! A paragraph of styled runs that measures, draws and splits itself.

use super::page_break::{decide_break, BreakDecision, KeepRules};
use super::DrawCommand;
use crate::error::PressError;
use crate::font::FontKey;
use crate::style::{BadgeStyle, ParagraphStyle};
use crate::text::{ElementKind, Line, LineBreaker, ParagraphElement};

/// Gap between a list marker and the item text.
const MARKER_GAP: f64 = 4.0;

#[derive(Debug, Clone)]
struct ParagraphLayout {
    /// Text width the lines were broken at.
    width: f64,
    lines: Vec<Line>,
    badge: BadgeStyle,
    marker_width: f64,
}

#[derive(Debug, Clone)]
pub struct ParagraphFlowable {
    runs: Vec<ParagraphElement>,
    style: ParagraphStyle,
    /// Bullet or number drawn in the left indent of the first line.
    marker: Option<String>,
    layout: Option<ParagraphLayout>,
    /// Continuation fragment after a split: no space before, no marker.
    continued: bool,
    /// Leading fragment before a split: no space after.
    broken: bool,
    /// Destination name marked at the top of the paragraph.
    anchor: Option<String>,
}

impl ParagraphFlowable {
    pub fn new(runs: Vec<ParagraphElement>, style: ParagraphStyle) -> Self {
        Self {
            runs,
            style,
            marker: None,
            layout: None,
            continued: false,
            broken: false,
            anchor: None,
        }
    }

    /// Mark the top of the paragraph as the destination `name`.
    pub fn with_anchor(mut self, name: impl Into<String>) -> Self {
        self.anchor = Some(name.into());
        self
    }

    /// A list item: indented text with a bullet or number marker.
    pub fn list_item(runs: Vec<ParagraphElement>, style: ParagraphStyle, marker: &str) -> Self {
        Self {
            marker: Some(marker.to_string()),
            ..Self::new(runs, style)
        }
    }

    pub fn style(&self) -> &ParagraphStyle {
        &self.style
    }

    pub fn runs(&self) -> &[ParagraphElement] {
        &self.runs
    }

    /// Lines from the last measurement.
    pub fn lines(&self) -> &[Line] {
        match &self.layout {
            Some(layout) => &layout.lines,
            None => &[],
        }
    }

    /// Break into lines for `available_width` and return `(width, height)`.
    ///
    /// Lines are cached and only recomputed when the width changes.
    pub fn measure(
        &mut self,
        breaker: &LineBreaker,
        available_width: f64,
        _available_height: f64,
    ) -> Result<(f64, f64), PressError> {
        let text_width = available_width - self.style.left_indent;
        let stale = self
            .layout
            .as_ref()
            .map_or(true, |l| l.width != text_width);
        if stale {
            let lines = breaker.break_lines(&self.runs, &self.style, text_width)?;
            let marker_width = match &self.marker {
                Some(marker) => breaker.fonts().measure_string(
                    marker,
                    &self.style.font_family,
                    self.marker_font().weight,
                    false,
                    self.style.font_size,
                )?,
                None => 0.0,
            };
            self.layout = Some(ParagraphLayout {
                width: text_width,
                lines,
                badge: breaker.sheet().badge().clone(),
                marker_width,
            });
        }
        let widest = self
            .lines()
            .iter()
            .map(|l| l.width)
            .fold(0.0f64, f64::max);
        Ok((self.style.left_indent + widest, self.height()))
    }

    /// Height from the last measurement, including paragraph spacing.
    pub fn height(&self) -> f64 {
        self.lines().len() as f64 * self.style.leading + self.space_before() + self.space_after()
    }

    /// Height of the smallest first part [`split`](Self::split) can leave
    /// behind: the first two lines, or the whole paragraph when it cannot be
    /// divided.
    pub fn lead_height(&self) -> f64 {
        let rules = KeepRules::LINES;
        if self.lines().len() < rules.min_orphans + rules.min_widows {
            return self.height();
        }
        self.space_before() + rules.min_orphans as f64 * self.style.leading
    }

    fn space_before(&self) -> f64 {
        if self.continued {
            0.0
        } else {
            self.style.space_before
        }
    }

    fn space_after(&self) -> f64 {
        if self.broken {
            0.0
        } else {
            self.style.space_after
        }
    }

    fn marker_font(&self) -> FontKey {
        FontKey::new(&self.style.font_family, self.style.bold, false)
    }

    /// Draw commands for the paragraph with its top-left corner at `(x, y)`.
    pub fn draw(&self, x: f64, y: f64) -> Vec<DrawCommand> {
        let Some(layout) = &self.layout else {
            return Vec::new();
        };
        let mut commands = Vec::new();
        if let (Some(name), false) = (&self.anchor, self.continued) {
            commands.push(DrawCommand::Anchor {
                name: name.clone(),
                y,
            });
        }
        let mut top = y + self.space_before();
        let text_x = x + self.style.left_indent;

        if let (Some(marker), false) = (&self.marker, self.continued) {
            if !layout.lines.is_empty() {
                commands.push(DrawCommand::Text {
                    x: text_x - layout.marker_width - MARKER_GAP,
                    y: top + self.style.font_size,
                    text: marker.clone(),
                    font: self.marker_font(),
                    size: self.style.font_size,
                    color: self.style.color,
                });
            }
        }

        for line in &layout.lines {
            let baseline = top + self.style.font_size;
            let mut cursor = text_x;
            for slice in &line.slices {
                match slice.element.kind {
                    ElementKind::Reference => {
                        let size = slice.font.size;
                        commands.push(DrawCommand::Rect {
                            x: cursor,
                            y: baseline - size * 0.85,
                            width: slice.width,
                            height: size * 1.1,
                            fill: Some(layout.badge.background),
                            stroke: None,
                        });
                        commands.push(DrawCommand::Text {
                            x: cursor + layout.badge.padding,
                            y: baseline,
                            text: slice.element.text.clone(),
                            font: slice.font.key.clone(),
                            size,
                            color: slice.color,
                        });
                    }
                    ElementKind::Text if !slice.element.text.is_empty() => {
                        commands.push(DrawCommand::Text {
                            x: cursor,
                            y: baseline - slice.font.rise,
                            text: slice.element.text.clone(),
                            font: slice.font.key.clone(),
                            size: slice.font.size,
                            color: slice.color,
                        });
                        if let Some(target) = &slice.element.link {
                            commands.push(DrawCommand::Link {
                                x: cursor,
                                y: top,
                                width: slice.width,
                                height: self.style.leading,
                                target: target.clone(),
                            });
                        }
                    }
                    _ => {}
                }
                cursor += slice.advance;
            }
            top += self.style.leading;
        }
        commands
    }

    /// Divide by whole lines so the first part fits in `available_height`,
    /// keeping at least two lines on each side.
    pub fn split(&self, available_height: f64) -> Option<(ParagraphFlowable, ParagraphFlowable)> {
        let layout = self.layout.as_ref()?;
        let count = layout.lines.len();
        let heights: Vec<f64> = (0..count)
            .map(|i| {
                let mut h = self.style.leading;
                if i == 0 {
                    h += self.space_before();
                }
                if i + 1 == count {
                    h += self.space_after();
                }
                h
            })
            .collect();

        match decide_break(available_height, &heights, KeepRules::LINES) {
            BreakDecision::Split { at } => {
                let (head_lines, tail_lines) = layout.lines.split_at(at);
                let head = ParagraphFlowable {
                    layout: Some(ParagraphLayout {
                        lines: head_lines.to_vec(),
                        ..layout.clone()
                    }),
                    broken: true,
                    ..self.clone()
                };
                let tail = ParagraphFlowable {
                    layout: Some(ParagraphLayout {
                        lines: tail_lines.to_vec(),
                        ..layout.clone()
                    }),
                    continued: true,
                    ..self.clone()
                };
                Some((head, tail))
            }
            BreakDecision::Place | BreakDecision::MoveToNextPage => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::font::FontContext;
    use crate::style::{names, StyleSheet};
    use crate::text::{Styles, SCRIPT_RISE};

    fn normal(sheet: &StyleSheet) -> ParagraphStyle {
        sheet.paragraph(names::NORMAL).unwrap().clone()
    }

    #[test]
    fn test_height_is_lines_times_leading_plus_spacing() {
        let fonts = FontContext::new();
        let sheet = StyleSheet::standard("Helvetica");
        let breaker = LineBreaker::new(&fonts, &sheet);
        let mut p = ParagraphFlowable::new(
            vec![ParagraphElement::text("word ".repeat(60))],
            normal(&sheet),
        );
        let (_, height) = p.measure(&breaker, 200.0, 1000.0).unwrap();
        let lines = p.lines().len();
        assert!(lines > 1);
        assert_eq!(height, lines as f64 * 13.0 + 6.0);
    }

    #[test]
    fn test_measure_caches_until_width_changes() {
        let fonts = FontContext::new();
        let sheet = StyleSheet::standard("Helvetica");
        let breaker = LineBreaker::new(&fonts, &sheet);
        let mut p = ParagraphFlowable::new(
            vec![ParagraphElement::text("alpha beta gamma delta epsilon")],
            normal(&sheet),
        );
        let wide = p.measure(&breaker, 500.0, 100.0).unwrap();
        assert_eq!(p.lines().len(), 1);
        let narrow = p.measure(&breaker, 50.0, 100.0).unwrap();
        assert!(p.lines().len() > 1);
        assert!(narrow.1 > wide.1);
    }

    #[test]
    fn test_draw_badge_and_scripts() {
        let fonts = FontContext::new();
        let sheet = StyleSheet::standard("Helvetica");
        let breaker = LineBreaker::new(&fonts, &sheet);
        let mut p = ParagraphFlowable::new(
            vec![
                ParagraphElement::text("CO"),
                ParagraphElement::text("2").styled(Styles::SUBSCRIPT),
                ParagraphElement::text(" and m"),
                ParagraphElement::text("2").styled(Styles::SUPERSCRIPT),
                ParagraphElement::reference("[1]"),
            ],
            normal(&sheet),
        );
        p.measure(&breaker, 500.0, 100.0).unwrap();
        let commands = p.draw(0.0, 0.0);

        let baseline = 10.0;
        let mut ys = Vec::new();
        let mut rects = 0;
        for c in &commands {
            match c {
                DrawCommand::Text { text, y, size, .. } => ys.push((text.clone(), *y, *size)),
                DrawCommand::Rect { fill, .. } => {
                    rects += 1;
                    assert_eq!(*fill, Some(sheet.badge().background));
                }
                _ => {}
            }
        }
        assert_eq!(rects, 1);
        assert_eq!(ys[0], ("CO".to_string(), baseline, 10.0));
        assert_eq!(ys[1], ("2".to_string(), baseline + SCRIPT_RISE, 8.0));
        assert_eq!(ys[3], ("2".to_string(), baseline - SCRIPT_RISE, 8.0));
        assert_eq!(ys[4].0, "[1]");
    }

    #[test]
    fn test_split_keeps_two_lines_each_side() {
        let fonts = FontContext::new();
        let sheet = StyleSheet::standard("Helvetica");
        let breaker = LineBreaker::new(&fonts, &sheet);
        let mut p = ParagraphFlowable::new(
            vec![ParagraphElement::text("line ".repeat(100))],
            normal(&sheet),
        );
        p.measure(&breaker, 100.0, 1000.0).unwrap();
        let total = p.lines().len();
        assert!(total >= 6);

        let (head, tail) = p.split(13.0 * 3.0).unwrap();
        assert_eq!(head.lines().len(), 3);
        assert_eq!(tail.lines().len(), total - 3);
        assert_eq!(head.height(), 39.0);
        assert_eq!(tail.height(), (total - 3) as f64 * 13.0 + 6.0);

        assert!(p.split(13.0).is_none(), "a single orphan line must not split");
    }

    #[test]
    fn test_lead_height_is_first_two_lines() {
        let fonts = FontContext::new();
        let sheet = StyleSheet::standard("Helvetica");
        let breaker = LineBreaker::new(&fonts, &sheet);
        let mut long = ParagraphFlowable::new(
            vec![ParagraphElement::text("line ".repeat(100))],
            normal(&sheet),
        );
        long.measure(&breaker, 100.0, 1000.0).unwrap();
        assert_eq!(long.lead_height(), 26.0);

        let mut short = ParagraphFlowable::new(vec![ParagraphElement::text("one line")], normal(&sheet));
        short.measure(&breaker, 500.0, 1000.0).unwrap();
        assert_eq!(short.lead_height(), short.height());
    }

    #[test]
    fn test_anchor_and_link_commands() {
        let fonts = FontContext::new();
        let sheet = StyleSheet::standard("Helvetica");
        let breaker = LineBreaker::new(&fonts, &sheet);
        let mut p = ParagraphFlowable::new(
            vec![ParagraphElement::text("Shared Parameters").with_link("M1/shared_parameters")],
            normal(&sheet),
        )
        .with_anchor("M1/index");
        p.measure(&breaker, 500.0, 100.0).unwrap();
        let commands = p.draw(10.0, 20.0);

        assert_eq!(
            commands[0],
            DrawCommand::Anchor {
                name: "M1/index".to_string(),
                y: 20.0
            }
        );
        let link = commands.iter().find_map(|c| match c {
            DrawCommand::Link { x, y, height, target, .. } => Some((*x, *y, *height, target.as_str())),
            _ => None,
        });
        assert_eq!(link, Some((10.0, 20.0, 13.0, "M1/shared_parameters")));

        let mut long = ParagraphFlowable::new(
            vec![ParagraphElement::text("line ".repeat(100))],
            normal(&sheet),
        )
        .with_anchor("M1/technology_summary");
        long.measure(&breaker, 100.0, 1000.0).unwrap();
        let (_, tail) = long.split(13.0 * 3.0).unwrap();
        assert!(!tail
            .draw(0.0, 0.0)
            .iter()
            .any(|c| matches!(c, DrawCommand::Anchor { .. })));
    }

    #[test]
    fn test_list_item_marker_in_indent() {
        let fonts = FontContext::new();
        let sheet = StyleSheet::standard("Helvetica");
        let breaker = LineBreaker::new(&fonts, &sheet);
        let style = sheet.paragraph(names::LIST_ITEM).unwrap().clone();
        let mut p = ParagraphFlowable::list_item(vec![ParagraphElement::text("Item")], style, "1.");
        p.measure(&breaker, 300.0, 100.0).unwrap();
        let commands = p.draw(0.0, 0.0);
        match (&commands[0], &commands[1]) {
            (
                DrawCommand::Text { text: marker, x: mx, .. },
                DrawCommand::Text { text, x, .. },
            ) => {
                assert_eq!(marker, "1.");
                assert_eq!(text, "Item");
                assert_eq!(*x, 12.0);
                assert!(*mx < *x);
            }
            other => panic!("unexpected commands {:?}", other),
        }
    }
}
