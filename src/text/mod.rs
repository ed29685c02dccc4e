//! # Text Runs
//!
//! The atomic styled content unit ([`ParagraphElement`]), the inline style
//! set, run merging, and the mapping from an element's styles to the concrete
//! font it is measured and drawn with.

pub mod line_break;

pub use line_break::{Line, LineBreaker, RunSlice};

use std::ops::BitOr;

use crate::font::{FontKey, BOLD, REGULAR};
use crate::style::ParagraphStyle;

/// Point size used for superscript and subscript runs.
pub const SCRIPT_FONT_SIZE: f64 = 8.0;
/// Baseline shift for superscript (up) and subscript (down) runs.
pub const SCRIPT_RISE: f64 = 4.0;

/// What an element represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKind {
    Text,
    /// An inline reference badge. Never split across lines.
    Reference,
    /// Inter-element whitespace.
    Space,
    /// A forced line break.
    Break,
}

/// A set of inline styles. The empty set is "normal".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Styles(u8);

impl Styles {
    pub const NORMAL: Styles = Styles(0);
    pub const STRONG: Styles = Styles(1);
    pub const ITALIC: Styles = Styles(1 << 1);
    pub const SUPERSCRIPT: Styles = Styles(1 << 2);
    pub const SUBSCRIPT: Styles = Styles(1 << 3);

    pub fn contains(self, other: Styles) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn union(self, other: Styles) -> Styles {
        Styles(self.0 | other.0)
    }

    pub fn is_normal(self) -> bool {
        self.0 == 0
    }

    pub fn is_script(self) -> bool {
        self.contains(Styles::SUPERSCRIPT) || self.contains(Styles::SUBSCRIPT)
    }
}

impl BitOr for Styles {
    type Output = Styles;

    fn bitor(self, rhs: Styles) -> Styles {
        self.union(rhs)
    }
}

/// One styled run of paragraph content.
#[derive(Debug, Clone, PartialEq)]
pub struct ParagraphElement {
    pub text: String,
    pub kind: ElementKind,
    pub styles: Styles,
    /// Name of the paragraph style that owns this run. `None` means the
    /// enclosing paragraph's style.
    pub style: Option<String>,
    /// Named in-document destination the run jumps to when clicked.
    pub link: Option<String>,
}

impl ParagraphElement {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            kind: ElementKind::Text,
            styles: Styles::NORMAL,
            style: None,
            link: None,
        }
    }

    pub fn reference(label: impl Into<String>) -> Self {
        Self {
            text: label.into(),
            kind: ElementKind::Reference,
            styles: Styles::NORMAL,
            style: None,
            link: None,
        }
    }

    pub fn space() -> Self {
        Self {
            text: " ".to_string(),
            kind: ElementKind::Space,
            styles: Styles::NORMAL,
            style: None,
            link: None,
        }
    }

    pub fn line_break() -> Self {
        Self {
            text: String::new(),
            kind: ElementKind::Break,
            styles: Styles::NORMAL,
            style: None,
            link: None,
        }
    }

    pub fn styled(mut self, styles: Styles) -> Self {
        self.styles = self.styles.union(styles);
        self
    }

    pub fn with_style(mut self, style: &str) -> Self {
        self.style = Some(style.to_string());
        self
    }

    pub fn with_link(mut self, target: impl Into<String>) -> Self {
        self.link = Some(target.into());
        self
    }

    /// A copy of this element carrying different text.
    pub fn slice(&self, text: &str) -> Self {
        Self {
            text: text.to_string(),
            ..self.clone()
        }
    }

    /// The concrete font this run is measured and drawn with.
    pub fn font(&self, style: &ParagraphStyle) -> RunFont {
        let bold =
            style.bold || self.styles.contains(Styles::STRONG) || self.kind == ElementKind::Reference;
        let (size, rise) = if self.styles.contains(Styles::SUPERSCRIPT) {
            (SCRIPT_FONT_SIZE, SCRIPT_RISE)
        } else if self.styles.contains(Styles::SUBSCRIPT) {
            (SCRIPT_FONT_SIZE, -SCRIPT_RISE)
        } else {
            (style.font_size, 0.0)
        };
        RunFont {
            key: FontKey {
                family: style.font_family.clone(),
                weight: if bold { BOLD } else { REGULAR },
                italic: self.styles.contains(Styles::ITALIC),
            },
            size,
            rise,
        }
    }

    fn merges_with(&self, other: &ParagraphElement) -> bool {
        self.kind == ElementKind::Text
            && other.kind == ElementKind::Text
            && self.styles == other.styles
            && self.style == other.style
            && self.link == other.link
    }
}

/// Font selection for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunFont {
    pub key: FontKey,
    pub size: f64,
    /// Baseline shift in points; positive raises the run.
    pub rise: f64,
}

/// Coalesce adjacent text runs that share one style signature.
///
/// Reference, space and break elements always stay separate runs. The
/// concatenated text of the output equals that of the input.
pub fn merge_runs(runs: Vec<ParagraphElement>) -> Vec<ParagraphElement> {
    let mut merged: Vec<ParagraphElement> = Vec::with_capacity(runs.len());
    for run in runs {
        match merged.last_mut() {
            Some(last) if last.merges_with(&run) => last.text.push_str(&run.text),
            _ => merged.push(run),
        }
    }
    merged
}

/// Concatenated text of a run sequence.
pub fn plain_text(runs: &[ParagraphElement]) -> String {
    runs.iter().map(|r| r.text.as_str()).collect()
}
