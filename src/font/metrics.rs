//! Advance widths for the built-in standard PDF fonts.
//!
//! Widths are in 1/1000 em, taken from the Adobe AFM files. The oblique
//! Helvetica variants share the upright widths, and every Courier glyph is
//! 600 units wide.

/// Helvetica widths for the printable ASCII range (0x20..=0x7E).
const HELVETICA: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '..'/'
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, // '0'..'9'
    278, 278, 584, 584, 584, 556, 1015, // ':'..'@'
    667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, // 'A'..'M'
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, // 'N'..'Z'
    278, 278, 278, 469, 556, 333, // '['..'`'
    556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, // 'a'..'m'
    556, 556, 556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, // 'n'..'z'
    334, 260, 334, 584, // '{'..'~'
];

/// Helvetica-Bold widths for the printable ASCII range.
const HELVETICA_BOLD: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278, // ' '..'/'
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, // '0'..'9'
    333, 333, 584, 584, 584, 611, 975, // ':'..'@'
    722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, // 'A'..'M'
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, // 'N'..'Z'
    333, 278, 333, 584, 556, 333, // '['..'`'
    556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, // 'a'..'m'
    611, 611, 611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, // 'n'..'z'
    389, 280, 389, 584, // '{'..'~'
];

/// Metrics for one of the standard PDF fonts.
#[derive(Debug, Clone, Copy)]
pub struct StandardFontMetrics {
    ascii: Option<&'static [u16; 95]>,
    bold: bool,
    /// Width used for every glyph of a monospaced face.
    fixed: Option<u16>,
}

impl StandardFontMetrics {
    pub(crate) const HELVETICA: Self = Self {
        ascii: Some(&HELVETICA),
        bold: false,
        fixed: None,
    };
    pub(crate) const HELVETICA_BOLD: Self = Self {
        ascii: Some(&HELVETICA_BOLD),
        bold: true,
        fixed: None,
    };
    pub(crate) const COURIER: Self = Self {
        ascii: None,
        bold: false,
        fixed: Some(600),
    };

    /// Advance width of a character in 1/1000 em. Characters drawn through
    /// an [`ascii_substitute`] measure as their substitute.
    pub fn advance(&self, ch: char) -> u16 {
        if let Some(sub) = ascii_substitute(ch) {
            return sub.chars().map(|c| self.advance(c)).sum();
        }
        if let Some(w) = self.fixed {
            return w;
        }
        let code = ch as u32;
        if (0x20..=0x7E).contains(&code) {
            if let Some(table) = self.ascii {
                return table[(code - 0x20) as usize];
            }
        }
        self.extended_advance(ch)
    }

    /// Widths for the WinAnsi characters outside ASCII that measure content
    /// actually uses (typographic quotes, dashes, symbols).
    fn extended_advance(&self, ch: char) -> u16 {
        match (ch, self.bold) {
            ('\u{00A0}', _) => 278,
            ('\u{2018}' | '\u{2019}' | '\u{201A}', false) => 222,
            ('\u{2018}' | '\u{2019}' | '\u{201A}', true) => 278,
            ('\u{201C}' | '\u{201D}' | '\u{201E}', false) => 333,
            ('\u{201C}' | '\u{201D}' | '\u{201E}', true) => 500,
            ('\u{2013}', _) => 556,
            ('\u{2014}' | '\u{2026}' | '\u{2030}', _) => 1000,
            ('\u{2022}', _) => 350,
            ('\u{00B0}', _) => 400,
            ('\u{00B1}' | '\u{00D7}' | '\u{00F7}', _) => 584,
            ('\u{00A9}' | '\u{00AE}', _) => 737,
            ('\u{2122}', _) => 1000,
            ('\u{00B2}' | '\u{00B3}' | '\u{00B9}', _) => 333,
            (_, false) => 556,
            (_, true) => 611,
        }
    }

    /// Width of a character in points at the given size.
    pub fn char_width(&self, ch: char, font_size: f64) -> f64 {
        self.advance(ch) as f64 / 1000.0 * font_size
    }

    /// Width of a string in points.
    pub fn measure_string(&self, text: &str, font_size: f64, letter_spacing: f64) -> f64 {
        text.chars()
            .map(|ch| self.char_width(ch, font_size) + letter_spacing)
            .sum()
    }
}

/// ASCII spelling for symbols WinAnsi cannot encode but measure text uses.
pub fn ascii_substitute(ch: char) -> Option<&'static str> {
    match ch {
        '\u{2264}' => Some("<="),
        '\u{2265}' => Some(">="),
        '\u{2260}' => Some("!="),
        '\u{2248}' => Some("~"),
        '\u{2212}' => Some("-"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn space_is_278() {
        assert_eq!(StandardFontMetrics::HELVETICA.advance(' '), 278);
        assert_eq!(StandardFontMetrics::HELVETICA_BOLD.advance(' '), 278);
    }

    #[test]
    fn table_indexes_line_up() {
        let m = StandardFontMetrics::HELVETICA;
        assert_eq!(m.advance('0'), 556);
        assert_eq!(m.advance('@'), 1015);
        assert_eq!(m.advance('A'), 667);
        assert_eq!(m.advance('W'), 944);
        assert_eq!(m.advance('i'), 222);
        assert_eq!(m.advance('~'), 584);
        assert_eq!(StandardFontMetrics::HELVETICA_BOLD.advance('z'), 500);
    }

    #[test]
    fn comparison_signs_measure_as_ascii() {
        let m = &StandardFontMetrics::HELVETICA;
        assert_eq!(m.advance('\u{2264}'), m.advance('<') + m.advance('='));
        assert_eq!(StandardFontMetrics::COURIER.advance('\u{2265}'), 1200);
    }

    #[test]
    fn courier_is_monospaced() {
        let m = StandardFontMetrics::COURIER;
        assert_eq!(m.advance('i'), m.advance('W'));
    }
}
