//! # Page Break Decisions
//!
//! What to do with a splittable flowable (a paragraph's lines, a table's body
//! rows) that does not fit in the space left on the current page.

/// Minimum number of pieces that must stay together at either side of a
/// break.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeepRules {
    /// Pieces required on the current page before a break.
    pub min_orphans: usize,
    /// Pieces required on the next page after a break.
    pub min_widows: usize,
}

impl KeepRules {
    /// Paragraph lines: two at the bottom of a page, two at the top.
    pub const LINES: KeepRules = KeepRules {
        min_orphans: 2,
        min_widows: 2,
    };

    /// Table rows: any single row may stand alone.
    pub const ROWS: KeepRules = KeepRules {
        min_orphans: 1,
        min_widows: 1,
    };
}

#[derive(Debug, Clone, PartialEq)]
pub enum BreakDecision {
    /// Everything fits in the remaining space.
    Place,
    /// Nothing should go on this page; start the flowable on the next one.
    MoveToNextPage,
    /// Keep the first `at` pieces here and carry the rest over.
    Split { at: usize },
}

/// Decide how a sequence of piece heights breaks at `remaining_height`.
pub fn decide_break(remaining_height: f64, heights: &[f64], rules: KeepRules) -> BreakDecision {
    let total: f64 = heights.iter().sum();
    if total <= remaining_height {
        return BreakDecision::Place;
    }

    let mut used = 0.0;
    let mut fit = 0;
    for &h in heights {
        if used + h > remaining_height {
            break;
        }
        used += h;
        fit += 1;
    }

    if fit == 0 || fit < rules.min_orphans {
        return BreakDecision::MoveToNextPage;
    }

    let carried = heights.len() - fit;
    if carried < rules.min_widows {
        // Pull pieces back so the next page starts with enough of them.
        let at = fit.saturating_sub(rules.min_widows - carried);
        if at == 0 || at < rules.min_orphans {
            return BreakDecision::MoveToNextPage;
        }
        return BreakDecision::Split { at };
    }

    BreakDecision::Split { at: fit }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn everything_fits() {
        let decision = decide_break(100.0, &[20.0, 30.0, 40.0], KeepRules::LINES);
        assert_eq!(decision, BreakDecision::Place);
    }

    #[test]
    fn splits_after_last_fitting_piece() {
        let decision = decide_break(55.0, &[20.0, 30.0, 40.0], KeepRules::ROWS);
        assert_eq!(decision, BreakDecision::Split { at: 2 });
    }

    #[test]
    fn lone_orphan_moves_whole_paragraph() {
        let decision = decide_break(25.0, &[20.0, 30.0, 40.0], KeepRules::LINES);
        assert_eq!(decision, BreakDecision::MoveToNextPage);
    }

    #[test]
    fn widow_pulls_a_line_back() {
        let decision = decide_break(70.0, &[20.0, 20.0, 20.0, 20.0], KeepRules::LINES);
        assert_eq!(decision, BreakDecision::Split { at: 2 });
    }

    #[test]
    fn three_lines_cannot_satisfy_both_rules() {
        let decision = decide_break(45.0, &[20.0, 20.0, 20.0], KeepRules::LINES);
        assert_eq!(decision, BreakDecision::MoveToNextPage);
    }

    #[test]
    fn nothing_fits() {
        let decision = decide_break(5.0, &[20.0, 20.0], KeepRules::ROWS);
        assert_eq!(decision, BreakDecision::MoveToNextPage);
    }
}
