//! Range expressions selecting 1-based round or game positions.
//!
//! Grammar: comma-separated parts, each `N`, `N-M` (inclusive) or `N+`
//! (`N` through the caller's bound); range ends are clamped to that bound. Parts that do not parse are skipped; the
//! parser never fails. An empty selection means "no filter".

use std::collections::BTreeSet;

/// Upper bound applied to `N+` when selecting rounds.
pub const ROUND_SELECTOR_BOUND: u32 = 64;

/// Deduplicated set of selected positions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoundSelector {
    positions: BTreeSet<u32>,
}

impl RoundSelector {
    /// Selector matching every position.
    #[must_use]
    pub const fn all() -> Self {
        Self {
            positions: BTreeSet::new(),
        }
    }

    /// Parse `expression`, expanding `N+` and clamping `N-M` to `max_bound`.
    #[must_use]
    pub fn parse(expression: &str, max_bound: u32) -> Self {
        let mut positions = BTreeSet::new();
        for part in expression.split(',').map(str::trim) {
            if let Some(start) = part.strip_suffix('+') {
                let Some(start) = parse_position(start) else {
                    continue;
                };
                positions.extend(start..=max_bound);
            } else if let Some((start, end)) = part.split_once('-') {
                let (Some(start), Some(end)) = (parse_position(start), parse_position(end)) else {
                    continue;
                };
                positions.extend(start..=end.min(max_bound));
            } else if let Some(position) = parse_position(part) {
                positions.insert(position);
            }
        }
        Self { positions }
    }

    /// Parse an optional expression with the round bound; `None` selects all.
    #[must_use]
    pub fn rounds(expression: Option<&str>) -> Self {
        expression.map_or_else(Self::all, |expr| Self::parse(expr, ROUND_SELECTOR_BOUND))
    }

    /// `true` when the selector applies no filter.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Whether `position` is selected. An empty selector selects everything.
    #[must_use]
    pub fn matches(&self, position: u32) -> bool {
        self.positions.is_empty() || self.positions.contains(&position)
    }

    /// Whether `position` is explicitly listed.
    #[must_use]
    pub fn contains(&self, position: u32) -> bool {
        self.positions.contains(&position)
    }

    /// Selected positions in ascending order.
    pub fn positions(&self) -> impl Iterator<Item = u32> + '_ {
        self.positions.iter().copied()
    }
}

fn parse_position(raw: &str) -> Option<u32> {
    raw.trim().parse::<u32>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(selector: &RoundSelector) -> Vec<u32> {
        selector.positions().collect()
    }

    #[test]
    fn combines_single_ranges_and_open_ended_parts() {
        let selector = RoundSelector::parse("1-4,6,8+", 10);
        assert_eq!(collect(&selector), vec![1, 2, 3, 4, 6, 8, 9, 10]);
    }

    #[test]
    fn empty_and_blank_expressions_select_nothing() {
        assert!(RoundSelector::parse("", ROUND_SELECTOR_BOUND).is_empty());
        assert!(RoundSelector::parse("   ", ROUND_SELECTOR_BOUND).is_empty());
    }

    #[test]
    fn malformed_parts_are_skipped() {
        let selector = RoundSelector::parse("2,,abc,5", 10);
        assert_eq!(collect(&selector), vec![2, 5]);

        let selector = RoundSelector::parse("x+,1-y,-3,7", 10);
        assert_eq!(collect(&selector), vec![7]);
    }

    #[test]
    fn descending_range_contributes_nothing() {
        assert!(RoundSelector::parse("5-3", 10).is_empty());
    }

    #[test]
    fn duplicates_collapse() {
        let selector = RoundSelector::parse("1-3,2,3,1-2", 10);
        assert_eq!(collect(&selector), vec![1, 2, 3]);
    }

    #[test]
    fn open_ended_part_uses_supplied_bound() {
        let selector = RoundSelector::parse("62+", ROUND_SELECTOR_BOUND);
        assert_eq!(collect(&selector), vec![62, 63, 64]);

        let games = RoundSelector::parse("3+", 4);
        assert_eq!(collect(&games), vec![3, 4]);

        assert!(RoundSelector::parse("9+", 4).is_empty());
    }

    #[test]
    fn huge_range_is_clamped_to_bound() {
        let selector = RoundSelector::parse("1-4000000000", ROUND_SELECTOR_BOUND);
        assert_eq!(selector.positions().count(), 64);
        assert_eq!(selector.positions().last(), Some(ROUND_SELECTOR_BOUND));

        assert_eq!(collect(&RoundSelector::parse("3-4000000000", 4)), vec![3, 4]);
        assert!(RoundSelector::parse("70-4000000000", ROUND_SELECTOR_BOUND).is_empty());
    }

    #[test]
    fn whitespace_around_parts_is_tolerated() {
        let selector = RoundSelector::parse(" 1 , 3 - 4 ", 10);
        assert_eq!(collect(&selector), vec![1, 3, 4]);
    }

    #[test]
    fn empty_selector_matches_everything() {
        let selector = RoundSelector::rounds(None);
        assert!(selector.matches(1));
        assert!(selector.matches(99));
        assert!(!selector.contains(1));

        let selector = RoundSelector::rounds(Some("2"));
        assert!(selector.matches(2));
        assert!(!selector.matches(1));
    }
}
