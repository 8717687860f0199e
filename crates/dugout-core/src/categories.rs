// Scoring category metadata: side, direction and weekly aggregation.

use std::cmp::Ordering;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::config::LeagueConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Batting,
    Pitching,
}

/// Which end of a category wins the matchup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    HigherIsBetter,
    LowerIsBetter,
}

impl Direction {
    /// Orders `a` against `b` so that `Ordering::Greater` means `a` is the
    /// better value. NaN compares equal.
    pub fn compare(self, a: f64, b: f64) -> Ordering {
        let ord = a.partial_cmp(&b).unwrap_or(Ordering::Equal);
        match self {
            Direction::HigherIsBetter => ord,
            Direction::LowerIsBetter => ord.reverse(),
        }
    }
}

/// How weekly values combine into a season-to-date value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Aggregation {
    Sum,
    Mean,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub name: String,
    pub side: Side,
    pub direction: Direction,
    pub aggregation: Aggregation,
}

/// The league's scoring categories in configured order, batting first.
#[derive(Debug, Clone, PartialEq)]
pub struct CategorySet {
    categories: Vec<Category>,
}

impl CategorySet {
    pub fn new(categories: Vec<Category>) -> Self {
        Self { categories }
    }

    pub fn from_league(league: &LeagueConfig) -> Self {
        let build = |name: &String, side: Side| Category {
            name: name.clone(),
            side,
            direction: if league.scoring.lower_is_better.contains(name) {
                Direction::LowerIsBetter
            } else {
                Direction::HigherIsBetter
            },
            aggregation: if league.scoring.averaged.contains(name) {
                Aggregation::Mean
            } else {
                Aggregation::Sum
            },
        };

        let categories = league
            .batting_categories
            .categories
            .iter()
            .map(|n| build(n, Side::Batting))
            .chain(
                league
                    .pitching_categories
                    .categories
                    .iter()
                    .map(|n| build(n, Side::Pitching)),
            )
            .collect();

        Self { categories }
    }

    /// Number of categories decided in each weekly matchup.
    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Category> {
        self.categories.iter()
    }

    pub fn get(&self, name: &str) -> Option<&Category> {
        self.categories.iter().find(|c| c.name == name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.categories.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn side(&self, side: Side) -> impl Iterator<Item = &Category> {
        self.categories.iter().filter(move |c| c.side == side)
    }
}

/// Clean a scraped table header into a category key.
///
/// Yahoo spells headers like `K/9`, `SV+H` or `#`; punctuation is stripped
/// and the configured aliases applied to what remains.
pub fn normalize_header(raw: &str, aliases: &HashMap<String, String>) -> String {
    let stripped: String = raw
        .trim()
        .chars()
        .filter(|c| !matches!(c, '#' | ',' | '@' | '&' | '/' | '+'))
        .collect();
    aliases.get(&stripped).cloned().unwrap_or(stripped)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cat(name: &str, side: Side, direction: Direction, aggregation: Aggregation) -> Category {
        Category {
            name: name.into(),
            side,
            direction,
            aggregation,
        }
    }

    #[test]
    fn direction_compare_flips_for_lower_is_better() {
        assert_eq!(Direction::HigherIsBetter.compare(5.0, 3.0), Ordering::Greater);
        assert_eq!(Direction::LowerIsBetter.compare(2.50, 3.10), Ordering::Greater);
        assert_eq!(Direction::LowerIsBetter.compare(1.0, 1.0), Ordering::Equal);
        assert_eq!(Direction::HigherIsBetter.compare(f64::NAN, 1.0), Ordering::Equal);
    }

    #[test]
    fn normalize_header_strips_punctuation() {
        let aliases = HashMap::new();
        assert_eq!(normalize_header("K/9", &aliases), "K9");
        assert_eq!(normalize_header("SV+H", &aliases), "SVH");
        assert_eq!(normalize_header(" #Team ", &aliases), "Team");
        assert_eq!(normalize_header("R", &aliases), "R");
    }

    #[test]
    fn normalize_header_applies_aliases_after_stripping() {
        let mut aliases = HashMap::new();
        aliases.insert("HR.1".to_string(), "HRA".to_string());
        assert_eq!(normalize_header("HR.1", &aliases), "HRA");
        assert_eq!(normalize_header("HR", &aliases), "HR");
    }

    #[test]
    fn category_set_lookup_and_sides() {
        let set = CategorySet::new(vec![
            cat("R", Side::Batting, Direction::HigherIsBetter, Aggregation::Sum),
            cat("OPS", Side::Batting, Direction::HigherIsBetter, Aggregation::Mean),
            cat("ERA", Side::Pitching, Direction::LowerIsBetter, Aggregation::Mean),
        ]);
        assert_eq!(set.len(), 3);
        assert_eq!(set.names(), vec!["R", "OPS", "ERA"]);
        assert_eq!(set.side(Side::Batting).count(), 2);
        assert_eq!(
            set.get("ERA").map(|c| c.direction),
            Some(Direction::LowerIsBetter)
        );
        assert!(set.get("WHIP").is_none());
    }
}
