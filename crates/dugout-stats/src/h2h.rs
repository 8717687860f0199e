// Manager-versus-manager records across every stored season.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use dugout_core::model::{TeamNumber, WeeklyResult, WinLossTie};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeadToHead {
    pub manager: String,
    pub opponent: String,
    pub record: WinLossTie,
    /// Categories won against this opponent, ties counted half.
    pub score_for: f64,
    pub score_against: f64,
    pub games: u32,
}

impl HeadToHead {
    pub fn pct(&self) -> f64 {
        self.record.pct()
    }
}

/// One season's weekly results.
pub struct SeasonResults<'a> {
    pub season: i32,
    pub results: &'a [WeeklyResult],
}

/// Fold weekly results from several seasons into per-manager-pair records.
///
/// Team numbers are resolved to managers per season, since Yahoo reshuffles
/// them when a league is renewed. Results stored before tie adjustment are
/// topped up so both scores sum to `categories`. Playoff weeks are skipped.
/// Rows are sorted by manager, then opponent.
pub fn head_to_head(
    seasons: &[SeasonResults<'_>],
    categories: usize,
    regular_season_weeks: u32,
    manager_for: impl Fn(i32, TeamNumber) -> String,
) -> Vec<HeadToHead> {
    let c = categories as f64;
    let mut table: BTreeMap<(String, String), HeadToHead> = BTreeMap::new();

    for season in seasons {
        for r in season.results.iter().filter(|r| r.week <= regular_season_weeks) {
            let (mut score, mut opp) = (r.score, r.opponent_score);
            let ties = c - (score + opp);
            if ties > 0.0 {
                score += ties / 2.0;
                opp += ties / 2.0;
            }

            let manager = manager_for(season.season, r.team_number);
            let opponent = manager_for(season.season, r.opponent_number);
            let entry = table
                .entry((manager.clone(), opponent.clone()))
                .or_insert_with(|| HeadToHead {
                    manager,
                    opponent,
                    record: WinLossTie::default(),
                    score_for: 0.0,
                    score_against: 0.0,
                    games: 0,
                });

            let outcome = if score > opp {
                WinLossTie::new(1, 0, 0)
            } else if score < opp {
                WinLossTie::new(0, 1, 0)
            } else {
                WinLossTie::new(0, 0, 1)
            };
            entry.record.add(outcome);
            entry.score_for += score;
            entry.score_against += opp;
            entry.games += 1;
        }
    }

    table.into_values().collect()
}
