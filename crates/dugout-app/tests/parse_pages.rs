// Page parser tests against saved league pages.

use std::collections::HashMap;

use dugout_app::error::FetchError;
use dugout_app::yahoo::parse;
use dugout_core::categories::{Aggregation, Category, CategorySet, Direction, Side};
use dugout_core::model::{TeamNumber, WinLossTie};
use dugout_stats::innings::InningsCheck;

const STANDINGS: &str = include_str!("fixtures/standings.html");
const RECORDS: &str = include_str!("fixtures/category_record.html");
const STATS: &str = include_str!("fixtures/category_stats.html");
const MATCHUP: &str = include_str!("fixtures/matchup.html");
const TEAM: &str = include_str!("fixtures/team.html");

const URL: &str = "https://baseball.fantasysports.yahoo.com/b1/30332/";

// ===========================================================================
// Helpers
// ===========================================================================

fn categories() -> CategorySet {
    let cat = |name: &str, side, direction, aggregation| Category {
        name: name.into(),
        side,
        direction,
        aggregation,
    };
    CategorySet::new(vec![
        cat("HR", Side::Batting, Direction::HigherIsBetter, Aggregation::Sum),
        cat("SB", Side::Batting, Direction::HigherIsBetter, Aggregation::Sum),
        cat("ERA", Side::Pitching, Direction::LowerIsBetter, Aggregation::Mean),
        cat("K", Side::Pitching, Direction::HigherIsBetter, Aggregation::Sum),
    ])
}

fn aliases() -> HashMap<String, String> {
    HashMap::from([("SO".to_string(), "K".to_string())])
}

// ===========================================================================
// Standings and team links
// ===========================================================================

#[test]
fn standings_rows_keep_rank_record_and_clinch_marker() {
    let records = parse::parse_standings(STANDINGS, URL).unwrap();
    assert_eq!(records.len(), 4);

    let top = &records[0];
    assert_eq!(top.rank, 1);
    assert_eq!(top.team, "Moonshots");
    assert_eq!(top.team_number, TeamNumber(3));
    assert_eq!(top.record, WinLossTie::new(30, 14, 4));
    assert!(top.clinched);

    assert_eq!(records[1].team, "Aces & Eights");
    assert!(!records[1].clinched);
    assert_eq!(records[2].team_number, TeamNumber(12));
    // Trailing slash on the link.
    assert_eq!(records[3].team_number, TeamNumber(2));
}

#[test]
fn team_links_are_sorted_by_number() {
    let teams = parse::parse_team_links(STANDINGS, URL).unwrap();
    let numbers: Vec<u32> = teams.iter().map(|t| t.team_number.0).collect();
    assert_eq!(numbers, vec![1, 2, 3, 12]);
    assert_eq!(teams[0].team, "Aces & Eights");
}

// ===========================================================================
// Category pages
// ===========================================================================

#[test]
fn category_records_one_row_per_team_and_category() {
    let teams = parse::parse_team_links(STANDINGS, URL).unwrap();
    let rows = parse::parse_category_records(RECORDS, URL, &teams, &categories(), &aliases())
        .unwrap();
    assert_eq!(rows.len(), 16);

    let dingers_sb = rows
        .iter()
        .find(|r| r.team_number == TeamNumber(12) && r.category == "SB")
        .unwrap();
    assert_eq!(dingers_sb.record, WinLossTie::new(3, 9, 0));
}

#[test]
fn category_stats_use_last_header_row_and_clean_cells() {
    let teams = parse::parse_team_links(STANDINGS, URL).unwrap();
    let rows =
        parse::parse_category_stats(STATS, URL, &teams, &categories(), &aliases()).unwrap();
    assert_eq!(rows.len(), 4);

    let blues = rows.iter().find(|r| r.team == "Bullpen Blues").unwrap();
    assert_eq!(blues.team_number, TeamNumber(2));
    assert_eq!(blues.stats["HR"], 33.0);
    assert_eq!(blues.stats["ERA"], 3.12);
    // `-` before any games count.
    assert_eq!(blues.stats["K"], 0.0);
}

#[test]
fn unknown_team_is_a_parse_error() {
    let teams = parse::parse_team_links(STANDINGS, URL).unwrap();
    let html = STATS.replace("Dingers", "Renamed Team");
    let err = parse::parse_category_stats(&html, URL, &teams, &categories(), &aliases())
        .unwrap_err();
    assert!(matches!(err, FetchError::Parse { .. }));
    assert!(err.to_string().contains("Renamed Team"));
}

// ===========================================================================
// Matchup and team pages
// ===========================================================================

#[test]
fn matchup_reads_second_table_with_aliased_headers() {
    let lines = parse::parse_matchup(MATCHUP, URL, &categories(), &aliases()).unwrap();
    assert_eq!(lines.len(), 2);

    let (mine, theirs) = (&lines[0], &lines[1]);
    assert_eq!(mine.team, "Aces & Eights");
    assert_eq!(mine.score, 3.0);
    assert_eq!(mine.stats["K"], 61.0);
    assert_eq!(mine.stats.len(), 4);
    assert_eq!(theirs.team, "Moonshots");
    assert_eq!(theirs.score, 0.0);
    assert_eq!(theirs.stats["ERA"], 4.10);
}

#[test]
fn matchup_without_stats_table_is_missing_table() {
    let err = parse::parse_matchup(RECORDS, URL, &categories(), &aliases()).unwrap_err();
    assert!(matches!(err, FetchError::MissingTable { index: 1, found: 1, .. }));
}

#[test]
fn innings_progress_from_team_page() {
    let text = parse::parse_innings(TEAM).unwrap().unwrap();
    assert_eq!(text, "28.1 of 40");

    let check = InningsCheck::from_text("Dingers", TeamNumber(12), &text);
    assert!(!check.minimum_met);
    assert_eq!(check.current_ip, Some(28.1));
    assert_eq!(check.required_ip, Some(40.0));
    // 120 outs required, 85 recorded.
    assert_eq!(check.outs_needed, 35);
}
