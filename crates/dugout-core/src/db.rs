// SQLite persistence for league tables.

use std::sync::{Mutex, MutexGuard};

use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::model::ScheduleEntry;

/// Data types stored as a single current snapshot. Writing one replaces
/// every row of that type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LiveTable {
    TeamDict,
    SeasonRecords,
    LiveStandings,
    CategoryRecords,
    CategoryStats,
    PowerRanks,
    NormalizedRanks,
    RecordRanks,
    PowerRanksLite,
    PlayoffStatus,
    RemainingSos,
    WeeklyPrediction,
    CoefficientLastFour,
    CoefficientLastTwo,
    WeeklyLuckAnalysis,
    LuckTeamTotals,
    LuckCoefficients,
    MinimumInnings,
    HeadToHead,
    SeasonsBestLong,
    SeasonsBestRegular,
}

impl LiveTable {
    pub const ALL: [LiveTable; 21] = [
        LiveTable::TeamDict,
        LiveTable::SeasonRecords,
        LiveTable::LiveStandings,
        LiveTable::CategoryRecords,
        LiveTable::CategoryStats,
        LiveTable::PowerRanks,
        LiveTable::NormalizedRanks,
        LiveTable::RecordRanks,
        LiveTable::PowerRanksLite,
        LiveTable::PlayoffStatus,
        LiveTable::RemainingSos,
        LiveTable::WeeklyPrediction,
        LiveTable::CoefficientLastFour,
        LiveTable::CoefficientLastTwo,
        LiveTable::WeeklyLuckAnalysis,
        LiveTable::LuckTeamTotals,
        LiveTable::LuckCoefficients,
        LiveTable::MinimumInnings,
        LiveTable::HeadToHead,
        LiveTable::SeasonsBestLong,
        LiveTable::SeasonsBestRegular,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            LiveTable::TeamDict => "team_dict",
            LiveTable::SeasonRecords => "season_records",
            LiveTable::LiveStandings => "live_standings",
            LiveTable::CategoryRecords => "category_records",
            LiveTable::CategoryStats => "category_stats",
            LiveTable::PowerRanks => "power_ranks",
            LiveTable::NormalizedRanks => "normalized_ranks",
            LiveTable::RecordRanks => "record_ranks",
            LiveTable::PowerRanksLite => "power_ranks_lite",
            LiveTable::PlayoffStatus => "playoff_status",
            LiveTable::RemainingSos => "remaining_sos",
            LiveTable::WeeklyPrediction => "weekly_prediction",
            LiveTable::CoefficientLastFour => "coefficient_last_four",
            LiveTable::CoefficientLastTwo => "coefficient_last_two",
            LiveTable::WeeklyLuckAnalysis => "weekly_luck_analysis",
            LiveTable::LuckTeamTotals => "luck_team_totals",
            LiveTable::LuckCoefficients => "luck_coefficients",
            LiveTable::MinimumInnings => "minimum_innings_check",
            LiveTable::HeadToHead => "head_to_head",
            LiveTable::SeasonsBestLong => "seasons_best_long",
            LiveTable::SeasonsBestRegular => "seasons_best_regular",
        }
    }
}

/// Data types stored per week. Writing a week replaces only that week.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SeriesTable {
    WeekStats,
    WeeklyResults,
    Coefficient,
    AllPlay,
    RunningElo,
    RunningNormalizedRanks,
    PowerRanksSeasonTrend,
    StandingsSeasonTrend,
}

impl SeriesTable {
    pub const ALL: [SeriesTable; 8] = [
        SeriesTable::WeekStats,
        SeriesTable::WeeklyResults,
        SeriesTable::Coefficient,
        SeriesTable::AllPlay,
        SeriesTable::RunningElo,
        SeriesTable::RunningNormalizedRanks,
        SeriesTable::PowerRanksSeasonTrend,
        SeriesTable::StandingsSeasonTrend,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SeriesTable::WeekStats => "week_stats",
            SeriesTable::WeeklyResults => "weekly_results",
            SeriesTable::Coefficient => "coefficient",
            SeriesTable::AllPlay => "all_play",
            SeriesTable::RunningElo => "running_elo",
            SeriesTable::RunningNormalizedRanks => "running_normalized_ranks",
            SeriesTable::PowerRanksSeasonTrend => "power_ranks_season_trend",
            SeriesTable::StandingsSeasonTrend => "standings_season_trend",
        }
    }
}

/// Data types archived per past season.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HistoryTable {
    Ratings,
    WeeklyResults,
}

impl HistoryTable {
    pub const ALL: [HistoryTable; 2] = [HistoryTable::Ratings, HistoryTable::WeeklyResults];

    pub fn as_str(self) -> &'static str {
        match self {
            HistoryTable::Ratings => "all_time_ratings",
            HistoryTable::WeeklyResults => "weekly_results",
        }
    }
}

/// SQLite-backed store for live snapshots, weekly series, the schedule and
/// past-season history. Rows are kept as JSON payloads.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open (or create) a SQLite database at `path` and ensure all tables
    /// exist. Pass `":memory:"` for an ephemeral in-memory database (useful
    /// for tests).
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open database at {path}"))?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = 5000;",
        )
        .context("failed to set database pragmas")?;

        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS live_data (
                data_type TEXT NOT NULL,
                row_index INTEGER NOT NULL,
                payload   TEXT NOT NULL,
                updated   TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
                PRIMARY KEY (data_type, row_index)
            );

            CREATE TABLE IF NOT EXISTS weekly_series (
                data_type TEXT NOT NULL,
                week      INTEGER NOT NULL,
                row_index INTEGER NOT NULL,
                payload   TEXT NOT NULL,
                PRIMARY KEY (data_type, week, row_index)
            );

            CREATE TABLE IF NOT EXISTS schedule (
                week            INTEGER NOT NULL,
                team_number     INTEGER NOT NULL,
                opponent_number INTEGER NOT NULL,
                payload         TEXT NOT NULL,
                PRIMARY KEY (week, team_number)
            );

            CREATE TABLE IF NOT EXISTS all_time_history (
                season    INTEGER NOT NULL,
                data_type TEXT NOT NULL,
                row_index INTEGER NOT NULL,
                payload   TEXT NOT NULL,
                PRIMARY KEY (season, data_type, row_index)
            );
            ",
        )
        .context("failed to create database schema")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().expect("database mutex poisoned")
    }

    // -----------------------------------------------------------------------
    // Live data
    // -----------------------------------------------------------------------

    /// Replace every row of `table` with `rows`.
    pub fn write_live<T: Serialize>(&self, table: LiveTable, rows: &[T]) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        tx.execute(
            "DELETE FROM live_data WHERE data_type = ?1",
            params![table.as_str()],
        )?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO live_data (data_type, row_index, payload) VALUES (?1, ?2, ?3)",
            )?;
            for (i, row) in rows.iter().enumerate() {
                let payload = serde_json::to_string(row)
                    .with_context(|| format!("failed to serialize {} row", table.as_str()))?;
                stmt.execute(params![table.as_str(), i as i64, payload])?;
            }
        }
        tx.commit()
            .with_context(|| format!("failed to write {}", table.as_str()))?;
        Ok(())
    }

    /// Rows of `table` in write order; empty when never written.
    pub fn read_live<T: DeserializeOwned>(&self, table: LiveTable) -> Result<Vec<T>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT payload FROM live_data WHERE data_type = ?1 ORDER BY row_index",
        )?;
        let payloads = stmt
            .query_map(params![table.as_str()], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        decode_all(&payloads, table.as_str())
    }

    // -----------------------------------------------------------------------
    // Weekly series
    // -----------------------------------------------------------------------

    /// Replace the rows of `week` in `table`, leaving other weeks untouched.
    pub fn write_week<T: Serialize>(&self, table: SeriesTable, week: u32, rows: &[T]) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        tx.execute(
            "DELETE FROM weekly_series WHERE data_type = ?1 AND week = ?2",
            params![table.as_str(), week],
        )?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO weekly_series (data_type, week, row_index, payload)
                 VALUES (?1, ?2, ?3, ?4)",
            )?;
            for (i, row) in rows.iter().enumerate() {
                let payload = serde_json::to_string(row)
                    .with_context(|| format!("failed to serialize {} row", table.as_str()))?;
                stmt.execute(params![table.as_str(), week, i as i64, payload])?;
            }
        }
        tx.commit()
            .with_context(|| format!("failed to write {} week {week}", table.as_str()))?;
        Ok(())
    }

    pub fn read_week<T: DeserializeOwned>(&self, table: SeriesTable, week: u32) -> Result<Vec<T>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT payload FROM weekly_series
             WHERE data_type = ?1 AND week = ?2 ORDER BY row_index",
        )?;
        let payloads = stmt
            .query_map(params![table.as_str(), week], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        decode_all(&payloads, table.as_str())
    }

    /// Every stored week of `table`, ordered by week.
    pub fn read_series<T: DeserializeOwned>(&self, table: SeriesTable) -> Result<Vec<T>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT payload FROM weekly_series
             WHERE data_type = ?1 ORDER BY week, row_index",
        )?;
        let payloads = stmt
            .query_map(params![table.as_str()], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        decode_all(&payloads, table.as_str())
    }

    /// Highest week stored for `table`, if any.
    pub fn max_week(&self, table: SeriesTable) -> Result<Option<u32>> {
        let week: Option<u32> = self
            .conn()
            .query_row(
                "SELECT MAX(week) FROM weekly_series WHERE data_type = ?1",
                params![table.as_str()],
                |row| row.get(0),
            )
            .optional()?
            .flatten();
        Ok(week)
    }

    pub fn stored_weeks(&self, table: SeriesTable) -> Result<Vec<u32>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT DISTINCT week FROM weekly_series WHERE data_type = ?1 ORDER BY week",
        )?;
        let weeks = stmt
            .query_map(params![table.as_str()], |row| row.get::<_, u32>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(weeks)
    }

    // -----------------------------------------------------------------------
    // Schedule
    // -----------------------------------------------------------------------

    /// Replace the schedule rows for `week`.
    pub fn write_schedule_week(&self, week: u32, entries: &[ScheduleEntry]) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM schedule WHERE week = ?1", params![week])?;
        {
            let mut stmt = tx.prepare(
                "INSERT OR REPLACE INTO schedule (week, team_number, opponent_number, payload)
                 VALUES (?1, ?2, ?3, ?4)",
            )?;
            for entry in entries {
                let payload = serde_json::to_string(entry)?;
                stmt.execute(params![
                    week,
                    entry.team_number.0,
                    entry.opponent_number.0,
                    payload
                ])?;
            }
        }
        tx.commit()
            .with_context(|| format!("failed to write schedule week {week}"))?;
        Ok(())
    }

    /// The stored schedule, optionally restricted to one week.
    pub fn read_schedule(&self, week: Option<u32>) -> Result<Vec<ScheduleEntry>> {
        let conn = self.conn();
        let payloads = match week {
            Some(w) => {
                let mut stmt = conn.prepare(
                    "SELECT payload FROM schedule WHERE week = ?1 ORDER BY team_number",
                )?;
                let rows = stmt
                    .query_map(params![w], |row| row.get::<_, String>(0))?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                rows
            }
            None => {
                let mut stmt =
                    conn.prepare("SELECT payload FROM schedule ORDER BY week, team_number")?;
                let rows = stmt
                    .query_map([], |row| row.get::<_, String>(0))?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                rows
            }
        };
        decode_all(&payloads, "schedule")
    }

    pub fn clear_schedule(&self) -> Result<()> {
        self.conn().execute("DELETE FROM schedule", [])?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // All-time history
    // -----------------------------------------------------------------------

    /// Replace the `table` rows archived for `season`.
    pub fn write_history<T: Serialize>(
        &self,
        season: i32,
        table: HistoryTable,
        rows: &[T],
    ) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        tx.execute(
            "DELETE FROM all_time_history WHERE season = ?1 AND data_type = ?2",
            params![season, table.as_str()],
        )?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO all_time_history (season, data_type, row_index, payload)
                 VALUES (?1, ?2, ?3, ?4)",
            )?;
            for (i, row) in rows.iter().enumerate() {
                let payload = serde_json::to_string(row)?;
                stmt.execute(params![season, table.as_str(), i as i64, payload])?;
            }
        }
        tx.commit()
            .with_context(|| format!("failed to write {} for {season}", table.as_str()))?;
        Ok(())
    }

    /// Archived rows, for one season or every season (oldest first).
    pub fn read_history<T: DeserializeOwned>(
        &self,
        table: HistoryTable,
        season: Option<i32>,
    ) -> Result<Vec<T>> {
        let conn = self.conn();
        let payloads = match season {
            Some(s) => {
                let mut stmt = conn.prepare(
                    "SELECT payload FROM all_time_history
                     WHERE data_type = ?1 AND season = ?2 ORDER BY row_index",
                )?;
                let rows = stmt
                    .query_map(params![table.as_str(), s], |row| row.get::<_, String>(0))?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                rows
            }
            None => {
                let mut stmt = conn.prepare(
                    "SELECT payload FROM all_time_history
                     WHERE data_type = ?1 ORDER BY season, row_index",
                )?;
                let rows = stmt
                    .query_map(params![table.as_str()], |row| row.get::<_, String>(0))?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                rows
            }
        };
        decode_all(&payloads, table.as_str())
    }

    /// Seasons with at least one archived row in `table`.
    pub fn history_seasons(&self, table: HistoryTable) -> Result<Vec<i32>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT DISTINCT season FROM all_time_history WHERE data_type = ?1 ORDER BY season",
        )?;
        let seasons = stmt
            .query_map(params![table.as_str()], |row| row.get::<_, i32>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(seasons)
    }
}

fn decode_all<T: DeserializeOwned>(payloads: &[String], what: &str) -> Result<Vec<T>> {
    payloads
        .iter()
        .map(|p| {
            serde_json::from_str(p).with_context(|| format!("corrupt {what} row in database"))
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{TeamEntry, TeamNumber};

    fn db() -> Database {
        Database::open(":memory:").expect("in-memory db")
    }

    fn entry(team: &str, n: u32) -> TeamEntry {
        TeamEntry {
            team: team.into(),
            team_number: TeamNumber(n),
        }
    }

    fn pairing(week: u32, team: u32, opp: u32) -> ScheduleEntry {
        ScheduleEntry {
            week,
            team: format!("Team {team}"),
            team_number: TeamNumber(team),
            opponent: format!("Team {opp}"),
            opponent_number: TeamNumber(opp),
        }
    }

    #[test]
    fn write_live_replaces_previous_snapshot() {
        let db = db();
        db.write_live(LiveTable::TeamDict, &[entry("A", 1), entry("B", 2)])
            .unwrap();
        db.write_live(LiveTable::TeamDict, &[entry("C", 3)]).unwrap();

        let rows: Vec<TeamEntry> = db.read_live(LiveTable::TeamDict).unwrap();
        assert_eq!(rows, vec![entry("C", 3)]);
    }

    #[test]
    fn live_tables_are_isolated() {
        let db = db();
        db.write_live(LiveTable::TeamDict, &[entry("A", 1)]).unwrap();
        let other: Vec<TeamEntry> = db.read_live(LiveTable::PowerRanks).unwrap();
        assert!(other.is_empty());
    }

    #[test]
    fn read_live_preserves_write_order() {
        let db = db();
        let rows: Vec<TeamEntry> = (1..=12).rev().map(|n| entry(&format!("T{n}"), n)).collect();
        db.write_live(LiveTable::TeamDict, &rows).unwrap();
        let back: Vec<TeamEntry> = db.read_live(LiveTable::TeamDict).unwrap();
        assert_eq!(back, rows);
    }

    #[test]
    fn write_week_only_replaces_that_week() {
        let db = db();
        db.write_week(SeriesTable::WeeklyResults, 1, &[entry("A", 1)])
            .unwrap();
        db.write_week(SeriesTable::WeeklyResults, 2, &[entry("B", 2)])
            .unwrap();
        db.write_week(SeriesTable::WeeklyResults, 1, &[entry("C", 3), entry("D", 4)])
            .unwrap();

        let week1: Vec<TeamEntry> = db.read_week(SeriesTable::WeeklyResults, 1).unwrap();
        assert_eq!(week1.len(), 2);
        let all: Vec<TeamEntry> = db.read_series(SeriesTable::WeeklyResults).unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[2], entry("B", 2));
    }

    #[test]
    fn max_week_and_stored_weeks() {
        let db = db();
        assert_eq!(db.max_week(SeriesTable::Coefficient).unwrap(), None);

        db.write_week(SeriesTable::Coefficient, 3, &[entry("A", 1)]).unwrap();
        db.write_week(SeriesTable::Coefficient, 1, &[entry("A", 1)]).unwrap();
        db.write_week(SeriesTable::AllPlay, 9, &[entry("A", 1)]).unwrap();

        assert_eq!(db.max_week(SeriesTable::Coefficient).unwrap(), Some(3));
        assert_eq!(db.stored_weeks(SeriesTable::Coefficient).unwrap(), vec![1, 3]);
    }

    #[test]
    fn schedule_round_trip_by_week() {
        let db = db();
        db.write_schedule_week(1, &[pairing(1, 1, 2), pairing(1, 2, 1)])
            .unwrap();
        db.write_schedule_week(2, &[pairing(2, 1, 3), pairing(2, 3, 1)])
            .unwrap();

        assert_eq!(db.read_schedule(None).unwrap().len(), 4);
        let week2 = db.read_schedule(Some(2)).unwrap();
        assert_eq!(week2[0].opponent_number, TeamNumber(3));

        db.write_schedule_week(2, &[pairing(2, 1, 4)]).unwrap();
        assert_eq!(db.read_schedule(Some(2)).unwrap().len(), 1);

        db.clear_schedule().unwrap();
        assert!(db.read_schedule(None).unwrap().is_empty());
    }

    #[test]
    fn history_is_keyed_by_season_and_type() {
        let db = db();
        db.write_history(2024, HistoryTable::Ratings, &[entry("A", 1)])
            .unwrap();
        db.write_history(2025, HistoryTable::Ratings, &[entry("B", 2)])
            .unwrap();
        db.write_history(2025, HistoryTable::WeeklyResults, &[entry("C", 3)])
            .unwrap();

        let all: Vec<TeamEntry> = db.read_history(HistoryTable::Ratings, None).unwrap();
        assert_eq!(all, vec![entry("A", 1), entry("B", 2)]);
        let one: Vec<TeamEntry> = db.read_history(HistoryTable::Ratings, Some(2025)).unwrap();
        assert_eq!(one, vec![entry("B", 2)]);
        assert_eq!(
            db.history_seasons(HistoryTable::WeeklyResults).unwrap(),
            vec![2025]
        );
    }

    #[test]
    fn table_names_are_unique() {
        let mut names: Vec<&str> = LiveTable::ALL.iter().map(|t| t.as_str()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), LiveTable::ALL.len());

        let mut series: Vec<&str> = SeriesTable::ALL.iter().map(|t| t.as_str()).collect();
        series.sort();
        series.dedup();
        assert_eq!(series.len(), SeriesTable::ALL.len());
    }
}
