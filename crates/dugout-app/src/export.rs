// CSV export of every stored table.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde_json::{Map, Value};
use tracing::{debug, info};

use dugout_core::db::{Database, HistoryTable, LiveTable, SeriesTable};

/// Flatten nested objects into `parent_child` keys. Arrays are kept as
/// JSON text.
pub fn flatten(value: &Value) -> Map<String, Value> {
    fn walk(prefix: &str, value: &Value, out: &mut Map<String, Value>) {
        match value {
            Value::Object(map) => {
                for (k, v) in map {
                    let key = if prefix.is_empty() {
                        k.clone()
                    } else {
                        format!("{prefix}_{k}")
                    };
                    walk(&key, v, out);
                }
            }
            other => {
                out.insert(prefix.to_string(), other.clone());
            }
        }
    }
    let mut out = Map::new();
    match value {
        Value::Object(_) => walk("", value, &mut out),
        other => {
            out.insert("value".to_string(), other.clone());
        }
    }
    out
}

fn cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Write rows as CSV with the union of their flattened keys as the header,
/// in first-seen order.
pub fn write_csv(path: &Path, rows: &[Value]) -> Result<()> {
    let flat: Vec<Map<String, Value>> = rows.iter().map(flatten).collect();
    let mut headers: Vec<String> = Vec::new();
    for row in &flat {
        for key in row.keys() {
            if !headers.contains(key) {
                headers.push(key.clone());
            }
        }
    }

    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    writer.write_record(&headers)?;
    for row in &flat {
        writer.write_record(headers.iter().map(|h| cell(row.get(h))))?;
    }
    writer.flush()?;
    Ok(())
}

fn with_season(season: i32, rows: Vec<Value>) -> Vec<Value> {
    rows.into_iter()
        .map(|row| match row {
            Value::Object(mut map) => {
                map.insert("season".to_string(), Value::from(season));
                Value::Object(map)
            }
            other => other,
        })
        .collect()
}

/// Export every non-empty table to `<dir>/<name>.csv`.
pub fn export_all(db: &Database, dir: &str) -> Result<Vec<PathBuf>> {
    let dir = PathBuf::from(dir);
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create export dir {}", dir.display()))?;

    let mut tables: Vec<(String, Vec<Value>)> = Vec::new();
    for table in LiveTable::ALL {
        tables.push((table.as_str().to_string(), db.read_live(table)?));
    }
    for table in SeriesTable::ALL {
        tables.push((table.as_str().to_string(), db.read_series(table)?));
    }
    let schedule: Vec<Value> = db
        .read_schedule(None)?
        .iter()
        .map(serde_json::to_value)
        .collect::<Result<_, _>>()?;
    tables.push(("schedule".to_string(), schedule));
    for table in HistoryTable::ALL {
        let mut rows = Vec::new();
        for season in db.history_seasons(table)? {
            rows.extend(with_season(season, db.read_history(table, Some(season))?));
        }
        tables.push((format!("all_time_history_{}", table.as_str()), rows));
    }

    let mut written = Vec::new();
    for (name, rows) in tables {
        if rows.is_empty() {
            debug!("export: {name} is empty, skipping");
            continue;
        }
        let path = dir.join(format!("{name}.csv"));
        write_csv(&path, &rows)?;
        written.push(path);
    }
    info!("exported {} tables to {}", written.len(), dir.display());
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn scratch(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("dugout_export_{name}"));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn flatten_joins_nested_keys() {
        let row = json!({"team": "A", "record": {"wins": 3, "losses": 1}, "tags": [1, 2]});
        let flat = flatten(&row);
        assert_eq!(flat["team"], json!("A"));
        assert_eq!(flat["record_wins"], json!(3));
        assert_eq!(flat["tags"], json!([1, 2]));
    }

    #[test]
    fn write_csv_unions_headers() {
        let dir = scratch("union");
        let path = dir.join("t.csv");
        let rows = vec![json!({"a": 1, "b": "x"}), json!({"a": 2, "c": null})];
        write_csv(&path, &rows).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "a,b,c");
        assert_eq!(lines[1], "1,x,");
        assert_eq!(lines[2], "2,,");
    }

    #[test]
    fn export_all_skips_empty_tables() {
        let db = Database::open(":memory:").unwrap();
        db.write_live(LiveTable::TeamDict, &[json!({"team": "A", "team_number": 1})])
            .unwrap();
        db.write_history(2024, HistoryTable::Ratings, &[json!({"manager": "Ann"})])
            .unwrap();

        let dir = scratch("all");
        let written = export_all(&db, dir.to_str().unwrap()).unwrap();

        let names: Vec<String> = written
            .iter()
            .filter_map(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
            .collect();
        assert_eq!(names, vec!["team_dict.csv", "all_time_history_all_time_ratings.csv"]);
        let ratings = std::fs::read_to_string(&written[1]).unwrap();
        assert!(ratings.starts_with("manager,season"));
    }
}
