// HTML table extraction for Yahoo league pages.
//
// Every page of interest is a plain `<table>`: a header row of `th` cells and
// body rows of `td` cells. Team cells link to `/b1/<league>/<team number>`.

use std::collections::HashMap;

use scraper::{ElementRef, Html, Selector};

use dugout_core::categories::{normalize_header, CategorySet};
use dugout_core::model::{
    CategoryRecord, MatchupLine, SeasonRecord, StatLine, TeamEntry, TeamNumber, TeamStats,
    WinLossTie,
};

use crate::error::FetchError;

// ---------------------------------------------------------------------------
// Generic tables
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub text: String,
    /// First non-empty link in the cell, as `(text, href)`.
    pub link: Option<(String, String)>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }
}

fn selector(css: &str) -> Result<Selector, FetchError> {
    Selector::parse(css).map_err(|e| FetchError::parse(css, format!("bad selector: {e}")))
}

fn squash(text: impl Iterator<Item = impl AsRef<str>>) -> String {
    let joined: String = text.map(|t| t.as_ref().to_string()).collect::<Vec<_>>().join(" ");
    joined.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn cell(el: ElementRef<'_>, links: &Selector) -> Cell {
    let link = el.select(links).find_map(|a| {
        let text = squash(a.text());
        let href = a.value().attr("href")?;
        (!text.is_empty()).then(|| (text, href.to_string()))
    });
    Cell {
        text: squash(el.text()),
        link,
    }
}

/// Every table in the document, in page order.
pub fn tables(html: &str) -> Result<Vec<Table>, FetchError> {
    let doc = Html::parse_document(html);
    let table_sel = selector("table")?;
    let row_sel = selector("tr")?;
    let th_sel = selector("th")?;
    let td_sel = selector("td")?;
    let a_sel = selector("a")?;

    let mut out = Vec::new();
    for table in doc.select(&table_sel) {
        let mut parsed = Table::default();
        for row in table.select(&row_sel) {
            let tds: Vec<Cell> = row.select(&td_sel).map(|c| cell(c, &a_sel)).collect();
            if tds.is_empty() {
                // Multi-row headers: the last row carries the column names.
                let ths: Vec<String> = row.select(&th_sel).map(|c| squash(c.text())).collect();
                if !ths.is_empty() {
                    parsed.headers = ths;
                }
            } else {
                parsed.rows.push(tds);
            }
        }
        out.push(parsed);
    }
    Ok(out)
}

/// The `index`th table of a page, or a `MissingTable` error naming `url`.
pub fn table_at(html: &str, index: usize, url: &str) -> Result<Table, FetchError> {
    let mut all = tables(html)?;
    let found = all.len();
    if index >= found {
        return Err(FetchError::MissingTable {
            url: url.to_string(),
            index,
            found,
        });
    }
    Ok(all.swap_remove(index))
}

// ---------------------------------------------------------------------------
// Cell values
// ---------------------------------------------------------------------------

/// Team number from a team link: the last two characters when both are
/// digits, otherwise the last one.
pub fn team_number_from_href(href: &str) -> Option<TeamNumber> {
    let href = href.trim_end_matches('/');
    let chars: Vec<char> = href.chars().collect();
    let tail: String = match chars.as_slice() {
        [.., a, b] if a.is_ascii_digit() && b.is_ascii_digit() => [*a, *b].iter().collect(),
        [.., b] if b.is_ascii_digit() => b.to_string(),
        _ => return None,
    };
    tail.parse().ok().map(TeamNumber)
}

/// A stat cell. Yahoo marks tied rate stats with `*` and shows `-` before
/// any games count.
pub fn parse_number(raw: &str) -> Option<f64> {
    let cleaned = raw.trim().trim_end_matches('*').trim();
    if cleaned.is_empty() || cleaned == "-" {
        return Some(0.0);
    }
    cleaned.parse().ok()
}

fn team_name(cell: &Cell) -> String {
    cell.link
        .as_ref()
        .map(|(text, _)| text.clone())
        .unwrap_or_else(|| cell.text.clone())
}

fn resolve(teams: &[TeamEntry], name: &str, url: &str) -> Result<TeamNumber, FetchError> {
    teams
        .iter()
        .find(|t| t.team == name)
        .map(|t| t.team_number)
        .ok_or_else(|| FetchError::parse(url, format!("unknown team `{name}`")))
}

/// Map each header index to a configured category name, skipping columns
/// that are not scored.
fn category_columns(
    table: &Table,
    categories: &CategorySet,
    aliases: &HashMap<String, String>,
) -> Vec<(usize, String)> {
    table
        .headers
        .iter()
        .enumerate()
        .filter_map(|(i, h)| {
            let name = normalize_header(h, aliases);
            categories.get(&name).map(|_| (i, name))
        })
        .collect()
}

fn stat_line(
    row: &[Cell],
    columns: &[(usize, String)],
    url: &str,
) -> Result<StatLine, FetchError> {
    let mut stats = StatLine::new();
    for (i, name) in columns {
        let raw = row.get(*i).map(|c| c.text.as_str()).unwrap_or("-");
        let value = parse_number(raw)
            .ok_or_else(|| FetchError::parse(url, format!("bad {name} value `{raw}`")))?;
        stats.insert(name.clone(), value);
    }
    Ok(stats)
}

// ---------------------------------------------------------------------------
// Pages
// ---------------------------------------------------------------------------

/// League home page, table 0: `Rank`, `Team`, `W-L-T`.
pub fn parse_standings(html: &str, url: &str) -> Result<Vec<SeasonRecord>, FetchError> {
    let table = table_at(html, 0, url)?;
    let (Some(rank_col), Some(team_col), Some(wlt_col)) = (
        table.column("Rank"),
        table.column("Team"),
        table.column("W-L-T"),
    ) else {
        return Err(FetchError::parse(url, "standings table lacks Rank/Team/W-L-T"));
    };

    table
        .rows
        .iter()
        .map(|row| {
            let get = |i: usize| {
                row.get(i)
                    .ok_or_else(|| FetchError::parse(url, "short standings row"))
            };
            let rank_text = get(rank_col)?.text.clone();
            let clinched = rank_text.ends_with('*');
            let rank = rank_text
                .trim_end_matches('*')
                .trim()
                .parse()
                .map_err(|_| FetchError::parse(url, format!("bad rank `{rank_text}`")))?;
            let team_cell = get(team_col)?;
            let team_number = team_cell
                .link
                .as_ref()
                .and_then(|(_, href)| team_number_from_href(href))
                .ok_or_else(|| FetchError::parse(url, "team cell has no team link"))?;
            let record: WinLossTie = get(wlt_col)?
                .text
                .parse()
                .map_err(|e| FetchError::parse(url, format!("{e}")))?;
            Ok(SeasonRecord {
                rank,
                team: team_name(team_cell),
                team_number,
                record,
                clinched,
            })
        })
        .collect()
}

/// Team name to number from every team link in the standings table.
pub fn parse_team_links(html: &str, url: &str) -> Result<Vec<TeamEntry>, FetchError> {
    let table = table_at(html, 0, url)?;
    let mut teams: Vec<TeamEntry> = Vec::new();
    for (text, href) in table.rows.iter().flatten().filter_map(|c| c.link.as_ref()) {
        let Some(team_number) = team_number_from_href(href) else {
            continue;
        };
        if !teams.iter().any(|t| t.team_number == team_number) {
            teams.push(TeamEntry {
                team: text.clone(),
                team_number,
            });
        }
    }
    teams.sort_by_key(|t| t.team_number);
    Ok(teams)
}

/// `headtoheadstats?type=record`, table 0: one `W-L-T` cell per category.
pub fn parse_category_records(
    html: &str,
    url: &str,
    teams: &[TeamEntry],
    categories: &CategorySet,
    aliases: &HashMap<String, String>,
) -> Result<Vec<CategoryRecord>, FetchError> {
    let table = table_at(html, 0, url)?;
    let columns = category_columns(&table, categories, aliases);
    let mut out = Vec::new();
    for row in &table.rows {
        let Some(first) = row.first() else { continue };
        let team = team_name(first);
        let team_number = resolve(teams, &team, url)?;
        for (i, category) in &columns {
            let raw = row.get(*i).map(|c| c.text.as_str()).unwrap_or("");
            let record: WinLossTie = raw
                .parse()
                .map_err(|e| FetchError::parse(url, format!("{category}: {e}")))?;
            out.push(CategoryRecord {
                team: team.clone(),
                team_number,
                category: category.clone(),
                record,
            });
        }
    }
    Ok(out)
}

/// `headtoheadstats?type=stats`, table 0: season totals per category.
pub fn parse_category_stats(
    html: &str,
    url: &str,
    teams: &[TeamEntry],
    categories: &CategorySet,
    aliases: &HashMap<String, String>,
) -> Result<Vec<TeamStats>, FetchError> {
    let table = table_at(html, 0, url)?;
    let columns = category_columns(&table, categories, aliases);
    table
        .rows
        .iter()
        .filter(|row| !row.is_empty())
        .map(|row| {
            let team = team_name(&row[0]);
            Ok(TeamStats {
                team_number: resolve(teams, &team, url)?,
                stats: stat_line(row, &columns, url)?,
                team,
            })
        })
        .collect()
}

/// Matchup page, table 1: the requested team's line, then its opponent's.
/// The last column is the category score.
pub fn parse_matchup(
    html: &str,
    url: &str,
    categories: &CategorySet,
    aliases: &HashMap<String, String>,
) -> Result<Vec<MatchupLine>, FetchError> {
    let table = table_at(html, 1, url)?;
    let columns = category_columns(&table, categories, aliases);
    table
        .rows
        .iter()
        .filter(|row| !row.is_empty())
        .map(|row| {
            let raw_score = row.last().map(|c| c.text.as_str()).unwrap_or("-");
            let score = parse_number(raw_score)
                .ok_or_else(|| FetchError::parse(url, format!("bad score `{raw_score}`")))?;
            Ok(MatchupLine {
                team: team_name(&row[0]),
                stats: stat_line(row, &columns, url)?,
                score,
            })
        })
        .collect()
}

/// Team page: the minimum innings progress, `<span class="F-negative">`.
pub fn parse_innings(html: &str) -> Result<Option<String>, FetchError> {
    let doc = Html::parse_document(html);
    let span = selector("span.F-negative")?;
    Ok(doc
        .select(&span)
        .next()
        .map(|el| squash(el.text())))
}
