// Minimum innings pitched check from the team page's progress text.

use serde::{Deserialize, Serialize};

use dugout_core::model::TeamNumber;

/// Parsed progress toward the weekly innings minimum.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InningsProgress {
    /// Innings in baseball notation: `32.2` is 32 and two thirds.
    pub current: Option<f64>,
    pub required: Option<f64>,
    pub minimum_met: bool,
}

/// Convert baseball innings notation to outs recorded.
pub fn innings_to_outs(innings: f64) -> u32 {
    let whole = innings.trunc();
    let thirds = ((innings - whole) * 10.0).round();
    (whole as u32) * 3 + thirds as u32
}

/// Parse `"32.2 of 40.0"`.
///
/// Yahoo drops the text, or says the minimum is met, once a team is past the
/// threshold. Anything else unparseable is reported as not met with no
/// innings.
pub fn parse_progress(text: &str) -> InningsProgress {
    let text = text.trim();
    if text.is_empty() || text.to_ascii_lowercase().contains("minimum met") {
        return InningsProgress {
            current: None,
            required: None,
            minimum_met: true,
        };
    }

    let parsed = text.split_once(" of ").and_then(|(cur, req)| {
        let cur: f64 = cur.trim().parse().ok()?;
        let req: f64 = req.split_whitespace().next()?.parse().ok()?;
        Some((cur, req))
    });

    match parsed {
        Some((current, required)) => InningsProgress {
            current: Some(current),
            required: Some(required),
            minimum_met: innings_to_outs(current) >= innings_to_outs(required),
        },
        None => InningsProgress {
            current: None,
            required: None,
            minimum_met: false,
        },
    }
}

/// One row of the stored innings check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InningsCheck {
    pub team: String,
    pub team_number: TeamNumber,
    pub current_ip: Option<f64>,
    pub required_ip: Option<f64>,
    pub minimum_met: bool,
    /// Outs still needed; 0 once met or when unknown.
    pub outs_needed: u32,
    pub raw_text: Option<String>,
    pub error: Option<String>,
}

impl InningsCheck {
    pub fn from_text(team: &str, team_number: TeamNumber, text: &str) -> Self {
        let progress = parse_progress(text);
        let outs_needed = match (progress.current, progress.required) {
            (Some(cur), Some(req)) => innings_to_outs(req).saturating_sub(innings_to_outs(cur)),
            _ => 0,
        };
        Self {
            team: team.to_string(),
            team_number,
            current_ip: progress.current,
            required_ip: progress.required,
            minimum_met: progress.minimum_met,
            outs_needed,
            raw_text: Some(text.trim().to_string()),
            error: None,
        }
    }

    /// Row for a team whose page could not be read.
    pub fn failed(team: &str, team_number: TeamNumber, error: impl Into<String>) -> Self {
        Self {
            team: team.to_string(),
            team_number,
            current_ip: None,
            required_ip: None,
            minimum_met: false,
            outs_needed: 0,
            raw_text: None,
            error: Some(error.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outs_from_baseball_notation() {
        assert_eq!(innings_to_outs(0.0), 0);
        assert_eq!(innings_to_outs(32.2), 98);
        assert_eq!(innings_to_outs(40.0), 120);
        assert_eq!(innings_to_outs(39.1), 118);
    }

    #[test]
    fn parses_progress_text() {
        let p = parse_progress("32.2 of 40.0");
        assert_eq!(p.current, Some(32.2));
        assert_eq!(p.required, Some(40.0));
        assert!(!p.minimum_met);

        assert!(parse_progress("41.1 of 40.0").minimum_met);
        assert!(parse_progress(" 40.0 of 40.0 IP ").minimum_met);
    }

    #[test]
    fn empty_or_met_text_counts_as_met() {
        assert!(parse_progress("").minimum_met);
        assert!(parse_progress("Minimum Met").minimum_met);
        assert!(!parse_progress("n/a").minimum_met);
    }

    #[test]
    fn check_reports_outs_needed() {
        let row = InningsCheck::from_text("Team 3", TeamNumber(3), "32.2 of 40.0");
        assert_eq!(row.outs_needed, 22);
        assert_eq!(row.raw_text.as_deref(), Some("32.2 of 40.0"));

        let failed = InningsCheck::failed("Team 4", TeamNumber(4), "HTTP 503");
        assert!(!failed.minimum_met);
        assert_eq!(failed.error.as_deref(), Some("HTTP 503"));
    }
}
