// Small HTML builder shared by the report pages.

use std::fmt::Write as _;

/// Escape text for element content and double-quoted attributes.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

pub fn fmt_num(value: f64, decimals: usize) -> String {
    format!("{value:.decimals$}")
}

const STYLE: &str = "
body { font-family: system-ui, sans-serif; margin: 1.5rem; background: #0f172a; color: #e2e8f0; }
nav a { color: #93c5fd; margin-right: 1rem; }
table { border-collapse: collapse; margin: 1rem 0; }
th, td { padding: .3rem .6rem; border-bottom: 1px solid #334155; text-align: right; }
th { cursor: pointer; background: #1e293b; }
td:first-child, th:first-child { text-align: left; }
.good { color: #4ade80; } .bad { color: #f87171; }
";

// Click a header to sort; click again to reverse. Numeric when both cells parse.
const SORT_JS: &str = r#"
document.querySelectorAll('table.sortable th').forEach(function (th, idx) {
  th.addEventListener('click', function () {
    var table = th.closest('table');
    var body = table.tBodies[0];
    var asc = th.dataset.dir !== 'asc';
    th.dataset.dir = asc ? 'asc' : 'desc';
    var rows = Array.prototype.slice.call(body.rows);
    rows.sort(function (a, b) {
      var x = a.cells[idx].innerText, y = b.cells[idx].innerText;
      var nx = parseFloat(x), ny = parseFloat(y);
      var cmp = (!isNaN(nx) && !isNaN(ny)) ? nx - ny : x.localeCompare(y);
      return asc ? cmp : -cmp;
    });
    rows.forEach(function (r) { body.appendChild(r); });
  });
});
"#;

const CHART_JS: &str = "https://cdn.jsdelivr.net/npm/chart.js@4.4.1/dist/chart.umd.min.js";

pub const NAV: [(&str, &str); 10] = [
    ("index.html", "Home"),
    ("power.html", "Power"),
    ("standings.html", "Standings"),
    ("luck.html", "Luck"),
    ("elo.html", "ELO"),
    ("trends.html", "Trends"),
    ("sos.html", "Schedule"),
    ("h2h.html", "Rivalries"),
    ("managers.html", "Managers"),
    ("bests.html", "Bests"),
];

/// One report page under construction.
pub struct Page {
    title: String,
    body: String,
    uses_chart: bool,
}

impl Page {
    pub fn new(title: &str) -> Self {
        Self {
            title: title.to_string(),
            body: String::new(),
            uses_chart: false,
        }
    }

    pub fn heading(&mut self, text: &str) -> &mut Self {
        let _ = write!(self.body, "<h2>{}</h2>\n", escape(text));
        self
    }

    pub fn paragraph(&mut self, text: &str) -> &mut Self {
        let _ = write!(self.body, "<p>{}</p>\n", escape(text));
        self
    }

    /// A sortable table. Cell text is escaped; classes from [`signed`] are kept.
    pub fn table(&mut self, headers: &[&str], rows: &[Vec<Cell>]) -> &mut Self {
        if rows.is_empty() {
            return self.paragraph("No data yet.");
        }
        self.body.push_str("<table class=\"sortable\">\n<thead><tr>");
        for h in headers {
            let _ = write!(self.body, "<th>{}</th>", escape(h));
        }
        self.body.push_str("</tr></thead>\n<tbody>\n");
        for row in rows {
            self.body.push_str("<tr>");
            for cell in row {
                match cell.class {
                    Some(class) => {
                        let _ = write!(self.body, "<td class=\"{class}\">{}</td>", escape(&cell.text));
                    }
                    None => {
                        let _ = write!(self.body, "<td>{}</td>", escape(&cell.text));
                    }
                }
            }
            self.body.push_str("</tr>\n");
        }
        self.body.push_str("</tbody></table>\n");
        self
    }

    /// A Chart.js line chart; `labels` on the x axis, one dataset per series.
    pub fn line_chart(&mut self, id: &str, labels: &[String], series: &[(String, Vec<Option<f64>>)]) -> &mut Self {
        self.uses_chart = true;
        let datasets: Vec<serde_json::Value> = series
            .iter()
            .map(|(name, data)| serde_json::json!({ "label": name, "data": data, "spanGaps": true }))
            .collect();
        let config = serde_json::json!({
            "type": "line",
            "data": { "labels": labels, "datasets": datasets },
            "options": { "responsive": true }
        });
        // `</` inside a script block would end it early.
        let config = config.to_string().replace("</", "<\\/");
        let _ = write!(
            self.body,
            "<canvas id=\"{id}\" height=\"120\"></canvas>\n<script>new Chart(document.getElementById('{id}'), {config});</script>\n",
            id = escape(id),
        );
        self
    }

    pub fn render(&self, league_name: &str) -> String {
        let mut out = String::new();
        let _ = write!(
            out,
            "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n<title>{} | {}</title>\n<style>{STYLE}</style>\n",
            escape(&self.title),
            escape(league_name),
        );
        if self.uses_chart {
            let _ = write!(out, "<script src=\"{CHART_JS}\"></script>\n");
        }
        out.push_str("</head>\n<body>\n<nav>");
        for (href, label) in NAV {
            let _ = write!(out, "<a href=\"{href}\">{label}</a>");
        }
        let _ = write!(out, "</nav>\n<h1>{}</h1>\n", escape(&self.title));
        out.push_str(&self.body);
        let _ = write!(out, "<script>{SORT_JS}</script>\n</body>\n</html>\n");
        out
    }
}

/// A table cell with an optional CSS class.
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub text: String,
    pub class: Option<&'static str>,
}

impl From<String> for Cell {
    fn from(text: String) -> Self {
        Cell { text, class: None }
    }
}

impl From<&str> for Cell {
    fn from(text: &str) -> Self {
        Cell {
            text: text.to_string(),
            class: None,
        }
    }
}

/// A number coloured by sign: green above zero, red below.
pub fn signed(value: f64, decimals: usize) -> Cell {
    let class = if value > 0.0 {
        Some("good")
    } else if value < 0.0 {
        Some("bad")
    } else {
        None
    };
    Cell {
        text: fmt_num(value, decimals),
        class,
    }
}

pub fn num(value: f64, decimals: usize) -> Cell {
    fmt_num(value, decimals).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_markup() {
        assert_eq!(
            escape(r#"<b>"Tom & Jerry's"</b>"#),
            "&lt;b&gt;&quot;Tom &amp; Jerry&#39;s&quot;&lt;/b&gt;"
        );
    }

    #[test]
    fn table_escapes_cells_and_marks_signs() {
        let mut page = Page::new("T");
        page.table(&["Team", "Luck"], &[vec!["<Bad>".into(), signed(-1.5, 1)]]);
        let html = page.render("League");
        assert!(html.contains("<td>&lt;Bad&gt;</td>"));
        assert!(html.contains("<td class=\"bad\">-1.5</td>"));
        assert!(!html.contains("chart.umd"));
    }

    #[test]
    fn empty_table_says_so() {
        let mut page = Page::new("T");
        page.table(&["A"], &[]);
        assert!(page.render("L").contains("No data yet."));
    }

    #[test]
    fn chart_pages_load_chart_js() {
        let mut page = Page::new("ELO");
        page.line_chart(
            "elo",
            &["1".into(), "2".into()],
            &[("</script>".into(), vec![Some(1000.0), None])],
        );
        let html = page.render("L");
        assert!(html.contains("chart.umd.min.js"));
        assert!(html.contains("null"));
        assert!(!html.contains("\"</script>\""));
    }
}
