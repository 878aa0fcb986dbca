//! Text summary builder for CLI output.
//!
//! Formats a dashboard view as a summary line followed by a fixed-width table.

use crate::render::{DashboardView, RunRow, COLUMNS, NOT_AVAILABLE};

/// Pre-formatted lines for text output.
pub(crate) struct TextSummary {
    pub lines: Vec<String>,
}

/// Text cells for a row. The report column shows where the link leads since a plain
/// terminal cannot follow "View Report".
fn text_cells(row: &RunRow) -> [String; 7] {
    let mut cells = row.cells();
    cells[6] = row
        .report
        .target()
        .unwrap_or(NOT_AVAILABLE)
        .to_string();
    cells
}

fn pad_row<'a>(cells: impl IntoIterator<Item = &'a str>, widths: &[usize; 7]) -> String {
    let padded: Vec<String> = cells
        .into_iter()
        .zip(widths)
        .map(|(cell, &w)| format!("{cell:<w$}"))
        .collect();
    padded.join("  ").trim_end().to_string()
}

pub(crate) fn build_text_summary(view: &DashboardView) -> TextSummary {
    let s = &view.summary;
    let mut lines = vec![
        format!(
            "Total: {}  Completed: {}  Failed: {}  Running: {}",
            s.total, s.completed, s.failed, s.running
        ),
        String::new(),
    ];

    let rows: Vec<[String; 7]> = view.rows().iter().map(text_cells).collect();
    let mut widths = COLUMNS.map(|c| c.chars().count());
    for cells in &rows {
        for (w, cell) in widths.iter_mut().zip(cells) {
            *w = (*w).max(cell.chars().count());
        }
    }

    lines.push(pad_row(COLUMNS, &widths));
    let rule = widths.map(|w| "-".repeat(w));
    lines.push(pad_row(rule.iter().map(String::as_str), &widths));

    match view.listing.message() {
        Some(message) => lines.push(message.to_string()),
        None => lines.extend(
            rows.iter()
                .map(|cells| pad_row(cells.iter().map(String::as_str), &widths)),
        ),
    }

    TextSummary { lines }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchError;
    use crate::model::fixtures::{collection, run};
    use crate::model::RunCollection;
    use crate::render::{build_view, TimeFormat, ViewOptions, NO_RUNS};
    use reqwest::{StatusCode, Url};
    use time::UtcOffset;

    fn opts() -> ViewOptions {
        ViewOptions {
            time: TimeFormat::new(UtcOffset::UTC),
            base_url: Url::parse("http://ci.local/api/runs").ok(),
        }
    }

    #[test]
    fn table_lists_rows_newest_first() {
        let mut older = run("1", "COMPLETED", "2024-01-01T00:00:00Z");
        older.report_url = Some("reports/1.html".into());
        let newer = run("2", "FAILED", "2024-01-02T00:00:00Z");
        let view = build_view(&Ok(collection(vec![older, newer])), &opts());

        let lines = build_text_summary(&view).lines;
        assert_eq!(lines[0], "Total: 2  Completed: 1  Failed: 1  Running: 0");
        assert!(lines[2].starts_with("ID  Environment  Status"));
        let newest: Vec<_> = lines[4].split_whitespace().collect();
        assert_eq!(
            newest,
            ["2", "staging", "FAILED", "0", "2024-01-02", "00:00:00", "N/A", "N/A"]
        );
        let oldest: Vec<_> = lines[5].split_whitespace().collect();
        assert_eq!(oldest[0], "1");
        assert_eq!(oldest.last(), Some(&"http://ci.local/api/reports/1.html"));
        assert_eq!(lines.len(), 6);
    }

    #[test]
    fn message_states_replace_rows() {
        let empty = build_view(&Ok(RunCollection::default()), &opts());
        let lines = build_text_summary(&empty).lines;
        assert_eq!(lines.last().map(String::as_str), Some(NO_RUNS));

        let failed = build_view(
            &Err(FetchError::Status {
                status: StatusCode::BAD_GATEWAY,
            }),
            &opts(),
        );
        let lines = build_text_summary(&failed).lines;
        assert_eq!(lines[0], "Total: 0  Completed: 0  Failed: 0  Running: 0");
        assert_eq!(
            lines.last().map(String::as_str),
            Some("Error loading data: Network response was not ok: 502 Bad Gateway")
        );
    }
}
