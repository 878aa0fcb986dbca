//! Turns a cycle outcome into the dashboard view and hands it to a render target.
//!
//! The view is plain data: four summary slots plus a listing that is either a
//! loading/error/empty message or one row per run. Targets (terminal UI, text, JSON)
//! only decide how to draw it.

mod format;

pub use format::TimeFormat;

use crate::error::FetchError;
use crate::model::{MonitorConfig, RunCollection, SummaryCounts, TestRun};
use crate::summary::summarize;
use reqwest::Url;
use serde::Serialize;

/// Listing columns, in display order.
pub const COLUMNS: [&str; 7] = [
    "ID",
    "Environment",
    "Status",
    "Failed Count",
    "Start Time",
    "End Time",
    "Report",
];

pub const LOADING: &str = "Loading...";
pub const NO_RUNS: &str = "No test runs found.";
pub const NOT_AVAILABLE: &str = "N/A";
pub const REPORT_LINK_LABEL: &str = "View Report";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardView {
    pub summary: SummaryCounts,
    pub listing: Listing,
}

impl DashboardView {
    pub fn loading() -> Self {
        Self {
            summary: SummaryCounts::default(),
            listing: Listing::Loading,
        }
    }

    fn error(message: String) -> Self {
        Self {
            summary: SummaryCounts::default(),
            listing: Listing::Error { message },
        }
    }

    pub fn rows(&self) -> &[RunRow] {
        match &self.listing {
            Listing::Rows { rows } => rows,
            _ => &[],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Listing {
    Loading,
    Error { message: String },
    Empty,
    Rows { rows: Vec<RunRow> },
}

impl Listing {
    /// The single message shown across the listing region, if this is a message state.
    pub fn message(&self) -> Option<&str> {
        match self {
            Listing::Loading => Some(LOADING),
            Listing::Error { message } => Some(message.as_str()),
            Listing::Empty => Some(NO_RUNS),
            Listing::Rows { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusBadge {
    /// Raw status value as reported.
    pub label: String,
    /// Visual class, `status-<lowercased status>`.
    pub class: String,
    pub known: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReportCell {
    Link {
        href: String,
        resolved: Option<String>,
    },
    NotAvailable,
}

impl ReportCell {
    pub fn label(&self) -> &'static str {
        match self {
            ReportCell::Link { .. } => REPORT_LINK_LABEL,
            ReportCell::NotAvailable => NOT_AVAILABLE,
        }
    }

    /// Where following the link leads: the resolved URL when known, else the raw value.
    pub fn target(&self) -> Option<&str> {
        match self {
            ReportCell::Link { href, resolved } => Some(resolved.as_deref().unwrap_or(href)),
            ReportCell::NotAvailable => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunRow {
    pub id: String,
    pub environment: String,
    pub status: StatusBadge,
    pub failed_count: u32,
    pub start_time: String,
    pub end_time: String,
    pub report: ReportCell,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub screenshot_path: Option<String>,
}

impl RunRow {
    /// Cell text for each of [`COLUMNS`].
    pub fn cells(&self) -> [String; 7] {
        [
            self.id.clone(),
            self.environment.clone(),
            self.status.label.clone(),
            self.failed_count.to_string(),
            self.start_time.clone(),
            self.end_time.clone(),
            self.report.label().to_string(),
        ]
    }
}

/// Anything that can show a dashboard view. Each call replaces what was shown before.
pub trait RenderTarget {
    fn present(&mut self, view: DashboardView);
}

#[derive(Debug, Clone)]
pub struct ViewOptions {
    pub time: TimeFormat,
    /// Base for resolving relative report links.
    pub base_url: Option<Url>,
}

impl ViewOptions {
    pub fn new(cfg: &MonitorConfig, time: TimeFormat) -> Self {
        let base_url = match Url::parse(&cfg.endpoint_url) {
            Ok(url) => Some(url),
            Err(e) => {
                tracing::warn!(endpoint = %cfg.endpoint_url, error = %e, "endpoint is not a valid URL; report links stay relative");
                None
            }
        };
        Self { time, base_url }
    }
}

/// Build the view for one cycle outcome without touching the input.
pub fn build_view(outcome: &Result<RunCollection, FetchError>, opts: &ViewOptions) -> DashboardView {
    let runs = match outcome {
        Ok(runs) => runs,
        Err(err) => return DashboardView::error(format!("Error loading data: {err}")),
    };

    let summary = summarize(runs);
    if runs.is_empty() {
        return DashboardView {
            summary,
            listing: Listing::Empty,
        };
    }

    // Newest first; `sort_by` is stable so equal start times keep service order.
    let mut sorted: Vec<&TestRun> = runs.iter().collect();
    sorted.sort_by(|a, b| b.start_time.cmp(&a.start_time));

    DashboardView {
        summary,
        listing: Listing::Rows {
            rows: sorted.into_iter().map(|run| build_row(run, opts)).collect(),
        },
    }
}

/// Build the view for `outcome` and present it on `target`.
pub fn render<T>(outcome: &Result<RunCollection, FetchError>, opts: &ViewOptions, target: &mut T)
where
    T: RenderTarget + ?Sized,
{
    target.present(build_view(outcome, opts));
}

/// Present the error view for a cycle whose fetch task died without an outcome.
pub fn render_aborted<T>(reason: &str, target: &mut T)
where
    T: RenderTarget + ?Sized,
{
    target.present(DashboardView::error(format!(
        "Error loading data: refresh aborted: {reason}"
    )));
}

fn build_row(run: &TestRun, opts: &ViewOptions) -> RunRow {
    let report = match run.report_url.as_deref() {
        Some(href) if !href.trim().is_empty() => ReportCell::Link {
            href: href.to_string(),
            resolved: format::resolve_report_url(opts.base_url.as_ref(), href),
        },
        _ => ReportCell::NotAvailable,
    };

    RunRow {
        id: run.id.clone(),
        environment: run.environment.clone(),
        status: StatusBadge {
            label: run.status.as_str().to_string(),
            class: format!("status-{}", run.status.as_str().to_lowercase()),
            known: run.status.is_known(),
        },
        failed_count: run.failed_test_count.unwrap_or(0),
        start_time: opts.time.format(run.start_time),
        end_time: run
            .end_time
            .map(|t| opts.time.format(t))
            .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
        report,
        tags: run.tags.clone(),
        error_message: run.error_message.clone(),
        error_details: run.error_details.clone(),
        screenshot_path: run.screenshot_path.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fixtures::{collection, run};
    use crate::model::parse_timestamp;
    use reqwest::StatusCode;
    use time::UtcOffset;

    #[derive(Default)]
    struct Recorder {
        views: Vec<DashboardView>,
    }

    impl RenderTarget for Recorder {
        fn present(&mut self, view: DashboardView) {
            self.views.push(view);
        }
    }

    fn opts() -> ViewOptions {
        ViewOptions {
            time: TimeFormat::new(UtcOffset::UTC),
            base_url: Url::parse("http://localhost:8080/api/runs").ok(),
        }
    }

    fn ids(view: &DashboardView) -> Vec<&str> {
        view.rows().iter().map(|r| r.id.as_str()).collect()
    }

    fn unavailable() -> Result<RunCollection, FetchError> {
        Err(FetchError::Status {
            status: StatusCode::SERVICE_UNAVAILABLE,
        })
    }

    #[test]
    fn newest_run_first_with_summary() {
        let outcome = Ok(collection(vec![
            run("1", "COMPLETED", "2024-01-01T00:00:00Z"),
            run("2", "FAILED", "2024-01-02T00:00:00Z"),
        ]));
        let view = build_view(&outcome, &opts());
        assert_eq!(
            view.summary,
            SummaryCounts {
                total: 2,
                completed: 1,
                failed: 1,
                running: 0,
            }
        );
        assert_eq!(ids(&view), ["2", "1"]);
    }

    #[test]
    fn empty_collection_shows_no_runs_not_error() {
        let view = build_view(&Ok(RunCollection::default()), &opts());
        assert_eq!(view.summary, SummaryCounts::default());
        assert_eq!(view.listing, Listing::Empty);
        assert_eq!(view.listing.message(), Some(NO_RUNS));
    }

    #[test]
    fn failure_shows_error_and_zero_summary() {
        let view = build_view(&unavailable(), &opts());
        assert_eq!(view.summary, SummaryCounts::default());
        let message = view.listing.message().unwrap();
        assert!(message.starts_with("Error loading data: "), "{message}");
        assert!(message.contains("503 Service Unavailable"), "{message}");
        assert!(view.rows().is_empty());
    }

    #[test]
    fn later_success_replaces_error_state() {
        let mut target = Recorder::default();
        render(&unavailable(), &opts(), &mut target);
        render(
            &Ok(collection(vec![run("9", "RUNNING", "2024-01-01T00:00:00Z")])),
            &opts(),
            &mut target,
        );

        let last = target.views.last().unwrap();
        assert_eq!(last.summary.running, 1);
        assert_eq!(last.listing.message(), None);
        let json = serde_json::to_string(last).unwrap();
        assert!(!json.contains("Error loading data"));
    }

    #[test]
    fn aborted_cycle_replaces_rows_with_error() {
        let mut target = Recorder::default();
        render(
            &Ok(collection(vec![run("1", "FAILED", "2024-01-01T00:00:00Z")])),
            &opts(),
            &mut target,
        );
        render_aborted("task panicked", &mut target);

        let last = target.views.last().unwrap();
        assert_eq!(last.summary, SummaryCounts::default());
        assert_eq!(
            last.listing.message(),
            Some("Error loading data: refresh aborted: task panicked")
        );
    }

    #[test]
    fn unknown_status_is_rendered_raw() {
        let outcome = Ok(collection(vec![run("x", "BOGUS", "2024-01-01T00:00:00Z")]));
        let view = build_view(&outcome, &opts());
        assert_eq!(view.summary.total, 1);
        assert_eq!(view.summary.completed + view.summary.failed + view.summary.running, 0);
        let badge = &view.rows()[0].status;
        assert_eq!(badge.label, "BOGUS");
        assert_eq!(badge.class, "status-bogus");
        assert!(!badge.known);
    }

    #[test]
    fn equal_start_times_keep_service_order() {
        let outcome = Ok(collection(vec![
            run("a", "RUNNING", "2024-01-01T00:00:00Z"),
            run("b", "RUNNING", "2024-01-03T00:00:00Z"),
            run("c", "RUNNING", "2024-01-01T00:00:00Z"),
            run("d", "RUNNING", "2024-01-01T00:00:00Z"),
        ]));
        assert_eq!(ids(&build_view(&outcome, &opts())), ["b", "a", "c", "d"]);
    }

    #[test]
    fn absent_fields_render_placeholders() {
        let outcome = Ok(collection(vec![run("1", "RUNNING", "2024-01-01T08:15:00Z")]));
        let view = build_view(&outcome, &opts());
        let cells = view.rows()[0].cells();
        assert_eq!(
            cells,
            [
                "1".to_string(),
                "staging".to_string(),
                "RUNNING".to_string(),
                "0".to_string(),
                "2024-01-01 08:15:00".to_string(),
                NOT_AVAILABLE.to_string(),
                NOT_AVAILABLE.to_string(),
            ]
        );
        assert_eq!(view.rows()[0].report, ReportCell::NotAvailable);
        assert_eq!(view.rows()[0].status.class, "status-running");
    }

    #[test]
    fn present_fields_render_values_and_link() {
        let mut finished = run("1", "COMPLETED", "2024-01-01T08:15:00Z");
        finished.end_time = Some(parse_timestamp("2024-01-01T08:20:00Z").unwrap());
        finished.failed_test_count = Some(4);
        finished.report_url = Some("reports/1.html".into());
        let mut blank_report = run("2", "FAILED", "2024-01-01T07:00:00Z");
        blank_report.report_url = Some(String::new());
        let mut spaces_report = run("3", "FAILED", "2024-01-01T06:00:00Z");
        spaces_report.report_url = Some("  ".into());

        let view = build_view(
            &Ok(collection(vec![finished, blank_report, spaces_report])),
            &opts(),
        );
        let row = &view.rows()[0];
        assert_eq!(row.failed_count, 4);
        assert_eq!(row.end_time, "2024-01-01 08:20:00");
        assert_eq!(row.report.label(), REPORT_LINK_LABEL);
        assert_eq!(
            row.report.target(),
            Some("http://localhost:8080/api/reports/1.html")
        );
        assert_eq!(view.rows()[1].report, ReportCell::NotAvailable);
        assert_eq!(view.rows()[2].report, ReportCell::NotAvailable);
    }

    #[test]
    fn rendering_is_idempotent_and_leaves_input_alone() {
        let runs = collection(vec![
            run("1", "COMPLETED", "2024-01-01T00:00:00Z"),
            run("2", "SCHEDULED", "2024-01-05T00:00:00Z"),
            run("3", "FAILED", "2024-01-03T00:00:00Z"),
        ]);
        let before = runs.clone();
        let outcome = Ok(runs);

        let mut target = Recorder::default();
        render(&outcome, &opts(), &mut target);
        render(&outcome, &opts(), &mut target);

        assert_eq!(target.views[0], target.views[1]);
        assert_eq!(ids(&target.views[0]), ["2", "3", "1"]);
        assert_eq!(outcome.as_ref().unwrap(), &before);
    }

    #[test]
    fn json_view_is_tagged_by_listing_state() {
        let value = serde_json::to_value(build_view(&Ok(RunCollection::default()), &opts())).unwrap();
        assert_eq!(value["listing"]["state"], "empty");
        assert_eq!(value["summary"]["total"], 0);
    }
}
