//! Cell formatting shared by every render target.

use reqwest::Url;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::{OffsetDateTime, UtcOffset};

const DISPLAY_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");

/// Formats timestamps in a fixed UTC offset.
#[derive(Debug, Clone, Copy)]
pub struct TimeFormat {
    offset: UtcOffset,
}

impl TimeFormat {
    pub fn new(offset: UtcOffset) -> Self {
        Self { offset }
    }

    /// Use the machine's local offset, falling back to UTC when it cannot be determined
    /// (e.g. on Unix once other threads are running).
    pub fn local() -> Self {
        match UtcOffset::current_local_offset() {
            Ok(offset) => Self::new(offset),
            Err(e) => {
                tracing::debug!(error = %e, "local UTC offset unavailable; using UTC");
                Self::new(UtcOffset::UTC)
            }
        }
    }

    pub fn format(&self, t: OffsetDateTime) -> String {
        let local = t.to_offset(self.offset);
        local
            .format(DISPLAY_FORMAT)
            .unwrap_or_else(|_| local.to_string())
    }
}

/// Resolve a possibly relative report link against the endpoint it came from.
pub fn resolve_report_url(base: Option<&Url>, raw: &str) -> Option<String> {
    match Url::parse(raw) {
        Ok(url) => Some(url.to_string()),
        Err(_) => base.and_then(|b| b.join(raw).ok()).map(|u| u.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{datetime, offset};

    #[test]
    fn formats_in_configured_offset() {
        let t = datetime!(2024-01-01 23:30:00 UTC);
        assert_eq!(TimeFormat::new(UtcOffset::UTC).format(t), "2024-01-01 23:30:00");
        assert_eq!(TimeFormat::new(offset!(+2)).format(t), "2024-01-02 01:30:00");
    }

    #[test]
    fn relative_report_links_resolve_against_endpoint() {
        let base = Url::parse("http://localhost:8080/api/runs").unwrap();
        assert_eq!(
            resolve_report_url(Some(&base), "reports/r1.html").as_deref(),
            Some("http://localhost:8080/api/reports/r1.html")
        );
        assert_eq!(
            resolve_report_url(Some(&base), "/reports/r1.html").as_deref(),
            Some("http://localhost:8080/reports/r1.html")
        );
        assert_eq!(
            resolve_report_url(Some(&base), "https://ci.example.com/r/1").as_deref(),
            Some("https://ci.example.com/r/1")
        );
        assert_eq!(resolve_report_url(None, "reports/r1.html"), None);
    }
}
