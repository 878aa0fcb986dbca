use crate::error::FetchError;
use serde::{de, Deserialize, Deserializer, Serialize};
use std::collections::HashSet;
use std::time::Duration;
use time::format_description::well_known::Rfc3339;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::{OffsetDateTime, PrimitiveDateTime};

/// Offset-less timestamps as emitted by services that serialize a local date-time.
const NAIVE_DATE_TIME: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second][optional [.[subsecond]]]");

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    pub endpoint_url: String,
    #[serde(default, with = "humantime_serde")]
    pub poll_interval: Option<Duration>,
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
    pub fetch_on_launch: bool,
    pub user_agent: String,
}

/// Lifecycle state reported by the service. Values outside the four known ones are
/// preserved verbatim so they can still be displayed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RunStatus {
    Scheduled,
    Running,
    Completed,
    Failed,
    Unknown(String),
}

impl RunStatus {
    pub fn as_str(&self) -> &str {
        match self {
            RunStatus::Scheduled => "SCHEDULED",
            RunStatus::Running => "RUNNING",
            RunStatus::Completed => "COMPLETED",
            RunStatus::Failed => "FAILED",
            RunStatus::Unknown(raw) => raw,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, RunStatus::Unknown(_))
    }
}

impl From<String> for RunStatus {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "SCHEDULED" => RunStatus::Scheduled,
            "RUNNING" => RunStatus::Running,
            "COMPLETED" => RunStatus::Completed,
            "FAILED" => RunStatus::Failed,
            _ => RunStatus::Unknown(raw),
        }
    }
}

impl From<RunStatus> for String {
    fn from(status: RunStatus) -> Self {
        match status {
            RunStatus::Unknown(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

/// One pipeline execution as reported by the service.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestRun {
    #[serde(alias = "runId", deserialize_with = "id_from_str_or_number")]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub environment: String,
    pub status: RunStatus,
    #[serde(deserialize_with = "timestamp")]
    pub start_time: OffsetDateTime,
    #[serde(default, deserialize_with = "optional_timestamp")]
    pub end_time: Option<OffsetDateTime>,
    #[serde(default)]
    pub failed_test_count: Option<u32>,
    #[serde(default)]
    pub report_url: Option<String>,

    // Supplemental fields, shown in the detail pane only.
    #[serde(default)]
    pub tags: Option<String>,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub error_details: Option<String>,
    #[serde(default)]
    pub screenshot_path: Option<String>,
}

/// Runs in the order the service returned them. Ids are unique.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunCollection {
    runs: Vec<TestRun>,
}

impl RunCollection {
    pub fn new(runs: Vec<TestRun>) -> Result<Self, FetchError> {
        let mut seen = HashSet::with_capacity(runs.len());
        for run in &runs {
            if !seen.insert(run.id.as_str()) {
                return Err(FetchError::DuplicateId {
                    id: run.id.clone(),
                });
            }
        }
        Ok(Self { runs })
    }

    pub fn runs(&self) -> &[TestRun] {
        &self.runs
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TestRun> {
        self.runs.iter()
    }

    pub fn len(&self) -> usize {
        self.runs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SummaryCounts {
    pub total: usize,
    pub completed: usize,
    pub failed: usize,
    pub running: usize,
}

/// What caused a cycle to be requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Launch,
    Manual,
    Poll,
}

#[derive(Debug)]
pub enum CycleEvent {
    CycleStarted {
        cycle: u64,
        trigger: Trigger,
    },
    CycleCompleted {
        cycle: u64,
        outcome: Result<RunCollection, FetchError>,
    },
    /// The fetch task died before producing an outcome (panic or runtime shutdown).
    CycleAborted {
        cycle: u64,
        reason: String,
    },
    TriggerIgnored {
        trigger: Trigger,
    },
    Info(InfoEvent),
}

/// Structured info events emitted by the controller and consumed by UI/CLI layers.
#[derive(Debug, Clone)]
pub enum InfoEvent {
    WaitingForCycle,
    StillWaiting,
}

impl InfoEvent {
    pub fn to_message(&self) -> &'static str {
        match self {
            InfoEvent::WaitingForCycle => "Waiting for in-flight refresh…",
            InfoEvent::StillWaiting => "Still waiting for in-flight refresh…",
        }
    }
}

fn id_from_str_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(de::Error::custom(format!(
            "run id must be a string or number, got {other}"
        ))),
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Option::unwrap_or_default)
}

pub(crate) fn parse_timestamp(s: &str) -> Result<OffsetDateTime, time::error::Parse> {
    OffsetDateTime::parse(s, &Rfc3339).or_else(|rfc_err| {
        PrimitiveDateTime::parse(s, NAIVE_DATE_TIME)
            .map(PrimitiveDateTime::assume_utc)
            .map_err(|_| rfc_err)
    })
}

fn timestamp<'de, D>(deserializer: D) -> Result<OffsetDateTime, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw).map_err(|e| de::Error::custom(format!("invalid timestamp {raw:?}: {e}")))
}

fn optional_timestamp<'de, D>(deserializer: D) -> Result<Option<OffsetDateTime>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        Some(raw) => parse_timestamp(&raw)
            .map(Some)
            .map_err(|e| de::Error::custom(format!("invalid timestamp {raw:?}: {e}"))),
        None => Ok(None),
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::run;
    use super::*;
    use time::macros::datetime;

    #[test]
    fn status_round_trips_unknown_values_verbatim() {
        let status = RunStatus::from("BOGUS".to_string());
        assert_eq!(status, RunStatus::Unknown("BOGUS".into()));
        assert!(!status.is_known());
        assert_eq!(String::from(status), "BOGUS");
        assert_eq!(RunStatus::from("FAILED".to_string()), RunStatus::Failed);
    }

    #[test]
    fn status_match_is_case_sensitive() {
        assert!(!RunStatus::from("completed".to_string()).is_known());
    }

    #[test]
    fn naive_timestamps_are_read_as_utc() {
        assert_eq!(
            parse_timestamp("2024-01-01T10:00:00").unwrap(),
            datetime!(2024-01-01 10:00:00 UTC)
        );
        assert_eq!(
            parse_timestamp("2024-01-01T10:00:00.250").unwrap(),
            datetime!(2024-01-01 10:00:00.25 UTC)
        );
        assert_eq!(
            parse_timestamp("2024-01-01T10:00:00+02:00").unwrap(),
            datetime!(2024-01-01 08:00:00 UTC)
        );
        assert!(parse_timestamp("yesterday").is_err());
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let err = RunCollection::new(vec![
            run("a", "RUNNING", "2024-01-01T00:00:00Z"),
            run("a", "FAILED", "2024-01-02T00:00:00Z"),
        ])
        .unwrap_err();
        assert!(matches!(err, FetchError::DuplicateId { id } if id == "a"));
    }

    #[test]
    fn collection_keeps_service_order() {
        let runs = RunCollection::new(vec![
            run("b", "RUNNING", "2024-01-01T00:00:00Z"),
            run("a", "FAILED", "2024-01-02T00:00:00Z"),
        ])
        .unwrap();
        let ids: Vec<_> = runs.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["b", "a"]);
    }
}
