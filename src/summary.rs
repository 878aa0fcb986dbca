use crate::model::{RunCollection, RunStatus, SummaryCounts};

/// Fold a collection into the four summary counts.
///
/// `SCHEDULED` runs are reported as running. Unknown statuses only count towards `total`.
pub fn summarize(runs: &RunCollection) -> SummaryCounts {
    runs.iter().fold(SummaryCounts::default(), |mut counts, run| {
        counts.total += 1;
        match run.status {
            RunStatus::Completed => counts.completed += 1,
            RunStatus::Failed => counts.failed += 1,
            RunStatus::Running | RunStatus::Scheduled => counts.running += 1,
            RunStatus::Unknown(_) => {}
        }
        counts
    })
}
