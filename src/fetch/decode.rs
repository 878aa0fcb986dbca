use crate::error::FetchError;
use crate::model::{RunCollection, TestRun};

/// Decode a response body into a validated collection.
///
/// The body must be a JSON array whose elements all look like runs; one malformed
/// element fails the whole body.
pub(crate) fn decode_runs(body: &[u8]) -> Result<RunCollection, FetchError> {
    let runs: Vec<TestRun> = serde_json::from_slice(body)?;
    RunCollection::new(runs)
}
