use thiserror::Error;

/// Failures surfaced by the interaction drivers.
///
/// Inside a fill pass these are absorbed into per-control outcomes; at the
/// step level the orchestrator decides whether a variant aborts the run.
#[derive(Debug, Error)]
pub enum DriverError {
    /// The underlying page call failed.
    #[error("page call failed: {0}")]
    Page(String),

    /// A bounded wait elapsed without its condition turning true.
    #[error("wait timed out: {0}")]
    WaitTimeout(String),

    /// An element the step depends on is not on the page.
    #[error("no match for {0}")]
    NoMatch(String),
}
