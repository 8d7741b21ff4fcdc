pub mod cache;
pub mod candidates;
pub mod client;
pub mod models;
pub mod projection;
pub mod resolver;

pub use cache::{StatsCache, SystemClock};
pub use candidates::CandidateResolver;
pub use client::HttpUpstream;
pub use models::StatKind;
pub use projection::project;
pub use resolver::StatsResolver;

/// Failures surfaced to callers of the stats resolver.
#[derive(Debug, thiserror::Error)]
pub enum StatsError {
    #[error("invalid stats kind: {0}")]
    InvalidResourceKind(String),

    #[error("all stats sources failed (last status {last_status:?})")]
    AllCandidatesExhausted {
        last_status: Option<u16>,
        sample: String,
    },
}
