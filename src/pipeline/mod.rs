//! The feed-to-alert pipeline: novelty detection, keyword matching, alert
//! dispatch, and per-source cycle orchestration.

pub mod cycle;
pub mod dispatcher;
pub mod keywords;
pub mod novelty;

pub use cycle::{run_cycle, CycleError, CycleOutcome};
pub use keywords::match_keyword;
pub use novelty::{detect_new, Novelty};
