//! Term course recommendations for degree-seeking students.
//!
//! The `workflows::advising` module holds the recommendation engine (eligibility, fit scoring,
//! set selection, quality evaluation) and the orchestrating service. `workflows::offline`
//! replays the bulk competency recommender against held-out records.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
