//! Term course recommendation engine.
//!
//! Each request runs the same pipeline: aggregate the student's history, annotate the
//! catalog, infer interests, filter ineligible courses, score and rank the rest, select a
//! credit-bounded set, and evaluate it. Everything after retrieval is synchronous and free
//! of shared state.

pub mod curriculum;
pub mod directory;
pub mod domain;
pub mod eligibility;
pub mod history;
pub mod identity;
pub mod interests;
pub mod optimizer;
pub mod policy;
pub mod quality;
pub mod router;
pub mod scoring;
pub mod service;

#[cfg(test)]
mod tests;

pub use curriculum::CurriculumRules;
pub use directory::{
    AcademicDirectory, CatalogEntry, DirectoryError, DirectorySnapshot, ProfileRecord,
    RequiredCompetencyEntry, TermRecord,
};
pub use domain::{
    Course, CreditTally, CurriculumPolicy, CurriculumRequirements, EvaluationMetrics,
    RecommendationFilters, RecommendationMetadata, RecommendationRequest, RecommendationSet,
    RecommendationStatus, ScoredCourse, StudentProfile,
};
pub use eligibility::{check_prerequisites, filter_candidates, EligibilityFilter, Ineligibility};
pub use history::{aggregate_history, HistorySummary};
pub use identity::{normalize_code, CompletionIndex, IdentityMap};
pub use interests::{blend_preferred, infer_interests, seed_from_recent_success};
pub use optimizer::{optimize, SelectionPolicy};
pub use policy::{PolicyError, PolicyPreset, RecommendationPolicy};
pub use quality::evaluate;
pub use router::recommendation_router;
pub use scoring::{score, FitScorer, ScoringWeights};
pub use service::{RecommendationError, RecommendationService, ServiceSettings, ALGORITHM_VERSION};
