use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tracing::{debug, info, info_span, warn, Instrument};

use super::curriculum::CurriculumRules;
use super::directory::{AcademicDirectory, DirectoryError};
use super::domain::{
    Course, CurriculumPolicy, CurriculumRequirements, RecommendationMetadata,
    RecommendationRequest, RecommendationSet, RecommendationStatus, StudentProfile,
};
use super::eligibility::EligibilityFilter;
use super::history::aggregate_history;
use super::identity::IdentityMap;
use super::interests::{
    blend_preferred, infer_interests, normalize, seed_from_recent_success, successful_codes,
    SUCCESS_GRADE,
};
use super::optimizer::{distribution_coverage, optimize, total_credits};
use super::policy::PolicyPreset;
use super::quality::evaluate;
use super::scoring::FitScorer;
use crate::config::RecommenderConfig;

/// Version tag stamped on every recommendation set.
pub const ALGORITHM_VERSION: &str = "greedy-marginal-2.1";

/// Reference term that seeds interests from every recorded grade.
pub const ALL_TERMS: &str = "ALL";

/// Request-independent knobs of the recommendation service.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceSettings {
    pub default_credit_load: f64,
    pub preset: PolicyPreset,
    pub history_fan_out: usize,
    pub curriculum: CurriculumPolicy,
    /// Course-code prefixes never offered as recommendations.
    pub excluded_prefixes: Vec<String>,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            default_credit_load: 60.0,
            preset: PolicyPreset::Standard,
            history_fan_out: 4,
            curriculum: CurriculumPolicy::default(),
            excluded_prefixes: Vec::new(),
        }
    }
}

impl From<&RecommenderConfig> for ServiceSettings {
    fn from(config: &RecommenderConfig) -> Self {
        Self {
            default_credit_load: config.default_credit_load,
            preset: config.preset,
            history_fan_out: config.history_fan_out,
            excluded_prefixes: config.excluded_prefixes.clone(),
            ..Self::default()
        }
    }
}

/// Orchestrates retrieval, inference, filtering, scoring, selection, and evaluation.
pub struct RecommendationService<D> {
    directory: Arc<D>,
    identities: Arc<IdentityMap>,
    rules: Arc<CurriculumRules>,
    settings: ServiceSettings,
}

impl<D> RecommendationService<D>
where
    D: AcademicDirectory + 'static,
{
    pub fn new(directory: Arc<D>, settings: ServiceSettings) -> Self {
        Self::with_tables(
            directory,
            IdentityMap::default(),
            CurriculumRules::default(),
            settings,
        )
    }

    pub fn with_tables(
        directory: Arc<D>,
        identities: IdentityMap,
        rules: CurriculumRules,
        settings: ServiceSettings,
    ) -> Self {
        Self {
            directory,
            identities: Arc::new(identities),
            rules: Arc::new(rules),
            settings,
        }
    }

    pub fn settings(&self) -> &ServiceSettings {
        &self.settings
    }

    /// Builds a recommendation set. Profile or catalog loss fails the whole request.
    pub async fn generate(
        &self,
        request: RecommendationRequest,
    ) -> Result<RecommendationSet, RecommendationError> {
        let span = info_span!(
            "recommendation",
            student_id = %request.student_id,
            term = %request.term
        );
        self.run(request).instrument(span).await
    }

    /// Fetch a student's profile as reported by the directory.
    pub async fn profile(&self, student_id: &str) -> Result<StudentProfile, RecommendationError> {
        self.directory
            .student_profile(student_id)
            .await
            .map_err(|source| RecommendationError::Profile {
                student_id: student_id.to_string(),
                source,
            })
    }

    /// Fetch a term's catalog with identity ids and requirement flags applied.
    pub async fn catalog(
        &self,
        term: &str,
        curriculum_version: u32,
    ) -> Result<Vec<Course>, RecommendationError> {
        let mut catalog = self
            .directory
            .course_catalog(term, curriculum_version)
            .await
            .map_err(|source| RecommendationError::Catalog {
                term: term.to_string(),
                source,
            })?;
        self.identities.annotate(&mut catalog);
        self.rules.annotate(&mut catalog);
        Ok(catalog)
    }

    async fn run(
        &self,
        request: RecommendationRequest,
    ) -> Result<RecommendationSet, RecommendationError> {
        validate(&request)?;
        let started = Instant::now();
        let preset = request.preset.unwrap_or(self.settings.preset);
        let policy = preset.policy();

        let mut profile = self.profile(&request.student_id).await?;
        profile.term = Some(request.term.clone());
        let reported: Vec<String> = profile
            .completed_courses
            .codes()
            .map(str::to_string)
            .collect();

        let history = aggregate_history(
            Arc::clone(&self.directory),
            &profile,
            &self.identities,
            self.settings.history_fan_out,
        )
        .await;
        debug!(
            completed = history.completed.len(),
            terms = history.terms_scanned,
            failed = history.terms_failed.len(),
            "aggregated history"
        );
        profile.completed_courses = history.completed;

        let catalog = self.catalog(&request.term, profile.curriculum_version).await?;

        let seeded = match request.previous_term.as_deref() {
            Some(reference) => self.seed_interests(&profile, reference, &catalog).await,
            None => BTreeMap::new(),
        };
        let interests = if seeded.is_empty() {
            infer_interests(&reported, &catalog, &profile.competencies)
        } else {
            seeded
        };
        if !interests.is_empty() {
            profile.interest_weights = interests;
        } else {
            profile.interest_weights = normalize(std::mem::take(&mut profile.interest_weights));
        }

        let filters = request.filters.clone().unwrap_or_default();
        if !filters.preferred_subdomains.is_empty() {
            profile.interest_weights =
                blend_preferred(&profile.interest_weights, &filters.preferred_subdomains);
        }

        let requirements = CurriculumRequirements::for_profile(&profile, &self.settings.curriculum);

        let candidates = EligibilityFilter::new()
            .excluding(&filters.exclude_courses)
            .offered_in(&request.term)
            .without_prefixes(&self.settings.excluded_prefixes)
            .apply(&catalog, &profile);
        debug!(
            catalog = catalog.len(),
            candidates = candidates.len(),
            "filtered candidates"
        );

        let ranked = FitScorer::new(policy.weights).rank(&candidates, &profile, &requirements);

        let hard_max = request
            .max_credit_load
            .or(profile.max_credit_load)
            .unwrap_or(self.settings.default_credit_load);
        let target = hard_max.min(policy.selection.target_cap);
        let warning = (hard_max > policy.selection.target_cap).then(|| {
            format!(
                "requested load of {hard_max} credits exceeds the recommended maximum of {}",
                policy.selection.target_cap
            )
        });
        if let Some(message) = &warning {
            warn!(%message, "credit overload requested");
        }

        let selected = optimize(
            &ranked,
            &profile,
            &requirements,
            target,
            hard_max,
            &policy.selection,
        );
        let metrics = evaluate(&selected, &profile, &requirements);
        let total = total_credits(&selected);
        let status = if total + f64::EPSILON < policy.selection.credit_floor.min(target) {
            RecommendationStatus::Partial
        } else {
            RecommendationStatus::Success
        };

        info!(
            selected = selected.len(),
            total_credits = total,
            goodness = metrics.goodness_score,
            preset = %preset,
            "recommendation generated"
        );

        Ok(RecommendationSet {
            student_id: profile.student_id.clone(),
            term: request.term,
            distribution_coverage: distribution_coverage(&selected),
            courses: selected,
            total_credits: total,
            metrics,
            metadata: RecommendationMetadata {
                generated_at: Utc::now(),
                algorithm_version: ALGORITHM_VERSION.to_string(),
                processing_time_ms: started.elapsed().as_millis() as u64,
                preset,
            },
            status,
            warning,
        })
    }

    /// Interest weights seeded by successes in `reference`; empty when none are found.
    async fn seed_interests(
        &self,
        profile: &StudentProfile,
        reference: &str,
        catalog: &[Course],
    ) -> BTreeMap<String, f64> {
        let successes = if reference.trim().eq_ignore_ascii_case(ALL_TERMS) {
            successful_codes(
                profile
                    .competencies
                    .iter()
                    .map(|(code, grade)| (code.as_str(), *grade)),
            )
        } else {
            match self
                .directory
                .term_records(&profile.student_id, reference.trim())
                .await
            {
                Ok(records) => records
                    .iter()
                    .filter(|record| record.grade.is_some_and(|grade| grade > SUCCESS_GRADE))
                    .map(|record| record.course_code.clone())
                    .collect(),
                Err(error) => {
                    warn!(reference, %error, "recent-success seeding skipped");
                    Vec::new()
                }
            }
        };
        debug!(reference, successes = successes.len(), "seeding interests");
        seed_from_recent_success(&successes, catalog)
    }
}

fn validate(request: &RecommendationRequest) -> Result<(), RecommendationError> {
    if request.student_id.trim().is_empty() {
        return Err(RecommendationError::InvalidRequest(
            "student_id must not be empty".to_string(),
        ));
    }
    if request.term.trim().is_empty() {
        return Err(RecommendationError::InvalidRequest(
            "term must not be empty".to_string(),
        ));
    }
    if let Some(load) = request.max_credit_load {
        if !load.is_finite() || load <= 0.0 {
            return Err(RecommendationError::InvalidRequest(format!(
                "max_credit_load must be a positive number (found {load})"
            )));
        }
    }
    Ok(())
}

/// Error raised by the recommendation service.
#[derive(Debug, thiserror::Error)]
pub enum RecommendationError {
    #[error("failed to fetch student profile for {student_id}")]
    Profile {
        student_id: String,
        #[source]
        source: DirectoryError,
    },
    #[error("failed to fetch course catalog for term {term}")]
    Catalog {
        term: String,
        #[source]
        source: DirectoryError,
    },
    #[error("invalid recommendation request: {0}")]
    InvalidRequest(String),
}

impl RecommendationError {
    /// Whether the directory reported the requested record as missing.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            RecommendationError::Profile {
                source: DirectoryError::NotFound(_),
                ..
            } | RecommendationError::Catalog {
                source: DirectoryError::NotFound(_),
                ..
            }
        )
    }
}
