use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::identity::CompletionIndex;
use super::policy::PolicyPreset;

/// Earned/required/working credit counts, either for the whole degree or one subdomain.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CreditTally {
    #[serde(default)]
    pub earned: f64,
    #[serde(default)]
    pub required: f64,
    #[serde(default)]
    pub working: f64,
}

impl CreditTally {
    pub fn new(earned: f64, required: f64) -> Self {
        Self {
            earned,
            required,
            working: 0.0,
        }
    }

    /// Credits still needed; zero once the requirement is met.
    pub fn remaining(&self) -> f64 {
        (self.required - self.earned).max(0.0)
    }
}

/// Academic snapshot of one student, rebuilt from the directory for every request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StudentProfile {
    pub student_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub university_code: Option<String>,
    #[serde(default)]
    pub curriculum_version: u32,
    /// Competency code to recorded grade (0.0-4.0).
    #[serde(default)]
    pub competencies: BTreeMap<String, f64>,
    /// Course code to the term it was taken in; drives history aggregation.
    #[serde(default)]
    pub course_terms: BTreeMap<String, String>,
    #[serde(default)]
    pub completed_courses: CompletionIndex,
    #[serde(default)]
    pub distribution_credits: BTreeMap<String, CreditTally>,
    /// Competencies still outstanding for graduation.
    #[serde(default)]
    pub required_competencies: BTreeSet<String>,
    #[serde(default)]
    pub total_credits: CreditTally,
    #[serde(default)]
    pub interest_weights: BTreeMap<String, f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_credit_load: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub term: Option<String>,
}

impl StudentProfile {
    pub fn grade(&self, competency: &str) -> Option<f64> {
        self.competencies.get(competency).copied()
    }

    pub fn has_competency(&self, competency: &str) -> bool {
        self.competencies.contains_key(competency)
    }

    pub fn earned_in(&self, subdomain: &str) -> f64 {
        self.distribution_credits
            .get(subdomain)
            .map(|tally| tally.earned)
            .unwrap_or(0.0)
    }
}

/// Catalog entry offered for the requested term.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Course {
    pub id: String,
    #[serde(default)]
    pub code: String,
    /// Cross-snapshot identity shared by every alias of the same course.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity_id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub credit_hours: f64,
    pub subdomain_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subdomain_name: Option<String>,
    /// Competency code to the minimum grade needed to enrol.
    #[serde(default)]
    pub required_competencies: BTreeMap<String, f64>,
    #[serde(default)]
    pub teaches_competencies: BTreeSet<String>,
    #[serde(default)]
    pub prerequisites: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offered_term: Option<String>,
    #[serde(default)]
    pub is_core: bool,
    #[serde(default)]
    pub is_required: bool,
}

impl Course {
    /// Credit hours with negative or non-finite values read as zero.
    pub fn credits(&self) -> f64 {
        if self.credit_hours.is_finite() {
            self.credit_hours.max(0.0)
        } else {
            0.0
        }
    }

    pub fn subdomain_label(&self) -> &str {
        self.subdomain_name.as_deref().unwrap_or(&self.subdomain_id)
    }
}

/// Static curriculum policy merged with the profile to form per-request requirements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurriculumPolicy {
    /// Subdomain credit minimums that apply when the directory reports none.
    #[serde(default)]
    pub distribution_requirements: BTreeMap<String, f64>,
    /// Degree total used when the profile does not carry one.
    pub total_credits_required: f64,
}

impl Default for CurriculumPolicy {
    fn default() -> Self {
        Self {
            distribution_requirements: BTreeMap::new(),
            total_credits_required: 120.0,
        }
    }
}

/// Degree requirements evaluated for one request. Read-only once built.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CurriculumRequirements {
    pub curriculum_version: u32,
    pub required_competencies: BTreeSet<String>,
    pub distribution_requirements: BTreeMap<String, f64>,
    pub total_credits_required: f64,
}

impl CurriculumRequirements {
    pub fn for_profile(profile: &StudentProfile, policy: &CurriculumPolicy) -> Self {
        let mut distribution_requirements = policy.distribution_requirements.clone();
        for (subdomain, tally) in &profile.distribution_credits {
            if tally.required > 0.0 {
                distribution_requirements.insert(subdomain.clone(), tally.required);
            }
        }

        let total_credits_required = if profile.total_credits.required > 0.0 {
            profile.total_credits.required
        } else {
            policy.total_credits_required
        };

        Self {
            curriculum_version: profile.curriculum_version,
            required_competencies: profile.required_competencies.clone(),
            distribution_requirements,
            total_credits_required,
        }
    }

    /// Required competencies the student does not yet hold.
    pub fn missing_competencies(&self, profile: &StudentProfile) -> BTreeSet<String> {
        self.required_competencies
            .iter()
            .filter(|code| !profile.has_competency(code))
            .cloned()
            .collect()
    }

    pub fn required_in(&self, subdomain: &str) -> Option<f64> {
        self.distribution_requirements
            .get(subdomain)
            .copied()
            .filter(|required| *required > 0.0)
    }
}

/// Candidate course with its fit breakdown. Produced once, never re-scored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredCourse {
    pub course: Course,
    pub fit_score: f64,
    pub competency_match_score: f64,
    pub interest_alignment_score: f64,
    pub program_progress_score: f64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub matched_competencies: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub missing_competencies: Vec<String>,
    pub reason: String,
}

/// Quality summary of a finished selection; every field lies in [0, 1].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EvaluationMetrics {
    pub goodness_score: f64,
    pub skill_coverage: f64,
    pub prerequisite_compliance: f64,
    pub program_progress_fit: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationMetadata {
    pub generated_at: DateTime<Utc>,
    pub algorithm_version: String,
    pub processing_time_ms: u64,
    pub preset: PolicyPreset,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationStatus {
    Success,
    /// Fewer credits than the floor could be assembled from the eligible catalog.
    Partial,
}

/// Terminal artifact of one recommendation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationSet {
    pub student_id: String,
    pub term: String,
    pub courses: Vec<ScoredCourse>,
    pub total_credits: f64,
    pub distribution_coverage: BTreeMap<String, f64>,
    pub metrics: EvaluationMetrics,
    pub metadata: RecommendationMetadata,
    pub status: RecommendationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

/// Optional narrowing supplied by the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecommendationFilters {
    #[serde(default)]
    pub exclude_courses: Vec<String>,
    #[serde(default)]
    pub preferred_subdomains: Vec<String>,
}

/// Inbound request for one student and term.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecommendationRequest {
    pub student_id: String,
    pub term: String,
    #[serde(default)]
    pub max_credit_load: Option<f64>,
    #[serde(default)]
    pub filters: Option<RecommendationFilters>,
    /// Prior term whose successes seed interests; `ALL` uses every recorded grade.
    #[serde(default)]
    pub previous_term: Option<String>,
    #[serde(default)]
    pub preset: Option<PolicyPreset>,
}
