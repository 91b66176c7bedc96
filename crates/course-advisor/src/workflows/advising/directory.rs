use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::domain::{Course, CreditTally, StudentProfile};
use super::identity::CompletionIndex;

/// Academic records source consumed by the recommender.
#[async_trait]
pub trait AcademicDirectory: Send + Sync {
    async fn student_profile(&self, student_id: &str) -> Result<StudentProfile, DirectoryError>;

    async fn course_catalog(
        &self,
        term: &str,
        curriculum_version: u32,
    ) -> Result<Vec<Course>, DirectoryError>;

    /// Courses a student took in one term, used for history aggregation and success seeding.
    async fn term_records(
        &self,
        student_id: &str,
        term: &str,
    ) -> Result<Vec<TermRecord>, DirectoryError>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DirectoryError {
    #[error("{0} not found")]
    NotFound(String),
    #[error("directory unavailable: {0}")]
    Unavailable(String),
    #[error("malformed directory payload: {0}")]
    Decode(String),
}

/// One course entry from a term transcript.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TermRecord {
    pub course_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub competency_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub course_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grade: Option<f64>,
}

/// Outstanding competency as reported by the directory: a bare code or an object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequiredCompetencyEntry {
    Code(String),
    Entry {
        #[serde(alias = "code")]
        competency_code: String,
    },
}

impl RequiredCompetencyEntry {
    pub fn code(&self) -> &str {
        match self {
            RequiredCompetencyEntry::Code(code) => code,
            RequiredCompetencyEntry::Entry { competency_code } => competency_code,
        }
    }
}

/// Profile payload as delivered by the directory, before normalization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileRecord {
    pub student_id: String,
    #[serde(default)]
    pub university_code: Option<String>,
    #[serde(default)]
    pub curriculum_version: u32,
    #[serde(default)]
    pub competencies: BTreeMap<String, f64>,
    #[serde(default)]
    pub course_terms: BTreeMap<String, String>,
    #[serde(default)]
    pub completed_courses: Vec<String>,
    #[serde(default)]
    pub distribution_credits: BTreeMap<String, CreditTally>,
    #[serde(default)]
    pub required_competencies: Vec<RequiredCompetencyEntry>,
    #[serde(default)]
    pub total_credits: CreditTally,
    #[serde(default)]
    pub interest_weights: BTreeMap<String, f64>,
    #[serde(default)]
    pub max_credit_load: Option<f64>,
}

impl From<ProfileRecord> for StudentProfile {
    fn from(record: ProfileRecord) -> Self {
        let required_competencies: BTreeSet<String> = record
            .required_competencies
            .iter()
            .map(|entry| entry.code().trim())
            .filter(|code| !code.is_empty())
            .map(str::to_string)
            .collect();

        let completed_courses: CompletionIndex = record.completed_courses.iter().collect();

        StudentProfile {
            student_id: record.student_id,
            university_code: record.university_code,
            curriculum_version: record.curriculum_version,
            competencies: record.competencies,
            course_terms: record.course_terms,
            completed_courses,
            distribution_credits: record.distribution_credits,
            required_competencies,
            total_credits: record.total_credits,
            interest_weights: record.interest_weights,
            max_credit_load: record.max_credit_load,
            term: None,
        }
    }
}

/// Catalog published for one term, optionally pinned to a curriculum version.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub term: String,
    #[serde(default)]
    pub curriculum_version: Option<u32>,
    #[serde(default)]
    pub courses: Vec<Course>,
}

/// In-memory directory backed by a JSON snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DirectorySnapshot {
    #[serde(default)]
    pub profiles: Vec<ProfileRecord>,
    #[serde(default)]
    pub catalogs: Vec<CatalogEntry>,
    /// Student id to term to transcript entries.
    #[serde(default)]
    pub term_records: BTreeMap<String, BTreeMap<String, Vec<TermRecord>>>,
}

impl DirectorySnapshot {
    pub fn from_json(raw: &str) -> Result<Self, DirectoryError> {
        serde_json::from_str(raw).map_err(|error| DirectoryError::Decode(error.to_string()))
    }

    fn find_catalog(&self, term: &str, curriculum_version: u32) -> Option<&CatalogEntry> {
        let for_term = |entry: &&CatalogEntry| entry.term.trim().eq_ignore_ascii_case(term.trim());
        self.catalogs
            .iter()
            .filter(for_term)
            .find(|entry| entry.curriculum_version == Some(curriculum_version))
            .or_else(|| {
                self.catalogs
                    .iter()
                    .filter(for_term)
                    .find(|entry| entry.curriculum_version.is_none())
            })
    }
}

#[async_trait]
impl AcademicDirectory for DirectorySnapshot {
    async fn student_profile(&self, student_id: &str) -> Result<StudentProfile, DirectoryError> {
        self.profiles
            .iter()
            .find(|record| record.student_id == student_id)
            .cloned()
            .map(StudentProfile::from)
            .ok_or_else(|| DirectoryError::NotFound(format!("student {student_id}")))
    }

    async fn course_catalog(
        &self,
        term: &str,
        curriculum_version: u32,
    ) -> Result<Vec<Course>, DirectoryError> {
        self.find_catalog(term, curriculum_version)
            .map(|entry| entry.courses.clone())
            .ok_or_else(|| DirectoryError::NotFound(format!("catalog for term {term}")))
    }

    async fn term_records(
        &self,
        student_id: &str,
        term: &str,
    ) -> Result<Vec<TermRecord>, DirectoryError> {
        Ok(self
            .term_records
            .get(student_id)
            .and_then(|terms| terms.get(term))
            .cloned()
            .unwrap_or_default())
    }
}
