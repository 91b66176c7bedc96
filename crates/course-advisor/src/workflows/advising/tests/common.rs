use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::response::Response;
use serde_json::Value;

use crate::workflows::advising::directory::{AcademicDirectory, DirectoryError, TermRecord};
use crate::workflows::advising::domain::{
    Course, CreditTally, CurriculumRequirements, StudentProfile,
};
use crate::workflows::advising::{RecommendationService, ServiceSettings};

pub(super) fn course(id: &str, subdomain: &str, credits: f64) -> Course {
    Course {
        id: id.to_string(),
        code: id.to_string(),
        name: format!("Course {id}"),
        credit_hours: credits,
        subdomain_id: subdomain.to_string(),
        ..Course::default()
    }
}

pub(super) fn teaching(mut course: Course, competencies: &[&str]) -> Course {
    course.teaches_competencies = competencies.iter().map(|c| c.to_string()).collect();
    course
}

pub(super) fn requiring(mut course: Course, competencies: &[(&str, f64)]) -> Course {
    course.required_competencies = competencies
        .iter()
        .map(|(code, grade)| (code.to_string(), *grade))
        .collect();
    course
}

/// Student holding A at 3.0, done with C1, still missing B.
pub(super) fn scenario_profile() -> StudentProfile {
    StudentProfile {
        student_id: "S-100".to_string(),
        curriculum_version: 2024,
        competencies: BTreeMap::from([("A".to_string(), 3.0)]),
        completed_courses: ["C1"].into_iter().collect(),
        required_competencies: BTreeSet::from(["B".to_string()]),
        ..StudentProfile::default()
    }
}

pub(super) fn scenario_catalog() -> Vec<Course> {
    vec![
        course("C1", "AI", 3.0),
        teaching(
            requiring(course("C2", "AI", 3.0), &[("A", 2.0)]),
            &["B"],
        ),
        course("C3", "SE", 3.0),
    ]
}

pub(super) fn requirements_for(profile: &StudentProfile) -> CurriculumRequirements {
    CurriculumRequirements {
        curriculum_version: profile.curriculum_version,
        required_competencies: profile.required_competencies.clone(),
        distribution_requirements: BTreeMap::new(),
        total_credits_required: 120.0,
    }
}

/// Twenty courses across four subdomains with varied credits and teachings.
pub(super) fn wide_catalog() -> Vec<Course> {
    let subdomains = ["AI", "SE", "MATH", "ELEC"];
    (0..20)
        .map(|index| {
            let subdomain = subdomains[index % subdomains.len()];
            let credits = [3.0, 4.0, 6.0, 5.0][index % 4];
            let id = format!("{subdomain}-{index:03}");
            let taught = format!("K{index}");
            teaching(course(&id, subdomain, credits), &[taught.as_str()])
        })
        .collect()
}

/// Mid-degree student with distribution requirements in three subdomains.
pub(super) fn progressing_profile() -> StudentProfile {
    StudentProfile {
        student_id: "S-200".to_string(),
        curriculum_version: 2024,
        competencies: BTreeMap::from([("K0".to_string(), 3.5), ("K5".to_string(), 2.0)]),
        completed_courses: ["AI-000", "ELEC-015"].into_iter().collect(),
        course_terms: BTreeMap::from([
            ("AI-000".to_string(), "Fall 2024".to_string()),
            ("ELEC-015".to_string(), "Spring 2025".to_string()),
        ]),
        distribution_credits: BTreeMap::from([
            ("AI".to_string(), CreditTally::new(12.0, 36.0)),
            ("SE".to_string(), CreditTally::new(6.0, 24.0)),
            ("MATH".to_string(), CreditTally::new(12.0, 12.0)),
        ]),
        required_competencies: BTreeSet::from(["K3".to_string(), "K7".to_string()]),
        total_credits: CreditTally::new(48.0, 120.0),
        ..StudentProfile::default()
    }
}

/// In-memory directory with optional failure injection.
#[derive(Default)]
pub(super) struct FakeDirectory {
    pub profiles: BTreeMap<String, StudentProfile>,
    pub catalog: Vec<Course>,
    pub records: BTreeMap<String, Vec<TermRecord>>,
    pub failing_terms: BTreeSet<String>,
    pub catalog_outage: bool,
    pub profile_outage: bool,
    pub yields: usize,
    pub in_flight: AtomicUsize,
    pub peak_in_flight: AtomicUsize,
}

impl FakeDirectory {
    pub fn new(profile: StudentProfile, catalog: Vec<Course>) -> Self {
        let mut profiles = BTreeMap::new();
        profiles.insert(profile.student_id.clone(), profile);
        Self {
            profiles,
            catalog,
            ..Self::default()
        }
    }

    pub fn with_records(mut self, term: &str, records: Vec<TermRecord>) -> Self {
        self.records.insert(term.to_string(), records);
        self
    }

    pub fn failing_term(mut self, term: &str) -> Self {
        self.failing_terms.insert(term.to_string());
        self
    }
}

#[async_trait]
impl AcademicDirectory for FakeDirectory {
    async fn student_profile(&self, student_id: &str) -> Result<StudentProfile, DirectoryError> {
        if self.profile_outage {
            return Err(DirectoryError::Unavailable("profile service down".to_string()));
        }
        self.profiles
            .get(student_id)
            .cloned()
            .ok_or_else(|| DirectoryError::NotFound(format!("student {student_id}")))
    }

    async fn course_catalog(
        &self,
        _term: &str,
        _curriculum_version: u32,
    ) -> Result<Vec<Course>, DirectoryError> {
        if self.catalog_outage {
            return Err(DirectoryError::Unavailable("catalog timeout".to_string()));
        }
        Ok(self.catalog.clone())
    }

    async fn term_records(
        &self,
        _student_id: &str,
        term: &str,
    ) -> Result<Vec<TermRecord>, DirectoryError> {
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(current, Ordering::SeqCst);
        for _ in 0..self.yields {
            tokio::task::yield_now().await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.failing_terms.contains(term) {
            return Err(DirectoryError::Unavailable(format!("term {term} timed out")));
        }
        Ok(self.records.get(term).cloned().unwrap_or_default())
    }
}

pub(super) fn record(code: &str, grade: f64) -> TermRecord {
    TermRecord {
        course_code: code.to_string(),
        grade: Some(grade),
        ..TermRecord::default()
    }
}

pub(super) fn service(directory: FakeDirectory) -> Arc<RecommendationService<FakeDirectory>> {
    Arc::new(RecommendationService::new(
        Arc::new(directory),
        ServiceSettings::default(),
    ))
}

pub(super) async fn json_body(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("json body")
}
