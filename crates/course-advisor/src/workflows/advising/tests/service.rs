use super::common::*;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::config::RecommenderConfig;
use crate::workflows::advising::domain::{
    RecommendationFilters, RecommendationRequest, RecommendationStatus,
};
use crate::workflows::advising::{
    infer_interests, PolicyPreset, RecommendationError, RecommendationService, ServiceSettings,
    ALGORITHM_VERSION,
};

fn request(student_id: &str) -> RecommendationRequest {
    RecommendationRequest {
        student_id: student_id.to_string(),
        term: "Fall 2025".to_string(),
        ..RecommendationRequest::default()
    }
}

#[tokio::test]
async fn scenario_selection_end_to_end() {
    let service = service(FakeDirectory::new(scenario_profile(), scenario_catalog()));
    let set = service
        .generate(RecommendationRequest {
            max_credit_load: Some(6.0),
            ..request("S-100")
        })
        .await
        .expect("recommendation succeeds");

    let ids: Vec<_> = set.courses.iter().map(|scored| scored.course.id.as_str()).collect();
    assert_eq!(ids, vec!["C2", "C3"]);
    assert_eq!(set.total_credits, 6.0);
    assert_eq!(set.status, RecommendationStatus::Success);
    assert_eq!(
        set.distribution_coverage,
        BTreeMap::from([("AI".to_string(), 3.0), ("SE".to_string(), 3.0)])
    );
    assert_eq!(set.courses[0].reason, "Advances your graduation requirements");
    assert_eq!(set.metrics.skill_coverage, 1.0);
    assert_eq!(set.metadata.algorithm_version, ALGORITHM_VERSION);
    assert_eq!(set.metadata.preset, PolicyPreset::Standard);
    assert!(set.warning.is_none());
}

#[test]
fn empty_history_infers_no_interests() {
    let empty: [&str; 0] = [];
    assert!(infer_interests(&empty, &scenario_catalog(), &BTreeMap::new()).is_empty());
}

#[tokio::test]
async fn unmet_course_prerequisites_always_filter() {
    let mut catalog = scenario_catalog();
    let mut gated = teaching(course("P-1", "AI", 3.0), &["B", "Q", "R"]);
    gated.prerequisites.insert("ZZ-9".to_string());
    catalog.push(gated);
    let service = service(FakeDirectory::new(scenario_profile(), catalog));

    let set = service.generate(request("S-100")).await.expect("succeeds");
    assert!(set.courses.iter().all(|scored| scored.course.id != "P-1"));
}

#[tokio::test]
async fn term_history_removes_already_taken_courses() {
    let directory = FakeDirectory::new(progressing_profile(), wide_catalog())
        .with_records("Fall 2024", vec![record("se-001", 3.0)])
        .failing_term("Spring 2025");
    let service = service(directory);

    let set = service.generate(request("S-200")).await.expect("succeeds");
    assert!(!set.courses.is_empty());
    let ids: Vec<_> = set.courses.iter().map(|scored| scored.course.id.as_str()).collect();
    assert!(!ids.contains(&"SE-001"));
    assert!(!ids.contains(&"AI-000"));
    assert!(!ids.contains(&"ELEC-015"));
    assert!(set.total_credits <= 60.0);
}

#[tokio::test]
async fn previous_term_successes_seed_interests() {
    let directory = FakeDirectory::new(progressing_profile(), wide_catalog())
        .with_records("Fall 2024", vec![record("MATH-002", 3.5), record("SE-001", 0.5)]);
    let service = service(directory);

    let set = service
        .generate(RecommendationRequest {
            previous_term: Some("Fall 2024".to_string()),
            ..request("S-200")
        })
        .await
        .expect("succeeds");

    assert!(set
        .courses
        .iter()
        .any(|scored| scored.course.subdomain_id == "MATH"));
    for scored in &set.courses {
        let expected = if scored.course.subdomain_id == "MATH" { 1.0 } else { 0.1 };
        assert!((scored.interest_alignment_score - expected).abs() < 1e-9);
    }
}

#[tokio::test]
async fn all_terms_reference_uses_every_grade() {
    let mut profile = progressing_profile();
    profile.competencies.insert("SE-900".to_string(), 3.0);
    let service = service(FakeDirectory::new(profile, wide_catalog()));

    let set = service
        .generate(RecommendationRequest {
            previous_term: Some("all".to_string()),
            ..request("S-200")
        })
        .await
        .expect("succeeds");

    let se = set
        .courses
        .iter()
        .find(|scored| scored.course.subdomain_id == "SE")
        .expect("an SE course is selected");
    assert!((se.interest_alignment_score - 1.0).abs() < 1e-9);
}

#[tokio::test]
async fn configured_prefixes_are_never_offered() {
    let config = RecommenderConfig {
        excluded_prefixes: vec!["c 3".to_string()],
        ..RecommenderConfig::default()
    };
    let settings = ServiceSettings::from(&config);
    assert_eq!(settings.excluded_prefixes, vec!["c 3".to_string()]);

    let service = RecommendationService::new(
        Arc::new(FakeDirectory::new(scenario_profile(), scenario_catalog())),
        settings,
    );
    let set = service
        .generate(RecommendationRequest {
            max_credit_load: Some(6.0),
            ..request("S-100")
        })
        .await
        .expect("succeeds");

    let ids: Vec<_> = set.courses.iter().map(|scored| scored.course.id.as_str()).collect();
    assert!(!ids.contains(&"C3"));
    assert!(ids.contains(&"C2"));
}

#[tokio::test]
async fn filters_exclude_courses_and_blend_preferences() {
    let service = service(FakeDirectory::new(scenario_profile(), scenario_catalog()));

    let excluded = service
        .generate(RecommendationRequest {
            max_credit_load: Some(6.0),
            filters: Some(RecommendationFilters {
                exclude_courses: vec!["c 3".to_string()],
                preferred_subdomains: Vec::new(),
            }),
            ..request("S-100")
        })
        .await
        .expect("succeeds");
    assert_eq!(excluded.courses.len(), 1);
    assert_eq!(excluded.status, RecommendationStatus::Partial);

    let preferred = service
        .generate(RecommendationRequest {
            filters: Some(RecommendationFilters {
                exclude_courses: Vec::new(),
                preferred_subdomains: vec!["SE".to_string()],
            }),
            ..request("S-100")
        })
        .await
        .expect("succeeds");
    let c3 = preferred
        .courses
        .iter()
        .find(|scored| scored.course.id == "C3")
        .expect("C3 selected");
    assert!((c3.interest_alignment_score - 0.5).abs() < 1e-9);
}

#[tokio::test]
async fn overload_requests_carry_a_warning() {
    let service = service(FakeDirectory::new(progressing_profile(), wide_catalog()));
    let set = service
        .generate(RecommendationRequest {
            max_credit_load: Some(72.0),
            preset: Some(PolicyPreset::Exploration),
            ..request("S-200")
        })
        .await
        .expect("succeeds");

    assert!(set.warning.is_some());
    assert!(set.total_credits <= 72.0);
    assert_eq!(set.metadata.preset, PolicyPreset::Exploration);
}

#[tokio::test]
async fn retrieval_failures_are_fatal_and_described() {
    let missing = service(FakeDirectory::new(scenario_profile(), scenario_catalog()))
        .generate(request("S-404"))
        .await
        .expect_err("unknown student");
    assert!(missing.is_not_found());
    assert_eq!(missing.to_string(), "failed to fetch student profile for S-404");

    let mut outage = FakeDirectory::new(scenario_profile(), scenario_catalog());
    outage.catalog_outage = true;
    let error = service(outage)
        .generate(request("S-100"))
        .await
        .expect_err("catalog outage");
    assert!(matches!(error, RecommendationError::Catalog { .. }));
    assert!(!error.is_not_found());
    assert_eq!(
        error.to_string(),
        "failed to fetch course catalog for term Fall 2025"
    );
}

#[tokio::test]
async fn malformed_requests_are_rejected() {
    let service = service(FakeDirectory::new(scenario_profile(), scenario_catalog()));

    let blank_term = service
        .generate(RecommendationRequest {
            term: " ".to_string(),
            ..request("S-100")
        })
        .await;
    assert!(matches!(
        blank_term,
        Err(RecommendationError::InvalidRequest(_))
    ));

    let negative_load = service
        .generate(RecommendationRequest {
            max_credit_load: Some(-3.0),
            ..request("S-100")
        })
        .await;
    assert!(matches!(
        negative_load,
        Err(RecommendationError::InvalidRequest(_))
    ));
}
