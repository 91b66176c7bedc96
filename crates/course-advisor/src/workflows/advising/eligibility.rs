use serde::Serialize;

use super::domain::{Course, StudentProfile};
use super::identity::{normalize_code, CompletionIndex};

/// Why a catalog entry was dropped before scoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Ineligibility {
    AlreadyCompleted,
    PrerequisitesUnmet,
    Excluded,
    NotOffered,
    ExcludedPrefix,
}

/// Candidate filter for one request.
#[derive(Debug, Clone, Default)]
pub struct EligibilityFilter<'a> {
    excluded: CompletionIndex,
    term: Option<&'a str>,
    excluded_prefixes: Vec<String>,
}

impl<'a> EligibilityFilter<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops the given course ids, codes, or identity ids.
    pub fn excluding<I, S>(mut self, courses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for course in courses {
            self.excluded.record(course.as_ref());
        }
        self
    }

    /// Drops courses tagged for a different term. Untagged courses stay.
    pub fn offered_in(mut self, term: &'a str) -> Self {
        self.term = Some(term);
        self
    }

    pub fn without_prefixes<I, S>(mut self, prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.excluded_prefixes.extend(
            prefixes
                .into_iter()
                .map(|prefix| normalize_code(prefix.as_ref()))
                .filter(|prefix| !prefix.is_empty()),
        );
        self
    }

    pub fn check(&self, course: &Course, profile: &StudentProfile) -> Result<(), Ineligibility> {
        if profile.completed_courses.contains_course(course) {
            return Err(Ineligibility::AlreadyCompleted);
        }
        if !check_prerequisites(course, profile) {
            return Err(Ineligibility::PrerequisitesUnmet);
        }
        if self.excluded.contains_course(course) {
            return Err(Ineligibility::Excluded);
        }
        if let (Some(term), Some(offered)) = (self.term, course.offered_term.as_deref()) {
            if !offered.trim().is_empty() && !offered.trim().eq_ignore_ascii_case(term.trim()) {
                return Err(Ineligibility::NotOffered);
            }
        }
        let code = normalize_code(&course.code);
        if self
            .excluded_prefixes
            .iter()
            .any(|prefix| code.starts_with(prefix.as_str()))
        {
            return Err(Ineligibility::ExcludedPrefix);
        }
        Ok(())
    }

    /// Eligible courses in catalog order.
    pub fn apply(&self, catalog: &[Course], profile: &StudentProfile) -> Vec<Course> {
        catalog
            .iter()
            .filter(|course| self.check(course, profile).is_ok())
            .cloned()
            .collect()
    }
}

/// Removes completed, prerequisite-blocked, and excluded courses, keeping catalog order.
pub fn filter_candidates<S: AsRef<str>>(
    catalog: &[Course],
    profile: &StudentProfile,
    exclude: &[S],
) -> Vec<Course> {
    EligibilityFilter::new()
        .excluding(exclude)
        .apply(catalog, profile)
}

/// Every prerequisite course is completed and every required competency is held at the
/// minimum grade. A competency the student never recorded fails the check.
pub fn check_prerequisites(course: &Course, profile: &StudentProfile) -> bool {
    let courses_done = course
        .prerequisites
        .iter()
        .all(|prerequisite| profile.completed_courses.contains(prerequisite));

    courses_done
        && course
            .required_competencies
            .iter()
            .all(|(competency, minimum)| {
                profile
                    .grade(competency)
                    .map(|grade| grade >= *minimum)
                    .unwrap_or(false)
            })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{BTreeMap, BTreeSet};

    fn profile() -> StudentProfile {
        StudentProfile {
            student_id: "S-1".to_string(),
            competencies: BTreeMap::from([("A".to_string(), 3.0), ("M".to_string(), 1.5)]),
            completed_courses: ["C1"].into_iter().collect(),
            ..StudentProfile::default()
        }
    }

    fn course(id: &str) -> Course {
        Course {
            id: id.to_string(),
            code: id.to_string(),
            credit_hours: 3.0,
            subdomain_id: "AI".to_string(),
            ..Course::default()
        }
    }

    #[test]
    fn prerequisites_require_every_course_and_grade() {
        let profile = profile();
        let mut gated = course("C4");
        gated.prerequisites = BTreeSet::from(["c-1".to_string()]);
        gated.required_competencies = BTreeMap::from([("A".to_string(), 2.0)]);
        assert!(check_prerequisites(&gated, &profile));

        gated.required_competencies.insert("M".to_string(), 2.0);
        assert!(!check_prerequisites(&gated, &profile));

        gated.required_competencies.remove("M");
        gated.required_competencies.insert("Z".to_string(), 0.0);
        assert!(!check_prerequisites(&gated, &profile));
    }

    #[test]
    fn prerequisite_check_is_monotone() {
        let mut profile = profile();
        let mut gated = course("C5");
        gated.prerequisites = BTreeSet::from(["C2".to_string()]);
        gated.required_competencies = BTreeMap::from([("M".to_string(), 2.0)]);
        assert!(!check_prerequisites(&gated, &profile));

        profile.completed_courses.record("C2");
        assert!(!check_prerequisites(&gated, &profile));
        profile.competencies.insert("M".to_string(), 2.5);
        assert!(check_prerequisites(&gated, &profile));

        profile.completed_courses.record("C9");
        profile.competencies.insert("M".to_string(), 4.0);
        profile.competencies.insert("Q".to_string(), 1.0);
        assert!(check_prerequisites(&gated, &profile));
    }

    #[test]
    fn filter_drops_completed_blocked_and_excluded() {
        let profile = profile();
        let mut blocked = course("C3");
        blocked.prerequisites = BTreeSet::from(["C2".to_string()]);
        let catalog = vec![course("C1"), course("C2"), blocked, course("C6")];

        let kept = filter_candidates(&catalog, &profile, &["c 6"]);
        let ids: Vec<_> = kept.iter().map(|course| course.id.as_str()).collect();
        assert_eq!(ids, vec!["C2"]);
    }

    #[test]
    fn filter_reports_term_and_prefix_reasons() {
        let profile = profile();
        let mut spring = course("AI-7");
        spring.offered_term = Some("Spring 2026".to_string());
        let mut fall = course("AI-8");
        fall.offered_term = Some("Fall 2025".to_string());
        let seminar = course("SOF-100");

        let filter = EligibilityFilter::new()
            .offered_in("spring 2026")
            .without_prefixes(["SOF-"]);

        assert_eq!(filter.check(&spring, &profile), Ok(()));
        assert_eq!(filter.check(&fall, &profile), Err(Ineligibility::NotOffered));
        assert_eq!(
            filter.check(&seminar, &profile),
            Err(Ineligibility::ExcludedPrefix)
        );
        assert_eq!(
            filter.check(&course("C1"), &profile),
            Err(Ineligibility::AlreadyCompleted)
        );
    }
}
