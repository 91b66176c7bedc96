use std::collections::BTreeSet;

use super::super::domain::{Course, CurriculumRequirements, StudentProfile};

const DEFAULT_INTEREST: f64 = 0.1;
const GAP_CLOSED_SCORE: f64 = 0.2;
const NO_REQUIREMENT_SCORE: f64 = 0.3;

/// Sub-scores and competency lists computed for one candidate.
pub(crate) struct FitSignals {
    pub competency_match: f64,
    pub interest_alignment: f64,
    pub program_progress: f64,
    pub matched: Vec<String>,
    pub missing: Vec<String>,
}

pub(crate) fn score_signals(
    course: &Course,
    profile: &StudentProfile,
    requirements: &CurriculumRequirements,
) -> FitSignals {
    let (competency_match, matched, missing) = competency_match(course, profile);
    FitSignals {
        competency_match,
        interest_alignment: interest_alignment(course, profile),
        program_progress: program_progress(course, profile, requirements),
        matched,
        missing,
    }
}

/// 0.4 prerequisite satisfaction + 0.3 grade match + 0.3 skill-gap fill.
pub(crate) fn competency_match(
    course: &Course,
    profile: &StudentProfile,
) -> (f64, Vec<String>, Vec<String>) {
    let mut matched = Vec::new();
    let mut missing = Vec::new();
    let mut grade_ratios = Vec::new();

    for (competency, minimum) in &course.required_competencies {
        match profile.grade(competency) {
            Some(grade) => {
                matched.push(competency.clone());
                let ratio = if grade >= *minimum || *minimum <= 0.0 {
                    1.0
                } else {
                    (grade / minimum).max(0.0)
                };
                grade_ratios.push(ratio);
            }
            None => missing.push(competency.clone()),
        }
    }

    let required = course.required_competencies.len();
    let prerequisite_satisfaction = if required == 0 {
        1.0
    } else {
        matched.len() as f64 / required as f64
    };
    let grade_match = if grade_ratios.is_empty() {
        1.0
    } else {
        grade_ratios.iter().sum::<f64>() / grade_ratios.len() as f64
    };

    let taught = course.teaches_competencies.len();
    let skill_gap_fill = if taught == 0 {
        0.0
    } else {
        let new_skills = course
            .teaches_competencies
            .iter()
            .filter(|competency| !profile.has_competency(competency))
            .count();
        new_skills as f64 / taught as f64
    };

    let score =
        0.4 * prerequisite_satisfaction + 0.3 * grade_match + 0.3 * skill_gap_fill;
    (score.clamp(0.0, 1.0), matched, missing)
}

pub(crate) fn interest_alignment(course: &Course, profile: &StudentProfile) -> f64 {
    profile
        .interest_weights
        .get(&course.subdomain_id)
        .map(|weight| weight.clamp(0.0, 1.0))
        .unwrap_or(DEFAULT_INTEREST)
}

/// (0.5 competency progress + 0.4 distribution gap + 0.1 credit progress) scaled by urgency.
pub(crate) fn program_progress(
    course: &Course,
    profile: &StudentProfile,
    requirements: &CurriculumRequirements,
) -> f64 {
    let missing = requirements.missing_competencies(profile);
    let competency_progress = taught_fraction(course, &missing);

    let distribution = distribution_gap_score(
        course,
        requirements.required_in(&course.subdomain_id),
        profile.earned_in(&course.subdomain_id),
    );

    let completion = completion_ratio(profile, requirements);
    let credit_progress = 1.0 - completion;
    let urgency = if completion < 0.5 {
        1.2
    } else if completion < 0.75 {
        1.1
    } else {
        1.0
    };

    ((0.5 * competency_progress + 0.4 * distribution + 0.1 * credit_progress) * urgency)
        .clamp(0.0, 1.0)
}

/// Fraction of the outstanding competencies the course teaches; zero when nothing is missing.
pub(crate) fn taught_fraction(course: &Course, missing: &BTreeSet<String>) -> f64 {
    if missing.is_empty() {
        return 0.0;
    }
    let covered = missing
        .iter()
        .filter(|competency| course.teaches_competencies.contains(*competency))
        .count();
    covered as f64 / missing.len() as f64
}

/// How much the course closes its subdomain's remaining credit gap.
pub(crate) fn distribution_gap_score(course: &Course, required: Option<f64>, earned: f64) -> f64 {
    let Some(required) = required else {
        return NO_REQUIREMENT_SCORE;
    };
    let gap = required - earned;
    if gap <= 0.0 {
        return GAP_CLOSED_SCORE;
    }
    let closure = (course.credits() / gap).min(1.0);
    (closure * (gap / required)).clamp(0.0, 1.0)
}

/// Earned share of the degree total. An unknown total counts as complete.
pub(crate) fn completion_ratio(
    profile: &StudentProfile,
    requirements: &CurriculumRequirements,
) -> f64 {
    let required = requirements.total_credits_required;
    if required <= 0.0 {
        return 1.0;
    }
    (profile.total_credits.earned / required).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn course() -> Course {
        Course {
            id: "C1".to_string(),
            code: "AI-1".to_string(),
            credit_hours: 6.0,
            subdomain_id: "AI".to_string(),
            ..Course::default()
        }
    }

    #[test]
    fn empty_requirements_and_teaching_yield_fixed_competency_score() {
        let (score, matched, missing) = competency_match(&course(), &StudentProfile::default());
        assert!((score - 0.7).abs() < 1e-9);
        assert!(matched.is_empty());
        assert!(missing.is_empty());
    }

    #[test]
    fn partial_grades_scale_the_match() {
        let mut course = course();
        course.required_competencies = BTreeMap::from([
            ("A".to_string(), 2.0),
            ("B".to_string(), 4.0),
            ("C".to_string(), 1.0),
        ]);
        course.teaches_competencies = BTreeSet::from(["D".to_string(), "A".to_string()]);
        let profile = StudentProfile {
            competencies: BTreeMap::from([("A".to_string(), 3.0), ("B".to_string(), 2.0)]),
            ..StudentProfile::default()
        };

        let (score, matched, missing) = competency_match(&course, &profile);
        let expected = 0.4 * (2.0 / 3.0) + 0.3 * 0.75 + 0.3 * 0.5;
        assert!((score - expected).abs() < 1e-9);
        assert_eq!(matched, vec!["A".to_string(), "B".to_string()]);
        assert_eq!(missing, vec!["C".to_string()]);
    }

    #[test]
    fn gap_score_follows_requirement_state() {
        let course = course();
        assert_eq!(distribution_gap_score(&course, None, 0.0), 0.3);
        assert_eq!(distribution_gap_score(&course, Some(12.0), 12.0), 0.2);
        assert!((distribution_gap_score(&course, Some(24.0), 12.0) - 0.25).abs() < 1e-9);
        assert!((distribution_gap_score(&course, Some(24.0), 20.0) - 4.0 / 24.0).abs() < 1e-9);
    }

    #[test]
    fn unknown_total_counts_as_complete() {
        let requirements = CurriculumRequirements::default();
        assert_eq!(
            completion_ratio(&StudentProfile::default(), &requirements),
            1.0
        );
    }

    #[test]
    fn interest_defaults_and_clamps() {
        let mut profile = StudentProfile::default();
        assert_eq!(interest_alignment(&course(), &profile), 0.1);
        profile.interest_weights.insert("AI".to_string(), 1.7);
        assert_eq!(interest_alignment(&course(), &profile), 1.0);
    }
}
