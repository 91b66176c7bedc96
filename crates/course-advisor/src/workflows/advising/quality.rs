use std::collections::{BTreeMap, BTreeSet};

use super::domain::{CurriculumRequirements, EvaluationMetrics, ScoredCourse, StudentProfile};
use super::eligibility::check_prerequisites;

/// Coverage, compliance, and progress metrics for a finished selection.
pub fn evaluate(
    selected: &[ScoredCourse],
    profile: &StudentProfile,
    requirements: &CurriculumRequirements,
) -> EvaluationMetrics {
    let missing = requirements.missing_competencies(profile);
    let taught: BTreeSet<&str> = selected
        .iter()
        .flat_map(|scored| scored.course.teaches_competencies.iter())
        .map(String::as_str)
        .collect();

    let skill_coverage = if missing.is_empty() {
        1.0
    } else {
        let covered = missing
            .iter()
            .filter(|competency| taught.contains(competency.as_str()))
            .count();
        covered as f64 / missing.len() as f64
    };

    let prerequisite_compliance = if selected.is_empty() {
        1.0
    } else {
        let compliant = selected
            .iter()
            .filter(|scored| check_prerequisites(&scored.course, profile))
            .count();
        compliant as f64 / selected.len() as f64
    };

    let program_progress_fit = 0.6 * skill_coverage
        + 0.4 * distribution_progress(selected, profile, requirements);

    let goodness_score =
        0.3 * skill_coverage + 0.3 * prerequisite_compliance + 0.4 * program_progress_fit;

    EvaluationMetrics {
        goodness_score: goodness_score.clamp(0.0, 1.0),
        skill_coverage: skill_coverage.clamp(0.0, 1.0),
        prerequisite_compliance: prerequisite_compliance.clamp(0.0, 1.0),
        program_progress_fit: program_progress_fit.clamp(0.0, 1.0),
    }
}

/// Mean gap closure over subdomains with a stated requirement.
fn distribution_progress(
    selected: &[ScoredCourse],
    profile: &StudentProfile,
    requirements: &CurriculumRequirements,
) -> f64 {
    let mut selected_credits: BTreeMap<&str, f64> = BTreeMap::new();
    for scored in selected {
        *selected_credits
            .entry(scored.course.subdomain_id.as_str())
            .or_insert(0.0) += scored.course.credits();
    }

    let closures: Vec<f64> = requirements
        .distribution_requirements
        .iter()
        .filter(|(_, required)| **required > 0.0)
        .map(|(subdomain, required)| {
            let gap = (required - profile.earned_in(subdomain)).max(0.0);
            if gap <= 0.0 {
                return 1.0;
            }
            let credits = selected_credits
                .get(subdomain.as_str())
                .copied()
                .unwrap_or(0.0);
            (credits / gap).min(1.0)
        })
        .collect();

    if closures.is_empty() {
        1.0
    } else {
        closures.iter().sum::<f64>() / closures.len() as f64
    }
}
