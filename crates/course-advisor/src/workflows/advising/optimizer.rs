//! Credit-constrained greedy set selection.
//!
//! Selection runs in three passes over the ranked candidates: graduation-priority picks,
//! a diversity-capped marginal-value fill, and a credit-floor top-up that ignores diversity.
//! Every pass checks the hard credit ceiling, so the selected total never exceeds it.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use serde::{Deserialize, Serialize};

use super::domain::{CurriculumRequirements, ScoredCourse, StudentProfile};
use super::identity::{course_keys, normalize_code};
use super::scoring::rules::distribution_gap_score;

/// Tunable knobs of the selection passes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SelectionPolicy {
    /// Courses Phase 1 may take for outstanding graduation requirements.
    pub priority_slots: usize,
    /// Maximum selected courses per subdomain during the fill pass.
    pub diversity_cap: usize,
    /// Credits below which the top-up pass runs.
    pub credit_floor: f64,
    /// Upper bound applied to the requested credit target.
    pub target_cap: f64,
    /// Acceptance threshold at zero credits; relaxes linearly to 0 at the target.
    pub threshold_base: f64,
    /// New competencies beyond this count add no marginal value.
    pub new_competency_cap: usize,
}

impl SelectionPolicy {
    pub const fn standard() -> Self {
        Self {
            priority_slots: 3,
            diversity_cap: 3,
            credit_floor: 36.0,
            target_cap: 60.0,
            threshold_base: 0.5,
            new_competency_cap: 5,
        }
    }

    pub const fn relaxed() -> Self {
        Self {
            diversity_cap: 10,
            ..Self::standard()
        }
    }

    pub fn acceptance_threshold(&self, credits_so_far: f64, target: f64) -> f64 {
        if target <= 0.0 {
            return 0.0;
        }
        (self.threshold_base * (1.0 - credits_so_far / target)).max(0.0)
    }
}

impl Default for SelectionPolicy {
    fn default() -> Self {
        Self::standard()
    }
}

/// Running state shared by the three passes.
struct Selection<'a> {
    picked: Vec<&'a ScoredCourse>,
    keys: HashSet<String>,
    per_subdomain: BTreeMap<&'a str, usize>,
    credits_by_subdomain: BTreeMap<&'a str, f64>,
    known_competencies: BTreeSet<&'a str>,
    total: f64,
}

impl<'a> Selection<'a> {
    fn new(profile: &'a StudentProfile) -> Self {
        Self {
            picked: Vec::new(),
            keys: HashSet::new(),
            per_subdomain: BTreeMap::new(),
            credits_by_subdomain: BTreeMap::new(),
            known_competencies: profile.competencies.keys().map(String::as_str).collect(),
            total: 0.0,
        }
    }

    fn contains(&self, candidate: &ScoredCourse) -> bool {
        course_keys(&candidate.course)
            .iter()
            .any(|key| self.keys.contains(key))
    }

    fn fits(&self, candidate: &ScoredCourse, limit: f64) -> bool {
        self.total + candidate.course.credits() <= limit
    }

    fn subdomain_count(&self, subdomain: &str) -> usize {
        self.per_subdomain.get(subdomain).copied().unwrap_or(0)
    }

    fn new_competencies(&self, candidate: &ScoredCourse) -> usize {
        candidate
            .course
            .teaches_competencies
            .iter()
            .filter(|competency| !self.known_competencies.contains(competency.as_str()))
            .count()
    }

    fn take(&mut self, candidate: &'a ScoredCourse) {
        let course = &candidate.course;
        self.keys.extend(course_keys(course));
        *self
            .per_subdomain
            .entry(course.subdomain_id.as_str())
            .or_insert(0) += 1;
        *self
            .credits_by_subdomain
            .entry(course.subdomain_id.as_str())
            .or_insert(0.0) += course.credits();
        self.known_competencies.extend(
            course
                .teaches_competencies
                .iter()
                .map(String::as_str),
        );
        self.total += course.credits();
        self.picked.push(candidate);
    }
}

/// Whether a course answers an outstanding graduation requirement.
fn satisfies_requirement(candidate: &ScoredCourse, missing: &BTreeSet<String>) -> bool {
    let course = &candidate.course;
    if course.is_required {
        return true;
    }
    if missing.is_empty() {
        return false;
    }
    let missing_codes: BTreeSet<String> = missing.iter().map(|code| normalize_code(code)).collect();
    missing_codes.contains(&normalize_code(&course.code))
        || missing_codes.contains(&normalize_code(&course.id))
        || course
            .teaches_competencies
            .iter()
            .any(|competency| missing.contains(competency))
}

/// Selects courses from `ranked` (fit-descending) without exceeding `hard_max_credit_load`.
pub fn optimize(
    ranked: &[ScoredCourse],
    profile: &StudentProfile,
    requirements: &CurriculumRequirements,
    target_credit_load: f64,
    hard_max_credit_load: f64,
    policy: &SelectionPolicy,
) -> Vec<ScoredCourse> {
    let hard_max = if hard_max_credit_load.is_finite() {
        hard_max_credit_load.max(0.0)
    } else {
        0.0
    };
    let target = if target_credit_load.is_finite() {
        target_credit_load.clamp(0.0, hard_max)
    } else {
        hard_max
    };

    let missing = requirements.missing_competencies(profile);
    let mut selection = Selection::new(profile);

    for candidate in ranked {
        if selection.picked.len() >= policy.priority_slots {
            break;
        }
        if !satisfies_requirement(candidate, &missing)
            || selection.contains(candidate)
            || !selection.fits(candidate, target)
        {
            continue;
        }
        selection.take(candidate);
    }

    for candidate in ranked {
        if selection.total >= target {
            break;
        }
        if selection.contains(candidate) || !selection.fits(candidate, target) {
            continue;
        }
        let subdomain = candidate.course.subdomain_id.as_str();
        if selection.subdomain_count(subdomain) >= policy.diversity_cap {
            continue;
        }

        let new_competencies = selection
            .new_competencies(candidate)
            .min(policy.new_competency_cap);
        let novelty = if policy.new_competency_cap == 0 {
            0.0
        } else {
            new_competencies as f64 / policy.new_competency_cap as f64
        };
        let running = profile.earned_in(subdomain)
            + selection
                .credits_by_subdomain
                .get(subdomain)
                .copied()
                .unwrap_or(0.0);
        let relief =
            distribution_gap_score(&candidate.course, requirements.required_in(subdomain), running);
        let marginal = 0.3 * novelty + 0.3 * relief + 0.4 * candidate.fit_score;

        if marginal >= policy.acceptance_threshold(selection.total, target) {
            selection.take(candidate);
        }
    }

    if selection.total < policy.credit_floor {
        for candidate in ranked {
            if selection.total >= policy.credit_floor {
                break;
            }
            if selection.contains(candidate) || !selection.fits(candidate, hard_max) {
                continue;
            }
            selection.take(candidate);
        }
    }

    selection.picked.into_iter().cloned().collect()
}

/// Summed credits of a selection.
pub fn total_credits(selected: &[ScoredCourse]) -> f64 {
    selected.iter().map(|scored| scored.course.credits()).sum()
}

/// Selected credits per subdomain.
pub fn distribution_coverage(selected: &[ScoredCourse]) -> BTreeMap<String, f64> {
    let mut coverage = BTreeMap::new();
    for scored in selected {
        *coverage
            .entry(scored.course.subdomain_id.clone())
            .or_insert(0.0) += scored.course.credits();
    }
    coverage
}
