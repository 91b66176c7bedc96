mod reason;
pub(crate) mod rules;
mod weights;

pub use weights::ScoringWeights;

use super::domain::{Course, CurriculumRequirements, ScoredCourse, StudentProfile};

/// Stateless scorer applying one weight set to a candidate batch.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FitScorer {
    weights: ScoringWeights,
}

impl FitScorer {
    pub fn new(weights: ScoringWeights) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> ScoringWeights {
        self.weights
    }

    pub fn score(
        &self,
        course: &Course,
        profile: &StudentProfile,
        requirements: &CurriculumRequirements,
    ) -> ScoredCourse {
        let signals = rules::score_signals(course, profile, requirements);
        let fit_score = self.weights.combine(
            signals.competency_match,
            signals.interest_alignment,
            signals.program_progress,
        );
        let reason = reason::explain(
            fit_score,
            signals.interest_alignment,
            signals.program_progress,
            course.subdomain_label(),
        );

        ScoredCourse {
            course: course.clone(),
            fit_score,
            competency_match_score: signals.competency_match,
            interest_alignment_score: signals.interest_alignment,
            program_progress_score: signals.program_progress,
            matched_competencies: signals.matched,
            missing_competencies: signals.missing,
            reason,
        }
    }

    /// Scores every candidate and orders by fit, keeping catalog order among ties.
    pub fn rank(
        &self,
        candidates: &[Course],
        profile: &StudentProfile,
        requirements: &CurriculumRequirements,
    ) -> Vec<ScoredCourse> {
        let mut scored: Vec<ScoredCourse> = candidates
            .iter()
            .map(|course| self.score(course, profile, requirements))
            .collect();
        scored.sort_by(|left, right| right.fit_score.total_cmp(&left.fit_score));
        scored
    }
}

/// Scores one course with the balanced weight set.
pub fn score(
    course: &Course,
    profile: &StudentProfile,
    requirements: &CurriculumRequirements,
) -> ScoredCourse {
    FitScorer::default().score(course, profile, requirements)
}
