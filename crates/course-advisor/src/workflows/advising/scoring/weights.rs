use serde::{Deserialize, Serialize};

use super::super::policy::PolicyError;

const WEIGHT_TOLERANCE: f64 = 1e-6;

/// Fit weights applied to every candidate of one request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringWeights {
    pub competency: f64,
    pub interest: f64,
    pub progress: f64,
}

impl ScoringWeights {
    /// Rejects negative weights and sets that do not sum to 1.
    pub fn new(competency: f64, interest: f64, progress: f64) -> Result<Self, PolicyError> {
        let sum = competency + interest + progress;
        let all_valid = [competency, interest, progress]
            .iter()
            .all(|weight| weight.is_finite() && *weight >= 0.0);
        if !all_valid || (sum - 1.0).abs() > WEIGHT_TOLERANCE {
            return Err(PolicyError::InvalidWeights { sum });
        }
        Ok(Self {
            competency,
            interest,
            progress,
        })
    }

    pub const fn balanced() -> Self {
        Self {
            competency: 0.4,
            interest: 0.3,
            progress: 0.3,
        }
    }

    pub const fn interest_led() -> Self {
        Self {
            competency: 0.2,
            interest: 0.6,
            progress: 0.2,
        }
    }

    pub fn combine(&self, competency: f64, interest: f64, progress: f64) -> f64 {
        let fit = self.competency * competency + self.interest * interest + self.progress * progress;
        fit.clamp(0.0, 1.0)
    }
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self::balanced()
    }
}
