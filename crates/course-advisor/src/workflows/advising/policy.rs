use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::optimizer::SelectionPolicy;
use super::scoring::ScoringWeights;

/// Named combinations of fit weights and selection knobs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyPreset {
    /// Balanced 0.4/0.3/0.3 fit weights with at most 3 courses per subdomain.
    #[default]
    Standard,
    /// Interest-led 0.2/0.6/0.2 fit weights with a relaxed subdomain cap of 10.
    Exploration,
}

impl PolicyPreset {
    pub const fn label(self) -> &'static str {
        match self {
            PolicyPreset::Standard => "standard",
            PolicyPreset::Exploration => "exploration",
        }
    }

    pub fn policy(self) -> RecommendationPolicy {
        match self {
            PolicyPreset::Standard => RecommendationPolicy {
                preset: self,
                weights: ScoringWeights::balanced(),
                selection: SelectionPolicy::standard(),
            },
            PolicyPreset::Exploration => RecommendationPolicy {
                preset: self,
                weights: ScoringWeights::interest_led(),
                selection: SelectionPolicy::relaxed(),
            },
        }
    }
}

impl fmt::Display for PolicyPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for PolicyPreset {
    type Err = PolicyError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "standard" | "balanced" => Ok(Self::Standard),
            "exploration" | "interest_led" | "interest-led" => Ok(Self::Exploration),
            other => Err(PolicyError::UnknownPreset(other.to_string())),
        }
    }
}

/// Weight set and selection knobs applied uniformly to one request's candidate batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationPolicy {
    pub preset: PolicyPreset,
    pub weights: ScoringWeights,
    pub selection: SelectionPolicy,
}

impl Default for RecommendationPolicy {
    fn default() -> Self {
        PolicyPreset::Standard.policy()
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PolicyError {
    #[error("unknown policy preset '{0}'")]
    UnknownPreset(String),
    #[error("fit weights must be non-negative and sum to 1.0 (found {sum:.3})")]
    InvalidWeights { sum: f64 },
}
