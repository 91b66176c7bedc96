use std::collections::BTreeMap;

use super::domain::Course;
use super::identity::normalize_code;

/// Course-code rule table marking which catalog entries are graduation requirements.
///
/// An empty table treats nothing as required.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CurriculumRules {
    required: BTreeMap<String, bool>,
}

impl CurriculumRules {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_flags<I, K>(flags: I) -> Self
    where
        I: IntoIterator<Item = (K, bool)>,
        K: AsRef<str>,
    {
        let required = flags
            .into_iter()
            .map(|(code, required)| (normalize_code(code.as_ref()), required))
            .filter(|(code, _)| !code.is_empty())
            .collect();
        Self { required }
    }

    pub fn is_required(&self, code: &str) -> Option<bool> {
        self.required.get(&normalize_code(code)).copied()
    }

    pub fn len(&self) -> usize {
        self.required.len()
    }

    pub fn is_empty(&self) -> bool {
        self.required.is_empty()
    }

    /// Applies the table to the catalog by code, then id, then identity id. Unlisted courses
    /// keep their directory flags.
    pub fn annotate(&self, catalog: &mut [Course]) {
        if self.is_empty() {
            return;
        }
        for course in catalog.iter_mut() {
            let flag = self
                .is_required(&course.code)
                .or_else(|| self.is_required(&course.id))
                .or_else(|| {
                    course
                        .identity_id
                        .as_deref()
                        .and_then(|identity| self.is_required(identity))
                });
            if let Some(required) = flag {
                course.is_required = required;
                course.is_core = course.is_core || required;
            }
        }
    }
}
