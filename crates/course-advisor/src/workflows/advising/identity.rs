//! Alias-aware course identity.
//!
//! A course can surface under its primary id, its human code, a cross-snapshot identity id,
//! or (in term history) only its title. Every comparison goes through the same
//! normalization so the same course never counts as two.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use super::domain::Course;

const NAME_PREFIX: &str = "name:";
const NAME_NOISE: &[&str] = &[
    "basic ",
    "fundamentals of ",
    "introduction to ",
    "advanced ",
    "principles of ",
];

/// Upper-cases a course identifier and strips whitespace and separators.
pub fn normalize_code(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_whitespace() && !matches!(c, '-' | '_' | '.' | '/'))
        .flat_map(char::to_uppercase)
        .collect()
}

/// Title key with level/intro noise words removed, or `None` for blank titles.
pub fn name_key(name: &str) -> Option<String> {
    let mut lowered = name.to_lowercase();
    for noise in NAME_NOISE {
        lowered = lowered.replace(noise, "");
    }
    let cleaned: String = lowered
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect();

    if cleaned.is_empty() {
        None
    } else {
        Some(format!("{NAME_PREFIX}{cleaned}"))
    }
}

/// Every key under which `course` may have been recorded as completed.
pub fn course_keys(course: &Course) -> Vec<String> {
    let mut keys: Vec<String> = [
        Some(course.id.as_str()),
        Some(course.code.as_str()),
        course.identity_id.as_deref(),
    ]
    .into_iter()
    .flatten()
    .map(normalize_code)
    .filter(|key| !key.is_empty())
    .collect();
    keys.extend(name_key(&course.name));
    keys.sort();
    keys.dedup();
    keys
}

/// Alias table mapping course codes and ids onto a shared identity id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IdentityMap {
    aliases: HashMap<String, String>,
}

impl IdentityMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut map = Self::new();
        for (alias, identity) in pairs {
            map.insert(alias.as_ref(), identity);
        }
        map
    }

    pub fn insert(&mut self, alias: &str, identity: impl Into<String>) {
        let key = normalize_code(alias);
        if !key.is_empty() {
            self.aliases.insert(key, identity.into());
        }
    }

    pub fn identity_for(&self, alias: &str) -> Option<&str> {
        self.aliases.get(&normalize_code(alias)).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }

    /// Fills in `identity_id` for catalog entries whose code or id is mapped.
    pub fn annotate(&self, catalog: &mut [Course]) {
        if self.is_empty() {
            return;
        }
        for course in catalog.iter_mut() {
            if course.identity_id.is_some() {
                continue;
            }
            let identity = self
                .identity_for(&course.code)
                .or_else(|| self.identity_for(&course.id));
            if let Some(identity) = identity {
                course.identity_id = Some(identity.to_string());
            }
        }
    }
}

/// Normalized set of completed-course markers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct CompletionIndex {
    keys: BTreeSet<String>,
}

impl CompletionIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a course id, code, or identity id.
    pub fn record(&mut self, marker: &str) {
        let key = normalize_code(marker);
        if !key.is_empty() {
            self.keys.insert(key);
        }
    }

    /// Records `marker` along with the identity it maps to, if any.
    pub fn record_with(&mut self, marker: &str, identities: &IdentityMap) {
        self.record(marker);
        if let Some(identity) = identities.identity_for(marker) {
            self.record(identity);
        }
    }

    pub fn record_name(&mut self, name: &str) {
        if let Some(key) = name_key(name) {
            self.keys.insert(key);
        }
    }

    /// Adds the mapped identity of every recorded code.
    pub fn resolve_identities(&mut self, identities: &IdentityMap) {
        if identities.is_empty() {
            return;
        }
        let mapped: Vec<String> = self
            .codes()
            .filter_map(|key| identities.identity_for(key))
            .map(normalize_code)
            .collect();
        self.keys.extend(mapped);
    }

    pub fn contains(&self, marker: &str) -> bool {
        let key = normalize_code(marker);
        !key.is_empty() && self.keys.contains(&key)
    }

    pub fn contains_course(&self, course: &Course) -> bool {
        course_keys(course)
            .iter()
            .any(|key| self.keys.contains(key))
    }

    pub fn merge(&mut self, other: CompletionIndex) {
        self.keys.extend(other.keys);
    }

    /// Recorded code keys, excluding title keys.
    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.keys
            .iter()
            .filter(|key| !key.starts_with(NAME_PREFIX))
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl<S: AsRef<str>> FromIterator<S> for CompletionIndex {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut index = Self::new();
        for marker in iter {
            index.record(marker.as_ref());
        }
        index
    }
}

impl From<Vec<String>> for CompletionIndex {
    fn from(markers: Vec<String>) -> Self {
        markers.into_iter().collect()
    }
}

impl From<CompletionIndex> for Vec<String> {
    fn from(index: CompletionIndex) -> Self {
        index.keys.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn course(id: &str, code: &str, name: &str) -> Course {
        Course {
            id: id.to_string(),
            code: code.to_string(),
            name: name.to_string(),
            subdomain_id: "AI".to_string(),
            ..Course::default()
        }
    }

    #[test]
    fn normalize_code_ignores_case_whitespace_and_separators() {
        assert_eq!(normalize_code(" ai-101 "), "AI101");
        assert_eq!(normalize_code("Ai_1.01"), "AI101");
        assert_eq!(normalize_code("AI 101"), normalize_code("ai-101"));
        assert_eq!(normalize_code(" - "), "");
    }

    #[test]
    fn name_key_strips_noise_words() {
        assert_eq!(
            name_key("Introduction to Machine Learning"),
            name_key("machine learning!")
        );
        assert_eq!(name_key("Advanced "), None);
    }

    #[test]
    fn completion_matches_any_alias() {
        let identities = IdentityMap::from_pairs([("AI-101", "TPL-9")]);
        let mut completed = CompletionIndex::new();
        completed.record_with("ai 101", &identities);

        let mut renamed = course("c-77", "AI-900", "Neural Systems");
        identities.annotate(std::slice::from_mut(&mut renamed));
        assert!(!completed.contains_course(&renamed));

        renamed.identity_id = Some("tpl9".to_string());
        assert!(completed.contains_course(&renamed));
        assert!(completed.contains("AI101"));
    }

    #[test]
    fn completion_matches_cleaned_titles() {
        let mut completed = CompletionIndex::new();
        completed.record_name("Fundamentals of Data Structures");

        assert!(completed.contains_course(&course("x1", "CS-2", "Data Structures")));
        assert_eq!(completed.codes().count(), 0);
    }

    #[test]
    fn resolve_identities_adds_mapped_keys() {
        let identities = IdentityMap::from_pairs([("SE-110", "ID-SE")]);
        let mut completed: CompletionIndex = ["se110"].into_iter().collect();
        completed.resolve_identities(&identities);

        assert!(completed.contains("ID-SE"));
        assert_eq!(completed.len(), 2);
    }

    #[test]
    fn annotate_keeps_existing_identity() {
        let identities = IdentityMap::from_pairs([("AI-101", "TPL-9")]);
        let mut catalog = vec![course("1", "AI-101", "A"), course("2", "AI-101", "B")];
        catalog[1].identity_id = Some("KEEP".to_string());
        identities.annotate(&mut catalog);

        assert_eq!(catalog[0].identity_id.as_deref(), Some("TPL-9"));
        assert_eq!(catalog[1].identity_id.as_deref(), Some("KEEP"));
    }

    #[test]
    fn completion_index_serializes_as_list() {
        let index: CompletionIndex = serde_json::from_str(r#"["ai-101", "SE 110"]"#).unwrap();
        assert!(index.contains("AI101"));
        let encoded = serde_json::to_string(&index).unwrap();
        assert_eq!(encoded, r#"["AI101","SE110"]"#);
    }
}
