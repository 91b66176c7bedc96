//! Subdomain interest distributions.
//!
//! Weights come from one of three signals, strongest first: recent successes in a reference
//! term, the completed-course history, or whatever the directory already supplied. Request
//! preferences are blended on top. Every non-empty result sums to 1.

use std::collections::{BTreeMap, HashMap, HashSet};

use super::domain::Course;
use super::identity::{course_keys, normalize_code};

/// Grades strictly above this count as a success when seeding interests.
pub const SUCCESS_GRADE: f64 = 1.0;

const SEED_BOOST: f64 = 5.0;
const DEFAULT_PERFORMANCE: f64 = 0.5;

/// Interest weights from completed-course concentration and performance per subdomain.
pub fn infer_interests<S: AsRef<str>>(
    completed: &[S],
    catalog: &[Course],
    grades: &BTreeMap<String, f64>,
) -> BTreeMap<String, f64> {
    if completed.is_empty() {
        return BTreeMap::new();
    }

    let mut lookup: HashMap<String, usize> = HashMap::new();
    for (index, course) in catalog.iter().enumerate() {
        for key in course_keys(course) {
            lookup.entry(key).or_insert(index);
        }
    }
    let normalized_grades: HashMap<String, f64> = grades
        .iter()
        .map(|(code, grade)| (normalize_code(code), *grade))
        .collect();

    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    let mut graded: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    // Aliases of one catalog course count once; unknown markers only add to the total.
    let mut matched: HashSet<usize> = HashSet::new();
    let mut unmatched: HashSet<String> = HashSet::new();

    for marker in completed {
        let key = normalize_code(marker.as_ref());
        let Some(&index) = lookup.get(&key) else {
            unmatched.insert(key);
            continue;
        };
        if !matched.insert(index) {
            continue;
        }
        let course = &catalog[index];
        let subdomain = course.subdomain_id.as_str();
        *counts.entry(subdomain).or_insert(0) += 1;

        let grade = [key, normalize_code(&course.code), normalize_code(&course.id)]
            .iter()
            .find_map(|candidate| normalized_grades.get(candidate).copied());
        if let Some(grade) = grade {
            graded.entry(subdomain).or_default().push(grade);
        }
    }

    let total = (matched.len() + unmatched.len()) as f64;
    let weights = counts
        .into_iter()
        .map(|(subdomain, count)| {
            let concentration = count as f64 / total;
            let performance = graded
                .get(subdomain)
                .filter(|grades| !grades.is_empty())
                .map(|grades| grades.iter().sum::<f64>() / grades.len() as f64 / 4.0)
                .unwrap_or(DEFAULT_PERFORMANCE);
            (
                subdomain.to_string(),
                0.6 * concentration + 0.4 * performance,
            )
        })
        .collect();

    normalize(weights)
}

/// Codes of competencies graded above [`SUCCESS_GRADE`].
pub fn successful_codes<'a, I>(grades: I) -> Vec<String>
where
    I: IntoIterator<Item = (&'a str, f64)>,
{
    grades
        .into_iter()
        .filter(|(_, grade)| *grade > SUCCESS_GRADE)
        .map(|(code, _)| code.to_string())
        .collect()
}

/// Boosts every subdomain holding a catalog course in the same code family as a success.
pub fn seed_from_recent_success<S: AsRef<str>>(
    successes: &[S],
    catalog: &[Course],
) -> BTreeMap<String, f64> {
    let mut weights: BTreeMap<String, f64> = BTreeMap::new();
    for success in successes {
        let family = code_family(success.as_ref());
        if family.is_empty() {
            continue;
        }
        for course in catalog {
            if code_family(&course.code) == family {
                *weights.entry(course.subdomain_id.clone()).or_insert(0.0) += SEED_BOOST;
            }
        }
    }
    normalize(weights)
}

/// Mixes in an even share for each preferred subdomain.
pub fn blend_preferred<S: AsRef<str>>(
    existing: &BTreeMap<String, f64>,
    preferred: &[S],
) -> BTreeMap<String, f64> {
    let preferred: Vec<&str> = preferred
        .iter()
        .map(|subdomain| subdomain.as_ref().trim())
        .filter(|subdomain| !subdomain.is_empty())
        .collect();
    if preferred.is_empty() {
        return existing.clone();
    }

    let share = 1.0 / preferred.len() as f64;
    let mut uniform: BTreeMap<String, f64> = BTreeMap::new();
    for subdomain in preferred {
        *uniform.entry(subdomain.to_string()).or_insert(0.0) += share;
    }

    let existing = normalize(existing.clone());
    if existing.is_empty() {
        return uniform;
    }

    let mut blended: BTreeMap<String, f64> = existing
        .into_iter()
        .map(|(subdomain, weight)| (subdomain, 0.5 * weight))
        .collect();
    for (subdomain, weight) in uniform {
        *blended.entry(subdomain).or_insert(0.0) += 0.5 * weight;
    }
    normalize(blended)
}

/// Scales weights to sum to 1, dropping non-positive entries.
pub fn normalize(weights: BTreeMap<String, f64>) -> BTreeMap<String, f64> {
    let weights: BTreeMap<String, f64> = weights
        .into_iter()
        .filter(|(_, weight)| weight.is_finite() && *weight > 0.0)
        .collect();
    let sum: f64 = weights.values().sum();
    if sum <= 0.0 {
        return BTreeMap::new();
    }
    weights
        .into_iter()
        .map(|(subdomain, weight)| (subdomain, weight / sum))
        .collect()
}

fn code_family(code: &str) -> String {
    let prefix = code.split('-').next().unwrap_or_default();
    normalize_code(prefix)
}
