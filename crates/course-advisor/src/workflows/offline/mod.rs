//! Offline competency recommender and its accuracy check against held-out records.
//!
//! A smaller cousin of the advising engine: training rows are scored, the best ones seed a
//! nearest-neighbour candidate pool, and a credit-capped greedy pass picks the final list.

pub mod dataset;

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

pub use dataset::{CompetencyMeta, DatasetError, HistoricalDataset, TrainingRow};

/// Constants of the batch recommender.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BatchPolicy {
    pub grade_weight: f64,
    pub rating_weight: f64,
    pub required_weight: f64,
    /// Training rows scoring at least this form the student's top set.
    pub top_threshold: f64,
    pub neighbours: usize,
    pub credit_cap: f64,
}

impl Default for BatchPolicy {
    fn default() -> Self {
        Self {
            grade_weight: 0.5,
            rating_weight: 0.3,
            required_weight: 0.2,
            top_threshold: 0.8,
            neighbours: 3,
            credit_cap: 60.0,
        }
    }
}

impl BatchPolicy {
    pub fn row_score(&self, row: &TrainingRow, required: bool) -> f64 {
        let required = if required { 1.0 } else { 0.0 };
        (row.grade / 4.0) * self.grade_weight
            + (row.rating / 5.0) * self.rating_weight
            + required * self.required_weight
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentAccuracy {
    pub student_id: String,
    pub expected: usize,
    pub recommended: usize,
    pub correct: usize,
    pub accuracy: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub students: Vec<StudentAccuracy>,
    pub average_accuracy: f64,
}

impl EvaluationReport {
    pub fn accuracy_by_student(&self) -> BTreeMap<String, f64> {
        self.students
            .iter()
            .map(|student| (student.student_id.clone(), student.accuracy))
            .collect()
    }
}

/// Recommended competency codes for every student with training rows.
pub fn recommend_all(
    dataset: &HistoricalDataset,
    policy: &BatchPolicy,
) -> BTreeMap<String, Vec<String>> {
    let mut by_student: BTreeMap<&str, Vec<&TrainingRow>> = BTreeMap::new();
    for row in &dataset.training {
        by_student.entry(row.student_id.as_str()).or_default().push(row);
    }

    by_student
        .into_iter()
        .map(|(student_id, rows)| {
            let picks = recommend_for(&rows, dataset, policy);
            debug!(student_id, recommended = picks.len(), "batch recommendation");
            (student_id.to_string(), picks)
        })
        .collect()
}

/// Recommendations for one student's training rows.
pub fn recommend_for(
    rows: &[&TrainingRow],
    dataset: &HistoricalDataset,
    policy: &BatchPolicy,
) -> Vec<String> {
    let meta = |code: &str| dataset.competencies.get(code).cloned().unwrap_or_default();

    let top: BTreeSet<&str> = rows
        .iter()
        .filter(|row| {
            policy.row_score(row, meta(&row.competency_code).required) >= policy.top_threshold
        })
        .map(|row| row.competency_code.as_str())
        .collect();
    if top.is_empty() {
        return Vec::new();
    }

    let taken: BTreeSet<&str> = rows.iter().map(|row| row.competency_code.as_str()).collect();
    let pool: BTreeSet<&str> = top
        .iter()
        .flat_map(|code| nearest_neighbours(dataset, code, policy.neighbours))
        .collect();

    let mut candidates: Vec<(&str, CompetencyMeta)> = pool
        .into_iter()
        .filter(|code| !taken.contains(code))
        .filter(|code| {
            dataset
                .prerequisites
                .get(*code)
                .map(|required| required.iter().all(|pre| top.contains(pre.as_str())))
                .unwrap_or(true)
        })
        .map(|code| (code, meta(code)))
        .collect();
    candidates.sort_by(|(left_code, left), (right_code, right)| {
        right
            .required
            .cmp(&left.required)
            .then(left.credits.total_cmp(&right.credits))
            .then(left_code.cmp(right_code))
    });

    let mut total = 0.0;
    let mut picks = Vec::new();
    for (code, meta) in candidates {
        if total + meta.credits <= policy.credit_cap {
            total += meta.credits;
            picks.push(code.to_string());
        }
    }
    picks
}

/// The `limit` most similar competencies to `code`, excluding itself.
fn nearest_neighbours<'a>(
    dataset: &'a HistoricalDataset,
    code: &str,
    limit: usize,
) -> Vec<&'a str> {
    let Some(row) = dataset.similarity.get(code) else {
        return Vec::new();
    };
    let mut neighbours: Vec<(&str, f64)> = row
        .iter()
        .filter(|(other, _)| other.as_str() != code)
        .map(|(other, score)| (other.as_str(), *score))
        .collect();
    neighbours.sort_by(|left, right| right.1.total_cmp(&left.1).then(left.0.cmp(right.0)));
    neighbours.into_iter().take(limit).map(|(other, _)| other).collect()
}

/// Replays the recommender and scores it against each held-out student's real choices.
pub fn evaluate_historical(
    dataset: &HistoricalDataset,
    policy: &BatchPolicy,
) -> Result<EvaluationReport, DatasetError> {
    if dataset.training.is_empty() {
        return Err(DatasetError::EmptyTraining);
    }
    let recommendations = recommend_all(dataset, policy);

    let students: Vec<StudentAccuracy> = dataset
        .truth
        .iter()
        .map(|(student_id, truth)| {
            let truth: BTreeSet<&str> = truth.iter().map(|code| code.trim()).collect();
            let recommended = recommendations
                .get(student_id)
                .map(Vec::as_slice)
                .unwrap_or_default();
            let correct = recommended
                .iter()
                .filter(|code| truth.contains(code.trim()))
                .count();
            let accuracy = if truth.is_empty() {
                0.0
            } else {
                correct as f64 / truth.len() as f64
            };
            debug!(
                student_id = student_id.as_str(),
                expected = truth.len(),
                correct,
                accuracy,
                "scored held-out student"
            );
            StudentAccuracy {
                student_id: student_id.clone(),
                expected: truth.len(),
                recommended: recommended.len(),
                correct,
                accuracy,
            }
        })
        .collect();

    let average_accuracy = if students.is_empty() {
        0.0
    } else {
        students.iter().map(|student| student.accuracy).sum::<f64>() / students.len() as f64
    };
    info!(
        students = students.len(),
        average_accuracy, "historical evaluation finished"
    );

    Ok(EvaluationReport {
        students,
        average_accuracy,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(student: &str, code: &str, rating: f64, grade: f64) -> TrainingRow {
        TrainingRow {
            student_id: student.to_string(),
            competency_code: code.to_string(),
            rating,
            grade,
        }
    }

    fn meta(required: bool, credits: f64) -> CompetencyMeta {
        CompetencyMeta {
            title: String::new(),
            required,
            credits,
        }
    }

    fn dataset() -> HistoricalDataset {
        let mut dataset = HistoricalDataset::default();
        dataset.competencies = BTreeMap::from([
            ("A".to_string(), meta(true, 6.0)),
            ("B".to_string(), meta(false, 3.0)),
            ("N1".to_string(), meta(false, 6.0)),
            ("N2".to_string(), meta(true, 12.0)),
            ("N3".to_string(), meta(false, 3.0)),
            ("N4".to_string(), meta(false, 3.0)),
            ("BIG".to_string(), meta(true, 58.0)),
        ]);
        dataset.similarity = BTreeMap::from([(
            "A".to_string(),
            BTreeMap::from([
                ("A".to_string(), 1.0),
                ("N1".to_string(), 0.9),
                ("N2".to_string(), 0.8),
                ("N3".to_string(), 0.7),
                ("N4".to_string(), 0.1),
                ("B".to_string(), 0.95),
            ]),
        )]);
        dataset.prerequisites = BTreeMap::from([("N3".to_string(), vec!["Z".to_string()])]);
        dataset.training = vec![
            row("S1", "A", 4.0, 3.6),
            row("S1", "B", 1.0, 1.0),
            row("S2", "B", 2.0, 2.0),
        ];
        dataset.truth = BTreeMap::from([
            ("S1".to_string(), vec!["N2".to_string(), "N4".to_string()]),
            ("S2".to_string(), vec!["N1".to_string()]),
        ]);
        dataset
    }

    #[test]
    fn row_score_weights_grade_rating_and_requirement() {
        let policy = BatchPolicy::default();
        let score = policy.row_score(&row("S", "A", 4.0, 3.6), true);
        assert!((score - (0.45 + 0.24 + 0.2)).abs() < 1e-9);
    }

    #[test]
    fn neighbours_feed_a_required_first_selection() {
        let dataset = dataset();
        let recommendations = recommend_all(&dataset, &BatchPolicy::default());

        // B was already taken; N3 and N4 are not among the three nearest.
        assert_eq!(recommendations["S1"], vec!["N2".to_string(), "N1".to_string()]);
        assert!(recommendations["S2"].is_empty());
    }

    #[test]
    fn credit_cap_bounds_the_selection() {
        let mut dataset = dataset();
        dataset
            .similarity
            .get_mut("A")
            .unwrap()
            .insert("BIG".to_string(), 0.99);
        let recommendations = recommend_all(&dataset, &BatchPolicy::default());
        assert_eq!(recommendations["S1"], vec!["BIG".to_string()]);
    }

    #[test]
    fn accuracy_is_hits_over_truth() {
        let report = evaluate_historical(&dataset(), &BatchPolicy::default()).unwrap();
        let by_student = report.accuracy_by_student();

        assert_eq!(by_student["S1"], 0.5);
        assert_eq!(by_student["S2"], 0.0);
        assert_eq!(report.average_accuracy, 0.25);
    }

    #[test]
    fn empty_training_is_an_error() {
        let error = evaluate_historical(&HistoricalDataset::default(), &BatchPolicy::default())
            .expect_err("no rows");
        assert!(matches!(error, DatasetError::EmptyTraining));
    }
}
