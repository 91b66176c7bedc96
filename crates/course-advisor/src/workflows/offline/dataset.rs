use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer};
use tracing::warn;

pub const COMPETENCIES_FILE: &str = "competencies.csv";
pub const SIMILARITY_FILE: &str = "similarity.csv";
pub const PREREQUISITES_FILE: &str = "prerequisites.csv";
pub const TRAINING_FILE: &str = "student_train.csv";
pub const TEST_FILE: &str = "student_test.csv";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompetencyMeta {
    pub title: String,
    pub required: bool,
    pub credits: f64,
}

/// One graded competency from a student's training history.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrainingRow {
    pub student_id: String,
    pub competency_code: String,
    pub rating: f64,
    pub grade: f64,
}

/// Tables backing the offline recommender and its accuracy check.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistoricalDataset {
    pub competencies: BTreeMap<String, CompetencyMeta>,
    /// Competency to neighbour to similarity score.
    pub similarity: BTreeMap<String, BTreeMap<String, f64>>,
    pub prerequisites: BTreeMap<String, Vec<String>>,
    pub training: Vec<TrainingRow>,
    /// Held-out competencies each student actually went on to take.
    pub truth: BTreeMap<String, Vec<String>>,
}

impl HistoricalDataset {
    /// Loads the CSV tables from `dir`. Similarity and prerequisite tables are optional.
    pub fn load_dir(dir: &Path) -> Result<Self, DatasetError> {
        let competencies = parse_competencies(open(&dir.join(COMPETENCIES_FILE))?)
            .map_err(|source| DatasetError::csv(COMPETENCIES_FILE, source))?;

        let similarity = match open_optional(&dir.join(SIMILARITY_FILE))? {
            Some(file) => parse_similarity(file)
                .map_err(|source| DatasetError::csv(SIMILARITY_FILE, source))?,
            None => BTreeMap::new(),
        };
        let prerequisites = match open_optional(&dir.join(PREREQUISITES_FILE))? {
            Some(file) => parse_prerequisites(file)
                .map_err(|source| DatasetError::csv(PREREQUISITES_FILE, source))?,
            None => BTreeMap::new(),
        };

        let training = parse_training(open(&dir.join(TRAINING_FILE))?)
            .map_err(|source| DatasetError::csv(TRAINING_FILE, source))?;
        let truth = parse_truth(open(&dir.join(TEST_FILE))?)
            .map_err(|source| DatasetError::csv(TEST_FILE, source))?;

        Ok(Self {
            competencies,
            similarity,
            prerequisites,
            training,
            truth,
        })
    }
}

fn open(path: &Path) -> Result<File, DatasetError> {
    File::open(path).map_err(|source| DatasetError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn open_optional(path: &Path) -> Result<Option<File>, DatasetError> {
    match File::open(path) {
        Ok(file) => Ok(Some(file)),
        Err(error) if error.kind() == io::ErrorKind::NotFound => {
            warn!(path = %path.display(), "optional table missing; using an empty one");
            Ok(None)
        }
        Err(source) => Err(DatasetError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

fn reader<R: Read>(input: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(input)
}

pub(crate) fn parse_competencies<R: Read>(
    input: R,
) -> Result<BTreeMap<String, CompetencyMeta>, csv::Error> {
    let mut out = BTreeMap::new();
    for row in reader(input).deserialize::<CompetencyRow>() {
        let row = row?;
        if row.competency_code.is_empty() {
            continue;
        }
        out.insert(
            row.competency_code,
            CompetencyMeta {
                title: row.title,
                required: row.required,
                credits: row.credits,
            },
        );
    }
    Ok(out)
}

pub(crate) fn parse_similarity<R: Read>(
    input: R,
) -> Result<BTreeMap<String, BTreeMap<String, f64>>, csv::Error> {
    let mut out: BTreeMap<String, BTreeMap<String, f64>> = BTreeMap::new();
    for row in reader(input).deserialize::<SimilarityRow>() {
        let row = row?;
        let Some(score) = row.score else {
            continue;
        };
        out.entry(row.competency_code_1)
            .or_default()
            .insert(row.competency_code_2, score);
    }
    Ok(out)
}

pub(crate) fn parse_prerequisites<R: Read>(
    input: R,
) -> Result<BTreeMap<String, Vec<String>>, csv::Error> {
    let mut out: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for row in reader(input).deserialize::<PrerequisiteRow>() {
        let row = row?;
        out.entry(row.competency_code)
            .or_default()
            .push(row.prerequisite_code);
    }
    Ok(out)
}

pub(crate) fn parse_training<R: Read>(input: R) -> Result<Vec<TrainingRow>, csv::Error> {
    let mut out = Vec::new();
    for row in reader(input).deserialize::<TrainingCsvRow>() {
        let row = row?;
        if row.student_id.is_empty() || row.competency_code.is_empty() {
            continue;
        }
        out.push(TrainingRow {
            student_id: row.student_id,
            competency_code: row.competency_code,
            rating: row.overall_rating,
            grade: row.grade,
        });
    }
    Ok(out)
}

pub(crate) fn parse_truth<R: Read>(input: R) -> Result<BTreeMap<String, Vec<String>>, csv::Error> {
    let mut out: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for row in reader(input).deserialize::<TruthRow>() {
        let row = row?;
        if row.student_id.is_empty() || row.competency_code.is_empty() {
            continue;
        }
        out.entry(row.student_id)
            .or_default()
            .push(row.competency_code);
    }
    Ok(out)
}

#[derive(Debug, Deserialize)]
struct CompetencyRow {
    competency_code: String,
    #[serde(default)]
    title: String,
    #[serde(default, deserialize_with = "lenient_flag")]
    required: bool,
    #[serde(default, deserialize_with = "lenient_number")]
    credits: f64,
}

#[derive(Debug, Deserialize)]
struct SimilarityRow {
    competency_code_1: String,
    competency_code_2: String,
    #[serde(
        alias = "similarity_score",
        alias = "similarity_score_from_content_base",
        alias = "similarity_score_from_topic_modeling",
        default,
        deserialize_with = "optional_number"
    )]
    score: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct PrerequisiteRow {
    competency_code: String,
    prerequisite_code: String,
}

#[derive(Debug, Deserialize)]
struct TrainingCsvRow {
    student_id: String,
    competency_code: String,
    #[serde(alias = "Overall_rating", default, deserialize_with = "lenient_number")]
    overall_rating: f64,
    #[serde(alias = "Grade", default, deserialize_with = "lenient_number")]
    grade: f64,
}

#[derive(Debug, Deserialize)]
struct TruthRow {
    student_id: String,
    competency_code: String,
}

fn optional_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.and_then(|value| value.trim().parse::<f64>().ok()))
}

fn lenient_number<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(optional_number(deserializer)?.unwrap_or(0.0))
}

/// Accepts `true`/`false`, `yes`/`no`, and numbers (non-zero is true).
fn lenient_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?.unwrap_or_default();
    let value = raw.trim().to_ascii_lowercase();
    Ok(match value.as_str() {
        "true" | "yes" | "y" | "t" => true,
        other => other.parse::<f64>().map(|number| number != 0.0).unwrap_or(false),
    })
}

#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("malformed {file}: {source}")]
    Csv {
        file: &'static str,
        #[source]
        source: csv::Error,
    },
    #[error("no training rows to recommend from")]
    EmptyTraining,
}

impl DatasetError {
    fn csv(file: &'static str, source: csv::Error) -> Self {
        Self::Csv { file, source }
    }
}
