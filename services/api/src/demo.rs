use crate::infra::{build_service, load_snapshot};
use clap::Args;
use course_advisor::config::{AppConfig, RecommenderConfig};
use course_advisor::error::AppError;
use course_advisor::telemetry;
use course_advisor::workflows::advising::domain::{
    RecommendationFilters, RecommendationRequest, RecommendationSet,
};
use course_advisor::workflows::advising::{DirectorySnapshot, PolicyPreset};
use course_advisor::workflows::offline::{
    evaluate_historical, BatchPolicy, EvaluationReport, HistoricalDataset,
};
use std::path::PathBuf;
use tracing::info;

const SAMPLE_SNAPSHOT: &str = include_str!("../data/sample_snapshot.json");
const SAMPLE_STUDENT: &str = "S-1001";
const SAMPLE_TERM: &str = "Fall 2025";

#[derive(Args, Debug)]
pub(crate) struct RecommendArgs {
    /// Directory snapshot (JSON) to read profiles and catalogs from
    #[arg(long)]
    pub(crate) snapshot: PathBuf,
    #[arg(long)]
    pub(crate) student_id: String,
    /// Term to plan, as named in the snapshot catalog
    #[arg(long)]
    pub(crate) term: String,
    /// Hard credit ceiling for the set (defaults to the profile, then configuration)
    #[arg(long)]
    pub(crate) max_credit_load: Option<f64>,
    /// Policy preset: standard or exploration
    #[arg(long, value_parser = parse_preset)]
    pub(crate) preset: Option<PolicyPreset>,
    /// Earlier term whose successes seed interests, or ALL
    #[arg(long)]
    pub(crate) previous_term: Option<String>,
    /// Course id or code to leave out (repeatable)
    #[arg(long)]
    pub(crate) exclude: Vec<String>,
    /// Subdomain to favour (repeatable)
    #[arg(long)]
    pub(crate) prefer: Vec<String>,
    /// Print the set as JSON instead of a summary
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Args, Debug)]
pub(crate) struct EvaluateArgs {
    /// Directory holding the competency, similarity, prerequisite, train and test CSV files
    #[arg(long)]
    pub(crate) dataset: PathBuf,
    /// Print the report as JSON instead of a summary
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Policy preset: standard or exploration
    #[arg(long, value_parser = parse_preset)]
    pub(crate) preset: Option<PolicyPreset>,
    /// Seed interests from this sample term (for example "Spring 2025" or ALL)
    #[arg(long)]
    pub(crate) previous_term: Option<String>,
    /// Print the set as JSON instead of a summary
    #[arg(long)]
    pub(crate) json: bool,
}

pub(crate) fn parse_preset(raw: &str) -> Result<PolicyPreset, String> {
    raw.parse::<PolicyPreset>().map_err(|err| err.to_string())
}

pub(crate) fn sample_snapshot() -> Result<DirectorySnapshot, AppError> {
    Ok(DirectorySnapshot::from_json(SAMPLE_SNAPSHOT)?)
}

pub(crate) async fn run_recommend(args: RecommendArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;

    let snapshot = load_snapshot(Some(&args.snapshot))?;
    let filters = (!args.exclude.is_empty() || !args.prefer.is_empty()).then(|| {
        RecommendationFilters {
            exclude_courses: args.exclude,
            preferred_subdomains: args.prefer,
        }
    });
    let request = RecommendationRequest {
        student_id: args.student_id,
        term: args.term,
        max_credit_load: args.max_credit_load,
        filters,
        previous_term: args.previous_term,
        preset: args.preset,
    };

    let set = recommend(&config.recommender, snapshot, request).await?;
    render_set(&set, args.json)
}

pub(crate) fn run_evaluate(args: EvaluateArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;

    let dataset = HistoricalDataset::load_dir(&args.dataset)?;
    info!(
        competencies = dataset.competencies.len(),
        training_rows = dataset.training.len(),
        held_out_students = dataset.truth.len(),
        "dataset loaded"
    );
    let report = evaluate_historical(&dataset, &BatchPolicy::default())?;
    render_report(&report, args.json)
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let request = RecommendationRequest {
        student_id: SAMPLE_STUDENT.to_string(),
        term: SAMPLE_TERM.to_string(),
        previous_term: args.previous_term,
        preset: args.preset,
        ..RecommendationRequest::default()
    };

    if !args.json {
        println!("Course recommendation demo");
        println!("Student {SAMPLE_STUDENT}, planning {SAMPLE_TERM}");
    }
    let set = recommend(&RecommenderConfig::default(), sample_snapshot()?, request).await?;
    render_set(&set, args.json)
}

async fn recommend(
    config: &RecommenderConfig,
    snapshot: DirectorySnapshot,
    request: RecommendationRequest,
) -> Result<RecommendationSet, AppError> {
    let service = build_service(config, snapshot);
    Ok(service.generate(request).await?)
}

fn render_set(set: &RecommendationSet, as_json: bool) -> Result<(), AppError> {
    if as_json {
        let payload = serde_json::to_string_pretty(set)
            .map_err(|err| AppError::Io(std::io::Error::other(err)))?;
        println!("{payload}");
        return Ok(());
    }

    println!(
        "\nRecommended set for {} ({}): {:.1} credits, status {:?}",
        set.student_id, set.term, set.total_credits, set.status
    );
    if let Some(warning) = &set.warning {
        println!("  Warning: {warning}");
    }
    if set.courses.is_empty() {
        println!("  No eligible courses for this term");
    }
    for scored in &set.courses {
        println!(
            "  - {:<10} {:<32} {:>4.1} cr  fit {:.2}  {}",
            scored.course.id,
            scored.course.name,
            scored.course.credits(),
            scored.fit_score,
            scored.reason
        );
    }

    println!("\nDistribution coverage");
    for (subdomain, credits) in &set.distribution_coverage {
        println!("  {subdomain:<8} {credits:>5.1} credits");
    }

    let metrics = &set.metrics;
    println!(
        "\nQuality: goodness {:.2} (skills {:.2}, prerequisites {:.2}, progress {:.2})",
        metrics.goodness_score,
        metrics.skill_coverage,
        metrics.prerequisite_compliance,
        metrics.program_progress_fit
    );
    println!(
        "Algorithm {} ({} preset) in {} ms",
        set.metadata.algorithm_version, set.metadata.preset, set.metadata.processing_time_ms
    );
    Ok(())
}

fn render_report(report: &EvaluationReport, as_json: bool) -> Result<(), AppError> {
    if as_json {
        let payload = serde_json::to_string_pretty(report)
            .map_err(|err| AppError::Io(std::io::Error::other(err)))?;
        println!("{payload}");
        return Ok(());
    }

    println!("Historical accuracy by student");
    for student in &report.students {
        println!(
            "  {:<12} {:>3}/{:<3} correct of {:>3} recommended  accuracy {:.2}",
            student.student_id,
            student.correct,
            student.expected,
            student.recommended,
            student.accuracy
        );
    }
    println!(
        "Average accuracy over {} students: {:.3}",
        report.students.len(),
        report.average_accuracy
    );
    Ok(())
}
