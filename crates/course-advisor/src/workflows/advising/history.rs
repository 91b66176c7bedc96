use std::collections::BTreeSet;
use std::sync::Arc;

use tokio::sync::{mpsc, Semaphore};
use tracing::{debug, warn};

use super::directory::{AcademicDirectory, DirectoryError, TermRecord};
use super::domain::StudentProfile;
use super::identity::{CompletionIndex, IdentityMap};

/// Completion index built from the profile plus every recorded term transcript.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistorySummary {
    pub completed: CompletionIndex,
    pub terms_scanned: usize,
    pub terms_failed: Vec<String>,
}

/// Fetches each recorded term's transcript concurrently and merges the results.
///
/// At most `fan_out` fetches run at once. Every task reports through one channel and a
/// single loop owns the index, so no lock guards the merge. A failed term is logged and
/// skipped.
pub async fn aggregate_history<D>(
    directory: Arc<D>,
    profile: &StudentProfile,
    identities: &IdentityMap,
    fan_out: usize,
) -> HistorySummary
where
    D: AcademicDirectory + 'static,
{
    let mut completed = profile.completed_courses.clone();
    completed.resolve_identities(identities);

    let terms: BTreeSet<String> = profile
        .course_terms
        .values()
        .map(|term| term.trim())
        .filter(|term| !term.is_empty())
        .map(str::to_string)
        .collect();
    if terms.is_empty() {
        return HistorySummary {
            completed,
            ..HistorySummary::default()
        };
    }

    let permits = Arc::new(Semaphore::new(fan_out.max(1)));
    let (tx, mut rx) = mpsc::channel::<(String, Result<Vec<TermRecord>, DirectoryError>)>(
        terms.len(),
    );

    for term in &terms {
        let directory = Arc::clone(&directory);
        let permits = Arc::clone(&permits);
        let tx = tx.clone();
        let student_id = profile.student_id.clone();
        let term = term.clone();
        tokio::spawn(async move {
            let outcome = match permits.acquire_owned().await {
                Ok(_permit) => directory.term_records(&student_id, &term).await,
                Err(_) => Err(DirectoryError::Unavailable(
                    "history fan-out closed".to_string(),
                )),
            };
            let _ = tx.send((term, outcome)).await;
        });
    }
    drop(tx);

    let mut summary = HistorySummary {
        completed,
        ..HistorySummary::default()
    };
    while let Some((term, outcome)) = rx.recv().await {
        match outcome {
            Ok(records) => {
                debug!(%term, records = records.len(), "merged term history");
                for record in &records {
                    merge_record(&mut summary.completed, record, identities);
                }
                summary.terms_scanned += 1;
            }
            Err(error) => {
                warn!(%term, %error, "skipping term history");
                summary.terms_failed.push(term);
            }
        }
    }
    summary.terms_failed.sort();
    summary
}

fn merge_record(completed: &mut CompletionIndex, record: &TermRecord, identities: &IdentityMap) {
    completed.record_with(&record.course_code, identities);
    if let Some(competency) = &record.competency_id {
        completed.record_with(competency, identities);
    }
    if let Some(identity) = &record.identity_id {
        completed.record(identity);
    }
    if let Some(name) = &record.course_name {
        completed.record_name(name);
    }
}
