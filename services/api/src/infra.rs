use course_advisor::config::RecommenderConfig;
use course_advisor::error::AppError;
use course_advisor::workflows::advising::{
    CurriculumRules, DirectorySnapshot, IdentityMap, RecommendationService, ServiceSettings,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Reads the directory snapshot. No configured path yields an empty directory.
pub(crate) fn load_snapshot(path: Option<&Path>) -> Result<DirectorySnapshot, AppError> {
    let Some(path) = path else {
        warn!("no directory snapshot configured; every lookup will miss");
        return Ok(DirectorySnapshot::default());
    };

    let raw = std::fs::read_to_string(path)?;
    let snapshot = DirectorySnapshot::from_json(&raw)?;
    info!(
        path = %path.display(),
        profiles = snapshot.profiles.len(),
        catalogs = snapshot.catalogs.len(),
        "directory snapshot loaded"
    );
    Ok(snapshot)
}

/// Alias table from a JSON object of alias to identity id. Unreadable files fall back to empty.
pub(crate) fn load_identity_map(path: Option<&Path>) -> IdentityMap {
    match path.map(read_json_object::<String>).transpose() {
        Ok(Some(pairs)) => IdentityMap::from_pairs(pairs),
        Ok(None) => IdentityMap::default(),
        Err(reason) => {
            warn!(%reason, "identity map unavailable; course aliases will not be merged");
            IdentityMap::default()
        }
    }
}

/// Required-course flags from a JSON object of course code to bool. Falls back to empty.
pub(crate) fn load_curriculum_rules(path: Option<&Path>) -> CurriculumRules {
    match path.map(read_json_object::<bool>).transpose() {
        Ok(Some(flags)) => CurriculumRules::from_flags(flags),
        Ok(None) => CurriculumRules::default(),
        Err(reason) => {
            warn!(%reason, "curriculum rules unavailable; no course is flagged as required");
            CurriculumRules::default()
        }
    }
}

fn read_json_object<T>(path: &Path) -> Result<BTreeMap<String, T>, String>
where
    T: serde::de::DeserializeOwned,
{
    let raw = std::fs::read_to_string(path)
        .map_err(|err| format!("cannot read {}: {err}", path.display()))?;
    serde_json::from_str(&raw).map_err(|err| format!("malformed {}: {err}", path.display()))
}

pub(crate) fn build_service(
    config: &RecommenderConfig,
    snapshot: DirectorySnapshot,
) -> RecommendationService<DirectorySnapshot> {
    let identities = load_identity_map(config.identity_map.as_deref());
    let rules = load_curriculum_rules(config.curriculum_rules.as_deref());
    info!(
        identities = identities.len(),
        rules = rules.len(),
        preset = %config.preset,
        "recommendation service configured"
    );
    RecommendationService::with_tables(
        Arc::new(snapshot),
        identities,
        rules,
        ServiceSettings::from(config),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_file(dir: &tempfile::TempDir, name: &str, contents: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, contents).expect("scratch file written");
        path
    }

    #[test]
    fn missing_tables_fall_back_to_empty() {
        let missing = Path::new("/nonexistent/course-advisor/identities.json");
        assert!(load_identity_map(Some(missing)).is_empty());
        assert!(load_curriculum_rules(Some(missing)).is_empty());
        assert!(load_identity_map(None).is_empty());
    }

    #[test]
    fn tables_load_from_json_objects() {
        let dir = tempfile::tempdir().expect("temp dir");
        let identities = scratch_file(
            &dir,
            "identities.json",
            r#"{"CS-101": "intro-cs", "COMP 101": "intro-cs"}"#,
        );
        let rules = scratch_file(&dir, "rules.json", r#"{"CS-101": true, "ART-200": false}"#);

        let map = load_identity_map(Some(&identities));
        assert_eq!(map.identity_for("cs101"), Some("intro-cs"));
        let rules = load_curriculum_rules(Some(&rules));
        assert_eq!(rules.is_required("CS 101"), Some(true));
        assert_eq!(rules.is_required("ART-200"), Some(false));
    }

    #[test]
    fn malformed_snapshot_is_an_error() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = scratch_file(&dir, "broken-snapshot.json", "{ not json");
        assert!(matches!(
            load_snapshot(Some(&path)),
            Err(AppError::Snapshot(_))
        ));
        assert!(load_snapshot(None).expect("empty snapshot").profiles.is_empty());
    }
}
