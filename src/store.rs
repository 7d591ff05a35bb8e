//! Form state store: the canonical snapshot for the active inspection
//! session, plus versioned persistence to the local data directory.
//!
//! Persistence is deliberately fail-safe rather than data-preserving: a
//! missing, unparseable, or version-mismatched payload is discarded
//! wholesale and the session starts from a default snapshot. Partial
//! migration of answers against a changed item schema could silently record
//! a not-applicable status where the definition disallows it, or misalign
//! item identifiers, so stale data is never loaded.
//!
//! Writes are debounced: each mutation reschedules a deferred persist, so a
//! burst of rapid edits produces one write. The in-memory snapshot remains
//! the source of truth for the session even when a write fails.

use crate::photos::PhotoStore;
use crate::schema::{self, SCHEMA_VERSION};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use thiserror::Error;

/// Quiet interval after the last mutation before a scheduled persist fires.
/// Edits inside this window are the accepted data-loss bound on abrupt
/// termination.
pub const PERSIST_QUIET_INTERVAL: Duration = Duration::from_millis(500);

/// Compliance outcome for one checklist item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    Compliant,
    NonCompliant,
    NotApplicable,
}

impl ItemStatus {
    pub fn label(self) -> &'static str {
        match self {
            ItemStatus::Compliant => "compliant",
            ItemStatus::NonCompliant => "non-compliant",
            ItemStatus::NotApplicable => "not applicable",
        }
    }
}

/// Mutable answer state for one item. `status == None` is the untouched
/// initial state and is excluded from scoring.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemAnswer {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ItemStatus>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub observation: String,
    /// Opaque keys into the photo blob store, in capture order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub photo_refs: Vec<String>,
}

/// Inspection header metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Header {
    /// ISO `YYYY-MM-DD`; defaults to today's UTC civil date.
    pub date: String,
    pub manager: String,
    pub manager_email: String,
    pub auditor: String,
    pub auditor_email: String,
    /// Target-site label (the property under inspection).
    pub property: String,
}

impl Default for Header {
    fn default() -> Self {
        Self {
            date: today_iso(),
            manager: String::new(),
            manager_email: String::new(),
            auditor: String::new(),
            auditor_email: String::new(),
            property: String::new(),
        }
    }
}

fn today_iso() -> String {
    let date = time::OffsetDateTime::now_utc().date();
    format!(
        "{:04}-{:02}-{:02}",
        date.year(),
        u8::from(date.month()),
        date.day()
    )
}

/// The full mutable state of one inspection session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FormSnapshot {
    #[serde(default)]
    pub header: Header,
    /// Keyed by item id; only touched items have entries.
    #[serde(default)]
    pub answers: BTreeMap<String, ItemAnswer>,
    /// Free-form closing comments.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub comments: String,
}

/// Persisted wrapper carrying the schema-version tag alongside the payload.
#[derive(Debug, Serialize, Deserialize)]
struct StoredForm {
    schema_version: u32,
    snapshot: FormSnapshot,
}

/// Mutation-time contract violations. These are rejected before the snapshot
/// changes; they must never reach the scoring engine.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FormError {
    #[error("unknown checklist item `{0}`")]
    UnknownItem(String),
    #[error("item `{0}` does not admit a not-applicable answer")]
    NaNotAllowed(String),
}

/// Filesystem layout of the data directory.
#[derive(Debug, Clone)]
pub struct DataPaths {
    root: PathBuf,
}

impl DataPaths {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn form_path(&self) -> PathBuf {
        self.root.join("form.json")
    }

    pub fn photos_dir(&self) -> PathBuf {
        self.root.join("photos")
    }

    pub fn analysis_path(&self) -> PathBuf {
        self.root.join("analysis.json")
    }
}

/// Deferred-write scheduler: one pending deadline, rescheduled on every
/// mutation, cleared on flush.
#[derive(Debug)]
pub struct PersistScheduler {
    quiet: Duration,
    deadline: Option<Instant>,
}

impl PersistScheduler {
    pub fn new(quiet: Duration) -> Self {
        Self {
            quiet,
            deadline: None,
        }
    }

    /// Schedule (or reschedule) the deferred write relative to `now`.
    pub fn schedule(&mut self, now: Instant) {
        self.deadline = Some(now + self.quiet);
    }

    pub fn pending(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn due(&self, now: Instant) -> bool {
        matches!(self.deadline, Some(deadline) if deadline <= now)
    }

    pub fn clear(&mut self) {
        self.deadline = None;
    }
}

/// Owner of the canonical [`FormSnapshot`] for the active session.
pub struct FormStore {
    paths: DataPaths,
    snapshot: FormSnapshot,
    scheduler: PersistScheduler,
}

impl FormStore {
    /// Load-or-default against the data directory. Incompatible stored data
    /// is discarded (and removed from disk); read failures are logged and
    /// never fatal.
    pub fn open(paths: DataPaths) -> Self {
        let snapshot = load_or_default(&paths);
        Self {
            paths,
            snapshot,
            scheduler: PersistScheduler::new(PERSIST_QUIET_INTERVAL),
        }
    }

    pub fn snapshot(&self) -> &FormSnapshot {
        &self.snapshot
    }

    pub fn paths(&self) -> &DataPaths {
        &self.paths
    }

    /// Record a status (or clear it with `None`). Unknown items and
    /// disallowed not-applicable answers are rejected here, at the point of
    /// mutation.
    pub fn set_status(
        &mut self,
        item_id: &str,
        status: Option<ItemStatus>,
    ) -> Result<(), FormError> {
        let def = schema::find_item(item_id)
            .ok_or_else(|| FormError::UnknownItem(item_id.to_string()))?;
        if status == Some(ItemStatus::NotApplicable) && !def.allow_na {
            return Err(FormError::NaNotAllowed(item_id.to_string()));
        }
        self.update(|snapshot| {
            snapshot.answers.entry(item_id.to_string()).or_default().status = status;
        });
        Ok(())
    }

    pub fn set_observation(&mut self, item_id: &str, text: &str) -> Result<(), FormError> {
        self.require_item(item_id)?;
        self.update(|snapshot| {
            snapshot
                .answers
                .entry(item_id.to_string())
                .or_default()
                .observation = text.to_string();
        });
        Ok(())
    }

    /// Append a photo reference. The 0..3 capture bound is enforced by the
    /// capture front-end, not here.
    pub fn push_photo_ref(&mut self, item_id: &str, key: &str) -> Result<(), FormError> {
        self.require_item(item_id)?;
        self.update(|snapshot| {
            snapshot
                .answers
                .entry(item_id.to_string())
                .or_default()
                .photo_refs
                .push(key.to_string());
        });
        Ok(())
    }

    /// Drop a photo reference; returns whether it was present.
    pub fn remove_photo_ref(&mut self, item_id: &str, key: &str) -> Result<bool, FormError> {
        self.require_item(item_id)?;
        let mut removed = false;
        self.update(|snapshot| {
            if let Some(answer) = snapshot.answers.get_mut(item_id) {
                let before = answer.photo_refs.len();
                answer.photo_refs.retain(|existing| existing != key);
                removed = answer.photo_refs.len() != before;
            }
        });
        Ok(removed)
    }

    pub fn photo_count(&self, item_id: &str) -> usize {
        self.snapshot
            .answers
            .get(item_id)
            .map_or(0, |answer| answer.photo_refs.len())
    }

    pub fn edit_header(&mut self, f: impl FnOnce(&mut Header)) {
        self.update(|snapshot| f(&mut snapshot.header));
    }

    pub fn set_comments(&mut self, text: &str) {
        self.update(|snapshot| snapshot.comments = text.to_string());
    }

    /// Apply a transformation to the snapshot and schedule a persist. The
    /// typed mutators funnel through here; callers using this directly are
    /// responsible for schema validity.
    pub fn update(&mut self, f: impl FnOnce(&mut FormSnapshot)) {
        f(&mut self.snapshot);
        self.scheduler.schedule(Instant::now());
    }

    /// Write the pending snapshot if the quiet interval has elapsed.
    pub fn maybe_persist(&mut self, now: Instant) -> Result<bool> {
        if !self.scheduler.due(now) {
            return Ok(false);
        }
        self.persist()?;
        self.scheduler.clear();
        Ok(true)
    }

    /// Write any pending change unconditionally. Called at teardown so the
    /// debounce window never outlives the process on a clean exit.
    pub fn flush(&mut self) -> Result<()> {
        if self.scheduler.pending() {
            self.persist()?;
            self.scheduler.clear();
        }
        Ok(())
    }

    /// Serialize the full snapshot plus the current schema-version tag.
    /// Atomic: staged in the same directory, then renamed over the target.
    pub fn persist(&self) -> Result<()> {
        let stored = StoredForm {
            schema_version: SCHEMA_VERSION,
            snapshot: self.snapshot.clone(),
        };
        let text = serde_json::to_string_pretty(&stored).context("serialize form snapshot")?;
        let path = self.paths.form_path();
        std::fs::create_dir_all(self.paths.root())
            .with_context(|| format!("create data dir {}", self.paths.root().display()))?;
        let mut staged = tempfile::NamedTempFile::new_in(self.paths.root())
            .context("stage form snapshot")?;
        staged
            .write_all(text.as_bytes())
            .context("write staged form snapshot")?;
        staged
            .persist(&path)
            .map_err(|err| err.error)
            .with_context(|| format!("replace {}", path.display()))?;
        Ok(())
    }

    /// Clear durable storage, cascade-delete every referenced photo blob,
    /// and return the session to a fresh default snapshot.
    pub fn reset(&mut self, photos: &PhotoStore) -> Result<()> {
        for (item_id, answer) in &self.snapshot.answers {
            for key in &answer.photo_refs {
                if let Err(err) = photos.delete(key) {
                    // Orphaned blobs are preferable to a failed reset.
                    tracing::warn!(item = %item_id, key = %key, error = %err, "photo delete failed during reset");
                }
            }
        }
        remove_if_present(&self.paths.form_path())?;
        remove_if_present(&self.paths.analysis_path())?;
        self.snapshot = FormSnapshot::default();
        self.scheduler.clear();
        Ok(())
    }

    fn require_item(&self, item_id: &str) -> Result<(), FormError> {
        if schema::find_item(item_id).is_none() {
            return Err(FormError::UnknownItem(item_id.to_string()));
        }
        Ok(())
    }
}

fn remove_if_present(path: &Path) -> Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err).with_context(|| format!("remove {}", path.display())),
    }
}

fn load_or_default(paths: &DataPaths) -> FormSnapshot {
    let path = paths.form_path();
    let bytes = match std::fs::read(&path) {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return FormSnapshot::default();
        }
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "snapshot read failed; starting fresh");
            return FormSnapshot::default();
        }
    };
    let stored: StoredForm = match serde_json::from_slice(&bytes) {
        Ok(stored) => stored,
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "snapshot unparseable; discarding");
            discard(&path);
            return FormSnapshot::default();
        }
    };
    if stored.schema_version != SCHEMA_VERSION {
        tracing::info!(
            stored = stored.schema_version,
            current = SCHEMA_VERSION,
            "discarding snapshot with incompatible schema version"
        );
        discard(&path);
        return FormSnapshot::default();
    }
    sanitize(stored.snapshot)
}

fn discard(path: &Path) {
    if let Err(err) = std::fs::remove_file(path) {
        tracing::warn!(path = %path.display(), error = %err, "stale snapshot removal failed");
    }
}

/// Drop answers that violate the schema contract. These cannot be produced
/// by the typed mutators, but the payload on disk is editable by hand.
fn sanitize(mut snapshot: FormSnapshot) -> FormSnapshot {
    snapshot.answers.retain(|item_id, answer| {
        let Some(def) = schema::find_item(item_id) else {
            tracing::warn!(item = %item_id, "dropping answer for unknown item");
            return false;
        };
        if answer.status == Some(ItemStatus::NotApplicable) && !def.allow_na {
            tracing::warn!(item = %item_id, "clearing disallowed not-applicable status");
            answer.status = None;
        }
        true
    });
    snapshot
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_paths() -> (tempfile::TempDir, DataPaths) {
        let dir = tempfile::tempdir().expect("create temp dir");
        let paths = DataPaths::new(dir.path().to_path_buf());
        (dir, paths)
    }

    #[test]
    fn persist_then_open_roundtrips_the_snapshot() {
        let (_dir, paths) = temp_paths();
        let mut store = FormStore::open(paths.clone());
        store.set_status("seg_01", Some(ItemStatus::Compliant)).unwrap();
        store.set_status("ase_03", Some(ItemStatus::NotApplicable)).unwrap();
        store.set_observation("seg_01", "logbook missing two weeks").unwrap();
        store.edit_header(|header| {
            header.auditor = "R. Vega".to_string();
            header.property = "Mirador Tower".to_string();
        });
        store.set_comments("follow-up visit next month");
        store.flush().expect("flush");

        let reopened = FormStore::open(paths);
        assert_eq!(reopened.snapshot(), store.snapshot());
    }

    #[test]
    fn stale_version_tag_discards_payload_and_file() {
        let (_dir, paths) = temp_paths();
        std::fs::create_dir_all(paths.root()).unwrap();
        let stale = serde_json::json!({
            "schema_version": SCHEMA_VERSION - 1,
            "snapshot": {
                "header": Header::default(),
                "answers": { "seg_01": { "status": "compliant" } },
                "comments": "from an older release"
            }
        });
        std::fs::write(paths.form_path(), stale.to_string()).unwrap();

        let store = FormStore::open(paths.clone());
        assert_eq!(store.snapshot().answers.len(), 0);
        assert!(store.snapshot().comments.is_empty());
        assert!(
            !paths.form_path().exists(),
            "stale payload must be removed from durable storage"
        );
    }

    #[test]
    fn unparseable_payload_defaults_and_is_discarded() {
        let (_dir, paths) = temp_paths();
        std::fs::create_dir_all(paths.root()).unwrap();
        std::fs::write(paths.form_path(), b"{not-json").unwrap();

        let store = FormStore::open(paths.clone());
        assert_eq!(store.snapshot(), &FormSnapshot::default());
        assert!(!paths.form_path().exists());
    }

    #[test]
    fn missing_file_yields_default_without_creating_one() {
        let (_dir, paths) = temp_paths();
        let store = FormStore::open(paths.clone());
        assert_eq!(store.snapshot(), &FormSnapshot::default());
        assert!(!paths.form_path().exists());
    }

    #[test]
    fn unknown_item_is_rejected_at_mutation_time() {
        let (_dir, paths) = temp_paths();
        let mut store = FormStore::open(paths);
        let err = store
            .set_status("zzz_99", Some(ItemStatus::Compliant))
            .unwrap_err();
        assert_eq!(err, FormError::UnknownItem("zzz_99".to_string()));
        assert!(store.snapshot().answers.is_empty());
    }

    #[test]
    fn disallowed_not_applicable_is_rejected_before_scoring_sees_it() {
        let (_dir, paths) = temp_paths();
        let mut store = FormStore::open(paths);
        // seg_01 has allow_na == false
        let err = store
            .set_status("seg_01", Some(ItemStatus::NotApplicable))
            .unwrap_err();
        assert_eq!(err, FormError::NaNotAllowed("seg_01".to_string()));
        assert!(store.snapshot().answers.is_empty());

        // ase_03 allows it
        store
            .set_status("ase_03", Some(ItemStatus::NotApplicable))
            .unwrap();
    }

    #[test]
    fn hand_edited_payload_is_sanitized_on_load() {
        let (_dir, paths) = temp_paths();
        std::fs::create_dir_all(paths.root()).unwrap();
        let tampered = serde_json::json!({
            "schema_version": SCHEMA_VERSION,
            "snapshot": {
                "header": Header::default(),
                "answers": {
                    "zzz_99": { "status": "compliant" },
                    "seg_01": { "status": "not_applicable", "observation": "kept" }
                }
            }
        });
        std::fs::write(paths.form_path(), tampered.to_string()).unwrap();

        let store = FormStore::open(paths);
        assert!(!store.snapshot().answers.contains_key("zzz_99"));
        let answer = store.snapshot().answers.get("seg_01").expect("kept");
        assert_eq!(answer.status, None);
        assert_eq!(answer.observation, "kept");
    }

    #[test]
    fn scheduler_coalesces_a_burst_of_edits_into_one_deadline() {
        let quiet = Duration::from_millis(500);
        let mut scheduler = PersistScheduler::new(quiet);
        let start = Instant::now();

        scheduler.schedule(start);
        scheduler.schedule(start + Duration::from_millis(100));
        scheduler.schedule(start + Duration::from_millis(200));

        // The earlier deadlines were cancelled by rescheduling.
        assert!(!scheduler.due(start + Duration::from_millis(600)));
        assert!(scheduler.due(start + Duration::from_millis(700)));

        scheduler.clear();
        assert!(!scheduler.pending());
        assert!(!scheduler.due(start + Duration::from_secs(10)));
    }

    #[test]
    fn maybe_persist_only_writes_once_due() {
        let (_dir, paths) = temp_paths();
        let mut store = FormStore::open(paths.clone());
        store.set_status("seg_01", Some(ItemStatus::Compliant)).unwrap();

        let early = Instant::now();
        assert!(!store.maybe_persist(early).expect("maybe_persist"));
        assert!(!paths.form_path().exists());

        let late = early + PERSIST_QUIET_INTERVAL + Duration::from_millis(1);
        assert!(store.maybe_persist(late).expect("maybe_persist"));
        assert!(paths.form_path().exists());
    }

    #[test]
    fn flush_without_pending_changes_writes_nothing() {
        let (_dir, paths) = temp_paths();
        let mut store = FormStore::open(paths.clone());
        store.flush().expect("flush");
        assert!(!paths.form_path().exists());
    }

    #[test]
    fn persisted_file_carries_the_current_version_tag() {
        let (_dir, paths) = temp_paths();
        let mut store = FormStore::open(paths.clone());
        store.set_status("com_01", Some(ItemStatus::NonCompliant)).unwrap();
        store.flush().expect("flush");

        let raw = std::fs::read_to_string(paths.form_path()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["schema_version"], SCHEMA_VERSION);
        assert_eq!(value["snapshot"]["answers"]["com_01"]["status"], "non_compliant");
    }
}
