//! Per-directory caption store: the `alt-text.json` file.
//!
//! One store file sits next to the images it describes. It is a single flat
//! JSON object so that static-site templates can consume it directly:
//!
//! ```json
//! {
//!   "_generated_by": "img2alt",
//!   "001-first-look.jpg": { "status": "ok", "text": "Couple laughs..." },
//!   "002-portraits.jpg": { "status": "error", "kind": "transport",
//!                          "message": "request timed out after 60s" }
//! }
//! ```
//!
//! Two kinds of keys share the object:
//!
//! * **Image records** — filename → [`CaptionRecord`]. The current form is an
//!   object with a `status` discriminant; older stores hold bare strings
//!   where a failure is marked by an `Error:` prefix. Both forms are read;
//!   legacy values are preserved byte-for-byte until the image is
//!   re-attempted, at which point the record is rewritten in the current
//!   form.
//! * **Metadata** — any key starting with `_` is opaque to this crate and is
//!   carried through every load/persist cycle unchanged.
//!
//! Persistence is atomic (write `alt-text.json.tmp`, then rename) and happens
//! after every single image, so a crash can lose at most the image in flight.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::de::Error as _;
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::error::{CaptionFailure, FailureKind, Img2AltError};

/// File name of the caption store inside each content directory.
pub const STORE_FILE_NAME: &str = "alt-text.json";

/// Prefix marking a legacy string record as a failure.
pub const LEGACY_ERROR_MARKER: &str = "Error:";

/// Keys starting with this prefix are metadata, not image records.
pub const METADATA_PREFIX: char = '_';

/// Current on-disk record form: an object tagged by `status`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status")]
pub enum TaggedCaption {
    /// A usable caption.
    #[serde(rename = "ok")]
    Ok { text: String },
    /// A recorded failure; re-attempted on the next run.
    #[serde(rename = "error")]
    Error { kind: FailureKind, message: String },
}

/// One entry in a caption store, keyed by image filename.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CaptionRecord {
    /// Current form, written by this crate.
    Tagged(TaggedCaption),
    /// Legacy form: a bare string. A failure iff it starts with
    /// [`LEGACY_ERROR_MARKER`], otherwise a caption.
    Legacy(String),
}

impl CaptionRecord {
    /// A successful caption in the current form.
    pub fn caption(text: impl Into<String>) -> Self {
        CaptionRecord::Tagged(TaggedCaption::Ok { text: text.into() })
    }

    /// A recorded failure in the current form.
    pub fn failure(failure: CaptionFailure) -> Self {
        CaptionRecord::Tagged(TaggedCaption::Error {
            kind: failure.kind,
            message: failure.message,
        })
    }

    /// True when this record marks a failed attempt.
    pub fn is_failure(&self) -> bool {
        match self {
            CaptionRecord::Tagged(TaggedCaption::Error { .. }) => true,
            CaptionRecord::Tagged(TaggedCaption::Ok { .. }) => false,
            CaptionRecord::Legacy(s) => s.starts_with(LEGACY_ERROR_MARKER),
        }
    }

    /// The caption text, if this record holds one.
    pub fn caption_text(&self) -> Option<&str> {
        match self {
            CaptionRecord::Tagged(TaggedCaption::Ok { text }) => Some(text),
            CaptionRecord::Tagged(TaggedCaption::Error { .. }) => None,
            CaptionRecord::Legacy(s) if !self.is_failure() => Some(s),
            CaptionRecord::Legacy(_) => None,
        }
    }
}

/// In-memory view of one directory's `alt-text.json`.
///
/// Loaded once per directory pass, mutated after each image attempt, and
/// persisted immediately after each mutation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CaptionStore {
    metadata: BTreeMap<String, Value>,
    records: BTreeMap<String, CaptionRecord>,
}

impl CaptionStore {
    /// Path of the store file inside `dir`.
    pub fn store_path(dir: &Path) -> PathBuf {
        dir.join(STORE_FILE_NAME)
    }

    /// Load the store for `dir`, or an empty store when no file exists yet.
    ///
    /// # Errors
    /// [`Img2AltError::StoreParse`] when the file exists but is not a JSON
    /// object in a known shape. Callers treat this as fatal for the
    /// directory, not the run.
    pub async fn load(dir: &Path) -> Result<Self, Img2AltError> {
        let path = Self::store_path(dir);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(Img2AltError::StoreRead { path, source: e }),
        };
        serde_json::from_slice(&bytes).map_err(|e| Img2AltError::StoreParse {
            path,
            detail: e.to_string(),
        })
    }

    /// Rewrite the store file for `dir` atomically (temp file + rename).
    pub async fn persist(&self, dir: &Path) -> Result<(), Img2AltError> {
        let path = Self::store_path(dir);
        let json = serde_json::to_vec_pretty(self)
            .map_err(|e| Img2AltError::Internal(format!("serialising caption store: {e}")))?;

        let tmp_path = path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, &json)
            .await
            .map_err(|e| Img2AltError::StoreWrite {
                path: path.clone(),
                source: e,
            })?;
        tokio::fs::rename(&tmp_path, &path)
            .await
            .map_err(|e| Img2AltError::StoreWrite { path, source: e })?;
        Ok(())
    }

    pub fn get(&self, filename: &str) -> Option<&CaptionRecord> {
        self.records.get(filename)
    }

    /// True when `filename` already has a non-failure record.
    ///
    /// Resolved images are skipped on resume; failures and absent entries
    /// are (re-)attempted.
    pub fn is_resolved(&self, filename: &str) -> bool {
        self.records
            .get(filename)
            .is_some_and(|record| !record.is_failure())
    }

    pub fn put(&mut self, filename: impl Into<String>, record: CaptionRecord) {
        self.records.insert(filename.into(), record);
    }

    pub fn put_caption(&mut self, filename: impl Into<String>, text: impl Into<String>) {
        self.put(filename, CaptionRecord::caption(text));
    }

    pub fn put_failure(&mut self, filename: impl Into<String>, failure: CaptionFailure) {
        self.put(filename, CaptionRecord::failure(failure));
    }

    /// Number of image records (metadata keys excluded).
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Image records in filename order.
    pub fn records(&self) -> impl Iterator<Item = (&str, &CaptionRecord)> {
        self.records.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Opaque `_`-prefixed entries, carried through unchanged.
    pub fn metadata(&self) -> &BTreeMap<String, Value> {
        &self.metadata
    }

    /// Insert a metadata entry. The key must start with `_`.
    pub fn set_metadata(&mut self, key: impl Into<String>, value: Value) {
        let key = key.into();
        debug_assert!(key.starts_with(METADATA_PREFIX));
        self.metadata.insert(key, value);
    }
}

// Metadata keys are written first so that human readers see provenance
// fields at the top of the file regardless of filename sort order.
impl Serialize for CaptionStore {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.metadata.len() + self.records.len()))?;
        for (key, value) in &self.metadata {
            map.serialize_entry(key, value)?;
        }
        for (key, record) in &self.records {
            map.serialize_entry(key, record)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for CaptionStore {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = BTreeMap::<String, Value>::deserialize(deserializer)?;
        let mut store = CaptionStore::default();
        for (key, value) in raw {
            if key.starts_with(METADATA_PREFIX) {
                store.metadata.insert(key, value);
            } else {
                let record = serde_json::from_value(value)
                    .map_err(|e| D::Error::custom(format!("record '{key}': {e}")))?;
                store.records.insert(key, record);
            }
        }
        Ok(store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn tagged_records_round_trip() {
        let mut store = CaptionStore::default();
        store.put_caption("a.jpg", "Couple walks along the pier.");
        store.put_failure("b.jpg", CaptionFailure::api("HTTP 500"));

        let json = serde_json::to_string_pretty(&store).unwrap();
        let back: CaptionStore = serde_json::from_str(&json).unwrap();
        assert_eq!(store, back);
        assert!(back.is_resolved("a.jpg"));
        assert!(!back.is_resolved("b.jpg"));
    }

    #[test]
    fn legacy_string_is_a_caption() {
        let json = r#"{"a.jpg": "A couple under string lights."}"#;
        let store: CaptionStore = serde_json::from_str(json).unwrap();
        assert!(store.is_resolved("a.jpg"));
        assert_eq!(
            store.get("a.jpg").unwrap().caption_text(),
            Some("A couple under string lights.")
        );
    }

    #[test]
    fn legacy_error_string_is_a_failure() {
        let json = r#"{"a.jpg": "Error: connection refused"}"#;
        let store: CaptionStore = serde_json::from_str(json).unwrap();
        assert!(!store.is_resolved("a.jpg"));
        assert!(store.get("a.jpg").unwrap().is_failure());
        assert_eq!(store.get("a.jpg").unwrap().caption_text(), None);
    }

    #[test]
    fn legacy_values_survive_rewrite_verbatim() {
        let json = r#"{"a.jpg": "A couple under string lights."}"#;
        let store: CaptionStore = serde_json::from_str(json).unwrap();
        let rewritten = serde_json::to_string(&store).unwrap();
        assert!(rewritten.contains(r#""a.jpg":"A couple under string lights.""#));
    }

    #[test]
    fn metadata_passes_through_untouched() {
        let json = r#"{
            "_generated_by": "img2alt",
            "_model": {"name": "qwen/qwen3-vl-8b", "pass": 2},
            "a.jpg": {"status": "ok", "text": "x"}
        }"#;
        let store: CaptionStore = serde_json::from_str(json).unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.metadata().len(), 2);

        let back: CaptionStore = serde_json::from_str(&serde_json::to_string(&store).unwrap()).unwrap();
        assert_eq!(store, back);
    }

    #[test]
    fn metadata_serialised_before_records() {
        let mut store = CaptionStore::default();
        store.put_caption("001.jpg", "x");
        store.set_metadata("_note", Value::String("hand edited".into()));

        let json = serde_json::to_string(&store).unwrap();
        let meta_pos = json.find("_note").unwrap();
        let record_pos = json.find("001.jpg").unwrap();
        assert!(meta_pos < record_pos, "got: {json}");
    }

    #[test]
    fn unknown_record_shape_is_rejected() {
        let json = r#"{"a.jpg": 42}"#;
        let err = serde_json::from_str::<CaptionStore>(json).unwrap_err();
        assert!(err.to_string().contains("a.jpg"), "got: {err}");
    }

    #[test]
    fn absent_record_is_not_resolved() {
        let store = CaptionStore::default();
        assert!(!store.is_resolved("missing.jpg"));
    }

    #[tokio::test]
    async fn load_missing_file_gives_empty_store() {
        let dir = TempDir::new().unwrap();
        let store = CaptionStore::load(dir.path()).await.unwrap();
        assert!(store.is_empty());
        assert!(store.metadata().is_empty());
    }

    #[tokio::test]
    async fn persist_then_load_round_trips() {
        let dir = TempDir::new().unwrap();
        let mut store = CaptionStore::default();
        store.put_caption("a.jpg", "Bride adjusts her veil near a window.");
        store.put_failure("b.jpg", CaptionFailure::transport("request timed out after 60s"));
        store.set_metadata("_generated_by", Value::String("img2alt".into()));

        store.persist(dir.path()).await.unwrap();
        let back = CaptionStore::load(dir.path()).await.unwrap();
        assert_eq!(store, back);
    }

    #[tokio::test]
    async fn persist_leaves_no_temp_file() {
        let dir = TempDir::new().unwrap();
        let mut store = CaptionStore::default();
        store.put_caption("a.jpg", "x");
        store.persist(dir.path()).await.unwrap();

        assert!(CaptionStore::store_path(dir.path()).exists());
        assert!(!dir.path().join("alt-text.json.tmp").exists());
    }

    #[tokio::test]
    async fn corrupt_store_is_a_parse_error() {
        let dir = TempDir::new().unwrap();
        tokio::fs::write(CaptionStore::store_path(dir.path()), b"not json at all")
            .await
            .unwrap();

        let err = CaptionStore::load(dir.path()).await.unwrap_err();
        assert!(matches!(err, Img2AltError::StoreParse { .. }), "got: {err}");
    }
}
