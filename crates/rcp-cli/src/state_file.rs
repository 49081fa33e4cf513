//! JSON state file backing the attribute store between invocations.
//!
//! # Invariants
//! - Every mutation is flushed before the engine continues, so a crash in a
//!   later stage leaves the resource id and any partial attributes on disk.
//! - Writes go to a sibling `.tmp` file first and are renamed over the
//!   target; readers never observe a half-written file.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rcp_engine::{AttributeStore, MemoryStore, StoreError};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Default, Serialize, Deserialize)]
struct StateDoc {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    updated_at_utc: Option<DateTime<Utc>>,
    #[serde(flatten)]
    store: MemoryStore,
}

#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    doc: StateDoc,
}

impl FileStore {
    /// Open `path`, starting empty when the file does not exist yet.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if !path.exists() {
            return Ok(Self {
                path,
                doc: StateDoc::default(),
            });
        }

        let bytes =
            fs::read(&path).with_context(|| format!("read state file failed: {}", path.display()))?;
        let bytes = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(&bytes);
        let doc = if bytes.iter().all(u8::is_ascii_whitespace) {
            StateDoc::default()
        } else {
            serde_json::from_slice(bytes)
                .with_context(|| format!("state file is not valid JSON: {}", path.display()))?
        };
        Ok(Self { path, doc })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn updated_at_utc(&self) -> Option<DateTime<Utc>> {
        self.doc.updated_at_utc
    }

    /// Overwrite input attributes (one flush for the whole batch).
    pub fn merge_inputs(&mut self, inputs: Map<String, Value>) -> Result<(), StoreError> {
        for (k, v) in inputs {
            self.doc.store.attributes.insert(k, v);
        }
        self.flush("inputs")
    }

    /// The document as printed to stdout.
    pub fn snapshot(&self) -> Value {
        serde_json::to_value(&self.doc).unwrap_or(Value::Null)
    }

    fn flush(&mut self, key: &str) -> Result<(), StoreError> {
        self.doc.updated_at_utc = Some(Utc::now());
        let json = serde_json::to_string_pretty(&self.doc)
            .map_err(|e| StoreError::new(key, format!("serialize state failed: {e}")))?;

        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)
                .map_err(|e| StoreError::new(key, format!("create {} failed: {e}", dir.display())))?;
        }

        let tmp = tmp_path(&self.path);
        fs::write(&tmp, format!("{json}\n"))
            .map_err(|e| StoreError::new(key, format!("write {} failed: {e}", tmp.display())))?;
        fs::rename(&tmp, &self.path).map_err(|e| {
            StoreError::new(key, format!("rename onto {} failed: {e}", self.path.display()))
        })
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "state.json".into());
    name.push(".tmp");
    path.with_file_name(name)
}

impl AttributeStore for FileStore {
    fn id(&self) -> Option<String> {
        self.doc.store.id()
    }

    fn set_id(&mut self, id: &str) -> Result<(), StoreError> {
        self.doc.store.set_id(id)?;
        self.flush("id")
    }

    fn clear_id(&mut self) -> Result<(), StoreError> {
        self.doc.store.clear_id()?;
        self.flush("id")
    }

    fn get(&self, key: &str) -> Option<Value> {
        self.doc.store.get(key)
    }

    fn set(&mut self, key: &str, value: Value) -> Result<(), StoreError> {
        self.doc.store.set(key, value)?;
        self.flush(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn missing_file_opens_empty_and_is_created_on_first_write() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("server.json");

        let mut s = FileStore::open(&path).unwrap();
        assert_eq!(s.id(), None);
        assert!(!path.exists());

        s.set_id("123").unwrap();
        assert!(path.exists());
        assert!(!tmp_path(&path).exists());

        let reopened = FileStore::open(&path).unwrap();
        assert_eq!(reopened.id().as_deref(), Some("123"));
        assert!(reopened.updated_at_utc().is_some());
    }

    #[test]
    fn every_set_is_flushed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("s.json");

        let mut s = FileStore::open(&path).unwrap();
        s.set("contract_id", json!("543")).unwrap();
        s.set("device_id", json!("678")).unwrap();

        let on_disk: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(on_disk["attributes"]["contract_id"], "543");
        assert_eq!(on_disk["attributes"]["device_id"], "678");
    }

    #[test]
    fn clear_id_drops_the_id_but_keeps_attributes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("s.json");
        fs::write(
            &path,
            r#"{"id":"123","attributes":{"device_id":"678"}}"#,
        )
        .unwrap();

        let mut s = FileStore::open(&path).unwrap();
        s.clear_id().unwrap();

        let on_disk: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert!(on_disk.get("id").is_none());
        assert_eq!(on_disk["attributes"]["device_id"], "678");
    }

    #[test]
    fn merge_inputs_overwrites_existing_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("s.json");

        let mut s = FileStore::open(&path).unwrap();
        s.set("hostname", json!("old")).unwrap();

        let mut inputs = Map::new();
        inputs.insert("hostname".to_string(), json!("web-1"));
        inputs.insert("country".to_string(), json!("AU"));
        s.merge_inputs(inputs).unwrap();

        assert_eq!(s.get("hostname"), Some(json!("web-1")));
        assert_eq!(s.snapshot()["attributes"]["country"], "AU");
    }

    #[test]
    fn garbage_state_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("s.json");
        fs::write(&path, "{not json").unwrap();

        let err = FileStore::open(&path).unwrap_err();
        assert!(err.to_string().contains("state file is not valid JSON"));
    }
}
