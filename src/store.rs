use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("store JSON in {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Extracted documentation for one mnemonic. Field names are the on-disk format.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstructionRecord {
    pub instruction: String,
    pub title: String,
    pub opcode: String,
    pub description: String,
    pub operation: String,
    pub url: String,
}

impl InstructionRecord {
    pub fn key(&self) -> String {
        self.instruction.to_lowercase()
    }
}

/// Lowercase mnemonic → record. Serialized as a flat JSON object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Store {
    records: BTreeMap<String, InstructionRecord>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// `mnemonic` in any case.
    pub fn contains(&self, mnemonic: &str) -> bool {
        self.records.contains_key(&mnemonic.to_lowercase())
    }

    pub fn get(&self, mnemonic: &str) -> Option<&InstructionRecord> {
        self.records.get(&mnemonic.to_lowercase())
    }

    /// Insert or replace the whole record under its lowercase mnemonic.
    pub fn merge(&mut self, record: InstructionRecord) {
        self.records.insert(record.key(), record);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &InstructionRecord)> {
        self.records.iter()
    }
}

/// Load the store, degrading instead of failing: a missing or unreadable file
/// gives an empty store, malformed entries are dropped individually.
pub fn load(path: &Path) -> Store {
    match try_load(path) {
        Ok(store) => {
            info!("Loaded {} existing instructions from {}", store.len(), path.display());
            store
        }
        Err(StoreError::Io { source, .. }) if source.kind() == ErrorKind::NotFound => {
            info!("No store at {}, starting empty", path.display());
            Store::new()
        }
        Err(e) => {
            warn!("Ignoring unreadable store: {}", e);
            Store::new()
        }
    }
}

/// Strict load: I/O errors and a non-object document are errors, bad entries are skipped.
pub fn try_load(path: &Path) -> Result<Store, StoreError> {
    let text = std::fs::read_to_string(path).map_err(|source| StoreError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let raw: BTreeMap<String, serde_json::Value> =
        serde_json::from_str(&text).map_err(|source| StoreError::Json {
            path: path.display().to_string(),
            source,
        })?;

    let mut store = Store::new();
    for (key, value) in raw {
        match serde_json::from_value::<InstructionRecord>(value) {
            Ok(record) => {
                store.records.insert(key, record);
            }
            Err(e) => warn!("Skipping malformed store entry {:?}: {}", key, e),
        }
    }
    Ok(store)
}

/// Write the full store as pretty JSON, replacing the file atomically.
pub fn persist(store: &Store, path: &Path) -> Result<(), StoreError> {
    let io_err = |source| StoreError::Io {
        path: path.display().to_string(),
        source,
    };

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
    }

    let json = serde_json::to_string_pretty(store).map_err(|source| StoreError::Json {
        path: path.display().to_string(),
        source,
    })?;

    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, json).map_err(io_err)?;
    std::fs::rename(&tmp, path).map_err(io_err)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(mnemonic: &str, description: &str) -> InstructionRecord {
        InstructionRecord {
            instruction: mnemonic.to_uppercase(),
            title: format!("{} — test", mnemonic.to_uppercase()),
            opcode: "90".into(),
            description: description.into(),
            operation: "IF x\n    THEN y;\nFI;".into(),
            url: format!("https://www.felixcloutier.com/x86/{}", mnemonic.to_lowercase()),
        }
    }

    #[test]
    fn merge_replaces_whole_record() {
        let mut store = Store::new();
        store.merge(record("mov", "first"));
        let mut second = InstructionRecord {
            instruction: "MOV".into(),
            ..Default::default()
        };
        second.url = "u2".into();
        store.merge(second.clone());

        assert_eq!(store.len(), 1);
        let got = store.get("MOV").unwrap();
        assert_eq!(got, &second);
        assert!(got.opcode.is_empty(), "no field-level merge");
    }

    #[test]
    fn keys_are_lowercase() {
        let mut store = Store::new();
        store.merge(record("CVTSI2SD", "d"));
        assert!(store.contains("cvtsi2sd"));
        assert!(store.contains("CvtSi2Sd"));
        assert_eq!(store.iter().next().unwrap().0, "cvtsi2sd");
    }

    #[test]
    fn persist_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/x86_instructions.json");

        let mut store = Store::new();
        store.merge(record("add", "line one\nline two"));
        store.merge(record("jmp", "Jump — near, “relative”"));
        persist(&store, &path).unwrap();

        let loaded = try_load(&path).unwrap();
        assert_eq!(loaded, store);
        assert_eq!(loaded.get("add").unwrap().description, "line one\nline two");
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn on_disk_format_uses_record_field_names() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("s.json");
        let mut store = Store::new();
        store.merge(record("nop", "d"));
        persist(&store, &path).unwrap();

        let v: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        let obj = v["nop"].as_object().unwrap();
        for field in ["instruction", "title", "opcode", "description", "operation", "url"] {
            assert!(obj.contains_key(field), "missing {}", field);
        }
        assert_eq!(obj.len(), 6);
    }

    #[test]
    fn missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load(&dir.path().join("absent.json")).is_empty());
    }

    #[test]
    fn corrupt_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("s.json");
        std::fs::write(&path, "{ \"mov\": { \"instruction\": ").unwrap();
        assert!(load(&path).is_empty());
        std::fs::write(&path, "[1, 2, 3]").unwrap();
        assert!(load(&path).is_empty());
    }

    #[test]
    fn malformed_entries_load_partially() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("s.json");
        std::fs::write(
            &path,
            r#"{
              "mov": {"instruction": "MOV", "title": "MOV — Move", "url": "u"},
              "lea": 42,
              "add": {"instruction": "ADD", "opcode": ["not", "a", "string"]}
            }"#,
        )
        .unwrap();

        let store = load(&path);
        assert_eq!(store.len(), 1);
        let mov = store.get("mov").unwrap();
        assert_eq!(mov.title, "MOV — Move");
        assert!(mov.operation.is_empty());
    }
}
