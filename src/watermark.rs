//! Per-source sync state that survives between runs
//!
//! Stored as a single JSON document keyed by source id:
//!
//! ```json
//! { "UCchannel": { "recent": ["newest", "older"], "etag": "abc" } }
//! ```

use std::{
    collections::BTreeMap,
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use smartstring::alias::String as SmallString;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceWatermark {
    /// Ids from the latest fetch snapshot. Replaced wholesale, never merged
    #[serde(rename = "recent", default)]
    pub recent_ids: Vec<SmallString>,
    #[serde(rename = "etag", default)]
    pub change_token: Option<String>,
}

impl SourceWatermark {
    pub fn is_cold(&self) -> bool {
        self.recent_ids.is_empty()
    }

    pub fn has_seen(&self, id: &str) -> bool {
        self.recent_ids.iter().any(|seen| seen.as_str() == id)
    }
}

pub type Watermarks = BTreeMap<SmallString, SourceWatermark>;

#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("Watermark file {} is corrupt", path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Failed accessing watermark file {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

pub struct WatermarkStore {
    path: PathBuf,
}

impl WatermarkStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the persisted watermarks. A missing file is a cold start for every source
    pub fn load(&self) -> Result<Watermarks, StateError> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                tracing::info!(path = %self.path.display(), "No watermark file yet, starting cold");
                return Ok(Watermarks::new());
            }
            Err(source) => {
                return Err(StateError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        serde_json::from_str(&text).map_err(|source| StateError::Corrupt {
            path: self.path.clone(),
            source,
        })
    }

    /// Like [`Self::load`], but a corrupt file degrades to a cold start instead of ending the run
    ///
    /// Read failures are still errors. Treating them as a cold start would overwrite the real
    /// watermarks at the end of the run
    pub fn load_or_default(&self) -> Result<Watermarks, StateError> {
        match self.load() {
            Err(err @ StateError::Corrupt { .. }) => {
                tracing::warn!(
                    error = %err,
                    cause = ?std::error::Error::source(&err).map(ToString::to_string),
                    "Ignoring corrupt watermarks, every source starts cold"
                );
                Ok(Watermarks::new())
            }
            other => other,
        }
    }

    /// Atomically replaces the persisted watermarks
    ///
    /// The new contents are written to a sibling temp file which then gets renamed over the old
    /// file, so a crash can never leave a half-written document behind
    pub fn save(&self, watermarks: &Watermarks) -> Result<(), StateError> {
        let io_err = |source: io::Error| StateError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err)?;
        }

        let mut tmp_name = self.path.file_name().unwrap_or_default().to_owned();
        tmp_name.push(".tmp");
        let tmp_path = self.path.with_file_name(tmp_name);

        let json = serde_json::to_string_pretty(watermarks)
            .map_err(|err| io_err(io::Error::new(io::ErrorKind::InvalidData, err)))?;
        let mut file = fs::File::create(&tmp_path).map_err(io_err)?;
        file.write_all(json.as_bytes()).map_err(io_err)?;
        file.sync_all().map_err(io_err)?;
        drop(file);
        fs::rename(&tmp_path, &self.path).map_err(io_err)?;

        tracing::debug!(path = %self.path.display(), sources = watermarks.len(), "Saved watermarks");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn watermark(ids: &[&str], etag: Option<&str>) -> SourceWatermark {
        SourceWatermark {
            recent_ids: ids.iter().copied().map(SmallString::from).collect(),
            change_token: etag.map(ToOwned::to_owned),
        }
    }

    #[test]
    fn missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = WatermarkStore::new(dir.path().join("watermarks.json"));

        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = WatermarkStore::new(dir.path().join("nested").join("watermarks.json"));

        let mut watermarks = Watermarks::new();
        watermarks.insert("UCone".into(), watermark(&["b", "a"], Some("etag-1")));
        watermarks.insert("PLtwo".into(), watermark(&["z"], None));
        store.save(&watermarks).unwrap();

        assert_eq!(store.load().unwrap(), watermarks);
        // Temp file doesn't linger
        let entries: Vec<_> = fs::read_dir(store.path().parent().unwrap())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(entries, ["watermarks.json"]);
    }

    #[test]
    fn file_format() {
        let text = r#"{
            "UCone": { "recent": ["b", "a"], "etag": "etag-1" },
            "PLtwo": { "recent": ["z"], "etag": null },
            "PLthree": {}
        }"#;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("watermarks.json");
        fs::write(&path, text).unwrap();

        let watermarks = WatermarkStore::new(path).load().unwrap();
        assert_eq!(watermarks["UCone"], watermark(&["b", "a"], Some("etag-1")));
        assert_eq!(watermarks["PLtwo"], watermark(&["z"], None));
        assert!(watermarks["PLthree"].is_cold());
    }

    #[test]
    fn corrupt_file_falls_back_to_cold_start() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("watermarks.json");
        fs::write(&path, "{ \"UCone\": [ this is not json").unwrap();
        let store = WatermarkStore::new(path);

        assert!(matches!(store.load(), Err(StateError::Corrupt { .. })));
        assert!(store.load_or_default().unwrap().is_empty());
    }

    #[test]
    fn unreadable_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        // Reading a directory fails with something other than `NotFound`
        let store = WatermarkStore::new(dir.path());

        assert!(matches!(store.load(), Err(StateError::Io { .. })));
        assert!(matches!(
            store.load_or_default(),
            Err(StateError::Io { .. })
        ));
    }

    #[test]
    fn seen_ids() {
        let mark = watermark(&["b", "a"], None);
        assert!(mark.has_seen("a"));
        assert!(!mark.has_seen("c"));
        assert!(!mark.is_cold());
        assert!(SourceWatermark::default().is_cold());
    }
}
