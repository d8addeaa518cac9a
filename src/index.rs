use std::collections::BTreeMap;
use std::fs;

use camino::Utf8Path;
use serde::{Deserialize, Serialize};

use crate::error::CuratorError;
use crate::store::Store;

/// Dataset identifier to full remote directory path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DatasetPathIndex {
    paths: BTreeMap<String, String>,
}

impl DatasetPathIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `dataset -> path`; a later path for the same dataset replaces the earlier one.
    pub fn insert(&mut self, dataset: impl Into<String>, path: impl Into<String>) {
        self.paths.insert(dataset.into(), path.into());
    }

    pub fn get(&self, dataset: &str) -> Option<&str> {
        self.paths.get(dataset).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn datasets(&self) -> impl Iterator<Item = &str> {
        self.paths.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.paths.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn save_json(&self, path: &Utf8Path) -> Result<(), CuratorError> {
        let content = serde_json::to_vec_pretty(self)
            .map_err(|err| CuratorError::Filesystem(err.to_string()))?;
        Store::write_bytes_atomic(path, &content)
    }

    pub fn load_json(path: &Utf8Path) -> Result<Self, CuratorError> {
        let content = Store::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|err| CuratorError::Filesystem(format!("parse index {path}: {err}")))
    }

    /// Writes a single `Dataset` column with a header row.
    pub fn write_datasets_csv(&self, path: &Utf8Path) -> Result<(), CuratorError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_str().is_empty()) {
            Store::ensure_dir(parent)?;
        }
        let file = fs::File::create(path.as_std_path())
            .map_err(|err| CuratorError::Filesystem(format!("create {path}: {err}")))?;
        let mut writer = csv::Writer::from_writer(file);
        writer
            .write_record(["Dataset"])
            .map_err(|err| CuratorError::Filesystem(err.to_string()))?;
        for dataset in self.datasets() {
            writer
                .write_record([dataset])
                .map_err(|err| CuratorError::Filesystem(err.to_string()))?;
        }
        writer
            .flush()
            .map_err(|err| CuratorError::Filesystem(err.to_string()))?;
        Ok(())
    }
}

impl FromIterator<(String, String)> for DatasetPathIndex {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        let mut index = Self::new();
        for (dataset, path) in iter {
            index.insert(dataset, path);
        }
        index
    }
}
