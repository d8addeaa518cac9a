use std::fs::{self, File};
use std::io::Write;

use camino::{Utf8Path, Utf8PathBuf};
use tempfile::Builder;

use crate::domain::ProjectIdentifier;
use crate::error::CuratorError;

pub const METADATA_CACHE_FILE: &str = ".pride-metadata";
pub const INDEX_DUMP_FILE: &str = "pride-index.json";
pub const DATASETS_CSV_FILE: &str = "datasets_list.csv";

/// Local layout: one directory per project or dataset under `root`.
#[derive(Debug, Clone)]
pub struct Store {
    root: Utf8PathBuf,
}

impl Store {
    pub fn new(root: Utf8PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    pub fn project_dir(&self, id: &ProjectIdentifier) -> Utf8PathBuf {
        self.root.join(id.as_str())
    }

    pub fn metadata_cache_path(&self, id: &ProjectIdentifier) -> Utf8PathBuf {
        self.project_dir(id).join(METADATA_CACHE_FILE)
    }

    pub fn dataset_dir(&self, dataset: &str) -> Utf8PathBuf {
        self.root.join(dataset)
    }

    pub fn index_dump_path(&self) -> Utf8PathBuf {
        self.root.join(INDEX_DUMP_FILE)
    }

    pub fn datasets_csv_path(&self) -> Utf8PathBuf {
        self.root.join(DATASETS_CSV_FILE)
    }

    pub fn ensure_dir(path: &Utf8Path) -> Result<(), CuratorError> {
        fs::create_dir_all(path.as_std_path())
            .map_err(|err| CuratorError::Filesystem(format!("create {path}: {err}")))
    }

    pub fn write_bytes_atomic(path: &Utf8Path, content: &[u8]) -> Result<(), CuratorError> {
        Self::write_atomic_with(path, |file| {
            file.write_all(content)
                .map_err(|err| CuratorError::Filesystem(format!("write {path}: {err}")))
        })
    }

    /// Runs `write` against a temp file next to `path` and renames it into
    /// place only when `write` succeeds. On error nothing is left at `path`.
    pub fn write_atomic_with<T>(
        path: &Utf8Path,
        write: impl FnOnce(&mut File) -> Result<T, CuratorError>,
    ) -> Result<T, CuratorError> {
        let parent = path
            .parent()
            .filter(|parent| !parent.as_str().is_empty())
            .unwrap_or(Utf8Path::new("."));
        Self::ensure_dir(parent)?;
        let mut temp = Builder::new()
            .prefix("pride-curator")
            .tempfile_in(parent.as_std_path())
            .map_err(|err| CuratorError::Filesystem(err.to_string()))?;
        let value = write(temp.as_file_mut())?;
        temp.persist(path.as_std_path())
            .map_err(|err| CuratorError::Filesystem(err.to_string()))?;
        Ok(value)
    }

    pub fn read_to_string(path: &Utf8Path) -> Result<String, CuratorError> {
        fs::read_to_string(path.as_std_path())
            .map_err(|err| CuratorError::Filesystem(format!("read {path}: {err}")))
    }
}
