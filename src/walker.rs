use camino::Utf8PathBuf;
use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};

use crate::archive::{ArchiveClient, ArchiveSession, basename, join_remote};
use crate::config::ArchiveSettings;
use crate::domain::DownloadFormat;
use crate::error::CuratorError;
use crate::fs_util::gunzip_in_place;
use crate::index::DatasetPathIndex;
use crate::store::Store;

pub const GENERATED_DIR: &str = "generated";

#[derive(Debug, Clone, Serialize)]
pub struct DownloadReport {
    pub dataset: String,
    pub format: String,
    pub remote_dir: String,
    pub local_dir: String,
    pub files: Vec<String>,
    /// Filenames were taken from a generated subdirectory.
    pub from_generated: bool,
    pub completed_at: String,
}

/// Walks `root/year/index/dataset` and downloads dataset files by format.
pub struct ArchiveWalker<C: ArchiveClient> {
    client: C,
    root: String,
    years: Vec<String>,
    store: Store,
    index: Option<DatasetPathIndex>,
}

impl<C: ArchiveClient> ArchiveWalker<C> {
    pub fn new(client: C, settings: &ArchiveSettings, store: Store) -> Self {
        Self {
            client,
            root: settings.root.clone(),
            years: settings.years.clone(),
            store,
            index: None,
        }
    }

    /// Uses `index` instead of walking the archive.
    pub fn with_index(mut self, index: DatasetPathIndex) -> Self {
        self.index = Some(index);
        self
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn is_indexed(&self) -> bool {
        self.index.is_some()
    }

    /// Opens a session, lists `path` and closes the session again.
    pub fn list_subdirectories(&self, path: &str) -> Result<Vec<String>, CuratorError> {
        let mut session = self.client.connect()?;
        session.list(path)
    }

    fn list_or_empty(&self, path: &str) -> Vec<String> {
        match self.list_subdirectories(path) {
            Ok(names) => names,
            Err(err) => {
                warn!(path, error = %err, "listing failed, treating branch as empty");
                Vec::new()
            }
        }
    }

    fn wants_year(&self, year: &str) -> bool {
        self.years.is_empty() || self.years.iter().any(|wanted| wanted == year)
    }

    pub fn build_dataset_index(&self) -> DatasetPathIndex {
        let mut index = DatasetPathIndex::new();
        let years = self.list_or_empty(&self.root);
        for year in years.iter().filter(|year| self.wants_year(year)) {
            let year_path = join_remote(&self.root, year);
            for month in self.list_or_empty(&year_path) {
                let index_path = join_remote(&year_path, &month);
                for dataset in self.list_or_empty(&index_path) {
                    let dataset_path = join_remote(&index_path, &dataset);
                    index.insert(basename(&dataset_path), dataset_path.clone());
                }
            }
            info!(year = %year, datasets = index.len(), "indexed year");
        }
        index
    }

    /// Builds the index on first use; later calls return the same index.
    pub fn dataset_index(&mut self) -> &DatasetPathIndex {
        let index = match self.index.take() {
            Some(index) => index,
            None => self.build_dataset_index(),
        };
        self.index.insert(index)
    }

    pub fn download(&mut self, dataset: &str, format: &str) -> Result<DownloadReport, CuratorError> {
        let format: DownloadFormat = format.parse()?;
        let remote_dir = self
            .dataset_index()
            .get(dataset)
            .map(str::to_string)
            .ok_or_else(|| CuratorError::DatasetNotFound(dataset.to_string()))?;

        let local_dir = self.store.dataset_dir(dataset);
        Store::ensure_dir(&local_dir)?;

        let mut session = self.client.connect()?;
        let top_level = session.list(&remote_dir)?;
        let generated = top_level
            .iter()
            .find(|name| name.to_lowercase().ends_with(GENERATED_DIR));
        let (source_dir, names) = match generated {
            Some(subdir) => {
                let subdir_path = join_remote(&remote_dir, subdir);
                let names = session.list(&subdir_path)?;
                (subdir_path, names)
            }
            None => (remote_dir.clone(), top_level.clone()),
        };

        // Local nesting follows an exact `generated` entry in the unfiltered
        // top-level listing, not the case-insensitive match used above.
        let target_dir = if top_level.iter().any(|name| name == GENERATED_DIR) {
            local_dir.join(GENERATED_DIR)
        } else {
            local_dir.clone()
        };
        Store::ensure_dir(&target_dir)?;

        let mut files: Vec<Utf8PathBuf> = Vec::new();
        for name in names.iter().filter(|name| format.matches(name)) {
            let remote_path = join_remote(&source_dir, name);
            let local_path = target_dir.join(name);
            let bytes = Store::write_atomic_with(&local_path, |file| {
                session.retrieve(&remote_path, file)
            })?;
            info!(dataset, file = %name, bytes, "transferred");
            files.push(local_path);
        }
        drop(session);

        if format.is_compressed() {
            files = files
                .iter()
                .map(|path| gunzip_in_place(path))
                .collect::<Result<Vec<_>, _>>()?;
        }

        Ok(DownloadReport {
            dataset: dataset.to_string(),
            format: format.to_string(),
            remote_dir,
            local_dir: local_dir.to_string(),
            files: files.iter().map(|path| path.to_string()).collect(),
            from_generated: generated.is_some(),
            completed_at: Utc::now().to_rfc3339(),
        })
    }

    /// Boolean form of [`ArchiveWalker::download`]; failures are logged.
    pub fn try_download(&mut self, dataset: &str, format: &str) -> bool {
        match self.download(dataset, format) {
            Ok(report) => {
                info!(dataset, files = report.files.len(), "download complete");
                true
            }
            Err(err) => {
                warn!(dataset, error = %err, "download failed");
                false
            }
        }
    }
}
