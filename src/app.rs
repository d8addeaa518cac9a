use camino::Utf8PathBuf;
use serde::Serialize;
use tracing::{info, warn};

use crate::archive::ArchiveClient;
use crate::config::ResolvedConfig;
use crate::domain::DownloadFormat;
use crate::error::CuratorError;
use crate::index::DatasetPathIndex;
use crate::pride::{PrideClient, ProjectResolver, ProjectSummary, list_all_identifiers};
use crate::store::Store;
use crate::walker::{ArchiveWalker, DownloadReport};

#[derive(Debug, Clone, Default)]
pub struct InfoOptions {
    /// Use the cached metadata file without contacting PRIDE when it exists.
    pub offline: bool,
}

#[derive(Debug, Clone, Default)]
pub struct IndexOptions {
    /// Load this dump instead of walking the archive.
    pub from_dump: Option<Utf8PathBuf>,
    pub dump_path: Option<Utf8PathBuf>,
    pub csv_path: Option<Utf8PathBuf>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProjectsResult {
    pub projects: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct InfoResult {
    pub project: ProjectSummary,
    pub transfer_url: String,
    pub cache_path: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScanResult {
    pub items: Vec<ScanEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScanEntry {
    pub id: String,
    pub transfer_url: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct IndexResult {
    pub datasets: usize,
    pub dump_path: Option<String>,
    pub csv_path: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DownloadResult {
    pub items: Vec<DownloadOutcome>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DownloadOutcome {
    pub dataset: String,
    pub success: bool,
    pub report: Option<DownloadReport>,
    pub error: Option<String>,
}

impl DownloadResult {
    pub fn failures(&self) -> usize {
        self.items.iter().filter(|item| !item.success).count()
    }
}

pub struct App<P: PrideClient, A: ArchiveClient> {
    config: ResolvedConfig,
    store: Store,
    pride: P,
    archive: A,
}

impl<P: PrideClient, A: ArchiveClient> App<P, A> {
    pub fn new(config: ResolvedConfig, pride: P, archive: A) -> Self {
        let store = Store::new(config.output_dir.clone());
        Self {
            config,
            store,
            pride,
            archive,
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn projects(&self) -> Result<ProjectsResult, CuratorError> {
        let projects = list_all_identifiers(&self.pride)?
            .into_iter()
            .map(|id| id.to_string())
            .collect();
        Ok(ProjectsResult { projects })
    }

    pub fn info(&self, identifier: &str, options: InfoOptions) -> Result<InfoResult, CuratorError> {
        let mut resolver = ProjectResolver::for_identifier(&self.pride, identifier, &self.store)?
            .prefer_cache(options.offline);
        let id = resolver.id().clone();
        let project = resolver.metadata()?.summary(&id);
        let transfer_url = resolver.transfer_url()?.to_string();
        Ok(InfoResult {
            project,
            transfer_url,
            cache_path: resolver.cache_path().to_string(),
        })
    }

    /// Resolves the transfer URL of every listed project; per-project
    /// failures are recorded and the scan continues.
    pub fn scan(&self, limit: Option<usize>) -> Result<ScanResult, CuratorError> {
        let ids = list_all_identifiers(&self.pride)?;
        let take = limit.unwrap_or(ids.len());
        let mut items = Vec::new();
        for id in ids.into_iter().take(take) {
            let mut resolver = ProjectResolver::new(&self.pride, id.clone(), &self.store);
            let entry = match resolver.transfer_url() {
                Ok(url) => ScanEntry {
                    id: id.to_string(),
                    transfer_url: Some(url.to_string()),
                    error: None,
                },
                Err(err) => {
                    warn!(id = %id, error = %err, "could not resolve project");
                    ScanEntry {
                        id: id.to_string(),
                        transfer_url: None,
                        error: Some(err.to_string()),
                    }
                }
            };
            items.push(entry);
        }
        Ok(ScanResult { items })
    }

    pub fn index(&self, options: IndexOptions) -> Result<IndexResult, CuratorError> {
        let index = match &options.from_dump {
            Some(path) => DatasetPathIndex::load_json(path)?,
            None => self.walker().build_dataset_index(),
        };
        info!(datasets = index.len(), "dataset index ready");

        let dump_path = options
            .dump_path
            .unwrap_or_else(|| self.store.index_dump_path());
        index.save_json(&dump_path)?;

        let csv_path = match options.csv_path {
            Some(path) => {
                index.write_datasets_csv(&path)?;
                Some(path.to_string())
            }
            None => None,
        };

        Ok(IndexResult {
            datasets: index.len(),
            dump_path: Some(dump_path.to_string()),
            csv_path,
        })
    }

    /// Downloads each dataset in turn. A failing dataset is logged and
    /// recorded; the remaining datasets are still attempted.
    pub fn download(
        &self,
        datasets: &[String],
        format: &str,
        index_dump: Option<&Utf8PathBuf>,
    ) -> Result<DownloadResult, CuratorError> {
        let format: DownloadFormat = format.parse()?;
        let mut walker = self.walker();
        let dump = index_dump
            .cloned()
            .unwrap_or_else(|| self.store.index_dump_path());
        if dump.as_std_path().exists() {
            info!(path = %dump, "using dataset index dump");
            walker = walker.with_index(DatasetPathIndex::load_json(&dump)?);
        }

        let format = format.to_string();
        let mut items = Vec::new();
        for dataset in datasets {
            let outcome = match walker.download(dataset, &format) {
                Ok(report) => DownloadOutcome {
                    dataset: dataset.clone(),
                    success: true,
                    report: Some(report),
                    error: None,
                },
                Err(err) => {
                    warn!(dataset = %dataset, error = %err, "download failed");
                    DownloadOutcome {
                        dataset: dataset.clone(),
                        success: false,
                        report: None,
                        error: Some(err.to_string()),
                    }
                }
            };
            items.push(outcome);
        }
        Ok(DownloadResult { items })
    }

    fn walker(&self) -> ArchiveWalker<&A> {
        ArchiveWalker::new(&self.archive, &self.config.archive, self.store.clone())
    }
}
