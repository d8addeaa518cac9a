use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};
use url::Url;

use crate::archive::{ArchiveClient, ArchiveSession, FtpArchiveClient};
use crate::config::RestSettings;
use crate::domain::{ProjectIdentifier, is_project_identifier};
use crate::error::CuratorError;
use crate::store::Store;

const TRANSFER_URL_LINK: &str = "datasetFtpUrl";

/// Project metadata as returned by `GET /projects/{id}`.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectMetadata {
    raw: Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProjectSummary {
    pub id: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub sample_processing_protocol: Option<String>,
    pub data_processing_protocol: Option<String>,
    pub doi: Option<String>,
    pub transfer_url_template: Option<String>,
}

impl ProjectMetadata {
    pub fn from_json(text: &str) -> Result<Self, CuratorError> {
        let raw: Value =
            serde_json::from_str(text).map_err(|err| CuratorError::MetadataParse(err.to_string()))?;
        if !raw.is_object() {
            return Err(CuratorError::MetadataParse(
                "expected a JSON object".to_string(),
            ));
        }
        Ok(Self { raw })
    }

    pub fn raw(&self) -> &Value {
        &self.raw
    }

    fn text(&self, key: &str) -> Option<&str> {
        self.raw.get(key).and_then(|value| value.as_str())
    }

    pub fn title(&self) -> Option<&str> {
        self.text("title")
    }

    pub fn description(&self) -> Option<&str> {
        self.text("projectDescription")
    }

    pub fn sample_processing_protocol(&self) -> Option<&str> {
        self.text("sampleProcessingProtocol")
    }

    pub fn data_processing_protocol(&self) -> Option<&str> {
        self.text("dataProcessingProtocol")
    }

    pub fn doi(&self) -> Option<&str> {
        self.text("doi")
    }

    /// `_links.datasetFtpUrl.href`, the unrewritten transfer URL.
    pub fn transfer_url_template(&self) -> Result<&str, CuratorError> {
        self.raw
            .get("_links")
            .and_then(|links| links.get(TRANSFER_URL_LINK))
            .and_then(|link| link.get("href"))
            .and_then(|href| href.as_str())
            .ok_or_else(|| CuratorError::MissingLink(TRANSFER_URL_LINK.to_string()))
    }

    pub fn summary(&self, id: &ProjectIdentifier) -> ProjectSummary {
        let owned = |value: Option<&str>| value.map(|value| value.to_string());
        ProjectSummary {
            id: id.to_string(),
            title: owned(self.title()),
            description: owned(self.description()),
            sample_processing_protocol: owned(self.sample_processing_protocol()),
            data_processing_protocol: owned(self.data_processing_protocol()),
            doi: owned(self.doi()),
            transfer_url_template: owned(self.transfer_url_template().ok()),
        }
    }
}

pub trait PrideClient: Send + Sync {
    /// Raw JSON body of the project record.
    fn fetch_project(&self, id: &ProjectIdentifier) -> Result<String, CuratorError>;
    /// Newline-delimited list of archive paths.
    fn fetch_sitemap(&self) -> Result<String, CuratorError>;
    /// Succeeds when `url` is reachable.
    fn probe(&self, url: &str) -> Result<(), CuratorError>;
}

impl<T: PrideClient + ?Sized> PrideClient for &T {
    fn fetch_project(&self, id: &ProjectIdentifier) -> Result<String, CuratorError> {
        (**self).fetch_project(id)
    }

    fn fetch_sitemap(&self) -> Result<String, CuratorError> {
        (**self).fetch_sitemap()
    }

    fn probe(&self, url: &str) -> Result<(), CuratorError> {
        (**self).probe(url)
    }
}

#[derive(Clone)]
pub struct PrideHttpClient {
    client: Client,
    base_url: String,
}

impl PrideHttpClient {
    pub fn new(settings: &RestSettings) -> Result<Self, CuratorError> {
        Self::with_base_url(&settings.base_url, settings.timeout)
    }

    pub fn with_base_url(base_url: &str, timeout: Duration) -> Result<Self, CuratorError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("pride-curator/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| CuratorError::PrideHttp(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|err| CuratorError::PrideHttp(err.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn project_url(&self, id: &ProjectIdentifier) -> String {
        format!("{}/projects/{}", self.base_url, id.as_str())
    }

    pub fn sitemap_url(&self) -> String {
        format!("{}/misc/sitemap", self.base_url)
    }

    fn handle_status(
        response: reqwest::blocking::Response,
    ) -> Result<reqwest::blocking::Response, CuratorError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let message = response
            .text()
            .unwrap_or_else(|_| "PRIDE request failed".to_string());
        Err(CuratorError::PrideStatus { status, message })
    }

    fn get_text(&self, url: &str) -> Result<String, CuratorError> {
        let response = self.client.get(url).send().map_err(map_send_error)?;
        let response = Self::handle_status(response)?;
        response.text().map_err(map_send_error)
    }

    fn probe_ftp(url: &Url) -> Result<(), CuratorError> {
        let host = url
            .host_str()
            .ok_or_else(|| CuratorError::Archive(format!("no host in {url}")))?;
        let port = url.port_or_known_default().unwrap_or(21);
        let mut session = FtpArchiveClient::new(host, port).connect()?;
        session.list(url.path())?;
        Ok(())
    }
}

impl PrideClient for PrideHttpClient {
    fn fetch_project(&self, id: &ProjectIdentifier) -> Result<String, CuratorError> {
        self.get_text(&self.project_url(id))
    }

    fn fetch_sitemap(&self) -> Result<String, CuratorError> {
        self.get_text(&self.sitemap_url())
    }

    fn probe(&self, url: &str) -> Result<(), CuratorError> {
        let parsed = Url::parse(url).map_err(|err| CuratorError::PrideHttp(format!("{url}: {err}")))?;
        match parsed.scheme() {
            "ftp" => Self::probe_ftp(&parsed),
            _ => {
                let response = self.client.head(url).send().map_err(map_send_error)?;
                Self::handle_status(response)?;
                Ok(())
            }
        }
    }
}

fn map_send_error(err: reqwest::Error) -> CuratorError {
    if err.is_connect() || err.is_timeout() {
        CuratorError::PrideConnection(err.to_string())
    } else {
        CuratorError::PrideHttp(err.to_string())
    }
}

/// A literal substring replacement applied to a transfer URL candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RewriteRule {
    pub from: &'static str,
    pub to: &'static str,
}

impl RewriteRule {
    pub const fn new(from: &'static str, to: &'static str) -> Self {
        Self { from, to }
    }

    pub fn apply(&self, url: &str) -> String {
        if self.from.is_empty() {
            return url.to_string();
        }
        url.replace(self.from, self.to)
    }
}

/// Applied cumulatively, in order; each intermediate result is probed.
pub const TRANSFER_URL_REWRITES: [RewriteRule; 3] = [
    RewriteRule::new("", ""),
    RewriteRule::new("/data/", "-"),
    RewriteRule::new("pride.", ""),
];

pub fn resolve_transfer_url<C: PrideClient + ?Sized>(
    client: &C,
    metadata: &ProjectMetadata,
) -> Result<String, CuratorError> {
    let mut candidate = metadata.transfer_url_template()?.to_string();
    let mut last_error = None;
    for rule in TRANSFER_URL_REWRITES {
        candidate = rule.apply(&candidate);
        match client.probe(&candidate) {
            Ok(()) => {
                debug!(url = %candidate, "transfer URL reachable");
                return Ok(candidate);
            }
            Err(err) => {
                debug!(url = %candidate, error = %err, "transfer URL candidate failed");
                last_error = Some(err);
            }
        }
    }
    Err(CuratorError::UnreachableUrl {
        url: candidate,
        reason: last_error
            .map(|err| err.to_string())
            .unwrap_or_else(|| "no candidates".to_string()),
    })
}

/// Every project identifier in the sitemap, sorted ascending.
pub fn list_all_identifiers<C: PrideClient + ?Sized>(
    client: &C,
) -> Result<Vec<ProjectIdentifier>, CuratorError> {
    let text = client.fetch_sitemap()?;
    Ok(parse_sitemap(&text))
}

pub fn parse_sitemap(text: &str) -> Vec<ProjectIdentifier> {
    let mut ids = text
        .lines()
        .filter_map(|line| line.trim().rsplit('/').next())
        .filter(|segment| is_project_identifier(segment))
        .filter_map(|segment| segment.parse::<ProjectIdentifier>().ok())
        .collect::<Vec<_>>();
    ids.sort();
    ids
}

/// Lazily resolves and caches one project's metadata and transfer URL.
pub struct ProjectResolver<C: PrideClient> {
    client: C,
    id: ProjectIdentifier,
    cache_path: Utf8PathBuf,
    prefer_cache: bool,
    metadata: Option<ProjectMetadata>,
    transfer_url: Option<String>,
}

impl<C: PrideClient> ProjectResolver<C> {
    pub fn new(client: C, id: ProjectIdentifier, store: &Store) -> Self {
        let cache_path = store.metadata_cache_path(&id);
        Self {
            client,
            id,
            cache_path,
            prefer_cache: false,
            metadata: None,
            transfer_url: None,
        }
    }

    /// Validates `identifier` before building the resolver.
    pub fn for_identifier(client: C, identifier: &str, store: &Store) -> Result<Self, CuratorError> {
        Ok(Self::new(client, identifier.parse()?, store))
    }

    /// Read an existing cache file instead of contacting PRIDE.
    pub fn prefer_cache(mut self, prefer_cache: bool) -> Self {
        self.prefer_cache = prefer_cache;
        self
    }

    pub fn id(&self) -> &ProjectIdentifier {
        &self.id
    }

    pub fn cache_path(&self) -> &Utf8Path {
        &self.cache_path
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn metadata(&mut self) -> Result<&ProjectMetadata, CuratorError> {
        let metadata = match self.metadata.take() {
            Some(metadata) => metadata,
            None => self.load_metadata()?,
        };
        Ok(self.metadata.insert(metadata))
    }

    pub fn transfer_url(&mut self) -> Result<&str, CuratorError> {
        let url = match self.transfer_url.take() {
            Some(url) => url,
            None => {
                let metadata = match self.metadata.take() {
                    Some(metadata) => metadata,
                    None => self.load_metadata()?,
                };
                let metadata = self.metadata.insert(metadata);
                resolve_transfer_url(&self.client, metadata)?
            }
        };
        Ok(self.transfer_url.insert(url).as_str())
    }

    fn load_metadata(&self) -> Result<ProjectMetadata, CuratorError> {
        let cached = self.cache_path.as_std_path().exists();
        if self.prefer_cache && cached {
            debug!(path = %self.cache_path, "reading cached metadata");
            return self.read_cache();
        }

        match self.client.fetch_project(&self.id) {
            Ok(body) => {
                let metadata = ProjectMetadata::from_json(&body)?;
                Store::write_bytes_atomic(&self.cache_path, body.as_bytes())?;
                info!(id = %self.id, path = %self.cache_path, "cached project metadata");
                Ok(metadata)
            }
            Err(err) if err.is_connection() && cached => {
                warn!(id = %self.id, error = %err, "PRIDE unreachable, using cached metadata");
                self.read_cache()
            }
            Err(err) => Err(err),
        }
    }

    fn read_cache(&self) -> Result<ProjectMetadata, CuratorError> {
        let content = Store::read_to_string(&self.cache_path)?;
        ProjectMetadata::from_json(&content)
    }
}
