use std::io::{self, Write};

use suppaftp::FtpStream;
use suppaftp::types::FileType;
use tracing::debug;

use crate::config::ArchiveSettings;
use crate::error::CuratorError;

/// One logged-in connection to the archive. Dropping it closes the session.
pub trait ArchiveSession {
    /// Changes into `path` and returns the basenames of its entries.
    fn list(&mut self, path: &str) -> Result<Vec<String>, CuratorError>;
    /// Binary retrieval of `remote_path` into `sink`; returns the bytes copied.
    fn retrieve(&mut self, remote_path: &str, sink: &mut dyn Write) -> Result<u64, CuratorError>;
}

pub trait ArchiveClient {
    type Session: ArchiveSession;

    fn connect(&self) -> Result<Self::Session, CuratorError>;
}

impl<T: ArchiveClient + ?Sized> ArchiveClient for &T {
    type Session = T::Session;

    fn connect(&self) -> Result<Self::Session, CuratorError> {
        (**self).connect()
    }
}

#[derive(Debug, Clone)]
pub struct FtpArchiveClient {
    host: String,
    port: u16,
}

impl FtpArchiveClient {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    pub fn from_settings(settings: &ArchiveSettings) -> Self {
        Self::new(settings.host.clone(), settings.port)
    }

    pub fn host(&self) -> &str {
        &self.host
    }
}

impl ArchiveClient for FtpArchiveClient {
    type Session = FtpSession;

    fn connect(&self) -> Result<FtpSession, CuratorError> {
        debug!(host = %self.host, port = self.port, "opening FTP session");
        let mut stream = FtpStream::connect((self.host.as_str(), self.port))
            .map_err(|err| CuratorError::Archive(format!("connect {}: {err}", self.host)))?;
        stream
            .login("anonymous", "anonymous")
            .map_err(|err| CuratorError::Archive(format!("login {}: {err}", self.host)))?;
        stream
            .transfer_type(FileType::Binary)
            .map_err(|err| CuratorError::Archive(err.to_string()))?;
        Ok(FtpSession { stream })
    }
}

pub struct FtpSession {
    stream: FtpStream,
}

impl ArchiveSession for FtpSession {
    fn list(&mut self, path: &str) -> Result<Vec<String>, CuratorError> {
        self.stream
            .cwd(path)
            .map_err(|err| CuratorError::Archive(format!("cwd {path}: {err}")))?;
        let names = self
            .stream
            .nlst(None)
            .map_err(|err| CuratorError::Archive(format!("list {path}: {err}")))?;
        Ok(names.iter().map(|name| basename(name).to_string()).collect())
    }

    fn retrieve(&mut self, remote_path: &str, sink: &mut dyn Write) -> Result<u64, CuratorError> {
        let mut data = self
            .stream
            .retr_as_stream(remote_path)
            .map_err(|err| CuratorError::Archive(format!("retrieve {remote_path}: {err}")))?;
        let copied = io::copy(&mut data, sink)
            .map_err(|err| CuratorError::Archive(format!("retrieve {remote_path}: {err}")))?;
        self.stream
            .finalize_retr_stream(data)
            .map_err(|err| CuratorError::Archive(format!("retrieve {remote_path}: {err}")))?;
        Ok(copied)
    }
}

impl Drop for FtpSession {
    fn drop(&mut self) {
        let _ = self.stream.quit();
    }
}

/// Last `/`-separated segment, ignoring a trailing slash.
pub fn basename(path: &str) -> &str {
    path.trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or(path)
}

/// Joins remote path segments with single slashes, keeping a leading slash.
pub fn join_remote(base: &str, name: &str) -> String {
    if base.is_empty() {
        return name.to_string();
    }
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        name.trim_start_matches('/')
    )
}
