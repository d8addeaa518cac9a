use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::CuratorError;

static IDENTIFIER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^P[RX]D[0-9]{6}$").unwrap());

/// True when `value` is a PRIDE accession exactly as written (no case folding).
pub fn is_project_identifier(value: &str) -> bool {
    IDENTIFIER_RE.is_match(value)
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProjectIdentifier(String);

impl ProjectIdentifier {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProjectIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ProjectIdentifier {
    type Err = CuratorError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_uppercase();
        if !is_project_identifier(&normalized) {
            return Err(CuratorError::InvalidIdentifier(value.to_string()));
        }
        Ok(Self(normalized))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DownloadFormat {
    #[serde(rename = "raw")]
    Raw,
    #[serde(rename = "mgf")]
    Mgf,
    #[serde(rename = "mgf.gz")]
    MgfGz,
}

impl DownloadFormat {
    /// Lowercase filename suffix selecting files of this format.
    pub fn suffix(self) -> &'static str {
        match self {
            DownloadFormat::Raw => ".raw",
            DownloadFormat::Mgf => ".mgf",
            DownloadFormat::MgfGz => ".mgf.gz",
        }
    }

    pub fn is_compressed(self) -> bool {
        matches!(self, DownloadFormat::MgfGz)
    }

    pub fn matches(self, filename: &str) -> bool {
        filename.to_lowercase().ends_with(self.suffix())
    }
}

impl fmt::Display for DownloadFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DownloadFormat::Raw => write!(f, "raw"),
            DownloadFormat::Mgf => write!(f, "mgf"),
            DownloadFormat::MgfGz => write!(f, "mgf.gz"),
        }
    }
}

impl FromStr for DownloadFormat {
    type Err = CuratorError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "raw" => Ok(DownloadFormat::Raw),
            "mgf" => Ok(DownloadFormat::Mgf),
            "mgf.gz" => Ok(DownloadFormat::MgfGz),
            _ => Err(CuratorError::InvalidFormat(value.to_string())),
        }
    }
}
