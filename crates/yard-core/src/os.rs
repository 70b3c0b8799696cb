//! The `--os` node descriptor — parsing and validation.
//!
//! Nodes are linux by default; a Windows node is requested with a compact
//! descriptor like `os=windows,version=2022`. Parsing and validation are
//! separate steps: [`OsFlag::parse`] only checks the key=value shape and
//! applies defaults, [`OsFlag::validate`] checks the values against the
//! supported sets and produces the typed [`OsSpec`].

use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;

/// Operating systems a node can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OsKind {
    Linux,
    Windows,
}

impl OsKind {
    /// All supported kinds, in the order error messages enumerate them.
    pub const ALL: [OsKind; 2] = [OsKind::Linux, OsKind::Windows];

    pub fn as_str(&self) -> &'static str {
        match self {
            OsKind::Linux => "linux",
            OsKind::Windows => "windows",
        }
    }
}

impl fmt::Display for OsKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Windows Server releases a Windows node may run.
pub const SUPPORTED_WINDOWS_VERSIONS: &[&str] = &["2019", "2022"];

/// Release used when `os=windows` is given without a version.
pub const DEFAULT_WINDOWS_VERSION: &str = "2022";

fn valid_os_names() -> String {
    OsKind::ALL
        .iter()
        .map(|kind| kind.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

fn supported_windows_versions() -> String {
    SUPPORTED_WINDOWS_VERSIONS.join(", ")
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum OsSpecError {
    #[error("invalid format for the OS descriptor: {0}")]
    Malformed(String),

    #[error("Invalid OS: {0}. Valid OS are: {valid}", valid = valid_os_names())]
    InvalidOs(String),

    #[error(
        "Unsupported Windows version: {0}. Supported versions are: {supported}",
        supported = supported_windows_versions()
    )]
    InvalidWindowsVersion(String),
}

/// Raw parse of the `--os` flag. Recognized keys land in named fields;
/// anything else is kept in `extra` and never read downstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OsFlag {
    pub os: String,
    pub version: String,
    pub extra: BTreeMap<String, String>,
}

impl Default for OsFlag {
    fn default() -> Self {
        OsFlag {
            os: OsKind::Linux.as_str().to_string(),
            version: String::new(),
            extra: BTreeMap::new(),
        }
    }
}

/// A validated (kind, version) pair. Consumed by the add-node workflow and
/// discarded once the node descriptor is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OsSpec {
    pub kind: OsKind,
    pub version: String,
}

impl OsFlag {
    /// Parse a comma-separated `key=value` descriptor.
    ///
    /// Every pair must split into two non-empty tokens on the first `=`;
    /// the whole raw string is reported back on a malformed pair. An empty
    /// descriptor means a plain linux node.
    pub fn parse(raw: &str) -> Result<OsFlag, OsSpecError> {
        let mut flag = OsFlag::default();
        if raw.is_empty() {
            return Ok(flag);
        }

        for part in raw.split(',') {
            let Some((key, value)) = part.split_once('=') else {
                return Err(OsSpecError::Malformed(raw.to_string()));
            };
            if key.is_empty() || value.is_empty() {
                return Err(OsSpecError::Malformed(raw.to_string()));
            }
            match key {
                "os" => flag.os = value.to_string(),
                "version" => flag.version = value.to_string(),
                other => {
                    flag.extra.insert(other.to_string(), value.to_string());
                }
            }
        }

        if flag.os == OsKind::Windows.as_str() && flag.version.is_empty() {
            flag.version = DEFAULT_WINDOWS_VERSION.to_string();
        }

        Ok(flag)
    }

    /// Check the parsed values against the supported sets.
    ///
    /// The Windows version is only validated for Windows nodes; a linux
    /// node carries its version string through untouched.
    pub fn validate(&self) -> Result<OsSpec, OsSpecError> {
        let kind = OsKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == self.os)
            .ok_or_else(|| OsSpecError::InvalidOs(self.os.clone()))?;

        if kind == OsKind::Windows && !SUPPORTED_WINDOWS_VERSIONS.contains(&self.version.as_str()) {
            return Err(OsSpecError::InvalidWindowsVersion(self.version.clone()));
        }

        Ok(OsSpec {
            kind,
            version: self.version.clone(),
        })
    }
}
