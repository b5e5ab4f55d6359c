//! Domain types for fetchkeep.
//!
//! All types are serializable/deserializable via serde + serde_json.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// Base file name of a tracked entry.
///
/// Unique within a batch. The same name addresses the working copy
/// (`<basedir>/<name>`) and the staged download (`<cachedir>/<name>`), so it
/// may never contain a path separator or refer to a parent directory.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EntryName(String);

impl EntryName {
    pub fn parse(name: impl Into<String>) -> Result<Self, CoreError> {
        let name = name.into();
        let reason = if name.is_empty() {
            Some("name is empty")
        } else if name == "." || name == ".." {
            Some("name refers to a directory")
        } else if name.contains(['/', '\\']) {
            Some("name contains a path separator")
        } else if name.contains('\0') {
            Some("name contains a NUL byte")
        } else {
            None
        };
        match reason {
            Some(reason) => Err(CoreError::InvalidEntryName { name, reason }),
            None => Ok(Self(name)),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntryName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for EntryName {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for EntryName {
    type Error = CoreError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(s)
    }
}

impl From<EntryName> for String {
    fn from(name: EntryName) -> Self {
        name.0
    }
}

impl AsRef<std::path::Path> for EntryName {
    fn as_ref(&self) -> &std::path::Path {
        std::path::Path::new(&self.0)
    }
}

/// Hex-encoded content hash of a file.
///
/// Always lowercase. Digests produced by different algorithms must never be
/// compared; the algorithm is fixed for a whole run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Digest(String);

impl Digest {
    /// Wrap an existing hex digest, normalising to lowercase.
    pub fn from_hex(hex: impl AsRef<str>) -> Self {
        Self(hex.as_ref().to_ascii_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for Digest {
    fn from(hex: String) -> Self {
        Self::from_hex(hex)
    }
}

impl From<Digest> for String {
    fn from(digest: Digest) -> Self {
        digest.0
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

// ---------------------------------------------------------------------------
// HashAlgorithm
// ---------------------------------------------------------------------------

/// Content hash used as the equality oracle for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HashAlgorithm {
    Sha224,
    #[default]
    Sha256,
    Sha384,
    Sha512,
    #[serde(rename = "sha512_256")]
    Sha512_256,
    Blake3,
}

impl HashAlgorithm {
    /// Accepted algorithm names, in display order.
    pub const SUPPORTED: &'static [&'static str] =
        &["sha224", "sha256", "sha384", "sha512", "sha512_256", "blake3"];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sha224 => "sha224",
            Self::Sha256 => "sha256",
            Self::Sha384 => "sha384",
            Self::Sha512 => "sha512",
            Self::Sha512_256 => "sha512_256",
            Self::Blake3 => "blake3",
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HashAlgorithm {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "sha224" => Ok(Self::Sha224),
            "sha256" => Ok(Self::Sha256),
            "sha384" => Ok(Self::Sha384),
            "sha512" => Ok(Self::Sha512),
            "sha512_256" => Ok(Self::Sha512_256),
            "blake3" => Ok(Self::Blake3),
            _ => Err(CoreError::UnknownAlgorithm(s.to_owned())),
        }
    }
}

// ---------------------------------------------------------------------------
// Tracked entries
// ---------------------------------------------------------------------------

/// A file to keep in sync with its remote source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedEntry {
    pub name: EntryName,
    pub url: String,
}

impl TrackedEntry {
    pub fn new(name: EntryName, url: impl Into<String>) -> Self {
        Self {
            name,
            url: url.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

/// Classification of one entry after comparing the last synced digest, the
/// staged download and the working copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// First download, or remote changed and the working copy was untouched.
    Updated,
    /// Remote content matches the last synced digest.
    NoRemoteChange,
    /// Both the remote and the working copy diverged from the last sync.
    LocalChangeRemoteChange,
    /// Never synced and the remote is unreachable.
    NoLocalNoRemote,
    /// Synced before but the remote is unreachable now.
    HasLocalNoRemote,
}

/// How loudly an outcome should be reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Info,
    Warning,
}

impl Outcome {
    pub fn severity(self) -> Severity {
        match self {
            Self::Updated | Self::NoRemoteChange | Self::NoLocalNoRemote => Severity::Info,
            Self::LocalChangeRemoteChange | Self::HasLocalNoRemote => Severity::Warning,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Updated => "updated",
            Self::NoRemoteChange => "no_remote_change",
            Self::LocalChangeRemoteChange => "local_change_remote_change",
            Self::NoLocalNoRemote => "no_local_no_remote",
            Self::HasLocalNoRemote => "has_local_no_remote",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
