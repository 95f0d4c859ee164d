//! Error taxonomy for the core. Every OS-facing module keeps a private
//! `SysError` (or equivalent) capturing call-site detail and folds it into
//! one of these public, non-exhaustive enums via `From`, following the split
//! `win32-display-data::error` uses between its public `Error` and its
//! private `SysError`.

use thiserror::Error;

/// Failures from [`crate::display`].
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DisplayError {
    #[error("failed to query the active display-config buffer size")]
    BufferQuery,
    #[error("failed to query the active display configuration")]
    ConfigQuery,
    #[error("no monitors are currently connected")]
    NoMonitors,
}

impl DisplayError {
    /// The in-band sentinel string spec.md mandates for fingerprint failures.
    /// These never collide with a valid fingerprint (fixed-width lowercase hex).
    pub fn sentinel(&self) -> &'static str {
        match self {
            Self::BufferQuery => "error_buffer_size",
            Self::ConfigQuery => "error_query_config",
            Self::NoMonitors => "no_monitors",
        }
    }
}

/// Failures from [`crate::window`].
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum WindowError {
    #[error("failed to enumerate top-level windows")]
    Enumeration,
    #[error("failed to read window placement")]
    PlacementQuery,
    #[error("failed to write window placement")]
    PlacementSet,
    #[error("the window's process path could not be read (likely elevated or protected)")]
    ProcessPathInaccessible,
}

/// Failures from [`crate::fileresolver`].
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ResolverError {
    #[error("registry lookup for handler resolution came back empty")]
    RegistryMiss,
    #[error("jump-list compound document was unreadable: {0}")]
    CompoundDocMalformed(String),
    #[error("shell link stream was malformed: {0}")]
    LnkMalformed(String),
    #[error("filesystem search touched an unreadable directory: {0}")]
    DirectoryInaccessible(String),
}

/// Failures from [`crate::restore`].
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RestoreError {
    #[error("failed to launch a missing application: {0}")]
    LaunchFailed(String),
    #[error("restore was cancelled")]
    Cancelled,
    #[error("workspace switch timed out with windows still open")]
    SwitchTimedOut,
}

/// Failures from [`crate::persistence`].
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PersistenceError {
    #[error("io error accessing workspace storage: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to (de)serialize a workspace: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("could not resolve the per-user application-data directory")]
    NoDataDir,
    #[error("no workspace named {0:?} exists")]
    NotFound(String),
}
