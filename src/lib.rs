//! WindowAnchor core: captures desktop window layouts (position, monitor,
//! and — best-effort — the open document) and restores them later, across
//! monitor configuration changes. This crate is the Win32-facing engine;
//! everything UI-shaped (tray icon, hotkeys, settings pane) lives in an
//! integrator built on top of it, the same separation
//! `win32-display-data` draws between device enumeration and the caller
//! that decides what to do with the result.

pub mod config;
pub mod display;
pub mod error;
pub mod fileresolver;
pub mod persistence;
pub mod progress;
pub mod restore;
pub mod snapshot;
pub mod window;
pub mod workspace;

pub use config::CoreConfig;
pub use error::{DisplayError, PersistenceError, ResolverError, RestoreError, WindowError};
pub use progress::{CloseProgress, NullProgressSink, ProgressSink, SnapshotProgress};
pub use restore::{restore_workspace, switch_workspace, RestoreOutcome};
pub use snapshot::SnapshotEngine;
pub use workspace::{WorkspaceEntry, WorkspaceSnapshot};
