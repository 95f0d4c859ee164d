//! The capability contract that lets the core report progress without ever
//! referencing the UI (spec.md §9: "a single-method abstraction; forbid
//! upward references from the core to the UI"), in the spirit of
//! `tauri-plugin-window-state`'s `AppHandleExt`/`WindowExt` traits crossing
//! into caller-owned state through a narrow interface.

/// A snapshot-in-progress update, emitted once per window plus one leading
/// and one trailing report (spec.md §4.4).
#[derive(Debug, Clone)]
pub struct SnapshotProgress {
    pub current: usize,
    pub total: usize,
    pub process_name: String,
    pub title_snippet: String,
}

/// A context-switch close-loop update, emitted whenever the remaining
/// live-window count changes (spec.md §4.5).
#[derive(Debug, Clone, Copy)]
pub struct CloseProgress {
    pub remaining: usize,
}

/// Single-method sink the integrator implements to receive progress. The
/// core never assumes anything about where the callback runs; the
/// integrator is responsible for dispatching back to its UI context
/// (spec.md §5).
pub trait ProgressSink: Send + Sync {
    fn on_snapshot_progress(&self, _report: SnapshotProgress) {}
    fn on_close_progress(&self, _report: CloseProgress) {}
}

/// A sink that drops every report; the default when the caller doesn't need
/// progress feedback.
pub struct NullProgressSink;

impl ProgressSink for NullProgressSink {}
