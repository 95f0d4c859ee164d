//! Configuration inputs the core consumes but never owns end-to-end — the
//! global user settings spec.md §1 lists as external collaborators (default
//! workspace, monitor aliases, keyboard shortcuts) are out of scope beyond
//! the fields the core actually reads from, modeled as plain data the way
//! `win32-display-data`'s own `Device` is plain, serde-derivable data with no
//! behavior attached.

use serde::{Deserialize, Serialize};

/// Process names (lowercased, no extension) treated as password managers.
/// Windows for these are enumerated normally but unchecked by default in the
/// save dialog (spec.md §4.4, smart-exclusion policy).
pub const DEFAULT_PASSWORD_MANAGER_PROCESSES: &[&str] = &[
    "keepass",
    "keepassxc",
    "1password",
    "bitwarden",
    "lastpass",
    "dashlane",
    "keeper",
    "roboform",
    "enpass",
];

/// Title substrings that mark a private-browsing window for smart exclusion.
pub const DEFAULT_PRIVATE_TITLE_PATTERNS: &[&str] = &[
    "InPrivate",
    "Incognito",
    "Private Browsing",
    "Private Window",
];

/// Window classes that are shell chrome, not user windows (spec.md §4.2).
pub const SKIPPED_WINDOW_CLASSES: &[&str] = &[
    "Shell_TrayWnd",
    "DV2ControlHost",
    "MsgrIMEWindowClass",
    "SysShadow",
    "Button",
    "Windows.UI.Core.CoreWindow",
    "Progman",
    "WorkerW",
    "NotifyIconOverflowWindow",
    "TrayClockWClass",
    "MSTaskListWClass",
    "MSTaskSwWClass",
    "ReBarWindow32",
    "TopLevelWindowForOverflowXamlIsland",
];

/// Executable basenames (lowercase, no extension) that understand
/// `--restore-last-session` (spec.md §4.5, `BrowserSessionRestore`).
pub const SESSION_RESTORE_BROWSERS: &[&str] =
    &["chrome", "msedge", "opera", "brave", "brave_browser"];

/// Electron-based code editors eligible for workspace-folder promotion
/// (spec.md §4.4, `SnapshotEngine`).
pub const WORKSPACE_PROMOTION_PROCESSES: &[&str] = &["code", "cursor"];

/// External configuration the core reads at construction time. Everything
/// else (hotkeys, tray behavior, theme) lives entirely in the integrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoreConfig {
    /// Extra process names (beyond the defaults) to smart-exclude by default.
    #[serde(default)]
    pub extra_password_manager_processes: Vec<String>,
    /// Extra title substrings (beyond the defaults) that mark private windows.
    #[serde(default)]
    pub extra_private_title_patterns: Vec<String>,
    /// Whether file detection should be attempted at all during save; the
    /// save dialog still offers a per-call override via `save_files`.
    #[serde(default = "default_true")]
    pub detect_files_by_default: bool,
}

fn default_true() -> bool {
    true
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            extra_password_manager_processes: Vec::new(),
            extra_private_title_patterns: Vec::new(),
            detect_files_by_default: true,
        }
    }
}

impl CoreConfig {
    pub fn is_password_manager(&self, process_name_lower: &str) -> bool {
        DEFAULT_PASSWORD_MANAGER_PROCESSES.contains(&process_name_lower)
            || self
                .extra_password_manager_processes
                .iter()
                .any(|p| p.eq_ignore_ascii_case(process_name_lower))
    }

    pub fn is_private_title(&self, title: &str) -> bool {
        DEFAULT_PRIVATE_TITLE_PATTERNS
            .iter()
            .any(|p| title.contains(p))
            || self
                .extra_private_title_patterns
                .iter()
                .any(|p| title.contains(p.as_str()))
    }
}
