//! `WindowRecord` and the pure geometry/DPI math around it (spec.md §3,
//! §4.2). Kept separate from the enumeration code so the scaling and
//! snap-correction logic is testable without a live desktop, mirroring how
//! `win32-display-data::Device` is a plain struct decoupled from the
//! `EnumDisplayMonitors` call that fills it in.

use serde::{Deserialize, Serialize};

/// Maximum stored title length, in bytes (spec.md §3, §9: `GetWindowText`
/// truncates at 256 UTF-16 code units at the OS boundary, but the record
/// keeps only the first 200 bytes).
pub const TITLE_SNIPPET_MAX_BYTES: usize = 200;

/// The pixel distance beyond which a stale `NORMAL`-state restored rectangle
/// is replaced by the window's actual current rectangle (spec.md §4.2): well
/// above the 7-14px DWM shadow drift, well below real snap offsets (100px+).
pub const SNAP_STALENESS_THRESHOLD_PX: i32 = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShowCommand {
    #[serde(rename = "NORMAL")]
    Normal,
    #[serde(rename = "MAXIMIZED")]
    Maximized,
    #[serde(rename = "MINIMIZED")]
    Minimized,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Rect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Rect {
    fn edge_deltas(&self, other: &Rect) -> [i32; 4] {
        [
            (self.left - other.left).abs(),
            (self.top - other.top).abs(),
            (self.right - other.right).abs(),
            (self.bottom - other.bottom).abs(),
        ]
    }

    /// True when `actual` differs from `self` (the restored rectangle) by
    /// more than [`SNAP_STALENESS_THRESHOLD_PX`] on any edge.
    pub fn is_stale_against(&self, actual: &Rect) -> bool {
        self.edge_deltas(actual)
            .into_iter()
            .any(|d| d > SNAP_STALENESS_THRESHOLD_PX)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowRecord {
    pub executable_path: String,
    pub process_name: String,
    pub window_class_name: String,
    pub title_snippet: String,
    pub show_command: ShowCommand,
    pub rect: Rect,
    pub dpi: u32,
    pub folder_path: Option<String>,
    pub monitor_id: String,
    pub monitor_index: u32,
    pub monitor_name: String,
}

/// Truncates a title to [`TITLE_SNIPPET_MAX_BYTES`] bytes without splitting a
/// UTF-8 code point.
pub fn truncate_title(title: &str) -> String {
    if title.len() <= TITLE_SNIPPET_MAX_BYTES {
        return title.to_string();
    }
    let mut end = TITLE_SNIPPET_MAX_BYTES;
    while end > 0 && !title.is_char_boundary(end) {
        end -= 1;
    }
    title[..end].to_string()
}

/// Scales a restored rectangle from `saved_dpi` to `current_dpi` (spec.md
/// §4.2). A zero saved DPI is treated as 96, the Windows default.
pub fn scale_rect(rect: Rect, saved_dpi: u32, current_dpi: u32) -> Rect {
    let saved = if saved_dpi == 0 { 96 } else { saved_dpi };
    if saved == current_dpi {
        return rect;
    }
    let scale = current_dpi as f64 / saved as f64;
    Rect {
        left: (rect.left as f64 * scale).trunc() as i32,
        top: (rect.top as f64 * scale).trunc() as i32,
        right: (rect.right as f64 * scale).trunc() as i32,
        bottom: (rect.bottom as f64 * scale).trunc() as i32,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scale_identity_is_noop() {
        let r = Rect { left: 10, top: 20, right: 300, bottom: 400 };
        assert_eq!(scale_rect(r, 96, 96), r);
    }

    #[test]
    fn scale_round_trip_within_one_pixel() {
        let r = Rect { left: 100, top: 100, right: 600, bottom: 500 };
        let scaled = scale_rect(r, 96, 144);
        let back = scale_rect(scaled, 144, 96);
        for (a, b) in [
            (r.left, back.left),
            (r.top, back.top),
            (r.right, back.right),
            (r.bottom, back.bottom),
        ] {
            assert!((a - b).abs() <= 1, "{a} vs {b}");
        }
    }

    #[test]
    fn zero_saved_dpi_treated_as_96() {
        let r = Rect { left: 0, top: 0, right: 96, bottom: 96 };
        assert_eq!(scale_rect(r, 0, 192), Rect { left: 0, top: 0, right: 192, bottom: 192 });
    }

    #[test]
    fn title_truncated_at_200_bytes() {
        let long = "x".repeat(500);
        assert_eq!(truncate_title(&long).len(), TITLE_SNIPPET_MAX_BYTES);
    }

    #[test]
    fn snap_staleness_threshold() {
        let restored = Rect { left: 0, top: 0, right: 800, bottom: 600 };
        let shadow_drift = Rect { left: 7, top: -7, right: 807, bottom: 600 };
        let snapped = Rect { left: 960, top: 0, right: 1760, bottom: 600 };
        assert!(!restored.is_stale_against(&shadow_drift));
        assert!(restored.is_stale_against(&snapped));
    }
}
