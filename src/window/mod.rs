//! Top-level window enumeration, capture, and restore (spec.md §4.2).
//! Grounded on `DrChat-persistentwin`'s `HwndExt`-style window wrapper
//! (`is_visible`/`class_name`/`title`/`placement`/`owner`/`set_placement`)
//! and its maximize-after-`SetWindowPlacement` sequencing — restoring a
//! maximized window needs an explicit follow-up maximize call because
//! "maximized windows ignore SetWindowPlacement calls" on their own.

pub mod explorer;
pub mod record;

pub use record::{scale_rect, truncate_title, Rect, ShowCommand, WindowRecord};

use crate::config::SKIPPED_WINDOW_CLASSES;
use crate::error::WindowError;

/// A live window as captured during enumeration, before file detection.
#[derive(Debug, Clone)]
pub struct LiveWindow {
    pub handle: isize,
    pub pid: u32,
    pub executable_path: String,
    pub process_name: String,
    pub window_class_name: String,
    pub title: String,
    pub show_command: ShowCommand,
    pub restored_rect: Rect,
    pub actual_rect: Rect,
    pub dpi: u32,
}

/// Applies spec.md §4.2's filter predicate to a raw enumerated window.
pub fn passes_filter(
    is_visible: bool,
    has_owner: bool,
    class_name: &str,
    title: &str,
    width: i32,
    height: i32,
) -> bool {
    is_visible
        && !has_owner
        && !SKIPPED_WINDOW_CLASSES.contains(&class_name)
        && !title.trim().is_empty()
        && width >= 100
        && height >= 100
}

/// Applies the snap-correction rule: if the window is `NORMAL` and the
/// actual rectangle differs from the restored one by more than the
/// staleness threshold on any edge, the actual rectangle wins (spec.md
/// §4.2).
pub fn corrected_restore_rect(win: &LiveWindow) -> Rect {
    if win.show_command == ShowCommand::Normal && win.restored_rect.is_stale_against(&win.actual_rect) {
        win.actual_rect
    } else {
        win.restored_rect
    }
}

pub fn capture_record(win: &LiveWindow, monitor_id: String, monitor_index: u32, monitor_name: String) -> WindowRecord {
    WindowRecord {
        executable_path: win.executable_path.clone(),
        process_name: win.process_name.clone(),
        window_class_name: win.window_class_name.clone(),
        title_snippet: truncate_title(&win.title),
        show_command: win.show_command,
        rect: corrected_restore_rect(win),
        dpi: win.dpi,
        folder_path: None,
        monitor_id,
        monitor_index,
        monitor_name,
    }
}

#[cfg(windows)]
pub fn enumerate_user_windows() -> Result<Vec<LiveWindow>, WindowError> {
    os::enumerate_user_windows()
}

#[cfg(not(windows))]
pub fn enumerate_user_windows() -> Result<Vec<LiveWindow>, WindowError> {
    Ok(Vec::new())
}

/// Writes a DPI-scaled placement back to a live window handle, including the
/// explicit follow-up maximize call spec.md §4.2 requires.
#[cfg(windows)]
pub fn restore_placement(hwnd: isize, record: &WindowRecord, current_dpi: u32) -> Result<(), WindowError> {
    os::restore_placement(hwnd, record, current_dpi)
}

#[cfg(not(windows))]
pub fn restore_placement(_hwnd: isize, _record: &WindowRecord, _current_dpi: u32) -> Result<(), WindowError> {
    Ok(())
}

/// Posts a graceful close to every included window except those owned by
/// this process (spec.md §4.2). Returns the number of close messages posted
/// (advisory only — save-confirmation dialogs can keep a window alive
/// indefinitely).
#[cfg(windows)]
pub fn close_all_except_self() -> Result<usize, WindowError> {
    os::close_all_except_self()
}

#[cfg(not(windows))]
pub fn close_all_except_self() -> Result<usize, WindowError> {
    Ok(0)
}

/// Counts windows passing the same filter as a snapshot would enumerate —
/// used by the context-switch poll loop (spec.md §4.5, §8 property 8).
#[cfg(windows)]
pub fn count_user_windows() -> usize {
    os::enumerate_user_windows().map(|v| v.len()).unwrap_or(0)
}

#[cfg(not(windows))]
pub fn count_user_windows() -> usize {
    0
}

#[cfg(windows)]
mod os {
    use std::mem::size_of;

    use windows::Win32::Foundation::{BOOL, CloseHandle, HWND, LPARAM, MAX_PATH, RECT};
    use windows::Win32::Graphics::Gdi::MonitorFromWindow;
    use windows::Win32::System::Threading::{
        OpenProcess, QueryFullProcessImageNameW, PROCESS_NAME_WIN32, PROCESS_QUERY_LIMITED_INFORMATION,
    };
    use windows::Win32::UI::HiDpi::GetDpiForWindow;
    use windows::Win32::UI::WindowsAndMessaging::{
        EnumWindows, GetClassNameW, GetWindowLongPtrW, GetWindowPlacement, GetWindowTextW,
        GetWindowThreadProcessId, IsWindowVisible, PostMessageW, SetWindowPlacement, ShowWindow,
        GWL_STYLE, SHOW_WINDOW_CMD, SW_MAXIMIZE, SW_SHOWMAXIMIZED, SW_SHOWMINIMIZED, SW_SHOWNORMAL,
        WINDOWPLACEMENT, WM_CLOSE, WS_CHILD,
    };

    use super::record::{Rect as RecordRect, ShowCommand, WindowRecord};
    use super::{passes_filter, LiveWindow};
    use crate::error::WindowError;

    pub fn enumerate_user_windows() -> Result<Vec<LiveWindow>, WindowError> {
        unsafe extern "system" fn collect(hwnd: HWND, lparam: LPARAM) -> BOOL {
            let out = &mut *(lparam.0 as *mut Vec<HWND>);
            out.push(hwnd);
            true.into()
        }

        let mut hwnds = Vec::<HWND>::new();
        unsafe {
            EnumWindows(Some(collect), LPARAM(&mut hwnds as *mut _ as isize))
                .map_err(|_| WindowError::Enumeration)?;
        }

        Ok(hwnds
            .into_iter()
            .filter_map(|hwnd| capture_one(hwnd).ok().flatten())
            .collect())
    }

    fn capture_one(hwnd: HWND) -> Result<Option<LiveWindow>, WindowError> {
        unsafe {
            let is_visible = IsWindowVisible(hwnd).as_bool();
            let style = GetWindowLongPtrW(hwnd, GWL_STYLE) as u32;
            let has_owner = !windows::Win32::UI::WindowsAndMessaging::GetWindow(
                hwnd,
                windows::Win32::UI::WindowsAndMessaging::GW_OWNER,
            )
            .map(|h| h.0 == 0)
            .unwrap_or(true);
            if style & WS_CHILD.0 != 0 {
                return Ok(None);
            }

            let class_name = class_name_of(hwnd);
            let title = title_of(hwnd);

            let mut placement = WINDOWPLACEMENT {
                length: size_of::<WINDOWPLACEMENT>() as u32,
                ..Default::default()
            };
            GetWindowPlacement(hwnd, &mut placement)
                .map_err(|_| WindowError::PlacementQuery)?;

            let mut actual = RECT::default();
            let _ = windows::Win32::UI::WindowsAndMessaging::GetWindowRect(hwnd, &mut actual);

            let width = actual.right - actual.left;
            let height = actual.bottom - actual.top;
            if !passes_filter(is_visible, has_owner, &class_name, &title, width, height) {
                return Ok(None);
            }

            let mut pid = 0u32;
            GetWindowThreadProcessId(hwnd, Some(&mut pid));

            let executable_path = process_path_of(pid).unwrap_or_default();
            let process_name = process_name_from_path(&executable_path);
            let dpi = GetDpiForWindow(hwnd).max(1);
            let hmonitor = MonitorFromWindow(
                hwnd,
                windows::Win32::Graphics::Gdi::MONITOR_DEFAULTTONEAREST,
            );
            let _ = hmonitor;

            Ok(Some(LiveWindow {
                handle: hwnd.0,
                pid,
                executable_path,
                process_name,
                window_class_name: class_name,
                title,
                show_command: show_command_from(placement.showCmd),
                restored_rect: rect_from(placement.rcNormalPosition),
                actual_rect: rect_from(actual),
                dpi,
            }))
        }
    }

    fn class_name_of(hwnd: HWND) -> String {
        let mut buf = [0u16; 256];
        let len = unsafe { GetClassNameW(hwnd, &mut buf) };
        String::from_utf16_lossy(&buf[..len.max(0) as usize])
    }

    fn title_of(hwnd: HWND) -> String {
        let mut buf = [0u16; 256];
        let len = unsafe { GetWindowTextW(hwnd, &mut buf) };
        String::from_utf16_lossy(&buf[..len.max(0) as usize])
    }

    /// Reads the process image path via `QueryFullProcessImageNameW`; on
    /// access denied (elevated/protected process) returns `None` so capture
    /// can fall back to class + title for matching (spec.md §4.2, §7
    /// `ProcessPathInaccessible`).
    fn process_path_of(pid: u32) -> Option<String> {
        unsafe {
            if pid == 0 {
                return None;
            }
            let process = OpenProcess(PROCESS_QUERY_LIMITED_INFORMATION, false, pid).ok()?;
            let mut buf = [0u16; MAX_PATH as usize];
            let mut len = buf.len() as u32;
            let ok = QueryFullProcessImageNameW(
                process,
                PROCESS_NAME_WIN32,
                windows::core::PWSTR(buf.as_mut_ptr()),
                &mut len,
            );
            let _ = CloseHandle(process);
            ok.ok()?;
            Some(String::from_utf16_lossy(&buf[..len as usize]))
        }
    }

    fn process_name_from_path(path: &str) -> String {
        std::path::Path::new(path)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    fn show_command_from(cmd: SHOW_WINDOW_CMD) -> ShowCommand {
        match cmd {
            SW_SHOWMAXIMIZED => ShowCommand::Maximized,
            SW_SHOWMINIMIZED => ShowCommand::Minimized,
            _ => ShowCommand::Normal,
        }
    }

    fn show_command_to_raw(cmd: ShowCommand) -> SHOW_WINDOW_CMD {
        match cmd {
            ShowCommand::Maximized => SW_SHOWMAXIMIZED,
            ShowCommand::Minimized => SW_SHOWMINIMIZED,
            ShowCommand::Normal => SW_SHOWNORMAL,
        }
    }

    fn rect_from(r: RECT) -> RecordRect {
        RecordRect {
            left: r.left,
            top: r.top,
            right: r.right,
            bottom: r.bottom,
        }
    }

    fn rect_to_raw(r: RecordRect) -> RECT {
        RECT {
            left: r.left,
            top: r.top,
            right: r.right,
            bottom: r.bottom,
        }
    }

    pub fn restore_placement(hwnd_raw: isize, record: &WindowRecord, current_dpi: u32) -> Result<(), WindowError> {
        let hwnd = HWND(hwnd_raw);
        unsafe {
            let mut placement = WINDOWPLACEMENT {
                length: size_of::<WINDOWPLACEMENT>() as u32,
                ..Default::default()
            };
            GetWindowPlacement(hwnd, &mut placement)
                .map_err(|_| WindowError::PlacementQuery)?;

            let scaled = super::scale_rect(record.rect, record.dpi, current_dpi);
            placement.showCmd = show_command_to_raw(record.show_command);
            placement.rcNormalPosition = rect_to_raw(scaled);

            SetWindowPlacement(hwnd, &placement).map_err(|_| WindowError::PlacementSet)?;

            // Window placement alone is unreliable across monitor DPI changes
            // for maximized windows; an explicit maximize call is required.
            if record.show_command == ShowCommand::Maximized {
                let _ = ShowWindow(hwnd, SW_MAXIMIZE);
            }
        }
        Ok(())
    }

    pub fn close_all_except_self() -> Result<usize, WindowError> {
        let self_pid = std::process::id();
        let windows = enumerate_user_windows()?;
        let mut posted = 0usize;
        for win in windows {
            if win.pid == self_pid {
                continue;
            }
            let hwnd = HWND(win.handle);
            unsafe {
                if PostMessageW(hwnd, WM_CLOSE, None, None).is_ok() {
                    posted += 1;
                }
            }
        }
        Ok(posted)
    }
}
