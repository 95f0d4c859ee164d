//! Explorer folder-path capture for the Explorer fast path (spec.md §4.3:
//! "obtained via the shell automation object at snapshot time"). Uses the
//! real `ShellWindows` COM automation object rather than inferring the
//! folder from the window title, the same "reach for the system API the
//! crate already imports for this feature family" call the jump-list
//! compound-document reader makes for `IStorage`/`IStream`.

use std::collections::HashMap;

/// Maps each currently-open Explorer window's `HWND` (as the raw `isize`
/// handle value used elsewhere in this crate) to its current folder path.
/// Best-effort: any failure walking the shell-windows collection yields an
/// empty map rather than propagating (spec.md §7, "failures never
/// propagate").
#[cfg(windows)]
pub fn folder_paths_by_hwnd() -> HashMap<isize, String> {
    match os::folder_paths_by_hwnd() {
        Ok(map) => map,
        Err(e) => {
            log::warn!("explorer folder capture failed: {e}");
            HashMap::new()
        }
    }
}

#[cfg(not(windows))]
pub fn folder_paths_by_hwnd() -> HashMap<isize, String> {
    HashMap::new()
}

/// Converts a `file:///C:/Users/...` location URL to a plain Windows path.
fn file_url_to_path(url: &str) -> Option<String> {
    let rest = url.strip_prefix("file:///")?;
    Some(percent_decode(rest).replace('/', "\\"))
}

fn percent_decode(s: &str) -> String {
    let mut bytes = Vec::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c == '%' {
            let hex: String = chars.by_ref().take(2).collect();
            if let Ok(byte) = u8::from_str_radix(&hex, 16) {
                bytes.push(byte);
                continue;
            }
            bytes.push(b'%');
            bytes.extend(hex.bytes());
            continue;
        }
        let mut buf = [0u8; 4];
        bytes.extend(c.encode_utf8(&mut buf).as_bytes());
    }
    String::from_utf8_lossy(&bytes).into_owned()
}

#[cfg(windows)]
mod os {
    use std::collections::HashMap;
    use std::io;

    use windows::core::Interface;
    use windows::Win32::System::Com::{
        CoCreateInstance, CoInitializeEx, CLSCTX_LOCAL_SERVER, COINIT_APARTMENTTHREADED, VARIANT,
    };
    use windows::Win32::UI::Shell::{IShellWindows, IWebBrowserApp, ShellWindows};

    use super::file_url_to_path;

    /// Walks the `ShellWindows` collection: every open Explorer (and
    /// Internet Explorer) top-level window shows up here as an
    /// `IWebBrowserApp`, exposing both its `HWND` and its current
    /// `LocationURL` (spec.md §4.3).
    pub fn folder_paths_by_hwnd() -> Result<HashMap<isize, String>, io::Error> {
        unsafe {
            // Idempotent if the thread is already COM-initialized by the
            // hosting application; S_FALSE just means "already done".
            let _ = CoInitializeEx(None, COINIT_APARTMENTTHREADED);

            let shell_windows: IShellWindows = CoCreateInstance(&ShellWindows, None, CLSCTX_LOCAL_SERVER)
                .map_err(|e| io::Error::other(format!("CoCreateInstance(ShellWindows) failed: {e}")))?;
            let count = shell_windows
                .Count()
                .map_err(|e| io::Error::other(format!("ShellWindows::Count failed: {e}")))?;

            let mut map = HashMap::new();
            for i in 0..count {
                let Ok(dispatch) = shell_windows.Item(&VARIANT::from(i)) else {
                    continue;
                };
                let Ok(browser) = dispatch.cast::<IWebBrowserApp>() else {
                    continue;
                };
                let Ok(hwnd) = browser.HWND() else {
                    continue;
                };
                let Ok(url) = browser.LocationURL() else {
                    continue;
                };
                if let Some(path) = file_url_to_path(&url.to_string()) {
                    map.insert(hwnd as isize, path);
                }
            }
            Ok(map)
        }
    }
}
