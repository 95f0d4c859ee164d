//! Monitor enumeration, stable identity, and the topology fingerprint
//! (spec.md §4.1). Enumeration is adapted directly from
//! `win32-display-data::device`: `EnumDisplayMonitors` for the live
//! `HMONITOR` set, `GetMonitorInfoW`/`EnumDisplayDevicesW` for geometry and
//! device name, and a `QueryDisplayConfig` + `DisplayConfigGetDeviceInfo`
//! pass keyed by device path for the EDID-bearing
//! `DISPLAYCONFIG_TARGET_DEVICE_NAME`. Where the teacher only forwarded
//! `outputTechnology`, WindowAnchor additionally reads the EDID manufacturer
//! id, product code, and connector instance needed for the fingerprint.

pub mod fingerprint;

use crate::error::DisplayError;
pub use fingerprint::{compute_fingerprint, monitor_identity};

/// A connected physical display, as captured by a snapshot or reported live.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Monitor {
    pub monitor_id: String,
    pub friendly_name: String,
    pub device_name: String,
    pub index: u32,
    pub width_pixels: i32,
    pub height_pixels: i32,
    pub is_primary: bool,
}

/// The live monitor list plus the fingerprint computed over it.
#[derive(Debug, Clone)]
pub struct MonitorList {
    pub monitors: Vec<Monitor>,
    pub fingerprint: String,
}

impl MonitorList {
    /// Builds the final sorted/indexed/fingerprinted list from raw per-monitor
    /// tuples (id, friendly name, device name, rect, is_primary), applying
    /// spec.md §4.1's sort order: primary first, then left edge ascending,
    /// indices re-assigned 0..N-1 after sort.
    fn from_raw(mut raw: Vec<RawMonitor>) -> Self {
        raw.sort_by(|a, b| {
            b.is_primary
                .cmp(&a.is_primary)
                .then(a.left.cmp(&b.left))
        });

        let fingerprint = compute_fingerprint(raw.iter().map(|m| m.monitor_id.clone()).collect());

        let monitors = raw
            .into_iter()
            .enumerate()
            .map(|(index, m)| Monitor {
                monitor_id: m.monitor_id,
                friendly_name: m.friendly_name,
                device_name: m.device_name,
                index: index as u32,
                width_pixels: m.width,
                height_pixels: m.height,
                is_primary: m.is_primary,
            })
            .collect();

        Self {
            monitors,
            fingerprint,
        }
    }
}

pub(crate) struct RawMonitor {
    pub monitor_id: String,
    pub friendly_name: String,
    pub device_name: String,
    pub left: i32,
    pub width: i32,
    pub height: i32,
    pub is_primary: bool,
}

/// Computes the fingerprint only, for the common case of a display-change
/// handler that just wants to know whether the topology changed (spec.md
/// §4.1). On any enumeration failure returns the appropriate in-band
/// sentinel instead of an error, per spec.md §7's error-as-data policy.
pub fn fingerprint_only() -> String {
    match enumerate() {
        Ok(list) => list.fingerprint,
        Err(e) => e.sentinel().to_string(),
    }
}

#[cfg(windows)]
pub fn enumerate() -> Result<MonitorList, DisplayError> {
    os::enumerate()
}

#[cfg(not(windows))]
pub fn enumerate() -> Result<MonitorList, DisplayError> {
    Err(DisplayError::NoMonitors)
}

/// Given a window handle (opaque `isize` so this module has no dependency on
/// [`crate::window`]) and the current monitor list, returns the monitor id
/// the window is currently on, falling back to `gdi:<device-name>` on a
/// lookup miss (spec.md §4.1, window→monitor lookup).
#[cfg(windows)]
pub fn monitor_id_for_window(hwnd: isize, monitors: &[Monitor]) -> String {
    os::monitor_id_for_window(hwnd, monitors)
}

#[cfg(not(windows))]
pub fn monitor_id_for_window(_hwnd: isize, _monitors: &[Monitor]) -> String {
    String::new()
}

#[cfg(windows)]
mod os {
    use std::collections::HashMap;
    use std::ffi::OsString;
    use std::mem::size_of;
    use std::os::windows::ffi::OsStringExt;

    use windows::core::PCWSTR;
    use windows::Win32::Devices::Display::{
        DisplayConfigGetDeviceInfo, GetDisplayConfigBufferSizes, QueryDisplayConfig,
        DISPLAYCONFIG_DEVICE_INFO_GET_TARGET_NAME, DISPLAYCONFIG_MODE_INFO,
        DISPLAYCONFIG_MODE_INFO_TYPE_TARGET, DISPLAYCONFIG_PATH_INFO,
        DISPLAYCONFIG_TARGET_DEVICE_NAME, QDC_ONLY_ACTIVE_PATHS,
    };
    use windows::Win32::Foundation::{BOOL, ERROR_ACCESS_DENIED, ERROR_SUCCESS, LPARAM, RECT, WIN32_ERROR};
    use windows::Win32::Graphics::Gdi::{
        EnumDisplayDevicesW, EnumDisplayMonitors, GetMonitorInfoW, MonitorFromWindow,
        DISPLAY_DEVICEW, DISPLAY_DEVICE_ACTIVE, DISPLAY_DEVICE_PRIMARY_DEVICE, HDC, HMONITOR,
        MONITORINFO, MONITORINFOEXW, MONITOR_DEFAULTTONEAREST,
    };
    use windows::Win32::UI::WindowsAndMessaging::EDD_GET_DEVICE_INTERFACE_NAME;

    use super::{fingerprint::monitor_identity, MonitorList, RawMonitor};
    use crate::error::DisplayError;

    pub fn enumerate() -> Result<MonitorList, DisplayError> {
        // A display-config failure degrades to the GDI-only fallback rather
        // than propagating (spec.md §4.1, §7 `BufferQuery`/`ConfigQuery`).
        let device_info_map = match get_device_info_map() {
            Ok(map) => map,
            Err(_) => return gdi_only_fallback(),
        };
        let hmonitors = enum_display_monitors()?;
        if hmonitors.is_empty() {
            return Err(DisplayError::NoMonitors);
        }

        let mut raw = Vec::new();
        for hmonitor in hmonitors {
            let Some((monitor_info, display_device)) = primary_device_for_hmonitor(hmonitor) else {
                continue;
            };

            let rect = monitor_info.monitorInfo.rcMonitor;
            let device_name = wchar_to_string(&display_device.DeviceName);
            let device_path = wchar_to_string(&display_device.DeviceID);
            let is_primary = flag_set(display_device.StateFlags, DISPLAY_DEVICE_PRIMARY_DEVICE);

            let monitor_id = match device_info_map.get(&display_device.DeviceID) {
                Some(info) if info.flags.edidIdsValid() => monitor_identity(
                    true,
                    info.edidManufactureId,
                    info.edidProductCodeId,
                    info.connectorInstance,
                    &device_path,
                ),
                _ => monitor_identity(false, 0, 0, 0, &device_path),
            };

            let friendly_name = device_info_map
                .get(&display_device.DeviceID)
                .map(|info| wchar_to_string(&info.monitorFriendlyDeviceName))
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| wchar_to_string(&display_device.DeviceString));

            raw.push(RawMonitor {
                monitor_id,
                friendly_name,
                device_name,
                left: rect.left,
                width: rect.right - rect.left,
                height: rect.bottom - rect.top,
                is_primary,
            });
        }

        if raw.is_empty() {
            return gdi_only_fallback();
        }

        Ok(MonitorList::from_raw(raw))
    }

    /// GDI-only fallback when the display-config query fails: ids become
    /// `gdi:<device-name>` and friendly names become `Monitor {index+1}`
    /// (spec.md §4.1).
    fn gdi_only_fallback() -> Result<MonitorList, DisplayError> {
        let hmonitors = enum_display_monitors()?;
        let mut raw = Vec::new();
        for hmonitor in hmonitors {
            let Some((monitor_info, display_device)) = primary_device_for_hmonitor(hmonitor)
            else {
                continue;
            };
            let rect = monitor_info.monitorInfo.rcMonitor;
            let device_name = wchar_to_string(&display_device.DeviceName);
            raw.push(RawMonitor {
                monitor_id: format!("gdi:{device_name}"),
                friendly_name: String::new(),
                device_name,
                left: rect.left,
                width: rect.right - rect.left,
                height: rect.bottom - rect.top,
                is_primary: flag_set(display_device.StateFlags, DISPLAY_DEVICE_PRIMARY_DEVICE),
            });
        }
        if raw.is_empty() {
            return Err(DisplayError::NoMonitors);
        }
        let mut list = MonitorList::from_raw(raw);
        for (i, m) in list.monitors.iter_mut().enumerate() {
            m.friendly_name = format!("Monitor {}", i + 1);
        }
        Ok(list)
    }

    pub fn monitor_id_for_window(hwnd: isize, monitors: &[super::Monitor]) -> String {
        unsafe {
            let hmonitor = MonitorFromWindow(
                windows::Win32::Foundation::HWND(hwnd),
                MONITOR_DEFAULTTONEAREST,
            );
            let Some((_, display_device)) = primary_device_for_hmonitor(hmonitor) else {
                return String::new();
            };
            let device_name = wchar_to_string(&display_device.DeviceName);
            monitors
                .iter()
                .find(|m| m.device_name.eq_ignore_ascii_case(&device_name))
                .map(|m| m.monitor_id.clone())
                .unwrap_or_else(|| format!("gdi:{device_name}"))
        }
    }

    fn primary_device_for_hmonitor(hmonitor: HMONITOR) -> Option<(MONITORINFOEXW, DISPLAY_DEVICEW)> {
        get_display_devices_from_hmonitor(hmonitor)
            .ok()
            .and_then(|v| v.into_iter().next())
    }

    #[inline]
    fn flag_set<T: std::ops::BitAnd<Output = T> + PartialEq + Copy>(t: T, flag: T) -> bool {
        t & flag == flag
    }

    fn get_device_info_map(
    ) -> Result<HashMap<[u16; 128], DISPLAYCONFIG_TARGET_DEVICE_NAME>, DisplayError> {
        unsafe {
            let mut path_count = 0u32;
            let mut mode_count = 0u32;
            GetDisplayConfigBufferSizes(QDC_ONLY_ACTIVE_PATHS, &mut path_count, &mut mode_count)
                .ok()
                .map_err(|_| DisplayError::BufferQuery)?;

            let mut display_paths = vec![DISPLAYCONFIG_PATH_INFO::default(); path_count as usize];
            let mut display_modes = vec![DISPLAYCONFIG_MODE_INFO::default(); mode_count as usize];
            QueryDisplayConfig(
                QDC_ONLY_ACTIVE_PATHS,
                &mut path_count,
                display_paths.as_mut_ptr(),
                &mut mode_count,
                display_modes.as_mut_ptr(),
                None,
            )
            .ok()
            .map_err(|_| DisplayError::ConfigQuery)?;

            Ok(display_modes
                .into_iter()
                .filter(|m| m.infoType == DISPLAYCONFIG_MODE_INFO_TYPE_TARGET)
                .filter_map(|mode| {
                    let mut device_name = DISPLAYCONFIG_TARGET_DEVICE_NAME::default();
                    device_name.header.size = size_of::<DISPLAYCONFIG_TARGET_DEVICE_NAME>() as u32;
                    device_name.header.adapterId = mode.adapterId;
                    device_name.header.id = mode.id;
                    device_name.header.r#type = DISPLAYCONFIG_DEVICE_INFO_GET_TARGET_NAME;

                    match WIN32_ERROR(DisplayConfigGetDeviceInfo(&mut device_name.header) as u32) {
                        ERROR_SUCCESS => Some((device_name.monitorDevicePath, device_name)),
                        ERROR_ACCESS_DENIED => None,
                        _ => None,
                    }
                })
                .collect())
        }
    }

    fn enum_display_monitors() -> Result<Vec<HMONITOR>, DisplayError> {
        unsafe extern "system" fn enum_monitors(
            handle: HMONITOR,
            _: HDC,
            _: *mut RECT,
            data: LPARAM,
        ) -> BOOL {
            let monitors = &mut *(data.0 as *mut Vec<HMONITOR>);
            monitors.push(handle);
            true.into()
        }
        unsafe {
            let mut hmonitors = Vec::<HMONITOR>::new();
            EnumDisplayMonitors(
                HDC::default(),
                None,
                Some(enum_monitors),
                LPARAM(&mut hmonitors as *mut _ as isize),
            )
            .ok()
            .map_err(|_| DisplayError::ConfigQuery)?;
            Ok(hmonitors)
        }
    }

    fn get_display_devices_from_hmonitor(
        hmonitor: HMONITOR,
    ) -> Result<Vec<(MONITORINFOEXW, DISPLAY_DEVICEW)>, DisplayError> {
        unsafe {
            let mut info = MONITORINFOEXW::default();
            info.monitorInfo.cbSize = size_of::<MONITORINFOEXW>() as u32;
            let info_ptr = &mut info as *mut _ as *mut MONITORINFO;
            GetMonitorInfoW(hmonitor, info_ptr)
                .ok()
                .map_err(|_| DisplayError::ConfigQuery)?;

            Ok((0..)
                .map_while(|device_number| {
                    let mut device = DISPLAY_DEVICEW {
                        cb: size_of::<DISPLAY_DEVICEW>() as u32,
                        ..Default::default()
                    };
                    EnumDisplayDevicesW(
                        PCWSTR(info.szDevice.as_ptr()),
                        device_number,
                        &mut device,
                        EDD_GET_DEVICE_INTERFACE_NAME,
                    )
                    .as_bool()
                    .then_some(device)
                })
                .filter(|device| flag_set(device.StateFlags, DISPLAY_DEVICE_ACTIVE))
                .map(|device| (info, device))
                .collect())
        }
    }

    fn wchar_to_string(s: &[u16]) -> String {
        let end = s.iter().position(|&x| x == 0).unwrap_or(s.len());
        OsString::from_wide(&s[0..end]).to_string_lossy().into()
    }
}
