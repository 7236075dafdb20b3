use std::ffi::c_void;
use std::mem::size_of;

use windows::Win32::Foundation::{BOOL, HWND, LPARAM, RECT, TRUE};
use windows::Win32::Graphics::Gdi::{
    EnumDisplayMonitors, GetMonitorInfoW, HDC, HMONITOR, MONITORINFO, MONITORINFOEXW,
};
use windows::Win32::UI::WindowsAndMessaging::{
    EnumWindows, GA_ROOT, GWL_STYLE, GetAncestor, GetShellWindow, GetWindowLongPtrW,
    GetWindowTextW, IsWindow, IsWindowVisible, WS_DISABLED,
};

use crate::SourceTarget;
use crate::enumerator::{SourceProvider, WindowProbe};
use crate::monitor::MonitorId;
use crate::window::WindowId;

const MONITORINFOF_PRIMARY: u32 = 1;
const MAX_TITLE_CHARS: usize = 512;

/// Live desktop as seen through `EnumWindows` and `EnumDisplayMonitors`.
pub(crate) struct DesktopSourceProvider;

impl SourceProvider for DesktopSourceProvider {
    fn window_probes(&self) -> Vec<WindowProbe> {
        let mut handles: Vec<HWND> = Vec::new();
        if let Err(err) = unsafe {
            EnumWindows(
                Some(collect_window),
                LPARAM(&mut handles as *mut Vec<HWND> as isize),
            )
        } {
            log::debug!("EnumWindows stopped early: {err}");
        }

        let shell = unsafe { GetShellWindow() };
        handles
            .into_iter()
            .map(|hwnd| probe_window(hwnd, shell))
            .collect()
    }

    fn monitors(&self) -> Vec<MonitorId> {
        let mut handles: Vec<HMONITOR> = Vec::new();
        unsafe {
            let _ = EnumDisplayMonitors(
                HDC::default(),
                None,
                Some(collect_monitor),
                LPARAM(&mut handles as *mut Vec<HMONITOR> as isize),
            );
        }
        handles.into_iter().filter_map(monitor_from_handle).collect()
    }

    fn is_alive(&self, target: &SourceTarget) -> bool {
        match target {
            SourceTarget::Window(window) => {
                !window.is_null() && unsafe { IsWindow(hwnd_from(window)) }.as_bool()
            }
            SourceTarget::Monitor(monitor) => monitor_info(hmonitor_from(monitor)).is_some(),
        }
    }
}

pub(crate) fn hwnd_from(window: &WindowId) -> HWND {
    HWND(window.raw_handle() as *mut c_void)
}

pub(crate) fn hmonitor_from(monitor: &MonitorId) -> HMONITOR {
    HMONITOR(monitor.raw_handle() as *mut c_void)
}

unsafe extern "system" fn collect_window(hwnd: HWND, lparam: LPARAM) -> BOOL {
    let handles = unsafe { &mut *(lparam.0 as *mut Vec<HWND>) };
    handles.push(hwnd);
    TRUE
}

unsafe extern "system" fn collect_monitor(
    monitor: HMONITOR,
    _hdc: HDC,
    _clip: *mut RECT,
    lparam: LPARAM,
) -> BOOL {
    let handles = unsafe { &mut *(lparam.0 as *mut Vec<HMONITOR>) };
    handles.push(monitor);
    TRUE
}

fn probe_window(hwnd: HWND, shell: HWND) -> WindowProbe {
    let window = WindowId::from_raw_handle(hwnd.0 as isize);
    let root = unsafe { GetAncestor(hwnd, GA_ROOT) };
    let style = unsafe { GetWindowLongPtrW(hwnd, GWL_STYLE) } as u32;
    WindowProbe {
        window,
        is_shell: hwnd == shell,
        visible: unsafe { IsWindowVisible(hwnd) }.as_bool(),
        root: WindowId::from_raw_handle(root.0 as isize),
        disabled: style & WS_DISABLED.0 != 0,
        title: window_title(hwnd),
    }
}

fn window_title(hwnd: HWND) -> Option<String> {
    let mut buffer = [0u16; MAX_TITLE_CHARS];
    let len = unsafe { GetWindowTextW(hwnd, &mut buffer) };
    let len = usize::try_from(len).ok()?;
    Some(String::from_utf16_lossy(&buffer[..len.min(buffer.len())]))
}

fn monitor_info(handle: HMONITOR) -> Option<MONITORINFOEXW> {
    if handle.0.is_null() {
        return None;
    }
    let mut info = MONITORINFOEXW {
        monitorInfo: MONITORINFO {
            cbSize: size_of::<MONITORINFOEXW>() as u32,
            ..Default::default()
        },
        ..Default::default()
    };
    if !unsafe { GetMonitorInfoW(handle, (&mut info as *mut MONITORINFOEXW).cast()) }.as_bool() {
        return None;
    }
    Some(info)
}

fn monitor_from_handle(handle: HMONITOR) -> Option<MonitorId> {
    let Some(info) = monitor_info(handle) else {
        log::debug!("skipping monitor {:?}: GetMonitorInfoW failed", handle.0);
        return None;
    };
    let name_len = info
        .szDevice
        .iter()
        .position(|ch| *ch == 0)
        .unwrap_or(info.szDevice.len());
    let name = String::from_utf16_lossy(&info.szDevice[..name_len]);
    let is_primary = info.monitorInfo.dwFlags & MONITORINFOF_PRIMARY != 0;
    Some(MonitorId::from_name(handle.0 as isize, name, is_primary))
}
