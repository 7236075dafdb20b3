use std::path::Path;

use crate::backend::{AutoBackendPolicy, CaptureBackend, CaptureBackendKind};
#[cfg(not(target_os = "windows"))]
use crate::backend::CaptureStream;
use crate::enumerator::SourceProvider;
#[cfg(not(target_os = "windows"))]
use crate::enumerator::WindowProbe;
use crate::error::{MirrorError, MirrorResult};
#[cfg(not(target_os = "windows"))]
use crate::monitor::MonitorId;

#[cfg(target_os = "windows")]
pub(crate) mod windows;

/// The host renderer's device that capture textures are opened on.
#[cfg(target_os = "windows")]
pub type RenderDevice = ::windows::Win32::Graphics::Direct3D11::ID3D11Device;

#[cfg(not(target_os = "windows"))]
pub type RenderDevice = ();

#[cfg(not(target_os = "windows"))]
fn unsupported_error() -> MirrorError {
    MirrorError::CaptureUnavailable("desktop capture is only supported on Windows".into())
}

#[cfg(not(target_os = "windows"))]
struct UnsupportedBackend {
    kind: CaptureBackendKind,
}

#[cfg(not(target_os = "windows"))]
impl CaptureBackend for UnsupportedBackend {
    fn kind(&self) -> CaptureBackendKind {
        self.kind
    }

    fn open(&self, _target: &crate::SourceTarget) -> MirrorResult<Box<dyn CaptureStream>> {
        Err(unsupported_error())
    }
}

#[cfg(not(target_os = "windows"))]
struct EmptyDesktop;

#[cfg(not(target_os = "windows"))]
impl SourceProvider for EmptyDesktop {
    fn window_probes(&self) -> Vec<WindowProbe> {
        Vec::new()
    }

    fn monitors(&self) -> Vec<MonitorId> {
        Vec::new()
    }

    fn is_alive(&self, _target: &crate::SourceTarget) -> bool {
        false
    }
}

/// Build the capture backend that opens streams on `device`.
#[cfg(target_os = "windows")]
pub fn backend_for_device(
    device: RenderDevice,
    kind: CaptureBackendKind,
    auto_policy: &AutoBackendPolicy,
) -> MirrorResult<Box<dyn CaptureBackend>> {
    Ok(Box::new(windows::WindowsBackend::new(
        device,
        kind,
        auto_policy.clone(),
    )))
}

#[cfg(not(target_os = "windows"))]
pub fn backend_for_device(
    _device: RenderDevice,
    kind: CaptureBackendKind,
    _auto_policy: &AutoBackendPolicy,
) -> MirrorResult<Box<dyn CaptureBackend>> {
    Ok(Box::new(UnsupportedBackend { kind }))
}

/// Create a standalone render device, for tools that run without a host
/// renderer.
#[cfg(target_os = "windows")]
pub fn create_render_device() -> MirrorResult<RenderDevice> {
    windows::d3d11::create_d3d11_device_default().map_err(MirrorError::Platform)
}

#[cfg(not(target_os = "windows"))]
pub fn create_render_device() -> MirrorResult<RenderDevice> {
    Ok(())
}

/// The live desktop's windows and monitors.
#[cfg(target_os = "windows")]
pub fn system_source_provider() -> Box<dyn SourceProvider> {
    Box::new(windows::enumerate::DesktopSourceProvider)
}

#[cfg(not(target_os = "windows"))]
pub fn system_source_provider() -> Box<dyn SourceProvider> {
    Box::new(EmptyDesktop)
}

#[cfg(target_os = "windows")]
pub(crate) fn install_overlay_hook(library_path: &Path, priority: i32) -> MirrorResult<()> {
    windows::overlay_hook::install(library_path, priority)
}

#[cfg(not(target_os = "windows"))]
pub(crate) fn install_overlay_hook(library_path: &Path, _priority: i32) -> MirrorResult<()> {
    Err(MirrorError::HookUnavailable(format!(
        "{} can only be patched on Windows",
        library_path.display()
    )))
}
