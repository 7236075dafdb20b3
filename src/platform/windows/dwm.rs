use std::sync::OnceLock;

use anyhow::Context;
use windows::Win32::Foundation::{BOOL, HANDLE, HWND, LUID};
use windows::Win32::Graphics::Direct3D11::{ID3D11Device, ID3D11Texture2D};
use windows::Win32::System::LibraryLoader::{GetProcAddress, LoadLibraryW};
use windows::Win32::UI::WindowsAndMessaging::IsWindow;
use windows::core::{s, w};

use crate::SourceTarget;
use crate::backend::{CaptureBackendKind, CaptureStream, SharedTexture, TextureSize};
use crate::error::{MirrorError, MirrorResult};
use crate::window::WindowId;

use super::enumerate::hwnd_from;
use super::surface;

/// `user32!DwmGetDxSharedSurface`, undocumented and exported by name only.
type DwmGetDxSharedSurfaceFn = unsafe extern "system" fn(
    hwnd: HWND,
    surface: *mut HANDLE,
    adapter_luid: *mut LUID,
    format: *mut u32,
    flags: *mut u32,
    update_id: *mut u64,
) -> BOOL;

static SHARED_SURFACE_FN: OnceLock<Result<DwmGetDxSharedSurfaceFn, String>> = OnceLock::new();

fn shared_surface_fn() -> MirrorResult<DwmGetDxSharedSurfaceFn> {
    SHARED_SURFACE_FN
        .get_or_init(|| {
            let module = unsafe { LoadLibraryW(w!("user32.dll")) }
                .map_err(|err| format!("LoadLibraryW(user32.dll) failed: {err}"))?;
            let proc = unsafe { GetProcAddress(module, s!("DwmGetDxSharedSurface")) }
                .ok_or_else(|| "user32.dll does not export DwmGetDxSharedSurface".to_string())?;
            // SAFETY: the export has had this signature since Windows 7.
            Ok(unsafe { std::mem::transmute::<_, DwmGetDxSharedSurfaceFn>(proc) })
        })
        .clone()
        .map_err(MirrorError::CaptureUnavailable)
}

/// The compositor's own redirection surface for a window, opened on the
/// render device. DWM keeps drawing into it, so the texture stays current
/// without any per-frame work.
pub(crate) struct SharedSurfaceStream {
    window: WindowId,
    texture: Option<SharedTexture>,
}

impl SharedSurfaceStream {
    pub(crate) fn open(device: &ID3D11Device, target: &SourceTarget) -> MirrorResult<Self> {
        let SourceTarget::Window(window) = target else {
            return Err(MirrorError::CaptureUnavailable(
                "DWM shared surfaces exist for windows only".into(),
            ));
        };
        if window.is_null() {
            return Err(MirrorError::InvalidTarget(format!(
                "window handle is null: {}",
                window.stable_id()
            )));
        }
        let get_shared_surface = shared_surface_fn()?;

        let hwnd = hwnd_from(window);
        let mut handle = HANDLE::default();
        let mut luid = LUID::default();
        let mut format = 0u32;
        let mut flags = 0u32;
        let mut update_id = 0u64;
        let ok = unsafe {
            get_shared_surface(
                hwnd,
                &mut handle,
                &mut luid,
                &mut format,
                &mut flags,
                &mut update_id,
            )
        };
        if !ok.as_bool() || handle.is_invalid() {
            return Err(MirrorError::CaptureUnavailable(format!(
                "DwmGetDxSharedSurface returned no surface for window {}",
                window.stable_id()
            )));
        }

        let mut texture: Option<ID3D11Texture2D> = None;
        unsafe { device.OpenSharedResource(handle, &mut texture) }
            .context("ID3D11Device::OpenSharedResource failed")
            .map_err(MirrorError::Platform)?;
        let texture = texture
            .context("OpenSharedResource returned no texture")
            .map_err(MirrorError::Platform)?;
        let texture = surface::share_texture(texture);
        log::debug!(
            "opened DWM surface {}x{} for window {}",
            texture.desc().width,
            texture.desc().height,
            window.stable_id()
        );

        Ok(Self {
            window: *window,
            texture: Some(texture),
        })
    }
}

impl CaptureStream for SharedSurfaceStream {
    fn poll_frame(&mut self) -> MirrorResult<Option<SharedTexture>> {
        if self.texture.is_none() || !unsafe { IsWindow(hwnd_from(&self.window)) }.as_bool() {
            return Err(MirrorError::SourceLost);
        }
        Ok(self.texture.clone())
    }

    fn size(&self) -> TextureSize {
        self.texture
            .as_ref()
            .map(|texture| texture.desc().size())
            .unwrap_or_default()
    }

    fn close(&mut self) {
        self.texture = None;
    }

    fn kind(&self) -> CaptureBackendKind {
        CaptureBackendKind::SharedSurface
    }
}

impl Drop for SharedSurfaceStream {
    fn drop(&mut self) {
        self.close();
    }
}
