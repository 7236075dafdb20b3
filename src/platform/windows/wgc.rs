use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Context;
use windows::Foundation::{EventRegistrationToken, TypedEventHandler};
use windows::Graphics::Capture::{
    Direct3D11CaptureFrame, Direct3D11CaptureFramePool, GraphicsCaptureItem,
    GraphicsCaptureSession,
};
use windows::Graphics::DirectX::Direct3D11::IDirect3DDevice;
use windows::Graphics::DirectX::DirectXPixelFormat;
use windows::Graphics::SizeInt32;
use windows::Win32::Graphics::Direct3D11::{ID3D11Device, ID3D11Texture2D};
use windows::Win32::Graphics::Dxgi::IDXGIDevice;
use windows::Win32::System::WinRT::Direct3D11::{
    CreateDirect3D11DeviceFromDXGIDevice, IDirect3DDxgiInterfaceAccess,
};
use windows::Win32::System::WinRT::Graphics::Capture::IGraphicsCaptureItemInterop;
use windows::core::{IInspectable, Interface};

use crate::SourceTarget;
use crate::backend::{CaptureBackendKind, CaptureStream, FrameSlot, SharedTexture, TextureSize};
use crate::error::{MirrorError, MirrorResult};

use super::com::CoInitGuard;
use super::enumerate::{hmonitor_from, hwnd_from};
use super::{map_platform_error, surface};

const FRAME_POOL_BUFFERS: i32 = 2;
const PIXEL_FORMAT: DirectXPixelFormat = DirectXPixelFormat::B8G8R8A8UIntNormalized;

fn create_winrt_device(device: &ID3D11Device) -> MirrorResult<IDirect3DDevice> {
    let dxgi_device: IDXGIDevice = device
        .cast()
        .context("failed to cast ID3D11Device to IDXGIDevice")
        .map_err(MirrorError::Platform)?;
    let inspectable = unsafe { CreateDirect3D11DeviceFromDXGIDevice(&dxgi_device) }
        .context("CreateDirect3D11DeviceFromDXGIDevice failed")
        .map_err(MirrorError::Platform)?;
    inspectable
        .cast()
        .context("failed to cast IInspectable to IDirect3DDevice")
        .map_err(MirrorError::Platform)
}

fn create_capture_item(target: &SourceTarget) -> MirrorResult<GraphicsCaptureItem> {
    let interop = windows::core::factory::<GraphicsCaptureItem, IGraphicsCaptureItemInterop>()
        .context("failed to get IGraphicsCaptureItemInterop factory")
        .map_err(MirrorError::Platform)?;
    match target {
        SourceTarget::Window(window) => {
            if window.is_null() {
                return Err(MirrorError::InvalidTarget(format!(
                    "window handle is null: {}",
                    window.stable_id()
                )));
            }
            unsafe { interop.CreateForWindow(hwnd_from(window)) }
                .context("IGraphicsCaptureItemInterop::CreateForWindow failed")
                .map_err(|err| MirrorError::CaptureUnavailable(format!("{err:#}")))
        }
        SourceTarget::Monitor(monitor) => unsafe { interop.CreateForMonitor(hmonitor_from(monitor)) }
            .context("IGraphicsCaptureItemInterop::CreateForMonitor failed")
            .map_err(|err| MirrorError::CaptureUnavailable(format!("{err:#}"))),
    }
}

pub(crate) fn validate_support() -> MirrorResult<()> {
    let supported = GraphicsCaptureSession::IsSupported()
        .context("GraphicsCaptureSession::IsSupported failed")
        .map_err(MirrorError::Platform)?;
    if supported {
        Ok(())
    } else {
        Err(MirrorError::CaptureUnavailable(
            "Windows Graphics Capture is not supported on this system".into(),
        ))
    }
}

fn texture_size(size: SizeInt32) -> TextureSize {
    TextureSize::new(size.Width.max(0) as u32, size.Height.max(0) as u32)
}

/// Windows.Graphics.Capture session feeding a two-buffer frame pool that
/// lives on the host's render device.
pub(crate) struct FramePoolStream {
    _com: CoInitGuard,
    winrt_device: IDirect3DDevice,
    item: GraphicsCaptureItem,
    frame_pool: Direct3D11CaptureFramePool,
    session: GraphicsCaptureSession,
    closed_token: EventRegistrationToken,
    source_closed: Arc<AtomicBool>,
    pool_size: SizeInt32,
    slot: FrameSlot<Direct3D11CaptureFrame>,
    open: bool,
}

impl FramePoolStream {
    pub(crate) fn open(device: &ID3D11Device, target: &SourceTarget) -> MirrorResult<Self> {
        validate_support()?;
        let com = CoInitGuard::init_multithreaded().map_err(MirrorError::Platform)?;
        let item = create_capture_item(target)?;
        let winrt_device = create_winrt_device(device)?;
        let pool_size = item
            .Size()
            .context("GraphicsCaptureItem::Size failed")
            .map_err(MirrorError::Platform)?;

        let frame_pool = Direct3D11CaptureFramePool::CreateFreeThreaded(
            &winrt_device,
            PIXEL_FORMAT,
            FRAME_POOL_BUFFERS,
            pool_size,
        )
        .context("Direct3D11CaptureFramePool::CreateFreeThreaded failed")
        .map_err(MirrorError::Platform)?;
        let session = frame_pool
            .CreateCaptureSession(&item)
            .context("Direct3D11CaptureFramePool::CreateCaptureSession failed")
            .map_err(MirrorError::Platform)?;
        // Best-effort: older builds reject both setters.
        let _ = session.SetIsCursorCaptureEnabled(false);
        let _ = session.SetIsBorderRequired(false);

        let source_closed = Arc::new(AtomicBool::new(false));
        let closed_flag = source_closed.clone();
        let closed_token = item
            .Closed(
                &TypedEventHandler::<GraphicsCaptureItem, IInspectable>::new(move |_, _| {
                    closed_flag.store(true, Ordering::Release);
                    Ok(())
                }),
            )
            .context("GraphicsCaptureItem::Closed registration failed")
            .map_err(MirrorError::Platform)?;

        session
            .StartCapture()
            .context("GraphicsCaptureSession::StartCapture failed")
            .map_err(MirrorError::Platform)?;

        Ok(Self {
            _com: com,
            winrt_device,
            item,
            frame_pool,
            session,
            closed_token,
            source_closed,
            pool_size,
            slot: FrameSlot::new(),
            open: true,
        })
    }

    fn take_newest_frame(&self) -> Option<Direct3D11CaptureFrame> {
        let mut newest: Option<Direct3D11CaptureFrame> = None;
        while let Ok(frame) = self.frame_pool.TryGetNextFrame() {
            if let Some(previous) = newest.replace(frame) {
                let _ = previous.Close();
            }
        }
        newest
    }

    fn recreate_pool_if_needed(
        frame_pool: &Direct3D11CaptureFramePool,
        winrt_device: &IDirect3DDevice,
        pool_size: &mut SizeInt32,
        frame: &Direct3D11CaptureFrame,
    ) -> MirrorResult<()> {
        let content_size = frame.ContentSize().map_err(|error| {
            map_platform_error(error, "Direct3D11CaptureFrame::ContentSize failed")
        })?;
        if content_size.Width <= 0 || content_size.Height <= 0 {
            return Ok(());
        }
        if content_size.Width != pool_size.Width || content_size.Height != pool_size.Height {
            log::debug!(
                "frame pool resized {}x{} -> {}x{}",
                pool_size.Width,
                pool_size.Height,
                content_size.Width,
                content_size.Height
            );
            frame_pool
                .Recreate(winrt_device, PIXEL_FORMAT, FRAME_POOL_BUFFERS, content_size)
                .map_err(|error| {
                    map_platform_error(error, "Direct3D11CaptureFramePool::Recreate failed")
                })?;
            *pool_size = content_size;
        }
        Ok(())
    }

    fn frame_texture(frame: &Direct3D11CaptureFrame) -> MirrorResult<ID3D11Texture2D> {
        let frame_surface = frame
            .Surface()
            .map_err(|error| map_platform_error(error, "Direct3D11CaptureFrame::Surface failed"))?;
        let access: IDirect3DDxgiInterfaceAccess = frame_surface
            .cast()
            .context("failed to cast frame surface to IDirect3DDxgiInterfaceAccess")
            .map_err(MirrorError::Platform)?;
        unsafe { access.GetInterface() }.map_err(|error| {
            map_platform_error(error, "IDirect3DDxgiInterfaceAccess::GetInterface failed")
        })
    }
}

impl CaptureStream for FramePoolStream {
    fn poll_frame(&mut self) -> MirrorResult<Option<SharedTexture>> {
        if !self.open || self.source_closed.load(Ordering::Acquire) {
            return Err(MirrorError::SourceLost);
        }
        let newest = self.take_newest_frame();
        let Self {
            frame_pool,
            winrt_device,
            pool_size,
            slot,
            ..
        } = self;
        slot.advance(
            newest,
            |frame| {
                Self::recreate_pool_if_needed(frame_pool, winrt_device, pool_size, frame)?;
                Self::frame_texture(frame).map(surface::share_texture)
            },
            |frame| {
                let _ = frame.Close();
            },
        )
    }

    fn size(&self) -> TextureSize {
        match self.item.Size() {
            Ok(size) if size.Width > 0 && size.Height > 0 => texture_size(size),
            _ => texture_size(self.pool_size),
        }
    }

    fn close(&mut self) {
        if !self.open {
            return;
        }
        self.open = false;
        let _ = self.item.RemoveClosed(self.closed_token);
        if let Some(frame) = self.slot.clear() {
            let _ = frame.Close();
        }
        let _ = self.session.Close();
        let _ = self.frame_pool.Close();
    }

    fn kind(&self) -> CaptureBackendKind {
        CaptureBackendKind::FramePool
    }
}

impl Drop for FramePoolStream {
    fn drop(&mut self) {
        self.close();
    }
}
