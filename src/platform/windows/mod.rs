pub(crate) mod com;
pub(crate) mod d3d11;
pub(crate) mod dwm;
pub(crate) mod enumerate;
pub(crate) mod overlay_hook;
pub(crate) mod surface;
pub(crate) mod wgc;

use windows::Win32::Graphics::Direct3D11::ID3D11Device;
use windows::Win32::Graphics::Dxgi::DXGI_ERROR_ACCESS_LOST;

use crate::SourceTarget;
use crate::backend::{
    AutoBackendPolicy, CaptureBackend, CaptureBackendKind, CaptureStream, open_with_fallback,
};
use crate::error::{MirrorError, MirrorResult};

pub(crate) fn map_platform_error(error: windows::core::Error, context: &str) -> MirrorError {
    if error.code() == DXGI_ERROR_ACCESS_LOST {
        return MirrorError::AccessLost;
    }
    MirrorError::Platform(anyhow::Error::from(error).context(context.to_string()))
}

/// Capture strategies bound to the host's D3D11 device.
pub(crate) struct WindowsBackend {
    device: ID3D11Device,
    kind: CaptureBackendKind,
    auto_policy: AutoBackendPolicy,
}

impl WindowsBackend {
    pub(crate) fn new(
        device: ID3D11Device,
        kind: CaptureBackendKind,
        auto_policy: AutoBackendPolicy,
    ) -> Self {
        Self {
            device,
            kind,
            auto_policy,
        }
    }

    fn open_by_kind(
        &self,
        kind: CaptureBackendKind,
        target: &SourceTarget,
    ) -> MirrorResult<Box<dyn CaptureStream>> {
        match kind {
            CaptureBackendKind::Auto => Err(MirrorError::InvalidConfig(
                "auto backend selection is handled separately".to_string(),
            )),
            CaptureBackendKind::FramePool => {
                Ok(Box::new(wgc::FramePoolStream::open(&self.device, target)?))
            }
            CaptureBackendKind::SharedSurface => {
                Ok(Box::new(dwm::SharedSurfaceStream::open(&self.device, target)?))
            }
        }
    }
}

impl CaptureBackend for WindowsBackend {
    fn kind(&self) -> CaptureBackendKind {
        self.kind
    }

    fn open(&self, target: &SourceTarget) -> MirrorResult<Box<dyn CaptureStream>> {
        match self.kind {
            CaptureBackendKind::Auto => open_with_fallback(
                &self.auto_policy.normalized_priority(),
                target,
                |kind, target| self.open_by_kind(kind, target),
            ),
            other => self.open_by_kind(other, target),
        }
    }
}
