pub mod app;
pub mod backend;
pub mod config;
pub mod enumerator;
pub(crate) mod env_config;
pub mod error;
pub mod host;
pub mod monitor;
pub mod overlay;
mod platform;
pub mod registry;
pub mod source;
pub mod window;

use source::SourceKey;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum SourceTarget {
    /// A top-level window by native window handle.
    Window(window::WindowId),

    /// A whole monitor by native monitor handle.
    Monitor(monitor::MonitorId),
}

impl SourceTarget {
    pub fn key(&self) -> SourceKey {
        match self {
            Self::Window(window) => SourceKey::Window(window.raw_handle()),
            Self::Monitor(monitor) => SourceKey::Monitor(monitor.raw_handle()),
        }
    }

    pub fn stable_id(&self) -> String {
        match self {
            Self::Window(window) => format!("window:{}", window.stable_id()),
            Self::Monitor(monitor) => format!("monitor:{}", monitor.stable_id()),
        }
    }
}

pub use app::MirrorApp;
pub use backend::{
    CaptureBackend, CaptureBackendKind, CaptureStream, SharedTexture, TextureDesc, TextureSize,
};
pub use config::MirrorConfig;
pub use enumerator::{CandidateEntry, SourceEnumerator, SourceProvider, ToggleEdge, WindowProbe};
pub use host::{HeaderMode, MirrorHost, Pose, QuadTransform, Quat, Vec2, Vec3};
pub use monitor::MonitorId;
pub use overlay::{OverlayPatchConfig, OverlayPatchOutcome, install_overlay_priority_patch};
pub use registry::{CleanupReason, MirrorEntry, MirrorRegistry, MirrorState, PanelDefaults};
pub use source::{Source, TitleFilter};
pub use window::WindowId;

pub use platform::{
    RenderDevice, backend_for_device, create_render_device, system_source_provider,
};
