//! Per-frame driver tying the selector panel, the enumerator and the
//! registry together.

use crate::backend::CaptureBackend;
use crate::config::MirrorConfig;
use crate::enumerator::{SourceEnumerator, SourceProvider};
use crate::error::MirrorResult;
use crate::host::{HeaderMode, MirrorHost, Pose, with_panel};
use crate::overlay::install_overlay_priority_patch;
use crate::platform::{self, RenderDevice};
use crate::registry::MirrorRegistry;

pub const SELECTOR_TITLE: &str = "Window Selection";
const SELECTOR_CLOSE_LABEL: &str = "Close";
const SELECTOR_OPEN_LABEL: &str = "Open";

pub struct MirrorApp<M> {
    enumerator: SourceEnumerator,
    registry: MirrorRegistry<M>,
    provider: Box<dyn SourceProvider>,
    backend: Box<dyn CaptureBackend>,
    selector_pose: Pose,
    selector_minimized: bool,
}

impl<M> MirrorApp<M> {
    pub fn new(
        config: &MirrorConfig,
        provider: Box<dyn SourceProvider>,
        backend: Box<dyn CaptureBackend>,
    ) -> MirrorResult<Self> {
        Ok(Self {
            enumerator: SourceEnumerator::new(config.refresh_interval, config.title_filter()?),
            registry: MirrorRegistry::new(config.panel),
            provider,
            backend,
            selector_pose: config.selector_pose,
            selector_minimized: false,
        })
    }

    /// Wire the app to the desktop and the host's render device, installing
    /// the overlay priority patch on the way.
    pub fn for_device(config: &MirrorConfig, device: RenderDevice) -> MirrorResult<Self> {
        install_overlay_priority_patch(&config.overlay);
        let backend = platform::backend_for_device(device, config.backend, &config.auto_policy)?;
        log::info!("capture backend: {}", backend.kind().as_str());
        Self::new(config, platform::system_source_provider(), backend)
    }

    pub fn registry(&self) -> &MirrorRegistry<M> {
        &self.registry
    }

    pub fn enumerator(&self) -> &SourceEnumerator {
        &self.enumerator
    }

    pub fn selector_minimized(&self) -> bool {
        self.selector_minimized
    }

    /// Run one frame: selector panel, toggle edges, registry pass, draw.
    pub fn step<H>(&mut self, host: &mut H)
    where
        H: MirrorHost<Material = M> + ?Sized,
    {
        let Self {
            enumerator,
            registry,
            provider,
            backend,
            selector_pose,
            selector_minimized,
        } = self;

        with_panel(host, SELECTOR_TITLE, selector_pose, HeaderMode::Title, |host| {
            let label = if *selector_minimized {
                SELECTOR_OPEN_LABEL
            } else {
                SELECTOR_CLOSE_LABEL
            };
            let mut force = false;
            if host.button(label) {
                *selector_minimized = !*selector_minimized;
                force = !*selector_minimized;
            }
            if *selector_minimized {
                return;
            }

            enumerator.refresh(force, provider.as_ref(), |key| registry.is_mirrored(key));
            for candidate in enumerator.candidates_mut() {
                host.toggle(&candidate.source.title, &mut candidate.mirrored);
            }
        });

        registry.apply_edges(enumerator.take_toggle_edges());
        registry.update(provider.as_ref(), backend.as_ref(), host);
        registry.draw(host);
    }

    /// Release every mirror. The app can keep stepping afterwards.
    pub fn shutdown<H>(&mut self, host: &mut H)
    where
        H: MirrorHost<Material = M> + ?Sized,
    {
        log::info!("releasing {} mirrors", self.registry.len());
        self.registry.release_all(host);
    }
}
