//! The set of mirrored sources and the per-source capture lifecycle.
//!
//! Each entry moves through `PendingResources -> Live -> PendingCleanup`;
//! leaving the registry (the implicit `Absent` state) always goes through
//! [`MirrorEntry::release`], which closes the capture stream and hands the
//! material back to the host before the entry is dropped.

use crate::backend::{CaptureBackend, CaptureStream, SharedTexture, TextureSize};
use crate::enumerator::{SourceProvider, ToggleEdge};
use crate::host::{HeaderMode, MirrorHost, Pose, QuadTransform, Quat, Vec2, Vec3, with_panel};
use crate::source::{Source, SourceKey};

pub const SCALE_STEP_UP: f32 = 1.1;
pub const SCALE_STEP_DOWN: f32 = 0.9;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PanelDefaults {
    pub scale: f32,
    /// Physical size of one captured pixel at scale 1.0.
    pub meters_per_pixel: f32,
    /// Depth of the first panel.
    pub base_depth: f32,
    /// Depth offset added per existing panel so new panels do not overlap.
    pub stagger_step: f32,
}

impl Default for PanelDefaults {
    fn default() -> Self {
        Self {
            scale: 0.5,
            meters_per_pixel: 0.0004,
            base_depth: -0.5,
            stagger_step: 0.001,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CleanupReason {
    ToggledOff,
    SourceLost,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MirrorState {
    PendingResources,
    Live,
    PendingCleanup(CleanupReason),
}

/// Buttons activated on one panel during a draw.
struct PanelButtons {
    grow: bool,
    shrink: bool,
    toggle_title: bool,
    toggle_minimized: bool,
}

pub struct MirrorEntry<M> {
    source: Source,
    stream: Option<Box<dyn CaptureStream>>,
    texture: Option<SharedTexture>,
    material: Option<M>,
    pub pose: Pose,
    pub scale: f32,
    pub decorate: bool,
    pub minimized: bool,
    state: MirrorState,
}

impl<M> MirrorEntry<M> {
    fn new(source: Source, pose: Pose, scale: f32) -> Self {
        Self {
            source,
            stream: None,
            texture: None,
            material: None,
            pose,
            scale,
            decorate: true,
            minimized: false,
            state: MirrorState::PendingResources,
        }
    }

    pub fn source(&self) -> &Source {
        &self.source
    }

    pub fn key(&self) -> SourceKey {
        self.source.key()
    }

    pub fn state(&self) -> MirrorState {
        self.state
    }

    pub fn texture(&self) -> Option<&SharedTexture> {
        self.texture.as_ref()
    }

    pub fn has_stream(&self) -> bool {
        self.stream.is_some()
    }

    pub fn is_pending_cleanup(&self) -> bool {
        matches!(self.state, MirrorState::PendingCleanup(_))
    }

    pub fn scale_up(&mut self) {
        self.scale *= SCALE_STEP_UP;
    }

    pub fn scale_down(&mut self) {
        self.scale *= SCALE_STEP_DOWN;
    }

    pub fn toggle_decorate(&mut self) {
        self.decorate = !self.decorate;
    }

    pub fn toggle_minimized(&mut self) {
        self.minimized = !self.minimized;
    }

    /// Size of the captured content as reported by the stream, falling back
    /// to the last texture.
    pub fn content_size(&self) -> TextureSize {
        match (&self.stream, &self.texture) {
            (Some(stream), _) => stream.size(),
            (None, Some(texture)) => texture.desc().size(),
            (None, None) => TextureSize::default(),
        }
    }

    pub fn display_size(&self, meters_per_pixel: f32) -> Vec2 {
        let size = self.content_size();
        let factor = meters_per_pixel * self.scale;
        Vec2::new(size.width as f32 * factor, size.height as f32 * factor)
    }

    fn begin_cleanup(&mut self, reason: CleanupReason) {
        if !self.is_pending_cleanup() {
            self.state = MirrorState::PendingCleanup(reason);
        }
    }

    fn close_stream(&mut self) {
        self.texture = None;
        if let Some(mut stream) = self.stream.take() {
            stream.close();
        }
    }

    fn acquire<H>(&mut self, backend: &dyn CaptureBackend, host: &mut H)
    where
        H: MirrorHost<Material = M> + ?Sized,
    {
        if self.stream.is_none() {
            match backend.open(&self.source.target) {
                Ok(stream) => {
                    log::info!(
                        "opened {} capture for {:?}",
                        stream.kind().as_str(),
                        self.source.title
                    );
                    self.stream = Some(stream);
                }
                Err(err) => {
                    log::warn!("failed to open capture for {:?}: {err}", self.source.title);
                    return;
                }
            }
        }
        self.refresh_texture(host);
    }

    fn refresh_texture<H>(&mut self, host: &mut H)
    where
        H: MirrorHost<Material = M> + ?Sized,
    {
        let Some(stream) = self.stream.as_mut() else {
            return;
        };
        let texture = match stream.poll_frame() {
            Ok(Some(texture)) => texture,
            Ok(None) => return,
            Err(err) if err.is_source_lost() => {
                log::debug!("capture source {:?} went away: {err}", self.source.title);
                self.begin_cleanup(CleanupReason::SourceLost);
                return;
            }
            Err(err) if err.is_retryable() => {
                log::warn!(
                    "capture for {:?} needs reopening: {err}",
                    self.source.title
                );
                self.close_stream();
                self.state = MirrorState::PendingResources;
                return;
            }
            Err(err) => {
                log::warn!("failed to poll capture for {:?}: {err}", self.source.title);
                return;
            }
        };

        if self.material.is_some() && self.texture.as_ref() == Some(&texture) {
            self.state = MirrorState::Live;
            return;
        }
        match self.material.as_mut() {
            Some(material) => host.bind_texture(material, &texture),
            None => match host.create_material(&texture) {
                Ok(material) => self.material = Some(material),
                Err(err) => {
                    log::warn!(
                        "failed to create material for {:?}: {err}",
                        self.source.title
                    );
                    return;
                }
            },
        }
        self.texture = Some(texture);
        self.state = MirrorState::Live;
    }

    fn draw<H>(&mut self, host: &mut H, meters_per_pixel: f32)
    where
        H: MirrorHost<Material = M> + ?Sized,
    {
        let size = self.display_size(meters_per_pixel);
        let header = if self.decorate {
            HeaderMode::Title
        } else {
            HeaderMode::Empty
        };
        let minimized = self.minimized;
        let decorate = self.decorate;
        let material = self.material.as_ref();
        let pressed = with_panel(host, &self.source.title, &mut self.pose, header, |host| {
            if !minimized {
                host.reserve(size);
                if let Some(material) = material {
                    host.draw_textured_quad(material, &QuadTransform::top_anchored(size));
                }
            }

            let grow = host.button("+");
            host.same_line();
            let shrink = host.button("-");
            let toggle_title = host.button(if decorate { "Hide title" } else { "Show title" });
            host.same_line();
            let toggle_minimized = host.button(if minimized { "Restore" } else { "Minimize" });
            PanelButtons {
                grow,
                shrink,
                toggle_title,
                toggle_minimized,
            }
        });

        if pressed.grow {
            self.scale_up();
        }
        if pressed.shrink {
            self.scale_down();
        }
        if pressed.toggle_title {
            self.toggle_decorate();
        }
        if pressed.toggle_minimized {
            self.toggle_minimized();
        }
    }

    /// Tear down every resource the entry holds. The stream is closed before
    /// this returns.
    fn release<H>(mut self, host: &mut H)
    where
        H: MirrorHost<Material = M> + ?Sized,
    {
        if let Some(material) = self.material.take() {
            host.release_material(material);
        }
        self.close_stream();
        log::debug!("released mirror for {:?}", self.source.title);
    }
}

pub struct MirrorRegistry<M> {
    entries: Vec<MirrorEntry<M>>,
    defaults: PanelDefaults,
}

impl<M> MirrorRegistry<M> {
    pub fn new(defaults: PanelDefaults) -> Self {
        Self {
            entries: Vec::new(),
            defaults,
        }
    }

    pub fn defaults(&self) -> &PanelDefaults {
        &self.defaults
    }

    /// Entries in insertion order.
    pub fn entries(&self) -> &[MirrorEntry<M>] {
        &self.entries
    }

    pub fn entries_mut(&mut self) -> &mut [MirrorEntry<M>] {
        &mut self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &SourceKey) -> Option<&MirrorEntry<M>> {
        self.entries.iter().find(|entry| entry.key() == *key)
    }

    fn get_mut(&mut self, key: &SourceKey) -> Option<&mut MirrorEntry<M>> {
        self.entries.iter_mut().find(|entry| entry.key() == *key)
    }

    /// Whether the source is mirrored and not on its way out.
    pub fn is_mirrored(&self, key: &SourceKey) -> bool {
        self.get(key).is_some_and(|entry| !entry.is_pending_cleanup())
    }

    pub fn apply_edges(&mut self, edges: impl IntoIterator<Item = ToggleEdge>) {
        for edge in edges {
            match edge {
                ToggleEdge::On(source) => self.toggle_on(source),
                ToggleEdge::Off(source) => self.toggle_off(&source.key()),
            }
        }
    }

    pub fn toggle_on(&mut self, source: Source) {
        if let Some(entry) = self.get_mut(&source.key()) {
            match entry.state {
                MirrorState::PendingCleanup(CleanupReason::ToggledOff) => {
                    entry.state = if entry.texture.is_some() && entry.material.is_some() {
                        MirrorState::Live
                    } else {
                        MirrorState::PendingResources
                    };
                }
                MirrorState::PendingCleanup(CleanupReason::SourceLost) => {
                    entry.close_stream();
                    entry.state = MirrorState::PendingResources;
                }
                MirrorState::PendingResources | MirrorState::Live => {}
            }
            entry.source.title = source.title;
            return;
        }

        let depth =
            self.defaults.base_depth + self.defaults.stagger_step * self.entries.len() as f32;
        let pose = Pose::new(Vec3::new(0.0, 0.0, depth), Quat::FACING_ORIGIN);
        log::info!("mirroring {:?}", source.title);
        self.entries
            .push(MirrorEntry::new(source, pose, self.defaults.scale));
    }

    pub fn toggle_off(&mut self, key: &SourceKey) {
        if let Some(entry) = self.get_mut(key) {
            entry.begin_cleanup(CleanupReason::ToggledOff);
        }
    }

    /// One registry pass: drop entries marked for cleanup, then check
    /// liveness and advance capture resources for the rest.
    pub fn update<H>(
        &mut self,
        provider: &dyn SourceProvider,
        backend: &dyn CaptureBackend,
        host: &mut H,
    ) where
        H: MirrorHost<Material = M> + ?Sized,
    {
        self.purge(host);

        for entry in &mut self.entries {
            if !provider.is_alive(&entry.source.target) {
                log::debug!("source {:?} no longer exists", entry.source.title);
                entry.begin_cleanup(CleanupReason::SourceLost);
                continue;
            }
            match entry.state {
                MirrorState::PendingResources => entry.acquire(backend, host),
                MirrorState::Live => entry.refresh_texture(host),
                MirrorState::PendingCleanup(_) => {}
            }
        }
    }

    /// Draw every live entry in insertion order.
    pub fn draw<H>(&mut self, host: &mut H)
    where
        H: MirrorHost<Material = M> + ?Sized,
    {
        let meters_per_pixel = self.defaults.meters_per_pixel;
        for entry in &mut self.entries {
            if entry.state == MirrorState::Live {
                entry.draw(host, meters_per_pixel);
            }
        }
    }

    pub fn release_all<H>(&mut self, host: &mut H)
    where
        H: MirrorHost<Material = M> + ?Sized,
    {
        for entry in self.entries.drain(..) {
            entry.release(host);
        }
    }

    fn purge<H>(&mut self, host: &mut H)
    where
        H: MirrorHost<Material = M> + ?Sized,
    {
        let mut index = 0;
        while index < self.entries.len() {
            if self.entries[index].is_pending_cleanup() {
                let entry = self.entries.remove(index);
                entry.release(host);
            } else {
                index += 1;
            }
        }
    }
}
