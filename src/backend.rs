use std::any::Any;
use std::ffi::c_void;
use std::fmt;
use std::rc::Rc;

use crate::SourceTarget;
use crate::error::{MirrorError, MirrorErrorClass, MirrorResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CaptureBackendKind {
    Auto,

    /// Windows.Graphics.Capture session with a two-buffer frame pool.
    FramePool,

    /// DWM shared surface opened against the render device.
    SharedSurface,
}

impl CaptureBackendKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::FramePool => "wgc",
            Self::SharedSurface => "dwm",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "auto" => Some(Self::Auto),
            "wgc" | "frame-pool" | "framepool" => Some(Self::FramePool),
            "dwm" | "shared-surface" | "sharedsurface" => Some(Self::SharedSurface),
            _ => None,
        }
    }
}

impl Default for CaptureBackendKind {
    fn default() -> Self {
        Self::Auto
    }
}

#[derive(Clone, Debug)]
pub struct AutoBackendPolicy {
    pub priority: Vec<CaptureBackendKind>,
}

impl AutoBackendPolicy {
    pub fn normalized_priority(&self) -> Vec<CaptureBackendKind> {
        let mut normalized = Vec::new();
        for kind in &self.priority {
            if *kind == CaptureBackendKind::Auto {
                continue;
            }
            if !normalized.contains(kind) {
                normalized.push(*kind);
            }
        }
        if normalized.is_empty() {
            normalized.extend(DEFAULT_AUTO_BACKEND_PRIORITY);
        }
        normalized
    }
}

impl Default for AutoBackendPolicy {
    fn default() -> Self {
        Self {
            priority: DEFAULT_AUTO_BACKEND_PRIORITY.to_vec(),
        }
    }
}

pub const DEFAULT_AUTO_BACKEND_PRIORITY: [CaptureBackendKind; 2] = [
    CaptureBackendKind::FramePool,
    CaptureBackendKind::SharedSurface,
];

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TextureSize {
    pub width: u32,
    pub height: u32,
}

impl TextureSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Dimensions and native pixel format (`DXGI_FORMAT` value) of a texture,
/// read from the texture itself each time a frame is taken.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TextureDesc {
    pub width: u32,
    pub height: u32,
    pub format: u32,
}

impl TextureDesc {
    pub fn size(&self) -> TextureSize {
        TextureSize::new(self.width, self.height)
    }
}

/// A GPU texture owned by the OS compositor or capture pipeline, exposed to
/// the host renderer without a CPU copy.
///
/// Cloning shares the underlying reference. The raw pointer stays valid for
/// as long as any clone is alive.
#[derive(Clone)]
pub struct SharedTexture {
    raw: *mut c_void,
    desc: TextureDesc,
    owner: Rc<dyn Any>,
}

impl SharedTexture {
    pub fn new(raw: *mut c_void, desc: TextureDesc, owner: impl Any) -> Self {
        Self {
            raw,
            desc,
            owner: Rc::new(owner),
        }
    }

    /// Native texture pointer (`ID3D11Texture2D*` on Windows).
    pub fn raw(&self) -> *mut c_void {
        self.raw
    }

    pub fn desc(&self) -> TextureDesc {
        self.desc
    }

    pub fn owner<T: Any>(&self) -> Option<&T> {
        self.owner.downcast_ref::<T>()
    }
}

impl PartialEq for SharedTexture {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw && self.desc == other.desc
    }
}

impl fmt::Debug for SharedTexture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedTexture")
            .field("raw", &self.raw)
            .field("desc", &self.desc)
            .finish()
    }
}

/// The frame a stream currently exposes together with its shared texture.
///
/// The frame stays held until a newer one replaces it so the texture remains
/// valid while the host samples it. When no newer frame arrived, `advance`
/// hands back the cached texture unchanged.
#[cfg_attr(not(target_os = "windows"), allow(dead_code))]
pub(crate) struct FrameSlot<F> {
    frame: Option<F>,
    texture: Option<SharedTexture>,
}

#[cfg_attr(not(target_os = "windows"), allow(dead_code))]
impl<F> FrameSlot<F> {
    pub(crate) fn new() -> Self {
        Self {
            frame: None,
            texture: None,
        }
    }

    pub(crate) fn texture(&self) -> Option<SharedTexture> {
        self.texture.clone()
    }

    /// Install `newest` if there is one, releasing the frame it replaces.
    ///
    /// A frame whose texture cannot be produced is released and the cached
    /// frame stays in place.
    pub(crate) fn advance(
        &mut self,
        newest: Option<F>,
        texture_of: impl FnOnce(&F) -> MirrorResult<SharedTexture>,
        mut release: impl FnMut(F),
    ) -> MirrorResult<Option<SharedTexture>> {
        let Some(frame) = newest else {
            return Ok(self.texture.clone());
        };
        let texture = match texture_of(&frame) {
            Ok(texture) => texture,
            Err(err) => {
                release(frame);
                return Err(err);
            }
        };
        if let Some(previous) = self.frame.replace(frame) {
            release(previous);
        }
        self.texture = Some(texture.clone());
        Ok(Some(texture))
    }

    /// Drop the cached texture and hand back the held frame.
    pub(crate) fn clear(&mut self) -> Option<F> {
        self.texture = None;
        self.frame.take()
    }
}

/// One open capture stream for one source.
pub trait CaptureStream {
    /// Return the most recent texture without waiting.
    ///
    /// When no new frame has been produced since the last call the cached
    /// texture is returned unchanged. `Ok(None)` means no frame has arrived
    /// yet.
    fn poll_frame(&mut self) -> MirrorResult<Option<SharedTexture>>;

    /// Current size of the captured content.
    fn size(&self) -> TextureSize;

    /// Release OS resources. Idempotent; implementations also call this from
    /// `Drop`.
    fn close(&mut self);

    fn kind(&self) -> CaptureBackendKind;
}

pub trait CaptureBackend {
    fn kind(&self) -> CaptureBackendKind;

    fn open(&self, target: &SourceTarget) -> MirrorResult<Box<dyn CaptureStream>>;
}

/// Try each strategy in `priority` order and return the first stream that
/// opens. Invalid input stops the search; other failures are collected into
/// one `CaptureUnavailable`.
#[cfg_attr(not(target_os = "windows"), allow(dead_code))]
pub(crate) fn open_with_fallback(
    priority: &[CaptureBackendKind],
    target: &SourceTarget,
    open_by_kind: impl Fn(CaptureBackendKind, &SourceTarget) -> MirrorResult<Box<dyn CaptureStream>>,
) -> MirrorResult<Box<dyn CaptureStream>> {
    let mut errors: Vec<(CaptureBackendKind, MirrorError)> = Vec::new();

    for &kind in priority {
        match open_by_kind(kind, target) {
            Ok(stream) => {
                if !errors.is_empty() {
                    log::debug!(
                        "fell back to {} for {}: {}",
                        kind.as_str(),
                        target.stable_id(),
                        format_backend_errors(&errors)
                    );
                }
                return Ok(stream);
            }
            Err(err) if err.class() == MirrorErrorClass::InvalidInput => return Err(err),
            Err(err) => errors.push((kind, err)),
        }
    }

    Err(MirrorError::CaptureUnavailable(format!(
        "failed to open auto backend for {}: {}",
        target.stable_id(),
        format_backend_errors(&errors)
    )))
}

#[cfg_attr(not(target_os = "windows"), allow(dead_code))]
fn format_backend_errors(errors: &[(CaptureBackendKind, MirrorError)]) -> String {
    let mut combined = String::new();
    for (index, (kind, error)) in errors.iter().enumerate() {
        if index != 0 {
            combined.push_str("; ");
        }
        combined.push_str(kind.as_str());
        combined.push_str(": ");
        combined.push_str(&error.to_string());
    }
    combined
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auto_policy_drops_auto_and_duplicates() {
        let policy = AutoBackendPolicy {
            priority: vec![
                CaptureBackendKind::Auto,
                CaptureBackendKind::SharedSurface,
                CaptureBackendKind::SharedSurface,
                CaptureBackendKind::FramePool,
            ],
        };
        assert_eq!(
            policy.normalized_priority(),
            vec![CaptureBackendKind::SharedSurface, CaptureBackendKind::FramePool]
        );
    }

    #[test]
    fn empty_auto_policy_falls_back_to_default_priority() {
        let policy = AutoBackendPolicy {
            priority: vec![CaptureBackendKind::Auto],
        };
        assert_eq!(
            policy.normalized_priority(),
            DEFAULT_AUTO_BACKEND_PRIORITY.to_vec()
        );
    }

    #[test]
    fn backend_kind_parses_aliases() {
        assert_eq!(
            CaptureBackendKind::parse(" WGC "),
            Some(CaptureBackendKind::FramePool)
        );
        assert_eq!(
            CaptureBackendKind::parse("shared-surface"),
            Some(CaptureBackendKind::SharedSurface)
        );
        assert_eq!(CaptureBackendKind::parse("gdi"), None);
    }

    #[test]
    fn shared_texture_equality_follows_pointer_and_desc() {
        let desc = TextureDesc {
            width: 640,
            height: 480,
            format: 87,
        };
        let a = SharedTexture::new(0x1000 as *mut c_void, desc, ());
        let same = SharedTexture::new(0x1000 as *mut c_void, desc, ());
        let resized = SharedTexture::new(
            0x1000 as *mut c_void,
            TextureDesc {
                width: 800,
                ..desc
            },
            (),
        );
        assert_eq!(a, same);
        assert_ne!(a, resized);
        assert_eq!(a.desc().size(), TextureSize::new(640, 480));
    }

    struct NullStream(CaptureBackendKind);

    impl CaptureStream for NullStream {
        fn poll_frame(&mut self) -> MirrorResult<Option<SharedTexture>> {
            Ok(None)
        }

        fn size(&self) -> TextureSize {
            TextureSize::default()
        }

        fn close(&mut self) {}

        fn kind(&self) -> CaptureBackendKind {
            self.0
        }
    }

    fn window_target() -> SourceTarget {
        SourceTarget::Window(crate::window::WindowId::from_raw_handle(0x42))
    }

    #[test]
    fn fallback_moves_past_unavailable_strategies() -> MirrorResult<()> {
        let stream = open_with_fallback(&DEFAULT_AUTO_BACKEND_PRIORITY, &window_target(), |kind, _| {
            match kind {
                CaptureBackendKind::FramePool => {
                    Err(MirrorError::CaptureUnavailable("not supported".into()))
                }
                other => Ok(Box::new(NullStream(other)) as Box<dyn CaptureStream>),
            }
        })?;
        assert_eq!(stream.kind(), CaptureBackendKind::SharedSurface);
        Ok(())
    }

    #[test]
    fn fallback_stops_on_invalid_input() {
        let attempts = std::cell::Cell::new(0);
        let result = open_with_fallback(&DEFAULT_AUTO_BACKEND_PRIORITY, &window_target(), |_, _| {
            attempts.set(attempts.get() + 1);
            Err(MirrorError::InvalidTarget("window handle is null".into()))
        });
        assert!(matches!(result, Err(MirrorError::InvalidTarget(_))));
        assert_eq!(attempts.get(), 1);
    }

    #[test]
    fn fallback_aggregates_every_failure() {
        let result = open_with_fallback(&DEFAULT_AUTO_BACKEND_PRIORITY, &window_target(), |kind, _| {
            Err(MirrorError::CaptureUnavailable(format!("{} down", kind.as_str())))
        });
        let Err(MirrorError::CaptureUnavailable(message)) = result else {
            panic!("expected CaptureUnavailable");
        };
        assert!(message.contains("wgc: "), "{message}");
        assert!(message.contains("; dwm: "), "{message}");
    }

    fn frame_texture(frame: &u32) -> MirrorResult<SharedTexture> {
        Ok(SharedTexture::new(
            (*frame as usize * 0x1000) as *mut c_void,
            TextureDesc {
                width: 640,
                height: 480,
                format: 87,
            },
            (),
        ))
    }

    #[test]
    fn frame_slot_returns_cached_texture_without_new_frames() -> MirrorResult<()> {
        let mut released = Vec::new();
        let mut slot = FrameSlot::new();
        assert_eq!(slot.advance(None, frame_texture, |f| released.push(f))?, None);

        let first = slot.advance(Some(1), frame_texture, |f| released.push(f))?;
        let again = slot.advance(None, frame_texture, |f| released.push(f))?;
        let third = slot.advance(None, frame_texture, |f| released.push(f))?;
        assert!(first.is_some());
        assert_eq!(again, first);
        assert_eq!(third, first);
        assert!(released.is_empty());
        Ok(())
    }

    #[test]
    fn frame_slot_replaces_and_releases_the_previous_frame() -> MirrorResult<()> {
        let mut released = Vec::new();
        let mut slot = FrameSlot::new();
        let first = slot.advance(Some(1), frame_texture, |f| released.push(f))?;
        let second = slot.advance(Some(2), frame_texture, |f| released.push(f))?;

        assert_ne!(first, second);
        assert_eq!(second.map(|t| t.raw() as usize), Some(0x2000));
        assert_eq!(slot.texture().map(|t| t.raw() as usize), Some(0x2000));
        assert_eq!(released, vec![1]);

        assert_eq!(slot.clear(), Some(2));
        assert_eq!(slot.texture(), None);
        Ok(())
    }

    #[test]
    fn frame_slot_keeps_cached_frame_when_texture_fails() -> MirrorResult<()> {
        let mut released = Vec::new();
        let mut slot = FrameSlot::new();
        let first = slot.advance(Some(1), frame_texture, |f| released.push(f))?;

        let result = slot.advance(
            Some(2),
            |_| Err(MirrorError::AccessLost),
            |f| released.push(f),
        );
        assert!(matches!(result, Err(MirrorError::AccessLost)));
        assert_eq!(released, vec![2]);
        assert_eq!(slot.texture(), first);
        assert_eq!(slot.advance(None, frame_texture, |f| released.push(f))?, first);
        Ok(())
    }

    #[test]
    fn shared_texture_keeps_owner_alive_across_clones() {
        let owner = Rc::new(());
        let texture = SharedTexture::new(std::ptr::null_mut(), TextureDesc::default(), owner.clone());
        let clone = texture.clone();
        drop(texture);
        assert_eq!(Rc::strong_count(&owner), 2);
        drop(clone);
        assert_eq!(Rc::strong_count(&owner), 1);
    }
}
