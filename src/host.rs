//! Boundary with the host renderer and its immediate-mode UI.
//!
//! The host owns the scene, the unit quad mesh, materials and widgets. This
//! crate only decides what to draw and where; it never talks to the
//! renderer directly.

use crate::backend::SharedTexture;
use crate::error::MirrorResult;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ONE: Self = Self::new(1.0, 1.0, 1.0);

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Quat {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
}

impl Quat {
    pub const IDENTITY: Self = Self::new(0.0, 0.0, 0.0, 1.0);

    /// Half turn around +Y: a panel in front of the origin facing back at it.
    pub const FACING_ORIGIN: Self = Self::new(0.0, 1.0, 0.0, 0.0);

    pub const fn new(x: f32, y: f32, z: f32, w: f32) -> Self {
        Self { x, y, z, w }
    }
}

impl Default for Quat {
    fn default() -> Self {
        Self::IDENTITY
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Pose {
    pub position: Vec3,
    pub orientation: Quat,
}

impl Pose {
    pub const fn new(position: Vec3, orientation: Quat) -> Self {
        Self {
            position,
            orientation,
        }
    }
}

/// Whether a panel shows its title bar.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HeaderMode {
    Title,
    Empty,
}

/// Local transform of the unit quad inside its panel.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct QuadTransform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl QuadTransform {
    /// A quad of `size` whose top edge sits on the panel origin.
    pub fn top_anchored(size: Vec2) -> Self {
        Self {
            translation: Vec3::new(0.0, -size.y / 2.0, 0.0),
            rotation: Quat::IDENTITY,
            scale: Vec3::new(size.x, size.y, 1.0),
        }
    }
}

pub trait MirrorHost {
    type Material;

    /// Open a panel. The host may move `pose` when the user drags the panel.
    fn begin_panel(&mut self, title: &str, pose: &mut Pose, header: HeaderMode);

    fn end_panel(&mut self);

    fn button(&mut self, label: &str) -> bool;

    /// Draw a toggle bound to `value`; returns `true` when the user flipped it.
    fn toggle(&mut self, label: &str, value: &mut bool) -> bool;

    fn same_line(&mut self);

    /// Reserve layout space for custom content in the current panel.
    fn reserve(&mut self, size: Vec2);

    /// Create an unlit, clamped material sampling `texture`.
    fn create_material(&mut self, texture: &SharedTexture) -> MirrorResult<Self::Material>;

    /// Point an existing material at a new texture. Size and format come
    /// from `texture.desc()`.
    fn bind_texture(&mut self, material: &mut Self::Material, texture: &SharedTexture);

    fn release_material(&mut self, material: Self::Material);

    /// Submit the host's unit quad with `material`, relative to the current
    /// panel.
    fn draw_textured_quad(&mut self, material: &Self::Material, transform: &QuadTransform);
}

/// Run `body` between `begin_panel` and `end_panel`.
///
/// `body` cannot return early past the closing call, so every begin is
/// matched by exactly one end.
pub fn with_panel<H, R>(
    host: &mut H,
    title: &str,
    pose: &mut Pose,
    header: HeaderMode,
    body: impl FnOnce(&mut H) -> R,
) -> R
where
    H: MirrorHost + ?Sized,
{
    host.begin_panel(title, pose, header);
    let result = body(host);
    host.end_panel();
    result
}
