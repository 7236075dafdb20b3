use std::path::PathBuf;

use crate::backend::{AutoBackendPolicy, CaptureBackendKind};
use crate::enumerator::DEFAULT_REFRESH_INTERVAL;
use crate::env_config;
use crate::error::{MirrorError, MirrorResult};
use crate::host::{Pose, Quat, Vec3};
use crate::overlay::OverlayPatchConfig;
use crate::registry::PanelDefaults;
use crate::source::TitleFilter;

pub const ENV_CAPTURE_BACKEND: &str = "MIRROR_CAPTURE_BACKEND";
pub const ENV_REFRESH_INTERVAL: &str = "MIRROR_REFRESH_INTERVAL";
pub const ENV_OVERLAY_LIB: &str = "MIRROR_OVERLAY_LIB";
pub const ENV_DISABLE_OVERLAY_PATCH: &str = "MIRROR_DISABLE_OVERLAY_PATCH";

pub const USAGE: &str = "Usage: window-mirror [options] [title-pattern ...]
  <title-pattern>            Case-insensitive regex; matching sources start mirrored
  --backend <kind>           Capture backend: auto | wgc | dwm (default: auto)
  --refresh-interval <n>     Frames between source enumerations (default: 500)
  --overlay-lib <path>       Headset runtime library to patch
  --no-overlay               Skip the overlay priority patch";

#[derive(Clone, Debug)]
pub struct MirrorConfig {
    pub title_patterns: Vec<String>,
    pub backend: CaptureBackendKind,
    pub auto_policy: AutoBackendPolicy,
    pub refresh_interval: u32,
    pub panel: PanelDefaults,
    pub selector_pose: Pose,
    pub overlay: OverlayPatchConfig,
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            title_patterns: Vec::new(),
            backend: CaptureBackendKind::default(),
            auto_policy: AutoBackendPolicy::default(),
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
            panel: PanelDefaults::default(),
            selector_pose: Pose::new(Vec3::new(0.0, 0.0, -0.5), Quat::FACING_ORIGIN),
            overlay: OverlayPatchConfig::default(),
        }
    }
}

impl MirrorConfig {
    /// Defaults, then `MIRROR_*` environment overrides, then `args`.
    ///
    /// `args` excludes the program name.
    pub fn from_env_and_args<I, S>(args: I) -> MirrorResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut config = Self::default();
        config.apply_env(env_config::env_var);
        config.apply_args(args)?;
        Ok(config)
    }

    pub fn from_args<I, S>(args: I) -> MirrorResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut config = Self::default();
        config.apply_args(args)?;
        Ok(config)
    }

    /// Environment values that fail to parse are ignored with a warning.
    pub(crate) fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(raw) = lookup(ENV_CAPTURE_BACKEND) {
            match CaptureBackendKind::parse(&raw) {
                Some(kind) => self.backend = kind,
                None => log::warn!("ignoring {ENV_CAPTURE_BACKEND}={raw:?}: use auto, wgc or dwm"),
            }
        }
        if let Some(raw) = lookup(ENV_REFRESH_INTERVAL) {
            match env_config::parse_positive_u64(&raw).and_then(|value| u32::try_from(value).ok())
            {
                Some(interval) => self.refresh_interval = interval,
                None => log::warn!("ignoring {ENV_REFRESH_INTERVAL}={raw:?}: expected frames > 0"),
            }
        }
        if let Some(path) = lookup(ENV_OVERLAY_LIB) {
            self.overlay.library_path = PathBuf::from(path);
        }
        if lookup(ENV_DISABLE_OVERLAY_PATCH).is_some_and(|raw| env_config::is_truthy(&raw)) {
            self.overlay.enabled = false;
        }
    }

    pub fn apply_args<I, S>(&mut self, args: I) -> MirrorResult<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let args: Vec<String> = args.into_iter().map(Into::into).collect();
        let mut i = 0usize;
        let mut positional_only = false;
        while i < args.len() {
            let arg = args[i].as_str();
            if positional_only || !arg.starts_with("--") {
                self.title_patterns.push(arg.to_string());
                i += 1;
                continue;
            }

            let (flag, inline_value) = match arg.split_once('=') {
                Some((flag, value)) => (flag, Some(value)),
                None => (arg, None),
            };
            match flag {
                "--" => positional_only = true,
                "--backend" => {
                    let raw = flag_value(&args, &mut i, flag, inline_value)?;
                    self.backend = CaptureBackendKind::parse(raw).ok_or_else(|| {
                        MirrorError::InvalidConfig(format!(
                            "invalid --backend: {raw}. Use auto, wgc, or dwm"
                        ))
                    })?;
                }
                "--refresh-interval" => {
                    let raw = flag_value(&args, &mut i, flag, inline_value)?;
                    self.refresh_interval = env_config::parse_positive_u64(raw)
                        .and_then(|value| u32::try_from(value).ok())
                        .ok_or_else(|| {
                            MirrorError::InvalidConfig(format!(
                                "--refresh-interval must be a frame count >= 1, got {raw:?}"
                            ))
                        })?;
                }
                "--overlay-lib" => {
                    let raw = flag_value(&args, &mut i, flag, inline_value)?;
                    self.overlay.library_path = PathBuf::from(raw);
                }
                "--no-overlay" => self.overlay.enabled = false,
                other => {
                    return Err(MirrorError::InvalidConfig(format!(
                        "unknown argument: {other}\n{USAGE}"
                    )));
                }
            }
            i += 1;
        }

        self.title_filter()?;
        Ok(())
    }

    pub fn title_filter(&self) -> MirrorResult<TitleFilter> {
        TitleFilter::new(&self.title_patterns)
    }
}

/// Value for `flag`, either inline (`--flag=value`) or the next argument.
fn flag_value<'a>(
    args: &'a [String],
    i: &mut usize,
    flag: &str,
    inline_value: Option<&'a str>,
) -> MirrorResult<&'a str> {
    if let Some(value) = inline_value {
        return Ok(value);
    }
    *i += 1;
    args.get(*i)
        .map(String::as_str)
        .ok_or_else(|| MirrorError::InvalidConfig(format!("{flag} requires a value")))
}
