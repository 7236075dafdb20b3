//! One-time, process-wide patch that keeps mirror panels layered above the
//! compositor's regular content.
//!
//! The headset runtime drops session priority back to its default on every
//! frame sync. The patch detours the runtime's `varjo_WaitSync` so each call
//! first raises the calling session to the overlay priority.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use crate::error::MirrorResult;
use crate::platform;

pub const DEFAULT_OVERLAY_LIBRARY: &str = r"C:\Program Files\Varjo\varjo-openxr\VarjoLib.dll";

pub const OVERLAY_SESSION_PRIORITY: i32 = 1000;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OverlayPatchConfig {
    pub enabled: bool,
    pub library_path: PathBuf,
    pub priority: i32,
}

impl Default for OverlayPatchConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            library_path: PathBuf::from(DEFAULT_OVERLAY_LIBRARY),
            priority: OVERLAY_SESSION_PRIORITY,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OverlayPatchOutcome {
    Installed,
    AlreadyInstalled,
    Disabled,
    Unavailable(String),
}

impl OverlayPatchOutcome {
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Installed | Self::AlreadyInstalled)
    }
}

/// Guards a once-only installation. A failed attempt leaves the latch open
/// so a later call can try again.
pub(crate) struct PatchLatch {
    installed: AtomicBool,
    lock: Mutex<()>,
}

impl PatchLatch {
    pub(crate) const fn new() -> Self {
        Self {
            installed: AtomicBool::new(false),
            lock: Mutex::new(()),
        }
    }

    pub(crate) fn is_installed(&self) -> bool {
        self.installed.load(Ordering::Acquire)
    }

    pub(crate) fn run(&self, install: impl FnOnce() -> MirrorResult<()>) -> OverlayPatchOutcome {
        if self.is_installed() {
            return OverlayPatchOutcome::AlreadyInstalled;
        }
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        if self.is_installed() {
            return OverlayPatchOutcome::AlreadyInstalled;
        }
        match install() {
            Ok(()) => {
                self.installed.store(true, Ordering::Release);
                OverlayPatchOutcome::Installed
            }
            Err(err) => OverlayPatchOutcome::Unavailable(err.to_string()),
        }
    }
}

static OVERLAY_PATCH: PatchLatch = PatchLatch::new();

/// Install the overlay priority detour unless it is disabled or already in
/// place. Never fails; problems are reported through the outcome and logged.
pub fn install_overlay_priority_patch(config: &OverlayPatchConfig) -> OverlayPatchOutcome {
    if !config.enabled {
        log::debug!("overlay priority patch disabled by configuration");
        return OverlayPatchOutcome::Disabled;
    }

    let outcome = OVERLAY_PATCH.run(|| {
        platform::install_overlay_hook(&config.library_path, config.priority)
    });
    match &outcome {
        OverlayPatchOutcome::Installed => log::info!(
            "overlay priority patch installed from {}",
            config.library_path.display()
        ),
        OverlayPatchOutcome::AlreadyInstalled => {
            log::debug!("overlay priority patch already installed")
        }
        OverlayPatchOutcome::Unavailable(reason) => {
            log::warn!("overlay priority patch not installed: {reason}")
        }
        OverlayPatchOutcome::Disabled => {}
    }
    outcome
}
