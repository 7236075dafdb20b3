//! Throttled discovery of mirrorable windows and monitors.
//!
//! The platform binding turns the OS enumeration callbacks into plain
//! vectors ([`SourceProvider`]); everything else here is pure bookkeeping:
//! filtering, carrying toggle state forward from the registry, first-sight
//! pre-selection and toggle edge detection.

use rustc_hash::FxHashSet;

use crate::SourceTarget;
use crate::monitor::MonitorId;
use crate::source::{Source, SourceKey, TitleFilter};
use crate::window::WindowId;

pub const DEFAULT_REFRESH_INTERVAL: u32 = 500;

/// Raw facts about one top-level window, gathered by the platform binding.
#[derive(Clone, Debug)]
pub struct WindowProbe {
    pub window: WindowId,
    pub is_shell: bool,
    pub visible: bool,
    /// Root ancestor of the window; equal to `window` for top-level windows.
    pub root: WindowId,
    pub disabled: bool,
    /// `None` when the title query failed.
    pub title: Option<String>,
}

pub fn is_mirrorable_window(probe: &WindowProbe) -> bool {
    if probe.window.is_null() || probe.is_shell || !probe.visible {
        return false;
    }
    if probe.root != probe.window || probe.disabled {
        return false;
    }
    probe.title.as_deref().is_some_and(|title| !title.is_empty())
}

pub trait SourceProvider {
    /// Every top-level window in OS enumeration order.
    fn window_probes(&self) -> Vec<WindowProbe>;

    /// Every monitor whose info query succeeded, in OS enumeration order.
    fn monitors(&self) -> Vec<MonitorId>;

    /// Whether the window or monitor behind `target` still exists.
    fn is_alive(&self, target: &SourceTarget) -> bool;
}

/// Mirrorable windows first, then monitors.
pub fn enumerate_sources(provider: &dyn SourceProvider) -> Vec<Source> {
    let mut sources = Vec::new();
    for probe in provider.window_probes() {
        if !is_mirrorable_window(&probe) {
            continue;
        }
        if let Some(title) = probe.title {
            sources.push(Source::window(probe.window, title));
        }
    }
    sources.extend(provider.monitors().into_iter().map(Source::monitor));
    sources
}

#[derive(Clone, Debug)]
pub struct CandidateEntry {
    pub source: Source,
    pub mirrored: bool,
    pub was_mirrored: bool,
}

impl CandidateEntry {
    pub fn has_toggle_edge(&self) -> bool {
        self.mirrored != self.was_mirrored
    }
}

#[derive(Clone, Debug)]
pub enum ToggleEdge {
    On(Source),
    Off(Source),
}

impl ToggleEdge {
    pub fn source(&self) -> &Source {
        match self {
            Self::On(source) | Self::Off(source) => source,
        }
    }
}

pub struct SourceEnumerator {
    candidates: Vec<CandidateEntry>,
    countdown: u32,
    refresh_interval: u32,
    filter: TitleFilter,
    seen: FxHashSet<SourceKey>,
}

impl SourceEnumerator {
    pub fn new(refresh_interval: u32, filter: TitleFilter) -> Self {
        Self {
            candidates: Vec::new(),
            countdown: 0,
            refresh_interval: refresh_interval.max(1),
            filter,
            seen: FxHashSet::default(),
        }
    }

    pub fn candidates(&self) -> &[CandidateEntry] {
        &self.candidates
    }

    /// Toggle targets for the selector UI.
    pub fn candidates_mut(&mut self) -> &mut [CandidateEntry] {
        &mut self.candidates
    }

    pub fn countdown(&self) -> u32 {
        self.countdown
    }

    /// Rebuild the candidate list if the throttle expired or `force` is set.
    ///
    /// `is_mirrored` reports whether the registry already mirrors a source;
    /// such candidates start toggled on with no pending edge. Returns `true`
    /// when a full enumeration ran.
    pub fn refresh(
        &mut self,
        force: bool,
        provider: &dyn SourceProvider,
        is_mirrored: impl Fn(&SourceKey) -> bool,
    ) -> bool {
        self.countdown = self.countdown.saturating_sub(1);
        if !force && self.countdown > 0 {
            return false;
        }
        self.countdown = self.refresh_interval;

        let sources = enumerate_sources(provider);
        let mut candidates = Vec::with_capacity(sources.len());
        // Only keys present in this pass survive, so a reused handle counts
        // as a new source.
        let mut seen = FxHashSet::with_capacity_and_hasher(sources.len(), Default::default());
        for source in sources {
            let key = source.key();
            let first_sight = !self.seen.contains(&key);
            seen.insert(key);
            let (mirrored, was_mirrored) = if is_mirrored(&key) {
                (true, true)
            } else if first_sight && self.filter.matches(&source.title) {
                log::info!("pre-selecting {:?} by title filter", source.title);
                (true, false)
            } else {
                (false, false)
            };
            candidates.push(CandidateEntry {
                source,
                mirrored,
                was_mirrored,
            });
        }
        log::debug!("enumerated {} capture sources", candidates.len());
        self.candidates = candidates;
        self.seen = seen;
        true
    }

    /// Collect toggle transitions since the last call and settle them.
    pub fn take_toggle_edges(&mut self) -> Vec<ToggleEdge> {
        let mut edges = Vec::new();
        for candidate in &mut self.candidates {
            if !candidate.has_toggle_edge() {
                continue;
            }
            let source = candidate.source.clone();
            edges.push(if candidate.mirrored {
                ToggleEdge::On(source)
            } else {
                ToggleEdge::Off(source)
            });
            candidate.was_mirrored = candidate.mirrored;
        }
        edges
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::cell::{Cell, RefCell};

    use super::*;

    /// Scriptable desktop used by enumerator, registry and app tests.
    #[derive(Default)]
    pub(crate) struct FakeDesktop {
        pub windows: RefCell<Vec<WindowProbe>>,
        pub monitors: RefCell<Vec<MonitorId>>,
        pub enumerations: Cell<usize>,
    }

    impl FakeDesktop {
        pub(crate) fn add_window(&self, raw: isize, title: &str) -> WindowId {
            let window = WindowId::from_raw_handle(raw);
            self.windows.borrow_mut().push(top_level(window, title));
            window
        }

        pub(crate) fn close_window(&self, window: WindowId) {
            self.windows.borrow_mut().retain(|probe| probe.window != window);
        }
    }

    impl SourceProvider for FakeDesktop {
        fn window_probes(&self) -> Vec<WindowProbe> {
            self.enumerations.set(self.enumerations.get() + 1);
            self.windows.borrow().clone()
        }

        fn monitors(&self) -> Vec<MonitorId> {
            self.monitors.borrow().clone()
        }

        fn is_alive(&self, target: &SourceTarget) -> bool {
            match target {
                SourceTarget::Window(window) => self
                    .windows
                    .borrow()
                    .iter()
                    .any(|probe| probe.window == *window),
                SourceTarget::Monitor(monitor) => self.monitors.borrow().contains(monitor),
            }
        }
    }

    pub(crate) fn top_level(window: WindowId, title: &str) -> WindowProbe {
        WindowProbe {
            window,
            is_shell: false,
            visible: true,
            root: window,
            disabled: false,
            title: Some(title.to_string()),
        }
    }

    fn no_registry(_: &SourceKey) -> bool {
        false
    }

    #[test]
    fn filtering_rejects_every_excluded_window_kind() {
        let window = WindowId::from_raw_handle(0x100);
        assert!(is_mirrorable_window(&top_level(window, "Editor")));

        let null = top_level(WindowId::from_raw_handle(0), "Editor");
        let shell = WindowProbe {
            is_shell: true,
            ..top_level(window, "Program Manager")
        };
        let hidden = WindowProbe {
            visible: false,
            ..top_level(window, "Editor")
        };
        let owned = WindowProbe {
            root: WindowId::from_raw_handle(0x200),
            ..top_level(window, "Find")
        };
        let disabled = WindowProbe {
            disabled: true,
            ..top_level(window, "Editor")
        };
        let untitled = top_level(window, "");
        let failed_title = WindowProbe {
            title: None,
            ..top_level(window, "Editor")
        };

        for probe in [null, shell, hidden, owned, disabled, untitled, failed_title] {
            assert!(!is_mirrorable_window(&probe), "{probe:?} should be rejected");
        }
    }

    #[test]
    fn monitors_follow_windows_unfiltered() {
        let desktop = FakeDesktop::default();
        desktop.add_window(0x10, "Editor");
        desktop
            .monitors
            .borrow_mut()
            .push(MonitorId::from_name(0x1, r"\\.\DISPLAY1", true));

        let sources = enumerate_sources(&desktop);
        assert_eq!(sources.len(), 2);
        assert_eq!(sources[0].key(), SourceKey::Window(0x10));
        assert_eq!(sources[1].key(), SourceKey::Monitor(0x1));
    }

    #[test]
    fn refresh_is_throttled_until_countdown_expires() {
        let desktop = FakeDesktop::default();
        let mut enumerator = SourceEnumerator::new(3, TitleFilter::default());

        assert!(enumerator.refresh(false, &desktop, no_registry));
        assert!(!enumerator.refresh(false, &desktop, no_registry));
        assert!(!enumerator.refresh(false, &desktop, no_registry));
        assert!(enumerator.refresh(false, &desktop, no_registry));
        assert_eq!(desktop.enumerations.get(), 2);
    }

    #[test]
    fn forced_refresh_bypasses_and_resets_the_throttle() {
        let desktop = FakeDesktop::default();
        let mut enumerator = SourceEnumerator::new(500, TitleFilter::default());

        assert!(enumerator.refresh(false, &desktop, no_registry));
        assert!(!enumerator.refresh(false, &desktop, no_registry));
        assert!(enumerator.refresh(true, &desktop, no_registry));
        assert_eq!(enumerator.countdown(), 500);
        assert_eq!(desktop.enumerations.get(), 2);
    }

    #[test]
    fn mirrored_sources_carry_state_forward_without_edges() {
        let desktop = FakeDesktop::default();
        desktop.add_window(0x10, "Editor");
        desktop.add_window(0x20, "Browser");
        let mut enumerator = SourceEnumerator::new(500, TitleFilter::default());

        enumerator.refresh(true, &desktop, |key| *key == SourceKey::Window(0x20));

        let candidates = enumerator.candidates();
        assert!(!candidates[0].mirrored);
        assert!(candidates[1].mirrored && candidates[1].was_mirrored);
        assert!(enumerator.take_toggle_edges().is_empty());
    }

    #[test]
    fn title_filter_preselects_on_first_sight() -> crate::error::MirrorResult<()> {
        let desktop = FakeDesktop::default();
        desktop.add_window(0x10, "Untitled - Notepad");
        desktop.add_window(0x20, "Calculator");
        let mut enumerator = SourceEnumerator::new(500, TitleFilter::new(["Notepad"])?);

        enumerator.refresh(true, &desktop, no_registry);

        let candidates = enumerator.candidates();
        assert!(candidates[0].mirrored);
        assert!(!candidates[0].was_mirrored);
        assert!(!candidates[1].mirrored);

        let edges = enumerator.take_toggle_edges();
        assert_eq!(edges.len(), 1);
        assert!(matches!(&edges[0], ToggleEdge::On(source) if source.title == "Untitled - Notepad"));
        Ok(())
    }

    #[test]
    fn title_filter_does_not_reselect_after_manual_toggle_off() -> crate::error::MirrorResult<()> {
        let desktop = FakeDesktop::default();
        desktop.add_window(0x10, "Untitled - Notepad");
        let mut enumerator = SourceEnumerator::new(500, TitleFilter::new(["notepad"])?);

        enumerator.refresh(true, &desktop, no_registry);
        enumerator.candidates_mut()[0].mirrored = false;
        enumerator.take_toggle_edges();

        enumerator.refresh(true, &desktop, no_registry);
        assert!(!enumerator.candidates()[0].mirrored);
        Ok(())
    }

    #[test]
    fn seen_set_only_tracks_sources_from_the_latest_pass() -> crate::error::MirrorResult<()> {
        let desktop = FakeDesktop::default();
        let window = desktop.add_window(0x10, "Untitled - Notepad");
        desktop.add_window(0x20, "Calculator");
        let mut enumerator = SourceEnumerator::new(500, TitleFilter::new(["notepad"])?);

        enumerator.refresh(true, &desktop, no_registry);
        enumerator.candidates_mut()[0].mirrored = false;
        enumerator.take_toggle_edges();
        assert_eq!(enumerator.seen.len(), 2);

        desktop.close_window(window);
        enumerator.refresh(true, &desktop, no_registry);
        assert_eq!(enumerator.seen.len(), 1);
        assert!(!enumerator.seen.contains(&SourceKey::Window(0x10)));

        desktop.add_window(0x10, "Notes - Notepad");
        enumerator.refresh(true, &desktop, no_registry);
        let reopened = enumerator
            .candidates()
            .iter()
            .find(|candidate| candidate.source.key() == SourceKey::Window(0x10));
        assert!(reopened.is_some_and(|candidate| candidate.mirrored));
        Ok(())
    }

    #[test]
    fn toggle_edges_are_reported_once() {
        let desktop = FakeDesktop::default();
        desktop.add_window(0x10, "Editor");
        let mut enumerator = SourceEnumerator::new(500, TitleFilter::default());
        enumerator.refresh(true, &desktop, no_registry);

        enumerator.candidates_mut()[0].mirrored = true;
        let edges = enumerator.take_toggle_edges();
        assert!(matches!(edges.as_slice(), [ToggleEdge::On(_)]));
        assert!(enumerator.take_toggle_edges().is_empty());

        enumerator.candidates_mut()[0].mirrored = false;
        let edges = enumerator.take_toggle_edges();
        assert!(matches!(edges.as_slice(), [ToggleEdge::Off(_)]));
    }
}
