use regex::{Regex, RegexBuilder};

use crate::SourceTarget;
use crate::error::{MirrorError, MirrorResult};
use crate::monitor::MonitorId;
use crate::window::WindowId;

/// Hashable identity of a capture source.
///
/// Two sources are the same logical source when they carry the same window
/// handle or the same monitor handle. Titles never take part in identity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SourceKey {
    Window(isize),
    Monitor(isize),
}

/// Something capturable, as seen by one enumeration pass.
#[derive(Clone, Debug)]
pub struct Source {
    pub target: SourceTarget,
    pub title: String,
}

impl Source {
    pub fn window(window: WindowId, title: impl Into<String>) -> Self {
        Self {
            target: SourceTarget::Window(window),
            title: title.into(),
        }
    }

    pub fn monitor(monitor: MonitorId) -> Self {
        let title = monitor.display_title();
        Self {
            target: SourceTarget::Monitor(monitor),
            title,
        }
    }

    pub fn key(&self) -> SourceKey {
        self.target.key()
    }

    pub fn same_identity(&self, other: &Source) -> bool {
        self.key() == other.key()
    }
}

/// Case-insensitive title patterns used to pre-select sources on first sight.
#[derive(Clone, Debug, Default)]
pub struct TitleFilter {
    patterns: Vec<Regex>,
}

impl TitleFilter {
    pub fn new<I, S>(patterns: I) -> MirrorResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut compiled = Vec::new();
        for pattern in patterns {
            let pattern = pattern.as_ref();
            let regex = RegexBuilder::new(pattern)
                .case_insensitive(true)
                .build()
                .map_err(|err| {
                    MirrorError::InvalidConfig(format!("bad title pattern {pattern:?}: {err}"))
                })?;
            compiled.push(regex);
        }
        Ok(Self { patterns: compiled })
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn matches(&self, title: &str) -> bool {
        self.patterns.iter().any(|regex| regex.is_match(title))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_ignores_titles() {
        let a = Source::window(WindowId::from_raw_handle(0x42), "Untitled - Notepad");
        let b = Source::window(WindowId::from_raw_handle(0x42), "notes.txt - Notepad");
        let c = Source::window(WindowId::from_raw_handle(0x43), "Untitled - Notepad");
        assert!(a.same_identity(&b));
        assert!(!a.same_identity(&c));
    }

    #[test]
    fn window_and_monitor_with_equal_raw_handles_differ() {
        let window = Source::window(WindowId::from_raw_handle(7), "x");
        let monitor = Source::monitor(MonitorId::from_name(7, r"\\.\DISPLAY1", true));
        assert!(!window.same_identity(&monitor));
    }

    #[test]
    fn title_filter_is_case_insensitive_regex() -> MirrorResult<()> {
        let filter = TitleFilter::new(["notepad", r"^Visual Studio\b"])?;
        assert!(filter.matches("Untitled - Notepad"));
        assert!(filter.matches("visual studio code"));
        assert!(!filter.matches("Calculator"));
        Ok(())
    }

    #[test]
    fn empty_title_filter_matches_nothing() -> MirrorResult<()> {
        let filter = TitleFilter::new(Vec::<String>::new())?;
        assert!(filter.is_empty());
        assert!(!filter.matches("Untitled - Notepad"));
        Ok(())
    }

    #[test]
    fn invalid_pattern_is_a_config_error() {
        let err = TitleFilter::new(["(unclosed"]).unwrap_err();
        assert!(matches!(err, MirrorError::InvalidConfig(_)));
    }
}
