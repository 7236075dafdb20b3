use std::fmt;

/// A monitor as reported by the OS. Identity is the raw `HMONITOR` value;
/// the device name is informational.
#[derive(Clone, Debug)]
pub struct MonitorId {
    handle: isize,

    name: String,

    is_primary: bool,
}

impl MonitorId {
    pub fn from_name(raw_handle: isize, name: impl Into<String>, is_primary: bool) -> Self {
        Self {
            handle: raw_handle,
            name: name.into(),
            is_primary,
        }
    }

    pub fn raw_handle(&self) -> isize {
        self.handle
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_primary(&self) -> bool {
        self.is_primary
    }

    pub fn stable_id(&self) -> String {
        format!("{:016x}", self.handle as usize as u64)
    }

    /// Title shown in the source selector.
    pub fn display_title(&self) -> String {
        if self.is_primary {
            format!("Display {} (primary)", self.name)
        } else {
            format!("Display {}", self.name)
        }
    }
}

impl PartialEq for MonitorId {
    fn eq(&self, other: &Self) -> bool {
        self.handle == other.handle
    }
}

impl Eq for MonitorId {}

impl std::hash::Hash for MonitorId {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.handle.hash(state);
    }
}

impl fmt::Display for MonitorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn monitors_compare_by_handle_only() {
        let a = MonitorId::from_name(0x10, r"\\.\DISPLAY1", true);
        let renamed = MonitorId::from_name(0x10, r"\\.\DISPLAY2", false);
        let other = MonitorId::from_name(0x20, r"\\.\DISPLAY1", true);
        assert_eq!(a, renamed);
        assert_ne!(a, other);
    }

    #[test]
    fn display_title_marks_primary() {
        let primary = MonitorId::from_name(1, r"\\.\DISPLAY1", true);
        let secondary = MonitorId::from_name(2, r"\\.\DISPLAY2", false);
        assert_eq!(primary.display_title(), r"Display \\.\DISPLAY1 (primary)");
        assert_eq!(secondary.display_title(), r"Display \\.\DISPLAY2");
    }
}
