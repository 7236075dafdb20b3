//! Environment-variable parsing helpers shared by the config layer.

/// Reads the variable, returning `Some` only for a non-blank value.
pub(crate) fn env_var(var_name: &str) -> Option<String> {
    std::env::var(var_name)
        .ok()
        .map(|raw| raw.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// `1`, `true`, `yes`, or `on`, case-insensitive, trimmed.
#[inline]
pub(crate) fn is_truthy(raw: &str) -> bool {
    let normalized = raw.trim().to_ascii_lowercase();
    normalized == "1" || normalized == "true" || normalized == "yes" || normalized == "on"
}

/// Parses a positive (> 0) integer.
#[inline]
pub(crate) fn parse_positive_u64(raw: &str) -> Option<u64> {
    raw.trim().parse::<u64>().ok().filter(|value| *value > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truthy_values_are_case_insensitive() {
        for raw in ["1", "true", " YES ", "On"] {
            assert!(is_truthy(raw), "{raw:?}");
        }
        for raw in ["0", "false", "", "enabled"] {
            assert!(!is_truthy(raw), "{raw:?}");
        }
    }

    #[test]
    fn positive_u64_rejects_zero_and_garbage() {
        assert_eq!(parse_positive_u64(" 250 "), Some(250));
        assert_eq!(parse_positive_u64("0"), None);
        assert_eq!(parse_positive_u64("-3"), None);
        assert_eq!(parse_positive_u64("fast"), None);
    }
}
