use std::fmt;

#[derive(Debug)]
pub enum MirrorError {
    InvalidTarget(String),

    /// The window or monitor behind a source no longer exists.
    SourceLost,

    /// No capture strategy could open a stream for the source.
    CaptureUnavailable(String),

    AccessLost,

    InvalidConfig(String),

    /// The overlay priority hook could not be installed.
    HookUnavailable(String),

    Platform(anyhow::Error),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MirrorErrorClass {
    InvalidInput,
    Unsupported,
    Transient,
    Fatal,
}

impl MirrorError {
    pub fn class(&self) -> MirrorErrorClass {
        match self {
            Self::InvalidTarget(_) | Self::InvalidConfig(_) => MirrorErrorClass::InvalidInput,
            Self::CaptureUnavailable(_) | Self::HookUnavailable(_) => {
                MirrorErrorClass::Unsupported
            }
            Self::SourceLost | Self::AccessLost => MirrorErrorClass::Transient,
            Self::Platform(_) => MirrorErrorClass::Fatal,
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self.class(), MirrorErrorClass::Transient)
    }

    /// `true` when the error means the underlying window or monitor is gone
    /// and the mirror entry should be torn down rather than retried.
    pub fn is_source_lost(&self) -> bool {
        matches!(self, Self::SourceLost | Self::InvalidTarget(_))
    }
}

impl fmt::Display for MirrorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidTarget(id) => write!(f, "capture target is not valid: {id}"),
            Self::SourceLost => write!(f, "capture source is no longer available"),
            Self::CaptureUnavailable(message) => {
                write!(f, "no capture strategy could open the source: {message}")
            }
            Self::AccessLost => write!(f, "capture access lost"),
            Self::InvalidConfig(message) => write!(f, "invalid mirror configuration: {message}"),
            Self::HookUnavailable(message) => {
                write!(f, "overlay priority hook unavailable: {message}")
            }
            Self::Platform(inner) => write!(f, "{inner}"),
        }
    }
}

impl std::error::Error for MirrorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Platform(inner) => Some(inner.as_ref()),
            _ => None,
        }
    }
}

pub type MirrorResult<T> = Result<T, MirrorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_lost_errors_are_transient_and_tear_down() {
        let err = MirrorError::SourceLost;
        assert!(err.is_retryable());
        assert!(err.is_source_lost());

        let err = MirrorError::InvalidTarget("window handle is null".into());
        assert_eq!(err.class(), MirrorErrorClass::InvalidInput);
        assert!(err.is_source_lost());
    }

    #[test]
    fn capture_unavailable_is_not_a_lost_source() {
        let err = MirrorError::CaptureUnavailable("wgc: not supported".into());
        assert_eq!(err.class(), MirrorErrorClass::Unsupported);
        assert!(!err.is_source_lost());
        assert!(!err.is_retryable());
    }

    #[test]
    fn platform_errors_keep_their_context_chain() {
        let inner = anyhow::anyhow!("E_ACCESSDENIED").context("OpenSharedResource failed");
        let err = MirrorError::Platform(inner);
        assert_eq!(err.to_string(), "OpenSharedResource failed");
        assert!(std::error::Error::source(&err).is_some());
    }
}
