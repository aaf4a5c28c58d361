use thiserror::Error;

/// Errors raised while acquiring an injection backend or submitting events.
///
/// Character-level problems (a codepoint with no layout mapping) are not
/// errors: they are counted in the [`InjectionReport`](crate::InjectionReport)
/// and never abort an injection.
#[derive(Error, Debug)]
pub enum InjectError {
    #[error("permission denied opening {path}")]
    PermissionDenied { path: String },

    #[error("device unavailable: {0}")]
    DeviceUnavailable(String),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("no injection backend available")]
    NoBackendAvailable,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
