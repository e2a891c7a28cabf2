use crate::fix::FixError;
use crate::host::HostError;
use crate::plan::PatchError;
use anyhow::Error as AnyhowError;
use thiserror::Error;

/// Result alias for errors emitted by bugscan internals.
pub type BugscanResult<T> = Result<T, BugscanError>;

/// Crate-level error type.
#[derive(Debug, Error)]
pub enum BugscanError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Host(#[from] HostError),

    #[error(transparent)]
    Fix(#[from] FixError),

    #[error(transparent)]
    Patch(#[from] PatchError),

    #[error("rule `{0}` is registered twice")]
    DuplicateRule(String),

    #[error("scan cancelled")]
    Cancelled,

    #[error("{0}")]
    Other(String),
}

impl BugscanError {
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    /// Convert to anyhow::Error for interop with anyhow-based code.
    pub fn into_anyhow(self) -> AnyhowError {
        AnyhowError::new(self)
    }
}

impl From<AnyhowError> for BugscanError {
    fn from(err: AnyhowError) -> Self {
        BugscanError::other(format!("{err:#}"))
    }
}

/// Convenience macro mirroring `anyhow::bail!` but returning BugscanError.
#[macro_export]
macro_rules! scan_bail {
    ($($arg:tt)*) => {
        return Err($crate::error::BugscanError::other(format!($($arg)*)))
    };
}

/// Convenience macro mirroring `anyhow::ensure!`.
#[macro_export]
macro_rules! scan_ensure {
    ($cond:expr, $($arg:tt)*) => {
        if !($cond) {
            $crate::scan_bail!($($arg)*);
        }
    };
}
