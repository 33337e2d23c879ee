use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

pub type CoreResult<T> = Result<T, CoreError>;

/// Failures of the mesh pipeline that abort a request.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Filesystem failure while preparing or reading a case.
    #[error("failed to {operation} '{}': {source}", path.display())]
    Io {
        operation: &'static str,
        path: PathBuf,
        source: io::Error,
    },

    /// The external tool could not be started at all.
    #[error("failed to launch {tool}: {source}")]
    Spawn { tool: String, source: io::Error },

    /// The external tool ran past its deadline and was killed.
    #[error("{tool} timed out after {} seconds", timeout.as_secs())]
    Timeout { tool: String, timeout: Duration },
}

impl CoreError {
    pub(crate) fn io(operation: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        CoreError::Io {
            operation,
            path: path.into(),
            source,
        }
    }
}
