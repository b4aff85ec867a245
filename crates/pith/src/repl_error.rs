use std::fmt;

use crate::error::{ParseError, RunError};

/// Error type for REPL execution, separating failures by pipeline stage.
///
/// Keeping parse and runtime failures distinct lets the host apply accurate
/// recovery policy without string matching. Either way the session itself
/// stays usable after the error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplError {
    /// The snippet did not parse; nothing was executed.
    Parse(ParseError),
    /// Execution raised a runtime error (or a `sys.exit` request).
    Runtime(RunError),
}

impl fmt::Display for ReplError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse(error) => write!(f, "{error}"),
            Self::Runtime(error) => write!(f, "{error}"),
        }
    }
}

impl std::error::Error for ReplError {}

impl From<ParseError> for ReplError {
    fn from(error: ParseError) -> Self {
        Self::Parse(error)
    }
}

impl From<RunError> for ReplError {
    fn from(error: RunError) -> Self {
        Self::Runtime(error)
    }
}

impl ReplError {
    /// The exit code when the underlying error is a `sys.exit` request.
    #[must_use]
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Self::Runtime(error) => error.exit_code(),
            Self::Parse(_) => None,
        }
    }
}
