//! Error types for engine implementations.
//!
//! Everything an engine can fail with crosses the seam as one of these
//! variants; the bridge converts them to host status codes and log lines,
//! never into panics.

use thiserror::Error;

pub type EngineResult<T> = Result<T, EngineError>;

/// Failures reported by a `ScriptEngine` implementation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EngineError {
    /// The interpreter itself could not be brought up.
    #[error("engine construction failed: {0}")]
    Construct(String),

    /// The staged program did not compile.
    #[error("compile error: {0}")]
    Compile(String),

    /// The staged program's top level raised while running.
    #[error("runtime error: {0}")]
    Runtime(String),

    /// A required module is not known to the engine at all.
    #[error("module not found: {0}")]
    ModuleNotFound(String),

    /// A required module was found but failed while loading; the module
    /// stays unloaded so a later require will retry it.
    #[error("module '{module}' failed to load: {message}")]
    ModuleLoad { module: String, message: String },
}

impl EngineError {
    /// The engine-reported text, without the variant framing. This is what
    /// gets propagated into host diagnostics.
    pub fn detail(&self) -> &str {
        match self {
            EngineError::Construct(m)
            | EngineError::Compile(m)
            | EngineError::Runtime(m)
            | EngineError::ModuleNotFound(m) => m,
            EngineError::ModuleLoad { message, .. } => message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_frames_the_detail() {
        let e = EngineError::ModuleLoad {
            module: "Site::Auth".to_string(),
            message: "syntax error at line 3".to_string(),
        };
        assert_eq!(
            e.to_string(),
            "module 'Site::Auth' failed to load: syntax error at line 3"
        );
        assert_eq!(e.detail(), "syntax error at line 3");
    }
}
