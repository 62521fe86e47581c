//! Error types for the moonspec test engine

use thiserror::Error;

/// Failure taxonomy for loading and running one Lua chunk inside a session.
///
/// Every interpreter-side failure is folded into one of these four cases
/// before it leaves the session boundary.
#[derive(Error, Debug, Clone)]
pub enum ScriptError {
    /// The chunk failed to compile (syntax error, source position included
    /// in the interpreter's message).
    #[error("{message}")]
    Compile { message: String },

    /// An uncaught error was raised while executing the chunk's top-level
    /// code or a test body. The message carries the interpreter traceback.
    #[error("{message}")]
    Runtime { message: String },

    /// The interpreter ran out of memory.
    #[error("out of memory in the script interpreter")]
    Memory,

    /// Any other interpreter failure code we do not have a name for.
    #[error("unexpected interpreter error: {description}")]
    Internal { description: String },
}

impl ScriptError {
    /// Fold an `mlua` error into the session failure taxonomy.
    ///
    /// Callback errors are unwrapped to their cause so that a Rust-side
    /// binding failure surfaces with its own message rather than a generic
    /// "callback error" wrapper.
    pub(crate) fn from_lua(err: mlua::Error) -> Self {
        match err {
            mlua::Error::SyntaxError { message, .. } => ScriptError::Compile { message },
            mlua::Error::RuntimeError(message) => ScriptError::Runtime { message },
            mlua::Error::MemoryError(_) => ScriptError::Memory,
            mlua::Error::CallbackError { traceback, cause } => {
                match ScriptError::from_lua((*cause).clone()) {
                    ScriptError::Runtime { message } => ScriptError::Runtime {
                        message: format!("{}\n{}", message, traceback),
                    },
                    other => other,
                }
            }
            mlua::Error::ExternalError(cause) => ScriptError::Runtime {
                message: cause.to_string(),
            },
            other => ScriptError::Internal {
                description: other.to_string(),
            },
        }
    }
}

/// Main error type for moonspec
#[derive(Error, Debug)]
pub enum Error {
    /// A script failed to compile or run; see [`ScriptError`].
    #[error("{0}")]
    Script(#[from] ScriptError),

    /// A native value has no structured representation and was bridged in
    /// strict mode (for example a function used as a table key).
    #[error("cannot construct a comparison key from a {type_name}")]
    UnsupportedType { type_name: &'static str },

    /// IO error reading a script or configuration file.
    #[error("IOError: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    /// The XML report could not be rendered.
    #[error("report rendering failed: {0}")]
    Report(String),
}

impl Error {
    /// Create a report-rendering error from any displayable cause.
    pub(crate) fn report(cause: impl std::fmt::Display) -> Self {
        Error::Report(cause.to_string())
    }
}

/// Result type alias for moonspec
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn syntax_errors_map_to_compile() {
        let err = mlua::Error::SyntaxError {
            message: "unexpected symbol near ')'".into(),
            incomplete_input: false,
        };
        assert!(matches!(
            ScriptError::from_lua(err),
            ScriptError::Compile { .. }
        ));
    }

    #[test]
    fn callback_errors_unwrap_to_cause() {
        let cause = mlua::Error::RuntimeError("Expected '1', actual was '2'".into());
        let err = mlua::Error::CallbackError {
            traceback: "stack traceback:".into(),
            cause: std::sync::Arc::new(cause),
        };
        match ScriptError::from_lua(err) {
            ScriptError::Runtime { message } => {
                assert!(message.contains("Expected '1'"));
                assert!(message.contains("stack traceback:"));
            }
            other => panic!("expected runtime error, got {:?}", other),
        }
    }

    #[test]
    fn memory_errors_map_to_memory() {
        let err = mlua::Error::MemoryError("not enough memory".into());
        assert!(matches!(ScriptError::from_lua(err), ScriptError::Memory));
    }
}
