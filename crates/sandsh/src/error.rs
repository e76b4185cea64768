//! Error types for sandsh

use thiserror::Error;

/// Result type alias using sandsh's Error.
pub type Result<T> = std::result::Result<T, Error>;

/// sandsh error types.
///
/// Most runtime failures never surface through [`Shell::exec`](crate::Shell::exec)
/// as `Err`: they are lowered to a stderr diagnostic plus an exit code. The
/// variants here carry the information needed to do that lowering.
#[derive(Error, Debug)]
pub enum Error {
    /// Syntax error from the parser, with source position.
    #[error("syntax error at line {line}, column {column}: {message}")]
    Syntax {
        line: usize,
        column: usize,
        message: String,
    },

    /// Word expansion failed (unset under `nounset`, bad arithmetic,
    /// failed glob under `failglob`).
    #[error("{0}")]
    Expansion(String),

    /// Command name did not resolve to a function, builtin, or registered command.
    #[error("command not found: {0}")]
    CommandNotFound(String),

    /// I/O error from filesystem operations.
    #[error("{0}")]
    Io(#[from] std::io::Error),

    /// Redirection target could not be opened or written.
    #[error("{0}")]
    Redirection(String),

    /// Execution was cancelled by deadline or token.
    #[error("cancelled")]
    Cancelled,

    /// Resource limit exceeded.
    #[error("resource limit exceeded: {0}")]
    ResourceLimit(String),
}

impl Error {
    /// The shell exit code this error lowers to when it fails a command.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Syntax { .. } => 2,
            Error::Expansion(_) => 1,
            Error::CommandNotFound(_) => 127,
            Error::Io(_) | Error::Redirection(_) => 1,
            Error::Cancelled => 130,
            Error::ResourceLimit(_) => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn syntax_error_carries_position() {
        let err = Error::Syntax {
            line: 3,
            column: 7,
            message: "unexpected token `fi`".into(),
        };
        let msg = format!("{err}");
        assert!(msg.contains("line 3"));
        assert!(msg.contains("column 7"));
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn exit_codes_follow_shell_conventions() {
        assert_eq!(Error::CommandNotFound("zsh".into()).exit_code(), 127);
        assert_eq!(Error::Cancelled.exit_code(), 130);
        assert_eq!(Error::Expansion("bad substitution".into()).exit_code(), 1);
    }
}
