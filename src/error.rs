//! Domain error types. Fatal syscall failures (the ones a real shell simply
//! cannot recover from — `setpgid`/`sigprocmask` on an fd the process owns)
//! still panic in `job_control`; everything a user command can trigger is
//! represented here and reported through [`crate::report::msg`] instead.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TokenizeError {
    #[error("unterminated double-quoted string")]
    UnterminatedDoubleQuote,
    #[error("unterminated single-quoted string")]
    UnterminatedSingleQuote,
}

#[derive(Debug, Error)]
pub enum RedirectError {
    #[error("command line is not well formed")]
    MalformedCommand,
    #[error("{path}: {source}")]
    Open {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
