use std::path::PathBuf;

/// Core error type for the shopping-list bot.
///
/// Permission denials and missing context are not errors: stores report them
/// as `false`/`None` and the router renders a reason. Everything that reaches
/// this type is unexpected and ends the current unit of work.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid database path: {path}: {reason}")]
    InvalidPath { path: PathBuf, reason: String },

    #[error("corrupt row: {0}")]
    CorruptRow(String),

    #[error("external error: {0}")]
    External(String),
}

pub type Result<T> = std::result::Result<T, Error>;
