use thiserror::Error;

/// Host-level failures of the stream machinery.
///
/// Failures inside a script never show up here; they are reported to the
/// destination tab as `StreamEvent::Error`.
#[derive(Error, Debug)]
pub enum StreamError {
    #[error("failed to set up Lua interpreter: {0}")]
    Interpreter(#[from] mlua::Error),

    #[error("unknown stream kind '{0}'")]
    UnknownKind(String),

    #[error("failed to spawn stream worker: {0}")]
    Spawn(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, StreamError>;
