pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("null message")]
    NullMessage,

    #[error("queue not initialized")]
    Uninitialized,

    #[error("allocation failure: {0}")]
    AllocationFailure(#[from] std::collections::TryReserveError),

    #[error("usage violation: {0}")]
    UsageViolation(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("executor error: {0}")]
    Executor(String),

    #[error("task failed: {0}")]
    TaskFailed(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Error::Config(msg.into())
    }

    pub fn executor<S: Into<String>>(msg: S) -> Self {
        Error::Executor(msg.into())
    }

    pub fn usage<S: Into<String>>(msg: S) -> Self {
        Error::UsageViolation(msg.into())
    }
}

/// Reports a broken usage contract and aborts the process.
///
/// Contract violations on tasks and the pool are programmer errors, never
/// recoverable conditions.
#[cold]
pub fn fatal(err: Error) -> ! {
    tracing::error!(error = %err, "fatal usage error, aborting");
    eprintln!("ERROR: {err}");
    std::process::abort();
}
