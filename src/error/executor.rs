use std::io;

use thiserror::Error;

/// Ошибки пула приоритетных задач.
#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("executor has been shut down")]
    ShutDown,

    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[from] io::Error),
}
