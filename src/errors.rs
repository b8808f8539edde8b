use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage client could not be launched: {0}")]
    ClientInvocationFailed(String),

    #[error("Storage client execution failed ({status}): {detail}")]
    ClientExecutionFailed {
        status: String,
        detail: String,
        /// Identifier salvaged from the log of a run that exited abnormally.
        /// The object may exist in storage even though the run failed.
        partial_identifier: Option<String>,
    },

    #[error("Could not extract upload identifier from client log: {detail}")]
    LogParseFailed {
        /// Nonzero exit code of the client run, when it terminated with one.
        exit_status: Option<i32>,
        detail: String,
    },

    #[error("Backup transfer failed: {0}")]
    BackupTransferFailed(String),

    #[error("Failed to persist path mapping: {0}")]
    MappingPersistFailed(#[from] sqlx::Error),
}

pub type Result<T> = std::result::Result<T, AppError>;
