use std::fmt;

#[derive(Debug)]
pub enum WeaverError {
    OrderingConflict(String),
    CompilationError(String),
    ConfigurationError(String),
    CacheError(String),
    WatchError(String),
    ExecutionError(String),
    Cancelled,
}

impl fmt::Display for WeaverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WeaverError::OrderingConflict(msg) => write!(f, "Ordering conflict: {msg}"),
            WeaverError::CompilationError(msg) => write!(f, "Compilation error: {msg}"),
            WeaverError::ConfigurationError(msg) => write!(f, "Configuration error: {msg}"),
            WeaverError::CacheError(msg) => write!(f, "Cache error: {msg}"),
            WeaverError::WatchError(msg) => write!(f, "Watch error: {msg}"),
            WeaverError::ExecutionError(msg) => write!(f, "Execution error: {msg}"),
            WeaverError::Cancelled => write!(f, "Execution cancelled"),
        }
    }
}

impl std::error::Error for WeaverError {}

pub type Result<T> = std::result::Result<T, WeaverError>;
