use thiserror::Error;

/// Errors that can occur during memory-mapping operations.
#[derive(Error, Debug)]
pub enum MemcallError {
    /// Operation failed due to a system error.
    #[error("System operation failed: {0}")]
    SystemError(String),

    /// Invalid arguments were provided to the operation.
    #[error("Invalid arguments: {0}")]
    InvalidArgument(String),

    /// The system is out of memory or hit a resource limit.
    #[error("Resource limit reached: {0}")]
    ResourceLimit(String),
}

impl MemcallError {
    /// True when the host could not supply the requested memory.
    pub fn is_exhaustion(&self) -> bool {
        matches!(self, MemcallError::ResourceLimit(_))
    }
}
