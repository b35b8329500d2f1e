use thiserror::Error;

/// Errors raised while driving a stress run.
///
/// None of these stop a run once it has started. Allocation errors end the
/// allocation phase and release errors are counted; only an invalid
/// [`StressConfig`](crate::StressConfig) prevents a run from starting.
#[derive(Error, Debug)]
pub enum StressError {
    /// An error from the underlying `memcall` layer.
    #[error("Memory system error: {0}")]
    Memcall(#[from] memcall::MemcallError),

    /// The global allocator returned null.
    #[error("Heap could not supply {requested} bytes")]
    OutOfMemory { requested: usize },

    /// The request cannot be expressed as an allocation.
    #[error("Invalid allocation request: {0}")]
    InvalidRequest(String),

    /// A region was handed to a source that did not produce it.
    #[error("Region was not allocated by this source: {0}")]
    ForeignRegion(String),

    /// The run parameters cannot describe a valid run.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl StressError {
    /// True when the host could not supply more memory.
    pub fn is_exhaustion(&self) -> bool {
        match self {
            StressError::Memcall(err) => err.is_exhaustion(),
            StressError::OutOfMemory { .. } => true,
            StressError::InvalidRequest(_)
            | StressError::ForeignRegion(_)
            | StressError::InvalidConfig(_) => false,
        }
    }
}
