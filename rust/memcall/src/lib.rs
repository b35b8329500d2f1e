//! # memcall
//!
//! Cross-platform wrapper for the memory-mapping system calls used to hand
//! whole page runs to a caller and give them back to the operating system.
//!
//! - Region allocation and release (`mmap`/`munmap`, `VirtualAlloc`/`VirtualFree`)
//! - System page size lookup
//!
//! Allocation failures that mean "the host has no memory left for this
//! request" are reported as [`MemcallError::ResourceLimit`] so callers can
//! tell exhaustion apart from misuse or other system faults.

mod error;

#[cfg(windows)]
pub(crate) mod windows;
#[cfg(windows)]
use windows as platform;

#[cfg(unix)]
pub(crate) mod unix;
#[cfg(unix)]
use unix as platform;

pub use error::MemcallError;

/// Maps a new zero-filled, read-write region of `size` bytes.
///
/// The region stays valid until it is handed back to [`free`]. A `size` of
/// zero is rejected with [`MemcallError::InvalidArgument`].
pub fn alloc(size: usize) -> Result<&'static mut [u8], MemcallError> {
    if size == 0 {
        return Err(MemcallError::InvalidArgument(
            "<memcall> cannot allocate an empty region".to_string(),
        ));
    }
    platform::alloc(size)
}

/// Unmaps a region previously returned by [`alloc`].
///
/// The slice must be exactly the one `alloc` returned and must not be used
/// afterwards. Empty slices are a no-op.
pub fn free(region: &mut [u8]) -> Result<(), MemcallError> {
    if region.is_empty() {
        return Ok(());
    }
    platform::free(region)
}

/// Returns the system's page size.
pub fn page_size() -> usize {
    platform::page_size()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_size_is_rejected() {
        match alloc(0) {
            Err(MemcallError::InvalidArgument(_)) => {}
            other => panic!("expected InvalidArgument, got {:?}", other.map(|r| r.len())),
        }
    }
}
