use crate::error::MemcallError;
use log::trace;
use once_cell::sync::Lazy;
use std::io;
use std::ptr;

static PAGE_SIZE: Lazy<usize> = Lazy::new(|| {
    let size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    if size <= 0 {
        4096
    } else {
        size as usize
    }
});

#[inline]
fn as_mut_ptr(memory: &mut [u8]) -> *mut libc::c_void {
    memory.as_mut_ptr().cast::<libc::c_void>()
}

fn alloc_error(size: usize, err: io::Error) -> MemcallError {
    let message = format!("<memcall> could not allocate {} bytes [Err: {}]", size, err);
    match err.raw_os_error() {
        Some(libc::ENOMEM) | Some(libc::EAGAIN) => MemcallError::ResourceLimit(message),
        Some(libc::EINVAL) => MemcallError::InvalidArgument(message),
        _ => MemcallError::SystemError(message),
    }
}

/// Maps an anonymous private read-write region.
pub fn alloc(size: usize) -> Result<&'static mut [u8], MemcallError> {
    let ptr = unsafe {
        libc::mmap(
            ptr::null_mut(),
            size,
            libc::PROT_READ | libc::PROT_WRITE,
            libc::MAP_PRIVATE | libc::MAP_ANON,
            -1,
            0,
        )
    };

    if ptr == libc::MAP_FAILED {
        return Err(alloc_error(size, io::Error::last_os_error()));
    }
    trace!("<memcall> mapped {} bytes at {:p}", size, ptr);

    // Anonymous mappings are zero-filled by the kernel.
    Ok(unsafe { std::slice::from_raw_parts_mut(ptr.cast::<u8>(), size) })
}

/// Unmaps a region previously returned by `alloc`.
pub fn free(region: &mut [u8]) -> Result<(), MemcallError> {
    let len = region.len();
    let result = unsafe { libc::munmap(as_mut_ptr(region), len) };

    if result != 0 {
        return Err(MemcallError::SystemError(format!(
            "<memcall> could not deallocate {:p} [Err: {}]",
            region.as_ptr(),
            io::Error::last_os_error()
        )));
    }
    trace!("<memcall> unmapped {} bytes at {:p}", len, region.as_ptr());

    Ok(())
}

pub fn page_size() -> usize {
    *PAGE_SIZE
}
