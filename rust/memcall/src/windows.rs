use crate::error::MemcallError;
use log::trace;
use once_cell::sync::Lazy;
use std::io;
use std::ptr;
use windows_sys::Win32::Foundation::{ERROR_COMMITMENT_LIMIT, ERROR_NOT_ENOUGH_MEMORY};
use windows_sys::Win32::System::Memory::{
    VirtualAlloc, VirtualFree, MEM_COMMIT, MEM_RELEASE, MEM_RESERVE, PAGE_READWRITE,
};
use windows_sys::Win32::System::SystemInformation::{GetSystemInfo, SYSTEM_INFO};

static PAGE_SIZE: Lazy<usize> = Lazy::new(|| {
    let mut info: SYSTEM_INFO = unsafe { std::mem::zeroed() };
    unsafe { GetSystemInfo(&mut info) };
    info.dwPageSize as usize
});

fn alloc_error(size: usize, err: io::Error) -> MemcallError {
    let message = format!("<memcall> could not allocate {} bytes [Err: {}]", size, err);
    match err.raw_os_error().map(|code| code as u32) {
        Some(ERROR_NOT_ENOUGH_MEMORY) | Some(ERROR_COMMITMENT_LIMIT) => {
            MemcallError::ResourceLimit(message)
        }
        _ => MemcallError::SystemError(message),
    }
}

pub fn alloc(size: usize) -> Result<&'static mut [u8], MemcallError> {
    let ptr = unsafe { VirtualAlloc(ptr::null(), size, MEM_COMMIT | MEM_RESERVE, PAGE_READWRITE) };

    if ptr.is_null() {
        return Err(alloc_error(size, io::Error::last_os_error()));
    }
    trace!("<memcall> committed {} bytes at {:p}", size, ptr);

    // Committed pages are zero-filled on first touch.
    Ok(unsafe { std::slice::from_raw_parts_mut(ptr.cast::<u8>(), size) })
}

pub fn free(region: &mut [u8]) -> Result<(), MemcallError> {
    let result = unsafe { VirtualFree(region.as_mut_ptr().cast(), 0, MEM_RELEASE) };
    if result == 0 {
        return Err(MemcallError::SystemError(format!(
            "<memcall> could not deallocate {:p} [Err: {}]",
            region.as_ptr(),
            io::Error::last_os_error()
        )));
    }
    trace!("<memcall> released {} bytes at {:p}", region.len(), region.as_ptr());
    Ok(())
}

pub fn page_size() -> usize {
    *PAGE_SIZE
}
