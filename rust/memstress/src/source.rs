use crate::block::{Origin, Region};
use crate::error::StressError;
use log::debug;
use std::alloc::{self, Layout};
use std::ptr::NonNull;

/// Where blocks come from and where they go back to.
pub trait BlockSource {
    /// Requests a region of exactly `size` bytes.
    fn allocate(&mut self, size: usize) -> Result<Region, StressError>;

    /// Returns a region obtained from [`allocate`](Self::allocate).
    fn release(&mut self, region: Region) -> Result<(), StressError>;
}

impl<S: BlockSource + ?Sized> BlockSource for &mut S {
    fn allocate(&mut self, size: usize) -> Result<Region, StressError> {
        (**self).allocate(size)
    }

    fn release(&mut self, region: Region) -> Result<(), StressError> {
        (**self).release(region)
    }
}

/// Matches the alignment `malloc` guarantees on 64-bit targets.
const HEAP_ALIGN: usize = 16;

fn heap_layout(size: usize) -> Result<Layout, StressError> {
    if size == 0 {
        return Err(StressError::InvalidRequest(
            "cannot allocate an empty block".to_string(),
        ));
    }
    Layout::from_size_align(size, HEAP_ALIGN)
        .map_err(|e| StressError::InvalidRequest(format!("{} bytes: {}", size, e)))
}

/// Blocks from the process's global allocator.
///
/// Unless the binary installs its own `#[global_allocator]`, this is the
/// system `malloc`/`free`, including any allocator injected with
/// `LD_PRELOAD` and any tuning of its mmap threshold.
#[derive(Debug, Default)]
pub struct HeapSource {
    outstanding: usize,
}

impl HeapSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes currently allocated and not yet released.
    pub fn outstanding_bytes(&self) -> usize {
        self.outstanding
    }
}

impl BlockSource for HeapSource {
    fn allocate(&mut self, size: usize) -> Result<Region, StressError> {
        let layout = heap_layout(size)?;
        let ptr = unsafe { alloc::alloc(layout) };
        let ptr = NonNull::new(ptr).ok_or(StressError::OutOfMemory { requested: size })?;
        self.outstanding += size;
        debug!(
            "heap allocated {} bytes at {:p}, {} outstanding",
            size, ptr, self.outstanding
        );
        Ok(unsafe { Region::from_heap(ptr, size) })
    }

    fn release(&mut self, region: Region) -> Result<(), StressError> {
        if region.origin() != Origin::Heap {
            return Err(StressError::ForeignRegion(format!("{:?}", region)));
        }
        let size = region.len();
        let layout = heap_layout(size)?;
        unsafe { alloc::dealloc(region.into_heap().as_ptr(), layout) };
        self.outstanding = self.outstanding.saturating_sub(size);
        debug!("heap freed {} bytes, {} outstanding", size, self.outstanding);
        Ok(())
    }
}

/// Anonymous page mappings from `memcall`, bypassing the allocator.
///
/// Unmapping returns the pages to the OS immediately whatever the
/// allocator's trimming policy.
#[derive(Debug, Default)]
pub struct PageSource {
    outstanding: usize,
}

impl PageSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes currently mapped and not yet released.
    pub fn outstanding_bytes(&self) -> usize {
        self.outstanding
    }
}

impl BlockSource for PageSource {
    fn allocate(&mut self, size: usize) -> Result<Region, StressError> {
        let memory = memcall::alloc(size)?;
        self.outstanding += size;
        debug!(
            "mapped {} bytes at {:p}, {} outstanding",
            size,
            memory.as_ptr(),
            self.outstanding
        );
        Ok(Region::from_mapping(memory))
    }

    fn release(&mut self, region: Region) -> Result<(), StressError> {
        if region.origin() != Origin::Pages {
            return Err(StressError::ForeignRegion(format!("{:?}", region)));
        }
        let size = region.len();
        memcall::free(region.into_mapping())?;
        self.outstanding = self.outstanding.saturating_sub(size);
        debug!("unmapped {} bytes, {} outstanding", size, self.outstanding);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heap_tracks_outstanding_bytes() {
        let mut source = HeapSource::new();
        let first = source.allocate(8192).expect("alloc first");
        let second = source.allocate(100).expect("alloc second");
        assert_eq!(source.outstanding_bytes(), 8292);
        assert_eq!(first.as_ptr() as usize % HEAP_ALIGN, 0);

        source.release(first).expect("free first");
        assert_eq!(source.outstanding_bytes(), 100);
        source.release(second).expect("free second");
        assert_eq!(source.outstanding_bytes(), 0);
    }

    #[test]
    fn pages_track_outstanding_bytes() {
        let mut source = PageSource::new();
        let first = source.allocate(8192).expect("map first");
        let second = source.allocate(4096).expect("map second");
        assert_eq!(source.outstanding_bytes(), 12288);

        source.release(first).expect("unmap first");
        assert_eq!(source.outstanding_bytes(), 4096);
        source.release(second).expect("unmap second");
        assert_eq!(source.outstanding_bytes(), 0);
    }

    #[test]
    fn zero_size_request_is_not_exhaustion() {
        let err = HeapSource::new().allocate(0).expect_err("empty block");
        assert!(matches!(err, StressError::InvalidRequest(_)));
        assert!(!err.is_exhaustion());

        let err = PageSource::new().allocate(0).expect_err("empty mapping");
        assert!(!err.is_exhaustion());
    }

    #[test]
    fn heap_region_is_refused_by_page_source() {
        let mut heap = HeapSource::new();
        let mut pages = PageSource::new();
        let region = heap.allocate(4096).expect("alloc");
        let ptr = region.as_ptr();

        let err = pages.release(region).expect_err("heap memory must not be unmapped");
        assert!(matches!(err, StressError::ForeignRegion(_)));
        assert_eq!(pages.outstanding_bytes(), 0);

        // The refused region was leaked, not freed; the heap still owns it.
        let layout = heap_layout(4096).expect("layout");
        unsafe { alloc::dealloc(ptr.cast_mut(), layout) };
    }

    #[test]
    fn page_region_is_refused_by_heap_source() {
        let mut heap = HeapSource::new();
        let mut pages = PageSource::new();
        let region = pages.allocate(4096).expect("map");

        let err = heap.release(region).expect_err("mapping must not reach dealloc");
        assert!(matches!(err, StressError::ForeignRegion(_)));
        assert_eq!(heap.outstanding_bytes(), 0);
    }

    #[cfg(all(unix, target_pointer_width = "64"))]
    #[test]
    fn impossible_heap_request_is_exhaustion() {
        let mut source = HeapSource::new();
        match source.allocate(1 << 62) {
            Err(err) => {
                assert!(matches!(
                    err,
                    StressError::OutOfMemory { requested } if requested == 1 << 62
                ));
                assert!(err.is_exhaustion());
            }
            Ok(region) => {
                source.release(region).expect("free");
                panic!("a 4 EiB heap block should not be grantable");
            }
        }
        assert_eq!(source.outstanding_bytes(), 0);
    }
}
