//! Owned memory regions and the table that holds them between phases.

use crate::pattern::fill_byte;
use log::debug;
use std::fmt;
use std::ptr::NonNull;

/// Which kind of source produced a region, and so which release call is
/// valid for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Origin {
    Heap,
    Pages,
}

/// A raw memory region owned exclusively by whoever holds it.
///
/// Only a [`BlockSource`](crate::BlockSource) in this crate can create one,
/// and each source refuses regions it did not produce. Not `Clone`, so a
/// region can only be handed back once.
pub struct Region {
    ptr: NonNull<u8>,
    len: usize,
    origin: Origin,
}

impl Region {
    /// Takes ownership of a region returned by `memcall::alloc`.
    pub(crate) fn from_mapping(memory: &'static mut [u8]) -> Self {
        let len = memory.len();
        let ptr = NonNull::from(memory).cast::<u8>();
        Self {
            ptr,
            len,
            origin: Origin::Pages,
        }
    }

    /// Takes ownership of `len` bytes from the global allocator.
    ///
    /// # Safety
    ///
    /// `ptr` must come from `std::alloc::alloc` with a layout of size `len`,
    /// and must not be owned by anything else.
    pub(crate) unsafe fn from_heap(ptr: NonNull<u8>, len: usize) -> Self {
        Self {
            ptr,
            len,
            origin: Origin::Heap,
        }
    }

    pub(crate) fn origin(&self) -> Origin {
        self.origin
    }

    /// Gives back the `memcall` mapping. Only valid for `Origin::Pages`.
    pub(crate) fn into_mapping(self) -> &'static mut [u8] {
        debug_assert_eq!(self.origin, Origin::Pages);
        unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }

    /// Gives back the heap pointer. Only valid for `Origin::Heap`.
    pub(crate) fn into_heap(self) -> NonNull<u8> {
        debug_assert_eq!(self.origin, Origin::Heap);
        self.ptr
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    pub fn as_ptr(&self) -> *const u8 {
        self.ptr.as_ptr()
    }

    pub(crate) fn as_slice(&self) -> &[u8] {
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }

    pub(crate) fn as_mut_slice(&mut self) -> &mut [u8] {
        unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }
}

impl fmt::Debug for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Region")
            .field("ptr", &self.ptr)
            .field("len", &self.len)
            .field("origin", &self.origin)
            .finish()
    }
}

/// Outcome of checking a block's first byte against its fill byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mismatch {
    pub index: usize,
    pub expected: u8,
    /// `None` when the block is empty and has no first byte.
    pub found: Option<u8>,
}

/// A region stamped with the fill byte for its table index.
#[derive(Debug)]
pub struct Block {
    index: usize,
    fill: u8,
    region: Region,
}

impl Block {
    /// Writes `fill_byte(index)` over every byte of `region`.
    pub fn stamp(index: usize, mut region: Region) -> Self {
        let fill = fill_byte(index);
        region.as_mut_slice().fill(fill);
        Self {
            index,
            fill,
            region,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn fill_byte(&self) -> u8 {
        self.fill
    }

    pub fn first_byte(&self) -> Option<u8> {
        self.region.as_slice().first().copied()
    }

    /// Raw contents, writable so external damage can be simulated.
    pub fn bytes_mut(&mut self) -> &mut [u8] {
        self.region.as_mut_slice()
    }

    /// Reads the first byte only; touching the rest would fault every page
    /// back in and distort the residency being observed.
    pub fn verify(&self) -> Result<(), Mismatch> {
        match self.first_byte() {
            Some(found) if found == self.fill => Ok(()),
            found => Err(Mismatch {
                index: self.index,
                expected: self.fill,
                found,
            }),
        }
    }

    pub fn into_region(self) -> Region {
        self.region
    }
}

/// Fixed-capacity, index-ordered holder for blocks between the two phases.
#[derive(Debug)]
pub struct BlockTable {
    blocks: Vec<Block>,
    capacity: usize,
}

impl BlockTable {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            blocks: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Stamps `region` for the next free slot and stores it there.
    ///
    /// The region is handed back untouched when the table is full.
    pub fn stamp_next(&mut self, region: Region) -> Result<&Block, Region> {
        if self.is_full() {
            return Err(region);
        }
        let index = self.blocks.len();
        self.blocks.push(Block::stamp(index, region));
        Ok(&self.blocks[index])
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_full(&self) -> bool {
        self.blocks.len() >= self.capacity
    }

    pub fn get(&self, index: usize) -> Option<&Block> {
        self.blocks.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Block> {
        self.blocks.get_mut(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Block> {
        self.blocks.iter()
    }

    /// Removes every block, yielding them in allocation order.
    pub fn drain(&mut self) -> std::vec::Drain<'_, Block> {
        self.blocks.drain(..)
    }
}

impl Drop for BlockTable {
    fn drop(&mut self) {
        if !self.blocks.is_empty() {
            debug!(
                "BlockTable dropped with {} blocks still allocated. Run the release phase first.",
                self.blocks.len()
            );
        }
    }
}
