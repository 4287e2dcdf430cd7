//! Cache-line-aligned buffers and process memory locking.

use crate::CACHE_LINE_LEN;
use core::slice::{from_raw_parts, from_raw_parts_mut};
use nix::sys::mman;
use std::alloc::{alloc, dealloc, Layout, LayoutError};
use std::ptr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AllocationError {
    #[error("refusing to allocate an empty buffer")]
    ZeroSize,
    #[error("invalid layout for a {size} byte aligned buffer: {source}")]
    Layout {
        size: usize,
        #[source]
        source: LayoutError,
    },
    #[error("aligned allocation of {size} bytes failed")]
    OutOfMemory { size: usize },
}

/// Owned heap buffer aligned to a cache-line boundary, so eviction at
/// 64-byte strides covers it exactly and the first line starts at offset 0.
pub struct AlignedBuffer {
    pointer: *mut u8,
    size: usize,
    layout: Layout,
}

impl AlignedBuffer {
    /// Allocates `size` bytes at 64-byte alignment and fills them with
    /// `fill`, so the memory is backed by real (non-zero-page) frames before
    /// any measurement touches it.
    pub fn new(size: usize, fill: u8) -> Result<AlignedBuffer, AllocationError> {
        if size == 0 {
            return Err(AllocationError::ZeroSize);
        }
        let layout = Layout::from_size_align(size, CACHE_LINE_LEN)
            .map_err(|source| AllocationError::Layout { size, source })?;
        let pointer = unsafe { alloc(layout) };
        if pointer.is_null() {
            return Err(AllocationError::OutOfMemory { size });
        }
        unsafe { ptr::write_bytes(pointer, fill, size) };
        Ok(AlignedBuffer {
            pointer,
            size,
            layout,
        })
    }

    pub fn ptr(&self) -> *const u8 {
        self.pointer
    }

    pub fn ptr_mut(&mut self) -> *mut u8 {
        self.pointer
    }

    pub fn len(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    pub fn slice(&self) -> &[u8] {
        unsafe { from_raw_parts(self.pointer, self.size) }
    }

    pub fn slice_mut(&mut self) -> &mut [u8] {
        unsafe { from_raw_parts_mut(self.pointer, self.size) }
    }
}

impl Drop for AlignedBuffer {
    fn drop(&mut self) {
        unsafe { dealloc(self.pointer, self.layout) };
    }
}

/// Best-effort pin of all current and future process memory, so page
/// migration and swap do not show up as latency outliers. Callers treat
/// failure as a degraded-confidence warning, not an abort.
pub fn lock_process_memory() -> nix::Result<()> {
    mman::mlockall(mman::MlockAllFlags::MCL_CURRENT | mman::MlockAllFlags::MCL_FUTURE)
}
