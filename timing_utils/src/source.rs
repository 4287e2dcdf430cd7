//! Capability seam between the measurement engines and the hardware.
//!
//! Engines drive everything through [`TimingSource`], so the statistical and
//! control logic stays portable while the `rdtsc`/`clflush` specifics live in
//! [`HardwareTiming`] alone. Tests substitute [`crate::stub::StubTiming`].

use crate::{flush, maccess, mfence, rdtsc_end, rdtsc_start, CACHE_LINE_LEN};
use core::ptr;
use core::sync::atomic::{compiler_fence, Ordering};

pub trait TimingSource {
    /// Serialized counter read opening a measurement window.
    fn counter_start(&mut self) -> u64;
    /// Serialized counter read closing a measurement window.
    fn counter_end(&mut self) -> u64;

    /// Evicts the cache line containing `addr` from every cache level.
    ///
    /// # Safety
    ///
    /// `addr` must point into a mapped region. No bounds checking happens
    /// here; the caller owns address validity.
    unsafe fn evict_line(&mut self, addr: *const u8);

    /// Full fence ordering prior evictions before anything that follows.
    fn eviction_barrier(&mut self);

    /// One 8-byte load that cannot be elided or hoisted out of the timed
    /// window.
    ///
    /// # Safety
    ///
    /// `addr` must be valid to read as a `u64`.
    unsafe fn read_once(&mut self, addr: *const u64);

    /// The timed block copy of the size sweep.
    ///
    /// # Safety
    ///
    /// `src` and `dst` must be valid for `len` bytes and must not overlap.
    unsafe fn copy_block(&mut self, src: *const u8, dst: *mut u8, len: usize);

    /// Evicts every line of `[addr, addr + len)` at 64-byte strides, then
    /// issues the barrier. When this returns the region is no longer
    /// cache-resident.
    ///
    /// # Safety
    ///
    /// The whole region must be mapped.
    unsafe fn evict_region(&mut self, addr: *const u8, len: usize) {
        let mut offset = 0;
        while offset < len {
            unsafe { self.evict_line(addr.add(offset)) };
            offset += CACHE_LINE_LEN;
        }
        self.eviction_barrier();
    }
}

/// The real thing: serialized `rdtsc`/`rdtscp` and `clflush`.
#[derive(Debug, Default)]
pub struct HardwareTiming;

impl TimingSource for HardwareTiming {
    fn counter_start(&mut self) -> u64 {
        unsafe { rdtsc_start() }
    }

    fn counter_end(&mut self) -> u64 {
        unsafe { rdtsc_end() }
    }

    unsafe fn evict_line(&mut self, addr: *const u8) {
        unsafe { flush(addr) };
    }

    fn eviction_barrier(&mut self) {
        mfence();
    }

    unsafe fn read_once(&mut self, addr: *const u64) {
        compiler_fence(Ordering::SeqCst);
        unsafe { maccess(addr) };
        compiler_fence(Ordering::SeqCst);
    }

    unsafe fn copy_block(&mut self, src: *const u8, dst: *mut u8, len: usize) {
        compiler_fence(Ordering::SeqCst);
        unsafe { ptr::copy_nonoverlapping(src, dst, len) };
        compiler_fence(Ordering::SeqCst);
    }
}
