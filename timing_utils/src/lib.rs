#![deny(unsafe_op_in_unsafe_fn)]

pub mod alloc;
pub mod source;
pub mod stub;

use core::arch::x86_64 as arch_x86;
use core::ptr;

pub const CACHE_LINE_LEN: usize = 64;

/// Serialized start-of-window counter read: `cpuid` drains the pipeline so no
/// prior instruction can slide past the `rdtsc`.
pub unsafe fn rdtsc_start() -> u64 {
    let _ = unsafe { arch_x86::__cpuid(0) };
    unsafe { arch_x86::_rdtsc() }
}

/// Serialized end-of-window counter read: `rdtscp` waits for prior
/// instructions to retire before reading, and the trailing `cpuid` keeps
/// later instructions from reordering into the measured window. The pair is
/// deliberately asymmetric with [`rdtsc_start`].
pub unsafe fn rdtsc_end() -> u64 {
    let mut aux = 0u32;
    let tsc = unsafe { arch_x86::__rdtscp(&mut aux) };
    let _ = unsafe { arch_x86::__cpuid(0) };
    tsc
}

pub unsafe fn maccess<T>(p: *const T) {
    unsafe {
        ptr::read_volatile(p);
    }
}

// flush (clflush), evicts the 64B line containing p from all cache levels
pub unsafe fn flush(p: *const u8) {
    unsafe { arch_x86::_mm_clflush(p) };
}

pub fn mfence() {
    unsafe { arch_x86::_mm_mfence() };
}
