//! Deterministic [`TimingSource`] for tests.
//!
//! Keeps a synthetic cycle counter and a line-granular warm set: touching a
//! line the stub has not seen since its last eviction charges `cold_cost`
//! cycles, touching a warm line charges `warm_cost`. Every eviction and
//! barrier is recorded so tests can assert on eviction granularity.

use crate::source::TimingSource;
use crate::CACHE_LINE_LEN;
use std::collections::HashSet;

#[derive(Debug)]
pub struct StubTiming {
    now: u64,
    warm: HashSet<usize>,
    cold_cost: u64,
    warm_cost: u64,
    evictions: Vec<usize>,
    barriers: usize,
}

impl StubTiming {
    pub fn new(cold_cost: u64, warm_cost: u64) -> StubTiming {
        StubTiming {
            now: 0,
            warm: HashSet::new(),
            cold_cost,
            warm_cost,
            evictions: Vec::new(),
            barriers: 0,
        }
    }

    fn line_of(addr: usize) -> usize {
        addr & !(CACHE_LINE_LEN - 1)
    }

    fn touch(&mut self, addr: usize) {
        let line = Self::line_of(addr);
        let cost = if self.warm.contains(&line) {
            self.warm_cost
        } else {
            self.cold_cost
        };
        self.now += cost;
        self.warm.insert(line);
    }

    /// Line addresses evicted so far, in issue order.
    pub fn evictions(&self) -> &[usize] {
        &self.evictions
    }

    pub fn barriers(&self) -> usize {
        self.barriers
    }

    pub fn is_warm(&self, addr: usize) -> bool {
        self.warm.contains(&Self::line_of(addr))
    }
}

impl TimingSource for StubTiming {
    fn counter_start(&mut self) -> u64 {
        self.now
    }

    fn counter_end(&mut self) -> u64 {
        self.now
    }

    unsafe fn evict_line(&mut self, addr: *const u8) {
        let line = Self::line_of(addr as usize);
        self.warm.remove(&line);
        self.evictions.push(line);
    }

    fn eviction_barrier(&mut self) {
        self.barriers += 1;
    }

    unsafe fn read_once(&mut self, addr: *const u64) {
        self.touch(addr as usize);
    }

    unsafe fn copy_block(&mut self, src: *const u8, dst: *mut u8, len: usize) {
        for offset in (0..len).step_by(CACHE_LINE_LEN) {
            self.touch(src as usize + offset);
            self.touch(dst as usize + offset);
        }
    }
}
