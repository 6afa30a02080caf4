//! Multi-level priority queue (spec §4.1).
//!
//! Constant-time `add`/`remove`/`peek-highest` over a bounded priority
//! range via a two-level bit map of per-priority FIFO buckets. Bit math
//! is ported directly from `xnsched_mlq` in
//! `original_source/kernel/cobalt/sched.c` (`add_q`/`del_q`/`ffs_q`),
//! substituting `u64::trailing_zeros` for the `ffnz` bit-scan-forward
//! primitive the original assumes.
//!
//! Buckets are `VecDeque<ThreadId>` rather than an intrusive linked list
//! (teacher/pack precedent: `DragonOS`'s `FifoRunQueue` in
//! `other_examples/8f85b066_...-sched-fifo.rs.rs` uses the same
//! `VecDeque<Arc<PCB>>` + bitmap shape). This makes `remove` of an
//! arbitrary (non-head) thread O(bucket depth) instead of O(1); bucket
//! depth is the number of threads sharing one exact priority, which is
//! small in practice.

use alloc::collections::VecDeque;
use alloc::vec::Vec;

use crate::config::WORD_BITS;
use crate::thread::ThreadId;

/// Bounded-range multi-level queue. `hi_prio - lo_prio + 1` must be
/// representable within the configured level cap and is rounded up to a
/// whole number of [`WORD_BITS`]-sized summary words.
#[derive(Debug)]
pub struct Mlq {
    elems: usize,
    lo_prio: i32,
    hi_prio: i32,
    /// Level-1 summary: bit `w` set iff `lomap[w] != 0`.
    himap: u64,
    /// Level-0 bit map, one word per `WORD_BITS`-sized slice of buckets.
    lomap: Vec<u64>,
    /// `buckets[idx]` holds threads at priority `hi_prio - idx`, so index
    /// 0 is the highest priority (lowest index = highest priority, §4.1).
    buckets: Vec<VecDeque<ThreadId>>,
}

impl Mlq {
    /// Build an empty queue spanning `[lo_prio, hi_prio]`.
    ///
    /// # Panics
    /// Panics if the range is inverted, or if `hi_prio - lo_prio + 1`
    /// exceeds [`crate::config::LEVELS`].
    pub fn new(lo_prio: i32, hi_prio: i32) -> Self {
        assert!(hi_prio >= lo_prio, "MLQ range must be non-empty");
        let range = (hi_prio - lo_prio + 1) as usize;
        assert!(
            range <= crate::config::LEVELS,
            "MLQ range exceeds configured LEVELS cap"
        );
        let words = range.div_ceil(WORD_BITS);
        Self {
            elems: 0,
            lo_prio,
            hi_prio,
            himap: 0,
            lomap: alloc::vec![0u64; words],
            buckets: (0..range).map(|_| VecDeque::new()).collect(),
        }
    }

    pub fn lo_prio(&self) -> i32 {
        self.lo_prio
    }

    pub fn hi_prio(&self) -> i32 {
        self.hi_prio
    }

    pub fn len(&self) -> usize {
        self.elems
    }

    pub fn is_empty(&self) -> bool {
        self.elems == 0
    }

    fn qindex(&self, prio: i32) -> usize {
        debug_assert!(
            prio >= self.lo_prio && prio <= self.hi_prio,
            "priority out of MLQ range"
        );
        (self.hi_prio - prio) as usize
    }

    fn mark_occupied(&mut self, idx: usize) {
        let hi = idx / WORD_BITS;
        let lo = idx % WORD_BITS;
        self.himap |= 1u64 << hi;
        self.lomap[hi] |= 1u64 << lo;
    }

    fn mark_if_vacated(&mut self, idx: usize) {
        if self.buckets[idx].is_empty() {
            let hi = idx / WORD_BITS;
            let lo = idx % WORD_BITS;
            self.lomap[hi] &= !(1u64 << lo);
            if self.lomap[hi] == 0 {
                self.himap &= !(1u64 << hi);
            }
        }
    }

    /// Insert at the tail of `prio`'s bucket (FIFO order, spec §4.1).
    pub fn add(&mut self, prio: i32, tid: ThreadId) {
        let idx = self.qindex(prio);
        if self.buckets[idx].is_empty() {
            self.mark_occupied(idx);
        }
        self.buckets[idx].push_back(tid);
        self.elems += 1;
    }

    /// Insert at the head of `prio`'s bucket. Reserved for "requeue
    /// without losing slot" (preemption by a higher class while still
    /// runnable, spec §4.1).
    pub fn add_head(&mut self, prio: i32, tid: ThreadId) {
        let idx = self.qindex(prio);
        if self.buckets[idx].is_empty() {
            self.mark_occupied(idx);
        }
        self.buckets[idx].push_front(tid);
        self.elems += 1;
    }

    /// Remove a specific thread from `prio`'s bucket. Returns whether it
    /// was found and removed.
    pub fn remove(&mut self, prio: i32, tid: ThreadId) -> bool {
        let idx = self.qindex(prio);
        let bucket = &mut self.buckets[idx];
        let before = bucket.len();
        bucket.retain(|&t| t != tid);
        let removed = bucket.len() != before;
        if removed {
            self.elems -= 1;
            self.mark_if_vacated(idx);
        }
        removed
    }

    /// Find-first-set scan: returns the index of the highest occupied
    /// bucket. Undefined (never called) when empty — callers check
    /// `elems == 0` first, per the §4.1 contract.
    fn ffs_index(&self) -> usize {
        let hi = self.himap.trailing_zeros() as usize;
        let lo = self.lomap[hi].trailing_zeros() as usize;
        hi * WORD_BITS + lo
    }

    /// Pop and return the thread at the highest occupied priority,
    /// preserving FIFO order within that priority.
    pub fn pop_highest(&mut self) -> Option<ThreadId> {
        if self.elems == 0 {
            return None;
        }
        let idx = self.ffs_index();
        let tid = self.buckets[idx].pop_front()?;
        self.elems -= 1;
        self.mark_if_vacated(idx);
        Some(tid)
    }

    /// Peek the thread at the highest occupied priority without removing it.
    pub fn peek_highest(&self) -> Option<ThreadId> {
        if self.elems == 0 {
            return None;
        }
        let idx = self.ffs_index();
        self.buckets[idx].front().copied()
    }

    /// Peek the head thread at an exact priority, or `None` if that
    /// bucket is empty (spec §4.1 `peek_by_prio`).
    pub fn peek_by_prio(&self, prio: i32) -> Option<ThreadId> {
        let idx = self.qindex(prio);
        self.buckets[idx].front().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fifo_order_within_priority() {
        let mut q = Mlq::new(0, 31);
        q.add(10, ThreadId(1));
        q.add(10, ThreadId(2));
        q.add(10, ThreadId(3));
        assert_eq!(q.pop_highest(), Some(ThreadId(1)));
        assert_eq!(q.pop_highest(), Some(ThreadId(2)));
        assert_eq!(q.pop_highest(), Some(ThreadId(3)));
        assert!(q.is_empty());
    }

    #[test]
    fn picks_highest_priority_first() {
        let mut q = Mlq::new(0, 31);
        q.add(5, ThreadId(1));
        q.add(20, ThreadId(2));
        q.add(10, ThreadId(3));
        assert_eq!(q.pop_highest(), Some(ThreadId(2)));
        assert_eq!(q.pop_highest(), Some(ThreadId(3)));
        assert_eq!(q.pop_highest(), Some(ThreadId(1)));
    }

    #[test]
    fn bitmap_reflects_emptiness_exactly() {
        let mut q = Mlq::new(0, 127);
        assert_eq!(q.himap, 0);
        q.add(0, ThreadId(1));
        assert_ne!(q.himap, 0);
        q.remove(0, ThreadId(1));
        assert_eq!(q.himap, 0);
        assert!(q.lomap.iter().all(|&w| w == 0));
    }

    #[test]
    fn boundary_priorities_lo_and_hi() {
        let mut q = Mlq::new(0, 63);
        q.add(0, ThreadId(1));
        q.add(63, ThreadId(2));
        assert_eq!(q.peek_by_prio(0), Some(ThreadId(1)));
        assert_eq!(q.peek_by_prio(63), Some(ThreadId(2)));
        assert_eq!(q.pop_highest(), Some(ThreadId(2)));
        assert_eq!(q.pop_highest(), Some(ThreadId(1)));
    }

    #[test]
    fn remove_midqueue_keeps_fifo_order_of_remainder() {
        let mut q = Mlq::new(0, 31);
        q.add(10, ThreadId(1));
        q.add(10, ThreadId(2));
        q.add(10, ThreadId(3));
        assert!(q.remove(10, ThreadId(2)));
        assert_eq!(q.pop_highest(), Some(ThreadId(1)));
        assert_eq!(q.pop_highest(), Some(ThreadId(3)));
    }

    #[test]
    fn enqueue_dequeue_restores_bitmap_exactly() {
        let mut q = Mlq::new(0, 255);
        let snapshot_himap = q.himap;
        let snapshot_lomap = q.lomap.clone();
        q.add(200, ThreadId(42));
        q.remove(200, ThreadId(42));
        assert_eq!(q.himap, snapshot_himap);
        assert_eq!(q.lomap, snapshot_lomap);
    }

    #[test]
    fn spans_multiple_summary_words() {
        // 256 levels / 64 bits per word = 4 words; exercise the top one.
        let mut q = Mlq::new(0, 255);
        q.add(0, ThreadId(1)); // idx 255 -> word 3
        q.add(255, ThreadId(2)); // idx 0 -> word 0
        assert_eq!(q.pop_highest(), Some(ThreadId(2)));
        assert_eq!(q.pop_highest(), Some(ThreadId(1)));
    }
}
