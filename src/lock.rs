//! The per-thread scheduler lock (spec §4.5).
//!
//! Holding this lock pins the holder against involuntary preemption on
//! its own CPU; other CPUs are unaffected. A lock holder may still
//! voluntarily block. Nested holds only increment `lock_depth`; release
//! is balanced (testable property 5, spec §8).

use crate::thread::{Thread, ThreadState};

/// `lock()` (spec §4.5): increments `lock_depth`; on the 0→1 transition
/// sets `LOCK`. The caller is responsible for also setting `rq.lflags
/// .INLOCK` (done by [`crate::Core::lock`], which has the run-queue in
/// scope).
pub fn lock(thread: &mut Thread) {
    thread.lock_depth += 1;
    if thread.lock_depth == 1 {
        thread.state.insert(ThreadState::LOCK);
    }
}

/// `unlock()` (spec §4.5): decrements `lock_depth`; on reaching 0 clears
/// `LOCK`. Returns `true` when the depth reached zero, signaling the
/// caller to invoke the rescheduler. Unlocking at depth 0 is a bug (spec
/// §4.5 assertion) and is a no-op in release builds.
pub fn unlock(thread: &mut Thread) -> bool {
    if thread.lock_depth == 0 {
        crate::core_assert!(false, "unlock() with lock_depth already 0 on thread {}", thread.id);
        return false;
    }
    thread.lock_depth -= 1;
    if thread.lock_depth == 0 {
        thread.state.remove(ThreadState::LOCK);
        true
    } else {
        false
    }
}

/// `unlock_fully()` (spec §4.5): forces `lock_depth` to 0 regardless of
/// the current depth, then always signals the caller to reschedule.
pub fn unlock_fully(thread: &mut Thread) {
    thread.lock_depth = 0;
    thread.state.remove(ThreadState::LOCK);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class::ClassId;
    use crate::runqueue::CpuId;
    use crate::thread::{HostTaskRef, ThreadId};

    fn make_thread() -> Thread {
        Thread::new(ThreadId(1), "t", HostTaskRef(0), ClassId(0), 10, CpuId(0))
    }

    #[test]
    fn nested_locks_balance() {
        let mut t = make_thread();
        lock(&mut t);
        lock(&mut t);
        lock(&mut t);
        assert_eq!(t.lock_depth, 3);
        assert!(t.is_locked());
        assert!(!unlock(&mut t));
        assert!(!unlock(&mut t));
        assert!(unlock(&mut t));
        assert_eq!(t.lock_depth, 0);
        assert!(!t.is_locked());
    }

    #[test]
    fn unlock_fully_forces_zero() {
        let mut t = make_thread();
        lock(&mut t);
        lock(&mut t);
        unlock_fully(&mut t);
        assert_eq!(t.lock_depth, 0);
        assert!(!t.is_locked());
    }

    #[test]
    fn unlock_at_zero_is_noop() {
        let mut t = make_thread();
        assert!(!unlock(&mut t));
        assert_eq!(t.lock_depth, 0);
    }
}
