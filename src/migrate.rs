//! Migration & cross-CPU signaling (spec §2 component 6, §4.4 `migrate`).
//!
//! Moving a thread between run-queues is the one state-change operation
//! that interacts with the unlocked-switch window: migrating the
//! currently-running thread on a platform that supports releasing the
//! lock across the arch switch defers the destination insertion to
//! `finish_unlocked_switch` (`resched.rs`) instead of doing it inline.

use crate::class::{arena_ctx, ClassId};
use crate::resched;
use crate::runqueue::CpuId;
use crate::thread::{ThreadId, ThreadState};
use crate::Core;

/// `migrate(t, dst_rq)` (spec §4.4). May be called on a runnable or
/// blocked thread.
pub fn migrate(core: &mut Core, tid: ThreadId, dst_cpu: CpuId) {
    migrate_inner(core, tid, dst_cpu, false)
}

/// `migrate_passive(t, dst_rq)`: the "passive" variant referenced in
/// spec §4.4 and §6 — re-enqueues on the destination only if the thread
/// is not blocked, without the currently-running/unlocked-switch special
/// case (used when the caller already knows `t` is not the thread
/// executing on its own CPU).
pub fn migrate_passive(core: &mut Core, tid: ThreadId, dst_cpu: CpuId) {
    migrate_inner(core, tid, dst_cpu, true)
}

fn migrate_inner(core: &mut Core, tid: ThreadId, dst_cpu: CpuId, passive: bool) {
    // spec §4.7: "the scheduler never enqueues a thread onto a CPU outside
    // this set; the affinity set of an individual thread is intersected
    // with this global mask at migration time." A `dst_cpu` outside the
    // current real-time affinity mask is rejected outright — nothing about
    // `tid` is touched.
    if !core.affinity.mask().contains(dst_cpu) {
        return;
    }

    let (src_cpu, was_ready, class_id, is_blocked) = match core.arena.get(tid) {
        Some(t) => (t.owning_cpu, t.is_ready(), t.sched_class, !t.state.is_unblocked()),
        None => return,
    };

    if was_ready {
        if let Some(t) = core.arena.get_mut(tid) {
            t.state.remove(ThreadState::READY);
        }
        let idx = src_cpu.as_usize();
        let Core { runqueues, arena, .. } = core;
        let rq = &mut runqueues[idx];
        let mut ctx = arena_ctx(arena);
        rq.class_mut(class_id).dequeue(&mut ctx, tid);
    }

    // Per-class migration fix-up may reassign the thread's class as a
    // side effect (spec §4.2 "MAY switch the thread to a different
    // class", e.g. weak↔strong).
    let reassigned: Option<ClassId> = {
        let idx = src_cpu.as_usize();
        let Core { runqueues, arena, .. } = core;
        let rq = &mut runqueues[idx];
        let mut ctx = arena_ctx(arena);
        rq.class_mut(class_id).migrate(&mut ctx, tid, dst_cpu)
    };
    let effective_class = reassigned.unwrap_or(class_id);

    core.runqueues[src_cpu.as_usize()].mark_resched();

    let is_current_on_src = core.runqueues[src_cpu.as_usize()].current == Some(tid);
    if let Some(t) = core.arena.get_mut(tid) {
        t.sched_class = effective_class;
        t.owning_cpu = dst_cpu;
    }

    if !passive && is_current_on_src && core.config.unlocked_switch {
        // Defer insertion: `finish_unlocked_switch` places the thread on
        // `dst_cpu`'s run-queue once the arch switch away from it
        // returns (spec §4.4, §8 scenario S4, §9 "Unlocked switch
        // window").
        if let Some(t) = core.arena.get_mut(tid) {
            t.state.insert(ThreadState::MIGRATE);
        }
        return;
    }

    if !is_blocked {
        resched::putback(core, tid);
    }
}
