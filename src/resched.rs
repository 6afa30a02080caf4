//! The rescheduler — the central `run()` procedure (spec §4.3) plus the
//! lazy state-change operations of spec §4.4 that must never switch by
//! themselves (`putback`, `set_policy`, `track_policy`).
//!
//! Every public function here assumes the caller already holds the
//! global scheduler lock with interrupts disabled (spec §5); `Core`
//! documents this contract at its own call sites.

use alloc::vec::Vec;

use crate::class::{arena_ctx, ClassId};
use crate::class::SchedParams;
use crate::error::CoreError;
use crate::runqueue::{CpuId, RqStatus};
use crate::thread::{ThreadId, ThreadState};
use crate::{Core, core_assert};

/// Split a `&mut Core` into disjoint field borrows so a class method can
/// be handed an [`crate::class::ArenaCtx`] while the run-queue it lives
/// in is also borrowed mutably.
fn split(core: &mut Core, cpu: CpuId) -> (&mut crate::runqueue::RunQueue, &mut crate::arena::ThreadArena) {
    let idx = cpu.as_usize();
    let Core { runqueues, arena, .. } = core;
    (&mut runqueues[idx], arena)
}

/// Recompute and store `weighted_prio` for `tid` from its current class's
/// weight (spec §3: `weighted_prio = cur_prio + policy.weight`).
fn refresh_weighted_prio(core: &mut Core, tid: ThreadId) {
    let class = core.arena.get(tid).map(|t| t.sched_class);
    if let Some(class) = class {
        let weight = core.registry.descriptor(class).weight;
        if let Some(t) = core.arena.get_mut(tid) {
            t.recompute_weighted_prio(weight);
        }
    }
}

/// `pick_next(rq)` (spec §4.3 step 5). Mutates run-queue/class state:
/// requeues `curr` if it fell out of `READY` while still live, clears
/// `READY` on the chosen thread, and (re)starts or stops the round-robin
/// timer for it.
fn pick_next(core: &mut Core, cpu: CpuId) -> ThreadId {
    let idx = cpu.as_usize();
    let curr = core.runqueues[idx]
        .current
        .expect("run-queue must have a current thread after init");

    let curr_live = core.arena.get(curr).map(|t| t.is_live()).unwrap_or(false);
    if curr_live {
        let curr_locked = core.arena.get(curr).map(|t| t.is_locked()).unwrap_or(false);
        if curr_locked {
            core.runqueues[idx].mark_resched();
            return curr;
        }
        let curr_ready = core.arena.get(curr).map(|t| t.is_ready()).unwrap_or(false);
        if !curr_ready {
            let class_id = core.arena.get(curr).expect("curr thread must exist").sched_class;
            {
                let (rq, arena) = split(core, cpu);
                let mut ctx = arena_ctx(arena);
                rq.class_mut(class_id).requeue(&mut ctx, curr);
            }
            if let Some(t) = core.arena.get_mut(curr) {
                t.state.insert(ThreadState::READY);
            }
        }
    }

    let scan_order: Vec<ClassId> = core.registry.scan_order().collect();
    let mut picked: Option<ThreadId> = None;
    for class_id in scan_order {
        let (rq, arena) = split(core, cpu);
        let mut ctx = arena_ctx(arena);
        if let Some(tid) = rq.class_mut(class_id).pick(&mut ctx) {
            picked = Some(tid);
            break;
        }
    }
    let next = picked.expect("idle class guarantees a runnable thread on a live run-queue (spec §4.2)");

    let (rrb, rr_period) = core
        .arena
        .get_mut(next)
        .map(|t| {
            t.state.remove(ThreadState::READY);
            (t.state.contains(ThreadState::RRB), t.rr_period)
        })
        .unwrap_or((false, 0));
    if rrb {
        core.boundary.timer_start(cpu, rr_period as u64, rr_period as u64);
    } else {
        core.boundary.timer_stop(cpu);
    }

    next
}

/// `run()` (spec §4.3): the central rescheduler. Returns whether a
/// context switch happened.
pub fn run(core: &mut Core, cpu: CpuId) -> bool {
    if core.in_isr {
        // Step 1: null effect inside ISR context (spec §7 `NullISRReschedule`).
        return false;
    }

    let idx = cpu.as_usize();
    let curr = core.runqueues[idx]
        .current
        .expect("run-queue must have a current thread after init");

    // Step 3: latch and clear the pending-resched flag; dispatch IPIs to
    // any peer CPUs queued in `resched_mask`.
    let need_resched = core.runqueues[idx].status.contains(RqStatus::RESCHED);
    core.runqueues[idx].status.remove(RqStatus::RESCHED);
    if !core.runqueues[idx].resched_mask.is_empty() {
        let mask = core.runqueues[idx].resched_mask;
        core::sync::atomic::fence(core::sync::atomic::Ordering::SeqCst);
        core.boundary.send_resched_ipi(mask);
        core.runqueues[idx].resched_mask.clear();
    }

    // Step 4/5: production skips picking when nothing is pending; debug
    // builds always pick as an audit and assert the result would not
    // have differed (spec §9 open question, resolved in `SPEC_FULL.md` §C.2).
    let next = if need_resched {
        pick_next(core, cpu)
    } else if cfg!(debug_assertions) {
        let probe = pick_next(core, cpu);
        core_assert!(
            probe == curr,
            "pick_next selected a different thread while RESCHED was clear on CPU {}",
            idx
        );
        curr
    } else {
        curr
    };

    if next == curr {
        // Step 6: no switch required.
        let curr_is_root = core.arena.get(curr).map(|t| t.is_root()).unwrap_or(false);
        if curr_is_root {
            deliver_pending_host_tick(core, cpu);
        }
        return exit_signals(core, cpu, false);
    }

    switch(core, cpu, curr, next)
}

/// Steps 7–11 of §4.3: perform the actual switch from `prev` to `next`.
fn switch(core: &mut Core, cpu: CpuId, prev: ThreadId, next: ThreadId) -> bool {
    let idx = cpu.as_usize();
    let next_is_root = core.arena.get(next).map(|t| t.is_root()).unwrap_or(false);
    if next_is_root {
        core.runqueues[idx].watchdog_ticks = 0;
    }

    core.runqueues[idx].last = Some(prev);
    core.runqueues[idx].current = Some(next);

    let prev_is_root = core.arena.get(prev).map(|t| t.is_root()).unwrap_or(false);
    let mut shadow = !prev_is_root;
    if prev_is_root {
        core.boundary.leave_root(prev);
        shadow = false;
    } else if next_is_root {
        deliver_pending_host_tick(core, cpu);
        core.boundary.enter_root(next);
    }

    // Step 9: exec-time accounting. "Switch the exec-time counter to
    // `next`" is the host integrator's clock-read, not modeled here (no
    // clock is in scope per spec §1); this crate only keeps the
    // switch/fault counters it can compute without one.
    if let Some(t) = core.arena.get_mut(prev) {
        t.accounting.msw += 1;
    }
    if let Some(t) = core.arena.get_mut(next) {
        t.accounting.csw += 1;
    }

    // Step 10: arch switch. `INSW` brackets the window during which the
    // lock may be released on platforms that support it (spec §4.3,
    // §9 "Unlocked switch window").
    core.runqueues[idx].status.insert(RqStatus::INSW);
    core.boundary.switch_to(prev, next);

    // Step 11: after control returns, this CPU may be running a
    // different thread than `next` (spec §5 "the CPU may be running a
    // different thread and must re-read the current run-queue").
    if shadow {
        core.boundary.complete_domain_migration();
    } else {
        finish_unlocked_switch(core, cpu, prev);
    }

    // Step 12: re-read current; FPU ownership switch is the host
    // integrator's concern once it knows the new `curr` (left to the
    // caller via the boundary, not modeled further — out of scope per
    // spec §1).
    let _curr = core.runqueues[idx].current;

    exit_signals(core, cpu, true)
}

/// `finish_unlocked_switch(rq)` (spec §4.3 step 11, §9): reacquire the
/// lock (the caller already holds it in this synchronous model),
/// re-resolve the current-CPU view, clear `INSW`, and if `prev` migrated
/// while descheduled, place it on its new run-queue and clear `MIGRATE`.
fn finish_unlocked_switch(core: &mut Core, cpu: CpuId, prev: ThreadId) {
    let idx = cpu.as_usize();
    core.runqueues[idx].status.remove(RqStatus::INSW);

    let migrated = core.arena.get(prev).map(|t| t.state.contains(ThreadState::MIGRATE)).unwrap_or(false);
    if migrated {
        let dst_cpu = core.arena.get(prev).expect("prev thread must exist").owning_cpu;
        if let Some(t) = core.arena.get_mut(prev) {
            t.state.remove(ThreadState::MIGRATE);
        }
        putback_on(core, dst_cpu, prev, true);
    }
}

fn deliver_pending_host_tick(core: &mut Core, cpu: CpuId) {
    let idx = cpu.as_usize();
    if core.runqueues[idx].status.contains(RqStatus::HTICK) {
        core.runqueues[idx].status.remove(RqStatus::HTICK);
        // Delivering the host tick itself is the co-scheduling bridge's
        // job (out of scope per spec §1); the core only tracks the flag.
    }
    if core.runqueues[idx].status.contains(RqStatus::HDEFER) {
        core.runqueues[idx].status.remove(RqStatus::HDEFER);
        core.boundary.clock_program_shot(cpu);
    }
}

/// Step 13: propagate `INLOCK`, and if a switch just happened and
/// another resched is already pending, loop once more (spec §4.3
/// rationale: "an unlocked switch window can admit state changes that
/// require another switch before returning to the caller").
fn exit_signals(core: &mut Core, cpu: CpuId, switched: bool) -> bool {
    let idx = cpu.as_usize();
    let curr = core.runqueues[idx].current;
    let curr_locked = curr.and_then(|t| core.arena.get(t)).map(|t| t.lock_depth > 0).unwrap_or(false);
    if curr_locked {
        core.runqueues[idx].status.insert(RqStatus::INLOCK);
    } else {
        core.runqueues[idx].status.remove(RqStatus::INLOCK);
    }

    if switched && core.runqueues[idx].status.contains(RqStatus::RESCHED) {
        return run(core, cpu) || switched;
    }

    switched
}

/// `putback(t)` (spec §4.4): if `READY`, dequeue and re-enqueue at the
/// tail of its class (idempotent on a non-blocked thread, spec §8).
/// Marks the owning run-queue for reschedule.
pub fn putback(core: &mut Core, tid: ThreadId) {
    let cpu = match core.arena.get(tid) {
        Some(t) => t.owning_cpu,
        None => return,
    };
    putback_on(core, cpu, tid, false);
}

fn putback_on(core: &mut Core, cpu: CpuId, tid: ThreadId, passive_insert: bool) {
    let (was_ready, class_id) = match core.arena.get(tid) {
        Some(t) => (t.is_ready(), t.sched_class),
        None => return,
    };
    if was_ready {
        let (rq, arena) = split(core, cpu);
        let mut ctx = arena_ctx(arena);
        rq.class_mut(class_id).dequeue(&mut ctx, tid);
    }
    if was_ready || !passive_insert {
        if let Some(t) = core.arena.get_mut(tid) {
            t.state.insert(ThreadState::READY);
        }
        let (rq, arena) = split(core, cpu);
        let mut ctx = arena_ctx(arena);
        rq.class_mut(class_id).enqueue(&mut ctx, tid);
    }
    core.runqueues[cpu.as_usize()].mark_resched();
}

/// A caller that wants round-robin rotation but has no opinion on the
/// quantum passes `rr_period: 0` as a "use the configured default"
/// sentinel (spec `SPEC_FULL.md` §A: the RR default is overridable via
/// `CoreConfig`, not just a caller-supplied literal).
fn apply_default_rr_period(params: SchedParams, default_rr_period: u32) -> SchedParams {
    match params {
        SchedParams::RoundRobin { prio, rr_period: 0 } => SchedParams::RoundRobin {
            prio,
            rr_period: default_rr_period,
        },
        other => other,
    }
}

/// `set_policy(t, class, params)` (spec §4.4). Atomic on failure
/// (testable property 7, spec §8): nothing is mutated if `declare` fails.
pub fn set_policy(core: &mut Core, tid: ThreadId, class: ClassId, params: SchedParams) -> Result<(), CoreError> {
    let params = apply_default_rr_period(params, core.config.default_rr_period);
    let (old_class, was_ready, is_dormant, cpu) = match core.arena.get(tid) {
        Some(t) => (t.sched_class, t.is_ready(), t.state.contains(ThreadState::DORMANT), t.owning_cpu),
        None => return Err(CoreError::PolicyDeclareFailed(-1)),
    };

    // `declare` first: on failure, nothing else is mutated
    // (`SPEC_FULL.md` §B.3 ordering).
    {
        let (rq, arena) = split(core, cpu);
        let mut ctx = arena_ctx(arena);
        rq.class_mut(class).declare(&mut ctx, tid, params)?;
    }

    if was_ready {
        let (rq, arena) = split(core, cpu);
        let mut ctx = arena_ctx(arena);
        rq.class_mut(old_class).dequeue(&mut ctx, tid);
    }
    if old_class != class {
        let (rq, arena) = split(core, cpu);
        let mut ctx = arena_ctx(arena);
        rq.class_mut(old_class).forget(&mut ctx, tid);
    }

    if let Some(t) = core.arena.get_mut(tid) {
        t.sched_class = class;
        t.base_class = class;
    }
    {
        let (rq, arena) = split(core, cpu);
        let mut ctx = arena_ctx(arena);
        rq.class_mut(class).set_param(&mut ctx, tid, params)?;
    }
    if let Some(t) = core.arena.get_mut(tid) {
        t.base_prio = t.cur_prio;
    }
    refresh_weighted_prio(core, tid);

    if was_ready {
        if let Some(t) = core.arena.get_mut(tid) {
            t.state.insert(ThreadState::READY);
        }
        let (rq, arena) = split(core, cpu);
        let mut ctx = arena_ctx(arena);
        rq.class_mut(class).enqueue(&mut ctx, tid);
    }
    if !is_dormant {
        core.runqueues[cpu.as_usize()].mark_resched();
    }
    Ok(())
}

/// `track_policy(t, target)` (spec §4.4): priority-inheritance hook. If
/// `target == t`, reset to the thread's own base class/priority;
/// otherwise inherit `target`'s class and params. Dequeues/re-enqueues
/// around the change and marks resched.
pub fn track_policy(core: &mut Core, tid: ThreadId, target: ThreadId) {
    let (was_ready, old_class, cpu) = match core.arena.get(tid) {
        Some(t) => (t.is_ready(), t.sched_class, t.owning_cpu),
        None => return,
    };

    if was_ready {
        let (rq, arena) = split(core, cpu);
        let mut ctx = arena_ctx(arena);
        rq.class_mut(old_class).dequeue(&mut ctx, tid);
    }

    if target == tid {
        let (base_class, base_prio) = core
            .arena
            .get(tid)
            .map(|t| (t.base_class, t.base_prio))
            .expect("tid must exist");
        if let Some(t) = core.arena.get_mut(tid) {
            t.sched_class = base_class;
            t.cur_prio = base_prio;
        }
        let (rq, arena) = split(core, cpu);
        let mut ctx = arena_ctx(arena);
        rq.class_mut(base_class).track_prio(&mut ctx, tid, None);
    } else {
        // `get_param` only reads fields through `ctx` (never a class's own
        // ready-queue state), so it is safe to read it through `tid`'s own
        // run-queue even when `target` lives on a different CPU.
        let (target_class, target_params) = {
            let class_id = core.arena.get(target).map(|t| t.sched_class).expect("target must exist");
            let (rq, arena) = split(core, cpu);
            let ctx = arena_ctx(arena);
            (class_id, rq.class(class_id).get_param(&ctx, target))
        };
        if let Some(t) = core.arena.get_mut(tid) {
            t.sched_class = target_class;
        }
        let (rq, arena) = split(core, cpu);
        let mut ctx = arena_ctx(arena);
        rq.class_mut(target_class).track_prio(&mut ctx, tid, Some(target_params));
    }
    refresh_weighted_prio(core, tid);

    if was_ready {
        let new_class = core.arena.get(tid).map(|t| t.sched_class).expect("tid must exist");
        if let Some(t) = core.arena.get_mut(tid) {
            t.state.insert(ThreadState::READY);
        }
        let (rq, arena) = split(core, cpu);
        let mut ctx = arena_ctx(arena);
        rq.class_mut(new_class).enqueue(&mut ctx, tid);
    }
    core.runqueues[cpu.as_usize()].mark_resched();
}
