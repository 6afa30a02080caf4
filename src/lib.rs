//! Core rescheduling engine of a dual-kernel real-time nucleus (spec §1).
//!
//! This crate is the component that decides which thread runs on each
//! CPU: pluggable scheduling policies under strict priority ordering, a
//! constant-time multi-level priority queue, per-CPU run-queues with
//! cross-CPU migration, lazy rescheduling, and a watchdog that preempts
//! runaway real-time threads. Hardware register save/restore, the
//! host-kernel co-scheduling bridge, timers, and IPI dispatch are
//! external collaborators this crate is generic over (`boundary.rs`) —
//! see spec §1 for the full out-of-scope list.
//!
//! `no_std` + `alloc`: the core runs before any hosted runtime exists
//! (teacher precedent: this is the same constraint the whole kernel
//! crate this was distilled from operates under).

#![no_std]
#![allow(clippy::too_many_arguments)]

extern crate alloc;

pub mod affinity;
pub mod arena;
pub mod boundary;
pub mod class;
pub mod classes;
pub mod config;
pub mod error;
pub mod lock;
pub mod migrate;
pub mod mlq;
pub mod resched;
pub mod runqueue;
pub mod stats;
pub mod thread;
pub mod watchdog;

use alloc::boxed::Box;
use alloc::vec::Vec;

use affinity::AffinityPolicy;
use arena::ThreadArena;
use boundary::Boundary;
use class::{ClassDescriptor, ClassId, ClassRegistry, SchedParams};
use config::CoreConfig;
use error::CoreError;
use runqueue::{CpuId, CpuMask, RunQueue};
use thread::{HostTaskRef, Thread, ThreadId, ThreadState};
use watchdog::WatchdogAction;

/// The top-level singleton wiring together the class registry, the
/// thread arena, and one run-queue per CPU (spec §9 "Global state ...
/// initialized in a fixed order: classes → per-CPU queues → root
/// threads → watchdog").
///
/// Teacher precedent: `SchedulerManager`/`ThreadManager` in
/// `scheduler/scheduler_manager.rs` play the same "one struct owns every
/// scheduling singleton" role; that crate wraps its manager singletons
/// directly, while the host integrator here is expected to wrap `Core`
/// in a `spin::Mutex` (the spec §5 "nklock") and hold it with interrupts
/// disabled across every call — this crate does not assume a concrete
/// arch, so it cannot disable interrupts itself.
pub struct Core {
    pub registry: ClassRegistry,
    pub arena: ThreadArena,
    pub runqueues: Vec<RunQueue>,
    pub affinity: AffinityPolicy,
    pub boundary: Box<dyn Boundary>,
    pub config: CoreConfig,
    /// Set by the host integrator's ISR entry/exit glue around the
    /// window where the core has not yet demoted to thread context
    /// (spec §4.3 step 1).
    in_isr: bool,
}

impl Core {
    /// Register the five scheduling classes in ascending-weight order
    /// (spec §4.2): idle, weak, time-partition, sporadic, realtime.
    fn register_default_classes(registry: &mut ClassRegistry) {
        let descriptors: [ClassDescriptor; 5] = [
            classes::IdleClass::descriptor(),
            classes::WeakClass::descriptor(),
            classes::TpClass::descriptor(),
            classes::SporadicClass::descriptor(),
            classes::RtClass::descriptor(),
        ];
        for descriptor in descriptors {
            registry
                .register(descriptor)
                .expect("default class set must satisfy ascending-weight registration order");
        }
    }

    /// `init(cpu) → rq` (spec §6), generalized here to build the whole
    /// multi-CPU `Core` in one call rather than one run-queue at a time,
    /// since the registry and affinity policy are process-wide
    /// singletons shared by every CPU.
    ///
    /// Creates one run-queue per CPU in `online`, installs a root thread
    /// in the idle class at the lowest policy priority on each, and
    /// arms the caller's boundary for the round-robin and watchdog
    /// timers (left to the host integrator to actually schedule — this
    /// call only starts the watchdog's logical countdown at zero).
    pub fn init(online: CpuMask, realtime_capable: CpuMask, boundary: Box<dyn Boundary>, config: CoreConfig) -> Self {
        let mut registry = ClassRegistry::new();
        Self::register_default_classes(&mut registry);

        let mut arena = ThreadArena::new();
        let mut runqueues = Vec::new();

        for cpu in online.iter() {
            let root_id = arena.alloc_id();
            let mut root = Thread::new(root_id, "root", HostTaskRef(0), ClassId(0), 0, cpu);
            root.state = ThreadState::ROOT | ThreadState::READY;
            arena.insert(root);

            let mut rq = RunQueue::new(cpu, &registry, root_id);
            {
                let idle_id = registry.find_by_name("idle").expect("idle class must be registered");
                let mut view = class::arena_ctx(&mut arena);
                rq.class_mut(idle_id)
                    .declare(&mut view, root_id, SchedParams::Idle)
                    .expect("idle class must accept the root thread");
            }
            rq.current = Some(root_id);
            runqueues.push(rq);
        }

        Self {
            registry,
            arena,
            runqueues,
            affinity: AffinityPolicy::new(realtime_capable, online),
            boundary,
            config,
            in_isr: false,
        }
    }

    fn rq_mut(&mut self, cpu: CpuId) -> &mut RunQueue {
        &mut self.runqueues[cpu.as_usize()]
    }

    /// `run()` (spec §4.3): the rescheduler. Returns whether a context
    /// switch happened.
    pub fn run(&mut self, cpu: CpuId) -> bool {
        resched::run(self, cpu)
    }

    /// Marks the caller as having entered interrupt-handler context that
    /// has not yet demoted to a thread stack (spec §4.3 step 1). `run()`
    /// is a no-op while this is set.
    pub fn enter_isr(&mut self) {
        self.in_isr = true;
    }

    pub fn leave_isr(&mut self) {
        self.in_isr = false;
    }

    /// `set_policy(t, class, params)` (spec §4.4).
    pub fn set_policy(&mut self, tid: ThreadId, class: ClassId, params: SchedParams) -> Result<(), CoreError> {
        resched::set_policy(self, tid, class, params)
    }

    /// `track_policy(t, target)` (spec §4.4).
    pub fn track_policy(&mut self, tid: ThreadId, target: ThreadId) {
        resched::track_policy(self, tid, target)
    }

    /// `migrate(t, dst_rq)` (spec §4.4, §6).
    pub fn migrate(&mut self, tid: ThreadId, dst_cpu: CpuId) {
        migrate::migrate(self, tid, dst_cpu)
    }

    /// `migrate_passive(t, dst_rq)` (spec §4.4, §6).
    pub fn migrate_passive(&mut self, tid: ThreadId, dst_cpu: CpuId) {
        migrate::migrate_passive(self, tid, dst_cpu)
    }

    /// `putback(t)` (spec §4.4).
    pub fn putback(&mut self, tid: ThreadId) {
        resched::putback(self, tid)
    }

    /// `lock()` (spec §4.5): pin `tid` against involuntary preemption on
    /// its own CPU.
    pub fn lock(&mut self, tid: ThreadId) {
        let cpu = match self.arena.get(tid) {
            Some(t) => t.owning_cpu,
            None => return,
        };
        if let Some(t) = self.arena.get_mut(tid) {
            lock::lock(t);
        }
        if self.arena.get(tid).map(|t| t.is_locked()).unwrap_or(false) {
            self.rq_mut(cpu).status.insert(runqueue::RqStatus::INLOCK);
        }
    }

    /// `unlock()` (spec §4.5): on the final nested release, triggers the
    /// rescheduler.
    pub fn unlock(&mut self, tid: ThreadId) -> bool {
        let cpu = match self.arena.get(tid) {
            Some(t) => t.owning_cpu,
            None => return false,
        };
        let fully_released = self.arena.get_mut(tid).map(lock::unlock).unwrap_or(false);
        if fully_released {
            self.rq_mut(cpu).status.remove(runqueue::RqStatus::INLOCK);
            self.run(cpu)
        } else {
            false
        }
    }

    /// `unlock_fully()` (spec §4.5): forces the lock depth to zero
    /// regardless of nesting, then always reschedules.
    pub fn unlock_fully(&mut self, tid: ThreadId) -> bool {
        let cpu = match self.arena.get(tid) {
            Some(t) => t.owning_cpu,
            None => return false,
        };
        if let Some(t) = self.arena.get_mut(tid) {
            lock::unlock_fully(t);
        }
        self.rq_mut(cpu).status.remove(runqueue::RqStatus::INLOCK);
        self.run(cpu)
    }

    /// `tick(rq)` (spec §6): called from the round-robin timer.
    /// Delegates to the current thread's class to decide whether to
    /// rotate it to the back of its priority bucket, and separately
    /// advances the watchdog.
    pub fn tick(&mut self, cpu: CpuId) {
        let idx = cpu.as_usize();
        let current = match self.runqueues[idx].current {
            Some(tid) => tid,
            None => return,
        };

        let class_id = self.arena.get(current).map(|t| t.sched_class);
        if let Some(class_id) = class_id {
            let rotate = {
                let Core { runqueues, arena, .. } = self;
                let rq = &mut runqueues[idx];
                let mut ctx = class::arena_ctx(arena);
                rq.class_mut(class_id).on_tick(&mut ctx, current)
            };
            if rotate {
                self.rq_mut(cpu).mark_resched();
            }
        }

        let threshold = self.config.watchdog_threshold_ticks;
        if let Some(thread) = self.arena.get_mut(current) {
            let Core { runqueues, boundary, .. } = self;
            let _: WatchdogAction = watchdog::tick(&mut runqueues[idx], thread, threshold, boundary.as_mut());
        }
    }

    /// Read the global real-time affinity mask (spec §6 "Configuration").
    pub fn affinity_mask(&self) -> CpuMask {
        self.affinity.mask()
    }

    /// Write the global real-time affinity mask (spec §6, §7
    /// `AffinityInvalid`).
    pub fn set_affinity_mask(&mut self, mask: CpuMask) -> Result<(), CoreError> {
        self.affinity.set_mask(mask)
    }

    /// Allocate and install a new thread, declared into `class` with
    /// `params` (composition of `ThreadArena::alloc_id`/`insert` and
    /// `set_policy`, exposed as one call for callers outside this crate
    /// that have no other way to reach the arena).
    pub fn spawn(
        &mut self,
        name: &str,
        host_task: HostTaskRef,
        cpu: CpuId,
        class: ClassId,
        params: SchedParams,
    ) -> Result<ThreadId, CoreError> {
        let id = self.arena.alloc_id();
        let thread = Thread::new(id, name, host_task, class, 0, cpu);
        self.arena.insert(thread);
        match self.set_policy(id, class, params) {
            Ok(()) => Ok(id),
            Err(e) => {
                self.arena.remove(id);
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boundary::{ArchSwitch, IpiOps, MaydayReason, RootDomainBridge, TimerOps};
    use crate::runqueue::RqStatus;

    #[derive(Default)]
    struct TestBoundary {
        timer_armed: alloc::collections::BTreeMap<u32, (u64, u64)>,
    }

    impl ArchSwitch for TestBoundary {
        fn switch_to(&mut self, _prev: ThreadId, _next: ThreadId) {}
    }
    impl RootDomainBridge for TestBoundary {
        fn leave_root(&mut self, _t: ThreadId) {}
        fn enter_root(&mut self, _t: ThreadId) {}
        fn shadow_call_mayday(&mut self, _t: ThreadId, _reason: MaydayReason) {}
        fn complete_domain_migration(&mut self) {}
    }
    impl TimerOps for TestBoundary {
        fn timer_start(&mut self, cpu: CpuId, relative: u64, period: u64) {
            self.timer_armed.insert(cpu.0, (relative, period));
        }
        fn timer_stop(&mut self, cpu: CpuId) {
            self.timer_armed.remove(&cpu.0);
        }
        fn clock_program_shot(&mut self, _cpu: CpuId) {}
    }
    impl IpiOps for TestBoundary {
        fn send_resched_ipi(&mut self, _cpus: CpuMask) {}
    }

    fn one_cpu_core() -> Core {
        let mut mask = CpuMask::empty();
        mask.insert(CpuId(0));
        Core::init(mask, mask, Box::new(TestBoundary::default()), CoreConfig::default())
    }

    fn two_cpu_core() -> Core {
        let mut mask = CpuMask::empty();
        mask.insert(CpuId(0));
        mask.insert(CpuId(1));
        Core::init(mask, mask, Box::new(TestBoundary::default()), CoreConfig::default())
    }

    /// Spawn a runnable (non-dormant, enqueued) RT thread. Waking a thread
    /// up is outside this crate's scope (spec §1); tests drive it directly.
    fn spawn_ready(core: &mut Core, name: &str, cpu: CpuId, prio: i32) -> ThreadId {
        let rt = core.registry.find_by_name("realtime").unwrap();
        let tid = core
            .spawn(name, HostTaskRef(0), cpu, rt, SchedParams::Fifo { prio })
            .unwrap();
        core.arena.get_mut(tid).unwrap().state.remove(ThreadState::DORMANT);
        core.putback(tid);
        tid
    }

    #[test]
    fn s1_rt_priority_preemption() {
        let mut core = one_cpu_core();
        let cpu = CpuId(0);
        let a = spawn_ready(&mut core, "A", cpu, 10);
        let b = spawn_ready(&mut core, "B", cpu, 20);
        let c = spawn_ready(&mut core, "C", cpu, 30);

        assert!(core.run(cpu));
        assert_eq!(core.runqueues[0].current, Some(c));

        core.set_policy(b, core.arena.get(b).unwrap().sched_class, SchedParams::Fifo { prio: 40 })
            .unwrap();
        assert!(core.run(cpu));
        assert_eq!(core.runqueues[0].current, Some(b));

        let _ = a;
    }

    #[test]
    fn s2_round_robin_rotation() {
        let mut core = one_cpu_core();
        let cpu = CpuId(0);
        let rt = core.registry.find_by_name("realtime").unwrap();

        let a = core.spawn("A", HostTaskRef(0), cpu, rt, SchedParams::RoundRobin { prio: 50, rr_period: 1 }).unwrap();
        core.arena.get_mut(a).unwrap().state.remove(ThreadState::DORMANT);
        core.putback(a);
        let d = core.spawn("D", HostTaskRef(0), cpu, rt, SchedParams::RoundRobin { prio: 50, rr_period: 1 }).unwrap();
        core.arena.get_mut(d).unwrap().state.remove(ThreadState::DORMANT);
        core.putback(d);

        assert!(core.run(cpu));
        assert_eq!(core.runqueues[0].current, Some(a));
        assert!(core.arena.get(a).unwrap().state.contains(ThreadState::RRB));

        core.tick(cpu);
        assert!(core.run(cpu));
        assert_eq!(core.runqueues[0].current, Some(d));

        core.tick(cpu);
        assert!(core.run(cpu));
        assert_eq!(core.runqueues[0].current, Some(a));
    }

    #[test]
    fn s3_lock_hold_defers_then_switches_on_unlock() {
        let mut core = one_cpu_core();
        let cpu = CpuId(0);
        let t = spawn_ready(&mut core, "T", cpu, 50);
        assert!(core.run(cpu));
        assert_eq!(core.runqueues[0].current, Some(t));

        core.lock(t);
        let u = spawn_ready(&mut core, "U", cpu, 90);

        assert!(!core.run(cpu));
        assert_eq!(core.runqueues[0].current, Some(t));
        assert!(core.runqueues[0].status.contains(RqStatus::RESCHED));

        assert!(core.unlock(t));
        assert_eq!(core.runqueues[0].current, Some(u));
    }

    #[test]
    fn s4_migration_while_running() {
        let mut core = two_cpu_core();
        let cpu0 = CpuId(0);
        let cpu1 = CpuId(1);
        let t = spawn_ready(&mut core, "T", cpu0, 50);
        assert!(core.run(cpu0));
        assert_eq!(core.runqueues[0].current, Some(t));

        core.migrate(t, cpu1);
        assert!(core.arena.get(t).unwrap().state.contains(ThreadState::MIGRATE));

        assert!(core.run(cpu0));
        let root0 = core.runqueues[0].root;
        assert_eq!(core.runqueues[0].current, Some(root0));

        assert!(!core.arena.get(t).unwrap().state.contains(ThreadState::MIGRATE));
        assert_eq!(core.arena.get(t).unwrap().owning_cpu, cpu1);
        assert!(core.run(cpu1));
        assert_eq!(core.runqueues[1].current, Some(t));
    }

    /// `migrate` rejects a destination CPU excluded by the global
    /// real-time affinity mask, leaving the thread exactly where it was
    /// (spec §4.7).
    #[test]
    fn migrate_rejects_cpu_outside_affinity_mask() {
        let mut core = two_cpu_core();
        let cpu0 = CpuId(0);
        let cpu1 = CpuId(1);
        let mut rt_only_cpu0 = CpuMask::empty();
        rt_only_cpu0.insert(cpu0);
        core.set_affinity_mask(rt_only_cpu0).unwrap();

        let t = spawn_ready(&mut core, "T", cpu0, 50);
        core.migrate(t, cpu1);

        assert_eq!(core.arena.get(t).unwrap().owning_cpu, cpu0);
        assert!(!core.arena.get(t).unwrap().state.contains(ThreadState::MIGRATE));
        assert!(core.arena.get(t).unwrap().is_ready());
    }

    #[test]
    fn s6_policy_change_failure_is_atomic() {
        let mut core = one_cpu_core();
        let cpu = CpuId(0);
        let t = spawn_ready(&mut core, "T", cpu, 50);
        let before_class = core.arena.get(t).unwrap().sched_class;
        let before_prio = core.arena.get(t).unwrap().cur_prio;
        let before_ready = core.arena.get(t).unwrap().is_ready();

        let sporadic = core.registry.find_by_name("sporadic").unwrap();
        let err = core.set_policy(t, sporadic, SchedParams::Fifo { prio: 9999 });
        assert!(err.is_err());

        let after = core.arena.get(t).unwrap();
        assert_eq!(after.sched_class, before_class);
        assert_eq!(after.cur_prio, before_prio);
        assert_eq!(after.is_ready(), before_ready);
    }

    /// `track_policy(t, t)` restores the base class and priority even
    /// after an inheritance chain (spec §8 round-trip property).
    #[test]
    fn track_policy_self_resets_after_inheritance_chain() {
        let mut core = one_cpu_core();
        let cpu = CpuId(0);
        let donor_a = spawn_ready(&mut core, "donor-a", cpu, 70);
        let donor_b = spawn_ready(&mut core, "donor-b", cpu, 90);
        let t = spawn_ready(&mut core, "T", cpu, 20);

        let base_class = core.arena.get(t).unwrap().base_class;
        let base_prio = core.arena.get(t).unwrap().base_prio;

        core.track_policy(t, donor_a);
        assert_eq!(core.arena.get(t).unwrap().cur_prio, 70);
        core.track_policy(t, donor_b);
        assert_eq!(core.arena.get(t).unwrap().cur_prio, 90);

        core.track_policy(t, t);
        let after = core.arena.get(t).unwrap();
        assert_eq!(after.sched_class, base_class);
        assert_eq!(after.cur_prio, base_prio);
    }

    /// Migration preserves FIFO order relative to the destination queue's
    /// existing priority peers (spec §8 testable property 8). Inspected
    /// directly at the class-queue level so the assertion isn't entangled
    /// with `pick_next`'s separate head-requeue semantics for a thread
    /// that falls out of `READY` while still current.
    #[test]
    fn migration_preserves_destination_fifo_order() {
        let mut core = two_cpu_core();
        let cpu0 = CpuId(0);
        let cpu1 = CpuId(1);

        let resident = spawn_ready(&mut core, "resident", cpu1, 50);
        let mover = spawn_ready(&mut core, "mover", cpu0, 50);

        core.migrate_passive(mover, cpu1);
        assert_eq!(core.arena.get(mover).unwrap().owning_cpu, cpu1);

        let rt = core.registry.find_by_name("realtime").unwrap();
        let idx = cpu1.as_usize();
        let Core { runqueues, arena, .. } = &mut core;
        let rq = &mut runqueues[idx];
        let mut ctx = class::arena_ctx(arena);
        assert_eq!(rq.class_mut(rt).pick(&mut ctx), Some(resident));
        assert_eq!(rq.class_mut(rt).pick(&mut ctx), Some(mover));
    }
}
