//! Scheduling-class registry and the policy/mechanism boundary (spec §4.2).
//!
//! Grounded in the teacher's `scheduler/traits.rs`: `Scheduler` (policy)
//! and `KernelSchedCtx` (mechanism) there play exactly the role `SchedClass`
//! and `ClassCtx` play here — a capability-record boundary so that
//! scheduling classes never touch `Thread` fields directly, only what the
//! context exposes. The teacher holds a single swappable `Box<dyn
//! Scheduler>`; this crate needs several simultaneously active classes
//! scanned in weight order, so `SchedulerCore`'s one-policy slot becomes an
//! ordered `ClassRegistry` of many.

use alloc::boxed::Box;
use alloc::vec::Vec;

use crate::arena::ThreadArena;
use crate::error::CoreError;
use crate::runqueue::CpuId;
use crate::thread::ThreadId;

/// Index into a [`ClassRegistry`]; stable for the process lifetime once
/// registration completes (spec §4.2: "the table is immutable after
/// registration", spec §9).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClassId(pub usize);

/// Policy inputs a scheduling class accepts via `declare`/`set_param`.
///
/// Per-policy internals beyond what the core requires from a class are
/// out of scope (spec §1); these variants carry just enough to exercise
/// each class's priority range and, for the two timer-driven classes, a
/// round-robin quantum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedParams {
    /// The idle class takes no parameters; its one thread is the root.
    Idle,
    /// Plain fixed-priority FIFO.
    Fifo { prio: i32 },
    /// Fixed-priority, round-robin within a priority level.
    RoundRobin { prio: i32, rr_period: u32 },
}

/// The capability boundary a [`SchedClass`] implementation is given
/// instead of direct `Thread` access (teacher precedent: `KernelSchedCtx`
/// in `scheduler/traits.rs`).
pub trait ClassCtx {
    fn cur_prio(&self, tid: ThreadId) -> i32;
    fn set_cur_prio(&mut self, tid: ThreadId, prio: i32);
    fn scratch(&self, tid: ThreadId) -> u64;
    fn set_scratch(&mut self, tid: ThreadId, value: u64);
    /// Arm or disarm round-robin rotation for `tid` (spec §3 `RRB`, §6
    /// `tick`). `period` is the quantum in ticks; ignored when `rrb` is
    /// `false`.
    fn set_round_robin(&mut self, tid: ThreadId, rrb: bool, period: u32);
    fn log(&self, level: log::Level, message: &str);
}

/// The one [`ClassCtx`] implementation used everywhere in this crate: a
/// thin view over the [`ThreadArena`] (`resched.rs`, `migrate.rs`,
/// `lib.rs` all construct one of these rather than touching `Thread`
/// fields directly from outside `thread.rs`).
pub struct ArenaCtx<'a> {
    arena: &'a mut ThreadArena,
}

impl<'a> ArenaCtx<'a> {
    pub fn new(arena: &'a mut ThreadArena) -> Self {
        Self { arena }
    }
}

/// Borrow `arena` as a [`ClassCtx`] for the duration of one class call.
pub fn arena_ctx(arena: &mut ThreadArena) -> ArenaCtx<'_> {
    ArenaCtx::new(arena)
}

impl<'a> ClassCtx for ArenaCtx<'a> {
    fn cur_prio(&self, tid: ThreadId) -> i32 {
        self.arena.get(tid).map(|t| t.cur_prio).unwrap_or(0)
    }

    fn set_cur_prio(&mut self, tid: ThreadId, prio: i32) {
        if let Some(t) = self.arena.get_mut(tid) {
            t.cur_prio = prio;
        }
    }

    fn scratch(&self, tid: ThreadId) -> u64 {
        self.arena.get(tid).map(|t| t.class_scratch).unwrap_or(0)
    }

    fn set_scratch(&mut self, tid: ThreadId, value: u64) {
        if let Some(t) = self.arena.get_mut(tid) {
            t.class_scratch = value;
        }
    }

    fn set_round_robin(&mut self, tid: ThreadId, rrb: bool, period: u32) {
        if let Some(t) = self.arena.get_mut(tid) {
            if rrb {
                t.state.insert(crate::thread::ThreadState::RRB);
                t.rr_period = period;
            } else {
                t.state.remove(crate::thread::ThreadState::RRB);
                t.rr_period = 0;
            }
        }
    }

    fn log(&self, level: log::Level, message: &str) {
        log::log!(level, "{}", message);
    }
}

/// A scheduling-class plug-in (spec §4.2).
///
/// One boxed instance exists per run-queue (per CPU) — classes carry
/// per-CPU ready-queue state, not global state, the way the teacher's
/// `RoundRobinPolicy` owns its own `VecDeque` rather than sharing one
/// across cores.
pub trait SchedClass: Send {
    /// Compile-time-constant weight, strictly larger than any priority
    /// value within the class (spec §4.2).
    fn weight(&self) -> i32;
    fn name(&self) -> &'static str;
    fn lo_prio(&self) -> i32;
    fn hi_prio(&self) -> i32;

    /// Optional per-run-queue setup, called once when the run-queue for
    /// `cpu` is constructed.
    fn init(&mut self, cpu: CpuId) {
        let _ = cpu;
    }

    /// Highest-priority ready thread for this class on this CPU, or
    /// `None`. Never called without first removing the outgoing thread —
    /// see `resched::run`.
    fn pick(&mut self, ctx: &mut dyn ClassCtx) -> Option<ThreadId>;

    fn enqueue(&mut self, ctx: &mut dyn ClassCtx, tid: ThreadId);
    fn dequeue(&mut self, ctx: &mut dyn ClassCtx, tid: ThreadId);
    /// Reinsert at the head of its priority bucket (spec §4.1 `add_head`):
    /// "requeue without losing slot", used when a higher class preempts
    /// a thread that was already running but not yet re-marked `READY`.
    fn requeue(&mut self, ctx: &mut dyn ClassCtx, tid: ThreadId);

    /// Validate and accept membership; may fail without mutating
    /// anything the caller can observe (spec §4.4 `set_policy`).
    fn declare(&mut self, ctx: &mut dyn ClassCtx, tid: ThreadId, params: SchedParams) -> Result<(), CoreError>;
    /// Release any resources `declare` reserved for `tid`.
    fn forget(&mut self, ctx: &mut dyn ClassCtx, tid: ThreadId);

    /// Read/write policy inputs. `set_param` recomputes `cur_prio`
    /// (the core recomputes `weighted_prio` afterward from `weight()`).
    fn set_param(&mut self, ctx: &mut dyn ClassCtx, tid: ThreadId, params: SchedParams) -> Result<(), CoreError>;
    fn get_param(&self, ctx: &dyn ClassCtx, tid: ThreadId) -> SchedParams;

    /// Priority-inheritance hook. `params = None` resets to the class's
    /// notion of the thread's base priority.
    fn track_prio(&mut self, ctx: &mut dyn ClassCtx, tid: ThreadId, params: Option<SchedParams>);

    /// Per-class migration fix-up. May return a different `ClassId` to
    /// reassign the thread's class as a side effect (spec §4.2: "MAY
    /// switch the thread to a different class", e.g. weak↔strong).
    fn migrate(&mut self, ctx: &mut dyn ClassCtx, tid: ThreadId, dst_cpu: CpuId) -> Option<ClassId> {
        let _ = (ctx, tid, dst_cpu);
        None
    }

    /// Round-robin tick hook (spec §6 `tick`): return `true` if the
    /// thread at `tid` should be rotated to the back of its priority
    /// bucket. Classes without RR support simply return `false`.
    fn on_tick(&mut self, ctx: &mut dyn ClassCtx, tid: ThreadId) -> bool {
        let _ = (ctx, tid);
        false
    }
}

/// A registration-time descriptor: weight, display name, and a factory
/// producing one fresh per-run-queue instance (teacher precedent: the
/// `Box<dyn Scheduler>` constructed once in `SchedulerManager::init`,
/// generalized here to "once per CPU, for each of several classes").
pub struct ClassDescriptor {
    pub weight: i32,
    pub name: &'static str,
    pub lo_prio: i32,
    pub hi_prio: i32,
    pub make: fn() -> Box<dyn SchedClass>,
}

/// Ordered list of scheduling-class descriptors, registered once at init
/// in strict ascending weight order (spec §4.2).
#[derive(Default)]
pub struct ClassRegistry {
    descriptors: Vec<ClassDescriptor>,
}

impl ClassRegistry {
    pub const fn new() -> Self {
        Self {
            descriptors: Vec::new(),
        }
    }

    /// Register a class. Rejects an out-of-order install (weight must be
    /// strictly greater than the previously registered class's weight)
    /// and rejects a weight that does not exceed the class's own maximum
    /// priority value, which would make `weighted_prio` ambiguous across
    /// classes (spec §4.2, resolved in `SPEC_FULL.md` §C.3).
    pub fn register(&mut self, descriptor: ClassDescriptor) -> Result<(), &'static str> {
        if descriptor.weight <= descriptor.hi_prio {
            return Err("class weight must exceed its own maximum priority");
        }
        if let Some(prev) = self.descriptors.last() {
            if descriptor.weight <= prev.weight {
                return Err("scheduling classes must register in strictly ascending weight order");
            }
            // Weighted ranges must not overlap, or cross-class priority
            // comparisons would be ambiguous.
            let prev_max = prev.weight + prev.hi_prio;
            let this_min = descriptor.weight + descriptor.lo_prio;
            if this_min <= prev_max {
                return Err("class weighted-priority range overlaps the previous class");
            }
        }
        self.descriptors.push(descriptor);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    pub fn descriptor(&self, id: ClassId) -> &ClassDescriptor {
        &self.descriptors[id.0]
    }

    /// Instantiate one boxed class per registered descriptor, in
    /// registration (ascending-weight) order — used once per run-queue.
    pub fn instantiate_all(&self, cpu: CpuId) -> Vec<Box<dyn SchedClass>> {
        self.descriptors
            .iter()
            .map(|d| {
                let mut class = (d.make)();
                class.init(cpu);
                class
            })
            .collect()
    }

    /// Class ids in descending-weight (highest priority class first)
    /// scan order, the order `pick` iterates (spec §4.2).
    pub fn scan_order(&self) -> impl Iterator<Item = ClassId> {
        (0..self.descriptors.len()).rev().map(ClassId)
    }

    pub fn find_by_name(&self, name: &str) -> Option<ClassId> {
        self.descriptors
            .iter()
            .position(|d| d.name == name)
            .map(ClassId)
    }
}
