//! Thread control block view (spec §3 "Thread").
//!
//! This module defines the fields the core mutates. It deliberately does
//! not model anything belonging to the host-side task (memory, file
//! descriptors, signal state) — that's the business of the co-scheduling
//! bridge and the personality layers named out of scope in spec §1.

use core::fmt;

use heapless::String as BoundedString;

use crate::class::ClassId;
use crate::config::MAX_THREAD_NAME;
use crate::runqueue::CpuId;

/// Stable numeric thread identifier, assigned once at creation and never
/// reused for the process lifetime (teacher precedent: `ThreadId` in
/// `scheduler/thread.rs`, extended here with a generation-free design
/// since the arena never frees a slot while a `ThreadId` referencing it
/// could still be outstanding).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ThreadId(pub u64);

impl fmt::Display for ThreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Opaque back-reference to the host-side task. The core never
/// dereferences this; it is handed verbatim to the boundary traits
/// (`RootDomainBridge::shadow_call_mayday`, etc).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HostTaskRef(pub u64);

bitflags::bitflags! {
    /// Thread state bitset (spec §3), split into three disjoint groups by
    /// convention (the bit layout below groups them for readability; the
    /// groups are not separate storage — one bitset holds all of them).
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ThreadState: u32 {
        // --- blocking bits: any set ⇒ not runnable ---
        const SUSPENDED = 1 << 0;
        const DELAYED   = 1 << 1;
        const WAITING   = 1 << 2;
        const DORMANT   = 1 << 3;
        const ZOMBIE    = 1 << 4;

        // --- status bits ---
        const READY     = 1 << 8;
        const ROOT      = 1 << 9;
        const LOCK      = 1 << 10;
        const RRB       = 1 << 11;
        const USER      = 1 << 12;
        const MIGRATE   = 1 << 13;
        const KICKED    = 1 << 14;
        const CANCELLED = 1 << 15;

        // --- accounting bits ---
        const FPU   = 1 << 20;
        const TRACE = 1 << 21;
    }
}

impl ThreadState {
    /// Bits that, if any is set, mean the thread cannot be runnable.
    pub const BLOCK_BITS: ThreadState = ThreadState::SUSPENDED
        .union(ThreadState::DELAYED)
        .union(ThreadState::WAITING)
        .union(ThreadState::DORMANT)
        .union(ThreadState::ZOMBIE);

    /// True if no blocking bit is set.
    pub fn is_unblocked(self) -> bool {
        !self.intersects(Self::BLOCK_BITS)
    }
}

/// Per-thread switch/fault counters (spec §6 "Statistics (optional)"),
/// grounded in the original implementation's `xnstat_exectime`/`msw`/`csw`
/// counters (see `original_source/kernel/cobalt/sched.c`). Wall-clock
/// exec-time totals are deliberately not kept here: computing them needs a
/// clock read at switch-in/switch-out, and the timer subsystem is an
/// external collaborator out of scope for this crate (spec §1) — the host
/// integrator accumulates exec-time from its own clock and hands the
/// per-period total to [`crate::stats::ThreadStats::compute`] directly.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadAccounting {
    /// Primary-mode switches (teacher/original: `msw`).
    pub msw: u64,
    /// Context switches onto this thread (teacher/original: `csw`).
    pub csw: u64,
    /// System calls issued (teacher/original: `xsc`).
    pub xsc: u64,
    /// Page faults taken (teacher/original: `pf`).
    pub pf: u64,
}

/// The thread control block view the core mutates.
#[derive(Debug)]
pub struct Thread {
    pub id: ThreadId,
    pub name: BoundedString<MAX_THREAD_NAME>,
    pub host_task: HostTaskRef,

    /// Current scheduling class (may differ from `base_class` under
    /// priority-inheritance tracking, spec §4.4 `track_policy`).
    pub sched_class: ClassId,
    /// Class the thread was declared into via `set_policy`.
    pub base_class: ClassId,
    /// Scratch field interpreted by the owning class (spec §9: "a single
    /// field within the thread record whose interpretation is defined by
    /// the current class"). Unused by the FIFO-derived classes today;
    /// reserved for a future policy needing per-thread state beyond
    /// `cur_prio`/`rr_period`.
    pub class_scratch: u64,

    pub base_prio: i32,
    pub cur_prio: i32,
    /// `cur_prio + class.weight()`, cached at the points where either
    /// input changes, mirroring the original's `thread->wprio` field.
    pub weighted_prio: i32,

    pub state: ThreadState,
    pub lock_depth: u32,
    pub rr_period: u32,

    /// CPU owning the run-queue this thread currently belongs to.
    pub owning_cpu: CpuId,

    pub accounting: ThreadAccounting,
}

impl Thread {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: ThreadId,
        name: &str,
        host_task: HostTaskRef,
        class: ClassId,
        base_prio: i32,
        owning_cpu: CpuId,
    ) -> Self {
        let mut bounded = BoundedString::new();
        // Truncate silently rather than fail: the name is diagnostic only.
        // Truncate on the last char boundary at or before MAX_THREAD_NAME
        // bytes rather than slicing at a fixed byte offset, which would
        // panic on a multi-byte UTF-8 character straddling the cut.
        let cut = name
            .char_indices()
            .map(|(i, c)| i + c.len_utf8())
            .take_while(|&end| end <= MAX_THREAD_NAME)
            .last()
            .unwrap_or(0);
        let _ = bounded.push_str(&name[..cut]);
        Self {
            id,
            name: bounded,
            host_task,
            sched_class: class,
            base_class: class,
            class_scratch: 0,
            base_prio,
            cur_prio: base_prio,
            weighted_prio: base_prio,
            state: ThreadState::DORMANT,
            lock_depth: 0,
            rr_period: 0,
            owning_cpu,
            accounting: ThreadAccounting::default(),
        }
    }

    /// True iff the thread is neither blocked nor a zombie (spec §4.3 step 5).
    pub fn is_live(&self) -> bool {
        self.state.is_unblocked() && !self.state.contains(ThreadState::ZOMBIE)
    }

    pub fn is_root(&self) -> bool {
        self.state.contains(ThreadState::ROOT)
    }

    pub fn is_ready(&self) -> bool {
        self.state.contains(ThreadState::READY)
    }

    pub fn is_locked(&self) -> bool {
        self.state.contains(ThreadState::LOCK)
    }

    /// Recompute `weighted_prio` from `cur_prio` and the owning class's
    /// weight. Callers must hold the scheduler lock (spec §5).
    pub fn recompute_weighted_prio(&mut self, class_weight: i32) {
        self.weighted_prio = self.cur_prio + class_weight;
    }
}
