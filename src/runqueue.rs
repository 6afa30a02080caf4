//! Per-CPU run-queue (spec §3 "Run-queue (per CPU)", §2 component 4).
//!
//! One [`RunQueue`] exists per CPU for the process lifetime (spec §3
//! Lifecycle). It aggregates one boxed [`SchedClass`] instance per
//! registered class plus the status flags and cross-CPU signaling state
//! the rescheduler (`resched.rs`) reads and mutates under the global lock.

use alloc::boxed::Box;
use alloc::vec::Vec;

use crate::class::{ClassId, ClassRegistry, SchedClass};
use crate::thread::ThreadId;

/// Logical CPU identifier (teacher precedent: `scheduler/types.rs::CpuId`).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct CpuId(pub u32);

impl CpuId {
    pub const BSP: CpuId = CpuId(0);

    pub fn as_usize(self) -> usize {
        self.0 as usize
    }
}

/// Bitmap of peer CPUs pending a reschedule IPI (spec §3, §5). A `u64`
/// covers [`crate::config::MAX_CPUS`] without a heap allocation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CpuMask(u64);

impl CpuMask {
    pub const fn empty() -> Self {
        Self(0)
    }

    pub const fn from_raw(bits: u64) -> Self {
        Self(bits)
    }

    pub fn insert(&mut self, cpu: CpuId) {
        self.0 |= 1u64 << cpu.as_usize();
    }

    pub fn contains(&self, cpu: CpuId) -> bool {
        self.0 & (1u64 << cpu.as_usize()) != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn clear(&mut self) {
        self.0 = 0;
    }

    pub fn iter(&self) -> impl Iterator<Item = CpuId> + '_ {
        let bits = self.0;
        (0..64u32).filter(move |&b| bits & (1u64 << b) != 0).map(CpuId)
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

bitflags::bitflags! {
    /// Run-queue status flags (spec §3, §4.3).
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct RqStatus: u32 {
        /// A reschedule is pending on this CPU.
        const RESCHED = 1 << 0;
        /// A context switch is currently in flight (unlocked-switch window).
        const INSW    = 1 << 1;
        /// The current thread holds the scheduler lock (`lflags.INLOCK`).
        const INLOCK  = 1 << 2;
        /// A host-kernel tick is waiting to be delivered to root.
        const HTICK   = 1 << 3;
        /// A clock shot reprogram is deferred until root resumes.
        const HDEFER  = 1 << 4;
    }
}

/// Aggregate per-CPU scheduling state (spec §3 "Run-queue (per CPU)").
pub struct RunQueue {
    pub cpu: CpuId,
    /// One boxed class instance per registered [`ClassId`], same index
    /// space as [`ClassRegistry`].
    pub classes: Vec<Box<dyn SchedClass>>,
    /// Currently running thread. Always `Some` once `init` installs the
    /// root thread (spec §3 Lifecycle); `None` only during construction.
    pub current: Option<ThreadId>,
    /// Thread that was running before the most recent switch, used by
    /// `finish_unlocked_switch` (spec §4.3 step 11, §9 "Unlocked switch
    /// window").
    pub last: Option<ThreadId>,
    pub status: RqStatus,
    /// Peer CPUs awaiting a reschedule IPI (spec §4.3 step 3).
    pub resched_mask: CpuMask,
    /// Ticks the current non-root thread has monopolized this CPU
    /// (spec §4.6).
    pub watchdog_ticks: u32,
    /// The idle placeholder thread for this CPU (spec §3: "always present
    /// ... never destroyed before its run-queue").
    pub root: ThreadId,
}

impl RunQueue {
    /// Construct an empty run-queue for `cpu`, instantiating one class
    /// per descriptor in `registry` (spec §4.2 `init(rq)`). The caller
    /// installs `root` afterward via [`crate::Core::init`].
    pub fn new(cpu: CpuId, registry: &ClassRegistry, root: ThreadId) -> Self {
        Self {
            cpu,
            classes: registry.instantiate_all(cpu),
            current: None,
            last: None,
            status: RqStatus::empty(),
            resched_mask: CpuMask::empty(),
            watchdog_ticks: 0,
            root,
        }
    }

    pub fn class(&self, id: ClassId) -> &dyn SchedClass {
        self.classes[id.0].as_ref()
    }

    pub fn class_mut(&mut self, id: ClassId) -> &mut dyn SchedClass {
        self.classes[id.0].as_mut()
    }

    pub fn mark_resched(&mut self) {
        self.status.insert(RqStatus::RESCHED);
    }
}
