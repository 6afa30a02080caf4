//! External-interface contracts (spec §6 "Core-to-external contracts").
//!
//! Everything in this module is a trait a host integrator implements; the
//! core never assumes a concrete arch, root-domain bridge, timer, or IPI
//! backend (spec §1 lists these as out-of-scope external collaborators).
//! Teacher precedent: `Box<dyn Scheduler>` in `scheduler/sched_core.rs`
//! holds policy behind a trait object the same way `Core` holds these
//! four behind one `Box<dyn Boundary>`.

use crate::runqueue::{CpuId, CpuMask};
use crate::thread::ThreadId;

/// Reason a watchdog (or other internal caller) delivers a mayday signal
/// (spec §4.6, §7 "runaway thread ... (signaled|canceled)").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaydayReason {
    Watchdog,
}

/// `switch_to(prev, next)` (spec §6): saves `prev`'s CPU state, restores
/// `next`'s. Upon return the caller's stack may belong to a different
/// thread than the one that entered the call.
pub trait ArchSwitch {
    fn switch_to(&mut self, prev: ThreadId, next: ThreadId);
}

/// Root-domain bridge hooks (spec §6): mute/unmute the interrupt
/// pipeline for the host kernel, swap MM context, and deliver
/// asynchronous signals to a thread's user-space mate.
pub trait RootDomainBridge {
    /// Capture the host task pointer and MM context, mute the interrupt
    /// pipeline for root, invoke the arch leave-root hook (spec §4.3
    /// step 8).
    fn leave_root(&mut self, t: ThreadId);
    /// Inverse of `leave_root`, invoked when `next.ROOT` (spec §4.3
    /// step 8).
    fn enter_root(&mut self, t: ThreadId);
    /// Deliver an asynchronous "mayday" signal to `t`'s user-space mate
    /// (spec §4.6, §6).
    fn shadow_call_mayday(&mut self, t: ThreadId, reason: MaydayReason);
    /// Finalize a domain switch after the arch switch returns on the
    /// host side (spec §4.3 step 11 "shadow epilogue").
    fn complete_domain_migration(&mut self);
}

/// Timer backend (spec §6): round-robin quantum timer and the host
/// clock-shot reprogram, scoped per run-queue.
pub trait TimerOps {
    fn timer_start(&mut self, cpu: CpuId, relative: u64, period: u64);
    fn timer_stop(&mut self, cpu: CpuId);
    fn clock_program_shot(&mut self, cpu: CpuId);
}

/// Cross-CPU reschedule signaling (spec §6, §4.3 step 3).
pub trait IpiOps {
    fn send_resched_ipi(&mut self, cpus: CpuMask);
}

/// Bundles the four boundary contracts into the single object `Core`
/// holds. A host integrator implements `ArchSwitch`, `RootDomainBridge`,
/// `TimerOps`, and `IpiOps` on one type; the blanket impl below makes it
/// a `Boundary` automatically.
pub trait Boundary: ArchSwitch + RootDomainBridge + TimerOps + IpiOps {}

impl<T: ArchSwitch + RootDomainBridge + TimerOps + IpiOps> Boundary for T {}
