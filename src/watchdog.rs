//! Per-CPU watchdog (spec §4.6).
//!
//! Fires at a fixed tick (e.g. 1 Hz, driven by the host integrator's
//! timer backend). Protects the host kernel from starvation by a
//! runaway real-time thread: a pure-kernel offender is kicked and
//! canceled, a thread with a user-space mate gets an asynchronous
//! mayday signal instead (spec §7: "watchdog triggered on CPU #N —
//! runaway thread 'name' (signaled|canceled)").

use crate::boundary::{Boundary, MaydayReason};
use crate::runqueue::{CpuId, RunQueue};
use crate::thread::{Thread, ThreadState};

/// Outcome of a watchdog tick, for logging/testing without coupling the
/// function signature to a concrete boundary implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchdogAction {
    /// No action: current is root, or the threshold was not yet reached.
    None,
    /// The offender was signaled (it has a user-space mate).
    Signaled,
    /// The offender was kicked and canceled (pure kernel thread).
    Canceled,
}

/// Advance the watchdog for one tick on `rq`, given its current thread
/// `current`. Returns the action taken (spec §4.6).
///
/// Boundary: at exactly `threshold_ticks` no action is taken; the tick
/// that pushes the counter *past* the threshold triggers escalation
/// (spec §8 "Watchdog at threshold exactly: no action; at
/// threshold+1: action").
pub fn tick(
    rq: &mut RunQueue,
    current: &mut Thread,
    threshold_ticks: u32,
    boundary: &mut dyn Boundary,
) -> WatchdogAction {
    if current.is_root() {
        rq.watchdog_ticks = 0;
        return WatchdogAction::None;
    }

    rq.watchdog_ticks += 1;
    if rq.watchdog_ticks <= threshold_ticks {
        return WatchdogAction::None;
    }

    let action = if current.state.contains(ThreadState::USER) {
        boundary.shadow_call_mayday(current.id, MaydayReason::Watchdog);
        WatchdogAction::Signaled
    } else {
        current.state.insert(ThreadState::KICKED | ThreadState::CANCELLED);
        WatchdogAction::Canceled
    };

    log::warn!(
        "watchdog triggered on CPU #{} — runaway thread '{}' ({})",
        rq.cpu.as_usize(),
        current.name,
        match action {
            WatchdogAction::Signaled => "signaled",
            WatchdogAction::Canceled => "canceled",
            WatchdogAction::None => unreachable!(),
        }
    );

    rq.watchdog_ticks = 0;
    action
}

pub fn watchdog_cpu_label(cpu: CpuId) -> u32 {
    cpu.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class::ClassId;
    use crate::class::ClassRegistry;
    use crate::classes::IdleClass;
    use crate::thread::{HostTaskRef, ThreadId};

    struct NullBoundary {
        mayday_calls: u32,
    }

    impl crate::boundary::ArchSwitch for NullBoundary {
        fn switch_to(&mut self, _prev: ThreadId, _next: ThreadId) {}
    }
    impl crate::boundary::RootDomainBridge for NullBoundary {
        fn leave_root(&mut self, _t: ThreadId) {}
        fn enter_root(&mut self, _t: ThreadId) {}
        fn shadow_call_mayday(&mut self, _t: ThreadId, _reason: MaydayReason) {
            self.mayday_calls += 1;
        }
        fn complete_domain_migration(&mut self) {}
    }
    impl crate::boundary::TimerOps for NullBoundary {
        fn timer_start(&mut self, _cpu: CpuId, _relative: u64, _period: u64) {}
        fn timer_stop(&mut self, _cpu: CpuId) {}
        fn clock_program_shot(&mut self, _cpu: CpuId) {}
    }
    impl crate::boundary::IpiOps for NullBoundary {
        fn send_resched_ipi(&mut self, _cpus: crate::runqueue::CpuMask) {}
    }

    fn make_rq() -> RunQueue {
        let mut registry = ClassRegistry::new();
        registry.register(IdleClass::descriptor()).unwrap();
        RunQueue::new(CpuId(0), &registry, ThreadId(0))
    }

    #[test]
    fn no_action_at_exact_threshold() {
        let mut rq = make_rq();
        let mut t = Thread::new(ThreadId(1), "hog", HostTaskRef(0), ClassId(0), 50, CpuId(0));
        let mut b = NullBoundary { mayday_calls: 0 };
        for _ in 0..4 {
            assert_eq!(tick(&mut rq, &mut t, 4, &mut b), WatchdogAction::None);
        }
        assert_eq!(rq.watchdog_ticks, 4);
    }

    #[test]
    fn action_at_threshold_plus_one() {
        let mut rq = make_rq();
        let mut t = Thread::new(ThreadId(1), "hog", HostTaskRef(0), ClassId(0), 50, CpuId(0));
        let mut b = NullBoundary { mayday_calls: 0 };
        for _ in 0..4 {
            tick(&mut rq, &mut t, 4, &mut b);
        }
        let action = tick(&mut rq, &mut t, 4, &mut b);
        assert_eq!(action, WatchdogAction::Canceled);
        assert!(t.state.contains(ThreadState::KICKED));
        assert!(t.state.contains(ThreadState::CANCELLED));
        assert_eq!(rq.watchdog_ticks, 0);
    }

    #[test]
    fn user_mate_gets_mayday_not_cancel() {
        let mut rq = make_rq();
        let mut t = Thread::new(ThreadId(1), "mate", HostTaskRef(0), ClassId(0), 50, CpuId(0));
        t.state.insert(ThreadState::USER);
        let mut b = NullBoundary { mayday_calls: 0 };
        for _ in 0..5 {
            tick(&mut rq, &mut t, 4, &mut b);
        }
        assert_eq!(b.mayday_calls, 1);
        assert!(!t.state.contains(ThreadState::CANCELLED));
    }

    #[test]
    fn root_resets_counter() {
        let mut rq = make_rq();
        let mut t = Thread::new(ThreadId(0), "root", HostTaskRef(0), ClassId(0), 0, CpuId(0));
        t.state.insert(ThreadState::ROOT);
        let mut b = NullBoundary { mayday_calls: 0 };
        rq.watchdog_ticks = 3;
        assert_eq!(tick(&mut rq, &mut t, 4, &mut b), WatchdogAction::None);
        assert_eq!(rq.watchdog_ticks, 0);
    }
}
