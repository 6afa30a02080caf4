//! Introspection and statistics (spec §6, supplemented per
//! `SPEC_FULL.md` §B.5 from the original's `vfile_schedlist` reporter).
//!
//! The core has no file-system-like introspection surface of its own
//! (spec §1 lists that out of scope); this module only produces the
//! line format spec §6 specifies, leaving whatever exposes it (a procfs,
//! a debug console, a test) to the host integrator.

use core::fmt::Write as _;

use heapless::String as BoundedString;

use crate::class::{ClassId, ClassRegistry};
use crate::runqueue::CpuId;
use crate::thread::{Thread, ThreadAccounting};

/// Derived per-thread CPU-usage fraction and counters (spec §6
/// "Statistics (optional)").
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadStats {
    pub accounting: ThreadAccounting,
    /// Exec-time ticks attributed to the current accounting period,
    /// supplied by the host integrator's own clock (spec §1: timers are
    /// out of scope for this crate, so this crate keeps no exec-time
    /// total of its own — see `ThreadAccounting`'s doc comment).
    pub period_exec_ticks: u64,
    /// `period_exec_ticks / period_ticks`, as a percent scaled by 1000
    /// (three implied decimal digits) to avoid floating point in a
    /// `no_std` core.
    pub cpu_usage_permille: u32,
}

impl ThreadStats {
    pub fn compute(accounting: ThreadAccounting, period_exec_ticks: u64, period_ticks: u64) -> Self {
        let cpu_usage_permille = if period_ticks == 0 {
            0
        } else {
            ((period_exec_ticks as u128 * 1000) / period_ticks as u128) as u32
        };
        Self {
            accounting,
            period_exec_ticks,
            cpu_usage_permille,
        }
    }
}

/// One introspection line: `CPU PID CLASS PRI TIMEOUT STAT NAME` (spec
/// §6). `pid` is the thread's own id standing in for the host-side
/// notion of "PID" the core does not otherwise track (out of scope per
/// spec §1's personality-layer exclusion); `timeout_ticks` is 0 when the
/// thread has no pending delay.
pub fn format_thread_line(
    cpu: CpuId,
    thread: &Thread,
    registry: &ClassRegistry,
    class: ClassId,
    timeout_ticks: u64,
) -> BoundedString<96> {
    let mut line = BoundedString::new();
    let _ = write!(
        line,
        "{:>3} {:>6} {:<14} {:>4} {:>8} {:<6} {}",
        cpu.0,
        thread.id.0,
        registry.descriptor(class).name,
        thread.cur_prio,
        timeout_ticks,
        stat_string(thread),
        thread.name,
    );
    line
}

fn stat_string(thread: &Thread) -> &'static str {
    use crate::thread::ThreadState;
    if thread.state.contains(ThreadState::ZOMBIE) {
        "Z"
    } else if thread.state.contains(ThreadState::DORMANT) {
        "D"
    } else if thread.state.contains(ThreadState::SUSPENDED) {
        "S"
    } else if thread.state.contains(ThreadState::DELAYED) {
        "delay"
    } else if thread.state.contains(ThreadState::WAITING) {
        "W"
    } else if thread.is_root() {
        "idle"
    } else if thread.is_ready() {
        "R"
    } else {
        "run"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cpu_usage_permille_full_period() {
        let stats = ThreadStats::compute(ThreadAccounting::default(), 500, 1000);
        assert_eq!(stats.cpu_usage_permille, 500);
    }

    #[test]
    fn cpu_usage_permille_zero_period_is_zero() {
        let stats = ThreadStats::compute(ThreadAccounting::default(), 0, 0);
        assert_eq!(stats.cpu_usage_permille, 0);
    }
}
