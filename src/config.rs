//! Compile-time and init-time configuration for the core.
//!
//! This is a `no_std` scheduling core, not a hosted service: there is no
//! configuration file format. What would be a config file elsewhere is a
//! `CoreConfig` value threaded through [`crate::Core::init`], plus a
//! handful of `const` ceilings that size the per-CPU data structures.

/// Upper bound on the priority range any single scheduling class may span.
/// Must be a multiple of [`WORD_BITS`] (the MLQ two-level bit map relies on
/// this to avoid a partial summary word).
pub const LEVELS: usize = 256;

/// Bit width of the words used in the MLQ bit map (§4.1). Rust's
/// `trailing_zeros` on `u64` is the portable stand-in for the `ffnz`
/// bit-scan-forward primitive the original implementation assumes.
pub const WORD_BITS: usize = 64;

/// Bounded length for a thread's human-readable name.
pub const MAX_THREAD_NAME: usize = 31;

/// Maximum number of CPUs the core can manage. Chosen generously for a
/// single-process lifetime arena; see [`crate::runqueue::RunQueueTable`].
pub const MAX_CPUS: usize = 64;

/// Default watchdog threshold, in seconds, before a runaway non-root
/// thread is signaled or canceled (§4.6).
pub const DEFAULT_WATCHDOG_SECONDS: u32 = 4;

/// Default round-robin quantum, in ticks, for threads with `RRB` set.
pub const DEFAULT_RR_PERIOD: u32 = 10;

/// Per-core tuning knobs supplied at [`crate::Core::init`] time.
///
/// Mirrors the way the teacher threads a `ProcessType`/`SchedulerMode`
/// through `SchedulerManager::init` rather than reading a config file —
/// there is nothing to parse this early in boot.
#[derive(Debug, Clone, Copy)]
pub struct CoreConfig {
    /// Ticks before the watchdog escalates against a runaway thread.
    pub watchdog_threshold_ticks: u32,
    /// Round-robin quantum substituted by `set_policy` whenever a caller
    /// declares `SchedParams::RoundRobin` with `rr_period: 0` (the "use
    /// the configured default" sentinel — see `resched::apply_default_rr_period`).
    pub default_rr_period: u32,
    /// Whether the host platform supports releasing the scheduler lock
    /// across the arch context switch (spec §4.3 step 10, §9 "Unlocked
    /// switch window"). When `false`, migrating the currently running
    /// thread falls back to the synchronous `putback` path instead of
    /// deferring to `finish_unlocked_switch`.
    pub unlocked_switch: bool,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            watchdog_threshold_ticks: DEFAULT_WATCHDOG_SECONDS,
            default_rr_period: DEFAULT_RR_PERIOD,
            unlocked_switch: true,
        }
    }
}
