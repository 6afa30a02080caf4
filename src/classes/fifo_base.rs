//! Shared fixed-priority FIFO implementation backing the `weak`,
//! `time-partition`, `sporadic`, and `realtime` classes.
//!
//! Teacher precedent: `RoundRobinPolicy` in
//! `scheduler/policies/round_robin.rs` owns one `VecDeque<ThreadId>` and
//! implements `Scheduler` directly. Here the same shape is lifted one
//! level so four of the five scheduling classes share it instead of
//! reimplementing bucket bookkeeping four times — only `idle` (always
//! exactly the root thread) and the RR-vs-plain-FIFO `declare`/`set_param`
//! validation differ between classes, so those are left to thin wrappers
//! in `rt.rs`/`sporadic.rs`/`tp.rs`/`weak.rs`.

use crate::class::{ClassCtx, SchedClass, SchedParams};
use crate::error::CoreError;
use crate::mlq::Mlq;
use crate::thread::ThreadId;

/// An [`Mlq`](crate::mlq::Mlq)-backed fixed-priority FIFO ready queue.
pub struct PriorityFifoClass {
    name: &'static str,
    weight: i32,
    ready: Mlq,
    /// Whether `declare`/`set_param` accept `SchedParams::RoundRobin` in
    /// addition to plain `Fifo`.
    accepts_round_robin: bool,
}

impl PriorityFifoClass {
    pub fn new(name: &'static str, weight: i32, lo_prio: i32, hi_prio: i32, accepts_round_robin: bool) -> Self {
        Self {
            name,
            weight,
            ready: Mlq::new(lo_prio, hi_prio),
            accepts_round_robin,
        }
    }

    fn validate(&self, params: SchedParams) -> Result<i32, CoreError> {
        let prio = match params {
            SchedParams::Fifo { prio } => prio,
            SchedParams::RoundRobin { prio, .. } if self.accepts_round_robin => prio,
            _ => return Err(CoreError::PolicyDeclareFailed(-1)),
        };
        if prio < self.ready.lo_prio() || prio > self.ready.hi_prio() {
            return Err(CoreError::PolicyDeclareFailed(-1));
        }
        Ok(prio)
    }

    /// Arm round-robin on `tid` for `RoundRobin` params, disarm it
    /// otherwise (e.g. a plain `Fifo` re-declare must clear a prior `RRB`,
    /// spec §4.4 `set_policy`/`set_param`).
    fn apply_round_robin(&self, ctx: &mut dyn ClassCtx, tid: ThreadId, params: SchedParams) {
        match params {
            SchedParams::RoundRobin { rr_period, .. } if self.accepts_round_robin => {
                ctx.set_round_robin(tid, true, rr_period);
            }
            _ => ctx.set_round_robin(tid, false, 0),
        }
    }
}

impl SchedClass for PriorityFifoClass {
    fn weight(&self) -> i32 {
        self.weight
    }

    fn name(&self) -> &'static str {
        self.name
    }

    fn lo_prio(&self) -> i32 {
        self.ready.lo_prio()
    }

    fn hi_prio(&self) -> i32 {
        self.ready.hi_prio()
    }

    fn pick(&mut self, _ctx: &mut dyn ClassCtx) -> Option<ThreadId> {
        self.ready.pop_highest()
    }

    fn enqueue(&mut self, ctx: &mut dyn ClassCtx, tid: ThreadId) {
        let prio = ctx.cur_prio(tid);
        self.ready.add(prio, tid);
    }

    fn dequeue(&mut self, ctx: &mut dyn ClassCtx, tid: ThreadId) {
        let prio = ctx.cur_prio(tid);
        self.ready.remove(prio, tid);
    }

    fn requeue(&mut self, ctx: &mut dyn ClassCtx, tid: ThreadId) {
        let prio = ctx.cur_prio(tid);
        self.ready.add_head(prio, tid);
    }

    fn declare(&mut self, _ctx: &mut dyn ClassCtx, _tid: ThreadId, params: SchedParams) -> Result<(), CoreError> {
        // Validate only: at this point `tid` may still be a member of its
        // previous class's ready queue, keyed by its old `cur_prio` — this
        // must not touch anything the old class's bucket lookup depends on
        // (teacher/original precedent: `xnsched_set_policy`'s declare-early
        // comment, `original_source/kernel/cobalt/sched.c`). `set_param`,
        // called later once the thread has been dequeued and rebound,
        // performs the actual mutation.
        self.validate(params)?;
        Ok(())
    }

    fn forget(&mut self, ctx: &mut dyn ClassCtx, tid: ThreadId) {
        ctx.set_scratch(tid, 0);
        ctx.set_round_robin(tid, false, 0);
    }

    fn set_param(&mut self, ctx: &mut dyn ClassCtx, tid: ThreadId, params: SchedParams) -> Result<(), CoreError> {
        let prio = self.validate(params)?;
        ctx.set_cur_prio(tid, prio);
        self.apply_round_robin(ctx, tid, params);
        Ok(())
    }

    fn get_param(&self, ctx: &dyn ClassCtx, tid: ThreadId) -> SchedParams {
        let prio = ctx.cur_prio(tid);
        if self.accepts_round_robin {
            SchedParams::RoundRobin {
                prio,
                rr_period: ctx.scratch(tid) as u32,
            }
        } else {
            SchedParams::Fifo { prio }
        }
    }

    fn track_prio(&mut self, ctx: &mut dyn ClassCtx, tid: ThreadId, params: Option<SchedParams>) {
        match params {
            None => {
                // Caller (resched::track_policy) is responsible for
                // restoring `base_prio`; the class just reflects whatever
                // cur_prio ctx already holds at this point.
                let _ = ctx.cur_prio(tid);
            }
            Some(SchedParams::Fifo { prio }) | Some(SchedParams::RoundRobin { prio, .. }) => {
                ctx.set_cur_prio(tid, prio);
            }
            Some(SchedParams::Idle) => {}
        }
    }

    fn on_tick(&mut self, ctx: &mut dyn ClassCtx, tid: ThreadId) -> bool {
        let _ = (ctx, tid);
        // The RR timer only fires for threads with `RRB` set, at exactly
        // their quantum boundary (spec §4.3 step 5) — always rotate.
        true
    }
}
