//! The idle scheduling class (spec §4.2, §2 component 1 glossary "Root
//! thread"). Lowest weight of all classes; its queue holds exactly the
//! per-CPU root thread, which is always runnable so `pick` never returns
//! `None` on a live run-queue (spec §4.2).

use alloc::boxed::Box;

use crate::class::{ClassCtx, ClassDescriptor, SchedClass, SchedParams};
use crate::error::CoreError;
use crate::thread::ThreadId;

/// Weight chosen low enough to always lose to every other class, but
/// strictly above the idle class's one priority value (0), satisfying
/// the "weight exceeds any in-class priority" rule (spec §4.2,
/// `SPEC_FULL.md` §C.3).
pub const IDLE_WEIGHT: i32 = 1;

pub struct IdleClass {
    root: Option<ThreadId>,
}

impl IdleClass {
    pub fn new() -> Self {
        Self { root: None }
    }

    pub fn descriptor() -> ClassDescriptor {
        ClassDescriptor {
            weight: IDLE_WEIGHT,
            name: "idle",
            lo_prio: 0,
            hi_prio: 0,
            make: || Box::new(IdleClass::new()),
        }
    }
}

impl Default for IdleClass {
    fn default() -> Self {
        Self::new()
    }
}

impl SchedClass for IdleClass {
    fn weight(&self) -> i32 {
        IDLE_WEIGHT
    }

    fn name(&self) -> &'static str {
        "idle"
    }

    fn lo_prio(&self) -> i32 {
        0
    }

    fn hi_prio(&self) -> i32 {
        0
    }

    fn pick(&mut self, _ctx: &mut dyn ClassCtx) -> Option<ThreadId> {
        self.root
    }

    fn enqueue(&mut self, _ctx: &mut dyn ClassCtx, tid: ThreadId) {
        self.root = Some(tid);
    }

    fn dequeue(&mut self, _ctx: &mut dyn ClassCtx, tid: ThreadId) {
        if self.root == Some(tid) {
            // The root thread is the last-resort fallback (spec §3): it is
            // never truly removed, only "picked again" until its run-queue
            // is torn down. Dequeue is a no-op so `pick` keeps finding it.
        }
    }

    fn requeue(&mut self, _ctx: &mut dyn ClassCtx, tid: ThreadId) {
        self.root = Some(tid);
    }

    fn declare(&mut self, _ctx: &mut dyn ClassCtx, tid: ThreadId, params: SchedParams) -> Result<(), CoreError> {
        match params {
            SchedParams::Idle => {
                self.root = Some(tid);
                Ok(())
            }
            _ => Err(CoreError::PolicyDeclareFailed(-1)),
        }
    }

    fn forget(&mut self, _ctx: &mut dyn ClassCtx, _tid: ThreadId) {}

    fn set_param(&mut self, _ctx: &mut dyn ClassCtx, _tid: ThreadId, _params: SchedParams) -> Result<(), CoreError> {
        Ok(())
    }

    fn get_param(&self, _ctx: &dyn ClassCtx, _tid: ThreadId) -> SchedParams {
        SchedParams::Idle
    }

    fn track_prio(&mut self, _ctx: &mut dyn ClassCtx, _tid: ThreadId, _params: Option<SchedParams>) {}
}
