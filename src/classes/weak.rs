//! The weak scheduling class (spec §4.2): plain fixed-priority FIFO, the
//! lowest-weight non-idle class. Priority range and weight are chosen so
//! every non-idle class's weighted range sits strictly above the idle
//! class's and strictly below the next class up (`ClassRegistry::register`
//! enforces the ordering; see `SPEC_FULL.md` §C.3).

use alloc::boxed::Box;

use crate::class::{ClassCtx, ClassDescriptor, SchedClass, SchedParams};
use crate::classes::fifo_base::PriorityFifoClass;
use crate::error::CoreError;
use crate::thread::ThreadId;

pub const WEAK_WEIGHT: i32 = 100;
pub const WEAK_LO_PRIO: i32 = 0;
pub const WEAK_HI_PRIO: i32 = 99;

pub struct WeakClass(PriorityFifoClass);

impl WeakClass {
    pub fn new() -> Self {
        Self(PriorityFifoClass::new("weak", WEAK_WEIGHT, WEAK_LO_PRIO, WEAK_HI_PRIO, false))
    }

    pub fn descriptor() -> ClassDescriptor {
        ClassDescriptor {
            weight: WEAK_WEIGHT,
            name: "weak",
            lo_prio: WEAK_LO_PRIO,
            hi_prio: WEAK_HI_PRIO,
            make: || Box::new(WeakClass::new()),
        }
    }
}

impl Default for WeakClass {
    fn default() -> Self {
        Self::new()
    }
}

impl SchedClass for WeakClass {
    fn weight(&self) -> i32 {
        self.0.weight()
    }
    fn name(&self) -> &'static str {
        self.0.name()
    }
    fn lo_prio(&self) -> i32 {
        self.0.lo_prio()
    }
    fn hi_prio(&self) -> i32 {
        self.0.hi_prio()
    }
    fn pick(&mut self, ctx: &mut dyn ClassCtx) -> Option<ThreadId> {
        self.0.pick(ctx)
    }
    fn enqueue(&mut self, ctx: &mut dyn ClassCtx, tid: ThreadId) {
        self.0.enqueue(ctx, tid)
    }
    fn dequeue(&mut self, ctx: &mut dyn ClassCtx, tid: ThreadId) {
        self.0.dequeue(ctx, tid)
    }
    fn requeue(&mut self, ctx: &mut dyn ClassCtx, tid: ThreadId) {
        self.0.requeue(ctx, tid)
    }
    fn declare(&mut self, ctx: &mut dyn ClassCtx, tid: ThreadId, params: SchedParams) -> Result<(), CoreError> {
        self.0.declare(ctx, tid, params)
    }
    fn forget(&mut self, ctx: &mut dyn ClassCtx, tid: ThreadId) {
        self.0.forget(ctx, tid)
    }
    fn set_param(&mut self, ctx: &mut dyn ClassCtx, tid: ThreadId, params: SchedParams) -> Result<(), CoreError> {
        self.0.set_param(ctx, tid, params)
    }
    fn get_param(&self, ctx: &dyn ClassCtx, tid: ThreadId) -> SchedParams {
        self.0.get_param(ctx, tid)
    }
    fn track_prio(&mut self, ctx: &mut dyn ClassCtx, tid: ThreadId, params: Option<SchedParams>) {
        self.0.track_prio(ctx, tid, params)
    }
}
