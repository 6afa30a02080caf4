//! The time-partition scheduling class (spec §4.2): fixed-priority FIFO,
//! ranked above `weak` and below `sporadic`. The core treats it exactly
//! like `weak` — the time-partitioning schedule itself (which partition
//! windows are open) is a per-policy internal explicitly out of scope
//! (spec §1).

use alloc::boxed::Box;

use crate::class::{ClassCtx, ClassDescriptor, SchedClass, SchedParams};
use crate::classes::fifo_base::PriorityFifoClass;
use crate::classes::weak::WEAK_WEIGHT;
use crate::error::CoreError;
use crate::thread::ThreadId;

pub const TP_WEIGHT: i32 = WEAK_WEIGHT + 100;
pub const TP_LO_PRIO: i32 = 0;
pub const TP_HI_PRIO: i32 = 99;

pub struct TpClass(PriorityFifoClass);

impl TpClass {
    pub fn new() -> Self {
        Self(PriorityFifoClass::new("time-partition", TP_WEIGHT, TP_LO_PRIO, TP_HI_PRIO, false))
    }

    pub fn descriptor() -> ClassDescriptor {
        ClassDescriptor {
            weight: TP_WEIGHT,
            name: "time-partition",
            lo_prio: TP_LO_PRIO,
            hi_prio: TP_HI_PRIO,
            make: || Box::new(TpClass::new()),
        }
    }
}

impl Default for TpClass {
    fn default() -> Self {
        Self::new()
    }
}

impl SchedClass for TpClass {
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
