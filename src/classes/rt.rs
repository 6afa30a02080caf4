//! The realtime scheduling class (spec §4.2): the highest-weight class,
//! fixed-priority FIFO with optional round-robin rotation for threads
//! declared with `RRB` (spec §3, §6 `tick`). This is the class exercised
//! by scenarios S1–S3 in spec §8.

use alloc::boxed::Box;

use crate::class::{ClassCtx, ClassDescriptor, SchedClass, SchedParams};
use crate::classes::fifo_base::PriorityFifoClass;
use crate::classes::sporadic::SPORADIC_WEIGHT;
use crate::error::CoreError;
use crate::thread::ThreadId;

pub const RT_WEIGHT: i32 = SPORADIC_WEIGHT + 100;
pub const RT_LO_PRIO: i32 = 0;
pub const RT_HI_PRIO: i32 = 99;

pub struct RtClass(PriorityFifoClass);

impl RtClass {
    pub fn new() -> Self {
        Self(PriorityFifoClass::new("realtime", RT_WEIGHT, RT_LO_PRIO, RT_HI_PRIO, true))
    }

    pub fn descriptor() -> ClassDescriptor {
        ClassDescriptor {
            weight: RT_WEIGHT,
            name: "realtime",
            lo_prio: RT_LO_PRIO,
            hi_prio: RT_HI_PRIO,
            make: || Box::new(RtClass::new()),
        }
    }
}

impl Default for RtClass {
    fn default() -> Self {
        Self::new()
    }
}

impl SchedClass for RtClass {
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
    fn on_tick(&mut self, ctx: &mut dyn ClassCtx, tid: ThreadId) -> bool {
        self.0.on_tick(ctx, tid)
    }
}
