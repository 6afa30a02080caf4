//! The sporadic scheduling class (spec §4.2): fixed-priority FIFO, ranked
//! above `time-partition` and below `realtime`. Budget/replenishment
//! accounting for sporadic servers is a per-policy internal out of scope
//! for the core (spec §1); this class only has to order threads by
//! priority the way every other FIFO class does.

use alloc::boxed::Box;

use crate::class::{ClassCtx, ClassDescriptor, SchedClass, SchedParams};
use crate::classes::fifo_base::PriorityFifoClass;
use crate::classes::tp::TP_WEIGHT;
use crate::error::CoreError;
use crate::thread::ThreadId;

pub const SPORADIC_WEIGHT: i32 = TP_WEIGHT + 100;
pub const SPORADIC_LO_PRIO: i32 = 0;
pub const SPORADIC_HI_PRIO: i32 = 99;

pub struct SporadicClass(PriorityFifoClass);

impl SporadicClass {
    pub fn new() -> Self {
        Self(PriorityFifoClass::new(
            "sporadic",
            SPORADIC_WEIGHT,
            SPORADIC_LO_PRIO,
            SPORADIC_HI_PRIO,
            false,
        ))
    }

    pub fn descriptor() -> ClassDescriptor {
        ClassDescriptor {
            weight: SPORADIC_WEIGHT,
            name: "sporadic",
            lo_prio: SPORADIC_LO_PRIO,
            hi_prio: SPORADIC_HI_PRIO,
            make: || Box::new(SporadicClass::new()),
        }
    }
}

impl Default for SporadicClass {
    fn default() -> Self {
        Self::new()
    }
}

impl SchedClass for SporadicClass {
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
