//! Concrete scheduling classes (spec §4.2).
//!
//! Per-policy internals beyond what the core requires from a class are
//! explicitly out of scope (spec §1), so every class here except `idle`
//! is the same shape — an [`Mlq`](crate::mlq::Mlq)-backed fixed-priority
//! FIFO, generalized by [`fifo_base::PriorityFifoClass`] — differing only
//! in name, weight, and priority range. `rt` additionally accepts
//! round-robin parameters.

pub mod fifo_base;
pub mod idle;
pub mod rt;
pub mod sporadic;
pub mod tp;
pub mod weak;

pub use idle::IdleClass;
pub use rt::RtClass;
pub use sporadic::SporadicClass;
pub use tp::TpClass;
pub use weak::WeakClass;
