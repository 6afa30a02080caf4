//! Real-time affinity policy (spec §4.7, §6 "Configuration").
//!
//! A single global mask of CPUs eligible for real-time scheduling. Writes
//! are validated against the currently online set and the statically
//! permitted real-time-capable set determined at boot; the scheduler
//! never enqueues a thread outside this mask, and a thread's own affinity
//! (not modeled further here — out of scope per spec §1 beyond this
//! global gate) is intersected with it at migration time.

use crate::error::CoreError;
use crate::runqueue::CpuMask;

/// Global real-time affinity state (spec §4.7).
#[derive(Debug, Clone, Copy)]
pub struct AffinityPolicy {
    /// CPUs statically permitted for real-time work, fixed at boot.
    realtime_capable: CpuMask,
    /// CPUs currently online.
    online: CpuMask,
    /// The writable mask: a subset of both of the above.
    current: CpuMask,
}

impl AffinityPolicy {
    /// Construct the policy at boot. `realtime_capable` and `online` are
    /// supplied by the host integrator; `current` starts equal to their
    /// intersection (the most permissive valid value).
    pub fn new(realtime_capable: CpuMask, online: CpuMask) -> Self {
        Self {
            realtime_capable,
            online,
            current: intersect(realtime_capable, online),
        }
    }

    pub fn mask(&self) -> CpuMask {
        self.current
    }

    /// Write a new affinity mask (spec §6 "Configuration", §7
    /// `AffinityInvalid`). Rejects an empty mask, one that is not a
    /// subset of the online CPUs, or not a subset of the statically
    /// permitted set; on rejection the prior mask is unchanged.
    pub fn set_mask(&mut self, requested: CpuMask) -> Result<(), CoreError> {
        if requested.is_empty() {
            return Err(CoreError::AffinityInvalid);
        }
        if !is_subset(requested, self.online) {
            return Err(CoreError::AffinityInvalid);
        }
        if !is_subset(requested, self.realtime_capable) {
            return Err(CoreError::AffinityInvalid);
        }
        self.current = requested;
        Ok(())
    }

    /// Mark a CPU online/offline, intersecting `current` down if needed.
    pub fn set_online(&mut self, online: CpuMask) {
        self.online = online;
        self.current = intersect(self.current, online);
    }
}

fn intersect(a: CpuMask, b: CpuMask) -> CpuMask {
    CpuMask::from_raw(a.raw() & b.raw())
}

fn is_subset(subset: CpuMask, superset: CpuMask) -> bool {
    subset.raw() & !superset.raw() == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runqueue::CpuId;

    fn mask(cpus: &[u32]) -> CpuMask {
        let mut m = CpuMask::empty();
        for &c in cpus {
            m.insert(CpuId(c));
        }
        m
    }

    #[test]
    fn rejects_empty_mask() {
        let mut policy = AffinityPolicy::new(mask(&[0, 1, 2]), mask(&[0, 1, 2]));
        assert_eq!(policy.set_mask(CpuMask::empty()), Err(CoreError::AffinityInvalid));
    }

    #[test]
    fn rejects_offline_cpu() {
        let mut policy = AffinityPolicy::new(mask(&[0, 1, 2]), mask(&[0, 1]));
        assert_eq!(policy.set_mask(mask(&[0, 2])), Err(CoreError::AffinityInvalid));
    }

    #[test]
    fn rejects_cpu_outside_static_rt_set() {
        let mut policy = AffinityPolicy::new(mask(&[0, 1]), mask(&[0, 1, 2]));
        assert_eq!(policy.set_mask(mask(&[0, 2])), Err(CoreError::AffinityInvalid));
    }

    #[test]
    fn accepts_valid_subset_and_leaves_prior_on_rejection() {
        let mut policy = AffinityPolicy::new(mask(&[0, 1, 2]), mask(&[0, 1, 2]));
        assert!(policy.set_mask(mask(&[0, 1])).is_ok());
        assert_eq!(policy.mask().raw(), mask(&[0, 1]).raw());
        assert_eq!(policy.set_mask(CpuMask::empty()), Err(CoreError::AffinityInvalid));
        assert_eq!(policy.mask().raw(), mask(&[0, 1]).raw());
    }
}
