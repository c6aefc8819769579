//! Shared bookkeeping for the two pools a standby connection moves through.
//!
//! `spareSlaverPool` and `workingPool` are disjoint sets of local endpoints, guarded by a
//! single mutex so the controller's view of `spare_len()` is always consistent with
//! whichever session just promoted or removed an entry. The lock is only ever held across
//! the synchronous set operations below, never across an `.await`.

use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::Mutex;

#[derive(Default)]
struct Pools {
    spare: HashSet<SocketAddr>,
    working: HashSet<SocketAddr>,
}

/// Tracks which local endpoints are standby vs. activated. Every dialed connection is a
/// member of exactly one set until it is removed by session failure, target-dial failure
/// or bridge completion.
#[derive(Default)]
pub struct PoolState {
    pools: Mutex<Pools>,
}

impl PoolState {
    pub fn new() -> PoolState {
        PoolState::default()
    }

    /// Registers a freshly dialed connection as standby.
    pub fn insert_spare(&self, addr: SocketAddr) {
        let mut pools = self.pools.lock().unwrap();
        debug_assert!(!pools.working.contains(&addr), "addr already working");
        pools.spare.insert(addr);
    }

    /// Moves `addr` from standby to working. Panics if `addr` was not standby — the session
    /// that calls this always holds the only reference to a record it itself registered.
    pub fn promote(&self, addr: SocketAddr) {
        let mut pools = self.pools.lock().unwrap();
        let removed = pools.spare.remove(&addr);
        debug_assert!(removed, "promoted addr was not standby");
        pools.working.insert(addr);
    }

    pub fn remove_spare(&self, addr: SocketAddr) {
        self.pools.lock().unwrap().spare.remove(&addr);
    }

    pub fn remove_working(&self, addr: SocketAddr) {
        self.pools.lock().unwrap().working.remove(&addr);
    }

    pub fn spare_len(&self) -> usize {
        self.pools.lock().unwrap().spare.len()
    }

    #[cfg(test)]
    pub fn working_len(&self) -> usize {
        self.pools.lock().unwrap().working.len()
    }

    #[cfg(test)]
    pub fn is_disjoint(&self) -> bool {
        let pools = self.pools.lock().unwrap();
        pools.spare.is_disjoint(&pools.working)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(port: u16) -> SocketAddr {
        format!("127.0.0.1:{port}").parse().unwrap()
    }

    #[test]
    fn spare_and_working_stay_disjoint_across_promotion() {
        let state = PoolState::new();
        let a = addr(1);

        state.insert_spare(a);
        assert_eq!(state.spare_len(), 1);
        assert!(state.is_disjoint());

        state.promote(a);
        assert_eq!(state.spare_len(), 0);
        assert_eq!(state.working_len(), 1);
        assert!(state.is_disjoint());

        state.remove_working(a);
        assert_eq!(state.working_len(), 0);
    }

    #[test]
    fn removal_from_either_pool_is_idempotent() {
        let state = PoolState::new();
        let a = addr(2);

        state.remove_spare(a);
        state.remove_working(a);
        assert_eq!(state.spare_len(), 0);
    }
}
