// Per-team mutation locks.
//
// Gameplay handlers read a profile, run the engine, and write the profile
// back. Two concurrent requests for the same team would race on that
// read-modify-write cycle, so each team gets an async mutex that the
// handler holds for the duration of the cycle. Teams never contend with
// each other.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Thread-safe registry of per-team async mutexes.
#[derive(Debug, Clone)]
pub struct TeamLocks {
    inner: Arc<Mutex<HashMap<i64, Arc<tokio::sync::Mutex<()>>>>>,
}

impl TeamLocks {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// The mutex for a team, created on first use. Callers `.lock().await`
    /// the returned handle around their read-modify-write cycle.
    pub fn for_team(&self, team_id: i64) -> Arc<tokio::sync::Mutex<()>> {
        let mut map = self.inner.lock().unwrap();
        map.entry(team_id)
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }
}

impl Default for TeamLocks {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_team_gets_same_lock() {
        let locks = TeamLocks::new();
        let a = locks.for_team(1);
        let b = locks.for_team(1);
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_different_teams_get_different_locks() {
        let locks = TeamLocks::new();
        let a = locks.for_team(1);
        let b = locks.for_team(2);
        assert!(!Arc::ptr_eq(&a, &b));
    }

    #[tokio::test]
    async fn test_serializes_mutations_for_one_team() {
        let locks = TeamLocks::new();
        let counter = Arc::new(Mutex::new(0i64));

        let mut handles = Vec::new();
        for _ in 0..16 {
            let locks = locks.clone();
            let counter = counter.clone();
            handles.push(tokio::spawn(async move {
                let lock = locks.for_team(7);
                let _guard = lock.lock().await;
                // Non-atomic read-modify-write, safe only under the lock
                let read = *counter.lock().unwrap();
                tokio::task::yield_now().await;
                *counter.lock().unwrap() = read + 1;
            }));
        }
        for h in handles {
            h.await.unwrap();
        }
        assert_eq!(*counter.lock().unwrap(), 16);
    }
}
