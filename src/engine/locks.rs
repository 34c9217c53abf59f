use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

/// One async mutex per ride. Every mutating ride operation holds the ride's
/// guard across its read, state checks and write. Entries are only created
/// for stored rides (see `engine::lock_ride`), and rides are never deleted.
#[derive(Default)]
pub struct RideLocks {
    locks: DashMap<Uuid, Arc<Mutex<()>>>,
}

impl RideLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, ride_id: Uuid) -> OwnedMutexGuard<()> {
        let lock = self.locks.entry(ride_id).or_default().value().clone();
        lock.lock_owned().await
    }

    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use tokio::time::{Duration, sleep};
    use uuid::Uuid;

    use super::RideLocks;

    #[tokio::test]
    async fn same_ride_is_serialized() {
        let locks = Arc::new(RideLocks::new());
        let inside = Arc::new(AtomicUsize::new(0));
        let ride = Uuid::new_v4();

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let locks = locks.clone();
                let inside = inside.clone();
                tokio::spawn(async move {
                    let _guard = locks.acquire(ride).await;
                    assert_eq!(inside.fetch_add(1, Ordering::SeqCst), 0);
                    sleep(Duration::from_millis(2)).await;
                    inside.fetch_sub(1, Ordering::SeqCst);
                })
            })
            .collect();

        for task in tasks {
            task.await.unwrap();
        }
        assert_eq!(locks.len(), 1);
    }

    #[tokio::test]
    async fn different_rides_do_not_contend() {
        let locks = RideLocks::new();
        let _a = locks.acquire(Uuid::new_v4()).await;
        let _b = locks.acquire(Uuid::new_v4()).await;
        assert_eq!(locks.len(), 2);
    }
}
