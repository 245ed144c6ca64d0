use itertools::Itertools;
use nova_domain::{BodyId, PlayerId};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Deadlock-free locking for mission workers. Two lock classes exist:
/// player locks first, then body locks; inside each class acquisition
/// follows the total order of the ids. Every worker honors this order, so
/// two missions touching overlapping players/bodies serialize instead of
/// deadlocking.
#[derive(Debug, Default)]
pub struct LockRegistry {
    players: Mutex<HashMap<PlayerId, Arc<Mutex<()>>>>,
    bodies: Mutex<HashMap<BodyId, Arc<Mutex<()>>>>,
}

/// Held for the whole mission; dropping it releases everything.
pub struct MissionGuard {
    _players: Vec<OwnedMutexGuard<()>>,
    _bodies: Vec<OwnedMutexGuard<()>>,
}

impl LockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn acquire<'a>(&'a self, players: &'a [PlayerId], bodies: &'a [BodyId]) -> Pin<Box<dyn Future<Output = MissionGuard> + Send + 'a>> {
        Box::pin(async move {
            let mut player_guards = Vec::with_capacity(players.len());
            for player in players.iter().unique().sorted() {
                let lock = {
                    let mut registry = self.players.lock().await;
                    Arc::clone(registry.entry(*player).or_default())
                };
                player_guards.push(lock.lock_owned().await);
            }

            let mut body_guards = Vec::with_capacity(bodies.len());
            for body in bodies.iter().unique().sorted() {
                let lock = {
                    let mut registry = self.bodies.lock().await;
                    Arc::clone(registry.entry(*body).or_default())
                };
                body_guards.push(lock.lock_owned().await);
            }

            MissionGuard {
                _players: player_guards,
                _bodies: body_guards,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn overlapping_lock_sets_serialize() {
        let registry = Arc::new(LockRegistry::new());
        let player = PlayerId::new();
        let body = BodyId::new();
        let in_critical = Arc::new(AtomicU32::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let registry = Arc::clone(&registry);
            let in_critical = Arc::clone(&in_critical);
            handles.push(tokio::spawn(async move {
                let _guard = registry.acquire(&[player], &[body]).await;
                assert_eq!(in_critical.fetch_add(1, Ordering::SeqCst), 0);
                tokio::time::sleep(Duration::from_millis(2)).await;
                in_critical.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
    }

    #[tokio::test]
    async fn reversed_id_orders_do_not_deadlock() {
        let registry = Arc::new(LockRegistry::new());
        let player_a = PlayerId::new();
        let player_b = PlayerId::new();
        let body_a = BodyId::new();
        let body_b = BodyId::new();

        let first = {
            let registry = Arc::clone(&registry);
            tokio::spawn(async move {
                for _ in 0..50 {
                    let _guard = registry.acquire(&[player_a, player_b], &[body_a, body_b]).await;
                }
            })
        };
        let second = {
            let registry = Arc::clone(&registry);
            tokio::spawn(async move {
                for _ in 0..50 {
                    // Same sets handed over in the opposite order; the
                    // registry's total order makes it safe.
                    let _guard = registry.acquire(&[player_b, player_a], &[body_b, body_a]).await;
                }
            })
        };

        tokio::time::timeout(Duration::from_secs(10), async {
            first.await.unwrap();
            second.await.unwrap();
        })
        .await
        .expect("lock ordering must prevent deadlock");
    }

    #[tokio::test]
    async fn duplicate_ids_do_not_self_deadlock() {
        let registry = LockRegistry::new();
        let player = PlayerId::new();
        let _guard = registry.acquire(&[player, player], &[]).await;
    }
}
