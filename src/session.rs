use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serenity::model::id::UserId;
use tokio::sync::Mutex;

/// Voice-channel join time per user.
#[derive(Clone, Default)]
pub struct SessionStore {
    joined: Arc<Mutex<HashMap<UserId, DateTime<Utc>>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a session unless one is already open. Returns whether it inserted.
    pub async fn record_join(&self, user_id: UserId, now: DateTime<Utc>) -> bool {
        let mut joined = self.joined.lock().await;
        if joined.contains_key(&user_id) {
            return false;
        }
        joined.insert(user_id, now);
        true
    }

    pub async fn consume_leave(&self, user_id: UserId) -> Option<DateTime<Utc>> {
        self.joined.lock().await.remove(&user_id)
    }

    pub async fn len(&self) -> usize {
        self.joined.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    #[tokio::test]
    async fn first_join_wins() {
        let store = SessionStore::new();
        let user = UserId::new(1);

        assert!(store.record_join(user, at(0)).await);
        assert!(!store.record_join(user, at(60)).await);

        assert_eq!(store.consume_leave(user).await, Some(at(0)));
    }

    #[tokio::test]
    async fn unknown_user_leaves_store_untouched() {
        let store = SessionStore::new();
        store.record_join(UserId::new(1), at(0)).await;

        assert_eq!(store.consume_leave(UserId::new(2)).await, None);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn second_leave_finds_nothing() {
        let store = SessionStore::new();
        let user = UserId::new(5);
        store.record_join(user, at(0)).await;

        assert!(store.consume_leave(user).await.is_some());
        assert!(store.consume_leave(user).await.is_none());
        assert_eq!(store.len().await, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_leaves_award_once() {
        for round in 0..100 {
            let store = SessionStore::new();
            let user = UserId::new(42);
            store.record_join(user, at(round)).await;

            let tasks: Vec<_> = (0..8)
                .map(|_| {
                    let store = store.clone();
                    tokio::spawn(async move { store.consume_leave(user).await })
                })
                .collect();

            let mut consumed = 0;
            for task in tasks {
                if task.await.unwrap().is_some() {
                    consumed += 1;
                }
            }
            assert_eq!(consumed, 1, "round {round}");
            assert_eq!(store.len().await, 0);
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_joins_keep_one_session() {
        let store = SessionStore::new();
        let user = UserId::new(7);

        let tasks: Vec<_> = (0..8)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move { store.record_join(user, at(i)).await })
            })
            .collect();

        let mut inserted = 0;
        for task in tasks {
            if task.await.unwrap() {
                inserted += 1;
            }
        }
        assert_eq!(inserted, 1);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn clones_share_sessions() {
        let store = SessionStore::new();
        let other = store.clone();
        store.record_join(UserId::new(3), at(10)).await;

        assert_eq!(other.consume_leave(UserId::new(3)).await, Some(at(10)));
    }
}
