//! Explicit `user_id -> Conversation` table.
//!
//! Each user's conversation sits behind its own async lock, so a turn for one
//! user runs to completion before the next turn for that user starts while
//! other users proceed independently. Idle entries are dropped on check-in.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::domain::form::Conversation;
use crate::domain::foundation::UserId;

/// Exclusive handle on one user's conversation.
pub type ConversationGuard = OwnedMutexGuard<Conversation>;

#[derive(Debug, Default)]
pub struct SessionTable {
    entries: Mutex<HashMap<UserId, Arc<Mutex<Conversation>>>>,
}

impl SessionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Locks `user_id`'s conversation, inserting an idle one if absent.
    ///
    /// Waits while another turn for the same user holds it.
    pub async fn checkout(&self, user_id: &UserId) -> ConversationGuard {
        let slot = {
            let mut entries = self.entries.lock().await;
            entries
                .entry(user_id.clone())
                .or_insert_with(|| Arc::new(Mutex::new(Conversation::Idle)))
                .clone()
        };
        slot.lock_owned().await
    }

    /// Releases the conversation, deleting the entry if it went idle and
    /// nobody else is waiting on it.
    ///
    /// The table lock is taken before the guard is released, so no turn that
    /// already holds the slot can write to it between the check and removal.
    pub async fn checkin(&self, user_id: &UserId, guard: ConversationGuard) {
        if !guard.is_idle() {
            return;
        }
        let mut entries = self.entries.lock().await;
        drop(guard);
        let unused = entries
            .get(user_id)
            .map(|slot| {
                Arc::strong_count(slot) == 1
                    && slot.try_lock().map(|c| c.is_idle()).unwrap_or(false)
            })
            .unwrap_or(false);
        if unused {
            entries.remove(user_id);
        }
    }

    /// Copy of the current conversation, `Idle` if the user has none.
    pub async fn snapshot(&self, user_id: &UserId) -> Conversation {
        let slot = self.entries.lock().await.get(user_id).cloned();
        match slot {
            Some(slot) => slot.lock().await.clone(),
            None => Conversation::Idle,
        }
    }

    /// Number of users with a table entry.
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::form::{Session, Stage};
    use crate::domain::foundation::Timestamp;
    use chrono::FixedOffset;
    use std::time::Duration;

    fn user(id: &str) -> UserId {
        UserId::new(id).unwrap()
    }

    fn session(id: &str) -> Session {
        Session::start(
            user(id),
            Stage::ContactName,
            None,
            Timestamp::now_in(FixedOffset::east_opt(0).unwrap()),
        )
    }

    #[tokio::test]
    async fn idle_entries_are_removed_on_checkin() {
        let table = SessionTable::new();
        let guard = table.checkout(&user("1")).await;
        assert_eq!(table.len().await, 1);
        table.checkin(&user("1"), guard).await;
        assert!(table.is_empty().await);
    }

    #[tokio::test]
    async fn active_sessions_stay() {
        let table = SessionTable::new();
        let mut guard = table.checkout(&user("1")).await;
        *guard = Conversation::Filling(session("1"));
        table.checkin(&user("1"), guard).await;

        assert_eq!(table.len().await, 1);
        let snapshot = table.snapshot(&user("1")).await;
        assert_eq!(snapshot.session().map(|s| s.stage()), Some(Stage::ContactName));
    }

    #[tokio::test]
    async fn unknown_user_snapshot_is_idle() {
        let table = SessionTable::new();
        assert!(table.snapshot(&user("9")).await.is_idle());
    }

    #[tokio::test]
    async fn same_user_turns_do_not_overlap() {
        let table = Arc::new(SessionTable::new());
        let guard = table.checkout(&user("1")).await;

        let waiter = {
            let table = table.clone();
            tokio::spawn(async move {
                let guard = table.checkout(&user("1")).await;
                let was_filling = guard.session().is_some();
                table.checkin(&user("1"), guard).await;
                was_filling
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        let mut guard = guard;
        *guard = Conversation::Filling(session("1"));
        table.checkin(&user("1"), guard).await;

        assert!(waiter.await.unwrap());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn idle_checkin_keeps_session_written_by_waiting_turn() {
        let table = Arc::new(SessionTable::new());
        let first = table.checkout(&user("1")).await;

        let second = {
            let table = table.clone();
            tokio::spawn(async move {
                let mut guard = table.checkout(&user("1")).await;
                *guard = Conversation::Filling(session("1"));
                table.checkin(&user("1"), guard).await;
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        // another user's checkout is holding the table when the idle turn ends
        let busy = table.entries.lock().await;
        let first_checkin = {
            let table = table.clone();
            tokio::spawn(async move { table.checkin(&user("1"), first).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        drop(busy);

        first_checkin.await.unwrap();
        second.await.unwrap();

        assert_eq!(table.len().await, 1);
        let snapshot = table.snapshot(&user("1")).await;
        assert_eq!(snapshot.session().map(|s| s.stage()), Some(Stage::ContactName));
    }

    #[tokio::test]
    async fn different_users_do_not_block() {
        let table = SessionTable::new();
        let first = table.checkout(&user("1")).await;
        let second = tokio::time::timeout(Duration::from_millis(100), table.checkout(&user("2")))
            .await
            .expect("second user must not wait");
        table.checkin(&user("2"), second).await;
        table.checkin(&user("1"), first).await;
    }
}
