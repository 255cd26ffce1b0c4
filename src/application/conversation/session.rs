//! Session store - per-sender dialogue state

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use super::flow::{FieldValue, FlowId, FlowState};
use crate::domain::entities::SenderId;

/// An in-progress dialogue for one sender
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub flow: FlowId,
    pub state: FlowState,
    pub fields: HashMap<&'static str, FieldValue>,
    pub touched_at: DateTime<Utc>,
}

impl Session {
    pub fn new(flow: FlowId, state: FlowState) -> Self {
        Self {
            flow,
            state,
            fields: HashMap::new(),
            touched_at: Utc::now(),
        }
    }

    pub fn advance(&mut self, next: FlowState) {
        self.state = next;
        self.touched_at = Utc::now();
    }

    pub fn record(&mut self, field: &'static str, value: FieldValue) {
        self.fields.insert(field, value);
    }

    pub fn text(&self, field: &str) -> Option<&str> {
        match self.fields.get(field) {
            Some(FieldValue::Text(s)) => Some(s),
            _ => None,
        }
    }

    pub fn number(&self, field: &str) -> Option<u64> {
        match self.fields.get(field) {
            Some(FieldValue::Number(n)) => Some(*n),
            _ => None,
        }
    }

    pub fn is_expired(&self, idle_timeout: Option<Duration>, now: DateTime<Utc>) -> bool {
        idle_timeout.is_some_and(|t| now - self.touched_at > t)
    }
}

type Slot = Arc<AsyncMutex<Option<Session>>>;

/// Holds at most one session per sender.
///
/// Each sender has its own async mutex; a router holds it for the whole
/// handling of one event so a sender's events never interleave, while other
/// senders proceed independently.
pub struct SessionStore {
    slots: Mutex<HashMap<SenderId, Slot>>,
    idle_timeout: Option<Duration>,
}

impl SessionStore {
    /// `idle_timeout` of `None` keeps sessions until they finish or are replaced.
    pub fn new(idle_timeout: Option<std::time::Duration>) -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
            idle_timeout: idle_timeout.and_then(|d| Duration::from_std(d).ok()),
        }
    }

    fn slot(&self, sender: SenderId) -> Slot {
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        slots.entry(sender).or_default().clone()
    }

    /// Waits for exclusive access to `sender`'s session. An expired session
    /// is dropped before the guard is handed out.
    pub async fn lock(&self, sender: SenderId) -> SessionGuard {
        let mut guard = self.slot(sender).lock_owned().await;
        if guard
            .as_ref()
            .is_some_and(|s| s.is_expired(self.idle_timeout, Utc::now()))
        {
            if let Some(expired) = guard.take() {
                tracing::info!(sender = %sender, flow = ?expired.flow, "Session expired");
            }
        }
        SessionGuard { sender, inner: guard }
    }

    /// Copy of a sender's current session, if any
    pub async fn snapshot(&self, sender: SenderId) -> Option<Session> {
        self.lock(sender).await.current().cloned()
    }

    /// Drops expired sessions and empty slots nobody is using. Returns how
    /// many sessions were dropped.
    pub fn sweep(&self) -> usize {
        let now = Utc::now();
        let mut dropped = 0;
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        slots.retain(|sender, slot| {
            // Someone between `slot()` and `lock_owned()` still holds a handle.
            if Arc::strong_count(slot) > 1 {
                return true;
            }
            let Ok(mut session) = slot.try_lock() else {
                return true;
            };
            let expired = session.as_ref().map(|s| s.is_expired(self.idle_timeout, now));
            match expired {
                Some(true) => {
                    if let Some(s) = session.take() {
                        tracing::debug!(sender = %sender, flow = ?s.flow, "Sweeping idle session");
                    }
                    dropped += 1;
                    false
                }
                Some(false) => true,
                None => false,
            }
        });
        dropped
    }

    pub fn active_count(&self) -> usize {
        let slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        slots
            .values()
            .filter(|slot| slot.try_lock().map_or(true, |s| s.is_some()))
            .count()
    }
}

/// Exclusive access to one sender's session
pub struct SessionGuard {
    sender: SenderId,
    inner: OwnedMutexGuard<Option<Session>>,
}

impl SessionGuard {
    pub fn sender(&self) -> SenderId {
        self.sender
    }

    pub fn current(&self) -> Option<&Session> {
        self.inner.as_ref()
    }

    /// Starts a new session, replacing any existing one
    pub fn begin(&mut self, flow: FlowId, state: FlowState) {
        if let Some(old) = self.inner.replace(Session::new(flow, state)) {
            tracing::debug!(sender = %self.sender, flow = ?old.flow, "Replaced active session");
        }
    }

    pub fn take(&mut self) -> Option<Session> {
        self.inner.take()
    }

    pub fn put(&mut self, session: Session) {
        *self.inner = Some(session);
    }

    pub fn clear(&mut self) {
        if let Some(old) = self.inner.take() {
            tracing::debug!(sender = %self.sender, flow = ?old.flow, "Cleared session");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_one_session_per_sender() {
        let store = SessionStore::new(None);
        let alice = SenderId(1);
        {
            let mut guard = store.lock(alice).await;
            guard.begin(FlowId::AddAdmin, FlowState::ChatId);
            guard.begin(FlowId::CountryCode, FlowState::CountryChoice);
        }
        let session = store.snapshot(alice).await.unwrap();
        assert_eq!(session.flow, FlowId::CountryCode);
        assert!(store.snapshot(SenderId(2)).await.is_none());
    }

    #[tokio::test]
    async fn test_expired_session_is_dropped_on_lock() {
        let store = SessionStore::new(Some(std::time::Duration::from_secs(60)));
        let sender = SenderId(5);
        {
            let mut guard = store.lock(sender).await;
            let mut session = Session::new(FlowId::SetCheckInterval, FlowState::CheckInterval);
            session.touched_at = Utc::now() - Duration::seconds(120);
            guard.put(session);
        }
        assert!(store.snapshot(sender).await.is_none());
    }

    #[tokio::test]
    async fn test_sweep_drops_idle_and_empty_slots() {
        let store = SessionStore::new(Some(std::time::Duration::from_secs(60)));
        {
            let mut stale = Session::new(FlowId::SetCheckInterval, FlowState::CheckInterval);
            stale.touched_at = Utc::now() - Duration::seconds(600);
            store.lock(SenderId(1)).await.put(stale);
            store.lock(SenderId(2)).await.begin(FlowId::AddAdmin, FlowState::ChatId);
            let _ = store.lock(SenderId(3)).await;
        }
        assert_eq!(store.sweep(), 1);
        assert_eq!(store.active_count(), 1);
    }

    #[tokio::test]
    async fn test_same_sender_waits_for_the_holder() {
        let store = Arc::new(SessionStore::new(None));
        let sender = SenderId(7);
        let order = Arc::new(Mutex::new(Vec::new()));

        let first = store.lock(sender).await;
        let waiter = {
            let store = store.clone();
            let order = order.clone();
            tokio::spawn(async move {
                let guard = store.lock(sender).await;
                order.lock().unwrap().push("second");
                guard.current().map(|s| s.flow)
            })
        };

        // Another sender is not held up by the first lock.
        assert!(store.lock(SenderId(8)).await.current().is_none());

        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert!(order.lock().unwrap().is_empty());

        let mut first = first;
        first.begin(FlowId::AddAdmin, FlowState::ChatId);
        order.lock().unwrap().push("first");
        drop(first);

        assert_eq!(waiter.await.unwrap(), Some(FlowId::AddAdmin));
        assert_eq!(*order.lock().unwrap(), vec!["first", "second"]);
    }

    #[test]
    fn test_no_timeout_never_expires() {
        let mut session = Session::new(FlowId::AddAdmin, FlowState::ChatId);
        session.touched_at = Utc::now() - Duration::days(30);
        assert!(!session.is_expired(None, Utc::now()));
    }
}
