use crate::api::error::ApiError;
use crate::store::{KEY_ACCESS, KEY_REFRESH, KvStore};
use std::sync::Arc;
use tokio::sync::{Mutex, oneshot};

/// Access/refresh token pair backed by the injected store. Outside the
/// login/registration/logout flows, the refresh gate below is the only
/// writer.
#[derive(Clone)]
pub struct Session {
    store: Arc<dyn KvStore>,
}

impl Session {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    pub fn access_token(&self) -> Option<String> {
        self.store.get(KEY_ACCESS)
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.store.get(KEY_REFRESH)
    }

    /// Anonymous when neither token is present.
    pub fn is_logged_in(&self) -> bool {
        self.access_token().is_some() || self.refresh_token().is_some()
    }

    pub fn set_access(&self, token: &str) {
        self.store.set(KEY_ACCESS, token);
    }

    /// Called from login/registration with whatever the server returned.
    pub fn store_tokens(&self, access: Option<&str>, refresh: Option<&str>) {
        if let Some(a) = access {
            self.store.set(KEY_ACCESS, a);
        }
        if let Some(r) = refresh {
            self.store.set(KEY_REFRESH, r);
        }
    }

    pub fn clear(&self) {
        self.store.remove(KEY_ACCESS);
        self.store.remove(KEY_REFRESH);
    }
}

/// Single-flight coordinator for the refresh protocol. At most one refresh
/// is in flight process-wide; callers that arrive while one is running get
/// a continuation resolved (FIFO) with the shared outcome.
pub struct RefreshGate {
    session: Session,
    state: Mutex<GateState>,
}

#[derive(Default)]
struct GateState {
    in_flight: bool,
    waiters: Vec<oneshot::Sender<Result<String, ApiError>>>,
}

/// What a caller holding a 401 gets back from `join`.
pub enum Ticket {
    /// Nobody is refreshing; the holder must run the refresh and `settle`.
    Lead,
    /// A refresh is in flight; await its outcome.
    Wait(oneshot::Receiver<Result<String, ApiError>>),
}

impl RefreshGate {
    pub fn new(session: Session) -> Self {
        Self {
            session,
            state: Mutex::new(GateState::default()),
        }
    }

    pub async fn join(&self) -> Ticket {
        let mut state = self.state.lock().await;
        if state.in_flight {
            let (tx, rx) = oneshot::channel();
            state.waiters.push(tx);
            Ticket::Wait(rx)
        } else {
            state.in_flight = true;
            Ticket::Lead
        }
    }

    /// Publish the refresh outcome: store the new access token (or clear the
    /// session on failure, forcing a fresh login) and wake every queued
    /// continuation in enqueue order. Always drops the in-flight flag.
    pub async fn settle(&self, outcome: &Result<String, ApiError>) {
        match outcome {
            Ok(access) => self.session.set_access(access),
            Err(e) => {
                log::warn!("token refresh failed, clearing session: {}", e);
                self.session.clear();
            }
        }
        let waiters = {
            let mut state = self.state.lock().await;
            state.in_flight = false;
            std::mem::take(&mut state.waiters)
        };
        for waiter in waiters {
            // A waiter that gave up (dropped receiver) is fine to skip.
            let _ = waiter.send(outcome.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemStore;

    fn session() -> Session {
        Session::new(Arc::new(MemStore::new()))
    }

    #[test]
    fn anonymous_until_tokens_stored() {
        let s = session();
        assert!(!s.is_logged_in());
        s.store_tokens(Some("a"), None);
        assert!(s.is_logged_in());
        assert_eq!(s.access_token().as_deref(), Some("a"));
        assert_eq!(s.refresh_token(), None);
        s.clear();
        assert!(!s.is_logged_in());
    }

    #[tokio::test]
    async fn gate_hands_out_one_lead_and_queues_the_rest() {
        let gate = RefreshGate::new(session());
        let first = gate.join().await;
        assert!(matches!(first, Ticket::Lead));
        let second = gate.join().await;
        let third = gate.join().await;
        let (rx2, rx3) = match (second, third) {
            (Ticket::Wait(a), Ticket::Wait(b)) => (a, b),
            _ => panic!("expected queued tickets while a refresh is in flight"),
        };

        gate.settle(&Ok("fresh".to_string())).await;
        assert_eq!(rx2.await.unwrap().unwrap(), "fresh");
        assert_eq!(rx3.await.unwrap().unwrap(), "fresh");

        // Gate reusable after settling.
        assert!(matches!(gate.join().await, Ticket::Lead));
    }

    #[tokio::test]
    async fn settle_failure_clears_session_and_rejects_waiters() {
        let s = session();
        s.store_tokens(Some("a"), Some("r"));
        let gate = RefreshGate::new(s.clone());
        let _lead = gate.join().await;
        let rx = match gate.join().await {
            Ticket::Wait(rx) => rx,
            _ => panic!("expected wait ticket"),
        };
        gate.settle(&Err(ApiError::Unauthorized)).await;
        assert_eq!(rx.await.unwrap(), Err(ApiError::Unauthorized));
        assert!(!s.is_logged_in());
    }
}
