//! Process-wide session state
//!
//! A single watch channel carrying the most recent sign-in or sign-out.
//! The auth routes publish into it and an observer task started at boot
//! logs transitions; the observer is torn down through the shutdown
//! signal. Isolated credential contexts used by admin workflows never
//! publish here, so provisioning accounts for others leaves this state
//! untouched.

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::data::types::Role;

/// The signed-in principal, as last published by the auth surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionUser {
    pub id: String,
    pub email: String,
    pub role: Role,
}

pub struct SessionState {
    tx: watch::Sender<Option<SessionUser>>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionState {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(None);
        Self { tx }
    }

    /// Publish a sign-in. Stored even when no observer is subscribed.
    pub fn signed_in(&self, user: SessionUser) {
        self.tx.send_replace(Some(user));
    }

    /// Publish a sign-out. Stored even when no observer is subscribed.
    pub fn signed_out(&self) {
        self.tx.send_replace(None);
    }

    pub fn current(&self) -> Option<SessionUser> {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<SessionUser>> {
        self.tx.subscribe()
    }

    /// Spawn the observer task that logs session transitions until the
    /// shutdown signal fires.
    pub fn start_observer(&self, mut shutdown_rx: watch::Receiver<bool>) -> JoinHandle<()> {
        let mut rx = self.subscribe();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    changed = rx.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        match rx.borrow_and_update().as_ref() {
                            Some(user) => {
                                tracing::info!(user_id = %user.id, role = %user.role, "Session opened");
                            }
                            None => {
                                tracing::info!("Session closed");
                            }
                        }
                    }
                    _ = shutdown_rx.wait_for(|&v| v) => {
                        tracing::debug!("Session observer stopped");
                        break;
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: &str, role: Role) -> SessionUser {
        SessionUser {
            id: id.to_string(),
            email: format!("{id}@x.dz"),
            role,
        }
    }

    #[tokio::test]
    async fn test_sign_in_and_out_visible_to_subscribers() {
        let state = SessionState::new();
        let mut rx = state.subscribe();
        assert!(rx.borrow().is_none());

        state.signed_in(user("u1", Role::User));
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update().as_ref().unwrap().id, "u1");

        state.signed_out();
        rx.changed().await.unwrap();
        assert!(rx.borrow().is_none());
    }

    #[tokio::test]
    async fn test_current_reflects_latest_without_subscribers() {
        let state = SessionState::new();
        assert!(state.current().is_none());
        state.signed_in(user("admin", Role::Admin));
        assert_eq!(state.current().unwrap().role, Role::Admin);
        state.signed_out();
        assert!(state.current().is_none());
    }

    #[tokio::test]
    async fn test_observer_stops_on_shutdown() {
        let state = SessionState::new();
        let (tx, rx) = watch::channel(false);
        let handle = state.start_observer(rx);

        tx.send(true).unwrap();
        tokio::time::timeout(std::time::Duration::from_millis(100), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
