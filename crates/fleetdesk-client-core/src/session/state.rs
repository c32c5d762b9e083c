//! In memory view of the session that UI code observes

use std::sync::Arc;

use fleetdesk_shared::{
    api::AuthPayload,
    token::{AccessToken, RefreshToken},
    uac::UserInfo,
};
use fleetdesk_time::Timestamp;
use tokio::sync::watch;

/// An authenticated session as issued by login or refresh
#[derive(Debug, Clone)]
pub struct Session {
    pub user: Arc<UserInfo>,
    pub access_token: AccessToken,
    pub refresh_token: RefreshToken,
    pub expires_at: Option<Timestamp>,
}

impl From<AuthPayload> for Session {
    fn from(value: AuthPayload) -> Self {
        let expires_at = value.session_expiry();
        Self {
            user: Arc::new(value.user),
            access_token: value.token,
            refresh_token: value.refresh_token,
            expires_at,
        }
    }
}

/// What subscribers see
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub user: Option<Arc<UserInfo>>,
    /// Number of login or refresh operations currently awaiting the network
    pub pending_operations: usize,
}

impl SessionSnapshot {
    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    pub fn is_loading(&self) -> bool {
        self.pending_operations > 0
    }
}

/// Single writer cell behind the session manager. Every change is published
/// to the watch channel
#[derive(Debug)]
pub(crate) struct SessionState {
    tx: watch::Sender<SessionSnapshot>,
}

impl SessionState {
    pub(crate) fn new() -> Self {
        let (tx, _) = watch::channel(SessionSnapshot::default());
        Self { tx }
    }

    pub(crate) fn snapshot(&self) -> SessionSnapshot {
        self.tx.borrow().clone()
    }

    pub(crate) fn user(&self) -> Option<Arc<UserInfo>> {
        self.tx.borrow().user.clone()
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.tx.subscribe()
    }

    pub(crate) fn set_user(&self, user: Option<Arc<UserInfo>>) {
        self.tx.send_if_modified(|snapshot| {
            if snapshot.user == user {
                return false;
            }
            snapshot.user = user;
            true
        });
    }

    /// Marks an operation as in flight until the returned guard is dropped
    pub(crate) fn begin_operation(self: &Arc<Self>) -> LoadingGuard {
        self.tx.send_modify(|snapshot| snapshot.pending_operations += 1);
        LoadingGuard {
            state: Arc::clone(self),
        }
    }
}

/// Keeps the loading flag raised for as long as it is alive
///
/// Dropped on success, on error and when the owning future is cancelled so
/// the flag can never be left set
#[derive(Debug)]
#[must_use = "the loading flag is lowered as soon as the guard is dropped"]
pub struct LoadingGuard {
    state: Arc<SessionState>,
}

impl Drop for LoadingGuard {
    fn drop(&mut self) {
        self.state.tx.send_modify(|snapshot| {
            snapshot.pending_operations = snapshot.pending_operations.saturating_sub(1)
        });
    }
}
