//! Named credential slots on top of a [`KeyValueStore`]
//!
//! The slots are independent and the backing store has no transactions.
//! [`CredentialStore::store_session`] writes them as one ordered batch so the
//! access token doubles as a commit marker: a session is only considered
//! present once the access token has been written last

use std::sync::Arc;

use fleetdesk_shared::{
    token::{AccessToken, RefreshToken},
    uac::UserInfo,
};
use tracing::{error, warn};

use super::{
    state::Session,
    storage::{KeyValueStore, StoreOp},
};
use crate::StorageSettings;

#[derive(Debug, Clone)]
pub struct CredentialStore {
    store: Arc<dyn KeyValueStore>,
    keys: StorageSettings,
}

impl CredentialStore {
    pub fn new(store: Arc<dyn KeyValueStore>, keys: StorageSettings) -> Self {
        Self { store, keys }
    }

    pub fn access_token(&self) -> Option<AccessToken> {
        self.non_empty(&self.keys.access_token_key)
            .map(AccessToken::new)
    }

    pub fn refresh_token(&self) -> Option<RefreshToken> {
        self.non_empty(&self.keys.refresh_token_key)
            .map(RefreshToken::new)
    }

    /// The cached user record. A record that no longer parses is reported as
    /// missing
    pub fn cached_user(&self) -> Option<UserInfo> {
        let raw = self.non_empty(&self.keys.user_key)?;
        match serde_json::from_str(&raw) {
            Ok(user) => Some(user),
            Err(e) => {
                warn!(?e, "cached user record is unreadable");
                None
            }
        }
    }

    pub fn language(&self) -> Option<String> {
        self.non_empty(&self.keys.language_key)
    }

    pub fn set_language(&self, language: &str) -> anyhow::Result<()> {
        self.store.set(&self.keys.language_key, language)
    }

    /// Returns true if any of the session slots hold a value
    pub fn has_any_credentials(&self) -> bool {
        [
            &self.keys.access_token_key,
            &self.keys.refresh_token_key,
            &self.keys.user_key,
        ]
        .into_iter()
        .any(|key| self.store.get(key).is_some())
    }

    #[tracing::instrument(skip(self, session), fields(user_id = %session.user.id))]
    pub fn store_session(&self, session: &Session) -> anyhow::Result<()> {
        let user_json = serde_json::to_string(session.user.as_ref())?;
        self.store.apply(&[
            StoreOp::Remove(&self.keys.access_token_key),
            StoreOp::Set(&self.keys.user_key, &user_json),
            StoreOp::Set(
                &self.keys.refresh_token_key,
                session.refresh_token.expose_secret(),
            ),
            StoreOp::Set(
                &self.keys.access_token_key,
                session.access_token.expose_secret(),
            ),
        ])
    }

    /// Removes the session slots. The language preference is kept.
    ///
    /// Never fails, slots that cannot be removed are logged and left for the
    /// next startup check to discard
    #[tracing::instrument(skip(self))]
    pub fn clear(&self) {
        // Access token first so a partially cleared store reads as logged out
        let ops = [
            StoreOp::Remove(&self.keys.access_token_key),
            StoreOp::Remove(&self.keys.refresh_token_key),
            StoreOp::Remove(&self.keys.user_key),
        ];
        if let Err(e) = self.store.apply(&ops) {
            error!(?e, "failed to remove credential slots");
        }
    }

    fn non_empty(&self, key: &str) -> Option<String> {
        self.store.get(key).filter(|x| !x.is_empty())
    }
}
