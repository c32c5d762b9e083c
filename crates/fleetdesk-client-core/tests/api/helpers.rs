use fleetdesk_auth_test_helper::{spawn_app, spawn_app_with, MockBehaviour, TestApp};
use fleetdesk_client_core::{
    ApiSettings, ClientSettings, HistoryNavigator, KeyValueStore, MemoryStore, RequestAuthorizer,
    RouteGuards, Session, SessionManager, StorageSettings,
};
use fleetdesk_shared::uac::UserInfo;
use std::sync::Arc;

pub use fleetdesk_auth_test_helper::{expired_jwt, issue_refresh_token, jwt_valid_for};

/// Everything a test needs on the client side, wired to a running mock
pub struct TestClient {
    pub app: TestApp,
    pub session: SessionManager,
    pub authorizer: RequestAuthorizer,
    pub guards: RouteGuards,
    pub store: MemoryStore,
    pub navigator: Arc<HistoryNavigator>,
}

impl TestClient {
    pub async fn spawn() -> Self {
        Self::from_app(spawn_app().await, MemoryStore::new())
    }

    pub async fn spawn_with(behaviour: MockBehaviour) -> Self {
        Self::from_app(spawn_app_with(behaviour).await, MemoryStore::new())
    }

    /// Builds the client on top of `store` which may already hold a session
    pub fn from_app(app: TestApp, store: MemoryStore) -> Self {
        let navigator = Arc::new(HistoryNavigator::new());
        let session = SessionManager::new(
            settings_for(&app.address),
            Arc::new(store.clone()),
            navigator.clone(),
        )
        .expect("failed to build session manager");
        Self {
            authorizer: RequestAuthorizer::new(session.clone()),
            guards: RouteGuards::new(session.clone()),
            app,
            session,
            store,
            navigator,
        }
    }

    pub async fn login(&self) -> Session {
        self.session
            .login(self.app.test_user.login_args())
            .await
            .expect("login should succeed")
    }

    pub fn stored_access_token(&self) -> Option<String> {
        self.store.get(&StorageSettings::default().access_token_key)
    }

    pub fn current_location(&self) -> Option<String> {
        self.navigator.current()
    }
}

pub fn settings_for(address: &str) -> ClientSettings {
    ClientSettings {
        api: ApiSettings {
            base_url: address.to_string(),
            request_timeout_secs: 1,
            ..Default::default()
        },
        ..Default::default()
    }
}

/// Writes the slots directly, bypassing the session manager
pub fn seed_store(store: &MemoryStore, access: Option<&str>, refresh: Option<&str>, user: Option<&UserInfo>) {
    let keys = StorageSettings::default();
    if let Some(user) = user {
        store
            .set(&keys.user_key, &serde_json::to_string(user).unwrap())
            .unwrap();
    }
    if let Some(refresh) = refresh {
        store.set(&keys.refresh_token_key, refresh).unwrap();
    }
    if let Some(access) = access {
        store.set(&keys.access_token_key, access).unwrap();
    }
}

/// True if none of the three session slots hold a value
pub fn session_slots_empty(store: &MemoryStore) -> bool {
    let keys = StorageSettings::default();
    [keys.access_token_key, keys.refresh_token_key, keys.user_key]
        .iter()
        .all(|key| store.get(key).is_none())
}
