//! Owns the session. Every change to the stored credentials and to the
//! observable session state goes through [`SessionManager`]

use std::{
    fmt::Debug,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex,
    },
};

use fleetdesk_shared::{
    api::AuthPayload,
    const_config::path::{PATH_AUTH_LOGIN, PATH_AUTH_LOGOUT, PATH_AUTH_REFRESH},
    req_args::{LoginReqArgs, RefreshReqArgs},
    token::AccessToken,
    uac::{Permission, UserInfo},
};
use futures::{future::Shared, FutureExt as _};
use reqwest::StatusCode;
use tokio::sync::watch;
use tracing::{debug, error, info, warn, Instrument as _};

use crate::{
    navigation::{NavigationTarget, Navigator},
    transport::{build_http_client, fetch_reply, spawn_detached, HttpReply},
    ClientSettings, SessionError,
};

use self::{
    credentials::CredentialStore,
    state::{Session, SessionSnapshot, SessionState},
    storage::KeyValueStore,
};

pub mod credentials;
pub mod state;
pub mod storage;

type RefreshOutcome = Result<Session, SessionError>;

#[cfg(not(target_arch = "wasm32"))]
type RefreshFuture = futures::future::BoxFuture<'static, RefreshOutcome>;
#[cfg(target_arch = "wasm32")]
type RefreshFuture = futures::future::LocalBoxFuture<'static, RefreshOutcome>;

/// Cheap to clone handle, all clones share the same session
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<SessionManagerInner>,
}

struct SessionManagerInner {
    http: reqwest::Client,
    settings: ClientSettings,
    credentials: CredentialStore,
    state: Arc<SessionState>,
    navigator: Arc<dyn Navigator>,
    /// The refresh every caller joins while it is still running. Emptied by
    /// the refresh task when it finishes
    refresh_in_flight: Mutex<Option<Shared<RefreshFuture>>>,
    /// Bumped by login and logout. A refresh that finishes after the epoch
    /// moved must not write its result
    epoch: AtomicU64,
    /// Held while credentials and state are being changed together
    writer: Mutex<()>,
}

impl Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("base_url", &self.inner.settings.api.base_url)
            .field("snapshot", &self.inner.state.snapshot())
            .finish_non_exhaustive()
    }
}

impl SessionManager {
    /// Creates the manager and restores any session left in `store`
    ///
    /// The stored session is only restored if its access token has not
    /// expired by the local clock and the user record is present. Anything
    /// else is cleared. Nothing is sent to the server
    #[tracing::instrument(name = "NEW SESSION MANAGER", skip(store, navigator))]
    pub fn new(
        settings: ClientSettings,
        store: Arc<dyn KeyValueStore>,
        navigator: Arc<dyn Navigator>,
    ) -> anyhow::Result<Self> {
        let http = build_http_client(&settings.api)?;
        let credentials = CredentialStore::new(store, settings.storage.clone());
        let result = Self {
            inner: Arc::new(SessionManagerInner {
                http,
                settings,
                credentials,
                state: Arc::new(SessionState::new()),
                navigator,
                refresh_in_flight: Mutex::new(None),
                epoch: AtomicU64::new(0),
                writer: Mutex::new(()),
            }),
        };
        result.revalidate_local();
        Ok(result)
    }

    /// Signs in and stores the issued session
    ///
    /// The request and the commit run on their own task, so a caller that
    /// stops waiting does not lose a session the server has already issued
    #[tracing::instrument(ret, err(Debug), skip(self))]
    pub async fn login(&self, args: LoginReqArgs) -> Result<Session, SessionError> {
        let _loading = self.inner.state.begin_operation();
        let this = self.clone();
        spawn_detached(async move { this.login_and_commit(args).await }.in_current_span())
            .await
            .unwrap_or_else(|| Err(SessionError::Network("login task ended unexpectedly".into())))
    }

    async fn login_and_commit(&self, args: LoginReqArgs) -> Result<Session, SessionError> {
        let request = self
            .inner
            .http
            .request(PATH_AUTH_LOGIN.method, self.url(PATH_AUTH_LOGIN.path))
            .json(&args.to_wire_json());
        let reply = fetch_reply(request).await?;
        let session = parse_auth_reply(&reply, SessionError::InvalidCredentials)?;

        {
            let _writer = self.inner.writer.lock().expect("mutex poisoned");
            self.inner.epoch.fetch_add(1, Ordering::SeqCst);
            self.commit_locked(&session)?;
        }

        if self.inner.credentials.language().is_none() {
            if let Some(language) = session.user.preferred_language.as_deref() {
                if let Err(e) = self.inner.credentials.set_language(language) {
                    warn!(?e, "failed to store preferred language");
                }
            }
        }
        info!(
            user_id = %session.user.id,
            expires_in = ?session.expires_at.and_then(|x| x.remaining()),
            "logged in"
        );
        Ok(session)
    }

    /// Clears the session and sends the user to the login screen
    ///
    /// Cannot fail and is safe to call when already logged out
    #[tracing::instrument(skip(self))]
    pub fn logout(&self) {
        {
            let _writer = self.inner.writer.lock().expect("mutex poisoned");
            self.inner.epoch.fetch_add(1, Ordering::SeqCst);
            self.clear_locked();
        }
        info!("logged out");
        self.navigate_to_login();
    }

    /// Same as [`Self::logout`] but also tells the server to revoke the refresh
    /// token. Local state is cleared first and the server call is best effort
    #[tracing::instrument(skip(self))]
    pub async fn logout_and_notify_server(&self) {
        let access_token = self.inner.credentials.access_token();
        let refresh_token = self.inner.credentials.refresh_token();
        self.logout();
        let Some(refresh_token) = refresh_token else {
            debug!("no refresh token to revoke");
            return;
        };
        let mut request = self
            .inner
            .http
            .request(PATH_AUTH_LOGOUT.method, self.url(PATH_AUTH_LOGOUT.path))
            .json(&RefreshReqArgs::new(refresh_token).to_wire_json());
        if let Some(token) = access_token {
            request = request.bearer_auth(token.expose_secret());
        }
        match fetch_reply(request).await {
            Ok(reply) if reply.status.is_success() => debug!("server acknowledged logout"),
            Ok(reply) => warn!(status = %reply.status, "server rejected logout notification"),
            Err(e) => warn!(?e, "failed to notify server of logout"),
        }
    }

    /// Exchanges the refresh token for a new session
    ///
    /// Concurrent callers share one request to the server and all receive its
    /// outcome. The refresh runs on its own task and stores its result even
    /// if every caller stops waiting. Any failure other than
    /// [`SessionError::Superseded`] ends the session as [`Self::logout`] would
    #[tracing::instrument(skip(self))]
    pub async fn refresh(&self) -> Result<Session, SessionError> {
        let _loading = self.inner.state.begin_operation();
        let shared = {
            let mut in_flight = self.inner.refresh_in_flight.lock().expect("mutex poisoned");
            match in_flight.as_ref() {
                Some(existing) => {
                    debug!("joining refresh already in flight");
                    existing.clone()
                }
                None => {
                    let this = self.clone();
                    let task = spawn_detached(
                        async move {
                            let outcome = this.refresh_once().await;
                            // Later callers start a new refresh
                            this.inner
                                .refresh_in_flight
                                .lock()
                                .expect("mutex poisoned")
                                .take();
                            outcome
                        }
                        .in_current_span(),
                    );
                    let fut: RefreshFuture = Box::pin(async move {
                        task.await.unwrap_or_else(|| {
                            Err(SessionError::Network("refresh task ended unexpectedly".into()))
                        })
                    });
                    let shared = fut.shared();
                    *in_flight = Some(shared.clone());
                    shared
                }
            }
        };
        shared.await
    }

    async fn refresh_once(&self) -> RefreshOutcome {
        let epoch = self.inner.epoch.load(Ordering::SeqCst);
        let outcome = match self.inner.credentials.refresh_token() {
            Some(refresh_token) => {
                let request = self
                    .inner
                    .http
                    .request(PATH_AUTH_REFRESH.method, self.url(PATH_AUTH_REFRESH.path))
                    .json(&RefreshReqArgs::new(refresh_token).to_wire_json());
                match fetch_reply(request).await {
                    Ok(reply) => parse_auth_reply(&reply, SessionError::RefreshRejected),
                    Err(e) => Err(e.into()),
                }
            }
            None => Err(SessionError::NoRefreshToken),
        };

        let result = {
            let _writer = self.inner.writer.lock().expect("mutex poisoned");
            if self.inner.epoch.load(Ordering::SeqCst) != epoch {
                info!("session changed while refreshing, discarding result");
                return Err(SessionError::Superseded);
            }
            match outcome {
                Ok(session) => self.commit_locked(&session).map(|()| session),
                Err(e) => {
                    self.inner.epoch.fetch_add(1, Ordering::SeqCst);
                    self.clear_locked();
                    Err(e)
                }
            }
        };
        match &result {
            Ok(session) => info!(
                user_id = %session.user.id,
                expires_in = ?session.expires_at.and_then(|x| x.remaining()),
                "session refreshed"
            ),
            Err(e) => {
                warn!(?e, "refresh failed, session ended");
                self.navigate_to_login();
            }
        }
        result
    }

    /// Runs the startup check again. Returns true if a session is still held
    #[tracing::instrument(ret, skip(self))]
    pub fn revalidate_local(&self) -> bool {
        let _writer = self.inner.writer.lock().expect("mutex poisoned");
        let credentials = &self.inner.credentials;
        let user = match credentials.access_token() {
            Some(token) if !token.is_expired_locally() => credentials.cached_user(),
            Some(_) => {
                info!("stored access token has expired");
                None
            }
            None => None,
        };
        match user {
            Some(user) => {
                let user = match self.inner.state.user() {
                    Some(current) if *current == user => current,
                    _ => Arc::new(user),
                };
                self.inner.state.set_user(Some(user));
                true
            }
            None => {
                if credentials.has_any_credentials() || self.inner.state.user().is_some() {
                    info!("discarding stale local session");
                    self.inner.epoch.fetch_add(1, Ordering::SeqCst);
                }
                self.clear_locked();
                false
            }
        }
    }

    /// Writes a new session. On storage failure everything is cleared so the
    /// stored slots and the state never disagree
    fn commit_locked(&self, session: &Session) -> Result<(), SessionError> {
        if let Err(e) = self.inner.credentials.store_session(session) {
            error!(?e, "failed to store session");
            self.clear_locked();
            return Err(SessionError::Storage(format!("{e:#}")));
        }
        self.inner.state.set_user(Some(Arc::clone(&session.user)));
        Ok(())
    }

    fn clear_locked(&self) {
        self.inner.credentials.clear();
        self.inner.state.set_user(None);
    }

    fn navigate_to_login(&self) {
        self.inner
            .navigator
            .navigate(NavigationTarget::replace(&self.inner.settings.routes.login));
    }

    pub fn is_authenticated(&self) -> bool {
        self.inner.state.user().is_some()
    }

    pub fn current_user(&self) -> Option<Arc<UserInfo>> {
        self.inner.state.user()
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.current_user().is_some_and(|user| user.has_role(role))
    }

    pub fn has_any_role<S: AsRef<str>>(&self, roles: &[S]) -> bool {
        self.current_user()
            .is_some_and(|user| user.has_any_role(roles))
    }

    pub fn has_permission(&self, permission: &str) -> bool {
        self.current_user()
            .is_some_and(|user| user.has_permission(&Permission::from(permission)))
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.inner.state.snapshot()
    }

    /// Receives a new snapshot whenever the user or the loading flag changes
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.inner.state.subscribe()
    }

    /// The access token currently in storage, if any
    pub fn access_token(&self) -> Option<AccessToken> {
        self.inner.credentials.access_token()
    }

    /// Stored preference, then the user's preferred language, then the
    /// configured default
    pub fn language(&self) -> String {
        self.inner
            .credentials
            .language()
            .or_else(|| {
                self.current_user()
                    .and_then(|user| user.preferred_language.clone())
                    .filter(|x| !x.is_empty())
            })
            .unwrap_or_else(|| self.inner.settings.api.default_language.clone())
    }

    /// Kept across logout
    #[tracing::instrument(skip(self))]
    pub fn set_language(&self, language: &str) -> anyhow::Result<()> {
        self.inner.credentials.set_language(language)
    }

    pub fn settings(&self) -> &ClientSettings {
        &self.inner.settings
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.inner.http
    }

    pub(crate) fn navigator(&self) -> &dyn Navigator {
        self.inner.navigator.as_ref()
    }

    pub(crate) fn url(&self, path: &str) -> String {
        let base = self.inner.settings.api.base_url.trim_end_matches('/');
        if path.starts_with('/') {
            format!("{base}{path}")
        } else {
            format!("{base}/{path}")
        }
    }
}

/// Maps the reply of login or refresh to a session. `rejected` wraps the
/// reason when the server turned the request down
fn parse_auth_reply(
    reply: &HttpReply,
    rejected: fn(String) -> SessionError,
) -> Result<Session, SessionError> {
    let status = reply.status;
    if status.is_success() {
        let envelope = reply
            .envelope::<AuthPayload>()
            .map_err(|e| SessionError::UnexpectedResponse(format!("invalid auth payload: {e}")))?;
        return envelope
            .into_result()
            .map(Session::from)
            .map_err(|failure| rejected(failure.message));
    }
    if status.is_client_error() && status != StatusCode::REQUEST_TIMEOUT {
        Err(rejected(reply.failure_message()))
    } else {
        Err(SessionError::UnexpectedResponse(reply.failure_message()))
    }
}
