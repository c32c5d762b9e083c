//! Runs one [`Command`] against the session stored on disk

use anyhow::{bail, Context as _};
use fleetdesk_client_core::{
    ApiRequest, ClientSettings, FileStore, HistoryNavigator, KeyValueStore, RequestAuthorizer,
    SessionManager,
};
use fleetdesk_shared::req_args::LoginReqArgs;
use secrecy::SecretString;
use std::{io::Write, sync::Arc};
use tracing::info;

use crate::cli::Command;

/// The session pipeline wired up for a terminal
#[derive(Debug, Clone)]
pub struct FleetClient {
    pub session: SessionManager,
    pub authorizer: RequestAuthorizer,
    pub navigator: Arc<HistoryNavigator>,
}

impl FleetClient {
    pub fn new(settings: ClientSettings, store: Arc<dyn KeyValueStore>) -> anyhow::Result<Self> {
        let navigator = Arc::new(HistoryNavigator::new());
        let session = SessionManager::new(settings, store, navigator.clone())?;
        let authorizer = RequestAuthorizer::new(session.clone());
        Ok(Self {
            session,
            authorizer,
            navigator,
        })
    }

    /// Opens the session file named in `settings`
    pub fn from_settings(settings: ClientSettings) -> anyhow::Result<Self> {
        if !settings.api.use_live_api {
            bail!("use_live_api is disabled but the cli has no offline fixtures to fall back on");
        }
        let store = FileStore::open(settings.storage.file_path.clone());
        Self::new(settings, Arc::new(store))
    }
}

#[tracing::instrument(skip_all)]
pub async fn execute<W: Write>(
    command: Command,
    client: &FleetClient,
    out: &mut W,
) -> anyhow::Result<()> {
    match command {
        Command::Login { email, password } => {
            let args = LoginReqArgs::new(email, SecretString::from(password));
            let session = client.session.login(args).await?;
            writeln!(
                out,
                "Signed in as {} ({})",
                session.user.email, session.user.role
            )?;
        }
        Command::Whoami => match client.session.current_user() {
            Some(user) => {
                let user = serde_json::to_string_pretty(user.as_ref())
                    .context("failed to format user")?;
                writeln!(out, "{user}")?;
            }
            None => writeln!(out, "Not signed in")?,
        },
        Command::Logout => {
            let was_signed_in = client.session.is_authenticated();
            client.session.logout_and_notify_server().await;
            if was_signed_in {
                writeln!(out, "Signed out")?;
            } else {
                writeln!(out, "Not signed in")?;
            }
        }
        Command::Get { path } => {
            let reply = client.authorizer.send(ApiRequest::get(path)).await;
            if let Some(location) = client.navigator.current() {
                info!(?location, "navigation requested while sending");
            }
            let reply = reply?;
            let body = match reply.json::<serde_json::Value>() {
                Ok(value) => serde_json::to_string_pretty(&value)
                    .context("failed to format response body")?,
                Err(_) => reply.body,
            };
            writeln!(out, "{body}")?;
        }
    }
    Ok(())
}
