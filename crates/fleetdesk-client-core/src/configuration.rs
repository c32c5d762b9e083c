//! Settings consumed by the session pipeline
//!
//! Every field has a default so library users can start from
//! [`ClientSettings::default`]. Binaries load them with
//! [`get_configuration`] which layers files and environment variables on top

use fleetdesk_shared::const_config::{client, route, storage};
use fleetdesk_time::Seconds;
use serde_aux::field_attributes::deserialize_number_from_string;
use std::path::PathBuf;

#[derive(serde::Deserialize, Clone, Debug, Default)]
pub struct ClientSettings {
    #[serde(default)]
    pub api: ApiSettings,
    #[serde(default)]
    pub storage: StorageSettings,
    #[serde(default)]
    pub routes: RouteSettings,
}

#[derive(serde::Deserialize, Clone, Debug)]
#[serde(default)]
pub struct ApiSettings {
    pub base_url: String,
    /// Selects between the live API and the local fixtures the dashboard can
    /// run against during development
    pub use_live_api: bool,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub request_timeout_secs: u64,
    /// Sent as `Accept-Language` when neither the user nor the session has a
    /// preference
    pub default_language: String,
}

/// Names of the durable storage slots. Changing them orphans existing
/// sessions
#[derive(serde::Deserialize, Clone, Debug)]
#[serde(default)]
pub struct StorageSettings {
    pub access_token_key: String,
    pub refresh_token_key: String,
    pub user_key: String,
    pub language_key: String,
    /// Only used by the native file backed store
    pub file_path: PathBuf,
}

#[derive(serde::Deserialize, Clone, Debug)]
#[serde(default)]
pub struct RouteSettings {
    pub login: String,
    pub dashboard: String,
    pub unauthorized: String,
}

impl ApiSettings {
    pub fn request_timeout(&self) -> Seconds {
        Seconds::new(self.request_timeout_secs)
    }
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: client::CLIENT_DEFAULT_API_BASE_URL.to_string(),
            use_live_api: true,
            request_timeout_secs: u64::from(client::CLIENT_REQUEST_TIMEOUT),
            default_language: client::CLIENT_DEFAULT_LANGUAGE.to_string(),
        }
    }
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            access_token_key: storage::STORAGE_ACCESS_TOKEN_KEY.to_string(),
            refresh_token_key: storage::STORAGE_REFRESH_TOKEN_KEY.to_string(),
            user_key: storage::STORAGE_USER_KEY.to_string(),
            language_key: storage::STORAGE_LANGUAGE_KEY.to_string(),
            file_path: PathBuf::from(storage::STORAGE_DEFAULT_FILE_PATH),
        }
    }
}

impl Default for RouteSettings {
    fn default() -> Self {
        Self {
            login: route::ROUTE_LOGIN.to_string(),
            dashboard: route::ROUTE_DASHBOARD.to_string(),
            unauthorized: route::ROUTE_UNAUTHORIZED.to_string(),
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
pub use loading::{get_configuration, Environment};

#[cfg(not(target_arch = "wasm32"))]
mod loading {
    use anyhow::Context as _;

    use super::ClientSettings;

    /// Reads `configuration/base.toml`, then `configuration/<environment>.toml`
    /// and finally any `APP_` prefixed environment variables. Missing files are
    /// skipped so the defaults apply
    pub fn get_configuration() -> anyhow::Result<ClientSettings> {
        let base_path = std::env::current_dir().context("failed to determine the current directory")?;
        let configuration_directory = base_path.join("configuration");

        // Detect the running environment.
        // Default to `local` if unspecified.
        let environment: Environment = std::env::var("APP_ENVIRONMENT")
            .unwrap_or_else(|_| "local".into())
            .try_into()
            .map_err(|e: String| anyhow::anyhow!(e))
            .context("failed to parse APP_ENVIRONMENT")?;
        let environment_filename = format!("{}.toml", environment.as_str());
        let settings = config::Config::builder()
            .add_source(
                config::File::from(configuration_directory.join("base.toml")).required(false),
            )
            .add_source(
                config::File::from(configuration_directory.join(environment_filename))
                    .required(false),
            )
            // Add in settings from environment variables (with a prefix of APP and '__' as separator)
            // E.g. `APP_API__BASE_URL=https://fleet.example/api` would set `ClientSettings.api.base_url`
            .add_source(
                config::Environment::with_prefix("APP")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()
            .context("failed to build configuration")?;

        settings
            .try_deserialize::<ClientSettings>()
            .context("failed to deserialize configuration")
    }

    /// The possible runtime environment for our application.
    #[derive(Debug, PartialEq, Eq)]
    pub enum Environment {
        Local,
        Production,
    }

    impl Environment {
        pub fn as_str(&self) -> &'static str {
            match self {
                Environment::Local => "local",
                Environment::Production => "production",
            }
        }
    }

    impl TryFrom<String> for Environment {
        type Error = String;

        fn try_from(s: String) -> Result<Self, Self::Error> {
            match s.to_lowercase().as_str() {
                "local" => Ok(Self::Local),
                "production" => Ok(Self::Production),
                other => Err(format!(
                    "{other} is not a supported environment. Use either `local` or `production`."
                )),
            }
        }
    }
}
