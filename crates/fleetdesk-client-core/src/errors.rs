use fleetdesk_shared::api::ApiFailure;

use crate::transport::TransportError;

/// Failures of the session lifecycle operations
///
/// `Clone` so a single refresh outcome can be handed to every request that
/// was waiting on it
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("Invalid email or password: {0}")]
    InvalidCredentials(String),
    #[error("Network error: {0}")]
    Network(String),
    #[error("No refresh token is stored")]
    NoRefreshToken,
    #[error("Refresh rejected: {0}")]
    RefreshRejected(String),
    #[error("The session changed while the refresh was in flight")]
    Superseded,
    #[error("Failed to persist the session: {0}")]
    Storage(String),
    #[error("Unexpected response from the Auth API: {0}")]
    UnexpectedResponse(String),
}

/// Failures of a request sent through the [`crate::RequestAuthorizer`]
#[derive(thiserror::Error, Debug, Clone)]
pub enum RequestError {
    #[error("Network error: {0}")]
    Network(String),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Request failed with status code {status}: {message}")]
    Status { status: u16, message: String },
    #[error(transparent)]
    Application(#[from] ApiFailure),
    #[error("Session could not be refreshed: {0}")]
    Refresh(SessionError),
    #[error("Failed to encode request: {0}")]
    Encode(String),
    #[error("Failed to decode response: {0}")]
    Decode(String),
}

impl SessionError {
    /// Returns `true` if the session error is [`InvalidCredentials`].
    ///
    /// [`InvalidCredentials`]: SessionError::InvalidCredentials
    #[must_use]
    pub fn is_invalid_credentials(&self) -> bool {
        matches!(self, Self::InvalidCredentials(..))
    }

    /// Returns `true` if the session error is [`Network`].
    ///
    /// [`Network`]: SessionError::Network
    #[must_use]
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network(..))
    }
}

impl RequestError {
    /// The HTTP status the failure carried, if it came from a response
    pub fn status(&self) -> Option<u16> {
        match self {
            RequestError::Unauthorized(_) => Some(401),
            RequestError::Forbidden(_) => Some(403),
            RequestError::Status { status, .. } => Some(*status),
            RequestError::Application(failure) => failure.status_code,
            RequestError::Network(_)
            | RequestError::Refresh(_)
            | RequestError::Encode(_)
            | RequestError::Decode(_) => None,
        }
    }

    /// Returns `true` if the request error is [`Unauthorized`].
    ///
    /// [`Unauthorized`]: RequestError::Unauthorized
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized(..))
    }
}

impl From<TransportError> for SessionError {
    fn from(value: TransportError) -> Self {
        Self::Network(value.to_string())
    }
}

impl From<TransportError> for RequestError {
    fn from(value: TransportError) -> Self {
        Self::Network(value.to_string())
    }
}
