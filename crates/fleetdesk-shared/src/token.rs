//! Bearer credentials issued by the Auth API
//!
//! Both tokens are opaque to the client with one exception: the access token
//! is a JWT and its `exp` claim is read (never verified) to decide locally if
//! a stored session is still worth restoring

use anyhow::{bail, Context as _};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use fleetdesk_time::Timestamp;
use secrecy::{ExposeSecret as _, SecretString};
use std::fmt::Debug;

#[derive(Clone, serde::Deserialize)]
pub struct AccessToken(SecretString);

#[derive(Clone, serde::Deserialize)]
pub struct RefreshToken(SecretString);

/// The subset of JWT claims the client cares about
#[derive(Debug, serde::Deserialize, PartialEq, Eq)]
pub struct TokenClaims {
    pub exp: Option<u64>,
    pub sub: Option<String>,
}

impl AccessToken {
    pub fn new<S: Into<String>>(value: S) -> Self {
        Self(SecretString::from(value.into()))
    }

    pub fn expose_secret(&self) -> &str {
        self.0.expose_secret()
    }

    /// Decodes the payload segment of the JWT without checking the signature
    pub fn claims(&self) -> anyhow::Result<TokenClaims> {
        let mut segments = self.expose_secret().split('.');
        let (Some(_header), Some(payload), Some(_signature)) =
            (segments.next(), segments.next(), segments.next())
        else {
            bail!("access token is not a JWT (expected three segments)");
        };
        let payload = URL_SAFE_NO_PAD
            .decode(payload.trim_end_matches('='))
            .context("failed to base64 decode token payload")?;
        serde_json::from_slice(&payload).context("failed to parse token payload as json")
    }

    /// The expiry embedded in the token, `None` if it cannot be read
    pub fn expires_at(&self) -> Option<Timestamp> {
        self.claims()
            .ok()?
            .exp
            .map(Timestamp::from_secs_since_unix_epoch)
    }

    /// Returns true unless the token carries an expiry that is still in the
    /// future by the local clock. Tokens without a readable expiry count as
    /// expired
    pub fn is_expired_locally(&self) -> bool {
        self.expires_at().map_or(true, |exp| exp.is_past())
    }
}

impl RefreshToken {
    pub fn new<S: Into<String>>(value: S) -> Self {
        Self(SecretString::from(value.into()))
    }

    pub fn expose_secret(&self) -> &str {
        self.0.expose_secret()
    }
}

impl PartialEq for AccessToken {
    fn eq(&self, other: &Self) -> bool {
        self.expose_secret() == other.expose_secret()
    }
}

impl Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessToken")
            .field("expires_at", &self.expires_at())
            .finish_non_exhaustive()
    }
}

impl Debug for RefreshToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RefreshToken(..)")
    }
}
