//! This module stores the expected format of the arguments for the requests
//! sent to the Auth API

use secrecy::{ExposeSecret, SecretString};
use std::fmt::Debug;

use crate::token::RefreshToken;

#[derive(serde::Deserialize, Clone)]
pub struct LoginReqArgs {
    pub email: String,
    pub password: SecretString,
}

impl LoginReqArgs {
    pub fn new<S: Into<String>>(email: S, password: SecretString) -> Self {
        Self {
            email: email.into(),
            password,
        }
    }

    pub fn email(mut self, email: String) -> Self {
        self.email = email;
        self
    }

    pub fn password(mut self, password: SecretString) -> Self {
        self.password = password;
        self
    }

    /// The body sent on the wire. Only call right before sending as the
    /// result contains the password in plain text
    pub fn to_wire_json(&self) -> serde_json::Value {
        serde_json::json!({
            "email": self.email,
            "password": self.password.expose_secret(),
        })
    }
}

impl Debug for LoginReqArgs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginReqArgs")
            .field("email", &self.email)
            .field("has_password", &!self.password.expose_secret().is_empty())
            .finish()
    }
}

/// Body of `POST /auth/refresh` and `POST /auth/logout`
#[derive(Debug, Clone)]
pub struct RefreshReqArgs {
    pub refresh_token: RefreshToken,
}

impl RefreshReqArgs {
    pub fn new(refresh_token: RefreshToken) -> Self {
        Self { refresh_token }
    }

    /// See [`LoginReqArgs::to_wire_json`], the result carries the token in
    /// plain text
    pub fn to_wire_json(&self) -> serde_json::Value {
        serde_json::json!({ "refreshToken": self.refresh_token.expose_secret() })
    }
}
