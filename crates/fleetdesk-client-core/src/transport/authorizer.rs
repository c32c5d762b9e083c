//! Sends API requests on behalf of the session
//!
//! Adds the bearer token and language to every request outside the anonymous
//! allow list and recovers from an expired access token by refreshing once
//! and resending. A `403` sends the user to the unauthorized view

use fleetdesk_shared::{
    const_config::path::is_anonymous,
    token::AccessToken,
};
use reqwest::{header, multipart, Method, StatusCode};
use tracing::{debug, info, warn};

use super::{fetch_reply, HttpReply};
use crate::{NavigationTarget, RequestError, SessionError, SessionManager};

/// A request relative to the API base url. Kept as plain data so it can be
/// sent a second time after a refresh
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: RequestBody,
}

#[derive(Debug, Clone, Default)]
pub enum RequestBody {
    #[default]
    Empty,
    Json(serde_json::Value),
    Multipart(Vec<MultipartPart>),
}

#[derive(Clone)]
pub enum MultipartPart {
    Text {
        name: String,
        value: String,
    },
    File {
        name: String,
        file_name: String,
        mime: Option<String>,
        bytes: Vec<u8>,
    },
}

impl std::fmt::Debug for MultipartPart {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text { name, value } => f
                .debug_struct("Text")
                .field("name", name)
                .field("value", value)
                .finish(),
            Self::File {
                name,
                file_name,
                mime,
                bytes,
            } => f
                .debug_struct("File")
                .field("name", name)
                .field("file_name", file_name)
                .field("mime", mime)
                .field("len", &bytes.len())
                .finish(),
        }
    }
}

impl ApiRequest {
    pub fn new<S: Into<String>>(method: Method, path: S) -> Self {
        Self {
            method,
            path: path.into(),
            query: vec![],
            body: RequestBody::Empty,
        }
    }

    pub fn get<S: Into<String>>(path: S) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post<S: Into<String>>(path: S) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put<S: Into<String>>(path: S) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn delete<S: Into<String>>(path: S) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn with_query<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn json<T: serde::Serialize + ?Sized>(mut self, body: &T) -> Result<Self, RequestError> {
        let value = serde_json::to_value(body).map_err(|e| RequestError::Encode(e.to_string()))?;
        self.body = RequestBody::Json(value);
        Ok(self)
    }

    pub fn multipart(mut self, parts: Vec<MultipartPart>) -> Self {
        self.body = RequestBody::Multipart(parts);
        self
    }

    /// Appends a text field, switching the body to multipart if needed
    pub fn text_part<N: Into<String>, V: Into<String>>(self, name: N, value: V) -> Self {
        self.push_part(MultipartPart::Text {
            name: name.into(),
            value: value.into(),
        })
    }

    /// Appends a file field, switching the body to multipart if needed
    pub fn file_part<N: Into<String>, F: Into<String>>(
        self,
        name: N,
        file_name: F,
        mime: Option<&str>,
        bytes: Vec<u8>,
    ) -> Self {
        self.push_part(MultipartPart::File {
            name: name.into(),
            file_name: file_name.into(),
            mime: mime.map(str::to_string),
            bytes,
        })
    }

    fn push_part(mut self, part: MultipartPart) -> Self {
        match &mut self.body {
            RequestBody::Multipart(parts) => parts.push(part),
            _ => self.body = RequestBody::Multipart(vec![part]),
        }
        self
    }
}

#[derive(Debug, Clone)]
pub struct RequestAuthorizer {
    session: SessionManager,
}

impl RequestAuthorizer {
    pub fn new(session: SessionManager) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    /// Sends `request` and returns the reply if its status is a success
    ///
    /// A `401` on a request that carried a token triggers one refresh and one
    /// resend. The resent request's outcome is returned as is. If the refresh
    /// fails the session has ended and the refresh error is returned instead
    #[tracing::instrument(skip(self, request), fields(method = %request.method, path = %request.path))]
    pub async fn send(&self, request: ApiRequest) -> Result<HttpReply, RequestError> {
        if is_anonymous(&request.path) {
            let reply = self.dispatch(&request, None).await?;
            return self.classify(reply, false);
        }

        let sent_token = self.session.access_token();
        let reply = self.dispatch(&request, sent_token.as_ref()).await?;
        if reply.status != StatusCode::UNAUTHORIZED {
            return self.classify(reply, true);
        }
        let Some(sent_token) = sent_token else {
            debug!("401 without a token attached, nothing to refresh");
            return self.classify(reply, true);
        };

        let retry_token = match self.session.access_token() {
            Some(current) if current != sent_token => {
                debug!("token was replaced while this request was in flight");
                current
            }
            _ => self.refreshed_token().await?,
        };
        info!("retrying with refreshed token");
        let reply = self.dispatch(&request, Some(&retry_token)).await?;
        self.classify(reply, true)
    }

    /// Sends `request` and unwraps the `data` of the response envelope
    #[tracing::instrument(skip(self, request), fields(method = %request.method, path = %request.path))]
    pub async fn send_json<T: serde::de::DeserializeOwned>(
        &self,
        request: ApiRequest,
    ) -> Result<T, RequestError> {
        let reply = self.send(request).await?;
        let envelope = reply
            .envelope::<T>()
            .map_err(|e| RequestError::Decode(e.to_string()))?;
        Ok(envelope.into_result()?)
    }

    async fn refreshed_token(&self) -> Result<AccessToken, RequestError> {
        match self.session.refresh().await {
            Ok(session) => Ok(session.access_token),
            // Login or logout happened meanwhile, go with whatever is stored now
            Err(SessionError::Superseded) => self
                .session
                .access_token()
                .ok_or(RequestError::Refresh(SessionError::Superseded)),
            Err(e) => {
                warn!(?e, "refresh failed");
                Err(RequestError::Refresh(e))
            }
        }
    }

    async fn dispatch(
        &self,
        request: &ApiRequest,
        token: Option<&AccessToken>,
    ) -> Result<HttpReply, RequestError> {
        let mut builder = self
            .session
            .http()
            .request(request.method.clone(), self.session.url(&request.path));
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(token) = token {
            builder = builder
                .bearer_auth(token.expose_secret())
                .header(header::ACCEPT_LANGUAGE, self.session.language());
        }
        builder = match &request.body {
            RequestBody::Empty => builder.header(header::CONTENT_TYPE, "application/json"),
            RequestBody::Json(value) => builder.json(value),
            // Content type (with boundary) is set by reqwest
            RequestBody::Multipart(parts) => builder.multipart(build_form(parts)?),
        };
        Ok(fetch_reply(builder).await?)
    }

    fn classify(&self, reply: HttpReply, redirect_forbidden: bool) -> Result<HttpReply, RequestError> {
        let status = reply.status;
        if status.is_success() {
            return Ok(reply);
        }
        let message = reply.failure_message();
        match status {
            StatusCode::UNAUTHORIZED => Err(RequestError::Unauthorized(message)),
            StatusCode::FORBIDDEN => {
                if redirect_forbidden {
                    info!("forbidden, redirecting to unauthorized view");
                    self.session.navigator().navigate(NavigationTarget::push(
                        &self.session.settings().routes.unauthorized,
                    ));
                }
                Err(RequestError::Forbidden(message))
            }
            _ => Err(RequestError::Status {
                status: status.as_u16(),
                message,
            }),
        }
    }
}

fn build_form(parts: &[MultipartPart]) -> Result<multipart::Form, RequestError> {
    let mut form = multipart::Form::new();
    for part in parts {
        form = match part {
            MultipartPart::Text { name, value } => form.text(name.clone(), value.clone()),
            MultipartPart::File {
                name,
                file_name,
                mime,
                bytes,
            } => {
                let mut file = multipart::Part::bytes(bytes.clone()).file_name(file_name.clone());
                if let Some(mime) = mime {
                    file = file
                        .mime_str(mime)
                        .map_err(|e| RequestError::Encode(e.to_string()))?;
                }
                form.part(name.clone(), file)
            }
        };
    }
    Ok(form)
}
