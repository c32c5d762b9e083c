//! Thin layer over `reqwest` shared by the session manager and the request
//! authorizer
//!
//! Requests are driven by `reqwest_cross::fetch` so they run as their own task
//! on the runtime (or the browser event loop). Dropping the caller therefore
//! does not cancel a login or refresh that is already on the wire

use fleetdesk_shared::api::ApiResponse;
use futures::channel::oneshot;
use reqwest::{header, StatusCode};
use std::{fmt::Debug, future::Future};
use tracing::{debug, info};

use crate::ApiSettings;

pub mod authorizer;

/// A response that has been fully read
#[derive(Debug, Clone)]
pub struct HttpReply {
    pub status: StatusCode,
    pub body: String,
}

#[derive(thiserror::Error, Debug, Clone)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,
    #[error("failed to send request: {0}")]
    Send(String),
    #[error("failed to read response body: {0}")]
    Body(String),
    #[error("request task ended without producing a response")]
    Dropped,
}

impl HttpReply {
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_str(&self.body)
    }

    pub fn envelope<T: serde::de::DeserializeOwned>(
        &self,
    ) -> Result<ApiResponse<T>, serde_json::Error> {
        self.json()
    }

    /// Best effort human readable reason for a failed response. Prefers the
    /// envelope message, then the raw body, then the status reason
    pub fn failure_message(&self) -> String {
        if let Ok(envelope) = self.envelope::<serde_json::Value>() {
            if let Some(msg) = envelope.message.filter(|x| !x.is_empty()) {
                return msg;
            }
        }
        if !self.body.trim().is_empty() {
            return self.body.clone();
        }
        match self.status.canonical_reason() {
            Some(reason) => format!("request failed with status code: {} {reason}", self.status.as_u16()),
            None => format!("request failed with status code: {}", self.status.as_u16()),
        }
    }
}

/// Builds the one `reqwest::Client` every request in the pipeline goes
/// through
pub fn build_http_client(settings: &ApiSettings) -> anyhow::Result<reqwest::Client> {
    let mut default_headers = header::HeaderMap::new();
    default_headers.insert(
        header::ACCEPT,
        header::HeaderValue::from_static("application/json"),
    );
    let builder = reqwest::Client::builder().default_headers(default_headers);

    // Timeouts are only configurable on native, in the browser the fetch API
    // applies its own
    #[cfg(not(target_arch = "wasm32"))]
    let builder = builder.timeout(settings.request_timeout().into());
    #[cfg(target_arch = "wasm32")]
    let _ = settings;

    builder
        .build()
        .map_err(|e| anyhow::anyhow!("unable to create reqwest client: {e}"))
}

#[tracing::instrument(skip(request))]
// WARNING: Must skip request as it may contain credentials
pub(crate) async fn fetch_reply(
    request: reqwest::RequestBuilder,
) -> Result<HttpReply, TransportError> {
    let (tx, rx) = oneshot::channel();
    let on_done = move |resp: reqwest::Result<reqwest::Response>| async move {
        let reply = read_reply(resp).await;
        if tx.send(reply).is_err() {
            debug!("caller stopped waiting before the response arrived");
        }
    };
    reqwest_cross::fetch(request, on_done);
    rx.await.map_err(|_| TransportError::Dropped)?
}

/// Starts `future` on its own task right away and returns a handle to its
/// output. Dropping the handle leaves the task running. `None` means the task
/// died without producing a value
#[cfg(not(target_arch = "wasm32"))]
pub(crate) fn spawn_detached<F>(future: F) -> impl Future<Output = Option<F::Output>> + Send
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    let handle = tokio::spawn(future);
    async move {
        handle
            .await
            .inspect_err(|e| tracing::error!(?e, "detached task failed"))
            .ok()
    }
}

/// Starts `future` on its own task right away and returns a handle to its
/// output. Dropping the handle leaves the task running. `None` means the task
/// died without producing a value
#[cfg(target_arch = "wasm32")]
pub(crate) fn spawn_detached<F>(future: F) -> impl Future<Output = Option<F::Output>>
where
    F: Future + 'static,
    F::Output: 'static,
{
    let (tx, rx) = oneshot::channel();
    wasm_bindgen_futures::spawn_local(async move {
        if tx.send(future.await).is_err() {
            debug!("caller stopped waiting before the task finished");
        }
    });
    async move { rx.await.ok() }
}

async fn read_reply(
    response: reqwest::Result<reqwest::Response>,
) -> Result<HttpReply, TransportError> {
    let response = response.map_err(|e| {
        info!("Response is err: {e:?}");
        classify_reqwest_error(&e)
    })?;
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| classify_reqwest_error(&e))?;
    Ok(HttpReply { status, body })
}

fn classify_reqwest_error(e: &reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::Timeout
    } else if e.is_body() || e.is_decode() {
        TransportError::Body(e.to_string())
    } else {
        TransportError::Send(e.to_string())
    }
}
