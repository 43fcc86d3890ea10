//! HTTP operations against the Memo API. Each endpoint gets a small async
//! function that builds its own client, attaches the crate user agent and a
//! request deadline, and maps transport/status failures into
//! [`SessionError`] variants. Helpers here centralize URL normalization and
//! error-body mining so the per-endpoint code stays flat.

pub mod auth;
pub mod types;
pub mod users;

use crate::session::SessionError;
use reqwest::{Client, Response};
use serde_json::Value;
use std::time::Duration;
use url::Url;

pub(crate) static APP_USER_AGENT: &str =
    concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);

/// Deadline applied to every outbound request to avoid hanging callers.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

pub(crate) fn client() -> Result<Client, SessionError> {
    Client::builder()
        .user_agent(APP_USER_AGENT)
        .timeout(REQUEST_TIMEOUT)
        .build()
        .map_err(|err| SessionError::Network(format!("Failed to build HTTP client: {err}")))
}

/// Normalize a base URL and join an endpoint path onto it. A path prefix on
/// the base (the Memo API lives under `/api`) is preserved.
///
/// # Errors
/// Returns an error if `base_url` cannot be parsed, has no host, or uses an
/// unsupported scheme.
pub fn endpoint_url(base_url: &str, path: &str) -> Result<String, SessionError> {
    let url = Url::parse(base_url)
        .map_err(|err| SessionError::Config(format!("Error parsing URL: {err}")))?;

    let scheme = url.scheme();

    let host = url
        .host()
        .ok_or_else(|| SessionError::Config("Error parsing URL: no host specified".to_string()))?
        .to_owned();

    let port = match url.port() {
        Some(p) => p,
        None => match scheme {
            "http" => 80,
            "https" => 443,
            _ => {
                return Err(SessionError::Config(format!(
                    "Error parsing URL: unsupported scheme {scheme}"
                )))
            }
        },
    };

    let prefix = url.path().trim_end_matches('/');

    Ok(format!("{scheme}://{host}:{port}{prefix}{path}"))
}

/// Map transport failures, splitting out deadline expiry the way callers
/// want to surface it.
pub(crate) fn map_request_error(url: &str, err: &reqwest::Error) -> SessionError {
    if err.is_timeout() {
        SessionError::Timeout(format!("{url} - request timed out"))
    } else {
        SessionError::Network(format!("{url} - {err}"))
    }
}

/// Build a [`SessionError::Server`] from a non-2xx response, using the
/// server's `{message}` body when present and `fallback` otherwise.
pub(crate) async fn error_from_response(
    response: Response,
    fallback: &str,
) -> SessionError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();

    let message = serde_json::from_str::<Value>(&body)
        .ok()
        .and_then(|json| {
            json.get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| fallback.to_string());

    SessionError::Server { status, message }
}
