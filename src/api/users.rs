//! Current-user endpoint. The profile is normalized on the way in: the
//! display name is computed from the name fields and reference objects are
//! flattened, so callers never see the raw envelope.

use crate::api::types::ProfileEnvelope;
use crate::api::{client, endpoint_url, error_from_response, map_request_error};
use crate::session::{SessionError, UserProfile};
use secrecy::{ExposeSecret, SecretString};
use tracing::{info_span, Instrument};

/// Fetch the authenticated user's profile with bearer authorization.
///
/// # Errors
/// Returns an error if the request fails, the server rejects the access
/// token, or the payload cannot be decoded.
pub async fn profile_me(
    base_url: &str,
    access_token: &SecretString,
) -> Result<UserProfile, SessionError> {
    let client = client()?;
    let profile_url = endpoint_url(base_url, "/users/profile/me")?;

    let span = info_span!(
        "memo.profile_me",
        http.method = "GET",
        url = %profile_url
    );
    let response = client
        .get(&profile_url)
        .bearer_auth(access_token.expose_secret())
        .send()
        .instrument(span)
        .await
        .map_err(|err| map_request_error(&profile_url, &err))?;

    if !response.status().is_success() {
        return Err(error_from_response(response, "Failed to fetch profile").await);
    }

    let envelope: ProfileEnvelope = response
        .json()
        .await
        .map_err(|err| SessionError::Parse(format!("Failed to decode response: {err}")))?;

    Ok(UserProfile::from_payload(envelope.data))
}
