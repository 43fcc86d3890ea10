//! In-memory session state. Tokens are opaque `SecretString`s held as a
//! pair (both present or both absent); the profile is the normalized form
//! of the server payload with the display name computed at construction.

use crate::api::types::ProfilePayload;
use secrecy::SecretString;
use serde_json::{Map, Value};

/// Opaque access/refresh token pair. The two travel together: they are
/// stored, rotated, and cleared as a unit.
#[derive(Clone, Debug)]
pub struct TokenPair {
    access_token: SecretString,
    refresh_token: SecretString,
}

impl TokenPair {
    #[must_use]
    pub fn new(access_token: &str, refresh_token: &str) -> Self {
        Self {
            access_token: SecretString::from(access_token.to_string()),
            refresh_token: SecretString::from(refresh_token.to_string()),
        }
    }

    #[must_use]
    pub fn access_token(&self) -> &SecretString {
        &self.access_token
    }

    #[must_use]
    pub fn refresh_token(&self) -> &SecretString {
        &self.refresh_token
    }
}

/// Normalized user profile. `full_name` is derived from the name fields
/// whenever a profile is rebuilt from a server payload; it is never read
/// from the wire or persisted on its own.
#[derive(Clone, Debug)]
pub struct UserProfile {
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
    pub email: Option<String>,
    pub department: Option<String>,
    pub rank: Option<String>,
    /// Extensible fields the server may add without a client release.
    pub extra: Map<String, Value>,
}

impl UserProfile {
    #[must_use]
    pub fn from_payload(payload: ProfilePayload) -> Self {
        let full_name = format!("{} {}", payload.first_name, payload.last_name);

        Self {
            first_name: payload.first_name,
            last_name: payload.last_name,
            full_name,
            email: payload.email,
            department: payload.department.map(|d| d.name),
            rank: payload.rank.map(|r| r.name),
            extra: payload.extra,
        }
    }
}

/// The session manager's owned state.
///
/// `generation` counts sessions: it moves on logout, teardown, and each
/// newly established session. Async completions capture the generation
/// before their first await and are discarded when it has moved, so a
/// stale result can never resurrect a cleared session.
#[derive(Clone, Debug, Default)]
pub struct SessionState {
    pub tokens: Option<TokenPair>,
    pub profile: Option<UserProfile>,
    pub loading: bool,
    pub generation: u64,
}

impl SessionState {
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.tokens.is_some()
    }
}
