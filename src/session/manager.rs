//! The session manager. It is the single writer of [`SessionState`]: it
//! restores a persisted token pair at startup, drives the login / register /
//! refresh / logout transitions, and transparently replays one 401'd
//! authorized request after a silent token refresh.
//!
//! Every async path captures the session generation before its first await;
//! writes are skipped once the generation has moved, so a logout always wins
//! against whatever was still in flight.

use super::{refresh, SessionError, SessionState, TokenPair, TokenStore, UserProfile};
use crate::api;
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Default period between proactive token refreshes.
pub const DEFAULT_REFRESH_PERIOD: Duration = Duration::from_secs(5 * 60);

#[derive(Clone, Debug)]
pub struct SessionConfig {
    /// Base URL of the Memo API, including any path prefix.
    pub api_url: String,
    /// Location of the durable token file.
    pub token_file: PathBuf,
    /// Period of the background refresh timer.
    pub refresh_period: Duration,
}

impl SessionConfig {
    #[must_use]
    pub fn new(api_url: String, token_file: PathBuf) -> Self {
        Self {
            api_url,
            token_file,
            refresh_period: DEFAULT_REFRESH_PERIOD,
        }
    }
}

/// Cloneable handle to the shared session. All clones see the same state;
/// only this type mutates it.
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<Inner>,
}

struct Inner {
    config: SessionConfig,
    store: TokenStore,
    state: Mutex<SessionState>,
}

impl SessionManager {
    /// Build a manager, reading the token file synchronously. A stored pair
    /// leaves the session loading until [`SessionManager::hydrate`] resolves
    /// the profile; an absent or unreadable file starts the session
    /// unauthenticated with no error surfaced.
    #[must_use]
    pub fn new(config: SessionConfig) -> Self {
        let store = TokenStore::new(config.token_file.clone());
        let tokens = store.load();
        let loading = tokens.is_some();

        let state = SessionState {
            tokens,
            profile: None,
            loading,
            generation: 0,
        };

        Self {
            inner: Arc::new(Inner {
                config,
                store,
                state: Mutex::new(state),
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, SessionState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn snapshot(&self) -> SessionState {
        self.state().clone()
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.state().is_authenticated()
    }

    #[must_use]
    pub fn profile(&self) -> Option<UserProfile> {
        self.state().profile.clone()
    }

    #[must_use]
    pub fn access_token(&self) -> Option<SecretString> {
        self.state()
            .tokens
            .as_ref()
            .map(|tokens| tokens.access_token().clone())
    }

    #[must_use]
    pub fn loading(&self) -> bool {
        self.state().loading
    }

    pub(crate) fn generation(&self) -> u64 {
        self.state().generation
    }

    pub(crate) fn refresh_period(&self) -> Duration {
        self.inner.config.refresh_period
    }

    fn set_loading(&self, loading: bool) {
        self.state().loading = loading;
    }

    /// Persist a fresh pair and open a new session generation. Returns the
    /// new generation, or `None` when the session moved while the login was
    /// in flight (the result is then discarded).
    fn begin_session(
        &self,
        generation: u64,
        tokens: &TokenPair,
    ) -> Result<Option<u64>, SessionError> {
        let mut state = self.state();
        if state.generation != generation {
            debug!("discarding login result for a stale session");
            return Ok(None);
        }

        self.inner.store.persist(tokens)?;
        state.tokens = Some(tokens.clone());
        state.profile = None;
        state.generation += 1;

        Ok(Some(state.generation))
    }

    /// Replace the stored pair within the current session (token rotation).
    /// Returns false when the generation moved while the refresh was in
    /// flight.
    fn save_tokens(&self, generation: u64, tokens: &TokenPair) -> Result<bool, SessionError> {
        let mut state = self.state();
        if state.generation != generation {
            debug!("discarding rotated tokens for a stale session");
            return Ok(false);
        }

        self.inner.store.persist(tokens)?;
        state.tokens = Some(tokens.clone());

        Ok(true)
    }

    /// Store a fetched profile. Returns false when the generation moved.
    fn save_profile(&self, generation: u64, profile: UserProfile) -> bool {
        let mut state = self.state();
        if state.generation != generation {
            debug!("discarding profile for a stale session");
            return false;
        }

        state.profile = Some(profile);
        true
    }

    /// Clear the session if `generation` is still current. Used by the
    /// failure paths; an explicit [`SessionManager::logout`] clears
    /// unconditionally instead.
    fn teardown(&self, generation: u64) {
        let mut state = self.state();
        if state.generation != generation {
            return;
        }

        if let Err(err) = self.inner.store.clear() {
            warn!("Failed to clear token storage: {err}");
        }
        state.tokens = None;
        state.profile = None;
        state.generation += 1;
    }

    /// Clear persisted storage and in-memory state unconditionally.
    /// Calling it twice leaves the same empty state and storage.
    pub fn logout(&self) {
        let mut state = self.state();

        if let Err(err) = self.inner.store.clear() {
            warn!("Failed to clear token storage: {err}");
        }
        state.tokens = None;
        state.profile = None;
        state.loading = false;
        state.generation += 1;
    }

    /// Exchange credentials for a session: store the returned pair, fetch
    /// the profile with the new access token, and start the periodic
    /// refresh.
    ///
    /// A failed login clears any previous session state and reports the
    /// server's message (or a generic fallback). A profile fetch that fails
    /// after a successful login tears the session down silently; the login
    /// itself still returns `Ok` (an unreadable profile means an unusable
    /// session, not a credential problem to re-prompt for).
    ///
    /// # Errors
    /// Returns an error if the credential exchange fails.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &SecretString) -> Result<(), SessionError> {
        self.set_loading(true);
        let result = self.login_inner(email, password).await;
        self.set_loading(false);
        result
    }

    async fn login_inner(&self, email: &str, password: &SecretString) -> Result<(), SessionError> {
        let generation = self.generation();

        let tokens = match api::auth::login(&self.inner.config.api_url, email, password).await {
            Ok(tokens) => tokens,
            Err(err) => {
                self.teardown(generation);
                return Err(err);
            }
        };

        let generation = match self.begin_session(generation, &tokens) {
            Ok(Some(generation)) => generation,
            Ok(None) => return Ok(()),
            Err(err) => {
                self.teardown(generation);
                return Err(err);
            }
        };

        match self.fetch_profile_with_retry(generation).await {
            Ok(profile) => {
                if self.save_profile(generation, profile) {
                    refresh::spawn(self.clone(), generation);
                }
                Ok(())
            }
            Err(err) => {
                debug!("Profile fetch after login failed: {err}");
                Ok(())
            }
        }
    }

    /// Create an account. Password equality is checked locally before any
    /// network call; on success a verification mail is requested as a
    /// chained step. Registration never establishes a session.
    ///
    /// # Errors
    /// Returns a validation error on mismatched passwords, or the server's
    /// rejection of the registration or verification-mail request.
    #[instrument(skip(self, password, confirm_password))]
    pub async fn register(
        &self,
        email: &str,
        password: &SecretString,
        confirm_password: &SecretString,
        first_name: &str,
        last_name: &str,
    ) -> Result<(), SessionError> {
        if password.expose_secret() != confirm_password.expose_secret() {
            return Err(SessionError::Validation(
                "Passwords do not match".to_string(),
            ));
        }

        self.set_loading(true);
        let result = self
            .register_inner(email, password, first_name, last_name)
            .await;
        self.set_loading(false);
        result
    }

    async fn register_inner(
        &self,
        email: &str,
        password: &SecretString,
        first_name: &str,
        last_name: &str,
    ) -> Result<(), SessionError> {
        api::auth::register(
            &self.inner.config.api_url,
            email,
            password,
            first_name,
            last_name,
        )
        .await?;

        self.send_verification_mail(email).await
    }

    /// Ask the server to (re)send a verification mail. Does not touch
    /// session state.
    ///
    /// # Errors
    /// Returns the server's rejection or a transport failure.
    #[instrument(skip(self))]
    pub async fn send_verification_mail(&self, email: &str) -> Result<(), SessionError> {
        api::auth::send_verification_mail(&self.inner.config.api_url, email).await
    }

    /// Exchange a verification token for confirmation and return the
    /// server's payload verbatim. Does not touch session state.
    ///
    /// # Errors
    /// Returns the server's rejection or a transport failure.
    #[instrument(skip(self, token))]
    pub async fn verify_email(&self, token: &str) -> Result<Value, SessionError> {
        api::auth::verify_email(&self.inner.config.api_url, token).await
    }

    /// Trade the stored refresh token for a rotated pair. On success the
    /// new pair is persisted and the new access token returned; on any
    /// failure the whole session is cleared and `None` comes back. No
    /// retry loop: a refresh failure cascades straight to logout.
    #[instrument(skip(self))]
    pub async fn refresh_tokens(&self) -> Option<SecretString> {
        let generation = self.generation();

        let refresh = self
            .state()
            .tokens
            .as_ref()
            .map(|tokens| tokens.refresh_token().clone())?;

        match api::auth::refresh_token(&self.inner.config.api_url, &refresh).await {
            Ok(tokens) => {
                let access = tokens.access_token().clone();
                match self.save_tokens(generation, &tokens) {
                    Ok(true) => Some(access),
                    Ok(false) => None,
                    Err(err) => {
                        warn!("Failed to persist refreshed tokens: {err}");
                        self.teardown(generation);
                        None
                    }
                }
            }
            Err(err) => {
                debug!("Token refresh failed: {err}");
                self.teardown(generation);
                None
            }
        }
    }

    /// Complete startup restore: when a stored pair was loaded, fetch the
    /// profile (through the single-retry path) and start the periodic
    /// refresh. A restore failure stays silent; the session simply ends up
    /// unauthenticated.
    #[instrument(skip(self))]
    pub async fn hydrate(&self) {
        let generation = self.generation();

        if !self.is_authenticated() {
            self.set_loading(false);
            return;
        }

        match self.fetch_profile_with_retry(generation).await {
            Ok(profile) => {
                if self.save_profile(generation, profile) {
                    refresh::spawn(self.clone(), generation);
                }
            }
            Err(err) => debug!("Session restore failed: {err}"),
        }

        self.set_loading(false);
    }

    /// Authorized profile fetch with the single-retry policy: the first 401
    /// triggers one silent refresh and one replay; a second 401 (or any
    /// other failure) tears the session down and propagates. The explicit
    /// attempt counter is what bounds the loop, so a 401 from the refresh
    /// endpoint itself cannot recurse.
    async fn fetch_profile_with_retry(
        &self,
        generation: u64,
    ) -> Result<UserProfile, SessionError> {
        let mut attempt: u32 = 0;

        loop {
            let Some(access) = self.access_token() else {
                return Err(SessionError::Expired);
            };

            match api::users::profile_me(&self.inner.config.api_url, &access).await {
                Ok(profile) => return Ok(profile),
                Err(err) if err.is_unauthorized() && attempt == 0 => {
                    attempt += 1;
                    debug!("Access token rejected, attempting refresh");
                    if self.refresh_tokens().await.is_none() {
                        // refresh_tokens already cleared the session
                        return Err(err);
                    }
                }
                Err(err) => {
                    self.teardown(generation);
                    return Err(err);
                }
            }
        }
    }

    /// One periodic-refresh cycle: rotate tokens, then refetch the profile
    /// with the fresh access token. Returns false when the loop should
    /// stop (logout, stale generation, or refresh failure).
    pub(crate) async fn refresh_cycle(&self, generation: u64) -> bool {
        if self.generation() != generation {
            return false;
        }

        let Some(access) = self.refresh_tokens().await else {
            return false;
        };

        match api::users::profile_me(&self.inner.config.api_url, &access).await {
            Ok(profile) => self.save_profile(generation, profile),
            Err(err) => {
                debug!("Profile refetch after refresh failed: {err}");
                self.teardown(generation);
                false
            }
        }
    }
}
