//! # memo-auth
//!
//! Session and authentication client for the Memo API.
//!
//! The crate centers on [`session::SessionManager`], which owns the
//! session-token lifecycle: it obtains an opaque access/refresh token pair at
//! login, persists the pair across process restarts in a single JSON token
//! file, silently refreshes an expired access token (replaying the failed
//! request exactly once), rotates tokens proactively on a timer while a
//! session is live, and tears everything down on logout or unrecoverable
//! auth failure.
//!
//! The [`api`] module holds the per-endpoint HTTP calls; the [`cli`] module
//! fronts the manager with a small command-line interface (`login`,
//! `register`, `send-verification`, `verify-email`, `whoami`, `logout`).
//!
//! Tokens are opaque strings to this crate: no cryptographic validation
//! happens client side, and credentials are held as [`secrecy::SecretString`]
//! so they stay out of logs and debug output.

pub mod api;
pub mod cli;
pub mod session;
