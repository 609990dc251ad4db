//! # Portal
//!
//! Contracts for the sports portal the run is submitted to. The core only
//! ever talks to a [`Portal`]; [`api::PortalApi`] is the HTTP implementation.

use crate::{
    data_types::{
        rules::{PaceRules, UploadResult},
        run::RunPayload,
    },
    error::Result,
};

pub mod api;
pub mod auth;

/// Opaque authenticated handle returned by [`Portal::login`].
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    token: String,
}

impl Session {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session").field("token", &"***").finish()
    }
}

pub trait Portal: Send + Sync {
    /// Any failure (bad credentials, captcha, network) is `Error::Auth`.
    fn login(&self, username: &str, password: &str) -> Result<Session>;

    /// Best-effort; callers fall back to [`PaceRules::default`].
    fn fetch_rules(&self, session: &Session) -> Result<PaceRules>;

    /// Transport failures are `Error::Upload`; portal verdicts come back in the result.
    fn upload(&self, session: &Session, payload: &RunPayload) -> Result<UploadResult>;
}
