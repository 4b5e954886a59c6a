//! Identity of the signed-in user.
//!
//! # Responsibilities
//! - Define the `IdentityProvider` seam the wallet flow reads the user from
//! - Map bearer session tokens to users for the HTTP surface
//!
//! # Data Flow
//! ```text
//! Authorization: Bearer <token>
//!     → SessionAuthenticator::authenticate   (unknown token → None)
//!     → BearerIdentity::current_user_id      (None → NoIdentity → 401)
//! ```

use std::collections::HashMap;
use std::fmt;

use crate::chain::UserId;
use crate::config::AuthConfig;

/// Supplies the current user, as issued by the app's authentication provider.
pub trait IdentityProvider: Send + Sync {
    /// `None` when nobody is signed in.
    fn current_user_id(&self) -> Option<UserId>;
}

/// Fixed identity, used by the CLI where the operator names the user.
#[derive(Debug, Clone, Default)]
pub struct StaticIdentity(Option<UserId>);

impl StaticIdentity {
    pub fn signed_in(user: impl Into<UserId>) -> Self {
        Self(Some(user.into()))
    }

    pub fn signed_out() -> Self {
        Self(None)
    }
}

impl IdentityProvider for StaticIdentity {
    fn current_user_id(&self) -> Option<UserId> {
        self.0.clone()
    }
}

/// Validates a session credential and names the user it belongs to.
pub trait SessionAuthenticator: Send + Sync {
    fn authenticate(&self, token: &str) -> Option<UserId>;
}

/// Session table loaded from `[auth.sessions]`.
#[derive(Default)]
pub struct StaticSessions {
    sessions: HashMap<String, UserId>,
}

impl StaticSessions {
    pub fn new<I, T, U>(sessions: I) -> Self
    where
        I: IntoIterator<Item = (T, U)>,
        T: Into<String>,
        U: Into<UserId>,
    {
        Self {
            sessions: sessions
                .into_iter()
                .map(|(token, user)| (token.into(), user.into()))
                .collect(),
        }
    }

    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(config.sessions.iter().map(|(t, u)| (t.clone(), u.clone())))
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl fmt::Debug for StaticSessions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticSessions")
            .field("sessions", &self.sessions.len())
            .finish()
    }
}

impl SessionAuthenticator for StaticSessions {
    fn authenticate(&self, token: &str) -> Option<UserId> {
        self.sessions.get(token).cloned()
    }
}

/// Identity carried by one request's bearer credential.
pub struct BearerIdentity<'a> {
    sessions: &'a dyn SessionAuthenticator,
    token: Option<&'a str>,
}

impl<'a> BearerIdentity<'a> {
    pub fn new(sessions: &'a dyn SessionAuthenticator, token: Option<&'a str>) -> Self {
        Self { sessions, token }
    }
}

impl IdentityProvider for BearerIdentity<'_> {
    fn current_user_id(&self) -> Option<UserId> {
        self.token.and_then(|token| self.sessions.authenticate(token))
    }
}
