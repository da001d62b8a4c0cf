//! Request-scoped authentication context.
//!
//! Handlers never read a "current user" from ambient state. They receive a
//! [`RequestContext`] extracted from the session, and ask it for an
//! [`Access`] decision that has been revalidated against the credential store.

use axum::{extract::FromRequestParts, http::request::Parts, response::Redirect};
use tower_sessions::Session;

use super::ApiError;
use crate::services::{CredentialError, CredentialService, Identity};

/// Session key holding the signed-in [`Identity`].
pub const IDENTITY_KEY: &str = "identity";

pub const HOME_ROUTE: &str = "/";
pub const LOGIN_ROUTE: &str = "/log/in";
pub const LOGOUT_ROUTE: &str = "/log/out";
pub const USER_LIST_ROUTE: &str = "/user";

/// Outcome of checking the session identity against the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Access {
    /// The identity still matches a stored user.
    Granted(Identity),
    /// Nobody is signed in.
    Anonymous,
    /// Signed in, but the user was deleted or renamed since.
    Stale(Identity),
}

impl Access {
    /// The identity for protected pages, or where to send the client instead:
    /// anonymous visitors go to sign-in, stale sessions are logged out.
    pub fn require(self) -> Result<Identity, Redirect> {
        match self {
            Self::Granted(identity) => Ok(identity),
            Self::Anonymous => Err(Redirect::to(LOGIN_ROUTE)),
            Self::Stale(_) => Err(Redirect::to(LOGOUT_ROUTE)),
        }
    }

    #[must_use]
    pub const fn is_granted(&self) -> bool {
        matches!(self, Self::Granted(_))
    }
}

pub struct RequestContext {
    session: Session,
    identity: Option<Identity>,
}

impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let session = Session::from_request_parts(parts, state)
            .await
            .map_err(|(_, msg)| ApiError::internal(format!("Session unavailable: {msg}")))?;

        let identity = session
            .get::<Identity>(IDENTITY_KEY)
            .await
            .map_err(|e| ApiError::internal(format!("Session error: {e}")))?;

        if let Some(identity) = &identity {
            tracing::Span::current().record("user_id", identity.id);
        }

        Ok(Self { session, identity })
    }
}

impl RequestContext {
    /// Identity cached in the session, not yet revalidated.
    #[must_use]
    pub const fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    /// Revalidates the session identity: the row must still exist under the
    /// same name.
    pub async fn access(
        &self,
        credentials: &dyn CredentialService,
    ) -> Result<Access, CredentialError> {
        let Some(identity) = &self.identity else {
            return Ok(Access::Anonymous);
        };

        if credentials.is_identity_valid(identity).await? {
            Ok(Access::Granted(identity.clone()))
        } else {
            tracing::debug!(user_id = identity.id, "Session identity is stale");
            Ok(Access::Stale(identity.clone()))
        }
    }

    pub async fn sign_in(&mut self, identity: Identity) -> Result<(), ApiError> {
        // New session id on privilege change.
        self.session
            .cycle_id()
            .await
            .map_err(|e| ApiError::internal(format!("Failed to rotate session: {e}")))?;

        self.session
            .insert(IDENTITY_KEY, &identity)
            .await
            .map_err(|e| ApiError::internal(format!("Failed to create session: {e}")))?;

        self.identity = Some(identity);
        Ok(())
    }

    pub async fn sign_out(&mut self) -> Result<(), ApiError> {
        if self.identity.take().is_some() {
            self.session
                .flush()
                .await
                .map_err(|e| ApiError::internal(format!("Failed to end session: {e}")))?;
        }
        Ok(())
    }
}
