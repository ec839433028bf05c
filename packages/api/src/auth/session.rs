//! Session keys and access to the signed-in Firebase user.

use chrono::Utc;
use tower_sessions::Session;

use store::Identity;

use super::AuthError;
use crate::backend::get_backend;
use crate::firebase::identity::{self, FirebaseSession};

/// Key for the signed-in [`FirebaseSession`].
pub const SESSION_AUTH_KEY: &str = "firebase_auth";
/// Key for the CSRF state of a pending Google sign-in.
pub const SESSION_OAUTH_STATE_KEY: &str = "oauth_state";
/// Key for the PKCE verifier of a pending Google sign-in.
pub const SESSION_PKCE_VERIFIER_KEY: &str = "oauth_pkce_verifier";

/// The signed-in identity, refreshing the ID token when needed.
///
/// Returns `None` when nobody is signed in or the refresh failed; a failed
/// refresh ends the session.
pub async fn current_identity(session: &Session) -> Result<Option<Identity>, AuthError> {
    match authenticated(session).await {
        Ok((identity, _)) => Ok(Some(identity)),
        Err(AuthError::NotAuthenticated) => Ok(None),
        Err(e) => Err(e),
    }
}

/// The signed-in identity and a valid ID token for Firebase requests.
pub async fn authenticated(session: &Session) -> Result<(Identity, String), AuthError> {
    let Some(firebase) = session.get::<FirebaseSession>(SESSION_AUTH_KEY).await? else {
        return Err(AuthError::NotAuthenticated);
    };
    if !firebase.needs_refresh(Utc::now()) {
        return Ok((firebase.identity, firebase.id_token));
    }

    let backend = get_backend().await?;
    match identity::refresh(backend.http(), backend.config(), &firebase).await {
        Ok(refreshed) => {
            session.insert(SESSION_AUTH_KEY, &refreshed).await?;
            Ok((refreshed.identity, refreshed.id_token))
        }
        Err(e) => {
            tracing::warn!(uid = %firebase.identity.uid, "token refresh failed, ending session: {e}");
            session.flush().await?;
            Err(AuthError::NotAuthenticated)
        }
    }
}

/// Forget the signed-in user.
pub async fn sign_out(session: &Session) -> Result<(), AuthError> {
    session.flush().await?;
    Ok(())
}
