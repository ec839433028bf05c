//! Google sign-in and the Firebase session kept in the server session.

#[cfg(feature = "server")]
mod config;
#[cfg(feature = "server")]
mod google;
#[cfg(feature = "server")]
mod session;

#[cfg(feature = "server")]
pub use config::OAuthConfig;
#[cfg(feature = "server")]
pub use google::GoogleOAuth;
#[cfg(feature = "server")]
pub use session::{
    authenticated, current_identity, sign_out, SESSION_AUTH_KEY, SESSION_OAUTH_STATE_KEY,
    SESSION_PKCE_VERIFIER_KEY,
};

#[cfg(feature = "server")]
pub use error::AuthError;

#[cfg(feature = "server")]
mod error {
    use thiserror::Error;

    use crate::firebase::FirebaseError;

    #[derive(Debug, Error)]
    pub enum AuthError {
        #[error("Not authenticated")]
        NotAuthenticated,

        #[error("Invalid or expired OAuth state")]
        InvalidState,

        #[error("OAuth configuration error: {0}")]
        Config(String),

        #[error("Token exchange failed: {0}")]
        Exchange(String),

        #[error(transparent)]
        Firebase(#[from] FirebaseError),

        #[error("session error: {0}")]
        Session(#[from] tower_sessions::session::Error),
    }
}
