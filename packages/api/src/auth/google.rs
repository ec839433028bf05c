//! # Google OAuth 2.0 sign-in
//!
//! Authorization Code flow with PKCE, ending in a Firebase user.
//!
//! 1. **[`generate_auth_url`](GoogleOAuth::generate_auth_url)** builds the
//!    authorization URL (`openid`, `email`, `profile`) and keeps the CSRF state
//!    and PKCE verifier in the caller's session.
//! 2. **[`exchange_code`](GoogleOAuth::exchange_code)** runs in the
//!    `/auth/google/callback` route of the `web` crate. It takes the state and
//!    verifier back out of the session (one use only), exchanges the code for a
//!    Google access token, signs in to Firebase with it and stores the resulting
//!    [`FirebaseSession`] in the session.

use oauth2::basic::BasicClient;
use oauth2::{
    AuthorizationCode, CsrfToken, EndpointNotSet, EndpointSet, PkceCodeChallenge,
    PkceCodeVerifier, Scope, TokenResponse,
};
use tower_sessions::Session;

use super::config::OAuthConfig;
use super::session::{SESSION_AUTH_KEY, SESSION_OAUTH_STATE_KEY, SESSION_PKCE_VERIFIER_KEY};
use super::AuthError;
use crate::backend::get_backend;
use crate::firebase::identity::{self, FirebaseSession};

/// OAuth client type with auth URL and token URL set.
type ConfiguredClient = oauth2::Client<
    oauth2::basic::BasicErrorResponse,
    oauth2::basic::BasicTokenResponse,
    oauth2::basic::BasicTokenIntrospectionResponse,
    oauth2::StandardRevocableToken,
    oauth2::basic::BasicRevocationErrorResponse,
    EndpointSet,
    EndpointNotSet,
    EndpointNotSet,
    EndpointNotSet,
    EndpointSet,
>;

/// Google OAuth handler.
pub struct GoogleOAuth {
    config: OAuthConfig,
}

impl GoogleOAuth {
    pub fn new() -> Result<Self, AuthError> {
        let config = OAuthConfig::google().map_err(AuthError::Config)?;
        Ok(Self { config })
    }

    fn create_client(&self) -> ConfiguredClient {
        BasicClient::new(self.config.client_id.clone())
            .set_client_secret(self.config.client_secret.clone())
            .set_auth_uri(self.config.auth_url.clone())
            .set_token_uri(self.config.token_url.clone())
            .set_redirect_uri(self.config.redirect_url.clone())
    }

    /// Generate the authorization URL and remember state + verifier.
    pub async fn generate_auth_url(&self, session: &Session) -> Result<String, AuthError> {
        let client = self.create_client();
        let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();

        let (auth_url, csrf_state) = client
            .authorize_url(CsrfToken::new_random)
            .add_scope(Scope::new("openid".to_string()))
            .add_scope(Scope::new("email".to_string()))
            .add_scope(Scope::new("profile".to_string()))
            .set_pkce_challenge(pkce_challenge)
            .url();

        session
            .insert(SESSION_OAUTH_STATE_KEY, csrf_state.secret().clone())
            .await?;
        session
            .insert(SESSION_PKCE_VERIFIER_KEY, pkce_verifier.secret().clone())
            .await?;

        Ok(auth_url.to_string())
    }

    /// Finish sign-in: validate state, exchange the code, sign in to Firebase.
    pub async fn exchange_code(
        &self,
        code: &str,
        state: &str,
        session: &Session,
    ) -> Result<FirebaseSession, AuthError> {
        let expected: Option<String> = session.remove(SESSION_OAUTH_STATE_KEY).await?;
        let verifier: Option<String> = session.remove(SESSION_PKCE_VERIFIER_KEY).await?;
        let (Some(expected), Some(verifier)) = (expected, verifier) else {
            return Err(AuthError::InvalidState);
        };
        if expected != state {
            return Err(AuthError::InvalidState);
        }

        // Token exchange must not follow redirects
        let http_client = reqwest::ClientBuilder::new()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| AuthError::Exchange(e.to_string()))?;

        let token_result = self
            .create_client()
            .exchange_code(AuthorizationCode::new(code.to_string()))
            .set_pkce_verifier(PkceCodeVerifier::new(verifier))
            .request_async(&http_client)
            .await
            .map_err(|e| AuthError::Exchange(e.to_string()))?;

        let backend = get_backend().await?;
        let firebase = identity::sign_in_with_google(
            backend.http(),
            backend.config(),
            token_result.access_token().secret(),
        )
        .await?;

        session.cycle_id().await?;
        session.insert(SESSION_AUTH_KEY, &firebase).await?;
        Ok(firebase)
    }
}
