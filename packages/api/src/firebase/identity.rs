//! Firebase Authentication over the Identity Toolkit and Secure Token APIs.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use store::{BackendConfig, Identity};

use super::FirebaseError;

const SIGN_IN_URL: &str = "https://identitytoolkit.googleapis.com/v1/accounts:signInWithIdp";
const REFRESH_URL: &str = "https://securetoken.googleapis.com/v1/token";

/// Tokens are refreshed this long before they actually expire.
const REFRESH_MARGIN_SECS: i64 = 60;

/// A signed-in Firebase user, kept in the server session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FirebaseSession {
    pub identity: Identity,
    pub id_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
}

impl FirebaseSession {
    pub fn needs_refresh(&self, now: DateTime<Utc>) -> bool {
        now + Duration::seconds(REFRESH_MARGIN_SECS) >= self.expires_at
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignInResponse {
    local_id: String,
    id_token: String,
    refresh_token: String,
    expires_in: String,
    email: Option<String>,
    display_name: Option<String>,
    photo_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    id_token: String,
    refresh_token: String,
    expires_in: String,
    user_id: String,
}

fn expiry(now: DateTime<Utc>, expires_in: &str) -> Result<DateTime<Utc>, FirebaseError> {
    let secs: i64 = expires_in
        .parse()
        .map_err(|_| FirebaseError::Decode(format!("bad expiresIn {expires_in:?}")))?;
    Ok(now + Duration::seconds(secs))
}

/// Exchange a Google OAuth access token for a Firebase user.
pub async fn sign_in_with_google(
    http: &reqwest::Client,
    config: &BackendConfig,
    google_access_token: &str,
) -> Result<FirebaseSession, FirebaseError> {
    let body = json!({
        "postBody": format!("access_token={google_access_token}&providerId=google.com"),
        "requestUri": format!("https://{}/__/auth/handler", config.auth_domain),
        "returnIdpCredential": true,
        "returnSecureToken": true,
    });
    let response = http
        .post(SIGN_IN_URL)
        .query(&[("key", &config.api_key)])
        .header("X-Firebase-GMPID", &config.app_id)
        .json(&body)
        .send()
        .await?;
    if !response.status().is_success() {
        return Err(FirebaseError::from_response("identitytoolkit", response).await);
    }
    let signed_in: SignInResponse = response.json().await?;

    tracing::info!(uid = %signed_in.local_id, "firebase sign-in");
    Ok(FirebaseSession {
        expires_at: expiry(Utc::now(), &signed_in.expires_in)?,
        identity: Identity {
            uid: signed_in.local_id,
            display_name: signed_in.display_name,
            email: signed_in.email,
            photo_url: signed_in.photo_url,
        },
        id_token: signed_in.id_token,
        refresh_token: signed_in.refresh_token,
    })
}

/// Trade the refresh token for a new ID token. The identity is kept.
pub async fn refresh(
    http: &reqwest::Client,
    config: &BackendConfig,
    session: &FirebaseSession,
) -> Result<FirebaseSession, FirebaseError> {
    let response = http
        .post(REFRESH_URL)
        .query(&[("key", &config.api_key)])
        .form(&[
            ("grant_type", "refresh_token"),
            ("refresh_token", session.refresh_token.as_str()),
        ])
        .send()
        .await?;
    if !response.status().is_success() {
        return Err(FirebaseError::from_response("securetoken", response).await);
    }
    let refreshed: RefreshResponse = response.json().await?;
    if refreshed.user_id != session.identity.uid {
        return Err(FirebaseError::Decode("refresh returned another user".to_string()));
    }

    tracing::debug!(uid = %refreshed.user_id, "firebase token refreshed");
    Ok(FirebaseSession {
        identity: session.identity.clone(),
        id_token: refreshed.id_token,
        refresh_token: refreshed.refresh_token,
        expires_at: expiry(Utc::now(), &refreshed.expires_in)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refresh_margin() {
        let now = Utc::now();
        let session = FirebaseSession {
            identity: Identity {
                uid: "u1".into(),
                display_name: None,
                email: None,
                photo_url: None,
            },
            id_token: "id".into(),
            refresh_token: "refresh".into(),
            expires_at: expiry(now, "3600").unwrap(),
        };
        assert!(!session.needs_refresh(now));
        assert!(session.needs_refresh(now + Duration::seconds(3550)));
        assert!(expiry(now, "soon").is_err());
    }
}
