use dioxus::prelude::*;

use ui::{AuthProvider, ToastProvider};
use views::{Files, Home, Login, Notes, Protected};

mod views;

#[derive(Debug, Clone, Routable, PartialEq)]
#[rustfmt::skip]
enum Route {
    #[route("/")]
    Login {},
    #[layout(Protected)]
        #[route("/home")]
        Home {},
        #[route("/notes")]
        Notes {},
        #[route("/files")]
        Files {},
}

const MAIN_CSS: Asset = asset!("/assets/main.css");

fn main() {
    #[cfg(feature = "server")]
    {
        let runtime = match tokio::runtime::Runtime::new() {
            Ok(runtime) => runtime,
            Err(e) => {
                eprintln!("Failed to start tokio runtime: {e}");
                std::process::exit(1);
            }
        };
        if let Err(e) = runtime.block_on(launch_server()) {
            tracing::error!("Server error: {e}");
            std::process::exit(1);
        }
    }

    #[cfg(not(feature = "server"))]
    {
        dioxus::launch(App);
    }
}

#[cfg(feature = "server")]
async fn launch_server() -> Result<(), Box<dyn std::error::Error>> {
    use axum::routing::get;
    use dioxus::server::{DioxusRouterExt, ServeConfig};
    use tower_sessions::cookie::time::Duration;
    use tower_sessions::cookie::SameSite;
    use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer};
    use tracing_subscriber::EnvFilter;

    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Fail fast on missing Firebase configuration
    api::backend::get_backend().await?;

    // Session layer configuration
    let session_layer = SessionManagerLayer::new(MemoryStore::default())
        .with_secure(false) // Set to true in production with HTTPS
        .with_same_site(SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(Duration::days(7)));

    // Build the Dioxus app with custom routes
    let router = axum::Router::new()
        // Add the OAuth callback route first
        .route("/auth/google/callback", get(google_callback))
        // Then serve the Dioxus application
        .serve_dioxus_application(ServeConfig::new(), App)
        // Add session layer to all routes
        .layer(session_layer);

    // Use the address from dx serve or default to localhost:8080
    let addr = dioxus::cli_config::fullstack_address_or_localhost();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, router.into_make_service()).await?;
    Ok(())
}

#[cfg(feature = "server")]
async fn google_callback(
    axum::extract::Query(params): axum::extract::Query<std::collections::HashMap<String, String>>,
    session: tower_sessions::Session,
) -> axum::response::Redirect {
    use axum::response::Redirect;

    if let Some(error) = params.get("error") {
        tracing::warn!("Google sign-in declined: {}", error);
        return Redirect::to("/?error=access_denied");
    }
    let Some(code) = params.get("code") else {
        tracing::error!("Google callback missing code");
        return Redirect::to("/?error=missing_code");
    };
    let Some(state) = params.get("state") else {
        tracing::error!("Google callback missing state");
        return Redirect::to("/?error=missing_state");
    };

    match api::auth::GoogleOAuth::new() {
        Ok(oauth) => match oauth.exchange_code(code, state, &session).await {
            Ok(firebase) => {
                if let Err(e) = session.save().await {
                    tracing::error!("Failed to save session: {}", e);
                    return Redirect::to("/?error=session_save_error");
                }
                tracing::info!(uid = %firebase.identity.uid, "signed in");
                Redirect::to("/home")
            }
            Err(e) => {
                tracing::error!("Google OAuth exchange error: {}", e);
                Redirect::to("/?error=oauth_error")
            }
        },
        Err(e) => {
            tracing::error!("Failed to create Google OAuth: {}", e);
            Redirect::to("/?error=config_error")
        }
    }
}

#[component]
fn App() -> Element {
    rsx! {
        // Global app resources
        document::Link { rel: "stylesheet", href: MAIN_CSS }
        document::Link { rel: "stylesheet", href: ui::APP_CSS }

        AuthProvider {
            ToastProvider {
                Router::<Route> {}
            }
        }
    }
}
