//! Authentication context and hooks for the UI.

use dioxus::prelude::*;
use store::session::ListenerId;
use store::{Identity, IdentityProvider, SessionWatcher};

use crate::backend::ApiIdentity;

/// Authentication state for the application.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuthState {
    pub session: SessionWatcher,
    /// Whether the server is reachable (last check succeeded).
    pub online: bool,
}

impl AuthState {
    pub fn identity(&self) -> Option<Identity> {
        self.session.view().identity.cloned()
    }

    pub fn resolving(&self) -> bool {
        self.session.view().resolving
    }
}

/// Get the current authentication state.
/// Returns a signal that updates when the user logs in or out.
pub fn use_auth() -> Signal<AuthState> {
    use_context::<Signal<AuthState>>()
}

/// Provider component that watches the signed-in identity.
/// Wrap your app with this component to enable authentication.
#[component]
pub fn AuthProvider(children: Element) -> Element {
    let mut auth_state = use_signal(AuthState::default);

    use_hook(move || {
        auth_state.write().session.attach(ListenerId(1));
    });
    use_drop(move || {
        if let Ok(mut state) = auth_state.try_write() {
            state.session.detach();
        }
    });

    // Fetch the current user on mount
    let _ = use_resource(move || async move {
        let result = ApiIdentity.current().await;
        let mut state = auth_state.write();
        match result {
            Ok(identity) => {
                state.online = true;
                state.session.publish(identity);
            }
            Err(e) => {
                tracing::error!("Failed to resolve identity: {e}");
                state.online = false;
                state.session.publish(None);
            }
        }
    });

    // Periodic re-check (every 30s)
    use_effect(move || {
        spawn(async move {
            loop {
                #[cfg(target_arch = "wasm32")]
                gloo_timers::future::sleep(std::time::Duration::from_secs(30)).await;
                #[cfg(not(target_arch = "wasm32"))]
                tokio::time::sleep(std::time::Duration::from_secs(30)).await;

                // Don't check while the initial load is still in progress
                if auth_state.peek().resolving() {
                    continue;
                }
                match ApiIdentity.current().await {
                    Ok(identity) => {
                        let changed = auth_state.peek().identity() != identity;
                        if changed || !auth_state.peek().online {
                            let mut state = auth_state.write();
                            state.online = true;
                            state.session.publish(identity);
                        }
                    }
                    Err(_) => {
                        if auth_state.peek().online {
                            auth_state.write().online = false;
                        }
                    }
                }
            }
        });
    });

    use_context_provider(|| auth_state);

    rsx! {
        {children}
    }
}

/// Button that starts Google sign-in.
#[component]
pub fn LoginButton(
    #[props(default = "Sign in with Google".to_string())] label: String,
    #[props(default = "".to_string())] class: String,
) -> Element {
    let mut loading = use_signal(|| false);

    let onclick = move |_| async move {
        loading.set(true);
        if let Err(e) = ApiIdentity.sign_in().await {
            tracing::error!("Failed to start sign-in: {e}");
            loading.set(false);
        }
    };

    rsx! {
        button {
            class: "{class}",
            disabled: loading(),
            onclick: onclick,
            if loading() {
                "Redirecting..."
            } else {
                "{label}"
            }
        }
    }
}

/// Button to sign out the current user.
///
/// The empty identity is published before `on_signed_out` runs, so any
/// protected route re-evaluates its guard first.
#[component]
pub fn LogoutButton(
    #[props(default = "Sign out".to_string())] label: String,
    #[props(default = "".to_string())] class: String,
    on_signed_out: Option<EventHandler<()>>,
) -> Element {
    let mut auth_state = use_auth();

    let onclick = move |_| async move {
        match ApiIdentity.sign_out().await {
            Ok(()) => {
                auth_state.write().session.publish(None);
                if let Some(handler) = on_signed_out {
                    handler.call(());
                }
            }
            Err(e) => tracing::error!("Failed to sign out: {e}"),
        }
    };

    rsx! {
        button {
            class: "{class}",
            onclick: onclick,
            "{label}"
        }
    }
}
