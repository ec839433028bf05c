//! Login page view.

use dioxus::prelude::*;
use ui::{use_auth, LoginButton};

use crate::Route;

/// Login page component.
#[component]
pub fn Login() -> Element {
    let auth = use_auth();
    let nav = use_navigator();

    // Already signed in: go to the home page
    use_effect(move || {
        if auth.read().identity().is_some() {
            nav.replace(Route::Home {});
        }
    });

    rsx! {
        div {
            class: "login-container",

            h1 { class: "login-title", "Caspian" }

            p {
                class: "login-subtitle",
                "Notes and files, in one place."
            }

            if auth.read().resolving() {
                p { class: "muted", "Checking your session..." }
            } else {
                LoginButton {
                    class: "login-btn google-btn",
                }
            }
        }
    }
}
