use dioxus::prelude::*;
use ui::use_auth;

#[component]
pub fn Home() -> Element {
    let auth = use_auth();
    let label = auth
        .read()
        .identity()
        .map(|identity| identity.label().to_string())
        .unwrap_or_else(|| "User".to_string());

    rsx! {
        section {
            class: "page",
            h1 { "Hello, {label}!" }
            p { class: "muted", "Pick Notes or Files in the sidebar to get started." }
        }
    }
}
