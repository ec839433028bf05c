//! Layout guarding every signed-in page.

use dioxus::prelude::*;
use store::guard::{decide, GuardDecision};
use ui::{use_auth, AppSidebar, NavItem};

use crate::Route;

fn nav_item(route: &Route) -> Option<NavItem> {
    match route {
        Route::Home {} => Some(NavItem::Home),
        Route::Notes {} => Some(NavItem::Notes),
        Route::Files {} => Some(NavItem::Files),
        Route::Login {} => None,
    }
}

/// Renders the nested route only for a resolved identity.
#[component]
pub fn Protected() -> Element {
    let auth = use_auth();
    let nav = use_navigator();
    let route = use_route::<Route>();

    let decision = decide(auth.read().session.phase());

    use_effect(move || {
        if decide(auth.read().session.phase()) == GuardDecision::Redirect {
            nav.replace(Route::Login {});
        }
    });

    match decision {
        GuardDecision::Wait => rsx! {
            div { class: "page-loading", "Loading..." }
        },
        GuardDecision::Redirect => rsx! {},
        GuardDecision::Render => rsx! {
            div {
                class: "app-shell",
                AppSidebar {
                    active: nav_item(&route),
                    on_navigate: move |item: NavItem| {
                        let target = match item {
                            NavItem::Home => Route::Home {},
                            NavItem::Notes => Route::Notes {},
                            NavItem::Files => Route::Files {},
                        };
                        nav.push(target);
                    },
                    on_signed_out: move |_| {
                        nav.replace(Route::Login {});
                    },
                }
                main {
                    class: "app-main",
                    Outlet::<Route> {}
                }
            }
        },
    }
}
