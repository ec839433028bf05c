use dioxus::prelude::*;

use crate::icons::{FaFolderOpen, FaHouse, FaNoteSticky};
use crate::{use_auth, Icon, LogoutButton, ThemeToggle};

/// Pages reachable from the sidebar.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NavItem {
    Home,
    Notes,
    Files,
}

impl NavItem {
    pub const ALL: [NavItem; 3] = [NavItem::Home, NavItem::Notes, NavItem::Files];

    pub fn label(self) -> &'static str {
        match self {
            NavItem::Home => "Home",
            NavItem::Notes => "Notes",
            NavItem::Files => "Files",
        }
    }
}

#[component]
pub fn AppSidebar(
    active: Option<NavItem>,
    on_navigate: EventHandler<NavItem>,
    on_signed_out: EventHandler<()>,
) -> Element {
    let auth = use_auth();
    let identity = auth().identity();

    rsx! {
        nav {
            class: "sidebar",

            // User header
            div {
                class: "sidebar-user",
                if let Some(ref user) = identity {
                    if let Some(ref photo) = user.photo_url {
                        img {
                            class: "sidebar-user-avatar",
                            src: "{photo}",
                            alt: "Avatar",
                            referrerpolicy: "no-referrer",
                        }
                    }
                    span {
                        class: "sidebar-user-name",
                        "{user.label()}"
                    }
                } else {
                    span {
                        class: "sidebar-user-name",
                        "Caspian"
                    }
                }
            }

            ul {
                class: "sidebar-menu",
                for item in NavItem::ALL {
                    li {
                        key: "{item.label()}",
                        button {
                            class: if active == Some(item) { "sidebar-item active" } else { "sidebar-item" },
                            onclick: move |_| on_navigate.call(item),
                            match item {
                                NavItem::Home => rsx! { Icon { icon: FaHouse, width: 14, height: 14 } },
                                NavItem::Notes => rsx! { Icon { icon: FaNoteSticky, width: 14, height: 14 } },
                                NavItem::Files => rsx! { Icon { icon: FaFolderOpen, width: 14, height: 14 } },
                            }
                            span { "{item.label()}" }
                        }
                    }
                }
            }

            // Bottom actions
            div {
                class: "sidebar-bottom",
                ThemeToggle {}
                LogoutButton {
                    class: "sidebar-item",
                    on_signed_out: move |_| on_signed_out.call(()),
                }
            }
        }
    }
}
