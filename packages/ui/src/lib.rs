//! This crate contains all shared UI for the workspace.

use dioxus::prelude::*;

// Re-export icon library
pub use dioxus_free_icons::Icon;
pub mod icons {
    pub use dioxus_free_icons::icons::fa_solid_icons::*;
}

pub const APP_CSS: Asset = asset!("/assets/app.css");

/// Wall-clock milliseconds since the Unix epoch.
pub(crate) fn now_millis() -> i64 {
    #[cfg(target_arch = "wasm32")]
    {
        js_sys::Date::now() as i64
    }
    #[cfg(not(target_arch = "wasm32"))]
    {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or_default()
    }
}

mod auth;
pub use auth::{use_auth, AuthProvider, AuthState, LoginButton, LogoutButton};

mod backend;
pub use backend::{ApiFiles, ApiIdentity, ApiNotes};

mod file_shelf;
pub use file_shelf::FileShelfView;

mod note_board;
pub use note_board::{render_markdown, NoteBoard};

mod sidebar;
pub use sidebar::{AppSidebar, NavItem};

mod theme;
pub use theme::{apply_theme, load_theme_from_storage, Theme, ThemeToggle};

pub mod toast;
pub use toast::{show_toast, use_toasts, ToastLevel, ToastProvider, Toasts};
