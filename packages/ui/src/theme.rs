//! Light/dark/system theme, persisted in `localStorage`.

use std::fmt;
use std::str::FromStr;

use dioxus::prelude::*;

use crate::icons::{FaCircleHalfStroke, FaMoon, FaSun};
use crate::Icon;

const STORAGE_KEY: &str = "theme";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Theme {
    Light,
    Dark,
    /// Follow the operating system preference.
    #[default]
    System,
}

impl Theme {
    /// `light → dark → system → light`
    pub fn next(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::System,
            Theme::System => Theme::Light,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
            Theme::System => "system",
        }
    }

    fn label(self) -> &'static str {
        match self {
            Theme::Light => "Light",
            Theme::Dark => "Dark",
            Theme::System => "System",
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Theme {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            "system" => Ok(Theme::System),
            _ => Err(()),
        }
    }
}

/// Set the theme class on the document root and remember the choice.
pub fn apply_theme(theme: Theme) {
    let js = format!(
        r#"(function() {{
            var root = document.documentElement;
            var dark = '{theme}' === 'dark' ||
                ('{theme}' === 'system' && window.matchMedia('(prefers-color-scheme: dark)').matches);
            root.classList.toggle('dark', dark);
            root.dataset.theme = '{theme}';
            try {{ localStorage.setItem('{STORAGE_KEY}', '{theme}'); }} catch (e) {{}}
        }})();"#
    );
    document::eval(&js);
}

/// Read the stored theme, defaulting to [`Theme::System`].
pub async fn load_theme_from_storage() -> Theme {
    let js = format!(
        r#"(function() {{
            var value = null;
            try {{ value = localStorage.getItem('{STORAGE_KEY}'); }} catch (e) {{}}
            dioxus.send(value || '');
        }})();"#
    );
    let mut eval = document::eval(&js);
    match eval.recv::<String>().await {
        Ok(value) => value.parse().unwrap_or_default(),
        Err(_) => Theme::default(),
    }
}

/// Button cycling through the themes.
#[component]
pub fn ThemeToggle() -> Element {
    let mut theme = use_signal(Theme::default);

    use_effect(move || {
        spawn(async move {
            let stored = load_theme_from_storage().await;
            apply_theme(stored);
            theme.set(stored);
        });
    });

    let current = theme();
    rsx! {
        button {
            class: "theme-toggle",
            title: "Theme: {current.label()}",
            onclick: move |_| {
                let next = theme().next();
                apply_theme(next);
                theme.set(next);
            },
            match current {
                Theme::Light => rsx! { Icon { icon: FaSun, width: 14, height: 14 } },
                Theme::Dark => rsx! { Icon { icon: FaMoon, width: 14, height: 14 } },
                Theme::System => rsx! { Icon { icon: FaCircleHalfStroke, width: 14, height: 14 } },
            }
            span { "{current.label()}" }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_theme_cycle() {
        assert_eq!(Theme::Light.next(), Theme::Dark);
        assert_eq!(Theme::Dark.next(), Theme::System);
        assert_eq!(Theme::System.next(), Theme::Light);
    }

    #[test]
    fn test_stored_value_roundtrip() {
        for theme in [Theme::Light, Theme::Dark, Theme::System] {
            assert_eq!(theme.as_str().parse::<Theme>(), Ok(theme));
        }
        assert!("".parse::<Theme>().is_err());
    }
}
