use dioxus::prelude::*;

use crate::now_millis;

/// Milliseconds a toast stays on screen.
const TOAST_MILLIS: i64 = 4_000;

/// How often the provider sweeps expired toasts.
const SWEEP_MILLIS: u64 = 500;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ToastLevel {
    Success,
    Error,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Toast {
    pub id: u64,
    pub level: ToastLevel,
    pub message: String,
    expires_at: i64,
}

#[derive(Clone, Debug, Default)]
pub struct Toasts {
    pub entries: Vec<Toast>,
    next_id: u64,
}

impl Toasts {
    fn push(&mut self, level: ToastLevel, message: &str, now: i64) -> u64 {
        self.next_id += 1;
        self.entries.push(Toast {
            id: self.next_id,
            level,
            message: message.to_string(),
            expires_at: now + TOAST_MILLIS,
        });
        self.next_id
    }

    pub fn dismiss(&mut self, id: u64) {
        self.entries.retain(|t| t.id != id);
    }

    /// Drop toasts whose time is up. Returns whether anything was removed.
    fn expire(&mut self, now: i64) -> bool {
        let before = self.entries.len();
        self.entries.retain(|t| t.expires_at > now);
        self.entries.len() != before
    }

    fn has_expired(&self, now: i64) -> bool {
        self.entries.iter().any(|t| t.expires_at <= now)
    }
}

pub fn use_toasts() -> Signal<Toasts> {
    use_context::<Signal<Toasts>>()
}

/// Show a toast. [`ToastProvider`] removes it once it expires.
pub fn show_toast(toasts: &mut Signal<Toasts>, level: ToastLevel, message: &str) {
    toasts.write().push(level, message, now_millis());
}

/// Provides the toast context and renders the stack.
///
/// Expiry runs in the provider's own task, so a toast still goes away after
/// the component that raised it has unmounted.
#[component]
pub fn ToastProvider(children: Element) -> Element {
    let mut toasts = use_context_provider(|| Signal::new(Toasts::default()));

    use_future(move || async move {
        loop {
            #[cfg(target_arch = "wasm32")]
            gloo_timers::future::sleep(std::time::Duration::from_millis(SWEEP_MILLIS)).await;
            #[cfg(not(target_arch = "wasm32"))]
            tokio::time::sleep(std::time::Duration::from_millis(SWEEP_MILLIS)).await;

            let now = now_millis();
            if toasts.peek().has_expired(now) {
                toasts.write().expire(now);
            }
        }
    });

    rsx! {
        {children}
        div {
            class: "toast-stack",
            for toast in toasts.read().entries.iter().cloned() {
                div {
                    key: "{toast.id}",
                    class: match toast.level {
                        ToastLevel::Success => "toast toast-success",
                        ToastLevel::Error => "toast toast-error",
                    },
                    role: "status",
                    onclick: move |_| toasts.write().dismiss(toast.id),
                    "{toast.message}"
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toasts_expire_without_their_caller() {
        let mut toasts = Toasts::default();
        let first = toasts.push(ToastLevel::Success, "Files uploaded successfully", 1_000);
        toasts.push(ToastLevel::Error, "Failed to delete file", 3_000);

        assert!(!toasts.has_expired(4_999));
        assert!(!toasts.expire(4_999));
        assert_eq!(toasts.entries.len(), 2);

        assert!(toasts.expire(5_000));
        assert_eq!(toasts.entries.len(), 1);
        assert!(toasts.entries.iter().all(|t| t.id != first));

        assert!(toasts.expire(7_000));
        assert!(toasts.entries.is_empty());
    }

    #[test]
    fn test_dismiss_removes_one_toast() {
        let mut toasts = Toasts::default();
        let id = toasts.push(ToastLevel::Success, "File deleted", 0);
        toasts.push(ToastLevel::Success, "File deleted", 0);
        toasts.dismiss(id);
        assert_eq!(toasts.entries.len(), 1);
        assert_ne!(toasts.entries[0].id, id);
    }
}
