//! # Session watcher: lifecycle of the current identity
//!
//! A [`SessionWatcher`] is owned by whatever component listens to the identity
//! provider and is handed to every consumer as explicit state. Its phase moves
//! strictly forward:
//!
//! ```text
//! Uninitialized ──attach──▶ Resolving ──publish──▶ Resolved(Some | None) ──detach──▶ TornDown
//!                                                   ▲          │
//!                                                   └─publish──┘
//! ```
//!
//! While the phase is `Resolving`, an absent identity does **not** mean
//! signed out. Publishing before [`attach`](SessionWatcher::attach) or after
//! [`detach`](SessionWatcher::detach) is ignored.

use crate::error::Result;
use crate::models::Identity;

/// Source of the signed-in identity.
pub trait IdentityProvider {
    /// The identity of the current session, if any.
    fn current(&self) -> impl std::future::Future<Output = Result<Option<Identity>>>;

    /// Start interactive sign-in. May leave the page.
    fn sign_in(&self) -> impl std::future::Future<Output = Result<()>>;

    fn sign_out(&self) -> impl std::future::Future<Output = Result<()>>;
}

/// Opaque id of the single registered identity listener.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum SessionPhase {
    #[default]
    Uninitialized,
    Resolving,
    Resolved(Option<Identity>),
    TornDown,
}

impl SessionPhase {
    pub fn is_resolving(&self) -> bool {
        matches!(self, SessionPhase::Uninitialized | SessionPhase::Resolving)
    }

    pub fn identity(&self) -> Option<&Identity> {
        match self {
            SessionPhase::Resolved(identity) => identity.as_ref(),
            _ => None,
        }
    }
}

/// What consumers see: the identity plus the "still resolving" flag.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SessionView<'a> {
    pub resolving: bool,
    pub identity: Option<&'a Identity>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SessionWatcher {
    phase: SessionPhase,
    listener: Option<ListenerId>,
}

impl SessionWatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> &SessionPhase {
        &self.phase
    }

    pub fn listener(&self) -> Option<ListenerId> {
        self.listener
    }

    pub fn view(&self) -> SessionView<'_> {
        SessionView {
            resolving: self.phase.is_resolving(),
            identity: self.phase.identity(),
        }
    }

    /// Register the identity listener. Only the first call has an effect.
    pub fn attach(&mut self, listener: ListenerId) -> bool {
        if self.phase != SessionPhase::Uninitialized {
            return false;
        }
        tracing::debug!(listener = listener.0, "identity listener attached");
        self.listener = Some(listener);
        self.phase = SessionPhase::Resolving;
        true
    }

    /// Record an identity change. Returns whether the published view changed.
    pub fn publish(&mut self, identity: Option<Identity>) -> bool {
        match &self.phase {
            SessionPhase::Uninitialized | SessionPhase::TornDown => {
                tracing::debug!("identity change ignored outside attached lifetime");
                false
            }
            SessionPhase::Resolved(current) if *current == identity => false,
            _ => {
                tracing::info!(
                    uid = identity.as_ref().map(|i| i.uid.as_str()),
                    "identity changed"
                );
                self.phase = SessionPhase::Resolved(identity);
                true
            }
        }
    }

    /// Unregister the listener. Returns the listener if one was registered.
    pub fn detach(&mut self) -> Option<ListenerId> {
        let listener = self.listener.take();
        if listener.is_some() {
            tracing::debug!("identity listener detached");
            self.phase = SessionPhase::TornDown;
        }
        listener
    }
}
