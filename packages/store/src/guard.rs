//! Route guard decision for protected pages.

use crate::session::SessionPhase;

/// What a protected route should do for the current session phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GuardDecision {
    /// Identity not resolved yet: render a placeholder, never protected content.
    Wait,
    /// Render the nested protected routes.
    Render,
    /// Replace the location with the entry route.
    Redirect,
}

/// Pure function of the session phase; evaluated again on every publish.
pub fn decide(phase: &SessionPhase) -> GuardDecision {
    match phase {
        SessionPhase::Uninitialized | SessionPhase::Resolving => GuardDecision::Wait,
        SessionPhase::Resolved(Some(_)) => GuardDecision::Render,
        SessionPhase::Resolved(None) | SessionPhase::TornDown => GuardDecision::Redirect,
    }
}
