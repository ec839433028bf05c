use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared flag telling suspended operations that their owner is gone.
///
/// A view creates one token on mount and cancels it on unmount. Async
/// continuations check [`is_cancelled`](CancelToken::is_cancelled) before they
/// touch view state, so a torn-down view is never mutated.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// `Err(Cancelled)` once the token has fired.
    pub fn check(&self) -> crate::Result<()> {
        if self.is_cancelled() {
            Err(crate::StoreError::Cancelled)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_state() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(token.check().is_ok());
        clone.cancel();
        assert!(token.is_cancelled());
        assert_eq!(token.check(), Err(crate::StoreError::Cancelled));
    }
}
