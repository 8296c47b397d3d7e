//! Active-identity module.
//!
//! This module provides:
//! - `IdentityProvider`: the seam the sync orchestrator uses to scope
//!   favorites and check-ins to the signed-in user
//! - `Session`: the persisted active account, stored as JSON in the cache directory
//! - `StaticIdentity`: a fixed identity for embedding and tests

pub mod session;

pub use session::{Session, SessionData};

/// Source of the currently active user identity.
pub trait IdentityProvider: Send + Sync {
    fn current_user_id(&self) -> Option<String>;
}

/// An identity that never changes.
#[derive(Debug, Clone, Default)]
pub struct StaticIdentity(Option<String>);

impl StaticIdentity {
    pub fn signed_in(user_id: impl Into<String>) -> Self {
        Self(Some(user_id.into()))
    }

    pub fn anonymous() -> Self {
        Self(None)
    }
}

impl IdentityProvider for StaticIdentity {
    fn current_user_id(&self) -> Option<String> {
        self.0.clone()
    }
}
