// context.rs - request-scoped state threaded explicitly through every layer
//
// Keys are set-once: a value already present for a request is never replaced.

use std::fmt;

use crate::database::TxHandle;

/// Per-request state: correlation IDs, the authenticated user and the
/// active database transaction, if any.
#[derive(Clone, Default)]
pub struct RequestContext {
    request_id: Option<String>,
    request_path: Option<String>,
    user_id: Option<String>,
    transaction: Option<TxHandle>,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        set_once(&mut self.request_id, request_id.into());
        self
    }

    pub fn with_request_path(mut self, path: impl Into<String>) -> Self {
        set_once(&mut self.request_path, path.into());
        self
    }

    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        set_once(&mut self.user_id, user_id.into());
        self
    }

    /// Returns a context bound to `tx`. An already bound transaction wins.
    pub fn with_transaction(mut self, tx: TxHandle) -> Self {
        if self.transaction.is_none() {
            self.transaction = Some(tx);
        }
        self
    }

    pub fn request_id(&self) -> Option<&str> {
        self.request_id.as_deref()
    }

    pub fn request_path(&self) -> Option<&str> {
        self.request_path.as_deref()
    }

    /// Authenticated user, or `""` when none was recorded.
    pub fn user_id(&self) -> &str {
        self.user_id.as_deref().unwrap_or_default()
    }

    pub fn has_user(&self) -> bool {
        self.user_id.as_deref().is_some_and(|id| !id.is_empty())
    }

    pub fn transaction(&self) -> Option<&TxHandle> {
        self.transaction.as_ref()
    }
}

fn set_once(slot: &mut Option<String>, value: String) {
    if slot.is_none() {
        *slot = Some(value);
    }
}

impl fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestContext")
            .field("request_id", &self.request_id)
            .field("request_path", &self.request_path)
            .field("user_id", &self.user_id)
            .field("in_transaction", &self.transaction.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_set_once() {
        let ctx = RequestContext::new()
            .with_user_id("u1")
            .with_user_id("u2")
            .with_request_id("r1")
            .with_request_id("r2");

        assert_eq!(ctx.user_id(), "u1");
        assert_eq!(ctx.request_id(), Some("r1"));
    }

    #[test]
    fn missing_user_reads_as_empty() {
        let ctx = RequestContext::new();
        assert_eq!(ctx.user_id(), "");
        assert!(!ctx.has_user());
        assert!(ctx.transaction().is_none());
    }

    #[test]
    fn empty_user_is_not_a_user() {
        let ctx = RequestContext::new().with_user_id("");
        assert!(!ctx.has_user());
    }
}
