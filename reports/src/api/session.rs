//! Request context and the process-wide session holder.
//!
//! A context is immutable once built. Logging in installs one with
//! [`begin`]; logging out removes it with [`end`]. Callers take a snapshot
//! with [`current`] and pass it explicitly to the API client.

use std::sync::{Arc, OnceLock, RwLock};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    api_base_url: String,
    company_id: Option<String>,
    access_token: Option<String>,
}

impl RequestContext {
    pub fn new(api_base_url: impl Into<String>) -> Self {
        let api_base_url = api_base_url.into().trim_end_matches('/').to_string();
        Self {
            api_base_url,
            company_id: None,
            access_token: None,
        }
    }

    pub fn with_company(mut self, company_id: impl Into<String>) -> Self {
        self.company_id = Some(company_id.into());
        self
    }

    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    pub fn api_base_url(&self) -> &str {
        &self.api_base_url
    }

    pub fn company_id(&self) -> Option<&str> {
        self.company_id.as_deref()
    }

    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref()
    }
}

static SESSION: OnceLock<RwLock<Option<Arc<RequestContext>>>> = OnceLock::new();

fn slot() -> &'static RwLock<Option<Arc<RequestContext>>> {
    SESSION.get_or_init(|| RwLock::new(None))
}

/// Installs `context` as the active session, replacing any previous one.
pub fn begin(context: RequestContext) -> Arc<RequestContext> {
    let context = Arc::new(context);
    let mut guard = slot().write().unwrap_or_else(|poisoned| poisoned.into_inner());
    *guard = Some(Arc::clone(&context));
    tracing::debug!(
        api_base_url = %context.api_base_url(),
        company_id = context.company_id().unwrap_or("-"),
        "Session started"
    );
    context
}

/// Clears the active session.
pub fn end() {
    let mut guard = slot().write().unwrap_or_else(|poisoned| poisoned.into_inner());
    if guard.take().is_some() {
        tracing::debug!("Session cleared");
    }
}

pub fn current() -> Option<Arc<RequestContext>> {
    slot()
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_trims_trailing_slash() {
        let ctx = RequestContext::new("http://localhost:3000/api/")
            .with_company("acme")
            .with_access_token("t0k");
        assert_eq!(ctx.api_base_url(), "http://localhost:3000/api");
        assert_eq!(ctx.company_id(), Some("acme"));
        assert_eq!(ctx.access_token(), Some("t0k"));
    }

    #[test]
    fn session_lifecycle_begin_then_end() {
        let started = begin(RequestContext::new("http://a").with_company("c1"));
        let seen = current().expect("active session");
        assert!(Arc::ptr_eq(&started, &seen));

        let replaced = begin(RequestContext::new("http://b"));
        assert_eq!(current().unwrap().api_base_url(), "http://b");
        assert_eq!(started.api_base_url(), "http://a");
        drop(replaced);

        end();
        assert!(current().is_none());
    }
}
