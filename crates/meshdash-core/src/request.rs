//! Request context handed to page loaders and plugin routes

use crate::types::Message;
use std::collections::HashMap;

/// Context attached to each dashboard request
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    /// Raw request path
    pub path: String,

    /// Query string parameters
    pub query: HashMap<String, String>,

    /// Notices queued for this request, exposed to templates as `messages`
    pub messages: Vec<Message>,
}

impl RequestContext {
    /// Create a context for the given path
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    /// Get a query parameter
    pub fn param(&self, key: &str) -> Option<&str> {
        self.query.get(key).map(|s| s.as_str())
    }

    /// Set a query parameter
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(key.into(), value.into());
        self
    }

    /// Queue a message for the rendered page
    pub fn push_message(&mut self, message: Message) {
        self.messages.push(message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_context_params() {
        let ctx = RequestContext::new("/report").with_param("range", "7d");
        assert_eq!(ctx.param("range"), Some("7d"));
        assert_eq!(ctx.param("missing"), None);
    }

    #[test]
    fn test_push_message() {
        let mut ctx = RequestContext::new("/");
        ctx.push_message(Message::notice("hello"));
        assert_eq!(ctx.messages.len(), 1);
    }
}
