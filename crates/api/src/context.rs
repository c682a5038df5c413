use uuid::Uuid;

/// Per-request correlation data, inserted by the request-id middleware.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    request_id: String,
}

impl RequestContext {
    pub fn new(request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
        }
    }

    /// A fresh context with a time-ordered UUIDv7 id.
    pub fn generate() -> Self {
        Self::new(Uuid::now_v7().to_string())
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }
}
