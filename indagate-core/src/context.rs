//! Request scope passed explicitly into every service call

use crate::error::{Error, Result};
use crate::permission::Authorizer;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use uuid::Uuid;

/// Per-request state: the resolved caller and a cancellation flag
///
/// Cloning is cheap and clones share the cancellation flag.
#[derive(Clone)]
pub struct RequestContext {
    request_id: Uuid,
    authorizer: Option<Arc<dyn Authorizer>>,
    cancelled: Arc<AtomicBool>,
}

impl RequestContext {
    /// Context with no caller attached
    pub fn new() -> Self {
        Self {
            request_id: Uuid::new_v4(),
            authorizer: None,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_authorizer(authorizer: Arc<dyn Authorizer>) -> Self {
        Self {
            authorizer: Some(authorizer),
            ..Self::new()
        }
    }

    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    /// The caller, or `Unauthorized` when authentication never ran
    pub fn authorizer(&self) -> Result<&dyn Authorizer> {
        self.authorizer
            .as_deref()
            .ok_or_else(|| Error::unauthorized("authorizer not found on context"))
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub fn check_cancelled(&self) -> Result<()> {
        if self.is_cancelled() {
            return Err(Error::internal("request cancelled"));
        }
        Ok(())
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestContext")
            .field("request_id", &self.request_id)
            .field("authorizer", &self.authorizer.as_ref().map(|a| a.kind()))
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}
