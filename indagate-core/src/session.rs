use crate::error::{Error, Result};
use crate::id::Id;
use crate::permission::{permission_allowed, Authorizer, Permission};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const SESSION_KIND: &str = "session";

/// A logged-in user session, looked up by its key
///
/// Validity is a pure function of the clock: a session is expired the
/// instant `now > expires_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: Id,
    pub key: String,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "expiresAt")]
    pub expires_at: DateTime<Utc>,
    #[serde(rename = "userID")]
    pub user_id: Id,
    #[serde(default)]
    pub permissions: Vec<Permission>,
}

impl Session {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// `Unauthorized` once the session has expired
    pub fn expired(&self) -> Result<()> {
        self.expired_at(Utc::now())
    }

    pub fn expired_at(&self, now: DateTime<Utc>) -> Result<()> {
        if self.is_expired_at(now) {
            return Err(Error::unauthorized("session has expired"));
        }
        Ok(())
    }
}

/// Expiry here is judged by the wall clock. `SessionService::find_session`
/// judges it by the service's own clock; use [`Session::expired_at`] when the
/// two must agree.
impl Authorizer for Session {
    fn allowed(&self, permission: &Permission) -> bool {
        self.expired().is_ok() && permission_allowed(permission, &self.permissions)
    }

    fn identifier(&self) -> Id {
        self.id
    }

    fn user_id(&self) -> Id {
        self.user_id
    }

    fn kind(&self) -> &'static str {
        SESSION_KIND
    }
}
