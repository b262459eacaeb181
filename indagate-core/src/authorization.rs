//! API tokens
//!
//! An [`Authorization`] binds a bearer token to a user, an organization and an
//! ordered list of permissions. Only active authorizations grant anything.

use crate::error::{Error, Result};
use crate::id::Id;
use crate::permission::{permission_allowed, Authorizer, Permission};
use serde::{Deserialize, Serialize};

pub const AUTHORIZATION_KIND: &str = "authorization";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    #[default]
    Active,
    Inactive,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Authorization {
    #[serde(default)]
    pub id: Id,
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub status: Status,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "orgID")]
    pub org_id: Id,
    #[serde(rename = "userID")]
    pub user_id: Id,
    #[serde(default)]
    pub permissions: Vec<Permission>,
}

impl Authorization {
    pub fn new(org_id: Id, user_id: Id, permissions: Vec<Permission>) -> Self {
        Self {
            org_id,
            user_id,
            permissions,
            ..Default::default()
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == Status::Active
    }

    /// Structural checks run before the record is written
    pub fn valid(&self) -> Result<()> {
        if !self.org_id.valid() {
            return Err(Error::invalid("authorization must have a valid org id"));
        }
        if !self.user_id.valid() {
            return Err(Error::invalid("authorization must have a valid user id"));
        }
        for p in &self.permissions {
            p.valid()?;
            if let Some(org) = p.resource.org_id {
                if org != self.org_id {
                    return Err(Error::invalid(format!(
                        "permission {} is not in the authorization's organization",
                        p
                    )));
                }
            }
        }
        Ok(())
    }
}

impl Authorizer for Authorization {
    fn allowed(&self, permission: &Permission) -> bool {
        self.is_active() && permission_allowed(permission, &self.permissions)
    }

    fn identifier(&self) -> Id {
        self.id
    }

    fn user_id(&self) -> Id {
        self.user_id
    }

    fn kind(&self) -> &'static str {
        AUTHORIZATION_KIND
    }
}

/// Criteria for listing authorizations; empty matches everything
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthorizationFilter {
    pub id: Option<Id>,
    pub token: Option<String>,
    pub user_id: Option<Id>,
    pub user: Option<String>,
    pub org_id: Option<Id>,
    pub org: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl AuthorizationUpdate {
    pub fn apply(&self, auth: &mut Authorization) {
        if let Some(status) = self.status {
            auth.status = status;
        }
        if let Some(description) = &self.description {
            auth.description = description.clone();
        }
    }
}
