//! Permission model
//!
//! A [`Permission`] pairs an [`Action`] with a [`Resource`]. Held permissions
//! without a resource id are blanket grants over every resource of that type,
//! either inside one organization or, when no organization is set, globally.

use crate::error::{Error, Result};
use crate::id::Id;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Read,
    Write,
    ReadWrite,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Read => "read",
            Action::Write => "write",
            Action::ReadWrite => "readwrite",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resource types that participate in the permission model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    Authorizations,
    Buckets,
    Orgs,
    Users,
}

impl ResourceType {
    pub const ALL: [ResourceType; 4] = [
        ResourceType::Authorizations,
        ResourceType::Buckets,
        ResourceType::Orgs,
        ResourceType::Users,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::Authorizations => "authorizations",
            ResourceType::Buckets => "buckets",
            ResourceType::Orgs => "orgs",
            ResourceType::Users => "users",
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An authorizable resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Resource {
    #[serde(rename = "type")]
    pub kind: ResourceType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Id>,
    #[serde(rename = "orgID", default, skip_serializing_if = "Option::is_none")]
    pub org_id: Option<Id>,
}

impl Resource {
    pub fn valid(&self) -> Result<()> {
        if matches!(self.id, Some(id) if !id.valid()) {
            return Err(Error::invalid(format!("invalid {} resource id", self.kind)));
        }
        if matches!(self.org_id, Some(org) if !org.valid()) {
            return Err(Error::invalid(format!("invalid {} resource org id", self.kind)));
        }
        Ok(())
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(org) = self.org_id {
            write!(f, "orgs/{}/", org)?;
        }
        write!(f, "{}", self.kind)?;
        if let Some(id) = self.id {
            write!(f, "/{}", id)?;
        }
        Ok(())
    }
}

/// An action on a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Permission {
    pub action: Action,
    pub resource: Resource,
}

impl Permission {
    /// Blanket grant over `kind`, scoped to `org` when given
    pub fn new(action: Action, kind: ResourceType, org_id: Option<Id>) -> Self {
        Self {
            action,
            resource: Resource {
                kind,
                id: None,
                org_id,
            },
        }
    }

    /// Grant over exactly one resource instance
    pub fn at_id(id: Id, action: Action, kind: ResourceType, org_id: Option<Id>) -> Self {
        Self {
            action,
            resource: Resource {
                kind,
                id: Some(id),
                org_id,
            },
        }
    }

    pub fn global(action: Action, kind: ResourceType) -> Self {
        Self::new(action, kind, None)
    }

    pub fn valid(&self) -> Result<()> {
        self.resource.valid()
    }

    /// Whether this held permission covers `requested`
    pub fn matches(&self, requested: &Permission) -> bool {
        if self.action != requested.action || self.resource.kind != requested.resource.kind {
            return false;
        }

        match self.resource.id {
            Some(id) => requested.resource.id == Some(id),
            None => match self.resource.org_id {
                None => true,
                Some(org) => requested.resource.org_id == Some(org),
            },
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.action, self.resource)
    }
}

/// Whether any permission in `held` covers `requested`
pub fn permission_allowed(requested: &Permission, held: &[Permission]) -> bool {
    held.iter().any(|p| p.matches(requested))
}

/// A principal able to answer permission questions
pub trait Authorizer: fmt::Debug + Send + Sync {
    fn allowed(&self, permission: &Permission) -> bool;
    fn identifier(&self) -> Id;
    fn user_id(&self) -> Id;
    /// Principal kind, for auditing
    fn kind(&self) -> &'static str;
}

/// Read and write on every resource type
pub fn operator_permissions() -> Vec<Permission> {
    ResourceType::ALL
        .iter()
        .flat_map(|&kind| {
            [
                Permission::global(Action::Read, kind),
                Permission::global(Action::Write, kind),
            ]
        })
        .collect()
}

const ORG_SCOPED: [ResourceType; 3] = [
    ResourceType::Authorizations,
    ResourceType::Buckets,
    ResourceType::Orgs,
];

/// Read and write on the org and everything it owns
pub fn owner_permissions(org_id: Id) -> Vec<Permission> {
    ORG_SCOPED
        .iter()
        .flat_map(|&kind| {
            [
                Permission::new(Action::Read, kind, Some(org_id)),
                Permission::new(Action::Write, kind, Some(org_id)),
            ]
        })
        .collect()
}

/// Read on the org and everything it owns
pub fn member_permissions(org_id: Id) -> Vec<Permission> {
    ORG_SCOPED
        .iter()
        .map(|&kind| Permission::new(Action::Read, kind, Some(org_id)))
        .collect()
}

/// Read and write on the user record itself
pub fn me_permissions(user_id: Id) -> Vec<Permission> {
    vec![
        Permission::at_id(user_id, Action::Read, ResourceType::Users, None),
        Permission::at_id(user_id, Action::Write, ResourceType::Users, None),
    ]
}
