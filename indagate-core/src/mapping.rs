use crate::error::{Error, Result};
use crate::id::Id;
use crate::permission::{Action, Permission, ResourceType};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserType {
    /// Can read and write the resource
    Owner,
    /// Can read the resource
    Member,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MappingType {
    #[default]
    User,
    Org,
}

/// Membership of a user in a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserResourceMapping {
    #[serde(rename = "userID")]
    pub user_id: Id,
    #[serde(rename = "userType")]
    pub user_type: UserType,
    #[serde(rename = "mappingType", default)]
    pub mapping_type: MappingType,
    #[serde(rename = "resourceType")]
    pub resource_type: ResourceType,
    #[serde(rename = "resourceID")]
    pub resource_id: Id,
}

impl UserResourceMapping {
    pub fn valid(&self) -> Result<()> {
        if !self.user_id.valid() {
            return Err(Error::invalid("mapping must have a valid user id"));
        }
        if !self.resource_id.valid() {
            return Err(Error::invalid("mapping must have a valid resource id"));
        }
        Ok(())
    }

    /// Permission needed to touch this mapping, given the org owning its resource
    pub fn permission(&self, action: Action, org_id: Option<Id>) -> Permission {
        Permission::at_id(self.resource_id, action, self.resource_type, org_id)
    }

    /// Permissions this mapping confers on its user over the resource
    pub fn to_permissions(&self, org_id: Option<Id>) -> Vec<Permission> {
        let mut ps = vec![self.permission(Action::Read, org_id)];
        if self.user_type == UserType::Owner {
            ps.push(self.permission(Action::Write, org_id));
        }
        ps
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UserResourceMappingFilter {
    pub resource_id: Option<Id>,
    pub resource_type: Option<ResourceType>,
    pub user_id: Option<Id>,
    pub user_type: Option<UserType>,
}

impl UserResourceMappingFilter {
    pub fn matches(&self, m: &UserResourceMapping) -> bool {
        self.resource_id.map_or(true, |id| id == m.resource_id)
            && self.resource_type.map_or(true, |t| t == m.resource_type)
            && self.user_id.map_or(true, |id| id == m.user_id)
            && self.user_type.map_or(true, |t| t == m.user_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapping(user_type: UserType) -> UserResourceMapping {
        UserResourceMapping {
            user_id: Id::new(1),
            user_type,
            mapping_type: MappingType::User,
            resource_type: ResourceType::Orgs,
            resource_id: Id::new(2),
        }
    }

    #[test]
    fn filter_fields_are_conjunctive() {
        let m = mapping(UserType::Member);
        assert!(UserResourceMappingFilter::default().matches(&m));
        let f = UserResourceMappingFilter {
            resource_id: Some(Id::new(2)),
            user_type: Some(UserType::Owner),
            ..Default::default()
        };
        assert!(!f.matches(&m));
    }

    #[test]
    fn owners_get_write() {
        assert_eq!(mapping(UserType::Member).to_permissions(None).len(), 1);
        let owner = mapping(UserType::Owner).to_permissions(Some(Id::new(2)));
        assert_eq!(owner[1].action, Action::Write);
        assert_eq!(owner[1].resource.org_id, Some(Id::new(2)));
    }

    #[test]
    fn wire_names() {
        let json = serde_json::to_value(mapping(UserType::Owner)).unwrap();
        assert_eq!(json["userType"], "owner");
        assert_eq!(json["mappingType"], "user");
        assert_eq!(json["resourceType"], "orgs");
        assert_eq!(json["resourceID"], "0000000000000002");
    }
}
