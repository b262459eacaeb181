use crate::error::{Error, Result};
use crate::id::Id;
use serde::{Deserialize, Serialize};

/// An organization; the owner of authorizations and buckets
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Organization {
    #[serde(default)]
    pub id: Id,
    pub name: String,
    #[serde(default)]
    pub description: String,
}

impl Organization {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrganizationFilter {
    pub id: Option<Id>,
    pub name: Option<String>,
}

impl OrganizationFilter {
    pub fn by_id(id: Id) -> Self {
        Self {
            id: Some(id),
            ..Default::default()
        }
    }

    pub fn by_name<S: Into<String>>(name: S) -> Self {
        Self {
            name: Some(name.into()),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizationUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl OrganizationUpdate {
    pub fn valid(&self) -> Result<()> {
        if matches!(&self.name, Some(name) if name.is_empty()) {
            return Err(Error::invalid("organization name must not be empty"));
        }
        Ok(())
    }

    pub fn apply(&self, org: &mut Organization) {
        if let Some(name) = &self.name {
            org.name = name.clone();
        }
        if let Some(description) = &self.description {
            org.description = description.clone();
        }
    }
}
