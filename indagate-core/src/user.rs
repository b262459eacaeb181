use crate::error::{Error, Result};
use crate::id::Id;
use serde::{Deserialize, Serialize};

/// A user account
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct User {
    #[serde(default)]
    pub id: Id,
    pub name: String,
}

impl User {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            id: Id::default(),
            name: name.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserFilter {
    pub id: Option<Id>,
    pub name: Option<String>,
}

impl UserFilter {
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

/// Partial update; `None` fields are left unchanged
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl UserUpdate {
    pub fn valid(&self) -> Result<()> {
        if matches!(&self.name, Some(name) if name.is_empty()) {
            return Err(Error::invalid("user name must not be empty"));
        }
        Ok(())
    }

    pub fn apply(&self, user: &mut User) {
        if let Some(name) = &self.name {
            user.name = name.clone();
        }
    }
}
