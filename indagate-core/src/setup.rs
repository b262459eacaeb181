use crate::authorization::Authorization;
use crate::error::{Error, Result};
use crate::organization::Organization;
use crate::user::User;
use serde::{Deserialize, Serialize};

/// First-run onboarding request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetupRequest {
    pub user: String,
    pub password: String,
    pub org: String,
    /// Token for the initial authorization; generated when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl SetupRequest {
    pub fn valid(&self) -> Result<()> {
        if self.password.is_empty() {
            return Err(Error::invalid("password is empty"));
        }
        if self.user.is_empty() {
            return Err(Error::invalid("user is empty"));
        }
        if self.org.is_empty() {
            return Err(Error::invalid("org is empty"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetupResult {
    pub user: User,
    pub org: Organization,
    pub auth: Authorization,
}
