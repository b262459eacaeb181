use crate::service::KvService;
use async_trait::async_trait;
use indagate_core::{Error, Id, OrganizationLookup, RequestContext, ResourceType, Result};

#[async_trait]
impl OrganizationLookup for KvService {
    async fn find_resource_organization_id(
        &self,
        _ctx: &RequestContext,
        kind: ResourceType,
        id: Id,
    ) -> Result<Id> {
        self.read_op("kv/FindResourceOrganizationID", |tx| match kind {
            ResourceType::Orgs => Ok(self.find_organization_by_id_tx(tx, id)?.id),
            ResourceType::Authorizations => Ok(self.find_authorization_by_id_tx(tx, id)?.org_id),
            other => Err(Error::invalid(format!("unsupported resource type {}", other))),
        })
    }
}
