use crate::service::KvService;
use crate::user::USER_BUCKET;
use async_trait::async_trait;
use indagate_core::{
    operator_permissions, Authorization, Error, MappingType, Organization, RequestContext,
    ResourceType, Result, SetupRequest, SetupResult, SetupService, User, UserResourceMapping,
    UserType,
};
use indagate_kv::Transaction;
use tracing::info;

impl KvService {
    fn has_users_tx(&self, tx: &dyn Transaction) -> Result<bool> {
        let bucket = tx.bucket(USER_BUCKET)?;
        let mut cursor = bucket.cursor()?;
        Ok(cursor.first()?.is_some())
    }

    fn setup_tx(&self, tx: &dyn Transaction, req: &SetupRequest, hash: &str) -> Result<SetupResult> {
        if self.has_users_tx(tx)? {
            return Err(Error::conflict("onboarding has already been completed"));
        }

        let mut user = User::new(req.user.clone());
        self.create_user_tx(tx, &mut user)?;
        self.put_password_tx(tx, user.id, hash)?;

        let mut org = Organization::new(req.org.clone());
        self.create_organization_tx(tx, &mut org)?;

        self.create_mapping_tx(
            tx,
            &UserResourceMapping {
                user_id: user.id,
                user_type: UserType::Owner,
                mapping_type: MappingType::Org,
                resource_type: ResourceType::Orgs,
                resource_id: org.id,
            },
        )?;

        let mut auth = Authorization::new(org.id, user.id, operator_permissions());
        auth.token = req.token.clone().unwrap_or_default();
        auth.description = format!("{}'s Token", user.name);
        self.create_authorization_tx(tx, &mut auth)?;

        Ok(SetupResult { user, org, auth })
    }
}

#[async_trait]
impl SetupService for KvService {
    async fn is_onboarding(&self, _ctx: &RequestContext) -> Result<bool> {
        let has_users = self.read_op("kv/IsOnboarding", |tx| self.has_users_tx(tx))?;
        Ok(!has_users)
    }

    async fn setup(&self, ctx: &RequestContext, request: &SetupRequest) -> Result<SetupResult> {
        let hash = request
            .valid()
            .and_then(|_| self.hash_password(&request.password))
            .map_err(|e| Error::wrap("kv/Setup", e))?;

        let result = self.write_op(ctx, "kv/Setup", |tx| self.setup_tx(tx, request, &hash))?;
        info!(
            user_id = %result.user.id,
            org_id = %result.org.id,
            "onboarding completed"
        );
        Ok(result)
    }
}
