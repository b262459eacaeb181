use crate::index::{
    decode, delete_indexed, encode, ensure_unique, filter, for_each, get_record, page,
    put_indexed, resolve_index,
};
use crate::service::KvService;
use async_trait::async_trait;
use indagate_core::{
    Error, FindOptions, Id, Organization, OrganizationFilter, OrganizationService,
    OrganizationUpdate, RequestContext, Result,
};
use indagate_kv::Transaction;
use tracing::debug;

pub(crate) const ORGANIZATION_BUCKET: &str = "organizationv1";
pub(crate) const ORGANIZATION_INDEX: &str = "organizationindexv1";

impl KvService {
    pub(crate) fn find_organization_by_id_tx(
        &self,
        tx: &dyn Transaction,
        id: Id,
    ) -> Result<Organization> {
        decode(&get_record(tx, ORGANIZATION_BUCKET, id, "organization")?)
    }

    pub(crate) fn find_organization_by_name_tx(
        &self,
        tx: &dyn Transaction,
        name: &str,
    ) -> Result<Organization> {
        let id = resolve_index(tx, ORGANIZATION_INDEX, name.as_bytes(), "organization")?;
        self.find_organization_by_id_tx(tx, id)
    }

    fn find_organizations_tx(
        &self,
        ctx: &RequestContext,
        tx: &dyn Transaction,
        f: &OrganizationFilter,
    ) -> Result<Vec<Organization>> {
        if let Some(id) = f.id {
            let org = self.find_organization_by_id_tx(tx, id)?;
            if f.name.as_ref().is_some_and(|name| *name != org.name) {
                return Ok(Vec::new());
            }
            return Ok(vec![org]);
        }
        if let Some(name) = &f.name {
            return Ok(vec![self.find_organization_by_name_tx(tx, name)?]);
        }
        filter(ctx, tx, ORGANIZATION_BUCKET, |_: &Organization| true)
    }

    fn put_organization_tx(&self, tx: &dyn Transaction, org: &Organization) -> Result<()> {
        put_indexed(
            tx,
            ORGANIZATION_BUCKET,
            ORGANIZATION_INDEX,
            org.id,
            org.name.as_bytes(),
            &encode(org)?,
        )
    }

    pub(crate) fn create_organization_tx(
        &self,
        tx: &dyn Transaction,
        org: &mut Organization,
    ) -> Result<()> {
        if org.name.is_empty() {
            return Err(Error::invalid("organization name must not be empty"));
        }
        ensure_unique(tx, ORGANIZATION_INDEX, org.name.as_bytes(), "organization name")?;
        if !org.id.valid() {
            org.id = self.id_generator.id();
        }
        self.put_organization_tx(tx, org)?;
        debug!(org_id = %org.id, "created organization");
        Ok(())
    }

    fn update_organization_tx(
        &self,
        tx: &dyn Transaction,
        id: Id,
        update: &OrganizationUpdate,
    ) -> Result<Organization> {
        update.valid()?;
        let mut org = self.find_organization_by_id_tx(tx, id)?;
        if let Some(name) = &update.name {
            if *name != org.name {
                ensure_unique(tx, ORGANIZATION_INDEX, name.as_bytes(), "organization name")?;
                tx.bucket(ORGANIZATION_INDEX)?.delete(org.name.as_bytes())?;
            }
        }
        update.apply(&mut org);
        self.put_organization_tx(tx, &org)?;
        Ok(org)
    }

    fn delete_organization_tx(
        &self,
        ctx: &RequestContext,
        tx: &dyn Transaction,
        id: Id,
    ) -> Result<()> {
        let org = self.find_organization_by_id_tx(tx, id)?;
        delete_indexed(tx, ORGANIZATION_BUCKET, ORGANIZATION_INDEX, id, org.name.as_bytes())?;
        let tokens = self.delete_authorizations_tx(ctx, tx, |a| a.org_id == id)?;
        self.delete_mappings_tx(ctx, tx, Some(id), |_| true)?;
        debug!(org_id = %id, tokens, "deleted organization");
        Ok(())
    }
}

#[async_trait]
impl OrganizationService for KvService {
    async fn find_organization_by_id(&self, _ctx: &RequestContext, id: Id) -> Result<Organization> {
        self.read_op("kv/FindOrganizationByID", |tx| {
            self.find_organization_by_id_tx(tx, id)
        })
    }

    async fn find_organization(
        &self,
        ctx: &RequestContext,
        f: OrganizationFilter,
    ) -> Result<Organization> {
        let found = self.read_op("kv/FindOrganization", |tx| {
            if f.id.is_some() || f.name.is_some() {
                return Ok(self.find_organizations_tx(ctx, tx, &f)?.into_iter().next());
            }
            let mut first = None;
            for_each(ctx, tx, ORGANIZATION_BUCKET, |org: Organization| {
                first = Some(org);
                Ok(false)
            })?;
            Ok(first)
        })?;
        found.ok_or_else(|| {
            Error::wrap(
                "kv/FindOrganization",
                Error::not_found("organization not found"),
            )
        })
    }

    async fn find_organizations(
        &self,
        ctx: &RequestContext,
        f: OrganizationFilter,
        opts: FindOptions,
    ) -> Result<(Vec<Organization>, usize)> {
        let orgs = self.read_op("kv/FindOrganizations", |tx| {
            self.find_organizations_tx(ctx, tx, &f)
        })?;
        Ok(page(orgs, opts))
    }

    async fn create_organization(
        &self,
        ctx: &RequestContext,
        org: &mut Organization,
    ) -> Result<()> {
        let created = self.write_op(ctx, "kv/CreateOrganization", |tx| {
            let mut candidate = org.clone();
            self.create_organization_tx(tx, &mut candidate)?;
            Ok(candidate)
        })?;
        *org = created;
        Ok(())
    }

    async fn update_organization(
        &self,
        ctx: &RequestContext,
        id: Id,
        update: OrganizationUpdate,
    ) -> Result<Organization> {
        self.write_op(ctx, "kv/UpdateOrganization", |tx| {
            self.update_organization_tx(tx, id, &update)
        })
    }

    async fn delete_organization(&self, ctx: &RequestContext, id: Id) -> Result<()> {
        self.write_op(ctx, "kv/DeleteOrganization", |tx| {
            self.delete_organization_tx(ctx, tx, id)
        })
    }
}
