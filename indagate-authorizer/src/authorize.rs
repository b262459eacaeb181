//! Permission checks against the caller carried by a [`RequestContext`]

use indagate_core::{Error, ErrorCode, Permission, RequestContext, Result};
use tracing::{debug, warn};

fn check(ctx: &RequestContext, permission: &Permission) -> Result<()> {
    if ctx.authorizer()?.allowed(permission) {
        Ok(())
    } else {
        Err(Error::unauthorized(format!("{} is unauthorized", permission)))
    }
}

/// `Unauthorized` unless the caller holds `permission`
pub fn is_allowed(ctx: &RequestContext, permission: &Permission) -> Result<()> {
    check(ctx, permission).inspect_err(|_| {
        if let Ok(caller) = ctx.authorizer() {
            warn!(
                request_id = %ctx.request_id(),
                kind = caller.kind(),
                principal = %caller.identifier(),
                permission = %permission,
                "permission denied"
            );
        }
    })
}

/// `Forbidden` unless the caller holds every permission it is handing out
pub fn verify_permissions(ctx: &RequestContext, permissions: &[Permission]) -> Result<()> {
    for permission in permissions {
        is_allowed(ctx, permission).map_err(|e| {
            Error::forbidden(format!("permission {} is not allowed", permission)).with_source(e)
        })?;
    }
    Ok(())
}

/// Keep the items whose read permission the caller holds, in order
///
/// A denial drops the item; any other failure aborts.
pub fn filter_authorized<T, F>(ctx: &RequestContext, items: Vec<T>, permission: F) -> Result<Vec<T>>
where
    F: Fn(&T) -> Permission,
{
    ctx.authorizer()?;
    let total = items.len();
    let mut kept = Vec::with_capacity(total);
    for item in items {
        match check(ctx, &permission(&item)) {
            Ok(()) => kept.push(item),
            Err(e) if e.code() == ErrorCode::Unauthorized => {}
            Err(e) => return Err(e),
        }
    }
    debug!(total, kept = kept.len(), "filtered collection by read permission");
    Ok(kept)
}
