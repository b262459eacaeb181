//! Primary-record and secondary-index primitives shared by every entity

use indagate_core::{Error, FindOptions, Id, RequestContext, Result};
use indagate_kv::{KvError, Transaction};
use serde::de::DeserializeOwned;
use serde::Serialize;

pub(crate) fn encode<T: Serialize>(record: &T) -> Result<Vec<u8>> {
    serde_json::to_vec(record)
        .map_err(|e| Error::internal("unable to encode record").with_source(e))
}

pub(crate) fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    serde_json::from_slice(bytes)
        .map_err(|e| Error::invalid("unable to decode record").with_source(e))
}

/// Raw primary record for `id`
pub(crate) fn get_record(
    tx: &dyn Transaction,
    bucket: &str,
    id: Id,
    entity: &str,
) -> Result<Vec<u8>> {
    let key = id.encode()?;
    match tx.bucket(bucket)?.get(&key) {
        Ok(value) => Ok(value),
        Err(KvError::KeyNotFound) => Err(Error::not_found(format!("{} not found", entity))),
        Err(e) => Err(e.into()),
    }
}

/// Id owning `key` in an index bucket
pub(crate) fn resolve_index(
    tx: &dyn Transaction,
    index: &str,
    key: &[u8],
    entity: &str,
) -> Result<Id> {
    match tx.bucket(index)?.get(key) {
        Ok(value) => Id::decode(&value),
        Err(KvError::KeyNotFound) => Err(Error::not_found(format!("{} not found", entity))),
        Err(e) => Err(e.into()),
    }
}

/// `Conflict` when the candidate key is already indexed
pub(crate) fn ensure_unique(
    tx: &dyn Transaction,
    index: &str,
    key: &[u8],
    what: &str,
) -> Result<()> {
    match tx.bucket(index)?.get(key) {
        Ok(_) => Err(Error::conflict(format!("{} is already in use", what))),
        Err(KvError::KeyNotFound) => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Write the index entry, then the primary record
pub(crate) fn put_indexed(
    tx: &dyn Transaction,
    primary: &str,
    index: &str,
    id: Id,
    natural_key: &[u8],
    record: &[u8],
) -> Result<()> {
    let key = id.encode()?;
    tx.bucket(index)?.put(natural_key, &key)?;
    tx.bucket(primary)?.put(&key, record)?;
    Ok(())
}

/// Remove the index entry, then the primary record
pub(crate) fn delete_indexed(
    tx: &dyn Transaction,
    primary: &str,
    index: &str,
    id: Id,
    natural_key: &[u8],
) -> Result<()> {
    let key = id.encode()?;
    tx.bucket(index)?.delete(natural_key)?;
    tx.bucket(primary)?.delete(&key)?;
    Ok(())
}

/// Visit every record of `bucket` in key order until `f` returns `false`
///
/// The bucket stays open during the walk, so `f` must not open it again.
pub(crate) fn for_each<T, F>(
    ctx: &RequestContext,
    tx: &dyn Transaction,
    bucket: &str,
    mut f: F,
) -> Result<()>
where
    T: DeserializeOwned,
    F: FnMut(T) -> Result<bool>,
{
    let b = tx.bucket(bucket)?;
    let mut cursor = b.cursor()?;
    let mut entry = cursor.first()?;
    while let Some((_, value)) = entry {
        ctx.check_cancelled()?;
        if !f(decode(&value)?)? {
            break;
        }
        entry = cursor.next()?;
    }
    Ok(())
}

/// Matching records of `bucket`, in key order
pub(crate) fn filter<T, P>(
    ctx: &RequestContext,
    tx: &dyn Transaction,
    bucket: &str,
    keep: P,
) -> Result<Vec<T>>
where
    T: DeserializeOwned,
    P: Fn(&T) -> bool,
{
    let mut out = Vec::new();
    for_each(ctx, tx, bucket, |record: T| {
        if keep(&record) {
            out.push(record);
        }
        Ok(true)
    })?;
    Ok(out)
}

/// Apply paging, keeping the pre-paging match count
pub(crate) fn page<T>(items: Vec<T>, opts: FindOptions) -> (Vec<T>, usize) {
    let total = items.len();
    (opts.apply(items), total)
}
