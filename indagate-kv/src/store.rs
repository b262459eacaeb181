//! Store, transaction, bucket and cursor capabilities

use crate::error::KvResult;
use indagate_core::{Error, Result};

/// A key/value pair as returned by cursors
pub type Entry = (Vec<u8>, Vec<u8>);

/// Transaction body; an error rolls a `modify` back
pub type TxFn<'f> = &'f mut dyn FnMut(&dyn Transaction) -> Result<()>;

/// Transactional access to named buckets
///
/// `view` transactions read a consistent snapshot and may run concurrently.
/// `modify` transactions are serialized: at most one runs at a time, and its
/// writes become visible only once the body returns `Ok` and the commit
/// succeeds. Neither retries.
pub trait Store: Send + Sync {
    fn view(&self, f: TxFn<'_>) -> Result<()>;
    fn modify(&self, f: TxFn<'_>) -> Result<()>;
}

pub trait Transaction {
    /// Handle to the named bucket, created on demand in a writable
    /// transaction. A read-only transaction sees a missing bucket as empty.
    fn bucket(&self, name: &str) -> KvResult<Box<dyn Bucket + '_>>;

    fn writable(&self) -> bool;
}

pub trait Bucket {
    fn get(&self, key: &[u8]) -> KvResult<Vec<u8>>;

    /// `NotWritable` inside `view`
    fn put(&mut self, key: &[u8], value: &[u8]) -> KvResult<()>;

    /// `NotWritable` inside `view`; deleting an absent key is not an error
    fn delete(&mut self, key: &[u8]) -> KvResult<()>;

    fn cursor(&self) -> KvResult<Box<dyn Cursor + '_>>;
}

/// Ordered iteration over a bucket
///
/// Every method returns the pair the cursor lands on, or `None` once it runs
/// off either end. `next` on a fresh cursor starts at the first key and `prev`
/// at the last.
pub trait Cursor {
    fn first(&mut self) -> KvResult<Option<Entry>>;
    fn last(&mut self) -> KvResult<Option<Entry>>;
    fn next(&mut self) -> KvResult<Option<Entry>>;
    fn prev(&mut self) -> KvResult<Option<Entry>>;
    /// First key at or after `prefix`; the caller checks the prefix
    fn seek(&mut self, prefix: &[u8]) -> KvResult<Option<Entry>>;
}

/// Value-returning wrappers over [`Store`]
pub trait StoreExt: Store {
    fn read<T, F>(&self, mut f: F) -> Result<T>
    where
        F: FnMut(&dyn Transaction) -> Result<T>,
    {
        let mut out = None;
        self.view(&mut |tx| {
            out = Some(f(tx)?);
            Ok(())
        })?;
        out.ok_or_else(|| Error::internal("read transaction produced no value"))
    }

    fn write<T, F>(&self, mut f: F) -> Result<T>
    where
        F: FnMut(&dyn Transaction) -> Result<T>,
    {
        let mut out = None;
        self.modify(&mut |tx| {
            out = Some(f(tx)?);
            Ok(())
        })?;
        out.ok_or_else(|| Error::internal("write transaction produced no value"))
    }
}

impl<S: Store + ?Sized> StoreExt for S {}

/// One positioning request against an ordered source
#[derive(Debug, Clone, Copy)]
pub(crate) enum Step<'k> {
    First,
    Last,
    After(&'k [u8]),
    Before(&'k [u8]),
    AtOrAfter(&'k [u8]),
}

/// Engine-specific ordered lookup
pub(crate) trait Stepper {
    fn step(&self, step: Step<'_>) -> KvResult<Option<Entry>>;
}

#[derive(Debug, Default)]
enum Position {
    #[default]
    Unset,
    BeforeFirst,
    AfterLast,
    At(Vec<u8>),
}

/// Cursor that remembers its key, so it survives writes to the bucket
pub(crate) struct KeyCursor<S> {
    source: S,
    position: Position,
}

impl<S: Stepper> KeyCursor<S> {
    pub(crate) fn new(source: S) -> Self {
        Self {
            source,
            position: Position::Unset,
        }
    }

    fn land(&mut self, entry: Option<Entry>, miss: Position) -> KvResult<Option<Entry>> {
        self.position = match &entry {
            Some((key, _)) => Position::At(key.clone()),
            None => miss,
        };
        Ok(entry)
    }
}

impl<S: Stepper> Cursor for KeyCursor<S> {
    fn first(&mut self) -> KvResult<Option<Entry>> {
        let entry = self.source.step(Step::First)?;
        self.land(entry, Position::AfterLast)
    }

    fn last(&mut self) -> KvResult<Option<Entry>> {
        let entry = self.source.step(Step::Last)?;
        self.land(entry, Position::BeforeFirst)
    }

    fn next(&mut self) -> KvResult<Option<Entry>> {
        let entry = match &self.position {
            Position::Unset | Position::BeforeFirst => self.source.step(Step::First)?,
            Position::AfterLast => return Ok(None),
            Position::At(key) => self.source.step(Step::After(key))?,
        };
        self.land(entry, Position::AfterLast)
    }

    fn prev(&mut self) -> KvResult<Option<Entry>> {
        let entry = match &self.position {
            Position::Unset | Position::AfterLast => self.source.step(Step::Last)?,
            Position::BeforeFirst => return Ok(None),
            Position::At(key) => self.source.step(Step::Before(key))?,
        };
        self.land(entry, Position::BeforeFirst)
    }

    fn seek(&mut self, prefix: &[u8]) -> KvResult<Option<Entry>> {
        let entry = self.source.step(Step::AtOrAfter(prefix))?;
        self.land(entry, Position::AfterLast)
    }
}

pub(crate) fn check_bucket_name(name: &str) -> KvResult<()> {
    if name.is_empty() {
        return Err(crate::error::KvError::InvalidBucket(name.to_string()));
    }
    Ok(())
}
