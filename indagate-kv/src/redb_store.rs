//! Single-file engine backed by redb
//!
//! Each bucket is one redb table keyed and valued by raw bytes.

use crate::error::{KvError, KvResult};
use crate::store::{check_bucket_name, Bucket, Cursor, Entry, KeyCursor, Step, Stepper, Store, Transaction, TxFn};
use indagate_core::{Error, Result};
use redb::{
    AccessGuard, Database, ReadOnlyTable, ReadTransaction, ReadableTable, StorageError, Table,
    TableDefinition, TableError, WriteTransaction,
};
use std::ops::Bound;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

type Bytes = &'static [u8];

fn definition(name: &str) -> TableDefinition<'_, Bytes, Bytes> {
    TableDefinition::new(name)
}

pub struct RedbStore {
    db: Database,
    path: PathBuf,
}

impl RedbStore {
    /// Open or create the database file, creating parent directories
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                Error::internal(format!("unable to create {}", parent.display()))
                    .with_op("kv/Open")
                    .with_source(e)
            })?;
        }

        let db = Database::create(&path).map_err(|e| {
            Error::internal(format!("unable to open {}", path.display()))
                .with_op("kv/Open")
                .with_source(e)
        })?;
        info!(path = %path.display(), "opened redb store");

        Ok(Self { db, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl std::fmt::Debug for RedbStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbStore").field("path", &self.path).finish()
    }
}

impl Store for RedbStore {
    fn view(&self, f: TxFn<'_>) -> Result<()> {
        let txn = self.db.begin_read().map_err(KvError::engine)?;
        f(&RedbTransaction::Read(txn))
    }

    fn modify(&self, f: TxFn<'_>) -> Result<()> {
        let txn = self.db.begin_write().map_err(KvError::engine)?;
        let tx = RedbTransaction::Write(txn);
        let outcome = f(&tx);

        let RedbTransaction::Write(txn) = tx else {
            return Err(Error::internal("write transaction changed kind"));
        };
        match outcome {
            Ok(()) => {
                txn.commit().map_err(KvError::engine)?;
                Ok(())
            }
            Err(e) => {
                debug!(error = %e, "redb transaction rolled back");
                txn.abort().map_err(KvError::engine)?;
                Err(e)
            }
        }
    }
}

enum RedbTransaction {
    Read(ReadTransaction),
    Write(WriteTransaction),
}

impl Transaction for RedbTransaction {
    fn bucket(&self, name: &str) -> KvResult<Box<dyn Bucket + '_>> {
        check_bucket_name(name)?;
        let bucket = match self {
            RedbTransaction::Read(txn) => match txn.open_table(definition(name)) {
                Ok(table) => RedbBucket::Read(table),
                Err(TableError::TableDoesNotExist(_)) => RedbBucket::Missing,
                Err(e) => return Err(KvError::engine(e)),
            },
            RedbTransaction::Write(txn) => {
                RedbBucket::Write(txn.open_table(definition(name)).map_err(KvError::engine)?)
            }
        };
        Ok(Box::new(bucket))
    }

    fn writable(&self) -> bool {
        matches!(self, RedbTransaction::Write(_))
    }
}

enum RedbBucket<'txn> {
    /// Never created; only seen by read transactions
    Missing,
    Read(ReadOnlyTable<Bytes, Bytes>),
    Write(Table<'txn, Bytes, Bytes>),
}

fn lookup<T: ReadableTable<Bytes, Bytes>>(table: &T, key: &[u8]) -> KvResult<Vec<u8>> {
    match table.get(key).map_err(KvError::engine)? {
        Some(value) => Ok(value.value().to_vec()),
        None => Err(KvError::KeyNotFound),
    }
}

impl Bucket for RedbBucket<'_> {
    fn get(&self, key: &[u8]) -> KvResult<Vec<u8>> {
        match self {
            RedbBucket::Missing => Err(KvError::KeyNotFound),
            RedbBucket::Read(table) => lookup(table, key),
            RedbBucket::Write(table) => lookup(table, key),
        }
    }

    fn put(&mut self, key: &[u8], value: &[u8]) -> KvResult<()> {
        match self {
            RedbBucket::Write(table) => {
                table.insert(key, value).map_err(KvError::engine)?;
                Ok(())
            }
            _ => Err(KvError::NotWritable),
        }
    }

    fn delete(&mut self, key: &[u8]) -> KvResult<()> {
        match self {
            RedbBucket::Write(table) => {
                table.remove(key).map_err(KvError::engine)?;
                Ok(())
            }
            _ => Err(KvError::NotWritable),
        }
    }

    fn cursor(&self) -> KvResult<Box<dyn Cursor + '_>> {
        let cursor: Box<dyn Cursor + '_> = match self {
            RedbBucket::Missing => Box::new(KeyCursor::new(
                TableStepper::<ReadOnlyTable<Bytes, Bytes>> { table: None },
            )),
            RedbBucket::Read(table) => Box::new(KeyCursor::new(TableStepper { table: Some(table) })),
            RedbBucket::Write(table) => {
                Box::new(KeyCursor::new(TableStepper { table: Some(table) }))
            }
        };
        Ok(cursor)
    }
}

struct TableStepper<'t, T> {
    table: Option<&'t T>,
}

type RangeItem<'a> = Option<std::result::Result<(AccessGuard<'a, Bytes>, AccessGuard<'a, Bytes>), StorageError>>;

fn to_entry(item: RangeItem<'_>) -> KvResult<Option<Entry>> {
    match item {
        None => Ok(None),
        Some(pair) => {
            let (key, value) = pair.map_err(KvError::engine)?;
            Ok(Some((key.value().to_vec(), value.value().to_vec())))
        }
    }
}

impl<T: ReadableTable<Bytes, Bytes>> Stepper for TableStepper<'_, T> {
    fn step(&self, step: Step<'_>) -> KvResult<Option<Entry>> {
        let Some(table) = self.table else {
            return Ok(None);
        };
        match step {
            Step::First => to_entry(table.range::<&[u8]>(..).map_err(KvError::engine)?.next()),
            Step::Last => to_entry(table.range::<&[u8]>(..).map_err(KvError::engine)?.next_back()),
            Step::After(key) => to_entry(
                table
                    .range::<&[u8]>((Bound::Excluded(key), Bound::Unbounded))
                    .map_err(KvError::engine)?
                    .next(),
            ),
            Step::Before(key) => to_entry(
                table
                    .range::<&[u8]>((Bound::Unbounded, Bound::Excluded(key)))
                    .map_err(KvError::engine)?
                    .next_back(),
            ),
            Step::AtOrAfter(key) => to_entry(
                table
                    .range::<&[u8]>((Bound::Included(key), Bound::Unbounded))
                    .map_err(KvError::engine)?
                    .next(),
            ),
        }
    }
}
