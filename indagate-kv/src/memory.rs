//! In-process engine
//!
//! Committed state is an immutable snapshot. Readers clone the `Arc`; the one
//! writer works on a private copy and swaps it in when its body succeeds.

use crate::error::{KvError, KvResult};
use crate::store::{check_bucket_name, Bucket, Cursor, Entry, KeyCursor, Step, Stepper, Store, Transaction, TxFn};
use indagate_core::Result;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::{Arc, Mutex, RwLock};
use tracing::debug;

type Tree = BTreeMap<Vec<u8>, Vec<u8>>;
type Buckets = BTreeMap<String, Tree>;

#[derive(Debug, Default)]
pub struct MemoryStore {
    committed: RwLock<Arc<Buckets>>,
    writer: Mutex<()>,
}

fn poisoned() -> KvError {
    KvError::engine("memory store lock poisoned")
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn snapshot(&self) -> KvResult<Arc<Buckets>> {
        self.committed
            .read()
            .map(|guard| Arc::clone(&guard))
            .map_err(|_| poisoned())
    }
}

impl Store for MemoryStore {
    fn view(&self, f: TxFn<'_>) -> Result<()> {
        let tx = MemoryTransaction {
            state: State::Read(self.snapshot()?),
        };
        f(&tx)
    }

    fn modify(&self, f: TxFn<'_>) -> Result<()> {
        let _writer = self.writer.lock().map_err(|_| poisoned())?;
        let base = self.snapshot()?;
        let tx = MemoryTransaction {
            state: State::Write(RefCell::new(base.as_ref().clone())),
        };

        if let Err(e) = f(&tx) {
            debug!(error = %e, "memory transaction rolled back");
            return Err(e);
        }

        if let State::Write(pending) = tx.state {
            let mut committed = self.committed.write().map_err(|_| poisoned())?;
            *committed = Arc::new(pending.into_inner());
        }
        Ok(())
    }
}

enum State {
    Read(Arc<Buckets>),
    Write(RefCell<Buckets>),
}

struct MemoryTransaction {
    state: State,
}

impl MemoryTransaction {
    fn with_tree<T>(&self, name: &str, f: impl FnOnce(Option<&Tree>) -> T) -> T {
        match &self.state {
            State::Read(buckets) => f(buckets.get(name)),
            State::Write(buckets) => f(buckets.borrow().get(name)),
        }
    }

    fn with_tree_mut<T>(&self, name: &str, f: impl FnOnce(&mut Tree) -> T) -> KvResult<T> {
        match &self.state {
            State::Read(_) => Err(KvError::NotWritable),
            State::Write(buckets) => {
                let mut buckets = buckets.borrow_mut();
                Ok(f(buckets.entry(name.to_string()).or_default()))
            }
        }
    }
}

impl Transaction for MemoryTransaction {
    fn bucket(&self, name: &str) -> KvResult<Box<dyn Bucket + '_>> {
        check_bucket_name(name)?;
        if self.writable() {
            self.with_tree_mut(name, |_| ())?;
        }
        Ok(Box::new(MemoryBucket {
            tx: self,
            name: name.to_string(),
        }))
    }

    fn writable(&self) -> bool {
        matches!(self.state, State::Write(_))
    }
}

struct MemoryBucket<'a> {
    tx: &'a MemoryTransaction,
    name: String,
}

impl Bucket for MemoryBucket<'_> {
    fn get(&self, key: &[u8]) -> KvResult<Vec<u8>> {
        self.tx
            .with_tree(&self.name, |tree| tree.and_then(|t| t.get(key).cloned()))
            .ok_or(KvError::KeyNotFound)
    }

    fn put(&mut self, key: &[u8], value: &[u8]) -> KvResult<()> {
        self.tx.with_tree_mut(&self.name, |tree| {
            tree.insert(key.to_vec(), value.to_vec());
        })
    }

    fn delete(&mut self, key: &[u8]) -> KvResult<()> {
        self.tx.with_tree_mut(&self.name, |tree| {
            tree.remove(key);
        })
    }

    fn cursor(&self) -> KvResult<Box<dyn Cursor + '_>> {
        Ok(Box::new(KeyCursor::new(MemoryStepper {
            tx: self.tx,
            name: &self.name,
        })))
    }
}

struct MemoryStepper<'a> {
    tx: &'a MemoryTransaction,
    name: &'a str,
}

impl Stepper for MemoryStepper<'_> {
    fn step(&self, step: Step<'_>) -> KvResult<Option<Entry>> {
        Ok(self.tx.with_tree(self.name, |tree| {
            let tree = tree?;
            let found = match step {
                Step::First => tree.iter().next(),
                Step::Last => tree.iter().next_back(),
                Step::After(key) => tree
                    .range::<[u8], _>((Bound::Excluded(key), Bound::Unbounded))
                    .next(),
                Step::Before(key) => tree
                    .range::<[u8], _>((Bound::Unbounded, Bound::Excluded(key)))
                    .next_back(),
                Step::AtOrAfter(key) => tree
                    .range::<[u8], _>((Bound::Included(key), Bound::Unbounded))
                    .next(),
            };
            found.map(|(k, v)| (k.clone(), v.clone()))
        }))
    }
}
