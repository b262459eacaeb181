//! Behaviour every engine must share

use indagate_core::{Error, ErrorCode, StorageConfig};
use indagate_kv::{open_store, KvError, MemoryStore, RedbStore, Store, StoreExt};
use std::sync::Arc;
use tempfile::TempDir;

fn engines() -> Vec<(&'static str, Arc<dyn Store>, Option<TempDir>)> {
    let dir = TempDir::new().unwrap();
    let memory: Arc<dyn Store> = Arc::new(MemoryStore::new());
    let redb: Arc<dyn Store> =
        Arc::new(RedbStore::open(dir.path().join("conformance.redb")).unwrap());
    vec![("memory", memory, None), ("redb", redb, Some(dir))]
}

fn seed(store: &dyn Store, bucket: &str, keys: &[&str]) {
    store
        .write(|tx| {
            let mut b = tx.bucket(bucket)?;
            for key in keys {
                b.put(key.as_bytes(), format!("v-{}", key).as_bytes())?;
            }
            Ok(())
        })
        .unwrap();
}

fn key_of(entry: Option<(Vec<u8>, Vec<u8>)>) -> Option<String> {
    entry.map(|(k, _)| String::from_utf8(k).unwrap())
}

#[test]
fn get_put_delete() {
    for (name, store, _dir) in engines() {
        seed(store.as_ref(), "b", &["a"]);

        let value = store.read(|tx| Ok(tx.bucket("b")?.get(b"a")?)).unwrap();
        assert_eq!(value, b"v-a".to_vec(), "{}", name);

        store
            .write(|tx| {
                let mut b = tx.bucket("b")?;
                b.delete(b"a")?;
                // absent keys delete quietly
                b.delete(b"zz")?;
                Ok(())
            })
            .unwrap();

        let missing = store
            .read(|tx| Ok(matches!(tx.bucket("b")?.get(b"a"), Err(KvError::KeyNotFound))))
            .unwrap();
        assert!(missing, "{}", name);
    }
}

#[test]
fn writes_fail_inside_view() {
    for (name, store, _dir) in engines() {
        seed(store.as_ref(), "b", &["a"]);
        let outcome = store
            .read(|tx| {
                assert!(!tx.writable());
                let mut b = tx.bucket("b")?;
                Ok((
                    matches!(b.put(b"x", b"y"), Err(KvError::NotWritable)),
                    matches!(b.delete(b"a"), Err(KvError::NotWritable)),
                ))
            })
            .unwrap();
        assert_eq!(outcome, (true, true), "{}", name);
    }
}

#[test]
fn buckets_are_created_on_demand() {
    for (name, store, _dir) in engines() {
        store
            .write(|tx| {
                tx.bucket("fresh")?;
                Ok(())
            })
            .unwrap();
        let empty = store
            .read(|tx| Ok(tx.bucket("fresh")?.cursor()?.first()?.is_none()))
            .unwrap();
        assert!(empty, "{}", name);

        let never = store
            .read(|tx| Ok(tx.bucket("never-created")?.cursor()?.last()?.is_none()))
            .unwrap();
        assert!(never, "{}", name);

        let err = store.read(|tx| Ok(tx.bucket("")?.get(b"k")?)).unwrap_err();
        assert_eq!(err.code(), ErrorCode::Internal, "{}", name);
    }
}

#[test]
fn cursor_walks_in_key_order() {
    for (name, store, _dir) in engines() {
        seed(store.as_ref(), "b", &["c", "a", "e", "b", "d"]);

        let (forward, backward) = store
            .read(|tx| {
                let b = tx.bucket("b")?;
                let mut c = b.cursor()?;
                let mut forward = vec![key_of(c.first()?)];
                while let Some(entry) = c.next()? {
                    forward.push(key_of(Some(entry)));
                }
                let mut backward = vec![key_of(c.last()?)];
                while let Some(entry) = c.prev()? {
                    backward.push(key_of(Some(entry)));
                }
                Ok((forward, backward))
            })
            .unwrap();

        let expected: Vec<Option<String>> =
            ["a", "b", "c", "d", "e"].iter().map(|k| Some(k.to_string())).collect();
        assert_eq!(forward, expected, "{}", name);
        let mut reversed = expected.clone();
        reversed.reverse();
        assert_eq!(backward, reversed, "{}", name);
    }
}

#[test]
fn fresh_cursor_and_exhaustion() {
    for (name, store, _dir) in engines() {
        seed(store.as_ref(), "b", &["a", "b"]);
        let steps = store
            .read(|tx| {
                let b = tx.bucket("b")?;
                let mut c = b.cursor()?;
                Ok(vec![
                    key_of(c.next()?),
                    key_of(c.next()?),
                    key_of(c.next()?),
                    key_of(c.next()?),
                    key_of(c.prev()?),
                ])
            })
            .unwrap();
        assert_eq!(
            steps,
            vec![Some("a".into()), Some("b".into()), None, None, Some("b".into())],
            "{}",
            name
        );
    }
}

#[test]
fn seek_lands_on_prefix() {
    for (name, store, _dir) in engines() {
        seed(store.as_ref(), "b", &["org1/u1", "org1/u2", "org2/u1", "org3/u9"]);
        let found = store
            .read(|tx| {
                let b = tx.bucket("b")?;
                let mut c = b.cursor()?;
                let mut found = Vec::new();
                let mut entry = c.seek(b"org2/")?;
                while let Some((k, _)) = entry {
                    if !k.starts_with(b"org2/") {
                        break;
                    }
                    found.push(String::from_utf8(k).unwrap());
                    entry = c.next()?;
                }
                let past_end = key_of(c.seek(b"org9")?);
                Ok((found, past_end))
            })
            .unwrap();
        assert_eq!(found, (vec!["org2/u1".to_string()], None), "{}", name);
    }
}

#[test]
fn failed_modify_rolls_back() {
    for (name, store, _dir) in engines() {
        seed(store.as_ref(), "b", &["keep"]);
        let err = store
            .modify(&mut |tx| {
                let mut b = tx.bucket("b")?;
                b.put(b"new", b"value")?;
                b.delete(b"keep")?;
                Err(Error::not_found("owning org missing"))
            })
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotFound, "{}", name);

        let (has_new, has_keep) = store
            .read(|tx| {
                let b = tx.bucket("b")?;
                Ok((b.get(b"new").is_ok(), b.get(b"keep").is_ok()))
            })
            .unwrap();
        assert!(!has_new, "{}", name);
        assert!(has_keep, "{}", name);
    }
}

#[test]
fn cursor_sees_writes_made_in_the_same_transaction() {
    for (name, store, _dir) in engines() {
        let keys = store
            .write(|tx| {
                let mut b = tx.bucket("b")?;
                b.put(b"1", b"x")?;
                b.put(b"2", b"y")?;
                drop(b);
                let b = tx.bucket("b")?;
                let mut c = b.cursor()?;
                let mut keys = Vec::new();
                let mut entry = c.first()?;
                while let Some((k, _)) = entry {
                    keys.push(k);
                    entry = c.next()?;
                }
                Ok(keys)
            })
            .unwrap();
        assert_eq!(keys, vec![b"1".to_vec(), b"2".to_vec()], "{}", name);
    }
}

#[test]
fn writers_are_serialized() {
    for (name, store, _dir) in engines() {
        seed(store.as_ref(), "counter", &[]);
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    for _ in 0..25 {
                        store
                            .write(|tx| {
                                let mut b = tx.bucket("counter")?;
                                let n = match b.get(b"n") {
                                    Ok(v) => String::from_utf8_lossy(&v).parse::<u64>().unwrap_or(0),
                                    Err(KvError::KeyNotFound) => 0,
                                    Err(e) => return Err(e.into()),
                                };
                                b.put(b"n", (n + 1).to_string().as_bytes())?;
                                Ok(())
                            })
                            .unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        let n = store
            .read(|tx| Ok(tx.bucket("counter")?.get(b"n")?))
            .unwrap();
        assert_eq!(n, b"200".to_vec(), "{}", name);
    }
}

#[test]
fn open_store_honours_engine() {
    let dir = TempDir::new().unwrap();
    let memory = open_store(&StorageConfig::memory()).unwrap();
    seed(memory.as_ref(), "b", &["a"]);

    let disk = open_store(&StorageConfig::redb(dir.path().join("x.redb"))).unwrap();
    seed(disk.as_ref(), "b", &["a"]);
    assert!(dir.path().join("x.redb").exists());
}
