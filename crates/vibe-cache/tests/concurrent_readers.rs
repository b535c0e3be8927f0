//! Readers racing a writer never observe a partial entry.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use vibe_cache::{CacheStore, FileCacheStore};
use vibe_core::CacheKey;

#[test]
fn readers_see_nothing_or_everything() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(FileCacheStore::new(dir.path()));
    let key = CacheKey::parse(&"9".repeat(CacheKey::HEX_LEN)).unwrap();
    let source: String = "fn big() { return 1 }\n".repeat(20_000);
    let done = Arc::new(AtomicBool::new(false));

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let store = Arc::clone(&store);
            let key = key.clone();
            let expected = source.clone();
            let done = Arc::clone(&done);
            thread::spawn(move || {
                while !done.load(Ordering::Acquire) {
                    if let Some(found) = store.lookup("big", &key).unwrap() {
                        assert_eq!(found.len(), expected.len());
                    }
                }
            })
        })
        .collect();

    for _ in 0..10 {
        store.store("big", &key, &source).unwrap();
    }
    done.store(true, Ordering::Release);

    for reader in readers {
        reader.join().unwrap();
    }
    assert_eq!(store.lookup("big", &key).unwrap().unwrap(), source);
}
