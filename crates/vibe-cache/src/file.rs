//! Directory-backed cache: one `{name}_{key}.vibe` file per entry.

use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use vibe_core::normalize::is_identifier;
use vibe_core::CacheKey;

use crate::{CacheError, CacheResult, CacheStore};

/// Extension of published cache entries.
pub const ENTRY_EXTENSION: &str = "vibe";

const TEMP_PREFIX: &str = ".tmp-";

/// A published entry found by [`FileCacheStore::entries`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CacheEntryInfo {
    pub name: String,
    pub key: CacheKey,
    pub path: PathBuf,
    pub size_bytes: u64,
}

/// File-backed [`CacheStore`].
///
/// The directory is created on the first store. Entries are written to a
/// temporary file in the same directory and renamed into place, so a reader
/// sees either the previous state or the complete new file.
#[derive(Clone, Debug)]
pub struct FileCacheStore {
    dir: PathBuf,
}

impl FileCacheStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Deterministic location of the entry for (name, key).
    pub fn entry_path(&self, name: &str, key: &CacheKey) -> PathBuf {
        self.dir
            .join(format!("{}_{}.{}", name, key.as_str(), ENTRY_EXTENSION))
    }

    /// Published entries, sorted by file name. A missing directory has none.
    pub fn entries(&self) -> CacheResult<Vec<CacheEntryInfo>> {
        let read_dir = match std::fs::read_dir(&self.dir) {
            Ok(read_dir) => read_dir,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(CacheError::io(&self.dir, e)),
        };

        let mut entries = Vec::new();
        for entry in read_dir {
            let entry = entry.map_err(|e| CacheError::io(&self.dir, e))?;
            let file_name = entry.file_name();
            let file_name = file_name.to_string_lossy();
            let Some((name, key)) = parse_entry_name(&file_name) else {
                continue;
            };
            let metadata = entry
                .metadata()
                .map_err(|e| CacheError::io(entry.path(), e))?;
            entries.push(CacheEntryInfo {
                name,
                key,
                path: entry.path(),
                size_bytes: metadata.len(),
            });
        }

        entries.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(entries)
    }

    /// Remove one entry. Returns whether it existed.
    ///
    /// Not used by the materialization path; cache invalidation is an
    /// operator decision.
    pub fn evict(&self, name: &str, key: &CacheKey) -> CacheResult<bool> {
        check_name(name)?;
        let path = self.entry_path(name, key);
        match std::fs::remove_file(&path) {
            Ok(()) => {
                info!(function = name, key = key.short(), path = %path.display(), "cache entry evicted");
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(CacheError::io(path, e)),
        }
    }
}

impl CacheStore for FileCacheStore {
    fn lookup(&self, name: &str, key: &CacheKey) -> CacheResult<Option<String>> {
        check_name(name)?;
        let path = self.entry_path(name, key);
        match std::fs::read_to_string(&path) {
            Ok(source) if source.is_empty() => {
                warn!(function = name, path = %path.display(), "empty cache entry treated as a miss");
                Ok(None)
            }
            Ok(source) => {
                debug!(function = name, key = key.short(), path = %path.display(), "cache hit");
                Ok(Some(source))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(function = name, key = key.short(), "cache miss");
                Ok(None)
            }
            Err(e) if e.kind() == ErrorKind::InvalidData => {
                warn!(function = name, path = %path.display(), "unreadable cache entry treated as a miss");
                Ok(None)
            }
            Err(e) => Err(CacheError::io(path, e)),
        }
    }

    fn store(&self, name: &str, key: &CacheKey, source: &str) -> CacheResult<()> {
        check_name(name)?;
        std::fs::create_dir_all(&self.dir).map_err(|e| CacheError::io(&self.dir, e))?;

        let path = self.entry_path(name, key);
        let mut temp = tempfile::Builder::new()
            .prefix(TEMP_PREFIX)
            .tempfile_in(&self.dir)
            .map_err(|e| CacheError::io(&self.dir, e))?;

        temp.write_all(source.as_bytes())
            .and_then(|()| temp.flush())
            .and_then(|()| temp.as_file().sync_all())
            .map_err(|e| CacheError::io(temp.path(), e))?;

        temp.persist(&path)
            .map_err(|e| CacheError::io(&path, e.error))?;

        info!(function = name, key = key.short(), path = %path.display(), bytes = source.len(), "cache entry stored");
        Ok(())
    }
}

fn check_name(name: &str) -> CacheResult<()> {
    if is_identifier(name) {
        Ok(())
    } else {
        Err(CacheError::InvalidName(name.to_string()))
    }
}

/// Split `{name}_{key}.vibe` back into its parts. Names may contain `_`.
fn parse_entry_name(file_name: &str) -> Option<(String, CacheKey)> {
    if file_name.starts_with(TEMP_PREFIX) {
        return None;
    }
    let stem = file_name.strip_suffix(ENTRY_EXTENSION)?.strip_suffix('.')?;
    let (name, hex) = stem.rsplit_once('_')?;
    if !is_identifier(name) {
        return None;
    }
    Some((name.to_string(), CacheKey::parse(hex)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(fill: char) -> CacheKey {
        CacheKey::parse(&fill.to_string().repeat(CacheKey::HEX_LEN)).unwrap()
    }

    #[test]
    fn round_trip_is_byte_exact() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCacheStore::new(dir.path().join("cache"));
        let source = "fn fib(n) {\n\tif n < 2 { return n }\n\treturn fib(n - 1) + fib(n - 2)\n}\n// ünïcode ✓";

        store.store("fib", &key('a'), source).unwrap();
        assert_eq!(store.lookup("fib", &key('a')).unwrap().as_deref(), Some(source));
    }

    #[test]
    fn miss_is_none_even_without_directory() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCacheStore::new(dir.path().join("does-not-exist"));
        assert!(store.lookup("fib", &key('a')).unwrap().is_none());
    }

    #[test]
    fn directory_created_on_demand() {
        let dir = tempfile::tempdir().unwrap();
        let cache_dir = dir.path().join("nested").join("cache");
        let store = FileCacheStore::new(&cache_dir);
        store.store("fib", &key('b'), "fn fib(n) { return n }").unwrap();
        assert!(cache_dir.is_dir());
    }

    #[test]
    fn entry_path_layout() {
        let store = FileCacheStore::new("/tmp/cache");
        let path = store.entry_path("fib", &key('c'));
        assert_eq!(
            path,
            PathBuf::from(format!("/tmp/cache/fib_{}.vibe", "c".repeat(64)))
        );
    }

    #[test]
    fn store_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCacheStore::new(dir.path());
        store.store("fib", &key('d'), "fn fib(n) { return n }").unwrap();
        store.store("fib", &key('d'), "fn fib(n) { return n }").unwrap();
        assert_eq!(store.entries().unwrap().len(), 1);
    }

    #[test]
    fn empty_or_invalid_entries_are_misses() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCacheStore::new(dir.path());

        std::fs::write(store.entry_path("empty", &key('e')), "").unwrap();
        assert!(store.lookup("empty", &key('e')).unwrap().is_none());

        std::fs::write(store.entry_path("binary", &key('e')), [0xff, 0xfe, 0x00]).unwrap();
        assert!(store.lookup("binary", &key('e')).unwrap().is_none());
    }

    #[test]
    fn whitespace_only_source_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCacheStore::new(dir.path());
        store.store("blank", &key('w'), "  \n").unwrap();
        assert_eq!(store.lookup("blank", &key('w')).unwrap().as_deref(), Some("  \n"));
    }

    #[test]
    fn no_temp_files_left_behind() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCacheStore::new(dir.path());
        store.store("fib", &key('f'), "fn fib(n) { return n }").unwrap();
        let names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names.len(), 1);
        assert!(!names[0].starts_with(TEMP_PREFIX));
    }

    #[test]
    fn entries_and_evict() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCacheStore::new(dir.path());
        store.store("linked_list_len", &key('1'), "fn linked_list_len(h) { return 0 }").unwrap();
        store.store("fib", &key('2'), "fn fib(n) { return n }").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "not an entry").unwrap();

        let entries = store.entries().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].name, "fib");
        assert_eq!(entries[1].name, "linked_list_len");
        assert_eq!(entries[1].key, key('1'));

        assert!(store.evict("fib", &key('2')).unwrap());
        assert!(!store.evict("fib", &key('2')).unwrap());
        assert_eq!(store.entries().unwrap().len(), 1);
    }

    #[test]
    fn path_like_names_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCacheStore::new(dir.path());
        assert!(matches!(
            store.store("../escape", &key('a'), "x"),
            Err(CacheError::InvalidName(_))
        ));
        assert!(matches!(
            store.lookup("a/b", &key('a')),
            Err(CacheError::InvalidName(_))
        ));
    }

    #[test]
    fn unwritable_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, "not a directory").unwrap();
        let store = FileCacheStore::new(blocker.join("cache"));
        assert!(matches!(
            store.store("fib", &key('a'), "fn fib(n) { return n }"),
            Err(CacheError::Io { .. })
        ));
    }
}
