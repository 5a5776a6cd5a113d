//! The fingerprint cache: a persisted `hashid -> cmdhash` map.
//!
//! There's no secondary id-remapping layer to maintain here -- the graph
//! builder already hands every node a stable `hashid`, so the cache key is
//! just that value directly. The on-disk format is an append-only log of
//! fixed-width `(hashid, cmdhash)` pairs; loading replays the log and
//! later entries for the same hashid win, which makes incremental appends
//! (rather than rewriting the whole file) a valid way to record new
//! results.

use rustc_hash::FxHashMap;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

/// In-memory view of the cache, loaded once at context construction.
#[derive(Default)]
pub struct Cache {
    map: FxHashMap<u64, u64>,
}

const RECORD_LEN: usize = 16;

impl Cache {
    pub fn new() -> Self {
        Cache {
            map: FxHashMap::default(),
        }
    }

    /// Loads a cache from `path`. A missing file is treated as an empty
    /// cache -- the first build after adopting this engine, or after
    /// deleting the cache file, should simply rebuild everything.
    pub fn load(path: &Path) -> io::Result<Cache> {
        let file = match File::open(path) {
            Ok(f) => f,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Cache::new()),
            Err(err) => return Err(err),
        };
        let mut reader = BufReader::new(file);
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf)?;

        let mut map = FxHashMap::default();
        for chunk in buf.chunks_exact(RECORD_LEN) {
            let hashid = u64::from_le_bytes(chunk[0..8].try_into().unwrap());
            let cmdhash = u64::from_le_bytes(chunk[8..16].try_into().unwrap());
            map.insert(hashid, cmdhash);
        }
        Ok(Cache { map })
    }

    /// Looks up the cached `cmdhash` last recorded for `hashid`.
    pub fn find_by_hash(&self, hashid: u64) -> Option<u64> {
        self.map.get(&hashid).copied()
    }

    /// Records (or overwrites) the `cmdhash` for `hashid`, to be picked up
    /// by the next successful call to `save`.
    pub fn set(&mut self, hashid: u64, cmdhash: u64) {
        self.map.insert(hashid, cmdhash);
    }

    /// Rewrites the cache file from the in-memory map. Called once, at the
    /// end of a successful build -- not from inside this core, which never
    /// touches the cache file directly (see the persisted-state-layout
    /// note: the engine only ever sees `Cache` as a pure K->V map).
    pub fn save(&self, path: &Path) -> io::Result<()> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        for (&hashid, &cmdhash) in &self.map {
            writer.write_all(&hashid.to_le_bytes())?;
            writer.write_all(&cmdhash.to_le_bytes())?;
        }
        writer.flush()
    }
}
