//! `Context`: owns everything a single build touches, and is threaded
//! explicitly through `build_prepare`/`build_make`/`build_clean` rather
//! than reached for as a process-wide singleton -- nothing in this crate
//! touches a `static mut`.

use crate::cache::Cache;
use crate::clean;
use crate::fs::{FileSystem, RealFileSystem};
use crate::graph::{Graph, NodeId};
use crate::hash;
use crate::prepare::{self, PrepareParams};
use crate::reporter::Reporter;
use crate::session::Session;
use crate::worker;
use rayon::prelude::*;
use std::sync::atomic::{AtomicI32, AtomicUsize, Ordering};

pub struct Context {
    pub graph: Graph,
    pub cache: Cache,
    pub session: Session,
    pub target: NodeId,
    pub defaulttarget: Option<NodeId>,
    pub globaltimestamp: u64,
    pub buildtime: u64,
    pub exit_on_error: bool,
    /// Whether an unconditional rebuild was requested; read by prepare's
    /// dirty-update step. Not its own component -- just a flag on the
    /// build request, same footing as `exit_on_error`.
    pub forced: bool,
    pub num_commands: usize,
    pub errorcode: AtomicI32,
    pub current_cmd_num: AtomicUsize,
}

/// Fills in every node's `timestamp`/`timestamp_raw` from the real
/// filesystem. Prepare itself only ever reads these fields; nothing
/// upstream of it stats a single path, so this has to run once per build
/// before the walk -- a source node whose file happens to exist on disk
/// would otherwise look identical to one that's genuinely missing.
fn stat_nodes(graph: &mut Graph) {
    let fs = RealFileSystem::new();
    let ids: Vec<NodeId> = graph.ids().collect();
    for id in ids {
        let filename = graph.node(id).filename.clone();
        let ts = fs.timestamp(&filename).unwrap_or(0);
        let n = graph.node_mut(id);
        n.timestamp_raw = ts;
        n.timestamp = ts;
    }
}

impl Context {
    pub fn new(graph: Graph, cache: Cache, session: Session, target: NodeId) -> Self {
        Context {
            graph,
            cache,
            session,
            target,
            defaulttarget: None,
            globaltimestamp: 0,
            buildtime: 0,
            exit_on_error: false,
            forced: false,
            num_commands: 0,
            errorcode: AtomicI32::new(0),
            current_cmd_num: AtomicUsize::new(0),
        }
    }

    pub fn default_target(&mut self, node: NodeId) {
        self.defaulttarget = Some(node);
    }

    /// Primes every real job's `cmdhash` (computed in parallel -- it depends
    /// only on declared command and input identities, never on anything
    /// prepare itself computes) and `cachehash` (looked up from the
    /// fingerprint cache), then runs the sequential dirty-propagation walk.
    pub fn build_prepare(&mut self) -> anyhow::Result<()> {
        stat_nodes(&mut self.graph);

        let real_jobs: Vec<NodeId> = self.graph.ids().filter(|&id| self.graph.node(id).job.real).collect();

        let cmdhashes: Vec<(NodeId, u64)> = real_jobs
            .par_iter()
            .map(|&id| (id, hash::compute_cmdhash(&self.graph, id)))
            .collect();

        for (id, cmdhash) in cmdhashes {
            let cachehash = self.cache.find_by_hash(self.graph.node(id).hashid).unwrap_or(0);
            let job = &mut self.graph.node_mut(id).job;
            job.cmdhash = cmdhash;
            job.cachehash = cachehash;
        }

        let params = PrepareParams {
            buildtime: self.buildtime,
            globaltimestamp: self.globaltimestamp,
            forced: self.forced,
        };

        match prepare::prepare(&mut self.graph, self.target, &params) {
            Ok(n) => {
                self.num_commands = n;
                Ok(())
            }
            Err(err) => {
                self.errorcode.store(err.error_code(), Ordering::SeqCst);
                Err(err.into())
            }
        }
    }

    /// Runs the worker pool to completion against `self.target`. Returns the
    /// first nonzero error code latched by any job, or 0 on a clean build.
    pub fn build_make(&mut self, reporter: &dyn Reporter) -> anyhow::Result<i32> {
        let rc = worker::execute(
            &mut self.graph,
            self.target,
            &self.session,
            reporter,
            self.num_commands,
            self.exit_on_error,
        );
        self.errorcode.store(rc, Ordering::SeqCst);
        self.record_cache_entries();
        Ok(rc)
    }

    /// Removes every real job's outputs reachable from `self.target`,
    /// independent of dirty state.
    pub fn build_clean(&mut self) -> anyhow::Result<()> {
        let fs = RealFileSystem::new();
        clean::clean(&mut self.graph, self.target, &fs, |path| {
            println!("rm {}", path);
        });
        Ok(())
    }

    /// Copies every real job's current `cachehash` into the in-memory
    /// fingerprint cache. Pure bookkeeping -- this crate never writes the
    /// cache file itself (see `cache.rs`); the caller persists it with
    /// `Cache::save` once it decides the overall build succeeded.
    fn record_cache_entries(&mut self) {
        let ids: Vec<NodeId> = self.graph.ids().collect();
        for id in ids {
            let (hashid, real, cachehash) = {
                let n = self.graph.node(id);
                (n.hashid, n.job.real, n.job.cachehash)
            };
            if real && cachehash != 0 {
                self.cache.set(hashid, cachehash);
            }
        }
    }
}
