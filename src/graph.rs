//! The in-memory Node/Job graph: the data model the rest of the crate
//! operates on. Nodes and Jobs are arena-allocated (see `densemap`) and live
//! for the whole build; nothing here is ever freed individually.

use crate::densemap::{DenseMap, Index};
use rustc_hash::FxHashMap;

/// Stable index of a Node within a Graph's arena.
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl Index for NodeId {
    fn index(&self) -> usize {
        self.0 as usize
    }
}
impl From<usize> for NodeId {
    fn from(u: usize) -> NodeId {
        NodeId(u as u32)
    }
}

/// Why a node's job is considered stale. Each prepare visit applies these in
/// a first-winning-rule order -- once set, a dirty reason from this visit is
/// not overwritten by a later, weaker reason.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Dirty {
    Clean,
    /// The command line recorded for this job no longer matches the one the
    /// fingerprint cache has on file.
    CmdHash,
    /// No cache entry, and this node predates the last successful build.
    GlobalStamp,
    /// The caller requested an unconditional rebuild.
    Forced,
    /// A dependency is itself dirty.
    DepDirty,
    /// A dependency's timestamp is newer than ours (real jobs only; pseudo
    /// jobs instead just adopt the dependency's timestamp).
    DepNewer,
}

impl Dirty {
    pub fn is_dirty(self) -> bool {
        !matches!(self, Dirty::Clean)
    }
}

/// Build step status, advancing monotonically within a single build.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum JobStatus {
    Undone,
    Working,
    Done,
    Broken,
}

/// A command associated 1:1 with its owning Node. Never shared between
/// Nodes -- a Node with no real command (a source file, or a pseudo or
/// grouping target) still has a Job, just one with `real = false`.
#[derive(Debug, Clone)]
pub struct Job {
    /// Shell command line. Empty for pseudo jobs.
    pub cmdline: String,
    /// Human-readable label for step lines, e.g. "CC obj.o".
    pub label: String,
    /// Opaque token forwarded to the command runner's output filter.
    pub filter: Option<String>,
    /// False for source files and grouping/pseudo targets: no command runs.
    pub real: bool,

    pub cmdhash: u64,
    pub cachehash: u64,
    pub status: JobStatus,

    /// Nodes this job writes. Always includes at least the owning node.
    pub first_output: Vec<NodeId>,
    /// Transitive closure of real-job dependencies, computed in prepare.
    pub first_jobdep: Vec<NodeId>,

    /// One-shot guard against double counting in a build's command count.
    pub counted: bool,

    /// Owning nodes of jobs this job conflicts with as a reader.
    pub constraint_shared: Vec<NodeId>,
    /// Owning nodes of jobs this job conflicts with as a writer.
    pub constraint_exclusive: Vec<NodeId>,
    /// Live counts, incremented on behalf of *other* running jobs that name
    /// this job as a shared/exclusive neighbor. See constraints.rs.
    pub constraint_shared_count: u32,
    pub constraint_exclusive_count: u32,
}

impl Job {
    fn pseudo(label: String) -> Job {
        Job {
            cmdline: String::new(),
            label,
            filter: None,
            real: false,
            cmdhash: 0,
            cachehash: 0,
            status: JobStatus::Undone,
            first_output: Vec::new(),
            first_jobdep: Vec::new(),
            counted: false,
            constraint_shared: Vec::new(),
            constraint_exclusive: Vec::new(),
            constraint_shared_count: 0,
            constraint_exclusive_count: 0,
        }
    }
}

/// A vertex in the build graph: a file or pseudo-target.
#[derive(Debug, Clone)]
pub struct Node {
    pub filename: String,
    /// Content-free identity token, chosen by the graph builder, used as the
    /// fingerprint cache key. Stable across invocations.
    pub hashid: u64,

    /// Logical timestamp: for real jobs this is the filesystem mtime; for
    /// pseudo jobs it may be propagated up from a dependency.
    pub timestamp: u64,
    /// Raw filesystem mtime, 0 meaning absent on disk.
    pub timestamp_raw: u64,

    pub dirty: Dirty,
    pub depth: u32,
    /// True once prepare has reached this node from the targeted root.
    pub targeted: bool,

    pub first_dep: Vec<NodeId>,
    pub first_parent: Vec<NodeId>,

    pub job: Job,
}

/// Owns every Node for the duration of a build. Indices are never reused or
/// freed individually; the whole arena is torn down at once.
pub struct Graph {
    nodes: DenseMap<NodeId, Node>,
    by_name: FxHashMap<String, NodeId>,
}

impl Graph {
    pub fn new() -> Self {
        Graph {
            nodes: DenseMap::new(),
            by_name: FxHashMap::default(),
        }
    }

    /// Looks up a node by name, creating a fresh node if one doesn't exist
    /// yet. Mirrors the graph builder's job of handing out stable ids for
    /// paths as they're first mentioned.
    pub fn node_id(&mut self, filename: &str) -> NodeId {
        if let Some(&id) = self.by_name.get(filename) {
            return id;
        }
        let hashid = crate::hash::hash_bytes(filename.as_bytes());
        let id = self.nodes.push(Node {
            filename: filename.to_string(),
            hashid,
            timestamp: 0,
            timestamp_raw: 0,
            dirty: Dirty::Clean,
            depth: 0,
            targeted: false,
            first_dep: Vec::new(),
            first_parent: Vec::new(),
            job: Job::pseudo(filename.to_string()),
        });
        self.by_name.insert(filename.to_string(), id);
        id
    }

    pub fn lookup(&self, filename: &str) -> Option<NodeId> {
        self.by_name.get(filename).copied()
    }

    pub fn node(&self, id: NodeId) -> &Node {
        self.nodes.get(id)
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        self.nodes.get_mut(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.next_id().index()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn ids(&self) -> impl Iterator<Item = NodeId> {
        (0..self.len()).map(NodeId::from)
    }

    /// Declares `dep` as an input of `node`, recording both the forward and
    /// backward adjacency.
    pub fn add_dep(&mut self, node: NodeId, dep: NodeId) {
        if !self.nodes.get(node).first_dep.contains(&dep) {
            self.nodes.get_mut(node).first_dep.push(dep);
        }
        if !self.nodes.get(dep).first_parent.contains(&node) {
            self.nodes.get_mut(dep).first_parent.push(node);
        }
    }

    /// Makes `node`'s job real (it has a command), adding it to its own
    /// output set (invariant: a job's outputs include at least its owning
    /// node).
    pub fn make_real(&mut self, node: NodeId, cmdline: String, label: Option<String>) {
        let n = self.nodes.get_mut(node);
        n.job.real = true;
        n.job.cmdline = cmdline;
        if let Some(label) = label {
            n.job.label = label;
        }
        if !n.job.first_output.contains(&node) {
            n.job.first_output.push(node);
        }
    }

    /// Adds `extra` to `node`'s job's output set, for jobs that write more
    /// than one file.
    pub fn add_output(&mut self, node: NodeId, extra: NodeId) {
        let outs = &mut self.nodes.get_mut(node).job.first_output;
        if !outs.contains(&extra) {
            outs.push(extra);
        }
    }

    /// Records that `node`'s job transitively depends on the real job
    /// owning `dep`. Used by prepare to build `first_jobdep`; returns true
    /// if the set actually changed, which prepare uses to decide whether to
    /// revisit parents.
    pub fn add_jobdep(&mut self, node: NodeId, dep: NodeId) -> bool {
        let deps = &mut self.nodes.get_mut(node).job.first_jobdep;
        if deps.contains(&dep) {
            false
        } else {
            deps.push(dep);
            true
        }
    }
}

impl Default for Graph {
    fn default() -> Self {
        Graph::new()
    }
}
