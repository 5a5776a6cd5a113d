//! The prepare pass: a single bottom-up `FORCE|REVISIT` walk that computes
//! dirty bits, validates the graph, and counts the work a build is about
//! to do.
//!
//! Expressed as one generic `walker::walk` call rather than a bespoke
//! recursive pair of functions, since the revisit mechanism (propagating a
//! dirty bit to nodes outside the targeted subtree) doesn't fit plain
//! recursion.

use crate::graph::{Dirty, Graph, NodeId};
use crate::walker::{self, WalkFlags};
use std::fmt;

/// A fatal prepare-time failure. Both variants stop the walk; see
/// `error_code` for their distinct exit codes.
#[derive(Debug)]
pub enum PrepareError {
    /// A non-real (source/pseudo) node with no producer and nothing on
    /// disk. Non-recoverable.
    MissingSource { name: String },
    /// A cycle through real jobs, reported as the chain that closes it.
    Circular { chain: Vec<String> },
}

impl fmt::Display for PrepareError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrepareError::MissingSource { name } => {
                write!(f, "{}: does not exist and no way to generate it", name)
            }
            PrepareError::Circular { chain } => {
                write!(f, "dependency cycle: {}", chain.join(" -> "))
            }
        }
    }
}

impl std::error::Error for PrepareError {}

impl PrepareError {
    /// A missing source aborts the walk with code 1, a cycle with -1.
    pub fn error_code(&self) -> i32 {
        match self {
            PrepareError::MissingSource { .. } => 1,
            PrepareError::Circular { .. } => -1,
        }
    }
}

/// Parameters that stay fixed across the whole prepare walk, as opposed to
/// per-node state that lives on `Node`/`Job` themselves.
pub struct PrepareParams {
    pub buildtime: u64,
    pub globaltimestamp: u64,
    /// An unconditional rebuild was requested, so every dirty update this
    /// walk produces becomes `Dirty::Forced` rather than whatever weaker
    /// reason would otherwise apply.
    pub forced: bool,
}

struct PrepareState<'a> {
    params: &'a PrepareParams,
    num_commands: usize,
    error: Option<PrepareError>,
}

fn set_dirty_if_clean(graph: &mut Graph, node: NodeId, reason: Dirty) {
    if !graph.node(node).dirty.is_dirty() {
        graph.node_mut(node).dirty = reason;
    }
}

fn cycle_chain(graph: &Graph, path: &[NodeId], dep: NodeId) -> Option<Vec<String>> {
    let idx = path.iter().position(|&n| n == dep)?;
    let mut chain: Vec<String> = path[idx..].iter().map(|&n| graph.node(n).filename.clone()).collect();
    chain.push(graph.node(dep).filename.clone());
    Some(chain)
}

#[allow(clippy::too_many_arguments)]
fn visit(
    graph: &mut Graph,
    node: NodeId,
    path: &[NodeId],
    revisiting: bool,
    ctl: &mut walker::Revisit,
    state: &mut PrepareState,
) -> walker::WalkResult {
    let depth_before = graph.node(node).depth;
    let dirty_before = graph.node(node).dirty;
    let timestamp_before = graph.node(node).timestamp;
    let jobdep_len_before = graph.node(node).job.first_jobdep.len();

    // Step 1: depth, only meaningful with a real ancestor chain.
    if !revisiting && !path.is_empty() {
        let walk_depth = (path.len() - 1) as u32;
        if walk_depth > depth_before {
            graph.node_mut(node).depth = walk_depth;
        }
    }

    // Step 2: future-timestamp warning.
    let n = graph.node(node);
    if n.timestamp > state.params.buildtime {
        eprintln!("anvil: warning: {}: timestamp is in the future", n.filename);
    }

    // Step 3: cache / globalstamp dirty. Relies on job.cmdhash already being
    // populated -- see context::build_prepare, which computes it for every
    // real job in parallel before this walk starts.
    if n.job.real {
        let cached = n.job.cachehash;
        if cached != 0 {
            if cached != n.job.cmdhash {
                set_dirty_if_clean(graph, node, Dirty::CmdHash);
            }
        } else if n.timestamp < state.params.globaltimestamp {
            set_dirty_if_clean(graph, node, Dirty::GlobalStamp);
        }
    } else if n.timestamp_raw == 0 {
        // Step 4: missing-source error.
        state.error = Some(PrepareError::MissingSource { name: n.filename.clone() });
        return state.error.as_ref().unwrap().error_code();
    }

    // Step 5: dependency walk.
    let deps = graph.node(node).first_dep.clone();
    for dep in deps {
        if graph.node(dep).job.real {
            if !revisiting {
                if let Some(chain) = cycle_chain(graph, path, dep) {
                    state.error = Some(PrepareError::Circular { chain });
                    return state.error.as_ref().unwrap().error_code();
                }
            }
            graph.add_jobdep(node, dep);
        } else {
            let inherited = graph.node(dep).job.first_jobdep.clone();
            for jd in inherited {
                graph.add_jobdep(node, jd);
            }
        }

        let dep_dirty = graph.node(dep).dirty.is_dirty();
        let dep_timestamp = graph.node(dep).timestamp;
        let is_real = graph.node(node).job.real;
        let node_timestamp = graph.node(node).timestamp;

        if state.params.forced {
            set_dirty_if_clean(graph, node, Dirty::Forced);
        } else if dep_dirty {
            set_dirty_if_clean(graph, node, Dirty::DepDirty);
        } else if node_timestamp < dep_timestamp {
            if is_real {
                set_dirty_if_clean(graph, node, Dirty::DepNewer);
            } else {
                graph.node_mut(node).timestamp = dep_timestamp;
            }
        }
    }

    // Step 6: targeting.
    if !revisiting {
        graph.node_mut(node).targeted = true;
    }

    let n = graph.node(node);
    let is_dirty = n.dirty.is_dirty();
    let is_real = n.job.real;
    let is_targeted = n.targeted;
    let already_counted = n.job.counted;

    // Step 7: cache invalidation.
    if is_dirty && is_real {
        graph.node_mut(node).job.cachehash = 0;
    }

    // Step 8: counting.
    if is_real && is_dirty && !already_counted && is_targeted {
        graph.node_mut(node).job.counted = true;
        state.num_commands += 1;
    }

    // Step 9: parent revisit, if this visit actually changed anything a
    // parent might care about.
    let dirty_changed = graph.node(node).dirty != dirty_before;
    let timestamp_changed = graph.node(node).timestamp != timestamp_before;
    let jobdep_changed = graph.node(node).job.first_jobdep.len() != jobdep_len_before;
    if dirty_changed || timestamp_changed || jobdep_changed {
        let parents = graph.node(node).first_parent.clone();
        for parent in parents {
            ctl.walk_revisit(parent);
        }
    }

    0
}

/// Runs the prepare pass rooted at `target`. Returns the number of distinct
/// real/dirty/targeted jobs on success.
pub fn prepare(graph: &mut Graph, target: NodeId, params: &PrepareParams) -> Result<usize, PrepareError> {
    let mut state = PrepareState {
        params,
        num_commands: 0,
        error: None,
    };

    let rc = walker::walk(
        graph,
        target,
        WalkFlags::BOTTOMUP | WalkFlags::FORCE | WalkFlags::REVISIT,
        |graph, node, path, revisiting, ctl, state: &mut PrepareState| {
            visit(graph, node, path, revisiting, ctl, state)
        },
        &mut state,
    );

    if rc != 0 {
        return Err(state.error.expect("nonzero walk result without a recorded error"));
    }
    Ok(state.num_commands)
}
