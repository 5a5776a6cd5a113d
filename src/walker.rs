//! Generic graph traversal. Prepare, execute and clean are all one call to
//! `walk` apiece, distinguished only by which flags they pass and what their
//! callback does per node.
//!
//! The one traversal feature ordinary DFS/BFS doesn't give you for free is
//! `REVISIT`: a callback can ask to have an ancestor re-examined later in
//! the same walk, after some of its children have changed. Prepare relies
//! on this to let a dirty bit set deep in the graph bubble up to nodes that
//! already had their post-order visit.

use crate::graph::{Graph, JobStatus, NodeId};
use std::collections::VecDeque;

/// Orthogonal traversal flags. Combine with `|`.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub struct WalkFlags(u16);

impl WalkFlags {
    pub const NONE: WalkFlags = WalkFlags(0);
    /// Invoke the callback post-order (children before parent). The only
    /// order this walker implements; omitting it means pre-order.
    pub const BOTTOMUP: WalkFlags = WalkFlags(1 << 0);
    /// Skip the callback for a node whose job already reached DONE/BROKEN.
    pub const UNDONE: WalkFlags = WalkFlags(1 << 1);
    /// Don't descend into a subtree whose root and immediate children are
    /// all CLEAN. Overridden by FORCE.
    pub const QUICK: WalkFlags = WalkFlags(1 << 2);
    /// Disables QUICK's pruning: every reachable node is visited once
    /// regardless of dirty state.
    pub const FORCE: WalkFlags = WalkFlags(1 << 3);
    /// Lets the callback call `Revisit::walk_revisit` to re-enqueue an
    /// ancestor for a second, non-descending visit later in this walk.
    pub const REVISIT: WalkFlags = WalkFlags(1 << 4);
    /// Visit each job at most once per pass even if several nodes name it.
    /// A no-op under this crate's graph model, where a job is never shared
    /// between nodes; kept so callers can express the same flag set the
    /// contract describes.
    pub const JOBS: WalkFlags = WalkFlags(1 << 5);

    pub fn contains(self, other: WalkFlags) -> bool {
        self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for WalkFlags {
    type Output = WalkFlags;
    fn bitor(self, rhs: WalkFlags) -> WalkFlags {
        WalkFlags(self.0 | rhs.0)
    }
}

/// Handle passed to the callback so it can request a revisit. Does nothing
/// if `REVISIT` wasn't passed to `walk` -- queued nodes are simply drained
/// the same way either way; it's on the caller to only ask for revisits
/// when it makes sense.
pub struct Revisit<'a> {
    queue: &'a mut VecDeque<NodeId>,
}

impl<'a> Revisit<'a> {
    pub fn walk_revisit(&mut self, node: NodeId) {
        self.queue.push_back(node);
    }
}

/// `0` to continue, positive to stop and propagate an error code, negative
/// to abort immediately.
pub type WalkResult = i32;

fn is_quick_clean(graph: &Graph, node: NodeId) -> bool {
    let n = graph.node(node);
    if n.dirty.is_dirty() {
        return false;
    }
    n.first_dep.iter().all(|&d| !graph.node(d).dirty.is_dirty())
}

#[allow(clippy::too_many_arguments)]
fn invoke<U, F>(
    graph: &mut Graph,
    node: NodeId,
    path: &[NodeId],
    revisiting: bool,
    revisit_queue: &mut VecDeque<NodeId>,
    callback: &mut F,
    user: &mut U,
) -> WalkResult
where
    F: FnMut(&mut Graph, NodeId, &[NodeId], bool, &mut Revisit, &mut U) -> WalkResult,
{
    let mut ctl = Revisit {
        queue: revisit_queue,
    };
    callback(graph, node, path, revisiting, &mut ctl, user)
}

#[allow(clippy::too_many_arguments)]
fn visit<U, F>(
    graph: &mut Graph,
    flags: WalkFlags,
    node: NodeId,
    path: &mut Vec<NodeId>,
    on_stack: &mut [bool],
    done: &mut [bool],
    revisit_queue: &mut VecDeque<NodeId>,
    callback: &mut F,
    user: &mut U,
) -> WalkResult
where
    F: FnMut(&mut Graph, NodeId, &[NodeId], bool, &mut Revisit, &mut U) -> WalkResult,
{
    use crate::densemap::Index;
    let idx = node.index();
    if done[idx] {
        return 0;
    }
    if on_stack[idx] {
        // A real cycle would already have been rejected upstream (prepare
        // walks its own ancestor chain explicitly); a cycle reached here is
        // a pseudo-job cycle, which is permitted. Don't recurse again; let
        // the caller that's already above us finish the job.
        return 0;
    }
    on_stack[idx] = true;
    path.push(node);

    let skip_callback = flags.contains(WalkFlags::UNDONE)
        && matches!(graph.node(node).job.status, JobStatus::Done | JobStatus::Broken);
    let pre_order = !flags.contains(WalkFlags::BOTTOMUP);

    let mut rc = 0;
    if pre_order && !skip_callback {
        rc = invoke(graph, node, path, false, revisit_queue, callback, user);
    }

    if rc == 0 {
        let quick_skip = flags.contains(WalkFlags::QUICK)
            && !flags.contains(WalkFlags::FORCE)
            && is_quick_clean(graph, node);
        if !quick_skip {
            let deps = graph.node(node).first_dep.clone();
            for dep in deps {
                rc = visit(graph, flags, dep, path, on_stack, done, revisit_queue, callback, user);
                if rc != 0 {
                    break;
                }
            }
        }
    }

    if rc == 0 && !pre_order && !skip_callback {
        rc = invoke(graph, node, path, false, revisit_queue, callback, user);
    }

    path.pop();
    on_stack[idx] = false;
    done[idx] = true;
    rc
}

/// Walks the graph reachable from `root`, applying `flags`, invoking
/// `callback` once per node (twice if it's revisited). Returns the first
/// nonzero result the callback produced, or `0` if the walk ran to
/// completion.
pub fn walk<U, F>(graph: &mut Graph, root: NodeId, flags: WalkFlags, mut callback: F, user: &mut U) -> WalkResult
where
    F: FnMut(&mut Graph, NodeId, &[NodeId], bool, &mut Revisit, &mut U) -> WalkResult,
{
    let n = graph.len();
    let mut on_stack = vec![false; n];
    let mut done = vec![false; n];
    let mut path = Vec::new();
    let mut revisit_queue = VecDeque::new();

    let mut rc = visit(
        graph,
        flags,
        root,
        &mut path,
        &mut on_stack,
        &mut done,
        &mut revisit_queue,
        &mut callback,
        user,
    );

    if rc == 0 && flags.contains(WalkFlags::REVISIT) {
        while let Some(node) = revisit_queue.pop_front() {
            rc = invoke(graph, node, &[], true, &mut revisit_queue, &mut callback, user);
            if rc != 0 {
                break;
            }
        }
    }

    rc
}
