//! The clean pass: a bottom-up `FORCE|QUICK` walk that removes every
//! artifact a real job produces, independent of dirty state.
//!
//! Best-effort removal throughout: a missing file, or one that can't be
//! removed (permissions, a directory where a file was expected), isn't a
//! build error here.

use crate::fs::FileSystem;
use crate::graph::{Graph, NodeId};
use crate::walker::{self, WalkFlags};

/// Removes the artifacts of every real job reachable from `root`. Returns
/// the number of files actually removed; a second clean with nothing left
/// to remove returns zero.
pub fn clean(graph: &mut Graph, root: NodeId, filesystem: &dyn FileSystem, report: impl Fn(&str)) -> usize {
    let mut removed = 0usize;

    walker::walk(
        graph,
        root,
        WalkFlags::BOTTOMUP | WalkFlags::FORCE | WalkFlags::QUICK,
        |graph, node, _path, _revisiting, _ctl, removed: &mut usize| {
            let n = graph.node(node);
            if !n.job.real || n.timestamp == 0 {
                return 0;
            }
            let filename = n.filename.clone();
            match filesystem.remove(&filename) {
                Ok(true) => {
                    report(&filename);
                    *removed += 1;
                }
                Ok(false) => {}
                Err(_) => {
                    // A removal failure doesn't abort the pass; see the
                    // module doc comment.
                }
            }
            0
        },
        &mut removed,
    );

    removed
}
