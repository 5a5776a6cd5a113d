//! Shared/exclusive mutual-exclusion accounting between jobs.
//!
//! A job names a set of other jobs (by their owning node) it conflicts
//! with as a reader (`constraint_shared`) or as a writer
//! (`constraint_exclusive`). The counters live on the *neighbor*, not on
//! the job itself: starting a job bumps a count on every job it conflicts
//! with, and checking readiness only ever reads counts on its own
//! neighbors. This indirection is what lets an arbitrary-sized group of
//! mutually exclusive jobs share one accounting scheme without a single
//! "lock owner" object.

use crate::graph::{Graph, NodeId};

/// True if `node`'s job may not start right now because a conflicting
/// neighbor is currently running.
pub fn constraints_check(graph: &Graph, node: NodeId) -> bool {
    let job = &graph.node(node).job;
    for &shared in &job.constraint_shared {
        if graph.node(shared).job.constraint_exclusive_count > 0 {
            return true;
        }
    }
    for &exclusive in &job.constraint_exclusive {
        let neighbor = &graph.node(exclusive).job;
        if neighbor.constraint_exclusive_count > 0 || neighbor.constraint_shared_count > 0 {
            return true;
        }
    }
    false
}

/// Applies `delta` (+1 on start, -1 on completion) to every neighbor this
/// job declares a constraint against, shared and exclusive alike.
pub fn constraints_update(graph: &mut Graph, node: NodeId, delta: i32) {
    let (shared, exclusive) = {
        let job = &graph.node(node).job;
        (job.constraint_shared.clone(), job.constraint_exclusive.clone())
    };
    for neighbor in shared {
        bump(graph, neighbor, delta, Which::Shared);
    }
    for neighbor in exclusive {
        bump(graph, neighbor, delta, Which::Exclusive);
    }
}

enum Which {
    Shared,
    Exclusive,
}

fn bump(graph: &mut Graph, node: NodeId, delta: i32, which: Which) {
    let job = &mut graph.node_mut(node).job;
    let counter = match which {
        Which::Shared => &mut job.constraint_shared_count,
        Which::Exclusive => &mut job.constraint_exclusive_count,
    };
    *counter = (*counter as i32 + delta).max(0) as u32;
}

/// Declares that every job in `group` shares a named mutex group as a
/// reader. Called by the graph builder (or graphfile loader) while setting
/// up constraints, not during execution.
pub fn declare_shared_group(graph: &mut Graph, group: &[NodeId]) {
    link(graph, group, |job| &mut job.constraint_shared);
}

/// Same as `declare_shared_group`, but as writers: pairwise exclusive.
pub fn declare_exclusive_group(graph: &mut Graph, group: &[NodeId]) {
    link(graph, group, |job| &mut job.constraint_exclusive);
}

fn link(graph: &mut Graph, group: &[NodeId], pick: impl Fn(&mut crate::graph::Job) -> &mut Vec<NodeId>) {
    for &member in group {
        for &other in group {
            if member == other {
                continue;
            }
            let list = pick(&mut graph.node_mut(member).job);
            if !list.contains(&other) {
                list.push(other);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Graph;

    #[test]
    fn exclusive_pair_conflicts_while_running() {
        let mut g = Graph::new();
        let a = g.node_id("a");
        let b = g.node_id("b");
        g.make_real(a, "cmd-a".to_string(), None);
        g.make_real(b, "cmd-b".to_string(), None);
        declare_exclusive_group(&mut g, &[a, b]);

        assert!(!constraints_check(&g, a));
        assert!(!constraints_check(&g, b));

        constraints_update(&mut g, a, 1);
        assert!(constraints_check(&g, b));
        assert!(!constraints_check(&g, a));

        constraints_update(&mut g, a, -1);
        assert!(!constraints_check(&g, b));
    }

    #[test]
    fn shared_readers_do_not_conflict_with_each_other() {
        let mut g = Graph::new();
        let a = g.node_id("a");
        let b = g.node_id("b");
        g.make_real(a, "cmd-a".to_string(), None);
        g.make_real(b, "cmd-b".to_string(), None);
        declare_shared_group(&mut g, &[a, b]);

        constraints_update(&mut g, a, 1);
        assert!(!constraints_check(&g, b));
        assert!(!constraints_check(&g, a));
    }

    #[test]
    fn shared_reader_blocked_by_exclusive_writer() {
        let mut g = Graph::new();
        let reader = g.node_id("reader");
        let writer = g.node_id("writer");
        g.make_real(reader, "cmd-r".to_string(), None);
        g.make_real(writer, "cmd-w".to_string(), None);
        g.node_mut(reader).job.constraint_shared.push(writer);
        g.node_mut(writer).job.constraint_exclusive.push(reader);

        constraints_update(&mut g, writer, 1);
        assert!(constraints_check(&g, reader));
    }
}
