//! The worker pool: a bounded number of OS threads, each running the same
//! sweep loop against one shared graph behind a single critical section.
//!
//! Every worker runs the *same* loop here, not a caller-supplied closure,
//! and the shared state is the whole graph, not a job queue -- so this is
//! built directly on `std::thread::scope` + `Mutex` rather than a
//! general-purpose thread pool abstraction.

use crate::constraints;
use crate::graph::{Graph, JobStatus, NodeId};
use crate::reporter::Reporter;
use crate::runner;
use crate::session::Session;
use crate::walker::{self, WalkFlags};
use std::sync::atomic::{AtomicI32, AtomicUsize, Ordering};
use std::sync::Mutex;

/// Upper bound on requested parallelism.
const MAX_THREADS: usize = 1024;

pub fn clamp_threads(requested: usize) -> usize {
    requested.clamp(1, MAX_THREADS)
}

struct ExecuteCtx<'a> {
    session: &'a Session,
    reporter: &'a dyn Reporter,
    num_commands: usize,
    exit_on_error: bool,
    errorcode: &'a AtomicI32,
    current_cmd_num: &'a AtomicUsize,
    worker_id: usize,
}

/// Runs every dirty, targeted, real job reachable from `target` to
/// completion, using `threads` workers. Returns the first nonzero error
/// code latched by any job, or 0 if the whole build succeeded.
#[allow(clippy::too_many_arguments)]
pub fn execute(
    graph: &mut Graph,
    target: NodeId,
    session: &Session,
    reporter: &dyn Reporter,
    num_commands: usize,
    exit_on_error: bool,
) -> i32 {
    let threads = clamp_threads(session.threads);
    let errorcode = AtomicI32::new(0);
    let current_cmd_num = AtomicUsize::new(0);
    let graph_lock = Mutex::new(graph);

    if threads == 1 {
        worker_loop(0, &graph_lock, target, session, reporter, num_commands, exit_on_error, &errorcode, &current_cmd_num);
    } else {
        std::thread::scope(|scope| {
            for worker_id in 0..threads {
                scope.spawn(|| {
                    worker_loop(
                        worker_id,
                        &graph_lock,
                        target,
                        session,
                        reporter,
                        num_commands,
                        exit_on_error,
                        &errorcode,
                        &current_cmd_num,
                    )
                });
            }
        });
    }

    errorcode.load(Ordering::SeqCst)
}

#[allow(clippy::too_many_arguments)]
fn worker_loop(
    worker_id: usize,
    graph_lock: &Mutex<&mut Graph>,
    target: NodeId,
    session: &Session,
    reporter: &dyn Reporter,
    num_commands: usize,
    exit_on_error: bool,
    errorcode: &AtomicI32,
    current_cmd_num: &AtomicUsize,
) {
    loop {
        let mut guard = graph_lock.lock().unwrap();
        let graph: &mut Graph = &mut **guard;

        if !graph.node(target).dirty.is_dirty() {
            break;
        }

        let mut ctx = ExecuteCtx {
            session,
            reporter,
            num_commands,
            exit_on_error,
            errorcode,
            current_cmd_num,
            worker_id,
        };
        let rc = walker::walk(
            graph,
            target,
            WalkFlags::BOTTOMUP | WalkFlags::UNDONE | WalkFlags::QUICK | WalkFlags::JOBS,
            execute_cb,
            &mut ctx,
        );

        // Aborted: session.abort fired, or a negative return bubbled up.
        let aborted = rc < 0;
        let target_settled = graph.node(target).job.status != JobStatus::Undone;
        let fail_fast = exit_on_error && errorcode.load(Ordering::SeqCst) != 0;

        drop(guard);

        if aborted || target_settled || fail_fast {
            break;
        }
        std::thread::yield_now();
    }
}

/// The per-node callback a sweep invokes once per ready job. Runs entirely
/// under the caller's lock except for the subprocess itself (step 9),
/// which is the crate's one other suspension point besides the
/// inter-sweep yield.
fn execute_cb(graph: &mut Graph, node: NodeId, _path: &[NodeId], _revisiting: bool, _ctl: &mut walker::Revisit, ctx: &mut ExecuteCtx) -> walker::WalkResult {
    // Step 1: cooperative abort.
    if ctx.session.is_aborted() {
        return -1;
    }
    // Step 2: fail-fast latch.
    if ctx.exit_on_error {
        let code = ctx.errorcode.load(Ordering::SeqCst);
        if code != 0 {
            return code;
        }
    }

    // Step 3: are this job's real-job dependencies satisfied?
    let jobdeps = graph.node(node).job.first_jobdep.clone();
    let mut broken = false;
    for dep in &jobdeps {
        let dep_status = graph.node(*dep).job.status;
        if dep_status == JobStatus::Broken {
            broken = true;
        } else if graph.node(*dep).dirty.is_dirty() && dep_status != JobStatus::Done {
            return 0; // Not ready yet; revisited on a later sweep.
        }
    }

    // Step 4: broken by propagation, not by our own command.
    if broken {
        graph.node_mut(node).job.status = JobStatus::Broken;
        return ctx.errorcode.load(Ordering::SeqCst);
    }

    // Step 5: pseudo jobs need no command.
    if !graph.node(node).job.real {
        graph.node_mut(node).job.status = JobStatus::Done;
        return 0;
    }

    // Step 6: mutual exclusion.
    if constraints::constraints_check(graph, node) {
        return 0;
    }

    // Step 7: claim the job, report, and bump the running count.
    graph.node_mut(node).job.status = JobStatus::Working;
    let current = ctx.current_cmd_num.fetch_add(1, Ordering::SeqCst) + 1;
    let cmdline = graph.node(node).job.cmdline.clone();
    let label = graph.node(node).job.label.clone();
    let filter = graph.node(node).job.filter.clone();
    if ctx.session.report_steps {
        ctx.reporter.step_line(current, ctx.num_commands, ctx.worker_id, &label, ctx.session.simpleoutput);
    }
    if ctx.session.report_bar {
        ctx.reporter.draw_progress(current, ctx.num_commands, ctx.session.report_color);
    }
    if ctx.session.verbose {
        ctx.reporter.verbose_cmdline(&cmdline, ctx.session.report_color);
    }

    // Step 8: make sure output directories exist.
    let outputs = graph.node(node).job.first_output.clone();
    for &out in &outputs {
        let path = graph.node(out).filename.clone();
        if let Err(err) = crate::fs::RealFileSystem::new().create_parent_dirs(&path) {
            ctx.reporter.error_line(&format!("{}: {}", path, err));
            graph.node_mut(node).job.status = JobStatus::Broken;
            ctx.errorcode.store(1, Ordering::SeqCst);
            return 1;
        }
    }

    // Step 9: run the command outside the critical section.
    constraints::constraints_update(graph, node, 1);
    drop_lock_and_run(graph, node, &cmdline, filter.as_deref(), &outputs, ctx)
}

/// Runs the job's command with the critical section released, then
/// reacquires it to record the result (steps 9-11). Pulled out of
/// `execute_cb` only to keep the "lock released here" boundary visually
/// obvious at a glance.
fn drop_lock_and_run(graph: &mut Graph, node: NodeId, cmdline: &str, filter: Option<&str>, outputs: &[NodeId], ctx: &mut ExecuteCtx) -> walker::WalkResult {
    crate::trace::event_begin(ctx.worker_id, "run", &graph.node(node).job.label.clone());
    let result = runner::run_command(cmdline, filter);
    crate::trace::event_end(ctx.worker_id, "run", None);

    constraints::constraints_update(graph, node, -1);

    match result {
        Ok(output) if output.code == 0 => {
            let fs = crate::fs::RealFileSystem::new();
            for &out in outputs {
                let path = graph.node(out).filename.clone();
                // Defensive re-touch: some tools preserve an input's mtime on
                // their output, which would make the next build think
                // nothing changed.
                let _ = fs.touch(&path);
            }
            let cmdhash = graph.node(node).job.cmdhash;
            graph.node_mut(node).job.status = JobStatus::Done;
            graph.node_mut(node).job.cachehash = cmdhash;
            0
        }
        Ok(output) => {
            if !output.output.is_empty() {
                ctx.reporter.error_line(&String::from_utf8_lossy(&output.output));
            }
            fail_job(graph, node, outputs, output.code, ctx)
        }
        Err(err) => {
            ctx.reporter.error_line(&err.to_string());
            fail_job(graph, node, outputs, 1, ctx)
        }
    }
}

fn fail_job(graph: &mut Graph, node: NodeId, outputs: &[NodeId], code: i32, ctx: &mut ExecuteCtx) -> walker::WalkResult {
    let fs = crate::fs::RealFileSystem::new();
    for &out in outputs {
        let before = graph.node(out).timestamp_raw;
        let path = graph.node(out).filename.clone();
        if let Ok(ts) = fs.timestamp(&path) {
            if ts > before {
                let _ = fs.remove(&path);
            }
        }
    }
    graph.node_mut(node).job.status = JobStatus::Broken;
    ctx.errorcode.store(code, Ordering::SeqCst);
    0
}
