//! Command line entry point: argument parsing and build/clean dispatch.
//!
//! A thin `run_impl` wrapped by `run` so `trace::close()` always gets a
//! chance to run regardless of how the build finished.

use crate::cache::Cache;
use crate::context::Context;
use crate::fs::FileSystem;
use crate::graph::{Graph, NodeId};
use crate::graphfile;
use crate::reporter::Reporter;
use crate::reporter_dumb::DumbReporter;
use crate::reporter_fancy::FancyReporter;
use crate::reporter_json::JsonReporter;
use crate::session::Session;
use crate::signal;
use crate::terminal;
use crate::trace;
use anyhow::{anyhow, Context as _};
use argh::FromArgs;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

/// anvil: an incremental build-execution engine.
#[derive(FromArgs)]
struct TopArgs {
    #[argh(subcommand)]
    command: Command,
}

#[derive(FromArgs)]
#[argh(subcommand)]
enum Command {
    Build(BuildArgs),
    Clean(CleanArgs),
}

/// run a build
#[derive(FromArgs)]
#[argh(subcommand, name = "build")]
struct BuildArgs {
    /// input graph file
    #[argh(option, short = 'f', default = "String::from(\"build.anvil\")")]
    file: String,

    /// parallelism [default: available cpus]
    #[argh(option, short = 'j')]
    jobs: Option<usize>,

    /// keep going after a job fails, instead of stopping at the first one
    #[argh(switch, short = 'k')]
    keep_going: bool,

    /// echo full command lines as they run
    #[argh(switch, short = 'v')]
    verbose: bool,

    /// emit newline-delimited JSON progress events instead of console output
    #[argh(switch)]
    json: bool,

    /// enable a debugging tool: `trace` writes a chrome://tracing-compatible
    /// trace.json alongside the graph file
    #[argh(option, short = 'd')]
    debug: Option<String>,

    /// targets to build [default: the graph file's declared default target]
    #[argh(positional)]
    targets: Vec<String>,
}

/// remove every real job's output reachable from the graph
#[derive(FromArgs)]
#[argh(subcommand, name = "clean")]
struct CleanArgs {
    /// input graph file
    #[argh(option, short = 'f', default = "String::from(\"build.anvil\")")]
    file: String,
}

fn default_parallelism() -> usize {
    std::thread::available_parallelism().map(usize::from).unwrap_or(1)
}

/// The cache sits alongside the graph file, named after it. Keeps a build
/// directory's state self-contained without needing a separate flag for it.
fn cache_path_for(graph_file: &str) -> PathBuf {
    let mut path = PathBuf::from(graph_file);
    let name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
    path.set_file_name(format!("{}.cache", name));
    path
}

fn now_seconds() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs()
}

/// Parses the graph file at `path` and resolves the node to build. Multiple
/// requested targets are folded into one synthetic pseudo node depending on
/// each of them -- the same "aggregate root" trick a declared default target
/// already needs, so prepare/execute need no special casing for it.
fn load_graph(path: &str, requested: &[String]) -> anyhow::Result<(Graph, NodeId, Option<NodeId>)> {
    let source = std::fs::read_to_string(path).with_context(|| format!("reading {}", path))?;
    let mut graph = Graph::new();
    let parsed = graphfile::load(&mut graph, path, &source).map_err(|msg| anyhow!(msg))?;

    let target = match requested {
        [] => parsed
            .default_target
            .ok_or_else(|| anyhow!("no target given and {} declares no default", path))?,
        [one] => graph.lookup(one).ok_or_else(|| anyhow!("unknown target: {:?}", one))?,
        many => {
            let root = graph.node_id("<anvil:requested-targets>");
            for name in many {
                let id = graph.lookup(name).ok_or_else(|| anyhow!("unknown target: {:?}", name))?;
                graph.add_dep(root, id);
            }
            root
        }
    };

    Ok((graph, target, parsed.default_target))
}

fn make_reporter(json: bool) -> Box<dyn Reporter> {
    if json {
        Box::new(JsonReporter::new(Box::new(std::io::stdout())))
    } else if terminal::use_fancy() {
        Box::new(FancyReporter::new())
    } else {
        Box::new(DumbReporter::new())
    }
}

/// Handles `-d NAME`: enables one of this crate's own debugging tools.
fn apply_debug_tool(name: &str) -> anyhow::Result<()> {
    match name {
        "trace" => trace::open("trace.json").context("opening trace.json"),
        "list" => {
            println!("debug tools:");
            println!("  trace  generate a chrome://tracing-compatible trace.json");
            Ok(())
        }
        other => Err(anyhow!("unknown -d {:?}, use -d list to list", other)),
    }
}

fn run_build(args: BuildArgs) -> anyhow::Result<i32> {
    if let Some(tool) = &args.debug {
        apply_debug_tool(tool)?;
    }

    let (graph, target, default_target) = load_graph(&args.file, &args.targets)?;
    let cache_path = cache_path_for(&args.file);

    let fs = crate::fs::RealFileSystem::new();
    // The cache file's own mtime stands in for "when the last successful
    // build finished": nothing else in this crate's persisted state tracks
    // it separately (spec's persisted-state layout only names the cache).
    // No cache file at all means no prior build ever completed, so every
    // node -- regardless of its own timestamp -- predates it: u64::MAX
    // rather than 0, or a from-scratch build with no dependency edges to
    // trigger DEPNEWER would never mark anything GLOBALSTAMP dirty.
    let globaltimestamp = match fs.timestamp(cache_path.to_str().unwrap_or_default()).unwrap_or(0) {
        0 => u64::MAX,
        ts => ts,
    };
    let cache = Cache::load(&cache_path).with_context(|| format!("reading {}", cache_path.display()))?;

    let mut session = Session::new("anvil");
    session.threads = args.jobs.unwrap_or_else(default_parallelism);
    session.verbose = args.verbose;
    session.simpleoutput = args.json;
    signal::install_abort_signal(session.abort.clone());

    let reporter = make_reporter(args.json);

    let mut ctx = Context::new(graph, cache, session, target);
    if let Some(d) = default_target {
        ctx.default_target(d);
    }
    ctx.buildtime = now_seconds();
    ctx.globaltimestamp = globaltimestamp;
    ctx.exit_on_error = !args.keep_going;

    trace::scope("build_prepare", || ctx.build_prepare())?;
    let num_commands = ctx.num_commands;
    let rc = trace::scope("build_make", || ctx.build_make(&*reporter))?;
    reporter.clear_progress();

    if rc == 0 {
        ctx.cache
            .save(&cache_path)
            .with_context(|| format!("writing {}", cache_path.display()))?;
        if num_commands == 0 {
            println!("anvil: no work to do");
        } else {
            println!(
                "anvil: ran {} command{}, now up to date",
                num_commands,
                if num_commands == 1 { "" } else { "s" }
            );
        }
    } else {
        reporter.error_line(&format!("build failed (exit code {})", rc));
    }

    Ok(rc)
}

fn run_clean(args: CleanArgs) -> anyhow::Result<i32> {
    let source = std::fs::read_to_string(&args.file).with_context(|| format!("reading {}", args.file))?;
    let mut graph = Graph::new();
    graphfile::load(&mut graph, &args.file, &source).map_err(|msg| anyhow!(msg))?;

    let root = graph.node_id("<anvil:clean-everything>");
    let ids: Vec<NodeId> = graph.ids().collect();
    for id in ids {
        if id != root {
            graph.add_dep(root, id);
        }
    }

    let mut ctx = Context::new(graph, Cache::new(), Session::new("anvil"), root);
    ctx.build_clean()?;
    println!("anvil: clean");
    Ok(0)
}

fn run_impl() -> anyhow::Result<i32> {
    let args: TopArgs = argh::from_env();
    match args.command {
        Command::Build(build_args) => run_build(build_args),
        Command::Clean(clean_args) => run_clean(clean_args),
    }
}

pub fn run() -> anyhow::Result<i32> {
    let res = run_impl();
    let _ = trace::close();
    res
}
