pub mod cache;
pub mod canon;
pub mod clean;
pub mod constraints;
pub mod context;
pub mod densemap;
pub mod fs;
pub mod graph;
pub mod graphfile;
pub mod hash;
pub mod prepare;
pub mod reporter;
pub mod reporter_dumb;
pub mod reporter_fancy;
pub mod reporter_json;
pub mod run;
pub mod runner;
pub mod scanner;
pub mod session;
pub mod signal;
pub mod terminal;
pub mod trace;
pub mod walker;
pub mod worker;

#[cfg(not(any(windows, target_arch = "wasm32")))]
use jemallocator::Jemalloc;

#[cfg(not(any(windows, target_arch = "wasm32")))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;
