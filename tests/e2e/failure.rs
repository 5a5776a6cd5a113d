//! End-to-end coverage: a failing job latches a nonzero error code, and
//! `-k`/`--keep-going` changes whether independent sibling work still runs.

use crate::e2e::*;

#[test]
fn a_failing_job_exits_nonzero_and_the_cache_is_not_written() {
    let space = TestSpace::new().unwrap();
    space.write("build.anvil", "node broken cmd=\"exit 5\"\ndefault broken\n").unwrap();

    let out = space.run(&mut anvil_command(vec!["build"])).unwrap();
    assert_eq!(out.status.code(), Some(5));
    assert_stderr_contains(&out, "build failed");
    assert!(!space.exists("build.anvil.cache"));
}

#[test]
fn keep_going_still_runs_an_independent_sibling_job() {
    let space = TestSpace::new().unwrap();
    space
        .write(
            "build.anvil",
            "node broken cmd=\"exit 1\"\n\
             node fine cmd=\"echo ok > fine.txt\"\n\
             node all dep=broken,fine\n\
             default all\n",
        )
        .unwrap();

    let out = space.run(&mut anvil_command(vec!["build", "-k", "-j", "1"])).unwrap();
    assert!(!out.status.success());
    assert!(space.exists("fine.txt"));
}

#[test]
fn a_job_depending_on_a_broken_one_is_never_run() {
    let space = TestSpace::new().unwrap();
    space
        .write(
            "build.anvil",
            "node broken cmd=\"exit 1\"\n\
             node downstream cmd=\"echo should-not-run > downstream.txt\" dep=broken\n\
             default downstream\n",
        )
        .unwrap();

    let out = space.run(&mut anvil_command(vec!["build", "-j", "1"])).unwrap();
    assert!(!out.status.success());
    assert!(!space.exists("downstream.txt"));
}
