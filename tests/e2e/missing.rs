//! End-to-end coverage for a missing source with no producer (fatal) and
//! a source stamped in the future (a warning, not a failure).

use crate::e2e::*;

#[test]
fn a_missing_source_with_no_producer_is_fatal() {
    let space = TestSpace::new().unwrap();
    space
        .write("build.anvil", "node missing.c\nnode obj.o cmd=\"cp missing.c obj.o\" dep=missing.c\ndefault obj.o\n")
        .unwrap();

    let out = space.run(&mut anvil_command(vec!["build"])).unwrap();
    assert_eq!(out.status.code(), Some(1));
    assert_stderr_contains(&out, "does not exist");
    assert!(!space.exists("obj.o"));
}

#[test]
fn an_existing_source_with_a_future_timestamp_only_warns() {
    let space = TestSpace::new().unwrap();
    space.write("src.c", "int main() {}").unwrap();
    space
        .write("build.anvil", "node src.c\nnode obj.o cmd=\"cp src.c obj.o\" dep=src.c\ndefault obj.o\n")
        .unwrap();
    // A source file stamped far in the future trips the time-sanity
    // warning, but must not abort the build.
    bump_into_the_future(&space, "src.c");

    let out = space.run_expect(&mut anvil_command(vec!["build"])).unwrap();
    assert_stderr_contains(&out, "timestamp is in the future");
    assert_output_contains(&out, "ran 1 command");
    assert!(space.exists("obj.o"));
}

fn bump_into_the_future(space: &TestSpace, path: &str) {
    let path = space.path(path);
    let future = std::time::SystemTime::now() + std::time::Duration::from_secs(3600 * 24 * 365);
    let f = std::fs::File::options().write(true).open(path).unwrap();
    f.set_modified(future).unwrap();
}
