//! End-to-end coverage for a linear build chain, command-change
//! invalidation, and the round-trip property that a clean rebuild does no
//! work the second time around.

use crate::e2e::*;

#[test]
fn linear_chain_builds_bottom_up_then_is_a_noop() {
    let space = TestSpace::new().unwrap();
    space.write("src.c", "int main() {}").unwrap();
    space
        .write(
            "build.anvil",
            "node src.c\n\
             node obj.o cmd=\"cp src.c obj.o\" dep=src.c\n\
             node app cmd=\"cp obj.o app\" dep=obj.o\n\
             default app\n",
        )
        .unwrap();

    let out = space.run_expect(&mut anvil_command(vec!["build"])).unwrap();
    assert_output_contains(&out, "ran 2 commands");
    assert!(space.exists("obj.o"));
    assert!(space.exists("app"));

    // Nothing changed since the last build, so the second run finds every
    // job's cmdhash already cached and does no work.
    let out = space.run_expect(&mut anvil_command(vec!["build"])).unwrap();
    assert_output_contains(&out, "no work to do");
}

#[test]
fn changing_a_command_invalidates_only_the_changed_job() {
    let space = TestSpace::new().unwrap();
    space.write("src.c", "int main() {}").unwrap();
    space
        .write(
            "build.anvil",
            "node src.c\n\
             node obj.o cmd=\"cp src.c obj.o\" dep=src.c\n\
             node app cmd=\"cp obj.o app\" dep=obj.o\n\
             default app\n",
        )
        .unwrap();
    space.run_expect(&mut anvil_command(vec!["build"])).unwrap();

    // Same dependency, different command line: only obj.o's job should be
    // considered dirty (and app transitively, via DEPDIRTY).
    space
        .write(
            "build.anvil",
            "node src.c\n\
             node obj.o cmd=\"cp src.c obj.o && echo touched\" dep=src.c\n\
             node app cmd=\"cp obj.o app\" dep=obj.o\n\
             default app\n",
        )
        .unwrap();
    let out = space.run_expect(&mut anvil_command(vec!["build"])).unwrap();
    assert_output_contains(&out, "ran 2 commands");
}

#[test]
fn a_dependency_newer_than_its_output_triggers_a_rebuild() {
    let space = TestSpace::new().unwrap();
    space.write("src.c", "v1").unwrap();
    space
        .write("build.anvil", "node src.c\nnode obj.o cmd=\"cp src.c obj.o\" dep=src.c\ndefault obj.o\n")
        .unwrap();
    space.run_expect(&mut anvil_command(vec!["build"])).unwrap();
    let out = space.run_expect(&mut anvil_command(vec!["build"])).unwrap();
    assert_output_contains(&out, "no work to do");

    // Backdate the existing output so the upcoming rewrite of src.c is
    // unambiguously newer, independent of filesystem mtime resolution.
    space.backdate("obj.o", std::time::Duration::from_secs(5)).unwrap();
    space.write("src.c", "v2").unwrap();
    let out = space.run_expect(&mut anvil_command(vec!["build"])).unwrap();
    assert_output_contains(&out, "ran 1 command");
    assert_eq!(space.read("obj.o").unwrap(), "v2");
}

#[test]
fn clean_removes_outputs_and_a_second_clean_is_a_noop() {
    let space = TestSpace::new().unwrap();
    space.write("src.c", "int main() {}").unwrap();
    space
        .write("build.anvil", "node src.c\nnode obj.o cmd=\"cp src.c obj.o\" dep=src.c\ndefault obj.o\n")
        .unwrap();
    space.run_expect(&mut anvil_command(vec!["build"])).unwrap();
    assert!(space.exists("obj.o"));

    space.run_expect(&mut anvil_command(vec!["clean"])).unwrap();
    assert!(!space.exists("obj.o"));
    assert!(space.exists("src.c"));

    // A second clean with nothing left to remove still succeeds.
    space.run_expect(&mut anvil_command(vec!["clean"])).unwrap();
}
