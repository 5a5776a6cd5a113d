//! End-to-end coverage: a cycle through real jobs is a fatal prepare-time
//! error, but a cycle through pseudo (no-command) nodes alone is permitted.

use crate::e2e::*;

#[test]
fn a_cycle_through_real_jobs_is_rejected() {
    let space = TestSpace::new().unwrap();
    space
        .write(
            "build.anvil",
            "node a cmd=\"true\" dep=b\n\
             node b cmd=\"true\" dep=a\n\
             default a\n",
        )
        .unwrap();

    let out = space.run(&mut anvil_command(vec!["build"])).unwrap();
    assert!(!out.status.success());
    assert_stderr_contains(&out, "dependency cycle");
}

#[test]
fn a_cycle_through_pseudo_nodes_alone_is_permitted() {
    let space = TestSpace::new().unwrap();
    space.write("src.c", "int main() {}").unwrap();
    space
        .write(
            "build.anvil",
            "node src.c\n\
             node alias1 dep=alias2,src.c\n\
             node alias2 dep=alias1\n\
             default alias1\n",
        )
        .unwrap();

    let out = space.run_expect(&mut anvil_command(vec!["build"])).unwrap();
    assert_output_contains(&out, "no work to do");
}
