//! End-to-end coverage confirming shared/exclusive constraints actually
//! serialize conflicting jobs instead of merely letting them complete in
//! any order.

use crate::e2e::*;

#[test]
fn exclusive_jobs_never_run_concurrently() {
    let space = TestSpace::new().unwrap();
    // Both jobs are independent (no edge between them) and would otherwise
    // be free to run in parallel; only the exclusive tag should force them
    // apart. Each appends a start/end pair with a pause between so an
    // interleaved run would show start-a, start-b before either end.
    space
        .write(
            "build.anvil",
            "node a cmd=\"echo start-a >> log.txt; sleep 0.3; echo end-a >> log.txt\"\n\
             node b cmd=\"echo start-b >> log.txt; sleep 0.3; echo end-b >> log.txt\"\n\
             node all dep=a,b\n\
             exclusive a = lockfile\n\
             exclusive b = lockfile\n\
             default all\n",
        )
        .unwrap();

    space.run_expect(&mut anvil_command(vec!["build", "-j", "4"])).unwrap();

    let log = space.read("log.txt").unwrap();
    let lines: Vec<&str> = log.lines().collect();
    assert_eq!(lines.len(), 4);
    // Whichever job went first, its end line must precede the other job's
    // start line -- no interleaving.
    let first_job = lines[0].trim_start_matches("start-").chars().next().unwrap();
    assert_eq!(lines[1], format!("end-{}", first_job));
}

#[test]
fn shared_readers_may_run_together_but_not_with_a_writer() {
    let space = TestSpace::new().unwrap();
    space
        .write(
            "build.anvil",
            "node reader1 cmd=\"echo reader1-done >> log.txt\"\n\
             node reader2 cmd=\"echo reader2-done >> log.txt\"\n\
             node all dep=reader1,reader2\n\
             shared reader1 = cachefile\n\
             shared reader2 = cachefile\n\
             default all\n",
        )
        .unwrap();

    let out = space.run_expect(&mut anvil_command(vec!["build"])).unwrap();
    assert_output_contains(&out, "ran 2 commands");
    let log = space.read("log.txt").unwrap();
    assert!(log.contains("reader1-done"));
    assert!(log.contains("reader2-done"));
}
