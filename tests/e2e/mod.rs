//! Support code for e2e tests, which run `anvil` as a binary against a real
//! temp directory and the real graph/cache/runner stack -- no mocked
//! filesystem. A `TestSpace` wraps a tempdir plus a handful of
//! output-assertion helpers.

pub fn anvil_binary() -> std::path::PathBuf {
    std::env::current_exe()
        .expect("test binary path")
        .parent()
        .expect("test binary directory")
        .parent()
        .expect("binary directory")
        .join("anvil")
}

pub fn anvil_command(args: Vec<&str>) -> std::process::Command {
    let mut cmd = std::process::Command::new(anvil_binary());
    cmd.args(args);
    cmd
}

fn print_output(out: &std::process::Output) {
    // Gross: use print! instead of writing to stdout so the test harness
    // can still capture it per-test.
    print!("{}", std::str::from_utf8(&out.stdout).unwrap());
    print!("{}", std::str::from_utf8(&out.stderr).unwrap());
}

pub fn assert_output_contains(out: &std::process::Output, text: &str) {
    let stdout = std::str::from_utf8(&out.stdout).unwrap();
    if !stdout.contains(text) {
        panic!("assertion failed; expected stdout to contain {:?} but got:\n{}", text, stdout);
    }
}

pub fn assert_stderr_contains(out: &std::process::Output, text: &str) {
    let stderr = std::str::from_utf8(&out.stderr).unwrap();
    if !stderr.contains(text) {
        panic!("assertion failed; expected stderr to contain {:?} but got:\n{}", text, stderr);
    }
}

/// Manages a temporary directory for invoking `anvil`.
pub struct TestSpace {
    dir: tempfile::TempDir,
}

impl TestSpace {
    pub fn new() -> anyhow::Result<Self> {
        let dir = tempfile::tempdir()?;
        Ok(TestSpace { dir })
    }

    /// Writes a file into the working space, creating parent directories.
    pub fn write(&self, path: &str, content: &str) -> std::io::Result<()> {
        let full = self.dir.path().join(path);
        if let Some(parent) = full.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(full, content)
    }

    pub fn exists(&self, path: &str) -> bool {
        self.dir.path().join(path).exists()
    }

    pub fn path(&self, path: &str) -> std::path::PathBuf {
        self.dir.path().join(path)
    }

    pub fn read(&self, path: &str) -> std::io::Result<String> {
        std::fs::read_to_string(self.path(path))
    }

    /// Backdates a file's mtime by `dur`, for deterministic DEPNEWER/ordering
    /// tests instead of racing real wall-clock resolution with `sleep`.
    pub fn backdate(&self, path: &str, dur: std::time::Duration) -> anyhow::Result<()> {
        let path = self.dir.path().join(path);
        let t = std::time::SystemTime::now() - dur;
        let f = std::fs::File::options().write(true).open(path)?;
        f.set_modified(t)?;
        Ok(())
    }

    /// Invokes `anvil`, returning the process output.
    pub fn run(&self, cmd: &mut std::process::Command) -> std::io::Result<std::process::Output> {
        cmd.current_dir(self.dir.path()).output()
    }

    /// Like `run`, but also prints output and bails if the process failed.
    pub fn run_expect(&self, cmd: &mut std::process::Command) -> anyhow::Result<std::process::Output> {
        let out = self.run(cmd)?;
        if !out.status.success() {
            print_output(&out);
            anyhow::bail!("anvil failed, status {}", out.status);
        }
        Ok(out)
    }

    /// Persists the temp dir locally and aborts the test. Debugging helper.
    #[allow(dead_code)]
    pub fn eject(self) -> ! {
        panic!("ejected at {:?}", self.dir.into_path());
    }
}
