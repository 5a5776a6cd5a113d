//! The progress/step-line contract the engine consumes. The engine only
//! ever calls through this trait; it never knows whether it's talking to
//! a tty, a log file, or a JSON consumer.

/// Implementations must tolerate being called from any worker thread: the
/// worker pool invokes these from inside the single critical section, so
/// calls never overlap, but they may arrive from a different thread each
/// time.
pub trait Reporter: Sync + Send {
    /// Erases whatever progress bar is currently on screen, if any.
    fn clear_progress(&self);
    /// (Re)draws the progress bar for `current`/`total` completed commands.
    fn draw_progress(&self, current: usize, total: usize, colored: bool);
    /// Reports that `worker_id` just started or finished a step, `current`
    /// of `total` total. `simple` requests the non-overprinting form.
    fn step_line(&self, current: usize, total: usize, worker_id: usize, label: &str, simple: bool);
    /// Echoes a job's full command line, used under `-v`/`verbose`.
    fn verbose_cmdline(&self, cmdline: &str, colored: bool);
    /// Reports a build-ending error, independent of any particular step.
    fn error_line(&self, msg: &str);
}
