//! # Build and Job Poller
//!
//! Watches a set of builds (or jobs) until each reaches a terminal status
//! or a timeout elapses, reporting every status change through the [`Ui`].
//!
//! ## Status Codes
//!
//! | Code      | Label    | Category |
//! |-----------|----------|----------|
//! | 0         | Waiting  | waiting  |
//! | 100       | Running  | running  |
//! | 200       | Built    | running  |
//! | 300       | Finished | success  |
//! | 301       | Failed   | error    |
//! | 401       | Killed   | error    |
//! | other ≥300| Unknown  | unknown  |
//!
//! Success, error and unknown are terminal. Once a build is terminal it is
//! never polled again within the same watch.
//!
//! Time is read through [`Clock`] so the loop can run against simulated
//! time in tests.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use log::{debug, warn};

use crate::error::{Error, Result};
use crate::ui::Ui;

/// Attempts per status request before a timeout is reported.
pub const MAX_ATTEMPTS: u32 = 3;

/// Pause between retries of a timed-out status request.
const RETRY_DELAY: Duration = Duration::from_secs(1);

/// Source of time for the watch loop.
pub trait Clock {
    /// Time elapsed since some fixed origin.
    fn now(&self) -> Duration;
    fn sleep(&self, duration: Duration);
}

/// Wall-clock time.
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCategory {
    Waiting,
    Running,
    Success,
    Error,
    Unknown,
}

impl StatusCategory {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            StatusCategory::Success | StatusCategory::Error | StatusCategory::Unknown
        )
    }
}

/// One observation of a build or job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobStatus {
    pub code: i64,
    pub label: String,
    pub category: StatusCategory,
    pub message: String,
    pub name: Option<String>,
}

impl JobStatus {
    /// Classify a numeric build status code.
    pub fn from_build_code(code: i64, message: impl Into<String>, name: Option<String>) -> Self {
        let (label, category) = match code {
            0 => ("Waiting", StatusCategory::Waiting),
            100 => ("Running", StatusCategory::Running),
            200 => ("Built", StatusCategory::Running),
            300 => ("Finished", StatusCategory::Success),
            301 => ("Failed", StatusCategory::Error),
            401 => ("Killed", StatusCategory::Error),
            c if c >= 300 => ("Unknown", StatusCategory::Unknown),
            _ => ("Running", StatusCategory::Running),
        };
        Self {
            code,
            label: label.to_string(),
            category,
            message: message.into(),
            name: name.filter(|n| !n.is_empty()),
        }
    }

    /// Classify a job by its state name.
    pub fn from_job_state(state: &str, message: impl Into<String>) -> Self {
        let (code, category) = match state {
            "Queued" => (0, StatusCategory::Waiting),
            "Running" => (100, StatusCategory::Running),
            "Completed" => (300, StatusCategory::Success),
            "Failed" => (301, StatusCategory::Error),
            _ => (500, StatusCategory::Unknown),
        };
        Self {
            code,
            label: state.to_string(),
            category,
            message: message.into(),
            name: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.category.is_terminal()
    }

    /// `'{name} {id}: {Label} "{message}"'`, the name omitted when unset.
    pub fn change_line(&self, id: u64) -> String {
        match &self.name {
            Some(name) => format!("{} {}: {} \"{}\"", name, id, self.label, self.message),
            None => format!("{}: {} \"{}\"", id, self.label, self.message),
        }
    }

    pub fn summary_line(&self, id: u64) -> String {
        format!(
            "Build {} ended with '{}' status: {}",
            id, self.label, self.message
        )
    }
}

/// Reads the current status of one build or job.
pub trait StatusSource {
    fn fetch_status(&self, id: u64) -> Result<JobStatus>;
}

/// Fetch one status, retrying socket timeouts up to [`MAX_ATTEMPTS`] times.
pub fn poll_status(source: &dyn StatusSource, clock: &dyn Clock, id: u64) -> Result<JobStatus> {
    let mut attempt = 0;
    loop {
        attempt += 1;
        match source.fetch_status(id) {
            Err(err) if err.is_timeout() => {
                if attempt >= MAX_ATTEMPTS {
                    return Err(Error::TransportTimeout {
                        attempts: MAX_ATTEMPTS,
                    });
                }
                warn!("Status request for {} timed out, trying again", id);
                clock.sleep(RETRY_DELAY);
            }
            other => return other,
        }
    }
}

/// How long and how often to poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchOptions {
    pub interval: Duration,
    /// `None` waits indefinitely.
    pub timeout: Option<Duration>,
}

impl WatchOptions {
    /// A `timeout_secs` of 0 means no timeout.
    pub fn new(interval_secs: u64, timeout_secs: u64) -> Self {
        Self {
            interval: Duration::from_secs(interval_secs),
            timeout: (timeout_secs > 0).then(|| Duration::from_secs(timeout_secs)),
        }
    }
}

/// What a watch observed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WatchReport {
    /// Terminal statuses in the order they were reached.
    pub finished: Vec<(u64, JobStatus)>,
    /// Last status of anything still active when the watch gave up.
    pub unresolved: Vec<(u64, JobStatus)>,
    pub timed_out: bool,
}

impl WatchReport {
    /// Whether every build finished successfully.
    pub fn all_succeeded(&self) -> bool {
        !self.timed_out
            && self.unresolved.is_empty()
            && self
                .finished
                .iter()
                .all(|(_, status)| status.category == StatusCategory::Success)
    }
}

/// Poll `ids` until all are terminal or the timeout elapses.
///
/// A change of message is reported once per change. Timing out is not an
/// error; the report says so. Errors from the server are returned as soon
/// as they occur.
pub fn watch(
    source: &dyn StatusSource,
    clock: &dyn Clock,
    ids: &[u64],
    options: WatchOptions,
    ui: &mut dyn Ui,
) -> Result<WatchReport> {
    let start = clock.now();
    let mut active: Vec<u64> = Vec::with_capacity(ids.len());
    for id in ids {
        if !active.contains(id) {
            active.push(*id);
        }
    }
    let mut last: HashMap<u64, JobStatus> = HashMap::new();
    let mut report = WatchReport::default();

    while !active.is_empty() {
        let mut still_active = Vec::with_capacity(active.len());
        for id in active {
            let status = poll_status(source, clock, id)?;
            let changed = last
                .get(&id)
                .map(|previous| previous.message != status.message)
                .unwrap_or(true);
            if changed {
                ui.write(&status.change_line(id));
            }
            if status.is_terminal() {
                debug!("{} reached terminal status {}", id, status.label);
                report.finished.push((id, status.clone()));
            } else {
                still_active.push(id);
            }
            last.insert(id, status);
        }
        active = still_active;
        if active.is_empty() {
            break;
        }
        if let Some(timeout) = options.timeout {
            if clock.now().saturating_sub(start) >= timeout {
                report.timed_out = true;
                break;
            }
        }
        clock.sleep(options.interval);
    }

    if report.timed_out {
        ui.error(&format!(
            "Timed out while waiting for build status to change ({} seconds)",
            options.timeout.map(|t| t.as_secs()).unwrap_or_default()
        ));
        for id in &active {
            if let Some(status) = last.get(id) {
                ui.write(&format!("    Last status: {}", status.summary_line(*id)));
                report.unresolved.push((*id, status.clone()));
            }
        }
    } else {
        ui.write("All jobs completed");
    }
    ui.write("Finished builds:");
    for (id, status) in &report.finished {
        ui.write(&format!("    {}", status.summary_line(*id)));
    }
    Ok(report)
}

/// Report the current status of each id once.
pub fn show_status(
    source: &dyn StatusSource,
    clock: &dyn Clock,
    ids: &[u64],
    ui: &mut dyn Ui,
) -> Result<Vec<(u64, JobStatus)>> {
    let mut statuses = Vec::with_capacity(ids.len());
    for id in ids {
        let status = poll_status(source, clock, *id)?;
        ui.write(&status.change_line(*id));
        statuses.push((*id, status));
    }
    Ok(statuses)
}

#[cfg(test)]
pub mod testing {
    use std::cell::{Cell, RefCell};
    use std::collections::{HashMap, VecDeque};
    use std::time::Duration;

    use super::{Clock, JobStatus, StatusSource};
    use crate::error::{Error, Result};

    /// A clock that only moves when slept on, or by `tick` per reading.
    pub struct FakeClock {
        now: Cell<Duration>,
        tick: Duration,
        pub sleeps: RefCell<Vec<Duration>>,
    }

    impl FakeClock {
        pub fn new(start_secs: u64, tick_secs: u64) -> Self {
            Self {
                now: Cell::new(Duration::from_secs(start_secs)),
                tick: Duration::from_secs(tick_secs),
                sleeps: RefCell::new(Vec::new()),
            }
        }
    }

    impl Clock for FakeClock {
        fn now(&self) -> Duration {
            let now = self.now.get();
            self.now.set(now + self.tick);
            now
        }

        fn sleep(&self, duration: Duration) {
            self.sleeps.borrow_mut().push(duration);
            self.now.set(self.now.get() + duration);
        }
    }

    pub enum Step {
        Status(i64, &'static str),
        Timeout,
        Fail(&'static str),
    }

    /// Plays a per-id sequence of responses; the last one repeats.
    #[derive(Default)]
    pub struct ScriptedSource {
        steps: RefCell<HashMap<u64, VecDeque<Step>>>,
        pub calls: Cell<usize>,
    }

    impl ScriptedSource {
        pub fn new(script: Vec<(u64, Vec<Step>)>) -> Self {
            Self {
                steps: RefCell::new(
                    script
                        .into_iter()
                        .map(|(id, steps)| (id, steps.into()))
                        .collect(),
                ),
                calls: Cell::new(0),
            }
        }
    }

    impl StatusSource for ScriptedSource {
        fn fetch_status(&self, id: u64) -> Result<JobStatus> {
            self.calls.set(self.calls.get() + 1);
            let mut steps = self.steps.borrow_mut();
            let queue = steps.get_mut(&id).expect("unscripted id");
            let step = if queue.len() > 1 {
                queue.pop_front().unwrap()
            } else {
                match queue.front().unwrap() {
                    Step::Status(code, message) => Step::Status(*code, *message),
                    Step::Timeout => Step::Timeout,
                    Step::Fail(detail) => Step::Fail(*detail),
                }
            };
            match step {
                Step::Status(code, message) => Ok(JobStatus::from_build_code(code, message, None)),
                Step::Timeout => Err(Error::TransportTimeout { attempts: 1 }),
                Step::Fail(detail) => Err(Error::Remote {
                    class: "Error".to_string(),
                    detail: serde_json::json!(detail),
                }),
            }
        }
    }
}
