//! The job scheduler: registry, dispatcher loop and execution pool.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Local};
use tokio::sync::{Mutex, Notify, RwLock, Semaphore};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::error::SchedulerError;
use crate::handler::JobHandler;
use crate::history::RunHistory;
use crate::trigger::Trigger;
use crate::types::{JobInfo, JobRun, TriggeredBy};

pub const DEFAULT_MAX_CONCURRENT_JOBS: usize = 10;

/// Upper bound on a single dispatcher sleep so wall-clock jumps are noticed.
const MAX_IDLE_SLEEP: Duration = Duration::from_secs(60);

struct JobEntry {
    trigger: Trigger,
    handler: Arc<dyn JobHandler>,
    misfire_grace: Duration,
    next_due: Option<DateTime<Local>>,
    running: Arc<AtomicBool>,
}

#[derive(Default)]
struct Registry {
    /// Set when the scheduler is primed; interval grids count from here.
    anchor: Option<DateTime<Local>>,
    jobs: HashMap<String, JobEntry>,
}

struct Dispatcher {
    shutdown: CancellationToken,
    handle: JoinHandle<()>,
}

struct Inner {
    registry: Mutex<Registry>,
    history: RwLock<RunHistory>,
    permits: Arc<Semaphore>,
    max_concurrent_jobs: usize,
    tracker: TaskTracker,
    wake: Notify,
    dispatcher: Mutex<Option<Dispatcher>>,
}

/// Clears a job's running flag when its run ends, however it ends.
struct RunningGuard(Arc<AtomicBool>);

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// In-process scheduler for recurring jobs.
///
/// One dispatcher task wakes when the earliest job is due and hands each due
/// job to its own task. At most `max_concurrent_jobs` handlers run at once; a
/// job never overlaps itself (a firing that finds the previous run still in
/// progress is dropped, not queued).
#[derive(Clone)]
pub struct JobScheduler {
    inner: Arc<Inner>,
}

impl fmt::Debug for JobScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobScheduler")
            .field("registry", &"<Mutex<Registry>>")
            .field("max_concurrent_jobs", &self.inner.max_concurrent_jobs)
            .finish()
    }
}

impl Default for JobScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CONCURRENT_JOBS)
    }
}

impl JobScheduler {
    pub fn new(max_concurrent_jobs: usize) -> Self {
        let max_concurrent_jobs = max_concurrent_jobs.max(1);
        Self {
            inner: Arc::new(Inner {
                registry: Mutex::new(Registry::default()),
                history: RwLock::new(RunHistory::default()),
                permits: Arc::new(Semaphore::new(max_concurrent_jobs)),
                max_concurrent_jobs,
                tracker: TaskTracker::new(),
                wake: Notify::new(),
                dispatcher: Mutex::new(None),
            }),
        }
    }

    /// Registers a job under `id`.
    ///
    /// Returns `Ok(false)` without touching the existing definition when the
    /// id is already registered, so startup code can call this unconditionally.
    pub async fn register(
        &self,
        id: impl Into<String>,
        trigger: Trigger,
        handler: Arc<dyn JobHandler>,
        misfire_grace: Duration,
    ) -> Result<bool, SchedulerError> {
        trigger.validate()?;
        let id = id.into();

        let mut registry = self.inner.registry.lock().await;
        if registry.jobs.contains_key(&id) {
            debug!(job_id = %id, "job already registered; keeping existing definition");
            return Ok(false);
        }

        let next_due = registry
            .anchor
            .and_then(|anchor| trigger.next_after(&anchor, &Local::now()));
        info!(
            job_id = %id,
            trigger = %trigger,
            misfire_grace_secs = misfire_grace.as_secs(),
            "registered job"
        );
        registry.jobs.insert(
            id,
            JobEntry {
                trigger,
                handler,
                misfire_grace,
                next_due,
                running: Arc::new(AtomicBool::new(false)),
            },
        );
        drop(registry);

        self.inner.wake.notify_one();
        Ok(true)
    }

    /// Starts the dispatcher. Returns `false` if it is already running.
    pub async fn start(&self) -> bool {
        let mut dispatcher = self.inner.dispatcher.lock().await;
        if dispatcher.is_some() {
            debug!("job scheduler already started");
            return false;
        }

        let job_count = self.prime(Local::now()).await;
        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(self.clone().dispatch_loop(shutdown.clone()));
        *dispatcher = Some(Dispatcher { shutdown, handle });

        info!(
            jobs = job_count,
            max_concurrent_jobs = self.inner.max_concurrent_jobs,
            "job scheduler started"
        );
        true
    }

    /// Stops the dispatcher and waits for in-flight handlers to return.
    /// Returns `false` if the scheduler was not running.
    pub async fn stop(&self) -> bool {
        let Some(dispatcher) = self.inner.dispatcher.lock().await.take() else {
            debug!("job scheduler not running");
            return false;
        };

        dispatcher.shutdown.cancel();
        if let Err(e) = dispatcher.handle.await {
            error!(error = %e, "dispatcher task ended abnormally");
        }

        let in_flight = self.inner.tracker.len();
        if in_flight > 0 {
            info!(in_flight, "waiting for running jobs to finish");
        }
        self.wait_idle().await;

        info!("job scheduler stopped");
        true
    }

    pub async fn is_started(&self) -> bool {
        self.inner.dispatcher.lock().await.is_some()
    }

    /// Runs a job now, outside its schedule. Its next scheduled firing is
    /// unaffected.
    pub async fn trigger(&self, id: &str) -> Result<Uuid, SchedulerError> {
        let (run_id, _) = self.trigger_inner(id).await?;
        Ok(run_id)
    }

    /// Like [`trigger`](Self::trigger) but waits for the run to finish and
    /// returns its record.
    pub async fn run_now(&self, id: &str) -> Result<JobRun, SchedulerError> {
        let (run_id, handle) = self.trigger_inner(id).await?;
        if let Err(e) = handle.await {
            error!(job_id = id, error = %e, "run task ended abnormally");
        }
        self.get_run(run_id)
            .await
            .ok_or_else(|| SchedulerError::NotFound(id.to_string()))
    }

    async fn trigger_inner(&self, id: &str) -> Result<(Uuid, JoinHandle<()>), SchedulerError> {
        let (handler, running) = {
            let registry = self.inner.registry.lock().await;
            let job = registry
                .jobs
                .get(id)
                .ok_or_else(|| SchedulerError::NotFound(id.to_string()))?;
            (Arc::clone(&job.handler), Arc::clone(&job.running))
        };

        let dispatched = self
            .dispatch(id, handler, running, TriggeredBy::Manual)
            .await?;
        info!(job_id = id, run_id = %dispatched.0, "manual run accepted");
        Ok(dispatched)
    }

    /// Snapshot of every registered job, sorted by id.
    pub async fn jobs(&self) -> Vec<JobInfo> {
        let registry = self.inner.registry.lock().await;
        let mut jobs: Vec<JobInfo> = registry
            .jobs
            .iter()
            .map(|(id, job)| JobInfo {
                id: id.clone(),
                trigger: job.trigger,
                misfire_grace_secs: job.misfire_grace.as_secs(),
                next_due: job.next_due,
                running: job.running.load(Ordering::Acquire),
            })
            .collect();
        jobs.sort_by(|a, b| a.id.cmp(&b.id));
        jobs
    }

    /// Recorded runs, most recent first, optionally filtered by job id.
    pub async fn list_runs(&self, job_name: Option<&str>, limit: usize, offset: usize) -> Vec<JobRun> {
        self.inner.history.read().await.list(job_name, limit, offset)
    }

    pub async fn count_runs(&self, job_name: Option<&str>) -> usize {
        self.inner.history.read().await.count(job_name)
    }

    pub async fn clear_runs(&self) {
        self.inner.history.write().await.clear();
    }

    pub async fn get_run(&self, id: Uuid) -> Option<JobRun> {
        self.inner.history.read().await.get(&id).cloned()
    }

    /// Waits until no handler is running or waiting for a slot.
    pub async fn wait_idle(&self) {
        self.inner.tracker.close();
        self.inner.tracker.wait().await;
        self.inner.tracker.reopen();
    }

    /// Fixes the interval anchor and computes every job's first due time.
    pub(crate) async fn prime(&self, anchor: DateTime<Local>) -> usize {
        let mut registry = self.inner.registry.lock().await;
        registry.anchor = Some(anchor);
        for (id, job) in registry.jobs.iter_mut() {
            job.next_due = job.trigger.next_after(&anchor, &anchor);
            match job.next_due {
                Some(next_due) => debug!(job_id = %id, %next_due, "job scheduled"),
                None => warn!(job_id = %id, trigger = %job.trigger, "trigger never fires"),
            }
        }
        registry.jobs.len()
    }

    async fn dispatch_loop(self, shutdown: CancellationToken) {
        loop {
            let wait = self.time_until_next_due(Local::now()).await;
            debug!(?wait, "dispatcher sleeping until next due job");

            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = self.inner.wake.notified() => continue,
                _ = tokio::time::sleep(wait) => {
                    self.run_due(Local::now()).await;
                }
            }
        }
        debug!("dispatcher loop exited");
    }

    async fn time_until_next_due(&self, now: DateTime<Local>) -> Duration {
        let registry = self.inner.registry.lock().await;
        registry
            .jobs
            .values()
            .filter_map(|job| job.next_due)
            .map(|due| (due - now).to_std().unwrap_or(Duration::ZERO))
            .min()
            .map_or(MAX_IDLE_SLEEP, |d| d.min(MAX_IDLE_SLEEP))
    }

    /// Fires every job due at `now` and advances its next due time past `now`.
    ///
    /// A firing later than the job's misfire grace is skipped. Missed slots are
    /// never replayed: however late the dispatcher is, a job fires at most once
    /// per call. Returns the number of jobs handed to the execution pool.
    pub(crate) async fn run_due(&self, now: DateTime<Local>) -> usize {
        let mut due = Vec::new();
        {
            let mut registry = self.inner.registry.lock().await;
            let Some(anchor) = registry.anchor else {
                return 0;
            };
            for (id, job) in registry.jobs.iter_mut() {
                let Some(scheduled) = job.next_due else {
                    continue;
                };
                if scheduled > now {
                    continue;
                }

                job.next_due = job.trigger.next_after(&anchor, &now);
                let lateness = (now - scheduled).to_std().unwrap_or(Duration::ZERO);
                if lateness > job.misfire_grace {
                    warn!(
                        job_id = %id,
                        %scheduled,
                        late_by_secs = lateness.as_secs(),
                        misfire_grace_secs = job.misfire_grace.as_secs(),
                        "firing missed its grace period; skipping"
                    );
                    continue;
                }
                due.push((id.clone(), Arc::clone(&job.handler), Arc::clone(&job.running)));
            }
        }

        let mut fired = 0;
        for (id, handler, running) in due {
            match self.dispatch(&id, handler, running, TriggeredBy::Schedule).await {
                Ok(_) => fired += 1,
                Err(_) => warn!(job_id = %id, "previous run still in progress; dropping this firing"),
            }
        }
        fired
    }

    /// Claims the job's running flag and spawns its run onto the execution pool.
    async fn dispatch(
        &self,
        id: &str,
        handler: Arc<dyn JobHandler>,
        running: Arc<AtomicBool>,
        triggered_by: TriggeredBy,
    ) -> Result<(Uuid, JoinHandle<()>), SchedulerError> {
        if running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(SchedulerError::AlreadyRunning(id.to_string()));
        }
        let guard = RunningGuard(running);

        let run = JobRun::new(id, triggered_by);
        let run_id = run.id;
        self.inner.history.write().await.insert(run);

        let inner = Arc::clone(&self.inner);
        let job_id = id.to_string();
        let handle = self.inner.tracker.spawn(async move {
            let _guard = guard;
            let Ok(_permit) = Arc::clone(&inner.permits).acquire_owned().await else {
                inner
                    .history
                    .write()
                    .await
                    .update(&run_id, |r| r.fail("execution pool closed"));
                return;
            };

            inner.history.write().await.update(&run_id, JobRun::start);
            info!(job_id = %job_id, %run_id, %triggered_by, "job started");

            let started = Instant::now();
            // a panicking handler surfaces here as a JoinError
            let outcome = tokio::spawn(async move { handler.run().await }).await;
            let elapsed_ms = started.elapsed().as_millis() as u64;

            let mut history = inner.history.write().await;
            match outcome {
                Ok(Ok(())) => {
                    info!(job_id = %job_id, %run_id, elapsed_ms, "job completed");
                    history.update(&run_id, JobRun::complete);
                }
                Ok(Err(e)) => {
                    error!(job_id = %job_id, %run_id, elapsed_ms, error = %e, "job failed");
                    history.update(&run_id, |r| r.fail(e.to_string()));
                }
                Err(e) => {
                    error!(job_id = %job_id, %run_id, elapsed_ms, error = %e, "job panicked");
                    history.update(&run_id, |r| r.fail(format!("task panic: {e}")));
                }
            }
        });

        Ok((run_id, handle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::JobError;
    use crate::types::JobStatus;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;
    use chrono::Timelike;

    #[derive(Default)]
    struct Counting {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl JobHandler for Counting {
        async fn run(&self) -> Result<(), JobError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    /// Blocks inside `run` until the test hands out a permit.
    struct Gated {
        release: Semaphore,
        entered: AtomicUsize,
    }

    impl Gated {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                release: Semaphore::new(0),
                entered: AtomicUsize::new(0),
            })
        }

        async fn wait_entered(&self, n: usize) {
            tokio::time::timeout(Duration::from_secs(5), async {
                while self.entered.load(Ordering::SeqCst) < n {
                    tokio::time::sleep(Duration::from_millis(5)).await;
                }
            })
            .await
            .expect("handler never started");
        }
    }

    #[async_trait]
    impl JobHandler for Gated {
        async fn run(&self) -> Result<(), JobError> {
            self.entered.fetch_add(1, Ordering::SeqCst);
            self.release.acquire().await.expect("gate").forget();
            Ok(())
        }
    }

    struct Failing;

    #[async_trait]
    impl JobHandler for Failing {
        async fn run(&self) -> Result<(), JobError> {
            Err(JobError::failed("dump tool missing"))
        }
    }

    struct Panicking;

    #[async_trait]
    impl JobHandler for Panicking {
        async fn run(&self) -> Result<(), JobError> {
            panic!("handler bug");
        }
    }

    fn whole_second(ts: DateTime<Local>) -> DateTime<Local> {
        ts.with_nanosecond(0).unwrap()
    }

    #[tokio::test]
    async fn registering_twice_keeps_one_job() {
        let scheduler = JobScheduler::default();
        let handler = Arc::new(Counting::default());
        let grace = Duration::from_secs(60);

        assert!(scheduler
            .register("sweep", Trigger::every_minutes(1), handler.clone(), grace)
            .await
            .unwrap());
        assert!(!scheduler
            .register("sweep", Trigger::daily_at(3, 0), handler, grace)
            .await
            .unwrap());

        let jobs = scheduler.jobs().await;
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].trigger, Trigger::every_minutes(1));
    }

    #[tokio::test]
    async fn invalid_trigger_is_rejected() {
        let scheduler = JobScheduler::default();
        let err = scheduler
            .register(
                "bad",
                Trigger::every_minutes(0),
                Arc::new(Counting::default()),
                Duration::ZERO,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, SchedulerError::InvalidTrigger(_)));
        assert!(scheduler.jobs().await.is_empty());
    }

    #[tokio::test]
    async fn triggering_unknown_job_is_not_found() {
        let scheduler = JobScheduler::default();
        assert_eq!(
            scheduler.trigger("nope").await,
            Err(SchedulerError::NotFound("nope".into()))
        );
    }

    #[tokio::test]
    async fn overlapping_firing_is_dropped() {
        let scheduler = JobScheduler::default();
        let gated = Gated::new();
        scheduler
            .register("slow", Trigger::every_minutes(1), gated.clone(), Duration::from_secs(60))
            .await
            .unwrap();

        scheduler.trigger("slow").await.unwrap();
        gated.wait_entered(1).await;
        assert_eq!(
            scheduler.trigger("slow").await,
            Err(SchedulerError::AlreadyRunning("slow".into()))
        );
        assert!(scheduler.jobs().await[0].running);

        gated.release.add_permits(1);
        scheduler.wait_idle().await;
        assert!(!scheduler.jobs().await[0].running);
        assert_eq!(scheduler.count_runs(Some("slow")).await, 1);

        // the flag is free again once the run returns
        scheduler.trigger("slow").await.unwrap();
        gated.release.add_permits(1);
        scheduler.wait_idle().await;
        assert_eq!(gated.entered.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn scheduled_firing_while_running_is_dropped() {
        let scheduler = JobScheduler::default();
        let gated = Gated::new();
        scheduler
            .register("slow", Trigger::every_minutes(1), gated.clone(), Duration::from_secs(60))
            .await
            .unwrap();
        let t0 = whole_second(Local::now());
        scheduler.prime(t0).await;

        assert_eq!(scheduler.run_due(t0 + chrono::Duration::minutes(1)).await, 1);
        gated.wait_entered(1).await;
        assert_eq!(scheduler.run_due(t0 + chrono::Duration::minutes(2)).await, 0);

        gated.release.add_permits(1);
        scheduler.wait_idle().await;
        assert_eq!(gated.entered.load(Ordering::SeqCst), 1);
        assert_eq!(
            scheduler.jobs().await[0].next_due,
            Some(t0 + chrono::Duration::minutes(3))
        );
    }

    #[tokio::test]
    async fn late_firing_within_grace_runs_once_and_beyond_grace_is_skipped() {
        let scheduler = JobScheduler::default();
        let handler = Arc::new(Counting::default());
        scheduler
            .register("tick", Trigger::every_minutes(1), handler.clone(), Duration::from_secs(60))
            .await
            .unwrap();
        let t0 = whole_second(Local::now());
        scheduler.prime(t0).await;
        assert_eq!(
            scheduler.jobs().await[0].next_due,
            Some(t0 + chrono::Duration::minutes(1))
        );

        // 30s late: inside the grace window
        let now = t0 + chrono::Duration::seconds(90);
        assert_eq!(scheduler.run_due(now).await, 1);
        scheduler.wait_idle().await;
        assert_eq!(handler.calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            scheduler.jobs().await[0].next_due,
            Some(t0 + chrono::Duration::minutes(2))
        );

        // three minutes late: skipped, no catch-up for the slots in between
        let now = t0 + chrono::Duration::minutes(5);
        assert_eq!(scheduler.run_due(now).await, 0);
        scheduler.wait_idle().await;
        assert_eq!(handler.calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            scheduler.jobs().await[0].next_due,
            Some(t0 + chrono::Duration::minutes(6))
        );

        assert_eq!(scheduler.run_due(t0 + chrono::Duration::minutes(6)).await, 1);
        scheduler.wait_idle().await;
        assert_eq!(handler.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn nothing_fires_before_the_scheduler_is_primed() {
        let scheduler = JobScheduler::default();
        let handler = Arc::new(Counting::default());
        scheduler
            .register("tick", Trigger::every_minutes(1), handler.clone(), Duration::from_secs(60))
            .await
            .unwrap();
        assert!(scheduler.jobs().await[0].next_due.is_none());
        assert_eq!(scheduler.run_due(Local::now()).await, 0);
    }

    #[tokio::test]
    async fn failing_and_panicking_handlers_are_contained() {
        let scheduler = JobScheduler::default();
        let grace = Duration::from_secs(60);
        scheduler
            .register("fails", Trigger::every_minutes(1), Arc::new(Failing), grace)
            .await
            .unwrap();
        scheduler
            .register("panics", Trigger::every_minutes(1), Arc::new(Panicking), grace)
            .await
            .unwrap();

        let failed = scheduler.run_now("fails").await.unwrap();
        assert_eq!(failed.status, JobStatus::Failed);
        assert!(failed.error_message.unwrap().contains("dump tool missing"));

        let panicked = scheduler.run_now("panics").await.unwrap();
        assert_eq!(panicked.status, JobStatus::Failed);
        assert!(panicked.error_message.unwrap().starts_with("task panic"));

        // both stay registered and runnable
        assert_eq!(scheduler.jobs().await.len(), 2);
        assert_eq!(
            scheduler.run_now("panics").await.unwrap().triggered_by,
            TriggeredBy::Manual
        );
        assert_eq!(scheduler.count_runs(None).await, 3);
    }

    #[tokio::test]
    async fn pool_bounds_concurrent_handlers() {
        let scheduler = JobScheduler::new(1);
        let first = Gated::new();
        let second = Gated::new();
        let grace = Duration::from_secs(60);
        scheduler
            .register("a", Trigger::every_minutes(1), first.clone(), grace)
            .await
            .unwrap();
        scheduler
            .register("b", Trigger::every_minutes(1), second.clone(), grace)
            .await
            .unwrap();

        scheduler.trigger("a").await.unwrap();
        first.wait_entered(1).await;
        let queued = scheduler.trigger("b").await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(second.entered.load(Ordering::SeqCst), 0);
        assert_eq!(
            scheduler.get_run(queued).await.unwrap().status,
            JobStatus::Pending
        );

        first.release.add_permits(1);
        second.wait_entered(1).await;
        second.release.add_permits(1);
        scheduler.wait_idle().await;
        assert_eq!(
            scheduler.get_run(queued).await.unwrap().status,
            JobStatus::Completed
        );
    }

    #[tokio::test]
    async fn start_and_stop_are_idempotent() {
        let scheduler = JobScheduler::default();
        scheduler
            .register(
                "tick",
                Trigger::every_minutes(1),
                Arc::new(Counting::default()),
                Duration::from_secs(60),
            )
            .await
            .unwrap();

        assert!(scheduler.start().await);
        assert!(!scheduler.start().await);
        assert!(scheduler.is_started().await);
        let next_due = scheduler.jobs().await[0].next_due.unwrap();
        assert!(next_due > Local::now());

        assert!(scheduler.stop().await);
        assert!(!scheduler.stop().await);
        assert!(!scheduler.is_started().await);
    }

    #[tokio::test]
    async fn jobs_registered_after_start_get_a_due_time() {
        let scheduler = JobScheduler::default();
        assert!(scheduler.start().await);
        scheduler
            .register(
                "late",
                Trigger::daily_at(3, 0),
                Arc::new(Counting::default()),
                Duration::from_secs(3600),
            )
            .await
            .unwrap();

        let info = &scheduler.jobs().await[0];
        let next_due = info.next_due.unwrap();
        assert_eq!((next_due.hour(), next_due.minute()), (3, 0));
        scheduler.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn stop_waits_for_in_flight_handlers() {
        struct Slow(Arc<AtomicBool>);

        #[async_trait]
        impl JobHandler for Slow {
            async fn run(&self) -> Result<(), JobError> {
                tokio::time::sleep(Duration::from_millis(100)).await;
                self.0.store(true, Ordering::SeqCst);
                Ok(())
            }
        }

        let done = Arc::new(AtomicBool::new(false));
        let scheduler = JobScheduler::default();
        scheduler
            .register(
                "slow",
                Trigger::every_minutes(1),
                Arc::new(Slow(done.clone())),
                Duration::from_secs(60),
            )
            .await
            .unwrap();
        scheduler.start().await;
        scheduler.trigger("slow").await.unwrap();

        assert!(scheduler.stop().await);
        assert!(done.load(Ordering::SeqCst));
        assert_eq!(
            scheduler.list_runs(Some("slow"), 10, 0).await[0].status,
            JobStatus::Completed
        );
    }
}
