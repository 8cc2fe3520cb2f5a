// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Polling scheduler.
//
// One cycle: resolve the local address, ping, and when the device is
// approved fetch a batch and print it job by job. Cycles never overlap.
// Stopping is cooperative: the running flag is checked at the top of each
// cycle and before each job, so a job already printing always finishes.

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;

use tokio::sync::{Mutex, Notify};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, instrument, warn};

use ticketwerk_bridge::NetworkInfo;
use ticketwerk_core::DeviceStatus;
use ticketwerk_core::config::PrinterSettings;

use crate::processor::{JobProcessor, JobReport};
use crate::remote::JobSource;

const IDLE: u8 = 0;
const RUNNING: u8 = 1;
const STOPPED: u8 = 2;

/// Cheap, cloneable control over a running scheduler.
///
/// A stop is final: once requested, even before the scheduler starts, it
/// never runs again.
#[derive(Debug, Clone, Default)]
pub struct SchedulerHandle {
    state: Arc<AtomicU8>,
    wake: Arc<Notify>,
}

impl SchedulerHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(&self) -> bool {
        self.state.load(Ordering::SeqCst) == RUNNING
    }

    /// Stop after the current job. No further job or cycle starts.
    pub fn stop(&self) {
        if self.state.swap(STOPPED, Ordering::SeqCst) == RUNNING {
            info!("scheduler stopping");
        }
        self.wake.notify_one();
    }

    /// Move from idle to running. False if a stop came first.
    fn set_running(&self) -> bool {
        match self.state.compare_exchange(IDLE, RUNNING, Ordering::SeqCst, Ordering::SeqCst) {
            Ok(_) => true,
            Err(current) => current == RUNNING,
        }
    }
}

/// What a single poll cycle did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleReport {
    /// The scheduler was not running.
    Stopped,
    /// Another cycle was still in progress.
    Overlapped,
    /// No local address; nothing was sent.
    NetworkUnavailable(String),
    /// Ping or fetch failed. Retried on the next tick.
    RemoteError(String),
    /// The service has not approved this device yet.
    AwaitingApproval(DeviceStatus),
    Processed {
        jobs: Vec<JobReport>,
        /// Jobs fetched but not started because the scheduler stopped.
        cancelled: usize,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollOptions {
    pub interval: Duration,
    pub job_limit: u32,
}

impl Default for PollOptions {
    fn default() -> Self {
        Self::from(&PrinterSettings::default())
    }
}

impl From<&PrinterSettings> for PollOptions {
    fn from(settings: &PrinterSettings) -> Self {
        Self {
            interval: settings.poll_interval(),
            job_limit: settings.job_limit,
        }
    }
}

pub struct PollScheduler {
    source: Arc<dyn JobSource>,
    network: Arc<dyn NetworkInfo>,
    processor: JobProcessor,
    options: PollOptions,
    handle: SchedulerHandle,
    cycle_guard: Mutex<()>,
}

impl PollScheduler {
    pub fn new(
        source: Arc<dyn JobSource>,
        network: Arc<dyn NetworkInfo>,
        processor: JobProcessor,
        options: PollOptions,
    ) -> Self {
        Self {
            source,
            network,
            processor,
            options,
            handle: SchedulerHandle::new(),
            cycle_guard: Mutex::new(()),
        }
    }

    /// Share an existing handle, e.g. one a signal task already holds.
    pub fn with_handle(mut self, handle: SchedulerHandle) -> Self {
        self.handle = handle;
        self
    }

    pub fn handle(&self) -> SchedulerHandle {
        self.handle.clone()
    }

    /// Mark the scheduler running and run one cycle immediately.
    pub async fn start(&self) -> CycleReport {
        if !self.handle.set_running() {
            info!("stop requested before start, not polling");
            return CycleReport::Stopped;
        }
        info!(
            interval_ms = self.options.interval.as_millis() as u64,
            job_limit = self.options.job_limit,
            strategies = ?self.processor.chain().available(),
            "scheduler started"
        );
        self.poll_cycle().await
    }

    /// `start`, then poll every interval until stopped. The first timed
    /// cycle runs one full interval after the immediate one; ticks missed
    /// while a slow cycle runs are skipped, not queued.
    pub async fn run(&self) {
        self.start().await;

        let period = self.options.interval;
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        while self.handle.is_running() {
            tokio::select! {
                biased;

                _ = self.handle.wake.notified() => {
                    debug!("scheduler woken");
                }

                _ = ticker.tick() => {
                    self.poll_cycle().await;
                }
            }
        }
        info!("scheduler stopped");
    }

    #[instrument(skip(self))]
    pub async fn poll_cycle(&self) -> CycleReport {
        if !self.handle.is_running() {
            return CycleReport::Stopped;
        }
        let Ok(_guard) = self.cycle_guard.try_lock() else {
            debug!("previous cycle still running, skipping tick");
            return CycleReport::Overlapped;
        };

        let ip = match self.network.local_ip().await {
            Ok(ip) => ip,
            Err(err) => {
                warn!(error = %err, "no local address, skipping cycle");
                return CycleReport::NetworkUnavailable(err.to_string());
            }
        };

        let status = match self.source.ping(ip).await {
            Ok(status) => status,
            Err(err) => {
                warn!(error = %err, "ping failed");
                return CycleReport::RemoteError(err.to_string());
            }
        };
        if !status.is_approved() {
            info!(status = %status, "device not approved yet, waiting");
            return CycleReport::AwaitingApproval(status);
        }

        let batch = match self.source.fetch_jobs(self.options.job_limit).await {
            Ok(batch) => batch,
            Err(err) => {
                warn!(error = %err, "fetching jobs failed");
                return CycleReport::RemoteError(err.to_string());
            }
        };

        let mut jobs = Vec::with_capacity(batch.len());
        for (index, entry) in batch.iter().enumerate() {
            if !self.handle.is_running() {
                let cancelled = batch.len() - index;
                info!(cancelled, "scheduler stopped mid-batch, leaving remaining jobs");
                return CycleReport::Processed { jobs, cancelled };
            }
            jobs.push(self.processor.process_entry(entry).await);
        }
        CycleReport::Processed { jobs, cancelled: 0 }
    }
}

#[cfg(test)]
mod tests {
    use std::net::{IpAddr, Ipv4Addr};
    use std::sync::atomic::AtomicUsize;

    use async_trait::async_trait;
    use ticketwerk_core::JobStatus;
    use ticketwerk_core::error::{Result, TicketwerkError};
    use ticketwerk_print::{PrintFailure, PrintStrategy, PrintableTicket, StrategyChain};

    use super::*;
    use crate::processor::tests::{EventLog, FakeSource, ready, strategy, unreadable};

    struct FixedNetwork(Option<IpAddr>);

    #[async_trait]
    impl NetworkInfo for FixedNetwork {
        async fn local_ip(&self) -> Result<IpAddr> {
            self.0
                .ok_or_else(|| TicketwerkError::NetworkInfoUnavailable("no IPv4 address found for wlan0".into()))
        }

        async fn internet_reachable(&self) -> bool {
            self.0.is_some()
        }
    }

    fn lan() -> Arc<dyn NetworkInfo> {
        Arc::new(FixedNetwork(Some(IpAddr::V4(Ipv4Addr::new(192, 168, 1, 44)))))
    }

    fn options() -> PollOptions {
        PollOptions {
            interval: Duration::from_millis(5_000),
            job_limit: 3,
        }
    }

    fn scheduler(source: Arc<FakeSource>, network: Arc<dyn NetworkInfo>, chain: StrategyChain) -> PollScheduler {
        let processor = JobProcessor::new(source.clone(), chain);
        PollScheduler::new(source, network, processor, options())
    }

    fn fetches(source: &FakeSource) -> u32 {
        *source.fetches.lock().unwrap()
    }

    #[tokio::test]
    async fn unapproved_device_never_fetches() {
        let log = EventLog::default();
        let mut source = FakeSource::new(log.clone());
        source.status = DeviceStatus::Pending;
        source.jobs = vec![ready("j1")];
        let source = Arc::new(source);
        let chain = StrategyChain::new(vec![strategy("system", false, &log)]);
        let scheduler = scheduler(source.clone(), lan(), chain);

        let report = scheduler.start().await;

        assert_eq!(report, CycleReport::AwaitingApproval(DeviceStatus::Pending));
        assert_eq!(fetches(&source), 0);
        assert_eq!(*log.lock().unwrap(), vec!["ping"]);
    }

    #[tokio::test]
    async fn approved_device_processes_batch_in_order() {
        let log = EventLog::default();
        let mut source = FakeSource::new(log.clone());
        source.jobs = vec![ready("j1"), ready("j2"), ready("j3"), ready("j4")];
        let source = Arc::new(source);
        let chain = StrategyChain::new(vec![strategy("system", false, &log)]);
        let scheduler = scheduler(source.clone(), lan(), chain);

        let CycleReport::Processed { jobs, cancelled } = scheduler.start().await else {
            panic!("expected a processed batch");
        };

        let ids: Vec<_> = jobs.iter().map(|r| r.job_id.as_str()).collect();
        assert_eq!(ids, vec!["j1", "j2", "j3"], "job limit caps the batch");
        assert!(jobs.iter().all(|r| r.status == JobStatus::Completed));
        assert_eq!(cancelled, 0);
    }

    #[tokio::test]
    async fn unreadable_job_in_batch_still_ends_failed() {
        let log = EventLog::default();
        let mut source = FakeSource::new(log.clone());
        source.jobs = vec![ready("j1"), unreadable("j2"), ready("j3")];
        let source = Arc::new(source);
        let chain = StrategyChain::new(vec![strategy("system", false, &log)]);
        let scheduler = scheduler(source, lan(), chain);

        let CycleReport::Processed { jobs, cancelled } = scheduler.start().await else {
            panic!("expected a processed batch");
        };

        let statuses: Vec<_> = jobs.iter().map(|r| (r.job_id.as_str(), r.status)).collect();
        assert_eq!(
            statuses,
            vec![
                ("j1", JobStatus::Completed),
                ("j2", JobStatus::Failed),
                ("j3", JobStatus::Completed)
            ]
        );
        assert_eq!(cancelled, 0);
        assert!(jobs.iter().all(|r| r.status.is_terminal()));

        let log = log.lock().unwrap();
        assert!(!log.contains(&"j2:print:system".to_string()));
        assert!(log.iter().any(|e| e.starts_with("j2:FAILED:unreadable job payload")));
    }

    #[tokio::test]
    async fn missing_network_skips_cycle_without_ping() {
        let log = EventLog::default();
        let source = Arc::new(FakeSource::new(log.clone()));
        let scheduler = scheduler(source.clone(), Arc::new(FixedNetwork(None)), StrategyChain::default());

        let report = scheduler.start().await;

        assert!(matches!(report, CycleReport::NetworkUnavailable(_)));
        assert!(log.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn stopped_scheduler_does_nothing() {
        let log = EventLog::default();
        let source = Arc::new(FakeSource::new(log.clone()));
        let scheduler = scheduler(source, lan(), StrategyChain::default());

        assert_eq!(scheduler.poll_cycle().await, CycleReport::Stopped);
        assert!(log.lock().unwrap().is_empty());
    }

    /// Prints successfully and stops the scheduler while doing so.
    struct StoppingStrategy {
        handle: SchedulerHandle,
        printed: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl PrintStrategy for StoppingStrategy {
        fn name(&self) -> &str {
            "system"
        }

        fn is_available(&self) -> bool {
            true
        }

        async fn print(&self, _ticket: &PrintableTicket) -> std::result::Result<(), PrintFailure> {
            self.handle.stop();
            self.printed.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn stop_mid_batch_finishes_current_job_only() {
        let log = EventLog::default();
        let mut source = FakeSource::new(log.clone());
        source.jobs = vec![ready("j1"), ready("j2"), ready("j3")];
        let source = Arc::new(source);

        let handle = SchedulerHandle::new();
        let printed = Arc::new(AtomicUsize::new(0));
        let chain = StrategyChain::new(vec![Box::new(StoppingStrategy {
            handle: handle.clone(),
            printed: printed.clone(),
        })]);
        let scheduler = scheduler(source, lan(), chain).with_handle(handle.clone());

        let report = scheduler.start().await;

        let CycleReport::Processed { jobs, cancelled } = report else {
            panic!("expected a processed batch");
        };
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].status, JobStatus::Completed);
        assert_eq!(cancelled, 2);
        assert_eq!(printed.load(Ordering::SeqCst), 1);
        assert!(!handle.is_running());

        let log = log.lock().unwrap();
        assert!(log.contains(&"j1:COMPLETED".to_string()));
        assert!(!log.iter().any(|e| e.starts_with("j2")));
    }

    /// Answers ping only after a delay, to hold a cycle open.
    struct SlowNetwork;

    #[async_trait]
    impl NetworkInfo for SlowNetwork {
        async fn local_ip(&self) -> Result<IpAddr> {
            tokio::time::sleep(Duration::from_secs(2)).await;
            Ok(IpAddr::V4(Ipv4Addr::LOCALHOST))
        }

        async fn internet_reachable(&self) -> bool {
            true
        }
    }

    #[tokio::test(start_paused = true)]
    async fn overlapping_cycle_is_suppressed() {
        let log = EventLog::default();
        let source = Arc::new(FakeSource::new(log.clone()));
        let scheduler = scheduler(source, Arc::new(SlowNetwork), StrategyChain::default());
        assert!(scheduler.handle.set_running());

        let (first, second) = tokio::join!(scheduler.poll_cycle(), scheduler.poll_cycle());

        assert!(matches!(first, CycleReport::Processed { .. }));
        assert_eq!(second, CycleReport::Overlapped);
        assert_eq!(*log.lock().unwrap(), vec!["ping", "fetch"]);
    }

    #[tokio::test(start_paused = true)]
    async fn run_polls_on_interval_until_stopped() {
        let log = EventLog::default();
        let source = Arc::new(FakeSource::new(log.clone()));
        let scheduler = Arc::new(scheduler(source.clone(), lan(), StrategyChain::default()));
        let handle = scheduler.handle();

        let task = tokio::spawn({
            let scheduler = scheduler.clone();
            async move { scheduler.run().await }
        });

        // Immediate cycle plus two timed ones.
        tokio::time::sleep(Duration::from_millis(10_500)).await;
        handle.stop();
        task.await.unwrap();

        assert_eq!(fetches(&source), 3);
        assert!(!handle.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn stop_before_run_is_not_overwritten() {
        let log = EventLog::default();
        let source = Arc::new(FakeSource::new(log.clone()));
        let scheduler = scheduler(source.clone(), lan(), StrategyChain::default());
        let handle = scheduler.handle();

        handle.stop();
        scheduler.run().await;

        assert!(!handle.is_running());
        assert_eq!(fetches(&source), 0);
        assert!(log.lock().unwrap().is_empty());
    }
}
