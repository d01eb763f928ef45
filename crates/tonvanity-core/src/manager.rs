//! Job manager: one search job per session
//!
//! Every job owns a pool of worker threads and one router thread. Workers
//! post [`WorkerEvent`]s on a shared channel; the router is the only code
//! touching the job's attempt total and found latch, and the only code
//! forwarding events to the session.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{select, unbounded, Receiver, RecvTimeoutError, Sender};
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::progress::ProgressAggregator;
use crate::types::{
    ProgressSnapshot, SearchRequest, SearchStatus, SessionEvent, SessionId, StopReason,
    VanityResult,
};
use crate::worker::{spawn_worker, FoundCandidate, WorkerEvent, WorkerParams};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Wait until every worker holding a `done` sender has exited, at most `grace`.
/// Returns false when some worker is still running.
fn wait_for_workers(done: &Receiver<()>, grace: Duration) -> bool {
    let deadline = Instant::now() + grace;
    loop {
        match done.recv_deadline(deadline) {
            Ok(()) => continue,
            Err(RecvTimeoutError::Disconnected) => return true,
            Err(RecvTimeoutError::Timeout) => return false,
        }
    }
}

/// Live handles of a running job
struct JobHandle {
    generation: u64,
    request: SearchRequest,
    cancel: Arc<AtomicBool>,
    /// Dropping this wakes the router and makes it exit
    router_stop: Option<Sender<()>>,
    router: Option<JoinHandle<()>>,
    workers: Vec<JoinHandle<()>>,
    workers_done: Receiver<()>,
}

impl JobHandle {
    /// Cancel the workers, stop the router and wait for both.
    ///
    /// Must not be called from the job's own router thread.
    fn shutdown(mut self, grace: Duration) {
        self.cancel.store(true, Ordering::SeqCst);
        drop(self.router_stop.take());

        if let Some(router) = self.router.take() {
            if router.join().is_err() {
                warn!("job router panicked");
            }
        }

        if wait_for_workers(&self.workers_done, grace) {
            for worker in self.workers.drain(..) {
                let _ = worker.join();
            }
        } else {
            warn!(
                pattern = %self.request.pattern,
                "workers still running after {:?} grace period, detaching",
                grace
            );
        }
    }
}

/// Active jobs keyed by session.
///
/// Owned by a [`JobManager`]; routers hold a clone so a job can remove
/// itself once it finishes.
#[derive(Clone, Default)]
pub struct JobRegistry {
    jobs: Arc<Mutex<HashMap<SessionId, JobHandle>>>,
}

impl JobRegistry {
    pub fn active_jobs(&self) -> usize {
        lock(&self.jobs).len()
    }

    pub fn contains(&self, session: &SessionId) -> bool {
        lock(&self.jobs).contains_key(session)
    }

    fn insert(&self, session: SessionId, handle: JobHandle) {
        lock(&self.jobs).insert(session, handle);
    }

    fn remove(&self, session: &SessionId) -> Option<JobHandle> {
        lock(&self.jobs).remove(session)
    }

    /// Remove the job only if it is still the given generation
    fn remove_generation(&self, session: &SessionId, generation: u64) -> Option<JobHandle> {
        let mut jobs = lock(&self.jobs);
        if jobs.get(session).map(|h| h.generation) == Some(generation) {
            jobs.remove(session)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Finished,
}

/// Serializes the worker events of one job
struct JobRouter {
    session: SessionId,
    generation: u64,
    request: SearchRequest,
    aggregator: ProgressAggregator,
    found: AtomicBool,
    cancel: Arc<AtomicBool>,
    workers_done: Receiver<()>,
    live_workers: usize,
    exhausted_workers: usize,
    sink: Sender<SessionEvent>,
    registry: JobRegistry,
    grace: Duration,
}

impl JobRouter {
    fn run(mut self, events: Receiver<WorkerEvent>, stop: Receiver<()>) {
        loop {
            select! {
                recv(events) -> event => {
                    let flow = match event {
                        Ok(event) => self.handle(event),
                        Err(_) if self.cancel.load(Ordering::SeqCst) => Flow::Finished,
                        // Every worker is gone without a final word
                        Err(_) => self.finish_without_result(),
                    };
                    if flow == Flow::Finished {
                        break;
                    }
                }
                recv(stop) -> _ => break,
            }
        }
        debug!(session = %self.session, "router exited");
    }

    fn handle(&mut self, event: WorkerEvent) -> Flow {
        if self.cancel.load(Ordering::SeqCst) {
            return Flow::Finished;
        }

        match event {
            WorkerEvent::Progress {
                worker_id,
                attempts,
                exhausted,
            } => {
                let snapshot = self.aggregator.record(attempts);
                self.emit(SessionEvent::Progress(snapshot));
                if exhausted {
                    info!(session = %self.session, worker = worker_id, "worker exhausted its attempts");
                    self.exhausted_workers += 1;
                    return self.worker_stopped();
                }
                Flow::Continue
            }
            WorkerEvent::Found {
                worker_id,
                candidate,
            } => {
                if self
                    .found
                    .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                    .is_err()
                {
                    debug!(session = %self.session, worker = worker_id, "discarding late match");
                    return Flow::Continue;
                }
                self.accept(worker_id, *candidate);
                Flow::Finished
            }
            WorkerEvent::Error { worker_id, message } => {
                warn!(session = %self.session, worker = worker_id, "worker error: {}", message);
                self.emit(SessionEvent::Error { message });
                self.worker_stopped()
            }
        }
    }

    fn accept(&mut self, worker_id: usize, candidate: FoundCandidate) {
        let time_taken = self.aggregator.elapsed().as_secs_f64();
        let attempts = self.aggregator.total_attempts() + candidate.unreported;

        info!(
            session = %self.session,
            worker = worker_id,
            address = %candidate.address,
            attempts,
            nonce = candidate.nonce,
            "match found in {:.2}s",
            time_taken
        );

        let result = VanityResult {
            public_key: candidate.public_key_hex(),
            secret_key: candidate.secret_key_hex(),
            address: candidate.address,
            template: self.request.template,
            pattern: self.request.pattern.clone(),
            attempts,
            time_taken,
            state_init: candidate.state_init_boc,
        };
        self.emit(SessionEvent::Found(result));
        self.teardown();
    }

    fn worker_stopped(&mut self) -> Flow {
        self.live_workers = self.live_workers.saturating_sub(1);
        if self.live_workers == 0 {
            self.finish_without_result()
        } else {
            Flow::Continue
        }
    }

    /// No worker is searching any more and nothing matched
    fn finish_without_result(&mut self) -> Flow {
        let (status, reason) = if self.exhausted_workers > 0 {
            (SearchStatus::Stopped, StopReason::Exhausted)
        } else {
            (SearchStatus::Error, StopReason::Failed)
        };
        info!(session = %self.session, ?reason, "search ended without a match");

        let snapshot: ProgressSnapshot = self.aggregator.snapshot_at(Instant::now(), status);
        self.emit(SessionEvent::Progress(snapshot));
        self.emit(SessionEvent::Stopped { reason });
        self.teardown();
        Flow::Finished
    }

    /// Cancel every worker, wait for them, then release the session slot
    fn teardown(&mut self) {
        self.cancel.store(true, Ordering::SeqCst);
        if !wait_for_workers(&self.workers_done, self.grace) {
            warn!(session = %self.session, "workers still running after grace period, detaching");
        }
        // Our own handle: dropping it detaches this thread's JoinHandle
        drop(self.registry.remove_generation(&self.session, self.generation));
    }

    fn emit(&self, event: SessionEvent) {
        // A closed session simply stops listening
        let _ = self.sink.send(event);
    }
}

/// Starts, stops and tracks search jobs, at most one per session
pub struct JobManager {
    config: EngineConfig,
    registry: JobRegistry,
    sessions: Mutex<HashMap<SessionId, Sender<SessionEvent>>>,
    /// Serializes start/stop so a session slot is never reused early
    lifecycle: Mutex<()>,
    next_generation: AtomicU64,
}

impl JobManager {
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        config.validate()?;
        Ok(Self {
            config,
            registry: JobRegistry::default(),
            sessions: Mutex::new(HashMap::new()),
            lifecycle: Mutex::new(()),
            next_generation: AtomicU64::new(1),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Handle to the job store
    pub fn registry(&self) -> &JobRegistry {
        &self.registry
    }

    pub fn active_jobs(&self) -> usize {
        self.registry.active_jobs()
    }

    /// Open the event channel of a session.
    ///
    /// Reconnecting an existing id disconnects the previous channel first.
    pub fn connect(&self, session: impl Into<SessionId>) -> Receiver<SessionEvent> {
        let session = session.into();
        self.disconnect(&session);

        let (tx, rx) = unbounded();
        lock(&self.sessions).insert(session.clone(), tx);
        debug!(%session, "session connected");
        rx
    }

    /// Start a search, replacing any job the session already runs
    pub fn start(&self, session: &SessionId, request: SearchRequest) -> Result<(), EngineError> {
        let _guard = lock(&self.lifecycle);

        let sink = lock(&self.sessions)
            .get(session)
            .cloned()
            .ok_or_else(|| EngineError::UnknownSession(session.clone()))?;
        // A rejected request leaves the running job alone
        request.validate()?;

        self.stop_locked(session);

        info!(
            %session,
            "Starting generation for pattern: {} ({}, {})",
            request.pattern,
            request.match_kind,
            request.template
        );

        let handle = self.spawn_job(session, request, sink)?;
        self.registry.insert(session.clone(), handle);
        Ok(())
    }

    /// Stop the session's job, if any. Returns whether one was running.
    pub fn stop(&self, session: &SessionId) -> bool {
        let _guard = lock(&self.lifecycle);
        self.stop_locked(session)
    }

    /// Stop on caller request and confirm with `Stopped`
    pub fn stop_generation(&self, session: &SessionId) {
        let _guard = lock(&self.lifecycle);
        self.stop_locked(session);
        if let Some(sink) = lock(&self.sessions).get(session) {
            let _ = sink.send(SessionEvent::Stopped {
                reason: StopReason::Requested,
            });
        }
    }

    /// The session's channel closed: stop its job and forget it
    pub fn disconnect(&self, session: &SessionId) {
        self.stop(session);
        if lock(&self.sessions).remove(session).is_some() {
            debug!(%session, "session disconnected");
        }
    }

    fn stop_locked(&self, session: &SessionId) -> bool {
        match self.registry.remove(session) {
            Some(handle) => {
                handle.shutdown(self.config.stop_grace());
                info!(%session, "Stopped generation");
                true
            }
            None => false,
        }
    }

    fn spawn_job(
        &self,
        session: &SessionId,
        request: SearchRequest,
        sink: Sender<SessionEvent>,
    ) -> Result<JobHandle, EngineError> {
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let started_at = Instant::now();
        let cancel = Arc::new(AtomicBool::new(false));
        let (events_tx, events_rx) = unbounded();
        let (done_tx, done_rx) = unbounded::<()>();
        let pattern = request.to_pattern();

        let mut workers = Vec::with_capacity(self.config.num_workers);
        for id in 0..self.config.num_workers {
            let params = WorkerParams {
                id,
                start_nonce: id as u64 * self.config.max_attempts_per_worker,
                batch_size: self.config.batch_size,
                max_attempts: self.config.max_attempts_per_worker,
                pattern: pattern.clone(),
                template: request.template,
            };
            match spawn_worker(params, events_tx.clone(), cancel.clone(), done_tx.clone()) {
                Ok(handle) => workers.push(handle),
                Err(e) => {
                    cancel.store(true, Ordering::SeqCst);
                    drop(done_tx);
                    wait_for_workers(&done_rx, self.config.stop_grace());
                    return Err(EngineError::Spawn(e));
                }
            }
        }
        drop(events_tx);
        drop(done_tx);

        let router = JobRouter {
            session: session.clone(),
            generation,
            request: request.clone(),
            aggregator: ProgressAggregator::new(pattern.len(), started_at),
            found: AtomicBool::new(false),
            cancel: cancel.clone(),
            workers_done: done_rx.clone(),
            live_workers: workers.len(),
            exhausted_workers: 0,
            sink,
            registry: self.registry.clone(),
            grace: self.config.stop_grace(),
        };

        let (stop_tx, stop_rx) = unbounded::<()>();
        let router = match thread::Builder::new()
            .name(format!("vanity-router-{}", session))
            .spawn(move || router.run(events_rx, stop_rx))
        {
            Ok(handle) => handle,
            Err(e) => {
                cancel.store(true, Ordering::SeqCst);
                wait_for_workers(&done_rx, self.config.stop_grace());
                return Err(EngineError::Spawn(e));
            }
        };

        Ok(JobHandle {
            generation,
            request,
            cancel,
            router_stop: Some(stop_tx),
            router: Some(router),
            workers,
            workers_done: done_rx,
        })
    }
}

impl Drop for JobManager {
    fn drop(&mut self) {
        let sessions: Vec<SessionId> = lock(&self.registry.jobs).keys().cloned().collect();
        for session in sessions {
            self.stop(&session);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tonvanity_crypto::Ed25519Keypair;
    use tonvanity_pattern::MatchKind;
    use tonvanity_wallet::{derive_address, WalletTemplate};

    fn request() -> SearchRequest {
        SearchRequest::new("abc", MatchKind::Prefix, false, WalletTemplate::V4R2)
    }

    fn candidate(seed: u8, unreported: u64) -> Box<FoundCandidate> {
        let keypair = Ed25519Keypair::from_seed(&[seed; 32]);
        let derived = derive_address(&keypair.public_key_bytes(), WalletTemplate::V4R2).unwrap();
        Box::new(FoundCandidate {
            address: derived.friendly.clone(),
            public_key: keypair.public_key_bytes(),
            secret_key: keypair.secret_key_bytes(),
            state_init_boc: derived.state_init_boc(),
            local_attempts: unreported,
            unreported,
            nonce: unreported,
        })
    }

    /// A registered job with no threads behind it, plus its router
    fn idle_job(registry: &JobRegistry, workers: usize) -> (JobRouter, Receiver<SessionEvent>, Arc<AtomicBool>) {
        let session = SessionId::from("s1");
        let cancel = Arc::new(AtomicBool::new(false));
        let (done_tx, done_rx) = unbounded::<()>();
        drop(done_tx);
        let (sink, events) = unbounded();

        registry.insert(
            session.clone(),
            JobHandle {
                generation: 7,
                request: request(),
                cancel: cancel.clone(),
                router_stop: None,
                router: None,
                workers: Vec::new(),
                workers_done: done_rx.clone(),
            },
        );

        let router = JobRouter {
            session,
            generation: 7,
            request: request(),
            aggregator: ProgressAggregator::new(3, Instant::now()),
            found: AtomicBool::new(false),
            cancel: cancel.clone(),
            workers_done: done_rx,
            live_workers: workers,
            exhausted_workers: 0,
            sink,
            registry: registry.clone(),
            grace: Duration::from_millis(10),
        };
        (router, events, cancel)
    }

    #[test]
    fn test_first_found_wins() {
        let registry = JobRegistry::default();
        let (router, events, cancel) = idle_job(&registry, 2);
        assert_eq!(registry.active_jobs(), 1);

        let (tx, rx) = unbounded();
        tx.send(WorkerEvent::Progress { worker_id: 0, attempts: 1000, exhausted: false }).unwrap();
        tx.send(WorkerEvent::Found { worker_id: 0, candidate: candidate(1, 5) }).unwrap();
        tx.send(WorkerEvent::Found { worker_id: 1, candidate: candidate(2, 9) }).unwrap();
        drop(tx);
        let (_stop_tx, stop_rx) = unbounded::<()>();
        router.run(rx, stop_rx);

        let received: Vec<SessionEvent> = events.try_iter().collect();
        let found: Vec<&VanityResult> = received
            .iter()
            .filter_map(|e| match e {
                SessionEvent::Found(r) => Some(r),
                _ => None,
            })
            .collect();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].address, candidate(1, 5).address);
        assert_eq!(found[0].attempts, 1005);
        assert!(matches!(received.last(), Some(SessionEvent::Found(_))));
        assert!(cancel.load(Ordering::SeqCst));
        assert_eq!(registry.active_jobs(), 0);
    }

    #[test]
    fn test_worker_error_keeps_job_alive() {
        let registry = JobRegistry::default();
        let (mut router, events, cancel) = idle_job(&registry, 2);

        let flow = router.handle(WorkerEvent::Error { worker_id: 1, message: "boom".into() });
        assert_eq!(flow, Flow::Continue);
        assert_eq!(
            events.try_recv().unwrap(),
            SessionEvent::Error { message: "boom".into() }
        );
        assert!(!cancel.load(Ordering::SeqCst));
        assert_eq!(registry.active_jobs(), 1);
    }

    #[test]
    fn test_all_workers_exhausted_stops_job() {
        let registry = JobRegistry::default();
        let (mut router, events, _) = idle_job(&registry, 2);

        let exhausted = |id| WorkerEvent::Progress { worker_id: id, attempts: 500, exhausted: true };
        assert_eq!(router.handle(exhausted(0)), Flow::Continue);
        assert_eq!(router.handle(WorkerEvent::Error { worker_id: 1, message: "x".into() }), Flow::Finished);

        let received: Vec<SessionEvent> = events.try_iter().collect();
        assert!(matches!(
            received[received.len() - 2],
            SessionEvent::Progress(ProgressSnapshot { attempts: 500, status: SearchStatus::Stopped, .. })
        ));
        assert_eq!(
            received.last(),
            Some(&SessionEvent::Stopped { reason: StopReason::Exhausted })
        );
        assert_eq!(registry.active_jobs(), 0);
    }

    #[test]
    fn test_router_leaves_newer_generation_alone() {
        let registry = JobRegistry::default();
        let (mut router, _events, _) = idle_job(&registry, 1);
        router.generation = 6;

        router.handle(WorkerEvent::Progress { worker_id: 0, attempts: 0, exhausted: true });
        assert!(registry.contains(&SessionId::from("s1")));
    }

    #[test]
    fn test_start_requires_connected_session() {
        let manager = JobManager::new(EngineConfig::default()).unwrap();
        let err = manager.start(&SessionId::from("nobody"), request()).unwrap_err();
        assert!(matches!(err, EngineError::UnknownSession(_)));
    }

    #[test]
    fn test_stop_is_idempotent() {
        let manager = JobManager::new(EngineConfig::default()).unwrap();
        let session = SessionId::from("idle");
        let _events = manager.connect(session.clone());
        assert!(!manager.stop(&session));
        assert!(!manager.stop(&session));
        manager.disconnect(&session);
        manager.disconnect(&session);
    }

    #[test]
    fn test_wait_for_workers_times_out_on_straggler() {
        let (done_tx, done_rx) = unbounded::<()>();
        let started = Instant::now();
        assert!(!wait_for_workers(&done_rx, Duration::from_millis(50)));
        let waited = started.elapsed();
        assert!(waited >= Duration::from_millis(50));
        assert!(waited < Duration::from_secs(2));

        drop(done_tx);
        assert!(wait_for_workers(&done_rx, Duration::from_millis(50)));
    }

    #[test]
    fn test_shutdown_detaches_worker_ignoring_cancel() {
        let cancel = Arc::new(AtomicBool::new(false));
        let (done_tx, done_rx) = unbounded::<()>();
        let stubborn = thread::spawn(move || {
            let _done = done_tx;
            thread::sleep(Duration::from_secs(3));
        });

        let handle = JobHandle {
            generation: 1,
            request: request(),
            cancel: cancel.clone(),
            router_stop: None,
            router: None,
            workers: vec![stubborn],
            workers_done: done_rx,
        };

        let started = Instant::now();
        handle.shutdown(Duration::from_millis(100));
        assert!(started.elapsed() < Duration::from_secs(2));
        assert!(cancel.load(Ordering::SeqCst));
    }
}
