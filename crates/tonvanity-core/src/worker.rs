//! Search worker: generate, derive, match, report

use std::any::Any;
use std::fmt;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::Sender;
use tracing::{debug, warn};

use tonvanity_crypto::{hex, Ed25519Keypair};
use tonvanity_pattern::Pattern;
use tonvanity_wallet::{AddressDeriver, DerivedAddress, WalletTemplate};

/// Parameters of one worker
#[derive(Debug, Clone)]
pub struct WorkerParams {
    pub id: usize,
    /// Offset of this worker's attempt numbering
    pub start_nonce: u64,
    pub batch_size: u64,
    pub max_attempts: u64,
    pub pattern: Pattern,
    pub template: WalletTemplate,
}

/// A matching candidate
#[derive(Clone)]
pub struct FoundCandidate {
    pub address: String,
    pub public_key: [u8; 32],
    pub secret_key: [u8; 64],
    pub state_init_boc: String,
    /// Attempts made by this worker, the winning one included
    pub local_attempts: u64,
    /// Attempts not yet covered by a progress report, the winning one included
    pub unreported: u64,
    /// Global number of the winning attempt (`start_nonce + local_attempts`)
    pub nonce: u64,
}

impl FoundCandidate {
    fn new(
        keypair: &Ed25519Keypair,
        derived: &DerivedAddress,
        local_attempts: u64,
        unreported: u64,
        nonce: u64,
    ) -> Self {
        Self {
            address: derived.friendly.clone(),
            public_key: keypair.public_key_bytes(),
            secret_key: keypair.secret_key_bytes(),
            state_init_boc: derived.state_init_boc(),
            local_attempts,
            unreported,
            nonce,
        }
    }

    pub fn public_key_hex(&self) -> String {
        hex::encode(self.public_key)
    }

    pub fn secret_key_hex(&self) -> String {
        hex::encode(self.secret_key)
    }
}

impl fmt::Debug for FoundCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FoundCandidate")
            .field("address", &self.address)
            .field("local_attempts", &self.local_attempts)
            .field("nonce", &self.nonce)
            .finish_non_exhaustive()
    }
}

/// Messages a worker posts to its job
#[derive(Debug, Clone)]
pub enum WorkerEvent {
    /// `attempts` misses since the previous report
    Progress {
        worker_id: usize,
        attempts: u64,
        exhausted: bool,
    },
    Found {
        worker_id: usize,
        candidate: Box<FoundCandidate>,
    },
    Error {
        worker_id: usize,
        message: String,
    },
}

/// Worker lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Idle,
    Searching,
    Found,
    Exhausted,
    /// Stopped by its job
    Terminated,
    /// Stopped by an internal error
    Failed,
}

/// One search loop
pub struct SearchWorker {
    params: WorkerParams,
    events: Sender<WorkerEvent>,
    cancel: Arc<AtomicBool>,
    state: WorkerState,
}

impl SearchWorker {
    pub fn new(params: WorkerParams, events: Sender<WorkerEvent>, cancel: Arc<AtomicBool>) -> Self {
        Self {
            params,
            events,
            cancel,
            state: WorkerState::Idle,
        }
    }

    pub fn state(&self) -> WorkerState {
        self.state
    }

    /// Run until found, exhausted, cancelled or failed; returns the final state
    pub fn run(mut self) -> WorkerState {
        self.state = WorkerState::Searching;
        self.state = self.search();
        debug!(worker = self.params.id, state = ?self.state, "worker finished");
        self.state
    }

    fn search(&mut self) -> WorkerState {
        let id = self.params.id;

        let deriver = match AddressDeriver::new(self.params.template) {
            Ok(d) => d,
            Err(e) => return self.fail(format!("Failed to build wallet code: {}", e)),
        };

        let mut local_attempts = 0u64;
        let mut unreported = 0u64;

        while local_attempts < self.params.max_attempts {
            if self.cancel.load(Ordering::Relaxed) {
                return WorkerState::Terminated;
            }

            let keypair = match Ed25519Keypair::generate() {
                Ok(kp) => kp,
                Err(e) => return self.fail(e.to_string()),
            };
            let derived = match deriver.derive(&keypair.public_key_bytes()) {
                Ok(d) => d,
                Err(e) => return self.fail(format!("Address derivation failed: {}", e)),
            };

            local_attempts += 1;
            unreported += 1;

            if self.params.pattern.matches(&derived.friendly) {
                let nonce = self.params.start_nonce + local_attempts;
                let candidate =
                    FoundCandidate::new(&keypair, &derived, local_attempts, unreported, nonce);
                // The job may already be gone; either way this worker is done
                let _ = self.events.send(WorkerEvent::Found {
                    worker_id: id,
                    candidate: Box::new(candidate),
                });
                return WorkerState::Found;
            }

            if unreported == self.params.batch_size {
                if !self.report(unreported, false) {
                    return WorkerState::Terminated;
                }
                unreported = 0;
            }
        }

        debug!(worker = id, attempts = local_attempts, "attempt ceiling reached");
        self.report(unreported, true);
        WorkerState::Exhausted
    }

    fn report(&self, attempts: u64, exhausted: bool) -> bool {
        self.events
            .send(WorkerEvent::Progress {
                worker_id: self.params.id,
                attempts,
                exhausted,
            })
            .is_ok()
    }

    fn fail(&self, message: String) -> WorkerState {
        warn!(worker = self.params.id, "worker failed: {}", message);
        let _ = self.events.send(WorkerEvent::Error {
            worker_id: self.params.id,
            message,
        });
        WorkerState::Failed
    }
}

/// Start a worker on its own thread.
///
/// `done` is dropped when the thread exits, which is how the job observes
/// that all of its workers have finished.
pub fn spawn_worker(
    params: WorkerParams,
    events: Sender<WorkerEvent>,
    cancel: Arc<AtomicBool>,
    done: Sender<()>,
) -> io::Result<JoinHandle<()>> {
    let id = params.id;
    let worker = SearchWorker::new(params, events.clone(), cancel);
    spawn_guarded(id, events, done, move || {
        worker.run();
    })
}

/// Run `body` on a named worker thread, reporting a panic as an `Error` event
fn spawn_guarded<F>(
    id: usize,
    events: Sender<WorkerEvent>,
    done: Sender<()>,
    body: F,
) -> io::Result<JoinHandle<()>>
where
    F: FnOnce() + Send + 'static,
{
    thread::Builder::new()
        .name(format!("vanity-worker-{}", id))
        .spawn(move || {
            let _done = done;
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(body)) {
                let message = format!("Worker panicked: {}", panic_message(&*payload));
                warn!(worker = id, "{}", message);
                let _ = events.send(WorkerEvent::Error {
                    worker_id: id,
                    message,
                });
            }
        })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
