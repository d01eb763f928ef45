use std::time::Duration;

use crossbeam_channel::Receiver;
use tonvanity_core::{
    derive_address, EngineConfig, EngineError, JobManager, MatchKind, SearchRequest, SearchStatus,
    SessionEvent, SessionId, StopReason, WalletTemplate,
};
use tonvanity_crypto::Ed25519Keypair;
use tonvanity_pattern::matches;

const TIMEOUT: Duration = Duration::from_secs(300);

fn manager(config: EngineConfig) -> JobManager {
    JobManager::new(config).unwrap()
}

// The character after the EQ tag is always one of A-D
fn impossible() -> SearchRequest {
    SearchRequest::new("fff", MatchKind::Prefix, false, WalletTemplate::V4R2)
}

fn next_progress(events: &Receiver<SessionEvent>) -> u64 {
    loop {
        match events.recv_timeout(TIMEOUT).unwrap() {
            SessionEvent::Progress(snapshot) => return snapshot.attempts,
            SessionEvent::Error { message } => panic!("worker error: {}", message),
            _ => {}
        }
    }
}

#[test]
fn test_invalid_patterns_start_nothing() {
    let manager = manager(EngineConfig::default());
    let session = SessionId::from("invalid");
    let _events = manager.connect(session.clone());

    for pattern in ["AB", "ghij", "abcdef0"] {
        let request = SearchRequest::new(pattern, MatchKind::Prefix, false, WalletTemplate::V4R2);
        assert!(matches!(
            manager.start(&session, request),
            Err(EngineError::Validation(_))
        ));
    }
    assert_eq!(manager.active_jobs(), 0);
}

#[test]
fn test_stop_confirms_and_silences() {
    let manager = manager(EngineConfig::default());
    let session = SessionId::from("stop");
    let events = manager.connect(session.clone());

    manager.start(&session, impossible()).unwrap();
    assert_eq!(manager.active_jobs(), 1);
    manager.stop_generation(&session);
    assert_eq!(manager.active_jobs(), 0);

    let mut saw_stopped = false;
    while let Ok(event) = events.try_recv() {
        match event {
            SessionEvent::Stopped { reason } => {
                assert_eq!(reason, StopReason::Requested);
                saw_stopped = true;
            }
            SessionEvent::Progress(_) => assert!(!saw_stopped, "progress after stop"),
            other => panic!("unexpected event {:?}", other),
        }
    }
    assert!(saw_stopped);
    assert!(events.recv_timeout(Duration::from_millis(300)).is_err());
}

#[test]
fn test_finds_prefix_match() {
    let manager = manager(EngineConfig::default());
    let session = SessionId::from("find");
    let events = manager.connect(session.clone());

    let request = SearchRequest::new("ABC", MatchKind::Prefix, false, WalletTemplate::V4R2);
    manager.start(&session, request).unwrap();

    let result = loop {
        match events.recv_timeout(TIMEOUT).unwrap() {
            SessionEvent::Found(result) => break result,
            SessionEvent::Progress(snapshot) => assert_eq!(snapshot.status, SearchStatus::Running),
            other => panic!("unexpected event {:?}", other),
        }
    };

    assert!(matches(&result.address, "ABC", MatchKind::Prefix, false));
    assert_eq!(result.pattern, "ABC");
    assert_eq!(result.template, WalletTemplate::V4R2);
    assert!(result.attempts >= 1);
    assert_eq!(result.secret_key.len(), 128);

    let secret = tonvanity_crypto::hex::decode(&result.secret_key).unwrap();
    let keypair = Ed25519Keypair::from_secret_bytes(&secret).unwrap();
    assert_eq!(tonvanity_crypto::hex::encode(keypair.public_key_bytes()), result.public_key);
    let derived = derive_address(&keypair.public_key_bytes(), WalletTemplate::V4R2).unwrap();
    assert_eq!(derived.friendly, result.address);
    assert_eq!(derived.state_init_boc(), result.state_init);

    // The job releases its slot on its own
    let deadline = std::time::Instant::now() + Duration::from_secs(10);
    while manager.active_jobs() > 0 && std::time::Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(10));
    }
    assert_eq!(manager.active_jobs(), 0);
    assert!(!matches!(
        events.recv_timeout(Duration::from_millis(300)),
        Ok(SessionEvent::Found(_))
    ));
}

#[test]
fn test_restart_resets_attempts() {
    let manager = manager(EngineConfig::default());
    let session = SessionId::from("restart");
    let events = manager.connect(session.clone());

    manager.start(&session, impossible()).unwrap();
    while next_progress(&events) < 8000 {}

    manager.start(&session, impossible()).unwrap();
    assert_eq!(manager.active_jobs(), 1);

    // Leftovers of the first job are all above 8000
    let mut attempts = next_progress(&events);
    while attempts > 1000 {
        attempts = next_progress(&events);
    }
    assert_eq!(attempts, 1000);
    for expected in [2000, 3000, 4000] {
        assert_eq!(next_progress(&events), expected);
    }

    manager.stop_generation(&session);
    assert_eq!(manager.active_jobs(), 0);
}

#[test]
fn test_exhausted_job_stops_itself() {
    let config = EngineConfig {
        num_workers: 2,
        batch_size: 1000,
        max_attempts_per_worker: 2000,
        ..EngineConfig::default()
    };
    let manager = manager(config);
    let session = SessionId::from("exhaust");
    let events = manager.connect(session.clone());

    manager.start(&session, impossible()).unwrap();

    let mut last = None;
    let reason = loop {
        match events.recv_timeout(TIMEOUT).unwrap() {
            SessionEvent::Progress(snapshot) => last = Some(snapshot),
            SessionEvent::Stopped { reason } => break reason,
            other => panic!("unexpected event {:?}", other),
        }
    };

    assert_eq!(reason, StopReason::Exhausted);
    let last = last.unwrap();
    assert_eq!(last.attempts, 4000);
    assert_eq!(last.status, SearchStatus::Stopped);
    assert_eq!(manager.active_jobs(), 0);
}

#[test]
fn test_disconnect_stops_job() {
    let manager = manager(EngineConfig::default());
    let session = SessionId::from("gone");
    let events = manager.connect(session.clone());

    manager.start(&session, impossible()).unwrap();
    manager.disconnect(&session);
    assert_eq!(manager.active_jobs(), 0);

    assert!(matches!(
        manager.start(&session, impossible()),
        Err(EngineError::UnknownSession(_))
    ));
    drop(events);
}

#[test]
fn test_sessions_run_independently() {
    let manager = manager(EngineConfig {
        num_workers: 1,
        ..EngineConfig::default()
    });
    let a = SessionId::from("a");
    let b = SessionId::from("b");
    let events_a = manager.connect(a.clone());
    let _events_b = manager.connect(b.clone());

    manager.start(&a, impossible()).unwrap();
    manager.start(&b, impossible()).unwrap();
    assert_eq!(manager.active_jobs(), 2);

    manager.stop_generation(&b);
    assert_eq!(manager.active_jobs(), 1);
    assert!(manager.registry().contains(&a));
    assert!(next_progress(&events_a) > 0);

    manager.stop_generation(&a);
    assert_eq!(manager.active_jobs(), 0);
}

#[test]
fn test_rejected_restart_keeps_running_job() {
    let manager = manager(EngineConfig::default());
    let session = SessionId::from("keep");
    let events = manager.connect(session.clone());

    manager.start(&session, impossible()).unwrap();
    let before = next_progress(&events);

    let bad = SearchRequest::new("AB", MatchKind::Prefix, false, WalletTemplate::V4R2);
    assert!(matches!(
        manager.start(&session, bad),
        Err(EngineError::Validation(_))
    ));
    assert_eq!(manager.active_jobs(), 1);

    // Same job, so the total keeps growing
    assert!(next_progress(&events) > before);
    while let Ok(event) = events.try_recv() {
        assert!(!matches!(event, SessionEvent::Stopped { .. }));
    }

    manager.stop_generation(&session);
    assert_eq!(manager.active_jobs(), 0);
}

#[test]
fn test_stop_confirmed_before_next_job() {
    let manager = manager(EngineConfig::default());
    let session = SessionId::from("confirm");
    let events = manager.connect(session.clone());

    manager.start(&session, impossible()).unwrap();
    next_progress(&events);
    manager.stop_generation(&session);
    manager.start(&session, impossible()).unwrap();

    // Everything up to Stopped belongs to the first job
    loop {
        match events.recv_timeout(TIMEOUT).unwrap() {
            SessionEvent::Stopped { reason } => {
                assert_eq!(reason, StopReason::Requested);
                break;
            }
            SessionEvent::Progress(_) => {}
            other => panic!("unexpected event {:?}", other),
        }
    }
    assert_eq!(next_progress(&events), 1000);

    manager.stop_generation(&session);
}

#[test]
fn test_concurrent_stop_and_start_keep_order() {
    let manager = std::sync::Arc::new(manager(EngineConfig {
        num_workers: 1,
        ..EngineConfig::default()
    }));
    let session = SessionId::from("race");
    let events = manager.connect(session.clone());

    for _ in 0..5 {
        manager.start(&session, impossible()).unwrap();
        let stopper = {
            let manager = manager.clone();
            let session = session.clone();
            std::thread::spawn(move || manager.stop_generation(&session))
        };
        manager.start(&session, impossible()).unwrap();
        stopper.join().unwrap();

        if manager.active_jobs() == 1 {
            // The restart won: its first report comes after the confirmation
            let mut stopped = false;
            loop {
                match events.recv_timeout(TIMEOUT).unwrap() {
                    SessionEvent::Stopped { .. } => stopped = true,
                    SessionEvent::Progress(p) if stopped && p.attempts == 1000 => break,
                    SessionEvent::Progress(_) => {}
                    other => panic!("unexpected event {:?}", other),
                }
            }
        }
        manager.stop_generation(&session);
        while events.try_recv().is_ok() {}
    }
}
