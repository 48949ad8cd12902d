//! Event listeners see every attempt.

use crate::support::{answering, full_probe, open_probe, Fixture};
use parking_lot::Mutex;
use std::sync::atomic::AtomicUsize;
use std::sync::Arc;
use waitroom_core::{Client, ConnectResult, WaitroomEvent};
use waitroom_queue::IssueKind;
use waitroom_reconnect::{ReconnectConfig, ReconnectProtocol, SkipReason};

#[tokio::test]
async fn outcome_callbacks() {
    let fixture = Fixture::new();
    let p1 = fixture.arrive("p1", &[], "surv");
    let p2 = fixture.arrive("p2", &[], "surv");

    let log = Arc::new(Mutex::new(Vec::new()));
    let config = |log: &Arc<Mutex<Vec<String>>>| {
        let (l1, l2, l3, l4) = (log.clone(), log.clone(), log.clone(), log.clone());
        ReconnectConfig::builder()
            .name("lobby")
            .on_attempt_started(move |_, destination| {
                l1.lock().push(format!("started {destination}"))
            })
            .on_success(move |_, destination| l2.lock().push(format!("success {destination}")))
            .on_skipped(move |_, reason| l3.lock().push(format!("skipped {reason}")))
            .on_soft_issue(move |_, issue: IssueKind| l4.lock().push(format!("issue {issue}")))
            .build()
            .unwrap()
    };

    let protocol = ReconnectProtocol::new(
        fixture.area.clone(),
        full_probe,
        answering(ConnectResult::success(), Arc::new(AtomicUsize::new(0))),
        config(&log),
    );
    protocol.reconnect(p1.id()).await.unwrap();

    let protocol = ReconnectProtocol::new(
        fixture.area.clone(),
        open_probe,
        answering(ConnectResult::success(), Arc::new(AtomicUsize::new(0))),
        config(&log),
    );
    protocol.reconnect(p1.id()).await.unwrap();

    let protocol = ReconnectProtocol::new(
        fixture.area.clone(),
        open_probe,
        answering(
            ConnectResult::denied("banned"),
            Arc::new(AtomicUsize::new(0)),
        ),
        config(&log),
    );
    protocol.reconnect(p2.id()).await.unwrap();

    assert_eq!(
        *log.lock(),
        [
            "started surv".to_string(),
            format!("skipped {}", SkipReason::Full),
            "started surv".to_string(),
            "success surv".to_string(),
            "started surv".to_string(),
            "issue banned".to_string(),
        ]
    );
}

#[tokio::test]
async fn panicking_listener_does_not_break_the_attempt() {
    let fixture = Fixture::new();
    let p1 = fixture.arrive("p1", &[], "surv");

    let config = ReconnectConfig::builder()
        .on_attempt_started(|_, _| panic!("listener failure"))
        .build()
        .unwrap();
    let protocol = ReconnectProtocol::new(
        fixture.area.clone(),
        open_probe,
        answering(ConnectResult::success(), Arc::new(AtomicUsize::new(0))),
        config,
    );

    assert!(protocol.reconnect(p1.id()).await.unwrap().is_success());
    assert!(!fixture.area.states().is_connecting(p1.id()));
}

#[tokio::test]
async fn destination_listener_ignores_other_destinations() {
    let fixture = Fixture::new();
    let p1 = fixture.arrive("p1", &[], "surv");
    let p2 = fixture.arrive("p2", &[], "creative");

    let seen = Arc::new(Mutex::new(Vec::new()));
    let s = Arc::clone(&seen);
    let config = ReconnectConfig::builder()
        .on_destination_event("surv", move |event| {
            s.lock().push(event.event_type());
        })
        .build()
        .unwrap();

    let protocol = ReconnectProtocol::new(
        fixture.area.clone(),
        open_probe,
        answering(ConnectResult::success(), Arc::new(AtomicUsize::new(0))),
        config,
    );
    protocol.reconnect(p2.id()).await.unwrap();
    protocol.reconnect(p1.id()).await.unwrap();

    assert_eq!(*seen.lock(), vec!["AttemptStarted", "Succeeded"]);
}
