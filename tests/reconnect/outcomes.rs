//! Every outcome releases the connecting flag.

use crate::support::{
    accepting, answering, down_probe, failing, full_probe, open_probe, silent_probe, Fixture,
    Probe,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use waitroom_core::{Client, ConnectResult, ConnectStatus, MessageKey, ParamValue};
use waitroom_queue::IssueKind;
use waitroom_reconnect::{AttemptOutcome, ReconnectConfig, ReconnectProtocol, SkipReason};

async fn attempt(
    fixture: &Fixture,
    probe: Probe,
    connector: crate::support::Connector,
    id: waitroom_core::ClientId,
) -> AttemptOutcome {
    let protocol = ReconnectProtocol::new(
        fixture.area.clone(),
        probe,
        connector,
        ReconnectConfig::default(),
    );
    let outcome = protocol.reconnect(id).await.unwrap();
    assert!(
        !fixture.area.states().is_connecting(id),
        "connecting flag left set after {outcome:?}"
    );
    outcome
}

#[tokio::test]
async fn success_leaves_the_queue() {
    let fixture = Fixture::new();
    let p1 = fixture.arrive("p1", &[], "surv");
    let p2 = fixture.arrive("p2", &[], "surv");

    let outcome = attempt(&fixture, open_probe, accepting(), p1.id()).await;

    assert_eq!(outcome, AttemptOutcome::Success);
    assert_eq!(fixture.area.queue_position(p1.id()), None);
    assert_eq!(fixture.area.queue_position(p2.id()), Some(1));
    assert_eq!(fixture.area.next_candidate("surv"), Some(p2.id()));
}

#[tokio::test]
async fn already_connected_counts_as_success() {
    let fixture = Fixture::new();
    let p1 = fixture.arrive("p1", &[], "surv");

    let outcome = attempt(
        &fixture,
        open_probe,
        answering(
            ConnectResult::with_status(ConnectStatus::AlreadyConnected),
            Arc::new(AtomicUsize::new(0)),
        ),
        p1.id(),
    )
    .await;
    assert_eq!(outcome, AttemptOutcome::Success);
}

#[tokio::test]
async fn unavailable_destinations_are_skipped_silently() {
    let fixture = Fixture::new();
    let p1 = fixture.arrive("p1", &[], "surv");
    fixture.inbox.clear();

    let calls = Arc::new(AtomicUsize::new(0));
    let cases: [(Probe, SkipReason); 3] = [
        (down_probe, SkipReason::Unreachable),
        (silent_probe, SkipReason::NoData),
        (full_probe, SkipReason::Full),
    ];
    for (probe, reason) in cases {
        let connector = answering(ConnectResult::success(), calls.clone());
        let outcome = attempt(&fixture, probe, connector, p1.id()).await;
        assert_eq!(outcome, AttemptOutcome::TransientSkip(reason));
    }

    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert!(fixture.inbox.all().is_empty());
    assert_eq!(fixture.area.queue_position(p1.id()), Some(1));
}

#[tokio::test]
async fn maintenance_without_bypass_is_skipped() {
    let fixture = Fixture::new();
    let p1 = fixture.arrive("p1", &[], "surv");
    fixture.maintenance.close("surv");

    let calls = Arc::new(AtomicUsize::new(0));
    let outcome = attempt(
        &fixture,
        open_probe,
        answering(ConnectResult::success(), calls.clone()),
        p1.id(),
    )
    .await;

    assert_eq!(outcome, AttemptOutcome::TransientSkip(SkipReason::Maintenance));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn maintenance_bypass_credentials() {
    let fixture = Fixture::new();
    fixture.maintenance.close("surv");
    let admin = fixture.arrive("admin", &["maintenance.admin"], "surv");
    let scoped = fixture.arrive("scoped", &["maintenance.singleserver.bypass.surv"], "surv");
    let listed = fixture.arrive("listed", &[], "surv");
    fixture.maintenance.allow(listed.id());

    for client in [&admin, &scoped, &listed] {
        let outcome = attempt(&fixture, open_probe, accepting(), client.id()).await;
        assert_eq!(outcome, AttemptOutcome::Success);
    }
}

#[tokio::test]
async fn in_progress_is_benign() {
    let fixture = Fixture::new();
    let p1 = fixture.arrive("p1", &[], "surv");
    fixture.inbox.clear();

    let outcome = attempt(
        &fixture,
        open_probe,
        answering(
            ConnectResult::with_status(ConnectStatus::InProgress),
            Arc::new(AtomicUsize::new(0)),
        ),
        p1.id(),
    )
    .await;

    assert_eq!(outcome, AttemptOutcome::TransientSkip(SkipReason::InProgress));
    assert!(fixture.inbox.all().is_empty());
    assert_eq!(fixture.area.queue_position(p1.id()), Some(1));
}

#[tokio::test]
async fn hard_error_keeps_the_client_queued() {
    let fixture = Fixture::new();
    let p1 = fixture.arrive("p1", &[], "surv");
    fixture.inbox.clear();

    let outcome = attempt(
        &fixture,
        open_probe,
        answering(
            ConnectResult::denied("Server is restarting"),
            Arc::new(AtomicUsize::new(0)),
        ),
        p1.id(),
    )
    .await;

    assert_eq!(
        outcome,
        AttemptOutcome::HardError("Server is restarting".to_string())
    );
    let sent = fixture.inbox.for_client(p1.id());
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].key(), MessageKey::ConnectFailed);
    assert_eq!(
        sent[0].param("reason"),
        Some(&ParamValue::Text("Server is restarting".to_string()))
    );
    assert_eq!(fixture.area.queue_position(p1.id()), Some(1));
    assert_eq!(fixture.area.states().issue(p1.id()), None);
}

#[tokio::test]
async fn transport_error_text_is_the_reason() {
    let fixture = Fixture::new();
    let p1 = fixture.arrive("p1", &[], "surv");

    let outcome = attempt(&fixture, open_probe, failing("connection reset"), p1.id()).await;
    assert_eq!(
        outcome,
        AttemptOutcome::HardError("connection reset".to_string())
    );
}

#[tokio::test]
async fn success_clears_a_previous_issue() {
    let fixture = Fixture::new();
    let p1 = fixture.arrive("p1", &[], "surv");
    fixture.area.states().mark_issue(p1.id(), IssueKind::NotWhitelisted);

    attempt(&fixture, open_probe, accepting(), p1.id()).await;
    assert_eq!(fixture.area.states().issue(p1.id()), None);
}
