//! Periodic status messages.

use crate::support::Fixture;
use std::time::Duration;
use waitroom_core::{Client, MessageKey, ParamValue};
use waitroom_dispatch::{DispatchConfig, QueueNotifier};
use waitroom_queue::IssueKind;

#[test]
fn waiting_clients_hear_their_position() {
    let fixture = Fixture::new();
    let a = fixture.arrive("a", &[], "surv");
    let b = fixture.arrive("b", &["queue.priority"], "surv");
    fixture.inbox.clear();

    let notifier = QueueNotifier::new(fixture.area.clone(), DispatchConfig::default());
    assert_eq!(notifier.notify_once(), 2);

    let to_a = fixture.inbox.for_client(a.id());
    assert_eq!(to_a[0].key(), MessageKey::QueuePosition);
    assert_eq!(to_a[0].param("position"), Some(&ParamValue::Int(2)));
    let to_b = fixture.inbox.for_client(b.id());
    assert_eq!(to_b[0].param("position"), Some(&ParamValue::Int(1)));
}

#[test]
fn issues_win_over_maintenance_and_positions() {
    let fixture = Fixture::new();
    let flagged = fixture.arrive("flagged", &[], "surv");
    fixture.maintenance.close("surv");
    fixture.area.states().mark_issue(flagged.id(), IssueKind::Banned);
    fixture.inbox.clear();

    let quiet = QueueNotifier::new(fixture.area.clone(), DispatchConfig::default());
    assert_eq!(quiet.notify_once(), 0);

    let config = DispatchConfig::builder().remind_issues(true).build().unwrap();
    let reminding = QueueNotifier::new(fixture.area.clone(), config);
    assert_eq!(reminding.notify_once(), 1);
    assert_eq!(fixture.inbox.count(flagged.id(), MessageKey::IssueBanned), 1);
    assert_eq!(
        fixture.inbox.count(flagged.id(), MessageKey::MaintenanceActive),
        0
    );
}

#[test]
fn maintenance_wins_over_positions() {
    let fixture = Fixture::new();
    let a = fixture.arrive("a", &[], "surv");
    let b = fixture.arrive("b", &[], "creative");
    fixture.maintenance.close("surv");
    fixture.inbox.clear();

    QueueNotifier::new(fixture.area.clone(), DispatchConfig::default()).notify_once();

    assert_eq!(fixture.inbox.count(a.id(), MessageKey::MaintenanceActive), 1);
    assert_eq!(fixture.inbox.count(a.id(), MessageKey::QueuePosition), 0);
    assert_eq!(fixture.inbox.count(b.id(), MessageKey::QueuePosition), 1);
}

#[test]
fn direct_mode_only_reports_maintenance() {
    let fixture = Fixture::direct();
    let a = fixture.arrive("a", &[], "surv");
    let b = fixture.arrive("b", &[], "closed");
    fixture.maintenance.close("closed");

    QueueNotifier::new(fixture.area.clone(), DispatchConfig::default()).notify_once();

    assert!(fixture.inbox.for_client(a.id()).is_empty());
    assert_eq!(fixture.inbox.count(b.id(), MessageKey::MaintenanceActive), 1);
}

#[tokio::test(start_paused = true)]
async fn background_rounds_follow_the_interval() {
    let fixture = Fixture::new();
    let a = fixture.arrive("a", &[], "surv");
    fixture.inbox.clear();

    let config = DispatchConfig::builder()
        .notify_interval(Duration::from_secs(10))
        .build()
        .unwrap();
    let notifier = QueueNotifier::new(fixture.area.clone(), config);
    notifier.start().await;
    assert!(notifier.is_running().await);

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(fixture.inbox.count(a.id(), MessageKey::QueuePosition), 0);

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(fixture.inbox.count(a.id(), MessageKey::QueuePosition), 3);

    notifier.stop().await;
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(fixture.inbox.count(a.id(), MessageKey::QueuePosition), 3);
}
