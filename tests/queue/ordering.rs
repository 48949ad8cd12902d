//! Tier priority and FIFO order within a tier.

use crate::support::Fixture;
use waitroom_core::Client;
use waitroom_queue::{Placement, Tier};

/// Drains a destination the way successful attempts do.
fn drain(fixture: &Fixture, destination: &str) -> Vec<String> {
    let mut order = Vec::new();
    while let Some(id) = fixture.area.next_candidate(destination) {
        let client = fixture.area.directory().resolve(id).unwrap();
        order.push(client.display_name().to_string());
        fixture.area.remove_from_queues(id);
    }
    order
}

#[test]
fn tiers_are_served_bypass_first() {
    let fixture = Fixture::new();
    fixture.arrive("p1", &[], "surv");
    fixture.arrive("p2", &["queue.priority"], "surv");
    fixture.arrive("p3", &["queue.bypass"], "surv");

    assert_eq!(drain(&fixture, "surv"), ["p3", "p2", "p1"]);
}

#[test]
fn fifo_within_a_tier() {
    let fixture = Fixture::new();
    for name in ["a", "b", "c", "d"] {
        fixture.arrive(name, &[], "surv");
    }

    assert_eq!(drain(&fixture, "surv"), ["a", "b", "c", "d"]);
}

#[test]
fn destination_scoped_permissions() {
    let fixture = Fixture::new();
    let scoped = fixture.arrive("scoped", &["queue.priority.surv"], "Surv");
    let elsewhere = fixture.arrive("elsewhere", &["queue.priority.creative"], "Surv");

    let queue = fixture.area.queue("Surv").unwrap();
    assert_eq!(queue.tier_of(scoped.id()), Some(Tier::Priority));
    assert_eq!(queue.tier_of(elsewhere.id()), Some(Tier::Normal));
}

#[test]
fn bypass_tier_blocks_lower_tiers() {
    let fixture = Fixture::new();
    fixture.arrive("normal", &[], "surv");
    let vip = fixture.arrive("vip", &["queue.bypass"], "surv");
    fixture.arrive("priority", &["queue.priority"], "surv");

    // selection is non-destructive: the same bypass client stays at the head
    for _ in 0..3 {
        assert_eq!(fixture.area.next_candidate("surv"), Some(vip.id()));
    }
}

#[test]
fn placing_twice_is_idempotent() {
    let fixture = Fixture::new();
    let client = fixture.arrive("p1", &[], "surv");

    assert_eq!(
        fixture.area.place(&*client, "surv"),
        Placement::AlreadyRegistered
    );
    assert_eq!(
        fixture.area.place(&*client, "creative"),
        Placement::AlreadyRegistered
    );
    assert_eq!(fixture.area.queued_client_count(), 1);
    assert_eq!(fixture.area.destination(client.id()).as_deref(), Some("surv"));
}

#[test]
fn each_destination_has_its_own_queue() {
    let fixture = Fixture::new();
    let a = fixture.arrive("a", &[], "alpha");
    let b = fixture.arrive("b", &[], "beta");

    assert_eq!(fixture.area.next_candidate("alpha"), Some(a.id()));
    assert_eq!(fixture.area.next_candidate("beta"), Some(b.id()));
    assert_eq!(fixture.area.next_candidate("gamma"), None);
    assert_eq!(fixture.area.destinations(), ["alpha", "beta"]);
}
