//! Dispatch stress tests

use crate::support::{accepting, open_probe, Fixture, Probe};
use futures::future::join_all;
use std::time::Instant;
use waitroom_dispatch::{DispatchConfig, Dispatcher};
use waitroom_reconnect::{ReconnectConfig, ReconnectProtocol};

/// Test: 100 destinations drained tick by tick, one attempt per destination per tick
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore]
async fn stress_drain_many_destinations() {
    super::init_tracing();
    let fixture = Fixture::new();
    for i in 0..5_000 {
        fixture.arrive(&format!("p{i}"), &[], &format!("dest-{}", i % 100));
    }

    let protocol = ReconnectProtocol::new(
        fixture.area.clone(),
        open_probe as Probe,
        accepting(),
        ReconnectConfig::default(),
    );
    let dispatcher = Dispatcher::new(protocol, DispatchConfig::default());

    let start = Instant::now();
    let mut ticks = 0;
    let mut moved = 0;
    while fixture.area.queued_client_count() > 0 {
        let started = dispatcher.tick();
        assert!(started.len() <= 100);
        moved += started.len();

        let handles = started.into_iter().map(|d| d.handle);
        for outcome in join_all(handles).await {
            assert!(outcome.unwrap().is_success());
        }
        ticks += 1;
    }
    println!("moved {moved} clients in {ticks} ticks, {:?}", start.elapsed());

    assert_eq!(moved, 5_000);
    assert_eq!(ticks, 50);
}
