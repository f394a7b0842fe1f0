//! Client watchers running against a live service.

mod common;

use std::time::Duration;

use common::LiveService;
use serde_json::json;

use taxi_client::{
    ClientOptions, CustomerSession, PollTrigger, PublicDriver, TaxiClient, TripWatcher,
};
use taxi_core::{CustomerToken, TripRequest, TripRequestDraft, TripStatus};

/// Long enough that only a push can beat it inside a test.
const SLOW_POLL: Duration = Duration::from_secs(60);

fn draft() -> TripRequestDraft {
    TripRequestDraft {
        passenger_name: "Juan Perez".into(),
        pickup: "Av. Principal 123".into(),
        destination: "Centro".into(),
        ..TripRequestDraft::default()
    }
}

fn session(service: &LiveService, poll_interval: Duration) -> CustomerSession {
    let client = TaxiClient::with_options(
        &service.base_url,
        ClientOptions {
            poll_interval,
            ..ClientOptions::default()
        },
    )
    .unwrap();
    CustomerSession::new(client, CustomerToken::generate())
}

async fn wait_for_status(watcher: &mut TripWatcher, status: TripStatus) -> TripRequest {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if let Some(trip) = watcher.current().filter(|t| t.status == status) {
                return trip;
            }
            watcher.changed().await.expect("Watcher ended");
        }
    })
    .await
    .expect("Trip status not observed within 5s")
}

#[tokio::test]
async fn session_watcher_sees_completion_through_the_feed() {
    let service = LiveService::start().await;
    service.open_driver().await;
    let session = session(&service, SLOW_POLL);
    let trip = session.request_trip(&service.driver_id, &draft()).await.unwrap();

    let mut watcher = session.watch().await;
    wait_for_status(&mut watcher, TripStatus::Pending).await;

    service
        .transition(trip.id, json!({ "outcome": "completed", "price": "850.00" }))
        .await;

    let completed = wait_for_status(&mut watcher, TripStatus::Completed).await;
    assert_eq!(completed.id, trip.id);
    assert_eq!(completed.price_cents, Some(85_000));
}

#[tokio::test]
async fn polling_watcher_sees_cancellation() {
    let service = LiveService::start().await;
    service.open_driver().await;
    let session = session(&service, SLOW_POLL);
    let trip = session.request_trip(&service.driver_id, &draft()).await.unwrap();

    let mut watcher =
        TripWatcher::spawn(session.clone(), PollTrigger::new(Duration::from_millis(200)));
    wait_for_status(&mut watcher, TripStatus::Pending).await;

    service
        .transition(trip.id, json!({ "outcome": "cancelled" }))
        .await;

    let cancelled = wait_for_status(&mut watcher, TripStatus::Cancelled).await;
    assert_eq!(cancelled.id, trip.id);
    assert_eq!(cancelled.price_cents, None);
}

#[tokio::test]
async fn driver_listing_watcher_follows_availability() {
    let service = LiveService::start().await;
    service.open_driver().await;
    let client = TaxiClient::with_options(
        &service.base_url,
        ClientOptions {
            poll_interval: SLOW_POLL,
            ..ClientOptions::default()
        },
    )
    .unwrap();

    let mut watcher = client.watch_drivers(None).await;
    let is_open = |drivers: &[PublicDriver]| {
        drivers
            .iter()
            .any(|d| d.owner_id == service.driver_id && d.available)
    };

    tokio::time::timeout(Duration::from_secs(5), async {
        while !is_open(watcher.current().as_slice()) {
            watcher.changed().await.expect("Watcher ended");
        }
    })
    .await
    .expect("Open driver not listed");

    service.set_availability(false).await;

    tokio::time::timeout(Duration::from_secs(5), async {
        while is_open(watcher.current().as_slice()) {
            watcher.changed().await.expect("Watcher ended");
        }
    })
    .await
    .expect("Closed driver still listed as open");
}
