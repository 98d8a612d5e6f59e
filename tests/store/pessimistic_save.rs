//! Pessimistic saves: nothing is cached before acknowledgment, and the
//! server's record is what ends up cached

use crate::common::*;
use chrono::Duration as ChronoDuration;
use std::sync::Arc;
use std::time::Duration;

#[tokio::test(start_paused = true)]
async fn cache_waits_for_acknowledgment() {
    let (transport, mut script) = scripted();
    let store = store_with(transport);
    store.set_flight(london_paris(3, false));
    let edited = london_paris(3, true);

    let (result, ()) = tokio::join!(store.save_flight(edited.clone()), async {
        let call = script.next_call().await;
        assert_eq!(call.request, Request::Save(edited.clone()));

        assert!(!store.flight(FlightId::new(3)).unwrap().delayed);
        assert!(store.is_saving(FlightId::new(3)));
        assert_eq!(store.save_status().pending, 1);

        let server = Flight {
            to: "Paris CDG".to_string(),
            ..edited.clone()
        };
        call.respond_flight(server);
    });

    let saved = result.unwrap();
    assert_eq!(saved.to, "Paris CDG");
    assert_eq!(store.flight(FlightId::new(3)), Some(saved));
    assert!(!store.is_saving(FlightId::new(3)));

    let status = store.save_status();
    assert_eq!(status.pending, 0);
    assert_eq!(status.completed, 1);
}

#[tokio::test(start_paused = true)]
async fn failed_save_leaves_cache_unchanged() {
    let (transport, mut script) = scripted();
    let store = store_with(transport);
    store.set_flight(london_paris(3, false));
    let entities = store.versions().get(Slice::Entities);

    let (result, ()) = tokio::join!(store.save_flight(london_paris(3, true)), async {
        script
            .next_call()
            .await
            .fail(TransportError::Rejected("seat map locked".to_string()));
    });

    let err = result.unwrap_err();
    assert!(err.is_transport());
    assert_eq!(store.flight(FlightId::new(3)), Some(london_paris(3, false)));
    assert_eq!(store.versions().get(Slice::Entities), entities);

    let status = store.save_status();
    assert_eq!(status.failed, 1);
    assert!(status.last_error.unwrap().contains("seat map locked"));
}

#[tokio::test(start_paused = true)]
async fn newest_acknowledged_save_wins_when_acks_reorder() {
    let (transport, mut script) = scripted();
    let store = store_with(transport);
    let first = london_paris(3, true);
    let second = first.with_delay(ChronoDuration::minutes(15));

    let (r1, r2, ()) = tokio::join!(
        store.save_flight(first.clone()),
        store.save_flight(second.clone()),
        async {
            let c1 = script.next_call().await;
            let c2 = script.next_call().await;
            assert_eq!(c1.request, Request::Save(first.clone()));
            assert_eq!(c2.request, Request::Save(second.clone()));

            c2.respond_flight(second.clone());
            tokio::time::sleep(Duration::from_millis(10)).await;
            assert_eq!(store.flight(FlightId::new(3)), Some(second.clone()));

            c1.respond_flight(first.clone());
        }
    );

    assert_eq!(r1.unwrap(), first);
    assert_eq!(r2.unwrap(), second);
    assert_eq!(store.flight(FlightId::new(3)), Some(second));
    assert_eq!(store.save_status().completed, 2);
}

#[tokio::test(start_paused = true)]
async fn in_order_acks_overwrite() {
    let (transport, mut script) = scripted();
    let store = store_with(transport);
    let first = london_paris(3, true);
    let second = first.with_delay(ChronoDuration::minutes(15));

    let (r1, r2, ()) = tokio::join!(
        store.save_flight(first.clone()),
        store.save_flight(second.clone()),
        async {
            let c1 = script.next_call().await;
            let c2 = script.next_call().await;

            c1.respond_flight(first.clone());
            tokio::time::sleep(Duration::from_millis(10)).await;
            assert_eq!(store.flight(FlightId::new(3)), Some(first.clone()));

            c2.respond_flight(second.clone());
        }
    );

    assert!(r1.is_ok() && r2.is_ok());
    assert_eq!(store.flight(FlightId::new(3)), Some(second));
}

#[tokio::test(start_paused = true)]
async fn concurrent_new_records_are_all_cached() {
    let (transport, mut script) = scripted();
    let store = store_with(transport);
    let graz = flight(0, "Graz", "Hamburg", false);
    let oslo = flight(0, "Oslo", "Bergen", false);

    let (ra, rb, ()) = tokio::join!(
        store.save_flight(graz.clone()),
        store.save_flight(oslo.clone()),
        async {
            let ca = script.next_call().await;
            let cb = script.next_call().await;
            assert_eq!(ca.request, Request::Save(graz.clone()));
            assert_eq!(cb.request, Request::Save(oslo.clone()));

            cb.respond_flight(flight(43, "Oslo", "Bergen", false));
            tokio::time::sleep(Duration::from_millis(10)).await;
            ca.respond_flight(flight(42, "Graz", "Hamburg", false));
        }
    );

    assert_eq!(ra.unwrap().id, FlightId::new(42));
    assert_eq!(rb.unwrap().id, FlightId::new(43));
    assert_eq!(ids(&store.flights()), vec![43, 42]);
    assert_eq!(store.flight(FlightId::new(42)).unwrap().from, "Graz");
    assert!(store.flight(FlightId::UNSET).is_none());
    assert!(!store.is_saving(FlightId::UNSET));
}

#[tokio::test]
async fn new_record_gets_server_identity() {
    let transport = Arc::new(InMemoryTransport::with_flights(vec![london_paris(41, false)]));
    let store = store_with(transport.clone());

    let saved = store
        .save_flight(flight(0, "Graz ", "Hamburg", false))
        .await
        .unwrap();

    assert_eq!(saved.id, FlightId::new(42));
    assert_eq!(saved.from, "Graz");
    assert_eq!(store.flight(FlightId::new(42)), Some(saved.clone()));
    assert!(store.flight(FlightId::UNSET).is_none());
    assert_eq!(transport.stored(FlightId::new(42)), Some(saved));
}

#[tokio::test]
async fn delay_then_save_round_trip() {
    let transport = Arc::new(InMemoryTransport::with_flights(vec![london_paris(3, false)]));
    let store = store_with(transport.clone());
    store.load_flights(store.filter()).await.unwrap();

    let delayed = store
        .delay_flight(FlightId::new(3), ChronoDuration::minutes(5))
        .unwrap();
    let saved = store.save_flight(delayed.clone()).await.unwrap();

    assert_eq!(saved, delayed);
    assert_eq!(transport.stored(FlightId::new(3)), Some(delayed));
    assert_eq!(ids(&store.delayed_flights()), vec![3]);
}
