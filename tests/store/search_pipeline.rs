//! Search stream: gate, debounce, duplicate suppression, supersession

use crate::common::*;
use std::time::Duration;

const KEYSTROKE: Duration = Duration::from_millis(100);

#[tokio::test(start_paused = true)]
async fn typing_burst_issues_one_request_for_last_input() {
    let (transport, mut script) = scripted();
    let store = store_with(transport);

    for text in ["Lo", "Lon", "Lond", "Londo", "London"] {
        store.search_text(text);
        tokio::time::sleep(KEYSTROKE).await;
    }

    let call = script.expect_find("London", "Paris").await;
    assert!(script.try_next().is_none());
    assert_eq!(store.search_status().generation, 1);

    call.respond_flights(vec![london_paris(3, false), london_paris(5, true)]);
    store.idle().await;

    assert_eq!(ids(&store.flights()), vec![3, 5]);
    let status = store.search_status();
    assert_eq!(status.phase, SearchPhase::Idle);
    assert_eq!(status.last_hits, 2);
    assert!(!status.loading);
}

#[tokio::test(start_paused = true)]
async fn short_input_never_starts_a_request() {
    let (transport, mut script) = scripted();
    let store = store_with(transport);

    assert!(!store.search_text("Lo"));
    script.assert_quiet_for(Duration::from_secs(2)).await;

    let status = store.search_status();
    assert!(!status.pending);
    assert_eq!(status.phase, SearchPhase::Idle);
    assert_eq!(status.generation, 0);
}

#[tokio::test(start_paused = true)]
async fn rejected_input_does_not_restart_the_window() {
    let (transport, mut script) = scripted();
    let store = store_with(transport);

    store.search_text("Lon");
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(!store.search_text("Lo"));
    tokio::time::sleep(Duration::from_millis(150)).await;

    let call = script.try_next().expect("request due 300ms after the accepted input");
    assert_eq!(call.query(), Some(("Lon", "Paris")));
}

#[tokio::test(start_paused = true)]
async fn debounce_window_is_configurable() {
    let (transport, mut script) = scripted();
    let config = StoreConfig {
        debounce_ms: 50,
        ..StoreConfig::default()
    };
    let store = BookingStore::new(transport, config).unwrap();

    store.search_text("Graz");
    tokio::time::sleep(Duration::from_millis(60)).await;
    assert!(script.try_next().is_some());
}

#[tokio::test(start_paused = true)]
async fn duplicate_input_is_suppressed() {
    let (transport, mut script) = scripted();
    let store = store_with(transport);
    let filter = FlightFilter::new("Graz", "Hamburg", false);

    store.search(filter.clone());
    script
        .expect_find("Graz", "Hamburg")
        .await
        .respond_flights(vec![flight(8, "Graz", "Hamburg", false)]);
    store.idle().await;

    assert!(store.search(filter));
    script.assert_quiet_for(Duration::from_secs(1)).await;
    let status = store.search_status();
    assert_eq!(status.generation, 1);
    assert!(!status.pending);
}

#[tokio::test(start_paused = true)]
async fn stale_result_is_discarded() {
    let (transport, mut script) = scripted();
    let store = store_with(transport);

    store.search(FlightFilter::new("London", "Paris", false));
    let first = script.expect_find("London", "Paris").await;

    store.search(FlightFilter::new("Graz", "Hamburg", false));
    let second = script.expect_find("Graz", "Hamburg").await;
    assert_eq!(store.search_status().generation, 2);

    // The superseded request resolving does not end the loading state
    first.respond_flights(vec![london_paris(3, false)]);
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(store.search_status().loading);
    assert!(store.flights().is_empty());

    second.respond_flights(vec![flight(8, "Graz", "Hamburg", false)]);
    store.idle().await;
    assert_eq!(ids(&store.flights()), vec![8]);
}

#[tokio::test(start_paused = true)]
async fn stale_result_arriving_last_is_discarded() {
    let (transport, mut script) = scripted();
    let store = store_with(transport);

    store.search(FlightFilter::new("London", "Paris", false));
    let first = script.expect_find("London", "Paris").await;
    store.search(FlightFilter::new("Graz", "Hamburg", false));
    let second = script.expect_find("Graz", "Hamburg").await;

    second.respond_flights(vec![flight(8, "Graz", "Hamburg", false)]);
    store.idle().await;
    first.respond_flights(vec![london_paris(3, false)]);
    tokio::time::sleep(Duration::from_millis(10)).await;

    assert_eq!(ids(&store.flights()), vec![8]);
    assert_eq!(
        store.search_status().last_query,
        Some(FlightFilter::new("Graz", "Hamburg", false))
    );
}

#[tokio::test(start_paused = true)]
async fn failure_applies_empty_result() {
    let (transport, mut script) = scripted();
    let store = store_with(transport);
    store.set_flights(vec![london_paris(3, false)]);

    store.search_text("Graz");
    script
        .expect_find("Graz", "Paris")
        .await
        .fail(TransportError::Unavailable("timeout".to_string()));
    store.idle().await;

    let status = store.search_status();
    assert_eq!(status.phase, SearchPhase::Failed);
    assert_eq!(status.last_hits, 0);
    assert!(!status.loading);
    assert!(status.last_error.unwrap().contains("timeout"));
    assert_eq!(ids(&store.flights()), vec![3]);

    // The stream keeps working after a failure
    store.search_text("Hamburg");
    script
        .expect_find("Hamburg", "Paris")
        .await
        .respond_flights(vec![flight(11, "Hamburg", "Paris", false)]);
    store.idle().await;

    let status = store.search_status();
    assert_eq!(status.phase, SearchPhase::Idle);
    assert!(status.last_error.is_none());
    assert_eq!(ids(&store.flights()), vec![3, 11]);
}

#[tokio::test(start_paused = true)]
async fn status_tracks_debounce_and_flight() {
    let (transport, mut script) = scripted();
    let store = store_with(transport);

    store.search_text("London");
    let status = store.search_status();
    assert!(status.pending);
    assert_eq!(status.phase, SearchPhase::Debouncing);

    let call = script.expect_find("London", "Paris").await;
    let status = store.search_status();
    assert!(!status.pending);
    assert!(status.loading);
    assert_eq!(status.phase, SearchPhase::InFlight);
    assert_eq!(status.last_query, Some(FlightFilter::new("London", "Paris", false)));

    call.respond_flights(Vec::new());
    store.idle().await;
    assert!(!store.search_status().loading);
}

#[tokio::test(start_paused = true)]
async fn set_filter_feeds_the_stream() {
    let (transport, mut script) = scripted();
    let store = store_with(transport);

    assert!(store.set_filter(FlightFilter::new("Graz", "Hamburg", true)));
    let call = script.next_call().await;
    assert_eq!(
        call.request,
        Request::Find {
            from: "Graz".to_string(),
            to: "Hamburg".to_string(),
            urgent: true,
        }
    );
    call.respond_flights(Vec::new());
    store.idle().await;

    // Unchanged filter: no search
    assert!(!store.set_filter(FlightFilter::new("Graz", "Hamburg", true)));
    script.assert_quiet_for(Duration::from_secs(1)).await;
    assert_eq!(*store.route_description(), "From Graz to Hamburg.");
}

#[tokio::test(start_paused = true)]
async fn required_destination_gate() {
    let (transport, mut script) = scripted();
    let config = StoreConfig {
        require_destination: true,
        ..StoreConfig::default()
    };
    let store = BookingStore::new(transport, config).unwrap();

    assert!(!store.search(FlightFilter::new("Graz", "", false)));
    script.assert_quiet_for(Duration::from_secs(1)).await;
    assert!(store.search(FlightFilter::new("Graz", "Ham", false)));
    script.expect_find("Graz", "Ham").await;
}

// ========== One-shot loads ==========

#[tokio::test(start_paused = true)]
async fn load_is_skipped_for_incomplete_filter() {
    let (transport, mut script) = scripted();
    let store = store_with(transport);

    assert_eq!(store.load_flights(FlightFilter::new("London", "", false)).await.unwrap(), 0);
    assert_eq!(store.load_flights(FlightFilter::new("", "Paris", false)).await.unwrap(), 0);
    script.assert_quiet_for(Duration::from_secs(1)).await;
}

#[tokio::test(start_paused = true)]
async fn load_bypasses_the_debouncer() {
    let (transport, mut script) = scripted();
    let store = store_with(transport);

    let (result, ()) = tokio::join!(
        store.load_flights(FlightFilter::new("London", "Paris", false)),
        async {
            script
                .expect_find("London", "Paris")
                .await
                .respond_flights(vec![london_paris(3, false)]);
        }
    );

    assert_eq!(result.unwrap(), 1);
    assert_eq!(ids(&store.flights()), vec![3]);
}

#[tokio::test(start_paused = true)]
async fn load_superseded_by_search() {
    let (transport, mut script) = scripted();
    let store = store_with(transport);

    let (result, ()) = tokio::join!(
        store.load_flights(FlightFilter::new("London", "Paris", false)),
        async {
            let load = script.expect_find("London", "Paris").await;
            store.search(FlightFilter::new("Graz", "Hamburg", false));
            let search = script.expect_find("Graz", "Hamburg").await;
            load.respond_flights(vec![london_paris(3, false)]);
            search.respond_flights(Vec::new());
        }
    );

    assert!(matches!(result, Err(StoreError::Superseded(_))));
    assert!(store.flights().is_empty());
}

#[tokio::test(start_paused = true)]
async fn load_failure_reports_zero_hits() {
    let (transport, mut script) = scripted();
    let store = store_with(transport);

    let (result, ()) = tokio::join!(
        store.load_flights(FlightFilter::new("London", "Paris", false)),
        async {
            script
                .expect_find("London", "Paris")
                .await
                .fail(TransportError::Rejected("quota".to_string()));
        }
    );

    assert_eq!(result.unwrap(), 0);
    assert!(store.search_status().last_error.is_some());
}

#[tokio::test]
async fn search_against_in_memory_transport() {
    let transport = std::sync::Arc::new(InMemoryTransport::with_flights(vec![
        london_paris(3, false),
        flight(4, "Londonderry", "Paris", true),
        flight(8, "Graz", "Hamburg", false),
    ]));
    let store = store_with(transport.clone());

    store.search_text("Lond");
    store.idle().await;

    assert_eq!(ids(&store.flights()), vec![3, 4]);
    assert_eq!(transport.stats().finds, 1);
}
