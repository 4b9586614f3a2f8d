use chrono::NaiveDate;
use reqwest::Client;
use studionavi_common::api::{ApiEnvelope, AvailabilityData};
use studionavi_common::Studio;
use studionavi_daemon::{build_router, db, AppState};

fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 1, 28).unwrap()
}

/// Serve a freshly seeded in-memory database on an ephemeral port.
async fn spawn_daemon() -> String {
    let conn = db::init_in_memory().unwrap();
    db::seed_demo(&conn, date()).unwrap();

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, build_router(AppState::new(conn))).await.unwrap();
    });
    format!("http://{}", addr)
}

#[tokio::test]
async fn test_search_then_availability() {
    let base_url = spawn_daemon().await;
    let client = Client::new();

    // 1. Search
    let studios: Vec<Studio> = client
        .get(format!("{}/studios/search", base_url))
        .query(&[("q", "PAD")])
        .send()
        .await
        .expect("Failed to send search request")
        .json()
        .await
        .unwrap();
    assert_eq!(studios.len(), 1);
    let pad = &studios[0];
    assert_eq!(pad.name, "PADstudio");
    assert_eq!(pad.self_booking_start, "前日 12:00〜");

    // 2. Lookup
    let resp = client
        .get(format!("{}/studios/{}", base_url, pad.id))
        .send()
        .await
        .expect("Failed to lookup studio");
    assert!(resp.status().is_success());
    let looked_up: Studio = resp.json().await.unwrap();
    assert_eq!(&looked_up, pad);

    // 3. Availability
    let resp = client
        .get(format!("{}/studios/{}/availability", base_url, pad.id))
        .query(&[("date", "2025-01-28"), ("start", "10:00"), ("end", "24:00"), ("duration", "2")])
        .send()
        .await
        .expect("Failed to get availability");
    assert!(resp.status().is_success());

    let envelope: ApiEnvelope<AvailabilityData> = resp.json().await.unwrap();
    let ApiEnvelope::Success { data } = envelope else {
        panic!("expected success envelope");
    };
    assert_eq!(data.studio_id, pad.id.to_string());
    assert_eq!(data.meta.timezone, "Asia/Tokyo");

    let rendered: Vec<String> = data
        .available_ranges
        .iter()
        .map(|s| format!("{} {}-{}", s.room_name, s.start, s.end))
        .collect();
    assert_eq!(
        rendered,
        vec![
            "Aスタジオ 10:00-13:00",
            "Aスタジオ 15:00-24:00",
            "Bスタジオ 11:30-17:30",
        ]
    );
}

#[tokio::test]
async fn test_error_envelope_for_unknown_studio() {
    let base_url = spawn_daemon().await;

    let resp = Client::new()
        .get(format!("{}/studios/4242/availability", base_url))
        .query(&[("date", "2025-01-28"), ("start", "10:00"), ("end", "12:00"), ("duration", "1")])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::NOT_FOUND);

    let envelope: ApiEnvelope<AvailabilityData> = resp.json().await.unwrap();
    match envelope {
        ApiEnvelope::Error { error } => assert_eq!(error.code, "STUDIO_NOT_FOUND"),
        other => panic!("unexpected {:?}", other),
    }
}
