use assert_matches::assert_matches;
use chrono::NaiveDate;
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use booking_cell::error::BookingError;
use booking_cell::models::{BookSlotRequest, SlotQuery};
use booking_cell::services::{availability::AvailabilityService, conflict::ConflictGuardService};
use schedule_cell::models::TimeOfDay;
use shared_utils::test_utils::TestConfig;

const TOKEN: &str = "test-token";

fn monday() -> NaiveDate {
    // 2025-06-02 is a Monday.
    NaiveDate::from_ymd_opt(2025, 6, 2).unwrap()
}

fn at(date: NaiveDate, time: &str) -> chrono::DateTime<chrono::Utc> {
    time.parse::<TimeOfDay>().unwrap().on_date(date)
}

fn monday_template_rows() -> serde_json::Value {
    json!([{
        "weekday": "Monday",
        "enabled": true,
        "blocks": [{ "start": "09:00", "end": "17:00" }],
        "slotDuration": 30
    }])
}

fn appointment_row(date: NaiveDate, start: &str, end: &str, status: &str) -> serde_json::Value {
    json!({
        "id": Uuid::new_v4(),
        "doctorId": Uuid::new_v4(),
        "patientId": Uuid::new_v4(),
        "startTime": at(date, start).to_rfc3339(),
        "endTime": at(date, end).to_rfc3339(),
        "status": status
    })
}

async fn mount_schedule_mocks(mock_server: &MockServer, template: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/rest/v1/weekly_schedules"))
        .respond_with(ResponseTemplate::new(200).set_body_json(template))
        .mount(mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/schedule_exceptions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(mock_server)
        .await;
}

fn slot_query() -> SlotQuery {
    SlotQuery {
        start_date: monday(),
        end_date: monday(),
        duration_minutes: None,
        limit: None,
    }
}

#[tokio::test]
async fn open_day_yields_slots() {
    let mock_server = MockServer::start().await;
    mount_schedule_mocks(&mock_server, monday_template_rows()).await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let config = TestConfig::with_url(&mock_server.uri()).to_app_config();
    let service = AvailabilityService::new(&config);

    let slots = service.find_available_slots("doc-1", &slot_query()).await.unwrap();

    assert_eq!(slots.len(), 16);
    assert_eq!(slots[0].start_time, at(monday(), "09:00"));
}

#[tokio::test]
async fn no_schedule_is_an_empty_answer_not_an_error() {
    let mock_server = MockServer::start().await;
    mount_schedule_mocks(&mock_server, json!([])).await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let config = TestConfig::with_url(&mock_server.uri()).to_app_config();
    let service = AvailabilityService::new(&config);

    let slots = service.find_available_slots("doc-1", &slot_query()).await.unwrap();

    assert!(slots.is_empty());
}

#[tokio::test]
async fn failed_booking_lookup_fails_the_whole_query() {
    let mock_server = MockServer::start().await;
    mount_schedule_mocks(&mock_server, monday_template_rows()).await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(500).set_body_string("timeout"))
        .mount(&mock_server)
        .await;

    let config = TestConfig::with_url(&mock_server.uri()).to_app_config();
    let service = AvailabilityService::new(&config);

    let result = service.find_available_slots("doc-1", &slot_query()).await;

    // Fail closed: no slots are synthesized from a partial picture.
    assert_matches!(result, Err(BookingError::Upstream(_)));
}

#[tokio::test]
async fn inverted_date_range_is_rejected_before_any_io() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_url(&mock_server.uri()).to_app_config();
    let service = AvailabilityService::new(&config);

    let query = SlotQuery {
        start_date: monday(),
        end_date: monday().pred_opt().unwrap(),
        duration_minutes: None,
        limit: None,
    };

    let result = service.find_available_slots("doc-1", &query).await;

    assert_matches!(result, Err(BookingError::InvalidRequest(_)));
    assert_eq!(mock_server.received_requests().await.unwrap().len(), 0);
}

#[tokio::test]
async fn query_limit_never_exceeds_the_configured_cap() {
    let mock_server = MockServer::start().await;
    mount_schedule_mocks(&mock_server, monday_template_rows()).await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let config = TestConfig::with_url(&mock_server.uri()).to_app_config();
    let service = AvailabilityService::new(&config);

    // Four Mondays of 16 slots each would be 64; the config caps at 50.
    let query = SlotQuery {
        start_date: monday(),
        end_date: NaiveDate::from_ymd_opt(2025, 6, 29).unwrap(),
        duration_minutes: None,
        limit: Some(1000),
    };

    let slots = service.find_available_slots("doc-1", &query).await.unwrap();

    assert_eq!(slots.len(), 50);
}

fn book_request(start: &str, end: &str) -> BookSlotRequest {
    BookSlotRequest {
        patient_id: Uuid::new_v4(),
        start_time: at(monday(), start),
        end_time: at(monday(), end),
        notes: None,
    }
}

fn booking_row(request: &BookSlotRequest) -> serde_json::Value {
    json!([{
        "id": Uuid::new_v4(),
        "doctorId": Uuid::new_v4(),
        "patientId": request.patient_id,
        "startTime": request.start_time.to_rfc3339(),
        "endTime": request.end_time.to_rfc3339(),
        "status": "pending",
        "notes": request.notes,
        "createdAt": chrono::Utc::now().to_rfc3339()
    }])
}

#[tokio::test]
async fn free_slot_books_successfully() {
    let mock_server = MockServer::start().await;
    mount_schedule_mocks(&mock_server, monday_template_rows()).await;
    let request = book_request("09:00", "09:30");
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(201).set_body_json(booking_row(&request)))
        .mount(&mock_server)
        .await;

    let config = TestConfig::with_url(&mock_server.uri()).to_app_config();
    let guard = ConflictGuardService::new(&config);

    let booking = guard.reserve("doc-1", &request, TOKEN).await.unwrap();

    assert_eq!(booking.start_time, request.start_time);
    assert_eq!(booking.patient_id, request.patient_id);
}

#[tokio::test]
async fn already_booked_slot_is_a_conflict() {
    let mock_server = MockServer::start().await;
    mount_schedule_mocks(&mock_server, monday_template_rows()).await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            appointment_row(monday(), "09:00", "09:30", "confirmed")
        ])))
        .mount(&mock_server)
        .await;

    let config = TestConfig::with_url(&mock_server.uri()).to_app_config();
    let guard = ConflictGuardService::new(&config);

    let result = guard.reserve("doc-1", &book_request("09:00", "09:30"), TOKEN).await;

    assert_matches!(result, Err(BookingError::SlotConflict(_)));
}

#[tokio::test]
async fn cancelled_booking_does_not_block_rebooking() {
    let mock_server = MockServer::start().await;
    mount_schedule_mocks(&mock_server, monday_template_rows()).await;
    let request = book_request("09:00", "09:30");
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            appointment_row(monday(), "09:00", "09:30", "cancelled")
        ])))
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(201).set_body_json(booking_row(&request)))
        .mount(&mock_server)
        .await;

    let config = TestConfig::with_url(&mock_server.uri()).to_app_config();
    let guard = ConflictGuardService::new(&config);

    assert!(guard.reserve("doc-1", &request, TOKEN).await.is_ok());
}

#[tokio::test]
async fn misaligned_window_is_a_conflict_not_a_booking() {
    let mock_server = MockServer::start().await;
    mount_schedule_mocks(&mock_server, monday_template_rows()).await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let config = TestConfig::with_url(&mock_server.uri()).to_app_config();
    let guard = ConflictGuardService::new(&config);

    // 09:15 is not reachable from 09:00 in 30-minute strides.
    let result = guard.reserve("doc-1", &book_request("09:15", "09:45"), TOKEN).await;

    assert_matches!(result, Err(BookingError::SlotConflict(_)));
}

#[tokio::test]
async fn inverted_booking_window_is_invalid() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_url(&mock_server.uri()).to_app_config();
    let guard = ConflictGuardService::new(&config);

    let result = guard.reserve("doc-1", &book_request("09:30", "09:00"), TOKEN).await;

    assert_matches!(result, Err(BookingError::InvalidRequest(_)));
}

#[tokio::test]
async fn concurrent_insert_loss_surfaces_as_conflict() {
    let mock_server = MockServer::start().await;
    mount_schedule_mocks(&mock_server, monday_template_rows()).await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;
    // The store's exclusion constraint wins the race.
    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(409).set_body_string("duplicate slot"))
        .mount(&mock_server)
        .await;

    let config = TestConfig::with_url(&mock_server.uri()).to_app_config();
    let guard = ConflictGuardService::new(&config);

    let result = guard.reserve("doc-1", &book_request("09:00", "09:30"), TOKEN).await;

    assert_matches!(result, Err(BookingError::SlotConflict(_)));
}
