#![allow(clippy::unwrap_used)]
// Integration tests for `ZmClient` using wiremock.

use chrono::{DateTime, TimeDelta, Utc};
use secrecy::SecretString;
use serde_json::json;
use url::Url;
use wiremock::matchers::{body_string_contains, method, path, path_regex, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use forculus_api::{
    AlarmStatus, Credentials, Error, MonitorId, ServerTimeZone, TransportConfig, ZmClient,
};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, ZmClient) {
    let server = MockServer::start().await;
    let base_url = Url::parse(&server.uri()).unwrap();
    let client = ZmClient::with_base_url(
        base_url,
        Credentials::new("admin", SecretString::from("hunter2")),
        &TransportConfig::default(),
    )
    .unwrap()
    .with_time_zone(ServerTimeZone::utc());
    (server, client)
}

fn login_body(access: &str, access_expires: f64) -> serde_json::Value {
    json!({
        "access_token": access,
        "access_token_expires": access_expires,
        "refresh_token": "refresh-1",
        "refresh_token_expires": 86400,
        "credentials": "auth=abc",
        "append_password": 0,
        "version": "1.36.12",
        "apiversion": "2.0"
    })
}

async fn mount_login(server: &MockServer, access_expires: f64) {
    Mock::given(method("POST"))
        .and(path("/api/host/login.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(login_body("access-1", access_expires)))
        .mount(server)
        .await;
}

fn monitor_json(id: &str, name: &str) -> serde_json::Value {
    json!({
        "Monitor": { "Id": id, "Name": name, "Function": "Modect", "Enabled": "1" },
        "Monitor_Status": { "MonitorId": id, "Status": "Connected", "CaptureFPS": "5.00" }
    })
}

fn event_json(id: &str, monitor: &str) -> serde_json::Value {
    json!({
        "Event": {
            "Id": id,
            "MonitorId": monitor,
            "Name": format!("Event-{id}"),
            "Cause": "Motion",
            "StartTime": "2024-06-15 10:00:00",
            "EndTime": "2024-06-15 10:00:30",
            "Length": "30.00",
            "Frames": "150",
            "AlarmFrames": "12"
        }
    })
}

fn window() -> (DateTime<Utc>, DateTime<Utc>) {
    let end = DateTime::parse_from_rfc3339("2024-06-15T10:30:00Z")
        .unwrap()
        .with_timezone(&Utc);
    (end - TimeDelta::minutes(30), end)
}

// ── Authentication tests ────────────────────────────────────────────

#[tokio::test]
async fn test_login_posts_form_credentials() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/host/login.json"))
        .and(body_string_contains("user=admin"))
        .and(body_string_contains("pass=hunter2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(login_body("access-1", 3600.0)))
        .expect(1)
        .mount(&server)
        .await;

    client.login().await.unwrap();
    assert_eq!(client.check_login().await.unwrap(), "access-1");
}

#[tokio::test]
async fn test_login_failure_is_authentication_error() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/host/login.json"))
        .respond_with(ResponseTemplate::new(401).set_body_string("Login denied"))
        .mount(&server)
        .await;

    let result = client.login().await;
    assert!(
        matches!(result, Err(Error::Authentication { .. })),
        "expected Authentication error, got: {result:?}"
    );
}

#[tokio::test]
async fn test_login_server_error_is_not_authentication_error() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/host/login.json"))
        .respond_with(ResponseTemplate::new(502).set_body_string("Bad Gateway"))
        .mount(&server)
        .await;

    let result = client.login().await;
    assert!(
        matches!(result, Err(Error::Api { status: 502, .. })),
        "expected Api error, got: {result:?}"
    );
}

#[tokio::test]
async fn test_refresh_without_session_fails() {
    let (_server, client) = setup().await;
    assert!(matches!(client.refresh_login().await, Err(Error::NoSession)));
}

#[tokio::test]
async fn test_concurrent_check_login_logs_in_once() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/host/login.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(login_body("access-1", 3600.0)))
        .expect(1)
        .mount(&server)
        .await;

    let (a, b, c) = tokio::join!(client.check_login(), client.check_login(), client.check_login());
    assert_eq!(a.unwrap(), "access-1");
    assert_eq!(b.unwrap(), "access-1");
    assert_eq!(c.unwrap(), "access-1");
}

#[tokio::test]
async fn test_lapsed_access_token_is_refreshed() {
    let (server, client) = setup().await;

    // Zero-second access lifetime: the very next check wants a refresh.
    Mock::given(method("POST"))
        .and(path("/api/host/login.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(login_body("access-1", 0.0)))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/host/login.json"))
        .and(query_param("token", "refresh-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "access-2",
            "access_token_expires": 3600
        })))
        .expect(1)
        .mount(&server)
        .await;

    client.login().await.unwrap();
    assert_eq!(client.check_login().await.unwrap(), "access-2");
    assert_eq!(client.check_login().await.unwrap(), "access-2");
}

#[tokio::test]
async fn test_rejected_token_forces_relogin() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/host/login.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(login_body("access-1", 3600.0)))
        .expect(2)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/host/getVersion.json"))
        .respond_with(ResponseTemplate::new(401))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/host/getVersion.json"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "version": "1.36.12", "apiversion": "2.0" })),
        )
        .mount(&server)
        .await;

    let first = client.version().await;
    assert!(matches!(first, Err(Error::Authentication { .. })), "got: {first:?}");

    let version = client.version().await.unwrap();
    assert_eq!(version.service_version, "1.36.12");
    assert_eq!(version.api_version, "2.0");
}

// ── Monitor tests ───────────────────────────────────────────────────

#[tokio::test]
async fn test_monitors_attach_access_token() {
    let (server, client) = setup().await;
    mount_login(&server, 3600.0).await;

    Mock::given(method("GET"))
        .and(path("/api/monitors.json"))
        .and(query_param("token", "access-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "monitors": [monitor_json("1", "Front Door"), monitor_json("2", "Garage")]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let monitors = client.monitors().await.unwrap();
    assert_eq!(monitors.len(), 2);
    assert_eq!(monitors[0].label(), "Front Door(id:1)");
    assert_eq!(
        monitors[1].status.as_ref().and_then(|s| s.state.as_deref()),
        Some("Connected")
    );
}

#[tokio::test]
async fn test_alarm_status_parses_code() {
    let (server, client) = setup().await;
    mount_login(&server, 3600.0).await;

    Mock::given(method("GET"))
        .and(path("/api/monitors/alarm/id:4/command:status.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "2" })))
        .mount(&server)
        .await;

    let status = client.alarm_status(&MonitorId::from("4")).await.unwrap();
    assert_eq!(status, AlarmStatus::Alert);
}

#[tokio::test]
async fn test_alerted_monitors_collects_partial_errors() {
    let (server, client) = setup().await;
    mount_login(&server, 3600.0).await;

    Mock::given(method("GET"))
        .and(path("/api/monitors.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "monitors": [
                monitor_json("1", "Front Door"),
                monitor_json("2", "Garage"),
                monitor_json("3", "Yard"),
                monitor_json("4", "Porch"),
            ]
        })))
        .mount(&server)
        .await;

    for (id, body) in [("1", json!({ "status": "1" })), ("2", json!({ "status": "0" })), ("4", json!({ "status": 3 }))] {
        Mock::given(method("GET"))
            .and(path(format!("/api/monitors/alarm/id:{id}/command:status.json")))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&server)
            .await;
    }

    Mock::given(method("GET"))
        .and(path("/api/monitors/alarm/id:3/command:status.json"))
        .respond_with(ResponseTemplate::new(500).set_body_string("zmc not running"))
        .mount(&server)
        .await;

    let (alerted, errors) = client.alerted_monitors().await;

    assert_eq!(alerted.len(), 2);
    assert_eq!(alerted[&MonitorId::from("1")].alarm_status, AlarmStatus::PreAlarm);
    assert_eq!(alerted[&MonitorId::from("4")].alarm_status, AlarmStatus::Alarm);
    assert!(!alerted.contains_key(&MonitorId::from("2")));

    assert_eq!(errors.len(), 1);
    assert!(
        matches!(&errors[0], Error::Api { status: 500, message } if message.contains("zmc")),
        "got: {errors:?}"
    );
}

#[tokio::test]
async fn test_alerted_monitors_listing_failure() {
    let (server, client) = setup().await;
    mount_login(&server, 3600.0).await;

    Mock::given(method("GET"))
        .and(path("/api/monitors.json"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let (alerted, errors) = client.alerted_monitors().await;
    assert!(alerted.is_empty());
    assert_eq!(errors.len(), 1);
    assert!(matches!(errors[0], Error::Deserialization { .. }));
}

// ── Event tests ─────────────────────────────────────────────────────

#[tokio::test]
async fn test_list_events_follows_pagination() {
    let (server, client) = setup().await;
    mount_login(&server, 3600.0).await;

    let index = r"^/api/events/index/StartTime%20%3E=:2024-06-15%2010:00:00/EndTime%20%3C=:2024-06-15%2010:30:00\.json$";

    Mock::given(method("GET"))
        .and(path_regex(index))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "events": [event_json("10", "1"), event_json("11", "2")],
            "pagination": { "page": 1, "pageCount": 2, "nextPage": true, "prevPage": false }
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path_regex(index))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "events": [event_json("12", "1")],
            "pagination": { "page": 2, "pageCount": 2, "nextPage": false, "prevPage": true }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (start, end) = window();
    let events = client.list_events_between(start, end).await.unwrap();

    let ids: Vec<&str> = events.iter().map(|e| e.id.as_str()).collect();
    assert_eq!(ids, ["10", "11", "12"]);
    assert_eq!(events[0].parse_alarm_frames().unwrap(), 12);
    assert_eq!(
        events[0].parse_end_time(client.time_zone()).unwrap(),
        DateTime::parse_from_rfc3339("2024-06-15T10:00:30Z").unwrap()
    );
}

#[tokio::test]
async fn test_list_monitor_events_filters_by_monitor() {
    let (server, client) = setup().await;
    mount_login(&server, 3600.0).await;

    Mock::given(method("GET"))
        .and(path_regex(r"^/api/events/index/MonitorId:5/StartTime%20%3E=:[^/]+/EndTime%20%3C=:[^/]+\.json$"))
        .and(query_param("token", "access-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "events": [event_json("77", "5")],
            "pagination": { "nextPage": false }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (start, end) = window();
    let events = client
        .list_monitor_events_between(&MonitorId::from("5"), start, end)
        .await
        .unwrap();

    assert_eq!(events.len(), 1);
    assert_eq!(events[0].monitor_id, MonitorId::from("5"));
}

#[tokio::test]
async fn test_event_window_is_sent_in_server_time_zone() {
    let (server, client) = setup().await;
    let client = client.with_time_zone("+02:00".parse().unwrap());
    mount_login(&server, 3600.0).await;

    // 10:00-10:30 UTC is 12:00-12:30 on a UTC+2 server.
    let index = r"^/api/events/index/StartTime%20%3E=:2024-06-15%2012:00:00/EndTime%20%3C=:2024-06-15%2012:30:00\.json$";
    Mock::given(method("GET"))
        .and(path_regex(index))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "events": [event_json("90", "1")],
            "pagination": { "nextPage": false }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (start, end) = window();
    let events = client.list_events_between(start, end).await.unwrap();

    assert_eq!(events.len(), 1);
    // EndTime "2024-06-15 10:00:30" server time is 08:00:30 UTC.
    assert_eq!(
        events[0].parse_end_time(client.time_zone()).unwrap(),
        DateTime::parse_from_rfc3339("2024-06-15T08:00:30Z").unwrap()
    );
}
