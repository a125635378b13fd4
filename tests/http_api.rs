use invoice_roi::calculator::RoiConstants;
use invoice_roi::db;
use invoice_roi::server::{AppState, build_router};
use rusqlite::Connection;
use serde_json::{Value, json};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

async fn spawn_app() -> std::net::SocketAddr {
    let conn = Connection::open_in_memory().expect("open sqlite");
    db::init_schema(&conn).expect("schema");
    let app = build_router(AppState::new(conn, RoiConstants::default()));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind listener");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move { axum::serve(listener, app).await.expect("serve app") });
    addr
}

async fn send_raw(
    addr: std::net::SocketAddr,
    method: &str,
    path: &str,
    body: Option<&Value>,
) -> (u16, Value) {
    let mut stream = tokio::net::TcpStream::connect(addr)
        .await
        .expect("connect server");
    let mut req = format!("{method} {path} HTTP/1.1\r\nHost: {addr}\r\nConnection: close\r\n");
    let payload = body.map(Value::to_string).unwrap_or_default();
    if body.is_some() {
        req.push_str("Content-Type: application/json\r\n");
    }
    req.push_str(&format!("Content-Length: {}\r\n\r\n{payload}", payload.len()));
    stream
        .write_all(req.as_bytes())
        .await
        .expect("write request");

    let mut response = String::new();
    stream
        .read_to_string(&mut response)
        .await
        .expect("read response");
    let (head, body) = response
        .split_once("\r\n\r\n")
        .expect("http response must have separator");
    let status = head
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .and_then(|s| s.parse::<u16>().ok())
        .expect("http status");
    let json = serde_json::from_str(body).expect("json body");
    (status, json)
}

fn reference_scenario(name: &str) -> Value {
    json!({
        "scenario_name": name,
        "monthly_invoice_volume": 2000,
        "num_ap_staff": 3,
        "avg_hours_per_invoice": 0.17,
        "hourly_wage": 30,
        "error_rate_manual": 0.5,
        "error_cost": 100,
        "time_horizon_months": 36,
        "one_time_implementation_cost": 50000
    })
}

#[tokio::test]
async fn health_reports_ok() {
    let addr = spawn_app().await;

    let (status, body) = send_raw(addr, "GET", "/api/health", None).await;
    assert_eq!(status, 200);
    assert_eq!(body["status"], "OK");
}

#[tokio::test]
async fn simulate_returns_rounded_metrics() {
    let addr = spawn_app().await;

    let (status, body) = send_raw(
        addr,
        "POST",
        "/api/simulate",
        Some(&reference_scenario("ignored")),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["monthly_savings"], 34100.0);
    assert_eq!(body["data"]["payback_months"], 1.5);
    assert_eq!(body["data"]["roi_percentage"], 2355.2);
}

#[tokio::test]
async fn simulate_rejects_missing_fields() {
    let addr = spawn_app().await;

    let (status, body) = send_raw(
        addr,
        "POST",
        "/api/simulate",
        Some(&json!({ "monthly_invoice_volume": 2000 })),
    )
    .await;
    assert_eq!(status, 400);
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().contains("num_ap_staff"));
}

#[tokio::test]
async fn scenario_crud_and_report_flow() {
    let addr = spawn_app().await;

    let (status, body) = send_raw(
        addr,
        "POST",
        "/api/scenarios",
        Some(&reference_scenario("Pilot")),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(body["message"], "Scenario saved successfully!");
    let id = body["id"].as_i64().expect("scenario id");

    let (status, body) = send_raw(
        addr,
        "POST",
        "/api/scenarios",
        Some(&reference_scenario("Pilot")),
    )
    .await;
    assert_eq!(status, 400);
    assert_eq!(body["error"], "Scenario name already exists");

    send_raw(addr, "POST", "/api/scenarios", Some(&reference_scenario("Later"))).await;

    let (status, body) = send_raw(addr, "GET", "/api/scenarios", None).await;
    assert_eq!(status, 200);
    let names: Vec<&str> = body["data"]
        .as_array()
        .expect("scenario list")
        .iter()
        .filter_map(|s| s["scenario_name"].as_str())
        .collect();
    assert_eq!(names, vec!["Later", "Pilot"]);

    let (status, body) = send_raw(addr, "GET", &format!("/api/scenarios/{id}"), None).await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["scenario_name"], "Pilot");
    assert_eq!(body["data"]["time_horizon_months"], 36);

    let (status, body) = send_raw(
        addr,
        "POST",
        "/api/report/generate",
        Some(&json!({ "scenario_id": id, "email": "no-at-sign" })),
    )
    .await;
    assert_eq!(status, 400);
    assert_eq!(body["error"], "Valid email required");

    let (status, body) = send_raw(
        addr,
        "POST",
        "/api/report/generate",
        Some(&json!({ "scenario_id": id, "email": "cfo@example.com" })),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["email_captured"], "cfo@example.com");
    assert_eq!(body["data"]["results"]["net_savings"], 1_177_600.0);
    assert_eq!(body["data"]["scenario"]["id"], id);

    let (status, body) = send_raw(addr, "DELETE", &format!("/api/scenarios/{id}"), None).await;
    assert_eq!(status, 200);
    assert_eq!(body["message"], "Scenario deleted successfully!");

    let (status, body) = send_raw(addr, "GET", &format!("/api/scenarios/{id}"), None).await;
    assert_eq!(status, 404);
    assert_eq!(body["error"], "Scenario not found");

    let (status, _) = send_raw(addr, "DELETE", &format!("/api/scenarios/{id}"), None).await;
    assert_eq!(status, 404);

    let (status, body) = send_raw(
        addr,
        "POST",
        "/api/report/generate",
        Some(&json!({ "scenario_id": id, "email": "cfo@example.com" })),
    )
    .await;
    assert_eq!(status, 404);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn unknown_route_uses_error_envelope() {
    let addr = spawn_app().await;

    let (status, body) = send_raw(addr, "GET", "/api/nope", None).await;
    assert_eq!(status, 404);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn mistyped_body_is_bad_request() {
    let addr = spawn_app().await;

    let (status, body) = send_raw(
        addr,
        "POST",
        "/api/simulate",
        Some(&json!({ "monthly_invoice_volume": "lots" })),
    )
    .await;
    assert_eq!(status, 400);
    assert_eq!(body["success"], false);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn non_numeric_scenario_id_uses_error_envelope() {
    let addr = spawn_app().await;

    for method in ["GET", "DELETE"] {
        let (status, body) = send_raw(addr, method, "/api/scenarios/abc", None).await;
        assert_eq!(status, 400);
        assert_eq!(body["success"], false);
        assert!(body["error"].is_string());
    }
}
