//! Integration tests for the HTTP API.
//!
//! Drives the router in-process with axum-test over in-memory storage.

#![allow(clippy::unwrap_used, clippy::panic)]

use axum::http::StatusCode;
use axum_test::TestServer;
use bedboard::api::{router, AppState};
use bedboard::seed::seed_statuses;
use bedboard::Storage;
use serde_json::{json, Value};

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

/// A server over a fresh database with the default statuses.
fn create_server() -> TestServer {
    let storage = Storage::open_in_memory().unwrap();
    seed_statuses(&storage).unwrap();
    TestServer::new(router(AppState::new(storage, "api-test"))).unwrap()
}

async fn create_location(server: &TestServer, name: &str, kind: &str, parent: Option<i64>) -> i64 {
    let response = server
        .post("/api/locations")
        .json(&json!({ "name": name, "kind": kind, "parent_id": parent }))
        .await;
    response.assert_status_ok();
    response.json::<Value>()["location"]["id"].as_i64().unwrap()
}

/// Tower A / Floor 1 / ICU, returning the sector id.
async fn create_sector(server: &TestServer) -> i64 {
    let tower = create_location(server, "Tower A", "tower", None).await;
    let floor = create_location(server, "Floor 1", "floor", Some(tower)).await;
    create_location(server, "ICU", "sector", Some(floor)).await
}

async fn create_bed(server: &TestServer, sector: i64, code: &str) -> i64 {
    let response = server
        .post("/api/beds")
        .json(&json!({ "code": code, "location_id": sector }))
        .await;
    response.assert_status_ok();
    response.json::<Value>()["bed"]["id"].as_i64().unwrap()
}

/// Id of the first status of the given kind.
async fn status_id(server: &TestServer, kind: &str) -> i64 {
    let statuses = server.get("/api/statuses").await.json::<Value>();
    statuses["statuses"]
        .as_array()
        .unwrap()
        .iter()
        .find(|s| s["kind"] == kind)
        .unwrap()["id"]
        .as_i64()
        .unwrap()
}

// =============================================================================
// HEALTH AND CATALOGUE
// =============================================================================

#[tokio::test]
async fn test_health() {
    let server = create_server();
    let body = server.get("/api/health").await.json::<Value>();

    assert_eq!(body["success"], true);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["schema_version"], 1);
}

#[tokio::test]
async fn test_statuses_listed_in_order() {
    let server = create_server();
    let body = server.get("/api/statuses").await.json::<Value>();

    let statuses = body["statuses"].as_array().unwrap();
    assert_eq!(statuses.len(), 7);
    assert_eq!(statuses[0]["kind"], "available");
    assert_eq!(statuses[0]["color"], "#4CAF50");
}

// =============================================================================
// LOCATIONS
// =============================================================================

#[tokio::test]
async fn test_location_crud() {
    let server = create_server();
    let sector = create_sector(&server).await;

    let body = server
        .put(&format!("/api/locations/{sector}"))
        .json(&json!({ "name": "Intensive Care", "beds_per_row": 4 }))
        .await
        .json::<Value>();
    assert_eq!(body["location"]["name"], "Intensive Care");
    assert_eq!(body["location"]["beds_per_row"], 4);

    server
        .delete(&format!("/api/locations/{sector}"))
        .await
        .assert_status_ok();
    let response = server.get(&format!("/api/locations/{sector}")).await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_location_filters_and_tree() {
    let server = create_server();
    create_sector(&server).await;
    create_location(&server, "Tower B", "tower", None).await;

    let towers = server
        .get("/api/locations")
        .add_query_param("kind", "tower")
        .await
        .json::<Value>();
    assert_eq!(towers["locations"].as_array().unwrap().len(), 2);

    let tree = server.get("/api/locations/tree").await.json::<Value>();
    let roots = tree["locations"].as_array().unwrap();
    assert_eq!(roots.len(), 2);
    assert_eq!(roots[0]["name"], "Tower A");
    assert_eq!(roots[0]["children"][0]["children"][0]["name"], "ICU");
}

#[tokio::test]
async fn test_location_missing_name_is_bad_request() {
    let server = create_server();
    let response = server
        .post("/api/locations")
        .json(&json!({ "kind": "tower" }))
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body = response.json::<Value>();
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "name is required");
}

#[tokio::test]
async fn test_malformed_body_is_bad_request() {
    let server = create_server();
    let response = server
        .post("/api/locations")
        .json(&json!({ "name": "Tower Z", "kind": "castle" }))
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["success"], false);
}

#[tokio::test]
async fn test_location_beds() {
    let server = create_server();
    let sector = create_sector(&server).await;
    create_bed(&server, sector, "ICU-01").await;
    create_bed(&server, sector, "ICU-02").await;

    let body = server
        .get(&format!("/api/locations/{sector}/beds"))
        .await
        .json::<Value>();
    assert_eq!(body["location"]["name"], "ICU");
    let beds = body["beds"].as_array().unwrap();
    assert_eq!(beds.len(), 2);
    assert_eq!(beds[0]["status"]["kind"], "available");

    let response = server.get("/api/locations/999/beds").await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
}

// =============================================================================
// BEDS AND THE STATUS WORKFLOW
// =============================================================================

#[tokio::test]
async fn test_bed_update_and_deactivate() {
    let server = create_server();
    let sector = create_sector(&server).await;
    let bed = create_bed(&server, sector, "ICU-01").await;

    let body = server
        .put(&format!("/api/beds/{bed}"))
        .json(&json!({ "name": "Window bed" }))
        .await
        .json::<Value>();
    assert_eq!(body["bed"]["name"], "Window bed");
    assert_eq!(body["bed"]["code"], "ICU-01");

    server
        .delete(&format!("/api/beds/{bed}"))
        .await
        .assert_status_ok();
    let response = server.get(&format!("/api/beds/{bed}")).await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_bed_in_floor_rejected() {
    let server = create_server();
    let tower = create_location(&server, "Tower A", "tower", None).await;
    let floor = create_location(&server, "Floor 1", "floor", Some(tower)).await;

    let response = server
        .post("/api/beds")
        .json(&json!({ "code": "F-01", "location_id": floor }))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_status_change_requires_status_id() {
    let server = create_server();
    let sector = create_sector(&server).await;
    let bed = create_bed(&server, sector, "ICU-01").await;

    let response = server
        .post(&format!("/api/beds/{bed}/status"))
        .json(&json!({ "comment": "no status" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["error"], "status_id is required");
}

#[tokio::test]
async fn test_status_change_unknown_bed() {
    let server = create_server();
    let available = status_id(&server, "available").await;

    let response = server
        .post("/api/beds/4242/status")
        .json(&json!({ "status_id": available }))
        .await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_admit_and_release_patient() {
    let server = create_server();
    let sector = create_sector(&server).await;
    let bed = create_bed(&server, sector, "ICU-01").await;
    let occupied = status_id(&server, "occupied").await;
    let available = status_id(&server, "available").await;

    let body = server
        .post(&format!("/api/beds/{bed}/status"))
        .json(&json!({
            "status_id": occupied,
            "patient": { "name": "Ana Rojas", "national_id": "111" },
            "comment": "admitted from ER",
        }))
        .await
        .json::<Value>();
    assert_eq!(body["success"], true);
    assert_eq!(body["bed"]["patient"]["national_id"], "111");
    assert!(body["released_bed"].is_null());

    let body = server
        .post(&format!("/api/beds/{bed}/status"))
        .json(&json!({ "status_id": available, "actor": "nurse" }))
        .await
        .json::<Value>();
    assert!(body["bed"]["patient"].is_null());

    let history = server
        .get(&format!("/api/beds/{bed}/history"))
        .await
        .json::<Value>();
    let records = history["history"].as_array().unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0]["actor"], "nurse");
    assert_eq!(records[1]["actor"], "api-test");
    assert_eq!(records[1]["comment"], "admitted from ER");
}

#[tokio::test]
async fn test_transfer_requires_confirmation() {
    let server = create_server();
    let sector = create_sector(&server).await;
    let bed_x = create_bed(&server, sector, "ICU-01").await;
    let bed_y = create_bed(&server, sector, "ICU-02").await;
    let occupied = status_id(&server, "occupied").await;

    let admit = server
        .post(&format!("/api/beds/{bed_x}/status"))
        .json(&json!({
            "status_id": occupied,
            "patient": { "name": "Ana Rojas", "national_id": "111" },
        }))
        .await
        .json::<Value>();
    let patient = admit["bed"]["patient"]["id"].as_i64().unwrap();

    // Without confirmation nothing changes.
    let response = server
        .post(&format!("/api/beds/{bed_y}/status"))
        .json(&json!({ "status_id": occupied, "patient_id": patient }))
        .await;
    assert_eq!(response.status_code(), StatusCode::CONFLICT);
    let body = response.json::<Value>();
    assert_eq!(body["requires_confirmation"], true);
    assert_eq!(body["current_bed"]["code"], "ICU-01");
    assert!(body["warning"].as_str().unwrap().contains("ICU-01"));

    let y = server.get(&format!("/api/beds/{bed_y}")).await.json::<Value>();
    assert!(y["bed"]["patient"].is_null());
    let y_history = server
        .get(&format!("/api/beds/{bed_y}/history"))
        .await
        .json::<Value>();
    assert!(y_history["history"].as_array().unwrap().is_empty());

    // Confirmed: the patient moves and the old bed awaits cleaning.
    let body = server
        .post(&format!("/api/beds/{bed_y}/status"))
        .json(&json!({
            "status_id": occupied,
            "patient_id": patient,
            "confirm_transfer": true,
        }))
        .await
        .json::<Value>();
    assert_eq!(body["bed"]["patient"]["id"], patient);
    assert_eq!(body["released_bed"]["id"], bed_x);
    assert_eq!(body["released_bed"]["status"]["kind"], "pending_cleaning");
    assert!(body["released_bed"]["patient"].is_null());

    let current = server
        .get(&format!("/api/patients/{patient}"))
        .await
        .json::<Value>();
    assert_eq!(current["bed"]["id"], bed_y);
}

#[tokio::test]
async fn test_history_limit() {
    let server = create_server();
    let sector = create_sector(&server).await;
    let bed = create_bed(&server, sector, "ICU-01").await;
    let cleaning = status_id(&server, "cleaning").await;

    for _ in 0..3 {
        server
            .post(&format!("/api/beds/{bed}/status"))
            .json(&json!({ "status_id": cleaning }))
            .await
            .assert_status_ok();
    }

    let history = server
        .get(&format!("/api/beds/{bed}/history"))
        .add_query_param("limit", 2)
        .await
        .json::<Value>();
    assert_eq!(history["history"].as_array().unwrap().len(), 2);
}

// =============================================================================
// PATIENTS
// =============================================================================

#[tokio::test]
async fn test_patient_crud_and_search() {
    let server = create_server();

    let created = server
        .post("/api/patients")
        .json(&json!({ "name": "Bruno Diaz", "national_id": "222" }))
        .await
        .json::<Value>();
    let id = created["patient"]["id"].as_i64().unwrap();

    let duplicate = server
        .post("/api/patients")
        .json(&json!({ "name": "Someone", "national_id": "222" }))
        .await;
    assert_eq!(duplicate.status_code(), StatusCode::BAD_REQUEST);

    let found = server
        .get("/api/patients")
        .add_query_param("q", "Bruno")
        .await
        .json::<Value>();
    assert_eq!(found["patients"].as_array().unwrap().len(), 1);

    let updated = server
        .put(&format!("/api/patients/{id}"))
        .json(&json!({ "name": "Bruno A. Diaz" }))
        .await
        .json::<Value>();
    assert_eq!(updated["patient"]["name"], "Bruno A. Diaz");

    server
        .delete(&format!("/api/patients/{id}"))
        .await
        .assert_status_ok();
    let response = server.get(&format!("/api/patients/{id}")).await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_occupied_bed_and_patient_cannot_be_deactivated() {
    let server = create_server();
    let sector = create_sector(&server).await;
    let bed = create_bed(&server, sector, "ICU-01").await;
    let occupied = status_id(&server, "occupied").await;

    let body = server
        .post(&format!("/api/beds/{bed}/status"))
        .json(&json!({
            "status_id": occupied,
            "patient": { "name": "Ana Rojas", "national_id": "111" },
        }))
        .await
        .json::<Value>();
    let patient = body["bed"]["patient"]["id"].as_i64().unwrap();

    let response = server.delete(&format!("/api/beds/{bed}")).await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["success"], false);

    let response = server.delete(&format!("/api/patients/{patient}")).await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["success"], false);

    let shown = server
        .get(&format!("/api/patients/{patient}"))
        .await
        .json::<Value>();
    assert_eq!(shown["patient"]["active"], true);
    assert_eq!(shown["bed"]["id"].as_i64(), Some(bed));
}

#[tokio::test]
async fn test_patient_search_is_literal() {
    let server = create_server();
    for (name, national_id) in [("Ana Rojas", "111"), ("Bruno Diaz", "222")] {
        server
            .post("/api/patients")
            .json(&json!({ "name": name, "national_id": national_id }))
            .await
            .assert_status_ok();
    }

    for q in ["%", "_"] {
        let found = server
            .get("/api/patients")
            .add_query_param("q", q)
            .await
            .json::<Value>();
        assert!(found["patients"].as_array().unwrap().is_empty(), "q = {q}");
    }
}

#[tokio::test]
async fn test_non_numeric_id_is_bad_request() {
    let server = create_server();
    let response = server.get("/api/patients/abc").await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["success"], false);
}

// =============================================================================
// STATISTICS
// =============================================================================

#[tokio::test]
async fn test_statistics_and_dashboard() {
    let server = create_server();
    let sector = create_sector(&server).await;
    let bed = create_bed(&server, sector, "ICU-01").await;
    create_bed(&server, sector, "ICU-02").await;
    create_bed(&server, sector, "ICU-03").await;
    let occupied = status_id(&server, "occupied").await;

    server
        .post(&format!("/api/beds/{bed}/status"))
        .json(&json!({
            "status_id": occupied,
            "patient": { "name": "Ana Rojas", "national_id": "111" },
        }))
        .await
        .assert_status_ok();

    let stats = server.get("/api/statistics").await.json::<Value>();
    assert_eq!(stats["total"], 3);
    let sum: f64 = stats["by_status"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["percentage"].as_f64().unwrap())
        .sum();
    assert!((sum - 100.0).abs() < 0.2, "sum was {sum}");

    let dashboard = server.get("/api/dashboard").await.json::<Value>();
    let tower = &dashboard["dashboard"]["towers"][0];
    assert_eq!(tower["tower"]["name"], "Tower A");
    assert_eq!(tower["total"], 3);
    assert_eq!(tower["occupied"], 1);
    assert_eq!(tower["occupancy_rate"], 33.3);
}
