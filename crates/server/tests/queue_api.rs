//! End-to-end queue scenarios through the HTTP API.

#[macro_use]
mod common;

use axum::http::StatusCode;
use serde_json::json;

use common::TestFixture;

#[tokio::test]
async fn test_health_at_root_and_prefix() {
    let fixture = TestFixture::new().await;

    let root = fixture.get("/health").await;
    assert_status!(root, StatusCode::OK);
    assert_eq!(root.body["status"], "ok");

    let prefixed = fixture.get("/api/health").await;
    assert_status!(prefixed, StatusCode::OK);
}

#[tokio::test]
async fn test_register_and_list_desks() {
    let fixture = TestFixture::new().await;

    let desk = fixture.register_desk("B").await;
    assert_eq!(desk["code"], "B");
    assert_eq!(desk["active"], true);
    assert_eq!(desk["queued"], 0);
    fixture.register_desk("A").await;

    let response = fixture.get("/desks").await;
    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["isSuccess"], true);
    let codes: Vec<_> = response.result().iter().map(|d| d["code"].clone()).collect();
    assert_eq!(codes, vec![json!("A"), json!("B")]);

    let response = fixture.get("/api/desks/A").await;
    assert_status!(response, StatusCode::OK);
    assert_eq!(response.item()["name"], "Desk A");
}

#[tokio::test]
async fn test_duplicate_desk_code_conflicts() {
    let fixture = TestFixture::new().await;
    fixture.register_desk("A").await;

    let response = fixture
        .post("/desks", json!({ "code": "A", "name": "Again" }))
        .await;
    assert_status!(response, StatusCode::CONFLICT);
    assert_eq!(response.body["isSuccess"], false);
    assert!(response.result().is_empty());
    assert!(response.error_message().starts_with("AlreadyExists:"));
}

#[tokio::test]
async fn test_edit_desk_with_id() {
    let fixture = TestFixture::new().await;
    let desk = fixture.register_desk("A").await;

    let response = fixture
        .post(
            "/desks",
            json!({ "id": desk["id"], "code": "A2", "name": "Renamed", "icon": "star" }),
        )
        .await;
    assert_status!(response, StatusCode::OK);
    let edited = response.item();
    assert_eq!(edited["id"], desk["id"]);
    assert_eq!(edited["code"], "A2");
    assert_eq!(edited["icon"], "star");

    let missing = fixture.get("/desks/A").await;
    assert_status!(missing, StatusCode::NOT_FOUND);
    assert!(missing.error_message().starts_with("NotFound:"));
}

#[tokio::test]
async fn test_claim_scenario() {
    let fixture = TestFixture::new().await;
    let desk = fixture.register_desk("D1").await;
    let desk_id = desk["id"].as_i64().unwrap();

    let empty = fixture
        .post("/desks/D1/claim", json!({ "operator": "op-1" }))
        .await;
    assert_status!(empty, StatusCode::CONFLICT);
    assert!(empty.error_message().starts_with("QueueEmpty:"));

    let ticket = fixture.issue_ticket(desk_id).await;
    assert_eq!(ticket["status"], "queued");
    assert_eq!(ticket["number"], 1);

    let claimed = fixture
        .post("/desks/D1/claim", json!({ "operator": "op-1" }))
        .await;
    assert_status!(claimed, StatusCode::OK);
    assert_eq!(claimed.item()["id"], ticket["id"]);
    assert_eq!(claimed.item()["status"], "in_progress");
    assert_eq!(claimed.item()["operator"], "op-1");

    let again = fixture
        .post("/desks/D1/claim", json!({ "operator": "op-2" }))
        .await;
    assert_status!(again, StatusCode::CONFLICT);
    assert!(again.error_message().starts_with("QueueEmpty:"));
}

#[tokio::test]
async fn test_claims_follow_issue_order() {
    let fixture = TestFixture::new().await;
    let desk = fixture.register_desk("D1").await;
    let desk_id = desk["id"].as_i64().unwrap();

    let mut issued = Vec::new();
    for _ in 0..3 {
        issued.push(fixture.issue_ticket(desk_id).await["id"].clone());
    }

    let backlog = fixture.get("/desks/D1/backlog").await;
    assert_status!(backlog, StatusCode::OK);
    let waiting: Vec<_> = backlog.result().iter().map(|t| t["id"].clone()).collect();
    assert_eq!(waiting, issued);

    for expected in &issued {
        let claimed = fixture
            .post("/desks/D1/claim", json!({ "operator": "op" }))
            .await;
        assert_eq!(&claimed.item()["id"], expected);
    }
}

#[tokio::test]
async fn test_deactivated_desk_refuses_claims() {
    let fixture = TestFixture::new().await;
    let desk = fixture.register_desk("D1").await;
    let desk_id = desk["id"].as_i64().unwrap();
    fixture.issue_ticket(desk_id).await;

    let response = fixture.post_empty("/desks/D1/deactivate").await;
    assert_status!(response, StatusCode::OK);
    assert_eq!(response.item()["active"], false);
    assert_eq!(response.item()["queued"], 1);

    let claim = fixture
        .post("/desks/D1/claim", json!({ "operator": "op-1" }))
        .await;
    assert_status!(claim, StatusCode::CONFLICT);
    assert!(claim.error_message().starts_with("DeskInactive:"));

    let active_only = fixture.get("/desks?active=true").await;
    assert!(active_only.result().is_empty());

    fixture.post_empty("/desks/D1/activate").await;
    let claim = fixture
        .post("/desks/D1/claim", json!({ "operator": "op-1" }))
        .await;
    assert_status!(claim, StatusCode::OK);
}

#[tokio::test]
async fn test_requeue_then_close() {
    let fixture = TestFixture::new().await;
    let desk = fixture.register_desk("D1").await;
    let desk_id = desk["id"].as_i64().unwrap();
    let first = fixture.issue_ticket(desk_id).await;
    fixture.issue_ticket(desk_id).await;

    fixture
        .post("/desks/D1/claim", json!({ "operator": "op-1" }))
        .await;

    let id = first["id"].as_i64().unwrap();
    let requeued = fixture.post_empty(&format!("/tickets/{}/requeue", id)).await;
    assert_status!(requeued, StatusCode::OK);
    assert_eq!(requeued.item()["status"], "queued");
    assert_eq!(requeued.item()["createdAt"], first["createdAt"]);

    // Back at the front of the line
    let claimed = fixture
        .post("/desks/D1/claim", json!({ "operator": "op-2" }))
        .await;
    assert_eq!(claimed.item()["id"], first["id"]);

    let closed = fixture.post_empty(&format!("/tickets/{}/close", id)).await;
    assert_status!(closed, StatusCode::OK);
    assert_eq!(closed.item()["status"], "closed");
    assert_eq!(closed.item()["closeReason"], "completed");

    let again = fixture.post_empty(&format!("/tickets/{}/close", id)).await;
    assert_status!(again, StatusCode::CONFLICT);
    assert!(again.error_message().starts_with("InvalidTransition:"));
}

#[tokio::test]
async fn test_cancel_removes_from_backlog() {
    let fixture = TestFixture::new().await;
    let desk = fixture.register_desk("D1").await;
    let ticket = fixture.issue_ticket(desk["id"].as_i64().unwrap()).await;
    let id = ticket["id"].as_i64().unwrap();

    let cancelled = fixture.post_empty(&format!("/tickets/{}/cancel", id)).await;
    assert_status!(cancelled, StatusCode::OK);
    assert_eq!(cancelled.item()["closeReason"], "cancelled");

    let backlog = fixture.get("/desks/D1/backlog").await;
    assert!(backlog.result().is_empty());

    let claim = fixture
        .post("/desks/D1/claim", json!({ "operator": "op-1" }))
        .await;
    assert!(claim.error_message().starts_with("QueueEmpty:"));
}

#[tokio::test]
async fn test_reassign_moves_ticket() {
    let fixture = TestFixture::new().await;
    let a = fixture.register_desk("A").await;
    fixture.register_desk("B").await;
    let ticket = fixture.issue_ticket(a["id"].as_i64().unwrap()).await;
    let id = ticket["id"].as_i64().unwrap();

    let moved = fixture
        .post(&format!("/tickets/{}/reassign", id), json!({ "deskCode": "B" }))
        .await;
    assert_status!(moved, StatusCode::OK);
    assert_ne!(moved.item()["deskId"], a["id"]);

    assert!(fixture.get("/desks/A/backlog").await.result().is_empty());
    assert_eq!(fixture.get("/desks/B/backlog").await.result().len(), 1);

    let claimed = fixture
        .post("/desks/B/claim", json!({ "operator": "op-b" }))
        .await;
    assert_eq!(claimed.item()["id"], ticket["id"]);
}

#[tokio::test]
async fn test_issue_for_unknown_or_inactive_desk() {
    let fixture = TestFixture::new().await;

    let unknown = fixture.post("/tickets", json!({ "deskId": 999 })).await;
    assert_status!(unknown, StatusCode::NOT_FOUND);

    let desk = fixture.register_desk("D1").await;
    fixture.post_empty("/desks/D1/deactivate").await;
    let inactive = fixture
        .post("/tickets", json!({ "deskId": desk["id"] }))
        .await;
    assert_status!(inactive, StatusCode::CONFLICT);
    assert!(inactive.error_message().starts_with("DeskInactive:"));
}

#[tokio::test]
async fn test_list_tickets_filters() {
    let fixture = TestFixture::new().await;
    let a = fixture.register_desk("A").await;
    let b = fixture.register_desk("B").await;
    fixture.issue_ticket(a["id"].as_i64().unwrap()).await;
    fixture.issue_ticket(a["id"].as_i64().unwrap()).await;
    fixture.issue_ticket(b["id"].as_i64().unwrap()).await;
    fixture
        .post("/desks/A/claim", json!({ "operator": "op" }))
        .await;

    let all = fixture.get("/tickets").await;
    assert_eq!(all.result().len(), 3);

    let at_a = fixture.get(&format!("/tickets?deskId={}", a["id"])).await;
    assert_eq!(at_a.result().len(), 2);

    let queued = fixture.get("/tickets?status=queued").await;
    assert_eq!(queued.result().len(), 2);

    let page = fixture.get("/tickets?limit=1&offset=1").await;
    assert_eq!(page.result().len(), 1);

    let bad = fixture.get("/tickets?status=sleeping").await;
    assert_status!(bad, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_malformed_requests() {
    let fixture = TestFixture::new().await;

    let bad_json = fixture.post_raw("/tickets", "{not json").await;
    assert_status!(bad_json, StatusCode::BAD_REQUEST);
    assert_eq!(bad_json.body["isSuccess"], false);

    let bad_id = fixture.get("/tickets/abc").await;
    assert_status!(bad_id, StatusCode::BAD_REQUEST);

    let missing = fixture.get("/tickets/42").await;
    assert_status!(missing, StatusCode::NOT_FOUND);
    assert!(missing.error_message().starts_with("NotFound:"));
}

#[tokio::test]
async fn test_blank_operator_rejected() {
    let fixture = TestFixture::new().await;
    let desk = fixture.register_desk("D1").await;
    fixture.issue_ticket(desk["id"].as_i64().unwrap()).await;

    let response = fixture
        .post("/desks/D1/claim", json!({ "operator": "  " }))
        .await;
    assert_status!(response, StatusCode::UNPROCESSABLE_ENTITY);

    // Still claimable
    assert_eq!(fixture.get("/desks/D1/backlog").await.result().len(), 1);
}

#[tokio::test]
async fn test_change_stream_sees_admission() {
    let fixture = TestFixture::new().await;
    let mut changes = fixture.state.notifier().subscribe();

    let desk = fixture.register_desk("D1").await;
    let ticket = fixture.issue_ticket(desk["id"].as_i64().unwrap()).await;

    let change = changes.recv().await.unwrap();
    assert_eq!(change.kind, ghiseu_core::ChangeKind::Created);
    assert_eq!(json!(change.ticket.id), ticket["id"]);
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let fixture = TestFixture::new().await;
    let desk = fixture.register_desk("D1").await;
    fixture.issue_ticket(desk["id"].as_i64().unwrap()).await;

    let request = axum::http::Request::builder()
        .uri("/metrics")
        .body(axum::body::Body::empty())
        .unwrap();
    let response = tower::ServiceExt::oneshot(fixture.router.clone(), request)
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = http_body_util::BodyExt::collect(response.into_body())
        .await
        .unwrap()
        .to_bytes();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("ghiseu_tickets_created_total"));
}
