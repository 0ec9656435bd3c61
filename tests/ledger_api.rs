use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use betledger::{
    adapters::LedgerStore,
    api::{create_router, AppState},
    config::AppConfig,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

async fn test_app() -> Router {
    let store = LedgerStore::in_memory()
        .await
        .expect("in-memory store should migrate");
    create_router(AppState::new(Arc::new(store), Arc::new(AppConfig::in_memory())))
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string())),
        None => builder.body(Body::empty()),
    }
    .expect("request should build");

    let response = app
        .clone()
        .oneshot(request)
        .await
        .expect("router should respond");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body should be readable");
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("body should be JSON")
    };
    (status, value)
}

async fn place_bet(
    app: &Router,
    sportsbook: &str,
    account: Option<&str>,
    odds: f64,
    stake: f64,
) -> Value {
    let (status, body) = send(
        app,
        Method::POST,
        "/api/bets",
        Some(json!({
            "event_name": "Arsenal vs Chelsea",
            "bet_type": "Match Result",
            "selection": "Arsenal",
            "sportsbook": sportsbook,
            "account": account,
            "odds": odds,
            "stake": stake
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body
}

async fn create(app: &Router, uri: &str, body: Value) -> Value {
    let (status, created) = send(app, Method::POST, uri, Some(body)).await;
    assert_eq!(status, StatusCode::CREATED, "{created}");
    created
}

#[tokio::test]
async fn sportsbook_update_rejects_duplicate_names() {
    let app = test_app().await;
    let pinnacle = create(&app, "/api/sportsbooks", json!({"name": "Pinnacle"})).await;
    create(&app, "/api/sportsbooks", json!({"name": "Bet365"})).await;
    let uri = format!("/api/sportsbooks/{}", pinnacle["id"]);

    let (status, body) = send(&app, Method::PUT, &uri, Some(json!({"name": "BET365"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "A sportsbook with this name already exists");

    let (status, body) = send(
        &app,
        Method::PUT,
        &uri,
        Some(json!({"name": " Pinnacle Sports ", "country": "  ", "is_active": false})),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["name"], "Pinnacle Sports");
    assert_eq!(body["country"], Value::Null);
    assert_eq!(body["is_active"], false);

    // Renaming to a different case of its own name is allowed
    let (status, body) = send(&app, Method::PUT, &uri, Some(json!({"name": "PINNACLE SPORTS"}))).await;
    assert_eq!(status, StatusCode::OK, "{body}");

    let (status, _) = send(&app, Method::PUT, "/api/sportsbooks/99", Some(json!({"name": "X"}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn sportsbook_toggle_flips_active_flag() {
    let app = test_app().await;
    let book = create(&app, "/api/sportsbooks", json!({"name": "Unibet"})).await;
    let uri = format!("/api/sportsbooks/{}/toggle-active", book["id"]);

    let (status, body) = send(&app, Method::PATCH, &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Sportsbook deactivated successfully");
    assert_eq!(body["sportsbook"]["is_active"], false);

    let (_, active) = send(&app, Method::GET, "/api/sportsbooks/active", None).await;
    assert!(active.as_array().unwrap().is_empty());

    let (_, body) = send(&app, Method::PATCH, &uri, None).await;
    assert_eq!(body["message"], "Sportsbook activated successfully");
    assert_eq!(body["sportsbook"]["is_active"], true);
}

#[tokio::test]
async fn sportsbook_bulk_create_skips_existing_names() {
    let app = test_app().await;
    create(&app, "/api/sportsbooks", json!({"name": "Betfair"})).await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/sportsbooks/bulk-create",
        Some(json!({"sportsbooks": [
            {"name": "betfair"},
            {"name": " Betway ", "country": "UK"},
            {"display_name": "no name"},
            {"name": "BETWAY"}
        ]})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["message"], "Successfully created 1 sportsbooks");
    assert_eq!(body["created_count"], 1);
    assert_eq!(body["skipped_count"], 2);
    assert_eq!(body["skipped_names"], json!(["betfair", "BETWAY"]));
    assert_eq!(body["created_sportsbooks"][0]["name"], "Betway");

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/sportsbooks/bulk-create",
        Some(json!({"sportsbooks": []})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No sportsbooks data provided");
}

#[tokio::test]
async fn sportsbook_stats_rank_by_bet_count() {
    let app = test_app().await;
    place_bet(&app, "Bet365", None, 2.0, 10.0).await;
    place_bet(&app, "Pinnacle", None, 2.0, 20.0).await;
    place_bet(&app, "Pinnacle", None, 3.0, 30.0).await;
    create(&app, "/api/sportsbooks", json!({"name": "Idle", "is_active": false})).await;

    let (status, stats) = send(&app, Method::GET, "/api/sportsbooks/stats", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["total_sportsbooks"], 3);
    assert_eq!(stats["active_sportsbooks"], 2);
    assert_eq!(stats["inactive_sportsbooks"], 1);

    let top = stats["top_used_sportsbooks"].as_array().unwrap();
    assert_eq!(top.len(), 2);
    assert_eq!(top[0]["sportsbook_name"], "Pinnacle");
    assert_eq!(top[0]["bet_count"], 2);
    assert_eq!(top[0]["total_stake"], 50.0);
    assert_eq!(top[0]["avg_odds"], 2.5);
    assert_eq!(top[0]["is_registered"], true);
    assert_eq!(top[1]["sportsbook_name"], "Bet365");
}

#[tokio::test]
async fn account_update_checks_uniqueness_and_redetects_type() {
    let app = test_app().await;
    let jane = create(
        &app,
        "/api/accounts",
        json!({"account_identifier": "jane@example.com", "name": "Jane"}),
    )
    .await;
    create(
        &app,
        "/api/accounts",
        json!({"account_identifier": "joe@example.com", "name": "Joe"}),
    )
    .await;
    let uri = format!("/api/accounts/{}", jane["id"]);

    let (status, body) = send(&app, Method::PUT, &uri, Some(json!({"name": "Joe"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Account with this name already exists");

    let (status, body) = send(
        &app,
        Method::PUT,
        &uri,
        Some(json!({"account_identifier": "joe@example.com"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Account with this identifier already exists");

    let (status, body) = send(&app, Method::PUT, &uri, Some(json!({"account_identifier": "  "}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "account_identifier cannot be empty");

    let (status, body) = send(
        &app,
        Method::PUT,
        &uri,
        Some(json!({"account_identifier": "+44 7700 900123", "name": "Jane", "notes": " mobile "})),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["account_type"], "phone");
    assert_eq!(body["notes"], "mobile");

    let (_, stats) = send(&app, Method::GET, "/api/accounts/stats", None).await;
    assert_eq!(
        stats,
        json!({
            "total_accounts": 2,
            "active_accounts": 2,
            "inactive_accounts": 0,
            "email_accounts": 1,
            "phone_accounts": 1
        })
    );
}

#[tokio::test]
async fn account_delete_detaches_bets() {
    let app = test_app().await;
    let account = create(
        &app,
        "/api/accounts",
        json!({"account_identifier": "jane@example.com", "name": "Jane"}),
    )
    .await;
    let bet = place_bet(&app, "Bet365", Some("jane@example.com"), 2.0, 10.0).await;
    assert_eq!(bet["account_id"], account["id"]);

    let uri = format!("/api/accounts/{}", account["id"]);
    let (status, body) = send(&app, Method::DELETE, &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Account deleted successfully");

    let (_, kept) = send(&app, Method::GET, &format!("/api/bets/{}", bet["id"]), None).await;
    assert_eq!(kept["account_id"], Value::Null);

    let (status, _) = send(&app, Method::DELETE, &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn transaction_update_and_stats() {
    let app = test_app().await;
    let deposit = create(
        &app,
        "/api/transactions",
        json!({"transaction_type": "deposit", "sportsbook": "Bet365", "amount": 200, "tax": 4}),
    )
    .await;
    create(
        &app,
        "/api/transactions",
        json!({"transaction_type": "withdrawal", "sportsbook": "Pinnacle", "amount": 90, "transaction_charges": 1.5}),
    )
    .await;
    let pending = create(
        &app,
        "/api/transactions",
        json!({"transaction_type": "withdrawal", "sportsbook": "Bet365", "amount": 300, "status": "pending"}),
    )
    .await;
    assert_eq!(pending["date_processed"], Value::Null);

    let (status, body) = send(
        &app,
        Method::PUT,
        &format!("/api/transactions/{}", deposit["id"]),
        Some(json!({"amount": -1})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Amount must be greater than 0");

    let (_, stats) = send(&app, Method::GET, "/api/transactions/stats", None).await;
    assert_eq!(stats["total_transactions"], 2);
    assert_eq!(stats["net_position"], -115.5);

    let (status, completed) = send(
        &app,
        Method::PUT,
        &format!("/api/transactions/{}", pending["id"]),
        Some(json!({"status": "completed", "amount": "250"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{completed}");
    assert!(completed["date_processed"].is_string());

    let (status, stats) = send(&app, Method::GET, "/api/transactions/stats?sportsbook=bet", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["total_transactions"], 2);
    assert_eq!(stats["total_deposits"], 200.0);
    assert_eq!(stats["total_withdrawals"], 250.0);
    assert_eq!(stats["net_position"], 46.0);
    assert_eq!(stats["sportsbook_breakdown"]["Bet365"]["net"], -50.0);
    assert!(stats["sportsbook_breakdown"].get("Pinnacle").is_none());

    let (status, body) =
        send(&app, Method::GET, "/api/transactions/stats?start_date=yesterday", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid start_date format");

    let (status, _) = send(&app, Method::PUT, "/api/transactions/404", Some(json!({"notes": "x"}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
