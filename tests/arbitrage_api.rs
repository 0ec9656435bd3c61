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

fn opportunity(signature: &str, profit: f64, market: &str) -> Value {
    json!({
        "match_signature": signature,
        "profit": profit,
        "kickoff_datetime": "2024-04-01 15:00:00",
        "combination_details": [
            {"name": "Home", "bookmaker": "Bet365", "odds": 2.2, "home_team": "A", "away_team": "B", "league": "Premier League", "market": market},
            {"name": "Draw", "bookmaker": "Unibet", "odds": 3.6, "home_team": "A", "away_team": "B", "league": "Premier League", "market": market},
            {"name": "Away", "bookmaker": "Pinnacle", "odds": 4.0, "home_team": "A", "away_team": "B", "league": "Premier League", "market": market}
        ]
    })
}

async fn seed(app: &Router, items: &[Value]) -> Vec<i64> {
    let mut ids = Vec::new();
    for item in items {
        let (status, body) = send(app, Method::POST, "/api/arbitrages", Some(item.clone())).await;
        assert_eq!(status, StatusCode::CREATED, "seed failed: {body}");
        ids.push(body["id"].as_i64().expect("created opportunity has an id"));
    }
    ids
}

#[tokio::test]
async fn grouped_view_collapses_signatures() {
    let app = test_app().await;
    seed(
        &app,
        &[
            opportunity("A vs B - Match Result", 2.5, "Match Result"),
            opportunity("A vs B - Match Result", 4.1, "Match Result"),
            opportunity("A vs B - Match Result", 1.9, "Match Result"),
            opportunity("C vs D - Match Result", 3.0, "Match Result"),
        ],
    )
    .await;

    let (status, body) = send(&app, Method::GET, "/api/arbitrages/grouped", None).await;
    assert_eq!(status, StatusCode::OK);

    let groups = body["groups"].as_array().unwrap();
    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0]["match_signature"], "A vs B - Match Result");
    assert_eq!(groups[0]["total_arbitrages"], 3);
    assert_eq!(groups[0]["best_arbitrage"]["profit"], 4.1);
    assert_eq!(groups[0]["max_profit"], 4.1);
    assert_eq!(groups[0]["min_profit"], 1.9);
    assert_eq!(groups[1]["total_arbitrages"], 1);
    assert_eq!(groups[1]["best_arbitrage"]["profit"], 3.0);
    assert_eq!(body["pagination"]["total"], 2);
    assert_eq!(body["pagination"]["has_next"], false);
}

#[tokio::test]
async fn grouped_view_paginates_groups() {
    let app = test_app().await;
    let items: Vec<Value> = (0..5)
        .map(|i| opportunity(&format!("Team{i} vs Other{i} - Totals"), 1.0 + i as f64, "Totals"))
        .collect();
    seed(&app, &items).await;

    let (_, first) = send(&app, Method::GET, "/api/arbitrages/grouped?per_page=2&page=1", None).await;
    let (_, last) = send(&app, Method::GET, "/api/arbitrages/grouped?per_page=2&page=3", None).await;
    let (_, beyond) = send(&app, Method::GET, "/api/arbitrages/grouped?per_page=2&page=9", None).await;

    assert_eq!(first["groups"].as_array().unwrap().len(), 2);
    assert_eq!(first["groups"][0]["best_arbitrage"]["profit"], 5.0);
    assert_eq!(first["pagination"]["total_pages"], 3);
    assert_eq!(first["pagination"]["has_next"], true);
    assert_eq!(first["pagination"]["has_prev"], false);

    assert_eq!(last["groups"].as_array().unwrap().len(), 1);
    assert_eq!(last["groups"][0]["best_arbitrage"]["profit"], 1.0);
    assert_eq!(last["pagination"]["has_next"], false);

    assert!(beyond["groups"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn stats_on_empty_ledger_are_zero() {
    let app = test_app().await;
    let (status, body) = send(&app, Method::GET, "/api/arbitrages/stats", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_opportunities"], 0);
    assert_eq!(body["average_profit"], 0.0);
    assert_eq!(body["most_common_market"], Value::Null);
}

#[tokio::test]
async fn stats_respect_filters() {
    let app = test_app().await;
    seed(
        &app,
        &[
            opportunity("A vs B - Match Result", 2.0, "Match Result"),
            opportunity("A vs B - Totals", 4.0, "Totals"),
            opportunity("C vs D - Totals", 6.0, "Totals"),
        ],
    )
    .await;

    let (_, all) = send(&app, Method::GET, "/api/arbitrages/stats", None).await;
    assert_eq!(all["total_opportunities"], 3);
    assert_eq!(all["average_profit"], 4.0);
    assert_eq!(all["most_common_market"], "Totals");

    let (_, filtered) = send(&app, Method::GET, "/api/arbitrages/stats?min_profit=3", None).await;
    assert_eq!(filtered["total_opportunities"], 2);
    assert_eq!(filtered["min_profit"], 4.0);
}

#[tokio::test]
async fn match_view_lists_every_market() {
    let app = test_app().await;
    seed(
        &app,
        &[
            opportunity("A vs B - Match Result", 2.0, "Match Result"),
            opportunity("A vs B - Match Result", 3.0, "Totals"),
        ],
    )
    .await;

    let (status, body) = send(
        &app,
        Method::GET,
        "/api/arbitrages/match/A%20vs%20B%20-%20Match%20Result",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_count"], 2);
    assert_eq!(body["arbitrages"][0]["profit"], 3.0);

    let (status, body) = send(&app, Method::GET, "/api/arbitrages/match/nothing", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "No arbitrages found for this match signature");
}

#[tokio::test]
async fn conversion_applies_partial_stake_overrides() {
    let app = test_app().await;
    let ids = seed(&app, &[opportunity("A vs B - Match Result", 2.5, "Match Result")]).await;

    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/api/arbitrages/{}/add-to-bets", ids[0]),
        Some(json!({"stakes": [{"stake": 50}, {"stake": 75}]})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["bets_created"], 3);
    assert_eq!(body["total_stake"], 225.0);
    assert_eq!(body["expected_profit_percentage"], 2.5);

    let stakes: Vec<f64> = body["bets"]
        .as_array()
        .unwrap()
        .iter()
        .map(|b| b["stake"].as_f64().unwrap())
        .collect();
    assert_eq!(stakes, vec![50.0, 75.0, 100.0]);
    assert_eq!(body["bets"][0]["event_name"], "A vs B");
    assert_eq!(body["bets"][0]["sportsbook"], "Bet365");

    let (_, books) = send(&app, Method::GET, "/api/sportsbooks", None).await;
    assert_eq!(books.as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn conversion_without_body_uses_default_stake() {
    let app = test_app().await;
    let ids = seed(&app, &[opportunity("A vs B - Match Result", 1.2, "Match Result")]).await;

    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/api/arbitrages/{}/add-to-bets", ids[0]),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["total_stake"], 300.0);
}

/// Bet fields that depend only on the legs and the request, not on the
/// row ids or the clock.
fn comparable(bet: &Value) -> Value {
    let mut bet = bet.clone();
    if let Some(fields) = bet.as_object_mut() {
        for volatile in ["id", "arbitrage_id", "date_placed"] {
            fields.remove(volatile);
        }
    }
    bet
}

#[tokio::test]
async fn both_conversion_routes_produce_the_same_bets() {
    let app = test_app().await;
    let stored = opportunity("A vs B - Match Result", 2.5, "Match Result");
    let ids = seed(&app, &[stored.clone()]).await;
    let request = json!({"stake": 40, "stakes": [{"stake": 55}]});

    let (status, by_id) = send(
        &app,
        Method::POST,
        &format!("/api/arbitrages/{}/add-to-bets", ids[0]),
        Some(request.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{by_id}");

    let mut payload = stored;
    for (key, value) in request.as_object().unwrap() {
        payload[key] = value.clone();
    }
    let (status, by_payload) =
        send(&app, Method::POST, "/api/arbitrages/add-to-bets", Some(payload)).await;
    assert_eq!(status, StatusCode::CREATED, "{by_payload}");

    let keys = |v: &Value| {
        let mut keys: Vec<String> = v.as_object().unwrap().keys().cloned().collect();
        keys.sort();
        keys
    };
    assert_eq!(keys(&by_id), keys(&by_payload));
    for field in ["message", "bets_created", "total_stake", "expected_profit_percentage"] {
        assert_eq!(by_id[field], by_payload[field], "{field}");
    }

    let from_id = by_id["bets"].as_array().unwrap();
    let from_payload = by_payload["bets"].as_array().unwrap();
    assert_eq!(from_id.len(), 3);
    assert_eq!(from_id.len(), from_payload.len());
    for (a, b) in from_id.iter().zip(from_payload) {
        assert_eq!(comparable(a), comparable(b));
    }
    assert_eq!(from_id[0]["arbitrage_id"], ids[0]);
    assert_eq!(from_payload[0]["arbitrage_id"], Value::Null);
    assert_eq!(by_payload["total_stake"], 135.0);
}

#[tokio::test]
async fn payload_conversion_applies_keyed_stakes_and_leg_accounts() {
    let app = test_app().await;
    let (status, account) = send(
        &app,
        Method::POST,
        "/api/accounts",
        Some(json!({"account_identifier": "jane@example.com", "name": "Jane"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{account}");

    let mut keyed = opportunity("A vs B - Match Result", 3.0, "Match Result");
    keyed["stake"] = json!(20);
    keyed["stakes"] = json!({"1": 60});
    keyed["account"] = json!("jane@example.com");
    let (status, body) = send(&app, Method::POST, "/api/arbitrages/add-to-bets", Some(keyed)).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let bets = body["bets"].as_array().unwrap();
    let stakes: Vec<f64> = bets.iter().map(|b| b["stake"].as_f64().unwrap()).collect();
    assert_eq!(stakes, vec![20.0, 60.0, 20.0]);
    assert!(bets.iter().all(|b| b["account_id"] == account["id"]));
    assert_eq!(
        bets[0]["notes"],
        "Added from arbitrage opportunity (Profit: 3.0%)"
    );

    let mut listed = opportunity("C vs D - Match Result", 1.5, "Match Result");
    listed["stakes"] = json!([{}, {"stake": 60, "account": "jane@example.com"}]);
    let (status, body) = send(&app, Method::POST, "/api/arbitrages/add-to-bets", Some(listed)).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let bets = body["bets"].as_array().unwrap();
    let accounts: Vec<&Value> = bets.iter().map(|b| &b["account"]).collect();
    assert_eq!(accounts, vec![&Value::Null, &json!("jane@example.com"), &Value::Null]);
    assert_eq!(bets[1]["account_name"], "Jane");
    assert_eq!(body["total_stake"], 260.0);
}

#[tokio::test]
async fn unknown_sort_key_falls_back_to_profit() {
    let app = test_app().await;
    seed(
        &app,
        &[
            opportunity("A vs B - Match Result", 1.0, "Match Result"),
            opportunity("C vs D - Match Result", 5.0, "Match Result"),
        ],
    )
    .await;

    let (status, body) =
        send(&app, Method::GET, "/api/arbitrages/grouped?sort_by=roi&sort_order=up", None).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["groups"][0]["best_arbitrage"]["profit"], 5.0);
}

#[tokio::test]
async fn conversion_is_all_or_nothing() {
    let app = test_app().await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/arbitrages/add-to-bets",
        Some(json!({
            "match_signature": "A vs B - Match Result",
            "profit": 2.0,
            "combination_details": [
                {"name": "Home", "bookmaker": "Bet365", "odds": 2.1},
                {"name": "Away", "bookmaker": "NewBook", "odds": "not-a-number"}
            ]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("odds"));

    let (_, bets) = send(&app, Method::GET, "/api/bets", None).await;
    assert!(bets.as_array().unwrap().is_empty());
    let (_, books) = send(&app, Method::GET, "/api/sportsbooks", None).await;
    assert!(books.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn import_skips_repeats() {
    let app = test_app().await;
    let batch = json!([
        opportunity("A vs B - Match Result", 2.0, "Match Result"),
        opportunity("A vs B - Match Result", 2.0, "Match Result"),
        {"profit": "oops"}
    ]);

    let (status, body) = send(&app, Method::POST, "/api/arbitrages/import", Some(batch)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["imported"], 1);
    assert_eq!(body["skipped"], 1);
    assert_eq!(body["failed"], 1);

    let (_, list) = send(&app, Method::GET, "/api/arbitrages", None).await;
    assert_eq!(list.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn missing_and_malformed_ids() {
    let app = test_app().await;

    let (status, body) = send(&app, Method::GET, "/api/arbitrages/abc", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid id: abc");

    let (status, _) = send(&app, Method::GET, "/api/arbitrages/77", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(&app, Method::GET, "/api/nowhere", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].is_string());
}
