use axum::{
    routing::{get, patch, post, put},
    Router,
};
use tower_http::cors::{Any, CorsLayer};

use crate::api::{handlers, state::AppState};

pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // System endpoints
        .route("/api/health", get(handlers::health_handler))
        // Arbitrage endpoints
        .route(
            "/api/arbitrages",
            get(handlers::list_arbitrages).post(handlers::create_arbitrage),
        )
        .route("/api/arbitrages/import", post(handlers::import_arbitrages))
        .route("/api/arbitrages/grouped", get(handlers::get_grouped_arbitrages))
        .route("/api/arbitrages/stats", get(handlers::get_arbitrage_stats))
        .route(
            "/api/arbitrages/match/:signature",
            get(handlers::get_match_arbitrages),
        )
        .route(
            "/api/arbitrages/add-to-bets",
            post(handlers::add_payload_to_bets),
        )
        .route(
            "/api/arbitrages/:id",
            get(handlers::get_arbitrage)
                .put(handlers::update_arbitrage)
                .delete(handlers::delete_arbitrage),
        )
        .route(
            "/api/arbitrages/:id/add-to-bets",
            post(handlers::add_arbitrage_to_bets),
        )
        // Bet endpoints
        .route("/api/bets", get(handlers::list_bets).post(handlers::create_bet))
        .route("/api/bets/stats", get(handlers::get_bet_stats))
        .route(
            "/api/bets/:id",
            get(handlers::get_bet)
                .put(handlers::update_bet)
                .delete(handlers::delete_bet),
        )
        // Sportsbook endpoints
        .route(
            "/api/sportsbooks",
            get(handlers::list_sportsbooks).post(handlers::create_sportsbook),
        )
        .route("/api/sportsbooks/active", get(handlers::list_active_sportsbooks))
        .route(
            "/api/sportsbooks/bulk-create",
            post(handlers::bulk_create_sportsbooks),
        )
        .route("/api/sportsbooks/stats", get(handlers::get_sportsbook_stats))
        .route(
            "/api/sportsbooks/:id",
            get(handlers::get_sportsbook)
                .put(handlers::update_sportsbook)
                .delete(handlers::delete_sportsbook),
        )
        .route(
            "/api/sportsbooks/:id/toggle-active",
            patch(handlers::toggle_sportsbook_active),
        )
        // Account endpoints
        .route(
            "/api/accounts",
            get(handlers::list_accounts).post(handlers::create_account),
        )
        .route("/api/accounts/stats", get(handlers::get_account_stats))
        .route(
            "/api/accounts/:id",
            get(handlers::get_account)
                .put(handlers::update_account)
                .delete(handlers::delete_account),
        )
        // Transaction endpoints
        .route(
            "/api/transactions",
            get(handlers::list_transactions).post(handlers::create_transaction),
        )
        .route("/api/transactions/stats", get(handlers::get_transaction_stats))
        .route(
            "/api/transactions/:id",
            put(handlers::update_transaction).delete(handlers::delete_transaction),
        )
        .fallback(handlers::not_found_handler)
        // Add state and CORS
        .with_state(state)
        .layer(cors)
}
