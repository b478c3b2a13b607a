//! Route definitions for the parts ledger API

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};

use crate::{handlers, middleware::auth_middleware, AppState};

/// Create API routes; every group sits behind the bearer-token check
pub fn api_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .nest("/inventory", inventory_routes(state))
        .nest("/purchase-orders", purchase_order_routes(state))
        .nest("/sales-orders", sales_order_routes(state))
}

/// Inventory routes (protected)
fn inventory_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_inventory).post(handlers::create_inventory),
        )
        .route("/:id", put(handlers::adjust_inventory))
        .route("/product/:product_id", get(handlers::get_product_inventory))
        .route(
            "/products/:product_id/available",
            get(handlers::get_available),
        )
        // Low stock
        .route("/alerts/low-stock", get(handlers::list_low_stock))
        .route("/alerts/threshold", post(handlers::set_threshold))
        .route("/alerts/check", post(handlers::check_low_stock))
        .route("/reorder-suggestions", get(handlers::reorder_suggestions))
        // Warehouses
        .route(
            "/warehouses",
            get(handlers::list_warehouses).post(handlers::create_warehouse),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
}

/// Purchase order routes (protected)
fn purchase_order_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_purchase_orders).post(handlers::create_purchase_order),
        )
        .route("/:id", get(handlers::get_purchase_order))
        .route("/:id/approve", put(handlers::approve_purchase_order))
        .route("/:id/status", put(handlers::update_purchase_order_status))
        .route("/:id/receive", post(handlers::receive_purchase_order))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
}

/// Sales order routes (protected)
fn sales_order_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_sales_orders).post(handlers::create_sales_order),
        )
        .route("/:id", get(handlers::get_sales_order))
        .route("/:id/approve", put(handlers::approve_sales_order))
        .route("/:id/status", put(handlers::update_sales_order_status))
        .route("/:id/process", put(handlers::process_sales_order))
        .route("/:id/return", post(handlers::create_return))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
}
