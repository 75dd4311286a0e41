//! Dashboard API router — mounts every `/api` endpoint behind the dev auth layer.

use crate::auth;
use crate::handlers::{self, ManagementState};
use axum::middleware;
use axum::routing::{get, patch, post};
use axum::Router;

/// Build the API router. Merge it into the main app; probes and docs are
/// mounted by the server.
pub fn management_router(state: ManagementState) -> Router {
    Router::new()
        // Auth
        .route("/api/auth/login", post(handlers::handle_login))
        .route("/api/auth/me", get(handlers::current_user_info))
        // Customers
        .route("/api/customers", get(handlers::list_customers).post(handlers::create_customer))
        .route(
            "/api/customers/:id",
            get(handlers::get_customer)
                .put(handlers::update_customer)
                .delete(handlers::delete_customer),
        )
        // Orders
        .route("/api/orders", get(handlers::list_orders).post(handlers::create_order))
        .route("/api/orders/:id", get(handlers::get_order))
        .route("/api/orders/:id/status", patch(handlers::update_order_status))
        .route("/api/orders/customer/:customer_id", get(handlers::orders_for_customer))
        // Campaigns
        .route("/api/campaigns", get(handlers::list_campaigns).post(handlers::create_campaign))
        .route("/api/campaigns/preview", post(handlers::preview_audience))
        .route("/api/campaigns/:id", get(handlers::get_campaign))
        .route("/api/campaigns/:id/activate", post(handlers::activate_campaign))
        .route("/api/campaigns/:id/cancel", post(handlers::cancel_campaign))
        .route("/api/campaigns/:id/stats", get(handlers::campaign_stats))
        .route("/api/campaigns/:id/logs", get(handlers::campaign_logs))
        // Vendor webhook
        .route("/api/receipt", post(handlers::handle_receipt))
        // Assistant
        .route("/api/ai/convert-rules", post(handlers::convert_rules))
        .route("/api/ai/generate-message", post(handlers::generate_message))
        .layer(middleware::from_fn_with_state(state.clone(), auth::auth_middleware))
        .with_state(state)
}
