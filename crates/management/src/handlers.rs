//! Axum REST handlers for the dashboard API.

use crate::auth::{AuthUser, SessionStore};
use crate::models::*;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use crm_ai::{CampaignAssistant, HeuristicAssistant};
use crm_core::config::{AppConfig, AuthConfig};
use crm_core::event_bus::{make_event, EventSink, EventType};
use crm_core::repository::CampaignRepository;
use crm_core::types::{CampaignInput, CustomerInput, CustomerPatch, DeliveryReceipt, OrderInput, ReceiptOutcome};
use crm_core::{CrmError, CrmResult};
use crm_delivery::{DeliverySimulator, ReceiptAggregator, StatsReporter};
use crm_segmentation::AudienceEngine;
use crm_store::MemoryStore;
use std::sync::Arc;
use tracing::{debug, error, info};
use uuid::Uuid;

/// Shared management state.
#[derive(Clone)]
pub struct ManagementState {
    pub store: Arc<MemoryStore>,
    pub audience: Arc<AudienceEngine>,
    pub simulator: Arc<DeliverySimulator>,
    pub receipts: Arc<ReceiptAggregator>,
    pub stats: Arc<StatsReporter>,
    pub assistant: Arc<dyn CampaignAssistant>,
    pub sessions: Arc<SessionStore>,
    pub events: Arc<dyn EventSink>,
    pub auth: AuthConfig,
}

impl ManagementState {
    /// Wire the delivery pipeline over `store`, reporting domain events to `events`.
    pub fn new(
        config: &AppConfig,
        store: Arc<MemoryStore>,
        events: Arc<dyn EventSink>,
    ) -> CrmResult<Self> {
        let audience = Arc::new(AudienceEngine::new(store.clone()));
        let receipts =
            Arc::new(ReceiptAggregator::new(store.clone()).with_event_sink(events.clone()));
        let simulator = DeliverySimulator::new(
            audience.clone(),
            store.clone(),
            receipts.clone(),
            config.delivery.clone(),
        )?
        .with_event_sink(events.clone());
        Ok(Self {
            stats: Arc::new(StatsReporter::new(store.clone())),
            store,
            audience,
            simulator: Arc::new(simulator),
            receipts,
            assistant: Arc::new(HeuristicAssistant::new()),
            sessions: Arc::new(SessionStore::new()),
            events,
            auth: config.auth.clone(),
        })
    }
}

pub type ApiError = (StatusCode, Json<ErrorResponse>);
pub type ApiResult<T> = Result<T, ApiError>;

/// Map a domain error onto an HTTP status and error body.
pub fn error_response(err: CrmError) -> ApiError {
    let (status, code) = match &err {
        CrmError::NotFound { .. } => (StatusCode::NOT_FOUND, "not_found"),
        CrmError::InvalidState { .. } => (StatusCode::CONFLICT, "invalid_state"),
        CrmError::Conflict(_) => (StatusCode::CONFLICT, "conflict"),
        CrmError::Validation(_) => (StatusCode::BAD_REQUEST, "validation_failed"),
        CrmError::Serialization(_) => (StatusCode::BAD_REQUEST, "invalid_payload"),
        CrmError::Config(_) | CrmError::Internal(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "internal_error")
        }
    };
    if status.is_server_error() {
        error!(error = %err, "Request failed");
    } else {
        debug!(error = %err, status = status.as_u16(), "Request rejected");
    }
    (
        status,
        Json(ErrorResponse {
            error: code.to_string(),
            message: err.to_string(),
        }),
    )
}

fn current_user(user: Option<Extension<AuthUser>>) -> String {
    user.map(|Extension(AuthUser(name))| name)
        .unwrap_or_else(|| "admin".to_string())
}

// ─── Auth ──────────────────────────────────────────────────────────────────

#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "Auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Bearer token issued", body = LoginResponse),
        (status = 401, description = "Invalid credentials", body = ErrorResponse),
    )
)]
pub async fn handle_login(
    State(state): State<ManagementState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    match state.sessions.login(&state.auth, &req) {
        Ok(resp) => {
            info!(user = %resp.user, "User logged in");
            metrics::counter!("crm.auth.logins", "result" => "ok").increment(1);
            Ok(Json(resp))
        }
        Err(msg) => {
            metrics::counter!("crm.auth.logins", "result" => "rejected").increment(1);
            Err((
                StatusCode::UNAUTHORIZED,
                Json(ErrorResponse {
                    error: "auth_failed".to_string(),
                    message: msg,
                }),
            ))
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/auth/me",
    tag = "Auth",
    responses((status = 200, description = "Current user", body = CurrentUserResponse))
)]
pub async fn current_user_info(user: Option<Extension<AuthUser>>) -> Json<CurrentUserResponse> {
    Json(CurrentUserResponse {
        user: CurrentUser {
            username: current_user(user),
        },
    })
}

// ─── Customers ─────────────────────────────────────────────────────────────

#[utoipa::path(
    get,
    path = "/api/customers",
    tag = "Customers",
    responses((status = 200, description = "All customers", body = CustomerListResponse))
)]
pub async fn list_customers(State(state): State<ManagementState>) -> Json<CustomerListResponse> {
    Json(CustomerListResponse {
        customers: state.store.list_customers(),
    })
}

#[utoipa::path(
    get,
    path = "/api/customers/{id}",
    tag = "Customers",
    params(("id" = Uuid, Path, description = "Customer id")),
    responses(
        (status = 200, description = "Customer", body = CustomerResponse),
        (status = 404, description = "Not found", body = ErrorResponse),
    )
)]
pub async fn get_customer(
    State(state): State<ManagementState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<CustomerResponse>> {
    state
        .store
        .get_customer(id)
        .map(|customer| {
            Json(CustomerResponse {
                customer,
                message: None,
            })
        })
        .ok_or_else(|| error_response(CrmError::not_found("customer", id)))
}

#[utoipa::path(
    post,
    path = "/api/customers",
    tag = "Customers",
    request_body = CustomerInput,
    responses(
        (status = 201, description = "Customer created", body = CustomerResponse),
        (status = 400, description = "Invalid customer", body = ErrorResponse),
        (status = 409, description = "Email already registered", body = ErrorResponse),
    )
)]
pub async fn create_customer(
    State(state): State<ManagementState>,
    Json(req): Json<CustomerInput>,
) -> ApiResult<(StatusCode, Json<CustomerResponse>)> {
    let customer = state.store.create_customer(req).map_err(error_response)?;
    metrics::counter!("crm.customers.created").increment(1);
    Ok((
        StatusCode::CREATED,
        Json(CustomerResponse {
            customer,
            message: Some("Customer created successfully".to_string()),
        }),
    ))
}

#[utoipa::path(
    put,
    path = "/api/customers/{id}",
    tag = "Customers",
    params(("id" = Uuid, Path, description = "Customer id")),
    request_body = CustomerPatch,
    responses(
        (status = 200, description = "Customer updated", body = CustomerResponse),
        (status = 404, description = "Not found", body = ErrorResponse),
        (status = 409, description = "Email already registered", body = ErrorResponse),
    )
)]
pub async fn update_customer(
    State(state): State<ManagementState>,
    Path(id): Path<Uuid>,
    Json(req): Json<CustomerPatch>,
) -> ApiResult<Json<CustomerResponse>> {
    let customer = state.store.update_customer(id, req).map_err(error_response)?;
    Ok(Json(CustomerResponse {
        customer,
        message: Some("Customer updated successfully".to_string()),
    }))
}

#[utoipa::path(
    delete,
    path = "/api/customers/{id}",
    tag = "Customers",
    params(("id" = Uuid, Path, description = "Customer id")),
    responses(
        (status = 200, description = "Customer deleted", body = MessageResponse),
        (status = 404, description = "Not found", body = ErrorResponse),
    )
)]
pub async fn delete_customer(
    State(state): State<ManagementState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<MessageResponse>> {
    if state.store.delete_customer(id) {
        metrics::counter!("crm.customers.deleted").increment(1);
        Ok(Json(MessageResponse {
            message: "Customer deleted successfully".to_string(),
        }))
    } else {
        Err(error_response(CrmError::not_found("customer", id)))
    }
}

// ─── Orders ────────────────────────────────────────────────────────────────

#[utoipa::path(
    get,
    path = "/api/orders",
    tag = "Orders",
    responses((status = 200, description = "All orders", body = OrderListResponse))
)]
pub async fn list_orders(State(state): State<ManagementState>) -> Json<OrderListResponse> {
    Json(OrderListResponse {
        orders: state.store.list_orders(),
    })
}

#[utoipa::path(
    get,
    path = "/api/orders/{id}",
    tag = "Orders",
    params(("id" = Uuid, Path, description = "Order id")),
    responses(
        (status = 200, description = "Order", body = OrderResponse),
        (status = 404, description = "Not found", body = ErrorResponse),
    )
)]
pub async fn get_order(
    State(state): State<ManagementState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<OrderResponse>> {
    state
        .store
        .get_order(id)
        .map(|order| Json(OrderResponse { order, message: None }))
        .ok_or_else(|| error_response(CrmError::not_found("order", id)))
}

#[utoipa::path(
    get,
    path = "/api/orders/customer/{customer_id}",
    tag = "Orders",
    params(("customer_id" = Uuid, Path, description = "Customer id")),
    responses(
        (status = 200, description = "Orders placed by the customer", body = OrderListResponse),
        (status = 404, description = "Customer not found", body = ErrorResponse),
    )
)]
pub async fn orders_for_customer(
    State(state): State<ManagementState>,
    Path(customer_id): Path<Uuid>,
) -> ApiResult<Json<OrderListResponse>> {
    if state.store.get_customer(customer_id).is_none() {
        return Err(error_response(CrmError::not_found("customer", customer_id)));
    }
    Ok(Json(OrderListResponse {
        orders: state.store.orders_for_customer(customer_id),
    }))
}

#[utoipa::path(
    post,
    path = "/api/orders",
    tag = "Orders",
    request_body = OrderInput,
    responses(
        (status = 201, description = "Order created", body = OrderResponse),
        (status = 400, description = "Invalid order", body = ErrorResponse),
        (status = 404, description = "Customer not found", body = ErrorResponse),
    )
)]
pub async fn create_order(
    State(state): State<ManagementState>,
    Json(req): Json<OrderInput>,
) -> ApiResult<(StatusCode, Json<OrderResponse>)> {
    let order = state.store.create_order(req).map_err(error_response)?;
    metrics::counter!("crm.orders.created").increment(1);
    Ok((
        StatusCode::CREATED,
        Json(OrderResponse {
            order,
            message: Some("Order created successfully".to_string()),
        }),
    ))
}

#[utoipa::path(
    patch,
    path = "/api/orders/{id}/status",
    tag = "Orders",
    params(("id" = Uuid, Path, description = "Order id")),
    request_body = OrderStatusRequest,
    responses(
        (status = 200, description = "Order status updated", body = OrderResponse),
        (status = 404, description = "Not found", body = ErrorResponse),
    )
)]
pub async fn update_order_status(
    State(state): State<ManagementState>,
    Path(id): Path<Uuid>,
    Json(req): Json<OrderStatusRequest>,
) -> ApiResult<Json<OrderResponse>> {
    let order = state
        .store
        .update_order_status(id, req.status)
        .map_err(error_response)?;
    Ok(Json(OrderResponse {
        order,
        message: Some("Order status updated successfully".to_string()),
    }))
}

// ─── Campaigns ─────────────────────────────────────────────────────────────

#[utoipa::path(
    get,
    path = "/api/campaigns",
    tag = "Campaigns",
    responses((status = 200, description = "All campaigns", body = CampaignListResponse))
)]
pub async fn list_campaigns(State(state): State<ManagementState>) -> Json<CampaignListResponse> {
    Json(CampaignListResponse {
        campaigns: state.store.list_campaigns(),
    })
}

#[utoipa::path(
    get,
    path = "/api/campaigns/{id}",
    tag = "Campaigns",
    params(("id" = Uuid, Path, description = "Campaign id")),
    responses(
        (status = 200, description = "Campaign", body = CampaignResponse),
        (status = 404, description = "Not found", body = ErrorResponse),
    )
)]
pub async fn get_campaign(
    State(state): State<ManagementState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<CampaignResponse>> {
    state
        .store
        .get_campaign(id)
        .map(|campaign| {
            Json(CampaignResponse {
                campaign,
                message: None,
            })
        })
        .ok_or_else(|| error_response(CrmError::not_found("campaign", id)))
}

#[utoipa::path(
    post,
    path = "/api/campaigns",
    tag = "Campaigns",
    request_body = CampaignInput,
    responses(
        (status = 201, description = "Draft campaign created", body = CampaignResponse),
        (status = 400, description = "Invalid campaign", body = ErrorResponse),
    )
)]
pub async fn create_campaign(
    State(state): State<ManagementState>,
    user: Option<Extension<AuthUser>>,
    Json(req): Json<CampaignInput>,
) -> ApiResult<(StatusCode, Json<CampaignResponse>)> {
    let campaign = state
        .store
        .create_campaign(req, &current_user(user))
        .map_err(error_response)?;
    metrics::counter!("crm.campaigns.created").increment(1);
    Ok((
        StatusCode::CREATED,
        Json(CampaignResponse {
            campaign,
            message: Some("Campaign created successfully".to_string()),
        }),
    ))
}

#[utoipa::path(
    post,
    path = "/api/campaigns/preview",
    tag = "Campaigns",
    request_body = PreviewRequest,
    responses((status = 200, description = "Matching audience size", body = PreviewResponse))
)]
pub async fn preview_audience(
    State(state): State<ManagementState>,
    Json(req): Json<PreviewRequest>,
) -> Json<PreviewResponse> {
    Json(PreviewResponse {
        audience_count: state.audience.preview_count(&req.rules),
    })
}

#[utoipa::path(
    post,
    path = "/api/campaigns/{id}/activate",
    tag = "Campaigns",
    params(("id" = Uuid, Path, description = "Campaign id")),
    responses(
        (status = 200, description = "Campaign activated and sends scheduled", body = ActivateResponse),
        (status = 404, description = "Not found", body = ErrorResponse),
        (status = 409, description = "Campaign is not a draft", body = ErrorResponse),
    )
)]
pub async fn activate_campaign(
    State(state): State<ManagementState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ActivateResponse>> {
    let summary = state.simulator.activate(id).map_err(error_response)?;
    Ok(Json(ActivateResponse {
        message: format!(
            "Campaign activated, sending to {} customers",
            summary.audience_size
        ),
        audience_size: summary.audience_size,
        log_entries_created: summary.log_entries_created,
    }))
}

#[utoipa::path(
    post,
    path = "/api/campaigns/{id}/cancel",
    tag = "Campaigns",
    params(("id" = Uuid, Path, description = "Campaign id")),
    responses(
        (status = 200, description = "Campaign cancelled", body = CampaignResponse),
        (status = 404, description = "Not found", body = ErrorResponse),
        (status = 409, description = "Campaign already finished", body = ErrorResponse),
    )
)]
pub async fn cancel_campaign(
    State(state): State<ManagementState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<CampaignResponse>> {
    let campaign = state.store.cancel_campaign(id).map_err(error_response)?;
    metrics::counter!("crm.campaigns.cancelled").increment(1);
    state
        .events
        .emit(make_event(EventType::CampaignCancelled, id, None, None));
    Ok(Json(CampaignResponse {
        campaign,
        message: Some("Campaign cancelled".to_string()),
    }))
}

#[utoipa::path(
    get,
    path = "/api/campaigns/{id}/stats",
    tag = "Campaigns",
    params(("id" = Uuid, Path, description = "Campaign id")),
    responses(
        (status = 200, description = "Delivery statistics", body = StatsResponse),
        (status = 404, description = "Not found", body = ErrorResponse),
    )
)]
pub async fn campaign_stats(
    State(state): State<ManagementState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<StatsResponse>> {
    state
        .stats
        .get_stats(id)
        .map(|stats| Json(StatsResponse { stats }))
        .ok_or_else(|| error_response(CrmError::not_found("campaign", id)))
}

#[utoipa::path(
    get,
    path = "/api/campaigns/{id}/logs",
    tag = "Campaigns",
    params(("id" = Uuid, Path, description = "Campaign id")),
    responses(
        (status = 200, description = "Per-recipient delivery log", body = DeliveryLogsResponse),
        (status = 404, description = "Not found", body = ErrorResponse),
    )
)]
pub async fn campaign_logs(
    State(state): State<ManagementState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<DeliveryLogsResponse>> {
    if state.store.get_campaign(id).is_none() {
        return Err(error_response(CrmError::not_found("campaign", id)));
    }
    Ok(Json(DeliveryLogsResponse {
        logs: state.store.delivery_logs(id),
    }))
}

// ─── Vendor receipts ───────────────────────────────────────────────────────

#[utoipa::path(
    post,
    path = "/api/receipt",
    tag = "Delivery",
    request_body = DeliveryReceipt,
    responses(
        (status = 200, description = "Receipt applied", body = ReceiptResponse),
        (status = 202, description = "Duplicate or unknown receipt ignored", body = ReceiptResponse),
    )
)]
pub async fn handle_receipt(
    State(state): State<ManagementState>,
    Json(receipt): Json<DeliveryReceipt>,
) -> (StatusCode, Json<ReceiptResponse>) {
    let (status, result, campaign_completed) = match state.receipts.record_receipt(&receipt) {
        ReceiptOutcome::Applied { completed } => (StatusCode::OK, ReceiptResult::Applied, completed),
        ReceiptOutcome::Duplicate => (StatusCode::ACCEPTED, ReceiptResult::Duplicate, false),
        ReceiptOutcome::Unknown => (StatusCode::ACCEPTED, ReceiptResult::Ignored, false),
    };
    (
        status,
        Json(ReceiptResponse {
            result,
            campaign_completed,
        }),
    )
}

// ─── Assistant ─────────────────────────────────────────────────────────────

#[utoipa::path(
    post,
    path = "/api/ai/convert-rules",
    tag = "Assistant",
    request_body = ConvertRulesRequest,
    responses(
        (status = 200, description = "Rule-set derived from the description", body = ConvertRulesResponse),
        (status = 400, description = "No rule could be derived", body = ErrorResponse),
    )
)]
pub async fn convert_rules(
    State(state): State<ManagementState>,
    Json(req): Json<ConvertRulesRequest>,
) -> ApiResult<Json<ConvertRulesResponse>> {
    let rules = state
        .assistant
        .convert_rules(&req.description)
        .map_err(error_response)?;
    Ok(Json(ConvertRulesResponse {
        description: req.description,
        rules,
    }))
}

#[utoipa::path(
    post,
    path = "/api/ai/generate-message",
    tag = "Assistant",
    request_body = GenerateMessageRequest,
    responses(
        (status = 200, description = "Drafted message template", body = GenerateMessageResponse),
        (status = 400, description = "Empty goal", body = ErrorResponse),
    )
)]
pub async fn generate_message(
    State(state): State<ManagementState>,
    Json(req): Json<GenerateMessageRequest>,
) -> ApiResult<Json<GenerateMessageResponse>> {
    let message = state
        .assistant
        .generate_message(&req.goal)
        .map_err(error_response)?;
    Ok(Json(GenerateMessageResponse {
        goal: req.goal,
        message,
    }))
}
