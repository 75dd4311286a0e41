//! Request and response bodies for the dashboard API.
//!
//! Single resources are wrapped (`{"customer": ...}`), collections are
//! wrapped in the plural (`{"customers": [...]}`).

use chrono::{DateTime, Utc};
use crm_core::rules::RuleSet;
use crm_core::types::{Campaign, Customer, DeliveryLogEntry, Order, OrderStatus};
use crm_delivery::CampaignStatsReport;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

// ─── Auth ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    #[serde(default = "default_username")]
    pub username: String,
    pub password: String,
}

fn default_username() -> String {
    "admin".to_string()
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    pub user: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CurrentUser {
    pub username: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CurrentUserResponse {
    pub user: CurrentUser,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

// ─── Customers & Orders ────────────────────────────────────────────────────

#[derive(Debug, Serialize, ToSchema)]
pub struct CustomerListResponse {
    pub customers: Vec<Customer>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CustomerResponse {
    pub customer: Customer,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderListResponse {
    pub orders: Vec<Order>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderResponse {
    pub order: Order,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct OrderStatusRequest {
    pub status: OrderStatus,
}

// ─── Campaigns ─────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, ToSchema)]
pub struct CampaignListResponse {
    pub campaigns: Vec<Campaign>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CampaignResponse {
    pub campaign: Campaign,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct PreviewRequest {
    pub rules: RuleSet,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PreviewResponse {
    pub audience_count: usize,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ActivateResponse {
    pub message: String,
    pub audience_size: u64,
    pub log_entries_created: usize,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct StatsResponse {
    pub stats: CampaignStatsReport,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DeliveryLogsResponse {
    pub logs: Vec<DeliveryLogEntry>,
}

// ─── Receipts ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ReceiptResult {
    Applied,
    Duplicate,
    Ignored,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptResponse {
    pub result: ReceiptResult,
    /// This receipt completed the campaign.
    pub campaign_completed: bool,
}

// ─── Assistant ─────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize, ToSchema)]
pub struct ConvertRulesRequest {
    pub description: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ConvertRulesResponse {
    pub description: String,
    pub rules: RuleSet,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct GenerateMessageRequest {
    pub goal: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct GenerateMessageResponse {
    pub goal: String,
    pub message: String,
}
