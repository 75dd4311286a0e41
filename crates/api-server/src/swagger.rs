//! OpenAPI specification and Swagger UI configuration.

use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Mini CRM API",
        version = "0.1.0",
        description = "Customer records, rule-based audience segmentation, and simulated campaign delivery with asynchronous receipts.",
        license(name = "MIT"),
    ),
    tags(
        (name = "Auth", description = "Development bearer-token login"),
        (name = "Customers", description = "Customer records"),
        (name = "Orders", description = "Orders; each order updates the customer's spend, visits and last activity"),
        (name = "Campaigns", description = "Audience preview, activation, cancellation and delivery stats"),
        (name = "Delivery", description = "Vendor delivery receipt webhook"),
        (name = "Assistant", description = "Rule and message drafting helpers"),
        (name = "Operations", description = "Health, readiness, and liveness probes"),
    ),
    paths(
        // Auth
        crm_management::handlers::handle_login,
        crm_management::handlers::current_user_info,
        // Customers
        crm_management::handlers::list_customers,
        crm_management::handlers::get_customer,
        crm_management::handlers::create_customer,
        crm_management::handlers::update_customer,
        crm_management::handlers::delete_customer,
        // Orders
        crm_management::handlers::list_orders,
        crm_management::handlers::get_order,
        crm_management::handlers::orders_for_customer,
        crm_management::handlers::create_order,
        crm_management::handlers::update_order_status,
        // Campaigns
        crm_management::handlers::list_campaigns,
        crm_management::handlers::get_campaign,
        crm_management::handlers::create_campaign,
        crm_management::handlers::preview_audience,
        crm_management::handlers::activate_campaign,
        crm_management::handlers::cancel_campaign,
        crm_management::handlers::campaign_stats,
        crm_management::handlers::campaign_logs,
        // Delivery
        crm_management::handlers::handle_receipt,
        // Assistant
        crm_management::handlers::convert_rules,
        crm_management::handlers::generate_message,
        // Operations
        crate::rest::health_check,
        crate::rest::readiness,
        crate::rest::liveness,
    ),
    components(schemas(
        // Domain types
        crm_core::types::Customer,
        crm_core::types::Product,
        crm_core::types::Order,
        crm_core::types::OrderStatus,
        crm_core::types::Campaign,
        crm_core::types::CampaignStatus,
        crm_core::types::DeliveryStats,
        crm_core::types::DeliveryStatus,
        crm_core::types::DeliveryLogEntry,
        crm_core::types::DeliveryOutcome,
        crm_core::types::DeliveryReceipt,
        crm_core::types::CustomerInput,
        crm_core::types::CustomerPatch,
        crm_core::types::OrderInput,
        crm_core::types::CampaignInput,
        // Rules
        crm_core::rules::RuleSet,
        crm_core::rules::LogicalOperator,
        crm_core::rules::RuleCondition,
        crm_core::rules::CustomerField,
        crm_core::rules::ComparisonOperator,
        crm_core::rules::RuleValue,
        // Delivery
        crm_delivery::CampaignStatsReport,
        // API bodies
        crm_management::models::LoginRequest,
        crm_management::models::LoginResponse,
        crm_management::models::CurrentUser,
        crm_management::models::CurrentUserResponse,
        crm_management::models::ErrorResponse,
        crm_management::models::MessageResponse,
        crm_management::models::CustomerListResponse,
        crm_management::models::CustomerResponse,
        crm_management::models::OrderListResponse,
        crm_management::models::OrderResponse,
        crm_management::models::OrderStatusRequest,
        crm_management::models::CampaignListResponse,
        crm_management::models::CampaignResponse,
        crm_management::models::PreviewRequest,
        crm_management::models::PreviewResponse,
        crm_management::models::ActivateResponse,
        crm_management::models::StatsResponse,
        crm_management::models::DeliveryLogsResponse,
        crm_management::models::ReceiptResult,
        crm_management::models::ReceiptResponse,
        crm_management::models::ConvertRulesRequest,
        crm_management::models::ConvertRulesResponse,
        crm_management::models::GenerateMessageRequest,
        crm_management::models::GenerateMessageResponse,
        crate::rest::HealthResponse,
    ))
)]
pub struct ApiDoc;
