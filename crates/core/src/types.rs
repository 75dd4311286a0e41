use crate::rules::RuleSet;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

// ─── Customers & Orders ─────────────────────────────────────────────────────

/// Customer record as stored and as evaluated by audience rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    #[serde(rename = "_id", alias = "id")]
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub total_spend: f64,
    #[serde(default)]
    pub visits: u32,
    pub last_activity: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Customer {
    /// A fresh customer with no spend, no visits, and activity stamped now.
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            email: email.into(),
            phone: None,
            total_spend: 0.0,
            visits: 0,
            last_activity: now,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_spend(mut self, total_spend: f64, visits: u32) -> Self {
        self.total_spend = total_spend;
        self.visits = visits;
        self
    }

    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }

    pub fn with_last_activity(mut self, at: DateTime<Utc>) -> Self {
        self.last_activity = at;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Product {
    pub name: String,
    pub quantity: u32,
    pub price: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    #[serde(rename = "_id", alias = "id")]
    pub id: Uuid,
    #[serde(rename = "customer", alias = "customerId")]
    pub customer_id: Uuid,
    pub amount: f64,
    pub products: Vec<Product>,
    pub status: OrderStatus,
    pub order_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ─── Campaigns ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum CampaignStatus {
    Draft,
    Active,
    Completed,
    Cancelled,
}

impl CampaignStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, CampaignStatus::Completed | CampaignStatus::Cancelled)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DeliveryStats {
    pub sent: u64,
    pub failed: u64,
}

impl DeliveryStats {
    pub fn processed(&self) -> u64 {
        self.sent + self.failed
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Campaign {
    #[serde(rename = "_id", alias = "id")]
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub rules: RuleSet,
    /// Message template; `{{name}}` is replaced per recipient.
    pub message: String,
    /// Customer ids captured at activation.
    #[serde(default)]
    pub audience: Vec<Uuid>,
    pub audience_size: u64,
    pub delivery_stats: DeliveryStats,
    pub status: CampaignStatus,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Campaign {
    pub fn draft(
        name: impl Into<String>,
        rules: RuleSet,
        message: impl Into<String>,
        created_by: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            description: None,
            rules,
            message: message.into(),
            audience: Vec::new(),
            audience_size: 0,
            delivery_stats: DeliveryStats::default(),
            status: CampaignStatus::Draft,
            created_by: created_by.into(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Every queued message has resolved. A campaign with no audience never settles.
    pub fn is_settled(&self) -> bool {
        self.audience_size > 0 && self.delivery_stats.processed() >= self.audience_size
    }
}

// ─── Delivery ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    Pending,
    Sent,
    Failed,
}

/// One message to one customer for one campaign.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryLogEntry {
    #[serde(rename = "_id", alias = "id")]
    pub id: Uuid,
    #[serde(rename = "campaign", alias = "campaignId")]
    pub campaign_id: Uuid,
    #[serde(rename = "customer", alias = "customerId")]
    pub customer_id: Uuid,
    pub message: String,
    pub status: DeliveryStatus,
    #[serde(default)]
    pub failure_reason: Option<String>,
    #[serde(default)]
    pub sent_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DeliveryLogEntry {
    pub fn pending(campaign_id: Uuid, customer_id: Uuid, message: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            campaign_id,
            customer_id,
            message,
            status: DeliveryStatus::Pending,
            failure_reason: None,
            sent_at: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Vendor-reported result of a single send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum DeliveryOutcome {
    #[serde(alias = "sent", alias = "SUCCESS", alias = "success")]
    Sent,
    #[serde(alias = "failed", alias = "FAILURE", alias = "failure")]
    Failed,
}

/// Delivery receipt as posted by the (simulated) vendor webhook.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryReceipt {
    pub campaign_id: Uuid,
    pub customer_id: Uuid,
    pub status: DeliveryOutcome,
    #[serde(default)]
    pub failure_reason: Option<String>,
}

impl DeliveryReceipt {
    pub fn sent(campaign_id: Uuid, customer_id: Uuid) -> Self {
        Self {
            campaign_id,
            customer_id,
            status: DeliveryOutcome::Sent,
            failure_reason: None,
        }
    }

    pub fn failed(campaign_id: Uuid, customer_id: Uuid, reason: impl Into<String>) -> Self {
        Self {
            campaign_id,
            customer_id,
            status: DeliveryOutcome::Failed,
            failure_reason: Some(reason.into()),
        }
    }
}

/// What applying a receipt did to the stored state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ReceiptOutcome {
    /// The log entry moved out of pending and the counters were bumped.
    Applied {
        /// This receipt promoted the campaign to completed.
        completed: bool,
    },
    /// The log entry was already resolved.
    Duplicate,
    /// No log entry exists for the campaign/customer pair.
    Unknown,
}

// ─── API inputs ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CustomerInput {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CustomerPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub total_spend: Option<f64>,
    pub visits: Option<u32>,
    pub last_activity: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderInput {
    #[serde(alias = "customer")]
    pub customer_id: Uuid,
    pub amount: f64,
    #[serde(default)]
    pub products: Vec<Product>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CampaignInput {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub rules: RuleSet,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_customer_wire_names() {
        let customer = Customer::new("John", "john@example.com").with_spend(600.0, 3);
        let json = serde_json::to_value(&customer).unwrap();
        assert_eq!(json["totalSpend"], 600.0);
        assert_eq!(json["visits"], 3);
        assert!(json.get("lastActivity").is_some());
    }

    #[test]
    fn test_document_ids_use_underscore_id() {
        let customer = Customer::new("John", "john@example.com");
        let json = serde_json::to_value(&customer).unwrap();
        assert_eq!(json["_id"], customer.id.to_string());
        assert!(json.get("id").is_none());

        let campaign = Campaign::draft("Promo", RuleSet::default(), "Hi", "admin");
        let json = serde_json::to_value(&campaign).unwrap();
        assert_eq!(json["_id"], campaign.id.to_string());

        let log = DeliveryLogEntry::pending(campaign.id, customer.id, "Hi John".into());
        let json = serde_json::to_value(&log).unwrap();
        assert_eq!(json["campaign"], campaign.id.to_string());
        assert_eq!(json["customer"], customer.id.to_string());
        assert!(json.get("customerId").is_none());
    }

    #[test]
    fn test_order_owner_serialized_as_customer() {
        let now = Utc::now();
        let order = Order {
            id: Uuid::new_v4(),
            customer_id: Uuid::new_v4(),
            amount: 42.0,
            products: vec![],
            status: OrderStatus::Pending,
            order_date: now,
            created_at: now,
            updated_at: now,
        };
        let json = serde_json::to_value(&order).unwrap();
        assert_eq!(json["_id"], order.id.to_string());
        assert_eq!(json["customer"], order.customer_id.to_string());
        assert!(json.get("customerId").is_none());

        // Records written with plain `id`/`customerId` still load.
        let legacy = json!({
            "id": order.id,
            "customerId": order.customer_id,
            "amount": 42.0,
            "products": [],
            "status": "pending",
            "orderDate": now,
            "createdAt": now,
            "updatedAt": now
        });
        let parsed: Order = serde_json::from_value(legacy).unwrap();
        assert_eq!(parsed.id, order.id);
        assert_eq!(parsed.customer_id, order.customer_id);
    }

    #[test]
    fn test_receipt_status_aliases() {
        let id = Uuid::new_v4();
        let json = format!(r#"{{"campaignId":"{id}","customerId":"{id}","status":"failed"}}"#);
        let receipt: DeliveryReceipt = serde_json::from_str(&json).unwrap();
        assert_eq!(receipt.status, DeliveryOutcome::Failed);
        assert!(receipt.failure_reason.is_none());
    }

    #[test]
    fn test_settled_requires_audience() {
        let mut campaign = Campaign::draft("Empty", RuleSet::default(), "Hi", "admin");
        assert!(!campaign.is_settled());
        campaign.audience_size = 2;
        campaign.delivery_stats = DeliveryStats { sent: 1, failed: 1 };
        assert!(campaign.is_settled());
    }
}
