//! DashMap-backed store implementing the delivery pipeline's persistence seams.

use chrono::Utc;
use crm_core::error::{CrmError, CrmResult};
use crm_core::repository::{CampaignRepository, CustomerProvider};
use crm_core::types::*;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::{debug, info};
use uuid::Uuid;

/// Thread-safe in-memory store for customers, orders, campaigns, and delivery logs.
pub struct MemoryStore {
    customers: DashMap<Uuid, Customer>,
    /// Lower-cased email → customer id, for uniqueness.
    emails: DashMap<String, Uuid>,
    orders: DashMap<Uuid, Order>,
    campaigns: DashMap<Uuid, Campaign>,
    /// Keyed by (campaign id, customer id): one message per recipient.
    delivery_logs: DashMap<(Uuid, Uuid), DeliveryLogEntry>,
}

impl MemoryStore {
    pub fn new() -> Self {
        info!("CRM store initialized (in-memory)");
        Self {
            customers: DashMap::new(),
            emails: DashMap::new(),
            orders: DashMap::new(),
            campaigns: DashMap::new(),
            delivery_logs: DashMap::new(),
        }
    }

    // ─── Customers ─────────────────────────────────────────────────────────

    pub fn list_customers(&self) -> Vec<Customer> {
        let mut customers: Vec<Customer> = self.customers.iter().map(|r| r.value().clone()).collect();
        customers.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        customers
    }

    pub fn get_customer(&self, id: Uuid) -> Option<Customer> {
        self.customers.get(&id).map(|r| r.value().clone())
    }

    pub fn create_customer(&self, input: CustomerInput) -> CrmResult<Customer> {
        let name = input.name.trim().to_string();
        let email = input.email.trim().to_string();
        validate_customer(&name, &email)?;

        let mut customer = Customer::new(name, email);
        customer.phone = input.phone.filter(|p| !p.trim().is_empty());
        self.claim_email(&customer.email, customer.id)?;
        self.customers.insert(customer.id, customer.clone());
        debug!(customer_id = %customer.id, "Customer created");
        Ok(customer)
    }

    /// Insert a fully-formed customer record (imports, seeding, tests).
    pub fn insert_customer(&self, customer: Customer) -> CrmResult<Customer> {
        validate_customer(&customer.name, &customer.email)?;
        self.claim_email(&customer.email, customer.id)?;
        self.customers.insert(customer.id, customer.clone());
        Ok(customer)
    }

    /// Apply `patch` to a copy and write it back only if every field is valid.
    pub fn update_customer(&self, id: Uuid, patch: CustomerPatch) -> CrmResult<Customer> {
        let mut entry = self
            .customers
            .get_mut(&id)
            .ok_or_else(|| CrmError::not_found("customer", id))?;
        let mut updated = entry.value().clone();

        if let Some(email) = patch.email {
            updated.email = email.trim().to_string();
        }
        if let Some(name) = patch.name {
            updated.name = name.trim().to_string();
        }
        if let Some(phone) = patch.phone {
            updated.phone = Some(phone).filter(|p| !p.trim().is_empty());
        }
        if let Some(spend) = patch.total_spend {
            if spend < 0.0 || !spend.is_finite() {
                return Err(CrmError::Validation("totalSpend must be a non-negative number".into()));
            }
            updated.total_spend = spend;
        }
        if let Some(visits) = patch.visits {
            updated.visits = visits;
        }
        if let Some(at) = patch.last_activity {
            updated.last_activity = at;
        }
        validate_customer(&updated.name, &updated.email)?;

        let old_key = entry.value().email.to_lowercase();
        if updated.email.to_lowercase() != old_key {
            self.claim_email(&updated.email, id)?;
            self.emails.remove(&old_key);
        }
        updated.updated_at = Utc::now();
        *entry.value_mut() = updated.clone();
        Ok(updated)
    }

    /// Remove a customer and their orders. Delivery logs are kept as history.
    pub fn delete_customer(&self, id: Uuid) -> bool {
        match self.customers.remove(&id) {
            Some((_, customer)) => {
                self.emails.remove(&customer.email.to_lowercase());
                self.orders.retain(|_, order| order.customer_id != id);
                debug!(customer_id = %id, "Customer deleted");
                true
            }
            None => false,
        }
    }

    fn claim_email(&self, email: &str, id: Uuid) -> CrmResult<()> {
        match self.emails.entry(email.to_lowercase()) {
            Entry::Occupied(existing) if *existing.get() != id => Err(CrmError::Conflict(format!(
                "a customer with email {email} already exists"
            ))),
            Entry::Occupied(_) => Ok(()),
            Entry::Vacant(slot) => {
                slot.insert(id);
                Ok(())
            }
        }
    }

    // ─── Orders ────────────────────────────────────────────────────────────

    pub fn list_orders(&self) -> Vec<Order> {
        let mut orders: Vec<Order> = self.orders.iter().map(|r| r.value().clone()).collect();
        orders.sort_by(|a, b| b.order_date.cmp(&a.order_date));
        orders
    }

    pub fn get_order(&self, id: Uuid) -> Option<Order> {
        self.orders.get(&id).map(|r| r.value().clone())
    }

    pub fn orders_for_customer(&self, customer_id: Uuid) -> Vec<Order> {
        let mut orders: Vec<Order> = self
            .orders
            .iter()
            .filter(|r| r.value().customer_id == customer_id)
            .map(|r| r.value().clone())
            .collect();
        orders.sort_by(|a, b| b.order_date.cmp(&a.order_date));
        orders
    }

    /// Record an order and fold it into the customer's spend, visits, and activity.
    pub fn create_order(&self, input: OrderInput) -> CrmResult<Order> {
        if input.amount < 0.0 || !input.amount.is_finite() {
            return Err(CrmError::Validation("amount must be a non-negative number".into()));
        }
        let mut customer = self
            .customers
            .get_mut(&input.customer_id)
            .ok_or_else(|| CrmError::not_found("customer", input.customer_id))?;

        let now = Utc::now();
        let order = Order {
            id: Uuid::new_v4(),
            customer_id: input.customer_id,
            amount: input.amount,
            products: input.products,
            status: OrderStatus::Pending,
            order_date: now,
            created_at: now,
            updated_at: now,
        };

        let c = customer.value_mut();
        c.total_spend += order.amount;
        c.visits = c.visits.saturating_add(1);
        c.last_activity = now;
        c.updated_at = now;
        drop(customer);

        self.orders.insert(order.id, order.clone());
        debug!(order_id = %order.id, customer_id = %order.customer_id, amount = order.amount, "Order created");
        Ok(order)
    }

    pub fn update_order_status(&self, id: Uuid, status: OrderStatus) -> CrmResult<Order> {
        let mut entry = self
            .orders
            .get_mut(&id)
            .ok_or_else(|| CrmError::not_found("order", id))?;
        let order = entry.value_mut();
        order.status = status;
        order.updated_at = Utc::now();
        Ok(order.clone())
    }

    // ─── Campaigns ─────────────────────────────────────────────────────────

    pub fn list_campaigns(&self) -> Vec<Campaign> {
        let mut campaigns: Vec<Campaign> = self.campaigns.iter().map(|r| r.value().clone()).collect();
        campaigns.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        campaigns
    }

    pub fn get_campaign(&self, id: Uuid) -> Option<Campaign> {
        self.campaigns.get(&id).map(|r| r.value().clone())
    }

    pub fn create_campaign(&self, input: CampaignInput, user: &str) -> CrmResult<Campaign> {
        let name = input.name.trim();
        let message = input.message.trim();
        if name.is_empty() {
            return Err(CrmError::Validation("campaign name is required".into()));
        }
        if message.is_empty() {
            return Err(CrmError::Validation("campaign message is required".into()));
        }
        let mut campaign = Campaign::draft(name, input.rules, message, user);
        campaign.description = input.description.filter(|d| !d.trim().is_empty());
        self.campaigns.insert(campaign.id, campaign.clone());
        info!(campaign_id = %campaign.id, name = %campaign.name, "Campaign created");
        Ok(campaign)
    }

    /// Terminal override. In-flight receipts still resolve their log entries.
    pub fn cancel_campaign(&self, id: Uuid) -> CrmResult<Campaign> {
        let mut entry = self
            .campaigns
            .get_mut(&id)
            .ok_or_else(|| CrmError::not_found("campaign", id))?;
        let c = entry.value_mut();
        if c.status.is_terminal() {
            return Err(CrmError::InvalidState {
                id,
                expected: CampaignStatus::Active,
                actual: c.status,
            });
        }
        c.status = CampaignStatus::Cancelled;
        c.updated_at = Utc::now();
        info!(campaign_id = %id, "Campaign cancelled");
        Ok(c.clone())
    }

    pub fn counts(&self) -> StoreCounts {
        StoreCounts {
            customers: self.customers.len(),
            orders: self.orders.len(),
            campaigns: self.campaigns.len(),
            delivery_logs: self.delivery_logs.len(),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreCounts {
    pub customers: usize,
    pub orders: usize,
    pub campaigns: usize,
    pub delivery_logs: usize,
}

fn validate_customer(name: &str, email: &str) -> CrmResult<()> {
    if name.trim().is_empty() {
        return Err(CrmError::Validation("customer name is required".into()));
    }
    if !email.contains('@') || email.trim().len() < 3 {
        return Err(CrmError::Validation(format!("invalid email address: {email}")));
    }
    Ok(())
}

impl CustomerProvider for MemoryStore {
    fn customer_snapshot(&self) -> Vec<Customer> {
        let mut customers: Vec<Customer> = self.customers.iter().map(|r| r.value().clone()).collect();
        customers.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        customers
    }
}

impl CampaignRepository for MemoryStore {
    fn campaign(&self, id: Uuid) -> Option<Campaign> {
        self.get_campaign(id)
    }

    fn mark_active(&self, id: Uuid, audience: Vec<Uuid>) -> CrmResult<Campaign> {
        let mut entry = self
            .campaigns
            .get_mut(&id)
            .ok_or_else(|| CrmError::not_found("campaign", id))?;
        let c = entry.value_mut();
        if c.status != CampaignStatus::Draft {
            return Err(CrmError::InvalidState {
                id,
                expected: CampaignStatus::Draft,
                actual: c.status,
            });
        }
        c.status = CampaignStatus::Active;
        c.audience_size = audience.len() as u64;
        c.audience = audience;
        c.delivery_stats = DeliveryStats::default();
        c.updated_at = Utc::now();
        Ok(c.clone())
    }

    fn insert_delivery_logs(&self, entries: Vec<DeliveryLogEntry>) -> usize {
        let mut created = 0;
        for entry in entries {
            if let Entry::Vacant(slot) = self.delivery_logs.entry((entry.campaign_id, entry.customer_id)) {
                slot.insert(entry);
                created += 1;
            }
        }
        created
    }

    fn delivery_logs(&self, campaign_id: Uuid) -> Vec<DeliveryLogEntry> {
        let mut logs: Vec<DeliveryLogEntry> = self
            .delivery_logs
            .iter()
            .filter(|r| r.key().0 == campaign_id)
            .map(|r| r.value().clone())
            .collect();
        logs.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        logs
    }

    fn apply_receipt(&self, receipt: &DeliveryReceipt) -> ReceiptOutcome {
        // Lock order: log entry, then campaign. Nothing takes them the other way round.
        let Some(mut log) = self
            .delivery_logs
            .get_mut(&(receipt.campaign_id, receipt.customer_id))
        else {
            return ReceiptOutcome::Unknown;
        };
        if log.status != DeliveryStatus::Pending {
            return ReceiptOutcome::Duplicate;
        }
        let Some(mut campaign) = self.campaigns.get_mut(&receipt.campaign_id) else {
            return ReceiptOutcome::Unknown;
        };

        let now = Utc::now();
        let log = log.value_mut();
        let campaign = campaign.value_mut();
        match receipt.status {
            DeliveryOutcome::Sent => {
                log.status = DeliveryStatus::Sent;
                log.sent_at = Some(now);
                campaign.delivery_stats.sent += 1;
            }
            DeliveryOutcome::Failed => {
                log.status = DeliveryStatus::Failed;
                log.failure_reason = Some(
                    receipt
                        .failure_reason
                        .clone()
                        .unwrap_or_else(|| "Delivery failed".to_string()),
                );
                campaign.delivery_stats.failed += 1;
            }
        }
        log.updated_at = now;
        campaign.updated_at = now;

        let completed = campaign.status == CampaignStatus::Active && campaign.is_settled();
        if completed {
            campaign.status = CampaignStatus::Completed;
        }
        ReceiptOutcome::Applied { completed }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crm_core::rules::RuleSet;
    use std::sync::Arc;

    fn customer_input(name: &str, email: &str) -> CustomerInput {
        CustomerInput {
            name: name.to_string(),
            email: email.to_string(),
            phone: None,
        }
    }

    fn draft(store: &MemoryStore) -> Campaign {
        store
            .create_campaign(
                CampaignInput {
                    name: "Spring sale".into(),
                    description: None,
                    rules: RuleSet::default(),
                    message: "Hi {{name}}".into(),
                },
                "admin",
            )
            .unwrap()
    }

    fn activate_with(store: &MemoryStore, campaign: &Campaign, customers: &[Uuid]) {
        store.mark_active(campaign.id, customers.to_vec()).unwrap();
        let logs = customers
            .iter()
            .map(|c| DeliveryLogEntry::pending(campaign.id, *c, "Hi".into()))
            .collect();
        assert_eq!(store.insert_delivery_logs(logs), customers.len());
    }

    #[test]
    fn test_customer_email_unique_case_insensitive() {
        let store = MemoryStore::new();
        store.create_customer(customer_input("John", "john@example.com")).unwrap();
        let err = store.create_customer(customer_input("Johnny", "JOHN@example.com")).unwrap_err();
        assert!(matches!(err, CrmError::Conflict(_)));
    }

    #[test]
    fn test_customer_validation() {
        let store = MemoryStore::new();
        assert!(matches!(
            store.create_customer(customer_input("", "a@b.c")),
            Err(CrmError::Validation(_))
        ));
        assert!(matches!(
            store.create_customer(customer_input("Amy", "not-an-email")),
            Err(CrmError::Validation(_))
        ));
    }

    #[test]
    fn test_update_customer_email_moves_index() {
        let store = MemoryStore::new();
        let amy = store.create_customer(customer_input("Amy", "amy@example.com")).unwrap();
        let patch = CustomerPatch {
            email: Some("amy@new.example.com".into()),
            ..Default::default()
        };
        store.update_customer(amy.id, patch).unwrap();
        // The old address is free again.
        store.create_customer(customer_input("Other Amy", "amy@example.com")).unwrap();
    }

    #[test]
    fn test_rejected_update_leaves_customer_untouched() {
        let store = MemoryStore::new();
        let amy = store.create_customer(customer_input("Amy", "amy@example.com")).unwrap();
        let patch = CustomerPatch {
            email: Some("amy@new.example.com".into()),
            name: Some("   ".into()),
            visits: Some(9),
            ..Default::default()
        };
        assert!(matches!(
            store.update_customer(amy.id, patch),
            Err(CrmError::Validation(_))
        ));

        let stored = store.get_customer(amy.id).unwrap();
        assert_eq!(stored, amy);
        // The old address is still claimed and the new one is still free.
        assert!(matches!(
            store.create_customer(customer_input("Twin", "amy@example.com")),
            Err(CrmError::Conflict(_))
        ));
        store.create_customer(customer_input("New Amy", "amy@new.example.com")).unwrap();
    }

    #[test]
    fn test_email_case_change_keeps_claim() {
        let store = MemoryStore::new();
        let amy = store.create_customer(customer_input("Amy", "amy@example.com")).unwrap();
        let patch = CustomerPatch {
            email: Some("Amy@Example.com".into()),
            ..Default::default()
        };
        assert_eq!(store.update_customer(amy.id, patch).unwrap().email, "Amy@Example.com");
        assert!(store.create_customer(customer_input("Twin", "amy@example.com")).is_err());
    }

    #[test]
    fn test_order_visit_count_saturates() {
        let store = MemoryStore::new();
        let john = store.create_customer(customer_input("John", "john@example.com")).unwrap();
        let patch = CustomerPatch {
            visits: Some(u32::MAX),
            ..Default::default()
        };
        store.update_customer(john.id, patch).unwrap();
        store
            .create_order(OrderInput {
                customer_id: john.id,
                amount: 5.0,
                products: vec![],
            })
            .unwrap();
        assert_eq!(store.get_customer(john.id).unwrap().visits, u32::MAX);
    }

    #[test]
    fn test_order_updates_customer_totals() {
        let store = MemoryStore::new();
        let john = store.create_customer(customer_input("John", "john@example.com")).unwrap();
        for amount in [120.0, 80.5] {
            store
                .create_order(OrderInput {
                    customer_id: john.id,
                    amount,
                    products: vec![],
                })
                .unwrap();
        }
        let john = store.get_customer(john.id).unwrap();
        assert_eq!(john.total_spend, 200.5);
        assert_eq!(john.visits, 2);
        assert_eq!(store.orders_for_customer(john.id).len(), 2);

        assert!(store.delete_customer(john.id));
        assert!(store.list_orders().is_empty());
    }

    #[test]
    fn test_order_for_missing_customer() {
        let store = MemoryStore::new();
        let err = store
            .create_order(OrderInput {
                customer_id: Uuid::new_v4(),
                amount: 10.0,
                products: vec![],
            })
            .unwrap_err();
        assert!(matches!(err, CrmError::NotFound { kind: "customer", .. }));
    }

    #[test]
    fn test_mark_active_only_from_draft() {
        let store = MemoryStore::new();
        let campaign = draft(&store);
        let active = store.mark_active(campaign.id, vec![Uuid::new_v4()]).unwrap();
        assert_eq!(active.status, CampaignStatus::Active);
        assert_eq!(active.audience_size, 1);

        let err = store.mark_active(campaign.id, vec![]).unwrap_err();
        assert!(matches!(
            err,
            CrmError::InvalidState {
                actual: CampaignStatus::Active,
                ..
            }
        ));
    }

    #[test]
    fn test_receipt_idempotent_and_completes_once() {
        let store = MemoryStore::new();
        let campaign = draft(&store);
        let recipients = [Uuid::new_v4(), Uuid::new_v4()];
        activate_with(&store, &campaign, &recipients);

        let first = DeliveryReceipt::sent(campaign.id, recipients[0]);
        assert_eq!(store.apply_receipt(&first), ReceiptOutcome::Applied { completed: false });
        assert_eq!(store.apply_receipt(&first), ReceiptOutcome::Duplicate);

        let second = DeliveryReceipt::failed(campaign.id, recipients[1], "Mailbox full");
        assert_eq!(store.apply_receipt(&second), ReceiptOutcome::Applied { completed: true });
        assert_eq!(store.apply_receipt(&second), ReceiptOutcome::Duplicate);

        let stored = store.get_campaign(campaign.id).unwrap();
        assert_eq!(stored.delivery_stats, DeliveryStats { sent: 1, failed: 1 });
        assert_eq!(stored.status, CampaignStatus::Completed);

        let logs = store.delivery_logs(campaign.id);
        let failed = logs.iter().find(|l| l.customer_id == recipients[1]).unwrap();
        assert_eq!(failed.failure_reason.as_deref(), Some("Mailbox full"));
    }

    #[test]
    fn test_receipt_for_unknown_pair() {
        let store = MemoryStore::new();
        let receipt = DeliveryReceipt::sent(Uuid::new_v4(), Uuid::new_v4());
        assert_eq!(store.apply_receipt(&receipt), ReceiptOutcome::Unknown);
    }

    #[test]
    fn test_cancelled_campaign_never_completes() {
        let store = MemoryStore::new();
        let campaign = draft(&store);
        let recipient = Uuid::new_v4();
        activate_with(&store, &campaign, &[recipient]);
        store.cancel_campaign(campaign.id).unwrap();

        let outcome = store.apply_receipt(&DeliveryReceipt::sent(campaign.id, recipient));
        assert_eq!(outcome, ReceiptOutcome::Applied { completed: false });
        let stored = store.get_campaign(campaign.id).unwrap();
        assert_eq!(stored.status, CampaignStatus::Cancelled);
        assert_eq!(stored.delivery_stats.sent, 1);
        assert!(store.cancel_campaign(campaign.id).is_err());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_receipts_never_lose_increments() {
        let store = Arc::new(MemoryStore::new());
        let campaign = draft(&store);
        let recipients: Vec<Uuid> = (0..200).map(|_| Uuid::new_v4()).collect();
        activate_with(&store, &campaign, &recipients);

        let mut handles = Vec::new();
        for (i, customer) in recipients.iter().enumerate() {
            // Every receipt is posted twice to exercise the duplicate path under contention.
            for _ in 0..2 {
                let store = store.clone();
                let receipt = if i % 4 == 0 {
                    DeliveryReceipt::failed(campaign.id, *customer, "Rejected by carrier")
                } else {
                    DeliveryReceipt::sent(campaign.id, *customer)
                };
                handles.push(tokio::spawn(async move { store.apply_receipt(&receipt) }));
            }
        }

        let mut completions = 0;
        for handle in handles {
            if let ReceiptOutcome::Applied { completed: true } = handle.await.unwrap() {
                completions += 1;
            }
        }

        let stored = store.get_campaign(campaign.id).unwrap();
        assert_eq!(stored.delivery_stats, DeliveryStats { sent: 150, failed: 50 });
        assert_eq!(stored.status, CampaignStatus::Completed);
        assert_eq!(completions, 1);
    }
}
