//! Demo data for local development.

use crate::memory::MemoryStore;
use chrono::{Duration, Utc};
use crm_core::types::Customer;
use tracing::{info, warn};

/// (name, email, phone, total spend, visits, days since last activity)
const DEMO_CUSTOMERS: &[(&str, &str, Option<&str>, f64, u32, i64)] = &[
    ("John Carter", "john.carter@example.com", Some("555-0101"), 1240.0, 12, 3),
    ("Amy Lin", "amy.lin@example.com", None, 85.5, 1, 140),
    ("Johanna Berg", "johanna.berg@example.com", Some("555-0102"), 640.0, 4, 21),
    ("Marcus Reed", "marcus.reed@example.com", None, 310.0, 6, 95),
    ("Priya Nair", "priya.nair@example.com", Some("555-0103"), 2200.0, 18, 1),
    ("Tom Okafor", "tom.okafor@example.com", None, 0.0, 0, 200),
    ("Sofia Rossi", "sofia.rossi@example.com", Some("555-0104"), 505.0, 3, 45),
    ("Ken Watanabe", "ken.watanabe@example.com", None, 75.0, 2, 60),
];

impl MemoryStore {
    /// Insert sample customers. Returns how many were added.
    pub fn seed_demo_data(&self) -> usize {
        let now = Utc::now();
        let mut added = 0;
        for (name, email, phone, spend, visits, idle_days) in DEMO_CUSTOMERS {
            let mut customer = Customer::new(*name, *email)
                .with_spend(*spend, *visits)
                .with_last_activity(now - Duration::days(*idle_days));
            customer.phone = phone.map(str::to_string);
            match self.insert_customer(customer) {
                Ok(_) => added += 1,
                Err(e) => warn!(error = %e, email = *email, "Skipping demo customer"),
            }
        }
        info!(customers = added, "Demo data seeded");
        added
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_is_idempotent_on_email() {
        let store = MemoryStore::new();
        assert_eq!(store.seed_demo_data(), DEMO_CUSTOMERS.len());
        assert_eq!(store.seed_demo_data(), 0);
        assert_eq!(store.counts().customers, DEMO_CUSTOMERS.len());
    }
}
