//! Rule-set evaluation over customer snapshots.

use crate::predicates::evaluate_condition;
use crm_core::repository::CustomerProvider;
use crm_core::rules::{LogicalOperator, RuleSet};
use crm_core::types::Customer;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// Whether `customer` satisfies `rules`. An empty rule-set matches no one.
pub fn matches(customer: &Customer, rules: &RuleSet) -> bool {
    if rules.is_empty() {
        return false;
    }
    match rules.condition {
        LogicalOperator::And => rules
            .conditions
            .iter()
            .all(|c| evaluate_condition(customer, c)),
        LogicalOperator::Or => rules
            .conditions
            .iter()
            .any(|c| evaluate_condition(customer, c)),
    }
}

pub fn preview_count(rules: &RuleSet, customers: &[Customer]) -> usize {
    customers.iter().filter(|c| matches(c, rules)).count()
}

/// Ids of matching customers, in snapshot order.
pub fn select_audience(rules: &RuleSet, customers: &[Customer]) -> Vec<Uuid> {
    customers
        .iter()
        .filter(|c| matches(c, rules))
        .map(|c| c.id)
        .collect()
}

/// Evaluates rule-sets against the live customer set.
pub struct AudienceEngine {
    customers: Arc<dyn CustomerProvider>,
}

impl AudienceEngine {
    pub fn new(customers: Arc<dyn CustomerProvider>) -> Self {
        Self { customers }
    }

    pub fn preview_count(&self, rules: &RuleSet) -> usize {
        let snapshot = self.customers.customer_snapshot();
        let count = preview_count(rules, &snapshot);
        debug!(
            conditions = rules.conditions.len(),
            population = snapshot.len(),
            matched = count,
            "Audience preview evaluated"
        );
        metrics::counter!("segmentation.previews").increment(1);
        count
    }

    /// Matching customers from one snapshot, for rendering and delivery.
    pub fn audience(&self, rules: &RuleSet) -> Vec<Customer> {
        self.customers
            .customer_snapshot()
            .into_iter()
            .filter(|c| matches(c, rules))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::RuleSetBuilder;
    use crm_core::rules::{ComparisonOperator, CustomerField, RuleCondition};

    struct FixedCustomers(Vec<Customer>);

    impl CustomerProvider for FixedCustomers {
        fn customer_snapshot(&self) -> Vec<Customer> {
            self.0.clone()
        }
    }

    fn spenders() -> RuleSetBuilder {
        RuleSetBuilder::new()
            .total_spend_above(500.0)
            .condition(CustomerField::Visits, ComparisonOperator::GreaterThanOrEqual, 3i64)
    }

    #[test]
    fn test_empty_rule_set_matches_no_one() {
        let customers = vec![
            Customer::new("John", "john@example.com"),
            Customer::new("Amy", "amy@example.com"),
        ];
        assert_eq!(preview_count(&RuleSet::default(), &customers), 0);
        assert_eq!(preview_count(&RuleSetBuilder::new().any().build(), &customers), 0);
    }

    #[test]
    fn test_and_requires_every_condition() {
        let rules = spenders().build();
        let regular = Customer::new("John", "john@example.com").with_spend(600.0, 3);
        let rare = Customer::new("Amy", "amy@example.com").with_spend(600.0, 2);
        assert!(matches(&regular, &rules));
        assert!(!matches(&rare, &rules));
    }

    #[test]
    fn test_or_requires_any_condition() {
        let rules = spenders().any().build();
        let big_spender = Customer::new("Amy", "amy@example.com").with_spend(900.0, 1);
        let frequent = Customer::new("Bo", "bo@example.com").with_spend(10.0, 8);
        let neither = Customer::new("Cy", "cy@example.com").with_spend(10.0, 1);
        assert!(matches(&big_spender, &rules));
        assert!(matches(&frequent, &rules));
        assert!(!matches(&neither, &rules));
    }

    #[test]
    fn test_malformed_condition_excludes_under_and() {
        let mut rules = spenders().build();
        rules
            .conditions
            .push(RuleCondition::new(CustomerField::Unknown, ComparisonOperator::Equals, "gold"));
        let regular = Customer::new("John", "john@example.com").with_spend(600.0, 3);
        assert!(!matches(&regular, &rules));
    }

    #[test]
    fn test_engine_previews_live_snapshot() {
        let customers: Vec<Customer> = (0..10)
            .map(|i| Customer::new(format!("Customer {i}"), format!("c{i}@example.com")).with_spend(i as f64 * 100.0, i))
            .collect();
        let expected: Vec<Uuid> = customers[6..].iter().map(|c| c.id).collect();
        let engine = AudienceEngine::new(Arc::new(FixedCustomers(customers.clone())));

        let rules = RuleSetBuilder::new().total_spend_above(500.0).build();
        assert_eq!(engine.preview_count(&rules), 4);
        assert_eq!(select_audience(&rules, &customers), expected);
        assert_eq!(engine.audience(&rules).len(), 4);
    }
}
