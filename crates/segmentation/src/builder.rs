//! Rule-set builder — fluent API for constructing audience rules.

use crm_core::rules::{
    ComparisonOperator, CustomerField, LogicalOperator, RuleCondition, RuleSet, RuleValue,
};

pub struct RuleSetBuilder {
    operator: LogicalOperator,
    conditions: Vec<RuleCondition>,
}

impl RuleSetBuilder {
    pub fn new() -> Self {
        Self {
            operator: LogicalOperator::And,
            conditions: Vec::new(),
        }
    }

    /// Join conditions with OR instead of AND.
    pub fn any(mut self) -> Self {
        self.operator = LogicalOperator::Or;
        self
    }

    pub fn all(mut self) -> Self {
        self.operator = LogicalOperator::And;
        self
    }

    pub fn condition(
        mut self,
        field: CustomerField,
        operator: ComparisonOperator,
        value: impl Into<RuleValue>,
    ) -> Self {
        self.conditions
            .push(RuleCondition::new(field, operator, value));
        self
    }

    pub fn total_spend_above(self, amount: f64) -> Self {
        self.condition(CustomerField::TotalSpend, ComparisonOperator::GreaterThan, amount)
    }

    pub fn total_spend_below(self, amount: f64) -> Self {
        self.condition(CustomerField::TotalSpend, ComparisonOperator::LessThan, amount)
    }

    pub fn visits_at_least(self, visits: u32) -> Self {
        self.condition(
            CustomerField::Visits,
            ComparisonOperator::GreaterThanOrEqual,
            visits as i64,
        )
    }

    pub fn visits_below(self, visits: u32) -> Self {
        self.condition(CustomerField::Visits, ComparisonOperator::LessThan, visits as i64)
    }

    /// Last activity strictly before `date` (`YYYY-MM-DD`).
    pub fn inactive_since(self, date: impl Into<String>) -> Self {
        self.condition(
            CustomerField::LastActivity,
            ComparisonOperator::LessThan,
            RuleValue::Text(date.into()),
        )
    }

    pub fn name_contains(self, fragment: impl Into<String>) -> Self {
        self.condition(
            CustomerField::Name,
            ComparisonOperator::Contains,
            RuleValue::Text(fragment.into()),
        )
    }

    pub fn len(&self) -> usize {
        self.conditions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn build(self) -> RuleSet {
        RuleSet::new(self.operator, self.conditions)
    }
}

impl Default for RuleSetBuilder {
    fn default() -> Self {
        Self::new()
    }
}
