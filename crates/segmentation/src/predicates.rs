//! Condition evaluation and operand coercion.
//!
//! Every function here is total: an unknown field, a missing optional
//! attribute, or an operand that fails coercion makes the condition false.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use crm_core::rules::{ComparisonOperator, CustomerField, FieldKind, RuleCondition, RuleValue};
use crm_core::types::Customer;
use std::cmp::Ordering;

/// A customer attribute read for comparison.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue<'a> {
    Text(&'a str),
    Number(f64),
    Timestamp(DateTime<Utc>),
}

/// Read `field` from `customer`. `None` for unknown fields and unset optionals.
pub fn attribute<'a>(customer: &'a Customer, field: CustomerField) -> Option<AttributeValue<'a>> {
    match field {
        CustomerField::Name => Some(AttributeValue::Text(&customer.name)),
        CustomerField::Email => Some(AttributeValue::Text(&customer.email)),
        CustomerField::Phone => customer.phone.as_deref().map(AttributeValue::Text),
        CustomerField::TotalSpend => Some(AttributeValue::Number(customer.total_spend)),
        CustomerField::Visits => Some(AttributeValue::Number(customer.visits as f64)),
        CustomerField::LastActivity => Some(AttributeValue::Timestamp(customer.last_activity)),
        CustomerField::Unknown => None,
    }
}

pub fn evaluate_condition(customer: &Customer, condition: &RuleCondition) -> bool {
    if condition.field.kind() == FieldKind::Unknown
        || condition.operator == ComparisonOperator::Unknown
        || !condition.value.is_comparable()
    {
        return false;
    }
    match attribute(customer, condition.field) {
        Some(AttributeValue::Text(actual)) => {
            compare_text(actual, &condition.operator, &condition.value.as_text())
        }
        Some(AttributeValue::Number(actual)) => condition
            .value
            .as_number()
            .is_some_and(|expected| compare_numbers(actual, &condition.operator, expected)),
        Some(AttributeValue::Timestamp(actual)) => parse_timestamp(&condition.value)
            .is_some_and(|expected| compare_timestamps(actual, &condition.operator, &expected)),
        None => false,
    }
}

pub fn compare_text(actual: &str, operator: &ComparisonOperator, expected: &str) -> bool {
    match operator {
        ComparisonOperator::Contains => actual.contains(expected),
        _ => ordering_satisfies(actual.cmp(expected), operator),
    }
}

pub fn compare_numbers(actual: f64, operator: &ComparisonOperator, expected: f64) -> bool {
    match operator {
        ComparisonOperator::Contains => false,
        _ => actual
            .partial_cmp(&expected)
            .is_some_and(|o| ordering_satisfies(o, operator)),
    }
}

/// Rule operand for a timestamp field. Date-only operands compare by calendar day.
#[derive(Debug, Clone, PartialEq)]
pub enum TimestampOperand {
    Instant(DateTime<Utc>),
    Day(NaiveDate),
}

pub fn parse_timestamp(value: &RuleValue) -> Option<TimestampOperand> {
    let RuleValue::Text(raw) = value else {
        return None;
    };
    let raw = raw.trim();
    if let Ok(instant) = DateTime::parse_from_rfc3339(raw) {
        return Some(TimestampOperand::Instant(instant.with_timezone(&Utc)));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .map(TimestampOperand::Day)
}

pub fn compare_timestamps(
    actual: DateTime<Utc>,
    operator: &ComparisonOperator,
    expected: &TimestampOperand,
) -> bool {
    let ordering = match expected {
        TimestampOperand::Instant(instant) => actual.cmp(instant),
        TimestampOperand::Day(day) => {
            let start = day.and_time(NaiveTime::MIN).and_utc();
            if actual < start {
                Ordering::Less
            } else if actual.date_naive() == *day {
                Ordering::Equal
            } else {
                Ordering::Greater
            }
        }
    };
    match operator {
        ComparisonOperator::Contains => false,
        _ => ordering_satisfies(ordering, operator),
    }
}

fn ordering_satisfies(ordering: Ordering, operator: &ComparisonOperator) -> bool {
    match operator {
        ComparisonOperator::Equals => ordering == Ordering::Equal,
        ComparisonOperator::NotEquals => ordering != Ordering::Equal,
        ComparisonOperator::GreaterThan => ordering == Ordering::Greater,
        ComparisonOperator::GreaterThanOrEqual => ordering != Ordering::Less,
        ComparisonOperator::LessThan => ordering == Ordering::Less,
        ComparisonOperator::LessThanOrEqual => ordering != Ordering::Greater,
        ComparisonOperator::Contains | ComparisonOperator::Unknown => false,
    }
}
