//! Audience rule types — field/operator/value conditions joined by AND/OR.
//!
//! Evaluation lives in `crm-segmentation`; these types are shared with the
//! campaign model and the REST layer.

use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;

/// A boolean combination of conditions. An empty condition list matches no one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RuleSet {
    #[serde(default)]
    pub condition: LogicalOperator,
    #[serde(default)]
    pub conditions: Vec<RuleCondition>,
}

impl RuleSet {
    pub fn new(condition: LogicalOperator, conditions: Vec<RuleCondition>) -> Self {
        Self {
            condition,
            conditions,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }
}

impl Default for RuleSet {
    fn default() -> Self {
        Self::new(LogicalOperator::And, Vec::new())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum LogicalOperator {
    #[default]
    #[serde(rename = "AND", alias = "and")]
    And,
    #[serde(rename = "OR", alias = "or")]
    Or,
}

/// One comparison. Unrecognised fields, operators, and operands still
/// deserialize; they simply never match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RuleCondition {
    pub field: CustomerField,
    pub operator: ComparisonOperator,
    #[serde(default)]
    pub value: RuleValue,
}

impl RuleCondition {
    pub fn new(field: CustomerField, operator: ComparisonOperator, value: impl Into<RuleValue>) -> Self {
        Self {
            field,
            operator,
            value: value.into(),
        }
    }
}

impl fmt::Display for RuleCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.field.as_str(), self.operator, self.value)
    }
}

/// Customer attributes a rule may reference. Names outside the known set
/// deserialize to [`CustomerField::Unknown`], which never matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub enum CustomerField {
    Name,
    Email,
    Phone,
    TotalSpend,
    Visits,
    LastActivity,
    #[serde(other)]
    Unknown,
}

/// How a field's stored value is compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Numeric,
    Timestamp,
    Unknown,
}

impl CustomerField {
    pub fn kind(&self) -> FieldKind {
        match self {
            CustomerField::Name | CustomerField::Email | CustomerField::Phone => FieldKind::Text,
            CustomerField::TotalSpend | CustomerField::Visits => FieldKind::Numeric,
            CustomerField::LastActivity => FieldKind::Timestamp,
            CustomerField::Unknown => FieldKind::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CustomerField::Name => "name",
            CustomerField::Email => "email",
            CustomerField::Phone => "phone",
            CustomerField::TotalSpend => "totalSpend",
            CustomerField::Visits => "visits",
            CustomerField::LastActivity => "lastActivity",
            CustomerField::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum ComparisonOperator {
    #[serde(rename = ">")]
    GreaterThan,
    #[serde(rename = "<")]
    LessThan,
    #[serde(rename = ">=")]
    GreaterThanOrEqual,
    #[serde(rename = "<=")]
    LessThanOrEqual,
    #[serde(rename = "=", alias = "==")]
    Equals,
    #[serde(rename = "!=")]
    NotEquals,
    #[serde(rename = "contains")]
    Contains,
    #[serde(rename = "unknown", other)]
    Unknown,
}

impl fmt::Display for ComparisonOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            ComparisonOperator::GreaterThan => ">",
            ComparisonOperator::LessThan => "<",
            ComparisonOperator::GreaterThanOrEqual => ">=",
            ComparisonOperator::LessThanOrEqual => "<=",
            ComparisonOperator::Equals => "=",
            ComparisonOperator::NotEquals => "!=",
            ComparisonOperator::Contains => "contains",
            ComparisonOperator::Unknown => "unknown",
        };
        f.write_str(symbol)
    }
}

/// Rule operand. Numbers and strings stay distinct so coercion is explicit.
/// Anything else (null, booleans, arrays, objects) lands in `Other`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum RuleValue {
    Number(f64),
    Text(String),
    Other(serde_json::Value),
}

impl Default for RuleValue {
    fn default() -> Self {
        RuleValue::Other(serde_json::Value::Null)
    }
}

impl RuleValue {
    /// Numeric view of the operand; numeric strings are accepted.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            RuleValue::Number(n) if n.is_finite() => Some(*n),
            RuleValue::Number(_) | RuleValue::Other(_) => None,
            RuleValue::Text(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        }
    }

    /// Number or text; `Other` operands cannot be compared.
    pub fn is_comparable(&self) -> bool {
        !matches!(self, RuleValue::Other(_))
    }

    /// Textual view of the operand; numbers render without a trailing `.0`.
    pub fn as_text(&self) -> String {
        match self {
            RuleValue::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => format!("{}", *n as i64),
            RuleValue::Number(n) => n.to_string(),
            RuleValue::Text(s) => s.clone(),
            RuleValue::Other(v) => v.to_string(),
        }
    }
}

impl fmt::Display for RuleValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_text())
    }
}

impl From<f64> for RuleValue {
    fn from(n: f64) -> Self {
        RuleValue::Number(n)
    }
}

impl From<i64> for RuleValue {
    fn from(n: i64) -> Self {
        RuleValue::Number(n as f64)
    }
}

impl From<&str> for RuleValue {
    fn from(s: &str) -> Self {
        RuleValue::Text(s.to_string())
    }
}

impl From<String> for RuleValue {
    fn from(s: String) -> Self {
        RuleValue::Text(s)
    }
}
