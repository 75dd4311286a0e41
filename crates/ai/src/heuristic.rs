//! Offline phrase-matching assistant.
//!
//! Descriptions are split into clauses on "and"/"or" (and trailing commas).
//! Each clause maps to at most one condition; clauses that match nothing are
//! dropped.

use crate::assistant::CampaignAssistant;
use chrono::{Duration, NaiveDate, Utc};
use crm_core::rules::{
    ComparisonOperator, CustomerField, LogicalOperator, RuleCondition, RuleSet, RuleValue,
};
use crm_core::{CrmError, CrmResult};
use tracing::debug;

const GREETING: &str = "Hi {{name}}";
const DEFAULT_INACTIVE_DAYS: i64 = 90;

/// Comparator phrases, longest first so "no more than" wins over "more than".
const COMPARATORS: &[(&str, ComparisonOperator)] = &[
    ("no more than", ComparisonOperator::LessThanOrEqual),
    ("no less than", ComparisonOperator::GreaterThanOrEqual),
    ("or more", ComparisonOperator::GreaterThanOrEqual),
    ("or less", ComparisonOperator::LessThanOrEqual),
    ("or fewer", ComparisonOperator::LessThanOrEqual),
    ("at least", ComparisonOperator::GreaterThanOrEqual),
    ("at most", ComparisonOperator::LessThanOrEqual),
    ("more than", ComparisonOperator::GreaterThan),
    ("greater than", ComparisonOperator::GreaterThan),
    ("over", ComparisonOperator::GreaterThan),
    ("above", ComparisonOperator::GreaterThan),
    ("less than", ComparisonOperator::LessThan),
    ("fewer than", ComparisonOperator::LessThan),
    ("under", ComparisonOperator::LessThan),
    ("below", ComparisonOperator::LessThan),
    ("exactly", ComparisonOperator::Equals),
];

#[derive(Debug, Clone, Default)]
pub struct HeuristicAssistant {
    reference_date: Option<NaiveDate>,
}

impl HeuristicAssistant {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pin "today" for relative date phrases.
    pub fn with_reference_date(mut self, date: NaiveDate) -> Self {
        self.reference_date = Some(date);
        self
    }

    fn today(&self) -> NaiveDate {
        self.reference_date.unwrap_or_else(|| Utc::now().date_naive())
    }

    fn cutoff(&self, days: i64) -> CrmResult<RuleValue> {
        let date = Duration::try_days(days)
            .and_then(|span| self.today().checked_sub_signed(span))
            .ok_or_else(|| {
                CrmError::Validation(format!("{days} days is outside the supported date range"))
            })?;
        Ok(RuleValue::Text(date.format("%Y-%m-%d").to_string()))
    }

    fn parse_clause(&self, words: &[&str]) -> CrmResult<Option<RuleCondition>> {
        let lower: Vec<String> = words.iter().map(|w| normalize(w)).collect();
        let text = format!(" {} ", lower.join(" "));
        let has = |prefix: &str| lower.iter().any(|w| w.starts_with(prefix));

        let inactive = has("inactive")
            || [" not active ", " no activity ", " not visited ", " haven't visited ", " lapsed "]
                .iter()
                .any(|p| text.contains(p));
        if inactive {
            let days = days_in(&lower).unwrap_or(DEFAULT_INACTIVE_DAYS);
            return Ok(Some(RuleCondition::new(
                CustomerField::LastActivity,
                ComparisonOperator::LessThan,
                self.cutoff(days)?,
            )));
        }

        if let Some(i) = lower
            .iter()
            .position(|w| matches!(w.as_str(), "contains" | "containing" | "named" | "called"))
        {
            let value = words[i + 1..]
                .iter()
                .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric() && c != '@' && c != '.'))
                .filter(|w| !w.is_empty())
                .collect::<Vec<_>>()
                .join(" ");
            let value = value.trim_end_matches('.').to_string();
            if value.is_empty() {
                return Ok(None);
            }
            let field = if has("email") {
                CustomerField::Email
            } else if has("phone") {
                CustomerField::Phone
            } else {
                CustomerField::Name
            };
            return Ok(Some(RuleCondition::new(field, ComparisonOperator::Contains, value)));
        }

        if has("active") {
            if let Some(days) = days_in(&lower) {
                return Ok(Some(RuleCondition::new(
                    CustomerField::LastActivity,
                    ComparisonOperator::GreaterThanOrEqual,
                    self.cutoff(days)?,
                )));
            }
        }

        let field = if has("spen") || text.contains('$') {
            CustomerField::TotalSpend
        } else if has("visit") || has("order") || has("purchase") {
            CustomerField::Visits
        } else {
            return Ok(None);
        };
        let Some(amount) = first_number(&lower) else {
            return Ok(None);
        };
        let operator = COMPARATORS
            .iter()
            .find(|(phrase, _)| text.contains(&format!(" {phrase} ")))
            .map(|(_, op)| *op)
            .unwrap_or(ComparisonOperator::GreaterThanOrEqual);
        Ok(Some(RuleCondition::new(field, operator, amount)))
    }
}

impl CampaignAssistant for HeuristicAssistant {
    fn convert_rules(&self, description: &str) -> CrmResult<RuleSet> {
        let mut clauses: Vec<Vec<&str>> = vec![Vec::new()];
        let (mut saw_and, mut saw_or) = (false, false);
        for word in description.split_whitespace() {
            match normalize(word).as_str() {
                "and" => {
                    saw_and = true;
                    clauses.push(Vec::new());
                }
                "or" => {
                    saw_or = true;
                    clauses.push(Vec::new());
                }
                _ => {
                    if let Some(current) = clauses.last_mut() {
                        current.push(word);
                    }
                    if word.ends_with(',') {
                        saw_and = true;
                        clauses.push(Vec::new());
                    }
                }
            }
        }

        metrics::counter!("crm.assistant.requests", "op" => "convert_rules").increment(1);
        let mut conditions = Vec::new();
        for clause in clauses.iter().filter(|c| !c.is_empty()) {
            if let Some(condition) = self.parse_clause(clause)? {
                conditions.push(condition);
            }
        }

        if conditions.is_empty() {
            return Err(CrmError::Validation(format!(
                "could not derive any rule from \"{}\"",
                description.trim()
            )));
        }
        let operator = if saw_or && !saw_and {
            LogicalOperator::Or
        } else {
            LogicalOperator::And
        };
        debug!(
            provider = self.provider_name(),
            conditions = conditions.len(),
            "Converted description to rules"
        );
        Ok(RuleSet::new(operator, conditions))
    }

    fn generate_message(&self, goal: &str) -> CrmResult<String> {
        let goal = goal.trim();
        if goal.is_empty() {
            return Err(CrmError::Validation("goal must not be empty".into()));
        }
        metrics::counter!("crm.assistant.requests", "op" => "generate_message").increment(1);

        let lower = goal.to_lowercase();
        let mentions = |keys: &[&str]| keys.iter().any(|k| lower.contains(k));
        let offer = match discount(&lower) {
            Some(pct) => format!("Enjoy {pct}% off your next purchase."),
            None => "We've saved something special for you.".to_string(),
        };

        let message = if mentions(&["win back", "inactive", "miss", "lapsed", "come back", "return"]) {
            format!("{GREETING}, we miss you! {offer} Come back and see what's new.")
        } else if mentions(&["loyal", "thank", "vip", "reward"]) {
            format!("{GREETING}, thank you for being one of our most valued customers! {offer}")
        } else if mentions(&["launch", "new arrival", "new collection", "new product"]) {
            format!("{GREETING}, our new arrivals are here and you get the first look. {offer}")
        } else if mentions(&["sale", "holiday", "festive", "season", "weekend"]) {
            format!("{GREETING}, our sale is on now! {offer} Don't miss out.")
        } else {
            format!("{GREETING}, we have something special for you. {offer} Visit us soon!")
        };
        debug!(provider = self.provider_name(), "Generated campaign message");
        Ok(message)
    }

    fn provider_name(&self) -> &str {
        "heuristic"
    }
}

fn normalize(word: &str) -> String {
    word.trim_matches(|c: char| matches!(c, ',' | '.' | '!' | '?' | ';' | ':' | '"' | '(' | ')'))
        .to_lowercase()
}

fn parse_amount(word: &str) -> Option<f64> {
    let cleaned: String = word.chars().filter(|c| *c != '$' && *c != ',').collect();
    cleaned.parse::<f64>().ok().filter(|n| n.is_finite())
}

fn first_number(words: &[String]) -> Option<f64> {
    words.iter().find_map(|w| parse_amount(w))
}

/// "90 days", "3 months", "2 weeks" → days. Saturates; the cutoff rejects
/// spans chrono cannot represent.
fn days_in(words: &[String]) -> Option<i64> {
    words.windows(2).find_map(|pair| {
        let n = parse_amount(&pair[0])? as i64;
        let unit = pair[1].as_str();
        let factor = if unit.starts_with("day") {
            1
        } else if unit.starts_with("week") {
            7
        } else if unit.starts_with("month") {
            30
        } else if unit.starts_with("year") {
            365
        } else {
            return None;
        };
        Some(n.saturating_mul(factor))
    })
}

/// "20%", "20% off", "15 percent".
fn discount(goal: &str) -> Option<u32> {
    let words: Vec<String> = goal.split_whitespace().map(normalize).collect();
    words
        .iter()
        .find_map(|w| w.strip_suffix('%').and_then(|n| n.parse().ok()))
        .or_else(|| {
            words
                .windows(2)
                .find(|pair| pair[1].starts_with("percent"))
                .and_then(|pair| pair[0].parse().ok())
        })
}
