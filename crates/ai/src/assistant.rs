use crm_core::rules::RuleSet;
use crm_core::CrmResult;

/// Provider-agnostic campaign assistant.
pub trait CampaignAssistant: Send + Sync {
    /// Build a rule-set from a description such as
    /// "customers who spent more than 500 and visited fewer than 3 times".
    fn convert_rules(&self, description: &str) -> CrmResult<RuleSet>;

    /// Draft a message template for a campaign goal. The result may contain
    /// `{{name}}` placeholders.
    fn generate_message(&self, goal: &str) -> CrmResult<String>;

    /// Provider name for metrics/logging.
    fn provider_name(&self) -> &str;
}
