//! Campaign assistant — turns plain-language audience descriptions into
//! rule-sets and drafts promotional copy.
//!
//! Every backend implements [`CampaignAssistant`], so the REST layer never
//! depends on which provider is configured. [`HeuristicAssistant`] is the
//! offline phrase-matching provider used by default.

pub mod assistant;
pub mod heuristic;

pub use assistant::CampaignAssistant;
pub use heuristic::HeuristicAssistant;
