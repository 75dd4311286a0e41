//! Audience segmentation — evaluates campaign rule-sets against customer
//! snapshots for audience previews and activation.

pub mod builder;
pub mod engine;
pub mod predicates;

pub use builder::RuleSetBuilder;
pub use engine::{matches, preview_count, select_audience, AudienceEngine};
