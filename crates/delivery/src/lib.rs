//! Campaign delivery pipeline — simulated fan-out on activation, receipt
//! aggregation, and delivery statistics.
//!
//! Activation snapshots the audience, writes one pending log entry per
//! recipient, and schedules a detached simulated send for each. Outcomes come
//! back through [`ReceiptSink`] exactly like a vendor webhook would.

pub mod receipts;
pub mod simulator;
pub mod stats;

pub use receipts::{ReceiptAggregator, ReceiptSink};
pub use simulator::{ActivationSummary, DeliverySimulator};
pub use stats::{CampaignStatsReport, StatsReporter};
