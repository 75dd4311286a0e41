//! Persistence seams used by the delivery pipeline.
//!
//! The pipeline never performs read-modify-write on campaign counters itself;
//! implementations apply each receipt as a single in-place update of the
//! campaign document.

use crate::error::CrmResult;
use crate::types::{Campaign, Customer, DeliveryLogEntry, DeliveryReceipt, ReceiptOutcome};
use uuid::Uuid;

/// Source of customer attribute snapshots.
pub trait CustomerProvider: Send + Sync {
    /// Point-in-time copy of every customer.
    fn customer_snapshot(&self) -> Vec<Customer>;
}

/// Campaign documents and their delivery logs.
pub trait CampaignRepository: Send + Sync {
    fn campaign(&self, id: Uuid) -> Option<Campaign>;

    /// Move a draft campaign to active with the given audience.
    /// The status check and the update happen under one document lock;
    /// a non-draft campaign yields `CrmError::InvalidState`.
    fn mark_active(&self, id: Uuid, audience: Vec<Uuid>) -> CrmResult<Campaign>;

    /// Store pending log entries, returning how many were created.
    /// An entry for an existing campaign/customer pair is not replaced.
    fn insert_delivery_logs(&self, entries: Vec<DeliveryLogEntry>) -> usize;

    fn delivery_logs(&self, campaign_id: Uuid) -> Vec<DeliveryLogEntry>;

    /// Resolve a pending log entry and bump the campaign's counters in place,
    /// promoting an active campaign to completed when the last message resolves.
    fn apply_receipt(&self, receipt: &DeliveryReceipt) -> ReceiptOutcome;
}
