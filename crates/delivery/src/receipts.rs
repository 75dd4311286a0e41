//! Receipt aggregation — applies vendor delivery outcomes to log entries and
//! campaign counters.

use crm_core::event_bus::{make_event, EventSink, EventType};
use crm_core::repository::CampaignRepository;
use crm_core::types::{DeliveryOutcome, DeliveryReceipt, ReceiptOutcome};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Destination for delivery outcomes produced by a message vendor.
pub trait ReceiptSink: Send + Sync {
    fn deliver(&self, receipt: DeliveryReceipt);
}

pub struct ReceiptAggregator {
    campaigns: Arc<dyn CampaignRepository>,
    event_sink: Arc<dyn EventSink>,
}

impl ReceiptAggregator {
    pub fn new(campaigns: Arc<dyn CampaignRepository>) -> Self {
        Self {
            campaigns,
            event_sink: crm_core::event_bus::noop_sink(),
        }
    }

    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.event_sink = sink;
        self
    }

    /// Apply one receipt. Duplicates and unknown pairs are no-ops.
    pub fn record_receipt(&self, receipt: &DeliveryReceipt) -> ReceiptOutcome {
        let outcome = self.campaigns.apply_receipt(receipt);
        let campaign_id = receipt.campaign_id;
        let customer_id = receipt.customer_id;

        match outcome {
            ReceiptOutcome::Applied { completed } => {
                let (event_type, label) = match receipt.status {
                    DeliveryOutcome::Sent => (EventType::MessageSent, "sent"),
                    DeliveryOutcome::Failed => (EventType::MessageFailed, "failed"),
                };
                debug!(%campaign_id, %customer_id, status = label, "Receipt applied");
                metrics::counter!("crm.delivery.receipts", "status" => label).increment(1);
                self.event_sink.emit(make_event(
                    event_type,
                    campaign_id,
                    Some(customer_id),
                    receipt.failure_reason.clone(),
                ));

                if completed {
                    info!(%campaign_id, "All messages resolved, campaign completed");
                    metrics::counter!("crm.campaigns.completed").increment(1);
                    self.event_sink
                        .emit(make_event(EventType::CampaignCompleted, campaign_id, None, None));
                }
            }
            ReceiptOutcome::Duplicate => {
                debug!(%campaign_id, %customer_id, "Duplicate receipt ignored");
                metrics::counter!("crm.delivery.receipts", "status" => "duplicate").increment(1);
                self.event_sink.emit(make_event(
                    EventType::DuplicateReceipt,
                    campaign_id,
                    Some(customer_id),
                    None,
                ));
            }
            ReceiptOutcome::Unknown => {
                warn!(%campaign_id, %customer_id, "Receipt for unknown delivery ignored");
                metrics::counter!("crm.delivery.receipts", "status" => "unknown").increment(1);
            }
        }
        outcome
    }
}

impl ReceiptSink for ReceiptAggregator {
    fn deliver(&self, receipt: DeliveryReceipt) {
        self.record_receipt(&receipt);
    }
}
