//! Delivery simulator — fans a campaign out to its audience and reports
//! outcomes asynchronously, the way a messaging vendor would.

use crate::receipts::ReceiptSink;
use crm_core::config::DeliveryConfig;
use crm_core::event_bus::{make_event, EventSink, EventType};
use crm_core::repository::CampaignRepository;
use crm_core::templates::MessageTemplate;
use crm_core::types::{CampaignStatus, DeliveryLogEntry, DeliveryReceipt};
use crm_core::{CrmError, CrmResult};
use crm_segmentation::AudienceEngine;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tracing::{debug, info};
use utoipa::ToSchema;
use uuid::Uuid;

const DEFAULT_FAILURE_REASON: &str = "Delivery failed";

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ActivationSummary {
    pub campaign_id: Uuid,
    pub audience_size: u64,
    pub log_entries_created: usize,
}

/// Schedules one simulated send per audience member on activation.
pub struct DeliverySimulator {
    audience: Arc<AudienceEngine>,
    campaigns: Arc<dyn CampaignRepository>,
    receipts: Arc<dyn ReceiptSink>,
    config: DeliveryConfig,
    event_sink: Arc<dyn EventSink>,
}

impl DeliverySimulator {
    pub fn new(
        audience: Arc<AudienceEngine>,
        campaigns: Arc<dyn CampaignRepository>,
        receipts: Arc<dyn ReceiptSink>,
        config: DeliveryConfig,
    ) -> CrmResult<Self> {
        config.validate()?;
        Ok(Self {
            audience,
            campaigns,
            receipts,
            config,
            event_sink: crm_core::event_bus::noop_sink(),
        })
    }

    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.event_sink = sink;
        self
    }

    /// Activate a draft campaign: snapshot its audience, write pending log
    /// entries, and schedule detached sends. Returns once scheduling is done;
    /// outcomes arrive later through the receipt sink.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn activate(&self, campaign_id: Uuid) -> CrmResult<ActivationSummary> {
        let runtime = Handle::try_current()
            .map_err(|e| CrmError::Internal(anyhow::anyhow!("no async runtime: {e}")))?;

        let campaign = self
            .campaigns
            .campaign(campaign_id)
            .ok_or_else(|| CrmError::not_found("campaign", campaign_id))?;
        if campaign.status != CampaignStatus::Draft {
            return Err(CrmError::InvalidState {
                id: campaign_id,
                expected: CampaignStatus::Draft,
                actual: campaign.status,
            });
        }

        let recipients = self.audience.audience(&campaign.rules);
        let ids: Vec<Uuid> = recipients.iter().map(|c| c.id).collect();
        // A concurrent activation loses here, before any log entry is written.
        let activated = self.campaigns.mark_active(campaign_id, ids)?;

        let template = MessageTemplate::new(&activated.message);
        let entries: Vec<DeliveryLogEntry> = recipients
            .iter()
            .map(|c| DeliveryLogEntry::pending(campaign_id, c.id, template.render_for(c)))
            .collect();
        let created = self.campaigns.insert_delivery_logs(entries);

        info!(
            %campaign_id,
            audience_size = activated.audience_size,
            log_entries = created,
            "Campaign activated"
        );
        metrics::counter!("crm.campaigns.activated").increment(1);
        metrics::histogram!("crm.campaigns.audience_size").record(activated.audience_size as f64);
        self.event_sink.emit(make_event(
            EventType::CampaignActivated,
            campaign_id,
            None,
            Some(format!("audience={}", activated.audience_size)),
        ));

        // Draw every outcome up front; ThreadRng cannot cross an await point.
        let scheduled: Vec<(Duration, DeliveryReceipt)> = {
            let mut rng = rand::thread_rng();
            recipients
                .iter()
                .map(|c| self.draw(&mut rng, campaign_id, c.id))
                .collect()
        };

        for (delay, receipt) in scheduled {
            self.event_sink.emit(make_event(
                EventType::MessageQueued,
                campaign_id,
                Some(receipt.customer_id),
                None,
            ));
            let sink = self.receipts.clone();
            runtime.spawn(async move {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                debug!(
                    campaign_id = %receipt.campaign_id,
                    customer_id = %receipt.customer_id,
                    status = ?receipt.status,
                    "Simulated vendor receipt"
                );
                sink.deliver(receipt);
            });
        }

        Ok(ActivationSummary {
            campaign_id,
            audience_size: activated.audience_size,
            log_entries_created: created,
        })
    }

    fn draw(&self, rng: &mut impl Rng, campaign_id: Uuid, customer_id: Uuid) -> (Duration, DeliveryReceipt) {
        let cfg = &self.config;
        let delay_ms = if cfg.min_delay_ms >= cfg.max_delay_ms {
            cfg.min_delay_ms
        } else {
            rng.gen_range(cfg.min_delay_ms..=cfg.max_delay_ms)
        };
        let receipt = if rng.gen_bool(cfg.success_rate) {
            DeliveryReceipt::sent(campaign_id, customer_id)
        } else {
            let reason = cfg
                .failure_reasons
                .choose(rng)
                .map(String::as_str)
                .unwrap_or(DEFAULT_FAILURE_REASON);
            DeliveryReceipt::failed(campaign_id, customer_id, reason)
        };
        (Duration::from_millis(delay_ms), receipt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::receipts::ReceiptAggregator;
    use crate::stats::StatsReporter;
    use crm_core::event_bus::capture_sink;
    use crm_core::types::{CampaignInput, Customer, DeliveryStatus};
    use crm_segmentation::RuleSetBuilder;
    use crm_store::MemoryStore;

    struct Harness {
        store: Arc<MemoryStore>,
        simulator: DeliverySimulator,
        stats: StatsReporter,
    }

    fn harness(customers: usize, config: DeliveryConfig) -> Harness {
        let store = Arc::new(MemoryStore::new());
        for i in 0..customers {
            let customer = Customer::new(format!("Customer {i}"), format!("c{i}@example.com"))
                .with_spend(100.0 * i as f64, i as u32);
            store.insert_customer(customer).unwrap();
        }
        let audience = Arc::new(AudienceEngine::new(store.clone()));
        let aggregator = Arc::new(ReceiptAggregator::new(store.clone()));
        let simulator = DeliverySimulator::new(audience, store.clone(), aggregator, config).unwrap();
        let stats = StatsReporter::new(store.clone());
        Harness {
            store,
            simulator,
            stats,
        }
    }

    fn campaign(store: &MemoryStore, rules: crm_core::rules::RuleSet) -> Uuid {
        store
            .create_campaign(
                CampaignInput {
                    name: "Loyalty push".into(),
                    description: None,
                    rules,
                    message: "Hi {{name}}, thanks for shopping!".into(),
                },
                "admin",
            )
            .unwrap()
            .id
    }

    fn slow() -> DeliveryConfig {
        DeliveryConfig {
            min_delay_ms: 60_000,
            max_delay_ms: 60_000,
            ..DeliveryConfig::default()
        }
    }

    #[tokio::test]
    async fn test_activation_writes_pending_entries() {
        let h = harness(10, slow());
        let id = campaign(&h.store, RuleSetBuilder::new().visits_at_least(0).build());

        let summary = h.simulator.activate(id).unwrap();
        assert_eq!(summary.audience_size, 10);
        assert_eq!(summary.log_entries_created, 10);

        let logs = h.store.delivery_logs(id);
        assert_eq!(logs.len(), 10);
        assert!(logs.iter().all(|l| l.status == DeliveryStatus::Pending));
        assert!(logs.iter().all(|l| l.message.starts_with("Hi Customer ")));

        let stored = h.store.get_campaign(id).unwrap();
        assert_eq!(stored.status, CampaignStatus::Active);
        assert_eq!(stored.audience.len(), 10);
    }

    #[tokio::test]
    async fn test_second_activation_rejected() {
        let h = harness(3, slow());
        let id = campaign(&h.store, RuleSetBuilder::new().visits_at_least(1).build());
        h.simulator.activate(id).unwrap();

        let err = h.simulator.activate(id).unwrap_err();
        assert!(matches!(
            err,
            CrmError::InvalidState {
                actual: CampaignStatus::Active,
                ..
            }
        ));
        assert_eq!(h.store.delivery_logs(id).len(), 2);
    }

    #[tokio::test]
    async fn test_unknown_campaign() {
        let h = harness(1, slow());
        let err = h.simulator.activate(Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, CrmError::NotFound { kind: "campaign", .. }));
    }

    #[tokio::test]
    async fn test_all_success_settles_to_completed() {
        let h = harness(5, DeliveryConfig::immediate(true));
        let id = campaign(&h.store, RuleSetBuilder::new().total_spend_above(50.0).build());

        let summary = h.simulator.activate(id).unwrap();
        assert_eq!(summary.audience_size, 4);

        let report = h
            .stats
            .poll_until_settled(id, Duration::from_millis(10), 200)
            .await
            .unwrap();
        assert!(report.completed);
        assert_eq!(report.sent, 4);
        assert_eq!(report.failed, 0);
        assert_eq!(report.status, CampaignStatus::Completed);
    }

    #[tokio::test]
    async fn test_all_failures_recorded_with_reason() {
        let mut config = DeliveryConfig::immediate(false);
        config.failure_reasons = vec!["Invalid number".into()];
        let h = harness(3, config);
        let id = campaign(&h.store, RuleSetBuilder::new().visits_below(10).build());
        h.simulator.activate(id).unwrap();

        let report = h
            .stats
            .poll_until_settled(id, Duration::from_millis(10), 200)
            .await
            .unwrap();
        assert!(report.completed);
        assert_eq!(report.failed, 3);
        let logs = h.store.delivery_logs(id);
        assert!(logs
            .iter()
            .all(|l| l.failure_reason.as_deref() == Some("Invalid number")));
    }

    #[tokio::test]
    async fn test_empty_audience_stays_active() {
        let h = harness(2, DeliveryConfig::immediate(true));
        let id = campaign(&h.store, RuleSetBuilder::new().total_spend_above(1e9).build());
        let sink = capture_sink();
        let simulator = DeliverySimulator::new(
            Arc::new(AudienceEngine::new(h.store.clone())),
            h.store.clone(),
            Arc::new(ReceiptAggregator::new(h.store.clone())),
            DeliveryConfig::immediate(true),
        )
        .unwrap()
        .with_event_sink(sink.clone());

        let summary = simulator.activate(id).unwrap();
        assert_eq!(summary.audience_size, 0);
        assert_eq!(summary.log_entries_created, 0);
        assert_eq!(sink.count_type(EventType::CampaignActivated), 1);
        assert_eq!(sink.count_type(EventType::MessageQueued), 0);

        let report = h.stats.get_stats(id).unwrap();
        assert_eq!(report.status, CampaignStatus::Active);
        assert!(!report.completed);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let store = Arc::new(MemoryStore::new());
        let config = DeliveryConfig {
            success_rate: 1.5,
            ..DeliveryConfig::default()
        };
        let result = DeliverySimulator::new(
            Arc::new(AudienceEngine::new(store.clone())),
            store.clone(),
            Arc::new(ReceiptAggregator::new(store)),
            config,
        );
        assert!(result.is_err());
    }
}
