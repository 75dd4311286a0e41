//! Campaign delivery statistics.

use crm_core::repository::CampaignRepository;
use crm_core::types::CampaignStatus;
use crm_core::{CrmError, CrmResult};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use utoipa::ToSchema;
use uuid::Uuid;

/// Point-in-time delivery progress for one campaign.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CampaignStatsReport {
    pub campaign_id: Uuid,
    pub sent: u64,
    pub failed: u64,
    pub audience_size: u64,
    pub pending: u64,
    pub status: CampaignStatus,
    pub completed: bool,
}

pub struct StatsReporter {
    campaigns: Arc<dyn CampaignRepository>,
}

impl StatsReporter {
    pub fn new(campaigns: Arc<dyn CampaignRepository>) -> Self {
        Self { campaigns }
    }

    pub fn get_stats(&self, campaign_id: Uuid) -> Option<CampaignStatsReport> {
        let campaign = self.campaigns.campaign(campaign_id)?;
        let stats = campaign.delivery_stats;
        Some(CampaignStatsReport {
            campaign_id,
            sent: stats.sent,
            failed: stats.failed,
            audience_size: campaign.audience_size,
            pending: campaign.audience_size.saturating_sub(stats.processed()),
            status: campaign.status,
            completed: campaign.status == CampaignStatus::Completed,
        })
    }

    /// Re-read stats every `interval` until the campaign reaches a terminal status or
    /// `max_attempts` reads have been made. The last report is returned
    /// either way; callers check `completed`.
    pub async fn poll_until_settled(
        &self,
        campaign_id: Uuid,
        interval: Duration,
        max_attempts: u32,
    ) -> CrmResult<CampaignStatsReport> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let report = self
                .get_stats(campaign_id)
                .ok_or_else(|| CrmError::not_found("campaign", campaign_id))?;
            let settled = report.completed || report.status == CampaignStatus::Cancelled;
            if settled || attempt >= max_attempts.max(1) {
                debug!(%campaign_id, attempt, completed = report.completed, "Stats poll finished");
                return Ok(report);
            }
            tokio::time::sleep(interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crm_core::rules::RuleSet;
    use crm_core::types::{CampaignInput, DeliveryLogEntry, DeliveryReceipt};
    use crm_store::MemoryStore;

    fn active(store: &MemoryStore, recipients: &[Uuid]) -> Uuid {
        let campaign = store
            .create_campaign(
                CampaignInput {
                    name: "Reactivation".into(),
                    description: None,
                    rules: RuleSet::default(),
                    message: "Come back soon".into(),
                },
                "admin",
            )
            .unwrap();
        store.mark_active(campaign.id, recipients.to_vec()).unwrap();
        store.insert_delivery_logs(
            recipients
                .iter()
                .map(|r| DeliveryLogEntry::pending(campaign.id, *r, "Come back soon".into()))
                .collect(),
        );
        campaign.id
    }

    #[test]
    fn test_stats_reflect_counters() {
        let store = Arc::new(MemoryStore::new());
        let recipients = [Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4()];
        let id = active(&store, &recipients);
        store.apply_receipt(&DeliveryReceipt::sent(id, recipients[0]));
        store.apply_receipt(&DeliveryReceipt::failed(id, recipients[1], "Bounced"));

        let reporter = StatsReporter::new(store.clone());
        let report = reporter.get_stats(id).unwrap();
        assert_eq!(report.sent, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(report.pending, 1);
        assert_eq!(report.audience_size, 3);
        assert_eq!(report.status, CampaignStatus::Active);
        assert!(!report.completed);

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["audienceSize"], 3);
    }

    #[test]
    fn test_unknown_campaign_has_no_stats() {
        let reporter = StatsReporter::new(Arc::new(MemoryStore::new()));
        assert!(reporter.get_stats(Uuid::new_v4()).is_none());
    }

    #[tokio::test]
    async fn test_poll_gives_up_after_max_attempts() {
        let store = Arc::new(MemoryStore::new());
        let id = active(&store, &[Uuid::new_v4()]);
        let reporter = StatsReporter::new(store);

        let report = reporter
            .poll_until_settled(id, Duration::from_millis(1), 3)
            .await
            .unwrap();
        assert!(!report.completed);
        assert_eq!(report.pending, 1);
    }

    #[tokio::test]
    async fn test_poll_unknown_campaign_errors() {
        let reporter = StatsReporter::new(Arc::new(MemoryStore::new()));
        let result = reporter
            .poll_until_settled(Uuid::new_v4(), Duration::from_millis(1), 2)
            .await;
        assert!(matches!(result, Err(CrmError::NotFound { .. })));
    }
}
