use thiserror::Error;
use uuid::Uuid;

use crate::types::CampaignStatus;

pub type CrmResult<T> = Result<T, CrmError>;

#[derive(Error, Debug)]
pub enum CrmError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: Uuid },

    #[error("Campaign {id} is {actual:?}; expected {expected:?}")]
    InvalidState {
        id: Uuid,
        expected: CampaignStatus,
        actual: CampaignStatus,
    },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl CrmError {
    pub fn not_found(kind: &'static str, id: Uuid) -> Self {
        CrmError::NotFound { kind, id }
    }
}
