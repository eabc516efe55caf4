use crate::domain::pipeline::{AbortReason, Stage, Step};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProvisionError {
    #[error("Purchase token rejected")]
    EntitlementRejected,
    #[error("Remote call {0} failed")]
    RemoteCallFailed(Step),
    #[error("No region matches timezone {0}")]
    RegionNotFound(String),
    #[error("Remote call {0} returned no usable payload")]
    EmptyResponse(Step),
    #[error("A provisioning attempt is already in flight")]
    AttemptInFlight,
    #[error("Completion does not belong to the current attempt")]
    StaleAttempt,
    #[error("Unexpected {event} completion while at stage {stage}")]
    UnexpectedEvent { stage: Stage, event: Step },
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl From<AbortReason> for ProvisionError {
    fn from(reason: AbortReason) -> Self {
        match reason {
            AbortReason::EntitlementRejected => Self::EntitlementRejected,
            AbortReason::RemoteCallFailed(stage) => Self::RemoteCallFailed(stage),
            AbortReason::RegionNotFound(tz) => Self::RegionNotFound(tz),
            AbortReason::EmptyResponse(stage) => Self::EmptyResponse(stage),
            AbortReason::InvalidPayload(detail) => Self::InvalidPayload(detail),
        }
    }
}

pub type Result<T> = std::result::Result<T, ProvisionError>;
