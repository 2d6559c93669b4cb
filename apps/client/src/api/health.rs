use serde::Deserialize;

use crate::gateway::{ApiError, ApiGateway};

#[derive(Debug, Clone, Deserialize)]
pub struct HealthStatus {
    pub status: String,
}

/// Backend connectivity probe.
pub async fn check(gateway: &ApiGateway) -> Result<HealthStatus, ApiError> {
    gateway.get_json("/health").await
}
