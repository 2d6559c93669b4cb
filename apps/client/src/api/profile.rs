//! Profile and usage: who is signed in, which tier, how many analyses
//! remain, and the recent analysis history.

use serde::Deserialize;

use crate::gateway::{ApiError, ApiGateway};

/// A usage figure that is either a count (free tier) or unlimited
/// (paid tiers, where the backend sends the string "Unlimited").
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Quota {
    Count(i64),
    Label(String),
}

impl std::fmt::Display for Quota {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Quota::Count(n) => write!(f, "{n}"),
            Quota::Label(s) => write!(f, "{s}"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserProfile {
    pub email: String,
    /// "free", "pro" or "career_plus".
    pub subscription: String,
    pub usage_count: u32,
    pub usage_limit: Quota,
    pub remaining_analyses: Quota,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisSummary {
    pub id: i64,
    pub match_score: f32,
    pub created_at: String,
}

pub async fn fetch(gateway: &ApiGateway) -> Result<UserProfile, ApiError> {
    gateway.get_json("/api/user/profile").await
}

/// The ten most recent analyses, newest first.
pub async fn history(gateway: &ApiGateway) -> Result<Vec<AnalysisSummary>, ApiError> {
    gateway.get_json("/api/user/history").await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn free_tier_profile_deserializes_counts() {
        let profile: UserProfile = serde_json::from_str(
            r#"{
                "email": "a@b.com",
                "subscription": "free",
                "usage_count": 2,
                "usage_limit": 3,
                "remaining_analyses": 1
            }"#,
        )
        .unwrap();
        assert_eq!(profile.subscription, "free");
        assert!(matches!(profile.remaining_analyses, Quota::Count(1)));
    }

    #[test]
    fn pro_tier_profile_deserializes_unlimited_label() {
        let profile: UserProfile = serde_json::from_str(
            r#"{
                "email": "a@b.com",
                "subscription": "pro",
                "usage_count": 40,
                "usage_limit": "Unlimited",
                "remaining_analyses": "Unlimited"
            }"#,
        )
        .unwrap();
        assert_eq!(profile.remaining_analyses.to_string(), "Unlimited");
    }
}
